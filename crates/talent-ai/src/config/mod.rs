use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the matching service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub openai: OpenAiConfig,
    pub matching: MatchingConfig,
    pub partner: Option<PartnerConfig>,
    pub scraper: Option<ScraperConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            openai: OpenAiConfig::from_env()?,
            matching: MatchingConfig::from_env()?,
            partner: PartnerConfig::from_env()?,
            scraper: ScraperConfig::from_env(),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Credentials and model selection for the inference service. The API key
/// is required at load time so a misconfigured process fails on startup
/// instead of at the first call site.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl OpenAiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingOpenAiKey)?;
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());

        Ok(Self {
            api_key,
            model,
            base_url,
        })
    }
}

/// Knobs of the matching pipeline itself. The score threshold is an
/// explicit product decision: unset keeps every evaluation, a value keeps
/// only evaluations at or above it.
#[derive(Debug, Clone)]
pub struct MatchingConfig {
    pub score_threshold: Option<f64>,
    pub max_results: usize,
    pub keyword_limit: usize,
    pub completion_window: String,
    pub poll_interval_secs: u64,
    pub max_poll_checks: u32,
    pub output_dir: PathBuf,
}

impl MatchingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let score_threshold = match env::var("MATCH_SCORE_THRESHOLD") {
            Ok(raw) => {
                let value = raw
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| ConfigError::InvalidThreshold { raw: raw.clone() })?;
                if !(0.0..=10.0).contains(&value) {
                    return Err(ConfigError::InvalidThreshold { raw });
                }
                Some(value)
            }
            Err(_) => None,
        };

        Ok(Self {
            score_threshold,
            max_results: parse_env_number("MATCH_MAX_RESULTS", 50)?,
            keyword_limit: 5,
            completion_window: "24h".to_string(),
            poll_interval_secs: parse_env_number("MATCH_POLL_INTERVAL_SECS", 300)?,
            max_poll_checks: parse_env_number("MATCH_MAX_POLL_CHECKS", 288)?,
            output_dir: PathBuf::from(
                env::var("MATCH_OUTPUT_DIR").unwrap_or_else(|_| "data".to_string()),
            ),
        })
    }
}

/// Downstream partner API used as a sink for final results. Optional: when
/// absent the pipeline still persists the local artifact and skips
/// forwarding.
#[derive(Debug, Clone)]
pub struct PartnerConfig {
    pub base_url: String,
    pub email: String,
    pub password: String,
}

impl PartnerConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let base_url = match env::var("PARTNER_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => url,
            _ => return Ok(None),
        };

        let email = env::var("PARTNER_EMAIL").ok();
        let password = env::var("PARTNER_PASSWORD").ok();
        match (email, password) {
            (Some(email), Some(password)) => Ok(Some(Self {
                base_url,
                email,
                password,
            })),
            _ => Err(ConfigError::IncompletePartnerCredentials),
        }
    }
}

/// Endpoint of the profile-scraping collaborator triggered before each
/// directory query. Optional and best-effort.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub endpoint: String,
}

impl ScraperConfig {
    fn from_env() -> Option<Self> {
        env::var("SCRAPER_ENDPOINT")
            .ok()
            .filter(|endpoint| !endpoint.trim().is_empty())
            .map(|endpoint| Self { endpoint })
    }
}

fn parse_env_number<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingOpenAiKey,
    InvalidNumber { key: &'static str },
    InvalidThreshold { raw: String },
    IncompletePartnerCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingOpenAiKey => {
                write!(f, "OPENAI_API_KEY must be set for the inference client")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidThreshold { raw } => {
                write!(f, "MATCH_SCORE_THRESHOLD '{raw}' must be a number between 0 and 10")
            }
            ConfigError::IncompletePartnerCredentials => {
                write!(
                    f,
                    "PARTNER_BASE_URL is set but PARTNER_EMAIL/PARTNER_PASSWORD are missing"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
