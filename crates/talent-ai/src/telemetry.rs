use crate::config::{AppEnvironment, TelemetryConfig};
use std::fmt;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
pub enum TelemetryError {
    EnvFilter { value: String, source: ParseError },
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::EnvFilter { value, .. } => {
                write!(f, "invalid log level/filter '{value}': unable to build EnvFilter")
            }
            TelemetryError::Subscriber(err) => write!(f, "telemetry error: {err}"),
        }
    }
}

impl std::error::Error for TelemetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelemetryError::EnvFilter { source, .. } => Some(source),
            TelemetryError::Subscriber(err) => Some(&**err),
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level; production output is compact and ansi-free for log shippers,
/// everything else keeps targets and color for local debugging.
pub fn init(
    config: &TelemetryConfig,
    environment: AppEnvironment,
) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => filter_from_level(&config.log_level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);
    match environment {
        AppEnvironment::Production => builder
            .with_target(false)
            .compact()
            .with_ansi(false)
            .try_init(),
        AppEnvironment::Development | AppEnvironment::Test => {
            builder.with_target(true).try_init()
        }
    }
    .map_err(TelemetryError::Subscriber)
}

fn filter_from_level(value: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(value).map_err(|source| TelemetryError::EnvFilter {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_builds_a_filter() {
        assert!(filter_from_level("talent_ai=debug,info").is_ok());
    }

    #[test]
    fn malformed_level_is_reported_with_its_value() {
        let err = filter_from_level("not==a==filter").expect_err("filter must fail");
        match err {
            TelemetryError::EnvFilter { value, .. } => assert_eq!(value, "not==a==filter"),
            other => panic!("expected EnvFilter error, got {other:?}"),
        }
    }
}
