use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use serde::Deserialize;
use tracing::{error, info, warn};

use super::domain::{MatchArtifact, RankedCandidate};
use crate::config::PartnerConfig;

/// Outbound boundary to the downstream partner API. Takes the full
/// artifact so a forward can be re-run later from the persisted file
/// alone.
#[async_trait]
pub trait PartnerGateway: Send + Sync {
    async fn forward(&self, artifact: &MatchArtifact) -> Result<(), PartnerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PartnerError {
    #[error("partner authentication failed: {0}")]
    Auth(String),
    #[error("partner transport error: {0}")]
    Transport(String),
    #[error("partner rejected payload (status {0})")]
    Rejected(u16),
}

#[derive(Debug, Deserialize)]
struct PartnerLoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Partner client: credential exchange for a bearer token, then a bulk
/// create carrying the candidate array.
#[derive(Clone)]
pub struct HrBaseGateway {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: String,
}

impl HrBaseGateway {
    pub fn new(config: &PartnerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            password: config.password.clone(),
        }
    }

    async fn login(&self) -> Result<String, PartnerError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .form(&[("email", &self.email), ("password", &self.password)])
            .send()
            .await
            .map_err(|err| PartnerError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(PartnerError::Auth(format!(
                "login returned status {}",
                response.status()
            )));
        }

        let login: PartnerLoginResponse = response
            .json()
            .await
            .map_err(|err| PartnerError::Auth(err.to_string()))?;
        Ok(login.access_token)
    }
}

#[async_trait]
impl PartnerGateway for HrBaseGateway {
    async fn forward(&self, artifact: &MatchArtifact) -> Result<(), PartnerError> {
        let token = self.login().await?;

        let response = self
            .http
            .post(format!("{}/imported-candidates/bulk-create", self.base_url))
            .bearer_auth(token)
            .json(artifact)
            .send()
            .await
            .map_err(|err| PartnerError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(PartnerError::Rejected(response.status().as_u16()));
        }

        info!(
            candidates = artifact.candidates.len(),
            "candidates forwarded to partner API"
        );
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to persist artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize artifact: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists the ranked output as a timestamp-qualified JSON artifact and
/// forwards it downstream. The two side effects are independent:
/// forwarding failure never invalidates the local artifact.
pub struct ResultSink<P> {
    output_dir: PathBuf,
    partner: Option<Arc<P>>,
}

impl<P: PartnerGateway> ResultSink<P> {
    pub fn new(output_dir: impl Into<PathBuf>, partner: Option<Arc<P>>) -> Self {
        Self {
            output_dir: output_dir.into(),
            partner,
        }
    }

    /// Persist then forward, best-effort. `Ok(None)` when there was
    /// nothing to save.
    pub async fn persist_and_forward(
        &self,
        ranked: Vec<RankedCandidate>,
        vacancy_id: i64,
    ) -> Result<Option<PathBuf>, SinkError> {
        if ranked.is_empty() {
            warn!(vacancy_id, "no ranked candidates to persist");
            return Ok(None);
        }

        let artifact = MatchArtifact { candidates: ranked };
        let path = self.write_artifact(&artifact)?;
        info!(vacancy_id, path = %path.display(), "match artifact persisted");

        if let Some(partner) = &self.partner {
            match partner.forward(&artifact).await {
                Ok(()) => info!(vacancy_id, "match artifact forwarded"),
                Err(err) => {
                    // Local artifact stays valid; the forward can be
                    // re-run from it.
                    error!(vacancy_id, error = %err, "forwarding failed, keeping local artifact");
                }
            }
        }

        Ok(Some(path))
    }

    fn write_artifact(&self, artifact: &MatchArtifact) -> Result<PathBuf, SinkError> {
        std::fs::create_dir_all(&self.output_dir)?;
        let filename = format!(
            "candidate_scores_{}.json",
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.output_dir.join(filename);
        let json = serde_json::to_string_pretty(artifact)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Read a persisted artifact back, e.g. to re-run a forward.
pub fn read_artifact(path: &Path) -> Result<MatchArtifact, SinkError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
