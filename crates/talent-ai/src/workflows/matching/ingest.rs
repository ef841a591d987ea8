use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::domain::SearchCriteria;
use crate::config::ScraperConfig;

/// Hook for the profile-scraping collaborator fired before each directory
/// query so freshly scraped profiles can land in the store. Strictly
/// best-effort: the pipeline proceeds whether or not this call succeeds.
#[async_trait]
pub trait ProfileIngestor: Send + Sync {
    async fn request_profiles(
        &self,
        vacancy_id: i64,
        criteria: &SearchCriteria,
    ) -> Result<(), IngestError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("scraper request failed: {0}")]
    Transport(String),
    #[error("scraper rejected the request (status {0})")]
    Rejected(u16),
}

/// Ingestor that does nothing; used when no scraper endpoint is
/// configured and in tests.
#[derive(Debug, Default, Clone)]
pub struct NoopIngestor;

#[async_trait]
impl ProfileIngestor for NoopIngestor {
    async fn request_profiles(
        &self,
        _vacancy_id: i64,
        _criteria: &SearchCriteria,
    ) -> Result<(), IngestError> {
        Ok(())
    }
}

/// HTTP ingestor posting the scraper's querystring payload: vacancy id,
/// keywords, a start cursor, and the comma-joined geo filter.
#[derive(Clone)]
pub struct ScraperIngestor {
    http: reqwest::Client,
    endpoint: String,
}

impl ScraperIngestor {
    pub fn new(config: &ScraperConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl ProfileIngestor for ScraperIngestor {
    async fn request_profiles(
        &self,
        vacancy_id: i64,
        criteria: &SearchCriteria,
    ) -> Result<(), IngestError> {
        let payload = json!([{
            "vacancy_id": vacancy_id.to_string(),
            "keywords": criteria.keywords,
            "start": "0",
            "geo": criteria.geo_filter(),
        }]);
        debug!(%vacancy_id, payload = %payload, "requesting profile ingestion");

        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("querystring", payload.to_string())])
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|err| IngestError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(IngestError::Rejected(response.status().as_u16()));
        }

        info!(%vacancy_id, "profile ingestion requested");
        Ok(())
    }
}
