use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use talent_ai::error::AppError;
use talent_ai::workflows::matching::{
    CandidateDetail, CandidateDirectory, CandidateRecord, DirectoryError, IngestError,
    NoopIngestor, ProfileIngestor, ScraperIngestor, SearchCriteria,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Candidate store backing the service when no external database is
/// wired in. Seeded from a JSON file at startup or filled through the
/// test helpers.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateDirectory {
    records: Arc<Mutex<Vec<CandidateRecord>>>,
    details: Arc<Mutex<HashMap<i64, CandidateDetail>>>,
}

impl InMemoryCandidateDirectory {
    pub(crate) fn from_seed_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let records: Vec<CandidateRecord> = serde_json::from_str(&raw)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        let directory = Self::default();
        directory
            .records
            .lock()
            .expect("directory mutex poisoned")
            .extend(records);
        Ok(directory)
    }

    #[cfg(test)]
    pub(crate) fn insert(&self, record: CandidateRecord) {
        self.records
            .lock()
            .expect("directory mutex poisoned")
            .push(record);
    }
}

#[async_trait]
impl CandidateDirectory for InMemoryCandidateDirectory {
    async fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<CandidateRecord>, DirectoryError> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        if criteria.keywords.is_empty() {
            return Ok(guard.clone());
        }

        let needles: Vec<String> = criteria
            .keywords
            .iter()
            .map(|keyword| keyword.to_lowercase())
            .collect();
        Ok(guard
            .iter()
            .filter(|record| {
                let haystack = record.profile_text.to_lowercase();
                needles.iter().any(|needle| haystack.contains(needle))
            })
            .cloned()
            .collect())
    }

    async fn details(&self, ids: &[i64]) -> Result<HashMap<i64, CandidateDetail>, DirectoryError> {
        let guard = self.details.lock().expect("directory mutex poisoned");
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(id).map(|detail| (*id, detail.clone())))
            .collect())
    }
}

/// Ingestor picked at startup from configuration. Keeps the service
/// generic over one concrete type whether or not a scraper endpoint is
/// configured.
#[derive(Clone)]
pub(crate) enum ConfiguredIngestor {
    Scraper(ScraperIngestor),
    Noop(NoopIngestor),
}

#[async_trait]
impl ProfileIngestor for ConfiguredIngestor {
    async fn request_profiles(
        &self,
        vacancy_id: i64,
        criteria: &SearchCriteria,
    ) -> Result<(), IngestError> {
        match self {
            ConfiguredIngestor::Scraper(inner) => {
                inner.request_profiles(vacancy_id, criteria).await
            }
            ConfiguredIngestor::Noop(inner) => inner.request_profiles(vacancy_id, criteria).await,
        }
    }
}
