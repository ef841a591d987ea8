use std::collections::HashMap;

use async_trait::async_trait;

use super::domain::{CandidateDetail, CandidateRecord, SearchCriteria};

/// Boundary to the candidate store. The core treats `search` as a pure
/// function from criteria to a bounded candidate set and makes no retry
/// attempts: the store opens a short-lived connection per query and a
/// failure there surfaces to the caller as service-unavailable.
#[async_trait]
pub trait CandidateDirectory: Send + Sync {
    /// Candidates matching the criteria. An empty keyword list or location
    /// set relaxes that dimension of the filter.
    async fn search(&self, criteria: &SearchCriteria)
        -> Result<Vec<CandidateRecord>, DirectoryError>;

    /// Richer per-candidate detail for reconciliation. Best-effort: ids
    /// without detail are simply absent from the map.
    async fn details(&self, ids: &[i64]) -> Result<HashMap<i64, CandidateDetail>, DirectoryError>;
}

/// Error enumeration for directory failures.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("candidate store unavailable: {0}")]
    Unavailable(String),
    #[error("directory query failed: {0}")]
    Query(String),
}
