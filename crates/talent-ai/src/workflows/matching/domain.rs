use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::locations::LocationCode;
use crate::openai::BatchStatus;

/// Immutable input of one matching run.
#[derive(Debug, Clone, Deserialize)]
pub struct VacancyRequest {
    pub vacancy_id: i64,
    pub vacancy_text: String,
}

/// Structured search criteria derived once from a vacancy description.
/// Empty keywords/locations mean "search everything".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchCriteria {
    pub keywords: Vec<String>,
    pub locations: BTreeSet<LocationCode>,
    pub requires_target_language: bool,
}

impl Default for SearchCriteria {
    /// The degraded-mode criteria: no filters, language requirement on.
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            locations: BTreeSet::new(),
            requires_target_language: true,
        }
    }
}

impl SearchCriteria {
    /// Comma-joined geo identifiers, the shape the directory and scraper
    /// collaborators take their location filter in.
    pub fn geo_filter(&self) -> String {
        self.locations
            .iter()
            .map(|code| code.geo_id())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// A candidate profile as sourced from the directory. Immutable once
/// fetched; `profile_text` is the denormalized multi-field biography the
/// rubric scores against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: i64,
    pub profile_text: String,
    pub profile_url: Option<String>,
    pub full_name: Option<String>,
}

/// One successfully parsed scoring result.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEvaluation {
    pub candidate_id: i64,
    pub score: f64,
    pub reasoning: String,
}

/// Collaborator-sourced enrichment keyed by candidate id. Fields the core
/// record does not model land in `extra` instead of being grafted onto it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub full_name: Option<String>,
    pub profile_url: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, Value>,
}

/// Externally visible ranked entry; serializes with the partner API's
/// field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub name: String,
    pub source_id: String,
    pub source_url: String,
    pub source_type: String,
    pub vacancy_id: i64,
    pub info: RankedCandidateInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidateInfo {
    pub score: f64,
    pub reasoning: String,
}

/// The persisted/forwarded payload: ranked candidates, score-descending,
/// capped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArtifact {
    pub candidates: Vec<RankedCandidate>,
}

/// Initial response of a submission: the remote job id plus the status
/// observed right after creation.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSubmission {
    pub batch_id: String,
    pub status: BatchStatus,
}
