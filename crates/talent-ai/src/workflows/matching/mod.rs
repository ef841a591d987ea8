//! Candidate-matching batch pipeline.
//!
//! Stages, in data-flow order: [`CriteriaExtractor`] turns vacancy text
//! into [`SearchCriteria`]; a [`CandidateDirectory`] returns the bounded
//! candidate set; [`BatchRequestBuilder`] renders one scoring request per
//! candidate; [`BatchJobManager`] uploads, submits, and polls the remote
//! batch job; [`ResultReconciler`] turns the raw result lines into ranked
//! candidates; [`ResultSink`] persists the artifact and forwards it to the
//! partner API. [`MatchingService`] wires the stages together behind the
//! HTTP router.

pub mod batch;
pub mod criteria;
pub mod directory;
pub mod domain;
pub mod ingest;
pub mod locations;
pub mod reconcile;
pub mod router;
pub mod service;
pub mod sink;

pub use batch::{
    BatchError, BatchEvaluationRequest, BatchJobManager, BatchMetadata, BatchRequestBuilder,
    PollPolicy,
};
pub use criteria::CriteriaExtractor;
pub use directory::{CandidateDirectory, DirectoryError};
pub use domain::{
    BatchSubmission, CandidateDetail, CandidateEvaluation, CandidateRecord, MatchArtifact,
    RankedCandidate, SearchCriteria, VacancyRequest,
};
pub use ingest::{IngestError, NoopIngestor, ProfileIngestor, ScraperIngestor};
pub use locations::{expand_locations, LocationCode, Region};
pub use reconcile::{ResultReconciler, ScoreThreshold};
pub use router::matching_router;
pub use service::{MatchingError, MatchingService};
pub use sink::{read_artifact, HrBaseGateway, PartnerError, PartnerGateway, ResultSink, SinkError};
