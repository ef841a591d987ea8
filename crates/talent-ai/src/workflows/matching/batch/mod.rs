//! Batch payload construction and remote job lifecycle.

mod builder;
mod manager;

pub use builder::{parse_candidate_id, BatchEvaluationRequest, BatchRequestBuilder};
pub use manager::{BatchError, BatchJobManager, BatchMetadata, PollPolicy};
