//! Core library for the candidate-matching batch pipeline.
//!
//! A vacancy description comes in, structured search criteria come out of
//! the criteria extractor, the candidate directory returns a bounded
//! candidate set, and a batch of per-candidate scoring requests is handed
//! to the OpenAI Batch API. A detached monitor drives the remote job to a
//! terminal state, reconciles the returned evaluations with the submitted
//! candidates, and persists/forwards the ranked result.

pub mod config;
pub mod error;
pub mod openai;
pub mod telemetry;
pub mod workflows;
