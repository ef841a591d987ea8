//! Minimal OpenAI REST client covering the two surfaces the pipeline
//! needs: synchronous chat completions (criteria extraction) and the
//! Batch API (bulk candidate scoring).

mod client;
mod error;
pub mod types;

pub use client::OpenAIClient;
pub use error::OpenAIError;
pub use types::{BatchJob, BatchStatus, ChatRequest, Message, ResponseFormat};
