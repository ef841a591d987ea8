use thiserror::Error;

/// Errors from the OpenAI REST client. Rate limits and unknown resources
/// get their own variants because the poll loop and the status endpoint
/// react to them differently.
#[derive(Debug, Error)]
pub enum OpenAIError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}
