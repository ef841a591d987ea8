use std::collections::BTreeMap;

use reqwest::multipart;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::error::OpenAIError;
use super::types::{
    BatchJob, ChatRequest, ChatResponseRaw, CreateBatchRequest, FileObject,
};
use crate::config::OpenAiConfig;

/// Process-wide, stateless request handle. Cloning is cheap and safe for
/// concurrent use by multiple in-flight matching runs.
#[derive(Clone)]
pub struct OpenAIClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            http: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Override the API endpoint, e.g. for proxies or a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// One chat completion call; returns the first choice's content.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<String, OpenAIError> {
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|err| OpenAIError::Network(err.to_string()))?;
        let response = Self::check(response).await?;

        let parsed: ChatResponseRaw = response
            .json()
            .await
            .map_err(|err| OpenAIError::Parse(err.to_string()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis(),
            "chat completion"
        );

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| OpenAIError::Parse("response carried no choices".to_string()))
    }

    /// Upload a JSONL payload for batch processing; returns the file id.
    pub async fn upload_batch_file(
        &self,
        file_name: &str,
        payload: Vec<u8>,
    ) -> Result<String, OpenAIError> {
        let part = multipart::Part::bytes(payload)
            .file_name(file_name.to_string())
            .mime_str("application/jsonl")
            .map_err(|err| OpenAIError::Parse(err.to_string()))?;
        let form = multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|err| OpenAIError::Network(err.to_string()))?;
        let response = Self::check(response).await?;

        let file: FileObject = response
            .json()
            .await
            .map_err(|err| OpenAIError::Parse(err.to_string()))?;
        Ok(file.id)
    }

    /// Create a batch job over an uploaded input file.
    pub async fn create_batch(
        &self,
        input_file_id: &str,
        completion_window: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<BatchJob, OpenAIError> {
        let request = CreateBatchRequest {
            input_file_id,
            endpoint: "/v1/chat/completions",
            completion_window,
            metadata,
        };

        let response = self
            .http
            .post(format!("{}/batches", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| OpenAIError::Network(err.to_string()))?;
        let response = Self::check(response).await?;

        response
            .json()
            .await
            .map_err(|err| OpenAIError::Parse(err.to_string()))
    }

    /// Current state of a batch job.
    pub async fn retrieve_batch(&self, batch_id: &str) -> Result<BatchJob, OpenAIError> {
        let response = self
            .http
            .get(format!("{}/batches/{batch_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| OpenAIError::Network(err.to_string()))?;
        let response = Self::check(response).await?;

        response
            .json()
            .await
            .map_err(|err| OpenAIError::Parse(err.to_string()))
    }

    /// Download a result file as text (one JSON record per line).
    pub async fn file_content(&self, file_id: &str) -> Result<String, OpenAIError> {
        let response = self
            .http
            .get(format!("{}/files/{file_id}/content", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|err| OpenAIError::Network(err.to_string()))?;
        let response = Self::check(response).await?;

        response
            .text()
            .await
            .map_err(|err| OpenAIError::Network(err.to_string()))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, OpenAIError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!(status = %status, error = %message, "OpenAI API error");
        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => OpenAIError::RateLimited(message),
            StatusCode::NOT_FOUND => OpenAIError::NotFound(message),
            _ => OpenAIError::Api {
                status: status.as_u16(),
                message,
            },
        })
    }
}
