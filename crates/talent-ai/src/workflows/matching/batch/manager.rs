use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Local;
use tokio::time::sleep;
use tracing::{error, info, warn};

use super::builder::BatchEvaluationRequest;
use crate::openai::{BatchJob, BatchStatus, OpenAIClient, OpenAIError};

/// Audit metadata attached to every remote batch job.
#[derive(Debug, Clone)]
pub struct BatchMetadata {
    pub vacancy_id: i64,
    pub vacancy_text: String,
    pub candidate_count: usize,
    pub keywords: Vec<String>,
}

impl BatchMetadata {
    fn to_map(&self) -> BTreeMap<String, String> {
        let preview: String = self.vacancy_text.chars().take(100).collect();
        let mut map = BTreeMap::new();
        map.insert("vacancy_id".to_string(), self.vacancy_id.to_string());
        map.insert(
            "vacancy_description_preview".to_string(),
            format!("{preview}..."),
        );
        map.insert(
            "num_candidates_submitted".to_string(),
            self.candidate_count.to_string(),
        );
        map.insert(
            "keywords_used_for_filter".to_string(),
            if self.keywords.is_empty() {
                "None".to_string()
            } else {
                self.keywords.join(",")
            },
        );
        map
    }
}

/// Backoff tiers of the poll loop, encoded as data. Rate limits wait
/// longer than generic API errors; completely unexpected errors wait the
/// longest; `max_checks` bounds the whole loop so a job that never reaches
/// a terminal status is abandoned instead of polled forever.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub rate_limit_backoff: Duration,
    pub api_error_backoff: Duration,
    pub unexpected_backoff: Duration,
    pub max_checks: u32,
    pub upload_attempts: u32,
    pub upload_backoff: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            rate_limit_backoff: Duration::from_secs(90),
            api_error_backoff: Duration::from_secs(60),
            unexpected_backoff: Duration::from_secs(120),
            max_checks: 288,
            upload_attempts: 10,
            upload_backoff: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to serialize batch payload: {0}")]
    Serialize(String),
    #[error("failed to upload batch payload after {attempts} attempts: {last_error}")]
    Upload { attempts: u32, last_error: String },
    #[error("failed to create batch job: {0}")]
    Submit(#[source] OpenAIError),
    #[error("batch job abandoned after {checks} status checks")]
    Abandoned { checks: u32 },
    #[error("batch output could not be retrieved: {0}")]
    Output(String),
}

/// Owns the remote batch job lifecycle: upload of the rendered payload,
/// job creation, and the poll loop that drives the job to one terminal
/// outcome.
#[derive(Clone)]
pub struct BatchJobManager {
    client: OpenAIClient,
    completion_window: String,
    policy: PollPolicy,
}

impl BatchJobManager {
    pub fn new(client: OpenAIClient, completion_window: impl Into<String>, policy: PollPolicy) -> Self {
        Self {
            client,
            completion_window: completion_window.into(),
            policy,
        }
    }

    /// Serialize the batch one request per line and upload it, retrying
    /// transient failures with a jittered backoff. Exhausting the attempts
    /// is reported as an upload failure, never a panic.
    pub async fn upload(
        &self,
        requests: &[BatchEvaluationRequest],
    ) -> Result<String, BatchError> {
        let mut payload = String::new();
        for request in requests {
            let line = serde_json::to_string(request)
                .map_err(|err| BatchError::Serialize(err.to_string()))?;
            payload.push_str(&line);
            payload.push('\n');
        }
        let payload = payload.into_bytes();

        let file_name = format!(
            "batch_input_{}.jsonl",
            Local::now().format("%Y%m%d_%H%M%S")
        );

        let mut last_error = String::new();
        for attempt in 1..=self.policy.upload_attempts {
            match self
                .client
                .upload_batch_file(&file_name, payload.clone())
                .await
            {
                Ok(file_id) => {
                    info!(%file_id, requests = requests.len(), "batch payload uploaded");
                    return Ok(file_id);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "batch upload attempt failed");
                    last_error = err.to_string();
                    if attempt < self.policy.upload_attempts {
                        let jitter = fastrand::u32(1..=10);
                        sleep(self.policy.upload_backoff * jitter).await;
                    }
                }
            }
        }

        Err(BatchError::Upload {
            attempts: self.policy.upload_attempts,
            last_error,
        })
    }

    /// Create the remote batch job over an uploaded payload. Submission is
    /// not retried; a failure goes back to the caller.
    pub async fn submit(
        &self,
        input_file_id: &str,
        metadata: BatchMetadata,
    ) -> Result<String, BatchError> {
        let metadata_map = metadata.to_map();
        let job = self
            .client
            .create_batch(input_file_id, &self.completion_window, metadata_map)
            .await
            .map_err(BatchError::Submit)?;
        info!(batch_id = %job.id, "batch job created");
        Ok(job.id)
    }

    /// Current remote status of a batch job.
    pub async fn status(&self, batch_id: &str) -> Result<BatchJob, OpenAIError> {
        self.client.retrieve_batch(batch_id).await
    }

    /// Poll the job to a terminal status. Returns `Ok(Some(content))`
    /// exactly once when the job completes with an output file,
    /// `Ok(None)` when it ends without output (terminal failure, or
    /// completed with no output reference), and `Err(Abandoned)` when the
    /// check budget runs out. Performs no work after observing a terminal
    /// status.
    pub async fn monitor(&self, batch_id: &str) -> Result<Option<String>, BatchError> {
        let mut checks: u32 = 0;

        loop {
            if checks >= self.policy.max_checks {
                error!(%batch_id, checks, "batch job never reached a terminal status, abandoning");
                return Err(BatchError::Abandoned { checks });
            }
            checks += 1;

            match self.client.retrieve_batch(batch_id).await {
                Ok(job) => {
                    info!(%batch_id, status = job.status.as_str(), checks, "batch job status");
                    match job.status {
                        BatchStatus::Completed => {
                            return self.fetch_output(batch_id, job.output_file_id).await;
                        }
                        BatchStatus::Failed | BatchStatus::Cancelled | BatchStatus::Expired => {
                            error!(
                                %batch_id,
                                status = job.status.as_str(),
                                errors = ?job.errors,
                                "batch job ended without results"
                            );
                            return Ok(None);
                        }
                        BatchStatus::Pending | BatchStatus::InProgress => {
                            sleep(self.policy.interval).await;
                        }
                    }
                }
                Err(OpenAIError::RateLimited(message)) => {
                    warn!(%batch_id, %message, "rate limited while polling, backing off");
                    sleep(self.policy.rate_limit_backoff).await;
                }
                Err(err @ (OpenAIError::Api { .. } | OpenAIError::NotFound(_))) => {
                    error!(%batch_id, error = %err, "API error while polling, backing off");
                    sleep(self.policy.api_error_backoff).await;
                }
                Err(err) => {
                    error!(%batch_id, error = %err, "unexpected error while polling, backing off");
                    sleep(self.policy.unexpected_backoff).await;
                }
            }
        }
    }

    async fn fetch_output(
        &self,
        batch_id: &str,
        output_file_id: Option<String>,
    ) -> Result<Option<String>, BatchError> {
        let Some(file_id) = output_file_id else {
            warn!(%batch_id, "batch job completed but carries no output file");
            return Ok(None);
        };

        match self.client.file_content(&file_id).await {
            Ok(content) => {
                info!(%batch_id, %file_id, bytes = content.len(), "batch results downloaded");
                Ok(Some(content))
            }
            Err(err) => Err(BatchError::Output(err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_truncates_preview_and_joins_keywords() {
        let metadata = BatchMetadata {
            vacancy_id: 9,
            vacancy_text: "x".repeat(250),
            candidate_count: 3,
            keywords: vec!["rust".to_string(), "tokio".to_string()],
        };
        let map = metadata.to_map();
        assert_eq!(map["vacancy_id"], "9");
        assert_eq!(map["num_candidates_submitted"], "3");
        assert_eq!(map["keywords_used_for_filter"], "rust,tokio");
        assert_eq!(map["vacancy_description_preview"].chars().count(), 103);
    }

    #[test]
    fn empty_keyword_filter_is_labelled() {
        let metadata = BatchMetadata {
            vacancy_id: 1,
            vacancy_text: "short".to_string(),
            candidate_count: 0,
            keywords: Vec::new(),
        };
        assert_eq!(metadata.to_map()["keywords_used_for_filter"], "None");
    }

    #[test]
    fn default_policy_orders_backoff_tiers() {
        let policy = PollPolicy::default();
        assert!(policy.rate_limit_backoff > policy.api_error_backoff);
        assert!(policy.unexpected_backoff > policy.rate_limit_backoff);
        assert!(policy.max_checks > 0);
    }
}
