use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response format declaration: plain JSON mode or a schema-constrained
/// structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonObject,
    JsonSchema { json_schema: Value },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    pub choices: Vec<ChoiceRaw>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceRaw {
    pub message: ChoiceMessageRaw,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessageRaw {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileObject {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateBatchRequest<'a> {
    pub input_file_id: &'a str,
    pub endpoint: &'a str,
    pub completion_window: &'a str,
    pub metadata: BTreeMap<String, String>,
}

/// Lifecycle of a remote batch job. The remote service reports a few more
/// phases than the pipeline cares about; they collapse onto this set, and
/// an unrecognized phase keeps the job in `Pending` so polling continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
}

impl BatchStatus {
    pub fn from_remote(raw: &str) -> Self {
        match raw {
            "validating" | "pending" => Self::Pending,
            "in_progress" | "finalizing" | "cancelling" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            "expired" => Self::Expired,
            _ => Self::Pending,
        }
    }

    /// No transition leaves a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl<'de> Deserialize<'de> for BatchStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_remote(&raw))
    }
}

/// Remote batch job as reported by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct BatchJob {
    pub id: String,
    pub status: BatchStatus,
    #[serde(default)]
    pub output_file_id: Option<String>,
    #[serde(default)]
    pub errors: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_phases_collapse_onto_lifecycle() {
        assert_eq!(BatchStatus::from_remote("validating"), BatchStatus::Pending);
        assert_eq!(
            BatchStatus::from_remote("finalizing"),
            BatchStatus::InProgress
        );
        assert_eq!(
            BatchStatus::from_remote("completed"),
            BatchStatus::Completed
        );
        assert_eq!(BatchStatus::from_remote("expired"), BatchStatus::Expired);
        // Unknown phases keep the poll loop alive.
        assert_eq!(
            BatchStatus::from_remote("some_new_phase"),
            BatchStatus::Pending
        );
    }

    #[test]
    fn terminal_statuses_are_exactly_four() {
        for status in [
            BatchStatus::Completed,
            BatchStatus::Failed,
            BatchStatus::Cancelled,
            BatchStatus::Expired,
        ] {
            assert!(status.is_terminal());
        }
        assert!(!BatchStatus::Pending.is_terminal());
        assert!(!BatchStatus::InProgress.is_terminal());
    }

    #[test]
    fn batch_job_deserializes_from_remote_payload() {
        let job: BatchJob = serde_json::from_str(
            r#"{"id":"batch_abc","status":"in_progress","output_file_id":null}"#,
        )
        .expect("valid payload");
        assert_eq!(job.id, "batch_abc");
        assert_eq!(job.status, BatchStatus::InProgress);
        assert!(job.output_file_id.is_none());
    }
}
