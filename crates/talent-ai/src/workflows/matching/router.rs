use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info};

use super::directory::{CandidateDirectory, DirectoryError};
use super::domain::{BatchSubmission, VacancyRequest};
use super::ingest::ProfileIngestor;
use super::service::{MatchingError, MatchingService};
use super::sink::PartnerGateway;
use crate::openai::OpenAIError;

/// Router builder exposing the submission and status endpoints.
pub fn matching_router<D, I, P>(service: Arc<MatchingService<D, I, P>>) -> Router
where
    D: CandidateDirectory + 'static,
    I: ProfileIngestor + 'static,
    P: PartnerGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/matching/candidates",
            post(submit_handler::<D, I, P>),
        )
        .route(
            "/api/v1/matching/batches/:batch_id",
            get(status_handler::<D, I, P>),
        )
        .with_state(service)
}

/// Accepts a vacancy, kicks off the batch, and returns 202 with the job
/// id while monitoring continues in the background.
pub(crate) async fn submit_handler<D, I, P>(
    State(service): State<Arc<MatchingService<D, I, P>>>,
    Json(request): Json<VacancyRequest>,
) -> Response
where
    D: CandidateDirectory + 'static,
    I: ProfileIngestor + 'static,
    P: PartnerGateway + 'static,
{
    info!(vacancy_id = request.vacancy_id, "matching submission received");
    match service.submit(request).await {
        Ok(submission) => (StatusCode::ACCEPTED, Json(submission)).into_response(),
        Err(MatchingError::NoCandidates) => {
            let payload = json!({
                "error": "no candidates found matching the specified criteria",
            });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(MatchingError::Directory(DirectoryError::Unavailable(message))) => {
            error!(%message, "candidate store unavailable");
            let payload = json!({ "error": "candidate store unavailable" });
            (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
        }
        Err(other) => {
            error!(error = %other, "matching submission failed");
            let payload = json!({
                "error": format!("an internal server error occurred: {other}"),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}

/// Reports the remote status of a batch job.
pub(crate) async fn status_handler<D, I, P>(
    State(service): State<Arc<MatchingService<D, I, P>>>,
    Path(batch_id): Path<String>,
) -> Response
where
    D: CandidateDirectory + 'static,
    I: ProfileIngestor + 'static,
    P: PartnerGateway + 'static,
{
    match service.batch_status(&batch_id).await {
        Ok(job) => {
            let view = BatchSubmission {
                batch_id: job.id,
                status: job.status,
            };
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(OpenAIError::NotFound(_)) => {
            let payload = json!({ "error": format!("batch job {batch_id} not found") });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Err(err) => {
            // Internal detail stays in the logs.
            error!(%batch_id, error = %err, "failed to retrieve batch job status");
            let payload = json!({ "error": "error retrieving batch job status" });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
        }
    }
}
