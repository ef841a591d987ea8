use std::collections::HashMap;
use std::sync::Arc;

use tracing::{error, info, warn};

use super::batch::{BatchError, BatchJobManager, BatchMetadata, BatchRequestBuilder};
use super::criteria::CriteriaExtractor;
use super::directory::{CandidateDirectory, DirectoryError};
use super::domain::{BatchSubmission, CandidateRecord, VacancyRequest};
use super::ingest::ProfileIngestor;
use super::reconcile::ResultReconciler;
use super::sink::{PartnerGateway, ResultSink};
use crate::openai::{BatchJob, BatchStatus, OpenAIError};

/// Error raised by the matching service's synchronous entry points.
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("no candidates found matching the specified criteria")]
    NoCandidates,
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Composes the pipeline stages. The submission path runs synchronously
/// up to batch creation; monitoring and reconciliation continue in a
/// detached task so the caller gets the batch id immediately.
pub struct MatchingService<D, I, P> {
    extractor: CriteriaExtractor,
    directory: Arc<D>,
    ingestor: Arc<I>,
    builder: BatchRequestBuilder,
    batch: BatchJobManager,
    reconciler: ResultReconciler,
    sink: ResultSink<P>,
}

impl<D, I, P> MatchingService<D, I, P>
where
    D: CandidateDirectory + 'static,
    I: ProfileIngestor + 'static,
    P: PartnerGateway + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: CriteriaExtractor,
        directory: Arc<D>,
        ingestor: Arc<I>,
        builder: BatchRequestBuilder,
        batch: BatchJobManager,
        reconciler: ResultReconciler,
        sink: ResultSink<P>,
    ) -> Self {
        Self {
            extractor,
            directory,
            ingestor,
            builder,
            batch,
            reconciler,
            sink,
        }
    }

    /// Run one matching submission: extract criteria, fetch candidates,
    /// upload and create the remote batch job, then hand monitoring to a
    /// background task. Returns the job id and its initial status.
    pub async fn submit(
        self: &Arc<Self>,
        request: VacancyRequest,
    ) -> Result<BatchSubmission, MatchingError> {
        let criteria = self.extractor.extract(&request.vacancy_text).await;
        if criteria.keywords.is_empty() {
            warn!(
                vacancy_id = request.vacancy_id,
                "no keywords extracted, proceeding without keyword filtering"
            );
        }

        // Fresh-profile ingestion is best-effort; the run continues on
        // whatever the directory already holds.
        if let Err(err) = self
            .ingestor
            .request_profiles(request.vacancy_id, &criteria)
            .await
        {
            info!(
                vacancy_id = request.vacancy_id,
                error = %err,
                "profile ingestion unavailable, continuing with stored candidates"
            );
        }

        let candidates = self.directory.search(&criteria).await?;
        if candidates.is_empty() {
            warn!(vacancy_id = request.vacancy_id, "no candidates matched the criteria");
            return Err(MatchingError::NoCandidates);
        }
        info!(
            vacancy_id = request.vacancy_id,
            candidates = candidates.len(),
            keywords = ?criteria.keywords,
            "candidates fetched for scoring"
        );

        let requests = self.builder.build(&request.vacancy_text, &candidates);
        let input_file_id = self.batch.upload(&requests).await?;

        let metadata = BatchMetadata {
            vacancy_id: request.vacancy_id,
            vacancy_text: request.vacancy_text.clone(),
            candidate_count: candidates.len(),
            keywords: criteria.keywords.clone(),
        };
        let batch_id = self.batch.submit(&input_file_id, metadata).await?;

        self.spawn_monitor(batch_id.clone(), candidates, request.vacancy_id);

        let status = match self.batch.status(&batch_id).await {
            Ok(job) => job.status,
            Err(err) => {
                warn!(%batch_id, error = %err, "could not read initial status, reporting pending");
                BatchStatus::Pending
            }
        };

        Ok(BatchSubmission { batch_id, status })
    }

    /// Remote status of a batch job, for the status endpoint.
    pub async fn batch_status(&self, batch_id: &str) -> Result<BatchJob, OpenAIError> {
        self.batch.status(batch_id).await
    }

    fn spawn_monitor(
        self: &Arc<Self>,
        batch_id: String,
        candidates: Vec<CandidateRecord>,
        vacancy_id: i64,
    ) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service
                .monitor_and_reconcile(&batch_id, &candidates, vacancy_id)
                .await;
        });
    }

    /// Body of the detached monitor task: drive the job to its terminal
    /// state, then reconcile and persist. Produces at most one outcome per
    /// batch job.
    pub async fn monitor_and_reconcile(
        &self,
        batch_id: &str,
        candidates: &[CandidateRecord],
        vacancy_id: i64,
    ) {
        info!(%batch_id, vacancy_id, candidates = candidates.len(), "monitor task started");

        match self.batch.monitor(batch_id).await {
            Ok(Some(raw)) => {
                let ids: Vec<i64> = candidates.iter().map(|c| c.id).collect();
                let details = match self.directory.details(&ids).await {
                    Ok(details) => details,
                    Err(err) => {
                        warn!(%batch_id, error = %err, "detail enrichment unavailable");
                        HashMap::new()
                    }
                };

                let ranked = self.reconciler.reconcile(&raw, candidates, vacancy_id, &details);
                match self.sink.persist_and_forward(ranked, vacancy_id).await {
                    Ok(Some(path)) => {
                        info!(%batch_id, path = %path.display(), "match results persisted")
                    }
                    Ok(None) => warn!(%batch_id, "no evaluations survived reconciliation"),
                    Err(err) => error!(%batch_id, error = %err, "failed to persist match results"),
                }
            }
            Ok(None) => {
                error!(%batch_id, vacancy_id, "batch ended without results, nothing persisted")
            }
            Err(err) => error!(%batch_id, vacancy_id, error = %err, "batch monitoring aborted"),
        }

        info!(%batch_id, "monitor task finished");
    }
}
