//! Integration specifications for the candidate matching pipeline.
//!
//! Scenarios drive the public service facade and HTTP router against a
//! local stub of the scoring API, so submission, polling, reconciliation,
//! and persistence are validated end to end without leaving the process.

mod common {
    use std::collections::{HashMap, VecDeque};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::extract::{Path as AxumPath, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use talent_ai::config::OpenAiConfig;
    use talent_ai::openai::OpenAIClient;
    use talent_ai::workflows::matching::{
        BatchJobManager, BatchRequestBuilder, CandidateDetail, CandidateDirectory,
        CandidateRecord, CriteriaExtractor, DirectoryError, MatchArtifact, MatchingService,
        NoopIngestor, PartnerError, PartnerGateway, PollPolicy, ResultReconciler, ResultSink,
        ScoreThreshold, SearchCriteria,
    };

    /// Stub of the scoring API. Batch status responses are scripted: each
    /// poll consumes the next phase, and the last one repeats.
    pub(super) struct StubScoringApi {
        phases: Mutex<VecDeque<String>>,
        output: String,
    }

    impl StubScoringApi {
        /// Serve the stub on an ephemeral port and return the base URL.
        pub(super) async fn spawn(phases: &[&str], output: &str) -> String {
            let state = Arc::new(StubScoringApi {
                phases: Mutex::new(phases.iter().map(|p| p.to_string()).collect()),
                output: output.to_string(),
            });
            let app = Router::new()
                .route("/v1/chat/completions", post(chat_completions))
                .route("/v1/files", post(upload_file))
                .route("/v1/batches", post(create_batch))
                .route("/v1/batches/:batch_id", get(batch_status))
                .route("/v1/files/:file_id/content", get(file_content))
                .with_state(state);

            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("stub binds");
            let addr = listener.local_addr().expect("stub addr");
            tokio::spawn(async move {
                axum::serve(listener, app).await.ok();
            });
            format!("http://{addr}/v1")
        }
    }

    async fn chat_completions() -> Json<serde_json::Value> {
        let extraction = json!({
            "keywords": ["rust", "backend"],
            "locations": [],
            "requires_target_language": true,
            "explanation": "stub"
        });
        Json(json!({
            "choices": [ { "message": { "content": extraction.to_string() } } ]
        }))
    }

    async fn upload_file() -> Json<serde_json::Value> {
        Json(json!({ "id": "file-in" }))
    }

    async fn create_batch() -> Json<serde_json::Value> {
        Json(json!({ "id": "batch_1", "status": "validating" }))
    }

    async fn batch_status(
        State(state): State<Arc<StubScoringApi>>,
        AxumPath(batch_id): AxumPath<String>,
    ) -> impl IntoResponse {
        if batch_id == "batch_missing" {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "no such batch" })))
                .into_response();
        }

        let mut guard = state.phases.lock().expect("phase mutex poisoned");
        let phase = if guard.len() > 1 {
            guard.pop_front().expect("phase present")
        } else {
            guard
                .front()
                .cloned()
                .unwrap_or_else(|| "completed".to_string())
        };

        let output_file_id = if phase == "completed" {
            json!("file-out")
        } else {
            json!(null)
        };
        Json(json!({
            "id": batch_id,
            "status": phase,
            "output_file_id": output_file_id
        }))
        .into_response()
    }

    async fn file_content(State(state): State<Arc<StubScoringApi>>) -> String {
        state.output.clone()
    }

    #[derive(Default)]
    pub(super) struct MemoryDirectory {
        pub(super) records: Vec<CandidateRecord>,
        pub(super) details: HashMap<i64, CandidateDetail>,
    }

    #[async_trait]
    impl CandidateDirectory for MemoryDirectory {
        async fn search(
            &self,
            _criteria: &SearchCriteria,
        ) -> Result<Vec<CandidateRecord>, DirectoryError> {
            Ok(self.records.clone())
        }

        async fn details(
            &self,
            ids: &[i64],
        ) -> Result<HashMap<i64, CandidateDetail>, DirectoryError> {
            Ok(ids
                .iter()
                .filter_map(|id| self.details.get(id).map(|d| (*id, d.clone())))
                .collect())
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingPartner {
        pub(super) forwarded: Mutex<Vec<MatchArtifact>>,
    }

    #[async_trait]
    impl PartnerGateway for RecordingPartner {
        async fn forward(&self, artifact: &MatchArtifact) -> Result<(), PartnerError> {
            self.forwarded
                .lock()
                .expect("partner mutex poisoned")
                .push(artifact.clone());
            Ok(())
        }
    }

    pub(super) fn candidate(id: i64) -> CandidateRecord {
        CandidateRecord {
            id,
            profile_text: format!("Rust backend engineer {id}"),
            profile_url: Some(format!("https://linkedin.com/in/c{id}")),
            full_name: Some(format!("Candidate {id}")),
        }
    }

    pub(super) fn result_line(id: i64, score: f64) -> String {
        let content = json!({ "score": score, "reasoning": "stub fit" }).to_string();
        json!({
            "custom_id": format!("candidate_{id}"),
            "response": { "body": { "choices": [ { "message": { "content": content } } ] } }
        })
        .to_string()
    }

    pub(super) fn scratch_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "talent-ai-workflow-{tag}-{}-{}",
            std::process::id(),
            fastrand::u64(..)
        ))
    }

    pub(super) fn build_service(
        base_url: &str,
        output_dir: &Path,
        records: Vec<CandidateRecord>,
        partner: Option<Arc<RecordingPartner>>,
    ) -> Arc<MatchingService<MemoryDirectory, NoopIngestor, RecordingPartner>> {
        let client = OpenAIClient::new(&OpenAiConfig {
            api_key: "sk-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            base_url: base_url.to_string(),
        });

        let policy = PollPolicy {
            interval: Duration::from_millis(10),
            rate_limit_backoff: Duration::from_millis(10),
            api_error_backoff: Duration::from_millis(10),
            unexpected_backoff: Duration::from_millis(10),
            max_checks: 20,
            upload_attempts: 2,
            upload_backoff: Duration::from_millis(5),
        };

        Arc::new(MatchingService::new(
            CriteriaExtractor::new(client.clone(), "gpt-4o-mini", 5),
            Arc::new(MemoryDirectory {
                records,
                details: HashMap::new(),
            }),
            Arc::new(NoopIngestor),
            BatchRequestBuilder::new("gpt-4o-mini"),
            BatchJobManager::new(client, "24h", policy),
            ResultReconciler::new(ScoreThreshold::KeepAll, 50),
            ResultSink::new(output_dir, partner),
        ))
    }

    /// Wait for the background monitor to drop an artifact into the
    /// output directory.
    pub(super) async fn wait_for_artifact(dir: &Path) -> Option<PathBuf> {
        for _ in 0..200 {
            if let Ok(entries) = std::fs::read_dir(dir) {
                if let Some(entry) = entries.flatten().next() {
                    return Some(entry.path());
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        None
    }
}

mod submission {
    use super::common::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use talent_ai::workflows::matching::{matching_router, read_artifact};
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn pipeline_runs_from_submission_to_ranked_artifact() {
        let output = [result_line(1, 6.5), result_line(2, 9.0)].join("\n");
        let base_url = StubScoringApi::spawn(&["in_progress", "completed"], &output).await;
        let dir = scratch_dir("pipeline");
        let partner = Arc::new(RecordingPartner::default());
        let service = build_service(
            &base_url,
            &dir,
            vec![candidate(1), candidate(2)],
            Some(partner.clone()),
        );

        let app = matching_router(service);
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/matching/candidates")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"vacancy_id": 7, "vacancy_text": "Senior Rust backend engineer"}"#,
            ))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let submission: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(submission["batch_id"], "batch_1");

        let path = wait_for_artifact(&dir).await.expect("artifact written");
        let artifact = read_artifact(&path).expect("artifact reads back");
        assert_eq!(artifact.candidates.len(), 2);
        assert_eq!(artifact.candidates[0].source_id, "2");
        assert_eq!(artifact.candidates[0].info.score, 9.0);
        assert_eq!(artifact.candidates[1].source_id, "1");

        let forwarded = partner.forwarded.lock().expect("partner mutex poisoned");
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].candidates.len(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn empty_candidate_set_is_reported_not_submitted() {
        let base_url = StubScoringApi::spawn(&["completed"], "").await;
        let dir = scratch_dir("empty");
        let service = build_service(&base_url, &dir, Vec::new(), None);

        let app = matching_router(service);
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/matching/candidates")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"vacancy_id": 7, "vacancy_text": "Obscure role"}"#,
            ))
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!dir.exists());
    }
}

mod monitoring {
    use super::common::*;

    #[tokio::test]
    async fn failed_batch_produces_no_artifact() {
        let base_url = StubScoringApi::spawn(&["in_progress", "failed"], "").await;
        let dir = scratch_dir("failed");
        let service = build_service(&base_url, &dir, vec![candidate(1)], None);

        let candidates = vec![candidate(1)];
        service
            .monitor_and_reconcile("batch_1", &candidates, 7)
            .await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn job_stuck_before_terminal_status_is_abandoned() {
        let base_url = StubScoringApi::spawn(&["in_progress"], "").await;
        let dir = scratch_dir("stuck");
        let service = build_service(&base_url, &dir, vec![candidate(1)], None);

        let candidates = vec![candidate(1)];
        // The policy allows 20 checks of a job that never progresses.
        service
            .monitor_and_reconcile("batch_1", &candidates, 7)
            .await;
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn evaluations_for_unknown_candidates_never_reach_the_artifact() {
        let output = [result_line(1, 5.0), result_line(999, 9.9)].join("\n");
        let base_url = StubScoringApi::spawn(&["completed"], &output).await;
        let dir = scratch_dir("unknown");
        let service = build_service(&base_url, &dir, vec![candidate(1)], None);

        let candidates = vec![candidate(1)];
        service
            .monitor_and_reconcile("batch_1", &candidates, 7)
            .await;

        let path = wait_for_artifact(&dir).await.expect("artifact written");
        let artifact =
            talent_ai::workflows::matching::read_artifact(&path).expect("artifact reads back");
        assert_eq!(artifact.candidates.len(), 1);
        assert_eq!(artifact.candidates[0].source_id, "1");
        std::fs::remove_dir_all(&dir).ok();
    }
}

mod status {
    use super::common::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use talent_ai::workflows::matching::matching_router;
    use tower::util::ServiceExt;

    #[tokio::test]
    async fn status_endpoint_reports_the_remote_phase() {
        let base_url = StubScoringApi::spawn(&["in_progress"], "").await;
        let dir = scratch_dir("status");
        let service = build_service(&base_url, &dir, vec![candidate(1)], None);

        let app = matching_router(service);
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/matching/batches/batch_1")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let view: serde_json::Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(view["status"], "in_progress");
    }

    #[tokio::test]
    async fn unknown_batch_id_maps_to_not_found() {
        let base_url = StubScoringApi::spawn(&["in_progress"], "").await;
        let dir = scratch_dir("status404");
        let service = build_service(&base_url, &dir, vec![candidate(1)], None);

        let app = matching_router(service);
        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/matching/batches/batch_missing")
            .body(Body::empty())
            .expect("request builds");
        let response = app.oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
