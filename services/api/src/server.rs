use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredIngestor, InMemoryCandidateDirectory};
use crate::routes::with_matching_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use talent_ai::config::AppConfig;
use talent_ai::error::AppError;
use talent_ai::openai::OpenAIClient;
use talent_ai::telemetry;
use talent_ai::workflows::matching::{
    BatchJobManager, BatchRequestBuilder, CriteriaExtractor, HrBaseGateway, MatchingService,
    NoopIngestor, PollPolicy, ResultReconciler, ResultSink, ScoreThreshold, ScraperIngestor,
};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = Arc::new(match args.seed.take() {
        Some(path) => {
            let directory = InMemoryCandidateDirectory::from_seed_file(&path)?;
            info!(path = %path.display(), "candidate directory seeded");
            directory
        }
        None => InMemoryCandidateDirectory::default(),
    });
    let ingestor = Arc::new(match &config.scraper {
        Some(scraper) => ConfiguredIngestor::Scraper(ScraperIngestor::new(scraper)),
        None => ConfiguredIngestor::Noop(NoopIngestor),
    });

    let client = OpenAIClient::new(&config.openai);
    let extractor = CriteriaExtractor::new(
        client.clone(),
        config.openai.model.clone(),
        config.matching.keyword_limit,
    );
    let builder = BatchRequestBuilder::new(config.openai.model.clone());
    let policy = PollPolicy {
        interval: Duration::from_secs(config.matching.poll_interval_secs),
        max_checks: config.matching.max_poll_checks,
        ..PollPolicy::default()
    };
    let batch = BatchJobManager::new(client, config.matching.completion_window.clone(), policy);
    let reconciler = ResultReconciler::new(
        ScoreThreshold::from_config(config.matching.score_threshold),
        config.matching.max_results,
    );
    let partner: Option<Arc<HrBaseGateway>> = config
        .partner
        .as_ref()
        .map(|partner| Arc::new(HrBaseGateway::new(partner)));
    let sink = ResultSink::new(config.matching.output_dir.clone(), partner);

    let service = Arc::new(MatchingService::new(
        extractor, directory, ingestor, builder, batch, reconciler, sink,
    ));

    let app = with_matching_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "candidate matching service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
