use crate::cli::ServeArgs;
use crate::infra::{build_service, spawn_model_load, AppState};
use crate::routes::with_moderation_routes;
use ad_moderation::config::AppConfig;
use ad_moderation::error::AppError;
use ad_moderation::moderation::ClassifierHandle;
use ad_moderation::telemetry;
use axum::extract::DefaultBodyLimit;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let classifier = ClassifierHandle::loading();
    spawn_model_load(classifier.clone(), config.classifier.model_path.clone());

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        classifier: classifier.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(build_service(&config, classifier)?);

    let app = with_moderation_routes(service)
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        provider = ?config.review.provider,
        review_model = %config.review.model,
        data_file = %config.store.data_file.display(),
        "ad moderation service listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
