use ad_moderation::config::AppConfig;
use ad_moderation::error::AppError;
use ad_moderation::moderation::{
    ClassifierHandle, ConfiguredBackend, JsonFileRecordStore, ModerationService,
    OnnxVehicleClassifier, PolicyReviewer,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{error, info};

pub(crate) type ApiModerationService = ModerationService<ConfiguredBackend, JsonFileRecordStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) classifier: ClassifierHandle,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wire the configured backend and data file around a shared classifier slot.
pub(crate) fn build_service(
    config: &AppConfig,
    classifier: ClassifierHandle,
) -> Result<ApiModerationService, AppError> {
    let backend = ConfiguredBackend::from_config(&config.review)?;
    let reviewer = PolicyReviewer::new(backend, config.review.timeout);
    let store = Arc::new(JsonFileRecordStore::new(&config.store.data_file));
    Ok(ModerationService::new(classifier, reviewer, store))
}

/// Load the ONNX model off the async runtime and publish it into `handle`.
/// Submissions answer "model not loaded" until this finishes.
pub(crate) fn spawn_model_load(handle: ClassifierHandle, path: PathBuf) {
    tokio::spawn(async move {
        let load_path = path.clone();
        let loaded =
            tokio::task::spawn_blocking(move || OnnxVehicleClassifier::load(&load_path)).await;

        match loaded {
            Ok(Ok(classifier)) => {
                handle.install(Arc::new(classifier));
                info!(path = %path.display(), "vehicle classifier ready");
            }
            Ok(Err(err)) => {
                error!(error = %err, "vehicle classifier failed to load");
                handle.mark_failed(err.to_string());
            }
            Err(join) => {
                error!(error = %join, "vehicle classifier load task aborted");
                handle.mark_failed(join.to_string());
            }
        }
    });
}
