use crate::infra::{ApiModerationService, AppState};
use ad_moderation::moderation::{moderation_router, ClassifierState};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) fn with_moderation_routes(service: Arc<ApiModerationService>) -> axum::Router {
    moderation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and the classifier is loaded.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let listening = state.readiness.load(Ordering::Acquire);

    let (model, detail) = match state.classifier.state() {
        ClassifierState::Loading => ("loading", None),
        ClassifierState::Ready(_) => ("ready", None),
        ClassifierState::Failed(reason) => ("failed", Some(reason)),
    };

    let ready = listening && model == "ready";
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut payload = json!({
        "status": if ready { "ready" } else { "initializing" },
        "model": model,
    });
    if let Some(detail) = detail {
        payload["detail"] = json!(detail);
    }

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
