use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;
use tracing::{info, warn};

use super::domain::{AdSubmission, SubmittedImage};
use super::repository::RecordStore;
use super::review::ReviewBackend;
use super::service::ModerationService;

/// Multipart part name carrying the ad photos.
pub const IMAGE_FIELD: &str = "images";
pub const INVALID_FORM_MESSAGE: &str = "Invalid submission form.";

/// Router exposing `POST /submit`.
pub fn moderation_router<B, S>(service: Arc<ModerationService<B, S>>) -> Router
where
    B: ReviewBackend + 'static,
    S: RecordStore + 'static,
{
    Router::new()
        .route("/submit", post(submit_handler::<B, S>))
        .with_state(service)
}

pub(crate) async fn submit_handler<B, S>(
    State(service): State<Arc<ModerationService<B, S>>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response
where
    B: ReviewBackend + 'static,
    S: RecordStore + 'static,
{
    let submission = match multipart {
        Ok(multipart) => read_submission(multipart).await,
        Err(rejection) => Err(rejection.body_text()),
    };
    let submission = match submission {
        Ok(submission) => submission,
        Err(detail) => {
            warn!(%detail, "rejecting unreadable submission form");
            return message(StatusCode::BAD_REQUEST, INVALID_FORM_MESSAGE.to_string());
        }
    };

    match service.submit(submission).await {
        Ok(outcome) => {
            info!(status = outcome.status().as_u16(), "submission moderated");
            message(outcome.status(), outcome.message())
        }
        Err(err) => {
            err.log();
            message(err.kind().status(), err.user_message())
        }
    }
}

/// Split the form into photo parts and text fields.
async fn read_submission(mut multipart: Multipart) -> Result<AdSubmission, String> {
    let mut submission = AdSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(|err| err.body_text())? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|err| err.body_text())?;

            let mut image = SubmittedImage::new(bytes.to_vec());
            if let Some(file_name) = file_name {
                image = image.with_file_name(file_name);
            }
            submission.images.push(image);
        } else {
            let value = field.text().await.map_err(|err| err.body_text())?;
            submission.fields.insert(&name, value);
        }
    }

    Ok(submission)
}

fn message(status: StatusCode, text: String) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}
