use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{AdSubmission, ModerationRecord, ReviewDecision};
use super::images::{ClassifierError, ClassifierHandle, DecodeError, GateError, GateOutcome, ImageGate};
use super::repository::{RecordStore, StoreError};
use super::review::{PolicyReviewer, ReviewBackend, ReviewError};

pub const APPROVED_MESSAGE: &str = "Car details saved successfully!";
pub const IMAGE_REJECTION_MESSAGE: &str =
    "Ad rejected: One or more images classified as non-vehicle.";

/// Runs one submission through the image gate, the policy review and the
/// record store, in that order.
pub struct ModerationService<B, S> {
    classifier: ClassifierHandle,
    reviewer: PolicyReviewer<B>,
    store: Arc<S>,
}

impl<B, S> ModerationService<B, S>
where
    B: ReviewBackend + 'static,
    S: RecordStore + 'static,
{
    pub fn new(classifier: ClassifierHandle, reviewer: PolicyReviewer<B>, store: Arc<S>) -> Self {
        Self {
            classifier,
            reviewer,
            store,
        }
    }

    pub fn classifier(&self) -> &ClassifierHandle {
        &self.classifier
    }

    pub fn reviewer(&self) -> &PolicyReviewer<B> {
        &self.reviewer
    }

    /// Moderate one ad. Verdicts are outcomes; only pipeline failures are errors.
    pub async fn submit(
        &self,
        submission: AdSubmission,
    ) -> Result<ModerationOutcome, ModerationError> {
        let classifier = self
            .classifier
            .current()
            .ok_or(ModerationError::ModelNotReady)?;

        let AdSubmission { images, fields } = submission;

        // Decode, resize and inference are CPU-bound.
        let gate = tokio::task::spawn_blocking(move || {
            ImageGate::new(classifier.as_ref()).inspect(&images)
        })
        .await
        .map_err(|join| ModerationError::GateTask(join.to_string()))?;

        match gate? {
            GateOutcome::Fail { index } => {
                return Ok(ModerationOutcome::Rejected(Rejection::Image { index }));
            }
            GateOutcome::Pass { inspected } => {
                info!(images = inspected, "image gate passed");
            }
        }

        let verdict = self.reviewer.review(&fields).await?;
        let record = ModerationRecord::from_verdict(fields, &verdict, Utc::now());

        let store = Arc::clone(&self.store);
        let record = tokio::task::spawn_blocking(move || store.append(&record).map(|()| record))
            .await
            .map_err(|join| StoreError::Unavailable(format!("append task failed: {join}")))??;

        let outcome = match verdict.decision {
            ReviewDecision::Approve => ModerationOutcome::Approved { record },
            ReviewDecision::Reject => ModerationOutcome::Rejected(Rejection::Policy {
                reason: verdict.reason,
                record,
            }),
        };
        Ok(outcome)
    }
}

/// Terminal result of a submission that ran to a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ModerationOutcome {
    Approved { record: ModerationRecord },
    Rejected(Rejection),
}

impl ModerationOutcome {
    pub fn message(&self) -> String {
        match self {
            ModerationOutcome::Approved { .. } => APPROVED_MESSAGE.to_string(),
            ModerationOutcome::Rejected(rejection) => rejection.message(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ModerationOutcome::Approved { .. } => StatusCode::OK,
            ModerationOutcome::Rejected(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Record written to the store, if any.
    pub fn record(&self) -> Option<&ModerationRecord> {
        match self {
            ModerationOutcome::Approved { record }
            | ModerationOutcome::Rejected(Rejection::Policy { record, .. }) => Some(record),
            ModerationOutcome::Rejected(Rejection::Image { .. }) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// A photo failed the vehicle check. Nothing is persisted.
    Image { index: usize },
    Policy {
        reason: String,
        record: ModerationRecord,
    },
}

impl Rejection {
    pub fn message(&self) -> String {
        match self {
            Rejection::Image { .. } => IMAGE_REJECTION_MESSAGE.to_string(),
            Rejection::Policy { reason, .. } => format!("Ad rejected: {reason}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("at least one image is required")]
    NoImages,
    #[error("image {index} could not be decoded: {source}")]
    ImageDecode {
        index: usize,
        #[source]
        source: DecodeError,
    },
    #[error("vehicle classifier is not loaded")]
    ModelNotReady,
    #[error("classification of image {index} failed: {source}")]
    Inference {
        index: usize,
        #[source]
        source: ClassifierError,
    },
    #[error("image gate task failed: {0}")]
    GateTask(String),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<GateError> for ModerationError {
    fn from(value: GateError) -> Self {
        match value {
            GateError::NoImages => ModerationError::NoImages,
            GateError::Decode { index, source } => ModerationError::ImageDecode { index, source },
            GateError::Inference { index, source } => ModerationError::Inference { index, source },
        }
    }
}

/// Coarse failure class used for status mapping and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Validation,
    ImageDecode,
    ModelNotReady,
    Inference,
    ReviewServiceUnavailable,
    MalformedReviewOutput,
    ReviewBackend,
    Store,
}

impl FailureKind {
    pub fn status(self) -> StatusCode {
        match self {
            FailureKind::Validation | FailureKind::ImageDecode => StatusCode::BAD_REQUEST,
            FailureKind::ModelNotReady | FailureKind::ReviewServiceUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            FailureKind::Inference
            | FailureKind::MalformedReviewOutput
            | FailureKind::ReviewBackend
            | FailureKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ModerationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ModerationError::NoImages => FailureKind::Validation,
            ModerationError::ImageDecode { .. } => FailureKind::ImageDecode,
            ModerationError::ModelNotReady => FailureKind::ModelNotReady,
            ModerationError::Inference { .. } | ModerationError::GateTask(_) => {
                FailureKind::Inference
            }
            ModerationError::Review(ReviewError::ServiceUnavailable { .. }) => {
                FailureKind::ReviewServiceUnavailable
            }
            ModerationError::Review(ReviewError::Malformed(_)) => FailureKind::MalformedReviewOutput,
            ModerationError::Review(ReviewError::Backend { .. }) => FailureKind::ReviewBackend,
            ModerationError::Store(_) => FailureKind::Store,
        }
    }

    /// Text returned to the submitter.
    pub fn user_message(&self) -> String {
        match self {
            ModerationError::NoImages => "At least one image is required.".to_string(),
            ModerationError::ImageDecode { .. } => {
                "Ad rejected: one of the uploaded files is not a readable image.".to_string()
            }
            ModerationError::ModelNotReady => "Model not loaded yet.".to_string(),
            ModerationError::Review(ReviewError::ServiceUnavailable { backend, .. }) => format!(
                "Error: Cannot connect to {backend} model server. Please ensure it is running."
            ),
            ModerationError::Review(err) => format!("Error during AI review: {err}"),
            ModerationError::Inference { .. }
            | ModerationError::GateTask(_)
            | ModerationError::Store(_) => {
                "Error processing submission.".to_string()
            }
        }
    }

    /// Emit one log line at a level matching the failure class.
    pub fn log(&self) {
        let kind = self.kind();
        let status = kind.status();
        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(?kind, error = %self, "submission failed");
        } else if status == StatusCode::SERVICE_UNAVAILABLE {
            warn!(?kind, error = %self, "submission failed");
        } else {
            info!(?kind, error = %self, "submission refused");
        }
    }
}
