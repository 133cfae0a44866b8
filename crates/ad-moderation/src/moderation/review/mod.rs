//! Language-model policy review of the ad text.

mod backend;
mod chat;
mod ollama;
mod parse;
pub mod prompt;

use std::time::Duration;

use tracing::{info, warn};

pub use backend::{BackendError, ConfiguredBackend, ReviewBackend};
pub use chat::ChatCompletionsBackend;
pub use ollama::OllamaBackend;
pub use parse::{decode_verdict, MalformedOutput};

use crate::moderation::domain::{AdFields, ReviewVerdict};

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("cannot reach the {backend} review backend: {detail}")]
    ServiceUnavailable { backend: String, detail: String },
    #[error(transparent)]
    Malformed(#[from] MalformedOutput),
    #[error("{backend} review backend failed: {source}")]
    Backend {
        backend: String,
        #[source]
        source: BackendError,
    },
}

/// Renders the rule prompt, asks the backend once and decodes the verdict.
pub struct PolicyReviewer<B> {
    backend: B,
    timeout: Duration,
}

impl<B: ReviewBackend> PolicyReviewer<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn review(&self, fields: &AdFields) -> Result<ReviewVerdict, ReviewError> {
        let prompt = prompt::render(fields);
        let backend = self.backend.name().to_string();

        let raw = match tokio::time::timeout(self.timeout, self.backend.complete(&prompt)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) if err.is_unreachable() => {
                warn!(%backend, error = %err, "review backend unreachable");
                return Err(ReviewError::ServiceUnavailable {
                    backend,
                    detail: err.to_string(),
                });
            }
            Ok(Err(source)) => return Err(ReviewError::Backend { backend, source }),
            Err(_) => {
                warn!(%backend, timeout_secs = self.timeout.as_secs(), "review timed out");
                return Err(ReviewError::ServiceUnavailable {
                    backend,
                    detail: format!("no reply within {}s", self.timeout.as_secs()),
                });
            }
        };

        let verdict = decode_verdict(&raw)?;
        info!(%backend, decision = ?verdict.decision, "policy review complete");
        Ok(verdict)
    }
}
