use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use tracing::error;

use super::chat::ChatCompletionsBackend;
use super::ollama::OllamaBackend;
use crate::config::{ReviewConfig, ReviewProvider};

const ERROR_BODY_LIMIT: usize = 1024;

/// Capability to turn a rendered prompt into the model's raw text reply.
pub trait ReviewBackend: Send + Sync {
    /// Short name used in logs and operator-facing messages.
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, BackendError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{0}")]
    Response(String),
}

impl BackendError {
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Connect(error_chain(&err))
        } else {
            BackendError::Response(error_chain(&err))
        }
    }

    /// Whether the backend could not be reached at all, as opposed to
    /// answering with something unusable.
    pub fn is_unreachable(&self) -> bool {
        match self {
            BackendError::Connect(_) | BackendError::Timeout => true,
            BackendError::Status { .. } => false,
            BackendError::Response(detail) => mentions_refused_connection(detail),
        }
    }
}

fn mentions_refused_connection(detail: &str) -> bool {
    detail.contains("ConnectError") || detail.to_ascii_lowercase().contains("connection refused")
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| BackendError::Response(format!("failed to build HTTP client: {err}")))
}

/// Check the status and return the body text of a backend response.
pub(crate) async fn read_success_body(
    response: reqwest::Response,
    backend: &str,
) -> Result<String, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        let body = if body.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &body[..cut])
        } else {
            body
        };
        error!(backend, status = status.as_u16(), "review backend returned an error status");
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }

    response.text().await.map_err(BackendError::from_reqwest)
}

/// Backend selected by [`ReviewConfig`].
pub enum ConfiguredBackend {
    Ollama(OllamaBackend),
    ChatCompletions(ChatCompletionsBackend),
}

impl ConfiguredBackend {
    pub fn from_config(config: &ReviewConfig) -> Result<Self, BackendError> {
        let backend = match config.provider {
            ReviewProvider::Ollama => ConfiguredBackend::Ollama(OllamaBackend::new(
                &config.endpoint,
                &config.model,
                config.timeout,
            )?),
            ReviewProvider::ChatCompletions => {
                let api_key = config.api_key.clone().unwrap_or_default();
                ConfiguredBackend::ChatCompletions(ChatCompletionsBackend::new(
                    &config.endpoint,
                    &config.model,
                    api_key,
                    config.timeout,
                )?)
            }
        };
        Ok(backend)
    }
}

impl ReviewBackend for ConfiguredBackend {
    fn name(&self) -> &str {
        match self {
            ConfiguredBackend::Ollama(backend) => backend.name(),
            ConfiguredBackend::ChatCompletions(backend) => backend.name(),
        }
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        match self {
            ConfiguredBackend::Ollama(backend) => backend.complete(prompt).await,
            ConfiguredBackend::ChatCompletions(backend) => backend.complete(prompt).await,
        }
    }
}
