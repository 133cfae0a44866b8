use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backend::{build_http_client, read_success_body, BackendError, ReviewBackend};

/// Local Ollama server, `POST /api/generate` in JSON mode.
pub struct OllamaBackend {
    client: reqwest::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaBackend {
    pub fn new(endpoint: &str, model: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url: format!("{}/api/generate", endpoint.trim_end_matches('/')),
            model: model.to_string(),
        })
    }
}

impl ReviewBackend for OllamaBackend {
    fn name(&self) -> &str {
        "Ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;

        let body = read_success_body(response, self.name()).await?;
        let envelope: GenerateResponse = serde_json::from_str(&body).map_err(|err| {
            BackendError::Response(format!("unexpected Ollama response envelope: {err}"))
        })?;
        Ok(envelope.response)
    }
}
