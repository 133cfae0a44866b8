use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::backend::{build_http_client, read_success_body, BackendError, ReviewBackend};

/// OpenAI-compatible chat completions API (Groq, OpenAI, vLLM, ...).
pub struct ChatCompletionsBackend {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatCompletionsBackend {
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            model: model.to_string(),
            api_key,
        })
    }
}

impl ReviewBackend for ChatCompletionsBackend {
    fn name(&self) -> &str {
        "chat completions"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(BackendError::from_reqwest)?;

        let body = read_success_body(response, self.name()).await?;
        let envelope: ChatResponse = serde_json::from_str(&body).map_err(|err| {
            BackendError::Response(format!("unexpected chat completions envelope: {err}"))
        })?;

        envelope
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::Response("chat completion carried no content".to_string()))
    }
}
