//! Text generation through an OpenAI-compatible chat-completions API
//! (OpenRouter by default).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::config::LlmConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    /// Conversation after the system prompt, oldest first.
    pub messages: Vec<ChatMessage>,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingCredentials,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("API key rejected ({0})")]
    Unauthorized(StatusCode),
    #[error("rate limited or out of quota")]
    RateLimited,
    #[error("upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("model returned no content")]
    EmptyResponse,
    #[error("could not decode response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl TextGenerator for OpenRouterClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingCredentials)?;

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ChatMessage::system(request.system_prompt));
        messages.extend(request.messages);

        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(request.timeout)
                } else {
                    LlmError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized(status),
                StatusCode::TOO_MANY_REQUESTS | StatusCode::PAYMENT_REQUIRED => LlmError::RateLimited,
                _ => LlmError::Upstream {
                    status,
                    body: response.text().await.unwrap_or_default(),
                },
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(request.timeout)
            } else {
                LlmError::Decode(e.to_string())
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        info!(model = %self.model, chars = content.len(), "🤖 Generation completed");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(url: &str, api_key: Option<&str>) -> OpenRouterClient {
        OpenRouterClient::new(&LlmConfig {
            api_key: api_key.map(String::from),
            base_url: url.to_string(),
            model: "test/model".to_string(),
            timeout: Duration::from_secs(5),
            max_tokens: 100,
        })
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            system_prompt: "You analyse reviews.".to_string(),
            messages: vec![ChatMessage::user("Summarise")],
            max_output_tokens: 100,
            temperature: 0.6,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_successful_generation() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "test/model",
                "max_tokens": 100,
                "messages": [
                    { "role": "system", "content": "You analyse reviews." },
                    { "role": "user", "content": "Summarise" }
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"  Keep the cakes.  "}}]}"#)
            .create_async()
            .await;

        let text = client_for(&server.url(), Some("sk-test"))
            .generate(request())
            .await
            .unwrap();

        assert_eq!(text, "Keep the cakes.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_out() {
        let err = client_for("http://127.0.0.1:9", None)
            .generate(request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut server = Server::new_async().await;
        let _unauthorized = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer bad-key")
            .with_status(401)
            .create_async()
            .await;
        let _limited = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer busy-key")
            .with_status(429)
            .create_async()
            .await;

        let err = client_for(&server.url(), Some("bad-key"))
            .generate(request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Unauthorized(_)));

        let err = client_for(&server.url(), Some("busy-key"))
            .generate(request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server.url(), Some("sk-test"))
            .generate(request())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
