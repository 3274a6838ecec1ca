//! Thin client for an OpenAI-compatible chat completion provider.
//!
//! One round-trip per user message: a fixed system instruction plus the user
//! text goes out, the first choice's content comes back. Failures are the
//! caller's signal not to persist anything.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// System instruction sent with every completion request.
const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Respond in a friendly and helpful manner.";

/// Substituted when the provider answers 200 but with no usable content.
const EMPTY_COMPLETION_FALLBACK: &str = "Sorry, I could not process your message.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion provider returned status {0}")]
    Status(u16),
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CompletionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Send one user message and return the assistant's reply text.
    pub async fn relay(&self, message: &str) -> Result<String, RelayError> {
        let body = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: message.to_string(),
                },
            ],
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!("Completion provider returned {}", resp.status());
            return Err(RelayError::Status(resp.status().as_u16()));
        }

        let parsed: CompletionResponse = resp.json().await?;

        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                warn!("Completion provider answered with no content");
                EMPTY_COMPLETION_FALLBACK.to_string()
            });

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, routing::post};

    fn parse(payload: &str) -> CompletionResponse {
        serde_json::from_str(payload).unwrap()
    }

    #[test]
    fn parses_standard_completion_payload() {
        let parsed = parse(
            r#"{
                "id": "cmpl-1",
                "object": "chat.completion",
                "model": "llama3.1-8b",
                "choices": [
                    {"index": 0, "message": {"role": "assistant", "content": "Hello there!"}, "finish_reason": "stop"}
                ],
                "usage": {"prompt_tokens": 10, "completion_tokens": 3}
            }"#,
        );

        let content = parsed.choices.into_iter().next().unwrap().message.content;
        assert_eq!(content.as_deref(), Some("Hello there!"));
    }

    #[test]
    fn tolerates_missing_choices_and_null_content() {
        let parsed = parse(r#"{"object": "chat.completion"}"#);
        assert!(parsed.choices.is_empty());

        let parsed = parse(r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#);
        assert_eq!(parsed.choices[0].message.content, None);
    }

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn relays_against_a_stub_provider() {
        let stub = Router::new().route(
            "/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "stub reply"}}]
                }))
            }),
        );
        let base = spawn_stub(stub).await;

        let client = CompletionClient::new(base, "test-key", "test-model").unwrap();
        let reply = client.relay("hi").await.unwrap();
        assert_eq!(reply, "stub reply");
    }

    #[tokio::test]
    async fn provider_error_status_is_an_error() {
        let stub = Router::new().route(
            "/chat/completions",
            post(|| async { axum::http::StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_stub(stub).await;

        let client = CompletionClient::new(base, "test-key", "test-model").unwrap();
        match client.relay("hi").await {
            Err(RelayError::Status(500)) => {}
            other => panic!("expected Status(500), got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn empty_content_falls_back_to_apology() {
        let stub = Router::new().route(
            "/chat/completions",
            post(|| async { Json(serde_json::json!({"choices": []})) }),
        );
        let base = spawn_stub(stub).await;

        let client = CompletionClient::new(base, "test-key", "test-model").unwrap();
        let reply = client.relay("hi").await.unwrap();
        assert_eq!(reply, EMPTY_COMPLETION_FALLBACK);
    }
}
