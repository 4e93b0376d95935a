use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::types::{ChatMessage, ChatRequest, ChatResponse, CompletionOptions};
use crate::{CompletionClient, CompletionError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4";

// ─── OpenAiConfig ─────────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Upper bound on a single HTTP exchange, connect through body.
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ─── OpenAiClient ─────────────────────────────────────────────────────────

/// Chat-completions client for OpenAI and API-compatible providers.
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(CompletionError::Config("API key is empty".into()));
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(CompletionError::Transport)?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn build_request(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(user_prompt),
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(self.config.timeout.as_secs())
        } else {
            CompletionError::Transport(err)
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String> {
        let body = self.build_request(system_prompt, user_prompt, options);
        debug!(
            model = %self.config.model,
            prompt_chars = user_prompt.len(),
            "sending completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(model = %self.config.model, "completion provider rate limited request");
            return Err(CompletionError::RateLimited(text));
        }
        if !status.is_success() {
            warn!(model = %self.config.model, status = status.as_u16(), "completion request failed");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)
            .map_err(|source| CompletionError::Malformed { body: text.clone(), source })?;
        let content = parsed
            .first_text()
            .ok_or(CompletionError::EmptyResponse)?
            .to_string();

        if let Some(usage) = parsed.usage {
            debug!(
                total_tokens = usage.total_tokens,
                completion_tokens = usage.completion_tokens,
                "completion received"
            );
        }
        Ok(content)
    }
}

// ─── UnconfiguredClient ───────────────────────────────────────────────────

/// Stands in when no endpoint is configured. Every call fails with
/// [`CompletionError::Config`] carrying `reason`, so callers that never reach
/// the model keep working.
#[derive(Debug, Clone)]
pub struct UnconfiguredClient {
    reason: String,
}

impl UnconfiguredClient {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CompletionClient for UnconfiguredClient {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<String> {
        Err(CompletionError::Config(self.reason.clone()))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const OK_BODY: &str = r#"{
        "id": "chatcmpl-1",
        "model": "gpt-4",
        "choices": [
            {"index": 0, "message": {"role": "assistant", "content": "hello there"}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
    }"#;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig::new("sk-test").with_base_url(server.url())).unwrap()
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let err = OpenAiClient::new(OpenAiConfig::new("  ")).err().unwrap();
        assert!(matches!(err, CompletionError::Config(_)));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let client =
            OpenAiClient::new(OpenAiConfig::new("k").with_base_url("http://localhost:9/v1/"))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9/v1/chat/completions");
    }

    #[test]
    fn request_carries_system_then_user_message() {
        let client = OpenAiClient::new(OpenAiConfig::new("k").with_model("gpt-4o")).unwrap();
        let req = client.build_request(
            "sys",
            "usr",
            &CompletionOptions::default().with_temperature(0.2),
        );
        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.messages[0], ChatMessage::system("sys"));
        assert_eq!(req.messages[1], ChatMessage::user("usr"));
        assert!((req.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(req.max_tokens, 2000);
    }

    #[tokio::test]
    async fn complete_returns_first_choice_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4",
                "max_tokens": 2000
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(OK_BODY)
            .create_async()
            .await;

        let text = client_for(&server)
            .complete("sys", "hi", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "hello there");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("sys", "hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::RateLimited(ref b) if b == "slow down"));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn server_error_maps_to_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("sys", "hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        match err {
            CompletionError::Status { status, ref body } => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected Status, got {other:?}"),
        }
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn garbage_body_maps_to_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("sys", "hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Malformed { .. }));
    }

    #[tokio::test]
    async fn no_choices_maps_to_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .complete("sys", "hi", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::EmptyResponse));
    }

    #[tokio::test]
    async fn unconfigured_client_always_fails() {
        let client = UnconfiguredClient::new("no API key");
        let err = client
            .complete("s", "u", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Config(ref r) if r == "no API key"));
    }
}
