//! Anthropic Messages API backend
//!
//! # Configuration
//!
//! Environment variables:
//! - `ANTHROPIC_API_KEY`: API key (without it every call reports `Unavailable`)
//! - `ANTHROPIC_MODEL`: Model to use (default: claude-3-5-haiku-latest)
//! - `ANTHROPIC_BASE_URL`: Server URL (default: https://api.anthropic.com)

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompts::PromptLibrary;

use super::types::{GeneratorError, InsightPayload};
use super::{render_prompt, timeout_from_env, InsightGenerator, DEFAULT_TIMEOUT_SECS};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Message in conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user", "assistant"
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: text.into(),
        }
    }
}

/// Content block in a response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>, // "end_turn", "max_tokens"
}

impl MessagesResponse {
    /// Extract text content from the response
    pub fn text(&self) -> Option<String> {
        let texts: Vec<_> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// Anthropic Messages API backend
#[derive(Clone)]
pub struct AnthropicBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl AnthropicBackend {
    /// Create a new backend
    pub fn new(base_url: &str, model: &str, api_key: Option<&str>) -> Self {
        Self::with_timeout(
            base_url,
            model,
            api_key,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a backend with an explicit request timeout
    pub fn with_timeout(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        timeout: Duration,
    ) -> Self {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()).map(String::from),
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Use a specific prompt library
    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(RwLock::new(prompts));
        self
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model =
            std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = std::env::var("ANTHROPIC_API_KEY").ok();

        Self::with_timeout(&base_url, &model, api_key.as_deref(), timeout_from_env())
    }

    /// Send a single-turn messages request
    async fn messages(
        &self,
        api_key: &str,
        system: Option<String>,
        prompt: String,
    ) -> Result<MessagesResponse, GeneratorError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: 1000,
            messages: vec![Message::user(prompt)],
            system,
        };

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::from_status(status.as_u16(), &body));
        }

        let messages_response: MessagesResponse = response.json().await.map_err(|e| {
            GeneratorError::TransientFailure(format!("Malformed Anthropic response: {}", e))
        })?;

        debug!(
            stop_reason = ?messages_response.stop_reason,
            "Received Anthropic response"
        );

        Ok(messages_response)
    }
}

#[async_trait]
impl InsightGenerator for AnthropicBackend {
    async fn generate(&self, payload: &InsightPayload) -> Result<String, GeneratorError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeneratorError::Unavailable(
                "ANTHROPIC_API_KEY is not configured".into(),
            ));
        };

        let (system, prompt) = render_prompt(&self.prompts, payload)?;
        debug!(
            model = %self.model,
            prompt_id = payload.prompt_id().as_str(),
            prompt_chars = prompt.len(),
            "Sending Anthropic messages request"
        );

        self.messages(api_key, system, prompt)
            .await?
            .text()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| GeneratorError::TransientFailure("No text in response".into()))
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GeneratorErrorKind;
    use crate::models::Aggregate;
    use crate::test_utils::MockChatServer;

    fn summary() -> InsightPayload {
        InsightPayload::Summary {
            aggregate: Aggregate::default(),
        }
    }

    fn backend(url: &str, key: Option<&str>) -> AnthropicBackend {
        AnthropicBackend::new(url, "claude-test", key).with_prompts(PromptLibrary::embedded_only())
    }

    #[test]
    fn test_messages_response_text() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "First"},
                {"type": "tool_use", "id": "t1", "name": "x", "input": {}},
                {"type": "text", "text": "Second"}
            ],
            "stop_reason": "end_turn"
        }"#;
        let response: MessagesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), Some("First\nSecond".to_string()));
    }

    #[test]
    fn test_messages_request_serialization() {
        let request = MessagesRequest {
            model: "claude-test".to_string(),
            max_tokens: 1000,
            messages: vec![Message::user("Hello")],
            system: None,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("claude-test"));
        assert!(json.contains("Hello"));
        assert!(!json.contains("system"));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let backend = backend("http://127.0.0.1:1", None);
        assert!(!backend.is_available());

        let err = backend.generate(&summary()).await.unwrap_err();
        assert_eq!(err.kind(), GeneratorErrorKind::Unavailable);
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockChatServer::start("Groceries dominate.", 200).await;
        let text = backend(&server.url(), Some("key"))
            .generate(&summary())
            .await
            .unwrap();
        assert_eq!(text, "Groceries dominate.");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_kind() {
        let server = MockChatServer::start("unused", 429).await;
        let err = backend(&server.url(), Some("key"))
            .generate(&summary())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GeneratorErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_request_timeout_is_unavailable() {
        let server =
            MockChatServer::start_with_delay("too late", 200, Duration::from_secs(2)).await;
        let err = AnthropicBackend::with_timeout(
            &server.url(),
            "claude-test",
            Some("sk-ant-test"),
            Duration::from_millis(100),
        )
        .with_prompts(PromptLibrary::embedded_only())
        .generate(&summary())
        .await
        .unwrap_err();

        assert_eq!(err.kind(), GeneratorErrorKind::Unavailable);
    }
}
