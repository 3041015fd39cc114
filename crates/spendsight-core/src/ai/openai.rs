//! OpenAI chat completions backend
//!
//! Also works with any server implementing the OpenAI `/v1/chat/completions`
//! API by pointing `OPENAI_BASE_URL` at it.
//!
//! # Configuration
//!
//! Environment variables:
//! - `OPENAI_API_KEY`: API key (without it every call reports `Unavailable`)
//! - `OPENAI_MODEL`: Model name (default: gpt-4o-mini)
//! - `OPENAI_BASE_URL`: Server URL (default: https://api.openai.com)

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prompts::PromptLibrary;

use super::types::{GeneratorError, InsightPayload};
use super::{render_prompt, timeout_from_env, InsightGenerator, DEFAULT_TIMEOUT_SECS};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI chat completions backend
#[derive(Clone)]
pub struct OpenAIBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl OpenAIBackend {
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
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_key = std::env::var("OPENAI_API_KEY").ok();

        Self::with_timeout(&base_url, &model, api_key.as_deref(), timeout_from_env())
    }

    /// Make a chat completion request
    async fn chat_completion(
        &self,
        api_key: &str,
        system: Option<String>,
        prompt: String,
    ) -> Result<String, GeneratorError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt,
        });

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.7),
            max_tokens: Some(1000),
        };

        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::from_status(status.as_u16(), &body));
        }

        let chat_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            GeneratorError::TransientFailure(format!("Malformed OpenAI response: {}", e))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GeneratorError::TransientFailure("No response from OpenAI API".into()))
    }
}

#[async_trait]
impl InsightGenerator for OpenAIBackend {
    async fn generate(&self, payload: &InsightPayload) -> Result<String, GeneratorError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeneratorError::Unavailable(
                "OPENAI_API_KEY is not configured".into(),
            ));
        };

        let (system, prompt) = render_prompt(&self.prompts, payload)?;
        debug!(
            model = %self.model,
            prompt_id = payload.prompt_id().as_str(),
            prompt_chars = prompt.len(),
            "Sending OpenAI chat completion"
        );

        self.chat_completion(api_key, system, prompt).await
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
