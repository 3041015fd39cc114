//! Pluggable insight generator abstraction
//!
//! The analytics engine hands a structured payload (raw transactions or an
//! aggregate) to an external text-generation service and gets narrative text
//! back. That service may be missing, rate limited or failing.
//!
//! # Architecture
//!
//! - `InsightGenerator` trait: the `generate` boundary all backends implement
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAIBackend`, `AnthropicBackend`, `MockBackend`
//! - `FallbackGenerator`: decorator turning every failure into a labelled
//!   fallback narrative
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_BACKEND`: Backend to use (openai, anthropic, mock). Default: openai
//! - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`
//! - `ANTHROPIC_API_KEY`, `ANTHROPIC_MODEL`, `ANTHROPIC_BASE_URL`
//! - `AI_TIMEOUT_SECS`: Request timeout for both HTTP backends (default: 30)

mod anthropic;
mod fallback;
mod mock;
mod openai;
pub mod types;

pub use anthropic::AnthropicBackend;
pub use fallback::{fallback_narrative, FallbackGenerator, FALLBACK_LABEL};
pub use mock::MockBackend;
pub use openai::OpenAIBackend;
pub use types::*;

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::prompts::PromptLibrary;

/// Default request timeout for HTTP backends
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Trait defining the narrative generation boundary
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Turn a structured payload into narrative text
    async fn generate(&self, payload: &InsightPayload) -> Result<String, GeneratorError>;

    /// Whether the backend is configured well enough to attempt a call
    fn is_available(&self) -> bool;

    /// Provider name (for metadata and logging)
    fn provider(&self) -> &str;

    /// Model name (for metadata and logging)
    fn model(&self) -> &str;
}

/// Request timeout from `AI_TIMEOUT_SECS`
pub(crate) fn timeout_from_env() -> Duration {
    let secs = std::env::var("AI_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Render the system and user prompt for a payload
pub(crate) fn render_prompt(
    prompts: &RwLock<PromptLibrary>,
    payload: &InsightPayload,
) -> Result<(Option<String>, String), GeneratorError> {
    let mut prompts = prompts.write().map_err(|_| {
        GeneratorError::TransientFailure("Failed to acquire prompt library lock".into())
    })?;
    let prompt = prompts
        .get(payload.prompt_id())
        .map_err(|e| GeneratorError::TransientFailure(e.to_string()))?;

    let vars = payload.prompt_vars();
    Ok((
        prompt.system_section().map(String::from),
        prompt.render_user(&vars),
    ))
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI chat completions
    OpenAI(OpenAIBackend),
    /// Anthropic Messages API
    Anthropic(AnthropicBackend),
    /// Deterministic offline backend
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_BACKEND` to determine which backend to use:
    /// - `openai` (default): Uses OPENAI_API_KEY, OPENAI_MODEL, OPENAI_BASE_URL
    /// - `anthropic`: Uses ANTHROPIC_API_KEY, ANTHROPIC_MODEL, ANTHROPIC_BASE_URL
    /// - `mock`: Deterministic offline narratives
    ///
    /// A missing API key still yields a client; it reports `Unavailable` on
    /// every call so the engine falls back instead of failing.
    pub fn from_env() -> Self {
        let backend = std::env::var("AI_BACKEND").unwrap_or_else(|_| "openai".to_string());

        match backend.to_lowercase().as_str() {
            "openai" => AIClient::OpenAI(OpenAIBackend::from_env()),
            "anthropic" | "claude" => AIClient::Anthropic(AnthropicBackend::from_env()),
            "mock" => AIClient::Mock(MockBackend::new()),
            _ => {
                tracing::warn!(backend = %backend, "Unknown AI_BACKEND, falling back to openai");
                AIClient::OpenAI(OpenAIBackend::from_env())
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl InsightGenerator for AIClient {
    async fn generate(&self, payload: &InsightPayload) -> Result<String, GeneratorError> {
        match self {
            AIClient::OpenAI(b) => b.generate(payload).await,
            AIClient::Anthropic(b) => b.generate(payload).await,
            AIClient::Mock(b) => b.generate(payload).await,
        }
    }

    fn is_available(&self) -> bool {
        match self {
            AIClient::OpenAI(b) => b.is_available(),
            AIClient::Anthropic(b) => b.is_available(),
            AIClient::Mock(b) => b.is_available(),
        }
    }

    fn provider(&self) -> &str {
        match self {
            AIClient::OpenAI(b) => b.provider(),
            AIClient::Anthropic(b) => b.provider(),
            AIClient::Mock(b) => b.provider(),
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAI(b) => b.model(),
            AIClient::Anthropic(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Aggregate;

    #[tokio::test]
    async fn test_mock_client_dispatch() {
        let client = AIClient::mock();
        assert_eq!(client.provider(), "mock");
        assert!(client.is_available());

        let text = client
            .generate(&InsightPayload::Summary {
                aggregate: Aggregate::default(),
            })
            .await
            .unwrap();
        assert!(!text.is_empty());
    }

    #[test]
    fn test_render_prompt_uses_payload_template() {
        let prompts = RwLock::new(PromptLibrary::embedded_only());
        let payload = InsightPayload::Window {
            window: 2,
            total_windows: 9,
            aggregate: Aggregate::default(),
        };

        let (system, user) = render_prompt(&prompts, &payload).unwrap();
        assert!(system.unwrap().contains("one slice"));
        assert!(user.contains("Slice 2 of 9"));
        assert!(!user.contains("{{"));
    }
}
