//! SpendSight Core Library
//!
//! The adaptive analytics engine behind SpendSight's spending insights:
//! - Transaction store (SQLite) answering cheap counts and ordered fetches
//! - Strategy selection by dataset size (raw, summary, chunked)
//! - Exact decimal summarization into category and period breakdowns
//! - Chunked, progressive aggregation for large histories
//! - Pluggable LLM backends (OpenAI, Anthropic, mock) with uniform fallback
//! - Prompt library and TOML configuration with user overrides
//! - CSV import for building datasets

pub mod ai;
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod prompts;

/// Test utilities including an in-memory store and mock chat server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIClient, AnthropicBackend, FallbackGenerator, Generation, GeneratorError,
    GeneratorErrorKind, InsightGenerator, InsightPayload, MockBackend, OpenAIBackend,
};
pub use analytics::{
    AnalysisResult, ChunkCoordinator, CountEstimator, Strategy, StrategyDecision, StrategyEngine,
    StrategySelector, TransactionFetcher,
};
pub use config::AnalyticsConfig;
pub use db::Database;
pub use error::{Error, Result};
pub use models::{Aggregate, DateRange, TransactionKind, TransactionRecord};
pub use prompts::{Prompt, PromptId, PromptLibrary};
