//! Insight generator request and response types
//!
//! These types are backend-agnostic and used across all generator implementations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Aggregate, TransactionRecord};
use crate::prompts::PromptId;

/// Failure kinds reported by an insight generator
///
/// Recorded in analysis metadata when a fallback narrative was substituted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorErrorKind {
    Unavailable,
    AuthFailed,
    RateLimited,
    TransientFailure,
}

impl GeneratorErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::AuthFailed => "auth_failed",
            Self::RateLimited => "rate_limited",
            Self::TransientFailure => "transient_failure",
        }
    }
}

impl std::fmt::Display for GeneratorErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned by an insight generator
///
/// Timeouts and connection failures are reported as `Unavailable`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("AI provider unavailable: {0}")]
    Unavailable(String),

    #[error("AI provider rejected credentials: {0}")]
    AuthFailed(String),

    #[error("AI provider rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("AI provider request failed: {0}")]
    TransientFailure(String),
}

impl GeneratorError {
    pub fn kind(&self) -> GeneratorErrorKind {
        match self {
            Self::Unavailable(_) => GeneratorErrorKind::Unavailable,
            Self::AuthFailed(_) => GeneratorErrorKind::AuthFailed,
            Self::RateLimited(_) => GeneratorErrorKind::RateLimited,
            Self::TransientFailure(_) => GeneratorErrorKind::TransientFailure,
        }
    }

    /// Map a non-success HTTP status to an error kind
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = format!("HTTP {}: {}", status, truncate(body, 200));
        match status {
            401 | 403 => Self::AuthFailed(detail),
            429 => Self::RateLimited(detail),
            _ => Self::TransientFailure(detail),
        }
    }
}

impl From<reqwest::Error> for GeneratorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Unavailable(err.to_string())
        } else {
            Self::TransientFailure(err.to_string())
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Structured input handed to an insight generator
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightPayload {
    /// Small dataset passed through untouched
    Transactions { transactions: Vec<TransactionRecord> },
    /// Aggregate of the whole matched set
    Summary { aggregate: Aggregate },
    /// Aggregate of one chunk window (1-based `window`)
    Window {
        window: usize,
        total_windows: usize,
        aggregate: Aggregate,
    },
    /// Merged aggregate of all processed windows plus their fragments
    Consolidated {
        aggregate: Aggregate,
        windows_covered: usize,
        total_windows: usize,
        fragments: Vec<String>,
    },
}

impl InsightPayload {
    /// Prompt template used to render this payload
    pub fn prompt_id(&self) -> PromptId {
        match self {
            Self::Transactions { .. } => PromptId::RawInsights,
            Self::Summary { .. } => PromptId::SummaryInsights,
            Self::Window { .. } => PromptId::WindowInsights,
            Self::Consolidated { .. } => PromptId::ConsolidatedInsights,
        }
    }

    /// Number of transactions represented by this payload
    pub fn transaction_count(&self) -> u64 {
        match self {
            Self::Transactions { transactions } => transactions.len() as u64,
            Self::Summary { aggregate }
            | Self::Window { aggregate, .. }
            | Self::Consolidated { aggregate, .. } => aggregate.transaction_count,
        }
    }

    /// Aggregate carried by the payload, if it is not a raw list
    pub fn aggregate(&self) -> Option<&Aggregate> {
        match self {
            Self::Transactions { .. } => None,
            Self::Summary { aggregate }
            | Self::Window { aggregate, .. }
            | Self::Consolidated { aggregate, .. } => Some(aggregate),
        }
    }

    /// Human-readable span of the data, e.g. "2024-01-03 to 2024-02-28"
    pub fn period(&self) -> String {
        match self {
            Self::Transactions { transactions } => {
                let min = transactions.iter().map(|t| t.date).min();
                let max = transactions.iter().map(|t| t.date).max();
                match (min, max) {
                    (Some(min), Some(max)) => format!("{} to {}", min, max),
                    _ => "no transactions".to_string(),
                }
            }
            _ => {
                let periods = self
                    .aggregate()
                    .map(|a| &a.period_breakdown)
                    .filter(|p| !p.is_empty());
                match periods {
                    Some(p) => {
                        let first = p.keys().next().map(String::as_str).unwrap_or_default();
                        let last = p.keys().next_back().map(String::as_str).unwrap_or_default();
                        format!("{} to {}", first, last)
                    }
                    None => "no recorded spending".to_string(),
                }
            }
        }
    }

    /// JSON body embedded into the prompt
    ///
    /// Consolidated payloads omit the fragments; they are rendered as notes.
    pub fn payload_json(&self) -> String {
        let value = match self {
            Self::Transactions { transactions } => serde_json::to_string_pretty(transactions),
            Self::Summary { aggregate }
            | Self::Window { aggregate, .. }
            | Self::Consolidated { aggregate, .. } => serde_json::to_string_pretty(aggregate),
        };
        value.unwrap_or_else(|_| "{}".to_string())
    }

    /// Template variables for the prompt
    pub fn prompt_vars(&self) -> HashMap<&'static str, String> {
        let mut vars = HashMap::new();
        vars.insert("transaction_count", self.transaction_count().to_string());
        vars.insert("period", self.period());
        vars.insert("payload", self.payload_json());

        match self {
            Self::Window {
                window,
                total_windows,
                ..
            } => {
                vars.insert("window_number", window.to_string());
                vars.insert("total_windows", total_windows.to_string());
            }
            Self::Consolidated {
                windows_covered,
                total_windows,
                fragments,
                ..
            } => {
                vars.insert("windows_covered", windows_covered.to_string());
                vars.insert("total_windows", total_windows.to_string());
                let notes: Vec<String> = fragments
                    .iter()
                    .enumerate()
                    .map(|(i, f)| format!("- Slice {}: {}", i + 1, f.trim()))
                    .collect();
                vars.insert("slice_notes", notes.join("\n"));
                if windows_covered < total_windows {
                    vars.insert(
                        "coverage_note",
                        format!(
                            "Only the {} most recent slices of {} were analyzed; \
                            older history is not reflected in these figures.",
                            windows_covered, total_windows
                        ),
                    );
                }
            }
            _ => {}
        }

        vars
    }
}

/// Narrative text returned through the fallback decorator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Generation {
    pub text: String,
    /// Set when the text is a substituted fallback rather than provider output
    pub fallback: Option<GeneratorErrorKind>,
}

impl Generation {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}
