//! Strategy selection by dataset size

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;

/// Method used to shrink a transaction set to a generator-sized payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    /// Pass every transaction through untouched
    RawData,
    /// Summarize the whole set into one aggregate
    IntelligentSummary,
    /// Summarize bounded windows and merge them
    ChunkedProcessing,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RawData => "RAW_DATA",
            Self::IntelligentSummary => "INTELLIGENT_SUMMARY",
            Self::ChunkedProcessing => "CHUNKED_PROCESSING",
        }
    }

    pub fn all() -> [Strategy; 3] {
        [
            Self::RawData,
            Self::IntelligentSummary,
            Self::ChunkedProcessing,
        ]
    }

    /// Why this strategy suits a dataset of `count` transactions
    pub fn reasoning(&self, count: u64) -> String {
        match self {
            Self::RawData => format!(
                "Dataset is small ({} transactions), raw data analysis provides maximum detail",
                count
            ),
            Self::IntelligentSummary => format!(
                "Dataset is medium-sized ({} transactions), summary analysis balances detail and performance",
                count
            ),
            Self::ChunkedProcessing => format!(
                "Dataset is large ({} transactions), chunked processing ensures complete analysis without token limits",
                count
            ),
        }
    }

    /// Token and latency class for running this strategy over `count` transactions
    pub fn estimated_performance(
        &self,
        count: u64,
        config: &AnalyticsConfig,
    ) -> EstimatedPerformance {
        let (estimated_tokens, response_time, cost_efficiency) = match self {
            Self::RawData => (
                count.saturating_mul(config.raw_tokens_per_transaction),
                "2-5 seconds",
                "High (detailed analysis)",
            ),
            Self::IntelligentSummary => (200, "1-3 seconds", "Very High (optimized)"),
            Self::ChunkedProcessing => (500, "5-15 seconds", "Medium (comprehensive)"),
        };
        EstimatedPerformance {
            estimated_tokens,
            estimated_response_time: response_time.to_string(),
            cost_efficiency: cost_efficiency.to_string(),
        }
    }

    pub fn advantages(&self) -> &'static str {
        match self {
            Self::RawData => "Maximum detail, complete transaction visibility",
            Self::IntelligentSummary => "Fast, cost-effective, pattern-focused",
            Self::ChunkedProcessing => "Handles any dataset size, complete analysis",
        }
    }

    pub fn disadvantages(&self) -> &'static str {
        match self {
            Self::RawData => "High token usage, slower for large datasets",
            Self::IntelligentSummary => "Less granular detail",
            Self::ChunkedProcessing => "Slower, more complex processing",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Estimated cost of a strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatedPerformance {
    pub estimated_tokens: u64,
    pub estimated_response_time: String,
    pub cost_efficiency: String,
}

/// The strategy chosen for one request and the inputs that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDecision {
    pub strategy: Strategy,
    pub transaction_count: u64,
    pub raw_threshold: u64,
    pub summary_threshold: u64,
}

impl StrategyDecision {
    pub fn reasoning(&self) -> String {
        self.strategy.reasoning(self.transaction_count)
    }
}

/// Maps a transaction count to a strategy
///
/// Each band is closed on its lower bound: a count equal to a threshold
/// belongs to the higher band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySelector {
    raw_threshold: u64,
    summary_threshold: u64,
}

impl StrategySelector {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            raw_threshold: config.raw_threshold,
            summary_threshold: config.summary_threshold,
        }
    }

    pub fn select(&self, transaction_count: u64) -> StrategyDecision {
        let strategy = if transaction_count < self.raw_threshold {
            Strategy::RawData
        } else if transaction_count < self.summary_threshold {
            Strategy::IntelligentSummary
        } else {
            Strategy::ChunkedProcessing
        };

        StrategyDecision {
            strategy,
            transaction_count,
            raw_threshold: self.raw_threshold,
            summary_threshold: self.summary_threshold,
        }
    }

    /// Whether `strategy` is the one this selector picks for `count`
    pub fn is_applicable(&self, strategy: Strategy, count: u64) -> bool {
        self.select(count).strategy == strategy
    }
}
