//! Adaptive analytics engine
//!
//! - `strategy` - Pure strategy selection by transaction count
//! - `summarizer` - Exact decimal folding into an `Aggregate`
//! - `chunked` - Windowed, progressive aggregation for large datasets
//! - `orchestrator` - Count, select, execute and annotate
//! - `source` - Storage collaborator traits

pub mod chunked;
pub mod orchestrator;
pub mod source;
pub mod strategy;
pub mod summarizer;

pub use chunked::{plan_windows, ChunkCoordinator, ChunkCoverage, ChunkedAnalysis};
pub use orchestrator::{
    AnalysisMetadata, AnalysisResult, PerformanceInsights, StrategyComparison, StrategyEngine,
    StrategyOption, StrategyRecommendation, Timings,
};
pub use source::{ChunkWindow, CountEstimator, TransactionFetcher};
pub use strategy::{EstimatedPerformance, Strategy, StrategyDecision, StrategySelector};
pub use summarizer::summarize;
