//! Strategy orchestration: count, select, execute, annotate
//!
//! The engine counts the matching transactions once, picks a strategy from
//! that count and runs it. The decision is never revisited mid-request.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::ai::{FallbackGenerator, GeneratorErrorKind, InsightGenerator, InsightPayload};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::models::{Aggregate, DateRange};

use super::chunked::{ChunkCoordinator, ChunkCoverage};
use super::source::{ChunkWindow, CountEstimator, TransactionFetcher};
use super::strategy::{EstimatedPerformance, Strategy, StrategyDecision, StrategySelector};
use super::summarizer::summarize;

/// Wall-clock timings for one request, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub count_ms: u64,
    pub execution_ms: u64,
    pub total_ms: u64,
}

/// Annotations attached to every analysis result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub reasoning: String,
    pub estimated_performance: EstimatedPerformance,
    pub data_period: DateRange,
    pub provider: String,
    pub model: String,
    /// Failure kind when any narrative in the result is a fallback
    pub fallback: Option<GeneratorErrorKind>,
    /// Present for chunked runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<ChunkCoverage>,
    pub timings: Timings,
}

/// Result of one analysis request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub narrative: String,
    pub decision: StrategyDecision,
    pub transaction_count: u64,
    /// Absent for raw-data runs, which skip summarization
    pub aggregate: Option<Aggregate>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn strategy(&self) -> Strategy {
        self.decision.strategy
    }

    pub fn is_fallback(&self) -> bool {
        self.metadata.fallback.is_some()
    }
}

/// Strategy advice without running an analysis
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyRecommendation {
    pub recommended: Strategy,
    pub transaction_count: u64,
    pub reasoning: String,
    pub estimated_performance: EstimatedPerformance,
    pub data_period: DateRange,
    pub performance_insights: PerformanceInsights,
}

/// What producing a recommendation cost
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceInsights {
    pub count_query_latency: String,
    pub database_efficiency: String,
    pub memory_efficiency: String,
}

impl PerformanceInsights {
    fn measured(count_elapsed: Duration) -> Self {
        Self {
            count_query_latency: format!(
                "~{:.1}ms (COUNT query + logic)",
                count_elapsed.as_secs_f64() * 1000.0
            ),
            database_efficiency: "Single indexed COUNT query".to_string(),
            memory_efficiency: "No transaction records loaded for strategy selection"
                .to_string(),
        }
    }
}

/// One strategy's row in a comparison
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOption {
    pub strategy: Strategy,
    pub applicable: bool,
    pub estimated_tokens: u64,
    pub estimated_response_time: String,
    pub cost_efficiency: String,
    pub advantages: String,
    pub disadvantages: String,
}

/// All strategies side by side for a dataset
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyComparison {
    pub transaction_count: u64,
    pub data_period: DateRange,
    pub recommended: Strategy,
    pub strategies: Vec<StrategyOption>,
}

/// Entry point of the adaptive analytics engine
pub struct StrategyEngine<S, G> {
    store: S,
    generator: FallbackGenerator<G>,
    config: AnalyticsConfig,
    selector: StrategySelector,
    chunker: ChunkCoordinator,
}

impl<S, G> StrategyEngine<S, G>
where
    S: CountEstimator + TransactionFetcher,
    G: InsightGenerator,
{
    pub fn new(store: S, generator: G, config: AnalyticsConfig) -> Self {
        Self {
            selector: StrategySelector::new(&config),
            chunker: ChunkCoordinator::new(&config),
            generator: FallbackGenerator::new(generator),
            store,
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn generator(&self) -> &G {
        self.generator.inner()
    }

    /// Analyze a user's spending over an optional date range
    ///
    /// Only storage failures and an inverted date range produce an error;
    /// generator failures yield a labelled fallback narrative.
    pub async fn analyze(
        &self,
        user_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<AnalysisResult> {
        let range = DateRange::new(start, end)?;
        let started = Instant::now();

        let count = self.store.count(user_id, &range)?;
        let count_ms = elapsed_ms(started);

        let decision = self.selector.select(count);
        info!(
            user_id,
            count,
            strategy = %decision.strategy,
            period = %range,
            "Selected analysis strategy"
        );

        // Rows written after the count stay out of raw and summary runs
        let counted = Some(ChunkWindow {
            offset: 0,
            size: count,
        });

        let execution_started = Instant::now();
        let (narrative, aggregate, coverage, fallback) = match decision.strategy {
            Strategy::RawData => {
                let transactions = self.store.fetch(user_id, &range, counted)?;
                let generation = self
                    .generator
                    .generate(&InsightPayload::Transactions { transactions })
                    .await;
                (generation.text, None, None, generation.fallback)
            }
            Strategy::IntelligentSummary => {
                let transactions = self.store.fetch(user_id, &range, counted)?;
                let aggregate = summarize(&transactions);
                let generation = self
                    .generator
                    .generate(&InsightPayload::Summary {
                        aggregate: aggregate.clone(),
                    })
                    .await;
                (
                    generation.text,
                    Some(aggregate),
                    None,
                    generation.fallback,
                )
            }
            Strategy::ChunkedProcessing => {
                let chunked = self
                    .chunker
                    .analyze(&self.store, &self.generator, user_id, &range, count)
                    .await?;
                (
                    chunked.narrative,
                    Some(chunked.aggregate),
                    Some(chunked.coverage),
                    chunked.fallback,
                )
            }
        };

        let timings = Timings {
            count_ms,
            execution_ms: elapsed_ms(execution_started),
            total_ms: elapsed_ms(started),
        };

        info!(
            user_id,
            strategy = %decision.strategy,
            fallback = fallback.is_some(),
            total_ms = timings.total_ms,
            "Analysis complete"
        );

        Ok(AnalysisResult {
            narrative,
            decision,
            transaction_count: count,
            aggregate,
            metadata: AnalysisMetadata {
                reasoning: decision.reasoning(),
                estimated_performance: decision
                    .strategy
                    .estimated_performance(count, &self.config),
                data_period: range,
                provider: self.generator.inner().provider().to_string(),
                model: self.generator.inner().model().to_string(),
                fallback,
                coverage,
                timings,
            },
        })
    }

    /// Recommend a strategy from the count alone
    pub fn recommend(
        &self,
        user_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<StrategyRecommendation> {
        let range = DateRange::new(start, end)?;
        let started = Instant::now();
        let count = self.store.count(user_id, &range)?;
        let decision = self.selector.select(count);
        let count_elapsed = started.elapsed();

        Ok(StrategyRecommendation {
            recommended: decision.strategy,
            transaction_count: count,
            reasoning: decision.reasoning(),
            estimated_performance: decision
                .strategy
                .estimated_performance(count, &self.config),
            data_period: range,
            performance_insights: PerformanceInsights::measured(count_elapsed),
        })
    }

    /// Compare all strategies for the matching dataset
    pub fn compare(
        &self,
        user_id: i64,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<StrategyComparison> {
        let range = DateRange::new(start, end)?;
        let count = self.store.count(user_id, &range)?;
        let decision = self.selector.select(count);

        let strategies = Strategy::all()
            .into_iter()
            .map(|strategy| {
                let performance = strategy.estimated_performance(count, &self.config);
                StrategyOption {
                    strategy,
                    applicable: self.selector.is_applicable(strategy, count),
                    estimated_tokens: performance.estimated_tokens,
                    estimated_response_time: performance.estimated_response_time,
                    cost_efficiency: performance.cost_efficiency,
                    advantages: strategy.advantages().to_string(),
                    disadvantages: strategy.disadvantages().to_string(),
                }
            })
            .collect();

        Ok(StrategyComparison {
            transaction_count: count,
            data_period: range,
            recommended: decision.strategy,
            strategies,
        })
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}
