//! Chunked, progressive aggregation for large transaction sets
//!
//! The matched set is split into contiguous windows of `chunk_size`
//! transactions (newest first). Up to `max_chunks` windows are fetched,
//! summarized and described one at a time in ascending offset order; their
//! aggregates are merged and a final consolidated narrative is generated
//! from the merged figures. When the cap cuts the plan short the result is
//! marked partial.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ai::{FallbackGenerator, GeneratorErrorKind, InsightGenerator, InsightPayload};
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::models::{Aggregate, DateRange};

use super::source::{ChunkWindow, TransactionFetcher};
use super::summarizer::summarize;

/// Split `total` transactions into contiguous windows of `chunk_size`
///
/// Produces `ceil(total / chunk_size)` windows at offsets `0, k, 2k, ...`;
/// the last window holds the remainder.
pub fn plan_windows(total: u64, chunk_size: u64) -> Vec<ChunkWindow> {
    if chunk_size == 0 {
        return Vec::new();
    }
    (0..total.div_ceil(chunk_size))
        .map(|i| {
            let offset = i * chunk_size;
            ChunkWindow {
                offset,
                size: chunk_size.min(total - offset),
            }
        })
        .collect()
}

/// How much of the planned window set was analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkCoverage {
    pub chunk_size: u64,
    pub total_windows: usize,
    pub processed_windows: usize,
    /// True when `processed_windows < total_windows`
    pub partial: bool,
    /// Transactions folded into the merged aggregate
    pub processed_transactions: u64,
    /// Per-window narrative fragments, in window order
    pub fragments: Vec<String>,
}

impl ChunkCoverage {
    /// One-line disclosure for partial results
    pub fn disclosure(&self, total_transactions: u64) -> Option<String> {
        self.partial.then(|| {
            format!(
                "[Partial analysis: {} of {} windows covered ({} of {} most recent transactions)]",
                self.processed_windows,
                self.total_windows,
                self.processed_transactions,
                total_transactions
            )
        })
    }
}

/// Output of a chunked run
#[derive(Debug, Clone)]
pub struct ChunkedAnalysis {
    pub narrative: String,
    pub aggregate: Aggregate,
    pub coverage: ChunkCoverage,
    /// First failure kind that forced a fallback narrative, if any
    pub fallback: Option<GeneratorErrorKind>,
}

/// Coordinates windowed summarization of large datasets
#[derive(Debug, Clone, Copy)]
pub struct ChunkCoordinator {
    chunk_size: u64,
    max_chunks: usize,
}

impl ChunkCoordinator {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            max_chunks: config.max_chunks.max(1),
        }
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Analyze `total_count` matching transactions window by window
    ///
    /// `total_count` is the count the strategy decision was made on; the
    /// dataset is not re-counted. Storage failures abort the run; generator
    /// failures are absorbed by the fallback wrapper.
    pub async fn analyze<F, G>(
        &self,
        fetcher: &F,
        generator: &FallbackGenerator<G>,
        user_id: i64,
        range: &DateRange,
        total_count: u64,
    ) -> Result<ChunkedAnalysis>
    where
        F: TransactionFetcher + ?Sized,
        G: InsightGenerator,
    {
        let windows = plan_windows(total_count, self.chunk_size);
        let total_windows = windows.len();
        let to_process = total_windows.min(self.max_chunks);

        info!(
            user_id,
            total_count,
            chunk_size = self.chunk_size,
            total_windows,
            to_process,
            "Starting chunked analysis"
        );

        let mut merged = Aggregate::default();
        let mut fragments = Vec::with_capacity(to_process);
        let mut fallback = None;

        for (index, window) in windows.iter().take(to_process).enumerate() {
            let records = fetcher.fetch(user_id, range, Some(*window))?;
            if records.len() as u64 != window.size {
                debug!(
                    window = index + 1,
                    expected = window.size,
                    fetched = records.len(),
                    "Window size differs from plan"
                );
            }

            let aggregate = summarize(&records);
            merged.merge(&aggregate);

            let generation = generator
                .generate(&InsightPayload::Window {
                    window: index + 1,
                    total_windows,
                    aggregate,
                })
                .await;
            fallback = fallback.or(generation.fallback);

            debug!(
                window = index + 1,
                offset = window.offset,
                transactions = records.len(),
                fallback = generation.is_fallback(),
                "Window analyzed"
            );
            fragments.push(generation.text);
        }

        let coverage = ChunkCoverage {
            chunk_size: self.chunk_size,
            total_windows,
            processed_windows: to_process,
            partial: to_process < total_windows,
            processed_transactions: merged.transaction_count,
            fragments,
        };

        if coverage.partial {
            warn!(
                user_id,
                processed_windows = coverage.processed_windows,
                total_windows,
                processed_transactions = coverage.processed_transactions,
                total_count,
                "Chunked analysis is partial: window cap reached"
            );
        }

        let final_generation = generator
            .generate(&InsightPayload::Consolidated {
                aggregate: merged.clone(),
                windows_covered: coverage.processed_windows,
                total_windows,
                fragments: coverage.fragments.clone(),
            })
            .await;
        fallback = fallback.or(final_generation.fallback);

        let narrative = match coverage.disclosure(total_count) {
            Some(header) => format!("{}\n\n{}", header, final_generation.text),
            None => final_generation.text,
        };

        Ok(ChunkedAnalysis {
            narrative,
            aggregate: merged,
            coverage,
            fallback,
        })
    }
}
