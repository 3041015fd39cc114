//! Storage collaborators consumed by the engine

use serde::Serialize;

use crate::error::Result;
use crate::models::{DateRange, TransactionRecord};

/// One contiguous slice of an ordered transaction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkWindow {
    pub offset: u64,
    pub size: u64,
}

/// Answers "how many transactions match" without materializing them
///
/// Implementations must issue a single aggregate query.
pub trait CountEstimator: Send + Sync {
    fn count(&self, user_id: i64, range: &DateRange) -> Result<u64>;
}

/// Retrieves transaction records for a user and date range
///
/// Results are ordered by date descending, then id descending, so windows
/// are stable across calls against an unchanged dataset. `window: None`
/// returns every matching record.
pub trait TransactionFetcher: Send + Sync {
    fn fetch(
        &self,
        user_id: i64,
        range: &DateRange,
        window: Option<ChunkWindow>,
    ) -> Result<Vec<TransactionRecord>>;
}
