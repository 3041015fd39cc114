//! Error types for SpendSight

use chrono::NaiveDate;
use thiserror::Error;

use crate::ai::GeneratorError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Transaction store unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("Insight generator error: {0}")]
    Generator(#[from] GeneratorError),
}

impl Error {
    /// Whether this error came from the storage collaborators
    ///
    /// Storage failures are fatal to an analysis request; there is no data
    /// to fall back on.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Pool(_) | Error::CollaboratorUnavailable(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
