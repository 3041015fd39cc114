//! Mock backend for testing
//!
//! Produces deterministic narratives from the payload figures. Useful for
//! unit tests and for running the engine without provider credentials.

use async_trait::async_trait;

use super::types::{GeneratorError, GeneratorErrorKind, InsightPayload};
use super::InsightGenerator;

/// Mock insight generator
///
/// Can be configured to fail with a specific error kind.
#[derive(Clone, Debug, Default)]
pub struct MockBackend {
    /// Whether calls should succeed
    pub healthy: bool,
    /// Error kind returned when unhealthy
    pub failure: Option<GeneratorErrorKind>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            failure: None,
        }
    }

    /// Create a mock backend that reports `Unavailable`
    pub fn unhealthy() -> Self {
        Self::failing(GeneratorErrorKind::Unavailable)
    }

    /// Create a mock backend that fails every call with `kind`
    pub fn failing(kind: GeneratorErrorKind) -> Self {
        Self {
            healthy: false,
            failure: Some(kind),
        }
    }

    fn error(&self) -> GeneratorError {
        let msg = "mock backend configured to fail".to_string();
        match self.failure.unwrap_or(GeneratorErrorKind::Unavailable) {
            GeneratorErrorKind::Unavailable => GeneratorError::Unavailable(msg),
            GeneratorErrorKind::AuthFailed => GeneratorError::AuthFailed(msg),
            GeneratorErrorKind::RateLimited => GeneratorError::RateLimited(msg),
            GeneratorErrorKind::TransientFailure => GeneratorError::TransientFailure(msg),
        }
    }
}

#[async_trait]
impl InsightGenerator for MockBackend {
    async fn generate(&self, payload: &InsightPayload) -> Result<String, GeneratorError> {
        if !self.healthy {
            return Err(self.error());
        }

        let text = match payload {
            InsightPayload::Transactions { transactions } => {
                let spent: rust_decimal::Decimal = transactions
                    .iter()
                    .filter(|t| t.is_expense())
                    .map(|t| t.amount)
                    .sum();
                format!(
                    "Mock analysis of {} transactions ({}): {} spent in total.",
                    transactions.len(),
                    payload.period(),
                    spent
                )
            }
            InsightPayload::Summary { aggregate } => {
                let top = aggregate
                    .top_categories(1)
                    .first()
                    .map(|(name, amount)| format!(" Largest category: {} ({}).", name, amount))
                    .unwrap_or_default();
                format!(
                    "Mock summary of {} transactions: spent {}, earned {}, net {}.{}",
                    aggregate.transaction_count,
                    aggregate.total_spent,
                    aggregate.total_income,
                    aggregate.net_amount,
                    top
                )
            }
            InsightPayload::Window {
                window,
                total_windows,
                aggregate,
            } => format!(
                "Mock slice {}/{}: {} transactions, {} spent.",
                window, total_windows, aggregate.transaction_count, aggregate.total_spent
            ),
            InsightPayload::Consolidated {
                aggregate,
                windows_covered,
                total_windows,
                ..
            } => format!(
                "Mock consolidated analysis across {}/{} slices: {} transactions, spent {}, net {}.",
                windows_covered,
                total_windows,
                aggregate.transaction_count,
                aggregate.total_spent,
                aggregate.net_amount
            ),
        };

        Ok(text)
    }

    fn is_available(&self) -> bool {
        self.healthy
    }

    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Aggregate;

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let backend = MockBackend::new();
        let payload = InsightPayload::Window {
            window: 1,
            total_windows: 3,
            aggregate: Aggregate::default(),
        };

        let a = backend.generate(&payload).await.unwrap();
        let b = backend.generate(&payload).await.unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("Mock slice 1/3"));
    }

    #[tokio::test]
    async fn test_failing_mock_reports_kind() {
        let backend = MockBackend::failing(GeneratorErrorKind::RateLimited);
        assert!(!backend.is_available());

        let err = backend
            .generate(&InsightPayload::Summary {
                aggregate: Aggregate::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GeneratorErrorKind::RateLimited);
    }

    #[tokio::test]
    async fn test_unhealthy_is_unavailable() {
        let err = MockBackend::unhealthy()
            .generate(&InsightPayload::Transactions {
                transactions: vec![],
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), GeneratorErrorKind::Unavailable);
    }
}
