//! Uniform fallback around any insight generator
//!
//! Every engine call to the generator goes through `FallbackGenerator`, so a
//! missing key, a rate limit or a provider outage degrades to a labelled
//! template narrative instead of failing the request.

use tracing::{debug, warn};

use super::types::{Generation, GeneratorErrorKind, InsightPayload};
use super::InsightGenerator;

/// Label prefixed to every substituted narrative
pub const FALLBACK_LABEL: &str = "[Fallback insight: AI provider unavailable";

/// Decorator converting generator failures into fallback narratives
#[derive(Clone)]
pub struct FallbackGenerator<G> {
    inner: G,
}

impl<G: InsightGenerator> FallbackGenerator<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    /// The wrapped generator
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Generate narrative text, substituting a fallback on any failure
    pub async fn generate(&self, payload: &InsightPayload) -> Generation {
        match self.inner.generate(payload).await {
            Ok(text) => {
                debug!(
                    provider = self.inner.provider(),
                    model = self.inner.model(),
                    chars = text.len(),
                    "Insight generated"
                );
                Generation {
                    text,
                    fallback: None,
                }
            }
            Err(e) => {
                let kind = e.kind();
                warn!(
                    provider = self.inner.provider(),
                    kind = %kind,
                    error = %e,
                    "Insight generator failed, using fallback narrative"
                );
                Generation {
                    text: fallback_narrative(payload, kind),
                    fallback: Some(kind),
                }
            }
        }
    }
}

/// Template narrative built from the payload's own figures
pub fn fallback_narrative(payload: &InsightPayload, kind: GeneratorErrorKind) -> String {
    let header = format!("{} ({})]", FALLBACK_LABEL, kind);

    let body = match payload {
        InsightPayload::Transactions { transactions } => {
            let spent: rust_decimal::Decimal = transactions
                .iter()
                .filter(|t| t.is_expense())
                .map(|t| t.amount)
                .sum();
            let income: rust_decimal::Decimal = transactions
                .iter()
                .filter(|t| t.is_income())
                .map(|t| t.amount)
                .sum();
            format!(
                "{} transactions for {}. Total spent: {}. Total income: {}. \
                Connect an AI provider for a detailed analysis.",
                transactions.len(),
                payload.period(),
                spent,
                income
            )
        }
        _ => {
            let Some(aggregate) = payload.aggregate() else {
                return header;
            };
            let top: Vec<String> = aggregate
                .top_categories(3)
                .into_iter()
                .map(|(name, amount)| format!("{} ({})", name, amount))
                .collect();
            let top = if top.is_empty() {
                "none".to_string()
            } else {
                top.join(", ")
            };
            let scope = match payload {
                InsightPayload::Window {
                    window,
                    total_windows,
                    ..
                } => format!("Slice {} of {}: ", window, total_windows),
                InsightPayload::Consolidated {
                    windows_covered,
                    total_windows,
                    ..
                } => format!("Across {} of {} slices: ", windows_covered, total_windows),
                _ => String::new(),
            };
            format!(
                "{}{} transactions for {}. Total spent: {}. Total income: {}. \
                Net: {}. Top categories: {}.",
                scope,
                aggregate.transaction_count,
                payload.period(),
                aggregate.total_spent,
                aggregate.total_income,
                aggregate.net_amount,
                top
            )
        }
    };

    format!("{} {}", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::Aggregate;
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use rust_decimal::Decimal;

    fn aggregate() -> Aggregate {
        Aggregate {
            total_spent: Decimal::from_str("120.00").unwrap(),
            total_income: Decimal::from_str("500.00").unwrap(),
            net_amount: Decimal::from_str("380.00").unwrap(),
            category_breakdown: BTreeMap::from([
                ("Food".into(), Decimal::from_str("80.00").unwrap()),
                ("Other".into(), Decimal::from_str("40.00").unwrap()),
            ]),
            period_breakdown: BTreeMap::from([(
                "2024-02".into(),
                Decimal::from_str("120.00").unwrap(),
            )]),
            transaction_count: 12,
        }
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let generator = FallbackGenerator::new(MockBackend::new());
        let generation = generator
            .generate(&InsightPayload::Summary {
                aggregate: aggregate(),
            })
            .await;

        assert!(!generation.is_fallback());
        assert!(generation.text.starts_with("Mock summary"));
    }

    #[tokio::test]
    async fn test_every_failure_kind_falls_back() {
        for kind in [
            GeneratorErrorKind::Unavailable,
            GeneratorErrorKind::AuthFailed,
            GeneratorErrorKind::RateLimited,
            GeneratorErrorKind::TransientFailure,
        ] {
            let generator = FallbackGenerator::new(MockBackend::failing(kind));
            let generation = generator
                .generate(&InsightPayload::Summary {
                    aggregate: aggregate(),
                })
                .await;

            assert_eq!(generation.fallback, Some(kind));
            assert!(generation.text.starts_with(FALLBACK_LABEL));
            assert!(generation.text.contains(kind.as_str()));
        }
    }

    #[test]
    fn test_fallback_narrative_uses_figures() {
        let text = fallback_narrative(
            &InsightPayload::Consolidated {
                aggregate: aggregate(),
                windows_covered: 5,
                total_windows: 86,
                fragments: vec![],
            },
            GeneratorErrorKind::RateLimited,
        );

        assert!(text.starts_with(
            "[Fallback insight: AI provider unavailable (rate_limited)] Across 5 of 86 slices"
        ));
        assert!(text.contains("Total spent: 120.00"));
        assert!(text.contains("Food (80.00), Other (40.00)"));
    }

    #[test]
    fn test_fallback_text_is_plain_ascii() {
        assert!(FALLBACK_LABEL.is_ascii());
        let text = fallback_narrative(
            &InsightPayload::Summary {
                aggregate: Aggregate::default(),
            },
            GeneratorErrorKind::Unavailable,
        );
        assert!(text.is_ascii(), "{}", text);
    }
}
