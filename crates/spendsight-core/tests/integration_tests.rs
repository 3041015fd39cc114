//! Integration tests for spendsight-core
//!
//! These tests exercise the full import → count → strategy → insight workflow
//! against a real SQLite store.

use chrono::{Duration, NaiveDate};
use spendsight_core::{
    ai::FALLBACK_LABEL,
    db::Database,
    import::parse_csv,
    AnalyticsConfig, Error, GeneratorErrorKind, MockBackend, Strategy, StrategyEngine,
};

/// CSV with `n` transactions, one every third of a day going back from
/// 2024-12-31; every fifth row is a paycheck
fn generated_csv(n: usize) -> String {
    let latest = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let mut csv = String::from("date,description,amount,type,category\n");
    for i in 0..n {
        let date = latest - Duration::days(i as i64 / 3);
        if i % 5 == 4 {
            csv.push_str(&format!("{},Paycheck {},2500.00,income,Salary\n", date, i));
        } else {
            let category = ["Groceries", "Dining", "Transport", ""][i % 4];
            csv.push_str(&format!(
                "{},Purchase {},-{}.{:02},,{}\n",
                date,
                i,
                5 + i % 37,
                i % 100,
                category
            ));
        }
    }
    csv
}

/// Database with one user holding `n` imported transactions
fn seeded_db(n: usize) -> (Database, i64) {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let user = db
        .upsert_user("Test User", Some("test@example.com"))
        .expect("Failed to create user");

    let transactions = parse_csv(generated_csv(n).as_bytes(), user).expect("Failed to parse CSV");
    assert_eq!(transactions.len(), n);

    for tx in &transactions {
        db.insert_transaction(user, tx).unwrap();
    }
    (db, user)
}

fn engine(db: Database, backend: MockBackend) -> StrategyEngine<Database, MockBackend> {
    StrategyEngine::new(db, backend, AnalyticsConfig::default())
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn test_import_is_idempotent() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("Test User", None).unwrap();
    let transactions = parse_csv(generated_csv(25).as_bytes(), user).unwrap();

    let imported = transactions
        .iter()
        .filter(|tx| db.insert_transaction(user, tx).unwrap().is_some())
        .count();
    assert_eq!(imported, 25);

    // Importing the same file again skips everything
    let skipped = transactions
        .iter()
        .filter(|tx| db.insert_transaction(user, tx).unwrap().is_none())
        .count();
    assert_eq!(skipped, 25);

    let categories = db.list_categories().unwrap();
    assert!(categories.contains(&"Salary".to_string()));
    assert!(!categories.contains(&String::new()));
}

// =============================================================================
// Strategy scenarios
// =============================================================================

#[tokio::test]
async fn test_small_dataset_uses_raw_data() {
    let (db, user) = seeded_db(40);
    let engine = engine(db, MockBackend::new());

    let result = engine.analyze(user, None, None).await.unwrap();

    assert_eq!(result.strategy(), Strategy::RawData);
    assert_eq!(result.transaction_count, 40);
    assert!(result.aggregate.is_none());
    assert!(result.metadata.coverage.is_none());
    assert!(!result.is_fallback());
    assert!(result.narrative.contains("40 transactions"));
    assert_eq!(result.metadata.provider, "mock");
}

#[tokio::test]
async fn test_medium_dataset_uses_summary() {
    let (db, user) = seeded_db(350);
    let engine = engine(db, MockBackend::new());

    let result = engine.analyze(user, None, None).await.unwrap();

    assert_eq!(result.strategy(), Strategy::IntelligentSummary);
    assert_eq!(result.transaction_count, 350);

    let aggregate = result.aggregate.expect("summary carries an aggregate");
    assert_eq!(aggregate.transaction_count, 350);
    assert_eq!(aggregate.net_amount, aggregate.total_income - aggregate.total_spent);
    // 70 paychecks of 2500.00
    assert_eq!(aggregate.total_income.to_string(), "175000.00");
    assert!(aggregate.category_breakdown.contains_key("Other"));
}

#[tokio::test]
async fn test_large_dataset_is_chunked_and_partial() {
    let (db, user) = seeded_db(4300);
    let engine = engine(db, MockBackend::new());

    let result = engine.analyze(user, None, None).await.unwrap();

    assert_eq!(result.strategy(), Strategy::ChunkedProcessing);
    assert_eq!(result.transaction_count, 4300);

    let coverage = result.metadata.coverage.as_ref().expect("chunked coverage");
    assert_eq!(coverage.total_windows, 86);
    assert_eq!(coverage.processed_windows, 5);
    assert!(coverage.partial);
    assert_eq!(coverage.processed_transactions, 250);
    assert_eq!(coverage.fragments.len(), 5);

    let aggregate = result.aggregate.as_ref().unwrap();
    assert_eq!(aggregate.transaction_count, 250);

    assert!(result
        .narrative
        .starts_with("[Partial analysis: 5 of 86 windows covered (250 of 4300"));
}

#[tokio::test]
async fn test_unavailable_provider_falls_back() {
    let (db, user) = seeded_db(40);
    let engine = engine(db, MockBackend::unhealthy());

    let result = engine.analyze(user, None, None).await.unwrap();

    assert_eq!(result.strategy(), Strategy::RawData);
    assert!(result.is_fallback());
    assert_eq!(result.metadata.fallback, Some(GeneratorErrorKind::Unavailable));
    assert!(result.narrative.starts_with(FALLBACK_LABEL));
    assert!(result.narrative.contains("unavailable"));
}

#[tokio::test]
async fn test_rate_limited_chunked_run_still_succeeds() {
    let (db, user) = seeded_db(1200);
    let engine = engine(db, MockBackend::failing(GeneratorErrorKind::RateLimited));

    let result = engine.analyze(user, None, None).await.unwrap();

    assert_eq!(result.strategy(), Strategy::ChunkedProcessing);
    assert_eq!(result.metadata.fallback, Some(GeneratorErrorKind::RateLimited));
    let coverage = result.metadata.coverage.unwrap();
    assert_eq!(coverage.total_windows, 24);
    assert!(coverage
        .fragments
        .iter()
        .all(|f| f.starts_with(FALLBACK_LABEL)));
}

// =============================================================================
// Date ranges and advisory
// =============================================================================

#[tokio::test]
async fn test_date_range_narrows_the_dataset() {
    let (db, user) = seeded_db(350);
    let engine = engine(db, MockBackend::new());

    // The last 10 days hold 30 transactions
    let start = NaiveDate::from_ymd_opt(2024, 12, 22);
    let end = NaiveDate::from_ymd_opt(2024, 12, 31);
    let result = engine.analyze(user, start, end).await.unwrap();

    assert_eq!(result.transaction_count, 30);
    assert_eq!(result.strategy(), Strategy::RawData);
    assert_eq!(result.metadata.data_period.start, start);
}

#[tokio::test]
async fn test_inverted_range_is_rejected() {
    let (db, user) = seeded_db(5);
    let engine = engine(db, MockBackend::new());

    let err = engine
        .analyze(
            user,
            NaiveDate::from_ymd_opt(2024, 6, 1),
            NaiveDate::from_ymd_opt(2024, 1, 1),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidDateRange { .. }));
}

#[tokio::test]
async fn test_unknown_user_gets_empty_raw_analysis() {
    let (db, user) = seeded_db(5);
    let engine = engine(db, MockBackend::new());

    let result = engine.analyze(user + 100, None, None).await.unwrap();
    assert_eq!(result.transaction_count, 0);
    assert_eq!(result.strategy(), Strategy::RawData);
}

#[test]
fn test_recommend_and_compare() {
    let (db, user) = seeded_db(350);
    let engine = engine(db, MockBackend::new());

    let recommendation = engine.recommend(user, None, None).unwrap();
    assert_eq!(recommendation.recommended, Strategy::IntelligentSummary);
    assert_eq!(recommendation.transaction_count, 350);

    let comparison = engine.compare(user, None, None).unwrap();
    assert_eq!(comparison.recommended, Strategy::IntelligentSummary);
    assert_eq!(comparison.strategies.len(), 3);

    let applicable: Vec<Strategy> = comparison
        .strategies
        .iter()
        .filter(|s| s.applicable)
        .map(|s| s.strategy)
        .collect();
    assert_eq!(applicable, vec![Strategy::IntelligentSummary]);
}
