//! Database tests

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::*;
use crate::analytics::{ChunkWindow, CountEstimator, TransactionFetcher};
use crate::models::*;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_tx(
    day: NaiveDate,
    amount: &str,
    kind: TransactionKind,
    category: Option<&str>,
    hash: &str,
) -> NewTransaction {
    NewTransaction {
        date: day,
        description: format!("tx {}", hash),
        amount: Decimal::from_str(amount).unwrap(),
        kind,
        category: category.map(String::from),
        import_hash: hash.to_string(),
    }
}

/// One user with 12 transactions, one per month of 2024
fn seeded() -> (Database, i64) {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("Ada", Some("ada@example.com")).unwrap();
    for month in 1..=12 {
        let kind = if month % 4 == 0 {
            TransactionKind::Income
        } else {
            TransactionKind::Expense
        };
        db.insert_transaction(
            user,
            &new_tx(
                date(2024, month, 15),
                "19.99",
                kind,
                Some("Dining"),
                &format!("h{}", month),
            ),
        )
        .unwrap();
    }
    (db, user)
}

#[test]
fn test_in_memory_db() {
    let db = Database::in_memory().unwrap();
    assert!(db.list_users().unwrap().is_empty());
    assert!(db.list_categories().unwrap().is_empty());
}

#[test]
fn test_schema_exists() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let columns: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM pragma_table_info('transactions') WHERE name IN ('id', 'user_id', 'date', 'description', 'amount_cents', 'kind', 'category_id', 'import_hash', 'created_at')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(columns, 9, "transactions table should have 9 expected columns");

    let index: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_transactions_user_date'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(index, 1);
}

#[test]
fn test_user_upsert_by_email() {
    let db = Database::in_memory().unwrap();

    let id = db.upsert_user("Ada", Some("ada@example.com")).unwrap();
    let again = db.upsert_user("Ada L.", Some("ada@example.com")).unwrap();
    assert_eq!(id, again);

    let other = db.upsert_user("Grace", None).unwrap();
    assert_ne!(id, other);

    let users = db.list_users().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(db.get_user(id).unwrap().unwrap().name, "Ada");
    assert!(db.get_user(9999).unwrap().is_none());
}

#[test]
fn test_category_upsert() {
    let db = Database::in_memory().unwrap();
    let a = db.upsert_category("Groceries").unwrap();
    let b = db.upsert_category("Groceries").unwrap();
    assert_eq!(a, b);
    assert_eq!(db.list_categories().unwrap(), vec!["Groceries"]);
}

#[test]
fn test_insert_dedupes_by_hash() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("Ada", None).unwrap();
    let tx = new_tx(date(2024, 1, 1), "10.00", TransactionKind::Expense, None, "same");

    assert!(db.insert_transaction(user, &tx).unwrap().is_some());
    assert!(db.insert_transaction(user, &tx).unwrap().is_none());
    assert_eq!(db.count_transactions_for_user(user, &DateRange::all()).unwrap(), 1);
}

#[test]
fn test_amount_round_trips_exactly() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("Ada", None).unwrap();
    db.insert_transaction(
        user,
        &new_tx(date(2024, 1, 1), "-1234.56", TransactionKind::Expense, Some("Rent"), "r"),
    )
    .unwrap();

    let records = db.fetch_transactions(user, &DateRange::all(), None).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].amount, Decimal::from_str("1234.56").unwrap());
    assert_eq!(records[0].kind, TransactionKind::Expense);
    assert_eq!(records[0].category.as_deref(), Some("Rent"));
}

#[test]
fn test_count_all_range_shapes() {
    let (db, user) = seeded();

    let all = DateRange::all();
    let both = DateRange::new(Some(date(2024, 3, 1)), Some(date(2024, 5, 31))).unwrap();
    let start_only = DateRange::new(Some(date(2024, 10, 1)), None).unwrap();
    let end_only = DateRange::new(None, Some(date(2024, 2, 15))).unwrap();

    assert_eq!(db.count(user, &all).unwrap(), 12);
    assert_eq!(db.count(user, &both).unwrap(), 3);
    assert_eq!(db.count(user, &start_only).unwrap(), 3);
    assert_eq!(db.count(user, &end_only).unwrap(), 2);

    // Other users see nothing
    assert_eq!(db.count(user + 1, &all).unwrap(), 0);
}

#[test]
fn test_fetch_orders_newest_first() {
    let (db, user) = seeded();
    let records = db.fetch(user, &DateRange::all(), None).unwrap();

    assert_eq!(records.len(), 12);
    assert_eq!(records[0].date, date(2024, 12, 15));
    assert_eq!(records[11].date, date(2024, 1, 15));
    assert!(records.windows(2).all(|w| w[0].date >= w[1].date));
}

#[test]
fn test_fetch_windows_are_contiguous() {
    let (db, user) = seeded();
    let range = DateRange::all();

    let first = db
        .fetch(user, &range, Some(ChunkWindow { offset: 0, size: 5 }))
        .unwrap();
    let second = db
        .fetch(user, &range, Some(ChunkWindow { offset: 5, size: 5 }))
        .unwrap();
    let third = db
        .fetch(user, &range, Some(ChunkWindow { offset: 10, size: 5 }))
        .unwrap();

    assert_eq!((first.len(), second.len(), third.len()), (5, 5, 2));

    let all = db.fetch(user, &range, None).unwrap();
    let stitched: Vec<i64> = first
        .iter()
        .chain(&second)
        .chain(&third)
        .map(|t| t.id)
        .collect();
    let expected: Vec<i64> = all.iter().map(|t| t.id).collect();
    assert_eq!(stitched, expected);
}

#[test]
fn test_same_day_ties_break_by_id() {
    let db = Database::in_memory().unwrap();
    let user = db.upsert_user("Ada", None).unwrap();
    let day = date(2024, 6, 1);
    let first = db
        .insert_transaction(user, &new_tx(day, "1.00", TransactionKind::Expense, None, "a"))
        .unwrap()
        .unwrap();
    let second = db
        .insert_transaction(user, &new_tx(day, "2.00", TransactionKind::Expense, None, "b"))
        .unwrap()
        .unwrap();

    let records = db.fetch(user, &DateRange::all(), None).unwrap();
    assert_eq!(records[0].id, second);
    assert_eq!(records[1].id, first);
}

#[test]
fn test_encrypted_database_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("encrypted.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new_with_key(path, Some("correct horse")).unwrap();
        db.upsert_user("Ada", None).unwrap();
    }

    let reopened = Database::new_with_key(path, Some("correct horse")).unwrap();
    assert_eq!(reopened.list_users().unwrap().len(), 1);

    assert!(Database::new_with_key(path, Some("wrong passphrase")).is_err());
}

#[test]
fn test_derive_key_is_stable() {
    let a = derive_key("passphrase").unwrap();
    let b = derive_key("passphrase").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
    assert_ne!(a, derive_key("other").unwrap());
}
