//! Transaction operations and the storage collaborators

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::Database;
use crate::analytics::{ChunkWindow, CountEstimator, TransactionFetcher};
use crate::error::{Error, Result};
use crate::models::{
    from_minor_units, to_minor_units, DateRange, NewTransaction, TransactionKind,
    TransactionRecord,
};

/// WHERE clause and parameters for a user plus optional date bounds
///
/// Covers all four range shapes: both bounds, start only, end only, none.
fn range_filter(user_id: i64, range: &DateRange) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut conditions = vec!["t.user_id = ?"];
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id)];

    if let Some(start) = range.start {
        conditions.push("t.date >= ?");
        params.push(Box::new(start.to_string()));
    }
    if let Some(end) = range.end {
        conditions.push("t.date <= ?");
        params.push(Box::new(end.to_string()));
    }

    (format!("WHERE {}", conditions.join(" AND ")), params)
}

impl Database {
    /// Insert a transaction (returns None if duplicate)
    pub fn insert_transaction(&self, user_id: i64, tx: &NewTransaction) -> Result<Option<i64>> {
        let category_id = match tx.category.as_deref().filter(|c| !c.is_empty()) {
            Some(name) => Some(self.upsert_category(name)?),
            None => None,
        };

        let conn = self.conn()?;

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM transactions WHERE import_hash = ?",
                params![tx.import_hash],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            return Ok(None); // Duplicate, skip
        }

        conn.execute(
            r#"
            INSERT INTO transactions (user_id, date, description, amount_cents, kind, category_id, import_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                tx.date.to_string(),
                tx.description,
                to_minor_units(tx.amount.abs())?,
                tx.kind.as_str(),
                category_id,
                tx.import_hash,
            ],
        )?;

        Ok(Some(conn.last_insert_rowid()))
    }

    /// Count a user's transactions in a date range with a single aggregate query
    pub fn count_transactions_for_user(&self, user_id: i64, range: &DateRange) -> Result<u64> {
        let conn = self.conn()?;
        let (where_clause, params) = range_filter(user_id, range);

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM transactions t {}", where_clause),
            params_refs.as_slice(),
            |row| row.get(0),
        )?;

        Ok(count.max(0) as u64)
    }

    /// Fetch a user's transactions, newest first, optionally one window at a time
    pub fn fetch_transactions(
        &self,
        user_id: i64,
        range: &DateRange,
        window: Option<ChunkWindow>,
    ) -> Result<Vec<TransactionRecord>> {
        let conn = self.conn()?;
        let (where_clause, mut params) = range_filter(user_id, range);

        let mut sql = format!(
            r#"
            SELECT t.id, t.user_id, t.date, t.description, t.amount_cents, t.kind, c.name
            FROM transactions t
            LEFT JOIN categories c ON c.id = t.category_id
            {}
            ORDER BY t.date DESC, t.id DESC
            "#,
            where_clause
        );
        if let Some(window) = window {
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(i64::try_from(window.size).unwrap_or(i64::MAX)));
            params.push(Box::new(i64::try_from(window.offset).unwrap_or(i64::MAX)));
        }
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_refs.as_slice(), |row| {
                let date_str: String = row.get(2)?;
                let kind_str: String = row.get(5)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    date_str,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    kind_str,
                    row.get::<_, Option<String>>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, user_id, date, description, cents, kind, category)| {
                Ok(TransactionRecord {
                    id,
                    user_id,
                    date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| {
                        Error::InvalidData(format!(
                            "Bad date '{}' on transaction {}: {}",
                            date, id, e
                        ))
                    })?,
                    description,
                    amount: from_minor_units(cents),
                    kind: kind.parse::<TransactionKind>().map_err(Error::InvalidData)?,
                    category,
                })
            })
            .collect()
    }
}

/// Storage failures are surfaced as `CollaboratorUnavailable`; malformed rows
/// keep their own error
fn as_collaborator_error(err: Error) -> Error {
    match err {
        Error::Database(_) | Error::Pool(_) => Error::CollaboratorUnavailable(err.to_string()),
        other => other,
    }
}

impl CountEstimator for Database {
    fn count(&self, user_id: i64, range: &DateRange) -> Result<u64> {
        self.count_transactions_for_user(user_id, range)
            .map_err(as_collaborator_error)
    }
}

impl TransactionFetcher for Database {
    fn fetch(
        &self,
        user_id: i64,
        range: &DateRange,
        window: Option<ChunkWindow>,
    ) -> Result<Vec<TransactionRecord>> {
        self.fetch_transactions(user_id, range, window)
            .map_err(as_collaborator_error)
    }
}
