//! Domain models for SpendSight

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Minor-unit precision of stored amounts (cents)
pub const MONEY_SCALE: u32 = 2;

/// Category key used for expenses without a category
pub const UNCATEGORIZED: &str = "Other";

/// Convert stored minor units into a decimal amount
pub fn from_minor_units(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Convert a decimal amount into minor units, rounding half away from zero
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    (amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
        * Decimal::from(100))
        .to_i64()
        .ok_or_else(|| Error::InvalidData(format!("Amount out of range: {}", amount)))
}

/// A user who owns transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Semantic direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
    /// Moves money between the user's own accounts; excluded from totals
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Income => "income",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" | "debit" => Ok(Self::Expense),
            "income" | "credit" => Ok(Self::Income),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction as read from the store
///
/// `amount` is always a non-negative magnitude; `kind` carries the sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: Option<String>,
}

impl TransactionRecord {
    pub fn is_expense(&self) -> bool {
        self.kind == TransactionKind::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionKind::Income
    }

    /// Year-month bucket key, e.g. "2024-03"
    pub fn period_key(&self) -> String {
        format!("{}-{:02}", self.date.year(), self.date.month())
    }
}

/// A transaction to be inserted
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: Option<String>,
    /// Deduplication key
    pub import_hash: String,
}

/// Optional, inclusive date bounds for a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Build a range, rejecting a start that falls after the end
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(Error::InvalidDateRange { start: s, end: e });
            }
        }
        Ok(Self { start, end })
    }

    /// The whole history
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(s), Some(e)) => write!(f, "{} to {}", s, e),
            (Some(s), None) => write!(f, "from {}", s),
            (None, Some(e)) => write!(f, "until {}", e),
            (None, None) => write!(f, "all time"),
        }
    }
}

/// Fixed-shape summary of a set of transactions
///
/// `total_spent` equals the sum of `category_breakdown` and of
/// `period_breakdown`; all three are folded from expenses only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub net_amount: Decimal,
    pub category_breakdown: BTreeMap<String, Decimal>,
    pub period_breakdown: BTreeMap<String, Decimal>,
    pub transaction_count: u64,
}

impl Aggregate {
    /// Fold another aggregate into this one
    ///
    /// Scalar totals add, breakdowns sum on matching keys. The operation is
    /// commutative and associative, so windows can be merged in any grouping.
    pub fn merge(&mut self, other: &Aggregate) {
        self.total_spent += other.total_spent;
        self.total_income += other.total_income;
        self.net_amount = self.total_income - self.total_spent;
        for (category, amount) in &other.category_breakdown {
            *self.category_breakdown.entry(category.clone()).or_default() += *amount;
        }
        for (period, amount) in &other.period_breakdown {
            *self.period_breakdown.entry(period.clone()).or_default() += *amount;
        }
        self.transaction_count += other.transaction_count;
    }

    /// Merge a sequence of aggregates into one
    pub fn merged<'a>(parts: impl IntoIterator<Item = &'a Aggregate>) -> Aggregate {
        parts.into_iter().fold(Aggregate::default(), |mut acc, part| {
            acc.merge(part);
            acc
        })
    }

    /// Categories ordered by amount spent, largest first
    pub fn top_categories(&self, limit: usize) -> Vec<(&str, Decimal)> {
        let mut categories: Vec<(&str, Decimal)> = self
            .category_breakdown
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
            .collect();
        categories.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        categories.truncate(limit);
        categories
    }
}
