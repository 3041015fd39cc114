//! CSV import of transactions
//!
//! Columns are located by header name, so order does not matter:
//! `date,description,amount[,type][,category]`.

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionKind, MONEY_SCALE};

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    kind: Option<usize>,
    category: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| Error::InvalidData(format!("Missing '{}' column", name)))
        };

        Ok(Self {
            date: required("date")?,
            description: required("description")?,
            amount: required("amount")?,
            kind: find("type"),
            category: find("category"),
        })
    }
}

/// Parse a transaction CSV for `user_id`
///
/// An empty `type` falls back to the amount's sign: negative is an expense,
/// positive is income. Amounts are stored unsigned; the kind carries the
/// direction.
pub fn parse_csv<R: Read>(reader: R, user_id: i64) -> Result<Vec<NewTransaction>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut seen: HashMap<(NaiveDate, String, Decimal), u32> = HashMap::new();
    let mut transactions = Vec::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let field = |idx: usize, name: &str| {
            record.get(idx).ok_or_else(|| {
                Error::InvalidData(format!("Row {}: missing {}", line + 1, name))
            })
        };

        let date = parse_date(field(columns.date, "date")?)?;
        let description = field(columns.description, "description")?.to_string();
        let signed = parse_amount(field(columns.amount, "amount")?)?;

        let kind = match columns.kind.and_then(|i| record.get(i)).filter(|s| !s.is_empty()) {
            Some(raw) => TransactionKind::from_str(raw).map_err(Error::InvalidData)?,
            None if signed.is_sign_negative() => TransactionKind::Expense,
            None => TransactionKind::Income,
        };
        let category = columns
            .category
            .and_then(|i| record.get(i))
            .filter(|s| !s.is_empty())
            .map(String::from);

        let amount = signed.abs();

        // Identical rows within one file stay distinct; re-importing the file does not
        let ordinal = seen
            .entry((date, description.clone(), amount))
            .and_modify(|n| *n += 1)
            .or_insert(0);
        let import_hash = generate_hash(user_id, &date, &description, amount, *ordinal);

        transactions.push(NewTransaction {
            date,
            description,
            amount,
            kind,
            category,
            import_hash,
        });
    }

    debug!("Parsed {} transactions for user {}", transactions.len(), user_id);
    Ok(transactions)
}

fn generate_hash(
    user_id: i64,
    date: &NaiveDate,
    description: &str,
    amount: Decimal,
    ordinal: u32,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!("{}|{}|{}|{}|{}", user_id, date, description, amount, ordinal).as_bytes(),
    );
    hex::encode(hasher.finalize())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    let formats = [
        "%Y-%m-%d", // 2024-01-15
        "%m/%d/%Y", // 01/15/2024
    ];

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    Err(Error::InvalidData(format!("Unable to parse date: {}", s)))
}

/// Parse an amount string, handling currency symbols, commas and
/// accounting-style parentheses
fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    let amount = Decimal::from_str(&cleaned)
        .map_err(|_| Error::InvalidData(format!("Unable to parse amount: {}", s)))?;

    if amount.scale() > MONEY_SCALE {
        return Err(Error::InvalidData(format!(
            "Amount has more than {} decimal places: {}",
            MONEY_SCALE, s
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert_eq!(
            parse_date("01/15/2024").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
        assert!(parse_date("15th of January").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), d("1234.56"));
        assert_eq!(parse_amount("-123.45").unwrap(), d("-123.45"));
        assert_eq!(parse_amount("(100.00)").unwrap(), d("-100.00"));
        assert!(parse_amount("12.345").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn test_parse_csv_with_types() {
        let csv = "date,description,amount,type,category
2024-03-02,Grocer,42.10,expense,Groceries
2024-03-01,Payroll,2500.00,income,
2024-03-01,To savings,300.00,transfer,";

        let txs = parse_csv(csv.as_bytes(), 1).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[0].kind, TransactionKind::Expense);
        assert_eq!(txs[0].amount, d("42.10"));
        assert_eq!(txs[0].category.as_deref(), Some("Groceries"));
        assert_eq!(txs[1].kind, TransactionKind::Income);
        assert!(txs[1].category.is_none());
        assert_eq!(txs[2].kind, TransactionKind::Transfer);
    }

    #[test]
    fn test_parse_csv_infers_kind_from_sign() {
        let csv = "description,amount,date
Coffee,-4.50,2024-03-02
Refund,19.99,2024-03-03";

        let txs = parse_csv(csv.as_bytes(), 1).unwrap();
        assert_eq!(txs[0].kind, TransactionKind::Expense);
        assert_eq!(txs[0].amount, d("4.50"));
        assert_eq!(txs[1].kind, TransactionKind::Income);
    }

    #[test]
    fn test_parse_csv_missing_column() {
        let csv = "date,amount\n2024-01-01,5.00";
        let err = parse_csv(csv.as_bytes(), 1).unwrap_err();
        assert!(err.to_string().contains("description"));
    }

    #[test]
    fn test_parse_csv_unknown_type() {
        let csv = "date,description,amount,type\n2024-01-01,x,5.00,gift";
        assert!(parse_csv(csv.as_bytes(), 1).is_err());
    }

    #[test]
    fn test_hashes_distinguish_repeats_and_users() {
        let csv = "date,description,amount
2024-01-01,Coffee,-3.00
2024-01-01,Coffee,-3.00";

        let first = parse_csv(csv.as_bytes(), 1).unwrap();
        assert_ne!(first[0].import_hash, first[1].import_hash);

        // Same file again yields the same hashes
        let again = parse_csv(csv.as_bytes(), 1).unwrap();
        assert_eq!(first[0].import_hash, again[0].import_hash);
        assert_eq!(first[1].import_hash, again[1].import_hash);

        let other_user = parse_csv(csv.as_bytes(), 2).unwrap();
        assert_ne!(first[0].import_hash, other_user[0].import_hash);
    }
}
