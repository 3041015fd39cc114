//! Folding transactions into an `Aggregate`

use crate::models::{Aggregate, TransactionKind, TransactionRecord, UNCATEGORIZED};

/// Summarize a set of transactions
///
/// Expenses feed `total_spent` and both breakdowns, income feeds
/// `total_income`, transfers only count. Empty input yields an all-zero
/// aggregate.
pub fn summarize(transactions: &[TransactionRecord]) -> Aggregate {
    let mut aggregate = Aggregate::default();

    for tx in transactions {
        match tx.kind {
            TransactionKind::Expense => {
                aggregate.total_spent += tx.amount;
                let category = tx.category.as_deref().unwrap_or(UNCATEGORIZED);
                *aggregate
                    .category_breakdown
                    .entry(category.to_string())
                    .or_default() += tx.amount;
                *aggregate
                    .period_breakdown
                    .entry(tx.period_key())
                    .or_default() += tx.amount;
            }
            TransactionKind::Income => aggregate.total_income += tx.amount,
            TransactionKind::Transfer => {}
        }
    }

    aggregate.net_amount = aggregate.total_income - aggregate.total_spent;
    aggregate.transaction_count = transactions.len() as u64;
    aggregate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn tx(
        id: i64,
        date: (i32, u32, u32),
        amount: &str,
        kind: TransactionKind,
        category: Option<&str>,
    ) -> TransactionRecord {
        TransactionRecord {
            id,
            user_id: 1,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            description: format!("tx {}", id),
            amount: dec(amount),
            kind,
            category: category.map(String::from),
        }
    }

    fn sample() -> Vec<TransactionRecord> {
        vec![
            tx(1, (2024, 1, 5), "42.10", TransactionKind::Expense, Some("Groceries")),
            tx(2, (2024, 1, 9), "2500.00", TransactionKind::Income, Some("Salary")),
            tx(3, (2024, 2, 1), "12.99", TransactionKind::Expense, None),
            tx(4, (2024, 2, 3), "57.90", TransactionKind::Expense, Some("Groceries")),
            tx(5, (2024, 2, 4), "300.00", TransactionKind::Transfer, None),
        ]
    }

    #[test]
    fn test_empty_input() {
        let aggregate = summarize(&[]);
        assert_eq!(aggregate, Aggregate::default());
        assert_eq!(aggregate.transaction_count, 0);
        assert!(aggregate.category_breakdown.is_empty());
        assert!(aggregate.period_breakdown.is_empty());
    }

    #[test]
    fn test_totals_and_breakdowns() {
        let aggregate = summarize(&sample());

        assert_eq!(aggregate.total_spent, dec("112.99"));
        assert_eq!(aggregate.total_income, dec("2500.00"));
        assert_eq!(aggregate.net_amount, dec("2387.01"));
        assert_eq!(aggregate.transaction_count, 5);

        assert_eq!(aggregate.category_breakdown["Groceries"], dec("100.00"));
        assert_eq!(aggregate.category_breakdown[UNCATEGORIZED], dec("12.99"));
        assert!(!aggregate.category_breakdown.contains_key("Salary"));

        assert_eq!(aggregate.period_breakdown["2024-01"], dec("42.10"));
        assert_eq!(aggregate.period_breakdown["2024-02"], dec("70.89"));
    }

    #[test]
    fn test_breakdowns_sum_to_total_spent() {
        let aggregate = summarize(&sample());
        let by_category: Decimal = aggregate.category_breakdown.values().copied().sum();
        let by_period: Decimal = aggregate.period_breakdown.values().copied().sum();
        assert_eq!(by_category, aggregate.total_spent);
        assert_eq!(by_period, aggregate.total_spent);
    }

    #[test]
    fn test_no_drift_over_many_small_amounts() {
        let transactions: Vec<_> = (0..10_000)
            .map(|i| tx(i, (2024, 3, 1), "0.10", TransactionKind::Expense, None))
            .collect();
        assert_eq!(summarize(&transactions).total_spent, dec("1000.00"));
    }

    #[test]
    fn test_merge_of_parts_equals_summary_of_whole() {
        let all = sample();
        let (left, right) = all.split_at(2);

        let mut merged = summarize(left);
        merged.merge(&summarize(right));
        assert_eq!(merged, summarize(&all));

        // Commutative
        let mut reversed = summarize(right);
        reversed.merge(&summarize(left));
        assert_eq!(reversed, merged);
    }

    #[test]
    fn test_merge_is_associative() {
        let all = sample();
        let parts: Vec<Aggregate> = all.chunks(2).map(summarize).collect();

        let mut left_first = parts[0].clone();
        left_first.merge(&parts[1]);
        left_first.merge(&parts[2]);

        let mut right_first = parts[1].clone();
        right_first.merge(&parts[2]);
        let mut grouped = parts[0].clone();
        grouped.merge(&right_first);

        assert_eq!(left_first, grouped);
        assert_eq!(Aggregate::merged(&parts), summarize(&all));
    }
}
