//! Where the money went in one month.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::{Amount, Month, percent_of, ratio};
use tally_ledger::{Transaction, TransactionQuery};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpending {
    pub category: String,
    pub amount: Amount,
    pub transaction_count: usize,
    /// Share of the month's total spend, two decimals.
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySpendingSummary {
    pub total_spending: Amount,
    pub category_count: usize,
    pub average_transaction_amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendingByCategory {
    pub month: Month,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub summary: CategorySpendingSummary,
    pub spending_by_category: Vec<CategorySpending>,
}

/// Categorized debits in `month`, largest category first.
pub fn spending_by_category(transactions: &[Transaction], month: Month) -> SpendingByCategory {
    let query = TransactionQuery::new().in_month(month).debits();

    let mut groups: BTreeMap<&str, (Amount, usize)> = BTreeMap::new();
    for txn in transactions.iter().filter(|t| query.matches(t)) {
        let Some(category) = txn.category.as_deref() else {
            continue;
        };
        let entry = groups.entry(category).or_insert((Decimal::ZERO, 0));
        entry.0 += txn.magnitude();
        entry.1 += 1;
    }

    let total_spending: Amount = groups.values().map(|(amount, _)| *amount).sum();
    let transaction_count: usize = groups.values().map(|(_, count)| *count).sum();

    let mut rows: Vec<CategorySpending> = groups
        .into_iter()
        .map(|(category, (amount, count))| CategorySpending {
            category: category.to_string(),
            amount,
            transaction_count: count,
            percentage: percent_of(amount, total_spending),
        })
        .collect();
    // Stable sort keeps alphabetical order between equal amounts.
    rows.sort_by(|a, b| b.amount.cmp(&a.amount));

    SpendingByCategory {
        month,
        start_date: month.start(),
        end_date: month.end(),
        summary: CategorySpendingSummary {
            total_spending,
            category_count: rows.len(),
            average_transaction_amount: ratio(total_spending, Decimal::from(transaction_count)),
        },
        spending_by_category: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, dec, txn};

    #[test]
    fn groups_sorts_and_computes_shares() {
        let rows = vec![
            txn("-30", Some("food"), None, at(2024, 1, 2)),
            txn("-10", Some("food"), None, at(2024, 1, 3)),
            txn("-60", Some("rent"), None, at(2024, 1, 4)),
            txn("-5", None, None, at(2024, 1, 4)),
            txn("500", Some("salary"), None, at(2024, 1, 5)),
            txn("-99", Some("food"), None, at(2024, 2, 1)),
        ];
        let jan: Month = "2024-01".parse().unwrap();
        let result = spending_by_category(&rows, jan);

        let cats: Vec<&str> = result.spending_by_category.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(cats, vec!["rent", "food"]);
        assert_eq!(result.spending_by_category[0].percentage, dec("60"));
        assert_eq!(result.spending_by_category[1].amount, dec("40"));
        assert_eq!(result.spending_by_category[1].transaction_count, 2);
        assert_eq!(result.summary.total_spending, dec("100"));
        assert_eq!(result.summary.category_count, 2);
        assert_eq!(result.summary.average_transaction_amount, dec("100") / dec("3"));
    }

    #[test]
    fn percentages_round_to_two_places() {
        let rows = vec![
            txn("-1", Some("a"), None, at(2024, 1, 2)),
            txn("-1", Some("b"), None, at(2024, 1, 2)),
            txn("-1", Some("c"), None, at(2024, 1, 2)),
        ];
        let result = spending_by_category(&rows, "2024-01".parse().unwrap());
        for row in &result.spending_by_category {
            assert_eq!(row.percentage, dec("33.33"));
        }
    }

    #[test]
    fn empty_month_is_zeroed() {
        let result = spending_by_category(&[], "2024-01".parse().unwrap());
        assert!(result.spending_by_category.is_empty());
        assert_eq!(result.summary, CategorySpendingSummary::default());
    }
}
