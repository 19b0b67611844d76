//! Transaction totals over an optional date range.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::Amount;
use tally_ledger::{Transaction, TransactionQuery};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStat {
    pub category: String,
    /// Signed sum; credits and debits in one category offset each other.
    pub total_amount: Amount,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStats {
    pub total_transactions: usize,
    /// Absolute sum of debits, not the signed ledger total.
    pub total_debits: Amount,
    pub total_credits: Amount,
    /// `total_credits - total_debits`.
    pub net_amount: Amount,
    pub category_stats: Vec<CategoryStat>,
}

/// Totals over `[from, to]`; either bound may be open.
///
/// `total_debits` is reported as a positive figure, so `net_amount` is
/// credits minus debits.
pub fn transaction_stats(
    transactions: &[Transaction],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> TransactionStats {
    let query = TransactionQuery {
        from,
        to,
        ..TransactionQuery::default()
    };

    let mut stats = TransactionStats::default();
    let mut by_category: BTreeMap<&str, (Amount, usize)> = BTreeMap::new();

    for txn in transactions.iter().filter(|t| query.matches(t)) {
        stats.total_transactions += 1;
        if txn.is_credit() {
            stats.total_credits += txn.amount;
        } else {
            stats.total_debits += txn.magnitude();
        }
        if let Some(category) = txn.category.as_deref().filter(|c| !c.is_empty()) {
            let entry = by_category.entry(category).or_insert((Decimal::ZERO, 0));
            entry.0 += txn.amount;
            entry.1 += 1;
        }
    }

    stats.net_amount = stats.total_credits - stats.total_debits;
    stats.category_stats = by_category
        .into_iter()
        .map(|(category, (total_amount, transaction_count))| CategoryStat {
            category: category.to_string(),
            total_amount,
            transaction_count,
        })
        .collect();
    stats
}

/// Distinct non-empty categories, alphabetical.
pub fn transaction_categories(transactions: &[Transaction]) -> Vec<String> {
    transactions
        .iter()
        .filter_map(|t| t.category.as_deref())
        .filter(|c| !c.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
