//! Merchants ranked by spend.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use tally_core::{Amount, Month, ratio};
use tally_ledger::{Transaction, TransactionQuery};

pub const DEFAULT_MERCHANT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantSpending {
    pub merchant: String,
    pub total_spent: Amount,
    pub transaction_count: usize,
    pub average_transaction_amount: Amount,
}

/// Debits grouped by raw merchant, biggest first, at most `limit` rows.
///
/// Rows without a merchant are skipped. `month` narrows to one month.
pub fn top_merchants(transactions: &[Transaction], month: Option<Month>, limit: usize) -> Vec<MerchantSpending> {
    let query = match month {
        Some(month) => TransactionQuery::new().in_month(month).debits(),
        None => TransactionQuery::new().debits(),
    };

    let mut groups: BTreeMap<&str, (Amount, usize)> = BTreeMap::new();
    for txn in transactions.iter().filter(|t| query.matches(t)) {
        let Some(merchant) = txn.merchant.as_deref().filter(|m| !m.is_empty()) else {
            continue;
        };
        let entry = groups.entry(merchant).or_insert((Decimal::ZERO, 0));
        entry.0 += txn.magnitude();
        entry.1 += 1;
    }

    let mut rows: Vec<MerchantSpending> = groups
        .into_iter()
        .map(|(merchant, (total_spent, count))| MerchantSpending {
            merchant: merchant.to_string(),
            total_spent,
            transaction_count: count,
            average_transaction_amount: ratio(total_spent, Decimal::from(count)),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_spent
            .cmp(&a.total_spent)
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    rows.truncate(limit);
    rows
}
