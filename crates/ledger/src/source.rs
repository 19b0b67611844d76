//! Rows as delivered by the bank aggregator.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Amount};

use crate::categorize::CategoryRules;
use crate::normalize::normalize_transaction_name;
use crate::transaction::{SyncedTransaction, TransactionType};

/// Raw category recorded when the feed supplied none.
pub const UNCATEGORIZED: &str = "uncategorized";

/// A transaction exactly as the aggregator reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub amount: Amount,
    #[serde(default)]
    pub merchant_name: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category: Option<Vec<String>>,
}

impl RawTransaction {
    /// Merchant label used for display and keyword categorization.
    pub fn merchant(&self) -> &str {
        self.merchant_name
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(self.name.as_str())
    }

    pub fn categories(&self) -> &[String] {
        self.category.as_deref().unwrap_or_default()
    }

    /// Normalize and categorize this row for storage under `account_id`.
    pub fn to_synced(&self, account_id: AccountId, rules: &CategoryRules) -> SyncedTransaction {
        SyncedTransaction {
            account_id,
            source_id: self.transaction_id.clone(),
            posted_at: self.date.and_time(NaiveTime::MIN).and_utc(),
            amount: self.amount,
            kind: TransactionType::from_amount(self.amount),
            merchant: Some(self.merchant().to_string()),
            normalized_name: normalize_transaction_name(&self.name),
            category: rules.categorize(self.categories(), self.merchant()).to_string(),
            raw_category: self
                .categories()
                .first()
                .cloned()
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            notes: Some(self.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn deserializes_aggregator_shape() {
        let raw: RawTransaction = serde_json::from_value(serde_json::json!({
            "transaction_id": "tx-1",
            "date": "2024-01-15",
            "amount": "-12.50",
            "name": "DEBIT SHELL 0042",
            "category": ["Transportation", "Gas Stations"]
        }))
        .unwrap();

        assert_eq!(raw.merchant_name, None);
        assert_eq!(raw.merchant(), "DEBIT SHELL 0042");
        assert_eq!(raw.categories().len(), 2);
        assert_eq!(raw.amount, Decimal::from_str("-12.50").unwrap());
    }

    #[test]
    fn to_synced_derives_every_field() {
        let raw = RawTransaction {
            transaction_id: "tx-9".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            amount: Decimal::from_str("-89.45").unwrap(),
            merchant_name: Some("Loblaws".to_string()),
            name: "PAYMENT Loblaws Grocery".to_string(),
            category: Some(vec!["Food and Drink".to_string()]),
        };
        let account = AccountId::new();
        let synced = raw.to_synced(account, &CategoryRules::default());

        assert_eq!(synced.account_id, account);
        assert_eq!(synced.source_id, "tx-9");
        assert_eq!(synced.kind, TransactionType::Debit);
        assert_eq!(synced.merchant.as_deref(), Some("Loblaws"));
        assert_eq!(synced.normalized_name, "loblaws grocery");
        assert_eq!(synced.category, "food");
        assert_eq!(synced.raw_category, "Food and Drink");
        assert_eq!(synced.notes.as_deref(), Some("PAYMENT Loblaws Grocery"));
        assert_eq!(synced.posted_at.to_rfc3339(), "2024-01-03T00:00:00+00:00");
    }

    #[test]
    fn missing_categories_record_uncategorized() {
        let raw = RawTransaction {
            transaction_id: "tx-2".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            amount: Decimal::from(2000),
            merchant_name: None,
            name: "Payroll".to_string(),
            category: None,
        };
        let synced = raw.to_synced(AccountId::new(), &CategoryRules::default());
        assert_eq!(synced.kind, TransactionType::Credit);
        assert_eq!(synced.raw_category, UNCATEGORIZED);
        assert_eq!(synced.category, "other");
    }
}
