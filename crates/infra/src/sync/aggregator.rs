//! Port to the bank-data aggregator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use tally_core::AccountId;
use tally_ledger::RawTransaction;

/// Error returned by the aggregator. The message is what the retry
/// classifier inspects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AggregatorError {
    pub message: String,
}

impl AggregatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response of one transaction sync call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregatorSync {
    pub success: bool,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

impl AggregatorSync {
    pub fn ok(transactions: Vec<RawTransaction>) -> Self {
        Self {
            success: true,
            transactions,
        }
    }
}

pub trait AggregatorClient: Send + Sync {
    /// Fetch the account's recent transactions. Windows may overlap between
    /// calls.
    fn sync_transactions(&self, account_id: AccountId) -> Result<AggregatorSync, AggregatorError>;
}

impl<A> AggregatorClient for Arc<A>
where
    A: AggregatorClient + ?Sized,
{
    fn sync_transactions(&self, account_id: AccountId) -> Result<AggregatorSync, AggregatorError> {
        (**self).sync_transactions(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aggregator_payload() {
        let sync: AggregatorSync = serde_json::from_str(
            r#"{
                "success": true,
                "transactions": [
                    {"transaction_id": "tx-1", "date": "2024-01-05", "amount": -25.50,
                     "merchant_name": "Loblaws", "name": "LOBLAWS #123 DEBIT",
                     "category": ["Food and Drink", "Groceries"]},
                    {"transaction_id": "tx-2", "date": "2024-01-06", "amount": 2000,
                     "name": "PAYROLL"}
                ]
            }"#,
        )
        .unwrap();

        assert!(sync.success);
        assert_eq!(sync.transactions.len(), 2);
        assert_eq!(sync.transactions[0].merchant(), "Loblaws");
        assert_eq!(sync.transactions[1].merchant(), "PAYROLL");
        assert!(sync.transactions[1].categories().is_empty());
    }

    #[test]
    fn failure_without_transactions() {
        let sync: AggregatorSync = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(!sync.success);
        assert!(sync.transactions.is_empty());
    }
}
