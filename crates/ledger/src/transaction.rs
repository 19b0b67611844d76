//! Stored transactions and the filters used to read them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Amount, Month, TransactionId};

/// Direction of a transaction, derived from the sign of its amount.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Outflow / spend.
    Debit,
    /// Inflow.
    Credit,
}

impl TransactionType {
    /// `amount > 0` is a credit; zero and negative amounts are debits.
    pub fn from_amount(amount: Amount) -> Self {
        if amount > Decimal::ZERO {
            Self::Credit
        } else {
            Self::Debit
        }
    }
}

/// Natural key of a synced transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionKey {
    pub account_id: AccountId,
    pub source_id: String,
}

/// A persisted transaction row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    /// Aggregator transaction id; `None` for manually entered rows.
    pub source_id: Option<String>,
    pub posted_at: DateTime<Utc>,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub merchant: Option<String>,
    pub normalized_name: String,
    pub category: Option<String>,
    pub raw_category: Option<String>,
    pub notes: Option<String>,
    pub is_manual: bool,
}

impl Transaction {
    pub fn is_debit(&self) -> bool {
        self.kind == TransactionType::Debit
    }

    pub fn is_credit(&self) -> bool {
        self.kind == TransactionType::Credit
    }

    /// Absolute value of the amount (spend for debits, income for credits).
    pub fn magnitude(&self) -> Amount {
        self.amount.abs()
    }

    pub fn key(&self) -> Option<TransactionKey> {
        self.source_id.as_ref().map(|source_id| TransactionKey {
            account_id: self.account_id,
            source_id: source_id.clone(),
        })
    }
}

/// A normalized, categorized row produced by the sync pipeline, ready to be
/// upserted by its [`TransactionKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedTransaction {
    pub account_id: AccountId,
    pub source_id: String,
    pub posted_at: DateTime<Utc>,
    pub amount: Amount,
    pub kind: TransactionType,
    pub merchant: Option<String>,
    pub normalized_name: String,
    pub category: String,
    pub raw_category: String,
    pub notes: Option<String>,
}

impl SyncedTransaction {
    pub fn key(&self) -> TransactionKey {
        TransactionKey {
            account_id: self.account_id,
            source_id: self.source_id.clone(),
        }
    }

    /// Materialize as a stored row with the given identity.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            source_id: Some(self.source_id),
            posted_at: self.posted_at,
            amount: self.amount,
            kind: self.kind,
            merchant: self.merchant,
            normalized_name: self.normalized_name,
            category: Some(self.category),
            raw_category: Some(self.raw_category),
            notes: self.notes,
            is_manual: false,
        }
    }
}

/// Filter for reading a user's transactions. Bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub account_id: Option<AccountId>,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn in_month(self, month: Month) -> Self {
        self.between(month.start(), month.end())
    }

    pub fn of_kind(mut self, kind: TransactionType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn debits(self) -> Self {
        self.of_kind(TransactionType::Debit)
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn for_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn matches(&self, txn: &Transaction) -> bool {
        self.from.is_none_or(|from| txn.posted_at >= from)
            && self.to.is_none_or(|to| txn.posted_at <= to)
            && self.kind.is_none_or(|kind| txn.kind == kind)
            && self
                .category
                .as_ref()
                .is_none_or(|c| txn.category.as_deref() == Some(c.as_str()))
            && self.account_id.is_none_or(|a| txn.account_id == a)
    }
}
