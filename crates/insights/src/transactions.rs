//! Reading and hand-editing a user's transactions.
//!
//! Synced rows come in through the sync pipeline; this service covers the
//! manual side: paged listing, lookup, manual entry, category and note edits,
//! and deletion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use tally_core::{AccountId, Amount, DomainError, TransactionId, UserId};
use tally_ledger::{
    LedgerReader, LedgerWriter, SharedCategoryRules, Transaction, TransactionQuery,
    TransactionType, normalize_transaction_name,
};

use crate::budgets::Pagination;
use crate::error::InsightsResult;

/// Listing filter with 1-based paging. Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionListQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub account_id: Option<AccountId>,
    pub page: usize,
    pub limit: usize,
}

impl TransactionListQuery {
    pub const DEFAULT_LIMIT: usize = 20;
    pub const MAX_LIMIT: usize = 100;
}

impl Default for TransactionListQuery {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            category: None,
            account_id: None,
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}

/// A hand-entered transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub posted_at: DateTime<Utc>,
    pub amount: Amount,
    pub kind: TransactionType,
    pub merchant: Option<String>,
    /// Derived from the merchant when absent.
    pub normalized_name: Option<String>,
    pub raw_category: Option<String>,
    /// Derived from the merchant keywords when absent.
    pub category: Option<String>,
    pub notes: Option<String>,
}

/// Editable fields; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub category: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransactionService<S> {
    store: S,
    rules: Arc<SharedCategoryRules>,
}

impl<S> TransactionService<S> {
    pub fn new(store: S) -> Self {
        Self::with_rules(store, Arc::new(SharedCategoryRules::default()))
    }

    /// Share the rule set the sync pipeline uses.
    pub fn with_rules(store: S, rules: Arc<SharedCategoryRules>) -> Self {
        Self { store, rules }
    }
}

impl<S: LedgerReader> TransactionService<S> {
    /// Newest first.
    pub fn list(&self, user_id: UserId, query: &TransactionListQuery) -> InsightsResult<TransactionPage> {
        let page = query.page.max(1);
        let limit = query.limit.clamp(1, TransactionListQuery::MAX_LIMIT);

        let filter = TransactionQuery {
            from: query.from,
            to: query.to,
            kind: None,
            category: query.category.clone(),
            account_id: query.account_id,
        };
        let mut rows = self.store.transactions(user_id, &filter)?;
        rows.sort_by(|a, b| b.posted_at.cmp(&a.posted_at).then_with(|| a.id.cmp(&b.id)));
        let total = rows.len();

        let transactions = rows
            .into_iter()
            .skip((page - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Ok(TransactionPage {
            transactions,
            pagination: Pagination {
                page,
                limit,
                total,
                pages: total.div_ceil(limit),
            },
        })
    }

    pub fn get(&self, user_id: UserId, transaction_id: TransactionId) -> InsightsResult<Transaction> {
        Ok(self
            .store
            .transaction(user_id, transaction_id)?
            .ok_or_else(|| DomainError::not_found("transaction"))?)
    }
}

impl<S: LedgerReader + LedgerWriter> TransactionService<S> {
    pub fn create(&self, user_id: UserId, new: NewTransaction) -> InsightsResult<Transaction> {
        let owned = self
            .store
            .account(new.account_id)?
            .is_some_and(|a| a.user_id == user_id);
        if !owned {
            return Err(DomainError::not_found("account").into());
        }

        let merchant = new.merchant.as_deref().unwrap_or_default();
        let category = match new.category.filter(|c| !c.is_empty()) {
            Some(category) => Some(category),
            None if !merchant.is_empty() => {
                Some(self.rules.snapshot().categorize(&[], merchant).to_string())
            }
            None => None,
        };
        let normalized_name = new
            .normalized_name
            .unwrap_or_else(|| normalize_transaction_name(merchant));

        let txn = Transaction {
            id: TransactionId::new(),
            account_id: new.account_id,
            source_id: None,
            posted_at: new.posted_at,
            amount: new.amount,
            kind: new.kind,
            merchant: new.merchant,
            normalized_name,
            category,
            raw_category: new.raw_category,
            notes: new.notes,
            is_manual: true,
        };
        self.store.insert_transaction(txn.clone())?;

        info!(user_id = %user_id, transaction_id = %txn.id, account_id = %txn.account_id, "manual transaction created");
        Ok(txn)
    }

    /// An empty category is ignored; notes may be cleared with an empty string.
    pub fn update(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
        update: TransactionUpdate,
    ) -> InsightsResult<Transaction> {
        let mut txn = self.get(user_id, transaction_id)?;

        if let Some(category) = update.category.filter(|c| !c.is_empty()) {
            txn.category = Some(category);
        }
        if let Some(notes) = update.notes {
            txn.notes = Some(notes);
        }
        self.store.update_transaction(&txn)?;

        info!(user_id = %user_id, transaction_id = %transaction_id, "transaction updated");
        Ok(txn)
    }

    pub fn delete(&self, user_id: UserId, transaction_id: TransactionId) -> InsightsResult<()> {
        if !self.store.delete_transaction(user_id, transaction_id)? {
            return Err(DomainError::not_found("transaction").into());
        }
        info!(user_id = %user_id, transaction_id = %transaction_id, "transaction deleted");
        Ok(())
    }
}
