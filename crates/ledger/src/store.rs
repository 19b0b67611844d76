//! Storage ports for the ledger.
//!
//! Reads and writes are split so the insights engine can depend on reads
//! only. Implementations must make [`LedgerWriter::upsert_synced`] and
//! [`LedgerWriter::mark_synced`] single atomic operations: workers run them
//! concurrently for overlapping data.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use tally_core::{AccountId, BudgetId, TransactionId, UserId};

use crate::account::Account;
use crate::budget::{Budget, BudgetQuery};
use crate::transaction::{SyncedTransaction, Transaction, TransactionQuery};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// What an upsert did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Read side of the ledger. All reads are scoped to the owning user.
pub trait LedgerReader: Send + Sync {
    fn account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    fn accounts(&self, user_id: UserId) -> Result<Vec<Account>, StoreError>;

    /// Transactions on accounts owned by `user_id` matching `query`.
    fn transactions(
        &self,
        user_id: UserId,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// `None` when the transaction is unknown or on another user's account.
    fn transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError>;

    fn budget(&self, user_id: UserId, budget_id: BudgetId) -> Result<Option<Budget>, StoreError>;

    fn budgets(&self, user_id: UserId, query: &BudgetQuery) -> Result<Vec<Budget>, StoreError>;
}

/// Write side of the ledger.
pub trait LedgerWriter: Send + Sync {
    /// Insert or update the row identified by `txn.key()`.
    fn upsert_synced(&self, txn: SyncedTransaction) -> Result<UpsertOutcome, StoreError>;

    /// Record a successful sync on the account.
    fn mark_synced(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Store a row as-is (manual entries). Fails with
    /// [`StoreError::NotFound`] for an unknown account.
    fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError>;

    /// Replace a stored row; its account and source id must not change.
    fn update_transaction(&self, txn: &Transaction) -> Result<(), StoreError>;

    /// Returns `false` when no such transaction exists for the user.
    fn delete_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Conflict`] when the user already has a budget
    /// for the same month and category.
    fn insert_budget(&self, budget: Budget) -> Result<(), StoreError>;

    fn update_budget(&self, budget: &Budget) -> Result<(), StoreError>;

    /// Returns `false` when no such budget exists for the user.
    fn delete_budget(&self, user_id: UserId, budget_id: BudgetId) -> Result<bool, StoreError>;
}

impl<S> LedgerReader for Arc<S>
where
    S: LedgerReader + ?Sized,
{
    fn account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).account(account_id)
    }

    fn accounts(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        (**self).accounts(user_id)
    }

    fn transactions(
        &self,
        user_id: UserId,
        query: &TransactionQuery,
    ) -> Result<Vec<Transaction>, StoreError> {
        (**self).transactions(user_id, query)
    }

    fn transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        (**self).transaction(user_id, transaction_id)
    }

    fn budget(&self, user_id: UserId, budget_id: BudgetId) -> Result<Option<Budget>, StoreError> {
        (**self).budget(user_id, budget_id)
    }

    fn budgets(&self, user_id: UserId, query: &BudgetQuery) -> Result<Vec<Budget>, StoreError> {
        (**self).budgets(user_id, query)
    }
}

impl<S> LedgerWriter for Arc<S>
where
    S: LedgerWriter + ?Sized,
{
    fn upsert_synced(&self, txn: SyncedTransaction) -> Result<UpsertOutcome, StoreError> {
        (**self).upsert_synced(txn)
    }

    fn mark_synced(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError> {
        (**self).mark_synced(account_id, at)
    }

    fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError> {
        (**self).insert_transaction(txn)
    }

    fn update_transaction(&self, txn: &Transaction) -> Result<(), StoreError> {
        (**self).update_transaction(txn)
    }

    fn delete_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<bool, StoreError> {
        (**self).delete_transaction(user_id, transaction_id)
    }

    fn insert_budget(&self, budget: Budget) -> Result<(), StoreError> {
        (**self).insert_budget(budget)
    }

    fn update_budget(&self, budget: &Budget) -> Result<(), StoreError> {
        (**self).update_budget(budget)
    }

    fn delete_budget(&self, user_id: UserId, budget_id: BudgetId) -> Result<bool, StoreError> {
        (**self).delete_budget(user_id, budget_id)
    }
}
