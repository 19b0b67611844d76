//! In-memory ledger for tests/dev.
//!
//! All tables sit behind one lock, so every write (an upsert together with
//! its key index, for instance) is atomic with respect to concurrent workers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use tally_core::{AccountId, BudgetId, TransactionId, UserId};
use tally_ledger::{
    Account, Budget, BudgetQuery, LedgerReader, LedgerWriter, StoreError, SyncedTransaction,
    Transaction, TransactionKey, TransactionQuery, UpsertOutcome,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    transactions: HashMap<TransactionId, Transaction>,
    by_source: HashMap<TransactionKey, TransactionId>,
    budgets: HashMap<BudgetId, Budget>,
}

impl Tables {
    fn owns(&self, user_id: UserId, account_id: AccountId) -> bool {
        self.accounts
            .get(&account_id)
            .is_some_and(|a| a.user_id == user_id)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    tables: RwLock<Tables>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("ledger lock poisoned".to_string()))
    }

    /// Add or replace an account.
    pub fn insert_account(&self, account: Account) -> Result<(), StoreError> {
        self.write()?.accounts.insert(account.id, account);
        Ok(())
    }

    pub fn transaction_count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.transactions.len())
    }
}

impl LedgerReader for InMemoryLedgerStore {
    fn account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&account_id).cloned())
    }

    fn accounts(&self, user_id: UserId) -> Result<Vec<Account>, StoreError> {
        let tables = self.read()?;
        let mut accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(accounts)
    }

    fn transactions(&self, user_id: UserId, query: &TransactionQuery) -> Result<Vec<Transaction>, StoreError> {
        let tables = self.read()?;
        let mut rows: Vec<Transaction> = tables
            .transactions
            .values()
            .filter(|t| tables.owns(user_id, t.account_id) && query.matches(t))
            .cloned()
            .collect();
        // Newest first.
        rows.sort_by(|a, b| b.posted_at.cmp(&a.posted_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rows)
    }

    fn transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<Option<Transaction>, StoreError> {
        let tables = self.read()?;
        Ok(tables
            .transactions
            .get(&transaction_id)
            .filter(|t| tables.owns(user_id, t.account_id))
            .cloned())
    }

    fn budget(&self, user_id: UserId, budget_id: BudgetId) -> Result<Option<Budget>, StoreError> {
        Ok(self
            .read()?
            .budgets
            .get(&budget_id)
            .filter(|b| b.user_id == user_id)
            .cloned())
    }

    fn budgets(&self, user_id: UserId, query: &BudgetQuery) -> Result<Vec<Budget>, StoreError> {
        Ok(self
            .read()?
            .budgets
            .values()
            .filter(|b| b.user_id == user_id && query.matches(b))
            .cloned()
            .collect())
    }
}

impl LedgerWriter for InMemoryLedgerStore {
    fn upsert_synced(&self, txn: SyncedTransaction) -> Result<UpsertOutcome, StoreError> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(&txn.account_id) {
            return Err(StoreError::NotFound("account".to_string()));
        }

        let key = txn.key();
        match tables.by_source.get(&key).copied() {
            Some(id) => {
                tables.transactions.insert(id, txn.into_transaction(id));
                Ok(UpsertOutcome::Updated)
            }
            None => {
                let id = TransactionId::new();
                tables.by_source.insert(key, id);
                tables.transactions.insert(id, txn.into_transaction(id));
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    fn mark_synced(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let account = tables
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::NotFound("account".to_string()))?;
        account.last_synced_at = Some(at);
        Ok(())
    }

    fn insert_transaction(&self, txn: Transaction) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(&txn.account_id) {
            return Err(StoreError::NotFound("account".to_string()));
        }
        if let Some(key) = txn.key() {
            if tables.by_source.contains_key(&key) {
                return Err(StoreError::Conflict(format!(
                    "transaction {} already recorded",
                    key.source_id
                )));
            }
            tables.by_source.insert(key, txn.id);
        }
        tables.transactions.insert(txn.id, txn);
        Ok(())
    }

    fn update_transaction(&self, txn: &Transaction) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.transactions.get_mut(&txn.id) {
            Some(slot) if slot.account_id == txn.account_id && slot.source_id == txn.source_id => {
                *slot = txn.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound("transaction".to_string())),
        }
    }

    fn delete_transaction(
        &self,
        user_id: UserId,
        transaction_id: TransactionId,
    ) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        let owned = tables
            .transactions
            .get(&transaction_id)
            .is_some_and(|t| tables.owns(user_id, t.account_id));
        if !owned {
            return Ok(false);
        }
        let Some(txn) = tables.transactions.remove(&transaction_id) else {
            return Ok(false);
        };
        if let Some(key) = txn.key() {
            tables.by_source.remove(&key);
        }
        Ok(true)
    }

    fn insert_budget(&self, budget: Budget) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let taken = tables.budgets.values().any(|b| {
            b.user_id == budget.user_id && b.month == budget.month && b.category == budget.category
        });
        if taken {
            return Err(StoreError::Conflict(format!(
                "budget for {} in {} already exists",
                budget.category, budget.month
            )));
        }
        tables.budgets.insert(budget.id, budget);
        Ok(())
    }

    fn update_budget(&self, budget: &Budget) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        match tables.budgets.get_mut(&budget.id) {
            Some(slot) if slot.user_id == budget.user_id => {
                *slot = budget.clone();
                Ok(())
            }
            _ => Err(StoreError::NotFound("budget".to_string())),
        }
    }

    fn delete_budget(&self, user_id: UserId, budget_id: BudgetId) -> Result<bool, StoreError> {
        let mut tables = self.write()?;
        if !tables.budgets.get(&budget_id).is_some_and(|b| b.user_id == user_id) {
            return Ok(false);
        }
        Ok(tables.budgets.remove(&budget_id).is_some())
    }
}
