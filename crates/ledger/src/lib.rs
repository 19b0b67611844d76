//! `tally-ledger`
//!
//! **Responsibility:** the persisted ledger records (accounts, transactions,
//! budgets), the rules that turn a source feed row into a stored transaction
//! (name normalization, categorization), and the storage ports the sync
//! pipeline and the insights engine talk to.
//!
//! Storage itself lives elsewhere; this crate only defines the traits.

pub mod account;
pub mod budget;
pub mod categorize;
pub mod normalize;
pub mod source;
pub mod store;
pub mod transaction;

pub use account::Account;
pub use budget::{Budget, BudgetQuery};
pub use categorize::{CategoryRules, SharedCategoryRules};
pub use normalize::normalize_transaction_name;
pub use source::RawTransaction;
pub use store::{LedgerReader, LedgerWriter, StoreError, UpsertOutcome};
pub use transaction::{
    SyncedTransaction, Transaction, TransactionKey, TransactionQuery, TransactionType,
};
