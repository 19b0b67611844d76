//! `tally-core`: shared building blocks.
//!
//! Identifiers, the domain error model, calendar months and money helpers.
//! No storage or runtime concerns live here.

pub mod error;
pub mod id;
pub mod money;
pub mod month;

pub use error::{DomainError, DomainResult};
pub use id::{AccountId, BudgetId, TransactionId, UserId};
pub use money::{Amount, percent_of, ratio, round2};
pub use month::Month;
