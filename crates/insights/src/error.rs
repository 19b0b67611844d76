use thiserror::Error;

use tally_core::DomainError;
use tally_ledger::StoreError;

pub type InsightsResult<T> = Result<T, InsightsError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightsError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("ledger store error: {0}")]
    Store(#[from] StoreError),
}
