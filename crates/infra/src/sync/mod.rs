//! Account sync: fetch from the aggregator, normalize, categorize, upsert.

pub mod aggregator;
pub mod processor;
pub mod retry;

pub use aggregator::{AggregatorClient, AggregatorError, AggregatorSync};
pub use processor::{SyncError, SyncProcessor};
pub use retry::{FailureClass, MAX_SYNC_RETRIES, classify, should_retry, should_retry_within};
