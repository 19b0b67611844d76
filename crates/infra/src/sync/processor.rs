//! Sync job handler.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use tally_ledger::{LedgerWriter, SharedCategoryRules, StoreError, UpsertOutcome};

use super::aggregator::{AggregatorClient, AggregatorError};
use super::retry::{classify, should_retry_within};
use crate::jobs::{Job, JobHandler, JobResult, SyncJobData, SyncOutcome};

/// Why a sync attempt did not finish. Only the message matters to the
/// retry decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
    #[error("aggregator reported an unsuccessful sync")]
    Unsuccessful,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Pulls an account's transactions and upserts them into the ledger.
pub struct SyncProcessor<A, L> {
    aggregator: A,
    ledger: L,
    rules: Arc<SharedCategoryRules>,
}

impl<A: AggregatorClient, L: LedgerWriter> SyncProcessor<A, L> {
    pub fn new(aggregator: A, ledger: L, rules: Arc<SharedCategoryRules>) -> Self {
        Self {
            aggregator,
            ledger,
            rules,
        }
    }

    /// One sync run. Rows are keyed by source id, so overlapping windows
    /// update instead of duplicating.
    pub fn process(&self, data: &SyncJobData) -> Result<SyncOutcome, SyncError> {
        let sync = self.aggregator.sync_transactions(data.account_id)?;
        if !sync.success {
            return Err(SyncError::Unsuccessful);
        }

        // Rule edits made mid-run apply from the next run on.
        let rules = self.rules.snapshot();
        let mut inserted = 0;
        for raw in &sync.transactions {
            let txn = raw.to_synced(data.account_id, &rules);
            if self.ledger.upsert_synced(txn)? == UpsertOutcome::Inserted {
                inserted += 1;
            }
        }

        let processed_at = Utc::now();
        self.ledger.mark_synced(data.account_id, processed_at)?;

        debug!(
            account_id = %data.account_id,
            inserted,
            synced = sync.transactions.len(),
            "transactions upserted"
        );
        Ok(SyncOutcome::synced(data, inserted, sync.transactions.len(), processed_at))
    }
}

impl<A: AggregatorClient, L: LedgerWriter> JobHandler for SyncProcessor<A, L> {
    fn handle(&self, job: &Job) -> JobResult {
        let error = match self.process(&job.data) {
            Ok(outcome) => return JobResult::Completed(outcome),
            Err(e) => e.to_string(),
        };

        // The executor owns the attempt budget; the classifier uses the same cap.
        let retry_count = job.effective_retry_count();
        if should_retry_within(&error, retry_count, job.retry_policy.max_attempts) {
            debug!(job_id = %job.id, retry_count, error = %error, "sync attempt failed");
            return JobResult::Retry(error);
        }

        warn!(
            job_id = %job.id,
            account_id = %job.data.account_id,
            class = ?classify(&error),
            retry_count,
            error = %error,
            "sync will not be retried"
        );
        JobResult::Completed(SyncOutcome::terminal(&job.data, error, Utc::now()))
    }
}
