//! Producer side of the sync queue.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use tally_core::{AccountId, UserId};

use super::store::{JobStore, JobStoreError, QueueStats};
use super::types::{Job, JobId, JobState, RetentionPolicy, RetryPolicy, SyncJobData};

/// Jobs returned by [`SyncQueue::jobs`] when no limit is given.
pub const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Reference to an enqueued sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobHandle {
    pub id: JobId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub enqueued_at: DateTime<Utc>,
}

impl From<&Job> for JobHandle {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.clone(),
            account_id: job.data.account_id,
            user_id: job.data.user_id,
            enqueued_at: job.created_at,
        }
    }
}

/// Enqueue and manage account syncs.
///
/// The caller has already checked that the user owns the account.
#[derive(Debug)]
pub struct SyncQueue<S> {
    store: S,
    retry_policy: RetryPolicy,
    retention: RetentionPolicy,
    last_stamp: Mutex<i64>,
}

impl<S: JobStore> SyncQueue<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            retry_policy: RetryPolicy::default(),
            retention: RetentionPolicy::default(),
            last_stamp: Mutex::new(i64::MIN),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current time, bumped by a millisecond if needed so that no two jobs
    /// enqueued by this queue share a stamp.
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self.last_stamp.lock().unwrap_or_else(PoisonError::into_inner);
        let stamp = now.timestamp_millis().max(last.saturating_add(1));
        *last = stamp;
        DateTime::from_timestamp_millis(stamp).unwrap_or(now)
    }

    fn new_job(&self, account_id: AccountId, user_id: UserId) -> Job {
        Job::new(SyncJobData::new(account_id, user_id), self.next_stamp())
            .with_retry_policy(self.retry_policy.clone())
    }

    pub fn enqueue_sync(&self, account_id: AccountId, user_id: UserId) -> Result<JobHandle, QueueError> {
        let job = self.new_job(account_id, user_id);
        let handle = JobHandle::from(&job);
        self.store.enqueue(job)?;

        info!(job_id = %handle.id, account_id = %account_id, user_id = %user_id, "sync enqueued");
        Ok(handle)
    }

    /// One job per account, inserted as a single batch.
    pub fn enqueue_sync_bulk(
        &self,
        account_ids: &[AccountId],
        user_id: UserId,
    ) -> Result<Vec<JobHandle>, QueueError> {
        let jobs: Vec<Job> = account_ids
            .iter()
            .map(|&account_id| self.new_job(account_id, user_id))
            .collect();
        let handles: Vec<JobHandle> = jobs.iter().map(JobHandle::from).collect();
        self.store.enqueue_batch(jobs)?;

        info!(user_id = %user_id, count = handles.len(), "bulk sync enqueued");
        Ok(handles)
    }

    pub fn job(&self, job_id: &JobId) -> Result<Option<Job>, QueueError> {
        Ok(self.store.get(job_id)?)
    }

    /// Newest first; `limit` defaults to [`DEFAULT_LIST_LIMIT`].
    pub fn jobs(&self, state: Option<JobState>, limit: Option<usize>) -> Result<Vec<Job>, QueueError> {
        Ok(self.store.list(state, limit.unwrap_or(DEFAULT_LIST_LIMIT))?)
    }

    /// Remove a job that is not running. `Ok(false)` for an unknown id; an
    /// active job is an error.
    pub fn cancel(&self, job_id: &JobId) -> Result<bool, QueueError> {
        let removed = self.store.remove(job_id)?;
        if removed {
            info!(job_id = %job_id, "sync job cancelled");
        }
        Ok(removed)
    }

    pub fn stats(&self) -> Result<QueueStats, QueueError> {
        Ok(self.store.stats()?)
    }

    /// Apply the retention policy now. Returns how many jobs were dropped.
    pub fn clear_completed(&self) -> Result<usize, QueueError> {
        let removed = self.store.trim(&self.retention)?;
        info!(removed, "finished sync jobs cleared");
        Ok(removed)
    }

    pub fn pause(&self) -> Result<(), QueueError> {
        self.store.pause()?;
        info!("sync queue paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<(), QueueError> {
        self.store.resume()?;
        info!("sync queue resumed");
        Ok(())
    }

    pub fn is_paused(&self) -> Result<bool, QueueError> {
        Ok(self.store.is_paused()?)
    }
}
