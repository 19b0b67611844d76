//! Sync job types and policies.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tally_core::{AccountId, UserId};

/// Job key, `sync-<accountId>-<epochMillis>`.
///
/// Uniqueness relies on the enqueue stamp; the queue makes stamps strictly
/// increasing within a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn for_account(account_id: AccountId, stamp_millis: i64) -> Self {
        Self(format!("sync-{account_id}-{stamp_millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload of a sync job. Immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJobData {
    pub account_id: AccountId,
    pub user_id: UserId,
    pub retry_count: u32,
}

impl SyncJobData {
    pub fn new(account_id: AccountId, user_id: UserId) -> Self {
        Self {
            account_id,
            user_id,
            retry_count: 0,
        }
    }
}

/// What a finished sync reports back.
///
/// `success == false` is a terminal business failure: the job still counts as
/// completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    pub account_id: AccountId,
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_transaction_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_transaction_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
}

impl SyncOutcome {
    pub fn synced(data: &SyncJobData, inserted: usize, synced: usize, processed_at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            account_id: data.account_id,
            user_id: data.user_id,
            new_transaction_count: Some(inserted),
            synced_transaction_count: Some(synced),
            error: None,
            processed_at,
        }
    }

    pub fn terminal(data: &SyncJobData, error: impl Into<String>, processed_at: DateTime<Utc>) -> Self {
        Self {
            success: false,
            account_id: data.account_id,
            user_id: data.user_id,
            new_transaction_count: None,
            synced_transaction_count: None,
            error: Some(error.into()),
            processed_at,
        }
    }
}

/// Coarse queue state, used for listing and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

/// Job execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum JobStatus {
    /// Queued, or scheduled for another attempt.
    Waiting,
    /// Claimed by a worker.
    Active,
    /// Finished; the outcome may still be a terminal business failure.
    Completed { outcome: SyncOutcome },
    /// Out of attempts.
    Failed { error: String, attempts: u32 },
}

impl JobStatus {
    pub fn state(&self) -> JobState {
        match self {
            JobStatus::Waiting => JobState::Waiting,
            JobStatus::Active => JobState::Active,
            JobStatus::Completed { .. } => JobState::Completed,
            JobStatus::Failed { .. } => JobState::Failed,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed { .. } | JobStatus::Failed { .. })
    }
}

/// Exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    /// Delay after failed attempt `attempt` (1-indexed): base * 2^(attempt-1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Whether another attempt may follow attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// How many finished jobs are kept for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub keep_completed: usize,
    pub keep_failed: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_completed: 100,
            keep_failed: 50,
        }
    }
}

/// A sync job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub data: SyncJobData,
    pub status: JobStatus,
    pub retry_policy: RetryPolicy,
    /// Attempts started so far.
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest time of the next attempt, set while backing off.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub history: Vec<JobAttemptRecord>,
}

/// Record of a job execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAttemptRecord {
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl Job {
    /// A waiting job keyed by the account and `enqueued_at`.
    pub fn new(data: SyncJobData, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: JobId::for_account(data.account_id, enqueued_at.timestamp_millis()),
            data,
            status: JobStatus::Waiting,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            created_at: enqueued_at,
            updated_at: enqueued_at,
            scheduled_at: None,
            finished_at: None,
            history: Vec::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn state(&self) -> JobState {
        self.status.state()
    }

    /// Waiting and past any backoff.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Waiting && self.scheduled_at.is_none_or(|at| now >= at)
    }

    /// Retry count as the failure classifier sees it: the initial count plus
    /// attempts made before the current one.
    pub fn effective_retry_count(&self) -> u32 {
        self.data.retry_count + self.attempt.saturating_sub(1)
    }

    pub fn mark_active(&mut self) {
        self.status = JobStatus::Active;
        self.attempt += 1;
        self.scheduled_at = None;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self, outcome: SyncOutcome, started_at: DateTime<Utc>) {
        let now = Utc::now();
        self.record(started_at, now, outcome.error.clone());
        self.status = JobStatus::Completed { outcome };
        self.updated_at = now;
        self.finished_at = Some(now);
    }

    /// Record a retryable failure.
    ///
    /// Returns the backoff before the next attempt, or `None` when attempts are
    /// exhausted and the job is now failed.
    pub fn mark_retry(&mut self, error: String, started_at: DateTime<Utc>) -> Option<Duration> {
        let now = Utc::now();
        self.record(started_at, now, Some(error.clone()));
        self.updated_at = now;

        if self.retry_policy.should_retry(self.attempt) {
            let delay = self.retry_policy.delay_for_attempt(self.attempt);
            self.scheduled_at = Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.status = JobStatus::Waiting;
            Some(delay)
        } else {
            self.status = JobStatus::Failed {
                error,
                attempts: self.attempt,
            };
            self.finished_at = Some(now);
            None
        }
    }

    fn record(&mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>, error: Option<String>) {
        self.history.push(JobAttemptRecord {
            attempt: self.attempt,
            started_at,
            finished_at,
            error,
        });
    }
}

/// What a handler decided about one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Done, successfully or with a terminal business failure.
    Completed(SyncOutcome),
    /// Transient failure; try again if attempts remain.
    Retry(String),
}
