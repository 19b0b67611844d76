//! Background sync jobs.
//!
//! ## Flow
//!
//! - [`SyncQueue`] turns sync requests into waiting [`Job`]s in a [`JobStore`]
//! - [`JobExecutor`] workers claim jobs and hand them to a [`JobHandler`]
//! - a handler answers [`JobResult::Completed`] or [`JobResult::Retry`]; the
//!   executor applies the job's [`RetryPolicy`] and the store's retention
//!
//! A job moves `waiting -> active -> completed | failed`, and back from
//! `active` to `waiting` while attempts remain.

pub mod executor;
pub mod queue;
pub mod store;
pub mod types;

pub use executor::{
    AttemptOutcome, ExecutorStats, JobExecutor, JobExecutorConfig, JobExecutorHandle, JobHandler,
    JobObserver, ObservedEvent, RecordingObserver, TracingObserver,
};
pub use queue::{DEFAULT_LIST_LIMIT, JobHandle, QueueError, SyncQueue};
pub use store::{InMemoryJobStore, JobStore, JobStoreError, QueueStats};
pub use types::{
    Job, JobAttemptRecord, JobId, JobResult, JobState, JobStatus, RetentionPolicy, RetryPolicy,
    SyncJobData, SyncOutcome,
};
