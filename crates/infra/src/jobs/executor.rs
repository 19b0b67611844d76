//! Worker pool that drains the job store.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::store::{JobStore, JobStoreError};
use super::types::{Job, JobId, JobResult, RetentionPolicy, SyncOutcome};

/// Runs one attempt of a job.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: &Job) -> JobResult;
}

impl<H> JobHandler for Arc<H>
where
    H: JobHandler + ?Sized,
{
    fn handle(&self, job: &Job) -> JobResult {
        (**self).handle(job)
    }
}

/// Hooks fired when a job reaches a final state.
pub trait JobObserver: Send + Sync {
    fn on_completed(&self, job: &Job, outcome: &SyncOutcome);
    fn on_failed(&self, job: &Job, error: &str);
}

/// Logs job outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl JobObserver for TracingObserver {
    fn on_completed(&self, job: &Job, outcome: &SyncOutcome) {
        if outcome.success {
            info!(
                job_id = %job.id,
                account_id = %outcome.account_id,
                new = outcome.new_transaction_count.unwrap_or_default(),
                synced = outcome.synced_transaction_count.unwrap_or_default(),
                "sync completed"
            );
        } else {
            warn!(
                job_id = %job.id,
                account_id = %outcome.account_id,
                error = outcome.error.as_deref().unwrap_or_default(),
                "sync completed without retry"
            );
        }
    }

    fn on_failed(&self, job: &Job, error: &str) {
        warn!(
            job_id = %job.id,
            account_id = %job.data.account_id,
            attempts = job.attempt,
            error = %error,
            "sync failed"
        );
    }
}

/// Something an observer was told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Completed { job_id: JobId, outcome: SyncOutcome },
    Failed { job_id: JobId, error: String },
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObservedEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn completed(&self) -> Vec<SyncOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Completed { outcome, .. } => Some(outcome),
                ObservedEvent::Failed { .. } => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<(JobId, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Failed { job_id, error } => Some((job_id, error)),
                ObservedEvent::Completed { .. } => None,
            })
            .collect()
    }

    fn push(&self, event: ObservedEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl JobObserver for RecordingObserver {
    fn on_completed(&self, job: &Job, outcome: &SyncOutcome) {
        self.push(ObservedEvent::Completed {
            job_id: job.id.clone(),
            outcome: outcome.clone(),
        });
    }

    fn on_failed(&self, job: &Job, error: &str) {
        self.push(ObservedEvent::Failed {
            job_id: job.id.clone(),
            error: error.to_string(),
        });
    }
}

impl<O> JobObserver for Arc<O>
where
    O: JobObserver + ?Sized,
{
    fn on_completed(&self, job: &Job, outcome: &SyncOutcome) {
        (**self).on_completed(job, outcome)
    }

    fn on_failed(&self, job: &Job, error: &str) {
        (**self).on_failed(job, error)
    }
}

/// Job executor configuration.
#[derive(Debug, Clone)]
pub struct JobExecutorConfig {
    /// How long an idle worker sleeps before polling again
    pub poll_interval: Duration,
    /// Number of worker threads
    pub concurrency: usize,
    /// Thread name prefix, also used in logs
    pub name: String,
    pub retention: RetentionPolicy,
}

impl Default for JobExecutorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            concurrency: 5,
            name: "sync-worker".to_string(),
            retention: RetentionPolicy::default(),
        }
    }
}

impl JobExecutorConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

/// Executor runtime statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutorStats {
    pub jobs_processed: u64,
    pub jobs_completed: u64,
    pub jobs_retried: u64,
    pub jobs_failed: u64,
    pub current_active: usize,
    pub uptime_secs: u64,
}

/// Handle to control a running executor.
#[derive(Debug)]
pub struct JobExecutorHandle {
    shutdown: Arc<AtomicBool>,
    workers: Vec<thread::JoinHandle<()>>,
    stats: Arc<Mutex<ExecutorStats>>,
    started: Instant,
}

impl JobExecutorHandle {
    /// Stop all workers after their current job and wait for them.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for worker in self.workers {
            if worker.join().is_err() {
                error!("sync worker panicked");
            }
        }
    }

    pub fn stats(&self) -> ExecutorStats {
        let mut stats = lock(&self.stats).clone();
        stats.uptime_secs = self.started.elapsed().as_secs();
        stats
    }
}

/// What happened to a job in one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Completed,
    Retried,
    Failed,
}

/// Claims jobs, runs the handler, and applies retry and retention.
pub struct JobExecutor<S, H> {
    store: S,
    handler: H,
    observer: Arc<dyn JobObserver>,
    retention: RetentionPolicy,
}

impl<S: JobStore, H: JobHandler> JobExecutor<S, H> {
    pub fn new(store: S, handler: H) -> Self {
        Self {
            store,
            handler,
            observer: Arc::new(TracingObserver),
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Claim and run one job on the calling thread.
    pub fn run_next(&self) -> Result<Option<Job>, JobStoreError> {
        match self.store.claim_next()? {
            Some(job) => self.run_claimed(job).map(|(job, _)| Some(job)),
            None => Ok(None),
        }
    }

    /// Run an already-claimed job, persist the result and trim old jobs.
    pub fn run_claimed(&self, mut job: Job) -> Result<(Job, AttemptOutcome), JobStoreError> {
        debug!(job_id = %job.id, account_id = %job.data.account_id, attempt = job.attempt, "running job");
        let started = Utc::now();

        let outcome = match self.handler.handle(&job) {
            JobResult::Completed(outcome) => {
                job.mark_completed(outcome.clone(), started);
                self.store.update(&job)?;
                self.observer.on_completed(&job, &outcome);
                AttemptOutcome::Completed
            }
            JobResult::Retry(error) => match job.mark_retry(error.clone(), started) {
                Some(delay) => {
                    self.store.update(&job)?;
                    debug!(
                        job_id = %job.id,
                        attempt = job.attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retry scheduled"
                    );
                    AttemptOutcome::Retried
                }
                None => {
                    self.store.update(&job)?;
                    self.observer.on_failed(&job, &error);
                    AttemptOutcome::Failed
                }
            },
        };

        if outcome != AttemptOutcome::Retried {
            self.store.trim(&self.retention)?;
        }
        Ok((job, outcome))
    }
}

impl<S, H> JobExecutor<S, H>
where
    S: JobStore + 'static,
    H: JobHandler + 'static,
{
    /// Start `config.concurrency` worker threads.
    pub fn spawn(self, config: JobExecutorConfig) -> io::Result<JobExecutorHandle> {
        let executor = Arc::new(self.with_retention(config.retention));
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(ExecutorStats::default()));

        let mut workers = Vec::with_capacity(config.concurrency);
        for slot in 0..config.concurrency.max(1) {
            let executor = Arc::clone(&executor);
            let worker_shutdown = Arc::clone(&shutdown);
            let worker_stats = Arc::clone(&stats);
            let worker_config = config.clone();
            let worker = thread::Builder::new()
                .name(format!("{}-{slot}", config.name))
                .spawn(move || {
                    worker_loop(&*executor, &worker_config, slot, &worker_shutdown, &worker_stats)
                });

            match worker {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown.store(true, Ordering::SeqCst);
                    for started in workers {
                        let _ = started.join();
                    }
                    return Err(e);
                }
            }
        }

        info!(executor = %config.name, concurrency = workers.len(), "job executor started");
        Ok(JobExecutorHandle {
            shutdown,
            workers,
            stats,
            started: Instant::now(),
        })
    }
}

fn worker_loop<S: JobStore, H: JobHandler>(
    executor: &JobExecutor<S, H>,
    config: &JobExecutorConfig,
    slot: usize,
    shutdown: &AtomicBool,
    stats: &Mutex<ExecutorStats>,
) {
    while !shutdown.load(Ordering::SeqCst) {
        let job = match executor.store.claim_next() {
            Ok(Some(job)) => job,
            Ok(None) => {
                thread::sleep(config.poll_interval);
                continue;
            }
            Err(e) => {
                error!(executor = %config.name, slot, error = %e, "failed to claim job");
                thread::sleep(config.poll_interval);
                continue;
            }
        };

        debug!(executor = %config.name, slot, job_id = %job.id, "claimed job");
        lock(stats).current_active += 1;

        let job_id = job.id.clone();
        let result = executor.run_claimed(job);

        let mut s = lock(stats);
        s.current_active = s.current_active.saturating_sub(1);
        s.jobs_processed += 1;
        match result {
            Ok((_, AttemptOutcome::Completed)) => s.jobs_completed += 1,
            Ok((_, AttemptOutcome::Retried)) => s.jobs_retried += 1,
            Ok((_, AttemptOutcome::Failed)) => s.jobs_failed += 1,
            Err(e) => {
                drop(s);
                error!(executor = %config.name, job_id = %job_id, error = %e, "failed to record job result");
            }
        }
    }

    debug!(executor = %config.name, slot, "worker stopped");
}

fn lock(stats: &Mutex<ExecutorStats>) -> MutexGuard<'_, ExecutorStats> {
    stats.lock().unwrap_or_else(PoisonError::into_inner)
}
