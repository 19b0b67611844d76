//! Job storage.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde::Serialize;

use super::types::{Job, JobId, JobState, RetentionPolicy};

/// Job store abstraction.
pub trait JobStore: Send + Sync {
    /// Add a waiting job.
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    /// Add several jobs; either all are stored or none are.
    fn enqueue_batch(&self, jobs: Vec<Job>) -> Result<Vec<JobId>, JobStoreError>;

    fn get(&self, job_id: &JobId) -> Result<Option<Job>, JobStoreError>;

    /// Newest first, optionally restricted to one state.
    fn list(&self, state: Option<JobState>, limit: usize) -> Result<Vec<Job>, JobStoreError>;

    /// Move the oldest ready job to active and return it.
    ///
    /// Returns `None` when nothing is ready or the store is paused.
    fn claim_next(&self) -> Result<Option<Job>, JobStoreError>;

    /// Replace a stored job.
    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Remove a job that is not active. `Ok(false)` when the id is unknown.
    fn remove(&self, job_id: &JobId) -> Result<bool, JobStoreError>;

    fn stats(&self) -> Result<QueueStats, JobStoreError>;

    /// Drop the oldest finished jobs beyond the retention counts.
    /// Returns how many were removed.
    fn trim(&self, retention: &RetentionPolicy) -> Result<usize, JobStoreError>;

    fn pause(&self) -> Result<(), JobStoreError>;

    fn resume(&self) -> Result<(), JobStoreError>;

    fn is_paused(&self) -> Result<bool, JobStoreError>;
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("job is active and cannot be removed: {0}")]
    InFlight(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Job counts by state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    paused: AtomicBool,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<JobId, Job>>, JobStoreError> {
        self.jobs
            .read()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<JobId, Job>>, JobStoreError> {
        self.jobs
            .write()
            .map_err(|_| JobStoreError::Storage("job store lock poisoned".to_string()))
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut jobs = self.write()?;
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id.clone();
        jobs.insert(id.clone(), job);
        Ok(id)
    }

    fn enqueue_batch(&self, batch: Vec<Job>) -> Result<Vec<JobId>, JobStoreError> {
        let mut jobs = self.write()?;

        let mut seen = HashSet::with_capacity(batch.len());
        for job in &batch {
            if jobs.contains_key(&job.id) || !seen.insert(&job.id) {
                return Err(JobStoreError::AlreadyExists(job.id.clone()));
            }
        }

        let ids = batch.iter().map(|j| j.id.clone()).collect();
        jobs.extend(batch.into_iter().map(|j| (j.id.clone(), j)));
        Ok(ids)
    }

    fn get(&self, job_id: &JobId) -> Result<Option<Job>, JobStoreError> {
        Ok(self.read()?.get(job_id).cloned())
    }

    fn list(&self, state: Option<JobState>, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self.read()?;
        let mut result: Vec<Job> = jobs
            .values()
            .filter(|j| state.is_none_or(|s| j.state() == s))
            .cloned()
            .collect();

        result.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        result.truncate(limit);
        Ok(result)
    }

    fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
        if self.paused.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut jobs = self.write()?;
        let now = Utc::now();

        // FIFO by enqueue time.
        let next = jobs
            .values()
            .filter(|j| j.is_ready(now))
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
            .map(|j| j.id.clone());

        Ok(next.and_then(|id| {
            jobs.get_mut(&id).map(|job| {
                job.mark_active();
                job.clone()
            })
        }))
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self.write()?;
        match jobs.get_mut(&job.id) {
            Some(slot) => {
                *slot = job.clone();
                Ok(())
            }
            None => Err(JobStoreError::NotFound(job.id.clone())),
        }
    }

    fn remove(&self, job_id: &JobId) -> Result<bool, JobStoreError> {
        let mut jobs = self.write()?;
        match jobs.get(job_id).map(Job::state) {
            None => Ok(false),
            Some(JobState::Active) => Err(JobStoreError::InFlight(job_id.clone())),
            Some(_) => Ok(jobs.remove(job_id).is_some()),
        }
    }

    fn stats(&self) -> Result<QueueStats, JobStoreError> {
        let jobs = self.read()?;
        let mut stats = QueueStats::default();
        for job in jobs.values() {
            match job.state() {
                JobState::Waiting => stats.waiting += 1,
                JobState::Active => stats.active += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
            }
        }
        stats.total = jobs.len();
        Ok(stats)
    }

    fn trim(&self, retention: &RetentionPolicy) -> Result<usize, JobStoreError> {
        let mut jobs = self.write()?;

        let mut expired = Vec::new();
        for (state, keep) in [
            (JobState::Completed, retention.keep_completed),
            (JobState::Failed, retention.keep_failed),
        ] {
            let mut finished: Vec<&Job> = jobs.values().filter(|j| j.state() == state).collect();
            // Newest first; everything past `keep` goes.
            finished.sort_by(|a, b| {
                b.finished_at
                    .cmp(&a.finished_at)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            expired.extend(finished.into_iter().skip(keep).map(|j| j.id.clone()));
        }

        for id in &expired {
            jobs.remove(id);
        }
        Ok(expired.len())
    }

    fn pause(&self) -> Result<(), JobStoreError> {
        self.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), JobStoreError> {
        self.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_paused(&self) -> Result<bool, JobStoreError> {
        Ok(self.paused.load(Ordering::SeqCst))
    }
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn enqueue_batch(&self, jobs: Vec<Job>) -> Result<Vec<JobId>, JobStoreError> {
        (**self).enqueue_batch(jobs)
    }

    fn get(&self, job_id: &JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(job_id)
    }

    fn list(&self, state: Option<JobState>, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        (**self).list(state, limit)
    }

    fn claim_next(&self) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next()
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn remove(&self, job_id: &JobId) -> Result<bool, JobStoreError> {
        (**self).remove(job_id)
    }

    fn stats(&self) -> Result<QueueStats, JobStoreError> {
        (**self).stats()
    }

    fn trim(&self, retention: &RetentionPolicy) -> Result<usize, JobStoreError> {
        (**self).trim(retention)
    }

    fn pause(&self) -> Result<(), JobStoreError> {
        (**self).pause()
    }

    fn resume(&self) -> Result<(), JobStoreError> {
        (**self).resume()
    }

    fn is_paused(&self) -> Result<bool, JobStoreError> {
        (**self).is_paused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::{JobStatus, SyncJobData, SyncOutcome};
    use chrono::{DateTime, Duration};
    use tally_core::{AccountId, UserId};

    fn job_at(offset_ms: i64) -> Job {
        let at: DateTime<Utc> = Utc::now() + Duration::milliseconds(offset_ms);
        Job::new(SyncJobData::new(AccountId::new(), UserId::new()), at)
    }

    fn finish(store: &InMemoryJobStore, job: Job) {
        store.enqueue(job).unwrap();
        let mut claimed = store.claim_next().unwrap().unwrap();
        let outcome = SyncOutcome::synced(&claimed.data, 0, 0, Utc::now());
        claimed.mark_completed(outcome, Utc::now());
        store.update(&claimed).unwrap();
    }

    #[test]
    fn enqueue_and_claim_in_order() {
        let store = InMemoryJobStore::new();
        let second = store.enqueue(job_at(-10)).unwrap();
        let first = store.enqueue(job_at(-20)).unwrap();

        let claimed = store.claim_next().unwrap().unwrap();
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, JobStatus::Active);
        assert_eq!(claimed.attempt, 1);

        assert_eq!(store.claim_next().unwrap().unwrap().id, second);
        assert!(store.claim_next().unwrap().is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryJobStore::new();
        let job = job_at(0);
        store.enqueue(job.clone()).unwrap();
        assert_eq!(store.enqueue(job.clone()), Err(JobStoreError::AlreadyExists(job.id)));
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let store = InMemoryJobStore::new();
        let existing = job_at(0);
        store.enqueue(existing.clone()).unwrap();

        let result = store.enqueue_batch(vec![job_at(1), existing, job_at(2)]);
        assert!(matches!(result, Err(JobStoreError::AlreadyExists(_))));
        assert_eq!(store.stats().unwrap().total, 1);

        let ids = store.enqueue_batch(vec![job_at(3), job_at(4)]).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.stats().unwrap().waiting, 3);
    }

    #[test]
    fn paused_store_hands_out_nothing() {
        let store = InMemoryJobStore::new();
        store.enqueue(job_at(0)).unwrap();

        store.pause().unwrap();
        assert!(store.is_paused().unwrap());
        assert!(store.claim_next().unwrap().is_none());

        store.resume().unwrap();
        assert!(store.claim_next().unwrap().is_some());
    }

    #[test]
    fn active_jobs_cannot_be_removed() {
        let store = InMemoryJobStore::new();
        let id = store.enqueue(job_at(0)).unwrap();
        store.claim_next().unwrap();

        assert_eq!(store.remove(&id), Err(JobStoreError::InFlight(id.clone())));
        assert_eq!(store.remove(&JobId::from("sync-missing-0")), Ok(false));
    }

    #[test]
    fn trim_keeps_newest_finished_jobs() {
        let store = InMemoryJobStore::new();
        for i in 0..5 {
            finish(&store, job_at(i));
        }
        store.enqueue(job_at(10)).unwrap();

        let removed = store
            .trim(&RetentionPolicy {
                keep_completed: 2,
                keep_failed: 0,
            })
            .unwrap();

        assert_eq!(removed, 3);
        let stats = store.stats().unwrap();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.waiting, 1);
        assert_eq!(stats.total, 3);
    }

    #[test]
    fn list_filters_by_state() {
        let store = InMemoryJobStore::new();
        finish(&store, job_at(0));
        store.enqueue(job_at(5)).unwrap();
        store.enqueue(job_at(6)).unwrap();

        assert_eq!(store.list(Some(JobState::Waiting), 10).unwrap().len(), 2);
        assert_eq!(store.list(Some(JobState::Completed), 10).unwrap().len(), 1);
        assert_eq!(store.list(None, 2).unwrap().len(), 2);
    }
}
