//! An in-memory [`Store`] implementation for exercising `queuectl-core`'s
//! worker and enqueue logic without a real database.
//!
//! Mirrors this workspace's convention of a dedicated testing crate sitting
//! beside the core library crate, so unit tests for policy (retry math,
//! claim eligibility, reconciliation) don't need a live SQLite file — that
//! honour goes to `queuectl-sqlite`'s own integration tests, which exercise
//! the real atomicity and durability properties this fake cannot.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use queuectl_core::{job_timeout, Job, JobState, Store, StoreError};

/// A `Mutex`-guarded `HashMap<id, Job>` implementing [`Store`].
///
/// The mutex makes `claim` trivially atomic: the whole eligibility scan and
/// mutation happens while the lock is held, so two concurrent callers can
/// never observe and claim the same row.
#[derive(Default)]
pub struct InMemoryStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore::default()
    }

    /// Test helper: inserts (or overwrites) a job directly, bypassing
    /// `create`'s validation. Used to set up fixtures like an abandoned
    /// `processing` job for reclamation tests.
    pub fn seed(&self, job: Job) {
        self.jobs.lock().unwrap().insert(job.id.clone(), job);
    }

    /// Test helper: returns a cloned snapshot of one job by id.
    pub fn get(&self, id: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(id).cloned()
    }
}

fn eligible(job: &Job, now: chrono::DateTime<Utc>) -> bool {
    match job.state {
        JobState::Pending => true,
        JobState::Failed => job.next_run_at <= now,
        JobState::Processing => job.updated_at <= now - job_timeout(),
        JobState::Completed | JobState::Dead => false,
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn create(&self, job: Job) -> Result<(), StoreError> {
        if job.id.is_empty() {
            return Err(StoreError::InvalidArgument("job 'id' is empty".to_string()));
        }
        if job.command.is_empty() {
            return Err(StoreError::InvalidArgument(
                "job 'command' is empty".to_string(),
            ));
        }

        let mut jobs = self.jobs.lock().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(job.id));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn claim(&self) -> Result<Option<Job>, StoreError> {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();

        let winner_id = jobs
            .values()
            .filter(|job| eligible(job, now))
            .min_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)))
            .map(|job| job.id.clone());

        let Some(id) = winner_id else {
            return Ok(None);
        };

        let job = jobs.get_mut(&id).expect("winner id came from this map");
        job.state = JobState::Processing;
        job.updated_at = now;
        job.attempts += 1;
        Ok(Some(job.clone()))
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(existing) = jobs.get_mut(&job.id) else {
            return Err(StoreError::NotFound(job.id.clone()));
        };
        existing.state = job.state;
        existing.attempts = job.attempts;
        existing.updated_at = job.updated_at;
        existing.next_run_at = job.next_run_at;
        existing.output = job.output.clone();
        Ok(())
    }

    async fn list_by_state(&self, state: JobState) -> Result<Vec<Job>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        Ok(jobs.values().filter(|j| j.state == state).cloned().collect())
    }

    async fn stats(&self) -> Result<HashMap<JobState, i64>, StoreError> {
        let jobs = self.jobs.lock().unwrap();
        let mut counts = HashMap::new();
        for job in jobs.values() {
            *counts.entry(job.state).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn retry_dead(&self, id: &str) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().unwrap();
        let Some(job) = jobs.get_mut(id) else {
            return Err(StoreError::NotFound(id.to_string()));
        };
        if job.state != JobState::Dead {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let now = Utc::now();
        job.state = JobState::Pending;
        job.attempts = 0;
        job.next_run_at = now;
        job.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(id: &str, state: JobState) -> Job {
        let now = Utc::now();
        Job {
            id: id.to_string(),
            command: "true".to_string(),
            state,
            attempts: 0,
            max_retries: 3,
            created_at: now,
            updated_at: now,
            next_run_at: now,
            output: String::new(),
        }
    }

    #[tokio::test]
    async fn claim_returns_none_when_empty() {
        let store = InMemoryStore::new();
        assert!(store.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_picks_pending_job() {
        let store = InMemoryStore::new();
        store.create(job("a", JobState::Pending)).await.unwrap();

        let claimed = store.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, "a");
        assert_eq!(claimed.state, JobState::Processing);
        assert_eq!(claimed.attempts, 1);
    }

    #[tokio::test]
    async fn claim_skips_completed_and_dead() {
        let store = InMemoryStore::new();
        store.seed(job("done", JobState::Completed));
        store.seed(job("dead", JobState::Dead));
        assert!(store.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_respects_failed_next_run_at() {
        let store = InMemoryStore::new();
        let mut not_yet = job("not-yet", JobState::Failed);
        not_yet.next_run_at = Utc::now() + Duration::minutes(5);
        store.seed(not_yet);

        let mut ready = job("ready", JobState::Failed);
        ready.next_run_at = Utc::now() - Duration::seconds(1);
        store.seed(ready);

        let claimed = store.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, "ready");
    }

    #[tokio::test]
    async fn claim_reclaims_stale_processing_job() {
        let store = InMemoryStore::new();
        let mut stale = job("stale", JobState::Processing);
        stale.updated_at = Utc::now() - Duration::minutes(6);
        store.seed(stale);

        let claimed = store.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, "stale");
        assert_eq!(claimed.attempts, 1);
    }

    #[tokio::test]
    async fn claim_does_not_reclaim_fresh_processing_job() {
        let store = InMemoryStore::new();
        let mut fresh = job("fresh", JobState::Processing);
        fresh.updated_at = Utc::now() - Duration::seconds(1);
        store.seed(fresh);

        assert!(store.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn claim_is_fifo_by_created_at() {
        let store = InMemoryStore::new();
        let mut older = job("older", JobState::Pending);
        older.created_at = Utc::now() - Duration::seconds(10);
        let mut newer = job("newer", JobState::Pending);
        newer.created_at = Utc::now();
        store.seed(older);
        store.seed(newer);

        let claimed = store.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, "older");
    }

    #[tokio::test]
    async fn retry_dead_requires_dead_state() {
        let store = InMemoryStore::new();
        store.create(job("a", JobState::Pending)).await.unwrap();
        let err = store.retry_dead("a").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn retry_dead_resets_attempts_and_state() {
        let store = InMemoryStore::new();
        let mut dead = job("a", JobState::Dead);
        dead.attempts = 3;
        store.seed(dead);

        store.retry_dead("a").await.unwrap();
        let reset = store.get("a").unwrap();
        assert_eq!(reset.state, JobState::Pending);
        assert_eq!(reset.attempts, 0);
    }

    #[tokio::test]
    async fn stats_counts_by_state() {
        let store = InMemoryStore::new();
        store.seed(job("a", JobState::Pending));
        store.seed(job("b", JobState::Pending));
        store.seed(job("c", JobState::Dead));

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.get(&JobState::Pending), Some(&2));
        assert_eq!(stats.get(&JobState::Dead), Some(&1));
    }
}
