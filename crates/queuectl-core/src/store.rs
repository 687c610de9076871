//! The durable store contract (spec §4.1).
//!
//! `queuectl-core` owns this trait only — policy-light, the way this
//! workspace's job interfaces are meant to be implemented by a concrete
//! backend crate (`queuectl-sqlite` for production, `queuectl-testing` for
//! unit tests) rather than by `queuectl-core` itself.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::job::{Job, JobState};

/// Durable persistence for jobs, including the atomic claim operation that
/// serialises competing workers against a single backing store.
///
/// # Implementer notes
///
/// - `claim` must be atomic: two concurrent callers contending for the same
///   eligible row must never both receive it with the same `attempts` value.
/// - `claim` returns `Ok(None)` — not an error — when the backend reports
///   transient contention (a lock held elsewhere). Callers retry on their
///   own cadence.
/// - `update` must not change `id`, `command`, `created_at`, or `max_retries`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Inserts a new job. `Err(Conflict)` if `id` already exists,
    /// `Err(InvalidArgument)` if `id` or `command` is empty.
    async fn create(&self, job: Job) -> Result<(), StoreError>;

    /// Atomically selects and claims at most one eligible job.
    ///
    /// Eligibility (evaluated at `now`):
    /// - `state = pending`, or
    /// - `state = failed` and `next_run_at <= now`, or
    /// - `state = processing` and `updated_at <= now - JOB_TIMEOUT` (the
    ///   previous worker is presumed dead; this is reclamation).
    ///
    /// Among eligible jobs, the smallest `created_at` wins, ties broken by
    /// `id`. Returns the post-claim job (`state = processing`, `attempts`
    /// incremented, `updated_at = now`), or `None` if nothing is eligible.
    async fn claim(&self) -> Result<Option<Job>, StoreError>;

    /// Overwrites `state`, `attempts`, `updated_at`, `next_run_at`, and
    /// `output` for the job with this `id`.
    async fn update(&self, job: &Job) -> Result<(), StoreError>;

    /// All jobs currently in the given state. Order is unspecified.
    async fn list_by_state(&self, state: JobState) -> Result<Vec<Job>, StoreError>;

    /// A histogram of job counts by state.
    async fn stats(&self) -> Result<HashMap<JobState, i64>, StoreError>;

    /// Moves a `dead` job back to `pending` with `attempts` reset to zero.
    /// `Err(NotFound)` if no job with this `id` is currently `dead`.
    async fn retry_dead(&self, id: &str) -> Result<(), StoreError>;
}

/// A `processing` job whose lease has exceeded this duration is assumed
/// abandoned by a dead worker and becomes re-claimable.
pub const JOB_TIMEOUT_SECS: i64 = 5 * 60;

/// [`JOB_TIMEOUT_SECS`] as a [`chrono::Duration`].
pub fn job_timeout() -> chrono::Duration {
    chrono::Duration::seconds(JOB_TIMEOUT_SECS)
}
