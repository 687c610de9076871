//! The job model: the sole entity the queue operates on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A job's position in its lifecycle.
///
/// `Completed` and `Dead` are terminal: no worker may claim a job in either
/// state. Only [`crate::store::Store::retry_dead`] moves a job out of `Dead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Processing,
    Completed,
    Failed,
    Dead,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Processing => "processing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Dead => "dead",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobState {
    type Err = UnknownJobState;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobState::Pending),
            "processing" => Ok(JobState::Processing),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            "dead" => Ok(JobState::Dead),
            other => Err(UnknownJobState(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown job state: {0}")]
pub struct UnknownJobState(pub String);

/// A unit of work: a shell command, its retry bookkeeping, and its
/// execution result.
///
/// See spec §3 for the field invariants. The store owns the persisted
/// representation; workers hold transient in-memory copies obtained from
/// `claim` and reconcile them back through `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub command: String,
    pub state: JobState,
    pub attempts: i64,
    pub max_retries: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_run_at: DateTime<Utc>,
    #[serde(default)]
    pub output: String,
}

impl Job {
    /// Computes the exponential backoff deadline for the given attempt
    /// count, per spec §4.2: `now + backoff_base ^ attempts` seconds.
    pub fn backoff_deadline(now: DateTime<Utc>, backoff_base: f64, attempts: i64) -> DateTime<Utc> {
        let delay_secs = backoff_base.powi(attempts as i32);
        now + chrono::Duration::milliseconds((delay_secs * 1000.0) as i64)
    }
}
