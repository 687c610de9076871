//! The worker loop (spec §4.2): claim a job, execute it, reconcile the
//! result.
//!
//! Generalizes `internal/worker/worker.go`'s `Worker.Run`/`processJob`: a
//! 1-second polling tick, one job in flight at a time, `sh -c <command>` as
//! the external shell, exit-status-driven retry/DLQ policy.

use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::job::{Job, JobState};
use crate::store::Store;

/// How often a worker polls the store for an eligible job when idle.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Drives one serial claim/execute/reconcile loop against a shared [`Store`].
pub struct Worker {
    id: u32,
    store: std::sync::Arc<dyn Store>,
    backoff_base: f64,
}

impl Worker {
    pub fn new(id: u32, store: std::sync::Arc<dyn Store>, backoff_base: f64) -> Self {
        Worker { id, store, backoff_base }
    }

    /// Runs until `cancel` is triggered. Cancellation is observed between
    /// ticks; a job already executing is always allowed to finish before
    /// the worker returns (see `DESIGN.md` for why this implementation
    /// picked "wait" over "abandon" for the Open Question in spec §4.2/§9).
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(worker_id = self.id, "worker starting");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker_id = self.id, "worker shutting down");
                    return;
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    self.process_one().await;
                }
            }
        }
    }

    /// Claims at most one job and, if one was claimed, executes and
    /// reconciles it. Returns without doing anything if nothing is
    /// eligible or the store reported transient contention.
    async fn process_one(&self) {
        let job = match self.store.claim().await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(worker_id = self.id, error = %err, "claim failed");
                return;
            }
        };

        tracing::info!(
            worker_id = self.id,
            job_id = %job.id,
            attempt = job.attempts,
            "processing job"
        );

        let outcome = run_command(&job.command).await;
        let reconciled = self.reconcile(job, outcome);

        if let Err(err) = self.store.update(&reconciled).await {
            // The job stays `processing` and will be reclaimed by another
            // worker once JOB_TIMEOUT elapses; see spec §4.2.
            tracing::warn!(
                worker_id = self.id,
                job_id = %reconciled.id,
                error = %err,
                "failed to persist job result; leaving for reclamation"
            );
        }
    }

    /// Applies the retry/DLQ policy (spec §4.2) to a claimed job given its
    /// execution outcome.
    fn reconcile(&self, mut job: Job, outcome: CommandOutcome) -> Job {
        let now = Utc::now();
        job.updated_at = now;
        job.output = outcome.output;

        if outcome.success {
            job.state = JobState::Completed;
            tracing::info!(worker_id = self.id, job_id = %job.id, "job completed");
        } else if job.attempts >= job.max_retries {
            job.state = JobState::Dead;
            tracing::warn!(worker_id = self.id, job_id = %job.id, "job moved to dead letter queue");
        } else {
            job.state = JobState::Failed;
            job.next_run_at = Job::backoff_deadline(now, self.backoff_base, job.attempts);
            tracing::info!(
                worker_id = self.id,
                job_id = %job.id,
                next_run_at = %job.next_run_at,
                "job failed, scheduled for retry"
            );
        }

        job
    }
}

struct CommandOutcome {
    success: bool,
    output: String,
}

/// Hands `command` to `sh -c` and waits for it to finish, capturing combined
/// stdout/stderr into `output`. A launch failure is treated the same as a
/// non-zero exit (spec §4.2: "non-zero exit status or child failed to
/// launch").
async fn run_command(command: &str) -> CommandOutcome {
    let result = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(output) => {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.is_empty() {
                if !combined.is_empty() {
                    combined.push('\n');
                }
                combined.push_str(&stderr);
            }
            CommandOutcome {
                success: output.status.success(),
                output: combined,
            }
        }
        Err(err) => CommandOutcome {
            success: false,
            output: format!("failed to launch command: {err}"),
        },
    }
}
