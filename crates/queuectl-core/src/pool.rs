//! The pool supervisor (spec §4.3): spawns N workers, propagates shutdown,
//! and publishes the status file `worker stop` reads.
//!
//! Generalizes `cmd/worker.go`'s `startCmd`: a `context.Context` + `cancel`
//! pair becomes a [`CancellationToken`]; a `sync.WaitGroup` becomes a
//! [`tokio::task::JoinSet`]; `signal.Notify(SIGINT, SIGTERM)` becomes
//! `tokio::signal`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::store::Store;
use crate::worker::Worker;

const STATUS_FILE_NAME: &str = "worker.status";

/// The pool status record written at start and removed at clean shutdown.
/// Advisory only: a crashed pool leaves this file stale (spec §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolStatus {
    pub pid: u32,
    pub count: u32,
    pub started_at: chrono::DateTime<Utc>,
}

pub fn status_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STATUS_FILE_NAME)
}

/// Reads the status record, if present.
///
/// Returns `Ok(None)` if the file is missing ("not running" is a normal
/// outcome, not an error); `Err` only for a file that exists but fails to
/// parse.
pub fn read_status(data_dir: &Path) -> anyhow::Result<Option<PoolStatus>> {
    let path = status_file_path(data_dir);
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            let status: PoolStatus = serde_json::from_str(&contents)?;
            Ok(Some(status))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn write_status(data_dir: &Path, status: &PoolStatus) {
    let path = status_file_path(data_dir);
    match serde_json::to_string_pretty(status) {
        Ok(data) => {
            if let Err(err) = std::fs::write(&path, data) {
                tracing::warn!(error = %err, "failed to write pool status file");
            }
        }
        Err(err) => tracing::warn!(error = %err, "failed to serialize pool status"),
    }
}

fn remove_status(data_dir: &Path) {
    let path = status_file_path(data_dir);
    if let Err(err) = std::fs::remove_file(&path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %err, "failed to remove pool status file");
        }
    }
}

/// Spawns `count` workers against `store`, waits for a shutdown signal (or
/// for `shutdown` to be cancelled by the caller, e.g. in tests), then waits
/// for every worker to return and removes the status file.
///
/// The status file write is best-effort: failure is logged, not fatal
/// (spec §4.3 step 1).
pub async fn run(
    store: Arc<dyn Store>,
    data_dir: &Path,
    count: u32,
    backoff_base: f64,
) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let status = PoolStatus {
        pid: std::process::id(),
        count,
        started_at: Utc::now(),
    };
    write_status(data_dir, &status);

    let cancel = CancellationToken::new();
    let mut workers = JoinSet::new();
    for id in 1..=count {
        let worker = Worker::new(id, store.clone(), backoff_base);
        let worker_cancel = cancel.clone();
        workers.spawn(async move { worker.run(worker_cancel).await });
    }

    wait_for_shutdown_signal(&cancel).await;

    while workers.join_next().await.is_some() {}

    remove_status(data_dir);
    Ok(())
}

/// Outcome of `worker stop` (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No status file: nothing was running.
    NotRunning,
    /// The running pool was signalled to shut down.
    Signalled { pid: u32 },
    /// A status file existed but its PID is no longer alive; it was
    /// removed as stale.
    StaleStatusRemoved { pid: u32 },
}

/// Reads the status file and delivers an interrupt signal to the recorded
/// PID, per spec §4.3 "Stop". A missing status file is reported, not an
/// error; a PID that no longer exists causes the stale file to be cleaned
/// up.
pub fn stop(data_dir: &Path) -> anyhow::Result<StopOutcome> {
    let Some(status) = read_status(data_dir)? else {
        return Ok(StopOutcome::NotRunning);
    };

    let pid = nix::unistd::Pid::from_raw(status.pid as i32);
    match nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGINT) {
        Ok(()) => Ok(StopOutcome::Signalled { pid: status.pid }),
        Err(nix::errno::Errno::ESRCH) => {
            remove_status(data_dir);
            Ok(StopOutcome::StaleStatusRemoved { pid: status.pid })
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal(cancel: &CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal(cancel: &CancellationToken) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}
