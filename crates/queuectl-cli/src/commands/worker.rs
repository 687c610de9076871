//! `queuectl worker start|stop` — generalizes `cmd/worker.go`'s `WorkerCmd`.
//!
//! `start` blocks in the foreground running `count` workers until
//! Ctrl+C/SIGTERM, same as the original's `wg.Wait()`. `stop` is new: the
//! original had no way to signal a running pool from another invocation,
//! so this spec adds a status file (spec §4.3) that `stop` reads to find
//! the pid to interrupt.

use std::path::Path;
use std::sync::Arc;

use queuectl_core::{Config, StopOutcome, Store};
use queuectl_sqlite::SqliteStore;

pub async fn start(cfg: &Config, data_dir: &Path, count: u32) -> anyhow::Result<()> {
    let path = data_dir.join("queue.db");
    let store: Arc<dyn Store> = Arc::new(SqliteStore::connect(&path).await?);

    println!("Starting {count} worker(s)...");
    println!("Press Ctrl+C to shut down gracefully.");

    queuectl_core::pool::run(store, data_dir, count, cfg.backoff_base).await?;

    println!("All workers have shut down. Exiting.");
    Ok(())
}

pub fn stop(data_dir: &Path) -> anyhow::Result<()> {
    match queuectl_core::pool::stop(data_dir)? {
        StopOutcome::NotRunning => println!("No running worker pool found."),
        StopOutcome::Signalled { pid } => {
            println!("Sent shutdown signal to worker pool (pid {pid}).")
        }
        StopOutcome::StaleStatusRemoved { pid } => println!(
            "Worker pool (pid {pid}) was no longer running; removed stale status file."
        ),
    }
    Ok(())
}
