//! `queuectl status` — generalizes `cmd/list.go`'s `StatusCmd`.
//!
//! The original left worker status as "not implemented yet"; this reads
//! the pool status file `worker start` maintains, so `status` reports a
//! real running/stopped worker count instead of a hardcoded placeholder.

use queuectl_core::{JobState, Store};

const STATES: [JobState; 5] = [
    JobState::Pending,
    JobState::Processing,
    JobState::Completed,
    JobState::Failed,
    JobState::Dead,
];

pub async fn run(store: &dyn Store, data_dir: &std::path::Path) -> anyhow::Result<()> {
    let stats = store.stats().await?;

    println!("--- Job Queue Status ---");
    if stats.is_empty() {
        println!("No jobs in the queue.");
    } else {
        for state in STATES {
            let count = stats.get(&state).copied().unwrap_or(0);
            println!("{state}: \t{count}");
        }
    }

    println!("\n--- Worker Status ---");
    match queuectl_core::pool::read_status(data_dir)? {
        Some(status) => println!(
            "Workers: \t{} (pid {}, started {})",
            status.count, status.pid, status.started_at
        ),
        None => println!("Workers: \t0 (not running)"),
    }

    Ok(())
}
