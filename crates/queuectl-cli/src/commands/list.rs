//! `queuectl list --state <state>` — generalizes `cmd/list.go`'s `ListCmd`.

use anyhow::Context;
use queuectl_core::{JobState, Store};

pub async fn run(store: &dyn Store, state: &str) -> anyhow::Result<()> {
    let state: JobState = state
        .parse()
        .with_context(|| format!("unknown state '{state}'"))?;

    let jobs = store.list_by_state(state).await?;

    if jobs.is_empty() {
        println!("No jobs found in state: {state}");
        return Ok(());
    }

    println!("--- Jobs in '{state}' state ---");
    println!("ID\t\tCommand\t\tAttempts");
    for job in jobs {
        println!("{}\t\t{}\t\t{}", job.id, job.command, job.attempts);
    }
    Ok(())
}
