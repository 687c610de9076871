//! `queuectl dlq list|retry` — generalizes `cmd/dlq.go`'s `DlqCmd`.

use queuectl_core::{JobState, Store};

pub async fn list(store: &dyn Store) -> anyhow::Result<()> {
    let jobs = store.list_by_state(JobState::Dead).await?;

    if jobs.is_empty() {
        println!("Dead Letter Queue is empty.");
        return Ok(());
    }

    println!("--- Jobs in DLQ ---");
    println!("ID\t\tCommand\t\tAttempts\tLast Updated\t\tLast Output");
    for job in jobs {
        println!(
            "{}\t{}\t\t{}\t\t{}\t{}",
            job.id, job.command, job.attempts, job.updated_at, job.output
        );
    }
    Ok(())
}

pub async fn retry(store: &dyn Store, job_id: &str) -> anyhow::Result<()> {
    store.retry_dead(job_id).await?;
    println!("Job {job_id} moved from DLQ to 'pending' state.");
    Ok(())
}
