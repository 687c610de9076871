//! `queuectl enqueue <job(json)>` — generalizes `cmd/enqueue.go`.

use anyhow::Context;
use queuectl_core::{JobDescriptor, Store};

pub async fn run(store: &dyn Store, job_json: &str, default_max_retries: i64) -> anyhow::Result<()> {
    let descriptor: JobDescriptor =
        serde_json::from_str(job_json).context("invalid job JSON")?;

    queuectl_core::enqueue(store, descriptor, default_max_retries)
        .await
        .context("failed to enqueue job")?;

    println!("Job enqueued.");
    Ok(())
}
