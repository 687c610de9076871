//! The enqueue path (spec §4.4): validates a submitted job descriptor,
//! fills in its lifecycle fields, and hands it to the store.

use chrono::Utc;

use crate::error::StoreError;
use crate::job::{Job, JobState};
use crate::store::Store;

/// What a client submits to enqueue a job. `max_retries` of `0` means "use
/// the configured default".
#[derive(Debug, Clone, serde::Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    pub command: String,
    #[serde(default)]
    pub max_retries: i64,
}

/// Validates `descriptor`, fills lifecycle fields, and creates the job.
///
/// Rejects an empty `id` or `command` with `StoreError::InvalidArgument`
/// without touching the store.
pub async fn enqueue(
    store: &dyn Store,
    descriptor: JobDescriptor,
    default_max_retries: i64,
) -> Result<(), StoreError> {
    if descriptor.id.is_empty() {
        return Err(StoreError::InvalidArgument("job 'id' is empty".to_string()));
    }
    if descriptor.command.is_empty() {
        return Err(StoreError::InvalidArgument(
            "job 'command' is empty".to_string(),
        ));
    }

    let now = Utc::now();
    let max_retries = if descriptor.max_retries == 0 {
        default_max_retries
    } else {
        descriptor.max_retries
    };

    let job = Job {
        id: descriptor.id,
        command: descriptor.command,
        state: JobState::Pending,
        attempts: 0,
        max_retries,
        created_at: now,
        updated_at: now,
        next_run_at: now,
        output: String::new(),
    };

    store.create(job).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuectl_testing::InMemoryStore;

    #[tokio::test]
    async fn rejects_empty_id() {
        let store = InMemoryStore::new();
        let err = enqueue(
            &store,
            JobDescriptor {
                id: String::new(),
                command: "true".to_string(),
                max_retries: 0,
            },
            3,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn rejects_empty_command() {
        let store = InMemoryStore::new();
        let err = enqueue(
            &store,
            JobDescriptor {
                id: "a".to_string(),
                command: String::new(),
                max_retries: 0,
            },
            3,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn fills_defaults_and_creates_pending_job() {
        let store = InMemoryStore::new();
        enqueue(
            &store,
            JobDescriptor {
                id: "a".to_string(),
                command: "true".to_string(),
                max_retries: 0,
            },
            3,
        )
        .await
        .unwrap();

        let pending = store.list_by_state(JobState::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "a");
        assert_eq!(pending[0].attempts, 0);
        assert_eq!(pending[0].max_retries, 3);
        assert_eq!(pending[0].created_at, pending[0].next_run_at);
    }

    #[tokio::test]
    async fn honours_explicit_max_retries() {
        let store = InMemoryStore::new();
        enqueue(
            &store,
            JobDescriptor {
                id: "a".to_string(),
                command: "true".to_string(),
                max_retries: 9,
            },
            3,
        )
        .await
        .unwrap();

        let pending = store.list_by_state(JobState::Pending).await.unwrap();
        assert_eq!(pending[0].max_retries, 9);
    }

    #[tokio::test]
    async fn duplicate_id_conflicts() {
        let store = InMemoryStore::new();
        let descriptor = JobDescriptor {
            id: "a".to_string(),
            command: "true".to_string(),
            max_retries: 0,
        };
        enqueue(&store, descriptor.clone(), 3).await.unwrap();
        let err = enqueue(&store, descriptor, 3).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
