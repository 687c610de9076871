//! A SQLite-backed implementation of [`queuectl_core::Store`].
//!
//! queuectl runs as a single-file, single-host queue (spec §1, Non-goals):
//! one `queue.db` next to the config directory, opened in WAL mode so a
//! worker pool and a CLI command (`list`, `dlq`) can read it concurrently
//! without blocking each other.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS jobs (
//!     id          TEXT PRIMARY KEY,
//!     command     TEXT NOT NULL,
//!     state       TEXT NOT NULL,
//!     attempts    INTEGER NOT NULL DEFAULT 0,
//!     max_retries INTEGER NOT NULL DEFAULT 3,
//!     created_at  TEXT NOT NULL,
//!     updated_at  TEXT NOT NULL,
//!     next_run_at TEXT NOT NULL,
//!     output      TEXT NOT NULL DEFAULT ''
//! );
//! CREATE INDEX IF NOT EXISTS idx_jobs_claimable ON jobs (state, next_run_at, created_at);
//! ```
//!
//! # Claiming
//!
//! SQLite has no `SKIP LOCKED`; a single connection-pool-wide write lock
//! serialises claims instead. The eligible row is selected and updated in
//! one statement (a `WHERE id = (SELECT ...)` subquery, not a transaction
//! wrapping a separate `SELECT` then `UPDATE`), so there is no window in
//! which two callers can observe the same winner. `SQLITE_BUSY` — another
//! connection holds the write lock — is translated to `Ok(None)`, the same
//! "nothing eligible right now" outcome as true contention, so callers
//! don't need to special-case it.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use queuectl_core::{Job, JobState, Store, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

/// A SQLite-backed [`Store`].
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if necessary) the database at `path`, enables WAL
    /// mode, and runs the schema migration.
    pub async fn connect(path: &std::path::Path) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        let store = SqliteStore { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id          TEXT PRIMARY KEY,
                command     TEXT NOT NULL,
                state       TEXT NOT NULL,
                attempts    INTEGER NOT NULL DEFAULT 0,
                max_retries INTEGER NOT NULL DEFAULT 3,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                next_run_at TEXT NOT NULL,
                output      TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_claimable ON jobs (state, next_run_at, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// The underlying connection pool, for callers that need a raw handle
    /// (e.g. the CLI's maintenance commands).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<Job, StoreError> {
    let state_str: String = row.get("state");
    let state = state_str
        .parse::<JobState>()
        .map_err(|err| StoreError::Backend(anyhow::anyhow!(err)))?;

    Ok(Job {
        id: row.get("id"),
        command: row.get("command"),
        state,
        attempts: row.get("attempts"),
        max_retries: row.get("max_retries"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        next_run_at: row.get("next_run_at"),
        output: row.get("output"),
    })
}

fn is_busy(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code == "5" || code == "6"), // SQLITE_BUSY / SQLITE_LOCKED
        _ => false,
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn create(&self, job: Job) -> Result<(), StoreError> {
        if job.id.is_empty() {
            return Err(StoreError::InvalidArgument("job 'id' is empty".to_string()));
        }
        if job.command.is_empty() {
            return Err(StoreError::InvalidArgument(
                "job 'command' is empty".to_string(),
            ));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, command, state, attempts, max_retries, created_at, updated_at, next_run_at, output)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.command)
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.max_retries)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.next_run_at)
        .bind(&job.output)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict(job.id))
            }
            Err(err) => Err(StoreError::Backend(err.into())),
        }
    }

    async fn claim(&self) -> Result<Option<Job>, StoreError> {
        let now = Utc::now();
        let timeout_cutoff = now - queuectl_core::job_timeout();

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'processing',
                attempts = attempts + 1,
                updated_at = ?
            WHERE id = (
                SELECT id FROM jobs
                WHERE (state = 'pending')
                   OR (state = 'failed' AND next_run_at <= ?)
                   OR (state = 'processing' AND updated_at <= ?)
                ORDER BY created_at ASC, id ASC
                LIMIT 1
            )
            RETURNING id, command, state, attempts, max_retries, created_at, updated_at, next_run_at, output
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(timeout_cutoff)
        .fetch_optional(&self.pool)
        .await;

        match result {
            Ok(Some(row)) => Ok(Some(row_to_job(&row)?)),
            Ok(None) => Ok(None),
            Err(err) if is_busy(&err) => Ok(None),
            Err(err) => Err(StoreError::Backend(err.into())),
        }
    }

    async fn update(&self, job: &Job) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = ?, attempts = ?, updated_at = ?, next_run_at = ?, output = ?
            WHERE id = ?
            "#,
        )
        .bind(job.state.as_str())
        .bind(job.attempts)
        .bind(job.updated_at)
        .bind(job.next_run_at)
        .bind(&job.output)
        .bind(&job.id)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Backend(err.into()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(job.id.clone()));
        }
        Ok(())
    }

    async fn list_by_state(&self, state: JobState) -> Result<Vec<Job>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, command, state, attempts, max_retries, created_at, updated_at, next_run_at, output
            FROM jobs
            WHERE state = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(state.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|err| StoreError::Backend(err.into()))?;

        rows.iter().map(row_to_job).collect()
    }

    async fn stats(&self) -> Result<HashMap<JobState, i64>, StoreError> {
        let rows = sqlx::query("SELECT state, COUNT(*) as count FROM jobs GROUP BY state")
            .fetch_all(&self.pool)
            .await
            .map_err(|err| StoreError::Backend(err.into()))?;

        let mut counts = HashMap::new();
        for row in rows {
            let state_str: String = row.get("state");
            let state = state_str
                .parse::<JobState>()
                .map_err(|err| StoreError::Backend(anyhow::anyhow!(err)))?;
            let count: i64 = row.get("count");
            counts.insert(state, count);
        }
        Ok(counts)
    }

    async fn retry_dead(&self, id: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET state = 'pending', attempts = 0, next_run_at = ?, updated_at = ?
            WHERE id = ? AND state = 'dead'
            "#,
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|err| StoreError::Backend(err.into()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

/// Deletes jobs in a terminal state (`completed`) last touched before
/// `older_than`. Not part of the [`Store`] contract — a maintenance
/// operation the CLI can expose separately, mirroring the cleanup helper
/// this backend's PostgreSQL counterpart carried alongside its core trait
/// methods.
pub async fn cleanup_completed(
    pool: &SqlitePool,
    older_than: DateTime<Utc>,
) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM jobs WHERE state = 'completed' AND updated_at < ?")
        .bind(older_than)
        .execute(pool)
        .await
        .map_err(|err| StoreError::Backend(err.into()))?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuectl_core::JOB_TIMEOUT_SECS;
    use tempfile::tempdir;

    async fn open_store() -> (SqliteStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let store = SqliteStore::connect(&path).await.unwrap();
        (store, dir)
    }

    fn new_job(id: &str) -> Job {
        let now = Utc::now();
        Job {
            id: id.to_string(),
            command: "true".to_string(),
            state: JobState::Pending,
            attempts: 0,
            max_retries: 3,
            created_at: now,
            updated_at: now,
            next_run_at: now,
            output: String::new(),
        }
    }

    #[tokio::test]
    async fn create_and_claim_roundtrip() {
        let (store, _dir) = open_store().await;
        store.create(new_job("a")).await.unwrap();

        let claimed = store.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, "a");
        assert_eq!(claimed.state, JobState::Processing);
        assert_eq!(claimed.attempts, 1);

        assert!(store.claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_id() {
        let (store, _dir) = open_store().await;
        store.create(new_job("a")).await.unwrap();
        let err = store.create(new_job("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn concurrent_claims_never_double_assign() {
        let (store, _dir) = open_store().await;
        for i in 0..10 {
            store.create(new_job(&format!("job-{i}"))).await.unwrap();
        }

        let store = std::sync::Arc::new(store);
        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.claim().await.unwrap() }));
        }

        let mut claimed_ids = std::collections::HashSet::new();
        for handle in handles {
            if let Some(job) = handle.await.unwrap() {
                assert!(claimed_ids.insert(job.id), "job claimed more than once");
            }
        }
        assert_eq!(claimed_ids.len(), 10);
    }

    #[tokio::test]
    async fn reclaims_stale_processing_job_past_timeout() {
        let (store, _dir) = open_store().await;
        let mut stale = new_job("stale");
        stale.state = JobState::Processing;
        stale.updated_at = Utc::now() - chrono::Duration::seconds(JOB_TIMEOUT_SECS + 1);
        store.create(stale).await.unwrap();

        let claimed = store.claim().await.unwrap().unwrap();
        assert_eq!(claimed.id, "stale");
        assert_eq!(claimed.attempts, 1);
    }

    #[tokio::test]
    async fn survives_reopen_of_same_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("queue.db");
        {
            let store = SqliteStore::connect(&path).await.unwrap();
            store.create(new_job("durable")).await.unwrap();
        }

        let reopened = SqliteStore::connect(&path).await.unwrap();
        let jobs = reopened.list_by_state(JobState::Pending).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].id, "durable");
    }

    #[tokio::test]
    async fn retry_dead_requires_dead_state() {
        let (store, _dir) = open_store().await;
        store.create(new_job("a")).await.unwrap();
        let err = store.retry_dead("a").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn stats_reflects_state_histogram() {
        let (store, _dir) = open_store().await;
        store.create(new_job("a")).await.unwrap();
        store.create(new_job("b")).await.unwrap();
        store.claim().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.get(&JobState::Pending), Some(&1));
        assert_eq!(stats.get(&JobState::Processing), Some(&1));
    }
}
