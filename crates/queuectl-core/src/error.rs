//! Typed store errors.
//!
//! Mirrors the `StoreError::Conflict` / `StoreError::Backend` split this
//! workspace already uses for machine persistence: concurrency outcomes are
//! distinct from backend failures, and the CLI needs to tell them apart to
//! pick an exit code and a message.

use thiserror::Error;

/// Errors a [`crate::store::Store`] implementation can return.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `create` was called with an `id` that already exists.
    #[error("job with id '{0}' already exists")]
    Conflict(String),

    /// A required field was empty or otherwise malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// `retry_dead` (or another conditional operation) found no matching row.
    #[error("no job found with id '{0}' in the expected state")]
    NotFound(String),

    /// The backend failed for a reason unrelated to the job's state
    /// (connection, I/O, serialization).
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}
