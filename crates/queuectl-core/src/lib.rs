//! # queuectl-core
//!
//! The job state machine and its durable-store contract, plus the worker
//! pool lifecycle that drains it: claim, execute, reconcile, retry, or
//! dead-letter. `queuectl-core` owns interfaces and policy; concrete
//! storage backends (`queuectl-sqlite`) and test doubles (`queuectl-testing`)
//! implement [`Store`] against them.
//!
//! ## Architecture
//!
//! ```text
//! enqueue()  ──────────►  Store::create
//!                             │
//!                             ▼
//!                        Store::claim  ◄──── Worker::run (poll tick)
//!                             │
//!                             ▼
//!                    sh -c <job.command>
//!                             │
//!                             ▼
//!                        Store::update  ──► completed | failed | dead
//! ```
//!
//! A [`pool::run`] owns the lifetime of several [`worker::Worker`]s; it does
//! not touch the store directly, only the workers it supervises do.

pub mod config;
pub mod enqueue;
pub mod error;
pub mod job;
pub mod pool;
pub mod store;
pub mod worker;

pub use config::Config;
pub use enqueue::{enqueue, JobDescriptor};
pub use error::StoreError;
pub use job::{Job, JobState};
pub use pool::{PoolStatus, StopOutcome};
pub use store::{job_timeout, Store, JOB_TIMEOUT_SECS};
pub use worker::Worker;
