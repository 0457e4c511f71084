//! Runtime for executing relay jobs.
//!
//! This module provides the engine that turns queued webhook events into
//! action chain executions:
//!
//! - [`WorkerPool`] - Bounded job queue plus a fixed set of worker tasks
//! - [`JobSender`] - Clonable producer handle used by job sources
//! - [`JobProcessor`] - The per-job protocol: dedup, fetch, execute, record
//! - [`PoolConfig`] - Worker count, queue capacity and timeouts
//!
//! # Example
//!
//! ```ignore
//! use hermes::runtime::{PoolConfig, WorkerPool};
//!
//! let (mut pool, sender) = WorkerPool::builder(PgStore::new(pg_pool))
//!     .register_builtins(client)
//!     .config(PoolConfig::default())
//!     .build()?;
//!
//! pool.start(&shutdown_token);
//! ```

mod config;
mod pool;
mod sender;
pub mod worker;

pub use config::PoolConfig;
pub use pool::{PoolBuilder, WorkerPool};
pub use sender::{JobSender, SubmitError};
pub use worker::{ExecutionOutcome, JobProcessor};
