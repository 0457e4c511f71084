//! Execution engine for webhook-triggered relay action chains.
//!
//! Hermes takes events captured by a webhook endpoint and replays each one
//! through the ordered chain of actions configured for its relay:
//!
//! - **At-most-once replay** - A (relay, event) pair is claimed in the store
//!   before anything runs; redeliveries are skipped
//! - **Ordered, fail-fast chains** - Actions run one after another by
//!   ascending order index; the first failure stops the chain
//! - **Audit log** - Every attempted job leaves exactly one execution log
//!   entry, whatever its outcome
//!
//! # Architecture
//!
//! ```text
//!  Job source ──submit──▶ bounded queue ──▶ Worker × N
//!      ▲                                      │
//!      │                                      │  1. claim_dedup(relay, event)
//!      │                                      │  2. fetch_actions(relay)
//!      │                                      │  3. registry.get(type).execute(...)
//!      │                                      │  4. record_outcome(...)
//!      └──────────────── ack(bool) ◀──────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hermes::{Job, PgStore, PoolConfig, WebhookClient, WebhookConfig, WorkerPool};
//! use tokio_util::sync::CancellationToken;
//!
//! let store = PgStore::connect(&database_url, 10).await?;
//! let (mut pool, sender) = WorkerPool::builder(store)
//!     .register_builtins(WebhookClient::new(WebhookConfig::default())?)
//!     .config(PoolConfig::from_env()?)
//!     .build()?;
//!
//! let shutdown = CancellationToken::new();
//! pool.start(&shutdown);
//!
//! // Called by the message queue consumer for every delivery
//! sender
//!     .submit(Job::new(relay_id, event_id, body, move |ok| delivery.ack(ok)))
//!     .await?;
//!
//! pool.shutdown().await;
//! ```
//!
//! # Feature Flags
//!
//! - `postgres` - Enables [`PgStore`] for production use with PostgreSQL
//!
//! # Design Documentation
//!
//! See `DESIGN.md` for architectural decisions.

pub mod action;
mod error;
mod job;
mod relay;
pub mod runtime;
pub mod store;

pub use action::{
    ActionContext, ActionError, ActionExecutor, ActionRegistry, RetryPolicy, WebhookClient,
    WebhookConfig,
};
pub use error::{Error, Result};
pub use job::{Ack, Job, RelayEvent};
pub use relay::{
    ActionConfig, EventId, ExecutionLog, ExecutionStatus, OutcomeRecord, ProcessedEvent,
    RelayAction, RelayId,
};
pub use runtime::{
    ExecutionOutcome, JobProcessor, JobSender, PoolBuilder, PoolConfig, SubmitError, WorkerPool,
};
#[cfg(feature = "postgres")]
pub use store::PgStore;
pub use store::{ExecutionStore, MemoryStore};
