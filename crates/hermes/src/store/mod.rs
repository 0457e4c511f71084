//! Storage abstraction for relay actions, dedup markers and audit records.
//!
//! This module provides the [`ExecutionStore`] trait used by the worker
//! pool. Two implementations are provided:
//!
//! - [`PgStore`] - PostgreSQL storage for production (requires `postgres` feature)
//! - [`MemoryStore`] - In-process storage for tests and embedding

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use std::future::Future;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::error::Result;
use crate::relay::{EventId, OutcomeRecord, RelayAction, RelayId};

/// Persistence boundary of the execution engine.
///
/// All methods are called concurrently by every worker. Implementations
/// must not rely on in-process locking for dedup correctness when several
/// engine instances share a backend: [`claim_dedup`](Self::claim_dedup)
/// must be an atomic insert-if-absent in the backend itself.
///
/// Each method is a single logical operation; no transaction spans more
/// than one of them.
pub trait ExecutionStore: Send + Sync + Clone + 'static {
    /// Fetch the actions of an active relay, ordered by ascending
    /// `order_index`.
    ///
    /// Returns [`Error::NoActions`](crate::Error::NoActions) when the relay
    /// is absent, inactive, or has no actions. Other errors are
    /// infrastructure failures.
    fn fetch_actions(
        &self,
        relay_id: &RelayId,
    ) -> impl Future<Output = Result<Vec<RelayAction>>> + Send;

    /// Claim the dedup marker for a (relay, event) pair.
    ///
    /// Returns `Ok(true)` if this call inserted the marker and `Ok(false)`
    /// if it was already present. Empty event IDs are never recorded and
    /// always return `Ok(true)`.
    fn claim_dedup(
        &self,
        relay_id: &RelayId,
        event_id: &EventId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Append an execution outcome to the audit log.
    fn record_outcome(&self, record: &OutcomeRecord) -> impl Future<Output = Result<()>> + Send;
}
