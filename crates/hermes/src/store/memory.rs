//! In-memory execution store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use time::OffsetDateTime;
use uuid::Uuid;

use super::ExecutionStore;
use crate::error::{Error, Result};
use crate::relay::{EventId, ExecutionLog, OutcomeRecord, ProcessedEvent, RelayAction, RelayId};

#[derive(Debug)]
struct StoredRelay {
    active: bool,
    actions: Vec<RelayAction>,
}

#[derive(Debug, Default)]
struct MemoryState {
    relays: HashMap<RelayId, StoredRelay>,
    processed: HashMap<(RelayId, EventId), OffsetDateTime>,
    logs: Vec<ExecutionLog>,
}

/// Mutex-guarded store for tests and single-process embedding.
///
/// Clones share state. Dedup uniqueness comes from the map insert under the
/// lock, so it only holds within one process.
///
/// Storage failures can be injected with [`fail_claims`](Self::fail_claims)
/// and [`fail_records`](Self::fail_records).
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_claims: Arc<AtomicBool>,
    fail_records: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an active relay with its actions.
    pub fn insert_relay(&self, relay_id: impl Into<RelayId>, actions: Vec<RelayAction>) {
        self.lock().relays.insert(
            relay_id.into(),
            StoredRelay {
                active: true,
                actions,
            },
        );
    }

    /// Activate or deactivate a relay. Unknown relays are ignored.
    pub fn set_relay_active(&self, relay_id: &RelayId, active: bool) {
        if let Some(relay) = self.lock().relays.get_mut(relay_id) {
            relay.active = active;
        }
    }

    /// Make subsequent dedup claims fail with a storage error.
    pub fn fail_claims(&self, fail: bool) {
        self.fail_claims.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent audit writes fail with a storage error.
    pub fn fail_records(&self, fail: bool) {
        self.fail_records.store(fail, Ordering::SeqCst);
    }

    /// All audit records in insertion order.
    pub fn execution_logs(&self) -> Vec<ExecutionLog> {
        self.lock().logs.clone()
    }

    /// Audit records for one relay in insertion order.
    pub fn execution_logs_for(&self, relay_id: &RelayId) -> Vec<ExecutionLog> {
        self.lock()
            .logs
            .iter()
            .filter(|log| &log.relay_id == relay_id)
            .cloned()
            .collect()
    }

    /// All dedup markers, oldest first.
    pub fn processed_events(&self) -> Vec<ProcessedEvent> {
        let mut events: Vec<_> = self
            .lock()
            .processed
            .iter()
            .map(|((relay_id, event_id), received_at)| ProcessedEvent {
                relay_id: relay_id.clone(),
                event_id: event_id.clone(),
                received_at: *received_at,
            })
            .collect();
        events.sort_by_key(|event| event.received_at);
        events
    }

    /// Returns `true` if the (relay, event) pair has been claimed.
    pub fn is_claimed(&self, relay_id: &RelayId, event_id: &EventId) -> bool {
        self.lock()
            .processed
            .contains_key(&(relay_id.clone(), event_id.clone()))
    }

    // No update leaves the state half-applied, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ExecutionStore for MemoryStore {
    async fn fetch_actions(&self, relay_id: &RelayId) -> Result<Vec<RelayAction>> {
        let state = self.lock();
        let mut actions = match state.relays.get(relay_id) {
            Some(relay) if relay.active => relay.actions.clone(),
            _ => Vec::new(),
        };
        drop(state);

        if actions.is_empty() {
            return Err(Error::NoActions {
                relay_id: relay_id.clone(),
            });
        }
        actions.sort_by_key(|action| action.order_index);
        Ok(actions)
    }

    async fn claim_dedup(&self, relay_id: &RelayId, event_id: &EventId) -> Result<bool> {
        if event_id.is_empty() {
            return Ok(true);
        }
        if self.fail_claims.load(Ordering::SeqCst) {
            return Err(Error::Storage("dedup insert failed".into()));
        }

        let key = (relay_id.clone(), event_id.clone());
        let mut state = self.lock();
        if state.processed.contains_key(&key) {
            return Ok(false);
        }
        state.processed.insert(key, OffsetDateTime::now_utc());
        Ok(true)
    }

    async fn record_outcome(&self, record: &OutcomeRecord) -> Result<()> {
        if self.fail_records.load(Ordering::SeqCst) {
            return Err(Error::Storage("failed to write execution log".into()));
        }

        let log = ExecutionLog {
            id: Uuid::now_v7(),
            relay_id: record.relay_id.clone(),
            event_id: record.event_id.clone(),
            status: record.status,
            payload: record.payload_json(),
            error_message: record.error_message().map(str::to_owned),
            executed_at: OffsetDateTime::now_utc(),
        };
        self.lock().logs.push(log);
        Ok(())
    }
}
