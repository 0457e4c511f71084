//! Relay data model: identifiers, configured actions, and audit records.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::Error;

/// Per-action configuration: a JSON object whose keys each executor
/// defines and validates.
pub type ActionConfig = serde_json::Map<String, Value>;

/// Unique identifier for a relay.
///
/// # Example
///
/// ```
/// use hermes::RelayId;
///
/// let id = RelayId::new("relay-123");
/// assert_eq!(id.as_str(), "relay-123");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayId(String);

impl RelayId {
    /// Create a new relay ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for RelayId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RelayId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Identifier of one inbound webhook delivery.
///
/// An empty event ID disables deduplication for its job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Create a new event ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if no event ID was supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// One configured step of a relay's action chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayAction {
    /// Position in the chain; unique per relay, executed ascending.
    pub order_index: i32,
    /// Registry key of the executor that runs this action.
    pub action_type: String,
    /// Executor-specific configuration.
    pub config: ActionConfig,
}

impl RelayAction {
    /// Create a new relay action.
    pub fn new(order_index: i32, action_type: impl Into<String>, config: ActionConfig) -> Self {
        Self {
            order_index,
            action_type: action_type.into(),
            config,
        }
    }
}

/// Final status of an attempted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    /// The status as stored in the audit log.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "success",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(ExecutionStatus::Success),
            "failed" => Ok(ExecutionStatus::Failed),
            other => Err(Error::Storage(format!("unknown execution status: {other}"))),
        }
    }
}

/// Outcome of one attempted job, ready to be appended to the audit log.
#[derive(Debug, Clone)]
pub struct OutcomeRecord {
    pub relay_id: RelayId,
    pub event_id: EventId,
    pub status: ExecutionStatus,
    /// Error text on failure, a static message on success.
    pub detail: String,
    /// The webhook payload as received.
    pub payload: Bytes,
}

impl OutcomeRecord {
    /// Error message to persist: the detail for failures, nothing otherwise.
    pub fn error_message(&self) -> Option<&str> {
        match self.status {
            ExecutionStatus::Failed if !self.detail.is_empty() => Some(&self.detail),
            _ => None,
        }
    }

    /// Payload snapshot as JSON.
    ///
    /// Payloads that are not valid JSON are kept as a JSON string so the
    /// snapshot is never lost. Empty payloads have no snapshot.
    pub fn payload_json(&self) -> Option<Value> {
        if self.payload.is_empty() {
            return None;
        }
        match serde_json::from_slice(&self.payload) {
            Ok(value) => Some(value),
            Err(_) => Some(Value::String(
                String::from_utf8_lossy(&self.payload).into_owned(),
            )),
        }
    }
}

/// Stored audit record for one attempted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub id: Uuid,
    pub relay_id: RelayId,
    pub event_id: EventId,
    pub status: ExecutionStatus,
    pub payload: Option<Value>,
    pub error_message: Option<String>,
    pub executed_at: OffsetDateTime,
}

/// Dedup marker recording that a (relay, event) pair was claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub relay_id: RelayId,
    pub event_id: EventId,
    pub received_at: OffsetDateTime,
}
