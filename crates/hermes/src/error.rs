//! Error types for hermes.

use std::time::Duration;

use thiserror::Error;

use crate::action::ActionError;
use crate::relay::RelayId;

/// A `Result` alias with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while executing a relay job.
#[derive(Debug, Error)]
pub enum Error {
    /// The relay is absent, inactive, or has no actions configured.
    ///
    /// This is a "nothing to do" condition rather than an infrastructure
    /// failure; see [`Error::is_not_found`].
    #[error("no actions configured for relay {relay_id}")]
    NoActions {
        /// The relay that was looked up.
        relay_id: RelayId,
    },

    /// An action references a type that has no registered executor.
    #[error("unknown action type: {0}")]
    UnknownActionType(String),

    /// An action type was registered more than once.
    #[error("duplicate action type registration: {0}")]
    DuplicateActionType(String),

    /// An executor failed. The remaining actions of the chain were not run.
    #[error("action {action_type} (order {order_index}) failed: {source}")]
    ActionFailed {
        /// Type of the failing action.
        action_type: String,
        /// Order index of the failing action within its relay.
        order_index: i32,
        /// The executor's error.
        #[source]
        source: ActionError,
    },

    /// The action chain panicked while executing.
    #[error("action chain panicked: {0}")]
    Panicked(String),

    /// Failed to serialize or deserialize stored data.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// PostgreSQL storage error.
    ///
    /// Preserves the full `sqlx::Error` for matching on specific database
    /// error conditions (connection timeout, constraint violation, etc.).
    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Storage error from a non-SQL backend.
    #[error("storage error: {0}")]
    Storage(String),

    /// A bounded storage operation did not finish in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Invalid runtime configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Returns `true` for "relay has nothing to run" conditions.
    ///
    /// Lets callers tell an empty or inactive relay apart from broken
    /// infrastructure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoActions { .. })
    }

    /// Returns `true` if the error originated in the storage layer.
    pub fn is_storage(&self) -> bool {
        match self {
            #[cfg(feature = "postgres")]
            Error::Postgres(_) => true,
            Error::Storage(_) | Error::Timeout(_) => true,
            _ => false,
        }
    }
}
