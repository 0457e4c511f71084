//! Errors returned by action executors.

use thiserror::Error;

/// Failure of a single action invocation.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Required configuration is missing or has the wrong type.
    ///
    /// Never retried.
    #[error("invalid action config: {0}")]
    InvalidConfig(String),

    /// The request could not be sent or no response arrived in time.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a rate-limit or server-error status.
    #[error("endpoint returned {status}")]
    Retryable {
        /// HTTP status code.
        status: u16,
    },

    /// The endpoint answered with a non-retryable, non-success status.
    #[error("endpoint returned non-retryable status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// Every attempt failed; `last` is the final observed failure.
    #[error("delivery failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ActionError>,
    },

    /// Failed to build the request body.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ActionError {
    /// Returns `true` if another attempt may succeed.
    ///
    /// Rate limits, server errors and transport failures are transient;
    /// everything else is terminal. A request that could not even be built
    /// will fail the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ActionError::Retryable { .. } => true,
            ActionError::Transport(err) => !err.is_builder(),
            _ => false,
        }
    }

    /// The root cause, looking through [`ActionError::RetriesExhausted`].
    pub fn root_cause(&self) -> &ActionError {
        match self {
            ActionError::RetriesExhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}
