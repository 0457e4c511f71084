//! Executor trait and the context handed to each invocation.

use async_trait::async_trait;

use super::error::ActionError;
use crate::relay::{ActionConfig, EventId, RelayAction, RelayId};

/// Context provided to executors during one action invocation.
///
/// Carries correlation data for logging and for external APIs that accept
/// idempotency keys.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Relay whose chain is executing.
    pub relay_id: RelayId,

    /// Event being replayed. May be empty when dedup is disabled.
    pub event_id: EventId,

    /// Type of the action being executed.
    pub action_type: String,

    /// Position of the action within the relay's chain.
    pub order_index: i32,
}

impl ActionContext {
    /// Create a context for one action of a relay.
    pub fn new(relay_id: RelayId, event_id: EventId, action: &RelayAction) -> Self {
        Self {
            relay_id,
            event_id,
            action_type: action.action_type.clone(),
            order_index: action.order_index,
        }
    }

    /// Key for external service calls.
    ///
    /// Format: `{relay_id}:{event_id}:{order_index}`. Stable across retries
    /// of the same action for the same event.
    pub fn idempotency_key(&self) -> String {
        format!("{}:{}:{}", self.relay_id, self.event_id, self.order_index)
    }
}

/// Capability that performs one action type's side effect.
///
/// Implement this once per action type and register it with an
/// [`ActionRegistry`](super::ActionRegistry) under its type name.
///
/// # Contract
///
/// - Validate the configuration keys you need; missing or mistyped keys are
///   [`ActionError::InvalidConfig`] and must not be retried.
/// - Bound every external call with a timeout.
/// - Retry only transient failures (rate limits, server errors), with
///   backoff, and report the last observed failure once attempts run out.
///
/// # Example
///
/// ```ignore
/// struct PagerExecutor { client: PagerClient }
///
/// #[async_trait]
/// impl ActionExecutor for PagerExecutor {
///     async fn execute(
///         &self,
///         ctx: &ActionContext,
///         config: &ActionConfig,
///         payload: &[u8],
///     ) -> Result<(), ActionError> {
///         let service = required_str(config, "service_key")?;
///         self.client.trigger(service, ctx.idempotency_key(), payload).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait ActionExecutor: Send + Sync + 'static {
    /// Perform the side effect for one action of a relay.
    async fn execute(
        &self,
        ctx: &ActionContext,
        config: &ActionConfig,
        payload: &[u8],
    ) -> Result<(), ActionError>;
}
