//! Log-only executor.

use async_trait::async_trait;
use tracing::info;

use super::config::optional_str;
use super::error::ActionError;
use super::executor::{ActionContext, ActionExecutor};
use crate::relay::ActionConfig;

/// Writes the payload to the tracing log instead of calling out.
///
/// Useful for dry runs and for relays under construction. The optional
/// `label` key is included in the log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogExecutor;

impl LogExecutor {
    /// Registry key for this executor.
    pub const TYPE: &'static str = "log";
}

#[async_trait]
impl ActionExecutor for LogExecutor {
    async fn execute(
        &self,
        ctx: &ActionContext,
        config: &ActionConfig,
        payload: &[u8],
    ) -> Result<(), ActionError> {
        let label = optional_str(config, "label")?.unwrap_or("relay");
        info!(
            relay_id = %ctx.relay_id,
            event_id = %ctx.event_id,
            order_index = ctx.order_index,
            label,
            payload = %String::from_utf8_lossy(payload),
            "Log action"
        );
        Ok(())
    }
}
