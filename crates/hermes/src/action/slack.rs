//! Slack incoming-webhook executor.

use async_trait::async_trait;
use serde_json::json;

use super::config::{optional_str, required_url};
use super::error::ActionError;
use super::executor::{ActionContext, ActionExecutor};
use super::render::render_message;
use super::webhook::WebhookClient;
use crate::relay::ActionConfig;

/// Posts the event to a Slack incoming webhook.
///
/// # Configuration
///
/// | Key | Required | Meaning |
/// |-----|----------|---------|
/// | `webhook_url` | yes | Incoming webhook URL |
/// | `message_template` | no | Message text, see [`render_message`] |
///
/// The request body is `{"text": <message>}`.
#[derive(Debug, Clone)]
pub struct SlackExecutor {
    client: WebhookClient,
}

impl SlackExecutor {
    /// Registry key for this executor.
    pub const TYPE: &'static str = "slack";

    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionExecutor for SlackExecutor {
    async fn execute(
        &self,
        ctx: &ActionContext,
        config: &ActionConfig,
        payload: &[u8],
    ) -> Result<(), ActionError> {
        let webhook_url = required_url(config, "webhook_url")?;
        let template = optional_str(config, "message_template")?;

        let body = json!({ "text": render_message(template, payload) });
        self.client.post_json(ctx, &webhook_url, &body).await
    }
}
