//! Discord webhook executor.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::config::{optional_str, required_url};
use super::error::ActionError;
use super::executor::{ActionContext, ActionExecutor};
use super::render::render_message;
use super::webhook::WebhookClient;
use crate::relay::ActionConfig;

/// Discord rejects message content longer than this.
const MAX_CONTENT_CHARS: usize = 2000;

/// Posts the event to a Discord channel webhook.
///
/// # Configuration
///
/// | Key | Required | Meaning |
/// |-----|----------|---------|
/// | `webhook_url` | yes | Channel webhook URL |
/// | `message_template` | no | Message text, see [`render_message`] |
/// | `username` | no | Overrides the webhook's display name |
///
/// The request body is `{"content": <message>, "username": ...}`; content
/// is cut to Discord's 2000 character limit.
#[derive(Debug, Clone)]
pub struct DiscordExecutor {
    client: WebhookClient,
}

impl DiscordExecutor {
    /// Registry key for this executor.
    pub const TYPE: &'static str = "discord";

    pub fn new(client: WebhookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionExecutor for DiscordExecutor {
    async fn execute(
        &self,
        ctx: &ActionContext,
        config: &ActionConfig,
        payload: &[u8],
    ) -> Result<(), ActionError> {
        let webhook_url = required_url(config, "webhook_url")?;
        let template = optional_str(config, "message_template")?;
        let username = optional_str(config, "username")?;

        let mut content = render_message(template, payload);
        if let Some((cut, _)) = content.char_indices().nth(MAX_CONTENT_CHARS) {
            content.truncate(cut);
        }

        let mut body = Map::new();
        body.insert("content".into(), Value::String(content));
        if let Some(username) = username {
            body.insert("username".into(), Value::String(username.to_owned()));
        }

        self.client.post_json(ctx, &webhook_url, &body).await
    }
}
