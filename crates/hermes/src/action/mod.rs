//! Pluggable action executors and the registry that dispatches to them.
//!
//! - [`ActionExecutor`] - Trait implemented once per action type
//! - [`ActionRegistry`] - Immutable lookup from action type to executor
//! - [`WebhookClient`] - JSON POST delivery with [`RetryPolicy`] backoff
//!
//! Built-in executors: [`SlackExecutor`] (`slack`), [`DiscordExecutor`]
//! (`discord`) and [`LogExecutor`] (`log`).

mod config;
mod discord;
mod error;
mod executor;
mod log;
mod registry;
mod render;
mod retry;
mod slack;
mod webhook;

pub use config::{optional_str, required_str, required_url};
pub use discord::DiscordExecutor;
pub use error::ActionError;
pub use executor::{ActionContext, ActionExecutor};
pub use log::LogExecutor;
pub use registry::{ActionRegistry, RegistryBuilder};
pub use render::render_message;
pub use retry::RetryPolicy;
pub use slack::SlackExecutor;
pub use webhook::{WebhookClient, WebhookConfig};
