//! Action registry: lookup from action type to executor.

use std::collections::HashMap;
use std::sync::Arc;

use super::discord::DiscordExecutor;
use super::executor::ActionExecutor;
use super::log::LogExecutor;
use super::slack::SlackExecutor;
use super::webhook::WebhookClient;
use crate::error::{Error, Result};

/// Immutable mapping from action type to [`ActionExecutor`].
///
/// Built once at startup with [`ActionRegistry::builder`] and shared by all
/// workers behind an `Arc`. Lookups take no locks.
///
/// # Example
///
/// ```ignore
/// let registry = ActionRegistry::builder()
///     .register_builtins(WebhookClient::new(WebhookConfig::default())?)
///     .register("pagerduty", PagerExecutor::new(client))
///     .build()?;
///
/// let executor = registry.get("slack")?;
/// ```
pub struct ActionRegistry {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
}

impl ActionRegistry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry with only the built-in `slack`, `discord` and `log` executors.
    pub fn with_defaults(client: WebhookClient) -> Self {
        let builder = RegistryBuilder::default().register_builtins(client);
        Self {
            executors: builder.executors,
        }
    }

    /// Look up the executor for an action type.
    ///
    /// There is no fallback executor: unknown types are an error.
    pub fn get(&self, action_type: &str) -> Result<&dyn ActionExecutor> {
        self.executors
            .get(action_type)
            .map(|executor| executor.as_ref())
            .ok_or_else(|| Error::UnknownActionType(action_type.to_string()))
    }

    /// Returns `true` if an executor is registered for the type.
    pub fn contains(&self, action_type: &str) -> bool {
        self.executors.contains_key(action_type)
    }

    /// Registered action types, sorted.
    pub fn action_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.executors.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Returns the number of registered executors.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    /// Returns `true` if no executors are registered.
    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("action_types", &self.action_types())
            .finish()
    }
}

/// Builder for an [`ActionRegistry`].
///
/// Duplicate registrations are reported when [`build`](Self::build) is
/// called.
#[derive(Default)]
pub struct RegistryBuilder {
    executors: HashMap<String, Arc<dyn ActionExecutor>>,
    duplicate_action_type: Option<String>,
}

impl RegistryBuilder {
    /// Register an executor under an action type.
    pub fn register<E>(self, action_type: impl Into<String>, executor: E) -> Self
    where
        E: ActionExecutor,
    {
        self.register_shared(action_type, Arc::new(executor))
    }

    /// Register an executor that is shared with other owners.
    pub fn register_shared(
        mut self,
        action_type: impl Into<String>,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let action_type = action_type.into();
        if self.executors.contains_key(&action_type) {
            if self.duplicate_action_type.is_none() {
                self.duplicate_action_type = Some(action_type);
            }
            return self;
        }

        self.executors.insert(action_type, executor);
        self
    }

    /// Register the built-in `slack`, `discord` and `log` executors.
    pub fn register_builtins(self, client: WebhookClient) -> Self {
        self.register(SlackExecutor::TYPE, SlackExecutor::new(client.clone()))
            .register(DiscordExecutor::TYPE, DiscordExecutor::new(client))
            .register(LogExecutor::TYPE, LogExecutor)
    }

    /// Finish the registry.
    pub fn build(self) -> Result<ActionRegistry> {
        if let Some(action_type) = self.duplicate_action_type {
            return Err(Error::DuplicateActionType(action_type));
        }
        Ok(ActionRegistry {
            executors: self.executors,
        })
    }
}
