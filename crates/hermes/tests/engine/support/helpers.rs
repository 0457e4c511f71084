use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use hermes::{
    ActionConfig, ActionRegistry, Job, JobProcessor, MemoryStore, PoolConfig, RelayAction,
    RetryPolicy, WebhookClient, WebhookConfig,
};
use serde_json::Value;

use super::recording::{CallLog, RECORD, RecordingExecutor};

pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Initialize tracing for tests. Safe to call multiple times.
///
/// The `try_init()` call is idempotent; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("hermes=debug")
        .try_init();
}

/// Poll until condition returns Some(T) or timeout expires.
pub async fn wait_until<F, Fut, T>(timeout: Duration, interval: Duration, check: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Some(result) = check().await? {
            return Ok(result);
        }

        if tokio::time::Instant::now() > deadline {
            return Err(anyhow!("timeout waiting for condition"));
        }

        tokio::time::sleep(interval).await;
    }
}

pub fn config(value: Value) -> ActionConfig {
    value.as_object().cloned().expect("action config must be an object")
}

pub fn action(order_index: i32, action_type: &str, value: Value) -> RelayAction {
    RelayAction::new(order_index, action_type, config(value))
}

/// A `record` action with the given extra config.
pub fn record(order_index: i32, label: &str, extra: Value) -> RelayAction {
    let mut cfg = config(extra);
    cfg.insert("label".into(), Value::String(label.into()));
    RelayAction::new(order_index, RECORD, cfg)
}

/// Webhook client with production timeouts and retry policy.
pub fn webhook_client() -> WebhookClient {
    WebhookClient::new(WebhookConfig::default()).expect("build webhook client")
}

/// Webhook client with short backoff for tests that only count attempts.
pub fn fast_webhook_client() -> WebhookClient {
    WebhookClient::new(WebhookConfig {
        request_timeout: Duration::from_secs(2),
        retry_policy: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(10),
        },
    })
    .expect("build webhook client")
}

/// Registry with the built-ins plus the recording executor.
pub fn registry(calls: &CallLog, client: WebhookClient) -> Arc<ActionRegistry> {
    let registry = ActionRegistry::builder()
        .register_builtins(client)
        .register(RECORD, RecordingExecutor::new(calls.clone()))
        .build()
        .expect("build registry");
    Arc::new(registry)
}

/// Fast pool config for tests.
pub fn test_pool_config() -> PoolConfig {
    PoolConfig {
        worker_count: 2,
        queue_capacity: 16,
        outcome_write_timeout: Duration::from_millis(500),
        shutdown_timeout: Duration::from_secs(5),
    }
}

pub fn processor(store: &MemoryStore, calls: &CallLog) -> JobProcessor<MemoryStore> {
    JobProcessor::new(
        store.clone(),
        registry(calls, fast_webhook_client()),
        test_pool_config(),
    )
}

/// Collects acknowledgements as `(event_id, success)`.
#[derive(Clone, Default)]
pub struct AckRecorder {
    acks: Arc<Mutex<Vec<(String, bool)>>>,
}

impl AckRecorder {
    pub fn job(&self, relay_id: &str, event_id: &str, payload: &str) -> Job {
        let acks = Arc::clone(&self.acks);
        let key = event_id.to_string();
        Job::new(relay_id, event_id, payload.to_string(), move |ok| {
            acks.lock().unwrap().push((key, ok));
        })
    }

    pub fn acks(&self) -> Vec<(String, bool)> {
        self.acks.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.acks.lock().unwrap().len()
    }

    pub async fn wait_for(&self, count: usize) -> Result<Vec<(String, bool)>> {
        wait_until(DEFAULT_TEST_TIMEOUT, DEFAULT_POLL_INTERVAL, || {
            let recorder = self.clone();
            async move { Ok((recorder.len() >= count).then(|| recorder.acks())) }
        })
        .await
    }
}
