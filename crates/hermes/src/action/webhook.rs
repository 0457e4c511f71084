//! JSON webhook delivery with bounded retries.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Serialize;
use tracing::{debug, warn};

use super::error::ActionError;
use super::executor::ActionContext;
use super::retry::RetryPolicy;

/// Longest response body kept in a [`ActionError::Rejected`] error.
const MAX_ERROR_BODY: usize = 512;

/// Configuration for outbound webhook calls.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Timeout for a single HTTP attempt, including reading the response.
    ///
    /// Default: 5 seconds.
    pub request_timeout: Duration,

    /// Retry policy for transient failures.
    pub retry_policy: RetryPolicy,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// HTTP client shared by webhook-style executors.
///
/// Each attempt is one `POST` with a JSON body. 2xx is success; 429 and 5xx
/// responses and transport errors are retried with linear backoff; any
/// other status is returned immediately.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    retry_policy: RetryPolicy,
}

impl WebhookClient {
    /// Build a client from configuration.
    pub fn new(config: WebhookConfig) -> Result<Self, ActionError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            retry_policy: config.retry_policy,
        })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(client: reqwest::Client, retry_policy: RetryPolicy) -> Self {
        Self {
            client,
            retry_policy,
        }
    }

    /// The retry policy applied to each delivery.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// POST `body` to `url`, retrying transient failures.
    pub async fn post_json<B>(
        &self,
        ctx: &ActionContext,
        url: &Url,
        body: &B,
    ) -> Result<(), ActionError>
    where
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_vec(body)?;
        let mut attempt = 1;

        loop {
            let failure = match self.send_once(url, &body).await {
                Ok(()) => {
                    debug!(
                        relay_id = %ctx.relay_id,
                        action_type = %ctx.action_type,
                        attempt,
                        "Webhook delivered"
                    );
                    return Ok(());
                }
                Err(err) if err.is_retryable() => err,
                Err(err) => return Err(err),
            };

            if !self.retry_policy.should_retry(attempt) {
                return Err(ActionError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(failure),
                });
            }

            let backoff = self.retry_policy.backoff_duration(attempt);
            warn!(
                relay_id = %ctx.relay_id,
                action_type = %ctx.action_type,
                order_index = ctx.order_index,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %failure,
                "Webhook attempt failed, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    async fn send_once(&self, url: &Url, body: &[u8]) -> Result<(), ActionError> {
        let response = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if is_retryable_status(status) {
            return Err(ActionError::Retryable {
                status: status.as_u16(),
            });
        }

        let mut text = response.text().await.unwrap_or_default();
        if text.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
        }
        Err(ActionError::Rejected {
            status: status.as_u16(),
            body: text,
        })
    }
}

/// Rate limiting and server errors are worth another attempt.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
