//! Retry policy for outbound action calls.

use std::time::Duration;

/// Configuration for executor retry behavior with linear backoff.
///
/// Only transient failures are retried (see
/// [`ActionError::is_retryable`](super::ActionError::is_retryable)).
///
/// # Backoff Calculation
///
/// The delay after failed attempt N is `base_delay * N`.
///
/// With defaults (3 attempts, base=200ms):
/// - Attempt 1 fails: wait 200ms
/// - Attempt 2 fails: wait 400ms
/// - Attempt 3 fails: give up
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hermes::action::RetryPolicy;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
/// assert_eq!(policy.backoff_duration(2), Duration::from_millis(400));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Delay unit; multiplied by the failed attempt number.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Returns `true` if another attempt should follow.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that just failed (1-based)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after the given failed attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The attempt number that just failed (1-based)
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.max(1))
    }
}
