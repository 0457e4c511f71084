//! Worker pool configuration.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for the worker pool.
///
/// Controls concurrency, queue capacity and the timeouts that bound the
/// outcome write and shutdown.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use hermes::runtime::PoolConfig;
///
/// let config = PoolConfig {
///     worker_count: 8,
///     queue_capacity: 500,
///     ..Default::default()
/// };
/// assert_eq!(config.outcome_write_timeout, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker tasks draining the queue.
    ///
    /// Each worker runs one job at a time, so this is also the maximum
    /// number of concurrently executing action chains. Default: 4.
    pub worker_count: usize,

    /// Capacity of the bounded job queue.
    ///
    /// `JobSender::submit` waits and `JobSender::try_submit` rejects once
    /// this many jobs are waiting. Default: 100.
    pub queue_capacity: usize,

    /// Upper bound for writing one execution log entry.
    ///
    /// The write is not tied to pool cancellation, so an outcome is still
    /// recorded for a job that finishes during shutdown. Default: 3 seconds.
    pub outcome_write_timeout: Duration,

    /// Maximum time to wait for in-flight jobs during shutdown.
    ///
    /// After this timeout the remaining workers are aborted. Default: 30
    /// seconds.
    pub shutdown_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 100,
            outcome_write_timeout: Duration::from_secs(3),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Load configuration from the environment.
    ///
    /// A `.env` file in the working directory is loaded first if present.
    /// Unset variables keep their defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `HERMES_WORKERS` | `worker_count` |
    /// | `HERMES_QUEUE_CAPACITY` | `queue_capacity` |
    /// | `HERMES_OUTCOME_TIMEOUT_MS` | `outcome_write_timeout` |
    /// | `HERMES_SHUTDOWN_TIMEOUT_MS` | `shutdown_timeout` |
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            worker_count: parse_var(&lookup, "HERMES_WORKERS")?.unwrap_or(defaults.worker_count),
            queue_capacity: parse_var(&lookup, "HERMES_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            outcome_write_timeout: parse_var(&lookup, "HERMES_OUTCOME_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.outcome_write_timeout),
            shutdown_timeout: parse_var(&lookup, "HERMES_SHUTDOWN_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.shutdown_timeout),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pool cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::Config("worker_count must be at least 1".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}")))
}
