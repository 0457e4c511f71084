//! Worker pool: bounded job queue plus a fixed set of workers.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use super::PoolConfig;
use super::sender::JobSender;
use super::worker::{JobProcessor, Worker};
use crate::action::{ActionExecutor, ActionRegistry, RegistryBuilder, WebhookClient};
use crate::error::Result;
use crate::job::Job;
use crate::store::ExecutionStore;

/// The execution engine.
///
/// Owns the receiving half of a bounded job queue and spawns
/// [`PoolConfig::worker_count`] workers that drain it. Jobs enter through
/// the [`JobSender`] returned at construction.
///
/// # Shutdown
///
/// [`shutdown`](Self::shutdown) cancels the workers, closes the queue and
/// then waits for in-flight jobs up to [`PoolConfig::shutdown_timeout`]. Draining
/// is best effort: a job still waiting in the queue when shutdown begins is
/// dropped without its ack being called, and the job source redelivers it.
/// A job is never acknowledged twice.
///
/// # Example
///
/// ```ignore
/// use hermes::runtime::{PoolConfig, WorkerPool};
/// use tokio_util::sync::CancellationToken;
///
/// let (mut pool, sender) = WorkerPool::builder(store)
///     .register_builtins(WebhookClient::new(WebhookConfig::default())?)
///     .config(PoolConfig::from_env()?)
///     .build()?;
///
/// let shutdown = CancellationToken::new();
/// pool.start(&shutdown);
///
/// sender.submit(Job::new(relay_id, event_id, body, |ok| consumer.ack(ok))).await?;
///
/// pool.shutdown().await;
/// ```
pub struct WorkerPool<S> {
    processor: Arc<JobProcessor<S>>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    config: PoolConfig,
    pool_id: String,
    token: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
}

impl<S> WorkerPool<S>
where
    S: ExecutionStore,
{
    /// Start configuring a pool over a store.
    pub fn builder(store: S) -> PoolBuilder<S> {
        PoolBuilder::new(store)
    }

    /// Create a pool from an already built registry.
    pub fn new(
        store: S,
        registry: impl Into<Arc<ActionRegistry>>,
        config: PoolConfig,
    ) -> (Self, JobSender) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let processor = JobProcessor::new(store, registry.into(), config.clone());

        let pool = Self {
            processor: Arc::new(processor),
            jobs: Arc::new(Mutex::new(rx)),
            config,
            pool_id: Uuid::new_v4().to_string(),
            token: None,
            handles: Vec::new(),
        };
        (pool, JobSender::new(tx))
    }

    /// The pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Returns `true` once [`start`](Self::start) has spawned the workers.
    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }

    /// Spawn the workers and return immediately.
    ///
    /// The workers stop when `parent` is cancelled or when
    /// [`shutdown`](Self::shutdown) is called. Calling `start` twice has no
    /// effect.
    pub fn start(&mut self, parent: &CancellationToken) {
        if self.token.is_some() {
            warn!(pool_id = %self.pool_id, "Worker pool already started");
            return;
        }

        let token = parent.child_token();
        let worker_count = self.config.worker_count.max(1);

        info!(
            pool_id = %self.pool_id,
            workers = worker_count,
            queue_capacity = self.config.queue_capacity,
            "Worker pool starting"
        );

        for i in 0..worker_count {
            let worker = Worker::new(
                Arc::clone(&self.processor),
                Arc::clone(&self.jobs),
                format!("{}-worker-{}", self.pool_id, i),
            );
            let worker_token = token.clone();
            self.handles.push(tokio::spawn(async move {
                worker.run(worker_token).await;
            }));
        }

        self.token = Some(token);
    }

    /// Stop the pool.
    ///
    /// Cancels the workers and closes the queue, so senders see
    /// [`SubmitError::Closed`](super::SubmitError::Closed) from this point
    /// on. Then waits for in-flight jobs, aborting them after the shutdown
    /// timeout, and drops whatever was still queued.
    pub async fn shutdown(mut self) {
        if let Some(token) = &self.token {
            token.cancel();
        }

        // Workers release the receiver once cancelled. Holding it until they
        // exit keeps them from picking up queued jobs after cancellation.
        let mut jobs = self.jobs.lock().await;
        jobs.close();

        let shutdown_timeout = self.config.shutdown_timeout;
        let mut handles = std::mem::take(&mut self.handles);
        let all_workers = async {
            for handle in handles.iter_mut() {
                let _ = handle.await;
            }
        };

        match tokio::time::timeout(shutdown_timeout, all_workers).await {
            Ok(()) => {
                info!(pool_id = %self.pool_id, "Worker pool stopped gracefully");
            }
            Err(_) => {
                warn!(
                    pool_id = %self.pool_id,
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Shutdown timeout exceeded, aborting workers"
                );
                for handle in &handles {
                    handle.abort();
                }
                for handle in handles {
                    if !handle.is_finished() {
                        let _ = handle.await;
                    }
                }
            }
        }

        let mut dropped = 0usize;
        while jobs.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            warn!(
                pool_id = %self.pool_id,
                dropped,
                "Dropped queued jobs without acknowledgement"
            );
        }
    }
}

/// Builder for a [`WorkerPool`].
///
/// Collects executors and configuration; the registry is built and
/// duplicate registrations are reported in [`build`](Self::build).
pub struct PoolBuilder<S> {
    store: S,
    registry: RegistryBuilder,
    config: PoolConfig,
}

impl<S> PoolBuilder<S>
where
    S: ExecutionStore,
{
    fn new(store: S) -> Self {
        Self {
            store,
            registry: ActionRegistry::builder(),
            config: PoolConfig::default(),
        }
    }

    /// Register an executor under an action type.
    pub fn register<E>(mut self, action_type: impl Into<String>, executor: E) -> Self
    where
        E: ActionExecutor,
    {
        self.registry = self.registry.register(action_type, executor);
        self
    }

    /// Register the built-in `slack`, `discord` and `log` executors.
    pub fn register_builtins(mut self, client: WebhookClient) -> Self {
        self.registry = self.registry.register_builtins(client);
        self
    }

    /// Set the pool configuration.
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the pool and the sender for its queue.
    pub fn build(self) -> Result<(WorkerPool<S>, JobSender)> {
        self.config.validate()?;
        let registry = self.registry.build()?;
        Ok(WorkerPool::new(self.store, registry, self.config))
    }
}
