//! Per-job execution protocol and the worker loop that drives it.

use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::PoolConfig;
use crate::action::{ActionContext, ActionRegistry};
use crate::error::{Error, Result};
use crate::job::{Job, RelayEvent};
use crate::relay::{ExecutionStatus, OutcomeRecord};
use crate::store::ExecutionStore;

/// Audit detail written for a successful job.
pub const SUCCESS_DETAIL: &str = "Relay executed successfully";

/// What processing one job amounted to.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Every action ran successfully.
    Succeeded,
    /// The event was already claimed; nothing ran and nothing was logged.
    Skipped,
    /// The job failed at the dedup claim, the action fetch, or an action.
    Failed(Error),
}

impl ExecutionOutcome {
    /// The acknowledgement to send: `true` unless the job failed.
    pub fn is_success(&self) -> bool {
        !matches!(self, ExecutionOutcome::Failed(_))
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&Error> {
        match self {
            ExecutionOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Runs the execution protocol for one event.
///
/// # Protocol
///
/// 1. Claim the dedup marker; a duplicate is skipped without any further
///    store access
/// 2. Fetch the relay's actions in ascending order
/// 3. Execute them one after another, stopping at the first failure
/// 4. Append one execution log entry, bounded by
///    [`PoolConfig::outcome_write_timeout`]
///
/// Steps 2 and 3 run on their own task so a panicking executor fails the
/// job and is still logged. The worker runs the whole protocol on a task of
/// its own as well, so a panicking store fails the job without an audit
/// entry.
pub struct JobProcessor<S> {
    store: S,
    registry: Arc<ActionRegistry>,
    config: PoolConfig,
}

impl<S> JobProcessor<S>
where
    S: ExecutionStore,
{
    /// Create a processor over a store and registry.
    pub fn new(store: S, registry: Arc<ActionRegistry>, config: PoolConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// The store this processor reads and writes.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one event and report the outcome.
    ///
    /// Storage failures, executor errors and executor panics all become
    /// [`ExecutionOutcome::Failed`].
    pub async fn process(&self, event: &RelayEvent) -> ExecutionOutcome {
        match self.store.claim_dedup(&event.relay_id, &event.event_id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(
                    relay_id = %event.relay_id,
                    event_id = %event.event_id,
                    "Duplicate event, skipping"
                );
                return ExecutionOutcome::Skipped;
            }
            Err(e) => {
                error!(
                    relay_id = %event.relay_id,
                    event_id = %event.event_id,
                    error = %e,
                    "Failed to claim event"
                );
                return ExecutionOutcome::Failed(e);
            }
        }

        let chain = tokio::spawn(
            execute_chain(
                self.store.clone(),
                Arc::clone(&self.registry),
                event.clone(),
            )
            .in_current_span(),
        );
        let result = match AbortOnDropHandle::new(chain).await {
            Ok(result) => result,
            Err(join_error) => {
                let message = join_error_message(join_error);
                error!(
                    relay_id = %event.relay_id,
                    event_id = %event.event_id,
                    panic = %message,
                    "Action chain panicked"
                );
                Err(Error::Panicked(message))
            }
        };

        self.record_outcome(event, &result).await;

        match result {
            Ok(()) => ExecutionOutcome::Succeeded,
            Err(e) => ExecutionOutcome::Failed(e),
        }
    }

    /// Write the audit entry. Failures are logged, never propagated.
    async fn record_outcome(&self, event: &RelayEvent, result: &Result<()>) {
        let (status, detail) = match result {
            Ok(()) => (ExecutionStatus::Success, SUCCESS_DETAIL.to_string()),
            Err(e) => (ExecutionStatus::Failed, e.to_string()),
        };
        let record = OutcomeRecord {
            relay_id: event.relay_id.clone(),
            event_id: event.event_id.clone(),
            status,
            detail,
            payload: event.payload.clone(),
        };

        let timeout = self.config.outcome_write_timeout;
        let written = match tokio::time::timeout(timeout, self.store.record_outcome(&record)).await
        {
            Ok(written) => written,
            Err(_) => Err(Error::Timeout(timeout)),
        };

        if let Err(e) = written {
            error!(
                relay_id = %event.relay_id,
                event_id = %event.event_id,
                status = %status,
                error = %e,
                "Failed to write execution log"
            );
        }
    }
}

async fn execute_chain<S>(store: S, registry: Arc<ActionRegistry>, event: RelayEvent) -> Result<()>
where
    S: ExecutionStore,
{
    let actions = store.fetch_actions(&event.relay_id).await?;

    debug!(
        relay_id = %event.relay_id,
        event_id = %event.event_id,
        actions = actions.len(),
        "Executing relay"
    );

    for action in &actions {
        let ctx = ActionContext::new(event.relay_id.clone(), event.event_id.clone(), action);
        let executor = registry.get(&action.action_type)?;

        debug!(
            relay_id = %event.relay_id,
            action_type = %action.action_type,
            order_index = action.order_index,
            "Executing action"
        );

        if let Err(source) = executor.execute(&ctx, &action.config, &event.payload).await {
            warn!(
                relay_id = %event.relay_id,
                event_id = %event.event_id,
                action_type = %action.action_type,
                order_index = action.order_index,
                error = %source,
                "Action failed"
            );
            return Err(Error::ActionFailed {
                action_type: action.action_type.clone(),
                order_index: action.order_index,
                source,
            });
        }
    }

    Ok(())
}

fn join_error_message(join_error: JoinError) -> String {
    if join_error.is_panic() {
        panic_message(join_error.into_panic())
    } else {
        join_error.to_string()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// One worker task draining the shared job queue.
///
/// The worker takes jobs one at a time until its token is cancelled or the
/// queue is closed and empty. Cancellation and the next job race in an
/// unbiased `select!`, so jobs still queued at shutdown may be left behind
/// unacknowledged for the job source to redeliver.
pub(crate) struct Worker<S> {
    processor: Arc<JobProcessor<S>>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    worker_id: String,
}

impl<S> Worker<S>
where
    S: ExecutionStore,
{
    pub fn new(
        processor: Arc<JobProcessor<S>>,
        jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
        worker_id: String,
    ) -> Self {
        Self {
            processor,
            jobs,
            worker_id,
        }
    }

    /// Run until cancelled or the queue is closed and drained.
    pub async fn run(self, shutdown: CancellationToken) {
        debug!(worker_id = %self.worker_id, "Worker started");

        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(worker_id = %self.worker_id, "Worker shutting down");
                    break;
                }
                job = self.next_job() => job,
            };

            let Some(job) = job else {
                debug!(worker_id = %self.worker_id, "Job queue closed");
                break;
            };

            self.handle(job).await;
        }
    }

    async fn next_job(&self) -> Option<Job> {
        let mut jobs = self.jobs.lock().await;
        jobs.recv().await
    }

    async fn handle(&self, job: Job) {
        let (event, ack) = job.into_parts();
        let span = info_span!(
            "job",
            worker_id = %self.worker_id,
            relay_id = %event.relay_id,
            event_id = %event.event_id,
        );

        async {
            let started = Instant::now();
            let processor = Arc::clone(&self.processor);
            let task =
                tokio::spawn(async move { processor.process(&event).await }.in_current_span());
            let outcome = match AbortOnDropHandle::new(task).await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    let message = join_error_message(join_error);
                    error!(panic = %message, "Job panicked");
                    ExecutionOutcome::Failed(Error::Panicked(message))
                }
            };
            let duration_ms = started.elapsed().as_millis() as u64;

            match &outcome {
                ExecutionOutcome::Succeeded => {
                    info!(duration_ms, "Relay executed successfully");
                }
                ExecutionOutcome::Skipped => {
                    debug!(duration_ms, "Relay skipped");
                }
                ExecutionOutcome::Failed(e) => {
                    warn!(duration_ms, error = %e, "Relay execution failed");
                }
            }

            ack.send(outcome.is_success());
        }
        .instrument(span)
        .await
    }
}
