//! Producer handle for the job queue.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::job::Job;

/// A job the pool did not accept.
///
/// The job is handed back so the caller can nack it instead of losing it.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The queue is at capacity.
    #[error("job queue is full")]
    Full(Job),

    /// The pool has shut down.
    #[error("job queue is closed")]
    Closed(Job),
}

impl SubmitError {
    /// Recover the rejected job.
    pub fn into_job(self) -> Job {
        match self {
            SubmitError::Full(job) | SubmitError::Closed(job) => job,
        }
    }

    /// Returns `true` if the pool no longer accepts jobs.
    pub fn is_closed(&self) -> bool {
        matches!(self, SubmitError::Closed(_))
    }
}

/// Clonable handle used by job sources to enqueue work.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::Sender<Job>,
}

impl JobSender {
    pub(crate) fn new(tx: mpsc::Sender<Job>) -> Self {
        Self { tx }
    }

    /// Enqueue a job, waiting for capacity when the queue is full.
    pub async fn submit(&self, job: Job) -> Result<(), SubmitError> {
        self.tx
            .send(job)
            .await
            .map_err(|mpsc::error::SendError(job)| SubmitError::Closed(job))
    }

    /// Enqueue a job without waiting.
    pub fn try_submit(&self, job: Job) -> Result<(), SubmitError> {
        self.tx.try_send(job).map_err(|err| match err {
            mpsc::error::TrySendError::Full(job) => SubmitError::Full(job),
            mpsc::error::TrySendError::Closed(job) => SubmitError::Closed(job),
        })
    }

    /// Returns `true` once the pool has shut down.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots in the queue right now.
    pub fn capacity(&self) -> usize {
        self.tx.capacity()
    }
}
