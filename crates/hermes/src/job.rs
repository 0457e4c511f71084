//! Jobs delivered by a job source into the worker pool.

use std::fmt;

use bytes::Bytes;

use crate::relay::{EventId, RelayId};

/// Acknowledge callback supplied by the job source.
///
/// `true` commits consumption of the originating message; `false` leaves
/// redelivery to the source's discretion. The callback is consumed when
/// called, so it runs at most once.
pub struct Ack(Box<dyn FnOnce(bool) + Send + Sync + 'static>);

impl Ack {
    /// Wrap a callback.
    pub fn new(callback: impl FnOnce(bool) + Send + Sync + 'static) -> Self {
        Self(Box::new(callback))
    }

    /// An acknowledgement that does nothing.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    /// Invoke the callback with the job's outcome.
    pub fn send(self, success: bool) {
        (self.0)(success)
    }
}

impl fmt::Debug for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ack(..)")
    }
}

/// The event half of a job: what the execution protocol works on.
#[derive(Debug, Clone)]
pub struct RelayEvent {
    pub relay_id: RelayId,
    pub event_id: EventId,
    /// Raw webhook body, passed through to executors untouched.
    pub payload: Bytes,
}

/// Unit of work dequeued by a worker.
///
/// Owned exclusively by the worker that receives it; the worker splits it
/// into its [`RelayEvent`] and [`Ack`] and calls the ack exactly once after
/// processing.
#[derive(Debug)]
pub struct Job {
    event: RelayEvent,
    ack: Ack,
}

impl Job {
    /// Create a job with its acknowledge callback.
    pub fn new(
        relay_id: impl Into<RelayId>,
        event_id: impl Into<EventId>,
        payload: impl Into<Bytes>,
        ack: impl FnOnce(bool) + Send + Sync + 'static,
    ) -> Self {
        Self {
            event: RelayEvent {
                relay_id: relay_id.into(),
                event_id: event_id.into(),
                payload: payload.into(),
            },
            ack: Ack::new(ack),
        }
    }

    /// The event carried by this job.
    pub fn event(&self) -> &RelayEvent {
        &self.event
    }

    pub fn relay_id(&self) -> &RelayId {
        &self.event.relay_id
    }

    pub fn event_id(&self) -> &EventId {
        &self.event.event_id
    }

    /// Split the job into its event and acknowledge callback.
    pub fn into_parts(self) -> (RelayEvent, Ack) {
        (self.event, self.ack)
    }

    /// Acknowledge the job without processing it.
    ///
    /// Used by job sources to nack jobs the pool rejected.
    pub fn acknowledge(self, success: bool) {
        self.ack.send(success);
    }
}
