//! # Service Handle
//!
//! The handle a service receives in [`Service::init`](crate::Service::init). It is the
//! "client" half of the bus: it wraps the sender of the shared inbound channel and stamps
//! every event with the owning service's id.

use crate::error::EmitError;
use crate::event::{Envelope, Event};
use crate::service::{EventType, ServiceId};
use std::any::Any;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Emits events on behalf of one service.
///
/// Cheap to clone; clones can be moved into background tasks and used concurrently.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    id: ServiceId,
    sender: mpsc::Sender<Envelope>,
}

impl ServiceHandle {
    pub(crate) fn new(id: ServiceId, sender: mpsc::Sender<Envelope>) -> Self {
        Self { id, sender }
    }

    /// Id of the service this handle belongs to.
    pub fn id(&self) -> ServiceId {
        self.id
    }

    /// Publishes an event, waiting for room if the bus is at capacity.
    ///
    /// Fails with [`EmitError::Closed`] once the daemon has shut down.
    pub async fn emit<T>(&self, event_type: impl Into<EventType>, data: T) -> Result<(), EmitError>
    where
        T: Any + Send + Sync,
    {
        let event = self.event(event_type.into(), data);
        debug!(service = %self.id, event_type = %event.event_type(), "emit");
        self.sender
            .send(Envelope::Event(event))
            .await
            .map_err(|_| EmitError::Closed)
    }

    /// Publishes an event without waiting. Fails with [`EmitError::Full`] under backpressure.
    pub fn try_emit<T>(&self, event_type: impl Into<EventType>, data: T) -> Result<(), EmitError>
    where
        T: Any + Send + Sync,
    {
        let event = self.event(event_type.into(), data);
        self.sender
            .try_send(Envelope::Event(event))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EmitError::Full,
                mpsc::error::TrySendError::Closed(_) => EmitError::Closed,
            })
    }

    /// Stops delivery of further events to this service.
    ///
    /// Events already queued ahead of the request are still delivered. The service's
    /// `shutdown` hook still runs when the daemon stops.
    pub async fn unregister(&self) -> Result<(), EmitError> {
        debug!(service = %self.id, "unregister");
        self.sender
            .send(Envelope::Unregister(self.id))
            .await
            .map_err(|_| EmitError::Closed)
    }

    fn event<T: Any + Send + Sync>(&self, event_type: EventType, data: T) -> Event {
        Event::new(self.id, event_type, Arc::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_stamps_owner_id() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ServiceHandle::new(ServiceId(3), tx);

        handle.emit("X", 5u32).await.unwrap();

        match rx.recv().await {
            Some(Envelope::Event(ev)) => {
                assert_eq!(ev.source(), ServiceId(3));
                assert_eq!(ev.event_type().as_str(), "X");
                assert_eq!(ev.data::<u32>(), Some(&5));
            }
            other => panic!("unexpected envelope: {other:?}"),
        }
    }

    #[tokio::test]
    async fn try_emit_reports_full_then_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let handle = ServiceHandle::new(ServiceId(1), tx);

        handle.try_emit("X", ()).unwrap();
        assert_eq!(handle.try_emit("X", ()), Err(EmitError::Full));

        rx.close();
        assert_eq!(handle.emit("X", ()).await, Err(EmitError::Closed));
        assert_eq!(handle.unregister().await, Err(EmitError::Closed));
    }
}
