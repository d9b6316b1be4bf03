//! # Events
//!
//! [`Event`] is the value carried over the bus, and [`Envelope`] is what actually travels
//! through the inbound channel and the per-type delivery queues.

use crate::service::{EventType, ServiceId};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An immutable event emitted by a service.
///
/// Cloning is cheap: the payload sits behind an `Arc` and is shared by every subscriber.
#[derive(Clone)]
pub struct Event {
    source: ServiceId,
    event_type: EventType,
    data: Arc<dyn Any + Send + Sync>,
}

impl Event {
    pub(crate) fn new(
        source: ServiceId,
        event_type: EventType,
        data: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            source,
            event_type,
            data,
        }
    }

    /// The service that emitted this event.
    pub fn source(&self) -> ServiceId {
        self.source
    }

    pub fn event_type(&self) -> &EventType {
        &self.event_type
    }

    /// The payload, if it is a `T`.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// The untyped payload.
    pub fn raw_data(&self) -> &(dyn Any + Send + Sync) {
        &*self.data
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("source", &self.source)
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Internal message routed from the handles to the delivery workers.
///
/// Control requests share the event path so they stay ordered with the events a service
/// emitted before them.
#[derive(Debug, Clone)]
pub(crate) enum Envelope {
    Event(Event),
    Unregister(ServiceId),
}
