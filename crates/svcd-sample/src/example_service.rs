//! # Example Service
//!
//! Every [`ExampleService`] subscribes to [`EX_SOME_EVENT`] and counts what it receives.
//! One marked as an event source also starts a background task in `init` that emits
//! [`SomeEvent`]s `0..10`, one per interval.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use svcd::{Event, EventType, Service, ServiceError, ServiceHandle, ServiceId};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub const EX_SOME_EVENT: EventType = EventType::from_static("ExSomeEvent");

/// Events a source emits before going quiet.
pub const SOURCE_EVENTS: u32 = 10;

/// Payload of [`EX_SOME_EVENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SomeEvent {
    pub n: u32,
}

pub struct ExampleService {
    id: ServiceId,
    dependencies: Vec<ServiceId>,
    event_source: bool,
    interval: Duration,
    received: Arc<AtomicUsize>,
    emitter: Option<JoinHandle<()>>,
}

impl ExampleService {
    pub fn new(id: i64, dependencies: impl IntoIterator<Item = i64>) -> Self {
        Self {
            id: ServiceId(id),
            dependencies: dependencies.into_iter().map(ServiceId).collect(),
            event_source: false,
            interval: Duration::from_millis(100),
            received: Arc::new(AtomicUsize::new(0)),
            emitter: None,
        }
    }

    /// Makes this service emit [`SomeEvent`]s once initialized.
    pub fn event_source(mut self) -> Self {
        self.event_source = true;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Shared counter of handled [`EX_SOME_EVENT`]s, readable after the service is moved
    /// into the daemon.
    pub fn received(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.received)
    }
}

async fn emit_some_events(handle: ServiceHandle, interval: Duration) {
    for n in 0..SOURCE_EVENTS {
        tokio::time::sleep(interval).await;
        if let Err(e) = handle.emit(EX_SOME_EVENT, SomeEvent { n }).await {
            debug!(service = %handle.id(), error = %e, "Event source stopped early");
            return;
        }
    }
}

#[async_trait]
impl Service for ExampleService {
    fn id(&self) -> ServiceId {
        self.id
    }

    fn name(&self) -> String {
        format!("ExService{}", self.id)
    }

    fn dependencies(&self) -> Vec<ServiceId> {
        self.dependencies.clone()
    }

    fn subscriptions(&self) -> Vec<EventType> {
        vec![EX_SOME_EVENT]
    }

    async fn init(&mut self, handle: ServiceHandle) -> Result<(), ServiceError> {
        info!(name = %self.name(), "Init");
        if self.event_source {
            self.emitter = Some(tokio::spawn(emit_some_events(handle, self.interval)));
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: &Event) -> Result<(), ServiceError> {
        let n = event.data::<SomeEvent>().map(|e| e.n);
        info!(
            name = %self.name(),
            from = %event.source(),
            event_type = %event.event_type(),
            n = ?n,
            "HandleEvent"
        );
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!(name = %self.name(), "Shutdown");
        if let Some(emitter) = self.emitter.take() {
            emitter.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_service_identity() {
        let svc = ExampleService::new(2, [0, 1]);
        assert_eq!(svc.id(), ServiceId(2));
        assert_eq!(svc.name(), "ExService2");
        assert_eq!(svc.dependencies(), vec![ServiceId(0), ServiceId(1)]);
        assert_eq!(svc.subscriptions(), vec![EX_SOME_EVENT]);
        assert!(!svc.event_source);
        assert!(ExampleService::new(3, [2]).event_source().event_source);
    }
}
