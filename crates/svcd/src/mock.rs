//! # Test Doubles
//!
//! [`RecordingService`] is a configurable [`Service`] that writes every hook call into a
//! shared [`Journal`]. Tests register a handful of them, drive the daemon, and assert on the
//! journal instead of hand-writing a service per scenario.
//!
//! ## When to use what
//!
//! | Need | Use |
//! |------|-----|
//! | Lifecycle order (`init`/`shutdown`) | [`Journal::inits`], [`Journal::shutdowns`] |
//! | Delivery order of one event type | [`Journal::deliveries`] |
//! | Emitting as a given service | [`Journal::handle`] (stored at `init`) |
//! | A slow, failing, stuck or panicking service | [`RecordingService::with_handler_delay`], [`RecordingService::with_fault`] |
//!
//! ## Example
//!
//! ```rust
//! use svcd::mock::{Journal, RecordingService};
//! use svcd::{DaemonBuilder, ServiceId};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let journal = Journal::new();
//!     let mut builder = DaemonBuilder::new();
//!     builder
//!         .register(RecordingService::new(1, &journal).depends_on([0]).subscribes_to(["X"]))
//!         .register(RecordingService::new(0, &journal).subscribes_to(["X"]));
//!
//!     let mut daemon = builder.start().unwrap();
//!     daemon.running().await.unwrap();
//!
//!     journal.handle(ServiceId(1)).unwrap().emit("X", 7u64).await.unwrap();
//!     assert!(journal.wait_for_deliveries("X", 2, Duration::from_secs(5)).await);
//!     assert_eq!(
//!         journal.deliveries("X"),
//!         vec![(ServiceId(0), Some(7)), (ServiceId(1), Some(7))]
//!     );
//!
//!     daemon.shutdown().await.unwrap();
//!     assert_eq!(journal.shutdowns(), vec![ServiceId(1), ServiceId(0)]);
//! }
//! ```

use crate::error::ServiceError;
use crate::event::Event;
use crate::handle::ServiceHandle;
use crate::service::{EventType, Service, ServiceId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// One recorded hook call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Init(ServiceId),
    Event {
        service: ServiceId,
        source: ServiceId,
        event_type: EventType,
        /// Payload, when it is a `u64`.
        seq: Option<u64>,
    },
    Shutdown(ServiceId),
}

/// Shared, ordered record of hook calls across services.
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
    handles: Arc<Mutex<HashMap<ServiceId, ServiceHandle>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: JournalEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Services in the order their `init` was called.
    pub fn inits(&self) -> Vec<ServiceId> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                JournalEntry::Init(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Services in the order their `shutdown` was called.
    pub fn shutdowns(&self) -> Vec<ServiceId> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                JournalEntry::Shutdown(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// `(receiver, seq)` for every handled event of `event_type`, in handling order.
    pub fn deliveries(&self, event_type: &str) -> Vec<(ServiceId, Option<u64>)> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                JournalEntry::Event {
                    service,
                    event_type: ty,
                    seq,
                    ..
                } if ty.as_str() == event_type => Some((service, seq)),
                _ => None,
            })
            .collect()
    }

    /// Sequence numbers `service` handled for `event_type`, in handling order.
    pub fn received_by(&self, service: ServiceId, event_type: &str) -> Vec<Option<u64>> {
        self.deliveries(event_type)
            .into_iter()
            .filter(|(id, _)| *id == service)
            .map(|(_, seq)| seq)
            .collect()
    }

    /// The handle `service` received in `init`.
    pub fn handle(&self, service: ServiceId) -> Option<ServiceHandle> {
        self.handles.lock().unwrap().get(&service).cloned()
    }

    /// Polls until at least `count` deliveries of `event_type` are recorded.
    pub async fn wait_for_deliveries(
        &self,
        event_type: &str,
        count: usize,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.deliveries(event_type).len() >= count {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

/// Misbehavior a [`RecordingService`] can be told to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `init` returns an error.
    FailInit,
    /// Every `handle_event` returns an error (after being recorded).
    FailEvents,
    /// `shutdown` returns an error (after being recorded).
    FailShutdown,
    /// `handle_event` never returns.
    StallEvents,
    /// `handle_event` panics.
    PanicOnEvent,
}

#[derive(Debug, thiserror::Error)]
#[error("injected {0:?}")]
struct InjectedFault(Fault);

/// A [`Service`] that records every hook call in a [`Journal`].
pub struct RecordingService {
    id: ServiceId,
    dependencies: Vec<ServiceId>,
    subscriptions: Vec<EventType>,
    journal: Journal,
    delay: Option<Duration>,
    fault: Option<Fault>,
    init_emits: Option<(EventType, u64)>,
}

impl RecordingService {
    pub fn new(id: i64, journal: &Journal) -> Self {
        Self {
            id: ServiceId(id),
            dependencies: Vec::new(),
            subscriptions: Vec::new(),
            journal: journal.clone(),
            delay: None,
            fault: None,
            init_emits: None,
        }
    }

    pub fn depends_on(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.dependencies.extend(ids.into_iter().map(ServiceId));
        self
    }

    pub fn subscribes_to<T: Into<EventType>>(mut self, types: impl IntoIterator<Item = T>) -> Self {
        self.subscriptions.extend(types.into_iter().map(Into::into));
        self
    }

    /// Sleeps this long inside every `handle_event`.
    pub fn with_handler_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Emits `count` events of `event_type` (payloads `0..count`) from inside `init`.
    pub fn emitting_on_init(mut self, event_type: impl Into<EventType>, count: u64) -> Self {
        self.init_emits = Some((event_type.into(), count));
        self
    }

    fn fails_with(&self, fault: Fault) -> Result<(), ServiceError> {
        if self.fault == Some(fault) {
            return Err(Box::new(InjectedFault(fault)));
        }
        Ok(())
    }
}

#[async_trait]
impl Service for RecordingService {
    fn id(&self) -> ServiceId {
        self.id
    }

    fn name(&self) -> String {
        format!("recording-{}", self.id)
    }

    fn dependencies(&self) -> Vec<ServiceId> {
        self.dependencies.clone()
    }

    fn subscriptions(&self) -> Vec<EventType> {
        self.subscriptions.clone()
    }

    async fn init(&mut self, handle: ServiceHandle) -> Result<(), ServiceError> {
        self.journal.push(JournalEntry::Init(self.id));
        self.journal
            .handles
            .lock()
            .unwrap()
            .insert(self.id, handle.clone());
        self.fails_with(Fault::FailInit)?;
        if let Some((event_type, count)) = &self.init_emits {
            for seq in 0..*count {
                handle.emit(event_type.clone(), seq).await?;
            }
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: &Event) -> Result<(), ServiceError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match self.fault {
            Some(Fault::StallEvents) => std::future::pending::<()>().await,
            Some(Fault::PanicOnEvent) => panic!("recording-{} panicked on purpose", self.id),
            _ => {}
        }
        self.journal.push(JournalEntry::Event {
            service: self.id,
            source: event.source(),
            event_type: event.event_type().clone(),
            seq: event.data::<u64>().copied(),
        });
        self.fails_with(Fault::FailEvents)
    }

    async fn shutdown(&mut self) -> Result<(), ServiceError> {
        self.journal.push(JournalEntry::Shutdown(self.id));
        self.fails_with(Fault::FailShutdown)
    }
}
