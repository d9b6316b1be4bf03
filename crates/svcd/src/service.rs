//! # Service Trait
//!
//! The [`Service`] trait is the contract every unit managed by the daemon implements: an
//! identity, the services it depends on, the event types it wants, and three lifecycle hooks.
//!
//! # Dependencies
//! If service B lists A in [`Service::dependencies`], then:
//! - A's `init` returns before B's `init` is called,
//! - if both subscribe to an event type, A handles each event of that type before B,
//! - B's `shutdown` returns before A's `shutdown` is called.
//!
//! # Provided Methods
//! Only [`Service::id`], [`Service::init`] and [`Service::handle_event`] are required. The
//! rest default to "no dependencies, no subscriptions, nothing to clean up".

use crate::error::ServiceError;
use crate::event::Event;
use crate::handle::ServiceHandle;
use async_trait::async_trait;
use std::borrow::Cow;
use std::fmt;

/// Globally unique identifier of a service, assigned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServiceId(pub i64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ServiceId {
    fn from(id: i64) -> Self {
        ServiceId(id)
    }
}

/// Routing tag of an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Tag usable in `const`/`static` position.
    pub const fn from_static(name: &'static str) -> Self {
        EventType(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        EventType(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        EventType::from_static(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        EventType::new(name)
    }
}

/// Where a service is in its own lifecycle, as seen by the actor that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Registered but `init` has not run.
    Registered,
    /// `init` succeeded; events are delivered.
    Running,
    /// `init` failed; events are skipped, `shutdown` still runs.
    Failed,
    /// `shutdown` has run; nothing more is delivered.
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Registered => "registered",
            ServiceState::Running => "running",
            ServiceState::Failed => "failed",
            ServiceState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A unit of work managed by the daemon.
///
/// # Concurrency
/// Each service is owned by a dedicated task that runs its hooks one at a time, so `&mut self`
/// is never contended: a service subscribed to several event types still sees its
/// `handle_event` calls strictly one after another. Hooks that take long block delivery of
/// their event type to every later subscriber; hand slow work to a background task instead.
///
/// # Emitting
/// The [`ServiceHandle`] passed to `init` is the only way to publish events. Keep a clone if
/// the service emits later or from a background task.
#[async_trait]
pub trait Service: Send + 'static {
    fn id(&self) -> ServiceId;

    /// Human readable name used in logs.
    fn name(&self) -> String {
        format!("service-{}", self.id())
    }

    /// Ids of the services that must be initialized before this one.
    fn dependencies(&self) -> Vec<ServiceId> {
        Vec::new()
    }

    /// Event types delivered to [`Service::handle_event`]. Read once, at start.
    fn subscriptions(&self) -> Vec<EventType> {
        Vec::new()
    }

    /// Called once, after every dependency's `init` has returned.
    async fn init(&mut self, handle: ServiceHandle) -> Result<(), ServiceError>;

    /// Called for every event of a subscribed type.
    async fn handle_event(&mut self, event: &Event) -> Result<(), ServiceError>;

    /// Called once during daemon shutdown, after every dependent's `shutdown` has returned.
    async fn shutdown(&mut self) -> Result<(), ServiceError> {
        Ok(())
    }
}
