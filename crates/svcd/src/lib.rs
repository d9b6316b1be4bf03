//! # svcd
//!
//! A small in-process service daemon. Services declare which other services they depend on
//! and which event types they care about; the daemon works out a start order, initializes
//! them in that order, delivers events between them over a concurrent bus, and shuts them
//! down in reverse.
//!
//! ## Architecture Overview
//!
//! 1. **Contract** ([`Service`]) - identity, dependencies, subscriptions, lifecycle hooks
//! 2. **Wiring** ([`DaemonBuilder`], [`graph`]) - registration and dependency solving
//! 3. **Runtime** ([`Daemon`]) - the run-loop, the event router and one delivery worker per
//!    event type
//! 4. **Interface** ([`ServiceHandle`]) - what a service uses to emit events
//!
//! ## Concurrency Model
//!
//! - Each service lives in its own Tokio task and runs its hooks one at a time
//! - Events of one type are delivered in emission order, to subscribers in dependency order
//! - Different event types are delivered concurrently
//! - Every queue is bounded; emitting waits for room rather than dropping events
//! - No shared mutable state between tasks, only channels
//!
//! ## Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use svcd::{DaemonBuilder, Event, EventType, Service, ServiceError, ServiceHandle, ServiceId};
//!
//! const PING: EventType = EventType::from_static("ping");
//!
//! struct Pinger;
//! struct Listener { seen: u64 }
//!
//! #[async_trait]
//! impl Service for Pinger {
//!     fn id(&self) -> ServiceId { ServiceId(1) }
//!     async fn init(&mut self, handle: ServiceHandle) -> Result<(), ServiceError> {
//!         handle.emit(PING, 42u64).await?;
//!         Ok(())
//!     }
//!     async fn handle_event(&mut self, _: &Event) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! #[async_trait]
//! impl Service for Listener {
//!     fn id(&self) -> ServiceId { ServiceId(2) }
//!     fn dependencies(&self) -> Vec<ServiceId> { vec![ServiceId(1)] }
//!     fn subscriptions(&self) -> Vec<EventType> { vec![PING] }
//!     async fn init(&mut self, _: ServiceHandle) -> Result<(), ServiceError> { Ok(()) }
//!     async fn handle_event(&mut self, event: &Event) -> Result<(), ServiceError> {
//!         self.seen += event.data::<u64>().copied().unwrap_or_default();
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut builder = DaemonBuilder::new();
//!     builder.register(Listener { seen: 0 }).register(Pinger);
//!
//!     let mut daemon = builder.start().unwrap();
//!     assert_eq!(daemon.order(), &[ServiceId(1), ServiceId(2)]);
//!
//!     daemon.running().await.unwrap();
//!     let report = daemon.shutdown().await.unwrap();
//!     assert!(report.failures.is_empty());
//! }
//! ```
//!
//! ## Testing
//!
//! The [`mock`] module has a [`RecordingService`](mock::RecordingService) and a shared
//! [`Journal`](mock::Journal) for asserting lifecycle and delivery order.

pub mod builder;
pub mod config;
pub mod daemon;
pub mod error;
pub mod event;
pub mod graph;
pub mod handle;
pub mod mock;
pub mod service;
pub mod telemetry;

mod actor;
mod bus;
mod client;
mod message;

pub use builder::DaemonBuilder;
pub use config::{DaemonConfig, ErrorPolicy};
pub use daemon::{Daemon, DaemonReport, DaemonState, Hook, ServiceFailure};
pub use error::{ConfigError, DaemonError, EmitError, HookError, ServiceError};
pub use event::Event;
pub use handle::ServiceHandle;
pub use service::{EventType, Service, ServiceId, ServiceState};
