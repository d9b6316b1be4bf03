//! # Daemon Builder
//!
//! Collects services before anything runs. The builder owns the not-yet-running inbound
//! channel and hands each registered service a [`ServiceHandle`] bound to it.
//!
//! ```rust
//! use svcd::{DaemonBuilder, Event, Service, ServiceError, ServiceHandle, ServiceId};
//! use async_trait::async_trait;
//!
//! struct Clock;
//!
//! #[async_trait]
//! impl Service for Clock {
//!     fn id(&self) -> ServiceId { ServiceId(0) }
//!     async fn init(&mut self, handle: ServiceHandle) -> Result<(), ServiceError> {
//!         handle.emit("tick", 1u64).await?;
//!         Ok(())
//!     }
//!     async fn handle_event(&mut self, _: &Event) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut builder = DaemonBuilder::new();
//!     builder.register(Clock);
//!     let mut daemon = builder.start().expect("valid graph");
//!     daemon.running().await.unwrap();
//!     let report = daemon.shutdown().await.unwrap();
//!     assert_eq!(report.unrouted, 1); // nobody subscribed to "tick"
//! }
//! ```

use crate::config::DaemonConfig;
use crate::daemon::{Daemon, Runtime};
use crate::error::ConfigError;
use crate::event::Envelope;
use crate::graph::{self, ServiceNode};
use crate::handle::ServiceHandle;
use crate::service::{Service, ServiceId};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// A service paired with the handle created for it at registration.
pub(crate) struct Registration {
    pub service: Box<dyn Service>,
    pub handle: ServiceHandle,
}

/// Single-use builder: [`DaemonBuilder::start`] consumes it.
pub struct DaemonBuilder {
    config: DaemonConfig,
    registrations: Vec<Registration>,
    duplicates: Vec<ServiceId>,
    sender: mpsc::Sender<Envelope>,
    inbound: mpsc::Receiver<Envelope>,
}

impl Default for DaemonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DaemonBuilder {
    pub fn new() -> Self {
        Self::with_config(DaemonConfig::default())
    }

    pub fn with_config(config: DaemonConfig) -> Self {
        let (sender, inbound) = mpsc::channel(config.inbound_slots());
        Self {
            config,
            registrations: Vec::new(),
            duplicates: Vec::new(),
            sender,
            inbound,
        }
    }

    /// Registers a service.
    ///
    /// A second service with an id already taken is not stored; [`DaemonBuilder::start`]
    /// then fails with [`ConfigError::DuplicateService`].
    pub fn register(&mut self, service: impl Service) -> &mut Self {
        let id = service.id();
        if self.registrations.iter().any(|r| r.handle.id() == id) {
            warn!(service = %id, name = %service.name(), "Duplicate service id");
            self.duplicates.push(id);
            return self;
        }
        debug!(service = %id, name = %service.name(), "Registered");
        let handle = ServiceHandle::new(id, self.sender.clone());
        self.registrations.push(Registration {
            service: Box::new(service),
            handle,
        });
        self
    }

    /// Number of services registered so far.
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Solves the dependency graph and starts the daemon on the current Tokio runtime.
    ///
    /// Configuration errors are returned before any service is touched.
    ///
    /// # Panics
    /// Outside a Tokio runtime.
    pub fn start(self) -> Result<Daemon, ConfigError> {
        if let Some(&id) = self.duplicates.first() {
            return Err(ConfigError::DuplicateService(id));
        }

        let nodes: Vec<ServiceNode> = self
            .registrations
            .iter()
            .map(|r| ServiceNode {
                id: r.handle.id(),
                dependencies: r.service.dependencies(),
                subscriptions: r.service.subscriptions(),
            })
            .collect();
        let solution = graph::solve(&nodes)?;

        let order: Vec<String> = solution.order.iter().map(|id| id.to_string()).collect();
        info!(order = %order.join(" "), "Services in dependency order");

        let mut by_id: HashMap<ServiceId, Registration> = self
            .registrations
            .into_iter()
            .map(|r| (r.handle.id(), r))
            .collect();
        let registrations = solution
            .order
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();

        Ok(Daemon::spawn(Runtime {
            config: self.config,
            order: solution.order,
            registrations,
            subscribers: solution.subscribers,
            inbound: self.inbound,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::event::Event;
    use async_trait::async_trait;

    struct Bare(i64, Vec<i64>);

    #[async_trait]
    impl Service for Bare {
        fn id(&self) -> ServiceId {
            ServiceId(self.0)
        }
        fn dependencies(&self) -> Vec<ServiceId> {
            self.1.iter().copied().map(ServiceId).collect()
        }
        async fn init(&mut self, _: ServiceHandle) -> Result<(), ServiceError> {
            Ok(())
        }
        async fn handle_event(&mut self, _: &Event) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn duplicate_registration_fails_start() {
        let mut builder = DaemonBuilder::new();
        builder.register(Bare(1, vec![])).register(Bare(1, vec![]));
        assert_eq!(builder.len(), 1);
        assert_eq!(
            builder.start().err(),
            Some(ConfigError::DuplicateService(ServiceId(1)))
        );
    }

    #[tokio::test]
    async fn start_reports_solver_errors() {
        let mut builder = DaemonBuilder::new();
        builder.register(Bare(1, vec![2])).register(Bare(2, vec![1]));
        assert!(matches!(builder.start(), Err(ConfigError::Cycle(_))));

        let mut builder = DaemonBuilder::new();
        builder.register(Bare(0, vec![])).register(Bare(1, vec![9]));
        assert_eq!(
            builder.start().err(),
            Some(ConfigError::MissingDependency {
                service: ServiceId(1),
                missing: ServiceId(9),
            })
        );
    }

    #[tokio::test]
    async fn start_orders_services() {
        let mut builder = DaemonBuilder::new();
        builder
            .register(Bare(2, vec![0, 1]))
            .register(Bare(3, vec![2]))
            .register(Bare(0, vec![]))
            .register(Bare(1, vec![0]));
        let mut daemon = builder.start().unwrap();
        assert_eq!(
            daemon.order(),
            &[ServiceId(0), ServiceId(1), ServiceId(2), ServiceId(3)]
        );
        let report = daemon.shutdown().await.unwrap();
        assert!(report.failures.is_empty());
    }
}
