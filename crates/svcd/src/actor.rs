//! # Service Actor
//!
//! Every registered service is moved into a [`ServiceActor`] running on its own Tokio task.
//! The actor owns the service exclusively and runs one hook at a time, so a service that is
//! subscribed to several event types, or is being shut down while events are in flight,
//! never sees two hooks overlap and needs no locking of its own.
//!
//! The actor also enforces the lifecycle: events are only handed to a running service, and
//! nothing reaches a service after its `shutdown` hook.

use crate::client::ServiceClient;
use crate::error::HookError;
use crate::message::ServiceRequest;
use crate::service::{Service, ServiceState};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// The server half of a service: owns the `Box<dyn Service>` and the mailbox receiver.
///
/// # Architecture Note
/// Hooks run inside [`ServiceActor::run`] one request at a time, in mailbox order. The
/// delivery workers for every event type and the daemon's lifecycle calls all funnel into
/// the same mailbox, which is what serializes them.
///
/// | State | `Init` | `Event` | `Shutdown` |
/// |-------|--------|---------|------------|
/// | Registered | run, then Running or Failed | skipped | skipped |
/// | Running | skipped | run | run, then Stopped |
/// | Failed | skipped | skipped | run, then Stopped |
/// | Stopped | skipped | skipped | skipped |
///
/// A skipped request is answered with [`HookError::NotRunning`], which is not a failure.
///
/// # Usage Pattern
///
/// 1. **Create**: `ServiceActor::new` returns the actor and its [`ServiceClient`].
/// 2. **Run**: spawn [`ServiceActor::run`] on its own task.
/// 3. **Drive**: call `init`, `deliver` and `shutdown` on (clones of) the client.
/// 4. **Stop**: drop every client; `run` returns once the mailbox is closed and empty.
///
/// ```rust,ignore
/// let (actor, client) = ServiceActor::new(Box::new(service), 32, None);
/// let task = tokio::spawn(actor.run());
///
/// client.init(handle).await?;
/// client.deliver(event).await?;
/// client.shutdown().await?;
///
/// drop(client);
/// task.await?;
/// ```
pub(crate) struct ServiceActor {
    service: Box<dyn Service>,
    receiver: mpsc::Receiver<ServiceRequest>,
    state: ServiceState,
}

impl ServiceActor {
    /// Creates the actor and the client the daemon uses to drive it.
    ///
    /// `hook_timeout` bounds how long the client waits for any single request.
    pub(crate) fn new(
        service: Box<dyn Service>,
        buffer_size: usize,
        hook_timeout: Option<Duration>,
    ) -> (Self, ServiceClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let client = ServiceClient::new(service.id(), service.name(), sender, hook_timeout);
        let actor = Self {
            service,
            receiver,
            state: ServiceState::Registered,
        };
        (actor, client)
    }

    /// Processes requests until every client is dropped.
    pub(crate) async fn run(mut self) {
        let id = self.service.id();
        let name = self.service.name();
        debug!(service = %id, %name, "Service actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ServiceRequest::Init { handle, respond_to } => {
                    let result = match self.state {
                        ServiceState::Registered => match self.service.init(handle).await {
                            Ok(()) => {
                                self.state = ServiceState::Running;
                                info!(service = %id, %name, "Initialized");
                                Ok(())
                            }
                            Err(e) => {
                                self.state = ServiceState::Failed;
                                Err(HookError::Service(e))
                            }
                        },
                        other => Err(HookError::NotRunning(other)),
                    };
                    let _ = respond_to.send(result);
                }
                ServiceRequest::Event { event, respond_to } => {
                    let result = match self.state {
                        ServiceState::Running => self
                            .service
                            .handle_event(&event)
                            .await
                            .map_err(HookError::Service),
                        other => {
                            debug!(service = %id, event_type = %event.event_type(), state = %other, "Event skipped");
                            Err(HookError::NotRunning(other))
                        }
                    };
                    let _ = respond_to.send(result);
                }
                ServiceRequest::Shutdown { respond_to } => {
                    let result = match self.state {
                        ServiceState::Running | ServiceState::Failed => {
                            self.state = ServiceState::Stopped;
                            let result = self.service.shutdown().await.map_err(HookError::Service);
                            info!(service = %id, %name, "Shut down");
                            result
                        }
                        other => Err(HookError::NotRunning(other)),
                    };
                    let _ = respond_to.send(result);
                }
            }
        }

        debug!(service = %id, %name, state = %self.state, "Service actor stopped");
    }
}
