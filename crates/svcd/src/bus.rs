//! # Event Bus
//!
//! The moving parts between the handles and the services:
//!
//! ```text
//! Handles (many):            Router (one):          Delivery workers (one per type):
//!   svc 0 ──┐                                        ┌──► "A" ──► S1, S3, ...
//!   svc 1 ──┼──► inbound ──► forward by type ────────┤
//!   svc N ──┘   (bounded)                            └──► "B" ──► S2, ...
//! ```
//!
//! ## Rules
//! - **Backpressure, not loss**: every queue is bounded and every send waits for room.
//! - **Per-type order**: a worker hands one event to all its subscribers, in dependency
//!   order, before it takes the next one.
//! - **No cross-type order**: workers run independently.
//! - **Held until ready**: before the daemon finishes initialization the router keeps
//!   reading the inbound channel but stages what it reads, so emits from `init` never block
//!   and no service sees an event early. Staged events are forwarded in arrival order once
//!   the router opens.
//! - **Drain on close**: once closed, the router forwards what is already buffered and then
//!   drops the worker queues, which lets each worker finish its backlog and exit.

use crate::client::ServiceClient;
use crate::daemon::{Hook, ServiceFailure};
use crate::event::Envelope;
use crate::service::EventType;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Router gate, driven by the daemon run-loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RouterPhase {
    Held,
    Open,
    Closing,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RouterStats {
    pub routed: u64,
    pub unrouted: u64,
}

/// Reads the shared inbound channel and forwards each envelope to the right worker.
pub(crate) struct Router {
    inbound: mpsc::Receiver<Envelope>,
    routes: HashMap<EventType, mpsc::Sender<Envelope>>,
    phase: watch::Receiver<RouterPhase>,
    stats: RouterStats,
}

impl Router {
    pub(crate) fn new(
        inbound: mpsc::Receiver<Envelope>,
        routes: HashMap<EventType, mpsc::Sender<Envelope>>,
        phase: watch::Receiver<RouterPhase>,
    ) -> Self {
        Self {
            inbound,
            routes,
            phase,
            stats: RouterStats::default(),
        }
    }

    pub(crate) async fn run(self) -> RouterStats {
        let Router {
            mut inbound,
            routes,
            mut phase,
            mut stats,
        } = self;

        // Held: keep reading so emits from `init` never wait on a full channel, but keep
        // everything back from the workers until the phase moves on.
        let mut staged = VecDeque::new();
        let mut inbound_open = true;
        loop {
            tokio::select! {
                biased;
                // An Err here means the daemon is gone; fall through and drain.
                _ = async { let _ = phase.wait_for(|p| *p != RouterPhase::Held).await; } => break,
                msg = inbound.recv(), if inbound_open => match msg {
                    Some(envelope) => staged.push_back(envelope),
                    None => inbound_open = false,
                },
            }
        }

        debug!(routes = routes.len(), staged = staged.len(), "Router open");
        while let Some(envelope) = staged.pop_front() {
            forward(&routes, &mut stats, envelope).await;
        }

        let mut closing = false;
        loop {
            tokio::select! {
                biased;
                _ = async { let _ = phase.wait_for(|p| *p == RouterPhase::Closing).await; }, if !closing => {
                    closing = true;
                    inbound.close();
                    debug!("Inbound channel closed, draining");
                }
                msg = inbound.recv() => match msg {
                    Some(envelope) => forward(&routes, &mut stats, envelope).await,
                    None => break,
                },
            }
        }

        debug!(routed = stats.routed, unrouted = stats.unrouted, "Router stopped");
        stats
    }
}

async fn forward(
    routes: &HashMap<EventType, mpsc::Sender<Envelope>>,
    stats: &mut RouterStats,
    envelope: Envelope,
) {
    match envelope {
        Envelope::Event(event) => match routes.get(event.event_type()) {
            Some(queue) => {
                let event_type = event.event_type().clone();
                if queue.send(Envelope::Event(event)).await.is_err() {
                    warn!(%event_type, "Delivery worker gone, event lost");
                } else {
                    stats.routed += 1;
                }
            }
            None => {
                debug!(event_type = %event.event_type(), source = %event.source(), "No subscribers, event dropped");
                stats.unrouted += 1;
            }
        },
        Envelope::Unregister(id) => {
            for queue in routes.values() {
                let _ = queue.send(Envelope::Unregister(id)).await;
            }
        }
    }
}

/// Delivers every event of one type to its subscribers, one event at a time.
pub(crate) struct DeliveryWorker {
    event_type: EventType,
    queue: mpsc::Receiver<Envelope>,
    subscribers: Vec<ServiceClient>,
    failures: mpsc::UnboundedSender<ServiceFailure>,
}

impl DeliveryWorker {
    pub(crate) fn new(
        event_type: EventType,
        queue: mpsc::Receiver<Envelope>,
        subscribers: Vec<ServiceClient>,
        failures: mpsc::UnboundedSender<ServiceFailure>,
    ) -> Self {
        Self {
            event_type,
            queue,
            subscribers,
            failures,
        }
    }

    pub(crate) async fn run(mut self) {
        debug!(event_type = %self.event_type, subscribers = self.subscribers.len(), "Delivery worker started");

        while let Some(envelope) = self.queue.recv().await {
            match envelope {
                Envelope::Event(event) => {
                    for subscriber in &self.subscribers {
                        match subscriber.deliver(event.clone()).await {
                            Ok(()) => {}
                            Err(e) if !e.is_failure() => {}
                            Err(error) => {
                                let _ = self.failures.send(ServiceFailure {
                                    service: subscriber.id(),
                                    name: subscriber.name().to_string(),
                                    hook: Hook::HandleEvent(self.event_type.clone()),
                                    error,
                                });
                            }
                        }
                    }
                }
                Envelope::Unregister(id) => {
                    let before = self.subscribers.len();
                    self.subscribers.retain(|s| s.id() != id);
                    if self.subscribers.len() != before {
                        debug!(event_type = %self.event_type, service = %id, "Unsubscribed");
                    }
                }
            }
        }

        debug!(event_type = %self.event_type, "Delivery worker stopped");
    }
}
