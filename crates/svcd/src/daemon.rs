//! # Daemon Run-Loop
//!
//! [`Daemon`] is the caller's handle to a started system; the work happens in a run-loop task
//! spawned by [`DaemonBuilder::start`](crate::DaemonBuilder::start).
//!
//! ## Lifecycle
//!
//! ```text
//! Initializing ──► Running ──► ShuttingDown ──► Stopped
//!       │                           ▲
//!       └───── escalated failure ───┘
//! ```
//!
//! 1. **Initializing**: service actors, delivery workers and the (held) router are spawned,
//!    then `init` runs on each service in dependency order, one at a time.
//! 2. **Running**: the router is opened and events flow. The loop waits for a shutdown
//!    request, for the `Daemon` to be dropped, or for an escalated failure.
//! 3. **ShuttingDown**: `shutdown` runs on each service in reverse dependency order, one at a
//!    time. The inbound channel is then closed, the router and workers drain, and every task
//!    is joined.
//! 4. **Stopped**: the [`DaemonReport`] is handed back to [`Daemon::shutdown`].
//!
//! ## Failures
//! A hook that errors, times out or panics becomes a [`ServiceFailure`]. Failures are logged
//! and collected; under [`ErrorPolicy::Escalate`] the first one also starts the shutdown.

use crate::actor::ServiceActor;
use crate::builder::Registration;
use crate::bus::{DeliveryWorker, Router, RouterPhase, RouterStats};
use crate::client::ServiceClient;
use crate::config::{DaemonConfig, ErrorPolicy};
use crate::error::{DaemonError, HookError};
use crate::event::Envelope;
use crate::service::{EventType, ServiceId};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Initializing,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for DaemonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DaemonState::Initializing => "initializing",
            DaemonState::Running => "running",
            DaemonState::ShuttingDown => "shutting down",
            DaemonState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// The hook a failure happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hook {
    Init,
    HandleEvent(EventType),
    Shutdown,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hook::Init => f.write_str("init"),
            Hook::HandleEvent(ty) => write!(f, "handle_event({ty})"),
            Hook::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// One hook call that did not complete successfully.
#[derive(Debug)]
pub struct ServiceFailure {
    pub service: ServiceId,
    pub name: String,
    pub hook: Hook,
    pub error: HookError,
}

/// What happened over a daemon's lifetime.
#[derive(Debug, Default)]
pub struct DaemonReport {
    /// Solved dependency order.
    pub order: Vec<ServiceId>,
    /// The most recent failures, oldest first, at most
    /// [`DaemonConfig::failure_history`] of them.
    pub failures: VecDeque<ServiceFailure>,
    /// Every failure observed, including those no longer kept in `failures`.
    pub failure_count: u64,
    /// Events handed to a delivery worker.
    pub routed: u64,
    /// Events dropped because nobody subscribed to their type.
    pub unrouted: u64,
    /// Whether a failure triggered the shutdown under [`ErrorPolicy::Escalate`].
    pub escalated: bool,
}

impl DaemonReport {
    fn record(&mut self, failure: ServiceFailure, keep: usize) {
        warn!(
            service = %failure.service,
            name = %failure.name,
            hook = %failure.hook,
            error = %failure.error,
            "Service failure"
        );
        self.failure_count += 1;
        if self.failures.len() == keep {
            self.failures.pop_front();
        }
        self.failures.push_back(failure);
    }
}

/// Handle to a started daemon.
///
/// Dropping it without calling [`Daemon::shutdown`] still shuts the services down, in the
/// background.
pub struct Daemon {
    order: Vec<ServiceId>,
    state: watch::Receiver<DaemonState>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<DaemonReport>>,
}

impl fmt::Debug for Daemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Daemon")
            .field("order", &self.order)
            .field("state", &self.state())
            .finish()
    }
}

impl Daemon {
    pub(crate) fn spawn(runtime: Runtime) -> Self {
        let order = runtime.order.clone();
        let (state_tx, state) = watch::channel(DaemonState::Initializing);
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(runtime.run(state_tx, stop_rx));
        Self {
            order,
            state,
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Services in dependency order, roots first.
    pub fn order(&self) -> &[ServiceId] {
        &self.order
    }

    pub fn state(&self) -> DaemonState {
        *self.state.borrow()
    }

    /// Waits until every service has been initialized.
    ///
    /// Fails with [`DaemonError::NotRunning`] if the daemon went straight to shutting down.
    pub async fn running(&self) -> Result<(), DaemonError> {
        let state = self.settled(|s| s != DaemonState::Initializing).await;
        match state {
            DaemonState::Running => Ok(()),
            other => Err(DaemonError::NotRunning(other)),
        }
    }

    /// Waits until the daemon has stopped, whatever the reason.
    pub async fn stopped(&self) {
        self.settled(|s| s == DaemonState::Stopped).await;
    }

    async fn settled(&self, done: impl Fn(DaemonState) -> bool) -> DaemonState {
        let mut state = self.state.clone();
        // Err: run-loop gone, and it only exits after publishing `Stopped`.
        state
            .wait_for(|s| done(*s))
            .await
            .map(|s| *s)
            .unwrap_or(DaemonState::Stopped)
    }

    /// Shuts every service down in reverse dependency order and drains the bus.
    ///
    /// Returns the report on the first call and [`DaemonError::AlreadyStopped`] afterwards.
    pub async fn shutdown(&mut self) -> Result<DaemonReport, DaemonError> {
        let task = self.task.take().ok_or(DaemonError::AlreadyStopped)?;
        if let Some(stop) = self.stop.take() {
            // Err: the loop already left on its own (escalation).
            let _ = stop.send(());
        }
        task.await.map_err(|e| DaemonError::Panicked(e.to_string()))
    }
}

/// Everything the run-loop owns, assembled by the builder.
pub(crate) struct Runtime {
    pub config: DaemonConfig,
    pub order: Vec<ServiceId>,
    /// In `order` order.
    pub registrations: Vec<Registration>,
    pub subscribers: BTreeMap<EventType, Vec<ServiceId>>,
    pub inbound: mpsc::Receiver<Envelope>,
}

impl Runtime {
    async fn run(
        self,
        state: watch::Sender<DaemonState>,
        mut stop: oneshot::Receiver<()>,
    ) -> DaemonReport {
        let Runtime {
            config,
            order,
            registrations,
            subscribers,
            inbound,
        } = self;
        let escalate = config.error_policy == ErrorPolicy::Escalate;
        let keep = config.failure_history_slots();
        let mut report = DaemonReport {
            order,
            ..DaemonReport::default()
        };

        // Service actors
        let mut by_id: HashMap<ServiceId, ServiceClient> = HashMap::new();
        let mut lifecycle = Vec::with_capacity(registrations.len());
        let mut actors = Vec::with_capacity(registrations.len());
        for Registration { service, handle } in registrations {
            let (actor, client) =
                ServiceActor::new(service, config.mailbox_slots(), config.hook_timeout);
            actors.push(tokio::spawn(actor.run()));
            by_id.insert(client.id(), client.clone());
            lifecycle.push((client, handle));
        }

        // Delivery workers and the router, held until initialization is over.
        // Failures travel unbounded: a worker must never wait on this loop, which stops
        // reading them while it runs `shutdown` hooks. `keep` bounds what is retained.
        let (failure_tx, mut failures) = mpsc::unbounded_channel();
        let mut routes = HashMap::with_capacity(subscribers.len());
        let mut workers = Vec::with_capacity(subscribers.len());
        for (event_type, ids) in subscribers {
            let (queue_tx, queue_rx) = mpsc::channel(config.worker_slots());
            let subs = ids.iter().filter_map(|id| by_id.get(id).cloned()).collect();
            let worker = DeliveryWorker::new(event_type.clone(), queue_rx, subs, failure_tx.clone());
            workers.push(tokio::spawn(worker.run()));
            routes.insert(event_type, queue_tx);
        }
        drop(by_id);
        let (phase, phase_rx) = watch::channel(RouterPhase::Held);
        let router = tokio::spawn(Router::new(inbound, routes, phase_rx).run());

        info!(services = lifecycle.len(), workers = workers.len(), "Initializing services");
        let mut clients = Vec::with_capacity(lifecycle.len());
        for (client, handle) in lifecycle {
            if !report.escalated {
                if let Err(error) = client.init(handle).await {
                    if error.is_failure() {
                        report.record(failure(&client, Hook::Init, error), keep);
                        report.escalated = escalate;
                    }
                }
            }
            clients.push(client);
        }

        if !report.escalated {
            let _ = state.send(DaemonState::Running);
            let _ = phase.send(RouterPhase::Open);
            info!("Daemon running");

            loop {
                tokio::select! {
                    _ = &mut stop => {
                        debug!("Shutdown requested");
                        break;
                    }
                    Some(f) = failures.recv() => {
                        report.record(f, keep);
                        if escalate {
                            report.escalated = true;
                            break;
                        }
                    }
                }
            }
        }

        let _ = state.send(DaemonState::ShuttingDown);
        info!(escalated = report.escalated, "Shutting down services");
        for client in clients.iter().rev() {
            if let Err(error) = client.shutdown().await {
                if error.is_failure() {
                    report.record(failure(client, Hook::Shutdown, error), keep);
                }
            }
        }

        let _ = phase.send(RouterPhase::Closing);
        match router.await {
            Ok(RouterStats { routed, unrouted }) => {
                report.routed = routed;
                report.unrouted = unrouted;
            }
            Err(e) => warn!(error = %e, "Router task failed"),
        }
        drop(failure_tx);
        for worker in workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Delivery worker failed");
            }
        }
        while let Ok(f) = failures.try_recv() {
            report.record(f, keep);
        }

        drop(clients);
        for actor in actors {
            join_actor(actor, &config).await;
        }

        let _ = state.send(DaemonState::Stopped);
        info!(
            failures = report.failure_count,
            routed = report.routed,
            unrouted = report.unrouted,
            "Daemon stopped"
        );
        report
    }
}

fn failure(client: &ServiceClient, hook: Hook, error: HookError) -> ServiceFailure {
    ServiceFailure {
        service: client.id(),
        name: client.name().to_string(),
        hook,
        error,
    }
}

/// Joins a service actor. With a hook timeout configured, an actor still stuck in a hook
/// after one more timeout is aborted instead of holding up the stop.
async fn join_actor(mut actor: JoinHandle<()>, config: &DaemonConfig) {
    let result = match config.hook_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut actor).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Service actor stuck in a hook, aborting");
                actor.abort();
                return;
            }
        },
        None => actor.await,
    };
    if let Err(e) = result {
        if e.is_panic() {
            debug!(error = %e, "Service actor had panicked");
        }
    }
}
