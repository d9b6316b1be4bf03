//! # Example System Lifecycle
//!
//! Wires the four example services into a daemon and runs them for a while.
//!
//! ```text
//!   0 ◄── 1
//!   ▲     ▲
//!   └──── 2 ◄── 3 (event source)
//! ```
//!
//! Registration order is deliberately scrambled (`2, 3, 0, 1`); the daemon still starts them
//! as `0, 1, 2, 3` and stops them as `3, 2, 1, 0`. Every service subscribes to
//! `ExSomeEvent`, so each of the ten events from service 3 reaches all four of them in
//! dependency order.
//!
//! ```bash
//! RUST_LOG=info cargo run -p svcd-sample
//! ```

use crate::error::SampleError;
use crate::example_service::ExampleService;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use svcd::{Daemon, DaemonBuilder, DaemonReport, ServiceId};
use tracing::info;

/// A started example daemon plus the receive counters of its services.
pub struct ExampleSystem {
    pub daemon: Daemon,
    received: BTreeMap<ServiceId, Arc<AtomicUsize>>,
}

/// Outcome of [`run_example`].
#[derive(Debug)]
pub struct ExampleRun {
    pub report: DaemonReport,
    /// Events each service handled.
    pub received: BTreeMap<ServiceId, usize>,
}

impl ExampleSystem {
    /// Registers and starts the example services; the source emits every `interval`.
    pub async fn start(interval: Duration) -> Result<Self, SampleError> {
        let services = [
            ExampleService::new(2, [0, 1]),
            ExampleService::new(3, [2]).event_source(),
            ExampleService::new(0, []),
            ExampleService::new(1, [0]),
        ];

        let mut builder = DaemonBuilder::new();
        let mut received = BTreeMap::new();
        for svc in services {
            let svc = svc.with_interval(interval);
            received.insert(svcd::Service::id(&svc), svc.received());
            builder.register(svc);
        }

        let daemon = builder.start()?;
        daemon.running().await?;
        info!(order = ?daemon.order(), "Example system running");
        Ok(Self { daemon, received })
    }

    /// Events handled so far, per service.
    pub fn received(&self) -> BTreeMap<ServiceId, usize> {
        self.received
            .iter()
            .map(|(id, count)| (*id, count.load(Ordering::Relaxed)))
            .collect()
    }

    pub async fn shutdown(mut self) -> Result<ExampleRun, SampleError> {
        let report = self.daemon.shutdown().await?;
        Ok(ExampleRun {
            received: self.received(),
            report,
        })
    }
}

/// Runs the example system for `run_for` with the default 100ms emit interval.
pub async fn run_example(run_for: Duration) -> Result<ExampleRun, SampleError> {
    run_example_with(Duration::from_millis(100), run_for).await
}

pub async fn run_example_with(
    interval: Duration,
    run_for: Duration,
) -> Result<ExampleRun, SampleError> {
    let system = ExampleSystem::start(interval).await?;
    tokio::time::sleep(run_for).await;
    system.shutdown().await
}
