//! # svcd sample
//!
//! Starts the four example services, lets the event source run for two seconds, then shuts
//! everything down and logs what each service received.
//!
//! ```bash
//! RUST_LOG=info cargo run -p svcd-sample
//! ```

use std::time::Duration;
use svcd::telemetry::setup_tracing;
use svcd_sample::{run_example, SampleError};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), SampleError> {
    setup_tracing();

    info!("Starting example services");
    let run = run_example(Duration::from_secs(2)).await?;

    for (service, count) in &run.received {
        info!(service = %service, received = count, "Events handled");
    }
    for failure in &run.report.failures {
        warn!(service = %failure.service, hook = %failure.hook, error = %failure.error, "Failure");
    }

    info!(
        routed = run.report.routed,
        unrouted = run.report.unrouted,
        "Example completed"
    );
    Ok(())
}
