//! # Observability
//!
//! The daemon logs through `tracing` with structured fields (`service`, `name`,
//! `event_type`, `error`). Nothing is printed unless the host installs a subscriber;
//! [`setup_tracing`] installs the usual one.
//!
//! ## What gets logged
//!
//! - **info**: solved order, each `init`/`shutdown`, daemon state transitions
//! - **debug**: registration, emits, routing, skipped deliveries, worker start/stop
//! - **warn**: every service failure, duplicate registrations, lost events
//!
//! ```bash
//! RUST_LOG=info cargo run -p svcd-sample
//! RUST_LOG=svcd=debug cargo run -p svcd-sample
//! ```

/// Installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set.
pub fn setup_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}
