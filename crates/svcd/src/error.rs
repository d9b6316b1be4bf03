//! # Daemon Errors
//!
//! Error types shared by the builder, the daemon and the service handles.
//!
//! Errors fall into three groups:
//!
//! - [`ConfigError`]: the registered services do not form a valid graph. Raised by
//!   [`DaemonBuilder::start`](crate::DaemonBuilder::start) before anything runs.
//! - [`HookError`]: a single `init`, `handle_event` or `shutdown` call went wrong. These
//!   never unwind the daemon; they are wrapped in a [`ServiceFailure`](crate::ServiceFailure)
//!   and collected in the [`DaemonReport`](crate::DaemonReport).
//! - [`DaemonError`] / [`EmitError`]: misuse of a daemon or a handle at runtime.

use crate::service::{ServiceId, ServiceState};
use std::fmt;
use std::time::Duration;

/// Error type returned by service hooks.
///
/// Boxed so any error can be propagated out of a hook with `?`.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// The set of registered services cannot be started.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("service {0} registered more than once")]
    DuplicateService(ServiceId),
    #[error("service {service} depends on unregistered service {missing}")]
    MissingDependency {
        service: ServiceId,
        missing: ServiceId,
    },
    #[error("service dependency graph is cyclic: {}", CyclePath(.0))]
    Cycle(Vec<ServiceId>),
}

struct CyclePath<'a>(&'a [ServiceId]);

impl fmt::Display for CyclePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Errors from driving a running [`Daemon`](crate::Daemon).
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon already stopped")]
    AlreadyStopped,
    #[error("daemon is {0} and will not reach running")]
    NotRunning(crate::DaemonState),
    #[error("daemon task failed: {0}")]
    Panicked(String),
}

/// Errors returned by [`ServiceHandle`](crate::ServiceHandle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmitError {
    #[error("event bus closed")]
    Closed,
    #[error("event bus full")]
    Full,
}

/// Why a single hook call did not complete.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("service error: {0}")]
    Service(ServiceError),
    #[error("hook timed out after {0:?}")]
    TimedOut(Duration),
    #[error("service actor closed")]
    ActorClosed,
    #[error("service actor dropped response channel")]
    ActorDropped,
    #[error("service is {0}")]
    NotRunning(ServiceState),
}

impl HookError {
    /// `NotRunning` means the call was skipped on purpose; everything else is a failure.
    pub fn is_failure(&self) -> bool {
        !matches!(self, HookError::NotRunning(_))
    }
}
