//! # Daemon Configuration
//!
//! [`DaemonConfig`] holds the queue sizes and failure handling knobs of a daemon. The
//! defaults reproduce the classic behavior: 128-slot queues, no hook deadline, log and
//! continue on service errors.
//!
//! ## Sentinel values
//! - capacity `0` is clamped to `1` (a bounded channel needs at least one slot), and so is
//!   `failure_history`
//! - `hook_timeout = None` means hooks may run forever

use std::time::Duration;

/// What the daemon does when a service hook fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log the failure, record it in the report, keep going.
    #[default]
    Continue,
    /// Record the failure and shut the whole daemon down.
    Escalate,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Slots in the inbound channel shared by every handle. `emit` waits when it is full.
    pub inbound_capacity: usize,
    /// Slots in each per-event-type delivery queue.
    pub worker_capacity: usize,
    /// Slots in each service actor's mailbox.
    pub mailbox_capacity: usize,
    /// Upper bound on any single `init`, `handle_event` or `shutdown` call.
    pub hook_timeout: Option<Duration>,
    pub error_policy: ErrorPolicy,
    /// Most recent failures kept in the [`DaemonReport`](crate::DaemonReport); older ones
    /// are only logged and counted.
    pub failure_history: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 128,
            worker_capacity: 128,
            mailbox_capacity: 32,
            hook_timeout: None,
            error_policy: ErrorPolicy::Continue,
            failure_history: 256,
        }
    }
}

impl DaemonConfig {
    pub fn with_inbound_capacity(mut self, capacity: usize) -> Self {
        self.inbound_capacity = capacity;
        self
    }

    pub fn with_worker_capacity(mut self, capacity: usize) -> Self {
        self.worker_capacity = capacity;
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_hook_timeout(mut self, timeout: Duration) -> Self {
        self.hook_timeout = Some(timeout);
        self
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_failure_history(mut self, keep: usize) -> Self {
        self.failure_history = keep;
        self
    }

    pub(crate) fn inbound_slots(&self) -> usize {
        self.inbound_capacity.max(1)
    }

    pub(crate) fn worker_slots(&self) -> usize {
        self.worker_capacity.max(1)
    }

    pub(crate) fn mailbox_slots(&self) -> usize {
        self.mailbox_capacity.max(1)
    }

    pub(crate) fn failure_history_slots(&self) -> usize {
        self.failure_history.max(1)
    }
}
