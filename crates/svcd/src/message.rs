//! # Service Messages
//!
//! Requests sent from the daemon and the delivery workers to a [`ServiceActor`]. There is one
//! variant per lifecycle hook; each carries a one-shot channel for the hook's result.
//!
//! [`ServiceActor`]: crate::actor::ServiceActor

use crate::error::HookError;
use crate::event::Event;
use crate::handle::ServiceHandle;
use tokio::sync::oneshot;

/// Reply channel for a hook call.
pub(crate) type Response = oneshot::Sender<Result<(), HookError>>;

/// One hook call for a service actor.
///
/// # Usage Pattern
/// Callers never build these by hand; [`ServiceClient`](crate::client::ServiceClient)
/// creates the oneshot, wraps it in the matching variant and awaits the reply:
///
/// ```rust,ignore
/// let (respond_to, response) = oneshot::channel();
/// sender.send(ServiceRequest::Shutdown { respond_to }).await?;
/// let result: Result<(), HookError> = response.await?;
/// ```
#[derive(Debug)]
pub(crate) enum ServiceRequest {
    Init {
        handle: ServiceHandle,
        respond_to: Response,
    },
    Event {
        event: Event,
        respond_to: Response,
    },
    Shutdown {
        respond_to: Response,
    },
}
