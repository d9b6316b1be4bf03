//! # Service Client
//!
//! The daemon-side interface to a [`ServiceActor`](crate::actor::ServiceActor). Each method
//! sends one request and waits for the hook to finish, optionally bounded by a timeout.

use crate::error::HookError;
use crate::event::Event;
use crate::handle::ServiceHandle;
use crate::message::{Response, ServiceRequest};
use crate::service::ServiceId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// The client half of a [`ServiceActor`](crate::actor::ServiceActor).
///
/// # Architecture Note
/// Each call builds a [`ServiceRequest`] carrying a fresh oneshot, sends it to the mailbox
/// and awaits the reply. Both waits sit under the configured timeout. The two ways the actor
/// can disappear are mapped separately:
///
/// - mailbox closed before the send: [`HookError::ActorClosed`]
/// - reply sender dropped (the hook panicked): [`HookError::ActorDropped`]
///
/// Cheap to clone: every delivery worker holds one per subscriber.
#[derive(Clone, Debug)]
pub(crate) struct ServiceClient {
    id: ServiceId,
    name: Arc<str>,
    sender: mpsc::Sender<ServiceRequest>,
    timeout: Option<Duration>,
}

impl ServiceClient {
    pub(crate) fn new(
        id: ServiceId,
        name: String,
        sender: mpsc::Sender<ServiceRequest>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            sender,
            timeout,
        }
    }

    pub(crate) fn id(&self) -> ServiceId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn init(&self, handle: ServiceHandle) -> Result<(), HookError> {
        self.request(|respond_to| ServiceRequest::Init { handle, respond_to })
            .await
    }

    pub(crate) async fn deliver(&self, event: Event) -> Result<(), HookError> {
        self.request(|respond_to| ServiceRequest::Event { event, respond_to })
            .await
    }

    pub(crate) async fn shutdown(&self) -> Result<(), HookError> {
        self.request(|respond_to| ServiceRequest::Shutdown { respond_to })
            .await
    }

    async fn request(
        &self,
        make: impl FnOnce(Response) -> ServiceRequest,
    ) -> Result<(), HookError> {
        let (respond_to, response) = oneshot::channel();
        let call = self.call(make(respond_to), response);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(HookError::TimedOut(limit))),
            None => call.await,
        }
    }

    async fn call(
        &self,
        request: ServiceRequest,
        response: oneshot::Receiver<Result<(), HookError>>,
    ) -> Result<(), HookError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| HookError::ActorClosed)?;
        response.await.map_err(|_| HookError::ActorDropped)?
    }
}
