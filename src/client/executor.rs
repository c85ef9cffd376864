//! Executes outbound calls through a [`RemoteCall`].
//!
//! # Data Flow
//! ```text
//! OutboundCall ─▶ render_request ─▶ RemoteCall::call ─▶ ClientResponse::wrap
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::client::call::OutboundCall;
use crate::client::remote::{HyperRemote, RemoteCall};
use crate::client::request::{render_request, RenderError};
use crate::client::response::ClientResponse;
use crate::config::ClientConfig;
use crate::translate::TranslationError;
use crate::BoxError;

/// Failure of one outbound call, by leg.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("error converting outbound request: {0}")]
    Render(#[source] RenderError),

    #[error("error invoking remote service: {0}")]
    Transport(#[source] BoxError),

    #[error("error converting inbound response: {0}")]
    Response(#[source] TranslationError),

    #[error("no tokio runtime available to block on")]
    NoRuntime,

    #[error("cannot block on an outbound call from a current-thread runtime thread")]
    RuntimeThread,
}

/// Runs outbound calls against one remote.
#[derive(Clone)]
pub struct ClientExecutor {
    remote: Arc<dyn RemoteCall>,
    handle: Option<Handle>,
}

impl ClientExecutor {
    /// Executor over `remote`. Captures the current runtime, if any, for
    /// [`execute_blocking`](Self::execute_blocking).
    pub fn new(remote: impl RemoteCall + 'static) -> Self {
        Self {
            remote: Arc::new(remote),
            handle: Handle::try_current().ok(),
        }
    }

    /// Executor whose blocking calls run on `handle`.
    pub fn with_handle(remote: impl RemoteCall + 'static, handle: Handle) -> Self {
        Self {
            remote: Arc::new(remote),
            handle: Some(handle),
        }
    }

    /// Executor over a [`HyperRemote`] built from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, BoxError> {
        Ok(Self::new(HyperRemote::from_config(config)?))
    }

    /// Render, send and wrap one call.
    pub async fn execute(&self, call: &OutboundCall) -> Result<ClientResponse, ClientError> {
        let request = render_request(call).map_err(|e| {
            tracing::warn!(error = %e, method = %call.method(), uri = %call.uri(), "Outbound request rejected");
            ClientError::Render(e)
        })?;

        tracing::debug!(
            method = %request.method(),
            uri = %request.uri(),
            headers = ?request.headers(),
            "Outbound request"
        );

        let response = self.remote.call(request).await.map_err(|e| {
            tracing::warn!(error = %e, uri = %call.uri(), "Remote call failed");
            ClientError::Transport(e)
        })?;

        tracing::debug!(
            status = %response.status(),
            headers = ?response.headers(),
            "Inbound response"
        );

        ClientResponse::wrap(response).map_err(ClientError::Response)
    }

    /// Block the current thread until the call completes.
    ///
    /// Meant for dispatchers, which run synchronously. On a multi-thread
    /// runtime worker (inline scheduling) the worker is handed off with
    /// [`block_in_place`](tokio::task::block_in_place) first. A current-thread
    /// runtime cannot drive the call while its only thread is blocked, so
    /// calls made from inside one fail with [`ClientError::RuntimeThread`].
    pub fn execute_blocking(&self, call: &OutboundCall) -> Result<ClientResponse, ClientError> {
        match Handle::try_current() {
            Ok(current) => match current.runtime_flavor() {
                RuntimeFlavor::MultiThread => {
                    let handle = self.handle.as_ref().unwrap_or(&current);
                    tokio::task::block_in_place(|| handle.block_on(self.execute(call)))
                }
                _ => {
                    tracing::warn!(uri = %call.uri(), "Blocking outbound call on a current-thread runtime");
                    Err(ClientError::RuntimeThread)
                }
            },
            Err(_) => {
                let handle = self.handle.as_ref().ok_or(ClientError::NoRuntime)?;
                handle.block_on(self.execute(call))
            }
        }
    }
}

impl std::fmt::Debug for ClientExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientExecutor")
            .field("has_runtime", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}
