//! The server-side bridge service.
//!
//! # Responsibilities
//! - Accept transport requests and hand back a future of the transport response
//! - Adapt, dispatch and render each request on the configured executor
//! - Turn every failure (adaptation, dispatch error, panic, scheduling) into a `500`
//!
//! # Data Flow
//! ```text
//! apply(request) ─▶ Executor ─▶ RequestAdapter + ResponseAdapter
//!       │                          └▶ Dispatcher::dispatch
//!       ▼                                  │
//! ResponseFuture ◀──── oneshot ◀── Response<Bytes>
//! ```
//!
//! # Design Decisions
//! - A request moves through [`RequestState`] exactly once; every request
//!   ends `Resolved`, failures included
//! - The future never fails: it yields the success response or the
//!   synthesized error response
//! - `DispatchService` implements `tower::Service`, so it can sit behind any
//!   tower-compatible transport

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::future::{FutureExt, Map};
use http::{Response, Version};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::config::WorkerPoolConfig;
use crate::server::dispatcher::Dispatcher;
use crate::server::executor::{self, Executor, InlineExecutor, ScheduleError};
use crate::server::request::{AdaptError, RequestAdapter, TransportRequest};
use crate::server::response::{error_response, ResponseAdapter};
use crate::BoxError;

/// Where a request is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Adapted,
    Dispatched,
    Resolved,
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestState::Received => "received",
            RequestState::Adapted => "adapted",
            RequestState::Dispatched => "dispatched",
            RequestState::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

/// Why a request could not produce its own response.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error("{0}")]
    Dispatch(#[source] BoxError),

    #[error("dispatcher panicked: {0}")]
    Panic(String),
}

/// Bridges transport requests to a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatchService {
    dispatcher: Arc<dyn Dispatcher>,
    executor: Arc<dyn Executor>,
}

impl DispatchService {
    pub fn new(dispatcher: impl Dispatcher, executor: Arc<dyn Executor>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            executor,
        }
    }

    /// Dispatch on the calling thread.
    pub fn inline(dispatcher: impl Dispatcher) -> Self {
        Self::new(dispatcher, Arc::new(InlineExecutor))
    }

    /// Close the executor. Requests applied afterwards resolve with a 500.
    pub fn shutdown(&self) {
        self.executor.shutdown();
    }

    /// Build with the executor described by the worker pool configuration.
    /// Pool mode needs a running tokio runtime.
    pub fn from_config(
        dispatcher: impl Dispatcher,
        config: &WorkerPoolConfig,
    ) -> Result<Self, ScheduleError> {
        Ok(Self::new(dispatcher, executor::from_config(config)?))
    }

    /// Start handling `request`. The returned future resolves once the
    /// response is ready and never fails.
    pub fn apply<R: TransportRequest>(&self, request: R) -> ResponseFuture {
        let version = request.version();
        let span = tracing::info_span!(
            "dispatch",
            method = %request.method(),
            uri = %request.request_uri()
        );
        tracing::info!(parent: &span, state = %RequestState::Received, "Inbound request");

        let (tx, rx) = oneshot::channel();
        let dispatcher = Arc::clone(&self.dispatcher);
        let job_span = span.clone();

        let job = Box::new(move || {
            let _entered = job_span.enter();
            let response = ResponseWorker::new(request).run(dispatcher.as_ref());
            if tx.send(response).is_err() {
                tracing::debug!("Caller went away before the response was ready");
            }
        });

        match self.executor.execute(job) {
            Ok(()) => ResponseFuture::waiting(rx, version, span),
            Err(e) => {
                tracing::error!(parent: &span, error = %e, "Failed to schedule request");
                ResponseFuture::ready(error_response(version, &e), span)
            }
        }
    }
}

impl fmt::Debug for DispatchService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchService").finish_non_exhaustive()
    }
}

impl tower::Service<http::Request<Bytes>> for DispatchService {
    type Response = Response<Bytes>;
    type Error = Infallible;
    type Future = Map<ResponseFuture, fn(Response<Bytes>) -> Result<Response<Bytes>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Bytes>) -> Self::Future {
        self.apply(request)
            .map(Ok as fn(Response<Bytes>) -> Result<Response<Bytes>, Infallible>)
    }
}

/// Computes the response for one request on an executor thread.
struct ResponseWorker<R> {
    request: R,
    state: RequestState,
}

impl<R: TransportRequest> ResponseWorker<R> {
    fn new(request: R) -> Self {
        Self {
            request,
            state: RequestState::Received,
        }
    }

    fn run(mut self, dispatcher: &dyn Dispatcher) -> Response<Bytes> {
        let version = self.request.version();
        let response = match self.compute_response(dispatcher) {
            Ok(response) => response,
            Err(e) => {
                tracing::info!(
                    error = %e,
                    state = %self.state,
                    "Unhandled error creating HTTP response"
                );
                error_response(version, &e)
            }
        };

        self.advance(RequestState::Resolved);
        tracing::info!(status = %response.status(), "Outbound response");
        response
    }

    fn compute_response(&mut self, dispatcher: &dyn Dispatcher) -> Result<Response<Bytes>, ServiceError> {
        tracing::debug!(headers = ?self.request.headers(), "Inbound request headers");

        let mut request = RequestAdapter::new(&self.request)?;
        let mut response = ResponseAdapter::new(self.request.version());
        self.advance(RequestState::Adapted);

        self.advance(RequestState::Dispatched);
        invoke(dispatcher, &mut request, &mut response)?;

        let response = response.into_transport();
        tracing::debug!(headers = ?response.headers(), "Outbound response headers");
        Ok(response)
    }

    fn advance(&mut self, next: RequestState) {
        tracing::trace!(from = %self.state, to = %next, "Request state change");
        self.state = next;
    }
}

fn invoke(
    dispatcher: &dyn Dispatcher,
    request: &mut RequestAdapter,
    response: &mut ResponseAdapter,
) -> Result<(), ServiceError> {
    match panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(request, response))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ServiceError::Dispatch(e)),
        Err(payload) => Err(ServiceError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Future of the response for one [`DispatchService::apply`] call.
pub struct ResponseFuture {
    inner: Pending,
    version: Version,
    span: tracing::Span,
}

enum Pending {
    Waiting(oneshot::Receiver<Response<Bytes>>),
    Ready(Option<Response<Bytes>>),
}

impl ResponseFuture {
    fn waiting(rx: oneshot::Receiver<Response<Bytes>>, version: Version, span: tracing::Span) -> Self {
        Self {
            inner: Pending::Waiting(rx),
            version,
            span,
        }
    }

    fn ready(response: Response<Bytes>, span: tracing::Span) -> Self {
        Self {
            version: response.version(),
            inner: Pending::Ready(Some(response)),
            span,
        }
    }

    /// Wait for the response with the request's span attached.
    pub fn instrumented(self) -> impl Future<Output = Response<Bytes>> {
        let span = self.span.clone();
        self.instrument(span)
    }
}

impl Future for ResponseFuture {
    type Output = Response<Bytes>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.inner {
            Pending::Ready(response) => match response.take() {
                Some(response) => Poll::Ready(response),
                None => Poll::Ready(error_response(this.version, &"response already taken")),
            },
            Pending::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Pending => Poll::Pending,
                Poll::Ready(Ok(response)) => Poll::Ready(response),
                Poll::Ready(Err(_)) => {
                    let _entered = this.span.enter();
                    tracing::warn!("Request dropped before a response was produced");
                    Poll::Ready(error_response(
                        this.version,
                        &"request dropped before a response was produced",
                    ))
                }
            },
        }
    }
}

impl fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner {
            Pending::Waiting(_) => "waiting",
            Pending::Ready(_) => "ready",
        };
        f.debug_struct("ResponseFuture")
            .field("state", &state)
            .field("version", &self.version)
            .finish()
    }
}
