//! Server side of the bridge: transport requests in, dispatch engine calls, transport responses out.
//!
//! # Responsibilities
//! - Adapt inbound requests for the engine ([`request`])
//! - Collect the engine's response and render it ([`response`])
//! - Schedule and supervise dispatch work ([`executor`], [`service`])

pub mod dispatcher;
pub mod executor;
pub mod request;
pub mod response;
pub mod service;

pub use dispatcher::Dispatcher;
pub use executor::{Executor, InlineExecutor, Job, ScheduleError, WorkerPool};
pub use request::{AdaptError, RequestAdapter, TransportRequest};
pub use response::{error_response, reason_of, OutputHeaders, ResponseAdapter};
pub use service::{DispatchService, RequestState, ResponseFuture, ServiceError};
