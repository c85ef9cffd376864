//! HTTP bridge between an async transport and a synchronous dispatch engine.
//!
//! Inbound, [`server::DispatchService`] adapts each transport request into a
//! [`server::RequestAdapter`], runs a [`server::Dispatcher`] on the configured
//! executor and renders the [`server::ResponseAdapter`] back into a transport
//! response. Outbound, [`client::ClientExecutor`] renders an
//! [`client::OutboundCall`], sends it through a [`client::RemoteCall`] and wraps
//! the answer as a [`client::ClientResponse`].

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod server;
pub mod translate;

/// Opaque error raised by dispatchers and transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub use client::{ClientExecutor, ClientResponse, OutboundCall};
pub use config::BridgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use server::{DispatchService, Dispatcher, RequestAdapter, ResponseAdapter};
