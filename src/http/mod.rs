//! HTTP hosting subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body collection)
//!     → DispatchService::apply
//!     → Response<Bytes> (reason phrase kept as an extension)
//!     → Send to client
//! ```

pub mod server;

pub use server::{HttpServer, X_REQUEST_ID};
