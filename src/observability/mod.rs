//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! server / client / http layers
//!     → tracing events with structured fields (method, uri, status, error)
//!     → per-request `dispatch` span
//!     → logging.rs subscriber (plain or JSON to stdout)
//! ```

pub mod logging;

pub use logging::init_logging;
