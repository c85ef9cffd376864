//! Client side of the bridge: engine calls out, transport requests, engine responses back.
//!
//! # Data Flow
//! ```text
//! OutboundCall (call.rs)
//!     → request.rs (render transport request)
//!     → remote.rs (send via RemoteCall / HyperRemote)
//!     → response.rs (wrap transport response)
//! executor.rs ties the legs together and classifies failures
//! ```

pub mod call;
pub mod executor;
pub mod remote;
pub mod request;
pub mod response;

pub use call::{EntityWriter, OutboundCall};
pub use executor::{ClientError, ClientExecutor};
pub use remote::{HyperRemote, RemoteCall, RemoteFuture};
pub use request::{render_request, RenderError};
pub use response::ClientResponse;
