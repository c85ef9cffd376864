//! Translation between the transport message model and the dispatch engine's
//! request model.
//!
//! # Data Flow
//! ```text
//! transport HeaderMap
//!     → headers.rs (to_multi_map, to_engine_headers)
//!     → EngineHeaders (request headers + content negotiation fields)
//!
//! request-line URI
//!     → uri.rs (path/query split, placeholder absolute URI, segments)
//!     → UriInfo
//!
//! form body / query string
//!     → form.rs (raw + decoded MultiMap views)
//! ```
//!
//! # Design Decisions
//! - Every translation failure surfaces as a `TranslationError`
//! - The only defaults are the documented ones: absent `Accept` is an empty
//!   list, absent `Content-Type` is `None`

pub mod form;
pub mod headers;
pub mod media_type;
pub mod multimap;
pub mod uri;

use thiserror::Error;

pub use form::{FormDecodingError, FormParameters};
pub use headers::EngineHeaders;
pub use media_type::{MediaType, MediaTypeParseError};
pub use multimap::MultiMap;
pub use uri::{PathSegment, UriInfo};

/// Header, URI or media-type translation failure.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error(transparent)]
    MediaType(#[from] MediaTypeParseError),

    #[error("invalid URI {uri:?}: {source}")]
    Uri {
        uri: String,
        #[source]
        source: http::Error,
    },

    #[error("invalid header name {0:?}")]
    HeaderName(String),

    #[error("invalid value for header {name:?}")]
    HeaderValue { name: String },

    #[error("invalid HTTP method {0:?}")]
    Method(String),

    #[error("invalid status code {0}")]
    Status(u16),
}
