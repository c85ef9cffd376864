//! Inbound request adaptation.
//!
//! # Responsibilities
//! - Describe what the bridge needs from a transport request ([`TransportRequest`])
//! - Present one inbound request to the dispatch engine ([`RequestAdapter`])
//! - Hold per-request attributes and the (replaceable) body stream
//! - Parse form parameters from the body at most once
//!
//! # Data Flow
//! ```text
//! http::Request<Bytes> ─▶ RequestAdapter::new ─▶ headers + UriInfo (eager)
//!                                              └▶ body stream (lazy, one-shot)
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Mutex, OnceLock, PoisonError};

use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use http::{HeaderMap, Method, Version};
use thiserror::Error;

use crate::translate::headers::{to_engine_headers, to_multi_map};
use crate::translate::{
    EngineHeaders, FormDecodingError, FormParameters, MultiMap, TranslationError, UriInfo,
};
use crate::BoxError;

/// Read-only view of an inbound transport request.
pub trait TransportRequest: Send + 'static {
    fn method(&self) -> &Method;

    /// The request target as it appeared on the request line.
    fn request_uri(&self) -> String;

    fn version(&self) -> Version;

    fn headers(&self) -> &HeaderMap;

    /// The full body. Fails when the content cannot be obtained.
    fn content(&self) -> Result<Bytes, BoxError>;
}

impl TransportRequest for http::Request<Bytes> {
    fn method(&self) -> &Method {
        self.method()
    }

    fn request_uri(&self) -> String {
        self.uri().to_string()
    }

    fn version(&self) -> Version {
        self.version()
    }

    fn headers(&self) -> &HeaderMap {
        self.headers()
    }

    fn content(&self) -> Result<Bytes, BoxError> {
        Ok(self.body().clone())
    }
}

/// Failure building a [`RequestAdapter`].
#[derive(Debug, Error)]
pub enum AdaptError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("error reading request content: {0}")]
    Content(#[source] BoxError),
}

/// The body as seen by the engine: the transport content unless replaced.
struct BodyStream {
    underlying: Reader<Bytes>,
    replacement: Option<Box<dyn Read + Send>>,
}

impl Read for BodyStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.replacement.as_mut() {
            Some(stream) => stream.read(buf),
            None => self.underlying.read(buf),
        }
    }
}

/// One inbound request, as the dispatch engine sees it.
pub struct RequestAdapter {
    method: Method,
    version: Version,
    headers: EngineHeaders,
    uri: UriInfo,
    attributes: HashMap<String, Box<dyn Any + Send + Sync>>,
    body: Mutex<BodyStream>,
    form: OnceLock<FormParameters>,
}

impl RequestAdapter {
    /// Adapt a transport request. Headers and URI are translated up front.
    pub fn new<R: TransportRequest + ?Sized>(request: &R) -> Result<Self, AdaptError> {
        let headers = to_engine_headers(to_multi_map(request.headers()))?;
        let uri = UriInfo::parse(&request.request_uri())?;
        let content = request.content().map_err(AdaptError::Content)?;

        Ok(Self {
            method: request.method().clone(),
            version: request.version(),
            headers,
            uri,
            attributes: HashMap::new(),
            body: Mutex::new(BodyStream {
                underlying: content.reader(),
                replacement: None,
            }),
            form: OnceLock::new(),
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Canonical method name, e.g. `GET`.
    pub fn http_method(&self) -> &str {
        self.method.as_str()
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn headers(&self) -> &EngineHeaders {
        &self.headers
    }

    pub fn uri(&self) -> &UriInfo {
        &self.uri
    }

    /// The body stream. Reading consumes it.
    pub fn input_stream(&mut self) -> &mut dyn Read {
        self.body.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the body stream for all later reads.
    pub fn set_input_stream(&mut self, stream: impl Read + Send + 'static) {
        let body = self.body.get_mut().unwrap_or_else(PoisonError::into_inner);
        body.replacement = Some(Box::new(stream));
    }

    pub fn attribute<T: Any>(&self, name: &str) -> Option<&T> {
        self.attributes
            .get(name)
            .and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn set_attribute<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.attributes.insert(name.into(), Box::new(value));
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Box<dyn Any + Send + Sync>> {
        self.attributes.remove(name)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Form parameters from the body, values left encoded.
    pub fn form_parameters(&self) -> Result<&MultiMap, FormDecodingError> {
        Ok(&self.read_form()?.raw)
    }

    /// Form parameters from the body, values decoded.
    pub fn decoded_form_parameters(&self) -> Result<&MultiMap, FormDecodingError> {
        Ok(&self.read_form()?.decoded)
    }

    /// Read the body once and cache both views. Concurrent callers wait on
    /// the body lock; a failed read is not cached.
    fn read_form(&self) -> Result<&FormParameters, FormDecodingError> {
        if let Some(params) = self.form.get() {
            return Ok(params);
        }

        let mut body = self.body.lock().map_err(|_| FormDecodingError::Poisoned)?;
        if let Some(params) = self.form.get() {
            return Ok(params);
        }

        let params = FormParameters::read_from(&mut *body)?;
        tracing::debug!(count = params.raw.len(), "Parsed form parameters");
        Ok(self.form.get_or_init(|| params))
    }
}

impl std::fmt::Debug for RequestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAdapter")
            .field("method", &self.method)
            .field("version", &self.version)
            .field("uri", &self.uri.absolute_uri())
            .field("attributes", &self.attributes.len())
            .finish_non_exhaustive()
    }
}
