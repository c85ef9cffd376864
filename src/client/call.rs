//! The engine's description of one outbound call.

use std::fmt;
use std::io::{self, Write};

use bytes::Bytes;

use crate::translate::{MediaType, MultiMap};

/// Serializes a request entity into the outbound body.
///
/// Writers may add headers (e.g. a content encoding) before writing.
pub trait EntityWriter: Send + Sync {
    fn write_entity(&self, headers: &mut MultiMap, out: &mut dyn Write) -> io::Result<()>;
}

impl<F> EntityWriter for F
where
    F: Fn(&mut MultiMap, &mut dyn Write) -> io::Result<()> + Send + Sync,
{
    fn write_entity(&self, headers: &mut MultiMap, out: &mut dyn Write) -> io::Result<()> {
        self(headers, out)
    }
}

/// Method, target, headers and optional entity of an outbound request.
pub struct OutboundCall {
    method: String,
    uri: String,
    headers: MultiMap,
    body_content_type: Option<MediaType>,
    entity: Option<Box<dyn EntityWriter>>,
}

impl OutboundCall {
    /// `uri` may be absolute; scheme and authority are dropped when rendered.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            headers: MultiMap::new(),
            body_content_type: None,
            entity: None,
        }
    }

    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: impl Into<String>) -> Self {
        Self::new("POST", uri)
    }

    /// Append a header value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Append an acceptable response media type.
    pub fn accept(self, media_type: &MediaType) -> Self {
        self.header("Accept", media_type.to_string())
    }

    /// Attach an entity and its content type.
    pub fn body(mut self, content_type: MediaType, entity: impl EntityWriter + 'static) -> Self {
        self.body_content_type = Some(content_type);
        self.entity = Some(Box::new(entity));
        self
    }

    /// Attach an already serialized entity.
    pub fn body_bytes(self, content_type: MediaType, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        self.body(
            content_type,
            move |_: &mut MultiMap, out: &mut dyn Write| -> io::Result<()> { out.write_all(&bytes) },
        )
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut MultiMap {
        &mut self.headers
    }

    pub fn body_content_type(&self) -> Option<&MediaType> {
        self.body_content_type.as_ref()
    }

    pub fn has_entity(&self) -> bool {
        self.entity.is_some()
    }

    /// Serialize the entity, if any, into `out`.
    pub fn write_entity(&self, headers: &mut MultiMap, out: &mut dyn Write) -> io::Result<()> {
        match &self.entity {
            Some(entity) => entity.write_entity(headers, out),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for OutboundCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundCall")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("headers", &self.headers)
            .field("body_content_type", &self.body_content_type)
            .field("has_entity", &self.entity.is_some())
            .finish()
    }
}
