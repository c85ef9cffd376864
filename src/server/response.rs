//! Outbound response adaptation.
//!
//! # Responsibilities
//! - Give the dispatch engine a mutable response with status, headers and body
//! - Carry the reason phrase alongside the status
//! - Synthesize the `500` answer used for every unhandled failure
//!
//! # Design Decisions
//! - The response is never committed before dispatch returns, so `reset`
//!   is always allowed and only clears headers
//! - The reason phrase lives in the `hyper::ext::ReasonPhrase` extension so
//!   that HTTP/1 connections put it on the status line

use std::fmt::Display;
use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode, Version};
use hyper::ext::ReasonPhrase;

use crate::translate::headers::to_multi_map;
use crate::translate::{MultiMap, TranslationError};

/// The response under construction for one request.
#[derive(Debug)]
pub struct ResponseAdapter {
    inner: Response<BytesMut>,
}

impl ResponseAdapter {
    /// Empty `200` response for a request of the given protocol version.
    pub fn new(version: Version) -> Self {
        let mut inner = Response::new(BytesMut::new());
        *inner.version_mut() = version;
        Self { inner }
    }

    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Set the status and drop any reason phrase set earlier.
    pub fn set_status(&mut self, code: u16) -> Result<(), TranslationError> {
        *self.inner.status_mut() = status_code(code)?;
        self.inner.extensions_mut().remove::<ReasonPhrase>();
        Ok(())
    }

    /// Set an error status with the standard reason phrase.
    pub fn send_error(&mut self, code: u16) -> Result<(), TranslationError> {
        self.set_status(code)
    }

    /// Set an error status with a custom reason phrase. Control characters
    /// in `message` are replaced with spaces.
    pub fn send_error_with_message(
        &mut self,
        code: u16,
        message: &str,
    ) -> Result<(), TranslationError> {
        self.set_status(code)?;
        if let Some(reason) = reason_phrase(message) {
            self.inner.extensions_mut().insert(reason);
        }
        Ok(())
    }

    /// The custom reason phrase, if one was set.
    pub fn reason(&self) -> Option<&str> {
        reason_of(&self.inner)
    }

    /// Live view of the outgoing headers.
    pub fn output_headers(&mut self) -> OutputHeaders<'_> {
        OutputHeaders {
            headers: self.inner.headers_mut(),
        }
    }

    /// Writer appending to the response body.
    pub fn output_stream(&mut self) -> impl Write + '_ {
        self.inner.body_mut().writer()
    }

    /// Bytes written so far.
    pub fn body(&self) -> &[u8] {
        self.inner.body()
    }

    /// Always `false`: nothing reaches the transport before dispatch returns.
    pub fn is_committed(&self) -> bool {
        false
    }

    /// Clear the headers. Status and body are left alone.
    pub fn reset(&mut self) {
        self.inner.headers_mut().clear();
    }

    /// Finish the response for the transport.
    pub fn into_transport(self) -> Response<Bytes> {
        self.inner.map(BytesMut::freeze)
    }
}

/// Mutable multi-valued view over response headers.
///
/// Writes go straight to the transport header map.
#[derive(Debug)]
pub struct OutputHeaders<'a> {
    headers: &'a mut HeaderMap,
}

impl OutputHeaders<'_> {
    /// Append a value, keeping existing ones.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), TranslationError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    /// Replace all values of `name` with `value`.
    pub fn put_single(&mut self, name: &str, value: &str) -> Result<(), TranslationError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// All values of `name`, case-insensitive. Non-text values are skipped.
    pub fn get(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    /// Remove every value of `name`, returning the removed text values.
    pub fn remove(&mut self, name: &str) -> Vec<String> {
        let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
            return Vec::new();
        };
        match self.headers.entry(name) {
            http::header::Entry::Occupied(entry) => entry
                .remove_entry_mult()
                .1
                .filter_map(|value| value.to_str().ok().map(str::to_owned))
                .collect(),
            http::header::Entry::Vacant(_) => Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.headers.clear();
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.headers.keys_len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(HeaderName::as_str)
    }

    /// Snapshot of the headers.
    pub fn to_multi_map(&self) -> MultiMap {
        to_multi_map(&*self.headers)
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), TranslationError> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TranslationError::HeaderName(name.to_string()))?;
    let header_value = HeaderValue::from_str(value).map_err(|_| TranslationError::HeaderValue {
        name: name.to_string(),
    })?;
    Ok((header_name, header_value))
}

fn status_code(code: u16) -> Result<StatusCode, TranslationError> {
    StatusCode::from_u16(code).map_err(|_| TranslationError::Status(code))
}

/// Reason phrase from free text. Control characters become spaces; `None`
/// when nothing usable is left.
pub(crate) fn reason_phrase(text: &str) -> Option<ReasonPhrase> {
    let sanitized: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return None;
    }
    ReasonPhrase::try_from(sanitized.to_string()).ok()
}

/// The `500` answer for an unhandled failure: the error description is both
/// the reason phrase and the `text/plain` body.
pub fn error_response(version: Version, error: &dyn Display) -> Response<Bytes> {
    let description = error.to_string();
    let reason = reason_phrase(&description);

    let mut response = Response::new(Bytes::from(description));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    *response.version_mut() = version;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    if let Some(reason) = reason {
        response.extensions_mut().insert(reason);
    }
    response
}

/// Custom reason phrase carried by a transport response.
pub fn reason_of<B>(response: &Response<B>) -> Option<&str> {
    response
        .extensions()
        .get::<ReasonPhrase>()
        .and_then(|reason| std::str::from_utf8(reason.as_bytes()).ok())
}
