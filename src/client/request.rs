//! Rendering an [`OutboundCall`] into a transport request.
//!
//! # Rules
//! - Scheme and authority are dropped from the target; the transport is
//!   already bound to its endpoint
//! - The call's headers are copied, never mutated in place
//! - A declared body content type replaces any `Content-Type` header
//! - `Content-Length` is always set, `Transfer-Encoding` never is
//! - Protocol is HTTP/1.1

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use http::header::{HeaderValue, CONTENT_LENGTH};
use http::{Method, Request, Version};
use thiserror::Error;

use crate::client::call::OutboundCall;
use crate::translate::headers::copy_into;
use crate::translate::uri::strip_scheme_and_authority;
use crate::translate::TranslationError;

/// Failure turning a call into a transport request.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error("error serializing request body: {0}")]
    Body(#[from] io::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),
}

/// Render `call` as an HTTP/1.1 request with a fully buffered body.
pub fn render_request(call: &OutboundCall) -> Result<Request<Bytes>, RenderError> {
    let method = Method::from_bytes(call.method().as_bytes())
        .map_err(|_| TranslationError::Method(call.method().to_string()))?;
    let target = strip_scheme_and_authority(call.uri());

    let mut headers = call.headers().clone();
    if let Some(content_type) = call.body_content_type() {
        headers.remove_ignore_case("content-type");
        headers.put_single("Content-Type", content_type.to_string());
    }

    let mut body = BytesMut::new().writer();
    call.write_entity(&mut headers, &mut body)?;
    let body = body.into_inner().freeze();

    headers.remove_ignore_case("transfer-encoding");
    headers.remove_ignore_case("content-length");

    let length = body.len();
    let mut request = Request::builder()
        .method(method)
        .uri(target.as_ref())
        .version(Version::HTTP_11)
        .body(body)?;

    copy_into(&headers, request.headers_mut())?;
    request
        .headers_mut()
        .insert(CONTENT_LENGTH, HeaderValue::from(length));

    Ok(request)
}
