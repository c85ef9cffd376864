//! Client-facing view of a transport response.

use std::io::{self, Read};

use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use http::header::CONTENT_TYPE;
use http::{Response, StatusCode};

use crate::translate::headers::to_multi_map;
use crate::translate::{MediaType, MultiMap, TranslationError};

/// Status, headers and a one-shot body stream of a received response.
#[derive(Debug)]
pub struct ClientResponse {
    status: StatusCode,
    reason: Option<String>,
    headers: MultiMap,
    media_type: Option<MediaType>,
    body: Option<Reader<Bytes>>,
}

impl ClientResponse {
    /// Wrap a transport response. Header names come out lower-cased.
    ///
    /// Fails when the response carries a `Content-Type` that does not parse.
    pub fn wrap(response: Response<Bytes>) -> Result<Self, TranslationError> {
        let headers = to_multi_map(response.headers());
        let media_type = headers
            .get_ignore_case(CONTENT_TYPE.as_str())
            .and_then(|values| values.first())
            .map(|value| MediaType::parse(value))
            .transpose()?;
        let reason = crate::server::response::reason_of(&response).map(str::to_owned);
        let (parts, body) = response.into_parts();

        Ok(Self {
            status: parts.status,
            reason,
            headers,
            media_type,
            body: Some(body.reader()),
        })
    }

    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Custom reason phrase, if the transport kept one.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn headers(&self) -> &MultiMap {
        &self.headers
    }

    /// Parsed `Content-Type` of the entity, if any.
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Values of `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&[String]> {
        self.headers.get_ignore_case(name)
    }

    /// Take the body stream. Returns `None` once taken.
    pub fn take_body(&mut self) -> Option<impl Read> {
        self.body.take()
    }

    /// Read the whole body. Empty once the stream was taken.
    pub fn read_entity(&mut self) -> io::Result<Vec<u8>> {
        let mut entity = Vec::new();
        if let Some(mut body) = self.body.take() {
            body.read_to_end(&mut entity)?;
        }
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap() {
        let response = Response::builder()
            .status(409)
            .header("X-Custom-Header", "a")
            .header("x-custom-header", "b")
            .body(Bytes::from_static(b"conflict"))
            .unwrap();

        let mut wrapped = ClientResponse::wrap(response).unwrap();
        assert_eq!(wrapped.status(), 409);
        assert_eq!(wrapped.header("X-CUSTOM-HEADER").unwrap(), ["a", "b"]);
        assert_eq!(wrapped.read_entity().unwrap(), b"conflict");
        assert!(wrapped.read_entity().unwrap().is_empty());
        assert!(wrapped.take_body().is_none());
    }

    #[test]
    fn test_wrap_media_type() {
        let response = Response::builder()
            .header("Content-Type", "application/json; charset=utf-8")
            .body(Bytes::new())
            .unwrap();
        let wrapped = ClientResponse::wrap(response).unwrap();
        let media_type = wrapped.media_type().unwrap();
        assert_eq!(media_type.type_(), "application");
        assert_eq!(media_type.subtype(), "json");

        let response = Response::builder()
            .header("Content-Type", "json")
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(
            ClientResponse::wrap(response),
            Err(TranslationError::MediaType(_))
        ));
    }
}
