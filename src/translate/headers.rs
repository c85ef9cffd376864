//! Header translation between the transport `HeaderMap` and the engine's
//! multi-valued header model.
//!
//! # Responsibilities
//! - Copy every header name/value list out of a transport message
//! - Derive content type, acceptable media types and acceptable languages
//! - Copy a multimap back into a transport `HeaderMap`
//!
//! # Design Decisions
//! - Request header names are lower-cased (the `http` crate already does this)
//! - Absent `Accept` yields an explicit empty list, absent `Content-Type` yields `None`
//! - A malformed media type is an error, never a silent default

use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};

use super::{MediaType, MultiMap, TranslationError};

/// The engine-side view of request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineHeaders {
    request_headers: MultiMap,
    media_type: Option<MediaType>,
    acceptable_media_types: Vec<MediaType>,
    acceptable_languages: Vec<String>,
}

impl EngineHeaders {
    /// All request headers, names lower-cased, values in arrival order.
    pub fn request_headers(&self) -> &MultiMap {
        &self.request_headers
    }

    /// Values of one header, looked up case-insensitively.
    pub fn request_header(&self, name: &str) -> Option<&[String]> {
        self.request_headers
            .get(&name.to_ascii_lowercase())
            .or_else(|| self.request_headers.get_ignore_case(name))
    }

    /// First value of one header.
    pub fn header_string(&self, name: &str) -> Option<&str> {
        self.request_header(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Parsed `Content-Type`, if the request carried one.
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Parsed `Accept` entries in header order; empty when no preference was stated.
    pub fn acceptable_media_types(&self) -> &[MediaType] {
        &self.acceptable_media_types
    }

    /// `Accept-Language` entries in header order.
    pub fn acceptable_languages(&self) -> &[String] {
        &self.acceptable_languages
    }
}

/// Copy all headers of a transport message into a multimap.
///
/// Values are decoded as UTF-8 where possible and as Latin-1 otherwise, so
/// every byte sequence the transport accepted survives the copy.
pub fn to_multi_map(headers: &HeaderMap) -> MultiMap {
    let mut map = MultiMap::new();
    for name in headers.keys() {
        for value in headers.get_all(name) {
            map.add(name.as_str().to_ascii_lowercase(), decode_value(value));
        }
    }
    map
}

fn decode_value(value: &HeaderValue) -> String {
    let bytes = value.as_bytes();
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Build the engine header view, computing the derived negotiation fields.
pub fn to_engine_headers(map: MultiMap) -> Result<EngineHeaders, TranslationError> {
    let media_type = match map.get_ignore_case(CONTENT_TYPE.as_str()).and_then(|v| v.first()) {
        Some(value) => Some(MediaType::parse(value)?),
        None => None,
    };

    let mut acceptable_media_types = Vec::new();
    if let Some(values) = map.get_ignore_case(ACCEPT.as_str()) {
        for value in values {
            acceptable_media_types.extend(MediaType::parse_list(value)?);
        }
    }

    let acceptable_languages = map
        .get_ignore_case(ACCEPT_LANGUAGE.as_str())
        .map(|values| {
            values
                .iter()
                .flat_map(|value| value.split(','))
                .map(str::trim)
                .filter(|lang| !lang.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(EngineHeaders {
        request_headers: map,
        media_type,
        acceptable_media_types,
        acceptable_languages,
    })
}

/// Append every entry of `map` to a transport header map.
pub fn copy_into(map: &MultiMap, target: &mut HeaderMap) -> Result<(), TranslationError> {
    for (name, values) in map.iter() {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TranslationError::HeaderName(name.to_string()))?;
        for value in values {
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                TranslationError::HeaderValue {
                    name: name.to_string(),
                }
            })?;
            target.append(header_name.clone(), header_value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_header_round_trip_preserves_value_order() {
        let headers = header_map(&[
            ("single", "a"),
            ("multi", "a"),
            ("multi", "b"),
            ("multi", "c"),
        ]);
        let engine = to_engine_headers(to_multi_map(&headers)).unwrap();

        assert_eq!(engine.request_header("single").unwrap(), ["a"]);
        assert_eq!(engine.request_header("MULTI").unwrap(), ["a", "b", "c"]);

        let mut back = HeaderMap::new();
        copy_into(engine.request_headers(), &mut back).unwrap();
        assert_eq!(back, headers);
    }

    #[test]
    fn test_absent_accept_is_empty_list() {
        let engine = to_engine_headers(to_multi_map(&HeaderMap::new())).unwrap();
        assert!(engine.acceptable_media_types().is_empty());
        assert!(engine.media_type().is_none());
        assert!(engine.acceptable_languages().is_empty());
    }

    #[test]
    fn test_accept_list_order() {
        let headers = header_map(&[("accept", "application/xml,application/json")]);
        let engine = to_engine_headers(to_multi_map(&headers)).unwrap();
        assert_eq!(
            engine.acceptable_media_types(),
            [MediaType::application_xml(), MediaType::application_json()]
        );
    }

    #[test]
    fn test_content_type_and_languages() {
        let headers = header_map(&[
            ("content-type", "application/json; charset=utf-8"),
            ("accept-language", "en-US, fr;q=0.5"),
        ]);
        let engine = to_engine_headers(to_multi_map(&headers)).unwrap();
        assert_eq!(engine.media_type().unwrap().subtype(), "json");
        assert_eq!(engine.acceptable_languages(), ["en-US", "fr;q=0.5"]);
    }

    #[test]
    fn test_malformed_media_type_propagates() {
        let headers = header_map(&[("content-type", "not-a-media-type")]);
        let err = to_engine_headers(to_multi_map(&headers)).unwrap_err();
        assert!(matches!(err, TranslationError::MediaType(_)));

        let headers = header_map(&[("accept", "text/html, bogus")]);
        assert!(to_engine_headers(to_multi_map(&headers)).is_err());
    }

    #[test]
    fn test_non_ascii_header_values_survive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-name", HeaderValue::from_bytes("Jürgen".as_bytes()).unwrap());
        headers.insert("x-latin", HeaderValue::from_bytes(&[b'c', 0xe9]).unwrap());

        let map = to_multi_map(&headers);
        assert_eq!(map.get("x-name").unwrap(), ["Jürgen"]);
        assert_eq!(map.get("x-latin").unwrap(), ["cé"]);
    }
}
