//! Request-line URI translation.
//!
//! # Responsibilities
//! - Split a request-line URI into path and query
//! - Build absolute and base URIs on a fixed placeholder endpoint
//! - Segment the raw path and parse matrix parameters per segment
//!
//! # Design Decisions
//! - The real network endpoint is irrelevant to in-process routing, so every
//!   absolute URI is rooted at `http://localhost:80`
//! - `raw_path` never includes the query; `base_uri` always ends in `/`
//! - Segments keep their percent-encoding; decoding is available per segment

use std::borrow::Cow;

use http::uri::{PathAndQuery, Uri};
use percent_encoding::percent_decode_str;

use super::{form, MultiMap, TranslationError};

/// Scheme of every absolute URI built here.
pub const PLACEHOLDER_SCHEME: &str = "http";

/// Authority of every absolute URI built here.
pub const PLACEHOLDER_AUTHORITY: &str = "localhost:80";

/// One `/`-delimited path segment with its matrix parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    path: String,
    matrix_parameters: MultiMap,
}

impl PathSegment {
    /// Parse `name;k=v;k2=v2` (still percent-encoded).
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(';');
        let path = parts.next().unwrap_or_default().to_string();
        let mut matrix_parameters = MultiMap::new();
        for param in parts.filter(|p| !p.is_empty()) {
            match param.split_once('=') {
                Some((name, value)) => matrix_parameters.add(name, value),
                None => matrix_parameters.add(param, ""),
            }
        }
        Self {
            path,
            matrix_parameters,
        }
    }

    /// Segment text without matrix parameters, still encoded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Segment text with `%XX` escapes resolved.
    pub fn decoded_path(&self) -> String {
        percent_decode_path(&self.path)
    }

    pub fn matrix_parameters(&self) -> &MultiMap {
        &self.matrix_parameters
    }
}

/// URI information derived once from the request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriInfo {
    absolute_uri: Uri,
    base_uri: Uri,
    raw_path: String,
    query: Option<String>,
    path_segments: Vec<PathSegment>,
}

impl UriInfo {
    /// Parse a request-line URI (`/path?query`).
    ///
    /// An absolute-form URI is accepted too; its scheme and authority are
    /// discarded in favor of the placeholder endpoint.
    pub fn parse(request_uri: &str) -> Result<Self, TranslationError> {
        let relative = strip_scheme_and_authority(request_uri);
        let (raw_path, query) = match relative.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (relative.as_ref(), None),
        };

        let absolute_uri = build_uri(raw_path, query).map_err(|source| {
            TranslationError::Uri {
                uri: request_uri.to_string(),
                source,
            }
        })?;
        let base_uri = build_uri("/", None).map_err(|source| TranslationError::Uri {
            uri: request_uri.to_string(),
            source,
        })?;

        let path_segments = raw_path
            .split('/')
            .skip_while(|segment| segment.is_empty())
            .map(PathSegment::parse)
            .collect();

        Ok(Self {
            absolute_uri,
            base_uri,
            raw_path: raw_path.to_string(),
            query: query.map(str::to_string),
            path_segments,
        })
    }

    pub fn absolute_uri(&self) -> &Uri {
        &self.absolute_uri
    }

    pub fn base_uri(&self) -> &Uri {
        &self.base_uri
    }

    /// Path as received, still percent-encoded, without the query.
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Path with `%XX` escapes resolved.
    pub fn path(&self) -> String {
        percent_decode_path(&self.raw_path)
    }

    /// Query string without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn path_segments(&self) -> &[PathSegment] {
        &self.path_segments
    }

    /// Query parameters as received.
    pub fn raw_query_parameters(&self) -> MultiMap {
        self.query.as_deref().map(form::parse_raw).unwrap_or_default()
    }

    /// Query parameters with form decoding applied.
    pub fn query_parameters(&self) -> MultiMap {
        self.query
            .as_deref()
            .map(form::parse_decoded)
            .unwrap_or_default()
    }
}

/// Reduce `scheme://authority/rest` to `/rest`, keeping any query.
///
/// Origin-form input is returned unchanged; an absolute URI without a path
/// becomes `/` (or `/?query`).
pub fn strip_scheme_and_authority(uri: &str) -> Cow<'_, str> {
    let Some(idx) = uri.find("://") else {
        return Cow::Borrowed(uri);
    };
    let rest = &uri[idx + 3..];
    match rest.find(['/', '?']) {
        Some(pos) if rest[pos..].starts_with('/') => Cow::Borrowed(&rest[pos..]),
        Some(pos) => Cow::Owned(format!("/{}", &rest[pos..])),
        None => Cow::Borrowed("/"),
    }
}

fn build_uri(path: &str, query: Option<&str>) -> Result<Uri, http::Error> {
    let mut path_and_query = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    if let Some(query) = query {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }
    let path_and_query = PathAndQuery::try_from(path_and_query)?;
    Ok(Uri::builder()
        .scheme(PLACEHOLDER_SCHEME)
        .authority(PLACEHOLDER_AUTHORITY)
        .path_and_query(path_and_query)
        .build()?)
}

/// Resolve `%XX` escapes; `+` stays literal in paths.
fn percent_decode_path(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_query() {
        let info = UriInfo::parse("/foo?k=v&k=%3F").unwrap();
        assert_eq!(info.raw_path(), "/foo");
        assert_eq!(info.query(), Some("k=v&k=%3F"));
        assert_eq!(
            info.absolute_uri().to_string(),
            "http://localhost:80/foo?k=v&k=%3F"
        );
        assert_eq!(info.base_uri().to_string(), "http://localhost:80/");
        assert_eq!(info.query_parameters().get("k").unwrap(), ["v", "?"]);
        assert_eq!(info.raw_query_parameters().get("k").unwrap(), ["v", "%3F"]);

        let segments: Vec<&str> = info.path_segments().iter().map(|s| s.path()).collect();
        assert_eq!(segments, vec!["foo"]);
    }

    #[test]
    fn test_empty_path_has_no_segments() {
        let info = UriInfo::parse("").unwrap();
        assert!(info.path_segments().is_empty());
        assert_eq!(info.raw_path(), "");
        assert!(info.query().is_none());
        assert!(info.base_uri().to_string().ends_with('/'));
    }

    #[test]
    fn test_matrix_parameters_and_decoding() {
        let info = UriInfo::parse("/cars;color=red;year=2012/a%20b").unwrap();
        let segments = info.path_segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].path(), "cars");
        assert_eq!(segments[0].matrix_parameters().get_first("color"), Some("red"));
        assert_eq!(segments[0].matrix_parameters().get_first("year"), Some("2012"));
        assert_eq!(segments[1].path(), "a%20b");
        assert_eq!(segments[1].decoded_path(), "a b");
        assert_eq!(info.path(), "/cars;color=red;year=2012/a b");
    }

    #[test]
    fn test_path_decoding_keeps_plus_and_bad_escapes() {
        let info = UriInfo::parse("/a+b%2Fc%zz%E2%9C%93").unwrap();
        assert_eq!(info.raw_path(), "/a+b%2Fc%zz%E2%9C%93");
        assert_eq!(info.path(), "/a+b/c%zz\u{2713}");
    }

    #[test]
    fn test_trailing_slash_keeps_empty_segment() {
        let info = UriInfo::parse("/foo/").unwrap();
        let segments: Vec<&str> = info.path_segments().iter().map(|s| s.path()).collect();
        assert_eq!(segments, vec!["foo", ""]);
    }

    #[test]
    fn test_absolute_form_is_rebased() {
        let info = UriInfo::parse("http://example.com:8080/foo/bar?x=1").unwrap();
        assert_eq!(info.raw_path(), "/foo/bar");
        assert_eq!(info.absolute_uri().to_string(), "http://localhost:80/foo/bar?x=1");
    }

    #[test]
    fn test_strip_scheme_and_authority() {
        assert_eq!(strip_scheme_and_authority("/foo?x=1"), "/foo?x=1");
        assert_eq!(strip_scheme_and_authority("http://h:1/foo?x=1"), "/foo?x=1");
        assert_eq!(strip_scheme_and_authority("https://h"), "/");
        assert_eq!(strip_scheme_and_authority("http://h?x=1"), "/?x=1");
    }

    #[test]
    fn test_invalid_characters_fail() {
        let err = UriInfo::parse("/foo bar").unwrap_err();
        assert!(matches!(err, TranslationError::Uri { .. }));
    }
}
