//! `application/x-www-form-urlencoded` parsing.
//!
//! Used for request bodies (form parameters) and query strings. Both views
//! come from the same encoded text: the raw view splits on `&`/`=` only, the
//! decoded view also resolves `%XX` escapes and `+`.

use std::io::Read;
use thiserror::Error;
use url::form_urlencoded;

use super::MultiMap;

/// Failure reading or decoding a form body.
#[derive(Debug, Error)]
pub enum FormDecodingError {
    /// The body stream could not be read.
    #[error("error reading form body: {0}")]
    Io(#[from] std::io::Error),

    /// The body is not valid UTF-8.
    #[error("form body is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// Another caller failed while computing the parameters.
    #[error("form parameters unavailable after an earlier failure")]
    Poisoned,
}

/// Raw and percent-decoded views of the same parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParameters {
    pub raw: MultiMap,
    pub decoded: MultiMap,
}

impl FormParameters {
    /// Parse an encoded string (`k1=v1&k1=v2&k2=%3F`).
    pub fn parse(encoded: &str) -> Self {
        Self {
            raw: parse_raw(encoded),
            decoded: parse_decoded(encoded),
        }
    }

    /// Read the whole stream and parse it. The stream is consumed.
    pub fn read_from(stream: &mut dyn Read) -> Result<Self, FormDecodingError> {
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf)?;
        let body = String::from_utf8(buf)?;
        Ok(Self::parse(&body))
    }
}

/// Split on `&` and `=` without decoding anything.
///
/// A pair without `=` yields an empty value; empty pairs are skipped.
pub fn parse_raw(encoded: &str) -> MultiMap {
    let mut params = MultiMap::new();
    for pair in encoded.split('&').filter(|p| !p.is_empty()) {
        match pair.split_once('=') {
            Some((name, value)) => params.add(name, value),
            None => params.add(pair, ""),
        }
    }
    params
}

/// Decode with form rules (`%XX` escapes, `+` as space).
pub fn parse_decoded(encoded: &str) -> MultiMap {
    form_urlencoded::parse(encoded.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn values(map: &MultiMap, key: &str) -> Vec<String> {
        map.get(key).map(|v| v.to_vec()).unwrap_or_default()
    }

    #[test]
    fn test_raw_and_decoded_views() {
        let params = FormParameters::parse("k1=v1&k1=v2&k2=%3F");
        assert_eq!(values(&params.raw, "k1"), vec!["v1", "v2"]);
        assert_eq!(values(&params.raw, "k2"), vec!["%3F"]);
        assert_eq!(values(&params.decoded, "k1"), vec!["v1", "v2"]);
        assert_eq!(values(&params.decoded, "k2"), vec!["?"]);
    }

    #[test]
    fn test_decoded_view_handles_plus_and_utf8() {
        let decoded = parse_decoded("q=a%20b+c&mark=%E2%9C%93&eq=x%3Dy%26z");
        assert_eq!(values(&decoded, "q"), vec!["a b c"]);
        assert_eq!(values(&decoded, "mark"), vec!["\u{2713}"]);
        assert_eq!(values(&decoded, "eq"), vec!["x=y&z"]);
    }

    #[test]
    fn test_pairs_without_values() {
        let params = FormParameters::parse("flag&&k=");
        assert_eq!(values(&params.raw, "flag"), vec![""]);
        assert_eq!(values(&params.raw, "k"), vec![""]);
        assert_eq!(params.raw.len(), 2);
    }

    #[test]
    fn test_read_from_stream() {
        let mut body = Cursor::new(b"name=J%C3%BCrgen&age=42".to_vec());
        let params = FormParameters::read_from(&mut body).unwrap();
        assert_eq!(values(&params.decoded, "name"), vec!["J\u{fc}rgen"]);

        let mut bad = Cursor::new(vec![0xff, 0xfe]);
        assert!(matches!(
            FormParameters::read_from(&mut bad),
            Err(FormDecodingError::Encoding(_))
        ));
    }
}
