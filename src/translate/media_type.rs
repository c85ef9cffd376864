//! Media type values (`type/subtype;param=value`).
//!
//! # Design Decisions
//! - `type` and `subtype` are lower-cased on parse so equality is case-insensitive
//! - Parameter names are lower-cased, values kept verbatim (quotes stripped)
//! - Wildcards (`*/*`, `text/*`) are accepted as-is; matching is the engine's job

use std::fmt;
use thiserror::Error;

/// A malformed media-type token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid media type {input:?}: {reason}")]
pub struct MediaTypeParseError {
    pub input: String,
    pub reason: &'static str,
}

impl MediaTypeParseError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// A parsed media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    type_: String,
    subtype: String,
    parameters: Vec<(String, String)>,
}

impl MediaType {
    /// Build a media type without parameters.
    pub fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parameters: Vec::new(),
        }
    }

    pub fn application_json() -> Self {
        Self::new("application", "json")
    }

    pub fn application_xml() -> Self {
        Self::new("application", "xml")
    }

    pub fn application_form_urlencoded() -> Self {
        Self::new("application", "x-www-form-urlencoded")
    }

    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Parse a single media-type token such as `text/html; charset=UTF-8`.
    pub fn parse(input: &str) -> Result<Self, MediaTypeParseError> {
        let mut parts = input.split(';');
        let essence = parts.next().unwrap_or_default().trim();
        if essence.is_empty() {
            return Err(MediaTypeParseError::new(input, "empty media type"));
        }

        // a lone `*` is sent by some clients for `*/*`
        let essence = if essence == "*" { "*/*" } else { essence };
        let (type_, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MediaTypeParseError::new(input, "missing '/' separator"))?;
        let (type_, subtype) = (type_.trim(), subtype.trim());
        if !is_token(type_) || !is_token(subtype) {
            return Err(MediaTypeParseError::new(input, "invalid type or subtype"));
        }
        if type_ == "*" && subtype != "*" {
            return Err(MediaTypeParseError::new(input, "wildcard type requires wildcard subtype"));
        }

        let mut parameters = Vec::new();
        for param in parts {
            let param = param.trim();
            if param.is_empty() {
                continue;
            }
            let (name, value) = param
                .split_once('=')
                .ok_or_else(|| MediaTypeParseError::new(input, "parameter without '='"))?;
            let name = name.trim();
            if !is_token(name) {
                return Err(MediaTypeParseError::new(input, "invalid parameter name"));
            }
            let value = unquote(value.trim());
            parameters.push((name.to_ascii_lowercase(), value.to_string()));
        }

        Ok(Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parameters,
        })
    }

    /// Parse a comma-separated list (the `Accept` header shape), keeping order.
    pub fn parse_list(input: &str) -> Result<Vec<Self>, MediaTypeParseError> {
        input
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Self::parse)
            .collect()
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add a parameter, replacing any existing one with the same name.
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        let name = name.to_ascii_lowercase();
        self.parameters.retain(|(k, _)| *k != name);
        self.parameters.push((name, value.to_string()));
        self
    }

    /// True if either part is a `*` wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.type_ == "*" || self.subtype == "*"
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.parameters {
            if value.chars().all(is_token_char) && !value.is_empty() {
                write!(f, ";{}={}", name, value)?;
            } else {
                write!(f, ";{}=\"{}\"", name, value)?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for MediaType {
    type Err = MediaTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

// RFC 7230 tchar
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_parameters() {
        let mt = MediaType::parse("Text/HTML; charset=\"UTF-8\"").unwrap();
        assert_eq!(mt.type_(), "text");
        assert_eq!(mt.subtype(), "html");
        assert_eq!(mt.parameter("Charset"), Some("UTF-8"));
        assert_eq!(mt.to_string(), "text/html;charset=UTF-8");
    }

    #[test]
    fn test_parse_list_keeps_order() {
        let list = MediaType::parse_list("application/xml,application/json").unwrap();
        assert_eq!(
            list,
            vec![MediaType::application_xml(), MediaType::application_json()]
        );
    }

    #[test]
    fn test_wildcards() {
        assert!(MediaType::parse("*/*").unwrap().is_wildcard());
        assert!(MediaType::parse("text/*").unwrap().is_wildcard());
        assert!(MediaType::parse("*/json").is_err());
    }

    #[test]
    fn test_lone_star_is_full_wildcard() {
        let list =
            MediaType::parse_list("text/html, image/gif, image/jpeg, *; q=.2, */*; q=.2").unwrap();
        assert_eq!(list.len(), 5);
        assert_eq!(list[3].type_(), "*");
        assert_eq!(list[3].subtype(), "*");
        assert_eq!(list[3], list[4]);
    }

    #[test]
    fn test_malformed_tokens_fail() {
        assert!(MediaType::parse("").is_err());
        assert!(MediaType::parse("json").is_err());
        assert!(MediaType::parse("application/").is_err());
        assert!(MediaType::parse("application/json; charset").is_err());
        assert!(MediaType::parse("app lication/json").is_err());
    }
}
