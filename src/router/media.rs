//! Media types for `consumes` / `produces` conditions.

use std::fmt;

use super::RouteError;

/// Assumed content type of a request that declares none.
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A `type/subtype` pair, lowercased, parameters dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct MediaType {
    kind: String,
    subtype: String,
}

impl MediaType {
    /// Parse `type/subtype[; params]`. A bare `*` is read as `*/*`, which some
    /// clients send in `Accept`.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        let essence = raw.split(';').next().unwrap_or("").trim();
        if essence == "*" {
            return Some(Self::any());
        }
        let (kind, subtype) = essence.split_once('/')?;
        let valid = |part: &str| {
            !part.is_empty() && !part.contains(|c: char| c.is_whitespace() || c == '/')
        };
        if !valid(kind) || !valid(subtype) {
            return None;
        }
        Some(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
        })
    }

    pub(crate) fn any() -> Self {
        Self {
            kind: "*".to_owned(),
            subtype: "*".to_owned(),
        }
    }

    /// Content type of a request: its declared one, or `application/octet-stream`.
    pub(crate) fn of_request(content_type: Option<&str>) -> Self {
        content_type
            .and_then(Self::parse)
            .or_else(|| Self::parse(DEFAULT_CONTENT_TYPE))
            .unwrap_or_else(Self::any)
    }

    /// Media ranges of an `Accept` header; unparsable entries are skipped.
    /// An empty result means "no preference".
    pub(crate) fn accept_list(accept: Option<&str>) -> Vec<Self> {
        accept
            .map(|header| header.split(',').filter_map(Self::parse).collect())
            .unwrap_or_default()
    }

    /// `*` on either side matches anything for that half.
    pub(crate) fn is_compatible_with(&self, other: &MediaType) -> bool {
        let half = |a: &str, b: &str| a == "*" || b == "*" || a == b;
        half(&self.kind, &other.kind) && half(&self.subtype, &other.subtype)
    }

    pub(crate) fn is_concrete(&self) -> bool {
        self.kind != "*" && self.subtype != "*"
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
    }
}

/// A `consumes`/`produces` entry, optionally negated with a leading `!`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct MediaTypeExpr {
    media: MediaType,
    negated: bool,
}

impl MediaTypeExpr {
    pub(crate) fn parse(raw: &str) -> Result<Self, RouteError> {
        let trimmed = raw.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let media = MediaType::parse(body).ok_or_else(|| RouteError::InvalidMediaType {
            media_type: raw.to_owned(),
        })?;
        Ok(Self { media, negated })
    }

    pub(crate) fn matches(&self, candidate: &MediaType) -> bool {
        self.media.is_compatible_with(candidate) != self.negated
    }

    /// The media type a matching handler's raw body is declared to produce,
    /// when the expression names exactly one.
    pub(crate) fn concrete(&self) -> Option<&MediaType> {
        (!self.negated && self.media.is_concrete()).then_some(&self.media)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mt(raw: &str) -> MediaType {
        MediaType::parse(raw).unwrap()
    }

    #[test]
    fn parse_drops_parameters_and_case() {
        let m = mt("Application/JSON; charset=UTF-8");
        assert_eq!(m.to_string(), "application/json");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "json", "/json", "application/", "a/b/c", "text /html"] {
            assert!(MediaType::parse(bad).is_none(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn wildcards_on_either_half() {
        assert!(mt("application/*").is_compatible_with(&mt("application/json")));
        assert!(mt("application/json").is_compatible_with(&mt("*/*")));
        assert!(mt("*/json").is_compatible_with(&mt("application/json")));
        assert!(!mt("text/*").is_compatible_with(&mt("application/json")));
        assert!(!mt("text/html").is_compatible_with(&mt("text/plain")));
    }

    #[test]
    fn request_without_content_type_is_octet_stream() {
        assert_eq!(MediaType::of_request(None).to_string(), "application/octet-stream");
        assert_eq!(MediaType::of_request(Some("garbage")).to_string(), "application/octet-stream");
    }

    #[test]
    fn accept_list_skips_garbage_and_reads_star() {
        let list = MediaType::accept_list(Some("text/html, nonsense, application/*;q=0.8, *"));
        let rendered: Vec<String> = list.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["text/html", "application/*", "*/*"]);
        assert!(MediaType::accept_list(None).is_empty());
    }

    #[test]
    fn negated_expression_inverts_match() {
        let expr = MediaTypeExpr::parse("!application/json").unwrap();
        assert!(!expr.matches(&mt("application/json")));
        assert!(expr.matches(&mt("text/plain")));
        assert!(expr.concrete().is_none());
    }

    #[test]
    fn expression_rejects_invalid_media_type() {
        assert!(matches!(
            MediaTypeExpr::parse("json"),
            Err(RouteError::InvalidMediaType { .. })
        ));
    }
}
