//! Path templates: literal segments and `{name}` captures.

use crate::http::view::PathVariables;

use super::RouteError;

// A single path segment, either a literal string or a named capture (`{name}`).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Variable(String),
}

/// Compiled representation of a route pattern string.
///
/// A trailing slash (other than on the root `/`) is stripped from both the
/// pattern and the request path, so `/hello-basic` and `/hello-basic/` are one
/// registration that answers both forms.
#[derive(Debug, Clone)]
pub(crate) struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parse a route pattern such as `/mapping/users/{userId}/orders/{orderId}`.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] when the pattern does not start with `/`,
    /// a variable is empty or repeated, or braces appear anywhere other than
    /// around a whole segment.
    pub(crate) fn parse(pattern: &str) -> Result<Self, RouteError> {
        let invalid = |reason: &str| RouteError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: reason.to_owned(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        for raw in split(pattern) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    if name.is_empty() || name.contains(['{', '}']) {
                        return Err(invalid("variable name must be a non-empty identifier"));
                    }
                    if segments
                        .iter()
                        .any(|s| matches!(s, Segment::Variable(existing) if existing == name))
                    {
                        return Err(invalid("variable declared twice"));
                    }
                    Segment::Variable(name.to_owned())
                }
                None if raw.contains(['{', '}']) => {
                    return Err(invalid("a variable must span a whole segment"));
                }
                None => Segment::Static(raw.to_owned()),
            };
            segments.push(segment);
        }

        Ok(Self { segments })
    }

    /// Try to match `path`, returning the captured variables on success.
    ///
    /// A variable matches exactly one non-empty segment and captures it verbatim.
    pub(crate) fn matches(&self, path: &str) -> Option<PathVariables> {
        let path_segments = split(path);
        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut vars = PathVariables::new();
        for (seg, path_seg) in self.segments.iter().zip(path_segments) {
            match seg {
                Segment::Static(s) => {
                    if s != path_seg {
                        return None;
                    }
                }
                Segment::Variable(name) => {
                    if path_seg.is_empty() {
                        return None;
                    }
                    vars.insert(name.clone(), path_seg);
                }
            }
        }
        Some(vars)
    }

    /// Names of the `{name}` captures, in pattern order.
    pub(crate) fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Static(_) => None,
        })
    }

    /// Two patterns with the same shape match exactly the same paths; variable
    /// names do not take part.
    pub(crate) fn same_shape(&self, other: &Pattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Static(a), Segment::Static(b)) => a == b,
                    (Segment::Variable(_), Segment::Variable(_)) => true,
                    _ => false,
                })
    }
}

// Split a path into segments after dropping the leading slash and one trailing
// slash. The root path has no segments; inner empty segments (`/a//b`) are kept.
fn split(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Pattern::parse ────────────────────────────────────────────────────────

    #[test]
    fn parse_root() {
        let pat = Pattern::parse("/").unwrap();
        assert!(pat.segments.is_empty());
    }

    #[test]
    fn parse_trailing_slash_stripped() {
        let a = Pattern::parse("/hello-basic/").unwrap();
        let b = Pattern::parse("/hello-basic").unwrap();
        assert_eq!(a.segments, b.segments);
    }

    #[test]
    fn parse_variables_in_order() {
        let pat = Pattern::parse("/mapping/users/{userId}/orders/{orderId}").unwrap();
        assert_eq!(pat.variables().collect::<Vec<_>>(), vec!["userId", "orderId"]);
        assert!(matches!(&pat.segments[0], Segment::Static(s) if s == "mapping"));
    }

    #[test]
    fn parse_rejects_malformed_patterns() {
        for bad in ["mapping", "/a/{}", "/a/{x}/{x}", "/a/file{id}.txt", "/a/{x"] {
            assert!(
                matches!(Pattern::parse(bad), Err(RouteError::InvalidPattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    // ── Pattern::matches ──────────────────────────────────────────────────────

    #[test]
    fn literal_matches_with_and_without_trailing_slash() {
        let pat = Pattern::parse("/hello-basic").unwrap();
        assert!(pat.matches("/hello-basic").is_some());
        assert!(pat.matches("/hello-basic/").is_some());
        assert!(pat.matches("/hello-basics").is_none());
    }

    #[test]
    fn root_matches_only_root() {
        let pat = Pattern::parse("/").unwrap();
        assert!(pat.matches("/").is_some());
        assert!(pat.matches("/other").is_none());
    }

    #[test]
    fn captures_exact_segment_text() {
        let pat = Pattern::parse("/mapping/{userid}").unwrap();
        let vars = pat.matches("/mapping/user%20A").unwrap();
        assert_eq!(vars.get("userid"), Some("user%20A"));
    }

    #[test]
    fn captures_multiple_variables() {
        let pat = Pattern::parse("/mapping/users/{userId}/orders/{orderId}").unwrap();
        let vars = pat.matches("/mapping/users/42/orders/7").unwrap();
        assert_eq!(vars.get("userId"), Some("42"));
        assert_eq!(vars.get("orderId"), Some("7"));
    }

    #[test]
    fn variable_rejects_empty_segment_and_wrong_length() {
        let pat = Pattern::parse("/a/{x}/b").unwrap();
        assert!(pat.matches("/a//b").is_none());
        assert!(pat.matches("/a/1").is_none());
        assert!(pat.matches("/a/1/b/c").is_none());
    }

    #[test]
    fn shape_ignores_variable_names() {
        let a = Pattern::parse("/mapping/{userid}").unwrap();
        let b = Pattern::parse("/mapping/{id}/").unwrap();
        let c = Pattern::parse("/mapping/users").unwrap();
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&c));
    }
}
