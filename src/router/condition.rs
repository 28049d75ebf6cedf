//! Presence/equality conditions on request parameters and headers.
//!
//! Grammar, shared by parameter and header conditions:
//!
//! | Expression    | Matches when                                   |
//! |---------------|------------------------------------------------|
//! | `mode`        | `mode` is present                              |
//! | `!mode`       | `mode` is absent                               |
//! | `mode=debug`  | some value of `mode` is exactly `debug`        |
//! | `mode!=debug` | `mode` is absent or none of its values is `debug` |

use std::fmt;

use crate::http::{Headers, ParamMap};

use super::RouteError;

/// Something a condition can be evaluated against.
pub(crate) trait Lookup {
    fn has(&self, name: &str) -> bool;
    fn has_value(&self, name: &str, value: &str) -> bool;
}

impl Lookup for ParamMap {
    fn has(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn has_value(&self, name: &str, value: &str) -> bool {
        self.all(name).any(|v| v == value)
    }
}

impl Lookup for Headers {
    fn has(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn has_value(&self, name: &str, value: &str) -> bool {
        Headers::has_value(self, name, value)
    }
}

/// A single parsed condition expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum Condition {
    Present(String),
    Absent(String),
    Equals(String, String),
    NotEquals(String, String),
}

impl Condition {
    /// Parse one expression. `!=` is checked before `=` so `mode!=debug` is a
    /// negated equality rather than an equality on the name `mode!`.
    pub(crate) fn parse(expr: &str) -> Result<Self, RouteError> {
        let expr = expr.trim();
        let condition = if let Some((name, value)) = expr.split_once("!=") {
            Self::NotEquals(name.trim().to_owned(), value.trim().to_owned())
        } else if let Some((name, value)) = expr.split_once('=') {
            Self::Equals(name.trim().to_owned(), value.trim().to_owned())
        } else if let Some(name) = expr.strip_prefix('!') {
            Self::Absent(name.trim().to_owned())
        } else {
            Self::Present(expr.to_owned())
        };

        if condition.name().is_empty() {
            return Err(RouteError::InvalidCondition {
                expression: expr.to_owned(),
            });
        }
        Ok(condition)
    }

    /// Header names are case-insensitive, so header conditions compare and
    /// deduplicate on the lowercased name.
    pub(crate) fn with_lowercase_name(self) -> Self {
        match self {
            Self::Present(n) => Self::Present(n.to_ascii_lowercase()),
            Self::Absent(n) => Self::Absent(n.to_ascii_lowercase()),
            Self::Equals(n, v) => Self::Equals(n.to_ascii_lowercase(), v),
            Self::NotEquals(n, v) => Self::NotEquals(n.to_ascii_lowercase(), v),
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Present(n) | Self::Absent(n) | Self::Equals(n, _) | Self::NotEquals(n, _) => n,
        }
    }

    pub(crate) fn matches(&self, source: &impl Lookup) -> bool {
        match self {
            Self::Present(name) => source.has(name),
            Self::Absent(name) => !source.has(name),
            Self::Equals(name, value) => source.has_value(name, value),
            Self::NotEquals(name, value) => !source.has_value(name, value),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(n) => write!(f, "{n}"),
            Self::Absent(n) => write!(f, "!{n}"),
            Self::Equals(n, v) => write!(f, "{n}={v}"),
            Self::NotEquals(n, v) => write!(f, "{n}!={v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(query: &str) -> ParamMap {
        ParamMap::parse(query)
    }

    #[test]
    fn parse_grammar() {
        assert_eq!(Condition::parse("mode").unwrap(), Condition::Present("mode".into()));
        assert_eq!(Condition::parse("!mode").unwrap(), Condition::Absent("mode".into()));
        assert_eq!(
            Condition::parse("mode=debug").unwrap(),
            Condition::Equals("mode".into(), "debug".into())
        );
        assert_eq!(
            Condition::parse("mode!=debug").unwrap(),
            Condition::NotEquals("mode".into(), "debug".into())
        );
    }

    #[test]
    fn parse_rejects_empty_name() {
        for bad in ["", "!", "=x", "!=x"] {
            assert!(
                matches!(Condition::parse(bad), Err(RouteError::InvalidCondition { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn presence_and_absence() {
        let present = Condition::parse("mode").unwrap();
        let absent = Condition::parse("!mode").unwrap();
        assert!(present.matches(&params("mode=")));
        assert!(!absent.matches(&params("mode=")));
        assert!(!present.matches(&params("other=1")));
        assert!(absent.matches(&params("other=1")));
    }

    #[test]
    fn equality_pair_is_mutually_exclusive() {
        let eq = Condition::parse("mode=debug").unwrap();
        let ne = Condition::parse("mode!=debug").unwrap();
        for query in ["mode=debug", "mode=info", "", "mode=info&mode=debug", "mode="] {
            let p = params(query);
            assert_ne!(eq.matches(&p), ne.matches(&p), "query {query:?}");
        }
        assert!(eq.matches(&params("mode=debug")));
        assert!(ne.matches(&params("")));
    }

    #[test]
    fn header_conditions_ignore_name_case() {
        let mut headers = Headers::new();
        headers.insert("MODE", "debug");
        let cond = Condition::parse("Mode=debug").unwrap().with_lowercase_name();
        assert!(cond.matches(&headers));
        assert_eq!(cond.to_string(), "mode=debug");
    }
}
