//! Request routing: map a request to exactly one registered handler.
//!
//! A [`RouteDescriptor`] declares, as plain strings, everything a request has to
//! satisfy to reach a handler:
//!
//! | Condition  | Example                                   | Checked against             |
//! |------------|-------------------------------------------|-----------------------------|
//! | path       | `/mapping/users/{userId}/orders/{orderId}`| request path                |
//! | methods    | `GET`, `POST` (none = every method)       | request method              |
//! | params     | `mode`, `!mode`, `mode=debug`, `mode!=debug` | query/form parameters    |
//! | headers    | same grammar, case-insensitive names      | request headers             |
//! | consumes   | `application/json`, `!text/plain`, `application/*` | `Content-Type`     |
//! | produces   | `text/html`, `text/*`                     | `Accept`                    |
//!
//! Descriptors are compiled when registered on a [`RouteTable`]. Resolution
//! filters every route through the conditions above, in that order, and never
//! falls back on registration order: one survivor is a match, none is
//! [`RouteError::NoMatch`], several are [`RouteError::Ambiguous`].
//!
//! Trailing slashes are normalized on both patterns and incoming paths, so
//! `/hello-basic/` and `/hello-basic` are the same route.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::binding::SpecError;
use crate::handler::HandlerDescriptor;
use crate::http::view::PathVariables;
use crate::http::{Method, RequestView};

mod condition;
mod media;
mod pattern;

use condition::Condition;
use media::{MediaType, MediaTypeExpr};
use pattern::Pattern;

/// Routing and registration failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {route} conflicts with already registered handler '{existing}'")]
    Conflict { route: String, existing: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid condition expression '{expression}'")]
    InvalidCondition { expression: String },

    #[error("invalid media type '{media_type}'")]
    InvalidMediaType { media_type: String },

    #[error("invalid parameter declaration on handler '{handler}': {source}")]
    InvalidParameter {
        handler: String,
        #[source]
        source: SpecError,
    },

    #[error("no route matches {method} {path} (rejected at {stage})")]
    NoMatch {
        method: Method,
        path: String,
        stage: MatchStage,
    },

    #[error("{method} {path} is ambiguous between handlers {candidates:?}")]
    Ambiguous {
        method: Method,
        path: String,
        candidates: Vec<String>,
    },
}

/// The stage at which the most promising route was rejected.
///
/// Ordered by how far a route got: a route rejected on its headers came closer
/// to matching than one rejected on its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStage {
    Path,
    Method,
    Params,
    Headers,
    Consumes,
    Produces,
}

impl fmt::Display for MatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Method => "method",
            Self::Params => "params",
            Self::Headers => "headers",
            Self::Consumes => "consumes",
            Self::Produces => "produces",
        })
    }
}

/// Declaration of the requests a handler answers.
///
/// # Examples
///
/// ```
/// use reqbind::router::RouteDescriptor;
///
/// let route = RouteDescriptor::get("/mapping-param").param("mode=debug");
/// assert_eq!(route.path(), "/mapping-param");
///
/// let any_method = RouteDescriptor::new("/hello-basic");
/// assert!(any_method.methods().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDescriptor {
    path: String,
    methods: Vec<Method>,
    params: Vec<String>,
    headers: Vec<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
}

impl RouteDescriptor {
    /// A route on `path` accepting every method.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            methods: Vec::new(),
            params: Vec::new(),
            headers: Vec::new(),
            consumes: Vec::new(),
            produces: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::Get)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::Post)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::Put)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::Patch)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(path).method(Method::Delete)
    }

    /// Adds an allowed method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a parameter condition such as `mode=debug`.
    #[must_use]
    pub fn param(mut self, expression: impl Into<String>) -> Self {
        self.params.push(expression.into());
        self
    }

    /// Adds a header condition such as `mode=debug`.
    #[must_use]
    pub fn header(mut self, expression: impl Into<String>) -> Self {
        self.headers.push(expression.into());
        self
    }

    /// Adds an accepted request content type.
    #[must_use]
    pub fn consumes(mut self, media_type: impl Into<String>) -> Self {
        self.consumes.push(media_type.into());
        self
    }

    /// Adds a producible response content type.
    #[must_use]
    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces.push(media_type.into());
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }
}

impl fmt::Display for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.methods.is_empty() {
            f.write_str("*")?;
        } else {
            let names: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
            f.write_str(&names.join("|"))?;
        }
        write!(f, " {}", self.path)?;
        for (label, list) in [
            ("params", &self.params),
            ("headers", &self.headers),
            ("consumes", &self.consumes),
            ("produces", &self.produces),
        ] {
            if !list.is_empty() {
                write!(f, " {label}={list:?}")?;
            }
        }
        Ok(())
    }
}

// Compiled form of a descriptor. Set-valued fields make conflict detection
// independent of declaration order and duplicates.
#[derive(Debug)]
struct Route {
    pattern: Pattern,
    methods: BTreeSet<Method>,
    params: BTreeSet<Condition>,
    headers: BTreeSet<Condition>,
    consumes: BTreeSet<MediaTypeExpr>,
    produces: BTreeSet<MediaTypeExpr>,
}

// Request data parsed once per resolution instead of once per route.
struct Negotiation {
    content_type: MediaType,
    accept: Vec<MediaType>,
}

impl Route {
    fn compile(descriptor: &RouteDescriptor) -> Result<Self, RouteError> {
        let pattern = Pattern::parse(&descriptor.path)?;
        let params = descriptor
            .params
            .iter()
            .map(|e| Condition::parse(e))
            .collect::<Result<_, _>>()?;
        let headers = descriptor
            .headers
            .iter()
            .map(|e| Condition::parse(e).map(Condition::with_lowercase_name))
            .collect::<Result<_, _>>()?;
        let consumes = descriptor
            .consumes
            .iter()
            .map(|m| MediaTypeExpr::parse(m))
            .collect::<Result<_, _>>()?;
        let produces = descriptor
            .produces
            .iter()
            .map(|m| MediaTypeExpr::parse(m))
            .collect::<Result<_, _>>()?;

        Ok(Self {
            pattern,
            methods: descriptor.methods.iter().cloned().collect(),
            params,
            headers,
            consumes,
            produces,
        })
    }

    fn conflicts_with(&self, other: &Route) -> bool {
        self.pattern.same_shape(&other.pattern)
            && self.methods == other.methods
            && self.params == other.params
            && self.headers == other.headers
            && self.consumes == other.consumes
            && self.produces == other.produces
    }

    // Run every filter in order; the error is the stage that rejected the route.
    fn evaluate(
        &self,
        view: &RequestView,
        negotiation: &Negotiation,
    ) -> Result<PathVariables, MatchStage> {
        let vars = self.pattern.matches(view.path()).ok_or(MatchStage::Path)?;

        if !self.methods.is_empty() && !self.methods.contains(view.method()) {
            return Err(MatchStage::Method);
        }
        if !self.params.iter().all(|c| c.matches(view.params())) {
            return Err(MatchStage::Params);
        }
        if !self.headers.iter().all(|c| c.matches(view.headers())) {
            return Err(MatchStage::Headers);
        }
        if !self.consumes.is_empty()
            && !self
                .consumes
                .iter()
                .any(|expr| expr.matches(&negotiation.content_type))
        {
            return Err(MatchStage::Consumes);
        }
        if !self.produces.is_empty()
            && !negotiation.accept.is_empty()
            && !self.produces.iter().any(|expr| {
                negotiation
                    .accept
                    .iter()
                    .any(|accepted| expr.matches(accepted))
            })
        {
            return Err(MatchStage::Produces);
        }

        Ok(vars)
    }
}

/// Index of a registered route, stable for the lifetime of its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(usize);

impl RouteId {
    pub fn index(self) -> usize {
        self.0
    }
}

struct Entry {
    descriptor: RouteDescriptor,
    route: Route,
    handler: HandlerDescriptor,
}

/// The outcome of a successful resolution.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub id: RouteId,
    pub route: &'a RouteDescriptor,
    pub handler: &'a HandlerDescriptor,
    /// Captures of the route's `{name}` segments, verbatim.
    pub path_variables: PathVariables,
    /// A concrete type named in the route's `produces` list, if any.
    pub content_type: Option<String>,
}

/// Registered routes. Built once at startup, read-only afterwards.
///
/// # Examples
///
/// ```
/// use reqbind::handler::HandlerDescriptor;
/// use reqbind::http::{Method, RequestView};
/// use reqbind::router::{RouteDescriptor, RouteError, RouteTable};
///
/// let mut table = RouteTable::new();
/// table
///     .register(RouteDescriptor::get("/mapping/{userid}"), HandlerDescriptor::raw_body("mappingPath"))
///     .unwrap();
///
/// let found = table.resolve(&RequestView::new(Method::Get, "/mapping/userA")).unwrap();
/// assert_eq!(found.handler.name(), "mappingPath");
/// assert_eq!(found.path_variables.get("userid"), Some("userA"));
///
/// let missing = table.resolve(&RequestView::new(Method::Post, "/mapping/userA"));
/// assert!(matches!(missing, Err(RouteError::NoMatch { .. })));
/// ```
#[derive(Default)]
pub struct RouteTable {
    entries: Vec<Entry>,
}

impl RouteTable {
    /// Create a new, empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a route for `handler`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::InvalidPattern`], [`RouteError::InvalidCondition`],
    ///   [`RouteError::InvalidMediaType`]: the descriptor does not parse.
    /// - [`RouteError::InvalidParameter`]: a parameter declaration can never bind.
    /// - [`RouteError::Conflict`]: an identical route is already registered.
    pub fn register(
        &mut self,
        descriptor: RouteDescriptor,
        handler: HandlerDescriptor,
    ) -> Result<RouteId, RouteError> {
        let route = Route::compile(&descriptor)?;

        let variables: Vec<&str> = route.pattern.variables().collect();
        for spec in handler.params() {
            spec.validate(&variables)
                .map_err(|source| RouteError::InvalidParameter {
                    handler: handler.name().to_owned(),
                    source,
                })?;
        }

        if let Some(existing) = self.entries.iter().find(|e| e.route.conflicts_with(&route)) {
            return Err(RouteError::Conflict {
                route: descriptor.to_string(),
                existing: existing.handler.name().to_owned(),
            });
        }

        let id = RouteId(self.entries.len());
        info!(route = %descriptor, handler = handler.name(), "route registered");
        self.entries.push(Entry {
            descriptor,
            route,
            handler,
        });
        Ok(id)
    }

    /// Resolve `view` to the single route that accepts it.
    ///
    /// # Errors
    ///
    /// - [`RouteError::NoMatch`]: no route accepts the request; `stage` tells
    ///   how far the closest route got.
    /// - [`RouteError::Ambiguous`]: more than one route accepts it. This is a
    ///   configuration defect and is never settled by registration order.
    pub fn resolve(&self, view: &RequestView) -> Result<RouteMatch<'_>, RouteError> {
        let negotiation = Negotiation {
            content_type: MediaType::of_request(view.content_type()),
            accept: MediaType::accept_list(view.accept()),
        };

        let mut furthest = MatchStage::Path;
        let mut matched: Vec<(usize, PathVariables)> = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            match entry.route.evaluate(view, &negotiation) {
                Ok(vars) => matched.push((index, vars)),
                Err(stage) => furthest = furthest.max(stage),
            }
        }

        if matched.len() > 1 {
            let candidates: Vec<String> = matched
                .iter()
                .map(|(index, _)| self.entries[*index].handler.name().to_owned())
                .collect();
            warn!(
                method = %view.method(),
                path = view.path(),
                ?candidates,
                "ambiguous route resolution"
            );
            return Err(RouteError::Ambiguous {
                method: view.method().clone(),
                path: view.path().to_owned(),
                candidates,
            });
        }

        let Some((index, path_variables)) = matched.pop() else {
            debug!(method = %view.method(), path = view.path(), stage = %furthest, "no route matched");
            return Err(RouteError::NoMatch {
                method: view.method().clone(),
                path: view.path().to_owned(),
                stage: furthest,
            });
        };

        let entry = &self.entries[index];
        debug!(
            method = %view.method(),
            path = view.path(),
            handler = entry.handler.name(),
            "route resolved"
        );
        Ok(RouteMatch {
            id: RouteId(index),
            route: &entry.descriptor,
            handler: &entry.handler,
            path_variables,
            content_type: entry
                .route
                .produces
                .iter()
                .find_map(MediaTypeExpr::concrete)
                .map(ToString::to_string),
        })
    }

    /// Return the number of registered routes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if no routes have been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered routes in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (RouteId, &RouteDescriptor, &HandlerDescriptor)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (RouteId(i), &e.descriptor, &e.handler))
    }
}
