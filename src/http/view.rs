//! Read-only per-request snapshot consumed by routing and binding.

use super::{Headers, Method, ParamMap, Request};

/// Variables captured from `{name}` segments of the matched route pattern,
/// in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables {
    entries: Vec<(String, String)>,
}

impl PathVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything the route table and the binder are allowed to look at.
///
/// A view is built once per request, either from a parsed [`Request`] or
/// directly with the builder methods, and is never shared between requests.
/// Path variables are empty until [`with_path_variables`](Self::with_path_variables)
/// attaches the captures of a successful match.
///
/// # Examples
///
/// ```
/// use reqbind::http::{Method, RequestView};
///
/// let view = RequestView::new(Method::Get, "/mapping-param")
///     .param("mode", "debug")
///     .header("Accept", "text/html");
///
/// assert_eq!(view.params().first("mode"), Some("debug"));
/// assert_eq!(view.accept(), Some("text/html"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestView {
    method: Method,
    path: String,
    params: ParamMap,
    headers: Headers,
    path_variables: PathVariables,
}

impl RequestView {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: ParamMap::new(),
            headers: Headers::new(),
            path_variables: PathVariables::new(),
        }
    }

    /// Snapshot of a parsed request; form body parameters are included.
    pub fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            path: request.path().to_owned(),
            params: request.parameters(),
            headers: request.headers().clone(),
            path_variables: PathVariables::new(),
        }
    }

    /// Appends a query/form parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.append(name, value);
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Attaches the captures produced by route matching.
    #[must_use]
    pub fn with_path_variables(mut self, path_variables: PathVariables) -> Self {
        self.path_variables = path_variables;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn path_variables(&self) -> &PathVariables {
        &self.path_variables
    }

    /// Declared `Content-Type`, parameters included.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Raw `Accept` header; `None` means the client has no preference.
    pub fn accept(&self) -> Option<&str> {
        self.headers.get("accept")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_request_copies_parameters_and_headers() {
        let raw = b"POST /p?a=1 HTTP/1.1\r\nHost: x\r\n\
            Content-Type: application/x-www-form-urlencoded\r\nContent-Length: 3\r\n\r\na=2";
        let (req, _) = Request::parse(raw).unwrap();
        let view = RequestView::from_request(&req);
        assert_eq!(view.method(), &Method::Post);
        assert_eq!(view.path(), "/p");
        assert_eq!(view.params().all("a").collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(view.content_type(), Some("application/x-www-form-urlencoded"));
        assert!(view.path_variables().is_empty());
    }

    #[test]
    fn path_variables_attach_after_matching() {
        let mut vars = PathVariables::new();
        vars.insert("userId", "42");
        let view = RequestView::new(Method::Get, "/mapping/42").with_path_variables(vars);
        assert_eq!(view.path_variables().get("userId"), Some("42"));
        assert_eq!(view.path_variables().get("other"), None);
    }

    #[test]
    fn accept_absent_without_header() {
        let view = RequestView::new(Method::Get, "/");
        assert_eq!(view.accept(), None);
        assert_eq!(view.content_type(), None);
    }
}
