//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method, ParamMap};

/// Media type whose body contributes to the request parameters.
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// A fully parsed HTTP/1.1 request.
///
/// Created by [`Request::parse`] from a raw byte buffer. The body holds at most
/// `Content-Length` bytes; anything after it belongs to the next request on the
/// connection.
///
/// # Examples
///
/// ```
/// use reqbind::http::request::Request;
///
/// let raw = b"GET /request-param-v2?username=kim&age=20 HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let (request, _offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/request-param-v2");
/// assert_eq!(request.query_params().first("username"), Some("kim"));
/// assert_eq!(request.headers().get("host"), Some("localhost"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    query: Option<String>,
    query_params: ParamMap,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parse a raw HTTP/1.1 request from a byte slice.
    ///
    /// Returns the parsed `Request` and the byte offset at which the body begins
    /// in `buf` (i.e. immediately after the `\r\n\r\n` header terminator).
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: more data is needed to complete the request headers.
    /// - [`RequestError::Parse`]: the data is malformed and cannot be parsed.
    /// - [`RequestError::MissingField`]: a required field (method, path, version) is absent.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method: Method = match raw_req
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse()
        {
            Ok(method) => method,
            Err(never) => match never {},
        };

        let raw_path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;

        let (path, query) = match raw_path.split_once('?') {
            Some((path, query)) => (path.to_owned(), Some(query.to_owned())),
            None => (raw_path.to_owned(), None),
        };

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let query_params = query.as_deref().map(ParamMap::parse).unwrap_or_default();

        // Without Content-Length the body is empty; trailing bytes belong to
        // the next pipelined request.
        let available = &buf[body_offset..];
        let body_len = header_map
            .get("content-length")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .map_or(0, |len| len.min(available.len()));
        let body = Bytes::copy_from_slice(&available[..body_len]);

        Ok((
            Self {
                method,
                path,
                version,
                headers: header_map,
                query,
                query_params,
                body,
            },
            body_offset,
        ))
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the raw query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Returns the decoded query string parameters.
    pub fn query_params(&self) -> &ParamMap {
        &self.query_params
    }

    /// Returns the request parameters: query parameters followed by form body
    /// parameters when the body is `application/x-www-form-urlencoded`.
    pub fn parameters(&self) -> ParamMap {
        let mut params = self.query_params.clone();
        if self.is_form_urlencoded() {
            if let Ok(body) = std::str::from_utf8(&self.body) {
                params.extend(ParamMap::parse(body));
            }
        }
        params
    }

    /// Returns the `Content-Type` header value, if any.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Returns the value of the `Content-Length` header parsed as a `usize`, if present.
    pub fn content_length(&self) -> Option<usize> {
        self.headers.get("content-length")?.trim().parse().ok()
    }

    fn is_form_urlencoded(&self) -> bool {
        self.content_type()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(FORM_URLENCODED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.version(), 1);
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert_eq!(offset, raw.len());
    }

    #[test]
    fn parse_query_string_keeps_repeats() {
        let raw = b"GET /request-param-map?id=1&id=2&username=a%20b HTTP/1.1\r\nHost: x\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.path(), "/request-param-map");
        assert_eq!(req.query_string(), Some("id=1&id=2&username=a%20b"));
        assert_eq!(req.query_params().all("id").collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(req.query_params().first("username"), Some("a b"));
    }

    #[test]
    fn form_body_extends_parameters() {
        let raw = b"POST /request-param-v1?username=q HTTP/1.1\r\n\
            Host: x\r\n\
            Content-Type: application/x-www-form-urlencoded; charset=utf-8\r\n\
            Content-Length: 16\r\n\r\nusername=f&age=3";
        let (req, _) = Request::parse(raw).unwrap();
        let params = req.parameters();
        assert_eq!(params.all("username").collect::<Vec<_>>(), vec!["q", "f"]);
        assert_eq!(params.first("age"), Some("3"));
    }

    #[test]
    fn json_body_does_not_extend_parameters() {
        let raw = b"POST /mapping-consume HTTP/1.1\r\nHost: x\r\n\
            Content-Type: application/json\r\nContent-Length: 7\r\n\r\n{\"a\":1}";
        let (req, _) = Request::parse(raw).unwrap();
        assert!(req.parameters().is_empty());
        assert_eq!(req.content_type(), Some("application/json"));
    }

    #[test]
    fn body_is_capped_at_content_length() {
        let raw = b"POST / HTTP/1.1\r\nHost: x\r\nContent-Length: 5\r\n\r\nhelloGET / HTTP/1.1\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.content_length(), Some(5));
        assert_eq!(&req.body()[..], b"hello");
        assert_eq!(&raw[offset..offset + 5], b"hello");
    }

    #[test]
    fn body_is_empty_without_content_length() {
        let raw = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert!(req.body().is_empty());
    }

    #[test]
    fn incomplete_request() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn keep_alive_defaults() {
        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();
        assert!(req.is_keep_alive());
        let (req, _) = Request::parse(b"GET / HTTP/1.0\r\nHost: x\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());
        let (req, _) =
            Request::parse(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());
    }
}
