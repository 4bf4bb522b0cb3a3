//! Immutable request snapshots.
//!
//! A [`Request`] is captured once per inbound connection, after the body has
//! been collected, and is never mutated afterwards. Predicates evaluate
//! against it, dynamic response bodies receive it, and the journal stores it.

use bytes::Bytes;
use hyper::{HeaderMap, Method};
use std::borrow::Cow;
use std::fmt;

/// Immutable snapshot of an inbound HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        Self {
            method,
            path,
            query,
            headers,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of the given header, if present and valid UTF-8.
    /// Header name lookup is case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Request body decoded as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Request body parsed as JSON, if it is valid JSON.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderName, HeaderValue};

    fn request_with_header(name: &str, value: &str) -> Request {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        Request::new(
            Method::GET,
            "/orders".to_string(),
            Some("page=2".to_string()),
            headers,
            Bytes::from_static(b"{\"id\":1}"),
        )
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = request_with_header("X-Api-Key", "secret");
        assert_eq!(request.header("x-api-key"), Some("secret"));
        assert_eq!(request.header("X-API-KEY"), Some("secret"));
        assert_eq!(request.header("x-other"), None);
    }

    #[test]
    fn test_body_accessors() {
        let request = request_with_header("content-type", "application/json");
        assert_eq!(request.body_text(), "{\"id\":1}");
        assert_eq!(request.body_json(), Some(serde_json::json!({"id": 1})));
    }

    #[test]
    fn test_display_includes_method_path_and_query() {
        let request = request_with_header("accept", "*/*");
        assert_eq!(request.to_string(), "GET /orders?page=2");
    }
}
