//! Response specifications: the declarative description of the reply a
//! matched stub produces.
//!
//! A [`ResponseBuilder`] collects status, headers, and a body source, and is
//! finalized into an immutable [`ResponseSpec`] at registration time. Header
//! insertion order is preserved in the emitted response, and nothing is
//! injected beyond what the caller configured.

use crate::error::ConfigError;
use crate::request::Request;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Response, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Source of the response body.
///
/// `Dynamic` bodies are computed from the matched request snapshot; they
/// must be deterministic for deterministic input unless the caller's own
/// function introduces randomness.
#[derive(Clone)]
pub(crate) enum Body {
    Empty,
    Fixed(Bytes),
    Dynamic(Arc<dyn Fn(&Request) -> Bytes + Send + Sync>),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Empty"),
            Body::Fixed(bytes) => write!(f, "Fixed({} bytes)", bytes.len()),
            Body::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Finalized, immutable response specification.
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Body,
    delay: Duration,
}

impl ResponseSpec {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers in the order they were configured.
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// Artificial delay applied before the response is written.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub(crate) fn body_bytes(&self, request: &Request) -> Bytes {
        match &self.body {
            Body::Empty => Bytes::new(),
            Body::Fixed(bytes) => bytes.clone(),
            Body::Dynamic(f) => f(request),
        }
    }

    /// Render the HTTP response for the given matched request.
    pub(crate) fn render(&self, request: &Request) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body_bytes(request)));
        *response.status_mut() = self.status;
        for (name, value) in &self.headers {
            response.headers_mut().append(name.clone(), value.clone());
        }
        response
    }
}

/// Mutable collector for a [`ResponseSpec`].
pub struct ResponseBuilder {
    status: u16,
    headers: Vec<(String, String)>,
    body: Body,
    delay: Duration,
    error: Option<ConfigError>,
}

impl ResponseBuilder {
    pub(crate) fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Body::Empty,
            delay: Duration::ZERO,
            error: None,
        }
    }

    /// Response status code. Defaults to 200.
    pub fn status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    /// Append a response header. Order is preserved on output.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Fixed response body.
    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Body::Fixed(body.into());
        self
    }

    /// JSON response body. Also appends a `content-type: application/json`
    /// header, since the caller asked for JSON explicitly.
    pub fn json<T: serde::Serialize>(&mut self, value: &T) -> &mut Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.headers
                    .push(("content-type".to_string(), "application/json".to_string()));
                self.body = Body::Fixed(Bytes::from(bytes));
            }
            Err(e) => self.fail(ConfigError::JsonBody(e.to_string())),
        }
        self
    }

    /// Body computed from the matched request snapshot.
    pub fn body_from<F, B>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Request) -> B + Send + Sync + 'static,
        B: Into<Bytes>,
    {
        self.body = Body::Dynamic(Arc::new(move |request| f(request).into()));
        self
    }

    /// Delay the response by the given duration.
    pub fn delay(&mut self, delay: Duration) -> &mut Self {
        self.delay = delay;
        self
    }

    fn fail(&mut self, error: ConfigError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn build(self) -> Result<ResponseSpec, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let status =
            StatusCode::from_u16(self.status).map_err(|_| ConfigError::InvalidStatus(self.status))?;
        let mut headers = Vec::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name.clone()))?;
            let header_value = HeaderValue::from_str(&value)
                .map_err(|_| ConfigError::InvalidHeaderValue(name.clone()))?;
            headers.push((header_name, header_value));
        }
        Ok(ResponseSpec {
            status,
            headers,
            body: self.body,
            delay: self.delay,
        })
    }
}
