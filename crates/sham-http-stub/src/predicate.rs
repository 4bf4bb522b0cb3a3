//! Request predicates: composable conditions over an inbound request.
//!
//! A stub's predicate is a conjunction of [`Condition`]s collected by a
//! [`PredicateBuilder`] and finalized into an immutable [`RequestPredicate`]
//! before registration. Evaluation is read-only against the request
//! snapshot. Anything implementing [`Condition`] participates in matching,
//! so callers can plug in their own conditions without touching the
//! evaluation loop.

use crate::error::ConfigError;
use crate::request::Request;
use hyper::header::HeaderName;
use hyper::Method;
use std::fmt;

/// Default priority assigned when a stub does not specify one.
///
/// Lower values take precedence; the default is the lowest possible
/// precedence, so stubs without explicit priorities are evaluated in
/// registration order.
pub const DEFAULT_STUB_PRIORITY: u32 = u32::MAX;

/// A single condition evaluated against an inbound request.
///
/// All conditions of a predicate must hold for the stub to match.
/// Implementations must not mutate any state: evaluation may run many times,
/// under the registry lock, for requests that end up matched elsewhere.
pub trait Condition: Send + Sync {
    fn evaluate(&self, request: &Request) -> bool;

    /// Short human-readable description, used in log output and
    /// verification failure messages.
    fn describe(&self) -> String;
}

struct MethodIs(Method);

impl Condition for MethodIs {
    fn evaluate(&self, request: &Request) -> bool {
        *request.method() == self.0
    }

    fn describe(&self) -> String {
        format!("method == {}", self.0)
    }
}

struct PathEquals(String);

impl Condition for PathEquals {
    fn evaluate(&self, request: &Request) -> bool {
        request.path() == self.0
    }

    fn describe(&self) -> String {
        format!("path == '{}'", self.0)
    }
}

/// Header name lookup is case-insensitive; the value comparison is exact.
/// Matches if any value of a repeated header equals the expected one.
struct HeaderEquals {
    name: HeaderName,
    value: String,
}

impl Condition for HeaderEquals {
    fn evaluate(&self, request: &Request) -> bool {
        request
            .headers()
            .get_all(&self.name)
            .iter()
            .any(|v| v.to_str().map(|s| s == self.value).unwrap_or(false))
    }

    fn describe(&self) -> String {
        format!("header '{}' == '{}'", self.name, self.value)
    }
}

struct BodyContains(String);

impl Condition for BodyContains {
    fn evaluate(&self, request: &Request) -> bool {
        request.body_text().contains(&self.0)
    }

    fn describe(&self) -> String {
        format!("body contains '{}'", self.0)
    }
}

struct BodyJsonEquals(serde_json::Value);

impl Condition for BodyJsonEquals {
    fn evaluate(&self, request: &Request) -> bool {
        request.body_json().as_ref() == Some(&self.0)
    }

    fn describe(&self) -> String {
        format!("body json == {}", self.0)
    }
}

struct Custom {
    description: String,
    predicate: Box<dyn Fn(&Request) -> bool + Send + Sync>,
}

impl Condition for Custom {
    fn evaluate(&self, request: &Request) -> bool {
        (self.predicate)(request)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

/// Finalized, immutable conjunction of conditions.
pub struct RequestPredicate {
    conditions: Vec<Box<dyn Condition>>,
    path: Option<String>,
    priority: u32,
}

impl RequestPredicate {
    /// True only if every condition holds. An empty predicate matches any
    /// request.
    pub fn matches(&self, request: &Request) -> bool {
        self.conditions.iter().all(|c| c.evaluate(request))
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Exact path this predicate requires, if a path condition was set.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn describe(&self) -> String {
        if self.conditions.is_empty() {
            "any request".to_string()
        } else {
            self.conditions
                .iter()
                .map(|c| c.describe())
                .collect::<Vec<_>>()
                .join(" and ")
        }
    }
}

impl fmt::Debug for RequestPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestPredicate")
            .field("conditions", &self.describe())
            .field("priority", &self.priority)
            .finish()
    }
}

/// Mutable collector of conditions, finalized by [`PredicateBuilder::build`].
///
/// Contradictory exact conditions (two different paths, two different
/// methods) are recorded as a [`ConfigError`] and surfaced when the stub is
/// registered.
pub struct PredicateBuilder {
    method: Option<Method>,
    path: Option<String>,
    headers: Vec<(String, String)>,
    extra: Vec<Box<dyn Condition>>,
    priority: u32,
    error: Option<ConfigError>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            headers: Vec::new(),
            extra: Vec::new(),
            priority: DEFAULT_STUB_PRIORITY,
            error: None,
        }
    }

    /// Require an exact HTTP method.
    pub fn method(&mut self, method: Method) -> &mut Self {
        match &self.method {
            Some(existing) if *existing != method => {
                self.fail(ConfigError::ConflictingMethod(existing.clone(), method));
            }
            _ => self.method = Some(method),
        }
        self
    }

    /// Require an exact request path (query string excluded).
    pub fn path(&mut self, path: impl Into<String>) -> &mut Self {
        let path = path.into();
        match &self.path {
            Some(existing) if *existing != path => {
                self.fail(ConfigError::ConflictingPath(existing.clone(), path));
            }
            _ => self.path = Some(path),
        }
        self
    }

    /// Require a header with the given name (case-insensitive) and exact
    /// value.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Require the body to contain the given substring.
    pub fn body_contains(&mut self, needle: impl Into<String>) -> &mut Self {
        self.extra.push(Box::new(BodyContains(needle.into())));
        self
    }

    /// Require the body to parse as JSON equal to the given value.
    pub fn body_json(&mut self, value: serde_json::Value) -> &mut Self {
        self.extra.push(Box::new(BodyJsonEquals(value)));
        self
    }

    /// Add a custom condition from a plain function. The description shows
    /// up in logs and verification messages.
    pub fn matching<F>(&mut self, description: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        self.extra.push(Box::new(Custom {
            description: description.into(),
            predicate: Box::new(predicate),
        }));
        self
    }

    /// Add a pre-built condition.
    pub fn condition(&mut self, condition: Box<dyn Condition>) -> &mut Self {
        self.extra.push(condition);
        self
    }

    /// Explicit match priority. Lower values win; ties are broken by
    /// registration order.
    pub fn priority(&mut self, priority: u32) -> &mut Self {
        self.priority = priority;
        self
    }

    fn fail(&mut self, error: ConfigError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    pub(crate) fn build(self) -> Result<RequestPredicate, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let mut conditions: Vec<Box<dyn Condition>> = Vec::new();
        if let Some(method) = self.method {
            conditions.push(Box::new(MethodIs(method)));
        }
        if let Some(path) = &self.path {
            conditions.push(Box::new(PathEquals(path.clone())));
        }
        for (name, value) in self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeaderName(name.clone()))?;
            conditions.push(Box::new(HeaderEquals {
                name: header,
                value,
            }));
        }
        conditions.extend(self.extra);
        Ok(RequestPredicate {
            conditions,
            path: self.path,
            priority: self.priority,
        })
    }
}

impl Default for PredicateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
