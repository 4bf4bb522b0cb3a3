//! Error types for stub construction, server lifecycle, and verification.

use thiserror::Error;

/// Errors raised while building or registering a stub.
///
/// Malformed stubs are rejected at registration time, never deferred to
/// match time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("stub name must not be empty")]
    MissingName,
    #[error("conflicting path conditions: '{0}' vs '{1}'")]
    ConflictingPath(String, String),
    #[error("conflicting method conditions: {0} vs {1}")]
    ConflictingMethod(hyper::Method, hyper::Method),
    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),
    #[error("invalid header value for '{0}'")]
    InvalidHeaderValue(String),
    #[error("invalid status code {0}")]
    InvalidStatus(u16),
    #[error("failed to serialize JSON body: {0}")]
    JsonBody(String),
}

/// Errors raised by server start and shutdown.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server already stopped")]
    AlreadyStopped,
}

/// Verification failures, raised by the post-test assertions.
///
/// Each variant carries the structured list of offending identifiers; the
/// `Display` rendering joins them into a single human-readable message that
/// contains the offending path(s) as substrings.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("the following stubs were never matched: {}", .0.join("; "))]
    UnmatchedStubs(Vec<String>),
    #[error("the following requests were unexpected: {}", .0.join("; "))]
    UnexpectedRequests(Vec<String>),
}
