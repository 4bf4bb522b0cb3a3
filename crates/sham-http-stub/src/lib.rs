//! Sham is an embeddable HTTP stub server used as a test double for code
//! that issues outbound HTTP calls.
//!
//! A test registers *stubs* (predicates over inbound requests paired with
//! response specifications), starts a listener on an ephemeral local port,
//! drives its system-under-test against [`StubServer::base_url`], and
//! afterwards asks the server to verify that every stub was exercised and
//! that no unanticipated request arrived.
//!
//! ```no_run
//! use sham_http_stub::{StubConfiguration, StubServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = StubServer::start_default().await?;
//!
//!     server
//!         .get(StubConfiguration::new("hello"), |req| {
//!             req.path("/hello");
//!         })
//!         .responds_with(|res| {
//!             res.body("Hello, World!");
//!         })?;
//!
//!     let body = reqwest::get(format!("{}/hello", server.base_url()))
//!         .await?
//!         .text()
//!         .await?;
//!     assert_eq!(body, "Hello, World!");
//!
//!     server.verify_no_unmatched_stubs()?;
//!     server.verify_no_unexpected_requests()?;
//!     server.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! Matching is first-match-wins in registration order (an explicit
//! [`PredicateBuilder::priority`] overrides it), one-shot stubs are consumed
//! race-free under concurrent requests, and anything implementing
//! [`Condition`] can participate in matching.

pub mod error;
pub mod journal;
pub mod predicate;
pub mod registry;
pub mod request;
pub mod response;
pub mod server;
pub mod stub;
pub mod verify;

mod handler;

pub use error::{ConfigError, ServerError, VerificationError};
pub use journal::{CallRecord, JournalMode, RequestJournal, Resolution};
pub use predicate::{Condition, PredicateBuilder, RequestPredicate, DEFAULT_STUB_PRIORITY};
pub use registry::StubRegistry;
pub use request::Request;
pub use response::{ResponseBuilder, ResponseSpec};
pub use server::{BuildingStep, ServerConfiguration, StubServer};
pub use stub::{Stub, StubConfiguration, StubId};

// Re-exported so call sites can name methods and status codes without
// depending on hyper directly.
pub use hyper::{Method, StatusCode};
