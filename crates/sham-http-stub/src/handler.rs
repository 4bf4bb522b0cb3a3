//! Per-request dispatch: snapshot the request, claim a matching stub,
//! render its response or a 404, and journal the outcome.

use crate::journal::RequestJournal;
use crate::registry::StubRegistry;
use crate::request::Request;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle one inbound request. Exactly one journal append happens per
/// invocation, after the match decision; matching and response failures
/// never escape as errors.
pub(crate) async fn handle_request(
    req: hyper::Request<Incoming>,
    registry: Arc<StubRegistry>,
    journal: Arc<RequestJournal>,
    verbose: bool,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            debug!(error = %e, "failed to read request body, treating as empty");
            Bytes::new()
        }
    };
    let snapshot = Request::new(
        parts.method,
        parts.uri.path().to_string(),
        parts.uri.query().map(str::to_string),
        parts.headers,
        body,
    );

    match registry.find_and_claim(&snapshot) {
        Some(stub) => {
            if verbose || stub.configuration().is_verbose() {
                info!(request = %snapshot, stub = %stub.log_string(), "request matched");
            }
            journal.record_matched(snapshot.clone(), stub.id());

            let spec = stub.response();
            if !spec.delay().is_zero() {
                tokio::time::sleep(spec.delay()).await;
            }
            Ok(spec.render(&snapshot))
        }
        None => {
            warn!(request = %snapshot, "no matching stub");
            journal.record_unmatched(snapshot.clone());
            Ok(not_found(&snapshot))
        }
    }
}

fn not_found(request: &Request) -> Response<Full<Bytes>> {
    let body = format!("No matching stub for request: {request}");
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
