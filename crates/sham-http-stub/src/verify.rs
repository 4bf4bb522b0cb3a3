//! Post-hoc verification over the registry and the call journal.
//!
//! Both checks are read-only and idempotent: they may be called repeatedly
//! (typically at test teardown) and return consistent results as long as no
//! further requests arrive in between.

use crate::error::VerificationError;
use crate::journal::{CallRecord, RequestJournal};
use crate::registry::StubRegistry;
use crate::stub::Stub;
use std::sync::Arc;

/// All registered stubs whose match counter is still zero.
pub fn find_all_unmatched_stubs(registry: &StubRegistry) -> Vec<Arc<Stub>> {
    registry
        .snapshot()
        .into_iter()
        .filter(|s| s.match_count() == 0)
        .collect()
}

/// All journal records for requests no stub matched.
pub fn find_all_unexpected_requests(journal: &RequestJournal) -> Vec<CallRecord> {
    journal.unmatched()
}

/// Fails if any registered stub was never matched by a request. The failure
/// message enumerates each offending stub, including its name and predicate
/// description.
pub fn verify_no_unmatched_stubs(registry: &StubRegistry) -> Result<(), VerificationError> {
    let unmatched: Vec<String> = find_all_unmatched_stubs(registry)
        .iter()
        .map(|s| s.log_string())
        .collect();
    if unmatched.is_empty() {
        Ok(())
    } else {
        Err(VerificationError::UnmatchedStubs(unmatched))
    }
}

/// Fails if the journal contains requests that no stub matched. The failure
/// message enumerates each offending request's method and path.
pub fn verify_no_unexpected_requests(journal: &RequestJournal) -> Result<(), VerificationError> {
    let unexpected: Vec<String> = find_all_unexpected_requests(journal)
        .iter()
        .map(|r| r.request().to_string())
        .collect();
    if unexpected.is_empty() {
        Ok(())
    } else {
        Err(VerificationError::UnexpectedRequests(unexpected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalMode;
    use crate::predicate::PredicateBuilder;
    use crate::request::Request;
    use crate::response::ResponseBuilder;
    use crate::stub::{Stub, StubConfiguration};
    use bytes::Bytes;
    use hyper::{HeaderMap, Method};

    fn request(path: &str) -> Request {
        Request::new(
            Method::GET,
            path.to_string(),
            None,
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    fn registry_with_stub(path: &str) -> StubRegistry {
        let registry = StubRegistry::new();
        let mut predicate = PredicateBuilder::new();
        predicate.path(path);
        registry.register(
            Stub::new(
                StubConfiguration::new("lonely"),
                predicate.build().unwrap(),
                ResponseBuilder::new().build().unwrap(),
            )
            .unwrap(),
        );
        registry
    }

    #[test]
    fn test_unmatched_stub_failure_contains_the_path() {
        let registry = registry_with_stub("/never-called");

        let error = verify_no_unmatched_stubs(&registry).unwrap_err();
        assert!(error.to_string().contains("/never-called"));
        assert!(error.to_string().contains("lonely"));
    }

    #[test]
    fn test_matched_stub_passes_verification() {
        let registry = registry_with_stub("/called");
        registry.find_and_claim(&request("/called")).unwrap();

        assert!(verify_no_unmatched_stubs(&registry).is_ok());
        assert!(find_all_unmatched_stubs(&registry).is_empty());
    }

    #[test]
    fn test_empty_registry_passes_verification() {
        let registry = StubRegistry::new();
        assert!(verify_no_unmatched_stubs(&registry).is_ok());
    }

    #[test]
    fn test_unexpected_request_failure_contains_the_path() {
        let journal = RequestJournal::new(JournalMode::Full);
        journal.record_unmatched(request("/no-stub-path"));

        let error = verify_no_unexpected_requests(&journal).unwrap_err();
        assert!(error.to_string().contains("/no-stub-path"));
    }

    #[test]
    fn test_empty_journal_passes_verification() {
        let journal = RequestJournal::new(JournalMode::Full);
        assert!(verify_no_unexpected_requests(&journal).is_ok());
    }

    #[test]
    fn test_verification_is_idempotent() {
        let registry = registry_with_stub("/idempotent");
        let journal = RequestJournal::new(JournalMode::Full);
        journal.record_unmatched(request("/stray"));

        for _ in 0..3 {
            assert!(verify_no_unmatched_stubs(&registry).is_err());
            assert!(verify_no_unexpected_requests(&journal).is_err());
        }
        // Verification must not have consumed or mutated anything.
        assert_eq!(registry.len(), 1);
        assert_eq!(journal.unmatched().len(), 1);
    }
}
