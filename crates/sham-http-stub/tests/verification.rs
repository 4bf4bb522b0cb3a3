//! End-to-end tests for the verification interface, the call journal, and
//! server lifecycle.

use reqwest::Client;
use sham_http_stub::{
    JournalMode, ServerConfiguration, ServerError, StubConfiguration, StubServer,
    VerificationError,
};

async fn start_server() -> StubServer {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    StubServer::start_default()
        .await
        .expect("failed to start stub server")
}

// =============================================================================
// verify_no_unmatched_stubs
// =============================================================================

#[tokio::test]
async fn test_no_unmatched_stubs_passes_with_empty_registry() {
    let server = start_server().await;
    assert!(server.verify_no_unmatched_stubs().is_ok());
}

#[tokio::test]
async fn test_no_unmatched_stubs_passes_once_stub_is_matched() {
    let server = start_server().await;
    server
        .get(StubConfiguration::new("matched"), |req| {
            req.path("/matched-stub");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    reqwest::get(format!("{}/matched-stub", server.base_url()))
        .await
        .unwrap();

    assert!(server.verify_no_unmatched_stubs().is_ok());
    assert!(server.find_all_unmatched_stubs().is_empty());
}

#[tokio::test]
async fn test_unmatched_stub_failure_message_contains_the_path() {
    let server = start_server().await;
    server
        .get(StubConfiguration::new("never called"), |req| {
            req.path("/never-called");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    let error = server.verify_no_unmatched_stubs().unwrap_err();
    assert!(matches!(error, VerificationError::UnmatchedStubs(_)));
    assert!(error.to_string().contains("/never-called"));
    assert!(error.to_string().contains("never called"));
}

#[tokio::test]
async fn test_unmatched_stub_failure_enumerates_all_offenders() {
    let server = start_server().await;
    for path in ["/alpha", "/beta"] {
        server
            .get(StubConfiguration::new(format!("stub for {path}")), |req| {
                req.path(path);
            })
            .responds_with(|res| {
                res.body("ok");
            })
            .unwrap();
    }

    let message = server.verify_no_unmatched_stubs().unwrap_err().to_string();
    assert!(message.contains("/alpha"));
    assert!(message.contains("/beta"));
}

// =============================================================================
// verify_no_unexpected_requests
// =============================================================================

#[tokio::test]
async fn test_no_unexpected_requests_passes_when_nothing_arrived() {
    let server = start_server().await;
    assert!(server.verify_no_unexpected_requests().is_ok());
}

#[tokio::test]
async fn test_no_unexpected_requests_passes_when_all_requests_matched() {
    let server = start_server().await;
    server
        .get(StubConfiguration::new("matched"), |req| {
            req.path("/matched");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    reqwest::get(format!("{}/matched", server.base_url()))
        .await
        .unwrap();

    assert!(server.verify_no_unexpected_requests().is_ok());
}

#[tokio::test]
async fn test_unexpected_request_failure_message_contains_the_path() {
    let server = start_server().await;

    reqwest::get(format!("{}/no-stub-path", server.base_url()))
        .await
        .unwrap();

    let error = server.verify_no_unexpected_requests().unwrap_err();
    assert!(matches!(error, VerificationError::UnexpectedRequests(_)));
    assert!(error.to_string().contains("/no-stub-path"));
}

#[tokio::test]
async fn test_verification_is_repeatable() {
    let server = start_server().await;
    reqwest::get(format!("{}/stray", server.base_url()))
        .await
        .unwrap();

    for _ in 0..3 {
        let error = server.verify_no_unexpected_requests().unwrap_err();
        assert!(error.to_string().contains("/stray"));
    }
}

// =============================================================================
// Journal modes and reset
// =============================================================================

#[tokio::test]
async fn test_full_journal_records_matched_and_unmatched_requests() {
    let server = start_server().await;
    server
        .get(StubConfiguration::new("known"), |req| {
            req.path("/known");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    let base = server.base_url().to_string();
    reqwest::get(format!("{base}/known")).await.unwrap();
    reqwest::get(format!("{base}/unknown")).await.unwrap();

    let unexpected = server.find_all_unexpected_requests();
    assert_eq!(unexpected.len(), 1);
    assert_eq!(unexpected[0].request().path(), "/unknown");
}

#[tokio::test]
async fn test_lean_journal_still_catches_unexpected_requests() {
    let config = ServerConfiguration {
        journal_mode: JournalMode::Lean,
        ..ServerConfiguration::default()
    };
    let server = StubServer::start(config).await.unwrap();
    server
        .get(StubConfiguration::new("known"), |req| {
            req.path("/known");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    let base = server.base_url().to_string();
    reqwest::get(format!("{base}/known")).await.unwrap();
    reqwest::get(format!("{base}/unknown")).await.unwrap();

    assert!(server.verify_no_unmatched_stubs().is_ok());
    let error = server.verify_no_unexpected_requests().unwrap_err();
    assert!(error.to_string().contains("/unknown"));
}

#[tokio::test]
async fn test_reset_clears_match_counts_and_journal() {
    let server = start_server().await;
    server
        .get(StubConfiguration::new("recurring"), |req| {
            req.path("/recurring");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    let base = server.base_url().to_string();
    reqwest::get(format!("{base}/recurring")).await.unwrap();
    reqwest::get(format!("{base}/stray")).await.unwrap();

    assert!(server.verify_no_unmatched_stubs().is_ok());
    assert!(server.verify_no_unexpected_requests().is_err());

    server.reset();

    // Counters are back to zero and the journal is empty.
    assert!(server.verify_no_unmatched_stubs().is_err());
    assert!(server.verify_no_unexpected_requests().is_ok());
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_base_url_reflects_the_bound_port() {
    let server = start_server().await;
    assert_ne!(server.port(), 0);
    assert_eq!(
        server.base_url(),
        format!("http://127.0.0.1:{}", server.port())
    );
}

#[tokio::test]
async fn test_two_servers_bind_distinct_ports() {
    let first = start_server().await;
    let second = start_server().await;
    assert_ne!(first.port(), second.port());
}

#[tokio::test]
async fn test_shutdown_releases_the_listener() {
    let server = start_server().await;
    let url = format!("{}/anything", server.base_url());

    server.shutdown().await.unwrap();

    let result = Client::new().get(&url).send().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_shutdown_twice_is_an_error() {
    let server = start_server().await;
    server.shutdown().await.unwrap();
    assert!(matches!(
        server.shutdown().await,
        Err(ServerError::AlreadyStopped)
    ));
}

#[tokio::test]
async fn test_shutdown_without_any_requests_is_clean() {
    let server = start_server().await;
    assert!(server.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_verification_still_works_after_shutdown() {
    let server = start_server().await;
    server
        .get(StubConfiguration::new("late check"), |req| {
            req.path("/late");
        })
        .responds_with(|res| {
            res.body("ok");
        })
        .unwrap();

    reqwest::get(format!("{}/late", server.base_url()))
        .await
        .unwrap();
    server.shutdown().await.unwrap();

    assert!(server.verify_no_unmatched_stubs().is_ok());
    assert!(server.verify_no_unexpected_requests().is_ok());
}
