//! Server lifecycle and the fluent stub-registration facade.
//!
//! [`StubServer::start`] binds a listener (an ephemeral port by default),
//! spawns the accept loop, and returns once ready to serve. Stubs are
//! registered through the method helpers (`get`, `post`, ...) which hand out
//! a [`BuildingStep`]; attaching a response with
//! [`BuildingStep::responds_with`] finalizes and registers the stub.
//! [`StubServer::shutdown`] stops the listener deterministically, and `Drop`
//! signals it as a backstop so teardown runs on every exit path.

use crate::error::{ConfigError, ServerError, VerificationError};
use crate::handler::handle_request;
use crate::journal::{CallRecord, JournalMode, RequestJournal};
use crate::predicate::PredicateBuilder;
use crate::registry::StubRegistry;
use crate::response::ResponseBuilder;
use crate::stub::{Stub, StubConfiguration, StubId};
use crate::verify;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Method;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Configuration for a [`StubServer`].
#[derive(Debug, Clone)]
pub struct ServerConfiguration {
    /// Interface to bind. Defaults to `127.0.0.1`.
    pub host: String,
    /// Port to bind. `0` (the default) picks an ephemeral port.
    pub port: u16,
    /// Verbose logging of every match decision.
    pub verbose: bool,
    /// Which requests the call journal records.
    pub journal_mode: JournalMode,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            verbose: false,
            journal_mode: JournalMode::default(),
        }
    }
}

/// An embedded HTTP stub server.
///
/// Scoped to one test: create it where it is used, drive the
/// system-under-test against [`StubServer::base_url`], verify, and shut it
/// down (dropping the server also stops the listener).
pub struct StubServer {
    registry: Arc<StubRegistry>,
    journal: Arc<RequestJournal>,
    port: u16,
    base_url: String,
    shutdown_tx: broadcast::Sender<()>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl StubServer {
    /// Bind the listener and start serving. Returns once the server is
    /// ready; the resolved port is available via [`StubServer::port`].
    pub async fn start(config: ServerConfiguration) -> Result<Self, ServerError> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| ServerError::Bind {
            addr: addr.clone(),
            source: e,
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| ServerError::Bind { addr, source: e })?
            .port();

        let registry = Arc::new(StubRegistry::new());
        let journal = Arc::new(RequestJournal::new(config.journal_mode));
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let accept_registry = Arc::clone(&registry);
        let accept_journal = Arc::clone(&journal);
        let conn_shutdown = shutdown_tx.clone();
        let verbose = config.verbose;
        let accept_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                let registry = Arc::clone(&accept_registry);
                                let journal = Arc::clone(&accept_journal);
                                let mut shutdown_rx = conn_shutdown.subscribe();
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let registry = Arc::clone(&registry);
                                        let journal = Arc::clone(&journal);
                                        async move {
                                            handle_request(req, registry, journal, verbose).await
                                        }
                                    });
                                    let conn = http1::Builder::new().serve_connection(io, service);
                                    tokio::pin!(conn);
                                    tokio::select! {
                                        result = conn.as_mut() => {
                                            if let Err(e) = result {
                                                debug!(client = %addr, error = %e, "connection error");
                                            }
                                        }
                                        _ = shutdown_rx.recv() => {
                                            // Finish the in-flight exchange, then close.
                                            conn.as_mut().graceful_shutdown();
                                            if let Err(e) = conn.as_mut().await {
                                                debug!(client = %addr, error = %e, "connection error");
                                            }
                                        }
                                    }
                                });
                            }
                            Err(e) => {
                                error!(error = %e, "accept error");
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("accept loop stopping");
                        break;
                    }
                }
            }
        });

        info!(host = %config.host, port, "stub server listening");
        Ok(Self {
            registry,
            journal,
            port,
            base_url: format!("http://{}:{}", config.host, port),
            shutdown_tx,
            accept_task: Mutex::new(Some(accept_task)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Start with the default configuration: `127.0.0.1`, ephemeral port.
    pub async fn start_default() -> Result<Self, ServerError> {
        Self::start(ServerConfiguration::default()).await
    }

    /// The port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Scheme, host, and port of the listener, e.g. `http://127.0.0.1:49301`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop accepting connections and release the listener. In-flight
    /// requests have already journaled their outcome by the time their
    /// response completes. Calling this twice is an error.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyStopped);
        }
        let _ = self.shutdown_tx.send(());
        let task = self.accept_task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        info!(port = self.port, "stub server stopped");
        Ok(())
    }

    // ===== Stub registration =====

    /// Register a stub matching the given HTTP method, with further
    /// conditions collected by `spec`.
    pub fn method<F>(
        &self,
        method: Method,
        configuration: StubConfiguration,
        spec: F,
    ) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        let mut builder = PredicateBuilder::new();
        spec(&mut builder);
        builder.method(method);
        BuildingStep {
            registry: Arc::clone(&self.registry),
            configuration,
            predicate: builder,
        }
    }

    pub fn get<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::GET, configuration, spec)
    }

    pub fn post<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::POST, configuration, spec)
    }

    pub fn put<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::PUT, configuration, spec)
    }

    pub fn delete<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::DELETE, configuration, spec)
    }

    pub fn patch<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::PATCH, configuration, spec)
    }

    pub fn head<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::HEAD, configuration, spec)
    }

    pub fn options<F>(&self, configuration: StubConfiguration, spec: F) -> BuildingStep
    where
        F: FnOnce(&mut PredicateBuilder),
    {
        self.method(Method::OPTIONS, configuration, spec)
    }

    /// Unregister a stub. Idempotent.
    pub fn remove_stub(&self, id: StubId) -> bool {
        self.registry.remove(id)
    }

    /// Snapshot of all registered stubs, in evaluation order.
    pub fn stubs(&self) -> Vec<Arc<Stub>> {
        self.registry.snapshot()
    }

    // ===== Verification =====

    /// All registered stubs never matched by a request.
    pub fn find_all_unmatched_stubs(&self) -> Vec<Arc<Stub>> {
        verify::find_all_unmatched_stubs(&self.registry)
    }

    /// All requests that arrived with no matching stub.
    pub fn find_all_unexpected_requests(&self) -> Vec<CallRecord> {
        verify::find_all_unexpected_requests(&self.journal)
    }

    /// Fails if any registered stub was never matched. The message names
    /// each offending stub and its predicate, including its path.
    pub fn verify_no_unmatched_stubs(&self) -> Result<(), VerificationError> {
        verify::verify_no_unmatched_stubs(&self.registry)
    }

    /// Fails if any request arrived that no stub matched. The message names
    /// each offending request's method and path.
    pub fn verify_no_unexpected_requests(&self) -> Result<(), VerificationError> {
        verify::verify_no_unexpected_requests(&self.journal)
    }

    /// Reset match counters and clear the call journal, e.g. between
    /// scenarios sharing one server.
    pub fn reset(&self) {
        self.registry.reset_match_counts();
        self.journal.clear();
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        // Teardown backstop: stop the listener even when the owner never
        // called shutdown (e.g. a panicking test).
        if !self.stopped.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
        }
    }
}

/// Second half of the fluent registration API: a predicate waiting for its
/// response definition.
#[must_use = "a stub is only registered once responds_with is called"]
pub struct BuildingStep {
    registry: Arc<StubRegistry>,
    configuration: StubConfiguration,
    predicate: PredicateBuilder,
}

impl BuildingStep {
    /// Attach the response definition, finalize both builders, and register
    /// the stub. Malformed stubs are rejected here, not at match time.
    pub fn responds_with<F>(self, spec: F) -> Result<StubId, ConfigError>
    where
        F: FnOnce(&mut ResponseBuilder),
    {
        let predicate = self.predicate.build()?;
        let mut builder = ResponseBuilder::new();
        spec(&mut builder);
        let response = builder.build()?;
        let stub = Stub::new(self.configuration, predicate, response)?;
        Ok(self.registry.register(stub))
    }
}
