//! Stub definitions: a registered (predicate, response, configuration)
//! triple, the unit the registry owns.

use crate::error::ConfigError;
use crate::predicate::RequestPredicate;
use crate::response::ResponseSpec;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

// Creation-order counter; ids double as registration-order tiebreakers.
static STUB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stable identity of a registered stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StubId(u64);

impl StubId {
    fn next() -> Self {
        StubId(STUB_COUNTER.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl fmt::Display for StubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behavior and attributes of a stub: its diagnostic name, whether it is
/// consumed by its first match, and per-stub verbose logging.
#[derive(Debug, Clone)]
pub struct StubConfiguration {
    name: String,
    remove_after_match: bool,
    verbose: bool,
}

impl StubConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remove_after_match: false,
            verbose: false,
        }
    }

    /// Remove the stub from the registry after its first successful match.
    pub fn remove_after_match(mut self, remove: bool) -> Self {
        self.remove_after_match = remove;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_remove_after_match(&self) -> bool {
        self.remove_after_match
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// A registered stub. Owned exclusively by the registry from registration
/// until removal.
pub struct Stub {
    id: StubId,
    configuration: StubConfiguration,
    predicate: RequestPredicate,
    response: ResponseSpec,
    match_count: AtomicU32,
}

impl Stub {
    pub(crate) fn new(
        configuration: StubConfiguration,
        predicate: RequestPredicate,
        response: ResponseSpec,
    ) -> Result<Self, ConfigError> {
        if configuration.name.trim().is_empty() {
            return Err(ConfigError::MissingName);
        }
        Ok(Self {
            id: StubId::next(),
            configuration,
            predicate,
            response,
            match_count: AtomicU32::new(0),
        })
    }

    pub fn id(&self) -> StubId {
        self.id
    }

    pub fn configuration(&self) -> &StubConfiguration {
        &self.configuration
    }

    pub fn predicate(&self) -> &RequestPredicate {
        &self.predicate
    }

    pub fn response(&self) -> &ResponseSpec {
        &self.response
    }

    /// Number of requests this stub has matched so far.
    pub fn match_count(&self) -> u32 {
        self.match_count.load(Ordering::SeqCst)
    }

    pub(crate) fn record_match(&self) {
        self.match_count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn reset_match_count(&self) {
        self.match_count.store(0, Ordering::SeqCst);
    }

    /// Diagnostic rendering used in logs and verification messages.
    pub fn log_string(&self) -> String {
        format!(
            "Stub('{}'): {}",
            self.configuration.name,
            self.predicate.describe()
        )
    }
}

impl fmt::Debug for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub")
            .field("id", &self.id)
            .field("name", &self.configuration.name)
            .field("predicate", &self.predicate)
            .field("match_count", &self.match_count())
            .finish()
    }
}
