//! Concurrency-safe, ordered stub registry.
//!
//! Stubs are kept sorted by `(priority, id)`, so stubs without explicit
//! priorities are evaluated in registration order. The scan-select-account
//! sequence of [`StubRegistry::find_and_claim`] runs inside one critical
//! section: two concurrent requests can never both claim the same one-shot
//! stub, and no reader observes a stub mid-removal.

use crate::request::Request;
use crate::stub::{Stub, StubId};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
pub struct StubRegistry {
    stubs: Mutex<Vec<Arc<Stub>>>,
}

impl StubRegistry {
    pub fn new() -> Self {
        Self {
            stubs: Mutex::new(Vec::new()),
        }
    }

    /// Insert a stub at its `(priority, id)` sort position and return its
    /// handle.
    pub fn register(&self, stub: Stub) -> StubId {
        let stub = Arc::new(stub);
        let id = stub.id();
        let key = (stub.predicate().priority(), id);
        let mut stubs = self.stubs.lock();
        let position = stubs
            .binary_search_by(|existing| {
                (existing.predicate().priority(), existing.id()).cmp(&key)
            })
            .unwrap_or_else(|insertion| insertion);
        debug!(stub = %stub.log_string(), "registered stub");
        stubs.insert(position, stub);
        id
    }

    /// Find the first stub matching the request, record the match, and (for
    /// one-shot stubs) remove it, all in one critical section.
    ///
    /// Returns `None` when no stub matches.
    pub fn find_and_claim(&self, request: &Request) -> Option<Arc<Stub>> {
        let mut stubs = self.stubs.lock();
        let position = stubs.iter().position(|s| s.predicate().matches(request))?;
        let stub = Arc::clone(&stubs[position]);
        stub.record_match();
        if stub.configuration().is_remove_after_match() {
            stubs.remove(position);
            debug!(stub = %stub.log_string(), "removed one-shot stub after match");
        }
        Some(stub)
    }

    /// Remove a stub by handle. Idempotent: removing an absent stub is a
    /// no-op returning `false`.
    pub fn remove(&self, id: StubId) -> bool {
        let mut stubs = self.stubs.lock();
        match stubs.iter().position(|s| s.id() == id) {
            Some(position) => {
                let stub = stubs.remove(position);
                debug!(stub = %stub.log_string(), "removed stub");
                true
            }
            None => false,
        }
    }

    /// Consistent point-in-time snapshot of all registered stubs, in
    /// evaluation order.
    pub fn snapshot(&self) -> Vec<Arc<Stub>> {
        self.stubs.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.stubs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.lock().is_empty()
    }

    /// Reset every stub's match counter to zero.
    pub fn reset_match_counts(&self) {
        for stub in self.stubs.lock().iter() {
            stub.reset_match_count();
        }
    }

    /// Drop all registered stubs.
    pub fn clear(&self) {
        self.stubs.lock().clear();
    }
}
