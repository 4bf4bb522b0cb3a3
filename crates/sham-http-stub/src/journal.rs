//! Append-only record of every inbound request and its resolution.

use crate::request::Request;
use crate::stub::StubId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Controls which requests the journal records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Record every request, matched and unmatched alike. Enables
    /// inspection of the full call history.
    #[default]
    Full,
    /// Record only unmatched requests. Lower overhead; sufficient for
    /// [`verify_no_unexpected_requests`](crate::verify::verify_no_unexpected_requests).
    Lean,
}

/// How an inbound request was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Matched(StubId),
    Unmatched,
}

/// Immutable record of one inbound request.
#[derive(Debug, Clone)]
pub struct CallRecord {
    request: Request,
    timestamp: DateTime<Utc>,
    resolution: Resolution,
}

impl CallRecord {
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Wall-clock capture time at append.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_unmatched(&self) -> bool {
        self.resolution == Resolution::Unmatched
    }
}

/// Append-only journal of [`CallRecord`]s, cleared only by an explicit
/// [`RequestJournal::clear`].
pub struct RequestJournal {
    mode: JournalMode,
    records: Mutex<Vec<CallRecord>>,
}

impl RequestJournal {
    pub fn new(mode: JournalMode) -> Self {
        Self {
            mode,
            records: Mutex::new(Vec::new()),
        }
    }

    /// Record a request resolved by a stub. No-op in [`JournalMode::Lean`].
    pub fn record_matched(&self, request: Request, stub: StubId) {
        if self.mode == JournalMode::Lean {
            return;
        }
        self.append(request, Resolution::Matched(stub));
    }

    /// Record a request for which no stub was found.
    pub fn record_unmatched(&self, request: Request) {
        self.append(request, Resolution::Unmatched);
    }

    fn append(&self, request: Request, resolution: Resolution) {
        let record = CallRecord {
            request,
            timestamp: Utc::now(),
            resolution,
        };
        self.records.lock().push(record);
    }

    /// Snapshot of all records, in append order.
    pub fn records(&self) -> Vec<CallRecord> {
        self.records.lock().clone()
    }

    /// Snapshot of requests that had no matching stub.
    pub fn unmatched(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.is_unmatched())
            .cloned()
            .collect()
    }

    /// Snapshot of requests resolved by a stub. Always empty in
    /// [`JournalMode::Lean`].
    pub fn matched(&self) -> Vec<CallRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| !r.is_unmatched())
            .cloned()
            .collect()
    }

    /// Drop the whole call history.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}
