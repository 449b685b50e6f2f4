//! Two-strike retry state
//!
//! Process-wide map from (device, chunk) identity to a failure counter. The
//! narrow API is the whole point: callers can only record a failure and get
//! the protocol decision back, or record a success, so nothing outside this
//! module can corrupt the two-strike invariant. Counters are not persisted
//! across restarts.

use dashmap::DashMap;

// ----------------------------------------------------------------------------
// Retry Key
// ----------------------------------------------------------------------------

/// Resolved (device, chunk) identity a retry is tracked under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RetryKey {
    pub device_id: String,
    pub chunk_id: String,
}

impl RetryKey {
    pub fn new(device_id: impl Into<String>, chunk_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            chunk_id: chunk_id.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Retry Decision
// ----------------------------------------------------------------------------

/// Protocol decision after one recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// First strike: ask the device to resend this chunk once.
    Repit,
    /// Second strike: accept the chunk as permanently unrecoverable.
    GiveUp,
}

// ----------------------------------------------------------------------------
// Retry Table
// ----------------------------------------------------------------------------

/// Concurrency-safe two-strike counter table.
///
/// Entries exist only while a retry is in flight: they are created on first
/// failure and removed on success or second failure, so steady-state memory
/// is bounded by currently pending retries. There is deliberately no expiry;
/// a device that never resends leaks one small entry for process lifetime.
#[derive(Debug, Default)]
pub struct RetryTable {
    attempts: DashMap<RetryKey, u32>,
}

impl RetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one decode failure for this identity and return the decision.
    ///
    /// The dashmap entry lock makes the read-modify-write atomic per key, so
    /// two racing submissions for the same chunk cannot double-count a single
    /// failure into an immediate give-up.
    pub fn record_failure(&self, key: &RetryKey) -> RetryDecision {
        match self.attempts.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(1);
                RetryDecision::Repit
            }
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                entry.remove();
                RetryDecision::GiveUp
            }
        }
    }

    /// Clear any pending retry for this identity after a successful decode.
    pub fn record_success(&self, key: &RetryKey) {
        self.attempts.remove(key);
    }

    /// Number of retries currently in flight.
    pub fn pending(&self) -> usize {
        self.attempts.len()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
