//! Append-only audit log of policy decisions.
//!
//! Appends are serialized through a single mutex, so concurrent evaluations
//! never interleave partially and one caller's sequential attempts keep their
//! order. Entries are hash-chained for tamper evidence.

use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::engine::AuditSink;
use crate::error::{PolicyError, PolicyResult};
use crate::types::AuditEvent;

#[derive(Debug, Clone)]
struct AuditEntry {
    event: AuditEvent,
    hash: [u8; 32],
}

/// In-memory, append-only log of decision events.
///
/// No retention bound is applied here; capping or rotating storage is left
/// to whoever deploys the log.
#[derive(Default)]
pub struct AuditLog {
    entries: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    // A panic while holding the lock cannot leave a half-written entry
    // (push is the last step), so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn chain_hash(previous: Option<&[u8; 32]>, event: &AuditEvent) -> [u8; 32] {
        let mut hasher = Sha256::new();
        if let Some(prev) = previous {
            hasher.update(prev);
        }
        // AuditEvent has no maps or floats, so serializing
        // it cannot fail.
        let event_json = serde_json::to_vec(event);
        debug_assert!(event_json.is_ok(), "audit event failed to serialize");
        hasher.update(event_json.unwrap_or_default());
        let hash = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        out
    }

    /// Append an event. Never fails and never drops.
    ///
    /// Timestamps are taken before the lock, so an event stamped earlier on
    /// another thread can arrive later. Its timestamp is raised to the
    /// previous entry's so timestamps never decrease in log order.
    pub fn append(&self, mut event: AuditEvent) {
        let mut entries = self.lock();
        if let Some(last) = entries.last() {
            if event.timestamp < last.event.timestamp {
                event.timestamp = last.event.timestamp;
            }
        }
        let hash = Self::chain_hash(entries.last().map(|e| &e.hash), &event);
        entries.push(AuditEntry { event, hash });
    }

    /// Snapshot of all events in insertion order.
    ///
    /// Calling this again without an intervening append yields the same
    /// sequence.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.lock().iter().map(|e| e.event.clone()).collect()
    }

    /// The most recent `limit` events, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).map(|e| e.event.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One summary line per event, each followed by an indented alert line
    /// when an alert was raised.
    pub fn render(&self) -> String {
        self.lock()
            .iter()
            .map(|e| e.event.render())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Hex-encoded hash of the newest entry.
    pub fn head(&self) -> Option<String> {
        self.lock().last().map(|e| hex::encode(e.hash))
    }

    /// Recompute the hash chain from genesis and compare with stored hashes.
    pub fn verify_chain(&self) -> PolicyResult<()> {
        let entries = self.lock();
        let mut previous: Option<[u8; 32]> = None;
        for (index, entry) in entries.iter().enumerate() {
            let expected = Self::chain_hash(previous.as_ref(), &entry.event);
            if expected != entry.hash {
                return Err(PolicyError::ChainBroken(index));
            }
            previous = Some(expected);
        }
        Ok(())
    }

    /// Serialize the event sequence as a JSON array.
    pub fn export_json(&self) -> PolicyResult<Vec<u8>> {
        serde_json::to_vec_pretty(&self.events()).map_err(|e| {
            PolicyError::SerializationError(format!("failed to serialize audit log: {}", e))
        })
    }

    #[cfg(test)]
    fn tamper(&self, index: usize, f: impl FnOnce(&mut AuditEvent)) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(index) {
            f(&mut entry.event);
        }
    }
}

impl AuditSink for AuditLog {
    fn append(&self, event: AuditEvent) {
        AuditLog::append(self, event);
    }
}
