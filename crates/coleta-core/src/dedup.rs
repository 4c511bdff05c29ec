//! Run-scoped ledger of already-acquired records.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::record::DedupKey;

/// In-memory set of dedup keys, shared by parallel record workers.
///
/// Owned by the caller and passed into the orchestrator, never a
/// process-wide global. [`claim`](Self::claim) is the atomic
/// check-and-set that gates downloads; a claim whose downloads all
/// fail is [`release`](Self::release)d so membership only ever
/// reflects keys with at least one asset on disk. Each run starts
/// from an empty tracker.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: Mutex<HashSet<DedupKey>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seen(&self, key: &DedupKey) -> bool {
        self.seen.lock().expect("dedup lock poisoned").contains(key)
    }

    /// Atomically claim a key. Returns `false` when it was already
    /// present, in which case the caller must skip the download.
    pub fn claim(&self, key: &DedupKey) -> bool {
        self.seen
            .lock()
            .expect("dedup lock poisoned")
            .insert(key.clone())
    }

    /// Undo a claim that produced no downloaded asset.
    pub fn release(&self, key: &DedupKey) {
        self.seen.lock().expect("dedup lock poisoned").remove(key);
    }

    pub fn mark_seen(&self, key: DedupKey) {
        self.seen.lock().expect("dedup lock poisoned").insert(key);
    }

    pub fn len(&self) -> usize {
        self.seen.lock().expect("dedup lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(identity: &str, language: &str) -> DedupKey {
        DedupKey {
            identity: identity.to_string(),
            language: language.to_string(),
        }
    }

    #[test]
    fn claim_then_seen() {
        let tracker = DedupTracker::new();
        let k = key("ATRG", "EN");
        assert!(!tracker.seen(&k));
        assert!(tracker.claim(&k));
        assert!(tracker.seen(&k));
        assert!(!tracker.claim(&k));
    }

    #[test]
    fn release_reopens_key() {
        let tracker = DedupTracker::new();
        let k = key("ATRG", "EN");
        assert!(tracker.claim(&k));
        tracker.release(&k);
        assert!(tracker.claim(&k));
    }

    #[test]
    fn languages_do_not_collide() {
        let tracker = DedupTracker::new();
        assert!(tracker.claim(&key("ATRG", "EN")));
        assert!(tracker.claim(&key("ATRG", "ES")));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn concurrent_claims_admit_exactly_one() {
        let tracker = Arc::new(DedupTracker::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = tracker.clone();
            handles.push(std::thread::spawn(move || {
                tracker.claim(&key("ATRG", "EN"))
            }));
        }
        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("claim thread panicked"))
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(tracker.len(), 1);
    }
}
