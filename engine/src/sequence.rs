//! Request sequencing for the published leaderboard view.
//!
//! Loads, subscription events and confirmed writes all race to update the
//! same view. Each one is stamped with a sequence number when it is issued,
//! and the view only moves forward: a result carrying an older number than
//! the one already published is discarded.

use serde::{Deserialize, Serialize};

/// Where the value of a sequenced view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewOrigin {
    /// Nothing loaded yet
    #[default]
    Empty,
    /// Injected default dataset at cold start
    Seed,
    /// Read back from the local cache
    Cache,
    /// Reduced from a remote read or change notification
    Remote,
    /// Written by this client (confirmed remotely or saved locally)
    LocalWrite,
}

/// Monotonic sequence number source. Sequence 0 is never issued.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    last: u64,
}

impl SequenceCounter {
    /// Create a counter; the first issued number is 1.
    pub fn new() -> Self {
        Self { last: 0 }
    }

    /// Issue the next sequence number.
    pub fn next(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    /// The most recently issued number (0 if none).
    pub fn last(&self) -> u64 {
        self.last
    }
}

/// A value stamped with the sequence number of the request that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequenced<T> {
    pub seq: u64,
    pub origin: ViewOrigin,
    pub value: T,
}

impl<T> Sequenced<T> {
    pub fn new(seq: u64, origin: ViewOrigin, value: T) -> Self {
        Self { seq, origin, value }
    }

    /// Whether `self` is newer than `other` and should replace it.
    pub fn supersedes<U>(&self, other: &Sequenced<U>) -> bool {
        self.seq > other.seq
    }

    /// Replace `self` with `incoming` if it is newer.
    ///
    /// Returns true if the value changed hands.
    pub fn replace_if_newer(&mut self, incoming: Sequenced<T>) -> bool {
        if incoming.supersedes(self) {
            *self = incoming;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_starts_at_one() {
        let mut counter = SequenceCounter::new();
        assert_eq!(counter.last(), 0);
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.last(), 2);
    }

    #[test]
    fn newer_result_replaces() {
        let mut current = Sequenced::new(1, ViewOrigin::Cache, "cached");
        assert!(current.replace_if_newer(Sequenced::new(2, ViewOrigin::Remote, "remote")));
        assert_eq!(current.value, "remote");
        assert_eq!(current.origin, ViewOrigin::Remote);
    }

    #[test]
    fn stale_result_discarded() {
        let mut current = Sequenced::new(5, ViewOrigin::LocalWrite, "fresh");
        assert!(!current.replace_if_newer(Sequenced::new(3, ViewOrigin::Remote, "late")));
        assert!(!current.replace_if_newer(Sequenced::new(5, ViewOrigin::Remote, "same")));
        assert_eq!(current.value, "fresh");
    }

    #[test]
    fn default_is_empty_and_oldest() {
        let current: Sequenced<Vec<u8>> = Sequenced::default();
        assert_eq!(current.seq, 0);
        assert_eq!(current.origin, ViewOrigin::Empty);
        assert!(Sequenced::new(1, ViewOrigin::Seed, vec![1u8]).supersedes(&current));
    }

    #[test]
    fn serialization_format() {
        let view = Sequenced::new(3, ViewOrigin::LocalWrite, 7u32);
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("localWrite")); // camelCase
        assert!(json.contains("\"seq\":3"));
    }
}
