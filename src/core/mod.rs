//! Core data structures for the versioned triple log

use serde::{Deserialize, Serialize};

/// Predicate value that marks a type assertion in the log.
pub const TYPE_PREDICATE: &str = "rdf:type";

/// Internal log record with dictionary-encoded terms.
/// 8 (timestamp) + 8 (seq) + 3 * 4 (terms) = 28 bytes on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedEntry {
    /// Milliseconds since epoch
    pub timestamp: i64,
    /// Insertion order, unique per log
    pub seq: u64,
    /// Dictionary id of the subject
    pub subject: u32,
    /// Dictionary id of the predicate
    pub predicate: u32,
    /// Dictionary id of the object
    pub object: u32,
}

/// One row of the append-only triple log, with plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Raw subject identifier
    pub subject: String,
    /// Raw predicate identifier, `rdf:type` for type assertions
    pub predicate: String,
    /// Raw object: an identifier for type assertions, text otherwise
    pub object: String,
    /// When the value was observed
    pub timestamp: Timestamp,
    /// Insertion-order surrogate. Breaks ties between equal timestamps.
    #[serde(default)]
    pub seq: u64,
}

impl LogEntry {
    /// Row with `seq` 0.
    pub fn new(subject: &str, predicate: &str, object: &str, timestamp: Timestamp) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            timestamp,
            seq: 0,
        }
    }

    /// Set the insertion-order surrogate.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// True for rows whose predicate is exactly `rdf:type`.
    pub fn is_type_assertion(&self) -> bool {
        self.predicate == TYPE_PREDICATE
    }

    /// Last-write-wins ordering: later timestamp wins, then higher seq.
    pub fn supersedes(&self, other: &LogEntry) -> bool {
        (self.timestamp, self.seq) > (other.timestamp, other.seq)
    }
}

/// Upper bound applied when reconstructing the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// No upper bound: the latest value of every pair.
    Latest,
    /// Only entries with `timestamp < t`.
    Before(Timestamp),
}

impl Cutoff {
    /// Whether a row at `timestamp` is visible.
    pub fn admits(&self, timestamp: Timestamp) -> bool {
        match self {
            Cutoff::Latest => true,
            Cutoff::Before(limit) => timestamp < *limit,
        }
    }

    /// The exclusive upper bound, if any.
    pub fn bound(&self) -> Option<Timestamp> {
        match self {
            Cutoff::Latest => None,
            Cutoff::Before(limit) => Some(*limit),
        }
    }
}

/// The two reconstruction passes. Type assertions keep IRI objects,
/// everything else is treated as literal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    /// Rows with predicate `rdf:type`
    TypeAssertions,
    /// Every other row
    Properties,
}

impl Pass {
    /// Both passes, in merge order.
    pub const ALL: [Pass; 2] = [Pass::TypeAssertions, Pass::Properties];

    /// Whether a row with this raw predicate belongs to the pass.
    pub fn admits(&self, predicate: &str) -> bool {
        match self {
            Pass::TypeAssertions => predicate == TYPE_PREDICATE,
            Pass::Properties => predicate != TYPE_PREDICATE,
        }
    }

    /// Name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Pass::TypeAssertions => "type-assertions",
            Pass::Properties => "properties",
        }
    }
}

pub mod encoding;
pub mod timestamp;

pub use encoding::*;
pub use timestamp::Timestamp;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supersedes_prefers_timestamp_then_seq() {
        let older = LogEntry::new("s", "p", "v1", Timestamp::from_millis(1)).with_seq(9);
        let newer = LogEntry::new("s", "p", "v2", Timestamp::from_millis(2)).with_seq(1);
        assert!(newer.supersedes(&older));
        assert!(!older.supersedes(&newer));

        let tie_low = LogEntry::new("s", "p", "a", Timestamp::from_millis(5)).with_seq(3);
        let tie_high = LogEntry::new("s", "p", "b", Timestamp::from_millis(5)).with_seq(4);
        assert!(tie_high.supersedes(&tie_low));
    }

    #[test]
    fn test_cutoff_is_strict() {
        let cutoff = Cutoff::Before(Timestamp::from_millis(2));
        assert!(cutoff.admits(Timestamp::from_millis(1)));
        assert!(!cutoff.admits(Timestamp::from_millis(2)));
        assert!(Cutoff::Latest.admits(Timestamp::from_millis(i64::MAX)));
    }

    #[test]
    fn test_pass_partition() {
        assert!(Pass::TypeAssertions.admits("rdf:type"));
        assert!(!Pass::TypeAssertions.admits("ex:temp"));
        assert!(Pass::Properties.admits("ex:temp"));
        assert!(!Pass::Properties.admits("rdf:type"));
    }
}
