//! In-process triple log, mostly for tests and small embedded uses.

use std::sync::RwLock;

use crate::core::{Cutoff, LogEntry, Pass, Timestamp};
use crate::error::{Result, TwinError};
use crate::execution::rank;
use crate::sources::{TripleSink, TripleSource};

/// Entries held in a `Vec` behind a lock.
#[derive(Debug, Default)]
pub struct MemoryTripleLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryTripleLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from `(subject, predicate, object, timestamp_millis)` rows,
    /// assigning sequence numbers in the given order.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = (&'a str, &'a str, &'a str, i64)>) -> Self {
        let entries = rows
            .into_iter()
            .enumerate()
            .map(|(seq, (s, p, o, ts))| {
                LogEntry::new(s, p, o, Timestamp::from_millis(ts)).with_seq(seq as u64)
            })
            .collect();
        Self { entries: RwLock::new(entries) }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// True when nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> TwinError {
        TwinError::DataSourceUnavailable("in-memory log lock poisoned".to_string())
    }
}

impl TripleSink for MemoryTripleLog {
    fn append(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        timestamp: Timestamp,
    ) -> Result<u64> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        let seq = entries.len() as u64;
        entries.push(LogEntry::new(subject, predicate, object, timestamp).with_seq(seq));
        Ok(seq)
    }
}

impl TripleSource for MemoryTripleLog {
    fn describe(&self) -> String {
        format!("in-memory log ({} entries)", self.len())
    }

    fn fetch_latest(&self, pass: Pass, cutoff: Cutoff) -> Result<Vec<LogEntry>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(rank::latest_per_pair(entries.iter().cloned(), pass, cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_assigns_increasing_seq() {
        let log = MemoryTripleLog::new();
        let a = log.append("s", "p", "1", Timestamp::from_millis(5)).unwrap();
        let b = log.append("s", "p", "2", Timestamp::from_millis(5)).unwrap();
        assert!(b > a);

        let latest = log.fetch_latest(Pass::Properties, Cutoff::Latest).unwrap();
        assert_eq!(latest[0].object, "2");
    }

    #[test]
    fn test_from_rows_then_fetch() {
        let log = MemoryTripleLog::from_rows([
            ("s", "rdf:type", "T", 1),
            ("s", "p", "x", 1),
            ("s", "p", "y", 3),
        ]);
        assert_eq!(log.len(), 3);

        let types = log.fetch_latest(Pass::TypeAssertions, Cutoff::Latest).unwrap();
        assert_eq!(types.len(), 1);

        let props = log
            .fetch_latest(Pass::Properties, Cutoff::Before(Timestamp::from_millis(3)))
            .unwrap();
        assert_eq!(props[0].object, "x");
    }
}
