//! Last-write-wins reduction over a versioned triple log.
//!
//! This is the in-process equivalent of
//! `ROW_NUMBER() OVER (PARTITION BY s, p ORDER BY timestamp DESC) = 1`,
//! used by every source that cannot push the ranking down to a database.
//! Ties on timestamp go to the higher insertion sequence.

use std::collections::HashMap;
use std::hash::Hash;

use crate::core::{Cutoff, EncodedEntry, LogEntry, Pass, Timestamp};

/// A log row that can be grouped by (subject, predicate) and ordered by version.
pub trait Versioned {
    /// Grouping key, usually (subject, predicate)
    type Key: Eq + Hash;

    /// The row's (subject, predicate) key.
    fn pair_key(&self) -> Self::Key;
    /// `(timestamp, seq)`; larger wins.
    fn version(&self) -> (Timestamp, u64);
}

impl Versioned for LogEntry {
    type Key = (String, String);

    fn pair_key(&self) -> Self::Key {
        (self.subject.clone(), self.predicate.clone())
    }

    fn version(&self) -> (Timestamp, u64) {
        (self.timestamp, self.seq)
    }
}

impl Versioned for EncodedEntry {
    type Key = (u32, u32);

    fn pair_key(&self) -> Self::Key {
        (self.subject, self.predicate)
    }

    fn version(&self) -> (Timestamp, u64) {
        (Timestamp::from_millis(self.timestamp), self.seq)
    }
}

/// Keep only the newest row of every pair. Output order is unspecified.
pub fn latest_per_key<T: Versioned>(rows: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut winners: HashMap<T::Key, T> = HashMap::new();

    for row in rows {
        let key = row.pair_key();
        match winners.get(&key) {
            Some(current) if current.version() >= row.version() => {}
            _ => {
                winners.insert(key, row);
            }
        }
    }

    winners.into_values().collect()
}

/// Filter one pass below the cutoff and reduce it to the latest row per pair,
/// sorted by (subject, predicate).
pub fn latest_per_pair(
    entries: impl IntoIterator<Item = LogEntry>,
    pass: Pass,
    cutoff: Cutoff,
) -> Vec<LogEntry> {
    let admitted = entries
        .into_iter()
        .filter(|e| pass.admits(&e.predicate) && cutoff.admits(e.timestamp));

    let mut latest = latest_per_key(admitted);
    latest.sort_by(|a, b| (&a.subject, &a.predicate).cmp(&(&b.subject, &b.predicate)));
    latest
}
