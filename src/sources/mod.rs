//! Backends that hold the append-only triple log.
//!
//! Every backend answers the same ranked question: for one [`Pass`], the
//! newest row of each (subject, predicate) pair strictly before the cutoff.
//! Backends that sit on a SQL engine push the ranking down as a window query;
//! the others reduce in process with [`crate::execution::rank`].

use crate::core::{Cutoff, LogEntry, Pass, Timestamp};
use crate::error::Result;

pub mod memory;
pub mod sqlite;
pub mod warehouse;

pub use crate::storage::segmented_log::SegmentedTripleLog;
pub use memory::MemoryTripleLog;
pub use sqlite::SqliteTripleSource;
pub use warehouse::{WarehouseConfig, WarehouseSource};

/// Read side of a triple log.
pub trait TripleSource: Send + Sync {
    /// Human-readable description for logs and health output.
    fn describe(&self) -> String;

    /// Latest row per (subject, predicate) among rows admitted by `pass`
    /// and `cutoff`, sorted by (subject, predicate).
    fn fetch_latest(&self, pass: Pass, cutoff: Cutoff) -> Result<Vec<LogEntry>>;
}

/// Write side of a triple log. Appends never rewrite earlier rows.
pub trait TripleSink {
    /// Append one fact and return the sequence number it was stored under.
    fn append(&self, subject: &str, predicate: &str, object: &str, timestamp: Timestamp)
        -> Result<u64>;

    /// Make everything appended so far durable.
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Append a parsed row. Its `seq` is ignored.
    fn append_entry(&self, entry: &LogEntry) -> Result<u64> {
        self.append(&entry.subject, &entry.predicate, &entry.object, entry.timestamp)
    }
}
