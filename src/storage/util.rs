//! Buffer, segment metadata and configuration shared by the segmented log.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::core::EncodedEntry;

#[derive(Debug, Default)]
/// In-memory buffer that batches appended entries before they become a segment
pub struct BatchBuffer {
    /// Entries in append order
    pub entries: VecDeque<EncodedEntry>,
    /// Encoded size of `entries`
    pub total_bytes: usize,
    /// Smallest buffered timestamp, `None` when empty
    pub min_timestamp: Option<i64>,
    /// Sequence number the next appended entry receives
    pub next_seq: u64,
}

impl BatchBuffer {
    /// Buffer one entry.
    pub fn push(&mut self, entry: EncodedEntry) {
        self.min_timestamp =
            Some(self.min_timestamp.map_or(entry.timestamp, |m| m.min(entry.timestamp)));
        self.total_bytes += crate::core::RECORD_SIZE;
        self.entries.push_back(entry);
    }

    /// Take every buffered entry and reset the counters.
    pub fn drain(&mut self) -> Vec<EncodedEntry> {
        self.total_bytes = 0;
        self.min_timestamp = None;
        self.entries.drain(..).collect()
    }
}

/// Metadata kept in memory for each immutable segment file
#[derive(Debug, Clone)]
pub struct SegmentMetadata {
    /// Smallest timestamp in the segment; cutoffs at or below it skip the file
    pub min_timestamp: i64,
    /// Sequence number of the first record
    pub first_seq: u64,
    /// Sequence number of the last record
    pub last_seq: u64,
    /// Segment file
    pub data_path: PathBuf,
    /// Records in the file
    pub record_count: u64,
}

/// Location and flush thresholds of a segmented log
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding segment files and the dictionary
    pub base_path: PathBuf,
    /// Maximum number of entries to buffer before writing a segment
    pub max_buffer_entries: usize,
    /// Maximum bytes to buffer before writing a segment
    pub max_buffer_bytes: usize,
}

impl LogConfig {
    /// Default thresholds at `base_path`.
    pub fn at(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into(), ..Self::default() }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./data/triples"),
            max_buffer_entries: 10_000,
            max_buffer_bytes: 4 * 1024 * 1024,
        }
    }
}
