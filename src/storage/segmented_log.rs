//! Durable append-only triple log.
//!
//! Appends land in an in-memory [`BatchBuffer`]; when it grows past the
//! configured limits it is written out as an immutable `segment-<seq>.log`
//! file of fixed-size records. Terms are dictionary-encoded and the
//! dictionary is persisted before any segment that references it.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use crate::core::{decode_record, Cutoff, EncodedEntry, LogEntry, Pass, Timestamp, RECORD_SIZE};
use crate::core::TYPE_PREDICATE;
use crate::error::{Result, TwinError};
use crate::execution::rank;
use crate::sources::{TripleSink, TripleSource};
use crate::storage::dictionary::Dictionary;
use crate::storage::util::{BatchBuffer, LogConfig, SegmentMetadata};

const DICTIONARY_FILE: &str = "dictionary.bin";

/// Durable log: an in-memory batch flushed to immutable binary segments,
/// with terms interned in a shared dictionary.
pub struct SegmentedTripleLog {
    buffer: RwLock<BatchBuffer>,
    segments: RwLock<Vec<SegmentMetadata>>,
    dictionary: RwLock<Dictionary>,
    config: LogConfig,
}

fn poisoned<T>(_: T) -> TwinError {
    TwinError::DataSourceUnavailable("segmented log lock poisoned".to_string())
}

impl SegmentedTripleLog {
    /// Open the log at `config.base_path`, creating it if needed and
    /// restoring the dictionary and segment directory from disk.
    pub fn open(config: LogConfig) -> Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        let dict_path = config.base_path.join(DICTIONARY_FILE);
        let dictionary =
            if dict_path.exists() { Dictionary::load_from_file(&dict_path)? } else { Dictionary::new() };

        let segments = Self::load_existing_segments(&config.base_path)?;
        let next_seq = segments.iter().map(|s| s.last_seq + 1).max().unwrap_or(0);

        info!(
            path = %config.base_path.display(),
            segments = segments.len(),
            terms = dictionary.len(),
            next_seq,
            "opened segmented triple log"
        );

        Ok(Self {
            buffer: RwLock::new(BatchBuffer { next_seq, ..BatchBuffer::default() }),
            segments: RwLock::new(segments),
            dictionary: RwLock::new(dictionary),
            config,
        })
    }

    /// Location and thresholds.
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Flushed segments.
    pub fn segment_count(&self) -> usize {
        self.segments.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Total number of entries, buffered and flushed.
    pub fn len(&self) -> u64 {
        let buffered = self.buffer.read().map(|b| b.entries.len() as u64).unwrap_or(0);
        let flushed: u64 =
            self.segments.read().map(|s| s.iter().map(|m| m.record_count).sum()).unwrap_or(0);
        buffered + flushed
    }

    /// True when no entry was ever appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn should_flush(&self, buffer: &BatchBuffer) -> bool {
        buffer.entries.len() >= self.config.max_buffer_entries
            || buffer.total_bytes >= self.config.max_buffer_bytes
    }

    /// Write the buffer out as a new segment. No-op when the buffer is empty.
    pub fn flush_buffer(&self) -> Result<()> {
        let mut buffer = self.buffer.write().map_err(poisoned)?;
        if buffer.entries.is_empty() {
            return Ok(());
        }

        {
            let dictionary = self.dictionary.read().map_err(poisoned)?;
            dictionary.save_to_file(&self.config.base_path.join(DICTIONARY_FILE))?;
        }

        let entries: Vec<EncodedEntry> = buffer.entries.iter().cloned().collect();
        let segment = self.write_segment(&entries)?;
        debug!(
            path = %segment.data_path.display(),
            records = segment.record_count,
            "flushed buffer to segment"
        );

        self.segments.write().map_err(poisoned)?.push(segment);
        buffer.drain();
        Ok(())
    }

    fn write_segment(&self, entries: &[EncodedEntry]) -> Result<SegmentMetadata> {
        let first_seq = entries.first().map_or(0, |e| e.seq);
        let last_seq = entries.last().map_or(0, |e| e.seq);
        let data_path = self.config.base_path.join(format!("segment-{:020}.log", first_seq));

        let mut data_file = BufWriter::new(File::create(&data_path)?);
        for entry in entries {
            data_file.write_all(&entry.to_bytes())?;
        }
        data_file.flush()?;
        data_file.get_ref().sync_all()?;

        Ok(SegmentMetadata {
            min_timestamp: entries.iter().map(|e| e.timestamp).min().unwrap_or(0),
            first_seq,
            last_seq,
            data_path,
            record_count: entries.len() as u64,
        })
    }

    fn read_segment(path: &Path) -> Result<Vec<EncodedEntry>> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        let chunks = bytes.chunks_exact(RECORD_SIZE);
        if !chunks.remainder().is_empty() {
            warn!(
                path = %path.display(),
                trailing_bytes = chunks.remainder().len(),
                "ignoring partial record at end of segment"
            );
        }

        Ok(chunks
            .map(|chunk| {
                let mut record = [0u8; RECORD_SIZE];
                record.copy_from_slice(chunk);
                decode_record(&record)
            })
            .collect())
    }

    fn load_existing_segments(dir: &Path) -> Result<Vec<SegmentMetadata>> {
        let mut segments = Vec::new();

        for dir_entry in fs::read_dir(dir)? {
            let path: PathBuf = dir_entry?.path();
            let is_segment = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("segment-") && n.ends_with(".log"));
            if !is_segment {
                continue;
            }

            let records = Self::read_segment(&path)?;
            let (Some(first), Some(last)) = (records.first(), records.last()) else {
                continue;
            };

            segments.push(SegmentMetadata {
                min_timestamp: records.iter().map(|e| e.timestamp).min().unwrap_or(0),
                first_seq: first.seq,
                last_seq: last.seq,
                data_path: path,
                record_count: records.len() as u64,
            });
        }

        segments.sort_by_key(|s| s.first_seq);
        Ok(segments)
    }

    /// Encoded entries admitted by the cutoff, from segments and the buffer.
    fn scan_encoded(&self, cutoff: Cutoff) -> Result<Vec<EncodedEntry>> {
        let admits = |e: &EncodedEntry| cutoff.admits(Timestamp::from_millis(e.timestamp));

        let buffer = self.buffer.read().map_err(poisoned)?;
        let segments = self.segments.read().map_err(poisoned)?;

        let mut results = Vec::new();
        for segment in segments.iter() {
            if !cutoff.admits(Timestamp::from_millis(segment.min_timestamp)) {
                continue;
            }
            results.extend(Self::read_segment(&segment.data_path)?.into_iter().filter(admits));
        }
        let buffer_admitted =
            buffer.min_timestamp.is_some_and(|min| cutoff.admits(Timestamp::from_millis(min)));
        if buffer_admitted {
            results.extend(buffer.entries.iter().filter(|e| admits(e)).cloned());
        }
        Ok(results)
    }

    fn decode_all(&self, encoded: Vec<EncodedEntry>) -> Result<Vec<LogEntry>> {
        let dictionary = self.dictionary.read().map_err(poisoned)?;
        encoded
            .into_iter()
            .map(|e| {
                e.decode(&dictionary).ok_or_else(|| {
                    TwinError::DataSourceUnavailable(format!(
                        "log record {} references an unknown term id",
                        e.seq
                    ))
                })
            })
            .collect()
    }

    /// Every entry admitted by the cutoff, in sequence order.
    pub fn scan(&self, cutoff: Cutoff) -> Result<Vec<LogEntry>> {
        let mut encoded = self.scan_encoded(cutoff)?;
        encoded.sort_by_key(|e| e.seq);
        self.decode_all(encoded)
    }
}

impl TripleSink for SegmentedTripleLog {
    fn append(
        &self,
        subject: &str,
        predicate: &str,
        object: &str,
        timestamp: Timestamp,
    ) -> Result<u64> {
        let mut encoded = {
            let mut dictionary = self.dictionary.write().map_err(poisoned)?;
            LogEntry::new(subject, predicate, object, timestamp).encode(&mut dictionary)
        };

        let needs_flush = {
            let mut buffer = self.buffer.write().map_err(poisoned)?;
            encoded.seq = buffer.next_seq;
            buffer.next_seq += 1;
            buffer.push(encoded.clone());
            self.should_flush(&buffer)
        };

        if needs_flush {
            self.flush_buffer()?;
        }
        Ok(encoded.seq)
    }

    fn flush(&self) -> Result<()> {
        self.flush_buffer()
    }
}

impl TripleSource for SegmentedTripleLog {
    fn describe(&self) -> String {
        format!("segmented log at {}", self.config.base_path.display())
    }

    fn fetch_latest(&self, pass: Pass, cutoff: Cutoff) -> Result<Vec<LogEntry>> {
        let type_id = {
            let dictionary = self.dictionary.read().map_err(poisoned)?;
            dictionary.string_to_id.get(TYPE_PREDICATE).copied()
        };
        let in_pass = |e: &EncodedEntry| match pass {
            Pass::TypeAssertions => Some(e.predicate) == type_id,
            Pass::Properties => Some(e.predicate) != type_id,
        };

        let candidates = self.scan_encoded(cutoff)?.into_iter().filter(in_pass);
        let mut latest = self.decode_all(rank::latest_per_key(candidates))?;
        latest.sort_by(|a, b| (&a.subject, &a.predicate).cmp(&(&b.subject, &b.predicate)));
        Ok(latest)
    }
}

impl Drop for SegmentedTripleLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush_buffer() {
            warn!(error = %e, "failed to flush triple log on drop");
        }
    }
}
