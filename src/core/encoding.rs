//! Binary encoding/decoding of triple log records

use crate::core::{EncodedEntry, LogEntry, Timestamp};
use crate::storage::dictionary::Dictionary;

/// Size of a single encoded record in bytes
pub const RECORD_SIZE: usize = 28;

/// Encode a log record into a byte buffer
pub fn encode_record(buffer: &mut [u8; RECORD_SIZE], entry: &EncodedEntry) {
    buffer[0..8].copy_from_slice(&entry.timestamp.to_le_bytes());
    buffer[8..16].copy_from_slice(&entry.seq.to_le_bytes());
    buffer[16..20].copy_from_slice(&entry.subject.to_le_bytes());
    buffer[20..24].copy_from_slice(&entry.predicate.to_le_bytes());
    buffer[24..28].copy_from_slice(&entry.object.to_le_bytes());
}

/// Decode a byte buffer into a log record
pub fn decode_record(buffer: &[u8; RECORD_SIZE]) -> EncodedEntry {
    let mut ts = [0u8; 8];
    let mut seq = [0u8; 8];
    let mut s = [0u8; 4];
    let mut p = [0u8; 4];
    let mut o = [0u8; 4];
    ts.copy_from_slice(&buffer[0..8]);
    seq.copy_from_slice(&buffer[8..16]);
    s.copy_from_slice(&buffer[16..20]);
    p.copy_from_slice(&buffer[20..24]);
    o.copy_from_slice(&buffer[24..28]);

    EncodedEntry {
        timestamp: i64::from_le_bytes(ts),
        seq: u64::from_le_bytes(seq),
        subject: u32::from_le_bytes(s),
        predicate: u32::from_le_bytes(p),
        object: u32::from_le_bytes(o),
    }
}

impl LogEntry {
    /// Encode this entry against a dictionary, assigning new ids as needed
    pub fn encode(&self, dict: &mut Dictionary) -> EncodedEntry {
        EncodedEntry {
            timestamp: self.timestamp.as_millis(),
            seq: self.seq,
            subject: dict.encode(&self.subject),
            predicate: dict.encode(&self.predicate),
            object: dict.encode(&self.object),
        }
    }
}

impl EncodedEntry {
    /// Decode back to strings. `None` if any id is unknown to the dictionary.
    pub fn decode(&self, dict: &Dictionary) -> Option<LogEntry> {
        Some(LogEntry {
            subject: dict.decode(self.subject)?.to_string(),
            predicate: dict.decode(self.predicate)?.to_string(),
            object: dict.decode(self.object)?.to_string(),
            timestamp: Timestamp::from_millis(self.timestamp),
            seq: self.seq,
        })
    }

    /// Fixed-size record as written to a segment.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buffer = [0u8; RECORD_SIZE];
        encode_record(&mut buffer, self);
        buffer
    }
}
