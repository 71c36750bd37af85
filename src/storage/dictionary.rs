//! Term dictionary of the segmented log.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Interns subject/predicate/object strings to `u32` ids for the on-disk log.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dictionary {
    /// Term to id
    pub string_to_id: HashMap<String, u32>,
    /// Id to term
    pub id_to_string: HashMap<u32, String>,
    /// Next unassigned id
    pub next_id: u32,
}

impl Dictionary {
    /// Empty dictionary.
    pub fn new() -> Self {
        Dictionary { string_to_id: HashMap::new(), id_to_string: HashMap::new(), next_id: 0 }
    }

    /// Id of `value`, assigning the next one on first sight.
    pub fn encode(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.string_to_id.get(value) {
            id
        } else {
            let id = self.next_id;
            self.string_to_id.insert(value.to_string(), id);
            self.id_to_string.insert(id, value.to_string());
            self.next_id += 1;
            id
        }
    }

    /// Term for `id`, if assigned.
    pub fn decode(&self, id: u32) -> Option<&str> {
        self.id_to_string.get(&id).map(|s| s.as_str())
    }

    /// Number of interned terms.
    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    /// True when no term was interned.
    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }

    /// Write to `path` via a temporary sibling, so a crash never leaves a
    /// half-written dictionary behind.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let encoded = bincode::serialize(self)?;
        let tmp = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&encoded)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a dictionary written by [`Dictionary::save_to_file`].
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(bincode::deserialize(&buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dictionary_encoding_decoding() {
        let mut dict = Dictionary::new();

        let subject_id = dict.encode("http://example.com/factory/component-11");
        let predicate_id = dict.encode("http://example.com/factory/pred/sensor_flow");
        let again = dict.encode("http://example.com/factory/component-11");

        assert_eq!(subject_id, again);
        assert_ne!(subject_id, predicate_id);
        assert_eq!(dict.decode(predicate_id), Some("http://example.com/factory/pred/sensor_flow"));
        assert_eq!(dict.decode(99), None);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_dictionary_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dictionary.bin");

        let mut dict = Dictionary::new();
        dict.encode("rdf:type");
        dict.encode("72.5");
        dict.save_to_file(&path).unwrap();

        let loaded = Dictionary::load_from_file(&path).unwrap();
        assert_eq!(loaded.decode(1), Some("72.5"));
        assert_eq!(loaded.next_id, 2);
        assert!(!path.with_extension("tmp").exists());
    }
}
