//! Mapping of tabular sensor readings to triple log entries.
//!
//! Every reading yields one `rdf:type` assertion for its component plus one
//! property per mapped column that is present and non-null, all stamped with
//! the reading's timestamp.

use std::collections::BTreeMap;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{LogEntry, Timestamp, TYPE_PREDICATE};
use crate::error::{Result, TwinError};

/// Default namespace for component, type and predicate IRIs.
pub const FACTORY_NAMESPACE: &str = "http://example.com/factory";

/// Columns mapped to properties by default.
pub const SENSOR_COLUMNS: [&str; 9] = [
    "sensor_rotation",
    "sensor_flow",
    "sensor_temperature",
    "sensor_speed",
    "sensor_vibration",
    "sensor_pressure",
    "component_yield_output",
    "damaged_component",
    "abnormal_sensor",
];

/// One row of the sensor feed. Unknown columns are kept in `values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Component key, a string or number
    pub component_id: Value,
    /// Any form accepted by [`Timestamp::parse`]
    pub timestamp: Value,
    /// Remaining columns
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

/// Turns readings into log rows under one namespace.
#[derive(Debug, Clone)]
pub struct ComponentMapping {
    namespace: String,
    type_name: String,
    columns: Vec<String>,
}

impl Default for ComponentMapping {
    fn default() -> Self {
        Self {
            namespace: FACTORY_NAMESPACE.to_string(),
            type_name: "component".to_string(),
            columns: SENSOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Text form of a JSON scalar; `None` for null and nested values.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl ComponentMapping {
    /// Use another namespace. A trailing `/` is dropped.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.trim_end_matches('/').to_string();
        self
    }

    /// `<ns>/component-<id>`
    pub fn component_iri(&self, id: &str) -> String {
        format!("{}/component-{}", self.namespace, id)
    }

    /// `<ns>/type/component`
    pub fn type_iri(&self) -> String {
        format!("{}/type/{}", self.namespace, self.type_name)
    }

    /// `<ns>/pred/<column>`
    pub fn predicate_iri(&self, column: &str) -> String {
        format!("{}/pred/{}", self.namespace, column)
    }

    /// Type assertion plus one row per present, non-null mapped column.
    pub fn map_reading(&self, reading: &SensorReading) -> Result<Vec<LogEntry>> {
        let id = scalar_text(&reading.component_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TwinError::InvalidArgument("reading has no component_id".to_string()))?;
        let timestamp = scalar_text(&reading.timestamp)
            .ok_or_else(|| TwinError::InvalidArgument("reading has no timestamp".to_string()))
            .and_then(|t| Timestamp::parse(&t))?;

        let subject = self.component_iri(&id);
        let mut entries = vec![LogEntry::new(&subject, TYPE_PREDICATE, &self.type_iri(), timestamp)];

        for column in &self.columns {
            if let Some(text) = reading.values.get(column).and_then(scalar_text) {
                entries.push(LogEntry::new(&subject, &self.predicate_iri(column), &text, timestamp));
            }
        }
        Ok(entries)
    }

    /// Map newline-delimited JSON readings.
    pub fn map_json_lines(&self, reader: impl BufRead) -> Result<Vec<LogEntry>> {
        let mut entries = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let reading: SensorReading = serde_json::from_str(&line).map_err(|e| {
                TwinError::InvalidArgument(format!("line {}: {}", idx + 1, e))
            })?;
            entries.extend(self.map_reading(&reading)?);
        }
        Ok(entries)
    }
}
