//! Log timestamps: milliseconds since the Unix epoch, UTC.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TwinError;

/// Wall-clock layouts accepted besides RFC 3339 and raw epoch milliseconds.
/// Values without an offset are read as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Wrap epoch milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Epoch milliseconds.
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Timestamp(Utc::now().timestamp_millis())
    }

    /// Parse a caller-supplied cutoff.
    ///
    /// Accepts epoch milliseconds (`1700000000000`), RFC 3339
    /// (`2024-03-01T12:00:00Z`), `YYYY-MM-DD HH:MM:SS[.fff]` and `YYYY-MM-DD`.
    pub fn parse(input: &str) -> Result<Self, TwinError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TwinError::InvalidArgument("timestamp is empty".to_string()));
        }

        if let Ok(millis) = trimmed.parse::<i64>() {
            return Ok(Timestamp(millis));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Timestamp(dt.timestamp_millis()));
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Timestamp(naive.and_utc().timestamp_millis()));
            }
        }

        if let Some(midnight) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Timestamp(midnight.and_utc().timestamp_millis()));
        }

        Err(TwinError::InvalidArgument(format!("unparsable timestamp '{}'", trimmed)))
    }

    /// `YYYY-MM-DD HH:MM:SS.fff` in UTC, the literal form SQL warehouses accept.
    pub fn to_sql_literal(&self) -> String {
        match DateTime::<Utc>::from_timestamp_millis(self.0) {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            None => self.0.to_string(),
        }
    }
}

impl FromStr for Timestamp {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timestamp::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql_literal())
    }
}
