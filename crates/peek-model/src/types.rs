//! Record, field discovery, and time-range types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// A normalized log entry.
///
/// Records are immutable once committed to the store: `raw` keeps the
/// original line verbatim, and `id` + `timestamp` form the store's
/// primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Opaque 16-hex-character identifier, unique within a process run.
    pub id: String,
    /// Absolute UTC instant with nanosecond resolution.
    pub timestamp: DateTime<Utc>,
    /// Uppercase level tag, or the empty string when the line carried none.
    pub level: String,
    /// Free-form message text.
    pub message: String,
    /// Remaining structured fields from the source line.
    #[serde(default)]
    pub fields: HashMap<String, FieldValue>,
    /// The original line, byte-for-byte.
    pub raw: String,
}

impl Record {
    /// Creates a raw record: no level, no fields, the line as the message.
    #[must_use]
    pub fn raw_line(line: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: generate_record_id(),
            timestamp,
            level: String::new(),
            message: line.to_string(),
            fields: HashMap::new(),
            raw: line.to_string(),
        }
    }

    /// Resolves a queryable name to its text value.
    ///
    /// `level` and `message` map to the built-in attributes; any other
    /// name is looked up in `fields`. Returns `None` for a missing field,
    /// which query filters treat as "no match".
    #[must_use]
    pub fn field_text(&self, name: &str) -> Option<String> {
        match name {
            "level" => Some(self.level.clone()),
            "message" => Some(self.message.clone()),
            _ => self.fields.get(name).map(ToString::to_string),
        }
    }

    /// Serializes the record to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserializes a record from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid record.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Generates a record id: 8 random bytes as lowercase hex.
#[must_use]
pub fn generate_record_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// A field name observed in stored records and its most frequent values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// Field name.
    pub name: String,
    /// Value type token. Currently always `"string"`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Up to 10 observed values, most frequent first.
    pub top_values: Vec<String>,
}

/// An inclusive time window. `None` on either side means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Creates a time range with the given bounds.
    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Creates a range bounded below only.
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Returns true if neither bound is set.
    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Checks whether a timestamp falls inside the range (inclusive).
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if timestamp > end {
                return false;
            }
        }
        true
    }
}
