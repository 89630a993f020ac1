//! Heterogeneous field values.
//!
//! A record's `fields` map holds whatever scalar or composite values the
//! source line carried. [`FieldValue`] models that as a tagged variant
//! instead of raw `serde_json::Value`, so the rest of the system can match
//! on the shape it actually supports.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single field value parsed from a log line.
///
/// Serializes transparently: `FieldValue::Integer(3)` is the JSON number
/// `3`, `FieldValue::String("x")` is `"x"`, and so on, which keeps the
/// wire shape identical to the original line's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Integer(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    String(String),
    /// Array of nested values.
    Array(Vec<FieldValue>),
    /// Nested object.
    Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Interprets the value as a number, accepting numeric strings.
    ///
    /// Range filters match `status:[200 TO 299]` against both the JSON
    /// number `250` and the logfmt string `"250"`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::String(s) => s.trim().parse::<f64>().ok(),
            Self::Bool(_) | Self::Array(_) | Self::Object(_) => None,
        }
    }

    /// Returns true if the value is a scalar (not an array or object).
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Integer(_) | Self::Float(_) | Self::String(_)
        )
    }

    /// Converts a `serde_json::Value` into a `FieldValue`.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::String(String::new()),
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or(0.0)),
                Self::Integer,
            ),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    /// Text form used by substring matching and field discovery.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => f.write_str(s),
            Self::Array(_) | Self::Object(_) => {
                let json = serde_json::to_string(self).unwrap_or_default();
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
