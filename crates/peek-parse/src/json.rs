//! Structured-object (JSON) line parsing.

use std::collections::HashMap;

use peek_model::{FieldValue, Record};

use crate::detector::LineFormat;
use crate::extract::record_from_fields;

/// Parser for lines that are a single top-level JSON object.
///
/// Member values may be scalars, arrays, or nested objects; all of them
/// are preserved in the record's `fields` map with their original types.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredFormat;

impl StructuredFormat {
    /// Creates a new structured-object parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LineFormat for StructuredFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn accepts(&self, line: &str) -> bool {
        serde_json::from_str::<serde_json::Value>(line)
            .map(|value| value.is_object())
            .unwrap_or(false)
    }

    fn parse(&self, line: &str) -> Record {
        let fields: HashMap<String, FieldValue> =
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(serde_json::Value::Object(map)) => map
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::from_json(v)))
                    .collect(),
                _ => HashMap::new(),
            };
        record_from_fields(line, fields)
    }
}
