//! Shared field-extraction rules.
//!
//! Both parsers tokenize a line into a key/value map and then apply the
//! same promotion rules: `timestamp`/`time` become the record timestamp,
//! `level`/`severity` become the level, `message`/`msg` become the
//! message. Promoted keys are consumed; everything else stays in `fields`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use peek_model::{generate_record_id, normalize_level, FieldValue, Record};

const TIMESTAMP_KEYS: [&str; 2] = ["timestamp", "time"];
const LEVEL_KEYS: [&str; 2] = ["level", "severity"];
const MESSAGE_KEYS: [&str; 2] = ["message", "msg"];

/// Builds a record from a tokenized line.
///
/// An unparsable or absent timestamp falls back to the ingest wall clock;
/// an absent level stays empty.
pub fn record_from_fields(line: &str, mut fields: HashMap<String, FieldValue>) -> Record {
    let timestamp = take_timestamp(&mut fields).unwrap_or_else(Utc::now);
    let level = take_string(&mut fields, &LEVEL_KEYS)
        .map(|l| normalize_level(&l))
        .unwrap_or_default();
    let message = take_string(&mut fields, &MESSAGE_KEYS).unwrap_or_default();

    Record {
        id: generate_record_id(),
        timestamp,
        level,
        message,
        fields,
        raw: line.to_string(),
    }
}

/// Consumes the first timestamp key holding a string value.
///
/// The key is removed even when its value fails to parse, so a malformed
/// `time=` never ends up as an ordinary field.
fn take_timestamp(fields: &mut HashMap<String, FieldValue>) -> Option<DateTime<Utc>> {
    for key in TIMESTAMP_KEYS {
        let is_string = matches!(fields.get(key), Some(FieldValue::String(_)));
        if !is_string {
            continue;
        }
        if let Some(FieldValue::String(text)) = fields.remove(key) {
            if let Some(parsed) = parse_rfc3339(&text) {
                return Some(parsed);
            }
        }
    }
    None
}

/// Consumes the first of `keys` holding a string value.
fn take_string(fields: &mut HashMap<String, FieldValue>, keys: &[&str]) -> Option<String> {
    for key in keys {
        let is_string = matches!(fields.get(*key), Some(FieldValue::String(_)));
        if !is_string {
            continue;
        }
        if let Some(FieldValue::String(text)) = fields.remove(*key) {
            return Some(text);
        }
    }
    None
}

/// Parses an RFC3339 timestamp, with or without fractional seconds.
fn parse_rfc3339(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
