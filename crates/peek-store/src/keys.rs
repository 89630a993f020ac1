//! Key construction and parsing for the ordered keyspace.

use chrono::{DateTime, Utc};

/// Prefix of every primary record key.
pub const LOG_PREFIX: &str = "log:";

/// Prefix of every by-level index key.
pub const LEVEL_INDEX_PREFIX: &str = "index:level:";

/// Converts a timestamp to the nanosecond integer used in keys.
#[must_use]
pub fn timestamp_nanos(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_nanos_opt().unwrap_or_default()
}

/// Builds the primary key `log:{timestamp_nanos}:{id}`.
#[must_use]
pub fn primary_key(nanos: i64, id: &str) -> String {
    format!("{LOG_PREFIX}{nanos}:{id}")
}

/// Builds the index key `index:level:{LEVEL}:{timestamp_nanos}:{id}`.
#[must_use]
pub fn level_key(level: &str, nanos: i64, id: &str) -> String {
    format!("{LEVEL_INDEX_PREFIX}{level}:{nanos}:{id}")
}

/// Smallest string strictly greater than every key with this prefix.
#[must_use]
pub fn prefix_end(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last += 1;
    }
    String::from_utf8(bytes).unwrap_or_else(|_| prefix.to_string())
}

/// Splits an index key into `(level, timestamp_nanos, id)`.
///
/// Levels never contain `:` (they are uppercased single tokens, possibly
/// empty), so the first two separators after the prefix are unambiguous.
#[must_use]
pub fn parse_level_key(key: &str) -> Option<(&str, i64, &str)> {
    let rest = key.strip_prefix(LEVEL_INDEX_PREFIX)?;
    let mut parts = rest.splitn(3, ':');
    let level = parts.next()?;
    let nanos = parts.next()?.parse().ok()?;
    let id = parts.next()?;
    Some((level, nanos, id))
}
