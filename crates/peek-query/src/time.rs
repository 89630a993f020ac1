//! Range-bound time parsing.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// Smallest all-digits value interpreted as epoch milliseconds.
const EPOCH_MILLIS_FLOOR: i64 = 1_000_000_000_000;

/// Parses one bound of a `timestamp:[.. TO ..]` range.
///
/// Accepted forms, tried in order:
///
/// - `now`, `now-1h`, `now-15m`, `now-7d`, `now-2w`
/// - RFC3339 with a timezone
/// - RFC3339 without a timezone (assumed UTC), fractional seconds allowed
/// - Bare `YYYY-MM-DD` (midnight UTC)
/// - All digits greater than 10^12 (epoch milliseconds)
///
/// Anything else returns `None`, which callers treat as "unbounded".
#[must_use]
pub fn parse_time_bound(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Some(rest) = value.strip_prefix("now") {
        if rest.is_empty() {
            return Some(Utc::now());
        }
        if let Some(spec) = rest.strip_prefix('-') {
            if let Some(duration) = parse_duration(spec) {
                return Some(Utc::now() - duration);
            }
        }
        // Fall through: "nowhere" is not a relative bound.
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    if value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(millis) = value.parse::<i64>() {
            if millis > EPOCH_MILLIS_FLOOR {
                return Utc.timestamp_millis_opt(millis).single();
            }
        }
    }

    None
}

/// Parses a duration like `90s`, `15m`, `1h30m`, `7d`, or `2w`.
///
/// Day and week units extend the usual second/minute/hour set:
/// `d` is 24 hours, `w` is 168.
#[must_use]
pub fn parse_duration(spec: &str) -> Option<Duration> {
    if spec.is_empty() {
        return None;
    }
    let segment = Regex::new(r"(\d+)(ms|[smhdw])").ok()?;

    let mut total = Duration::zero();
    let mut consumed = 0;
    for captures in segment.captures_iter(spec) {
        let whole = captures.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();

        let amount: i64 = captures.get(1)?.as_str().parse().ok()?;
        let unit = captures.get(2)?.as_str();
        total = total
            + match unit {
                "ms" => Duration::milliseconds(amount),
                "s" => Duration::seconds(amount),
                "m" => Duration::minutes(amount),
                "h" => Duration::hours(amount),
                "d" => Duration::hours(amount * 24),
                "w" => Duration::hours(amount * 24 * 7),
                _ => return None,
            };
    }

    if consumed == spec.len() {
        Some(total)
    } else {
        None
    }
}
