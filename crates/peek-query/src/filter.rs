//! Compiled filter tree and evaluation.

use chrono::{DateTime, Utc};
use peek_model::Record;
use regex::Regex;

/// A compiled query filter.
///
/// Evaluation is pure: no I/O, no suspension. The same tree drives both
/// the batch query path and the live subscription path.
#[derive(Debug, Clone)]
pub enum Filter {
    /// Matches every record.
    All,
    /// Both sides must match.
    And(Box<Filter>, Box<Filter>),
    /// Either side must match.
    Or(Box<Filter>, Box<Filter>),
    /// Inner must not match.
    Not(Box<Filter>),
    /// Field comparison. `exact` means equality; otherwise a
    /// case-insensitive substring match.
    Field {
        /// Field name (`level` and `message` resolve to the built-ins).
        name: String,
        /// Value to compare against.
        value: String,
        /// Equality vs. substring.
        exact: bool,
    },
    /// Case-insensitive substring search across the message and every
    /// field value.
    Keyword(String),
    /// Wildcard match against one field, anchored at both ends.
    Wildcard {
        /// Field name.
        name: String,
        /// Compiled case-insensitive pattern.
        pattern: Regex,
    },
    /// Inclusive timestamp window; `None` means unbounded on that side.
    TimestampRange {
        /// Inclusive lower bound.
        start: Option<DateTime<Utc>>,
        /// Inclusive upper bound.
        end: Option<DateTime<Utc>>,
    },
    /// Inclusive numeric window over a field. Numeric strings count.
    NumericRange {
        /// Field name.
        name: String,
        /// Inclusive lower bound.
        start: f64,
        /// Inclusive upper bound.
        end: f64,
    },
}

impl Filter {
    /// Combines two filters with AND, collapsing tautologies.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, f) | (f, Self::All) => f,
            (a, b) => Self::And(Box::new(a), Box::new(b)),
        }
    }

    /// A filter that hides records older than `cutoff`.
    ///
    /// Used by fresh mode to restrict queries and subscriptions to the
    /// current ingest session.
    #[must_use]
    pub const fn since(cutoff: DateTime<Utc>) -> Self {
        Self::TimestampRange {
            start: Some(cutoff),
            end: None,
        }
    }

    /// Evaluates the filter against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::And(left, right) => left.matches(record) && right.matches(record),
            Self::Or(left, right) => left.matches(record) || right.matches(record),
            Self::Not(inner) => !inner.matches(record),
            Self::Field { name, value, exact } => match record.field_text(name) {
                Some(actual) if *exact => actual == *value,
                Some(actual) => actual.to_lowercase().contains(&value.to_lowercase()),
                None => false,
            },
            Self::Keyword(keyword) => {
                let needle = keyword.to_lowercase();
                if record.message.to_lowercase().contains(&needle) {
                    return true;
                }
                record
                    .fields
                    .values()
                    .any(|v| v.to_string().to_lowercase().contains(&needle))
            }
            Self::Wildcard { name, pattern } => record
                .field_text(name)
                .is_some_and(|actual| pattern.is_match(&actual)),
            Self::TimestampRange { start, end } => {
                if let Some(start) = start {
                    if record.timestamp < *start {
                        return false;
                    }
                }
                if let Some(end) = end {
                    if record.timestamp > *end {
                        return false;
                    }
                }
                true
            }
            Self::NumericRange { name, start, end } => record
                .fields
                .get(name)
                .and_then(peek_model::FieldValue::as_f64)
                .is_some_and(|value| value >= *start && value <= *end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use peek_model::FieldValue;

    fn record_at(ts: DateTime<Utc>) -> Record {
        Record {
            id: "0000000000000000".to_string(),
            timestamp: ts,
            level: "INFO".to_string(),
            message: "tick".to_string(),
            fields: HashMap::new(),
            raw: "tick".to_string(),
        }
    }

    #[test]
    fn and_collapses_tautologies() {
        let f = Filter::All.and(Filter::Keyword("x".into()));
        assert!(matches!(f, Filter::Keyword(_)));

        let f = Filter::Keyword("x".into()).and(Filter::All);
        assert!(matches!(f, Filter::Keyword(_)));

        let f = Filter::Keyword("x".into()).and(Filter::Keyword("y".into()));
        assert!(matches!(f, Filter::And(_, _)));
    }

    #[test]
    fn timestamp_range_bounds_are_inclusive() {
        let now = Utc::now();
        let filter = Filter::TimestampRange {
            start: Some(now),
            end: Some(now),
        };
        assert!(filter.matches(&record_at(now)));
        assert!(!filter.matches(&record_at(now - chrono::Duration::nanoseconds(1))));
        assert!(!filter.matches(&record_at(now + chrono::Duration::nanoseconds(1))));
    }

    #[test]
    fn zero_start_means_no_lower_bound() {
        let filter = Filter::TimestampRange {
            start: None,
            end: Some(Utc::now()),
        };
        let ancient = record_at(Utc::now() - chrono::Duration::days(10_000));
        assert!(filter.matches(&ancient));
    }

    #[test]
    fn since_hides_older_records() {
        let cutoff = Utc::now();
        let filter = Filter::since(cutoff);
        assert!(!filter.matches(&record_at(cutoff - chrono::Duration::hours(1))));
        assert!(filter.matches(&record_at(cutoff + chrono::Duration::seconds(1))));
    }

    #[test]
    fn numeric_range_ignores_non_numeric() {
        let mut record = record_at(Utc::now());
        record
            .fields
            .insert("status".to_string(), FieldValue::Bool(true));
        let filter = Filter::NumericRange {
            name: "status".to_string(),
            start: 0.0,
            end: 1.0,
        };
        assert!(!filter.matches(&record));
    }

    #[test]
    fn keyword_checks_composite_field_values() {
        let mut record = record_at(Utc::now());
        record.fields.insert(
            "tags".to_string(),
            FieldValue::Array(vec![FieldValue::from("payments")]),
        );
        assert!(Filter::Keyword("payments".into()).matches(&record));
    }

    #[test]
    fn field_on_empty_level() {
        let mut record = record_at(Utc::now());
        record.level = String::new();
        let filter = Filter::Field {
            name: "level".to_string(),
            value: String::new(),
            exact: true,
        };
        assert!(filter.matches(&record));
    }
}
