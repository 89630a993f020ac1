//! # peek-query
//!
//! Lucene-style query language for log records.
//!
//! This crate provides:
//!
//! - [`Query`] — A parsed query string, ready to evaluate
//! - [`Filter`] — The compiled filter tree (AND/OR/NOT, field terms,
//!   keywords, wildcards, timestamp and numeric ranges)
//! - [`QueryError`] — Parse errors carrying the offending position
//!
//! ## Syntax
//!
//! ```text
//! level:ERROR AND service:api          implicit AND between terms
//! message:"connection refused"         quoted terms match exactly
//! message:*timeout*                    wildcards, case-insensitive
//! status:[200 TO 299]                  numeric range, inclusive
//! timestamp:[now-1h TO now]            relative or RFC3339 bounds
//! timeout OR refused                   bare keywords search everywhere
//! NOT level:DEBUG
//! ```
//!
//! The empty query and `*` both match every record.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod filter;
mod parser;
pub mod time;

pub use error::{QueryError, Result};
pub use filter::Filter;
pub use time::parse_time_bound;

use peek_model::Record;

/// A parsed query.
#[derive(Debug, Clone)]
pub struct Query {
    filter: Filter,
}

impl Query {
    /// Parses a query string into a compiled filter.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Parse`] for structurally malformed input:
    /// unmatched parentheses, empty groups, a colon with no field name,
    /// unterminated quotes, or a range without ` TO `.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self {
                filter: Filter::All,
            });
        }
        let filter = parser::parse(trimmed)?;
        Ok(Self { filter })
    }

    /// Evaluates the query against a record.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.filter.matches(record)
    }

    /// Borrows the compiled filter.
    #[must_use]
    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Consumes the query, returning its compiled filter.
    #[must_use]
    pub fn into_filter(self) -> Filter {
        self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::Utc;
    use peek_model::FieldValue;

    fn record(level: &str, message: &str, fields: &[(&str, FieldValue)]) -> Record {
        Record {
            id: peek_model::generate_record_id(),
            timestamp: Utc::now(),
            level: level.to_string(),
            message: message.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            raw: message.to_string(),
        }
    }

    #[test]
    fn empty_and_star_match_everything() {
        let r = record("ERROR", "boom", &[]);
        assert!(Query::parse("").expect("empty").matches(&r));
        assert!(Query::parse("*").expect("star").matches(&r));
        assert!(Query::parse("   ").expect("spaces").matches(&r));
    }

    #[test]
    fn field_term_and_implicit_and() {
        let r = record(
            "ERROR",
            "Connection timeout",
            &[("service", FieldValue::from("api"))],
        );
        let q = Query::parse("level:ERROR AND service:api").expect("parse");
        assert!(q.matches(&r));

        let q = Query::parse("level:ERROR service:api").expect("parse");
        assert!(q.matches(&r));

        let q = Query::parse("level:ERROR service:web").expect("parse");
        assert!(!q.matches(&r));
    }

    #[test]
    fn or_and_not() {
        let err = record("ERROR", "x", &[]);
        let warn = record("WARN", "x", &[]);
        let info = record("INFO", "x", &[]);

        let q = Query::parse("level:ERROR OR level:WARN").expect("parse");
        assert!(q.matches(&err));
        assert!(q.matches(&warn));
        assert!(!q.matches(&info));

        let q = Query::parse("NOT level:ERROR").expect("parse");
        assert!(!q.matches(&err));
        assert!(q.matches(&info));
    }

    #[test]
    fn parens_group() {
        let r = record("WARN", "slow request", &[("service", FieldValue::from("api"))]);
        let q = Query::parse("(level:ERROR OR level:WARN) AND service:api").expect("parse");
        assert!(q.matches(&r));

        let q = Query::parse("(level:ERROR OR level:WARN) AND service:db").expect("parse");
        assert!(!q.matches(&r));
    }

    #[test]
    fn keyword_searches_message_and_fields() {
        let r = record(
            "INFO",
            "request finished",
            &[("client", FieldValue::from("mobile-app"))],
        );
        assert!(Query::parse("finished").expect("parse").matches(&r));
        assert!(Query::parse("MOBILE").expect("parse").matches(&r));
        assert!(!Query::parse("desktop").expect("parse").matches(&r));
    }

    #[test]
    fn quoted_term_is_exact() {
        let refused = record("ERROR", "connection refused", &[]);
        let timeout = record("ERROR", "connection timeout", &[]);

        let q = Query::parse(r#"message:"connection refused""#).expect("parse");
        assert!(q.matches(&refused));
        assert!(!q.matches(&timeout));

        // Exact means the whole value, not a substring.
        let partial = record("ERROR", "connection refused by peer", &[]);
        assert!(!q.matches(&partial));
    }

    #[test]
    fn unquoted_field_term_is_substring() {
        let r = record("ERROR", "connection timeout", &[]);
        let q = Query::parse("message:timeout").expect("parse");
        assert!(q.matches(&r));

        let q = Query::parse("message:TIMEOUT").expect("parse");
        assert!(q.matches(&r), "substring match is case-insensitive");
    }

    #[test]
    fn wildcard_scenario() {
        let a = record("INFO", "connection timeout", &[]);
        let b = record("INFO", "read timeout", &[]);
        let c = record("INFO", "connection refused", &[]);

        let q = Query::parse("message:*timeout*").expect("parse");
        assert!(q.matches(&a));
        assert!(q.matches(&b));
        assert!(!q.matches(&c));
    }

    #[test]
    fn numeric_range_scenario() {
        let q = Query::parse("status:[200 TO 299]").expect("parse");
        let mut hits = 0;
        for status in [199, 200, 250, 299, 300] {
            let r = record("INFO", "req", &[("status", FieldValue::Integer(status))]);
            if q.matches(&r) {
                hits += 1;
            }
        }
        assert_eq!(hits, 3);
    }

    #[test]
    fn numeric_range_accepts_numeric_strings() {
        let q = Query::parse("status:[200 TO 299]").expect("parse");
        let r = record("INFO", "req", &[("status", FieldValue::from("250"))]);
        assert!(q.matches(&r));

        let r = record("INFO", "req", &[("status", FieldValue::from("nope"))]);
        assert!(!q.matches(&r));
    }

    #[test]
    fn missing_field_never_matches() {
        let r = record("INFO", "x", &[]);
        assert!(!Query::parse("service:api").expect("parse").matches(&r));
        assert!(!Query::parse("service:*a*").expect("parse").matches(&r));
        assert!(!Query::parse("status:[1 TO 2]").expect("parse").matches(&r));
    }

    #[test]
    fn timestamp_range_with_open_start() {
        let r = record("INFO", "x", &[]);
        let q = Query::parse("timestamp:[whatever TO now]").expect("parse");
        // Unparsable start bound means no lower bound.
        assert!(q.matches(&r));
    }

    #[test]
    fn malformed_queries_report_position() {
        for bad in ["(level:ERROR", "()", ":value", "status:[200 299]", "level:"] {
            let err = Query::parse(bad).expect_err(bad);
            let QueryError::Parse { position, .. } = err;
            assert!(position <= bad.len(), "position in range for {bad:?}");
        }
    }

    #[test]
    fn stray_closing_paren_is_rejected() {
        assert!(Query::parse("level:ERROR)").is_err());
    }
}
