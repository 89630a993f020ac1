//! Logfmt (`key=value`) line parsing.

use std::collections::HashMap;

use peek_model::{FieldValue, Record};

use crate::detector::LineFormat;
use crate::extract::record_from_fields;

/// Parser for logfmt lines: `key=value` pairs separated by spaces, with
/// optionally quoted values honoring `\"` and `\\` escapes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogfmtFormat;

impl LogfmtFormat {
    /// Creates a new logfmt parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LineFormat for LogfmtFormat {
    fn name(&self) -> &'static str {
        "logfmt"
    }

    /// A line is logfmt when it carries a `msg=` pair, or a `level=` pair
    /// together with `source=`, `time=`, or `error=`. Plain prose that
    /// merely contains an `=` is rejected.
    fn accepts(&self, line: &str) -> bool {
        let has = |key: &str| line.contains(&format!("{key}="));
        has("msg") || (has("level") && (has("source") || has("time") || has("error")))
    }

    fn parse(&self, line: &str) -> Record {
        let fields: HashMap<String, FieldValue> = tokenize(line)
            .into_iter()
            .map(|(k, v)| (k, FieldValue::String(v)))
            .collect();
        record_from_fields(line, fields)
    }
}

/// Splits a logfmt line into key/value pairs.
///
/// Values starting with `"` run to the matching quote; a backslash escapes
/// the next character. Unquoted values end at the next space. `key=` with
/// nothing after it yields an empty value. Bare words without `=` are
/// skipped.
fn tokenize(line: &str) -> Vec<(String, String)> {
    let bytes = line.as_bytes();
    let mut pairs = Vec::new();
    let mut i = 0;
    let n = bytes.len();

    while i < n {
        while i < n && bytes[i] == b' ' {
            i += 1;
        }
        if i >= n {
            break;
        }

        let key_start = i;
        while i < n && bytes[i] != b'=' && bytes[i] != b' ' {
            i += 1;
        }
        if i >= n || bytes[i] != b'=' {
            continue;
        }
        let key = line[key_start..i].to_string();
        i += 1; // skip '='

        if i >= n {
            pairs.push((key, String::new()));
            break;
        }

        let value = if bytes[i] == b'"' {
            i += 1; // skip opening quote
            let mut buf = String::new();
            while i < n {
                if bytes[i] == b'\\' && i + 1 < n {
                    buf.push(bytes[i + 1] as char);
                    i += 2;
                } else if bytes[i] == b'"' {
                    i += 1; // skip closing quote
                    break;
                } else {
                    let ch_start = i;
                    i += 1;
                    while i < n && !line.is_char_boundary(i) {
                        i += 1;
                    }
                    buf.push_str(&line[ch_start..i]);
                }
            }
            buf
        } else {
            let value_start = i;
            while i < n && bytes[i] != b' ' {
                i += 1;
            }
            line[value_start..i].to_string()
        };

        pairs.push((key, value));
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(line: &str) -> HashMap<String, String> {
        tokenize(line).into_iter().collect()
    }

    // ===========================================
    // Acceptance predicate
    // ===========================================

    #[test]
    fn accepts_msg_lines() {
        let parser = LogfmtFormat::new();
        assert!(parser.accepts(r#"msg="hello world""#));
        assert!(parser.accepts("level=info msg=started"));
    }

    #[test]
    fn accepts_level_with_companion_key() {
        let parser = LogfmtFormat::new();
        assert!(parser.accepts("level=error source=worker"));
        assert!(parser.accepts("level=warn time=2026-01-01T00:00:00Z"));
        assert!(parser.accepts("level=error error=timeout"));
    }

    #[test]
    fn rejects_prose_with_equals() {
        let parser = LogfmtFormat::new();
        assert!(!parser.accepts("the answer = 42"));
        assert!(!parser.accepts("x=1 y=2"));
        assert!(!parser.accepts("level=info")); // level alone is not enough
    }

    // ===========================================
    // Tokenizer
    // ===========================================

    #[test]
    fn splits_simple_pairs() {
        let map = pairs("a=1 b=two c=3.5");
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "two");
        assert_eq!(map["c"], "3.5");
    }

    #[test]
    fn quoted_values_keep_spaces() {
        let map = pairs(r#"msg="Connection timeout" service=api"#);
        assert_eq!(map["msg"], "Connection timeout");
        assert_eq!(map["service"], "api");
    }

    #[test]
    fn escapes_inside_quotes() {
        let map = pairs(r#"msg="say \"hi\"" path="C:\\logs""#);
        assert_eq!(map["msg"], r#"say "hi""#);
        assert_eq!(map["path"], r"C:\logs");
    }

    #[test]
    fn empty_value_is_allowed() {
        let map = pairs("key= other=x");
        assert_eq!(map["key"], "");
        assert_eq!(map["other"], "x");

        let map = pairs("trailing=");
        assert_eq!(map["trailing"], "");
    }

    #[test]
    fn bare_words_are_skipped() {
        let map = pairs("garbage level=info msg=ok");
        assert_eq!(map.len(), 2);
        assert_eq!(map["level"], "info");
    }

    #[test]
    fn runs_of_spaces_separate_pairs() {
        let map = pairs("a=1    b=2");
        assert_eq!(map["a"], "1");
        assert_eq!(map["b"], "2");
    }

    #[test]
    fn multibyte_values_survive() {
        let map = pairs(r#"msg="útf-8 ⚠ works" emoji=🦀"#);
        assert_eq!(map["msg"], "útf-8 ⚠ works");
        assert_eq!(map["emoji"], "🦀");
    }

    // ===========================================
    // Full parse
    // ===========================================

    #[test]
    fn parses_scenario_line() {
        let parser = LogfmtFormat::new();
        let line = r#"time=2026-02-18T10:30:45Z level=ERROR msg="Connection timeout" service=api retry=3"#;
        let record = parser.parse(line);

        assert_eq!(record.level, "ERROR");
        assert_eq!(record.message, "Connection timeout");
        assert_eq!(record.raw, line);
        assert_eq!(
            record.fields.get("service"),
            Some(&FieldValue::String("api".into()))
        );
        assert_eq!(
            record.fields.get("retry"),
            Some(&FieldValue::String("3".into()))
        );
        assert_eq!(record.timestamp.to_rfc3339(), "2026-02-18T10:30:45+00:00");
    }

    #[test]
    fn level_aliases_are_normalized() {
        let parser = LogfmtFormat::new();
        let record = parser.parse("level=warning msg=x");
        assert_eq!(record.level, "WARN");
    }
}
