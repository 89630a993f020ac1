//! Format detection.

use std::fmt;

use chrono::Utc;
use peek_model::Record;

use crate::error::{ParseError, Result};
use crate::json::StructuredFormat;
use crate::logfmt::LogfmtFormat;

/// A line format: an acceptance predicate plus a parser.
///
/// `parse` is only meaningful for lines `accepts` approves; callers that
/// bypass detection go through [`FormatDetector::parse_as`], which checks
/// the predicate first.
pub trait LineFormat: Send + Sync {
    /// Short format name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Returns true if this format can parse the line.
    fn accepts(&self, line: &str) -> bool;

    /// Parses the line into a record.
    fn parse(&self, line: &str) -> Record;
}

/// Explicit format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Try each format in detection order.
    #[default]
    Auto,
    /// Structured-object (JSON) only.
    Json,
    /// Logfmt only.
    Logfmt,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Json => f.write_str("json"),
            Self::Logfmt => f.write_str("logfmt"),
        }
    }
}

/// Tries known formats in a fixed order and falls back to a raw record.
///
/// Order matters: logfmt first, structured objects second. The raw
/// fallback means [`FormatDetector::parse`] succeeds for any line.
pub struct FormatDetector {
    formats: Vec<Box<dyn LineFormat>>,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDetector {
    /// Creates a detector with the standard format order.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: vec![
                Box::new(LogfmtFormat::new()),
                Box::new(StructuredFormat::new()),
            ],
        }
    }

    /// Parses a line, auto-detecting its format.
    ///
    /// The first format whose predicate accepts the line wins; if none
    /// accept, the result is a raw record carrying the line as its
    /// message, an empty level, and the ingest wall clock.
    #[must_use]
    pub fn parse(&self, line: &str) -> Record {
        for format in &self.formats {
            if format.accepts(line) {
                return format.parse(line);
            }
        }
        Record::raw_line(line, Utc::now())
    }

    /// Parses a line with a specific format.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FormatMismatch`] when the chosen format's
    /// acceptance predicate rejects the line.
    pub fn parse_as(&self, line: &str, format: Format) -> Result<Record> {
        let parser: &dyn LineFormat = match format {
            Format::Auto => return Ok(self.parse(line)),
            Format::Json => &StructuredFormat,
            Format::Logfmt => &LogfmtFormat,
        };

        if !parser.accepts(line) {
            return Err(ParseError::FormatMismatch(format));
        }
        Ok(parser.parse(line))
    }
}
