//! Error types for line parsing.

use thiserror::Error;

use crate::detector::Format;

/// Errors that can occur while parsing log lines.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The line does not satisfy the chosen format's acceptance predicate.
    #[error("line does not match format {0}")]
    FormatMismatch(Format),
}

/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, ParseError>;
