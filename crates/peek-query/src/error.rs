//! Error types for query parsing.

use thiserror::Error;

/// Errors that can occur while compiling a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The query string is structurally malformed.
    #[error("invalid query at position {position}: {message}")]
    Parse {
        /// What went wrong.
        message: String,
        /// Byte offset into the query string.
        position: usize,
    },
}

impl QueryError {
    /// Creates a parse error at the given position.
    #[must_use]
    pub fn parse(message: impl Into<String>, position: usize) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }
}

/// Result type alias for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_position() {
        let err = QueryError::parse("expected closing parenthesis", 12);
        assert_eq!(
            err.to_string(),
            "invalid query at position 12: expected closing parenthesis"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryError>();
    }
}
