//! Error types for the log store.

use thiserror::Error;

/// Errors that can occur in the log store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem error while preparing or measuring the database.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The embedded engine reported a failure; surfaced as is.
    #[error("storage engine error: {0}")]
    Backend(#[from] redb::Error),
}

impl From<redb::DatabaseError> for StoreError {
    fn from(err: redb::DatabaseError) -> Self {
        Self::Backend(err.into())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(err: redb::TransactionError) -> Self {
        Self::Backend(err.into())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        Self::Backend(err.into())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        Self::Backend(err.into())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(err: redb::CommitError) -> Self {
        Self::Backend(err.into())
    }
}

impl From<redb::CompactionError> for StoreError {
    fn from(err: redb::CompactionError) -> Self {
        Self::Backend(err.into())
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err: StoreError = io.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StoreError>();
    }
}
