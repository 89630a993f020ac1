//! Error types for the peek binary.

use thiserror::Error;

/// Top-level errors; any of these ends the process with a non-zero exit.
#[derive(Debug, Error)]
pub enum PeekError {
    /// Bad configuration file or value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] peek_store::StoreError),

    /// The server failed (bind errors land here).
    #[error(transparent)]
    Server(#[from] peek_server::ServerError),

    /// Filesystem or stdin error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for the binary.
pub type Result<T> = std::result::Result<T, PeekError>;
