//! Error types for the repo walker.

use thiserror::Error;

/// Result type alias for walker operations.
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Errors that can occur while walking a repository.
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Root directory does not exist.
    #[error("directory not found: {0}")]
    RootNotFound(String),

    /// Root exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
