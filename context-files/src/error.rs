//! Error types for chunking, ranking and context storage.

use thiserror::Error;

use whisperer_embeddings::EmbeddingError;

/// Result type alias for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors that can occur while building, ranking or storing contexts.
#[derive(Error, Debug)]
pub enum ContextError {
    /// Malformed caller input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Named context does not exist.
    #[error("context not found: {0}")]
    NotFound(String),

    /// Query and fragment embeddings have different lengths.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Stored fragments violate the collection invariants.
    #[error("corrupt context {name}: {reason}")]
    CorruptCollection { name: String, reason: String },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<EmbeddingError> for ContextError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::DimensionMismatch { expected, actual } => {
                Self::DimensionMismatch { expected, actual }
            }
            other => Self::Validation(other.to_string()),
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a context file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a context file.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// Failed to delete a context file.
    #[error("failed to delete file: {0}")]
    DeleteFile(String),
}
