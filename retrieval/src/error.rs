//! Error types for the retrieval pipeline.

use thiserror::Error;

use whisperer_context_files::ContextError;
use whisperer_embeddings::EmbeddingError;
use whisperer_generation::GenerationError;
use whisperer_repo_walker::WalkerError;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur in the retrieval pipeline.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Context file error.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Generation error.
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),

    /// Repository walk error.
    #[error("walk error: {0}")]
    Walker(#[from] WalkerError),

    /// Malformed caller input.
    #[error("invalid input: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`RetrievalError`], for callers that turn
/// errors into a status or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Transport,
    Remote,
    DimensionMismatch,
    CorruptCollection,
    Io,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Transport => "transport",
            Self::Remote => "remote",
            Self::DimensionMismatch => "dimension_mismatch",
            Self::CorruptCollection => "corrupt_collection",
            Self::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RetrievalError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Context(err) => match err {
                ContextError::Validation(_) => ErrorKind::Validation,
                ContextError::NotFound(_) => ErrorKind::NotFound,
                ContextError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
                ContextError::CorruptCollection { .. } => ErrorKind::CorruptCollection,
                ContextError::Storage(_) | ContextError::Serialization(_) => ErrorKind::Io,
            },
            Self::Embedding(err) => match err {
                EmbeddingError::Transport(_) | EmbeddingError::Timeout { .. } => {
                    ErrorKind::Transport
                }
                EmbeddingError::Remote { .. } | EmbeddingError::InvalidResponse(_) => {
                    ErrorKind::Remote
                }
                EmbeddingError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            },
            Self::Generation(err) => {
                if err.is_transport() {
                    ErrorKind::Transport
                } else {
                    ErrorKind::Remote
                }
            }
            Self::Walker(err) => match err {
                WalkerError::RootNotFound(_) => ErrorKind::NotFound,
                WalkerError::NotADirectory(_) => ErrorKind::Validation,
                WalkerError::Io(_) => ErrorKind::Io,
            },
            Self::Validation(_) | Self::Config(_) => ErrorKind::Validation,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_kinds() {
        let cases = vec![
            (
                RetrievalError::from(ContextError::NotFound("demo".to_string())),
                ErrorKind::NotFound,
            ),
            (
                RetrievalError::from(ContextError::CorruptCollection {
                    name: "demo".to_string(),
                    reason: "mixed dimensions".to_string(),
                }),
                ErrorKind::CorruptCollection,
            ),
            (
                RetrievalError::from(EmbeddingError::Remote {
                    status: 500,
                    reason: "Internal Server Error".to_string(),
                }),
                ErrorKind::Remote,
            ),
            (
                RetrievalError::from(EmbeddingError::Timeout { timeout_secs: 30 }),
                ErrorKind::Transport,
            ),
            (
                RetrievalError::from(GenerationError::Timeout { timeout_secs: 120 }),
                ErrorKind::Transport,
            ),
            (
                RetrievalError::from(WalkerError::RootNotFound("/nope".to_string())),
                ErrorKind::NotFound,
            ),
            (
                RetrievalError::from(WalkerError::NotADirectory("/etc/hosts".to_string())),
                ErrorKind::Validation,
            ),
            (
                RetrievalError::Validation("query is required".to_string()),
                ErrorKind::Validation,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.kind(), expected, "{err}");
        }
    }
}
