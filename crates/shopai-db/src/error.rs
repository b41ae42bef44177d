//! Error types for shopai-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shopai-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in shopai-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Index errors
    // ========================================================================
    /// Index I/O error.
    #[error("Index I/O error at {path}: {message}")]
    VectorIo { path: PathBuf, message: String },

    /// Index parse error.
    #[error("Index parse error at {path}: {message}")]
    VectorParse { path: PathBuf, message: String },

    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// No index at the given location.
    #[error("Embedding index not found at {path}")]
    IndexNotFound { path: PathBuf },

    /// Index exists but cannot serve the current configuration.
    #[error("Embedding index at {path} is incompatible: {reason}")]
    IndexIncompatible { path: PathBuf, reason: String },

    /// Index files disagree with each other (row count, positions, ids).
    #[error("Embedding index at {path} is inconsistent: {message}")]
    IndexCorrupted { path: PathBuf, message: String },

    // ========================================================================
    // General errors
    // ========================================================================
    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create an index I/O error.
    pub fn vector_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an index parse error.
    pub fn vector_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an index incompatible error.
    pub fn index_incompatible(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::IndexIncompatible {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an index corrupted error.
    pub fn index_corrupted(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::IndexCorrupted {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
