//! Error types for muisti.

use std::path::PathBuf;

use thiserror::Error;

use crate::embedding::EmbeddingError;

/// Main error type for muisti operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No entry with the given id.
    #[error("Memory not found: {0}")]
    NotFound(String),

    /// Invalid operation on the memory store.
    #[error("Memory error: {0}")]
    Memory(String),

    /// Persistence failure while reading or writing a snapshot.
    #[error("Storage error at {path}: {message}")]
    Storage { path: PathBuf, message: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error raised by the embedding gateway, passed through unchanged.
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input text is empty or whitespace-only.
    #[error("Input cannot be empty")]
    EmptyInput,

    /// Input text exceeds the maximum allowed length.
    #[error("Input too long: {actual_length} bytes (max {max_length})")]
    InputTooLong {
        max_length: usize,
        actual_length: usize,
    },

    /// Result limit outside the accepted range.
    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Embedding dimension differs from the store's fixed dimension.
    #[error("Embedding dimension mismatch: store uses {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl Error {
    pub(crate) fn storage(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Error::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
