//! Error types for rule-set persistence

use thiserror::Error;

/// Rule store error
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed persisted payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, StoreError>;
