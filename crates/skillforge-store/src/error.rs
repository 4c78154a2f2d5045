//! Error types for skillforge-store

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by skill stores and exporters
#[derive(Error, Debug)]
pub enum StoreError {
    /// No skill stored under the slug
    #[error("Skill not found: {slug}")]
    NotFound { slug: String },

    /// Slug contains characters that could escape the store root
    #[error("Invalid skill slug: {slug}")]
    InvalidSlug { slug: String },

    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, err))
    }
}
