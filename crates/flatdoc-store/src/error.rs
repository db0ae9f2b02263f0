use std::io;
use std::path::PathBuf;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The storage root could not be created.
    #[error("cannot create storage root {path}: {source}")]
    Init { path: PathBuf, source: io::Error },

    /// An existing file could not be read.
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// A file could not be written.
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// An existing file could not be unlinked.
    #[error("failed to delete {path}: {source}")]
    Delete { path: PathBuf, source: io::Error },

    /// `add` was called for a key that is already stored.
    #[error("document already exists: {0}")]
    Conflict(String),

    /// `replace` was called for a key that is not stored.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The key cannot be mapped to a file name.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
