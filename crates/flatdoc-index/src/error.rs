//! Error types for the index crate.

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// `add` was asked to index a value the document already holds.
    #[error("value {value:?} is already indexed for {key:?}")]
    Conflict { key: String, value: String },

    /// A unique index already maps the value to another document.
    #[error("unique value {value:?} is already claimed by {owner:?}")]
    UniquenessViolation { value: String, owner: String },

    /// Filesystem or key-encoding failure.
    #[error("store error: {0}")]
    Store(#[from] flatdoc_store::StoreError),

    /// A lookup could not be turned into a glob pattern.
    #[error("invalid lookup pattern: {0}")]
    Pattern(String),

    /// The operation is not available on indexes.
    #[error("{0} is not supported on an index; use get with a wildcard")]
    Unsupported(&'static str),
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
