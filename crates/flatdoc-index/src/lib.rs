//! Secondary indexes for flatdoc.
//!
//! An index relates document keys to the values of one indexed field so
//! documents can be found by value. A unique index additionally guarantees
//! that a value is held by at most one document.
//!
//! The file-backed index stores nothing but empty marker files: the entry
//! for document `key` holding `value` is `root/encode(value)/encode(key)`.
//! Membership is existence; lookups are globs with `*` in the free position.
//!
//! # Key Types
//!
//! - [`SecondaryIndex`] -- the index interface
//! - [`FileIndex`] -- path-encoded index on disk
//! - [`InMemoryIndex`] -- map-backed index for tests and embedding
//! - [`IndexConfig`] -- root directory and uniqueness flag
//!
//! # Keeping an index in sync
//!
//! Write the document first, then declare its indexed values with
//! [`SecondaryIndex::set`], which adds what is missing and removes what is
//! stale. New entries are committed before stale ones are removed.

pub mod config;
pub mod entry;
pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use config::IndexConfig;
pub use error::{IndexError, IndexResult};
pub use file::FileIndex;
pub use memory::InMemoryIndex;
pub use traits::SecondaryIndex;
