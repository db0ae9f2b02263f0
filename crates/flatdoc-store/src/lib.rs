//! Flat-file document storage for flatdoc.
//!
//! Every document is a serialized record addressed by a string key and
//! persisted as one file per key under a storage root. This crate also
//! carries the filesystem primitives and the key encoding that the
//! secondary-index crate builds on.
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`FileDocumentStore`] -- one file per key under a root directory
//! - [`BlobStore`] -- file store that also reports file timestamps
//! - [`InMemoryDocumentStore`] -- `BTreeMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. The store never interprets document bytes; a [`Serializer`] does.
//! 2. Keys are percent-encoded into a single file name; `*` is reserved.
//! 3. A missing document is `Ok(None)`, a failed read is `Err`.
//! 4. Deletes report [`Removal::Absent`] rather than failing when there is
//!    nothing to delete.
//! 5. Nothing is retried and nothing is cached. No cross-file atomicity.

pub mod blob;
pub mod config;
pub mod encoding;
pub mod error;
pub mod file;
pub mod fs;
pub mod memory;
pub mod serializer;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use blob::{BlobMetadata, BlobRecord, BlobStore, BLOB_DIR};
pub use config::StoreConfig;
pub use encoding::WILDCARD;
pub use error::{StoreError, StoreResult};
pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use serializer::{BincodeSerializer, JsonSerializer, Serializer};
pub use traits::{DocumentStore, Removal};
