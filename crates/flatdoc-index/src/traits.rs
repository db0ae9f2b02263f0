//! The [`SecondaryIndex`] trait defining the index interface.
//!
//! An index relates document keys to indexed values. Lookups take a key and
//! a value, either of which may be [`WILDCARD`]:
//!
//! - `get(key, "*")` -- values held by `key`
//! - `get("*", value)` -- documents holding `value`
//! - `exists("*", value)` -- is `value` claimed by anyone (the uniqueness probe)

use std::collections::BTreeSet;

use flatdoc_store::{Removal, WILDCARD};

use crate::error::{IndexError, IndexResult};

/// Secondary index over document keys.
///
/// Implementations must satisfy these invariants:
/// - `exists` and `get` never mutate.
/// - On a unique index, once a mutating call returns `Ok`, no value is held
///   by more than one document.
/// - `set` creates missing entries before removing stale ones, so a reader
///   may observe a superset of the old and new values but never a gap.
pub trait SecondaryIndex: Send + Sync {
    /// Whether each value may be held by at most one document.
    fn is_unique(&self) -> bool;

    /// Returns `true` if at least one entry matches.
    fn exists(&self, key: &str, value: &str) -> IndexResult<bool>;

    /// Decoded names of the matching entries.
    ///
    /// With `value == "*"` and a concrete key this is the set of values held
    /// by the key; otherwise it is the set of matching document keys. An
    /// empty set means nothing matched.
    fn get(&self, key: &str, value: &str) -> IndexResult<BTreeSet<String>>;

    /// Index new values for `key`.
    ///
    /// Fails with [`IndexError::Conflict`] if any value is already held by
    /// `key`, and with [`IndexError::UniquenessViolation`] if a unique value
    /// belongs to another document.
    fn add(&self, key: &str, values: &[&str]) -> IndexResult<()>;

    /// Make the values held by `key` exactly `values`.
    fn set(&self, key: &str, values: &[&str]) -> IndexResult<()>;

    /// Remove the matching entries.
    ///
    /// Returns [`Removal::Absent`] when nothing matched.
    fn delete(&self, key: &str, value: &str) -> IndexResult<Removal>;

    /// Every distinct value currently indexed.
    fn values(&self) -> IndexResult<BTreeSet<String>>;

    /// Bulk scans are not available on indexes.
    fn find(&self) -> IndexResult<Vec<(String, String)>> {
        Err(IndexError::Unsupported("find"))
    }

    /// Values held by `key`.
    fn values_of(&self, key: &str) -> IndexResult<BTreeSet<String>> {
        self.get(key, WILDCARD)
    }

    /// Documents holding `value`.
    fn keys_for(&self, value: &str) -> IndexResult<BTreeSet<String>> {
        self.get(WILDCARD, value)
    }
}
