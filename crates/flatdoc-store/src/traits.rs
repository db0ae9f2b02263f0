use crate::error::{StoreError, StoreResult};

/// Outcome of a delete that did not fail.
///
/// Callers need to tell "there was nothing to delete" apart from "deleted";
/// an actual failure is reported through the `Err` side instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Removal {
    /// At least one file was unlinked.
    Removed,
    /// Nothing matched, so nothing was touched.
    Absent,
}

impl Removal {
    /// Returns `true` if something was actually removed.
    pub fn is_removed(self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// Key-addressed document storage.
///
/// All implementations must satisfy these invariants:
/// - A key maps to at most one document; `set` overwrites.
/// - `get` of a missing key is `Ok(None)`, never an error.
/// - `find` is fail-fast: one unreadable document aborts the whole scan.
/// - No implementation retries a failed operation.
pub trait DocumentStore<V>: Send + Sync {
    /// Check whether a document is stored under `key`.
    fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Read a document.
    ///
    /// Returns `Ok(None)` if no document exists.
    /// Returns `Err` if the document exists but cannot be read or decoded.
    fn get(&self, key: &str) -> StoreResult<Option<V>>;

    /// Write a document, overwriting whatever was stored under `key`.
    ///
    /// Returns the key on success.
    fn set(&self, key: &str, value: &V) -> StoreResult<String>;

    /// Remove a document.
    fn delete(&self, key: &str) -> StoreResult<Removal>;

    /// Read every stored document, sorted by key.
    fn find(&self) -> StoreResult<Vec<(String, V)>>;

    /// Write a new document, failing with [`StoreError::Conflict`] if the
    /// key is already taken.
    fn add(&self, key: &str, value: &V) -> StoreResult<String> {
        if self.exists(key)? {
            return Err(StoreError::Conflict(key.to_string()));
        }
        self.set(key, value)
    }

    /// Overwrite an existing document, failing with
    /// [`StoreError::NotFound`] if there is nothing to replace.
    fn replace(&self, key: &str, value: &V) -> StoreResult<String> {
        if !self.exists(key)? {
            return Err(StoreError::NotFound(key.to_string()));
        }
        self.set(key, value)
    }

    /// All stored keys, sorted.
    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.find()?.into_iter().map(|(key, _)| key).collect())
    }
}
