use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::encoding::encode_key;
use crate::error::StoreResult;
use crate::traits::{DocumentStore, Removal};

/// In-memory, BTreeMap-based document store.
///
/// Intended for tests and embedding. Keys follow the same rules as the file
/// store (non-empty, not the wildcard) so code can swap one for the other.
pub struct InMemoryDocumentStore<V> {
    documents: RwLock<BTreeMap<String, V>>,
}

impl<V> InMemoryDocumentStore<V> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.documents.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.read().expect("lock poisoned").is_empty()
    }
}

impl<V> Default for InMemoryDocumentStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for InMemoryDocumentStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("document_count", &self.len())
            .finish()
    }
}

impl<V> DocumentStore<V> for InMemoryDocumentStore<V>
where
    V: Clone + Send + Sync,
{
    fn exists(&self, key: &str) -> StoreResult<bool> {
        encode_key(key)?;
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn get(&self, key: &str) -> StoreResult<Option<V>> {
        encode_key(key)?;
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &V) -> StoreResult<String> {
        encode_key(key)?;
        let mut map = self.documents.write().expect("lock poisoned");
        map.insert(key.to_string(), value.clone());
        Ok(key.to_string())
    }

    fn delete(&self, key: &str) -> StoreResult<Removal> {
        encode_key(key)?;
        let mut map = self.documents.write().expect("lock poisoned");
        Ok(match map.remove(key) {
            Some(_) => Removal::Removed,
            None => Removal::Absent,
        })
    }

    fn find(&self) -> StoreResult<Vec<(String, V)>> {
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.documents.read().expect("lock poisoned");
        Ok(map.keys().cloned().collect())
    }
}
