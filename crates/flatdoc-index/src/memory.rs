use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use flatdoc_store::encoding::{encode_key, encode_pattern};
use flatdoc_store::{Removal, WILDCARD};

use crate::entry::normalize_values;
use crate::error::{IndexError, IndexResult};
use crate::traits::SecondaryIndex;

#[derive(Default)]
struct Relation {
    /// value -> documents holding it
    by_value: BTreeMap<String, BTreeSet<String>>,
    /// document -> values it holds
    by_key: BTreeMap<String, BTreeSet<String>>,
}

impl Relation {
    fn insert(&mut self, key: &str, value: &str) {
        self.by_value
            .entry(value.to_string())
            .or_default()
            .insert(key.to_string());
        self.by_key
            .entry(key.to_string())
            .or_default()
            .insert(value.to_string());
    }

    fn remove(&mut self, key: &str, value: &str) -> bool {
        let removed = detach(&mut self.by_value, value, key);
        detach(&mut self.by_key, key, value);
        removed
    }

    fn owner(&self, value: &str) -> Option<&String> {
        self.by_value.get(value).and_then(|keys| keys.iter().next())
    }

    fn held_by(&self, key: &str) -> BTreeSet<String> {
        self.by_key.get(key).cloned().unwrap_or_default()
    }

    /// Matching (key, value) pairs for a possibly wildcarded lookup.
    fn pairs(&self, key: &str, value: &str) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (k, values) in &self.by_key {
            if key != WILDCARD && k != key {
                continue;
            }
            for v in values {
                if value == WILDCARD || v == value {
                    pairs.push((k.clone(), v.clone()));
                }
            }
        }
        pairs
    }

    fn check_unique(&self, key: &str, value: &str) -> IndexResult<()> {
        match self.owner(value) {
            Some(owner) if owner != key => Err(IndexError::UniquenessViolation {
                value: value.to_string(),
                owner: owner.clone(),
            }),
            _ => Ok(()),
        }
    }
}

/// Drop `member` from the set under `name`, pruning the set when it empties.
fn detach(map: &mut BTreeMap<String, BTreeSet<String>>, name: &str, member: &str) -> bool {
    let Some(set) = map.get_mut(name) else {
        return false;
    };
    let removed = set.remove(member);
    if set.is_empty() {
        map.remove(name);
    }
    removed
}

/// In-memory secondary index: an explicit value-to-keys map and its inverse
/// behind a single `RwLock`.
///
/// Lookups behave exactly like [`crate::FileIndex`]. Unlike the file index,
/// every mutating call validates all of its values before changing anything,
/// so a failed `add` or `set` leaves the index untouched.
pub struct InMemoryIndex {
    unique: bool,
    relation: RwLock<Relation>,
}

impl InMemoryIndex {
    /// Create an empty index.
    pub fn new(unique: bool) -> Self {
        Self {
            unique,
            relation: RwLock::new(Relation::default()),
        }
    }

    /// Number of (key, value) entries.
    pub fn len(&self) -> usize {
        let relation = self.relation.read().expect("lock poisoned");
        relation.by_key.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.relation.read().expect("lock poisoned").by_key.is_empty()
    }
}

impl std::fmt::Debug for InMemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryIndex")
            .field("unique", &self.unique)
            .field("entry_count", &self.len())
            .finish()
    }
}

impl SecondaryIndex for InMemoryIndex {
    fn is_unique(&self) -> bool {
        self.unique
    }

    fn exists(&self, key: &str, value: &str) -> IndexResult<bool> {
        Ok(!self.get(key, value)?.is_empty())
    }

    fn get(&self, key: &str, value: &str) -> IndexResult<BTreeSet<String>> {
        encode_pattern(key)?;
        encode_pattern(value)?;
        let relation = self.relation.read().expect("lock poisoned");
        let report_values = value == WILDCARD && key != WILDCARD;
        Ok(relation
            .pairs(key, value)
            .into_iter()
            .map(|(k, v)| if report_values { v } else { k })
            .collect())
    }

    fn add(&self, key: &str, values: &[&str]) -> IndexResult<()> {
        encode_key(key)?;
        let values = normalize_values(values)?;
        let mut relation = self.relation.write().expect("lock poisoned");

        let stored = relation.held_by(key);
        if let Some(dup) = values.iter().find(|v| stored.contains(*v)) {
            return Err(IndexError::Conflict {
                key: key.to_string(),
                value: dup.clone(),
            });
        }
        if self.unique {
            for value in &values {
                relation.check_unique(key, value)?;
            }
        }

        for value in &values {
            relation.insert(key, value);
        }
        Ok(())
    }

    fn set(&self, key: &str, values: &[&str]) -> IndexResult<()> {
        encode_key(key)?;
        let target = normalize_values(values)?;
        let mut relation = self.relation.write().expect("lock poisoned");

        let stored = relation.held_by(key);
        if self.unique {
            for value in target.difference(&stored) {
                relation.check_unique(key, value)?;
            }
        }

        for value in target.difference(&stored) {
            relation.insert(key, value);
        }
        for value in stored.difference(&target) {
            relation.remove(key, value);
        }
        Ok(())
    }

    fn delete(&self, key: &str, value: &str) -> IndexResult<Removal> {
        encode_pattern(key)?;
        encode_pattern(value)?;
        let mut relation = self.relation.write().expect("lock poisoned");

        let pairs = relation.pairs(key, value);
        let mut removal = Removal::Absent;
        for (k, v) in pairs {
            if relation.remove(&k, &v) {
                removal = Removal::Removed;
            }
        }
        Ok(removal)
    }

    fn values(&self) -> IndexResult<BTreeSet<String>> {
        let relation = self.relation.read().expect("lock poisoned");
        Ok(relation.by_value.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::conformance::{self, set_of};

    #[test]
    fn add_then_lookup() {
        conformance::add_then_lookup(&InMemoryIndex::new(false));
    }

    #[test]
    fn non_unique_scenario() {
        conformance::non_unique_scenario(&InMemoryIndex::new(false));
    }

    #[test]
    fn unique_scenario() {
        conformance::unique_scenario(&InMemoryIndex::new(true));
    }

    #[test]
    fn unique_set_keeps_own_values() {
        conformance::unique_set_keeps_own_values(&InMemoryIndex::new(true));
    }

    #[test]
    fn duplicate_add_conflicts() {
        conformance::duplicate_add_conflicts(&InMemoryIndex::new(false));
    }

    #[test]
    fn set_is_idempotent() {
        conformance::set_is_idempotent(&InMemoryIndex::new(true));
    }

    #[test]
    fn set_empty_clears() {
        conformance::set_empty_clears(&InMemoryIndex::new(false));
    }

    #[test]
    fn delete_semantics() {
        conformance::delete_semantics(&InMemoryIndex::new(false));
    }

    #[test]
    fn encoded_names_roundtrip() {
        conformance::encoded_names_roundtrip(&InMemoryIndex::new(false));
    }

    #[test]
    fn wildcard_is_not_storable() {
        conformance::wildcard_is_not_storable(&InMemoryIndex::new(false));
    }

    #[test]
    fn failed_unique_add_changes_nothing() {
        let index = InMemoryIndex::new(true);
        index.add("doc1", &["b"]).unwrap();

        let err = index.add("doc2", &["a", "b"]).unwrap_err();
        assert!(matches!(err, IndexError::UniquenessViolation { .. }));
        assert!(index.values_of("doc2").unwrap().is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn inverse_maps_stay_in_sync() {
        let index = InMemoryIndex::new(false);
        index.set("d1", &["a", "b"]).unwrap();
        index.set("d2", &["b"]).unwrap();
        index.set("d1", &["c"]).unwrap();

        assert_eq!(index.values().unwrap(), set_of(&["b", "c"]));
        assert_eq!(index.keys_for("b").unwrap(), set_of(&["d2"]));
        assert_eq!(index.len(), 2);

        index.delete("d2", WILDCARD).unwrap();
        index.delete("d1", WILDCARD).unwrap();
        assert!(index.is_empty());
        assert!(index.values().unwrap().is_empty());
    }

    #[test]
    fn debug_format() {
        let index = InMemoryIndex::new(true);
        index.add("k", &["v"]).unwrap();
        let debug = format!("{index:?}");
        assert!(debug.contains("InMemoryIndex"));
        assert!(debug.contains("entry_count: 1"));
    }
}
