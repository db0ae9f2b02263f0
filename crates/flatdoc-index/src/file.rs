//! Filesystem-backed secondary index.
//!
//! Entries are empty marker files laid out as `root/<value>/<key>`, both
//! segments percent-encoded (see [`crate::entry`]). Lookups are glob
//! patterns over that layout with `*` standing in for the free side.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use flatdoc_store::encoding::{encode_key, encode_segment};
use flatdoc_store::{fs, Removal, StoreError, WILDCARD};
use tracing::debug;

use crate::config::IndexConfig;
use crate::entry::{entry_path, normalize_values, Lookup};
use crate::error::{IndexError, IndexResult};
use crate::traits::SecondaryIndex;

/// Secondary index persisted as a two-level directory tree.
///
/// Every mutating call holds the instance's write lock from its first read
/// to its last write, so callers sharing one `FileIndex` cannot interleave a
/// uniqueness check with another commit. Separate instances or processes
/// over the same root get no such protection.
///
/// Multi-value calls are not atomic: if `add`, `set` or `delete` fails
/// part-way, the entries it already created or removed stay that way.
pub struct FileIndex {
    root: PathBuf,
    unique: bool,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for FileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileIndex")
            .field("root", &self.root)
            .field("unique", &self.unique)
            .finish()
    }
}

impl FileIndex {
    /// Open an index, creating its root directory if needed.
    pub fn open(config: &IndexConfig) -> IndexResult<Self> {
        fs::ensure_root(&config.root)?;
        debug!(root = %config.root.display(), unique = config.unique, "index opened");
        Ok(Self {
            root: config.root.clone(),
            unique: config.unique,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the entries.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().expect("index lock poisoned")
    }

    fn entry_file(&self, key: &str, value: &str) -> PathBuf {
        self.root.join(encode_segment(value)).join(encode_segment(key))
    }

    /// Entry files matching a (possibly wildcarded) key and value.
    fn matches(&self, key: &str, value: &str) -> IndexResult<Vec<PathBuf>> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{root}/{}", entry_path(key, value)?);
        let paths = glob::glob(&pattern).map_err(|e| IndexError::Pattern(e.to_string()))?;

        let mut entries = Vec::new();
        for path in paths {
            let path = path.map_err(|e| StoreError::Read {
                path: e.path().to_path_buf(),
                source: e.into_error(),
            })?;
            if path.is_file() {
                entries.push(path);
            }
        }
        Ok(entries)
    }

    fn lookup(&self, key: &str, value: &str) -> IndexResult<BTreeSet<String>> {
        let lookup = Lookup::for_query(key, value);
        self.matches(key, value)?
            .iter()
            .map(|entry| lookup.decode(entry))
            .collect()
    }

    /// Create the value directories the new entries will live in.
    fn prepare_rows(&self, values: &BTreeSet<String>) -> IndexResult<()> {
        for value in values {
            fs::ensure_dir(&self.root.join(encode_segment(value)))?;
        }
        Ok(())
    }

    /// Write the marker for `key` holding `value`, honouring uniqueness.
    fn claim(&self, key: &str, value: &str) -> IndexResult<()> {
        if self.unique {
            if let Some(owner) = self.lookup(WILDCARD, value)?.into_iter().next() {
                return Err(IndexError::UniquenessViolation {
                    value: value.to_string(),
                    owner,
                });
            }
        }
        fs::write_file(&self.entry_file(key, value), &[])?;
        Ok(())
    }

    fn remove_entries(&self, key: &str, value: &str) -> IndexResult<Removal> {
        let entries = self.matches(key, value)?;
        if entries.is_empty() {
            return Ok(Removal::Absent);
        }

        for entry in &entries {
            fs::remove_file(entry)?;
        }

        // Value directories are only scaffolding; a non-empty or already
        // removed directory is fine.
        let dirs: BTreeSet<&Path> = entries.iter().filter_map(|e| e.parent()).collect();
        for dir in dirs {
            fs::prune_dir(dir);
        }
        Ok(Removal::Removed)
    }
}

impl SecondaryIndex for FileIndex {
    fn is_unique(&self) -> bool {
        self.unique
    }

    fn exists(&self, key: &str, value: &str) -> IndexResult<bool> {
        Ok(!self.matches(key, value)?.is_empty())
    }

    fn get(&self, key: &str, value: &str) -> IndexResult<BTreeSet<String>> {
        self.lookup(key, value)
    }

    fn add(&self, key: &str, values: &[&str]) -> IndexResult<()> {
        encode_key(key)?;
        let values = normalize_values(values)?;
        let _guard = self.lock();

        let stored = self.lookup(key, WILDCARD)?;
        if let Some(dup) = values.iter().find(|v| stored.contains(*v)) {
            return Err(IndexError::Conflict {
                key: key.to_string(),
                value: dup.clone(),
            });
        }

        self.prepare_rows(&values)?;
        for value in &values {
            self.claim(key, value)?;
        }

        debug!(key, count = values.len(), "index entries added");
        Ok(())
    }

    fn set(&self, key: &str, values: &[&str]) -> IndexResult<()> {
        encode_key(key)?;
        let target = normalize_values(values)?;
        let _guard = self.lock();

        self.prepare_rows(&target)?;
        let stored = self.lookup(key, WILDCARD)?;

        let mut added = 0usize;
        for value in target.difference(&stored) {
            self.claim(key, value)?;
            added += 1;
        }

        let mut removed = 0usize;
        for value in stored.difference(&target) {
            self.remove_entries(key, value)?;
            removed += 1;
        }

        debug!(key, added, removed, "index entries reconciled");
        Ok(())
    }

    fn delete(&self, key: &str, value: &str) -> IndexResult<Removal> {
        let _guard = self.lock();
        let removal = self.remove_entries(key, value)?;
        if removal.is_removed() {
            debug!(key, value, "index entries deleted");
        }
        Ok(removal)
    }

    fn values(&self) -> IndexResult<BTreeSet<String>> {
        let entries = self.matches(WILDCARD, WILDCARD)?;
        entries
            .iter()
            .map(|entry| Lookup::ValuesOf.decode(entry))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::conformance::{self, set_of};
    use proptest::prelude::*;

    fn open(dir: &Path, unique: bool) -> FileIndex {
        let config = IndexConfig {
            root: dir.join("idx"),
            unique,
        };
        FileIndex::open(&config).unwrap()
    }

    // -----------------------------------------------------------------------
    // Shared behaviour
    // -----------------------------------------------------------------------

    #[test]
    fn add_then_lookup() {
        let dir = tempfile::tempdir().unwrap();
        conformance::add_then_lookup(&open(dir.path(), false));
    }

    #[test]
    fn non_unique_scenario() {
        let dir = tempfile::tempdir().unwrap();
        conformance::non_unique_scenario(&open(dir.path(), false));
    }

    #[test]
    fn unique_scenario() {
        let dir = tempfile::tempdir().unwrap();
        conformance::unique_scenario(&open(dir.path(), true));
    }

    #[test]
    fn unique_set_keeps_own_values() {
        let dir = tempfile::tempdir().unwrap();
        conformance::unique_set_keeps_own_values(&open(dir.path(), true));
    }

    #[test]
    fn duplicate_add_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        conformance::duplicate_add_conflicts(&open(dir.path(), false));
    }

    #[test]
    fn set_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        conformance::set_is_idempotent(&open(dir.path(), true));
    }

    #[test]
    fn set_empty_clears() {
        let dir = tempfile::tempdir().unwrap();
        conformance::set_empty_clears(&open(dir.path(), false));
    }

    #[test]
    fn delete_semantics() {
        let dir = tempfile::tempdir().unwrap();
        conformance::delete_semantics(&open(dir.path(), false));
    }

    #[test]
    fn encoded_names_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        conformance::encoded_names_roundtrip(&open(dir.path(), false));
    }

    #[test]
    fn wildcard_is_not_storable() {
        let dir = tempfile::tempdir().unwrap();
        conformance::wildcard_is_not_storable(&open(dir.path(), false));
    }

    // -----------------------------------------------------------------------
    // On-disk layout
    // -----------------------------------------------------------------------

    #[test]
    fn entries_are_empty_marker_files() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(dir.path(), false);
        index.add("doc 1", &["a/b"]).unwrap();

        let marker = index.root().join("a%2Fb").join("doc%201");
        assert!(marker.is_file());
        assert_eq!(std::fs::metadata(&marker).unwrap().len(), 0);
    }

    #[test]
    fn deleting_last_entry_prunes_value_directory() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(dir.path(), false);
        index.add("doc1", &["red"]).unwrap();
        index.add("doc2", &["red"]).unwrap();
        let red = index.root().join("red");

        index.delete("doc1", "red").unwrap();
        assert!(red.is_dir());
        index.delete("doc2", "red").unwrap();
        assert!(!red.exists());
    }

    #[test]
    fn empty_value_directories_are_not_values() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(dir.path(), false);
        std::fs::create_dir(index.root().join("orphan")).unwrap();
        assert!(index.values().unwrap().is_empty());
        assert!(!index.exists(WILDCARD, "orphan").unwrap());
    }

    #[test]
    fn root_with_glob_characters_is_escaped() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(&dir.path().join("weird[1]?"), false);
        index.add("doc1", &["v"]).unwrap();
        assert_eq!(index.values_of("doc1").unwrap(), set_of(&["v"]));
    }

    #[test]
    fn reopened_index_sees_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        open(dir.path(), true).add("doc1", &["x"]).unwrap();

        let reopened = open(dir.path(), true);
        assert!(matches!(
            reopened.add("doc2", &["x"]),
            Err(IndexError::UniquenessViolation { .. })
        ));
    }

    #[test]
    fn failed_unique_add_keeps_earlier_entries() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(dir.path(), true);
        index.add("doc1", &["b"]).unwrap();

        // "a" is written before "b" trips the constraint; it is not rolled back.
        let err = index.add("doc2", &["a", "b"]).unwrap_err();
        assert!(matches!(err, IndexError::UniquenessViolation { .. }));
        assert_eq!(index.values_of("doc2").unwrap(), set_of(&["a"]));
    }

    #[test]
    fn set_adds_before_it_removes() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(dir.path(), true);
        index.set("doc1", &["old"]).unwrap();
        index.add("doc2", &["taken"]).unwrap();

        // The new value fails the constraint, so the removal pass never runs.
        let err = index.set("doc1", &["taken"]).unwrap_err();
        assert!(matches!(err, IndexError::UniquenessViolation { .. }));
        assert_eq!(index.values_of("doc1").unwrap(), set_of(&["old"]));
    }

    #[test]
    fn find_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let index = open(dir.path(), false);
        assert!(matches!(index.find(), Err(IndexError::Unsupported(_))));
    }

    #[test]
    fn shared_instance_serializes_unique_claims() {
        use std::sync::Arc;
        use std::thread;

        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(open(dir.path(), true));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let index = Arc::clone(&index);
                thread::spawn(move || index.add(&format!("doc{i}"), &["shared"]).is_ok())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(index.keys_for("shared").unwrap().len(), 1);
    }

    #[test]
    fn tracks_document_field_across_rewrites() {
        use flatdoc_store::{DocumentStore, FileDocumentStore, JsonSerializer, StoreConfig};
        use serde_json::{json, Value};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();
        let docs = FileDocumentStore::<Value>::open(
            &StoreConfig::new(dir.path().join("docs")),
            Arc::new(JsonSerializer::new()),
        )
        .unwrap();
        let tags = open(dir.path(), false);

        let reindex = |key: &str, doc: &Value| {
            docs.set(key, doc).unwrap();
            let values: Vec<&str> = doc["tags"]
                .as_array()
                .unwrap()
                .iter()
                .filter_map(Value::as_str)
                .collect();
            tags.set(key, &values).unwrap();
        };

        reindex("post/1", &json!({ "tags": ["rust", "fs"] }));
        reindex("post/2", &json!({ "tags": ["rust"] }));
        reindex("post/1", &json!({ "tags": ["fs", "glob"] }));

        let rust_posts = tags.keys_for("rust").unwrap();
        assert_eq!(rust_posts, set_of(&["post/2"]));
        for key in &rust_posts {
            assert!(docs.exists(key).unwrap());
        }
        assert_eq!(tags.values().unwrap(), set_of(&["fs", "glob", "rust"]));
    }

    // -----------------------------------------------------------------------
    // Reconciliation property
    // -----------------------------------------------------------------------

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn set_converges_to_target(
            initial in prop::collection::btree_set("[a-z]{1,4}", 0..6),
            target in prop::collection::btree_set("[a-z]{1,4}", 0..6),
        ) {
            let dir = tempfile::tempdir().unwrap();
            let index = open(dir.path(), false);
            let initial: Vec<&str> = initial.iter().map(String::as_str).collect();
            let target_refs: Vec<&str> = target.iter().map(String::as_str).collect();

            index.set("doc", &initial).unwrap();
            index.add("other", &["keep"]).unwrap();
            index.set("doc", &target_refs).unwrap();

            prop_assert_eq!(index.values_of("doc").unwrap(), target.clone());
            prop_assert_eq!(index.values_of("other").unwrap(), set_of(&["keep"]));
            for value in &target {
                prop_assert!(index.exists("doc", value).unwrap());
            }
        }
    }
}
