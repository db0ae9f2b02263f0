use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::WalkDir;

use crate::config::StoreConfig;
use crate::encoding::{decode_segment, encode_key};
use crate::error::{StoreError, StoreResult};
use crate::fs;
use crate::serializer::Serializer;
use crate::traits::{DocumentStore, Removal};

/// A document file found by a root scan.
#[derive(Clone, Debug)]
pub(crate) struct ScannedFile {
    pub key: String,
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Document store keeping one file per key directly under its root.
///
/// The file name is the percent-encoded key; the content is whatever the
/// injected [`Serializer`] produces. Subdirectories of the root are ignored
/// by scans, which lets other components nest their own data under it.
pub struct FileDocumentStore<V> {
    root: PathBuf,
    serializer: Arc<dyn Serializer<V>>,
}

impl<V> std::fmt::Debug for FileDocumentStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDocumentStore")
            .field("root", &self.root)
            .finish()
    }
}

impl<V> FileDocumentStore<V> {
    /// Open a store, creating its root directory if needed.
    ///
    /// Failing to create the root is an initialization error: the store is
    /// unusable without it.
    pub fn open(config: &StoreConfig, serializer: Arc<dyn Serializer<V>>) -> StoreResult<Self> {
        fs::ensure_root(&config.root)?;
        debug!(root = %config.root.display(), "document store opened");
        Ok(Self {
            root: config.root.clone(),
            serializer,
        })
    }

    /// Directory holding the documents.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn document_path(&self, key: &str) -> StoreResult<PathBuf> {
        Ok(self.root.join(encode_key(key)?))
    }

    /// Read every document file without decoding it, sorted by key.
    ///
    /// Fail-fast: the first unreadable file aborts the scan.
    pub fn find_raw(&self) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self
            .scan()?
            .into_iter()
            .map(|file| (file.key, file.bytes))
            .collect())
    }

    pub(crate) fn scan(&self) -> StoreResult<Vec<ScannedFile>> {
        let mut files = Vec::new();
        for path in self.document_files()? {
            let key = file_key(&path)?;
            // Vanished between listing and reading; not part of the snapshot.
            let Some(bytes) = fs::read_file(&path)? else {
                continue;
            };
            files.push(ScannedFile { key, path, bytes });
        }
        files.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(files)
    }

    fn document_files(&self) -> StoreResult<Vec<PathBuf>> {
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        let mut paths = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&self.root).to_path_buf();
                StoreError::Read {
                    path,
                    source: e.into(),
                }
            })?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }

    fn decode(&self, path: &Path, bytes: &[u8]) -> StoreResult<V> {
        self.serializer.deserialize(bytes).map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "cannot decode document");
            e
        })
    }
}

fn file_key(path: &Path) -> StoreResult<String> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StoreError::InvalidKey {
            key: path.display().to_string(),
            reason: "file name is not UTF-8".into(),
        })?;
    decode_segment(name)
}

impl<V> DocumentStore<V> for FileDocumentStore<V> {
    fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.document_path(key)?.is_file())
    }

    fn get(&self, key: &str) -> StoreResult<Option<V>> {
        let path = self.document_path(key)?;
        match fs::read_file(&path)? {
            Some(bytes) => self.decode(&path, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &V) -> StoreResult<String> {
        let path = self.document_path(key)?;
        let bytes = self.serializer.serialize(value)?;
        fs::write_file(&path, &bytes)?;
        debug!(key, len = bytes.len(), "document written");
        Ok(key.to_string())
    }

    fn delete(&self, key: &str) -> StoreResult<Removal> {
        let path = self.document_path(key)?;
        let removal = fs::remove_file(&path)?;
        if removal.is_removed() {
            debug!(key, "document deleted");
        }
        Ok(removal)
    }

    fn find(&self) -> StoreResult<Vec<(String, V)>> {
        self.scan()?
            .into_iter()
            .map(|file| {
                let value = self.decode(&file.path, &file.bytes)?;
                Ok((file.key, value))
            })
            .collect()
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = self
            .document_files()?
            .into_iter()
            .map(|path| file_key(&path))
            .collect::<StoreResult<Vec<_>>>()?;
        keys.sort();
        Ok(keys)
    }
}
