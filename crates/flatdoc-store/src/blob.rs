//! Blob storage: a document store that also reports file timestamps.
//!
//! Blobs live in a `_blobs` subdirectory of the configured root. When a
//! stored record does not carry its own id or timestamps, [`BlobStore::records`]
//! fills them in from the key and the file metadata.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::file::FileDocumentStore;
use crate::serializer::Serializer;
use crate::traits::{DocumentStore, Removal};

/// Subdirectory of the configured root that holds blob files.
pub const BLOB_DIR: &str = "_blobs";

/// Metadata a blob document may carry itself.
///
/// Every method defaults to `None`, meaning "derive it from the filesystem".
pub trait BlobMetadata {
    fn id(&self) -> Option<String> {
        None
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn updated(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// JSON objects may carry `_id`, `_created` and `_updated` fields.
///
/// Timestamps are accepted as unix seconds or RFC 3339 strings.
impl BlobMetadata for Value {
    fn id(&self) -> Option<String> {
        match self.get("_id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.get("_created").and_then(json_timestamp)
    }

    fn updated(&self) -> Option<DateTime<Utc>> {
        self.get("_updated").and_then(json_timestamp)
    }
}

fn json_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// A blob together with its resolved metadata.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlobRecord<V> {
    pub id: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub document: V,
}

/// File-backed blob store.
pub struct BlobStore<V> {
    inner: FileDocumentStore<V>,
}

impl<V> std::fmt::Debug for BlobStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("root", &self.inner.root())
            .finish()
    }
}

impl<V> BlobStore<V> {
    /// Open a blob store under `config.root/_blobs`, creating it if needed.
    pub fn open(config: &StoreConfig, serializer: Arc<dyn Serializer<V>>) -> StoreResult<Self> {
        let blobs = StoreConfig::new(config.root.join(BLOB_DIR));
        Ok(Self {
            inner: FileDocumentStore::open(&blobs, serializer)?,
        })
    }

    /// Directory holding the blob files.
    pub fn root(&self) -> &Path {
        self.inner.root()
    }
}

impl<V: BlobMetadata> BlobStore<V> {
    /// Read every blob with its metadata, sorted by key.
    ///
    /// Fail-fast like [`DocumentStore::find`].
    pub fn records(&self) -> StoreResult<Vec<BlobRecord<V>>> {
        let mut records = Vec::new();
        for (key, value) in self.inner.find()? {
            let path = self.inner.document_path(&key)?;
            records.push(self.resolve(key, &path, value)?);
        }
        Ok(records)
    }

    /// Read one blob with its metadata.
    pub fn record(&self, key: &str) -> StoreResult<Option<BlobRecord<V>>> {
        let path = self.inner.document_path(key)?;
        match self.inner.get(key)? {
            Some(value) => self.resolve(key.to_string(), &path, value).map(Some),
            None => Ok(None),
        }
    }

    fn resolve(&self, key: String, path: &Path, document: V) -> StoreResult<BlobRecord<V>> {
        let (fs_created, fs_updated) = file_times(path)?;
        Ok(BlobRecord {
            id: document.id().unwrap_or(key),
            created: document.created().unwrap_or(fs_created),
            updated: document.updated().unwrap_or(fs_updated),
            document,
        })
    }
}

/// Creation and modification time of a file.
///
/// Filesystems that do not record a birth time report the modification time
/// for both.
fn file_times(path: &Path) -> StoreResult<(DateTime<Utc>, DateTime<Utc>)> {
    let meta = std::fs::metadata(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = meta.modified().map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let created = meta.created().unwrap_or(modified);
    Ok((to_utc(created), to_utc(modified)))
}

fn to_utc(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

impl<V> DocumentStore<V> for BlobStore<V> {
    fn exists(&self, key: &str) -> StoreResult<bool> {
        self.inner.exists(key)
    }

    fn get(&self, key: &str) -> StoreResult<Option<V>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &V) -> StoreResult<String> {
        self.inner.set(key, value)
    }

    fn delete(&self, key: &str) -> StoreResult<Removal> {
        self.inner.delete(key)
    }

    fn find(&self) -> StoreResult<Vec<(String, V)>> {
        self.inner.find()
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        self.inner.keys()
    }
}
