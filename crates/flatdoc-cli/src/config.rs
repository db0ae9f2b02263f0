use std::path::{Path, PathBuf};

use anyhow::Context;
use flatdoc_index::IndexConfig;
use flatdoc_store::StoreConfig;
use serde::{Deserialize, Serialize};

/// On-disk layout and index declarations, read from `flatdoc.toml`.
///
/// ```toml
/// root = "data"
/// pretty = true
///
/// [[indexes]]
/// name = "email"
/// unique = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlatdocConfig {
    /// Base directory; documents, blobs and indexes live beneath it.
    pub root: PathBuf,
    /// Write indented JSON documents.
    pub pretty: bool,
    /// Declared indexes. Undeclared names open as non-unique indexes.
    pub indexes: Vec<IndexDecl>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDecl {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
}

impl Default for FlatdocConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            pretty: false,
            indexes: Vec::new(),
        }
    }
}

impl FlatdocConfig {
    /// Load from a TOML file, or fall back to defaults when no file is given
    /// and `flatdoc.toml` is absent from the working directory.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from("flatdoc.toml"), false),
        };
        if !required && !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn documents(&self) -> StoreConfig {
        StoreConfig::new(self.root.join("documents"))
    }

    /// Blob store root; the blob store adds its own `_blobs` level.
    pub fn blobs(&self) -> StoreConfig {
        StoreConfig::new(self.root.join("blobs"))
    }

    pub fn index(&self, name: &str) -> anyhow::Result<IndexConfig> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            anyhow::bail!("invalid index name {name:?}");
        }
        let unique = self
            .indexes
            .iter()
            .find(|decl| decl.name == name)
            .is_some_and(|decl| decl.unique);
        Ok(IndexConfig {
            root: self.root.join("indexes").join(name),
            unique,
        })
    }
}
