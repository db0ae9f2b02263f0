use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a file-backed secondary index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the index entries. Must differ from the root of the
    /// document store being indexed.
    pub root: PathBuf,
    /// Whether a value may be claimed by at most one document.
    #[serde(default)]
    pub unique: bool,
}

impl IndexConfig {
    /// A non-unique index rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            unique: false,
        }
    }

    /// A unique index rooted at `root`.
    pub fn unique(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            unique: true,
        }
    }
}
