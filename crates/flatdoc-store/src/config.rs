use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for a file-backed document store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one file per document. Created on open.
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data/documents"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.root, PathBuf::from("data/documents"));
    }

    #[test]
    fn deserializes_from_json() {
        let c: StoreConfig = serde_json::from_str(r#"{ "root": "/tmp/docs" }"#).unwrap();
        assert_eq!(c, StoreConfig::new("/tmp/docs"));
    }
}
