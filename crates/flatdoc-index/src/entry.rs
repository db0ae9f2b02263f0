//! Encoding of (document key, value) pairs into index entry paths.
//!
//! An entry is an empty marker file at `root/encode(value)/encode(key)`.
//! The value is the outer level so that `*` in the value position walks
//! every value directory, and `*` in the key position lists every document
//! holding one value.

use std::collections::BTreeSet;
use std::path::Path;

use flatdoc_store::encoding::{decode_segment, encode_key, encode_pattern};
use flatdoc_store::{StoreError, WILDCARD};

use crate::error::IndexResult;

/// Relative path of the entry for `key` holding `value`.
///
/// Either side may be [`WILDCARD`], which is kept verbatim.
///
/// ```
/// use flatdoc_index::entry::entry_path;
///
/// assert_eq!(entry_path("doc 1", "red").unwrap(), "red/doc%201");
/// assert_eq!(entry_path("*", "a/b").unwrap(), "a%2Fb/*");
/// ```
pub fn entry_path(key: &str, value: &str) -> IndexResult<String> {
    Ok(format!("{}/{}", encode_pattern(value)?, encode_pattern(key)?))
}

/// Deduplicate values and check that each one can be stored.
pub fn normalize_values(values: &[&str]) -> IndexResult<BTreeSet<String>> {
    let mut set = BTreeSet::new();
    for value in values {
        encode_key(value)?;
        set.insert((*value).to_string());
    }
    Ok(set)
}

/// Which side of an entry path a lookup reports back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    /// Key fixed, value free: report the values held by the document.
    ValuesOf,
    /// Anything else: report the document keys.
    Keys,
}

impl Lookup {
    pub fn for_query(key: &str, value: &str) -> Self {
        if value == WILDCARD && key != WILDCARD {
            Self::ValuesOf
        } else {
            Self::Keys
        }
    }

    /// Decode the reported segment of a matched entry path.
    pub fn decode(self, entry: &Path) -> IndexResult<String> {
        let segment = match self {
            Self::ValuesOf => entry.parent().and_then(Path::file_name),
            Self::Keys => entry.file_name(),
        };
        let name = segment
            .and_then(|name| name.to_str())
            .ok_or_else(|| StoreError::InvalidKey {
                key: entry.display().to_string(),
                reason: "entry name is not UTF-8".into(),
            })?;
        Ok(decode_segment(name)?)
    }
}
