//! File-name encoding for keys and indexed values.
//!
//! Every key becomes exactly one path segment. Segments are percent-encoded,
//! so the only characters that reach the filesystem are `[A-Za-z0-9-_.~%]`.
//! The single exception is the wildcard [`WILDCARD`], which is passed through
//! untouched so that a segment can act as a glob pattern.

use crate::error::{StoreError, StoreResult};

/// Segment that matches any entry when used in a lookup.
pub const WILDCARD: &str = "*";

/// Percent-encode a segment, passing the wildcard through.
///
/// `.` and `..` are spelled out as `%2E` sequences so they never name the
/// current or parent directory.
///
/// ```
/// use flatdoc_store::encoding::encode_segment;
///
/// assert_eq!(encode_segment("*"), "*");
/// assert_eq!(encode_segment("a b/c"), "a%20b%2Fc");
/// assert_eq!(encode_segment(".."), "%2E%2E");
/// ```
pub fn encode_segment(raw: &str) -> String {
    match raw {
        WILDCARD => WILDCARD.to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => urlencoding::encode(raw).into_owned(),
    }
}

/// Decode a segment produced by [`encode_segment`].
pub fn decode_segment(encoded: &str) -> StoreResult<String> {
    urlencoding::decode(encoded)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| StoreError::InvalidKey {
            key: encoded.to_string(),
            reason: format!("not a valid percent-encoded name: {e}"),
        })
}

/// Encode a key or value that will be written to disk.
///
/// Empty strings and the wildcard itself are rejected: neither can name a
/// concrete file.
pub fn encode_key(raw: &str) -> StoreResult<String> {
    if raw.is_empty() {
        return Err(StoreError::InvalidKey {
            key: raw.to_string(),
            reason: "must not be empty".into(),
        });
    }
    if raw == WILDCARD {
        return Err(StoreError::InvalidKey {
            key: raw.to_string(),
            reason: "the wildcard cannot be stored".into(),
        });
    }
    Ok(encode_segment(raw))
}

/// Encode a lookup segment, which may be the wildcard.
pub fn encode_pattern(raw: &str) -> StoreResult<String> {
    if raw.is_empty() {
        return Err(StoreError::InvalidKey {
            key: raw.to_string(),
            reason: "must not be empty".into(),
        });
    }
    Ok(encode_segment(raw))
}
