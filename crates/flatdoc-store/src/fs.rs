//! Blocking filesystem primitives shared by every flatdoc backend.
//!
//! Each helper maps `std::io` failures onto the matching [`StoreError`]
//! variant and logs them at warn level before returning.

use std::fs;
use std::io;
use std::path::Path;

use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::traits::Removal;

/// Create a storage root (and its parents) if it is missing.
pub fn ensure_root(path: &Path) -> StoreResult<()> {
    fs::create_dir_all(path).map_err(|source| {
        warn!(path = %path.display(), error = %source, "cannot create storage root");
        StoreError::Init {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Create a directory that a write is about to land in. Idempotent.
pub fn ensure_dir(path: &Path) -> StoreResult<()> {
    fs::create_dir_all(path).map_err(|source| {
        warn!(path = %path.display(), error = %source, "cannot create directory");
        StoreError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Read a whole file. A missing file is `Ok(None)`.
pub fn read_file(path: &Path) -> StoreResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => {
            warn!(path = %path.display(), error = %source, "read failed");
            Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Write a whole file, creating its parent directory on demand.
pub fn write_file(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, bytes).map_err(|source| {
        warn!(path = %path.display(), error = %source, "write failed");
        StoreError::Write {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Unlink a file. A file that is already gone is [`Removal::Absent`].
pub fn remove_file(path: &Path) -> StoreResult<Removal> {
    match fs::remove_file(path) {
        Ok(()) => Ok(Removal::Removed),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Removal::Absent),
        Err(source) => {
            warn!(path = %path.display(), error = %source, "delete failed");
            Err(StoreError::Delete {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Remove a directory if it is empty. Failures are ignored.
pub fn prune_dir(path: &Path) {
    let _ = fs::remove_dir(path);
}
