//! Atomic JSON file helpers used by the flat-file store.

use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Serialize `data` as pretty JSON and atomically replace `path` with it.
///
/// Writes a uniquely named `.tmp` sibling first, then renames over the
/// target. Parent directories are created as needed.
pub fn atomic_write_json<T: serde::Serialize + ?Sized>(
    path: &Path,
    data: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(data)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically replace `path` with raw bytes.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let write_err = |source: std::io::Error| StorageError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let tmp = temp_sibling(path);
    std::fs::write(&tmp, data).map_err(write_err)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(write_err(e));
    }
    Ok(())
}

/// A per-writer temp path next to `path`, so concurrent writers never share one.
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{}.{}.{:016x}.tmp",
        name,
        std::process::id(),
        rand::random::<u64>()
    ))
}

/// Load JSON from `path`; `Ok(None)` when the file does not exist.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StorageError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|source| StorageError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}
