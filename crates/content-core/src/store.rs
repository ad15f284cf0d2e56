//! JSON persistence for the registry, compression overrides and manifest.
//!
//! Writes are atomic (temp file then rename). Reads never fail: a missing
//! file is an empty structure, and a corrupt one is logged and treated as
//! empty so the caller can keep working and overwrite it on the next flush.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Errors raised while persisting a structure.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Serialization failed.
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        /// Destination file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Writing or renaming failed.
    #[error("Failed to write {path}: {source}")]
    Write {
        /// Destination file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Read `path` as JSON, falling back to `T::default()`.
pub async fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to read file, treating as empty");
            return T::default();
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Corrupt file, treating as empty");
            T::default()
        }
    }
}

/// Serialize `value` as pretty JSON and write it atomically.
///
/// # Errors
///
/// Returns an error if serialization, directory creation, writing or the
/// final rename fails.
pub async fn write_json_atomic<T>(path: &Path, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let write_err = |source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    };

    let content = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    // Atomic write: write to temp file, then rename
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content).await.map_err(write_err)?;
    fs::rename(&temp_path, path).await.map_err(write_err)?;

    Ok(())
}
