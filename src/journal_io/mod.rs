//! File I/O shared by the local entry store, the settings document and the
//! local prompt catalog.
//!
//! Every write goes to a temporary file in the destination directory and is
//! then renamed over the target, so a reader never observes a half-written
//! document.

use crate::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// How to treat an existing file at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the existing document.
    Replace,
    /// Fail with `io::ErrorKind::AlreadyExists` if the destination exists.
    CreateNew,
}

/// Serializes `value` as pretty JSON and atomically moves it into `path`.
///
/// # Errors
///
/// Returns `AppError::Io` if the parent directory cannot be written, and an
/// `AppError::Io` of kind `AlreadyExists` when `mode` is
/// [`WriteMode::CreateNew`] and `path` is taken.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, mode: WriteMode) -> AppResult<()> {
    let dir = path.parent().ok_or_else(|| {
        AppError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        ))
    })?;
    fs::create_dir_all(dir)?;

    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(temp.as_file_mut(), value)?;
    temp.as_file_mut().write_all(b"\n")?;
    temp.as_file().sync_all()?;

    let persisted = match mode {
        WriteMode::Replace => temp.persist(path),
        WriteMode::CreateNew => temp.persist_noclobber(path),
    };
    persisted.map_err(|e| AppError::Io(e.error))?;

    debug!("Wrote {:?}", path);
    Ok(())
}

/// Reads and deserializes a JSON document. Returns `Ok(None)` if the file
/// does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
