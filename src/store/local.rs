//! The local backend: one JSON document per entry under `entries/`, named
//! by the entry key.

use crate::constants::ENTRY_FILE_EXTENSION;
use crate::errors::{AppError, AppResult, StoreError};
use crate::journal_core::Entry;
use crate::journal_io::{write_json_atomic, WriteMode};
use crate::store::{Backend, StoredEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Highest sequence suffix tried before giving up on a minute key.
const MAX_KEY_SEQUENCE: u32 = 99;

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: PathBuf) -> Self {
        LocalStore { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> AppResult<PathBuf> {
        let key = key
            .strip_suffix(&format!(".{}", ENTRY_FILE_EXTENSION))
            .unwrap_or(key);
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid entry key",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.{}", key, ENTRY_FILE_EXTENSION)))
    }

    /// Writes `entry` under its key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if a record with the key exists;
    /// the existing record is left untouched.
    pub fn save(&self, entry: &Entry) -> AppResult<PathBuf> {
        let path = self.path_for(entry.key())?;
        match write_json_atomic(&path, entry, WriteMode::CreateNew) {
            Ok(()) => {
                debug!("Saved entry {} to {:?}", entry.key(), path);
                Ok(path)
            }
            Err(AppError::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(StoreError::DuplicateKey {
                    key: entry.key().to_string(),
                }
                .into())
            }
            Err(e) => Err(e),
        }
    }

    /// Saves `entry`, appending `-2`, `-3`, ... to the key while it collides.
    /// Returns the entry as stored.
    pub fn save_disambiguated(&self, entry: &Entry) -> AppResult<Entry> {
        let mut candidate = entry.clone();
        let mut sequence = 1;
        loop {
            match self.save(&candidate) {
                Ok(_) => return Ok(candidate),
                Err(AppError::Store(StoreError::DuplicateKey { key }))
                    if sequence < MAX_KEY_SEQUENCE =>
                {
                    debug!("Key {} taken, trying next sequence", key);
                    sequence += 1;
                    candidate = entry.with_sequence(sequence);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reads a single record by key.
    pub fn get(&self, key: &str) -> AppResult<Option<Entry>> {
        let path = self.path_for(key)?;
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(read_record(&path)?.entry))
    }

    /// Lazily lists every record in the entries directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StorageUnavailable` if the directory is missing.
    pub fn list_all(
        &self,
    ) -> AppResult<impl Iterator<Item = Result<StoredEntry, StoreError>> + 'static> {
        if !self.dir.is_dir() {
            return Err(StoreError::StorageUnavailable {
                backend: Backend::Local,
                reason: format!("{} does not exist", self.dir.display()),
            }
            .into());
        }

        let walker = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter();

        Ok(walker.filter_map(|item| match item {
            Ok(dir_entry) if is_record(dir_entry.path()) && dir_entry.file_type().is_file() => {
                Some(read_record(dir_entry.path()))
            }
            Ok(_) => None,
            Err(e) => Some(Err(StoreError::MalformedRecord {
                record: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                reason: e.to_string(),
            })),
        }))
    }

    /// Removes one record. Returns 1 if it existed, 0 otherwise.
    pub fn delete_one(&self, key: &str) -> AppResult<usize> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted entry {:?}", path);
                Ok(1)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes every record, including unreadable ones. A missing directory
    /// counts as already empty.
    pub fn delete_all(&self) -> AppResult<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        for dir_entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let dir_entry = dir_entry.map_err(|e| {
                AppError::Io(e.into_io_error().unwrap_or_else(|| {
                    io::Error::other("filesystem loop while listing entries")
                }))
            })?;
            if dir_entry.file_type().is_file() && is_record(dir_entry.path()) {
                fs::remove_file(dir_entry.path())?;
                removed += 1;
            }
        }

        info!("Deleted {} local entries", removed);
        Ok(removed)
    }
}

fn is_record(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'));
    !hidden && path.extension().and_then(|e| e.to_str()) == Some(ENTRY_FILE_EXTENSION)
}

fn read_record(path: &Path) -> Result<StoredEntry, StoreError> {
    let record = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let malformed = |reason: String| StoreError::MalformedRecord {
        record: record.clone(),
        reason,
    };

    let raw = fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let entry: Entry = serde_json::from_str(&raw).map_err(|e| malformed(e.to_string()))?;
    let key = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| entry.key().to_string());

    Ok(StoredEntry { key, entry })
}
