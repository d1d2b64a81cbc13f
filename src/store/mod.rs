//! Entry storage across the local and remote backends.
//!
//! [`EntryStore`] is the single place that knows how to save, list, find and
//! delete entries on either backend. Listing is item-fallible: an unreadable
//! record shows up as an `Err` item instead of aborting the scan.

pub mod local;

use crate::catalog::{CatalogPrompt, PromptCatalog};
use crate::config::Config;
use crate::db::entries::{self as remote_entries, NewRemoteEntry, RemoteEntry};
use crate::db::{users, Database};
use crate::errors::{AppError, AppResult, StoreError};
use crate::journal_core::{Entry, EntryFilter};
use crate::settings::UserProfile;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub use local::LocalStore;

/// Which store a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Local,
    Remote,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Local => f.write_str("local"),
            Backend::Remote => f.write_str("remote"),
        }
    }
}

impl FromStr for Backend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Backend::Local),
            "remote" | "cloud" => Ok(Backend::Remote),
            other => Err(AppError::Validation(format!(
                "Unknown storage backend '{}'. Use \"local\" or \"remote\".",
                other
            ))),
        }
    }
}

/// An entry together with the key it is stored under: the file stem
/// locally, the document id remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub key: String,
    pub entry: Entry,
}

/// Result of a filtered scan: matches plus the records that could not be read.
#[derive(Debug, Default)]
pub struct Scan {
    pub entries: Vec<StoredEntry>,
    pub malformed: Vec<StoreError>,
}

impl Scan {
    fn collect<I>(items: I, filter: &EntryFilter) -> Scan
    where
        I: Iterator<Item = Result<StoredEntry, StoreError>>,
    {
        let mut scan = Scan::default();
        for item in items {
            match item {
                Ok(stored) if filter.matches(&stored.entry) => scan.entries.push(stored),
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping record: {}", e);
                    scan.malformed.push(e);
                }
            }
        }
        scan
    }
}

/// The identity of an entry across backends. Two records with the same
/// natural key are the same entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalKey {
    pub user_id: String,
    pub prompt_id: String,
    pub duration_in_minutes: u64,
    pub word_count: u64,
    pub created: DateTime<Utc>,
}

impl NaturalKey {
    pub fn new(
        user_id: &str,
        prompt_id: &str,
        duration_in_minutes: u64,
        word_count: u64,
        created: DateTime<FixedOffset>,
    ) -> Self {
        NaturalKey {
            user_id: user_id.to_string(),
            prompt_id: prompt_id.to_string(),
            duration_in_minutes,
            word_count,
            created: created.with_timezone(&Utc),
        }
    }

    /// Key of a local entry whose prompt resolved to `prompt_id`, owned by
    /// `user_id`. The owner recorded in the entry file is ignored: files
    /// written under an earlier profile belong to the current user.
    pub fn for_entry(entry: &Entry, prompt_id: &str, user_id: &str) -> Self {
        NaturalKey::new(
            user_id,
            prompt_id,
            entry.metadata.duration_in_minutes,
            entry.content.word_count,
            entry.metadata.created,
        )
    }

    /// Stable hex digest of the key, stored alongside remote records.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for part in [
            self.user_id.as_str(),
            self.prompt_id.as_str(),
            &self.duration_in_minutes.to_string(),
            &self.word_count.to_string(),
            &self.created.to_rfc3339_opts(SecondsFormat::Millis, true),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Item-fallible listing. Local records are read as the iterator advances;
/// remote rows are fetched in one query and converted as it advances.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<StoredEntry, StoreError>> + 'a>;

/// Entry access for one user over both backends.
pub struct EntryStore {
    local: LocalStore,
    remote: Option<Database>,
    remote_error: Option<String>,
    user_id: String,
}

impl EntryStore {
    pub fn new(local: LocalStore, remote: Option<Database>, user_id: &str) -> Self {
        EntryStore {
            local,
            remote,
            remote_error: None,
            user_id: user_id.to_string(),
        }
    }

    /// Opens the stores configured for `user`. When `connect_remote` is set
    /// and the remote store cannot be opened, the failure is remembered and
    /// surfaces as `StorageUnavailable` from remote operations, leaving the
    /// local backend usable.
    pub fn open(config: &Config, user: &UserProfile, connect_remote: bool) -> Self {
        let local = LocalStore::new(config.entries_dir());
        let mut store = EntryStore::new(local, None, &user.id);
        if !connect_remote {
            return store;
        }

        let opened = Database::open_initialized(&config.remote_db_path).and_then(|db| {
            let conn = db.get_conn()?;
            users::ensure_user(&conn, user)?;
            drop(conn);
            Ok(db)
        });
        match opened {
            Ok(db) => store.remote = Some(db),
            Err(e) => {
                warn!("Remote store unavailable: {}", e);
                store.remote_error = Some(e.to_string());
            }
        }
        store
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    /// The remote store, or `StorageUnavailable` if it is not connected.
    pub fn remote(&self) -> AppResult<&Database> {
        self.remote.as_ref().ok_or_else(|| {
            StoreError::StorageUnavailable {
                backend: Backend::Remote,
                reason: self
                    .remote_error
                    .clone()
                    .unwrap_or_else(|| "remote store is not configured".to_string()),
            }
            .into()
        })
    }

    /// Persists `entry`, failing with `DuplicateKey` if it already exists.
    pub fn save(&self, entry: &Entry, backend: Backend) -> AppResult<StoredEntry> {
        match backend {
            Backend::Local => {
                self.local.save(entry)?;
                Ok(StoredEntry {
                    key: entry.key().to_string(),
                    entry: entry.clone(),
                })
            }
            Backend::Remote => self.save_remote(entry),
        }
    }

    /// Like [`EntryStore::save`], but a local entry whose minute key is taken
    /// is stored under the next free sequence suffix.
    pub fn save_new(&self, entry: &Entry, backend: Backend) -> AppResult<StoredEntry> {
        match backend {
            Backend::Local => {
                let stored = self.local.save_disambiguated(entry)?;
                Ok(StoredEntry {
                    key: stored.key().to_string(),
                    entry: stored,
                })
            }
            Backend::Remote => self.save_remote(entry),
        }
    }

    fn save_remote(&self, entry: &Entry) -> AppResult<StoredEntry> {
        let db = self.remote()?;
        let prompt = resolve_prompt(db, entry)?;
        let conn = db.get_conn()?;

        let record = NewRemoteEntry::from_entry(entry, &self.user_id, &prompt.id);
        let id = remote_entries::insert_entry(&conn, &record)?;
        debug!("Saved entry {} remotely as {}", entry.key(), id);

        let mut saved = entry.clone();
        saved.prompt = prompt.as_prompt();
        Ok(StoredEntry { key: id, entry: saved })
    }

    /// Lists every record for the current user in `backend`.
    ///
    /// # Errors
    ///
    /// Fails as a whole only when the backend location itself is missing or
    /// unreachable; unreadable records are yielded as `Err` items.
    pub fn list_all(&self, backend: Backend) -> AppResult<EntryIter<'_>> {
        match backend {
            Backend::Local => Ok(Box::new(self.local.list_all()?)),
            Backend::Remote => {
                let db = self.remote()?;
                let conn = db.get_conn()?;
                let rows = remote_entries::list_entries(&conn, &self.user_id, None)?;
                drop(conn);
                Ok(Box::new(rows.into_iter().map(move |row| {
                    row.and_then(|record| remote_to_stored(db, record))
                })))
            }
        }
    }

    /// Entries in `backend` matching `filter`.
    pub fn find_by(&self, backend: Backend, filter: &EntryFilter) -> AppResult<Scan> {
        Ok(Scan::collect(self.list_all(backend)?, filter))
    }

    /// The entry with the latest creation instant, if any.
    pub fn most_recent(&self, backend: Backend) -> AppResult<Option<StoredEntry>> {
        let scan = self.find_by(backend, &EntryFilter::All)?;
        Ok(scan
            .entries
            .into_iter()
            .max_by_key(|stored| stored.entry.metadata.created))
    }

    /// Removes one record. Returns how many records were removed (0 or 1).
    pub fn delete_one(&self, backend: Backend, key: &str) -> AppResult<usize> {
        match backend {
            Backend::Local => self.local.delete_one(key),
            Backend::Remote => {
                let conn = self.remote()?.get_conn()?;
                remote_entries::delete_entry(&conn, &self.user_id, key)
            }
        }
    }

    /// Removes every record for the current user. Returns the count removed.
    pub fn delete_all(&self, backend: Backend) -> AppResult<usize> {
        match backend {
            Backend::Local => self.local.delete_all(),
            Backend::Remote => {
                let conn = self.remote()?.get_conn()?;
                remote_entries::delete_all_entries(&conn, &self.user_id)
            }
        }
    }
}

/// Looks up an entry's prompt in the remote catalog, by id when the entry
/// carries one and by question otherwise.
pub fn resolve_prompt(catalog: &dyn PromptCatalog, entry: &Entry) -> AppResult<CatalogPrompt> {
    let by_id = match entry.prompt.id.as_deref() {
        Some(id) => catalog.find_by_id(id)?,
        None => None,
    };
    let found = match by_id {
        Some(prompt) => Some(prompt),
        None => catalog.find_by_question(&entry.prompt.question)?,
    };

    found.ok_or_else(|| {
        StoreError::ReferenceNotFound {
            record: entry.key().to_string(),
            reference: format!("prompt '{}'", entry.prompt.question),
        }
        .into()
    })
}

/// Converts a remote record back into an entry, resolving its prompt.
pub fn remote_to_stored(db: &Database, record: RemoteEntry) -> Result<StoredEntry, StoreError> {
    let prompt = db
        .find_by_id(&record.prompt_id)
        .map_err(|e| StoreError::MalformedRecord {
            record: record.id.clone(),
            reason: e.to_string(),
        })?
        .ok_or_else(|| StoreError::ReferenceNotFound {
            record: record.id.clone(),
            reference: format!("prompt id '{}'", record.prompt_id),
        })?;

    Ok(StoredEntry {
        key: record.id.clone(),
        entry: record.to_entry(prompt.as_prompt()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal_core::entry::tests::{at, draft_at};
    use chrono::Duration;

    #[test]
    fn test_backend_parse_and_display() {
        assert_eq!("local".parse::<Backend>().unwrap(), Backend::Local);
        assert_eq!("Cloud".parse::<Backend>().unwrap(), Backend::Remote);
        assert!("disk".parse::<Backend>().is_err());
        assert_eq!(Backend::Remote.to_string(), "remote");
    }

    #[test]
    fn test_fingerprint_ignores_offset_but_not_fields() {
        let created = at(2024, 2, 1, 9, 0);
        let shifted = created.with_timezone(&FixedOffset::east_opt(2 * 3600).unwrap());

        let a = NaturalKey::new("u1", "p1", 3, 40, created);
        let b = NaturalKey::new("u1", "p1", 3, 40, shifted);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let other_user = NaturalKey::new("u2", "p1", 3, 40, created);
        let other_time = NaturalKey::new("u1", "p1", 3, 40, created + Duration::seconds(1));
        assert_ne!(a.fingerprint(), other_user.fingerprint());
        assert_ne!(a.fingerprint(), other_time.fingerprint());
    }

    #[test]
    fn test_for_entry_uses_current_user() {
        let mut draft = draft_at(at(2024, 2, 1, 9, 0), "a few words here");
        draft.user_id = Some("previous-user".to_string());
        let entry = Entry::from_draft(draft).unwrap();

        let key = NaturalKey::for_entry(&entry, "p1", "current-user");
        assert_eq!(key.user_id, "current-user");
        assert_eq!(key.word_count, 4);
        assert_eq!(key.duration_in_minutes, 2);
    }

    #[test]
    fn test_remote_listing_yields_unresolvable_rows_as_items() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_initialized(&dir.path().join("remote.db")).unwrap();
        let store = EntryStore::new(LocalStore::new(dir.path().join("entries")), Some(db), "u1");

        let mut entry = Entry::from_draft(draft_at(at(2024, 2, 2, 9, 0), "kept remotely")).unwrap();
        entry.prompt = crate::catalog::default_prompts()[0].as_prompt();
        let saved = store.save(&entry, Backend::Remote).unwrap();

        let mut orphan = NewRemoteEntry::from_entry(&entry, "u1", "gone");
        orphan.word_count = 99;
        let conn = store.remote().unwrap().get_conn().unwrap();
        remote_entries::insert_entry(&conn, &orphan).unwrap();
        drop(conn);

        let items: Vec<_> = store.list_all(Backend::Remote).unwrap().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().filter(|item| item.is_ok()).count(), 1);
        assert!(items.iter().any(|item| matches!(
            item,
            Err(StoreError::ReferenceNotFound { .. })
        )));

        let scan = store.find_by(Backend::Remote, &EntryFilter::All).unwrap();
        assert_eq!(scan.entries[0].key, saved.key);
        assert_eq!(scan.malformed.len(), 1);
    }
}
