//! Reconciliation between the local and remote stores.
//!
//! A run walks one backend and makes sure every entry there has a
//! counterpart in the other. Entries are matched by natural key, so running
//! the same direction twice migrates nothing the second time. Per-entry
//! problems (unreadable records, prompts missing from the catalog) become
//! warnings and the run carries on.
//!
//! Stats are not touched: the entries being copied were already counted
//! when they were first written.

use crate::catalog::{prompt_id_for, PromptCatalog};
use crate::db::entries::{self as remote_entries, NewRemoteEntry, RemoteEntry};
use crate::db::{users, Database};
use crate::errors::{AppError, AppResult, StoreError};
use crate::journal_core::Entry;
use crate::store::{resolve_prompt, EntryStore, NaturalKey, StoredEntry};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    LocalToRemote,
    RemoteToLocal,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::LocalToRemote => f.write_str("local-to-remote"),
            Direction::RemoteToLocal => f.write_str("remote-to-local"),
        }
    }
}

impl FromStr for Direction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local-to-remote" | "to-remote" | "to-cloud" | "up" => Ok(Direction::LocalToRemote),
            "remote-to-local" | "to-local" | "from-cloud" | "down" => Ok(Direction::RemoteToLocal),
            other => Err(AppError::Validation(format!(
                "Unknown sync direction '{}'. Use \"local-to-remote\" or \"remote-to-local\".",
                other
            ))),
        }
    }
}

/// A skipped record and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileWarning {
    /// File name or document id.
    pub record: String,
    pub message: String,
}

impl fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.record, self.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    pub direction: Direction,
    /// Records read from the source, readable or not.
    pub scanned: usize,
    pub migrated: usize,
    pub already_present: usize,
    pub warnings: Vec<ReconcileWarning>,
}

impl ReconcileReport {
    fn new(direction: Direction) -> Self {
        ReconcileReport {
            direction,
            scanned: 0,
            migrated: 0,
            already_present: 0,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, record: impl Into<String>, message: impl Into<String>) {
        let warning = ReconcileWarning {
            record: record.into(),
            message: message.into(),
        };
        warn!("Skipping {}", warning);
        self.warnings.push(warning);
    }

    fn warn_store(&mut self, error: &StoreError) {
        let record = match error {
            StoreError::MalformedRecord { record, .. }
            | StoreError::ReferenceNotFound { record, .. } => record.clone(),
            StoreError::DuplicateKey { key } => key.clone(),
            StoreError::StorageUnavailable { backend, .. } => format!("{} store", backend),
        };
        self.warn(record, error.to_string());
    }
}

enum Migration {
    Migrated(String),
    AlreadyPresent,
}

/// Copies entries missing from the destination. `now` is recorded as the
/// user's last sync time.
///
/// # Errors
///
/// Fails as a whole only if the remote store is unavailable or a source
/// listing fails for a reason other than a missing location.
pub fn reconcile(
    store: &EntryStore,
    direction: Direction,
    now: DateTime<Utc>,
) -> AppResult<ReconcileReport> {
    let db = store.remote()?;
    info!("Reconciling entries {}", direction);

    let report = match direction {
        Direction::LocalToRemote => local_to_remote(store, db)?,
        Direction::RemoteToLocal => remote_to_local(store, db)?,
    };

    let conn = db.get_conn()?;
    users::record_sync(&conn, store.user_id(), now)?;

    info!(
        "Reconciled {}: {} migrated, {} already present, {} warnings",
        direction,
        report.migrated,
        report.already_present,
        report.warnings.len()
    );
    Ok(report)
}

fn local_to_remote(store: &EntryStore, db: &Database) -> AppResult<ReconcileReport> {
    let mut report = ReconcileReport::new(Direction::LocalToRemote);

    let entries = match store.local().list_all() {
        Ok(entries) => entries,
        Err(AppError::Store(e @ StoreError::StorageUnavailable { .. })) => {
            report.warn_store(&e);
            return Ok(report);
        }
        Err(e) => return Err(e),
    };

    for item in entries {
        report.scanned += 1;
        let stored = match item {
            Ok(stored) => stored,
            Err(e) => {
                report.warn_store(&e);
                continue;
            }
        };

        match migrate_to_remote(db, store.user_id(), &stored) {
            Ok(Migration::Migrated(id)) => {
                debug!("Migrated {} to remote document {}", stored.key, id);
                report.migrated += 1;
            }
            Ok(Migration::AlreadyPresent) => report.already_present += 1,
            Err(e) => report.warn(format!("{}.json", stored.key), e.to_string()),
        }
    }

    Ok(report)
}

fn migrate_to_remote(db: &Database, user_id: &str, stored: &StoredEntry) -> AppResult<Migration> {
    let prompt = resolve_prompt(db, &stored.entry).map_err(|e| match e {
        AppError::Store(StoreError::ReferenceNotFound { reference, .. }) => {
            StoreError::ReferenceNotFound {
                record: format!("{}.json", stored.key),
                reference,
            }
            .into()
        }
        other => other,
    })?;

    let record = NewRemoteEntry::from_entry(&stored.entry, user_id, &prompt.id);
    let conn = db.get_conn()?;

    if remote_entries::find_by_natural_key(&conn, &record.natural_key())?.is_some() {
        return Ok(Migration::AlreadyPresent);
    }
    match remote_entries::insert_entry(&conn, &record) {
        Ok(id) => Ok(Migration::Migrated(id)),
        Err(AppError::Store(StoreError::DuplicateKey { .. })) => Ok(Migration::AlreadyPresent),
        Err(e) => Err(e),
    }
}

fn remote_to_local(store: &EntryStore, db: &Database) -> AppResult<ReconcileReport> {
    let mut report = ReconcileReport::new(Direction::RemoteToLocal);

    let mut present: HashSet<String> = HashSet::new();
    match store.local().list_all() {
        Ok(entries) => {
            for item in entries {
                match item {
                    Ok(stored) => {
                        present.insert(local_fingerprint(&stored.entry, store.user_id()));
                    }
                    Err(e) => warn!("Ignoring unreadable local record: {}", e),
                }
            }
        }
        // Nothing local yet; the directory is created on first save
        Err(AppError::Store(StoreError::StorageUnavailable { .. })) => {}
        Err(e) => return Err(e),
    }

    let conn = db.get_conn()?;
    let rows = remote_entries::list_entries(&conn, store.user_id(), None)?;
    drop(conn);

    for row in rows {
        report.scanned += 1;
        let record = match row {
            Ok(record) => record,
            Err(e) => {
                report.warn_store(&e);
                continue;
            }
        };

        match migrate_to_local(store, db, &record, &mut present) {
            Ok(Migration::Migrated(key)) => {
                debug!("Migrated remote document {} to {}.json", record.id, key);
                report.migrated += 1;
            }
            Ok(Migration::AlreadyPresent) => report.already_present += 1,
            Err(e) => report.warn(record.id.clone(), e.to_string()),
        }
    }

    Ok(report)
}

fn migrate_to_local(
    store: &EntryStore,
    db: &Database,
    record: &RemoteEntry,
    present: &mut HashSet<String>,
) -> AppResult<Migration> {
    let fingerprint = record.natural_key().fingerprint();
    if present.contains(&fingerprint) {
        return Ok(Migration::AlreadyPresent);
    }

    let prompt = db.find_by_id(&record.prompt_id)?.ok_or_else(|| {
        StoreError::ReferenceNotFound {
            record: record.id.clone(),
            reference: format!("prompt id '{}'", record.prompt_id),
        }
    })?;

    let entry = record.to_entry(prompt.as_prompt());
    let saved = store.local().save_disambiguated(&entry)?;
    present.insert(fingerprint);
    Ok(Migration::Migrated(saved.key().to_string()))
}

/// Natural-key fingerprint of a local entry. The prompt id is the entry's
/// own, or the one derived from its question.
fn local_fingerprint(entry: &Entry, user_id: &str) -> String {
    let prompt_id = entry
        .prompt
        .id
        .clone()
        .unwrap_or_else(|| prompt_id_for(&entry.prompt.question));
    NaturalKey::for_entry(entry, &prompt_id, user_id).fingerprint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parsing() {
        assert_eq!(
            "local-to-remote".parse::<Direction>().unwrap(),
            Direction::LocalToRemote
        );
        assert_eq!("DOWN".parse::<Direction>().unwrap(), Direction::RemoteToLocal);
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(AppError::Validation(_))
        ));
        assert_eq!(Direction::RemoteToLocal.to_string(), "remote-to-local");
    }

    #[test]
    fn test_store_warnings_name_the_record() {
        let mut report = ReconcileReport::new(Direction::LocalToRemote);
        report.warn_store(&StoreError::MalformedRecord {
            record: "broken.json".to_string(),
            reason: "EOF".to_string(),
        });

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].record, "broken.json");
        assert!(report.warnings[0].to_string().contains("EOF"));
    }
}
