//! Entry deletion with stats accounting.
//!
//! The stats snapshot describes the user's primary backend (local, unless
//! the user writes to the remote store only). Deleting from that backend
//! takes the entries out of the totals; deleting from a secondary copy only
//! removes the copy.

use crate::errors::{AppError, AppResult, StoreError};
use crate::journal_core::stats::record_deletion;
use crate::journal_core::EntryFilter;
use crate::settings::Settings;
use crate::store::{Backend, EntryStore, StoredEntry};
use chrono::NaiveDate;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteReport {
    /// Records removed from the backend.
    pub deleted: usize,
    /// Entries taken out of the stats.
    pub accounted: usize,
    /// Removed records that could not be read, so were not accounted.
    pub unreadable: usize,
}

/// Deletes one entry by key (file stem locally, document id remotely).
/// An unknown key is a no-op.
pub fn delete_entry(
    store: &EntryStore,
    settings: &mut Settings,
    settings_path: &Path,
    backend: Backend,
    key: &str,
) -> AppResult<DeleteReport> {
    let key = key.strip_suffix(".json").unwrap_or(key);
    let accounts = backend == settings.user.storage_preference.primary();

    let mut report = DeleteReport::default();
    let existing = if accounts { find_one(store, backend, key)? } else { None };

    report.deleted = store.delete_one(backend, key)?;
    if report.deleted == 0 {
        info!("No {} entry with key {}", backend, key);
        return Ok(report);
    }

    match existing {
        Some(stored) => {
            settings.stats = record_deletion(&settings.stats, &stored.entry);
            settings.save(settings_path)?;
            report.accounted = 1;
        }
        None if accounts => report.unreadable = 1,
        None => {}
    }
    Ok(report)
}

/// Deletes every entry in `backend`.
pub fn delete_all_entries(
    store: &EntryStore,
    settings: &mut Settings,
    settings_path: &Path,
    backend: Backend,
) -> AppResult<DeleteReport> {
    let accounts = backend == settings.user.storage_preference.primary();

    let mut readable = Vec::new();
    let mut unreadable = 0;
    if accounts {
        match store.list_all(backend) {
            Ok(items) => {
                for item in items {
                    match item {
                        Ok(stored) => readable.push(stored),
                        Err(e) => {
                            warn!("Deleting unreadable record: {}", e);
                            unreadable += 1;
                        }
                    }
                }
            }
            Err(AppError::Store(StoreError::StorageUnavailable { .. })) if backend == Backend::Local => {}
            Err(e) => return Err(e),
        }
    }

    let deleted = store.delete_all(backend)?;

    let mut report = DeleteReport {
        deleted,
        accounted: 0,
        unreadable,
    };
    if accounts && !readable.is_empty() {
        let stats = readable
            .iter()
            .fold(settings.stats.clone(), |stats, stored| record_deletion(&stats, &stored.entry));
        settings.stats = stats;
        settings.save(settings_path)?;
        report.accounted = readable.len();
    }

    info!("Deleted {} {} entries", report.deleted, backend);
    Ok(report)
}

/// Deletes every entry in `backend` written on `day` (in the entry's own
/// offset). Records that cannot be read are left in place, since their day
/// is unknown.
pub fn delete_entries_on(
    store: &EntryStore,
    settings: &mut Settings,
    settings_path: &Path,
    backend: Backend,
    day: NaiveDate,
) -> AppResult<DeleteReport> {
    let accounts = backend == settings.user.storage_preference.primary();
    let scan = match store.find_by(backend, &EntryFilter::Date(day)) {
        Ok(scan) => scan,
        Err(AppError::Store(StoreError::StorageUnavailable { .. })) if backend == Backend::Local => {
            info!("No local entries directory; nothing to delete");
            return Ok(DeleteReport::default());
        }
        Err(e) => return Err(e),
    };

    let mut report = DeleteReport::default();
    let mut stats = settings.stats.clone();
    let mut failure = None;
    for stored in &scan.entries {
        match store.delete_one(backend, &stored.key) {
            Ok(0) => {}
            Ok(_) => {
                report.deleted += 1;
                if accounts {
                    stats = record_deletion(&stats, &stored.entry);
                    report.accounted += 1;
                }
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    // Whatever was removed before a failure stays accounted for.
    if report.accounted > 0 {
        settings.stats = stats;
        settings.save(settings_path)?;
    }
    if let Some(e) = failure {
        return Err(e);
    }

    info!("Deleted {} {} entries from {}", report.deleted, backend, day);
    Ok(report)
}

fn find_one(store: &EntryStore, backend: Backend, key: &str) -> AppResult<Option<StoredEntry>> {
    if backend == Backend::Local {
        return Ok(store.local().get(key).ok().flatten().map(|entry| StoredEntry {
            key: key.to_string(),
            entry,
        }));
    }
    let found = store
        .list_all(backend)?
        .filter_map(Result::ok)
        .find(|stored| stored.key == key);
    Ok(found)
}
