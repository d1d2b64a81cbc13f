//! The write pipeline: persist a new entry to every configured backend, then
//! fold it into the stats exactly once.

use crate::catalog::PromptCatalog;
use crate::db::users;
use crate::errors::{AppError, AppResult};
use crate::journal_core::{stats, Entry, EntryDraft, Milestone};
use crate::settings::Settings;
use crate::store::{Backend, EntryStore};
use std::path::Path;
use tracing::{info, warn};

/// What happened to one submitted entry.
#[derive(Debug)]
pub struct WriteOutcome {
    /// The entry as stored locally (its key may carry a sequence suffix),
    /// or as submitted when only the remote store took it.
    pub entry: Entry,
    /// Backends that accepted the entry, with the key each stored it under.
    pub saved: Vec<(Backend, String)>,
    /// Backends that rejected it.
    pub failed: Vec<(Backend, AppError)>,
    pub messages: Vec<Milestone>,
}

impl WriteOutcome {
    /// Some, but not all, backends stored the entry.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Records a drafted entry.
///
/// The entry is saved to each backend named by the user's storage
/// preference. If at least one accepted it, the stats and goals are updated
/// once, the entry count is bumped and the settings document is rewritten at
/// `settings_path`. Usage counters on the catalog prompt and the remote user
/// are best-effort.
///
/// # Errors
///
/// Returns `AppError::Validation` for an empty response, or the first
/// backend's error if no backend stored the entry. In both cases no stats
/// are touched.
pub fn record_entry(
    store: &EntryStore,
    catalog: &dyn PromptCatalog,
    settings: &mut Settings,
    settings_path: &Path,
    draft: EntryDraft,
) -> AppResult<WriteOutcome> {
    let entry = Entry::from_draft(draft)?;

    let mut stored_entry: Option<Entry> = None;
    let mut saved = Vec::new();
    let mut failed = Vec::new();
    for backend in settings.user.storage_preference.backends() {
        match store.save_new(&entry, backend) {
            Ok(stored) => {
                info!("Saved entry {} to {} store", stored.key, backend);
                if backend == Backend::Local || stored_entry.is_none() {
                    stored_entry = Some(stored.entry);
                }
                saved.push((backend, stored.key));
            }
            Err(e) => {
                warn!("Could not save entry to {} store: {}", backend, e);
                failed.push((backend, e));
            }
        }
    }

    let entry = match stored_entry {
        Some(entry) => entry,
        None => {
            return Err(failed.into_iter().next().map(|(_, e)| e).unwrap_or_else(|| {
                AppError::Config("No storage backend is configured".to_string())
            }))
        }
    };

    let update = stats::update(&settings.stats, &settings.goals, &entry);
    settings.stats = update.stats;
    settings.goals = update.goals;
    settings.user.entry_count += 1;
    settings.save(settings_path)?;

    if let Some(prompt_id) = entry.prompt.id.as_deref() {
        if let Err(e) = catalog.increment_usage(prompt_id) {
            warn!("Could not update prompt usage: {}", e);
        }
    }
    if saved.iter().any(|(backend, _)| *backend == Backend::Remote) {
        let counted = store
            .remote()
            .and_then(|db| db.get_conn())
            .and_then(|conn| users::increment_entry_count(&conn, store.user_id()));
        if let Err(e) = counted {
            warn!("Could not update remote entry count: {}", e);
        }
    }

    Ok(WriteOutcome {
        entry,
        saved,
        failed,
        messages: update.messages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LocalCatalog;
    use crate::journal_core::entry::tests::{at, draft_at};
    use crate::settings::StoragePreference;
    use crate::store::LocalStore;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        dir: TempDir,
        store: EntryStore,
        catalog: LocalCatalog,
        settings: Settings,
    }

    impl Fixture {
        fn new(storage: StoragePreference) -> Self {
            let dir = tempdir().unwrap();
            let settings = Settings::fresh("Ada", storage, at(2024, 1, 1, 8, 0));
            let store = EntryStore::new(
                LocalStore::new(dir.path().join("entries")),
                None,
                &settings.user.id,
            );
            let catalog = LocalCatalog::new(dir.path().join("prompts.json"));
            catalog.install(false).unwrap();
            Fixture {
                dir,
                store,
                catalog,
                settings,
            }
        }

        fn settings_path(&self) -> std::path::PathBuf {
            self.dir.path().join("config.json")
        }

        fn record(&mut self, draft: EntryDraft) -> AppResult<WriteOutcome> {
            let path = self.settings_path();
            record_entry(&self.store, &self.catalog, &mut self.settings, &path, draft)
        }
    }

    #[test]
    fn test_local_write_updates_stats_once() {
        let mut fx = Fixture::new(StoragePreference::Local);
        let prompt = fx
            .catalog
            .find_by_question("What are you grateful for today?")
            .unwrap()
            .unwrap();
        let mut draft = draft_at(at(2024, 1, 2, 9, 0), "one two three");
        draft.prompt = prompt.as_prompt();
        draft.tags = vec!["gratitude".to_string()];

        let outcome = fx.record(draft).unwrap();

        assert!(!outcome.is_partial());
        assert_eq!(outcome.saved, vec![(Backend::Local, "01-02-2024-0900".to_string())]);
        assert_eq!(fx.settings.stats.total_entries, 1);
        assert_eq!(fx.settings.stats.total_words, 3);
        assert_eq!(fx.settings.user.entry_count, 1);
        assert!(fx.settings.stats.is_consistent());

        let on_disk = Settings::load_required(&fx.settings_path()).unwrap();
        assert_eq!(on_disk, fx.settings);
        assert_eq!(fx.catalog.find_by_id(&prompt.id).unwrap().unwrap().usage_count, 1);
    }

    #[test]
    fn test_same_minute_gets_sequence_key() {
        let mut fx = Fixture::new(StoragePreference::Local);
        fx.record(draft_at(at(2024, 1, 2, 9, 0), "first")).unwrap();
        let second = fx.record(draft_at(at(2024, 1, 2, 9, 0), "second")).unwrap();

        assert_eq!(second.entry.key(), "01-02-2024-0900-2");
        assert_eq!(fx.settings.stats.total_entries, 2);
    }

    #[test]
    fn test_empty_body_touches_nothing() {
        let mut fx = Fixture::new(StoragePreference::Local);
        let before = fx.settings.clone();

        let result = fx.record(draft_at(at(2024, 1, 2, 9, 0), "  \n"));

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(fx.settings, before);
        assert!(!fx.settings_path().exists());
    }

    #[test]
    fn test_both_with_remote_down_is_partial() {
        let mut fx = Fixture::new(StoragePreference::Both);

        let outcome = fx.record(draft_at(at(2024, 1, 2, 9, 0), "still saved")).unwrap();

        assert!(outcome.is_partial());
        assert_eq!(outcome.saved.len(), 1);
        assert_eq!(outcome.failed[0].0, Backend::Remote);
        assert_eq!(fx.settings.stats.total_entries, 1);
    }

    #[test]
    fn test_all_backends_down_is_an_error_without_stats() {
        let mut fx = Fixture::new(StoragePreference::Cloud);
        let before = fx.settings.stats.clone();

        let result = fx.record(draft_at(at(2024, 1, 2, 9, 0), "nowhere to go"));

        assert!(result.is_err());
        assert_eq!(fx.settings.stats, before);
        assert_eq!(fx.settings.user.entry_count, 0);
    }
}
