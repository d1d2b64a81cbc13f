
use chrono::Utc;
use rflect::catalog::PromptCatalog;
use rflect::db::users;
use rflect::journal_core::{EntryDraft, GoalMetric};
use rflect::ops::{delete_entry, reconcile, record_entry, Direction};
use rflect::settings::{Settings, StoragePreference};
use rflect::store::{Backend, EntryStore, LocalStore};
use tempfile::tempdir;
use test_helpers::{at, open_remote};

fn draft(db: &dyn PromptCatalog, started: &str, finished: &str, body: &str) -> EntryDraft {
    let prompt = db.random_prompt(Some("gratitude")).unwrap().unwrap();
    EntryDraft {
        prompt: prompt.as_prompt(),
        body: body.to_string(),
        tags: vec!["family".to_string(), " #family ".to_string()],
        mood: Some("😌 calm".to_string()),
        started_at: at(started),
        finished_at: at(finished),
        user_id: None,
    }
}

#[test]
fn test_both_backends_receive_the_entry_and_stats_count_it_once() {
    let dir = tempdir().unwrap();
    let settings_path = dir.path().join("config.json");
    let mut settings = Settings::fresh("Ada", StoragePreference::Both, at("2024-06-01T07:00:00+00:00"));
    settings
        .set_goal("entries", "daily", "2", at("2024-06-01T07:00:00+00:00"))
        .unwrap();

    let db = open_remote(&dir.path().join("remote.db"));
    users::ensure_user(&db.get_conn().unwrap(), &settings.user).unwrap();
    let store = EntryStore::new(
        LocalStore::new(dir.path().join("entries")),
        Some(db),
        &settings.user.id,
    );
    let catalog = store.remote().unwrap();

    let outcome = record_entry(
        &store,
        catalog,
        &mut settings,
        &settings_path,
        draft(
            catalog,
            "2024-06-01T08:00:00+00:00",
            "2024-06-01T08:03:10+00:00",
            "thankful for a slow breakfast",
        ),
    )
    .unwrap();

    assert!(!outcome.is_partial());
    assert_eq!(outcome.saved.len(), 2);
    assert_eq!(outcome.entry.content.tags, vec!["family".to_string()]);

    assert_eq!(settings.stats.total_entries, 1);
    assert_eq!(settings.stats.total_words, 5);
    assert_eq!(settings.stats.entries_by_prompt_category["gratitude"], 1);
    assert!(settings.stats.is_consistent());
    assert_eq!(settings.goals.get(GoalMetric::Entries).current, 1);
    assert_eq!(settings.user.entry_count, 1);

    let reloaded = Settings::load_required(&settings_path).unwrap();
    assert_eq!(reloaded.stats, settings.stats);

    let conn = store.remote().unwrap().get_conn().unwrap();
    let user = users::get_user(&conn, &settings.user.id).unwrap().unwrap();
    assert_eq!(user.entry_count, 1);
    let prompt = catalog
        .find_by_id(outcome.entry.prompt.id.as_deref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(prompt.usage_count, 1);
}

#[test]
fn test_deleting_from_the_secondary_backend_leaves_stats_alone() {
    let dir = tempdir().unwrap();
    let settings_path = dir.path().join("config.json");
    let mut settings = Settings::fresh("Ada", StoragePreference::Both, at("2024-06-01T07:00:00+00:00"));

    let db = open_remote(&dir.path().join("remote.db"));
    users::ensure_user(&db.get_conn().unwrap(), &settings.user).unwrap();
    let store = EntryStore::new(
        LocalStore::new(dir.path().join("entries")),
        Some(db),
        &settings.user.id,
    );
    let catalog = store.remote().unwrap();

    let outcome = record_entry(
        &store,
        catalog,
        &mut settings,
        &settings_path,
        draft(
            catalog,
            "2024-06-02T08:00:00+00:00",
            "2024-06-02T08:01:00+00:00",
            "one two three",
        ),
    )
    .unwrap();
    let remote_id = outcome
        .saved
        .iter()
        .find(|(backend, _)| *backend == Backend::Remote)
        .map(|(_, key)| key.clone())
        .unwrap();

    let report = delete_entry(&store, &mut settings, &settings_path, Backend::Remote, &remote_id).unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.accounted, 0);
    assert_eq!(settings.stats.total_entries, 1);

    let local_key = outcome.entry.key().to_string();
    let report = delete_entry(&store, &mut settings, &settings_path, Backend::Local, &local_key).unwrap();
    assert_eq!(report.accounted, 1);
    assert_eq!(settings.stats.total_entries, 0);
    assert_eq!(settings.stats.deleted_entries, 1);
    assert_eq!(settings.stats.deleted_words, 3);
    assert!(settings.stats.is_consistent());
}

#[test]
fn test_sync_after_a_both_write_finds_nothing_to_move() {
    let dir = tempdir().unwrap();
    let settings_path = dir.path().join("config.json");
    let mut settings = Settings::fresh("Ada", StoragePreference::Both, at("2024-06-03T07:00:00+00:00"));

    let db = open_remote(&dir.path().join("remote.db"));
    users::ensure_user(&db.get_conn().unwrap(), &settings.user).unwrap();
    let store = EntryStore::new(
        LocalStore::new(dir.path().join("entries")),
        Some(db),
        &settings.user.id,
    );
    let catalog = store.remote().unwrap();

    record_entry(
        &store,
        catalog,
        &mut settings,
        &settings_path,
        draft(
            catalog,
            "2024-06-03T08:00:00+05:30",
            "2024-06-03T08:04:30+05:30",
            "already in both places",
        ),
    )
    .unwrap();

    for direction in [Direction::LocalToRemote, Direction::RemoteToLocal] {
        let report = reconcile(&store, direction, Utc::now()).unwrap();
        assert_eq!(report.migrated, 0, "{}", direction);
        assert_eq!(report.already_present, 1, "{}", direction);
        assert!(report.warnings.is_empty(), "{}", direction);
    }
    assert_eq!(store.local().list_all().unwrap().count(), 1);
}
