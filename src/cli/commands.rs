//! Handlers for each subcommand. They load what they need, call into
//! [`crate::ops`], and print results to stdout.

use super::{CliArgs, Commands, ConfigArgs, DeleteArgs, GoalArgs, InitArgs, ShowArgs, WriteArgs};
use crate::catalog::{LocalCatalog, PromptCatalog};
use crate::config::Config;
use crate::constants::{DATE_FORMAT_ISO, DATE_FORMAT_US};
use crate::db::{users, Database};
use crate::editor::{self, SystemEditor};
use crate::errors::{AppError, AppResult, StoreError};
use crate::journal_core::{Entry, EntryDraft, EntryFilter, GoalMetric};
use crate::ops::{self, Direction};
use crate::settings::{Settings, StoragePreference};
use crate::store::{Backend, EntryStore, Scan};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use std::io::{self, IsTerminal, Read};
use tracing::{info, warn};

fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Runs the parsed command.
pub fn run(args: CliArgs, config: &Config) -> AppResult<()> {
    match args.command {
        Commands::Init(init) => run_init(config, init),
        Commands::Write(write) => run_write(config, write),
        Commands::Show(show) => run_show(config, show),
        Commands::Stats { time } => run_stats(config, time),
        Commands::Tags { top } => run_tags(config, top),
        Commands::Moods { calendar } => run_moods(config, calendar),
        Commands::Goal(goal) => run_goal(config, goal),
        Commands::Config(cfg) => run_config(config, cfg),
        Commands::Delete(delete) => run_delete(config, delete),
        Commands::Sync { direction } => run_sync(config, &direction),
        Commands::Prompts { category } => run_prompts(config, category.as_deref()),
    }
}

/// The requested backend, or the one the user writes to.
fn backend_for(requested: Option<&str>, settings: &Settings) -> AppResult<Backend> {
    match requested {
        Some(raw) => raw.parse(),
        None => Ok(settings.user.storage_preference.primary()),
    }
}

/// The remote catalog when connected, the local one otherwise.
fn catalog_for<'a>(store: &'a EntryStore, local: &'a LocalCatalog) -> &'a dyn PromptCatalog {
    match store.remote() {
        Ok(db) => db as &dyn PromptCatalog,
        Err(_) => local,
    }
}

fn run_init(config: &Config, args: InitArgs) -> AppResult<()> {
    let storage: StoragePreference = args.storage.parse()?;
    config.ensure_directories()?;

    let fresh = Settings::fresh(&args.name, storage, now());
    let (settings, created) = Settings::install(&config.settings_path(), fresh, args.reset)?;
    LocalCatalog::new(config.prompts_path()).install(args.reset)?;

    if settings.user.storage_preference.uses_remote() {
        let remote = Database::open_initialized(&config.remote_db_path).and_then(|db| {
            let conn = db.get_conn()?;
            users::ensure_user(&conn, &settings.user)
        });
        if let Err(e) = remote {
            warn!("Remote store not ready: {}", e);
            println!("Remote store is not reachable yet ({}). Entries will be kept locally until it is.", e);
        }
    }

    if created {
        let greeting = if settings.user.name.is_empty() {
            "Welcome to rflect!".to_string()
        } else {
            format!("Welcome to rflect, {}!", settings.user.name)
        };
        println!("{}", greeting);
        println!("Your reflections are kept in {}", config.data_dir.display());
        println!("Run `rflect write` to answer your first prompt.");
    } else {
        println!("rflect is already set up. Use `rflect init --reset` to start over.");
    }
    Ok(())
}

fn read_response(config: &Config, settings: &Settings, question: &str, args: &WriteArgs) -> AppResult<String> {
    if let Some(body) = &args.body {
        return Ok(body.clone());
    }
    if settings.user.use_editor {
        let editor = SystemEditor {
            editor_cmd: config.editor.clone(),
        };
        return editor::compose(&editor, question);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        println!("(Type your response, then press Ctrl-D on a new line.)");
    }
    let mut body = String::new();
    stdin.lock().read_to_string(&mut body)?;
    Ok(body)
}

fn run_write(config: &Config, args: WriteArgs) -> AppResult<()> {
    let settings_path = config.settings_path();
    let mut settings = Settings::load_required(&settings_path)?;
    let store = EntryStore::open(
        config,
        &settings.user,
        settings.user.storage_preference.uses_remote(),
    );
    let local_catalog = LocalCatalog::new(config.prompts_path());
    let catalog = catalog_for(&store, &local_catalog);

    let prompt = catalog
        .random_prompt(args.category.as_deref())?
        .ok_or_else(|| match &args.category {
            Some(category) => AppError::Validation(format!("No prompts in category '{}'", category)),
            None => AppError::Config("The prompt catalog is empty".to_string()),
        })?;

    let started_at = now();
    println!("\n{}\n", prompt.question);
    let body = read_response(config, &settings, &prompt.question, &args)?;
    let finished_at = now();

    let draft = EntryDraft {
        prompt: prompt.as_prompt(),
        body,
        tags: args.tags,
        mood: args.mood,
        started_at,
        finished_at,
        user_id: Some(settings.user.id.clone()),
    };
    let outcome = ops::record_entry(&store, catalog, &mut settings, &settings_path, draft)?;

    println!(
        "Entry saved: {} ({} words, {}).",
        outcome.entry.key(),
        outcome.entry.content.word_count,
        outcome.entry.metadata.duration_string
    );
    for (backend, error) in &outcome.failed {
        println!("Could not save to the {} store: {}", backend, error);
    }
    if outcome.is_partial() {
        println!("Run `rflect sync --direction local-to-remote` once the remote store is reachable.");
    }
    for message in &outcome.messages {
        println!("{}", message);
    }
    Ok(())
}

fn parse_day(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT_US)
        .or_else(|_| NaiveDate::parse_from_str(raw, DATE_FORMAT_ISO))
        .map_err(|_| {
            AppError::Validation(format!(
                "'{}' is not a date. Use MM/DD/YYYY or YYYY-MM-DD.",
                raw
            ))
        })
}

fn render_entry(key: &str, entry: &Entry) -> String {
    let mut out = format!(
        "=== {} ===\n{} [{}]\n\n{}\n\n{} words, {}",
        entry.metadata.date_string,
        entry.prompt.question,
        entry.prompt.category,
        entry.content.body,
        entry.content.word_count,
        entry.metadata.duration_string
    );
    if !entry.content.tags.is_empty() {
        let tags: Vec<String> = entry.content.tags.iter().map(|t| format!("#{}", t)).collect();
        out.push_str(&format!("\nTags: {}", tags.join(" ")));
    }
    if let Some(mood) = &entry.content.mood {
        out.push_str(&format!("\nMood: {}", mood));
    }
    out.push_str(&format!("\nKey: {}\n", key));
    out
}

fn run_show(config: &Config, args: ShowArgs) -> AppResult<()> {
    let settings = Settings::load_required(&config.settings_path())?;
    let backend = backend_for(args.backend.as_deref(), &settings)?;
    let store = EntryStore::open(config, &settings.user, backend == Backend::Remote);

    if args.recent {
        match store.most_recent(backend)? {
            Some(stored) => println!("{}", render_entry(&stored.key, &stored.entry)),
            None => println!("No entries yet. Run `rflect write` to add one."),
        }
        return Ok(());
    }

    let filter = if let Some(tag) = args.tag {
        EntryFilter::Tag(tag)
    } else if let Some(mood) = args.mood {
        EntryFilter::Mood(mood)
    } else if let Some(category) = args.category {
        EntryFilter::Category(category)
    } else if let Some(date) = args.date {
        EntryFilter::Date(parse_day(&date)?)
    } else if let Some(key) = args.key {
        EntryFilter::Key(key)
    } else {
        EntryFilter::All
    };

    let mut scan = store.find_by(backend, &filter)?;
    scan.entries.sort_by_key(|stored| stored.entry.metadata.created);
    if scan.entries.is_empty() {
        println!("No matching entries.");
    }
    for stored in &scan.entries {
        println!("{}", render_entry(&stored.key, &stored.entry));
    }
    if !scan.malformed.is_empty() {
        println!("{} record(s) could not be read:", scan.malformed.len());
        for error in &scan.malformed {
            println!("  {}", error);
        }
    }
    Ok(())
}

fn run_stats(config: &Config, time: bool) -> AppResult<()> {
    let settings = Settings::load_required(&config.settings_path())?;
    let stats = &settings.stats;

    println!("=== Writing Stats ===");
    println!("Current streak: {} day(s)", stats.current_streak);
    println!("Longest streak: {} day(s)", stats.longest_streak);
    println!("Total entries: {}", stats.total_entries);
    println!("Total words: {}", stats.total_words);
    println!(
        "Writing time: {} minutes total, {:.1} minutes on average",
        stats.writing_time.total_minutes, stats.writing_time.average_minutes
    );
    if stats.deleted_entries > 0 {
        println!(
            "Deleted: {} entries, {} words",
            stats.deleted_entries, stats.deleted_words
        );
    }
    if let Some(last) = stats.last_entry {
        println!("Last entry: {}", last.format("%b %d %Y"));
    }

    println!("\n=== Goals ===");
    for metric in [GoalMetric::Entries, GoalMetric::Words] {
        let goal = settings.goals.get(metric);
        if goal.is_enabled() {
            println!(
                "{}: {} of {} this period",
                goal.describe(metric),
                goal.current,
                goal.goal
            );
        } else {
            println!("{} goal: {}", metric, goal.describe(metric));
        }
    }

    println!("\n=== Entries by Category ===");
    for (category, count) in &stats.entries_by_prompt_category {
        println!("{}: {}", category, count);
    }

    if time {
        print_session_extremes(config, &settings)?;
    }
    Ok(())
}

fn print_session_extremes(config: &Config, settings: &Settings) -> AppResult<()> {
    let backend = settings.user.storage_preference.primary();
    let store = EntryStore::open(config, &settings.user, backend == Backend::Remote);
    let scan = match store.find_by(backend, &EntryFilter::All) {
        Ok(scan) => scan,
        Err(AppError::Store(StoreError::StorageUnavailable { .. })) if backend == Backend::Local => {
            Scan::default()
        }
        Err(e) => return Err(e),
    };

    println!("\n=== Writing Sessions ===");
    match ops::duration_extremes(&scan.entries) {
        Some(extremes) => {
            for (label, stored) in [("Shortest", extremes.shortest), ("Longest", extremes.longest)] {
                println!(
                    "{} session: {} on {} ({})",
                    label,
                    stored.entry.metadata.duration_string,
                    stored.entry.metadata.date_string,
                    stored.key
                );
            }
        }
        None => println!("No entries to time yet."),
    }
    Ok(())
}

fn run_tags(config: &Config, top: bool) -> AppResult<()> {
    let settings = Settings::load_required(&config.settings_path())?;
    let tags = ops::tag_usage(&settings.stats, top);
    if tags.is_empty() {
        println!("No tags found. Add some with `rflect write --tags a,b`.");
        return Ok(());
    }

    println!("{}", if top { "=== Most Used Tags ===" } else { "=== All Tags ===" });
    for (tag, count) in tags {
        println!(
            "#{} used in {} {}",
            tag,
            count,
            if count == 1 { "entry" } else { "entries" }
        );
    }
    Ok(())
}

fn run_moods(config: &Config, calendar: Option<String>) -> AppResult<()> {
    let settings = Settings::load_required(&config.settings_path())?;

    if let Some(mood) = calendar {
        match ops::mood_calendar(&settings.stats, &mood, now().date_naive()) {
            Some(cal) => println!("{}", cal),
            None => println!("No entries found with mood: {}", mood),
        }
        return Ok(());
    }

    let frequencies = ops::mood_frequencies(&settings.stats);
    if frequencies.is_empty() {
        println!("No moods recorded. Add one with `rflect write --mood`.");
    }
    for frequency in frequencies {
        println!("{}", frequency);
    }
    Ok(())
}

fn run_goal(config: &Config, args: GoalArgs) -> AppResult<()> {
    let settings_path = config.settings_path();
    let mut settings = Settings::load_required(&settings_path)?;
    let metric = settings.set_goal(&args.metric, &args.period, &args.target, now())?;
    settings.save(&settings_path)?;

    let goal = settings.goals.get(metric);
    if goal.is_enabled() {
        println!("Goal set: {}", goal.describe(metric));
    } else {
        println!("{} goal turned off", metric);
    }
    Ok(())
}

fn run_config(config: &Config, args: ConfigArgs) -> AppResult<()> {
    let settings_path = config.settings_path();
    let mut settings = Settings::load_required(&settings_path)?;

    let mut changed = false;
    if let Some(name) = args.name {
        settings.user.name = name.trim().to_string();
        changed = true;
    }
    if let Some(use_editor) = args.editor {
        settings.user.use_editor = use_editor;
        changed = true;
    }
    if let Some(storage) = args.storage {
        settings.user.storage_preference = storage.parse()?;
        changed = true;
    }
    if changed {
        settings.save(&settings_path)?;
        info!("Updated profile settings");
        println!("Settings updated.");
    }

    if args.show || !changed {
        let user = &settings.user;
        println!("Name: {}", user.name);
        println!("Write in editor: {} ({})", user.use_editor, config.editor);
        println!("Storage: {}", user.storage_preference);
        println!("Entries written: {}", user.entry_count);
        match user.last_sync {
            Some(at) => println!("Last sync: {}", at.format("%b %d %Y %H:%M UTC")),
            None => println!("Last sync: never"),
        }
        for metric in [GoalMetric::Entries, GoalMetric::Words] {
            println!("{} goal: {}", metric, settings.goals.get(metric).describe(metric));
        }
    }
    Ok(())
}

fn run_delete(config: &Config, args: DeleteArgs) -> AppResult<()> {
    let settings_path = config.settings_path();
    let mut settings = Settings::load_required(&settings_path)?;
    let backend = backend_for(args.backend.as_deref(), &settings)?;
    let store = EntryStore::open(config, &settings.user, backend == Backend::Remote);

    let report = if let Some(key) = args.key {
        ops::delete_entry(&store, &mut settings, &settings_path, backend, &key)?
    } else if let Some(date) = args.date {
        let day = parse_day(&date)?;
        ops::delete_entries_on(&store, &mut settings, &settings_path, backend, day)?
    } else {
        ops::delete_all_entries(&store, &mut settings, &settings_path, backend)?
    };

    match report.deleted {
        0 => println!("No entries deleted."),
        1 => println!("Deleted 1 entry from the {} store.", backend),
        n => println!("Deleted {} entries from the {} store.", n, backend),
    }
    if report.unreadable > 0 {
        println!(
            "{} of them could not be read and were not subtracted from your stats.",
            report.unreadable
        );
    }
    Ok(())
}

fn run_sync(config: &Config, direction: &str) -> AppResult<()> {
    let direction: Direction = direction.parse()?;
    let settings_path = config.settings_path();
    let mut settings = Settings::load_required(&settings_path)?;
    let store = EntryStore::open(config, &settings.user, true);

    let synced_at = Utc::now();
    let report = ops::reconcile(&store, direction, synced_at)?;
    settings.user.last_sync = Some(synced_at);
    settings.save(&settings_path)?;

    println!(
        "Sync {} complete: {} migrated, {} already present.",
        report.direction, report.migrated, report.already_present
    );
    if !report.warnings.is_empty() {
        println!("{} record(s) skipped:", report.warnings.len());
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}

fn run_prompts(config: &Config, category: Option<&str>) -> AppResult<()> {
    let settings = Settings::load_required(&config.settings_path())?;
    let store = EntryStore::open(
        config,
        &settings.user,
        settings.user.storage_preference.uses_remote(),
    );
    let local_catalog = LocalCatalog::new(config.prompts_path());

    let prompts = catalog_for(&store, &local_catalog).list(category)?;
    if prompts.is_empty() {
        println!("No prompts found.");
    }
    let mut current_category = "";
    for prompt in &prompts {
        if prompt.category != current_category {
            println!("\n[{}]", prompt.category);
            current_category = prompt.category.as_str();
        }
        println!("  {} (used {} times)", prompt.question, prompt.usage_count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(parse_day("03/05/2024").unwrap(), expected);
        assert_eq!(parse_day("2024-03-05").unwrap(), expected);
        assert!(matches!(parse_day("yesterday"), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_backend_defaults_to_primary() {
        let now = DateTime::parse_from_rfc3339("2024-03-05T09:30:00+00:00").unwrap();
        let cloud = Settings::fresh("Ada", StoragePreference::Cloud, now);
        let both = Settings::fresh("Ada", StoragePreference::Both, now);

        assert_eq!(backend_for(None, &cloud).unwrap(), Backend::Remote);
        assert_eq!(backend_for(None, &both).unwrap(), Backend::Local);
        assert_eq!(backend_for(Some("local"), &cloud).unwrap(), Backend::Local);
        assert!(backend_for(Some("disk"), &cloud).is_err());
    }

    #[test]
    fn test_render_entry_includes_tags_and_mood() {
        let entry = Entry::assemble(
            crate::journal_core::Prompt {
                id: None,
                question: "What went well?".to_string(),
                category: "growth".to_string(),
            },
            "shipped it".to_string(),
            vec!["work".to_string()],
            Some("😊 happy".to_string()),
            DateTime::parse_from_rfc3339("2024-03-05T09:30:00+00:00").unwrap(),
            3,
            None,
        );

        let rendered = render_entry(entry.key(), &entry);
        assert!(rendered.contains("What went well? [growth]"));
        assert!(rendered.contains("#work"));
        assert!(rendered.contains("Mood: 😊 happy"));
        assert!(rendered.contains("Key: 03-05-2024-0930"));
    }
}
