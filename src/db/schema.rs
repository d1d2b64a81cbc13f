//! Remote store schema definitions and initialization.
//!
//! Three collections: `users`, `prompts` (the shared catalog) and `entries`.
//! An entry's `prompt_id` is deliberately not a foreign key: entries may
//! outlive a catalog prompt, and readers report the dangling reference
//! instead of failing.

use crate::catalog::default_prompts;
use crate::errors::{AppResult, DatabaseError};
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// Current schema version.
///
/// Increment this whenever schema changes are made to support future migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Creates all tables and indexes.
///
/// This function is idempotent - it uses `CREATE TABLE IF NOT EXISTS`
/// so it's safe to call multiple times.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    debug!("Creating remote store tables");

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            storage_preference TEXT NOT NULL,
            entry_count INTEGER NOT NULL DEFAULT 0,
            last_sync TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .map_err(DatabaseError::Sqlite)?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS prompts (
            id TEXT PRIMARY KEY,
            question TEXT NOT NULL UNIQUE,
            category TEXT NOT NULL,
            usage_count INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_prompts_category ON prompts(category);
        "#,
    )
    .map_err(DatabaseError::Sqlite)?;

    // natural_key holds the fingerprint used for duplicate detection
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            prompt_id TEXT NOT NULL,
            content TEXT NOT NULL,
            duration INTEGER NOT NULL,
            word_count INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            natural_key TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_entries_user_created ON entries(user_id, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_entries_prompt_id ON entries(prompt_id);
        "#,
    )
    .map_err(DatabaseError::Sqlite)?;

    let current_version = get_schema_version(conn)?;
    if current_version == 0 {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(DatabaseError::Sqlite)?;
        info!("Initialized remote schema version {}", SCHEMA_VERSION);
    } else {
        debug!("Schema version already recorded: {}", current_version);
    }

    Ok(())
}

/// Gets the schema version recorded in the database header; 0 when unset.
pub fn get_schema_version(conn: &Connection) -> AppResult<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| DatabaseError::Sqlite(e).into())
}

/// Inserts the default prompt catalog, leaving existing prompts alone.
/// Returns how many prompts were added.
pub fn seed_prompts(conn: &Connection) -> AppResult<usize> {
    let mut stmt = conn
        .prepare(
            "INSERT OR IGNORE INTO prompts (id, question, category, usage_count) VALUES (?1, ?2, ?3, 0)",
        )
        .map_err(DatabaseError::Sqlite)?;

    let mut added = 0;
    for prompt in default_prompts() {
        added += stmt
            .execute(params![prompt.id, prompt.question, prompt.category])
            .map_err(DatabaseError::Sqlite)?;
    }

    if added > 0 {
        info!("Seeded {} prompts into the remote catalog", added);
    }
    Ok(added)
}
