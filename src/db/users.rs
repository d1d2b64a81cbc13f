//! User records in the remote store.

use crate::errors::{AppResult, DatabaseError};
use crate::settings::UserProfile;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteUser {
    pub id: String,
    pub name: String,
    pub storage_preference: String,
    pub entry_count: u64,
    pub last_sync: Option<String>,
    pub created_at: String,
}

/// Creates the user's row if missing and refreshes name and storage
/// preference. Counters are left alone.
pub fn ensure_user(conn: &Connection, profile: &UserProfile) -> AppResult<()> {
    conn.execute(
        r#"
        INSERT INTO users (id, name, storage_preference, entry_count, created_at)
        VALUES (?1, ?2, ?3, 0, ?4)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            storage_preference = excluded.storage_preference
        "#,
        params![
            profile.id,
            profile.name,
            profile.storage_preference.to_string(),
            profile
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        ],
    )
    .map_err(DatabaseError::Sqlite)?;
    debug!("Ensured remote user {}", profile.id);
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> AppResult<Option<RemoteUser>> {
    conn.query_row(
        "SELECT id, name, storage_preference, entry_count, last_sync, created_at FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(RemoteUser {
                id: row.get(0)?,
                name: row.get(1)?,
                storage_preference: row.get(2)?,
                entry_count: row.get::<_, i64>(3)?.max(0) as u64,
                last_sync: row.get(4)?,
                created_at: row.get(5)?,
            })
        },
    )
    .optional()
    .map_err(|e| DatabaseError::Sqlite(e).into())
}

pub fn increment_entry_count(conn: &Connection, id: &str) -> AppResult<()> {
    let updated = conn
        .execute(
            "UPDATE users SET entry_count = entry_count + 1 WHERE id = ?1",
            params![id],
        )
        .map_err(DatabaseError::Sqlite)?;
    if updated == 0 {
        return Err(DatabaseError::NotFound(format!("User {} not found", id)).into());
    }
    Ok(())
}

/// Stamps the user's last successful reconciliation.
pub fn record_sync(conn: &Connection, id: &str, at: DateTime<Utc>) -> AppResult<()> {
    let updated = conn
        .execute(
            "UPDATE users SET last_sync = ?2 WHERE id = ?1",
            params![id, at.to_rfc3339_opts(SecondsFormat::Millis, true)],
        )
        .map_err(DatabaseError::Sqlite)?;
    if updated == 0 {
        return Err(DatabaseError::NotFound(format!("User {} not found", id)).into());
    }
    Ok(())
}
