//! Entry documents in the remote store.
//!
//! Remote records are leaner than local ones: they keep the response text,
//! the duration, the word count and the creation instant, and point at the
//! catalog prompt by id.

use crate::errors::{AppError, AppResult, DatabaseError, StoreError};
use crate::journal_core::{Entry, Prompt};
use crate::store::NaturalKey;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

/// A remote entry as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntry {
    pub id: String,
    pub user_id: String,
    pub prompt_id: String,
    pub content: String,
    pub duration: u64,
    pub word_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

impl RemoteEntry {
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(
            &self.user_id,
            &self.prompt_id,
            self.duration,
            self.word_count,
            self.created_at,
        )
    }

    /// Rebuilds a full entry. Tags and mood are not kept remotely.
    pub fn to_entry(&self, prompt: Prompt) -> Entry {
        Entry::assemble(
            prompt,
            self.content.clone(),
            Vec::new(),
            None,
            self.created_at,
            self.duration,
            Some(self.user_id.clone()),
        )
    }
}

/// A remote entry about to be inserted.
#[derive(Debug, Clone)]
pub struct NewRemoteEntry {
    pub user_id: String,
    pub prompt_id: String,
    pub content: String,
    pub duration: u64,
    pub word_count: u64,
    pub created_at: DateTime<FixedOffset>,
}

impl NewRemoteEntry {
    pub fn from_entry(entry: &Entry, user_id: &str, prompt_id: &str) -> Self {
        NewRemoteEntry {
            user_id: user_id.to_string(),
            prompt_id: prompt_id.to_string(),
            content: entry.content.body.clone(),
            duration: entry.metadata.duration_in_minutes,
            word_count: entry.content.word_count,
            created_at: entry.metadata.created,
        }
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(
            &self.user_id,
            &self.prompt_id,
            self.duration,
            self.word_count,
            self.created_at,
        )
    }
}

/// Row as read from SQLite, before the timestamp is parsed.
struct RawRow {
    id: String,
    user_id: String,
    prompt_id: String,
    content: String,
    duration: i64,
    word_count: i64,
    created_at: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            prompt_id: row.get(2)?,
            content: row.get(3)?,
            duration: row.get(4)?,
            word_count: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn parse(self) -> Result<RemoteEntry, StoreError> {
        let created_at =
            DateTime::parse_from_rfc3339(&self.created_at).map_err(|e| {
                StoreError::MalformedRecord {
                    record: self.id.clone(),
                    reason: format!("bad created_at '{}': {}", self.created_at, e),
                }
            })?;
        Ok(RemoteEntry {
            id: self.id,
            user_id: self.user_id,
            prompt_id: self.prompt_id,
            content: self.content,
            duration: self.duration.max(0) as u64,
            word_count: self.word_count.max(0) as u64,
            created_at,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, prompt_id, content, duration, word_count, created_at FROM entries";

/// Inserts a new entry and returns its generated id.
///
/// # Errors
///
/// Returns `StoreError::DuplicateKey` if an entry with the same natural key
/// already exists.
pub fn insert_entry(conn: &Connection, entry: &NewRemoteEntry) -> AppResult<String> {
    let id = Uuid::new_v4().to_string();
    let fingerprint = entry.natural_key().fingerprint();

    let result = conn.execute(
        r#"
        INSERT INTO entries (id, user_id, prompt_id, content, duration, word_count, created_at, natural_key)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            id,
            entry.user_id,
            entry.prompt_id,
            entry.content,
            entry.duration as i64,
            entry.word_count as i64,
            entry
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            fingerprint,
        ],
    );

    match result {
        Ok(_) => {
            debug!("Inserted remote entry {}", id);
            Ok(id)
        }
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(StoreError::DuplicateKey { key: fingerprint }.into())
        }
        Err(e) => Err(DatabaseError::Sqlite(e).into()),
    }
}

/// Finds the entry with the given natural key.
pub fn find_by_natural_key(conn: &Connection, key: &NaturalKey) -> AppResult<Option<RemoteEntry>> {
    let raw = conn
        .query_row(
            &format!("{} WHERE natural_key = ?1", SELECT_COLUMNS),
            params![key.fingerprint()],
            RawRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)?;

    match raw {
        Some(raw) => Ok(Some(raw.parse().map_err(AppError::Store)?)),
        None => Ok(None),
    }
}

/// Fetches one entry by id, scoped to `user_id`.
pub fn get_entry(conn: &Connection, user_id: &str, id: &str) -> AppResult<Option<RemoteEntry>> {
    let raw = conn
        .query_row(
            &format!("{} WHERE user_id = ?1 AND id = ?2", SELECT_COLUMNS),
            params![user_id, id],
            RawRow::from_row,
        )
        .optional()
        .map_err(DatabaseError::Sqlite)?;

    match raw {
        Some(raw) => Ok(Some(raw.parse().map_err(AppError::Store)?)),
        None => Ok(None),
    }
}

/// Lists a user's entries, oldest first, optionally limited to one prompt.
/// Rows whose timestamp cannot be parsed come back as `Err` items, after
/// the readable ones.
pub fn list_entries(
    conn: &Connection,
    user_id: &str,
    prompt_id: Option<&str>,
) -> AppResult<Vec<Result<RemoteEntry, StoreError>>> {
    let mut stmt = conn
        .prepare(&format!(
            "{} WHERE user_id = ?1 AND (?2 IS NULL OR prompt_id = ?2)",
            SELECT_COLUMNS
        ))
        .map_err(DatabaseError::Sqlite)?;

    let rows = stmt
        .query_map(params![user_id, prompt_id], RawRow::from_row)
        .map_err(DatabaseError::Sqlite)?;

    let mut entries = Vec::new();
    for row in rows {
        let raw = row.map_err(DatabaseError::Sqlite)?;
        entries.push(raw.parse());
    }
    // Stored timestamps keep their offsets, so text order is not time order.
    entries.sort_by_key(|item: &Result<RemoteEntry, StoreError>| match item {
        Ok(entry) => (false, Some(entry.created_at.with_timezone(&Utc))),
        Err(_) => (true, None),
    });

    debug!("Listed {} remote entries for {}", entries.len(), user_id);
    Ok(entries)
}

/// Deletes one entry. Returns the number of rows removed.
pub fn delete_entry(conn: &Connection, user_id: &str, id: &str) -> AppResult<usize> {
    conn.execute(
        "DELETE FROM entries WHERE user_id = ?1 AND id = ?2",
        params![user_id, id],
    )
    .map_err(|e| DatabaseError::Sqlite(e).into())
}

/// Deletes all of a user's entries. Returns the number of rows removed.
pub fn delete_all_entries(conn: &Connection, user_id: &str) -> AppResult<usize> {
    conn.execute("DELETE FROM entries WHERE user_id = ?1", params![user_id])
        .map_err(|e| DatabaseError::Sqlite(e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use chrono::TimeZone;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn new_entry(user: &str, minute: u32) -> NewRemoteEntry {
        NewRemoteEntry {
            user_id: user.to_string(),
            prompt_id: "p1".to_string(),
            content: "remote words".to_string(),
            duration: 4,
            word_count: 2,
            created_at: FixedOffset::east_opt(0)
                .unwrap()
                .with_ymd_and_hms(2024, 3, 1, 10, minute, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_insert_and_find_by_natural_key() {
        let conn = setup();
        let entry = new_entry("u1", 0);
        let id = insert_entry(&conn, &entry).unwrap();

        let found = find_by_natural_key(&conn, &entry.natural_key()).unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.content, "remote words");
        assert_eq!(found.created_at, entry.created_at);

        assert!(find_by_natural_key(&conn, &new_entry("u1", 1).natural_key())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_natural_key_is_rejected() {
        let conn = setup();
        insert_entry(&conn, &new_entry("u1", 0)).unwrap();

        match insert_entry(&conn, &new_entry("u1", 0)) {
            Err(AppError::Store(StoreError::DuplicateKey { .. })) => {}
            other => panic!("Expected DuplicateKey, got {:?}", other),
        }
    }

    #[test]
    fn test_list_is_scoped_and_ordered() {
        let conn = setup();
        insert_entry(&conn, &new_entry("u1", 5)).unwrap();
        insert_entry(&conn, &new_entry("u1", 1)).unwrap();
        insert_entry(&conn, &new_entry("u2", 3)).unwrap();

        let listed: Vec<RemoteEntry> = list_entries(&conn, "u1", None)
            .unwrap()
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at < listed[1].created_at);

        assert!(list_entries(&conn, "u1", Some("other")).unwrap().is_empty());
    }

    #[test]
    fn test_list_orders_by_instant_across_offsets() {
        let conn = setup();
        let utc_morning = new_entry("u1", 5);
        let mut earlier_elsewhere = new_entry("u1", 0);
        // 11:00 at +02:00 is 09:00 UTC, an hour before the first entry
        earlier_elsewhere.created_at = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 11, 0, 0)
            .unwrap();
        insert_entry(&conn, &utc_morning).unwrap();
        insert_entry(&conn, &earlier_elsewhere).unwrap();

        let listed: Vec<RemoteEntry> = list_entries(&conn, "u1", None)
            .unwrap()
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(listed[0].created_at, earlier_elsewhere.created_at);
        assert_eq!(listed[1].created_at, utc_morning.created_at);
    }

    #[test]
    fn test_bad_timestamp_is_malformed_item() {
        let conn = setup();
        conn.execute(
            "INSERT INTO entries VALUES ('x', 'u1', 'p1', 'c', 1, 1, 'yesterday', 'fp')",
            [],
        )
        .unwrap();

        let listed = list_entries(&conn, "u1", None).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(matches!(
            &listed[0],
            Err(StoreError::MalformedRecord { record, .. }) if record == "x"
        ));
    }

    #[test]
    fn test_delete() {
        let conn = setup();
        let id = insert_entry(&conn, &new_entry("u1", 0)).unwrap();
        insert_entry(&conn, &new_entry("u1", 1)).unwrap();
        insert_entry(&conn, &new_entry("u2", 1)).unwrap();

        assert_eq!(delete_entry(&conn, "u2", &id).unwrap(), 0);
        assert_eq!(delete_entry(&conn, "u1", &id).unwrap(), 1);
        assert!(get_entry(&conn, "u1", &id).unwrap().is_none());
        assert_eq!(delete_all_entries(&conn, "u1").unwrap(), 1);
        assert_eq!(list_entries(&conn, "u2", None).unwrap().len(), 1);
    }
}
