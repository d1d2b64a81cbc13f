//! The shared prompt catalog in the remote store.

use crate::catalog::{CatalogPrompt, PromptCatalog};
use crate::db::Database;
use crate::errors::{AppResult, DatabaseError};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

fn prompt_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogPrompt> {
    Ok(CatalogPrompt {
        id: row.get(0)?,
        question: row.get(1)?,
        category: row.get(2)?,
        usage_count: row.get::<_, i64>(3)?.max(0) as u64,
    })
}

/// Adds a prompt to the catalog, or returns false if the question is taken.
pub fn insert_prompt(conn: &Connection, prompt: &CatalogPrompt) -> AppResult<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO prompts (id, question, category, usage_count) VALUES (?1, ?2, ?3, ?4)",
            params![
                prompt.id,
                prompt.question,
                prompt.category,
                prompt.usage_count as i64
            ],
        )
        .map_err(DatabaseError::Sqlite)?;
    Ok(inserted == 1)
}

/// Removes a prompt. Entries that referenced it keep the dangling id.
pub fn delete_prompt(conn: &Connection, id: &str) -> AppResult<usize> {
    conn.execute("DELETE FROM prompts WHERE id = ?1", params![id])
        .map_err(|e| DatabaseError::Sqlite(e).into())
}

impl PromptCatalog for Database {
    fn find_by_id(&self, id: &str) -> AppResult<Option<CatalogPrompt>> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, question, category, usage_count FROM prompts WHERE id = ?1",
            params![id],
            prompt_from_row,
        )
        .optional()
        .map_err(|e| DatabaseError::Sqlite(e).into())
    }

    fn find_by_question(&self, question: &str) -> AppResult<Option<CatalogPrompt>> {
        let conn = self.get_conn()?;
        conn.query_row(
            "SELECT id, question, category, usage_count FROM prompts WHERE question = ?1",
            params![question.trim()],
            prompt_from_row,
        )
        .optional()
        .map_err(|e| DatabaseError::Sqlite(e).into())
    }

    fn increment_usage(&self, id: &str) -> AppResult<()> {
        let conn = self.get_conn()?;
        let updated = conn
            .execute(
                "UPDATE prompts SET usage_count = usage_count + 1 WHERE id = ?1",
                params![id],
            )
            .map_err(DatabaseError::Sqlite)?;
        debug!("Incremented usage for prompt {} ({} rows)", id, updated);
        Ok(())
    }

    fn list(&self, category: Option<&str>) -> AppResult<Vec<CatalogPrompt>> {
        let conn = self.get_conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, question, category, usage_count FROM prompts \
                 WHERE ?1 IS NULL OR lower(category) = lower(?1) \
                 ORDER BY category, question",
            )
            .map_err(DatabaseError::Sqlite)?;

        let prompts = stmt
            .query_map(params![category], prompt_from_row)
            .map_err(DatabaseError::Sqlite)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::Sqlite)?;
        Ok(prompts)
    }
}
