//! The remote document store.
//!
//! Remote entries, the shared prompt catalog and user records live in a
//! SQLite database reached through an r2d2 connection pool. The location is
//! configurable so the store can sit on a mounted or synced volume.
//!
//! # Module Structure
//!
//! - `schema`: Table definitions, seeding and schema versioning
//! - `entries`: Entry documents keyed by user and natural key
//! - `prompts`: The prompt catalog, exposed through [`crate::catalog::PromptCatalog`]
//! - `users`: Per-user counters and sync bookkeeping
//!
//! # Example
//!
//! ```no_run
//! use rflect::db::Database;
//! use std::path::Path;
//!
//! let db = Database::open(Path::new("/tmp/rflect-remote.db"))?;
//! db.initialize_schema()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod entries;
pub mod prompts;
pub mod schema;
pub mod users;

use crate::constants::{REMOTE_BUSY_TIMEOUT_MS, REMOTE_POOL_SIZE};
use crate::errors::{AppResult, DatabaseError, StoreError};
use crate::store::Backend;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a pooled SQLite connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Remote store handle with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the remote store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::StorageUnavailable` if the store's directory does
    /// not exist or no connection can be established.
    pub fn open(db_path: &Path) -> AppResult<Self> {
        debug!("Opening remote store at: {:?}", db_path);

        let parent_missing = db_path
            .parent()
            .is_some_and(|p| !p.as_os_str().is_empty() && !p.is_dir());
        if parent_missing {
            return Err(StoreError::StorageUnavailable {
                backend: Backend::Remote,
                reason: format!("{} is not reachable", db_path.display()),
            }
            .into());
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(REMOTE_POOL_SIZE)
            .connection_timeout(Duration::from_millis(REMOTE_BUSY_TIMEOUT_MS))
            .connection_customizer(Box::new(RemoteConnectionConfig))
            .build(manager)
            .map_err(|e| StoreError::StorageUnavailable {
                backend: Backend::Remote,
                reason: e.to_string(),
            })?;

        // Make sure the file is actually a usable database
        let conn = pool.get().map_err(DatabaseError::Pool)?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| StoreError::StorageUnavailable {
            backend: Backend::Remote,
            reason: e.to_string(),
        })?;
        drop(conn);

        info!("Remote store opened at {:?}", db_path);
        Ok(Database {
            pool,
            path: db_path.to_path_buf(),
        })
    }

    /// Opens the store and makes sure its schema and prompt catalog exist.
    pub fn open_initialized(db_path: &Path) -> AppResult<Self> {
        let db = Database::open(db_path)?;
        db.initialize_schema()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a connection from the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if no connection is available or the pool is exhausted.
    pub fn get_conn(&self) -> AppResult<PooledConnection> {
        self.pool
            .get()
            .map_err(|e| crate::errors::DatabaseError::Pool(e).into())
    }

    /// Creates tables and seeds the prompt catalog. Idempotent.
    pub fn initialize_schema(&self) -> AppResult<()> {
        let conn = self.get_conn()?;
        schema::create_tables(&conn)?;
        schema::seed_prompts(&conn)?;
        info!("Remote store schema initialized");
        Ok(())
    }
}

/// Applied to every pooled connection.
#[derive(Debug)]
struct RemoteConnectionConfig;

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for RemoteConnectionConfig {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        conn.busy_timeout(Duration::from_millis(REMOTE_BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(())
    }

    fn on_release(&self, _conn: Connection) {}
}
