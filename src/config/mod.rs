//! Configuration management for the rflect application.
//!
//! This module handles loading and validating runtime settings from environment
//! variables, with sensible defaults. It decides where the local entry store,
//! the settings document and the remote document store live, and which editor
//! is launched for long-form responses.
//!
//! # Environment Variables
//!
//! - `RFLECT_DIR`: Data directory (defaults to `~/.rflect`)
//! - `RFLECT_REMOTE_DB`: Remote document store (defaults to `<RFLECT_DIR>/remote.db`)
//! - `RFLECT_EDITOR`: Editor to use for responses
//! - `EDITOR`: Fallback editor if RFLECT_EDITOR is not set (defaults to "vim")
//! - `HOME`: Used for expanding the default data directory path
//!
//! User preferences that change over time (name, goals, storage preference)
//! are not environment driven; they live in the settings document, see
//! [`crate::settings`].

use crate::constants::{
    DEFAULT_DATA_SUBDIR, DEFAULT_EDITOR_COMMAND, EDITOR_FORBIDDEN_CHARS, ENTRIES_SUBDIR,
    ENV_VAR_EDITOR, ENV_VAR_HOME, ENV_VAR_RFLECT_DIR, ENV_VAR_RFLECT_EDITOR,
    ENV_VAR_RFLECT_REMOTE_DB, PROMPTS_FILENAME, REDACTED_PLACEHOLDER, REMOTE_DB_FILENAME,
    SETTINGS_FILENAME,
};
use crate::errors::{AppError, AppResult};
use std::env;
use std::fmt;
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Runtime configuration for the rflect application.
///
/// # Examples
///
/// ```
/// use rflect::Config;
/// use std::path::PathBuf;
///
/// let config = Config::with_root(PathBuf::from("/tmp/rflect"));
/// assert_eq!(config.entries_dir(), PathBuf::from("/tmp/rflect/entries"));
/// assert_eq!(config.remote_db_path, PathBuf::from("/tmp/rflect/remote.db"));
/// ```
#[derive(Clone)]
pub struct Config {
    /// Editor command used when the user prefers writing in an editor.
    pub editor: String,

    /// Directory holding entries, settings and the local prompt catalog.
    pub data_dir: PathBuf,

    /// Location of the remote document store.
    pub remote_db_path: PathBuf,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("editor", &REDACTED_PLACEHOLDER)
            .field("data_dir", &REDACTED_PLACEHOLDER)
            .field("remote_db_path", &REDACTED_PLACEHOLDER)
            .finish()
    }
}

impl Config {
    /// Builds a configuration rooted at `data_dir` with default file names.
    pub fn with_root(data_dir: PathBuf) -> Self {
        let remote_db_path = data_dir.join(REMOTE_DB_FILENAME);
        Config {
            editor: DEFAULT_EDITOR_COMMAND.to_string(),
            data_dir,
            remote_db_path,
        }
    }

    /// Directory with one JSON file per entry.
    pub fn entries_dir(&self) -> PathBuf {
        self.data_dir.join(ENTRIES_SUBDIR)
    }

    /// The settings document (user profile, goals and stats).
    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILENAME)
    }

    /// The local prompt catalog.
    pub fn prompts_path(&self) -> PathBuf {
        self.data_dir.join(PROMPTS_FILENAME)
    }

    /// Validates an editor command string for security.
    ///
    /// The command must be non-empty, contain no spaces and no shell
    /// metacharacters.
    fn validate_editor_command(editor_cmd: &str) -> AppResult<&str> {
        if editor_cmd.is_empty() {
            return Err(AppError::Config(
                "Editor command cannot be empty".to_string(),
            ));
        }

        if editor_cmd.contains(' ') {
            return Err(AppError::Config(
                "Editor command cannot contain spaces. Use a wrapper script or shell alias for editors requiring arguments".to_string(),
            ));
        }

        for &ch in EDITOR_FORBIDDEN_CHARS.iter() {
            if editor_cmd.contains(ch) {
                return Err(AppError::Config(format!(
                    "Editor command cannot contain shell metacharacters: '{}'. Use a wrapper script or shell alias instead",
                    ch
                )));
            }
        }

        Ok(editor_cmd)
    }

    /// Loads configuration from environment variables with sensible defaults.
    ///
    /// Paths are expanded with `shellexpand`, so `~` and `$VARS` are honoured.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if:
    /// - A path expansion fails
    /// - The editor command fails validation
    /// - The data directory resolves to an empty path
    pub fn load() -> AppResult<Self> {
        let editor_raw = env::var(ENV_VAR_RFLECT_EDITOR)
            .or_else(|_| env::var(ENV_VAR_EDITOR))
            .unwrap_or_else(|_| DEFAULT_EDITOR_COMMAND.to_string());
        let editor = Config::validate_editor_command(&editor_raw)?;

        let data_dir_str = env::var(ENV_VAR_RFLECT_DIR).unwrap_or_else(|_| {
            let home = env::var(ENV_VAR_HOME).unwrap_or_default();
            format!("{}/{}", home, DEFAULT_DATA_SUBDIR)
        });
        let data_dir = expand_path(&data_dir_str)?;

        if data_dir.as_os_str().is_empty() {
            return Err(AppError::Config("Data directory path is empty".to_string()));
        }

        let remote_db_path = match env::var(ENV_VAR_RFLECT_REMOTE_DB) {
            Ok(raw) => expand_path(&raw)?,
            Err(_) => data_dir.join(REMOTE_DB_FILENAME),
        };

        Ok(Config {
            editor: editor.to_string(),
            data_dir,
            remote_db_path,
        })
    }

    /// Validates that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the editor is empty or either path is
    /// not absolute.
    pub fn validate(&self) -> AppResult<()> {
        if self.editor.is_empty() {
            return Err(AppError::Config("Editor command is empty".to_string()));
        }

        if !self.data_dir.is_absolute() {
            return Err(AppError::Config(
                "Data directory must be an absolute path".to_string(),
            ));
        }

        if !self.remote_db_path.is_absolute() {
            return Err(AppError::Config(
                "Remote store path must be an absolute path".to_string(),
            ));
        }

        Ok(())
    }

    /// Creates the data and entries directories if they are missing.
    pub fn ensure_directories(&self) -> AppResult<()> {
        ensure_private_dir(&self.data_dir)?;
        ensure_private_dir(&self.entries_dir())
    }
}

fn expand_path(raw: &str) -> AppResult<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| AppError::Config(format!("Failed to expand path: {}", e)))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn ensure_private_dir(dir: &Path) -> AppResult<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to create directory {}: {}", dir.display(), e),
        ))
    })?;

    #[cfg(unix)]
    {
        let permissions =
            fs::Permissions::from_mode(crate::constants::DEFAULT_DIR_PERMISSIONS);
        fs::set_permissions(dir, permissions)?;
        debug!("Set 0o700 permissions on {:?}", dir);
    }

    Ok(())
}
