//! Constants used throughout the application.
//!
//! This module contains all constants used in the rflect application, organized
//! into logical groups. Having constants centralized makes them easier to find,
//! modify, and reference consistently.

// Application Metadata
/// The name of the application.
pub const APP_NAME: &str = "rflect";
/// The description of the application used in CLI help text.
pub const APP_DESCRIPTION: &str = "A CLI tool for guided reflections and journaling";

// CLI Arguments & Defaults
/// Default command for the editor if not specified otherwise.
pub const DEFAULT_EDITOR_COMMAND: &str = "vim";
/// Log format identifier for plain text.
pub const LOG_FORMAT_TEXT: &str = "text";
/// Log format identifier for JSON.
pub const LOG_FORMAT_JSON: &str = "json";
/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";
/// Log level used when `--verbose` is passed.
pub const VERBOSE_LOG_LEVEL: &str = "debug";

// Configuration Keys & Environment Variables
/// Environment variable for the rflect data directory.
pub const ENV_VAR_RFLECT_DIR: &str = "RFLECT_DIR";
/// Environment variable for the remote document store location.
pub const ENV_VAR_RFLECT_REMOTE_DB: &str = "RFLECT_REMOTE_DB";
/// Environment variable for specifying the preferred rflect editor.
pub const ENV_VAR_RFLECT_EDITOR: &str = "RFLECT_EDITOR";
/// Standard environment variable for specifying the default editor.
pub const ENV_VAR_EDITOR: &str = "EDITOR";
/// Standard environment variable for the user's home directory.
pub const ENV_VAR_HOME: &str = "HOME";
/// Default data directory name within the user's home directory.
pub const DEFAULT_DATA_SUBDIR: &str = ".rflect";

// Validation
/// Characters forbidden in editor commands for security reasons.
pub const EDITOR_FORBIDDEN_CHARS: &[char] =
    &['|', '&', ';', '$', '(', ')', '`', '\\', '<', '>', '\'', '"'];
/// Placeholder string for redacted information in debug output.
pub const REDACTED_PLACEHOLDER: &str = "[REDACTED]";

// File System Layout
/// Sub-directory holding one JSON file per entry.
pub const ENTRIES_SUBDIR: &str = "entries";
/// Settings document (user profile, goals, stats).
pub const SETTINGS_FILENAME: &str = "config.json";
/// Local prompt catalog.
pub const PROMPTS_FILENAME: &str = "prompts.json";
/// Default file name of the remote document store.
pub const REMOTE_DB_FILENAME: &str = "remote.db";
/// File extension for entry records.
pub const ENTRY_FILE_EXTENSION: &str = "json";
/// Default POSIX permissions for newly created directories (owner read/write/execute).
#[cfg(unix)]
pub const DEFAULT_DIR_PERMISSIONS: u32 = 0o700;

// Date/Time Formats
/// Entry key format (minute resolution).
pub const ENTRY_KEY_FORMAT: &str = "%m-%d-%Y-%H%M";
/// Human readable entry date.
pub const ENTRY_DATE_STRING_FORMAT: &str = "%b %d %Y at %-I:%M %p";
/// Date format accepted by `show --date`.
pub const DATE_FORMAT_US: &str = "%m/%d/%Y";
/// Date format string for ISO date format (YYYY-MM-DD).
pub const DATE_FORMAT_ISO: &str = "%Y-%m-%d";

// Stats
/// Streak lengths (in days) that earn a milestone message.
pub const STREAK_MILESTONES: &[u32] = &[3, 7, 14, 30, 60, 100, 180, 365];
/// Number of tags shown by `tags --top`.
pub const TOP_TAGS_LIMIT: usize = 5;
/// Prompt categories seeded into a fresh stats snapshot.
pub const DEFAULT_PROMPT_CATEGORIES: &[&str] =
    &["question", "quote", "gratitude", "growth", "mindfulness"];

// Remote Store
/// Maximum pooled connections to the remote store.
pub const REMOTE_POOL_SIZE: u32 = 4;
/// How long a remote operation waits on a busy store before failing.
pub const REMOTE_BUSY_TIMEOUT_MS: u64 = 5_000;

// Logging Configuration
/// Service name used in tracing spans and structured logs.
pub const TRACING_SERVICE_NAME: &str = "rflect";
/// Name for the root tracing span covering an application invocation.
pub const TRACING_ROOT_SPAN_NAME: &str = "app_invocation";
