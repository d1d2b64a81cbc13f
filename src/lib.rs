/*!
# rflect

rflect is a journaling tool built around guided prompts. Each answer is an
[`Entry`](journal_core::Entry) that is persisted to a local directory of JSON
records, a remote SQLite document store, or both, while a running
[`StatsSnapshot`](journal_core::StatsSnapshot) and goal progress are kept in
the settings document.

## Architecture

- `journal_core`: pure entry, stats and goal logic with no I/O
- `journal_io`: atomic JSON file reads and writes
- `store`: the entry store over the local and remote backends
- `db`: the remote document store (users, prompts, entries)
- `catalog`: prompt catalogs and the built-in prompt set
- `settings`: the settings document (profile, goals, stats)
- `ops`: write, delete, reconcile and the read-only insights
- `editor`: composing a response in an external editor
- `cli`: argument parsing and the subcommand handlers
- `config`: environment-driven paths and editor choice
- `errors`: error types shared across the crate

## Usage Example

```rust,no_run
use rflect::{Config, AppResult};
use rflect::settings::Settings;

fn main() -> AppResult<()> {
    let config = Config::load()?;
    let settings = Settings::load_required(&config.settings_path())?;
    println!("{} entries so far", settings.stats.total_entries);
    Ok(())
}
```
*/

/// Prompt catalogs (local file and remote table)
pub mod catalog;
/// Command-line interface for parsing and handling user arguments
pub mod cli;
/// Configuration loading and management
pub mod config;
pub mod constants;
/// Remote document store
pub mod db;
pub mod editor;
/// Error types and utilities for error handling
pub mod errors;
pub mod journal_core;
pub mod journal_io;
pub mod ops;
pub mod settings;
pub mod store;

// Re-export important types for convenience
pub use cli::CliArgs;
pub use config::Config;
pub use errors::{AppError, AppResult};
