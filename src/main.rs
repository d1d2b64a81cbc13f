/*!
# rflect - Guided Reflections

rflect asks you a prompt, records your answer as a journal entry, and keeps
streaks, goals, tag and mood statistics alongside it. Entries live in a local
directory, a remote document store, or both.

## Usage

```text
rflect init [--name NAME] [--storage local|cloud|both] [--reset]
rflect write [--body TEXT] [--tags a,b] [--mood MOOD] [--category CAT]
rflect show [--recent | --tag T | --mood M | --category C | --date D | --key K]
rflect stats | tags [--top] | moods [--calendar MOOD]
rflect goal --metric entries|words --period daily|weekly|monthly --target N
rflect config [--name N] [--editor true|false] [--storage S] [--show]
rflect delete (--all | --key K) [--backend local|remote]
rflect sync --direction local-to-remote|remote-to-local
rflect prompts [--category C]
```

## Configuration

- `RFLECT_DIR`: data directory (defaults to `~/.rflect`)
- `RFLECT_REMOTE_DB`: remote document store (defaults to `remote.db` in the data directory)
- `RFLECT_EDITOR` or `EDITOR`: editor used when the profile prefers one (defaults to "vim")
*/

use clap::Parser;
use rflect::cli::{commands, CliArgs};
use rflect::config::Config;
use rflect::constants::{
    DEFAULT_LOG_LEVEL, LOG_FORMAT_JSON, TRACING_ROOT_SPAN_NAME, TRACING_SERVICE_NAME,
    VERBOSE_LOG_LEVEL,
};
use rflect::errors::AppResult;
use std::process::ExitCode;
use tracing::{debug, error, info, info_span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Installs the global subscriber. Logs go to stderr so command output on
/// stdout stays clean. `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool, log_format: &str) {
    let default_level = if verbose {
        VERBOSE_LOG_LEVEL
    } else {
        DEFAULT_LOG_LEVEL
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log_format == LOG_FORMAT_JSON {
        builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .init();
    } else {
        builder.with_target(false).init();
    }
}

fn run(args: CliArgs) -> AppResult<()> {
    info!("Loading configuration");
    let config = Config::load()?;
    config.validate()?;
    debug!("Data directory: {:?}", config.data_dir);

    commands::run(args, &config)
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose, &args.log_format);

    let invocation_id = Uuid::new_v4().to_string();
    let root_span = info_span!(
        TRACING_ROOT_SPAN_NAME,
        service = TRACING_SERVICE_NAME,
        invocation_id = %invocation_id
    );
    let _guard = root_span.enter();
    debug!("CLI arguments: {:?}", args);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
