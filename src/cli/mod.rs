//! Command-line interface definition.

pub mod commands;

use crate::constants::{APP_DESCRIPTION, APP_NAME, LOG_FORMAT_JSON, LOG_FORMAT_TEXT};
use clap::{ArgGroup, Args, Parser, Subcommand};

/// A CLI tool for guided reflections and journaling
#[derive(Parser, Debug)]
#[command(name = APP_NAME, about = APP_DESCRIPTION, version, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    /// Print verbose logging to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_parser = [LOG_FORMAT_TEXT, LOG_FORMAT_JSON], default_value = LOG_FORMAT_TEXT)]
    pub log_format: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, settings and prompt catalogs
    Init(InitArgs),

    /// Answer a random prompt
    Write(WriteArgs),

    /// Show past entries
    Show(ShowArgs),

    /// Show streaks, totals and goal progress
    Stats {
        /// Also show the shortest and longest writing sessions
        #[arg(long)]
        time: bool,
    },

    /// List the tags you have used
    Tags {
        /// Only the five most used tags
        #[arg(long)]
        top: bool,
    },

    /// Mood frequencies, or a monthly calendar for one mood
    Moods {
        /// Show this month's calendar for the given mood
        #[arg(long, value_name = "MOOD")]
        calendar: Option<String>,
    },

    /// Set an entries or words goal
    Goal(GoalArgs),

    /// Update or show your profile settings
    Config(ConfigArgs),

    /// Delete entries
    Delete(DeleteArgs),

    /// Copy entries missing from one store into the other
    Sync {
        /// local-to-remote or remote-to-local
        #[arg(long, short = 'd')]
        direction: String,
    },

    /// List the prompt catalog
    Prompts {
        /// Only prompts of this category
        #[arg(long, short = 'c')]
        category: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Your name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Where entries are stored: local, cloud or both
    #[arg(long, default_value = "local")]
    pub storage: String,

    /// Overwrite existing settings and catalog
    #[arg(long)]
    pub reset: bool,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Response text; otherwise read from the editor or stdin
    #[arg(long, short = 'b')]
    pub body: Option<String>,

    /// Comma separated tags
    #[arg(long, short = 't', value_delimiter = ',')]
    pub tags: Vec<String>,

    /// How you feel, e.g. "😊 happy"
    #[arg(long, short = 'm')]
    pub mood: Option<String>,

    /// Draw the prompt from this category
    #[arg(long, short = 'c')]
    pub category: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("selector").args(["recent", "tag", "mood", "category", "date", "key"])))]
pub struct ShowArgs {
    /// Only the most recent entry
    #[arg(long, short = 'r')]
    pub recent: bool,

    /// Entries with this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Entries with this mood
    #[arg(long)]
    pub mood: Option<String>,

    /// Entries whose prompt has this category
    #[arg(long)]
    pub category: Option<String>,

    /// Entries written on this day (MM/DD/YYYY or YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// The entry with this key
    #[arg(long)]
    pub key: Option<String>,

    /// Store to read from: local or remote (defaults to where you write)
    #[arg(long)]
    pub backend: Option<String>,
}

#[derive(Args, Debug)]
pub struct GoalArgs {
    /// entries or words
    #[arg(long)]
    pub metric: String,

    /// daily, weekly or monthly
    #[arg(long)]
    pub period: String,

    /// Target per period; 0 turns the goal off
    #[arg(long)]
    pub target: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Change your name
    #[arg(long)]
    pub name: Option<String>,

    /// Write responses in the editor (true/false)
    #[arg(long)]
    pub editor: Option<bool>,

    /// Where entries are stored: local, cloud or both
    #[arg(long)]
    pub storage: Option<String>,

    /// Print the current settings
    #[arg(long)]
    pub show: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").args(["all", "key", "date"]).required(true)))]
pub struct DeleteArgs {
    /// Delete every entry
    #[arg(long)]
    pub all: bool,

    /// Delete the entry with this key
    #[arg(long)]
    pub key: Option<String>,

    /// Delete every entry written on this day (MM/DD/YYYY or YYYY-MM-DD)
    #[arg(long, short = 'd')]
    pub date: Option<String>,

    /// Store to delete from: local or remote (defaults to where you write)
    #[arg(long)]
    pub backend: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_args() {
        let args = CliArgs::parse_from([
            "rflect", "write", "--body", "hello there", "--tags", "a,b", "--mood", "calm",
        ]);
        match args.command {
            Commands::Write(w) => {
                assert_eq!(w.body.as_deref(), Some("hello there"));
                assert_eq!(w.tags, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(w.mood.as_deref(), Some("calm"));
            }
            other => panic!("Expected write, got {:?}", other),
        }
        assert!(!args.verbose);
        assert_eq!(args.log_format, "text");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = CliArgs::parse_from(["rflect", "stats", "--verbose", "--log-format", "json"]);
        assert!(args.verbose);
        assert_eq!(args.log_format, "json");
        assert!(CliArgs::try_parse_from(["rflect", "stats", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_show_selectors_are_exclusive() {
        assert!(CliArgs::try_parse_from(["rflect", "show", "--recent", "--tag", "x"]).is_err());
        let args = CliArgs::parse_from(["rflect", "show", "--tag", "x", "--backend", "remote"]);
        match args.command {
            Commands::Show(s) => {
                assert_eq!(s.tag.as_deref(), Some("x"));
                assert_eq!(s.backend.as_deref(), Some("remote"));
            }
            other => panic!("Expected show, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_needs_a_target() {
        assert!(CliArgs::try_parse_from(["rflect", "delete"]).is_err());
        assert!(CliArgs::try_parse_from(["rflect", "delete", "--all", "--key", "k"]).is_err());
        assert!(CliArgs::try_parse_from(["rflect", "delete", "--all"]).is_ok());
        assert!(CliArgs::try_parse_from(["rflect", "delete", "--all", "--date", "03/05/2024"]).is_err());

        let args = CliArgs::parse_from(["rflect", "delete", "-d", "03/05/2024"]);
        match args.command {
            Commands::Delete(d) => {
                assert_eq!(d.date.as_deref(), Some("03/05/2024"));
                assert!(d.backend.is_none());
            }
            other => panic!("Expected delete, got {:?}", other),
        }
    }

    #[test]
    fn test_stats_time_flag() {
        let args = CliArgs::parse_from(["rflect", "stats", "--time"]);
        assert!(matches!(args.command, Commands::Stats { time: true }));
        let args = CliArgs::parse_from(["rflect", "stats"]);
        assert!(matches!(args.command, Commands::Stats { time: false }));
    }

    #[test]
    fn test_goal_and_sync() {
        let args = CliArgs::parse_from([
            "rflect", "goal", "--metric", "words", "--period", "daily", "--target", "100",
        ]);
        assert!(matches!(args.command, Commands::Goal(ref g) if g.target == "100"));

        let args = CliArgs::parse_from(["rflect", "sync", "--direction", "remote-to-local"]);
        assert!(matches!(args.command, Commands::Sync { ref direction } if direction == "remote-to-local"));
    }
}
