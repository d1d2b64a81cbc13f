//! Core journal functionality without I/O operations.
//!
//! This module contains the entry record, the goal state machine and the
//! stats aggregator. Nothing in here touches the filesystem or the remote
//! store; callers pass in the prior state and persist what comes back.

pub mod entry;
pub mod goals;
pub mod stats;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub use entry::{count_words, entry_key_for, Entry, EntryDraft, EntryFilter, Prompt};
pub use goals::{Goal, GoalMetric, GoalPeriod, GoalProgress, GoalStatus};
pub use stats::{Milestone, StatsSnapshot, StatsUpdate, UsageStat, WritingTime};

/// The two tracked goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goals {
    pub entries: Goal,
    pub words: Goal,
}

impl Goals {
    /// Both goals disabled, as written at install time.
    pub fn disabled(now: DateTime<FixedOffset>) -> Self {
        Goals {
            entries: Goal::disabled(now),
            words: Goal::disabled(now),
        }
    }

    pub fn get(&self, metric: GoalMetric) -> &Goal {
        match metric {
            GoalMetric::Entries => &self.entries,
            GoalMetric::Words => &self.words,
        }
    }

    pub fn get_mut(&mut self, metric: GoalMetric) -> &mut Goal {
        match metric {
            GoalMetric::Entries => &mut self.entries,
            GoalMetric::Words => &mut self.words,
        }
    }
}
