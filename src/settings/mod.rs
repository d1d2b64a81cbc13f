//! The per-user settings document (`config.json`): profile, goals and the
//! running stats snapshot. It is always read and written whole.

use crate::errors::{AppError, AppResult};
use crate::journal_core::{Goal, GoalMetric, GoalPeriod, Goals, StatsSnapshot};
use crate::journal_io::{read_json, write_json_atomic, WriteMode};
use crate::store::Backend;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// Where new entries are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoragePreference {
    #[default]
    Local,
    Cloud,
    Both,
}

impl StoragePreference {
    /// Backends an entry is saved to, in order.
    pub fn backends(self) -> Vec<Backend> {
        match self {
            StoragePreference::Local => vec![Backend::Local],
            StoragePreference::Cloud => vec![Backend::Remote],
            StoragePreference::Both => vec![Backend::Local, Backend::Remote],
        }
    }

    /// The backend whose contents the stats snapshot describes.
    pub fn primary(self) -> Backend {
        match self {
            StoragePreference::Cloud => Backend::Remote,
            StoragePreference::Local | StoragePreference::Both => Backend::Local,
        }
    }

    pub fn uses_remote(self) -> bool {
        self != StoragePreference::Local
    }
}

impl fmt::Display for StoragePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoragePreference::Local => f.write_str("local"),
            StoragePreference::Cloud => f.write_str("cloud"),
            StoragePreference::Both => f.write_str("both"),
        }
    }
}

impl FromStr for StoragePreference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(StoragePreference::Local),
            "cloud" | "remote" => Ok(StoragePreference::Cloud),
            "both" => Ok(StoragePreference::Both),
            other => Err(AppError::Validation(format!(
                "Unknown storage preference '{}'. Use \"local\", \"cloud\" or \"both\".",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub use_editor: bool,
    #[serde(default)]
    pub storage_preference: StoragePreference,
    #[serde(default)]
    pub entry_count: u64,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub user: UserProfile,
    pub goals: Goals,
    pub stats: StatsSnapshot,
}

impl Settings {
    /// A new settings document: fresh user id, disabled goals, empty stats.
    pub fn fresh(name: &str, storage: StoragePreference, now: DateTime<FixedOffset>) -> Self {
        Settings {
            user: UserProfile {
                id: Uuid::new_v4().to_string(),
                name: name.trim().to_string(),
                created_at: now.with_timezone(&Utc),
                use_editor: false,
                storage_preference: storage,
                entry_count: 0,
                last_sync: None,
            },
            goals: Goals::disabled(now),
            stats: StatsSnapshot::default(),
        }
    }

    /// Reads the settings document; `None` if it does not exist yet.
    pub fn load(path: &Path) -> AppResult<Option<Self>> {
        let settings = read_json(path)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Reads the settings document, failing if `rflect init` was never run.
    pub fn load_required(path: &Path) -> AppResult<Self> {
        Settings::load(path)?.ok_or_else(|| {
            AppError::Config(format!(
                "No settings found at {}. Run `rflect init` first.",
                path.display()
            ))
        })
    }

    /// Rewrites the whole document atomically.
    pub fn save(&self, path: &Path) -> AppResult<()> {
        write_json_atomic(path, self, WriteMode::Replace)
    }

    /// Writes `fresh` unless a document exists and `reset` is not set.
    /// Returns the settings in effect and whether they were newly written.
    pub fn install(path: &Path, fresh: Settings, reset: bool) -> AppResult<(Settings, bool)> {
        if !reset {
            if let Some(existing) = Settings::load(path)? {
                return Ok((existing, false));
            }
        }
        fresh.save(path)?;
        info!("Wrote settings to {:?}", path);
        Ok((fresh, true))
    }

    /// Validates and applies a goal configuration. Progress restarts with
    /// the period containing `now`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for an unknown metric or period, or a
    /// target that is not a non-negative whole number. A target of 0
    /// disables the goal.
    pub fn set_goal(
        &mut self,
        metric: &str,
        period: &str,
        target: &str,
        now: DateTime<FixedOffset>,
    ) -> AppResult<GoalMetric> {
        let metric: GoalMetric = metric.parse()?;
        let period: GoalPeriod = period.parse()?;
        let target: u64 = target.trim().parse().map_err(|_| {
            AppError::Validation(format!(
                "Goal target '{}' must be a whole number",
                target.trim()
            ))
        })?;

        *self.goals.get_mut(metric) = if target == 0 {
            Goal::disabled(now)
        } else {
            Goal::configured(target, period, now)
        };
        info!("Set {} goal to {}", metric, self.goals.get(metric).describe(metric));
        Ok(metric)
    }
}
