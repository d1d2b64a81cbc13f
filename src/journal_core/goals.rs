//! Writing goals and their period bookkeeping.
//!
//! Each goal tracks one metric (entries or words) over a repeating period.
//! Evaluation happens once per recorded entry: first roll the period over if
//! the entry falls in a later period than the one in progress, then add the
//! entry's contribution and check the target.

use crate::errors::AppError;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl GoalPeriod {
    /// First calendar day of the period containing `day`. Weeks start on Monday.
    pub fn first_day(self, day: NaiveDate) -> NaiveDate {
        match self {
            GoalPeriod::Daily => day,
            GoalPeriod::Weekly => {
                day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
            }
            GoalPeriod::Monthly => day.with_day(1).unwrap_or(day),
        }
    }

    /// Midnight at the start of the period containing `at`, in `at`'s offset.
    pub fn start_of(self, at: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let first = self.first_day(at.date_naive());
        first
            .and_hms_opt(0, 0, 0)
            .and_then(|midnight| at.offset().from_local_datetime(&midnight).single())
            .unwrap_or(at)
    }

    fn per_label(self) -> &'static str {
        match self {
            GoalPeriod::Daily => "per day",
            GoalPeriod::Weekly => "per week",
            GoalPeriod::Monthly => "per month",
        }
    }
}

impl fmt::Display for GoalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GoalPeriod::Daily => "daily",
            GoalPeriod::Weekly => "weekly",
            GoalPeriod::Monthly => "monthly",
        };
        f.write_str(label)
    }
}

impl FromStr for GoalPeriod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(GoalPeriod::Daily),
            "weekly" => Ok(GoalPeriod::Weekly),
            "monthly" => Ok(GoalPeriod::Monthly),
            other => Err(AppError::Validation(format!(
                "Invalid frequency '{}'. Use \"daily\", \"weekly\" or \"monthly\".",
                other
            ))),
        }
    }
}

/// What a goal counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalMetric {
    Entries,
    Words,
}

impl fmt::Display for GoalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalMetric::Entries => f.write_str("entries"),
            GoalMetric::Words => f.write_str("words"),
        }
    }
}

impl FromStr for GoalMetric {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entries" => Ok(GoalMetric::Entries),
            "words" => Ok(GoalMetric::Words),
            other => Err(AppError::Validation(format!(
                "Invalid goal type '{}'. Use \"entries\" or \"words\".",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    /// Target; zero disables the goal.
    pub goal: u64,
    #[serde(rename = "type")]
    pub period: Option<GoalPeriod>,
    /// Progress within the period that began at `period_start`.
    pub current: u64,
    pub period_start: DateTime<FixedOffset>,
}

impl Goal {
    /// A disabled goal, as created at install time.
    pub fn disabled(now: DateTime<FixedOffset>) -> Self {
        Goal {
            goal: 0,
            period: None,
            current: 0,
            period_start: now,
        }
    }

    /// A freshly configured goal; progress starts over with the current period.
    pub fn configured(target: u64, period: GoalPeriod, now: DateTime<FixedOffset>) -> Self {
        Goal {
            goal: target,
            period: Some(period),
            current: 0,
            period_start: period.start_of(now),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.goal > 0 && self.period.is_some()
    }

    /// Describes the target, e.g. `500 words per week`.
    pub fn describe(&self, metric: GoalMetric) -> String {
        match self.period {
            Some(period) if self.goal > 0 => {
                format!("{} {} {}", self.goal, metric, period.per_label())
            }
            _ => "not set".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Disabled,
    InProgress,
    Met,
}

/// Outcome of evaluating one goal against one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub goal: Goal,
    pub status: GoalStatus,
    /// The entry landed in a new period and progress was reset first.
    pub rolled_over: bool,
    /// This entry carried progress across the target.
    pub newly_met: bool,
}

/// Runs the goal state machine for one entry recorded at `at` that
/// contributes `delta` to the goal's metric.
pub fn evaluate(goal: &Goal, delta: u64, at: DateTime<FixedOffset>) -> GoalProgress {
    let period = match goal.period {
        Some(period) if goal.goal > 0 => period,
        _ => {
            return GoalProgress {
                goal: goal.clone(),
                status: GoalStatus::Disabled,
                rolled_over: false,
                newly_met: false,
            }
        }
    };

    let mut next = goal.clone();
    let entry_period = period.first_day(at.date_naive());
    let running_period = period.first_day(goal.period_start.date_naive());
    let rolled_over = entry_period > running_period;
    if rolled_over {
        next.current = 0;
        next.period_start = period.start_of(at);
    }

    let before = next.current;
    next.current = next.current.saturating_add(delta);
    let met = next.current >= next.goal;

    GoalProgress {
        status: if met {
            GoalStatus::Met
        } else {
            GoalStatus::InProgress
        },
        newly_met: met && before < next.goal,
        rolled_over,
        goal: next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_disabled_goal_is_untouched() {
        let goal = Goal::disabled(at(2024, 1, 1, 9));
        let progress = evaluate(&goal, 50, at(2024, 1, 3, 9));

        assert_eq!(progress.status, GoalStatus::Disabled);
        assert_eq!(progress.goal, goal);
        assert!(!progress.newly_met);

        let zero_target = Goal {
            goal: 0,
            period: Some(GoalPeriod::Daily),
            current: 4,
            period_start: at(2024, 1, 1, 0),
        };
        assert_eq!(
            evaluate(&zero_target, 1, at(2024, 1, 1, 9)).status,
            GoalStatus::Disabled
        );
    }

    #[test]
    fn test_daily_rollover_resets_before_counting() {
        let mut goal = Goal::configured(100, GoalPeriod::Daily, at(2024, 5, 10, 7));
        goal.current = 150;

        let progress = evaluate(&goal, 30, at(2024, 5, 11, 20));

        assert!(progress.rolled_over);
        assert_eq!(progress.goal.current, 30);
        assert_eq!(progress.goal.period_start, at(2024, 5, 11, 0));
        assert_eq!(progress.status, GoalStatus::InProgress);
    }

    #[test]
    fn test_same_period_accumulates_and_meets_once() {
        let goal = Goal::configured(2, GoalPeriod::Weekly, at(2024, 5, 6, 9)); // Monday

        let first = evaluate(&goal, 1, at(2024, 5, 7, 9));
        assert!(!first.rolled_over);
        assert_eq!(first.status, GoalStatus::InProgress);

        let second = evaluate(&first.goal, 1, at(2024, 5, 8, 9));
        assert_eq!(second.status, GoalStatus::Met);
        assert!(second.newly_met);

        let third = evaluate(&second.goal, 1, at(2024, 5, 12, 22)); // Sunday
        assert_eq!(third.status, GoalStatus::Met);
        assert!(!third.newly_met);
        assert_eq!(third.goal.current, 3);
    }

    #[test]
    fn test_weekly_boundary_is_monday() {
        let goal = Goal::configured(5, GoalPeriod::Weekly, at(2024, 5, 8, 9)); // Wednesday
        assert_eq!(goal.period_start, at(2024, 5, 6, 0));

        let progress = evaluate(&goal, 1, at(2024, 5, 13, 9)); // next Monday
        assert!(progress.rolled_over);
        assert_eq!(progress.goal.period_start, at(2024, 5, 13, 0));
    }

    #[test]
    fn test_monthly_rollover() {
        let goal = Goal::configured(1000, GoalPeriod::Monthly, at(2024, 1, 20, 9));
        assert!(!evaluate(&goal, 10, at(2024, 1, 31, 23)).rolled_over);

        let progress = evaluate(&goal, 10, at(2024, 2, 1, 0));
        assert!(progress.rolled_over);
        assert_eq!(progress.goal.period_start, at(2024, 2, 1, 0));
    }

    #[test]
    fn test_entry_before_period_does_not_roll_back() {
        let goal = Goal::configured(3, GoalPeriod::Daily, at(2024, 5, 10, 7));
        let progress = evaluate(&goal, 1, at(2024, 5, 9, 23));

        assert!(!progress.rolled_over);
        assert_eq!(progress.goal.period_start, goal.period_start);
        assert_eq!(progress.goal.current, 1);
    }

    #[test]
    fn test_parse_and_describe() {
        assert_eq!("Weekly".parse::<GoalPeriod>().unwrap(), GoalPeriod::Weekly);
        assert!("hourly".parse::<GoalPeriod>().is_err());
        assert_eq!("words".parse::<GoalMetric>().unwrap(), GoalMetric::Words);
        assert!(matches!(
            "pages".parse::<GoalMetric>(),
            Err(AppError::Validation(_))
        ));

        let goal = Goal::configured(500, GoalPeriod::Weekly, at(2024, 5, 8, 9));
        assert_eq!(goal.describe(GoalMetric::Words), "500 words per week");
        assert_eq!(
            Goal::disabled(at(2024, 5, 8, 9)).describe(GoalMetric::Entries),
            "not set"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let goal = Goal::configured(10, GoalPeriod::Daily, at(2024, 5, 8, 9));
        let value = serde_json::to_value(&goal).unwrap();
        assert_eq!(value["type"], "daily");
        assert_eq!(value["goal"], 10);
        assert!(value.get("periodStart").is_some());

        let disabled = serde_json::to_value(Goal::disabled(at(2024, 5, 8, 9))).unwrap();
        assert!(disabled["type"].is_null());
    }
}
