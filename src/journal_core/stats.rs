//! Running aggregates over recorded entries.
//!
//! [`update`] folds one new entry into the prior snapshot and goals and
//! returns the new state plus the milestone messages to show. It is a pure
//! function and is NOT idempotent: feeding the same entry twice counts it
//! twice, so the write pipeline calls it exactly once per persisted entry.

use super::entry::Entry;
use super::goals::{self, GoalMetric, GoalPeriod, GoalProgress};
use super::Goals;
use crate::constants::{DEFAULT_PROMPT_CATEGORIES, STREAK_MILESTONES};
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WritingTime {
    pub total_minutes: u64,
    pub average_minutes: f64,
}

/// Usage of one tag or mood: how often, and on which days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStat {
    pub count: u64,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub last_entry: Option<DateTime<FixedOffset>>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_entries: u64,
    pub total_words: u64,
    pub deleted_entries: u64,
    pub deleted_words: u64,
    pub writing_time: WritingTime,
    pub entries_by_prompt_category: BTreeMap<String, u64>,
    #[serde(default)]
    pub tags: BTreeMap<String, UsageStat>,
    #[serde(default)]
    pub moods: BTreeMap<String, UsageStat>,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        StatsSnapshot {
            last_entry: None,
            current_streak: 0,
            longest_streak: 0,
            total_entries: 0,
            total_words: 0,
            deleted_entries: 0,
            deleted_words: 0,
            writing_time: WritingTime::default(),
            entries_by_prompt_category: DEFAULT_PROMPT_CATEGORIES
                .iter()
                .map(|c| (c.to_string(), 0))
                .collect(),
            tags: BTreeMap::new(),
            moods: BTreeMap::new(),
        }
    }
}

impl StatsSnapshot {
    /// `totalEntries` agrees with the per-category counters.
    pub fn is_consistent(&self) -> bool {
        self.total_entries == self.entries_by_prompt_category.values().sum::<u64>()
            && self.current_streak <= self.longest_streak
    }

    /// Tags ordered by use, most used first; ties by name.
    pub fn top_tags(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut tags: Vec<(&str, u64)> = self
            .tags
            .iter()
            .map(|(tag, stat)| (tag.as_str(), stat.count))
            .collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        tags.truncate(limit);
        tags
    }

    fn recompute_average(&mut self) {
        self.writing_time.average_minutes = if self.total_entries == 0 {
            0.0
        } else {
            self.writing_time.total_minutes as f64 / self.total_entries as f64
        };
    }
}

/// A message worth celebrating after an entry is recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum Milestone {
    GoalMet {
        metric: GoalMetric,
        period: GoalPeriod,
        target: u64,
        current: u64,
    },
    Streak(u32),
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Milestone::GoalMet {
                metric,
                period,
                target,
                current,
            } => write!(
                f,
                "You reached your {} goal of {} {} ({} so far)!",
                period, target, metric, current
            ),
            Milestone::Streak(days) => write!(f, "{} day writing streak! Keep it going.", days),
        }
    }
}

/// Result of folding one entry into the aggregates.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsUpdate {
    pub stats: StatsSnapshot,
    pub goals: Goals,
    pub entries_goal: GoalProgress,
    pub words_goal: GoalProgress,
    pub messages: Vec<Milestone>,
}

fn bump_usage(map: &mut BTreeMap<String, UsageStat>, label: &str, day: NaiveDate) {
    let stat = map.entry(label.to_string()).or_default();
    stat.count += 1;
    stat.dates.push(day);
}

/// Folds `entry` into `prior` and `goals`.
pub fn update(prior: &StatsSnapshot, goals: &Goals, entry: &Entry) -> StatsUpdate {
    let mut stats = prior.clone();
    let created = entry.metadata.created;
    let day = entry.day();

    stats.total_entries += 1;
    stats.total_words += entry.content.word_count;
    *stats
        .entries_by_prompt_category
        .entry(entry.prompt.category.clone())
        .or_insert(0) += 1;

    for tag in &entry.content.tags {
        bump_usage(&mut stats.tags, tag, day);
    }
    if let Some(mood) = entry.content.mood.as_deref() {
        bump_usage(&mut stats.moods, mood, day);
    }

    stats.writing_time.total_minutes += entry.metadata.duration_in_minutes;
    stats.recompute_average();

    let previous_streak = stats.current_streak;
    match stats.last_entry.map(|last| last.date_naive()) {
        None => {
            stats.current_streak = 1;
            stats.last_entry = Some(created);
        }
        Some(last_day) => {
            let gap = day.signed_duration_since(last_day).num_days();
            match gap {
                // Older entry: streak history is left alone.
                g if g < 0 => {}
                0 => {
                    stats.current_streak = stats.current_streak.max(1);
                    if stats.last_entry.map_or(true, |last| created > last) {
                        stats.last_entry = Some(created);
                    }
                }
                1 => {
                    stats.current_streak += 1;
                    stats.last_entry = Some(created);
                }
                _ => {
                    stats.current_streak = 1;
                    stats.last_entry = Some(created);
                }
            }
        }
    }
    stats.longest_streak = stats.longest_streak.max(stats.current_streak);

    let entries_goal = goals::evaluate(&goals.entries, 1, created);
    let words_goal = goals::evaluate(&goals.words, entry.content.word_count, created);

    let mut messages = Vec::new();
    for (metric, progress) in [
        (GoalMetric::Entries, &entries_goal),
        (GoalMetric::Words, &words_goal),
    ] {
        if let (true, Some(period)) = (progress.newly_met, progress.goal.period) {
            messages.push(Milestone::GoalMet {
                metric,
                period,
                target: progress.goal.goal,
                current: progress.goal.current,
            });
        }
    }
    if stats.current_streak > previous_streak && STREAK_MILESTONES.contains(&stats.current_streak)
    {
        messages.push(Milestone::Streak(stats.current_streak));
    }

    StatsUpdate {
        goals: Goals {
            entries: entries_goal.goal.clone(),
            words: words_goal.goal.clone(),
        },
        stats,
        entries_goal,
        words_goal,
        messages,
    }
}

/// Accounts for a deleted entry, keeping category counts in step with the
/// total. Tag and mood history is kept.
pub fn record_deletion(prior: &StatsSnapshot, entry: &Entry) -> StatsSnapshot {
    let mut stats = prior.clone();
    let words = entry.content.word_count;

    stats.total_entries = stats.total_entries.saturating_sub(1);
    stats.total_words = stats.total_words.saturating_sub(words);
    if let Some(count) = stats
        .entries_by_prompt_category
        .get_mut(&entry.prompt.category)
    {
        *count = count.saturating_sub(1);
    }
    stats.deleted_entries += 1;
    stats.deleted_words += words;
    stats.writing_time.total_minutes = stats
        .writing_time
        .total_minutes
        .saturating_sub(entry.metadata.duration_in_minutes);
    stats.recompute_average();
    stats
}
