//! Read-only views over the stats snapshot: tag usage, mood frequency and
//! the monthly mood calendar. Writing-session extremes are computed from
//! the entries themselves.

use crate::constants::TOP_TAGS_LIMIT;
use crate::journal_core::StatsSnapshot;
use crate::store::StoredEntry;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::BTreeSet;
use std::fmt;

/// Tags with their use counts; the five most used with `top`, otherwise all
/// tags alphabetically.
pub fn tag_usage(stats: &StatsSnapshot, top: bool) -> Vec<(&str, u64)> {
    if top {
        stats.top_tags(TOP_TAGS_LIMIT)
    } else {
        stats
            .tags
            .iter()
            .map(|(tag, stat)| (tag.as_str(), stat.count))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodFrequency {
    pub mood: String,
    pub count: u64,
    /// Every entry ever recorded, deleted ones included.
    pub out_of: u64,
}

impl fmt::Display for MoodFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "You were {} when writing {} {} out of {} total entries.",
            self.mood,
            self.count,
            if self.count == 1 { "entry" } else { "entries" },
            self.out_of
        )
    }
}

pub fn mood_frequencies(stats: &StatsSnapshot) -> Vec<MoodFrequency> {
    let out_of = stats.total_entries + stats.deleted_entries;
    stats
        .moods
        .iter()
        .map(|(mood, stat)| MoodFrequency {
            mood: mood.clone(),
            count: stat.count,
            out_of,
        })
        .collect()
}

/// The shortest and longest writing sessions.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationExtremes<'a> {
    pub shortest: &'a StoredEntry,
    pub longest: &'a StoredEntry,
}

/// `None` when there are no entries. Ties go to the earliest entry in
/// `entries` for the shortest and the latest for the longest.
pub fn duration_extremes(entries: &[StoredEntry]) -> Option<DurationExtremes<'_>> {
    let minutes = |stored: &&StoredEntry| stored.entry.metadata.duration_in_minutes;
    let shortest = entries.iter().min_by_key(minutes)?;
    let longest = entries.iter().max_by_key(minutes)?;
    Some(DurationExtremes { shortest, longest })
}

/// One month, Sunday-first, with the days a mood was recorded marked.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodCalendar {
    pub mood: String,
    pub first_day: NaiveDate,
    pub marked: BTreeSet<u32>,
}

/// The calendar for `mood` over the month containing `today`; `None` if the
/// mood was never recorded.
pub fn mood_calendar(stats: &StatsSnapshot, mood: &str, today: NaiveDate) -> Option<MoodCalendar> {
    let stat = stats
        .moods
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(mood))
        .map(|(label, stat)| (label.clone(), stat))?;

    let first_day = today.with_day(1).unwrap_or(today);
    let marked = stat
        .1
        .dates
        .iter()
        .filter(|d| d.year() == today.year() && d.month() == today.month())
        .map(|d| d.day())
        .collect();

    Some(MoodCalendar {
        mood: stat.0,
        first_day,
        marked,
    })
}

impl MoodCalendar {
    pub fn symbol(&self) -> &str {
        self.mood.split_whitespace().next().unwrap_or(&self.mood)
    }

    pub fn days_in_month(&self) -> u32 {
        let next_month = if self.first_day.month() == 12 {
            NaiveDate::from_ymd_opt(self.first_day.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(self.first_day.year(), self.first_day.month() + 1, 1)
        };
        next_month
            .map(|next| (next - Duration::days(1)).day())
            .unwrap_or(31)
    }

    /// Week rows; `None` pads days outside the month.
    pub fn weeks(&self) -> Vec<[Option<u32>; 7]> {
        let lead = self.first_day.weekday().num_days_from_sunday() as usize;
        let mut weeks = Vec::new();
        let mut week = [None; 7];
        let mut slot = lead;
        for day in 1..=self.days_in_month() {
            week[slot] = Some(day);
            slot += 1;
            if slot == 7 {
                weeks.push(week);
                week = [None; 7];
                slot = 0;
            }
        }
        if slot > 0 {
            weeks.push(week);
        }
        weeks
    }
}

impl fmt::Display for MoodCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Calendar: {}", self.mood, self.first_day.format("%B %Y"))?;
        writeln!(f, "Su  Mo  Tu  We  Th  Fr  Sa")?;
        for week in self.weeks() {
            let line: String = week
                .iter()
                .map(|slot| match slot {
                    None => "    ".to_string(),
                    Some(day) if self.marked.contains(day) => format!("{:<4}", self.symbol()),
                    Some(day) => format!("{:>2}  ", day),
                })
                .collect();
            writeln!(f, "{}", line.trim_end())?;
        }
        let days = self.marked.len();
        write!(
            f,
            "\nYou felt {} on {} {} this month.",
            self.mood,
            days,
            if days == 1 { "day" } else { "days" }
        )
    }
}
