//! High-level journaling operations.
//!
//! This module provides the user-facing operations that tie the pure core to
//! the stores: recording a new entry, deleting entries with stats
//! accounting, reconciling the two backends, and the read-only reports over
//! the stats snapshot.

pub mod delete;
pub mod insights;
pub mod reconcile;
pub mod write;

// Re-export commonly used functions
pub use delete::{delete_all_entries, delete_entries_on, delete_entry, DeleteReport};
pub use insights::{
    duration_extremes, mood_calendar, mood_frequencies, tag_usage, DurationExtremes, MoodCalendar,
    MoodFrequency,
};
pub use reconcile::{reconcile, Direction, ReconcileReport, ReconcileWarning};
pub use write::{record_entry, WriteOutcome};
