//! The journal entry record and the filters used to look entries up.

use crate::constants::{ENTRY_DATE_STRING_FORMAT, ENTRY_KEY_FORMAT};
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, FixedOffset, NaiveDate, SubsecRound};
use serde::{Deserialize, Serialize};

/// The cue the user answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Catalog id, when the prompt came from a catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub question: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryContent {
    pub body: String,
    pub word_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mood: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    /// Record key; also the local file stem.
    pub timestamp: String,
    pub duration_in_minutes: u64,
    pub duration_string: String,
    pub created: DateTime<FixedOffset>,
    pub date_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A recorded journal entry. Never mutated once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub prompt: Prompt,
    pub content: EntryContent,
    pub metadata: EntryMetadata,
}

/// Everything the write pipeline collects before an [`Entry`] exists.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    pub prompt: Prompt,
    pub body: String,
    pub tags: Vec<String>,
    pub mood: Option<String>,
    /// When the prompt was displayed.
    pub started_at: DateTime<FixedOffset>,
    /// When the response was submitted.
    pub finished_at: DateTime<FixedOffset>,
    pub user_id: Option<String>,
}

/// Counts whitespace-delimited, non-empty tokens.
///
/// ```
/// use rflect::journal_core::count_words;
///
/// assert_eq!(count_words("  one two\tthree\n"), 3);
/// assert_eq!(count_words("   "), 0);
/// ```
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().filter(|w| !w.is_empty()).count() as u64
}

/// Formats the minute-resolution key for an instant.
pub fn entry_key_for(created: &DateTime<FixedOffset>) -> String {
    created.format(ENTRY_KEY_FORMAT).to_string()
}

fn describe_duration(minutes: u64) -> String {
    match minutes {
        0 => "less than a minute".to_string(),
        1 => "1 minute".to_string(),
        n if n < 60 => format!("{} minutes", n),
        n => {
            let hours = n / 60;
            let rest = n % 60;
            let hours_part = if hours == 1 {
                "1 hour".to_string()
            } else {
                format!("{} hours", hours)
            };
            match rest {
                0 => hours_part,
                1 => format!("{} 1 minute", hours_part),
                r => format!("{} {} minutes", hours_part, r),
            }
        }
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().trim_start_matches('#').trim().to_string();
        if !tag.is_empty() && !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}

impl Entry {
    /// Builds an entry from a draft.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` if the response body is blank or the
    /// prompt has no question.
    pub fn from_draft(draft: EntryDraft) -> AppResult<Self> {
        if draft.body.trim().is_empty() {
            return Err(AppError::Validation("Provide a response.".to_string()));
        }
        if draft.prompt.question.trim().is_empty() {
            return Err(AppError::Validation(
                "An entry needs a prompt question".to_string(),
            ));
        }

        let elapsed = draft.finished_at.signed_duration_since(draft.started_at);
        let duration_in_minutes = elapsed.num_minutes().max(0) as u64;

        Ok(Entry::assemble(
            draft.prompt,
            draft.body,
            draft.tags,
            draft.mood,
            draft.started_at,
            duration_in_minutes,
            draft.user_id,
        ))
    }

    /// Builds an entry from already-known parts, deriving the word count,
    /// key and display strings. Used for drafts and for records read back
    /// from the remote store.
    pub fn assemble(
        prompt: Prompt,
        body: String,
        tags: Vec<String>,
        mood: Option<String>,
        created: DateTime<FixedOffset>,
        duration_in_minutes: u64,
        user_id: Option<String>,
    ) -> Entry {
        let created = created.trunc_subsecs(3);
        let mood = mood.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());

        Entry {
            prompt,
            content: EntryContent {
                word_count: count_words(&body),
                body,
                tags: normalize_tags(tags),
                mood,
            },
            metadata: EntryMetadata {
                timestamp: entry_key_for(&created),
                duration_in_minutes,
                duration_string: describe_duration(duration_in_minutes),
                date_string: created.format(ENTRY_DATE_STRING_FORMAT).to_string(),
                created,
                user_id,
            },
        }
    }

    /// The record key.
    pub fn key(&self) -> &str {
        &self.metadata.timestamp
    }

    /// Calendar day of the entry in the writer's offset.
    pub fn day(&self) -> NaiveDate {
        self.metadata.created.date_naive()
    }

    /// Returns a copy keyed with a sequence suffix (`-2`, `-3`, ...), used
    /// when the minute key is already taken.
    pub fn with_sequence(&self, sequence: u32) -> Entry {
        let mut entry = self.clone();
        entry.metadata.timestamp = format!("{}-{}", entry_key_for(&self.metadata.created), sequence);
        entry
    }

    /// Symbol used for calendar display: the first token of the mood.
    pub fn mood_symbol(&self) -> Option<&str> {
        self.content
            .mood
            .as_deref()
            .and_then(|m| m.split_whitespace().next())
    }
}

/// Ways of selecting entries.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryFilter {
    All,
    Tag(String),
    Mood(String),
    Category(String),
    Key(String),
    Date(NaiveDate),
}

impl EntryFilter {
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Tag(tag) => {
                let tag = tag.trim_start_matches('#');
                entry.content.tags.iter().any(|t| t == tag)
            }
            EntryFilter::Mood(mood) => entry.content.mood.as_deref().is_some_and(|m| {
                m.eq_ignore_ascii_case(mood)
                    || m.split_whitespace().any(|token| token.eq_ignore_ascii_case(mood))
            }),
            EntryFilter::Category(category) => {
                entry.prompt.category.eq_ignore_ascii_case(category)
            }
            EntryFilter::Key(key) => {
                let key = key.strip_suffix(".json").unwrap_or(key);
                entry.key() == key
            }
            EntryFilter::Date(date) => entry.day() == *date,
        }
    }
}
