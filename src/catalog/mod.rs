//! The prompt catalog.
//!
//! Prompts are short questions grouped by category. The remote store keeps
//! the shared catalog; a JSON copy in the data directory serves local-only
//! setups. Both sit behind [`PromptCatalog`].
//!
//! Prompt ids are derived from the question text, so the same default
//! prompt has the same id in every catalog.

use crate::errors::{AppError, AppResult};
use crate::journal_core::Prompt;
use crate::journal_io::{read_json, write_json_atomic, WriteMode};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPrompt {
    pub id: String,
    pub question: String,
    pub category: String,
    #[serde(default)]
    pub usage_count: u64,
}

impl CatalogPrompt {
    pub fn new(question: &str, category: &str) -> Self {
        CatalogPrompt {
            id: prompt_id_for(question),
            question: question.to_string(),
            category: category.to_string(),
            usage_count: 0,
        }
    }

    /// The prompt as embedded in an entry.
    pub fn as_prompt(&self) -> Prompt {
        Prompt {
            id: Some(self.id.clone()),
            question: self.question.clone(),
            category: self.category.clone(),
        }
    }
}

/// Id for a prompt question: the first 16 hex digits of its blake3 hash.
pub fn prompt_id_for(question: &str) -> String {
    let hash = blake3::hash(question.trim().as_bytes()).to_hex();
    hash.as_str()[..16].to_string()
}

/// The catalog every new store starts with.
pub fn default_prompts() -> Vec<CatalogPrompt> {
    [
        ("What is one question you keep coming back to lately?", "question"),
        ("What would you do today if you knew you could not fail?", "question"),
        ("What did you change your mind about recently?", "question"),
        ("\"The unexamined life is not worth living.\" Where does your attention go when you stop to look?", "quote"),
        ("\"Well begun is half done.\" What would a good beginning look like tomorrow?", "quote"),
        ("\"We suffer more often in imagination than in reality.\" What are you worrying about that has not happened?", "quote"),
        ("What are you grateful for today?", "gratitude"),
        ("Who made your week better, and how?", "gratitude"),
        ("What small comfort did you enjoy today?", "gratitude"),
        ("What is something you learned this week?", "growth"),
        ("What habit would you like to build, and what is the first step?", "growth"),
        ("What mistake taught you something recently?", "growth"),
        ("What are you feeling right now, and where do you notice it?", "mindfulness"),
        ("Describe your surroundings using three of your senses.", "mindfulness"),
        ("What can you let go of today?", "mindfulness"),
    ]
    .into_iter()
    .map(|(question, category)| CatalogPrompt::new(question, category))
    .collect()
}

/// Read access to prompts plus usage bookkeeping.
pub trait PromptCatalog {
    /// A uniformly random prompt, optionally limited to one category.
    /// `None` if no prompt qualifies.
    fn random_prompt(&self, category: Option<&str>) -> AppResult<Option<CatalogPrompt>> {
        let prompts = self.list(category)?;
        Ok(prompts.choose(&mut rand::rng()).cloned())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<CatalogPrompt>>;

    fn find_by_question(&self, question: &str) -> AppResult<Option<CatalogPrompt>>;

    /// Bumps the usage counter of a prompt. Unknown ids are ignored.
    fn increment_usage(&self, id: &str) -> AppResult<()>;

    /// All prompts, or those of one category, ordered by category then question.
    fn list(&self, category: Option<&str>) -> AppResult<Vec<CatalogPrompt>>;
}

/// Catalog kept as `prompts.json` in the data directory.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    path: PathBuf,
}

impl LocalCatalog {
    pub fn new(path: PathBuf) -> Self {
        LocalCatalog { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the default catalog if none exists (or always, with `reset`).
    /// Returns whether a catalog was written.
    pub fn install(&self, reset: bool) -> AppResult<bool> {
        if !reset && self.path.is_file() {
            debug!("Prompt catalog already present at {:?}", self.path);
            return Ok(false);
        }
        self.save(&default_prompts())?;
        info!("Installed prompt catalog at {:?}", self.path);
        Ok(true)
    }

    fn load(&self) -> AppResult<Vec<CatalogPrompt>> {
        read_json(&self.path)?.ok_or_else(|| {
            AppError::Config(format!(
                "Prompt catalog {} is missing. Run `rflect init` first.",
                self.path.display()
            ))
        })
    }

    fn save(&self, prompts: &[CatalogPrompt]) -> AppResult<()> {
        write_json_atomic(&self.path, &prompts, WriteMode::Replace)
    }
}

impl PromptCatalog for LocalCatalog {
    fn find_by_id(&self, id: &str) -> AppResult<Option<CatalogPrompt>> {
        Ok(self.load()?.into_iter().find(|p| p.id == id))
    }

    fn find_by_question(&self, question: &str) -> AppResult<Option<CatalogPrompt>> {
        let question = question.trim();
        Ok(self.load()?.into_iter().find(|p| p.question == question))
    }

    fn increment_usage(&self, id: &str) -> AppResult<()> {
        let mut prompts = self.load()?;
        if let Some(prompt) = prompts.iter_mut().find(|p| p.id == id) {
            prompt.usage_count += 1;
            self.save(&prompts)?;
        }
        Ok(())
    }

    fn list(&self, category: Option<&str>) -> AppResult<Vec<CatalogPrompt>> {
        let mut prompts: Vec<CatalogPrompt> = self
            .load()?
            .into_iter()
            .filter(|p| category.map_or(true, |c| p.category.eq_ignore_ascii_case(c)))
            .collect();
        prompts.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.question.cmp(&b.question))
        });
        Ok(prompts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_PROMPT_CATEGORIES;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_cover_every_category_with_unique_ids() {
        let prompts = default_prompts();
        for category in DEFAULT_PROMPT_CATEGORIES {
            assert!(prompts.iter().any(|p| p.category == *category));
        }

        let mut ids: Vec<&str> = prompts.iter().map(|p| p.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), prompts.len());
    }

    #[test]
    fn test_prompt_id_is_stable() {
        assert_eq!(
            prompt_id_for("What are you grateful for today?"),
            prompt_id_for("  What are you grateful for today? ")
        );
        assert_eq!(prompt_id_for("x").len(), 16);
    }

    #[test]
    fn test_local_catalog_lookup_and_usage() {
        let dir = tempdir().unwrap();
        let catalog = LocalCatalog::new(dir.path().join("prompts.json"));
        assert!(catalog.install(false).unwrap());
        assert!(!catalog.install(false).unwrap());

        let prompt = catalog
            .find_by_question("What are you grateful for today?")
            .unwrap()
            .unwrap();
        assert_eq!(prompt.category, "gratitude");
        assert_eq!(catalog.find_by_id(&prompt.id).unwrap().unwrap(), prompt);

        catalog.increment_usage(&prompt.id).unwrap();
        catalog.increment_usage(&prompt.id).unwrap();
        catalog.increment_usage("unknown").unwrap();
        assert_eq!(catalog.find_by_id(&prompt.id).unwrap().unwrap().usage_count, 2);
    }

    #[test]
    fn test_random_prompt_respects_category() {
        let dir = tempdir().unwrap();
        let catalog = LocalCatalog::new(dir.path().join("prompts.json"));
        catalog.install(false).unwrap();

        for _ in 0..10 {
            let prompt = catalog.random_prompt(Some("growth")).unwrap().unwrap();
            assert_eq!(prompt.category, "growth");
        }
        assert!(catalog.random_prompt(Some("poetry")).unwrap().is_none());
    }

    #[test]
    fn test_missing_catalog_is_config_error() {
        let dir = tempdir().unwrap();
        let catalog = LocalCatalog::new(dir.path().join("prompts.json"));
        assert!(matches!(catalog.list(None), Err(AppError::Config(_))));
    }
}
