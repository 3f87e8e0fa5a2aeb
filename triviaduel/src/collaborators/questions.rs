//! In-memory question catalog
//!
//! Serves round slates from either the built-in catalog (embedded at compile
//! time) or a question bank file loaded by the config layer. Slates are drawn
//! at random without replacement.

use std::collections::BTreeSet;
use std::sync::{LazyLock, Mutex, PoisonError};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};
use triviaduel_core::config::QuestionBankFile;
use triviaduel_core::model::QuestionItem;

use super::QuestionProvider;
use crate::error::CollaboratorError;

const BUILTIN_YAML: &str = include_str!("../../questions/builtin.yaml");

static BUILTIN_QUESTIONS: LazyLock<Vec<QuestionItem>> = LazyLock::new(|| {
    serde_yaml::from_str::<QuestionBankFile>(BUILTIN_YAML).map_or_else(
        |e| {
            warn!(error = %e, "built-in question catalog failed to parse");
            Vec::new()
        },
        |file| file.questions,
    )
});

/// A fixed pool of questions.
#[derive(Debug)]
pub struct QuestionBank {
    questions: Vec<QuestionItem>,
    rng: Mutex<StdRng>,
}

impl QuestionBank {
    /// Wraps an explicit question list.
    #[must_use]
    pub fn new(questions: Vec<QuestionItem>) -> Self {
        Self {
            questions,
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// The catalog shipped with the binary.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_QUESTIONS.clone())
    }

    /// Makes slate selection reproducible.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Restricts the bank to one category.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::UnknownCategory`] when no question carries
    /// `category`, suggesting the closest known category name.
    pub fn with_category(mut self, category: &str) -> Result<Self, CollaboratorError> {
        if !self.questions.iter().any(|q| q.category == category) {
            return Err(CollaboratorError::UnknownCategory {
                category: category.to_owned(),
                suggestion: self.suggest_category(category),
            });
        }
        self.questions.retain(|q| q.category == category);
        Ok(self)
    }

    /// Distinct categories, sorted.
    #[must_use]
    pub fn categories(&self) -> Vec<&str> {
        self.questions
            .iter()
            .map(|q| q.category.as_str())
            .filter(|c| !c.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of questions in the bank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the bank has no questions at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Closest category by Damerau-Levenshtein distance, if within 3 edits.
    fn suggest_category(&self, input: &str) -> Option<String> {
        self.categories()
            .into_iter()
            .map(|c| (c, strsim::damerau_levenshtein(input, c)))
            .filter(|(_, dist)| *dist <= 3)
            .min_by_key(|(_, dist)| *dist)
            .map(|(c, _)| c.to_owned())
    }
}

#[async_trait::async_trait]
impl QuestionProvider for QuestionBank {
    async fn fetch_round_slate(&self, count: usize) -> Result<Vec<QuestionItem>, CollaboratorError> {
        if self.questions.len() < count {
            return Err(CollaboratorError::NotEnoughQuestions {
                requested: count,
                available: self.questions.len(),
            });
        }

        let mut slate = self.questions.clone();
        slate.shuffle(&mut *self.rng.lock().unwrap_or_else(PoisonError::into_inner));
        slate.truncate(count);

        debug!(
            ids = ?slate.iter().map(|q| q.id).collect::<Vec<_>>(),
            "round slate drawn"
        );
        Ok(slate)
    }
}
