//! External collaborators of the match engine
//!
//! The engine reaches the question catalog, the stats store and the
//! achievement evaluator only through these traits. The submodules provide
//! in-memory implementations used by the CLI and the tests.

pub mod achievements;
pub mod profile;
pub mod questions;

use std::sync::Arc;

use triviaduel_core::model::{PlayerProfile, QuestionItem, StatsDelta};

use crate::error::CollaboratorError;

pub use achievements::{Achievement, AchievementBook};
pub use profile::ProfileStore;
pub use questions::QuestionBank;

/// Supplies the questions of a match.
#[async_trait::async_trait]
pub trait QuestionProvider: Send + Sync {
    /// Returns exactly `count` questions, or an error.
    async fn fetch_round_slate(&self, count: usize) -> Result<Vec<QuestionItem>, CollaboratorError>;
}

/// Applies stat increments to the player's persisted profile.
#[async_trait::async_trait]
pub trait StatsCollaborator: Send + Sync {
    /// Applies `delta` and returns the updated profile.
    async fn increment_stats(&self, delta: &StatsDelta) -> Result<PlayerProfile, CollaboratorError>;
}

/// Re-evaluates achievement unlocks for a profile.
#[async_trait::async_trait]
pub trait AchievementCollaborator: Send + Sync {
    /// Fire-and-forget evaluation; failures are the collaborator's concern.
    async fn evaluate(&self, profile: &PlayerProfile);
}

/// The three collaborators an engine needs.
#[derive(Clone)]
pub struct Collaborators {
    /// Question catalog
    pub questions: Arc<dyn QuestionProvider>,
    /// Stats store
    pub stats: Arc<dyn StatsCollaborator>,
    /// Achievement evaluator
    pub achievements: Arc<dyn AchievementCollaborator>,
}

impl Collaborators {
    /// Wires the in-memory implementations around a single profile store.
    #[must_use]
    pub fn in_memory(questions: QuestionBank, profile: Arc<ProfileStore>) -> Self {
        Self {
            questions: Arc::new(questions),
            stats: Arc::clone(&profile) as Arc<dyn StatsCollaborator>,
            achievements: Arc::new(AchievementBook::new(profile)),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
