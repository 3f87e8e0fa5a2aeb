//! End-of-match reward dispatch.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use triviaduel_core::config::RewardConfig;
use triviaduel_core::model::{MatchResult, PlayerProfile, StatsDelta, Winner};

use crate::collaborators::{AchievementCollaborator, Collaborators, StatsCollaborator};
use crate::error::CollaboratorError;

/// Reward state as shown on the match snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum RewardStatus {
    /// The match has not finished
    #[default]
    NotDue,
    /// Dispatch is in flight
    Pending,
    /// The stats collaborator accepted the increment
    Granted(StatsDelta),
    /// The stats collaborator failed; the match result stands
    Failed(String),
}

/// What a successful dispatch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewardReceipt {
    /// Increment sent to the stats collaborator
    pub delta: StatsDelta,
    /// Profile returned by the stats collaborator
    pub profile: PlayerProfile,
}

/// Turns a [`MatchResult`] into one stats increment followed by one
/// achievement evaluation.
#[derive(Clone)]
pub struct RewardDispatcher {
    stats: Arc<dyn StatsCollaborator>,
    achievements: Arc<dyn AchievementCollaborator>,
    config: RewardConfig,
}

impl RewardDispatcher {
    /// Uses the stats and achievement collaborators of `collaborators`.
    #[must_use]
    pub fn new(collaborators: &Collaborators, config: RewardConfig) -> Self {
        Self {
            stats: Arc::clone(&collaborators.stats),
            achievements: Arc::clone(&collaborators.achievements),
            config,
        }
    }

    /// Increment owed for `result`: the win tier for a player win, the
    /// consolation tier otherwise, plus the player's correct answers.
    #[must_use]
    pub fn delta_for(&self, result: &MatchResult) -> StatsDelta {
        let tier = match result.winner {
            Winner::Player => self.config.win,
            Winner::Opponent | Winner::Tie => self.config.consolation,
        };
        tier.to_delta(u64::from(result.player_score))
    }

    /// Sends the increment, then asks for achievement re-evaluation.
    ///
    /// Achievements are not evaluated when the increment fails.
    ///
    /// # Errors
    ///
    /// Returns the stats collaborator's error unchanged.
    pub async fn dispatch(&self, result: &MatchResult) -> Result<RewardReceipt, CollaboratorError> {
        let delta = self.delta_for(result);
        let profile = match self.stats.increment_stats(&delta).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, winner = %result.winner, "reward dispatch failed");
                return Err(e);
            }
        };
        info!(
            winner = %result.winner,
            xp = delta.xp,
            currency = delta.currency,
            "rewards granted"
        );

        self.achievements.evaluate(&profile).await;
        Ok(RewardReceipt { delta, profile })
    }
}

impl std::fmt::Debug for RewardDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
