//! In-memory player profile store.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, info};
use triviaduel_core::model::{PlayerProfile, StatsDelta};

use super::StatsCollaborator;
use crate::error::CollaboratorError;

/// Experience required per level: reaching level `n + 1` from level `n`
/// costs `n * XP_PER_LEVEL`.
pub const XP_PER_LEVEL: u64 = 1000;

/// Holds one player's profile and applies stat increments to it.
#[derive(Debug)]
pub struct ProfileStore {
    profile: Mutex<PlayerProfile>,
}

impl ProfileStore {
    /// Wraps an existing profile.
    #[must_use]
    pub const fn new(profile: PlayerProfile) -> Self {
        Self {
            profile: Mutex::new(profile),
        }
    }

    /// Copy of the current profile.
    #[must_use]
    pub fn profile(&self) -> PlayerProfile {
        self.profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Applies `delta`, levelling up as experience allows.
    pub fn apply(&self, delta: &StatsDelta) -> PlayerProfile {
        let mut profile = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        let before = profile.participant.level;

        let (level, xp) = level_up(before, profile.xp.saturating_add(delta.xp));
        profile.participant.level = level;
        profile.xp = xp;
        profile.currency = profile.currency.saturating_add(delta.currency);
        profile.duels_won = profile.duels_won.saturating_add(delta.duels_won);
        profile.correct_answers = profile
            .correct_answers
            .saturating_add(delta.correct_answers);

        if level > before {
            info!(from = before, to = level, "player levelled up");
        }
        debug!(?delta, "stats applied");
        profile.clone()
    }

    /// Records an unlocked achievement. Returns `false` if it was already
    /// unlocked.
    pub fn unlock_achievement(&self, id: &str) -> bool {
        let mut profile = self.profile.lock().unwrap_or_else(PoisonError::into_inner);
        if profile.has_achievement(id) {
            return false;
        }
        profile.unlocked_achievements.push(id.to_owned());
        true
    }
}

#[async_trait::async_trait]
impl StatsCollaborator for ProfileStore {
    async fn increment_stats(&self, delta: &StatsDelta) -> Result<PlayerProfile, CollaboratorError> {
        Ok(self.apply(delta))
    }
}

/// Converts accumulated experience into levels.
///
/// Returns the new level and the experience left over towards the next one.
#[must_use]
pub fn level_up(mut level: u32, mut xp: u64) -> (u32, u64) {
    if level == 0 {
        level = 1;
    }
    loop {
        let required = u64::from(level).saturating_mul(XP_PER_LEVEL);
        if xp < required || level == u32::MAX {
            return (level, xp);
        }
        xp -= required;
        level += 1;
    }
}
