//! Achievement catalog and unlock evaluation.

use std::sync::Arc;

use tracing::info;
use triviaduel_core::model::PlayerProfile;

use super::{AchievementCollaborator, ProfileStore};

/// One unlockable achievement.
#[derive(Debug, Clone, Copy)]
pub struct Achievement {
    /// Stable identifier stored on the profile
    pub id: &'static str,
    /// Display title
    pub title: &'static str,
    /// What earns it
    pub description: &'static str,
    condition: fn(&PlayerProfile) -> bool,
}

impl Achievement {
    /// Whether `profile` meets the unlock condition.
    #[must_use]
    pub fn is_met(&self, profile: &PlayerProfile) -> bool {
        (self.condition)(profile)
    }
}

/// Built-in catalog, evaluated in this order.
pub static CATALOG: [Achievement; 5] = [
    Achievement {
        id: "first_win",
        title: "First Duel Won",
        description: "Win your first duel.",
        condition: |p| p.duels_won >= 1,
    },
    Achievement {
        id: "ten_correct_answers",
        title: "Growing Wisdom",
        description: "Answer 10 questions correctly.",
        condition: |p| p.correct_answers >= 10,
    },
    Achievement {
        id: "level_5",
        title: "Student of the Word",
        description: "Reach level 5.",
        condition: |p| p.level() >= 5,
    },
    Achievement {
        id: "ten_duels_won",
        title: "Celestial Champion",
        description: "Win 10 duels.",
        condition: |p| p.duels_won >= 10,
    },
    Achievement {
        id: "master_scholar",
        title: "Master Scholar",
        description: "Reach level 20.",
        condition: |p| p.level() >= 20,
    },
];

/// Unlocks achievements on a [`ProfileStore`].
///
/// At most one achievement is unlocked per evaluation so unlock
/// notifications arrive one at a time; the next evaluation picks up the
/// rest.
#[derive(Debug)]
pub struct AchievementBook {
    store: Arc<ProfileStore>,
}

impl AchievementBook {
    /// Evaluates against and records unlocks on `store`.
    #[must_use]
    pub const fn new(store: Arc<ProfileStore>) -> Self {
        Self { store }
    }

    /// First catalog entry that `profile` qualifies for and has not unlocked.
    #[must_use]
    pub fn next_unlock(profile: &PlayerProfile) -> Option<&'static Achievement> {
        CATALOG
            .iter()
            .find(|a| !profile.has_achievement(a.id) && a.is_met(profile))
    }

    /// Looks up a catalog entry by id.
    #[must_use]
    pub fn find(id: &str) -> Option<&'static Achievement> {
        CATALOG.iter().find(|a| a.id == id)
    }
}

#[async_trait::async_trait]
impl AchievementCollaborator for AchievementBook {
    async fn evaluate(&self, profile: &PlayerProfile) {
        let Some(achievement) = Self::next_unlock(profile) else {
            return;
        };
        if self.store.unlock_achievement(achievement.id) {
            info!(
                achievement = achievement.id,
                title = achievement.title,
                "achievement unlocked"
            );
        }
    }
}
