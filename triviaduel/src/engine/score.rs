//! Running duel score.

use triviaduel_core::model::{MatchResult, Winner};

/// Flat scoring: one point per correct outcome, no multipliers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreKeeper {
    player: u32,
    opponent: u32,
}

impl ScoreKeeper {
    /// Starts at 0–0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            player: 0,
            opponent: 0,
        }
    }

    /// Records a settled player round. Returns `correct` for chaining.
    pub const fn record_player(&mut self, correct: bool) -> bool {
        if correct {
            self.player = self.player.saturating_add(1);
        }
        correct
    }

    /// Records a resolved opponent answer.
    pub const fn record_opponent(&mut self, correct: bool) -> bool {
        if correct {
            self.opponent = self.opponent.saturating_add(1);
        }
        correct
    }

    /// Player points so far.
    #[must_use]
    pub const fn player(&self) -> u32 {
        self.player
    }

    /// Opponent points so far.
    #[must_use]
    pub const fn opponent(&self) -> u32 {
        self.opponent
    }

    /// Winner if the match ended now.
    #[must_use]
    pub const fn winner(&self) -> Winner {
        Winner::from_scores(self.player, self.opponent)
    }

    /// Freezes the current totals into a [`MatchResult`].
    #[must_use]
    pub const fn result(&self) -> MatchResult {
        MatchResult::new(self.player, self.opponent)
    }

    /// Back to 0–0.
    pub const fn reset(&mut self) {
        self.player = 0;
        self.opponent = 0;
    }
}
