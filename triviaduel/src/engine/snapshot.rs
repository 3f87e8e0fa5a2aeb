//! Read-only view of a match.

use serde::Serialize;
use triviaduel_core::model::{MatchResult, MatchState, Participant, QuestionItem, RoundOutcome};

use super::rewards::RewardStatus;

/// Everything an observer can see of the current match.
///
/// Published by the engine after every state change; observers never hold
/// a reference into engine state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchSnapshot {
    /// Lifecycle state
    pub state: MatchState,
    /// Match epoch; bumped by every reset
    pub epoch: u64,
    /// VS introduction is showing
    pub intro: bool,
    /// The human player, once initialised
    pub player: Option<Participant>,
    /// The simulated opponent, once matchmaking found one
    pub opponent: Option<Participant>,
    /// Zero-based index of the current round
    pub round_index: usize,
    /// Rounds in this match
    pub total_rounds: usize,
    /// Question of the current round while playing
    pub question: Option<QuestionItem>,
    /// Running player score
    pub player_score: u32,
    /// Running opponent score
    pub opponent_score: u32,
    /// Countdown ticks left in the current round
    pub remaining_ticks: u32,
    /// Answer submitted in the current round; empty on timeout
    pub last_answer: Option<String>,
    /// Correctness of [`last_answer`](Self::last_answer)
    pub last_answer_correct: Option<bool>,
    /// Settled rounds in order
    pub rounds: Vec<RoundOutcome>,
    /// Frozen outcome once finished
    pub result: Option<MatchResult>,
    /// Matchmaking failed and the match was aborted
    pub error: bool,
    /// Reward dispatch progress
    pub rewards: RewardStatus,
}

impl MatchSnapshot {
    /// Whether the match reached [`MatchState::Finished`].
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == MatchState::Finished
    }

    /// Outcome of the current round, if it has been settled.
    #[must_use]
    pub fn current_outcome(&self) -> Option<&RoundOutcome> {
        self.rounds.get(self.round_index)
    }

    /// Whether the current round still accepts an answer.
    #[must_use]
    pub fn awaiting_answer(&self) -> bool {
        self.state == MatchState::Playing && self.current_outcome().is_none()
    }

    /// Whether reward dispatch has settled (granted or failed).
    #[must_use]
    pub const fn rewards_settled(&self) -> bool {
        matches!(self.rewards, RewardStatus::Granted(_) | RewardStatus::Failed(_))
    }
}
