//! Match model types
//!
//! Plain data shared between the engine, its collaborators and the CLI.
//! Everything here is cheap to clone so it can travel inside snapshots.

use serde::{Deserialize, Serialize};

// ============================================================================
// Participants
// ============================================================================

/// Identity and display profile of one side of a duel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Participant {
    /// Stable identifier (`bot_<uuid>` for simulated opponents)
    pub id: String,
    /// Display name
    pub name: String,
    /// Honorific shown under the name
    #[serde(default)]
    pub title: String,
    /// Avatar image URL
    #[serde(default)]
    pub avatar_url: String,
    /// Player level (always at least 1)
    pub level: u32,
}

impl Participant {
    /// Creates a participant with an empty title and avatar.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, level: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            title: String::new(),
            avatar_url: String::new(),
            level: level.max(1),
        }
    }

    /// Returns `true` for opponents synthesized by the matchmaker.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.id.starts_with("bot_")
    }
}

/// Persistent player profile as seen by the stats and achievement
/// collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlayerProfile {
    /// Display identity
    pub participant: Participant,
    /// Experience accumulated towards the next level
    #[serde(default)]
    pub xp: u64,
    /// In-game currency
    #[serde(default)]
    pub currency: u64,
    /// Lifetime duel wins
    #[serde(default)]
    pub duels_won: u64,
    /// Lifetime correctly answered questions
    #[serde(default)]
    pub correct_answers: u64,
    /// Ids of unlocked achievements, in unlock order
    #[serde(default)]
    pub unlocked_achievements: Vec<String>,
}

impl PlayerProfile {
    /// Creates a fresh profile with zeroed stats.
    #[must_use]
    pub const fn new(participant: Participant) -> Self {
        Self {
            participant,
            xp: 0,
            currency: 0,
            duels_won: 0,
            correct_answers: 0,
            unlocked_achievements: Vec::new(),
        }
    }

    /// Current level (mirrors the participant's level).
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.participant.level
    }

    /// Whether the achievement with `id` is already unlocked.
    #[must_use]
    pub fn has_achievement(&self, id: &str) -> bool {
        self.unlocked_achievements.iter().any(|a| a == id)
    }
}

/// A stats increment request sent to the stats collaborator.
///
/// Every field is additive; zero means "leave unchanged".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatsDelta {
    /// Experience points
    #[serde(default)]
    pub xp: u64,
    /// In-game currency
    #[serde(default)]
    pub currency: u64,
    /// Duel wins
    #[serde(default)]
    pub duels_won: u64,
    /// Correctly answered questions
    #[serde(default)]
    pub correct_answers: u64,
}

impl StatsDelta {
    /// Returns `true` when the delta would not change anything.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.xp == 0 && self.currency == 0 && self.duels_won == 0 && self.correct_answers == 0
    }
}

// ============================================================================
// Questions
// ============================================================================

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QuestionItem {
    /// Catalog identifier
    pub id: u32,
    /// Question text
    pub text: String,
    /// Answer options in display order
    pub options: Vec<String>,
    /// The designated correct option (compared by exact string equality)
    pub correct_answer: String,
    /// Source reference shown after the round
    #[serde(default)]
    pub reference: String,
    /// Catalog category
    #[serde(default)]
    pub category: String,
}

impl QuestionItem {
    /// Exact, case-sensitive comparison against the correct option.
    #[must_use]
    pub fn is_correct(&self, answer: &str) -> bool {
        answer == self.correct_answer
    }
}

// ============================================================================
// Match state
// ============================================================================

/// Top-level duel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    /// Waiting for the player to look for a match
    #[default]
    Lobby,
    /// Matchmaking and introduction in progress
    Searching,
    /// Rounds are being played
    Playing,
    /// All rounds settled; a result exists
    Finished,
}

impl MatchState {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::Searching => "searching",
            Self::Playing => "playing",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Winner of a finished duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    /// The human player scored more
    Player,
    /// The simulated opponent scored more
    Opponent,
    /// Equal scores
    Tie,
}

impl Winner {
    /// Decides the winner from two final scores.
    #[must_use]
    pub const fn from_scores(player: u32, opponent: u32) -> Self {
        if player > opponent {
            Self::Player
        } else if opponent > player {
            Self::Opponent
        } else {
            Self::Tie
        }
    }

    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player => "player",
            Self::Opponent => "opponent",
            Self::Tie => "tie",
        }
    }
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a round's player outcome was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// The player submitted an answer
    Answered,
    /// The round timer ran out
    TimedOut,
}

impl Settlement {
    /// Lowercase label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoundOutcome {
    /// Zero-based round index
    pub round: usize,
    /// Submitted answer; empty on timeout
    pub player_answer: String,
    /// Whether the player's answer matched the correct option
    pub player_correct: bool,
    /// What settled the round
    pub settlement: Settlement,
    /// Opponent correctness; `None` until its simulated delay elapses
    pub opponent_correct: Option<bool>,
}

/// Terminal snapshot of a duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MatchResult {
    /// Final player score
    pub player_score: u32,
    /// Opponent score at the moment the match finished
    pub opponent_score: u32,
    /// Winner derived from the two scores
    pub winner: Winner,
}

impl MatchResult {
    /// Builds a result, deriving the winner from the scores.
    #[must_use]
    pub const fn new(player_score: u32, opponent_score: u32) -> Self {
        Self {
            player_score,
            opponent_score,
            winner: Winner::from_scores(player_score, opponent_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winner_from_scores() {
        assert_eq!(Winner::from_scores(3, 2), Winner::Player);
        assert_eq!(Winner::from_scores(2, 3), Winner::Opponent);
        assert_eq!(Winner::from_scores(4, 4), Winner::Tie);
        assert_eq!(Winner::from_scores(0, 0), Winner::Tie);
    }

    #[test]
    fn correctness_is_exact() {
        let q = QuestionItem {
            id: 1,
            text: "Who was the first king?".to_owned(),
            options: vec!["Saul".to_owned(), "David".to_owned()],
            correct_answer: "Saul".to_owned(),
            reference: "1 Samuel 10:24".to_owned(),
            category: "Kings".to_owned(),
        };
        assert!(q.is_correct("Saul"));
        assert!(!q.is_correct("saul"));
        assert!(!q.is_correct("Saul "));
        assert!(!q.is_correct(""));
    }

    #[test]
    fn participant_level_clamped() {
        assert_eq!(Participant::new("u1", "Ana", 0).level, 1);
        assert!(Participant::new("bot_1", "Noah", 3).is_bot());
        assert!(!Participant::new("u1", "Ana", 3).is_bot());
    }

    #[test]
    fn match_state_serializes_lowercase() {
        let json = serde_json::to_string(&MatchState::Finished).unwrap();
        assert_eq!(json, "\"finished\"");
        assert_eq!(MatchState::default(), MatchState::Lobby);
    }

    #[test]
    fn empty_delta() {
        assert!(StatsDelta::default().is_empty());
        let delta = StatsDelta {
            correct_answers: 1,
            ..StatsDelta::default()
        };
        assert!(!delta.is_empty());
    }
}
