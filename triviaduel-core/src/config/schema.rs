//! Configuration schema types
//!
//! These types are deserialized from YAML configuration files. Every field
//! has a default, so an empty document is a valid configuration describing
//! the standard five-round duel.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{QuestionItem, StatsDelta};

// ============================================================================
// Top-Level Configuration
// ============================================================================

/// Root configuration for a duel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct DuelConfig {
    /// Round count and timing
    #[serde(default, rename = "match")]
    pub timing: MatchTiming,

    /// Simulated opponent behavior
    #[serde(default)]
    pub opponent: OpponentConfig,

    /// Rewards granted at the end of a match
    #[serde(default)]
    pub rewards: RewardConfig,

    /// Optional question bank file; the built-in catalog is used otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<PathBuf>,
}

impl DuelConfig {
    /// Returns a copy with every delay multiplied by `factor`.
    ///
    /// Used by headless simulation to compress wall-clock time. Scores and
    /// round counts are unaffected. Results saturate at [`Duration::MAX`];
    /// negative or NaN factors yield zero delays.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        let scale = |d: Duration| {
            Duration::try_from_secs_f64(d.as_secs_f64() * factor).unwrap_or(Duration::MAX)
        };
        let mut out = self.clone();
        out.timing.tick = scale(self.timing.tick);
        out.timing.matchmaking_delay = scale(self.timing.matchmaking_delay);
        out.timing.intro_delay = scale(self.timing.intro_delay);
        out.timing.reveal_delay = scale(self.timing.reveal_delay);
        out.opponent.min_think = scale(self.opponent.min_think);
        out.opponent.max_think = scale(self.opponent.max_think);
        out
    }
}

// ============================================================================
// Match Timing
// ============================================================================

/// Round count and the delays between lifecycle steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct MatchTiming {
    /// Questions per match (length of the round slate)
    #[serde(default = "default_rounds")]
    pub rounds: usize,

    /// Countdown ticks per round
    #[serde(default = "default_round_ticks")]
    pub round_ticks: u32,

    /// Interval between countdown ticks
    #[serde(default = "default_tick", with = "duration_str")]
    pub tick: Duration,

    /// Simulated time to find an opponent
    #[serde(default = "default_matchmaking_delay", with = "duration_str")]
    pub matchmaking_delay: Duration,

    /// Length of the VS introduction before round 0
    #[serde(default = "default_intro_delay", with = "duration_str")]
    pub intro_delay: Duration,

    /// Pause after a round settles before the next round starts
    #[serde(default = "default_reveal_delay", with = "duration_str")]
    pub reveal_delay: Duration,
}

const fn default_rounds() -> usize {
    5
}

const fn default_round_ticks() -> u32 {
    15
}

const fn default_tick() -> Duration {
    Duration::from_secs(1)
}

const fn default_matchmaking_delay() -> Duration {
    Duration::from_secs(2)
}

const fn default_intro_delay() -> Duration {
    Duration::from_millis(2500)
}

const fn default_reveal_delay() -> Duration {
    Duration::from_millis(1500)
}

impl Default for MatchTiming {
    fn default() -> Self {
        Self {
            rounds: default_rounds(),
            round_ticks: default_round_ticks(),
            tick: default_tick(),
            matchmaking_delay: default_matchmaking_delay(),
            intro_delay: default_intro_delay(),
            reveal_delay: default_reveal_delay(),
        }
    }
}

impl MatchTiming {
    /// Wall-clock length of a full round countdown.
    #[must_use]
    pub fn round_duration(&self) -> Duration {
        self.tick.saturating_mul(self.round_ticks)
    }
}

// ============================================================================
// Opponent
// ============================================================================

/// What happens to opponent answers that resolve after the match finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum LateAnswerPolicy {
    /// Cancel pending opponent answers when the match finishes (default)
    #[default]
    Discard,
    /// Let pending opponent answers keep incrementing the live score
    Apply,
}

/// Simulated opponent parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct OpponentConfig {
    /// Shortest simulated thinking time
    #[serde(default = "default_min_think", with = "duration_str")]
    pub min_think: Duration,

    /// Longest simulated thinking time
    #[serde(default = "default_max_think", with = "duration_str")]
    pub max_think: Duration,

    /// Probability that a simulated answer is correct
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,

    /// Handling of answers that resolve after the match finished
    #[serde(default)]
    pub late_answers: LateAnswerPolicy,

    /// Seed for opponent synthesis and answers; random when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

const fn default_min_think() -> Duration {
    Duration::from_millis(500)
}

const fn default_max_think() -> Duration {
    Duration::from_millis(2500)
}

const fn default_accuracy() -> f64 {
    0.75
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self {
            min_think: default_min_think(),
            max_think: default_max_think(),
            accuracy: default_accuracy(),
            late_answers: LateAnswerPolicy::default(),
            seed: None,
        }
    }
}

// ============================================================================
// Rewards
// ============================================================================

/// Stat increments for one outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RewardTier {
    /// Experience points
    #[serde(default)]
    pub xp: u64,
    /// In-game currency
    #[serde(default)]
    pub currency: u64,
    /// Duel-won counter increment
    #[serde(default)]
    pub duels_won: u64,
}

impl RewardTier {
    /// Converts the tier into a stats delta carrying `correct_answers`.
    #[must_use]
    pub const fn to_delta(self, correct_answers: u64) -> StatsDelta {
        StatsDelta {
            xp: self.xp,
            currency: self.currency,
            duels_won: self.duels_won,
            correct_answers,
        }
    }
}

/// End-of-match rewards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RewardConfig {
    /// Granted when the player wins
    #[serde(default = "default_win_tier")]
    pub win: RewardTier,

    /// Granted on a loss or a tie
    #[serde(default = "default_consolation_tier")]
    pub consolation: RewardTier,
}

const fn default_win_tier() -> RewardTier {
    RewardTier {
        xp: 75,
        currency: 30,
        duels_won: 1,
    }
}

const fn default_consolation_tier() -> RewardTier {
    RewardTier {
        xp: 25,
        currency: 10,
        duels_won: 0,
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            win: default_win_tier(),
            consolation: default_consolation_tier(),
        }
    }
}

// ============================================================================
// Question Bank
// ============================================================================

/// On-disk question bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct QuestionBankFile {
    /// Questions available for slates
    pub questions: Vec<QuestionItem>,
}

// ============================================================================
// Duration strings
// ============================================================================

/// Serde adapter for human-readable durations (`"1500ms"`, `"2s"`).
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_saturates_huge_factors() {
        let config = DuelConfig::default();
        let huge = config.scaled(1e300);
        assert_eq!(huge.timing.tick, Duration::MAX);
        assert_eq!(huge.opponent.max_think, Duration::MAX);

        assert_eq!(config.scaled(f64::NAN).timing.tick, Duration::ZERO);
        assert_eq!(config.scaled(-2.0).timing.reveal_delay, Duration::ZERO);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: DuelConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, DuelConfig::default());
        assert_eq!(config.timing.rounds, 5);
        assert_eq!(config.timing.round_ticks, 15);
        assert_eq!(config.timing.round_duration(), Duration::from_secs(15));
        assert_eq!(config.opponent.late_answers, LateAnswerPolicy::Discard);
        assert!((config.opponent.accuracy - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.rewards.win.duels_won, 1);
        assert_eq!(config.rewards.consolation.duels_won, 0);
    }

    #[test]
    fn parses_duration_strings() {
        let yaml = r"
match:
  tick: 250ms
  reveal_delay: 0s
opponent:
  min_think: 100ms
  max_think: 1s
  late_answers: apply
";
        let config: DuelConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.timing.tick, Duration::from_millis(250));
        assert_eq!(config.timing.reveal_delay, Duration::ZERO);
        assert_eq!(config.opponent.max_think, Duration::from_secs(1));
        assert_eq!(config.opponent.late_answers, LateAnswerPolicy::Apply);
    }

    #[test]
    fn rejects_bad_duration() {
        let yaml = "match:\n  tick: soon\n";
        assert!(serde_yaml::from_str::<DuelConfig>(yaml).is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        let yaml = "match:\n  roundz: 3\n";
        assert!(serde_yaml::from_str::<DuelConfig>(yaml).is_err());
    }

    #[test]
    fn scaled_compresses_delays_only() {
        let config = DuelConfig::default().scaled(0.01);
        assert_eq!(config.timing.tick, Duration::from_millis(10));
        assert_eq!(config.timing.intro_delay, Duration::from_millis(25));
        assert_eq!(config.opponent.max_think, Duration::from_millis(25));
        assert_eq!(config.timing.rounds, 5);
        assert_eq!(config.timing.round_ticks, 15);
    }

    #[test]
    fn reward_tier_to_delta() {
        let delta = RewardConfig::default().win.to_delta(4);
        assert_eq!(
            delta,
            StatsDelta {
                xp: 75,
                currency: 30,
                duels_won: 1,
                correct_answers: 4,
            }
        );
    }

    #[test]
    fn duration_round_trips_through_yaml() {
        let yaml = serde_yaml::to_string(&DuelConfig::default()).unwrap();
        let back: DuelConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, DuelConfig::default());
    }
}
