//! Configuration validation
//!
//! Semantic checks on a deserialized [`DuelConfig`] and on question banks.
//! Validation collects every issue rather than stopping at the first one.

use std::collections::HashSet;
use std::time::Duration;

use triviaduel_core::config::DuelConfig;
use triviaduel_core::model::QuestionItem;

use crate::engine::timer::MAX_TICK;
use crate::error::ValidationIssue;

/// Longest accepted value for any configured delay.
const MAX_DELAY: Duration = MAX_TICK;

/// Result of a validation pass.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that prevent loading.
    pub errors: Vec<ValidationIssue>,

    /// Informational issues.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// All issues, errors first.
    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings)
    }
}

/// Collects validation issues.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates match timing, opponent parameters and rewards.
    pub fn validate(&mut self, config: &DuelConfig) -> ValidationResult {
        let timing = &config.timing;
        if timing.rounds == 0 {
            self.add_error("match.rounds", "a match needs at least one round");
        }
        if timing.round_ticks == 0 {
            self.add_error("match.round_ticks", "a round needs at least one tick");
        }
        if timing.tick.is_zero() {
            self.add_error("match.tick", "tick interval must be greater than zero");
        }

        let opponent = &config.opponent;
        for (path, delay) in [
            ("match.tick", timing.tick),
            ("match.matchmaking_delay", timing.matchmaking_delay),
            ("match.intro_delay", timing.intro_delay),
            ("match.reveal_delay", timing.reveal_delay),
            ("opponent.min_think", opponent.min_think),
            ("opponent.max_think", opponent.max_think),
        ] {
            if delay > MAX_DELAY {
                self.add_error(
                    path,
                    &format!(
                        "{} exceeds the {} limit",
                        humantime::format_duration(delay),
                        humantime::format_duration(MAX_DELAY)
                    ),
                );
            }
        }
        if opponent.min_think > opponent.max_think {
            self.add_error(
                "opponent.min_think",
                &format!(
                    "min_think ({}) exceeds max_think ({})",
                    humantime::format_duration(opponent.min_think),
                    humantime::format_duration(opponent.max_think)
                ),
            );
        }
        if !(0.0..=1.0).contains(&opponent.accuracy) {
            self.add_error(
                "opponent.accuracy",
                &format!("accuracy must be within [0, 1], got {}", opponent.accuracy),
            );
        }
        if timing.round_duration() < opponent.max_think {
            self.add_warning(
                "opponent.max_think",
                "opponent may still be thinking when the round timer expires",
            );
        }

        if config.rewards.consolation.duels_won > 0 {
            self.add_warning(
                "rewards.consolation.duels_won",
                "consolation reward counts a lost or tied duel as won",
            );
        }

        self.finish()
    }

    /// Validates a question bank that must cover `rounds` rounds.
    pub fn validate_bank(&mut self, questions: &[QuestionItem], rounds: usize) -> ValidationResult {
        if questions.len() < rounds {
            self.add_error(
                "questions",
                &format!(
                    "bank has {} question(s), a match needs {rounds}",
                    questions.len()
                ),
            );
        }

        let mut ids = HashSet::new();
        for (i, q) in questions.iter().enumerate() {
            let path = format!("questions[{i}]");
            if !ids.insert(q.id) {
                self.add_error(&format!("{path}.id"), &format!("duplicate question id {}", q.id));
            }
            if q.text.trim().is_empty() {
                self.add_error(&format!("{path}.text"), "question text is empty");
            }
            if q.options.len() < 2 {
                self.add_error(&format!("{path}.options"), "at least two options required");
            }
            let mut seen = HashSet::new();
            for option in &q.options {
                if !seen.insert(option.as_str()) {
                    self.add_error(
                        &format!("{path}.options"),
                        &format!("duplicate option '{option}'"),
                    );
                }
            }
            if !q.options.contains(&q.correct_answer) {
                self.add_error(
                    &format!("{path}.correct_answer"),
                    &format!("'{}' is not one of the options", q.correct_answer),
                );
            }
            if q.reference.is_empty() {
                self.add_warning(&format!("{path}.reference"), "no reference given");
            }
        }

        self.finish()
    }

    fn finish(&mut self) -> ValidationResult {
        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue::error(path, message));
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue::warning(path, message));
    }
}
