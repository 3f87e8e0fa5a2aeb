//! Interactive duel in the terminal.
//!
//! Snapshots from the engine are rendered as plain text lines on stdout;
//! answers are read from stdin, either as an option number or as the
//! option text.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use triviaduel_core::model::{MatchState, PlayerProfile, Settlement, Winner};

use super::setup::MatchSetup;
use crate::cli::args::PlayArgs;
use crate::engine::{MatchSnapshot, RewardStatus};
use crate::error::{DuelError, EngineError};

/// Runs an interactive duel until the player quits, stdin closes or a
/// shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if setup fails, stdin cannot be read or the engine
/// stops unexpectedly.
pub async fn run(args: &PlayArgs, shutdown: CancellationToken) -> Result<(), DuelError> {
    let setup = MatchSetup::prepare(&args.options)?;
    let (handle, profile, player) = setup.spawn(&args.name, args.level);
    handle.init_player(player)?;
    handle.find_match()?;

    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut transcript = Transcript::default();

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        for line in transcript.render(&snapshot) {
            println!("{line}");
        }

        tokio::select! {
            () = shutdown.cancelled() => {
                handle.reset()?;
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return Err(EngineError::Stopped.into());
                }
            }
            line = lines.next_line() => {
                let Some(input) = line? else {
                    tracing::debug!("stdin closed");
                    handle.reset()?;
                    break;
                };
                match interpret(&snapshot, &input) {
                    Input::Answer(answer) => handle.submit_answer(answer)?,
                    Input::Again => {
                        handle.reset()?;
                        handle.find_match()?;
                    }
                    Input::Quit => {
                        handle.reset()?;
                        break;
                    }
                    Input::Nothing => {}
                }
            }
        }
    }

    println!("{}", describe_profile(&profile.profile()));
    Ok(())
}

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Answer(String),
    Again,
    Quit,
    Nothing,
}

fn interpret(snapshot: &MatchSnapshot, raw: &str) -> Input {
    let input = raw.trim();
    if matches!(input, "q" | "quit" | "exit") {
        return Input::Quit;
    }

    if snapshot.awaiting_answer() {
        let Some(question) = snapshot.question.as_ref() else {
            return Input::Nothing;
        };
        if input.is_empty() {
            return Input::Nothing;
        }
        if let Ok(n) = input.parse::<usize>()
            && let Some(option) = n.checked_sub(1).and_then(|i| question.options.get(i))
        {
            return Input::Answer(option.clone());
        }
        let chosen = question
            .options
            .iter()
            .find(|o| o.eq_ignore_ascii_case(input))
            .map_or_else(|| input.to_owned(), Clone::clone);
        return Input::Answer(chosen);
    }

    let can_restart = (snapshot.is_finished() && snapshot.rewards_settled())
        || (snapshot.state == MatchState::Lobby && snapshot.error);
    if can_restart {
        return match input.to_ascii_lowercase().as_str() {
            "y" | "yes" => Input::Again,
            "" | "n" | "no" => Input::Quit,
            _ => Input::Nothing,
        };
    }
    Input::Nothing
}

// ============================================================================
// Rendering
// ============================================================================

/// Tracks what has been printed for the current epoch so every snapshot
/// renders only what is new.
#[derive(Debug, Default)]
struct Transcript {
    epoch: u64,
    searching: bool,
    intro: bool,
    asked: Option<usize>,
    hurried: Option<usize>,
    revealed: Option<usize>,
    finished: bool,
    rewarded: bool,
    aborted: bool,
}

/// Ticks left when the player is told to hurry.
const HURRY_AT: u32 = 5;

impl Transcript {
    fn render(&mut self, s: &MatchSnapshot) -> Vec<String> {
        if s.epoch != self.epoch {
            *self = Self {
                epoch: s.epoch,
                ..Self::default()
            };
        }
        let mut out = Vec::new();

        match s.state {
            MatchState::Lobby => {
                if s.error && !self.aborted {
                    self.aborted = true;
                    out.push("Could not start a match. Try again? [y/N]".to_owned());
                }
            }
            MatchState::Searching => {
                if !self.searching {
                    self.searching = true;
                    out.push("Searching for an opponent...".to_owned());
                }
                if s.intro && !self.intro {
                    self.intro = true;
                    out.push(versus_line(s));
                }
            }
            MatchState::Playing => {
                if !self.intro {
                    self.intro = true;
                    out.push(versus_line(s));
                }
                self.render_round(s, &mut out);
            }
            MatchState::Finished => {
                if !self.finished {
                    self.finished = true;
                    if let Some(result) = s.result {
                        let verdict = match result.winner {
                            Winner::Player => "You win!",
                            Winner::Opponent => "You lose.",
                            Winner::Tie => "It's a tie.",
                        };
                        out.push(format!(
                            "Final score: {} - {}. {verdict}",
                            result.player_score, result.opponent_score
                        ));
                    }
                }
                if s.rewards_settled() && !self.rewarded {
                    self.rewarded = true;
                    match &s.rewards {
                        RewardStatus::Granted(delta) => out.push(format!(
                            "Rewards: +{} XP, +{} coins",
                            delta.xp, delta.currency
                        )),
                        RewardStatus::Failed(reason) => {
                            out.push(format!("Rewards could not be saved: {reason}"));
                        }
                        RewardStatus::NotDue | RewardStatus::Pending => {}
                    }
                    out.push("Play again? [y/N]".to_owned());
                }
            }
        }
        out
    }

    fn render_round(&mut self, s: &MatchSnapshot, out: &mut Vec<String>) {
        let round = s.round_index;
        let Some(question) = s.question.as_ref() else {
            return;
        };

        if self.asked != Some(round) {
            self.asked = Some(round);
            out.push(String::new());
            out.push(format!(
                "Round {}/{} [{}]: {}",
                round + 1,
                s.total_rounds,
                question.category,
                question.text
            ));
            for (i, option) in question.options.iter().enumerate() {
                out.push(format!("  {}) {option}", i + 1));
            }
        }

        match s.current_outcome() {
            None => {
                if s.remaining_ticks == HURRY_AT && self.hurried != Some(round) {
                    self.hurried = Some(round);
                    out.push(format!("{HURRY_AT} left!"));
                }
            }
            Some(outcome) if self.revealed != Some(round) => {
                self.revealed = Some(round);
                let line = match (outcome.settlement, outcome.player_correct) {
                    (Settlement::Answered, true) => "Correct!".to_owned(),
                    (Settlement::Answered, false) => format!(
                        "Wrong. The answer was {} ({}).",
                        question.correct_answer, question.reference
                    ),
                    (Settlement::TimedOut, _) => format!(
                        "Time's up! The answer was {} ({}).",
                        question.correct_answer, question.reference
                    ),
                };
                out.push(line);
                out.push(format!(
                    "Score: you {} - {} {}",
                    s.player_score,
                    s.opponent_score,
                    s.opponent.as_ref().map_or("opponent", |o| o.name.as_str())
                ));
            }
            Some(_) => {}
        }
    }
}

fn versus_line(s: &MatchSnapshot) -> String {
    let player = s.player.as_ref().map_or("You", |p| p.name.as_str());
    match s.opponent.as_ref() {
        Some(o) if o.title.is_empty() => format!("{player} vs {} (level {})", o.name, o.level),
        Some(o) => format!("{player} vs {}, {} (level {})", o.name, o.title, o.level),
        None => format!("{player} vs ?"),
    }
}

pub(super) fn describe_profile(profile: &PlayerProfile) -> String {
    let mut line = format!(
        "{}: level {}, {} XP, {} coins, {} duel(s) won, {} correct answer(s)",
        profile.participant.name,
        profile.level(),
        profile.xp,
        profile.currency,
        profile.duels_won,
        profile.correct_answers
    );
    if !profile.unlocked_achievements.is_empty() {
        line.push_str(&format!(
            "; achievements: {}",
            profile.unlocked_achievements.join(", ")
        ));
    }
    line
}

#[cfg(test)]
mod tests {
    use triviaduel_core::model::{
        MatchResult, Participant, QuestionItem, RoundOutcome, StatsDelta,
    };

    use super::*;

    fn question() -> QuestionItem {
        QuestionItem {
            id: 1,
            text: "Who built the ark?".into(),
            options: vec!["Moses".into(), "Noah".into(), "Abraham".into()],
            correct_answer: "Noah".into(),
            reference: "Genesis 6:14".into(),
            category: "General".into(),
        }
    }

    fn playing() -> MatchSnapshot {
        MatchSnapshot {
            state: MatchState::Playing,
            epoch: 1,
            player: Some(Participant::new("p1", "Ada", 3)),
            opponent: Some(Participant::new("bot_1", "Eli", 4)),
            total_rounds: 5,
            question: Some(question()),
            remaining_ticks: 15,
            ..MatchSnapshot::default()
        }
    }

    fn settled(correct: bool, settlement: Settlement) -> MatchSnapshot {
        MatchSnapshot {
            rounds: vec![RoundOutcome {
                round: 0,
                player_answer: String::new(),
                player_correct: correct,
                settlement,
                opponent_correct: None,
            }],
            player_score: u32::from(correct),
            ..playing()
        }
    }

    #[test]
    fn answer_by_number_or_text() {
        let s = playing();
        assert_eq!(interpret(&s, "2\n"), Input::Answer("Noah".into()));
        assert_eq!(interpret(&s, "  abraham "), Input::Answer("Abraham".into()));
        assert_eq!(interpret(&s, "Jonah"), Input::Answer("Jonah".into()));
        assert_eq!(interpret(&s, "9"), Input::Answer("9".into()));
        assert_eq!(interpret(&s, ""), Input::Nothing);
        assert_eq!(interpret(&s, "q"), Input::Quit);
    }

    #[test]
    fn answers_ignored_once_round_settled() {
        let s = settled(true, Settlement::Answered);
        assert_eq!(interpret(&s, "1"), Input::Nothing);
    }

    #[test]
    fn restart_prompt_after_rewards() {
        let mut s = MatchSnapshot {
            state: MatchState::Finished,
            result: Some(MatchResult::new(3, 1)),
            rewards: RewardStatus::Pending,
            ..MatchSnapshot::default()
        };
        assert_eq!(interpret(&s, "y"), Input::Nothing);

        s.rewards = RewardStatus::Granted(StatsDelta::default());
        assert_eq!(interpret(&s, "Y"), Input::Again);
        assert_eq!(interpret(&s, ""), Input::Quit);

        let aborted = MatchSnapshot {
            error: true,
            ..MatchSnapshot::default()
        };
        assert_eq!(interpret(&aborted, "yes"), Input::Again);
    }

    #[test]
    fn question_printed_once() {
        let mut t = Transcript::default();
        let first = t.render(&playing());
        assert_eq!(first[0], "Ada vs Eli (level 4)");
        assert!(first.iter().any(|l| l.starts_with("Round 1/5 [General]")));
        assert!(first.iter().any(|l| l == "  2) Noah"));

        let mut tick = playing();
        tick.remaining_ticks = 14;
        assert!(t.render(&tick).is_empty());
    }

    #[test]
    fn hurry_then_timeout() {
        let mut t = Transcript::default();
        t.render(&playing());

        let mut hurry = playing();
        hurry.remaining_ticks = HURRY_AT;
        assert_eq!(t.render(&hurry), vec!["5 left!"]);
        assert!(t.render(&hurry).is_empty());

        let out = t.render(&settled(false, Settlement::TimedOut));
        assert_eq!(out[0], "Time's up! The answer was Noah (Genesis 6:14).");
        assert_eq!(out[1], "Score: you 0 - 0 Eli");
    }

    #[test]
    fn finish_and_rewards() {
        let mut t = Transcript {
            epoch: 1,
            ..Transcript::default()
        };
        let mut s = MatchSnapshot {
            state: MatchState::Finished,
            epoch: 1,
            result: Some(MatchResult::new(2, 2)),
            rewards: RewardStatus::Pending,
            ..MatchSnapshot::default()
        };
        assert_eq!(t.render(&s), vec!["Final score: 2 - 2. It's a tie."]);

        s.rewards = RewardStatus::Failed("store offline".into());
        assert_eq!(
            t.render(&s),
            vec![
                "Rewards could not be saved: store offline",
                "Play again? [y/N]"
            ]
        );
    }

    #[test]
    fn new_epoch_starts_fresh() {
        let mut t = Transcript::default();
        t.render(&playing());
        let next = MatchSnapshot {
            epoch: 2,
            ..playing()
        };
        assert!(!t.render(&next).is_empty());
    }

    #[test]
    fn profile_line_lists_achievements() {
        let mut profile = PlayerProfile::new(Participant::new("p1", "Ada", 2));
        profile.duels_won = 1;
        profile.unlocked_achievements.push("first_win".into());
        let line = describe_profile(&profile);
        assert!(line.starts_with("Ada: level 2"));
        assert!(line.ends_with("; achievements: first_win"));
    }
}
