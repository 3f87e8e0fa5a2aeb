//! Headless matches against an automated player.
//!
//! Every delay of the configuration is compressed by `--time-scale`, the
//! automated player answers after a random thinking time, and the summary
//! reports each match plus the final profile.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use triviaduel_core::config::OpponentConfig;
use triviaduel_core::model::{MatchResult, MatchState, PlayerProfile, QuestionItem, Winner};

use super::play::describe_profile;
use super::setup::MatchSetup;
use crate::cli::args::{OutputFormat, SimulateArgs};
use crate::collaborators::ProfileStore;
use crate::engine::{MatchHandle, MatchSnapshot, RewardStatus};
use crate::error::{DuelError, EngineError};

/// Largest accepted `--time-scale`.
const MAX_TIME_SCALE: f64 = 100.0;

/// Runs `--matches` headless matches and prints a summary.
///
/// # Errors
///
/// Returns a usage error for out-of-range arguments, or an error if setup
/// fails or the engine stops unexpectedly.
pub async fn run(args: &SimulateArgs, shutdown: CancellationToken) -> Result<(), DuelError> {
    if args.matches == 0 {
        return Err(DuelError::Usage("--matches must be at least 1".into()));
    }
    if !(0.0..=1.0).contains(&args.player_accuracy) {
        return Err(DuelError::Usage(format!(
            "--player-accuracy must be within [0, 1], got {}",
            args.player_accuracy
        )));
    }
    if !(args.time_scale > 0.0 && args.time_scale <= MAX_TIME_SCALE) {
        return Err(DuelError::Usage(format!(
            "--time-scale must be within (0, {MAX_TIME_SCALE}], got {}",
            args.time_scale
        )));
    }

    let mut setup = MatchSetup::prepare(&args.options)?;
    setup.config = Arc::new(setup.config.scaled(args.time_scale));
    let autopilot = Autopilot::new(args.player_accuracy, &setup.config.opponent);
    let (handle, profile, player) = setup.spawn("Autopilot", 1);
    handle.init_player(player)?;

    tracing::info!(matches = args.matches, time_scale = args.time_scale, "simulation started");
    let summary = simulate(&handle, &profile, args.matches, autopilot, &shutdown).await?;

    match args.format {
        OutputFormat::Human => print!("{}", summary.to_human()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

/// Plays `matches` matches back to back on one engine.
async fn simulate(
    handle: &MatchHandle,
    profile: &ProfileStore,
    matches: u32,
    mut autopilot: Autopilot,
    shutdown: &CancellationToken,
) -> Result<SimulationSummary, DuelError> {
    let mut played = Vec::new();
    let mut interrupted = false;

    for index in 1..=matches {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                interrupted = true;
            }
            outcome = play_one(handle, &mut autopilot) => {
                played.push(MatchSummary::from_snapshot(index, &outcome?));
            }
        }

        handle.reset()?;
        handle
            .wait_for(|s| s.state == MatchState::Lobby && !s.error)
            .await?;
        if interrupted {
            break;
        }
    }

    Ok(SimulationSummary::new(played, interrupted, profile.profile()))
}

/// Plays one match from the lobby until rewards settle or matchmaking
/// aborts.
async fn play_one(
    handle: &MatchHandle,
    autopilot: &mut Autopilot,
) -> Result<MatchSnapshot, EngineError> {
    let mut snapshots = handle.subscribe();
    handle.find_match()?;

    let mut answered = None;
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if snapshot.state == MatchState::Lobby && snapshot.error {
            return Ok(snapshot);
        }
        if snapshot.is_finished() && snapshot.rewards_settled() {
            return Ok(snapshot);
        }
        if snapshot.awaiting_answer()
            && answered != Some(snapshot.round_index)
            && let Some(question) = snapshot.question.as_ref()
        {
            answered = Some(snapshot.round_index);
            let (delay, answer) = autopilot.decide(question);
            tokio::time::sleep(delay).await;
            handle.submit_answer(answer)?;
            continue;
        }
        snapshots.changed().await.map_err(|_| EngineError::Stopped)?;
    }
}

// ============================================================================
// Automated player
// ============================================================================

/// Answers with a fixed accuracy after a thinking time drawn from the same
/// range as the simulated opponent.
#[derive(Debug)]
struct Autopilot {
    accuracy: f64,
    min_think: Duration,
    max_think: Duration,
    rng: StdRng,
}

impl Autopilot {
    fn new(accuracy: f64, opponent: &OpponentConfig) -> Self {
        let rng = opponent
            .seed
            .map_or_else(StdRng::from_os_rng, |seed| {
                StdRng::seed_from_u64(seed.wrapping_add(2))
            });
        Self {
            accuracy,
            min_think: opponent.min_think,
            max_think: opponent.max_think.max(opponent.min_think),
            rng,
        }
    }

    fn decide(&mut self, question: &QuestionItem) -> (Duration, String) {
        let span = self.max_think - self.min_think;
        let delay = self.min_think + span.mul_f64(self.rng.random::<f64>());

        let answer = if self.rng.random_bool(self.accuracy) {
            question.correct_answer.clone()
        } else {
            let wrong: Vec<&String> = question
                .options
                .iter()
                .filter(|o| **o != question.correct_answer)
                .collect();
            wrong
                .choose(&mut self.rng)
                .map_or_else(String::new, |o| (*o).clone())
        };
        (delay, answer)
    }
}

// ============================================================================
// Summary
// ============================================================================

#[derive(Debug, Clone, Serialize)]
struct MatchSummary {
    index: u32,
    aborted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<MatchResult>,
    correct_answers: usize,
    rewards: RewardStatus,
}

impl MatchSummary {
    fn from_snapshot(index: u32, snapshot: &MatchSnapshot) -> Self {
        Self {
            index,
            aborted: snapshot.error,
            result: snapshot.result,
            correct_answers: snapshot.rounds.iter().filter(|r| r.player_correct).count(),
            rewards: snapshot.rewards.clone(),
        }
    }

    fn to_human(&self) -> String {
        let Some(result) = self.result.filter(|_| !self.aborted) else {
            return format!("Match {}: aborted, no round slate", self.index);
        };
        let verdict = match result.winner {
            Winner::Player => "won",
            Winner::Opponent => "lost",
            Winner::Tie => "tied",
        };
        let rewards = match &self.rewards {
            RewardStatus::Granted(delta) => format!("+{} XP, +{} coins", delta.xp, delta.currency),
            RewardStatus::Failed(reason) => format!("rewards failed: {reason}"),
            RewardStatus::NotDue | RewardStatus::Pending => "no rewards".to_owned(),
        };
        format!(
            "Match {}: {verdict} {} - {} ({} correct, {rewards})",
            self.index, result.player_score, result.opponent_score, self.correct_answers
        )
    }
}

#[derive(Debug, Serialize)]
struct SimulationSummary {
    matches: Vec<MatchSummary>,
    wins: u32,
    losses: u32,
    ties: u32,
    aborted: u32,
    interrupted: bool,
    profile: PlayerProfile,
}

impl SimulationSummary {
    fn new(matches: Vec<MatchSummary>, interrupted: bool, profile: PlayerProfile) -> Self {
        let mut summary = Self {
            matches: Vec::new(),
            wins: 0,
            losses: 0,
            ties: 0,
            aborted: 0,
            interrupted,
            profile,
        };
        for m in &matches {
            match m.result.map(|r| r.winner) {
                _ if m.aborted => summary.aborted += 1,
                Some(Winner::Player) => summary.wins += 1,
                Some(Winner::Opponent) => summary.losses += 1,
                Some(Winner::Tie) => summary.ties += 1,
                None => summary.aborted += 1,
            }
        }
        summary.matches = matches;
        summary
    }

    fn to_human(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for m in &self.matches {
            let _ = writeln!(out, "{}", m.to_human());
        }
        let _ = writeln!(
            out,
            "{} match(es): {} won, {} lost, {} tied, {} aborted{}",
            self.matches.len(),
            self.wins,
            self.losses,
            self.ties,
            self.aborted,
            if self.interrupted { " (interrupted)" } else { "" }
        );
        let _ = writeln!(out, "{}", describe_profile(&self.profile));
        out
    }
}

#[cfg(test)]
mod tests {
    use triviaduel_core::model::{Participant, StatsDelta};

    use super::*;
    use crate::cli::args::MatchOptions;

    fn question() -> QuestionItem {
        QuestionItem {
            id: 7,
            text: "How many plagues struck Egypt?".into(),
            options: vec!["Seven".into(), "Ten".into(), "Twelve".into()],
            correct_answer: "Ten".into(),
            reference: "Exodus 7-12".into(),
            category: "Exodus - Plagues".into(),
        }
    }

    fn seeded(seed: u64) -> OpponentConfig {
        OpponentConfig {
            seed: Some(seed),
            ..OpponentConfig::default()
        }
    }

    #[test]
    fn perfect_autopilot_always_correct() {
        let mut pilot = Autopilot::new(1.0, &seeded(3));
        for _ in 0..20 {
            let (delay, answer) = pilot.decide(&question());
            assert_eq!(answer, "Ten");
            assert!(delay >= pilot.min_think && delay <= pilot.max_think);
        }
    }

    #[test]
    fn hopeless_autopilot_picks_a_wrong_option() {
        let mut pilot = Autopilot::new(0.0, &seeded(3));
        for _ in 0..20 {
            let (_, answer) = pilot.decide(&question());
            assert!(answer == "Seven" || answer == "Twelve");
        }
    }

    #[test]
    fn summary_counts_outcomes() {
        let granted = RewardStatus::Granted(StatsDelta {
            xp: 75,
            currency: 30,
            duels_won: 1,
            correct_answers: 4,
        });
        let matches = vec![
            MatchSummary {
                index: 1,
                aborted: false,
                result: Some(MatchResult::new(4, 2)),
                correct_answers: 4,
                rewards: granted,
            },
            MatchSummary {
                index: 2,
                aborted: false,
                result: Some(MatchResult::new(1, 1)),
                correct_answers: 1,
                rewards: RewardStatus::Failed("offline".into()),
            },
            MatchSummary {
                index: 3,
                aborted: true,
                result: None,
                correct_answers: 0,
                rewards: RewardStatus::NotDue,
            },
        ];
        let profile = PlayerProfile::new(Participant::new("p", "Autopilot", 1));
        let summary = SimulationSummary::new(matches, false, profile);
        assert_eq!((summary.wins, summary.losses, summary.ties, summary.aborted), (1, 0, 1, 1));

        let text = summary.to_human();
        assert!(text.contains("Match 1: won 4 - 2 (4 correct, +75 XP, +30 coins)"));
        assert!(text.contains("Match 2: tied 1 - 1 (1 correct, rewards failed: offline)"));
        assert!(text.contains("Match 3: aborted"));
        assert!(text.contains("3 match(es): 1 won, 0 lost, 1 tied, 1 aborted"));
    }

    #[tokio::test(start_paused = true)]
    async fn perfect_player_never_loses() {
        let options = MatchOptions {
            seed: Some(11),
            ..MatchOptions::default()
        };
        let setup = MatchSetup::prepare(&options).unwrap();
        let autopilot = Autopilot::new(1.0, &setup.config.opponent);
        let (handle, profile, player) = setup.spawn("Autopilot", 1);
        handle.init_player(player).unwrap();

        let summary = simulate(&handle, &profile, 2, autopilot, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.matches.len(), 2);
        assert_eq!(summary.losses, 0);
        assert_eq!(summary.aborted, 0);
        assert!(summary.matches.iter().all(|m| m.correct_answers == 5));
        assert_eq!(summary.profile.correct_answers, 10);
        assert!(matches!(summary.matches[0].rewards, RewardStatus::Granted(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_simulation_is_interrupted() {
        let setup = MatchSetup::prepare(&MatchOptions::default()).unwrap();
        let autopilot = Autopilot::new(0.5, &setup.config.opponent);
        let (handle, profile, player) = setup.spawn("Autopilot", 1);
        handle.init_player(player).unwrap();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let summary = simulate(&handle, &profile, 3, autopilot, &shutdown)
            .await
            .unwrap();
        assert!(summary.interrupted);
        assert!(summary.matches.is_empty());
        assert_eq!(summary.profile.duels_won, 0);
    }
}
