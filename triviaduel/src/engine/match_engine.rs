//! The duel state machine
//!
//! A [`MatchEngine`] runs as a single tokio task that owns every piece of
//! mutable match state. Callers talk to it through a cloneable
//! [`MatchHandle`]; timers, opponent simulations, the slate fetch and reward
//! dispatch run as separate tasks that report back over an internal channel.
//!
//! Every report carries the match epoch it was scheduled under (and the
//! round where relevant). A reset cancels the match's [`CancellationToken`]
//! and bumps the epoch, so a report that was already queued when the reset
//! happened is recognised as stale and dropped.

use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use triviaduel_core::config::{DuelConfig, LateAnswerPolicy};
use triviaduel_core::model::{
    MatchResult, MatchState, Participant, QuestionItem, RoundOutcome, Settlement,
};

use super::opponent::{OpponentSimulator, OpponentStrategy, RandomStrategy, synthesize_opponent};
use super::rewards::{RewardDispatcher, RewardReceipt, RewardStatus};
use super::score::ScoreKeeper;
use super::snapshot::MatchSnapshot;
use super::timer::{RoundTimer, Scheduled, schedule_once, spawn_cancellable};
use crate::collaborators::Collaborators;
use crate::error::{CollaboratorError, EngineError};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;

// ============================================================================
// Messages
// ============================================================================

/// Requests from a [`MatchHandle`].
#[derive(Debug)]
enum Command {
    InitPlayer(Participant),
    FindMatch,
    SubmitAnswer(String),
    Reset,
}

/// Reports from tasks the engine scheduled.
#[derive(Debug)]
enum Callback {
    OpponentFound {
        epoch: u64,
    },
    SlateReady {
        epoch: u64,
        slate: Result<Vec<QuestionItem>, CollaboratorError>,
    },
    IntroDone {
        epoch: u64,
    },
    Tick {
        epoch: u64,
        round: usize,
        remaining: u32,
    },
    RoundExpired {
        epoch: u64,
        round: usize,
    },
    OpponentAnswered {
        epoch: u64,
        round: usize,
        correct: bool,
    },
    AdvanceRound {
        epoch: u64,
        round: usize,
    },
    RewardsSettled {
        epoch: u64,
        outcome: Result<RewardReceipt, CollaboratorError>,
    },
}

impl Callback {
    const fn epoch(&self) -> u64 {
        match self {
            Self::OpponentFound { epoch }
            | Self::SlateReady { epoch, .. }
            | Self::IntroDone { epoch }
            | Self::Tick { epoch, .. }
            | Self::RoundExpired { epoch, .. }
            | Self::OpponentAnswered { epoch, .. }
            | Self::AdvanceRound { epoch, .. }
            | Self::RewardsSettled { epoch, .. } => *epoch,
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable command surface of a running engine.
///
/// Commands are fire-and-forget: they return once queued, and their effect
/// shows up in the next published [`MatchSnapshot`]. The engine stops when
/// the last handle is dropped.
#[derive(Debug, Clone)]
pub struct MatchHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<MatchSnapshot>,
}

impl MatchHandle {
    /// Sets the human player. Ignored outside the lobby.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stopped`] if the engine task has exited.
    pub fn init_player(&self, player: Participant) -> Result<(), EngineError> {
        self.send(Command::InitPlayer(player))
    }

    /// Starts matchmaking. Ignored unless in the lobby with a player set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stopped`] if the engine task has exited.
    pub fn find_match(&self) -> Result<(), EngineError> {
        self.send(Command::FindMatch)
    }

    /// Answers the current round. Ignored unless a round is awaiting an
    /// answer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stopped`] if the engine task has exited.
    pub fn submit_answer(&self, answer: impl Into<String>) -> Result<(), EngineError> {
        self.send(Command::SubmitAnswer(answer.into()))
    }

    /// Abandons the current match and returns to the lobby.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stopped`] if the engine task has exited.
    pub fn reset(&self) -> Result<(), EngineError> {
        self.send(Command::Reset)
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MatchSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<MatchSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Stopped`] if the engine exits first.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<MatchSnapshot, EngineError>
    where
        F: FnMut(&MatchSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| EngineError::Stopped)?;
        Ok(snapshot.clone())
    }

    /// Whether the engine task is still accepting commands.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands.send(command).map_err(|_| EngineError::Stopped)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures and spawns a match engine.
pub struct MatchEngine {
    config: Arc<DuelConfig>,
    collaborators: Collaborators,
    strategy: Arc<dyn OpponentStrategy>,
    emitter: Option<Arc<EventEmitter>>,
}

impl MatchEngine {
    /// Engine with a [`RandomStrategy`] opponent built from `config`.
    #[must_use]
    pub fn new(config: Arc<DuelConfig>, collaborators: Collaborators) -> Self {
        let strategy = Arc::new(RandomStrategy::new(&config.opponent));
        Self {
            config,
            collaborators,
            strategy,
            emitter: None,
        }
    }

    /// Replaces the opponent strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn OpponentStrategy>) -> Self {
        self.strategy = strategy;
        self
    }

    /// Emits match events to `emitter`.
    #[must_use]
    pub fn with_emitter(mut self, emitter: Arc<EventEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    /// Spawns the engine task on the current tokio runtime.
    #[must_use]
    pub fn spawn(self) -> MatchHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (callback_tx, callback_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(MatchSnapshot {
            total_rounds: self.config.timing.rounds,
            remaining_ticks: self.config.timing.round_ticks,
            ..MatchSnapshot::default()
        });

        let rng = self
            .config
            .opponent
            .seed
            .map_or_else(StdRng::from_os_rng, |seed| {
                StdRng::seed_from_u64(seed.wrapping_add(1))
            });

        let task = EngineTask {
            rewards: RewardDispatcher::new(&self.collaborators, self.config.rewards),
            simulator: OpponentSimulator::new(self.strategy),
            timer: RoundTimer::new(self.config.timing.tick),
            remaining_ticks: self.config.timing.round_ticks,
            config: self.config,
            collaborators: self.collaborators,
            emitter: self.emitter,
            rng,
            callbacks: callback_tx,
            snapshots: snapshot_tx,
            state: MatchState::Lobby,
            epoch: 0,
            token: CancellationToken::new(),
            player: None,
            opponent: None,
            slate: Vec::new(),
            round_index: 0,
            rounds: Vec::new(),
            score: ScoreKeeper::new(),
            intro: false,
            last_answer: None,
            last_answer_correct: None,
            round_started: None,
            result: None,
            error: false,
            reward_status: RewardStatus::NotDue,
            opponent_sims: Vec::new(),
        };

        tokio::spawn(
            task.run(command_rx, callback_rx)
                .instrument(info_span!("match_engine")),
        );

        MatchHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }
}

impl std::fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("config", &self.config)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Engine task
// ============================================================================

struct EngineTask {
    config: Arc<DuelConfig>,
    collaborators: Collaborators,
    rewards: RewardDispatcher,
    simulator: OpponentSimulator,
    emitter: Option<Arc<EventEmitter>>,
    rng: StdRng,
    callbacks: mpsc::UnboundedSender<Callback>,
    snapshots: watch::Sender<MatchSnapshot>,

    state: MatchState,
    epoch: u64,
    token: CancellationToken,
    player: Option<Participant>,
    opponent: Option<Participant>,
    slate: Vec<QuestionItem>,
    round_index: usize,
    rounds: Vec<RoundOutcome>,
    score: ScoreKeeper,
    timer: RoundTimer,
    remaining_ticks: u32,
    intro: bool,
    last_answer: Option<String>,
    last_answer_correct: Option<bool>,
    round_started: Option<Instant>,
    result: Option<MatchResult>,
    error: bool,
    reward_status: RewardStatus,
    opponent_sims: Vec<Scheduled>,
}

impl EngineTask {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut callbacks: mpsc::UnboundedReceiver<Callback>,
    ) {
        debug!("match engine started");
        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(callback) = callbacks.recv() => self.handle_callback(callback),
            }
        }
        self.token.cancel();
        debug!("all handles dropped, match engine stopped");
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::InitPlayer(player) => self.init_player(player),
            Command::FindMatch => self.find_match(),
            Command::SubmitAnswer(answer) => self.submit_answer(answer),
            Command::Reset => self.reset(),
        }
    }

    fn init_player(&mut self, player: Participant) {
        if self.state != MatchState::Lobby {
            debug!(state = %self.state, "init_player ignored outside lobby");
            return;
        }
        debug!(player_id = %player.id, level = player.level, "player set");
        self.player = Some(player);
        self.publish();
    }

    fn find_match(&mut self) {
        if self.state != MatchState::Lobby {
            debug!(state = %self.state, "find_match ignored");
            return;
        }
        let Some(player_id) = self.player.as_ref().map(|p| p.id.clone()) else {
            debug!("find_match ignored, no player set");
            return;
        };

        self.clear_match();
        self.transition(MatchState::Searching);
        metrics::record_match_started();
        self.emit(Event::MatchSearching {
            timestamp: Utc::now(),
            epoch: self.epoch,
            player_id,
        });

        let tx = self.callbacks.clone();
        let epoch = self.epoch;
        // Dropping the handle detaches the task; the match token still owns it.
        let _ = schedule_once(&self.token, self.config.timing.matchmaking_delay, move || {
            let _ = tx.send(Callback::OpponentFound { epoch });
        });
        self.publish();
    }

    fn submit_answer(&mut self, answer: String) {
        if self.state != MatchState::Playing {
            debug!(state = %self.state, "answer ignored outside play");
            return;
        }
        if self.round_settled(self.round_index) {
            debug!(round = self.round_index, "answer ignored, round already settled");
            return;
        }
        if let Some(started) = self.round_started {
            metrics::record_answer_latency(started.elapsed());
        }
        self.settle_round(answer, Settlement::Answered);
    }

    fn reset(&mut self) {
        let from_state = self.state;
        let epoch = self.epoch;
        self.discard_pending();
        self.clear_match();
        self.transition(MatchState::Lobby);
        self.emit(Event::MatchReset {
            timestamp: Utc::now(),
            epoch,
            from_state,
        });
        self.publish();
    }

    // ------------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------------

    fn handle_callback(&mut self, callback: Callback) {
        if callback.epoch() != self.epoch {
            debug!(
                callback_epoch = callback.epoch(),
                epoch = self.epoch,
                "stale callback dropped"
            );
            return;
        }

        match callback {
            Callback::OpponentFound { .. } => self.on_opponent_found(),
            Callback::SlateReady { slate, .. } => self.on_slate_ready(slate),
            Callback::IntroDone { .. } => self.on_intro_done(),
            Callback::Tick {
                round, remaining, ..
            } => self.on_tick(round, remaining),
            Callback::RoundExpired { round, .. } => self.on_round_expired(round),
            Callback::OpponentAnswered { round, correct, .. } => {
                self.on_opponent_answered(round, correct);
            }
            Callback::AdvanceRound { round, .. } => self.on_advance_round(round),
            Callback::RewardsSettled { outcome, .. } => self.on_rewards_settled(outcome),
        }
    }

    fn on_opponent_found(&mut self) {
        if self.state != MatchState::Searching || self.opponent.is_some() {
            return;
        }
        let Some(player) = self.player.as_ref() else {
            return;
        };

        let opponent = synthesize_opponent(player, &mut self.rng);
        info!(opponent = %opponent.name, level = opponent.level, "opponent found");
        self.opponent = Some(opponent);

        let questions = Arc::clone(&self.collaborators.questions);
        let count = self.config.timing.rounds;
        let tx = self.callbacks.clone();
        let epoch = self.epoch;
        let _ = spawn_cancellable(&self.token, async move {
            let slate = questions.fetch_round_slate(count).await;
            let _ = tx.send(Callback::SlateReady { epoch, slate });
        });
        self.publish();
    }

    fn on_slate_ready(&mut self, slate: Result<Vec<QuestionItem>, CollaboratorError>) {
        if self.state != MatchState::Searching {
            return;
        }

        let expected = self.config.timing.rounds;
        let slate = match slate {
            Ok(slate) if slate.len() == expected => slate,
            Ok(slate) => {
                self.abort_matchmaking(&CollaboratorError::SlateSizeMismatch {
                    expected,
                    actual: slate.len(),
                });
                return;
            }
            Err(e) => {
                self.abort_matchmaking(&e);
                return;
            }
        };

        debug!(questions = slate.len(), "round slate ready");
        self.slate = slate;
        self.intro = true;

        let tx = self.callbacks.clone();
        let epoch = self.epoch;
        let _ = schedule_once(&self.token, self.config.timing.intro_delay, move || {
            let _ = tx.send(Callback::IntroDone { epoch });
        });
        self.publish();
    }

    fn on_intro_done(&mut self) {
        if self.state != MatchState::Searching || !self.intro {
            return;
        }
        self.intro = false;
        self.transition(MatchState::Playing);
        self.emit(Event::MatchStarted {
            timestamp: Utc::now(),
            epoch: self.epoch,
            opponent: self
                .opponent
                .as_ref()
                .map(|o| o.name.clone())
                .unwrap_or_default(),
            rounds: self.slate.len(),
        });
        self.start_round(0);
    }

    fn on_tick(&mut self, round: usize, remaining: u32) {
        if self.state != MatchState::Playing
            || round != self.round_index
            || self.round_settled(round)
        {
            return;
        }
        self.remaining_ticks = remaining;
        self.publish();
    }

    fn on_round_expired(&mut self, round: usize) {
        if self.state != MatchState::Playing
            || round != self.round_index
            || self.round_settled(round)
        {
            debug!(round, "expiry ignored");
            return;
        }
        self.settle_round(String::new(), Settlement::TimedOut);
    }

    fn on_opponent_answered(&mut self, round: usize, correct: bool) {
        let late = self.state == MatchState::Finished;
        if late && self.config.opponent.late_answers == LateAnswerPolicy::Discard {
            debug!(round, "late opponent answer discarded");
            return;
        }
        let Some(outcome) = self.rounds.get_mut(round) else {
            debug!(round, "opponent answer for unknown round dropped");
            return;
        };

        outcome.opponent_correct = Some(correct);
        self.score.record_opponent(correct);
        metrics::record_opponent_answer(late);
        debug!(
            round,
            correct,
            late,
            opponent_score = self.score.opponent(),
            "opponent answered"
        );
        self.emit(Event::OpponentAnswered {
            timestamp: Utc::now(),
            epoch: self.epoch,
            round,
            correct,
            late,
        });
        self.publish();
    }

    fn on_advance_round(&mut self, round: usize) {
        if self.state != MatchState::Playing
            || round != self.round_index
            || !self.round_settled(round)
        {
            return;
        }
        if round + 1 < self.slate.len() {
            self.start_round(round + 1);
        } else {
            self.finish();
        }
    }

    fn on_rewards_settled(&mut self, outcome: Result<RewardReceipt, CollaboratorError>) {
        let (status, error) = match outcome {
            Ok(receipt) => (RewardStatus::Granted(receipt.delta), None),
            Err(e) => {
                let reason = e.to_string();
                (RewardStatus::Failed(reason.clone()), Some(reason))
            }
        };
        metrics::record_reward_dispatch(error.is_none());
        self.emit(Event::RewardsDispatched {
            timestamp: Utc::now(),
            epoch: self.epoch,
            success: error.is_none(),
            error,
        });
        self.reward_status = status;
        self.publish();
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    fn start_round(&mut self, round: usize) {
        self.round_index = round;
        self.remaining_ticks = self.config.timing.round_ticks;
        self.last_answer = None;
        self.last_answer_correct = None;
        self.round_started = Some(Instant::now());

        let epoch = self.epoch;
        let tick_tx = self.callbacks.clone();
        let expire_tx = self.callbacks.clone();
        self.timer.start(
            &self.token,
            self.config.timing.round_ticks,
            move |remaining| {
                let _ = tick_tx.send(Callback::Tick {
                    epoch,
                    round,
                    remaining,
                });
            },
            move || {
                let _ = expire_tx.send(Callback::RoundExpired { epoch, round });
            },
        );

        debug!(round, "round started");
        self.publish();
    }

    fn settle_round(&mut self, answer: String, settlement: Settlement) {
        let round = self.round_index;
        self.timer.cancel();

        let correct = settlement == Settlement::Answered
            && self.slate.get(round).is_some_and(|q| q.is_correct(&answer));
        self.score.record_player(correct);
        self.rounds.push(RoundOutcome {
            round,
            player_answer: answer.clone(),
            player_correct: correct,
            settlement,
            opponent_correct: None,
        });
        self.last_answer = Some(answer);
        self.last_answer_correct = Some(correct);

        metrics::record_round_settled(settlement);
        info!(
            round,
            settlement = settlement.as_str(),
            correct,
            player_score = self.score.player(),
            "round settled"
        );
        self.emit(Event::RoundSettled {
            timestamp: Utc::now(),
            epoch: self.epoch,
            round,
            settlement,
            correct,
        });

        let epoch = self.epoch;
        let tx = self.callbacks.clone();
        self.opponent_sims.retain(|sim| !sim.is_finished());
        self.opponent_sims
            .push(self.simulator.simulate_answer(&self.token, move |correct| {
                let _ = tx.send(Callback::OpponentAnswered {
                    epoch,
                    round,
                    correct,
                });
            }));

        let tx = self.callbacks.clone();
        let _ = schedule_once(&self.token, self.config.timing.reveal_delay, move || {
            let _ = tx.send(Callback::AdvanceRound { epoch, round });
        });
        self.publish();
    }

    fn finish(&mut self) {
        self.timer.cancel();
        if self.config.opponent.late_answers == LateAnswerPolicy::Discard {
            for sim in self.opponent_sims.drain(..) {
                sim.cancel();
            }
        }

        let result = self.score.result();
        self.result = Some(result);
        self.transition(MatchState::Finished);
        metrics::record_match_finished(result.winner);
        info!(
            winner = %result.winner,
            player_score = result.player_score,
            opponent_score = result.opponent_score,
            "match finished"
        );
        self.emit(Event::MatchFinished {
            timestamp: Utc::now(),
            epoch: self.epoch,
            player_score: result.player_score,
            opponent_score: result.opponent_score,
            winner: result.winner,
        });

        // Not tied to the match token: a reset after finishing must not
        // lose the player's rewards.
        self.reward_status = RewardStatus::Pending;
        let dispatcher = self.rewards.clone();
        let tx = self.callbacks.clone();
        let epoch = self.epoch;
        tokio::spawn(
            async move {
                let outcome = dispatcher.dispatch(&result).await;
                let _ = tx.send(Callback::RewardsSettled { epoch, outcome });
            }
            .in_current_span(),
        );
        self.publish();
    }

    fn abort_matchmaking(&mut self, reason: &CollaboratorError) {
        warn!(error = %reason, "matchmaking aborted");
        metrics::record_matchmaking_failure();
        self.emit(Event::MatchAborted {
            timestamp: Utc::now(),
            epoch: self.epoch,
            reason: reason.to_string(),
        });

        self.discard_pending();
        self.clear_match();
        self.error = true;
        self.transition(MatchState::Lobby);
        self.publish();
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn transition(&mut self, to: MatchState) {
        let from = self.state;
        if from != to {
            info!(from = %from, to = %to, epoch = self.epoch, "match state changed");
        }
        metrics::set_match_state(to, from);
        self.state = to;
    }

    /// Cancels every outstanding task and starts a new epoch.
    fn discard_pending(&mut self) {
        self.token.cancel();
        self.token = CancellationToken::new();
        self.epoch = self.epoch.wrapping_add(1);
        self.timer.cancel();
        self.opponent_sims.clear();
    }

    /// Everything except the player goes back to its initial value.
    fn clear_match(&mut self) {
        self.opponent = None;
        self.slate.clear();
        self.round_index = 0;
        self.rounds.clear();
        self.score.reset();
        self.remaining_ticks = self.config.timing.round_ticks;
        self.intro = false;
        self.last_answer = None;
        self.last_answer_correct = None;
        self.round_started = None;
        self.result = None;
        self.error = false;
        self.reward_status = RewardStatus::NotDue;
    }

    fn round_settled(&self, round: usize) -> bool {
        self.rounds.len() > round
    }

    fn emit(&self, event: Event) {
        if let Some(emitter) = &self.emitter {
            emitter.emit(event);
        }
    }

    fn publish(&self) {
        let question = (self.state == MatchState::Playing)
            .then(|| self.slate.get(self.round_index).cloned())
            .flatten();
        self.snapshots.send_replace(MatchSnapshot {
            state: self.state,
            epoch: self.epoch,
            intro: self.intro,
            player: self.player.clone(),
            opponent: self.opponent.clone(),
            round_index: self.round_index,
            total_rounds: self.config.timing.rounds,
            question,
            player_score: self.score.player(),
            opponent_score: self.score.opponent(),
            remaining_ticks: self.remaining_ticks,
            last_answer: self.last_answer.clone(),
            last_answer_correct: self.last_answer_correct,
            rounds: self.rounds.clone(),
            result: self.result,
            error: self.error,
            rewards: self.reward_status.clone(),
        });
    }
}
