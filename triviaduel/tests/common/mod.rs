//! Shared integration-test harness: stub collaborators, engine wiring and
//! timeout-guarded snapshot waits.

#![allow(dead_code)]

use std::path::PathBuf;
use std::process::Output;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use triviaduel::collaborators::{
    AchievementCollaborator, Collaborators, QuestionProvider, StatsCollaborator,
};
use triviaduel::config::{DuelConfig, LateAnswerPolicy};
use triviaduel::engine::{FixedStrategy, MatchEngine, MatchHandle, MatchSnapshot};
use triviaduel::error::CollaboratorError;
use triviaduel_core::model::{MatchState, Participant, PlayerProfile, QuestionItem, StatsDelta};

/// Virtual-time budget for a single wait; generous because tests run with
/// a paused clock.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(600);

/// The answer every generated question accepts.
pub const RIGHT: &str = "right";

/// `count` questions whose correct option is [`RIGHT`].
pub fn questions(count: usize) -> Vec<QuestionItem> {
    (0..count)
        .map(|i| QuestionItem {
            id: u32::try_from(i).unwrap() + 1,
            text: format!("Question {}?", i + 1),
            options: vec!["wrong".into(), RIGHT.into(), "other".into()],
            correct_answer: RIGHT.into(),
            reference: format!("Ref {}", i + 1),
            category: "Test".into(),
        })
        .collect()
}

pub fn player() -> Participant {
    Participant::new("player_1", "Ada", 3)
}

/// Default timing with a fixed seed.
pub fn config() -> DuelConfig {
    let mut config = DuelConfig::default();
    config.opponent.seed = Some(7);
    config
}

pub fn config_with_policy(policy: LateAnswerPolicy) -> DuelConfig {
    let mut config = config();
    config.opponent.late_answers = policy;
    config
}

// ============================================================================
// Stub collaborators
// ============================================================================

/// Returns a canned slate (or error) and counts calls.
pub struct StubQuestions {
    slate: Result<Vec<QuestionItem>, CollaboratorError>,
    pub calls: AtomicUsize,
}

impl StubQuestions {
    pub fn ok(slate: Vec<QuestionItem>) -> Arc<Self> {
        Arc::new(Self {
            slate: Ok(slate),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: CollaboratorError) -> Arc<Self> {
        Arc::new(Self {
            slate: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl QuestionProvider for StubQuestions {
    async fn fetch_round_slate(&self, _count: usize) -> Result<Vec<QuestionItem>, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.slate.clone()
    }
}

/// Records every delta; optionally fails.
#[derive(Default)]
pub struct RecordingStats {
    pub deltas: Mutex<Vec<StatsDelta>>,
    pub fail: bool,
}

impl RecordingStats {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            deltas: Mutex::default(),
            fail: true,
        })
    }

    pub fn deltas(&self) -> Vec<StatsDelta> {
        self.deltas.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl StatsCollaborator for RecordingStats {
    async fn increment_stats(&self, delta: &StatsDelta) -> Result<PlayerProfile, CollaboratorError> {
        self.deltas.lock().unwrap().push(*delta);
        if self.fail {
            return Err(CollaboratorError::Stats("store offline".into()));
        }
        let mut profile = PlayerProfile::new(player());
        profile.xp = delta.xp;
        profile.duels_won = delta.duels_won;
        profile.correct_answers = delta.correct_answers;
        Ok(profile)
    }
}

/// Counts evaluations.
#[derive(Default)]
pub struct CountingAchievements {
    pub calls: AtomicUsize,
}

impl CountingAchievements {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AchievementCollaborator for CountingAchievements {
    async fn evaluate(&self, _profile: &PlayerProfile) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Harness
// ============================================================================

/// A spawned engine plus the stubs behind it.
pub struct Duel {
    pub handle: MatchHandle,
    pub questions: Arc<StubQuestions>,
    pub stats: Arc<RecordingStats>,
    pub achievements: Arc<CountingAchievements>,
}

impl Duel {
    /// Five-question slate, recording stats, fixed opponent.
    pub fn start(config: DuelConfig, opponent: FixedStrategy) -> Self {
        Self::with(
            config,
            opponent,
            StubQuestions::ok(questions(5)),
            Arc::new(RecordingStats::default()),
        )
    }

    pub fn with(
        config: DuelConfig,
        opponent: FixedStrategy,
        questions: Arc<StubQuestions>,
        stats: Arc<RecordingStats>,
    ) -> Self {
        let achievements = Arc::new(CountingAchievements::default());
        let collaborators = Collaborators {
            questions: Arc::clone(&questions) as Arc<dyn QuestionProvider>,
            stats: Arc::clone(&stats) as Arc<dyn StatsCollaborator>,
            achievements: Arc::clone(&achievements) as Arc<dyn AchievementCollaborator>,
        };
        let handle = MatchEngine::new(Arc::new(config), collaborators)
            .with_strategy(Arc::new(opponent))
            .spawn();
        handle.init_player(player()).unwrap();
        Self {
            handle,
            questions,
            stats,
            achievements,
        }
    }

    /// Waits for `predicate`, panicking after [`WAIT_TIMEOUT`].
    pub async fn wait<F>(&self, predicate: F) -> MatchSnapshot
    where
        F: FnMut(&MatchSnapshot) -> bool,
    {
        tokio::time::timeout(WAIT_TIMEOUT, self.handle.wait_for(predicate))
            .await
            .expect("timed out waiting for snapshot")
            .expect("engine stopped")
    }

    /// Finds a match and waits for round 0.
    pub async fn start_playing(&self) -> MatchSnapshot {
        self.handle.find_match().unwrap();
        self.wait(|s| s.state == MatchState::Playing).await
    }

    /// Waits until `round` accepts an answer.
    pub async fn wait_round(&self, round: usize) -> MatchSnapshot {
        self.wait(|s| s.round_index == round && s.awaiting_answer())
            .await
    }

    /// Waits until `round` has a settled outcome.
    pub async fn wait_settled(&self, round: usize) -> MatchSnapshot {
        self.wait(|s| s.rounds.len() > round).await
    }

    /// Waits until the match finished and rewards settled.
    pub async fn wait_rewards(&self) -> MatchSnapshot {
        self.wait(|s| s.is_finished() && s.rewards_settled()).await
    }
}

// ============================================================================
// CLI helpers
// ============================================================================

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Runs the built binary with `args` and collects its output.
pub fn run_cli(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_triviaduel"))
        .args(args)
        .env_remove("TRIVIADUEL_LOG_LEVEL")
        .env_remove("TRIVIADUEL_ROUNDS")
        .env_remove("TRIVIADUEL_ROUND_TICKS")
        .env_remove("TRIVIADUEL_OPPONENT_ACCURACY")
        .output()
        .expect("failed to run triviaduel")
}
