//! Simulated opponent
//!
//! The opponent is never a live connection: each round it "answers" after a
//! random thinking time, correct with a fixed probability. Both draws come
//! from an injectable [`OpponentStrategy`] so tests can pin them.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;
use triviaduel_core::config::OpponentConfig;
use triviaduel_core::model::Participant;

use super::timer::{Scheduled, schedule_once};

const OPPONENT_NAMES: [&str; 6] = ["Samuel", "Elijah", "Deborah", "Gideon", "Sarah", "Noah"];

const OPPONENT_EPITHETS: [&str; 5] = [
    "the Prophet",
    "the Judge",
    "the Brave",
    "the Matriarch",
    "the Just",
];

/// Title shown for every simulated opponent.
pub const OPPONENT_TITLE: &str = "Celestial Contender";

// ============================================================================
// Strategy
// ============================================================================

/// Source of the opponent's per-round decisions.
pub trait OpponentStrategy: Send + Sync + Debug {
    /// How long the opponent "thinks" before answering.
    fn think_time(&self) -> Duration;

    /// Whether the opponent's answer is correct.
    fn answers_correctly(&self) -> bool;
}

/// Uniform thinking time in `[min_think, max_think]`, Bernoulli correctness.
#[derive(Debug)]
pub struct RandomStrategy {
    min_think: Duration,
    max_think: Duration,
    accuracy: f64,
    rng: Mutex<StdRng>,
}

impl RandomStrategy {
    /// Builds the strategy from configuration, seeding the RNG when a seed
    /// is configured.
    #[must_use]
    pub fn new(config: &OpponentConfig) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            min_think: config.min_think,
            max_think: config.max_think.max(config.min_think),
            accuracy: config.accuracy.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }
}

impl OpponentStrategy for RandomStrategy {
    fn think_time(&self) -> Duration {
        let span = self.max_think - self.min_think;
        if span.is_zero() {
            return self.min_think;
        }
        let fraction: f64 = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random();
        self.min_think + span.mul_f64(fraction)
    }

    fn answers_correctly(&self) -> bool {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_bool(self.accuracy)
    }
}

/// Deterministic strategy: same delay and correctness every round.
#[derive(Debug, Clone, Copy)]
pub struct FixedStrategy {
    /// Thinking time for every round
    pub think_time: Duration,
    /// Correctness for every round
    pub correct: bool,
}

impl FixedStrategy {
    /// An opponent that always answers correctly after `think_time`.
    #[must_use]
    pub const fn always_correct(think_time: Duration) -> Self {
        Self {
            think_time,
            correct: true,
        }
    }

    /// An opponent that always answers incorrectly after `think_time`.
    #[must_use]
    pub const fn always_wrong(think_time: Duration) -> Self {
        Self {
            think_time,
            correct: false,
        }
    }
}

impl OpponentStrategy for FixedStrategy {
    fn think_time(&self) -> Duration {
        self.think_time
    }

    fn answers_correctly(&self) -> bool {
        self.correct
    }
}

// ============================================================================
// Simulator
// ============================================================================

/// Schedules one simulated answer per round.
#[derive(Debug, Clone)]
pub struct OpponentSimulator {
    strategy: Arc<dyn OpponentStrategy>,
}

impl OpponentSimulator {
    /// Wraps a strategy.
    #[must_use]
    pub fn new(strategy: Arc<dyn OpponentStrategy>) -> Self {
        Self { strategy }
    }

    /// Schedules `on_result(correct)` after the strategy's thinking time.
    ///
    /// The callback is dropped if `parent` or the returned handle is
    /// cancelled before the delay elapses.
    pub fn simulate_answer<F>(&self, parent: &CancellationToken, on_result: F) -> Scheduled
    where
        F: FnOnce(bool) + Send + 'static,
    {
        let delay = self.strategy.think_time();
        let correct = self.strategy.answers_correctly();
        schedule_once(parent, delay, move || on_result(correct))
    }
}

/// Creates a throwaway opponent around the player's level.
///
/// The level lands within one of the player's (never below 1); name and
/// epithet come from fixed pools and the avatar is seeded by the name.
pub fn synthesize_opponent<R: Rng + ?Sized>(player: &Participant, rng: &mut R) -> Participant {
    let name = OPPONENT_NAMES.choose(rng).copied().unwrap_or("Samuel");
    let epithet = OPPONENT_EPITHETS.choose(rng).copied().unwrap_or("the Just");
    let offset: i64 = rng.random_range(-1..=1);
    let level = (i64::from(player.level) + offset).clamp(1, i64::from(u32::MAX));

    Participant {
        id: format!("bot_{}", uuid::Uuid::new_v4().simple()),
        name: format!("{name} {epithet}"),
        title: OPPONENT_TITLE.to_owned(),
        avatar_url: format!("https://api.dicebear.com/8.x/adventurer/svg?seed={name}"),
        level: u32::try_from(level).unwrap_or(1),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn config(seed: u64) -> OpponentConfig {
        OpponentConfig {
            seed: Some(seed),
            ..OpponentConfig::default()
        }
    }

    #[test]
    fn random_think_time_stays_in_range() {
        let strategy = RandomStrategy::new(&config(7));
        for _ in 0..1_000 {
            let t = strategy.think_time();
            assert!(t >= Duration::from_millis(500), "{t:?} below range");
            assert!(t <= Duration::from_millis(2500), "{t:?} above range");
        }
    }

    #[test]
    fn random_accuracy_is_roughly_configured() {
        let strategy = RandomStrategy::new(&config(42));
        let correct = (0..10_000).filter(|_| strategy.answers_correctly()).count();
        assert!((7_000..=8_000).contains(&correct), "got {correct} / 10000");
    }

    #[test]
    fn seeded_strategies_agree() {
        let a = RandomStrategy::new(&config(3));
        let b = RandomStrategy::new(&config(3));
        for _ in 0..50 {
            assert_eq!(a.think_time(), b.think_time());
            assert_eq!(a.answers_correctly(), b.answers_correctly());
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        let strategy = RandomStrategy::new(&OpponentConfig {
            min_think: Duration::from_millis(800),
            max_think: Duration::from_millis(200),
            ..config(1)
        });
        assert_eq!(strategy.think_time(), Duration::from_millis(800));
    }

    #[test]
    fn extreme_accuracy_is_deterministic() {
        let never = RandomStrategy::new(&OpponentConfig {
            accuracy: 0.0,
            ..config(5)
        });
        let always = RandomStrategy::new(&OpponentConfig {
            accuracy: 1.5,
            ..config(5)
        });
        for _ in 0..100 {
            assert!(!never.answers_correctly());
            assert!(always.answers_correctly());
        }
    }

    #[test]
    fn synthesized_opponent_level_is_near_player() {
        let mut rng = StdRng::seed_from_u64(9);
        let player = Participant::new("u1", "Ana", 4);
        for _ in 0..200 {
            let bot = synthesize_opponent(&player, &mut rng);
            assert!((3..=5).contains(&bot.level));
            assert!(bot.is_bot());
            assert_eq!(bot.title, OPPONENT_TITLE);
            assert!(bot.avatar_url.contains("seed="));
        }
    }

    #[test]
    fn synthesized_opponent_level_never_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        let player = Participant::new("u1", "Ana", 1);
        for _ in 0..200 {
            assert!(synthesize_opponent(&player, &mut rng).level >= 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn simulator_reports_after_think_time() {
        let simulator = OpponentSimulator::new(Arc::new(FixedStrategy::always_correct(
            Duration::from_millis(1200),
        )));
        let parent = CancellationToken::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let _handle = simulator.simulate_answer(&parent, move |correct| {
            assert!(correct);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_simulation_is_silent() {
        let simulator = OpponentSimulator::new(Arc::new(FixedStrategy::always_wrong(
            Duration::from_millis(500),
        )));
        let parent = CancellationToken::new();
        let hits = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&hits);
        let handle = simulator.simulate_answer(&parent, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
