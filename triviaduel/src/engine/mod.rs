//! Duel match engine
//!
//! The state machine ([`MatchEngine`]) and the pieces it composes: the
//! per-round countdown, the simulated opponent, the score keeper, and the
//! end-of-match reward dispatcher.

pub mod match_engine;
pub mod opponent;
pub mod rewards;
pub mod score;
pub mod snapshot;
pub mod timer;

pub use match_engine::{MatchEngine, MatchHandle};
pub use opponent::{FixedStrategy, OpponentSimulator, OpponentStrategy, RandomStrategy};
pub use rewards::{RewardDispatcher, RewardReceipt, RewardStatus};
pub use score::ScoreKeeper;
pub use snapshot::MatchSnapshot;
pub use timer::{RoundTimer, Scheduled};
