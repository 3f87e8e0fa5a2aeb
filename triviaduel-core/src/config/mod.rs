//! Configuration schema shared by the engine and the CLI.

pub mod schema;

pub use schema::{
    DuelConfig, LateAnswerPolicy, MatchTiming, OpponentConfig, QuestionBankFile, RewardConfig,
    RewardTier,
};
