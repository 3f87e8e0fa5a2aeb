//! `triviaduel` - real-time trivia duels against a simulated opponent
//!
//! This library provides the match engine, its collaborators, configuration
//! loading and the observability layer used by the `triviaduel` binary.

pub mod cli;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod observability;
