//! `triviaduel` core — shared model types and configuration schema
//!
//! This crate provides the match model, the configuration types and the
//! configuration error types shared by the `triviaduel` engine and CLI.

pub mod config;
pub mod error;
pub mod model;
