//! Error types for `triviaduel`
//!
//! The engine itself never surfaces match-level failures as errors (they
//! become snapshot state); these types cover configuration, collaborator
//! calls, and a stopped engine task.

use thiserror::Error;

pub use triviaduel_core::error::{ConfigError, Severity, ValidationIssue};

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `triviaduel` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Engine error (engine task stopped unexpectedly)
    pub const ENGINE_ERROR: i32 = 5;

    /// Collaborator error (question catalog, stats store)
    pub const COLLABORATOR_ERROR: i32 = 6;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `triviaduel` operations.
#[derive(Debug, Error)]
pub enum DuelError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Match engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// External collaborator error
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl DuelError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Engine(_) => ExitCode::ENGINE_ERROR,
            Self::Collaborator(_) => ExitCode::COLLABORATOR_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Engine Errors
// ============================================================================

/// Errors from the match engine handle.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine task has stopped and no longer accepts commands
    #[error("match engine is not running")]
    Stopped,
}

// ============================================================================
// Collaborator Errors
// ============================================================================

/// Failures reported by external collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    /// Not enough questions to build a full slate
    #[error("question catalog has {available} question(s), {requested} requested")]
    NotEnoughQuestions {
        /// Questions requested
        requested: usize,
        /// Questions available after filtering
        available: usize,
    },

    /// The provider returned a slate of the wrong length
    #[error("round slate has {actual} question(s), expected {expected}")]
    SlateSizeMismatch {
        /// Configured round count
        expected: usize,
        /// Length actually returned
        actual: usize,
    },

    /// Unknown question category
    #[error("unknown category '{category}'{}", .suggestion.as_ref().map_or_else(String::new, |s| format!(" (did you mean '{s}'?)")))]
    UnknownCategory {
        /// Requested category
        category: String,
        /// Closest known category, if any
        suggestion: Option<String>,
    },

    /// The stats store rejected or failed the increment
    #[error("stats update failed: {0}")]
    Stats(String),

    /// The collaborator is unreachable or failed internally
    #[error("{0}")]
    Unavailable(String),
}
