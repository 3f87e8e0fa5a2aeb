//! CLI argument definitions
//!
//! All Clap derive structs for `triviaduel` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use triviaduel_core::config::LateAnswerPolicy;

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Real-time trivia duels against a simulated opponent.
#[derive(Parser, Debug)]
#[command(name = "triviaduel", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TRIVIADUEL_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true, env = "TRIVIADUEL_LOG_FORMAT")]
    pub log_format: LogFormatChoice,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a duel in the terminal.
    Play(PlayArgs),

    /// Run headless matches with an automated player.
    Simulate(SimulateArgs),

    /// Validate configuration and question bank files.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version and build information.
    Version(VersionArgs),
}

// ============================================================================
// Shared Match Options
// ============================================================================

/// Options shared by every command that runs matches.
#[derive(Args, Debug, Clone, Default)]
pub struct MatchOptions {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "TRIVIADUEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Question bank file; overrides `questions:` from the config.
    #[arg(long, env = "TRIVIADUEL_QUESTIONS")]
    pub questions: Option<PathBuf>,

    /// Only draw questions from this category.
    #[arg(long)]
    pub category: Option<String>,

    /// Seed for question order and the simulated opponent.
    #[arg(long, env = "TRIVIADUEL_SEED")]
    pub seed: Option<u64>,

    /// Handling of opponent answers that arrive after the match ended.
    #[arg(long)]
    pub late_answers: Option<LateAnswerPolicy>,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "TRIVIADUEL_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Write match events as JSON lines to this file (`-` for stderr).
    #[arg(long)]
    pub events_file: Option<PathBuf>,
}

// ============================================================================
// Play / Simulate
// ============================================================================

/// Arguments for `play`.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Shared match options.
    #[command(flatten)]
    pub options: MatchOptions,

    /// Display name of the player.
    #[arg(short, long, default_value = "Player", env = "TRIVIADUEL_NAME")]
    pub name: String,

    /// Starting level of the player.
    #[arg(long, default_value_t = 1)]
    pub level: u32,
}

/// Arguments for `simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Shared match options.
    #[command(flatten)]
    pub options: MatchOptions,

    /// Number of matches to play back to back.
    #[arg(short, long, default_value_t = 1)]
    pub matches: u32,

    /// Probability that the automated player answers correctly.
    #[arg(long, default_value_t = 0.6)]
    pub player_accuracy: f64,

    /// Multiplier applied to every delay (0.01 runs 100x faster).
    #[arg(long, default_value_t = 0.01)]
    pub time_scale: f64,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Validate
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required_unless_present = "questions")]
    pub files: Vec<PathBuf>,

    /// Question bank files to validate.
    #[arg(long)]
    pub questions: Vec<PathBuf>,

    /// Rounds a question bank must cover when no config names one.
    #[arg(long)]
    pub rounds: Option<usize>,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log format choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormatChoice {
    /// Human-readable lines.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Human => Self::Human,
            LogFormatChoice::Json => Self::Json,
        }
    }
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Shell type for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell.
    Bash,
    /// Zsh shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
