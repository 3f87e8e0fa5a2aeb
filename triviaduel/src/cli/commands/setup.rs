//! Shared match setup for `play` and `simulate`.
//!
//! Loads the configuration and question bank, applies command-line
//! overrides and builds the in-memory collaborators around one profile.

use std::path::Path;
use std::sync::Arc;

use triviaduel_core::config::DuelConfig;
use triviaduel_core::model::{Participant, PlayerProfile};

use crate::cli::args::MatchOptions;
use crate::collaborators::{Collaborators, ProfileStore, QuestionBank};
use crate::config::{ConfigLoader, LoadWarning};
use crate::engine::{MatchEngine, MatchHandle};
use crate::error::{CollaboratorError, DuelError};
use crate::observability::EventEmitter;

/// Everything needed to spawn an engine.
#[derive(Debug)]
pub struct MatchSetup {
    /// Frozen configuration with CLI overrides applied
    pub config: Arc<DuelConfig>,
    /// Question pool
    pub bank: QuestionBank,
    /// Event sink
    pub emitter: Arc<EventEmitter>,
}

impl MatchSetup {
    /// Resolves configuration, question bank and event sink from `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or bank fails to load, the
    /// category is unknown, the bank cannot fill a match, or the metrics
    /// listener or events file cannot be opened.
    pub fn prepare(options: &MatchOptions) -> Result<Self, DuelError> {
        if let Some(port) = options.metrics_port {
            crate::observability::init_metrics(Some(port))?;
            tracing::info!(port, "Prometheus metrics endpoint started");
        }

        let loader = ConfigLoader::with_defaults();
        let loaded = match options.config.as_deref() {
            Some(path) => {
                tracing::info!(config = %path.display(), "loading configuration");
                loader.load(path)?
            }
            None => loader.defaults()?,
        };
        log_warnings(&loaded.warnings);

        let mut config = (*loaded.config).clone();
        if let Some(seed) = options.seed {
            config.opponent.seed = Some(seed);
        }
        if let Some(policy) = options.late_answers {
            config.opponent.late_answers = policy;
        }
        if let Some(path) = options.questions.as_ref() {
            config.questions = Some(path.clone());
        }

        let mut bank = match config.questions.as_deref() {
            Some(path) => load_bank(&loader, path, config.timing.rounds)?,
            None => QuestionBank::builtin(),
        };
        if let Some(seed) = config.opponent.seed {
            bank = bank.with_seed(seed);
        }
        if let Some(category) = options.category.as_deref() {
            bank = bank.with_category(category)?;
        }
        if bank.len() < config.timing.rounds {
            return Err(CollaboratorError::NotEnoughQuestions {
                requested: config.timing.rounds,
                available: bank.len(),
            }
            .into());
        }

        let emitter = match options.events_file.as_deref() {
            Some(path) if path.as_os_str() == "-" => EventEmitter::stderr(),
            Some(path) => EventEmitter::from_file(path)?,
            None => EventEmitter::noop(),
        };

        Ok(Self {
            config: Arc::new(config),
            bank,
            emitter: Arc::new(emitter),
        })
    }

    /// Spawns an engine around a fresh profile for `name` at `level`.
    ///
    /// Returns the engine's handle, the profile store the rewards land in
    /// and the player.
    #[must_use]
    pub fn spawn(self, name: &str, level: u32) -> (MatchHandle, Arc<ProfileStore>, Participant) {
        let player = Participant::new(format!("player_{}", uuid::Uuid::new_v4()), name, level);
        let profile = Arc::new(ProfileStore::new(PlayerProfile::new(player.clone())));
        let collaborators = Collaborators::in_memory(self.bank, Arc::clone(&profile));
        let handle = MatchEngine::new(self.config, collaborators)
            .with_emitter(self.emitter)
            .spawn();
        (handle, profile, player)
    }
}

fn load_bank(loader: &ConfigLoader, path: &Path, rounds: usize) -> Result<QuestionBank, DuelError> {
    tracing::info!(questions = %path.display(), "loading question bank");
    let (questions, warnings) = loader.load_question_bank(path, rounds)?;
    log_warnings(&warnings);
    Ok(QuestionBank::new(questions))
}

fn log_warnings(warnings: &[LoadWarning]) {
    for warning in warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }
}
