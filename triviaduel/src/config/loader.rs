//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and read
//! 2. Environment variable expansion (on raw text, before parsing)
//! 3. YAML parsing into [`DuelConfig`]
//! 4. Numeric environment overrides
//! 5. Validation
//! 6. Freeze with `Arc`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use triviaduel_core::config::{DuelConfig, QuestionBankFile};
use triviaduel_core::model::QuestionItem;

use super::validation::Validator;
use crate::error::ConfigError;

/// Overrides `match.rounds`.
pub const ROUNDS_ENV: &str = "TRIVIADUEL_ROUNDS";
/// Overrides `match.round_ticks`.
pub const ROUND_TICKS_ENV: &str = "TRIVIADUEL_ROUND_TICKS";
/// Overrides `opponent.accuracy`.
pub const OPPONENT_ACCURACY_ENV: &str = "TRIVIADUEL_OPPONENT_ACCURACY";

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Largest accepted config or question bank file, in bytes.
    pub max_file_size: u64,

    /// Whether `TRIVIADUEL_*` numeric overrides are applied.
    pub env_overrides: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_file_size: env_or("TRIVIADUEL_MAX_CONFIG_SIZE", 1024 * 1024),
            env_overrides: true,
        }
    }
}

/// A loaded, validated configuration.
#[derive(Debug)]
pub struct LoadResult {
    /// The frozen configuration.
    pub config: Arc<DuelConfig>,

    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,

    /// Location where the warning occurred.
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} ({location})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Loads duel configurations and question banks.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads and validates a configuration file.
    ///
    /// A relative `questions:` path is resolved against the directory of
    /// `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, if environment
    /// expansion or YAML parsing fails, or if validation reports errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = self.read_limited(path)?;
        let mut result = self.load_from_str(&raw, path)?;

        if let Some(questions) = result.config.questions.as_ref()
            && questions.is_relative()
        {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            let mut config = (*result.config).clone();
            config.questions = Some(base.join(questions));
            result.config = Arc::new(config);
        }
        Ok(result)
    }

    /// Loads and validates configuration text. `origin` is only used in
    /// error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if environment expansion or YAML parsing fails, or
    /// if validation reports errors.
    pub fn load_from_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, origin)?;
        warnings.extend(env_sub.warnings);

        let config: DuelConfig = if substituted.trim().is_empty() {
            DuelConfig::default()
        } else {
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        self.finish(config, origin, warnings)
    }

    /// Default configuration with environment overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the overrides produce an invalid configuration.
    pub fn defaults(&self) -> Result<LoadResult, ConfigError> {
        self.finish(DuelConfig::default(), Path::new("<defaults>"), Vec::new())
    }

    /// Loads and validates a question bank file for matches of `rounds`
    /// rounds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, too large or malformed, or
    /// if the bank fails validation.
    pub fn load_question_bank(
        &self,
        path: &Path,
        rounds: usize,
    ) -> Result<(Vec<QuestionItem>, Vec<LoadWarning>), ConfigError> {
        let raw = self.read_limited(path)?;
        let bank: QuestionBankFile =
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let result = Validator::new().validate_bank(&bank.questions, rounds);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }
        let warnings = result
            .warnings
            .into_iter()
            .map(|issue| LoadWarning {
                message: issue.message,
                location: Some(issue.path),
            })
            .collect();
        Ok((bank.questions, warnings))
    }

    fn finish(
        &self,
        mut config: DuelConfig,
        origin: &Path,
        mut warnings: Vec<LoadWarning>,
    ) -> Result<LoadResult, ConfigError> {
        if self.options.env_overrides {
            apply_overrides(&mut config, |name| std::env::var(name).ok());
        }

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }

    fn read_limited(&self, path: &Path) -> Result<String, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > self.options.max_file_size {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.options.max_file_size,
            });
        }
        std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })
    }
}

/// Applies the numeric `TRIVIADUEL_*` overrides found through `lookup`.
///
/// Unparseable values are ignored.
pub fn apply_overrides<F>(config: &mut DuelConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(rounds) = lookup(ROUNDS_ENV).and_then(|v| v.trim().parse::<usize>().ok()) {
        config.timing.rounds = rounds;
    }
    if let Some(ticks) = lookup(ROUND_TICKS_ENV).and_then(|v| v.trim().parse::<u32>().ok()) {
        config.timing.round_ticks = ticks;
    }
    if let Some(accuracy) = lookup(OPPONENT_ACCURACY_ENV).and_then(|v| v.trim().parse::<f64>().ok())
    {
        config.opponent.accuracy = accuracy;
    }
}

/// Parses an environment variable, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution on raw YAML text.
struct EnvSubstitution {
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Supports:
    /// - `${VAR}` - value, or empty string with a warning if unset
    /// - `${VAR:-default}` - `default` if unset
    /// - `${VAR:?message}` - error if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw_yaml: &str, source: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw_yaml.len());
        let mut chars = raw_yaml.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let spec = parse_var_spec(&mut chars, source)?;
                    match std::env::var(&spec.name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => match spec.fallback {
                            Fallback::Default(default) => result.push_str(&default),
                            Fallback::Required(message) => {
                                return Err(ConfigError::EnvVarNotSet {
                                    var: spec.name,
                                    location: message,
                                });
                            }
                            Fallback::Empty => self.warnings.push(LoadWarning {
                                message: format!(
                                    "environment variable '{}' is not set, using empty string",
                                    spec.name
                                ),
                                location: Some(source.display().to_string()),
                            }),
                        },
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }
}

struct VarSpec {
    name: String,
    fallback: Fallback,
}

enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

fn parse_var_spec(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source: &Path,
) -> Result<VarSpec, ConfigError> {
    let mut name = String::new();
    while let Some(c) = chars.next() {
        match c {
            '}' => {
                return Ok(VarSpec {
                    name,
                    fallback: Fallback::Empty,
                });
            }
            ':' if chars.peek() == Some(&'-') => {
                chars.next();
                let default = read_until_close(chars, source)?;
                return Ok(VarSpec {
                    name,
                    fallback: Fallback::Default(default),
                });
            }
            ':' if chars.peek() == Some(&'?') => {
                chars.next();
                let message = read_until_close(chars, source)?;
                return Ok(VarSpec {
                    name,
                    fallback: Fallback::Required(message),
                });
            }
            _ => name.push(c),
        }
    }
    Err(unclosed(source, &name))
}

fn read_until_close(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    source: &Path,
) -> Result<String, ConfigError> {
    let mut value = String::new();
    let mut depth = 1;
    for c in chars.by_ref() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(value);
                }
            }
            _ => {}
        }
        value.push(c);
    }
    Err(unclosed(source, &value))
}

fn unclosed(source: &Path, fragment: &str) -> ConfigError {
    ConfigError::ParseError {
        path: PathBuf::from(source),
        line: None,
        message: format!("unclosed environment variable reference: ${{{fragment}"),
    }
}
