//! Configuration and question bank validation.
//!
//! Every file is checked independently; the command fails if any file has
//! errors (or warnings, with `--strict`).

use std::path::{Path, PathBuf};

use serde::Serialize;
use triviaduel_core::config::DuelConfig;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{ConfigError, DuelError};

/// Validate configuration and question bank files without playing.
///
/// # Errors
///
/// Returns `ConfigError::ValidationFailed` if any file is invalid, or a
/// JSON error if the report cannot be serialized.
pub fn run(args: &ValidateArgs) -> Result<(), DuelError> {
    let loader = ConfigLoader::with_defaults();
    let default_rounds = args
        .rounds
        .unwrap_or_else(|| DuelConfig::default().timing.rounds);

    let mut reports = Vec::new();
    for path in &args.files {
        tracing::info!(file = %path.display(), "validating configuration");
        reports.extend(check_config(&loader, path));
    }
    for path in &args.questions {
        tracing::info!(file = %path.display(), "validating question bank");
        reports.push(check_bank(&loader, path, default_rounds));
    }

    let report = ValidationReport::new(reports, args.strict);
    match args.format {
        OutputFormat::Human => print!("{}", report.to_human()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if report.summary.invalid > 0 {
        return Err(ConfigError::ValidationFailed {
            count: report.summary.invalid,
        }
        .into());
    }
    Ok(())
}

/// Checks a config file and, when it names one, its question bank.
fn check_config(loader: &ConfigLoader, path: &Path) -> Vec<FileReport> {
    match loader.load(path) {
        Ok(loaded) => {
            let mut reports = vec![FileReport::valid(path, FileKind::Config, &loaded.warnings)];
            if let Some(bank) = loaded.config.questions.as_deref() {
                reports.push(check_bank(loader, bank, loaded.config.timing.rounds));
            }
            reports
        }
        Err(e) => vec![FileReport::invalid(path, FileKind::Config, &e)],
    }
}

fn check_bank(loader: &ConfigLoader, path: &Path, rounds: usize) -> FileReport {
    match loader.load_question_bank(path, rounds) {
        Ok((_, warnings)) => FileReport::valid(path, FileKind::Questions, &warnings),
        Err(e) => FileReport::invalid(path, FileKind::Questions, &e),
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum FileKind {
    Config,
    Questions,
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    kind: FileKind,
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl FileReport {
    fn valid(path: &Path, kind: FileKind, warnings: &[LoadWarning]) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            valid: true,
            errors: Vec::new(),
            warnings: warnings.iter().map(ToString::to_string).collect(),
        }
    }

    fn invalid(path: &Path, kind: FileKind, error: &ConfigError) -> Self {
        let errors = match error {
            ConfigError::ValidationError { errors, .. } => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        };
        Self {
            path: path.to_path_buf(),
            kind,
            valid: false,
            errors,
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Summary {
    files: usize,
    valid: usize,
    invalid: usize,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    files: Vec<FileReport>,
    summary: Summary,
}

impl ValidationReport {
    fn new(mut files: Vec<FileReport>, strict: bool) -> Self {
        if strict {
            for file in &mut files {
                if !file.warnings.is_empty() {
                    file.valid = false;
                }
            }
        }
        let invalid = files.iter().filter(|f| !f.valid).count();
        Self {
            summary: Summary {
                files: files.len(),
                valid: files.len() - invalid,
                invalid,
            },
            files,
        }
    }

    fn to_human(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        for file in &self.files {
            let mark = if file.valid { "ok" } else { "FAILED" };
            let _ = writeln!(out, "{}: {mark}", file.path.display());
            for error in &file.errors {
                let _ = writeln!(out, "  {error}");
            }
            for warning in &file.warnings {
                let _ = writeln!(out, "  warning: {warning}");
            }
        }
        let _ = writeln!(
            out,
            "{} file(s) checked, {} valid, {} invalid",
            self.summary.files, self.summary.valid, self.summary.invalid
        );
        out
    }
}
