//! Generate command implementation
//!
//! This module implements the `fieldguard generate` command, which:
//! - Loads configuration from fieldguard.toml (defaults when absent)
//! - Discovers annotated source files
//! - Generates validator modules in parallel
//! - Writes every module whose content changed
//! - Deletes generated modules whose source has no checks left
//! - Reports diagnostics for degraded checks and unreadable files

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::cli::common::{EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS};
use crate::engine::{Generator, WriteAction};
use crate::error::{ConfigError, FieldguardError, RuleError};
use crate::output::{Report, RunMode};

/// Error type specific to generate command
#[derive(Debug, thiserror::Error)]
pub(crate) enum GenerateError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("File walker error: {0}")]
    FileWalker(#[from] crate::engine::file_walker::FileWalkerError),

    #[error("{0}")]
    Write(#[from] FieldguardError),
}

/// Run the generate command
///
/// # Returns
///
/// Exit code:
/// - 0: Success (warnings do not fail a generate run)
/// - 2: Error (configuration, I/O or write error)
/// - 3: Parse error (invalid fieldguard.toml or unparseable source file)
pub fn run_generate(paths: &[String], format: Option<OutputFormat>, color: Option<ColorChoice>) -> i32 {
    match run_generate_inner(paths, format, color) {
        Ok(report) if !report.failures.is_empty() => EXIT_PARSE_ERROR,
        Ok(_) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                GenerateError::Config(ConfigError::Parse(_)) => EXIT_PARSE_ERROR,
                _ => EXIT_ERROR,
            }
        }
    }
}

fn run_generate_inner(
    paths: &[String],
    format: Option<OutputFormat>,
    color: Option<ColorChoice>,
) -> Result<Report, GenerateError> {
    let config = super::common::load_config()?;
    let format = super::common::resolve_format(format, &config);
    let color = super::common::resolve_color(color, &config);
    let registry = super::common::build_registry(&config)?;

    let files = super::common::discover_files(paths, &config)?;
    if files.is_empty() {
        eprintln!("Warning: No source files found.");
    }
    tracing::debug!(files = files.len(), rules = registry.len(), "generating");

    let generator = Generator::new(registry)
        .with_suffix(config.output.suffix.clone())
        .with_messages(config.messages());
    let result = generator.generate(files);

    let mut written = Vec::new();
    let mut removed = Vec::new();
    for outcome in &result.files {
        match outcome.write()? {
            WriteAction::Written => written.push(outcome.output.clone()),
            WriteAction::Removed => removed.push(outcome.output.clone()),
            WriteAction::Unchanged => {}
        }
    }

    let report = Report::from_result(&result, written).with_removed(removed);
    super::common::print_report(&report, RunMode::Generate, format, color);
    Ok(report)
}
