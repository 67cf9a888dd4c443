//! Check command implementation
//!
//! This module implements the `fieldguard check` command, which runs the
//! same pipeline as `generate` without writing anything and fails when:
//! - A generated module is missing or differs from what would be written
//! - A check degraded to an inert guard (warning diagnostic)
//! - A source file could not be parsed

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::cli::common::{EXIT_CHECK_FAILED, EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS};
use crate::engine::Generator;
use crate::error::{ConfigError, RuleError};
use crate::output::{Report, RunMode};

/// Error type specific to check command
#[derive(Debug, thiserror::Error)]
pub(crate) enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("File walker error: {0}")]
    FileWalker(#[from] crate::engine::file_walker::FileWalkerError),
}

/// Run the check command
///
/// # Returns
///
/// Exit code:
/// - 0: Success (every generated module is current and no check degraded)
/// - 1: Check failed (stale outputs or warnings)
/// - 2: Error (configuration or I/O error)
/// - 3: Parse error (invalid fieldguard.toml or unparseable source file)
pub fn run_check(paths: &[String], format: Option<OutputFormat>, color: Option<ColorChoice>) -> i32 {
    match run_check_inner(paths, format, color) {
        Ok(report) => {
            if !report.failures.is_empty() {
                EXIT_PARSE_ERROR
            } else if !report.changed.is_empty() || report.warnings() > 0 {
                EXIT_CHECK_FAILED
            } else {
                EXIT_SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                CheckError::Config(ConfigError::Parse(_)) => EXIT_PARSE_ERROR,
                _ => EXIT_ERROR,
            }
        }
    }
}

fn run_check_inner(
    paths: &[String],
    format: Option<OutputFormat>,
    color: Option<ColorChoice>,
) -> Result<Report, CheckError> {
    let config = super::common::load_config()?;
    let format = super::common::resolve_format(format, &config);
    let color = super::common::resolve_color(color, &config);
    let registry = super::common::build_registry(&config)?;

    let files = super::common::discover_files(paths, &config)?;
    if files.is_empty() {
        eprintln!("Warning: No source files found.");
    }

    let generator = Generator::new(registry)
        .with_suffix(config.output.suffix.clone())
        .with_messages(config.messages());
    let result = generator.generate(files);

    let stale = result
        .files
        .iter()
        .filter(|outcome| outcome.is_stale())
        .map(|outcome| outcome.output.clone())
        .collect();

    let report = Report::from_result(&result, stale);
    super::common::print_report(&report, RunMode::Check, format, color);
    Ok(report)
}
