//! Common helper functions shared across CLI commands
//!
//! This module provides shared functionality for loading configuration,
//! discovering files, building rule registries and rendering reports.

use crate::cli::args::{ColorChoice, OutputFormat};
use crate::config::{CONFIG_FILE, ColorOption, Config, OutputFormat as ConfigFormat};
use crate::engine::file_walker::{FileEntry, FileWalker, FileWalkerError};
use crate::error::{ConfigError, RuleError};
use crate::output::{HumanFormatter, JsonlFormatter, Report, RunMode};
use crate::rules::RuleRegistry;
use std::path::Path;

/// Process exit codes
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CHECK_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;
pub const EXIT_PARSE_ERROR: i32 = 3;

/// Load fieldguard.toml configuration
///
/// A missing file means defaults: every built-in rule enabled, all `.rs`
/// files included.
///
/// # Errors
///
/// Returns `ConfigError::Io` if fieldguard.toml cannot be read,
/// `ConfigError::Parse` if it is not valid TOML and
/// `ConfigError::Validation` if a setting is rejected.
pub(crate) fn load_config() -> Result<Config, ConfigError> {
    let config_path = Path::new(CONFIG_FILE);
    if !config_path.exists() {
        tracing::debug!("{CONFIG_FILE} not found, using defaults");
        return Ok(Config::default());
    }

    Config::load(config_path)
}

/// Discover source files using FileWalker
///
/// Walks the specified paths and collects every file matching the
/// include/exclude patterns, skipping generated outputs.
///
/// # Errors
///
/// Returns `FileWalkerError` if there is an error walking the file system.
pub(crate) fn discover_files(
    paths: &[String],
    config: &Config,
) -> Result<Vec<FileEntry>, FileWalkerError> {
    let mut all_files = Vec::new();

    for path_str in paths {
        let walker = FileWalker::new(
            Path::new(path_str),
            &config.fieldguard.include,
            &config.fieldguard.exclude,
            &config.output.suffix,
        )?;

        for result in walker.walk() {
            all_files.push(result?);
        }
    }

    Ok(all_files)
}

/// Build the rule registry from configuration
///
/// Registers every built-in rule, then removes those disabled in `[rules]`.
///
/// # Errors
///
/// Returns `RuleError` if the built-in catalogue is inconsistent.
pub(crate) fn build_registry(config: &Config) -> Result<RuleRegistry, RuleError> {
    let mut registry = RuleRegistry::with_builtins()?;
    registry.filter_by_config(&config.rules);
    Ok(registry)
}

/// Output format: the command line wins over fieldguard.toml
pub(crate) fn resolve_format(flag: Option<OutputFormat>, config: &Config) -> OutputFormat {
    flag.unwrap_or(match config.output.format {
        ConfigFormat::Human => OutputFormat::Human,
        ConfigFormat::Jsonl => OutputFormat::Jsonl,
    })
}

/// Color setting: the command line wins over fieldguard.toml
pub(crate) fn resolve_color(flag: Option<ColorChoice>, config: &Config) -> ColorOption {
    match flag {
        Some(ColorChoice::Auto) => ColorOption::Auto,
        Some(ColorChoice::Always) => ColorOption::Always,
        Some(ColorChoice::Never) => ColorOption::Never,
        None => config.output.color,
    }
}

/// Prints a run report: human output to stderr, JSONL to stdout
pub(crate) fn print_report(report: &Report, mode: RunMode, format: OutputFormat, color: ColorOption) {
    match format {
        OutputFormat::Human => {
            if let Err(e) = HumanFormatter::new(color).write_to_stderr(report, mode) {
                tracing::warn!("failed to write report: {e}");
            }
        }
        OutputFormat::Jsonl => print!("{}", JsonlFormatter::new().format(report, mode)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_files_with_empty_paths() {
        let result = discover_files(&[], &Config::default());
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 0);
    }

    #[test]
    fn test_discover_files_skips_generated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("user.rs"), "struct User {}").unwrap();
        fs::write(dir.path().join("user_validate.rs"), "").unwrap();

        let paths = vec![dir.path().to_string_lossy().into_owned()];
        let files = discover_files(&paths, &Config::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("user.rs"));
    }

    #[test]
    fn test_build_registry_honours_disabled_rules() {
        let config = Config::parse("[fieldguard]\nversion = \"1\"\n\n[rules]\nemail = false\n").unwrap();
        let registry = build_registry(&config).unwrap();
        assert!(registry.get("email").is_none());
        assert!(registry.get("required").is_some());
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config::parse(
            "[fieldguard]\nversion = \"1\"\n\n[output]\nformat = \"jsonl\"\ncolor = \"never\"\n",
        )
        .unwrap();
        assert_eq!(resolve_format(None, &config), OutputFormat::Jsonl);
        assert_eq!(resolve_format(Some(OutputFormat::Human), &config), OutputFormat::Human);
        assert_eq!(resolve_color(None, &config), ColorOption::Never);
        assert_eq!(resolve_color(Some(ColorChoice::Always), &config), ColorOption::Always);
    }
}
