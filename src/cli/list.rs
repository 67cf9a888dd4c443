//! List command implementation
//!
//! Shows every built-in rule with its tag keywords, whether fieldguard.toml
//! disables it, and any configured message.

use crate::cli::args::OutputFormat;
use crate::cli::common::{EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS};
use crate::error::{ConfigError, RuleError};
use crate::markers::TAG_SYNONYMS;
use crate::output::{RuleInfo, RuleListHumanFormatter, RuleListJsonlFormatter};
use crate::rules::BUILTIN_RULES;

/// Rules selected by the type-dependent `min`/`max` keywords
const MIN_TARGETS: &[&str] = &["minlength", "minitems", "gte"];
const MAX_TARGETS: &[&str] = &["maxlength", "maxitems", "lte"];

/// Error type specific to list command
#[derive(Debug, thiserror::Error)]
enum ListError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),
}

/// Run the list command
///
/// # Returns
///
/// Exit code:
/// - 0: Success
/// - 2: Error
/// - 3: Parse error (invalid fieldguard.toml)
pub fn run_list(format: Option<OutputFormat>) -> i32 {
    match run_list_inner(format) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                ListError::Config(ConfigError::Parse(_)) => EXIT_PARSE_ERROR,
                _ => EXIT_ERROR,
            }
        }
    }
}

fn run_list_inner(format: Option<OutputFormat>) -> Result<(), ListError> {
    let config = super::common::load_config()?;
    let format = super::common::resolve_format(format, &config);
    let registry = super::common::build_registry(&config)?;
    let messages = config.messages();

    let rules: Vec<RuleInfo> = BUILTIN_RULES
        .iter()
        .map(|(id, description, _)| RuleInfo {
            id: id.to_string(),
            description: description.to_string(),
            synonyms: synonyms(id),
            enabled: registry.get(id).is_some(),
            message: messages.get(*id).cloned(),
        })
        .collect();

    match format {
        OutputFormat::Human => RuleListHumanFormatter::new().write_to_stdout(&rules),
        OutputFormat::Jsonl => RuleListJsonlFormatter::new().write_to_stdout(&rules),
    }
    Ok(())
}

/// Tag keywords selecting `id`, in catalogue order
fn synonyms(id: &str) -> Vec<String> {
    let mut keywords: Vec<String> = TAG_SYNONYMS
        .iter()
        .filter(|(_, target)| *target == id)
        .map(|(keyword, _)| keyword.to_string())
        .collect();
    if MIN_TARGETS.contains(&id) {
        keywords.push("min".to_string());
    }
    if MAX_TARGETS.contains(&id) {
        keywords.push("max".to_string());
    }
    keywords
}
