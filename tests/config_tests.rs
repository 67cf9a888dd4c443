//! Integration tests for configuration parsing
//!
//! This module contains integration tests that verify:
//! - Config loading from files
//! - Rejection of invalid versions, globs, rules and suffixes
//! - Message overrides reaching generated code

mod common;

use common::write_file;
use fieldguard::config::{ColorOption, Config, DEFAULT_SUFFIX, OutputFormat};
use fieldguard::engine::Generator;
use fieldguard::error::ConfigError;
use fieldguard::rules::RuleRegistry;
use fieldguard::types::RuleId;
use tempfile::TempDir;

fn load(content: &str) -> Result<Config, ConfigError> {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "fieldguard.toml", content);
    Config::load(&path)
}

#[test]
fn test_config_load_minimal() {
    let config = load("[fieldguard]\nversion = \"1\"\n").unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.output.suffix, DEFAULT_SUFFIX);
}

#[test]
fn test_config_load_full() {
    let config = load(
        r#"
[fieldguard]
version = "1"
include = ["src/**/*.rs", "models/**/*.rs"]
exclude = ["**/generated/**"]

[rules]
uuid = false
gte = { message = "{field} is too small" }

[output]
suffix = "_rules.rs"
format = "jsonl"
color = "always"
"#,
    )
    .unwrap();

    assert_eq!(config.fieldguard.include.len(), 2);
    assert_eq!(config.fieldguard.exclude.len(), 1);
    assert!(config.rules.contains_key(&RuleId::new("uuid").unwrap()));
    assert_eq!(
        config.messages().get("gte").map(String::as_str),
        Some("{field} is too small")
    );
    assert_eq!(config.output.suffix, "_rules.rs");
    assert_eq!(config.output.format, OutputFormat::Jsonl);
    assert_eq!(config.output.color, ColorOption::Always);
}

#[test]
fn test_config_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Config::load(dir.path().join("fieldguard.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[test]
fn test_config_invalid_toml() {
    let result = load("[fieldguard\nversion = 1");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_config_invalid_version() {
    let err = load("[fieldguard]\nversion = \"2\"\n").unwrap_err();
    assert!(err.to_string().contains("Unsupported configuration version"));
}

#[test]
fn test_config_invalid_glob() {
    let err = load("[fieldguard]\nversion = \"1\"\ninclude = [\"src/[\"]\n").unwrap_err();
    assert!(err.to_string().contains("Invalid glob pattern"));
}

#[test]
fn test_config_unknown_rule() {
    let err = load("[fieldguard]\nversion = \"1\"\n\n[rules]\nno_such_rule = true\n").unwrap_err();
    assert!(err.to_string().contains("Unknown rule 'no_such_rule'"));
}

#[test]
fn test_config_invalid_suffix() {
    let err = load("[fieldguard]\nversion = \"1\"\n\n[output]\nsuffix = \"_validate.txt\"\n")
        .unwrap_err();
    assert!(err.to_string().contains("Invalid output suffix"));
}

#[test]
fn test_disabled_rule_and_message_override_reach_output() {
    let config = load(
        r#"
[fieldguard]
version = "1"

[rules]
email = false
required = { message = "{field} must be provided" }
"#,
    )
    .unwrap();

    let mut registry = RuleRegistry::with_builtins().unwrap();
    registry.filter_by_config(&config.rules);
    let generator = Generator::new(registry).with_messages(config.messages());

    let dir = TempDir::new().unwrap();
    let source = write_file(
        dir.path(),
        "contact.rs",
        "struct Contact {\n    /// +required\n    /// +email\n    mail: String,\n}\n",
    );
    let outcome = generator.generate_file(&source);
    let content = assert_some!(outcome.content);

    assert!(content.contains("message: \"mail must be provided\""));
    assert!(!content.contains("EMAIL_RE"));
}
