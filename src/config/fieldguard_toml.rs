//! Parsing and validation for fieldguard.toml configuration files

use crate::error::ConfigError;
use crate::rules::BUILTIN_RULES;
use crate::types::{GlobPattern, RuleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "fieldguard.toml";

/// Suffix appended to a source file's stem to name its generated file
pub const DEFAULT_SUFFIX: &str = "_validate.rs";

/// Main configuration struct for fieldguard.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project metadata and file selection
    pub fieldguard: FieldguardMeta,

    /// Rule configuration
    #[serde(default)]
    pub rules: RulesConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.fieldguard.version != "1" {
            return Err(ConfigError::Validation(format!(
                "Unsupported configuration version '{}'. Expected '1'",
                self.fieldguard.version
            )));
        }

        for pattern in self.fieldguard.include.iter().chain(&self.fieldguard.exclude) {
            globset::Glob::new(pattern.as_str()).map_err(|e| {
                ConfigError::Validation(format!(
                    "Invalid glob pattern '{}': {}",
                    pattern.as_str(),
                    e
                ))
            })?;
        }

        for rule_id in self.rules.keys() {
            if !BUILTIN_RULES.iter().any(|(id, _, _)| *id == rule_id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Unknown rule '{}' in [rules]",
                    rule_id.as_str()
                )));
            }
        }

        let suffix = &self.output.suffix;
        if !suffix.ends_with(".rs") || suffix.len() <= ".rs".len() || suffix.contains('/') {
            return Err(ConfigError::Validation(format!(
                "Invalid output suffix '{suffix}'. Expected something like '{DEFAULT_SUFFIX}'"
            )));
        }

        Ok(())
    }

    /// Message overrides keyed by rule identifier
    pub fn messages(&self) -> HashMap<String, String> {
        self.rules
            .iter()
            .filter_map(|(id, value)| match value {
                RuleValue::Settings(RuleSettings {
                    message: Some(message),
                }) => Some((id.to_string(), message.clone())),
                _ => None,
            })
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fieldguard: FieldguardMeta {
                version: "1".to_string(),
                include: default_include(),
                exclude: Vec::new(),
            },
            rules: RulesConfig::new(),
            output: OutputConfig::default(),
        }
    }
}

/// `[fieldguard]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldguardMeta {
    /// Configuration version (must be "1")
    pub version: String,

    /// Source patterns to include
    #[serde(default = "default_include")]
    pub include: Vec<GlobPattern>,

    /// Source patterns to exclude
    #[serde(default)]
    pub exclude: Vec<GlobPattern>,
}

fn default_include() -> Vec<GlobPattern> {
    vec![GlobPattern::new("**/*.rs")]
}

/// `[rules]` table: rule identifier to enable flag or settings
pub type RulesConfig = HashMap<RuleId, RuleValue>;

/// A rule can be enabled with a boolean or configured with settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Simple boolean enable/disable
    Enabled(bool),
    /// Settings table for the rule
    Settings(RuleSettings),
}

/// Settings for individual rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSettings {
    /// Error message template; `{field}` is replaced by the field name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Output configuration section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Suffix of generated files
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Diagnostic format
    #[serde(default)]
    pub format: OutputFormat,

    /// Color output setting
    #[serde(default)]
    pub color: ColorOption,
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            format: OutputFormat::Human,
            color: ColorOption::Auto,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON Lines format
    Jsonl,
}

/// Color output options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorOption {
    /// Auto-detect based on terminal capabilities
    #[default]
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}
