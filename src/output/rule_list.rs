#![forbid(unsafe_code)]

//! Rule listing formatters
//!
//! Displays the rule catalogue for the `fieldguard list` command in
//! human-readable or JSONL form.

use serde::Serialize;

/// One rule of the catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleInfo {
    pub id: String,
    pub description: String,
    /// Tag keywords that select this rule
    pub synonyms: Vec<String>,
    /// False when disabled in fieldguard.toml
    pub enabled: bool,
    /// Configured message template, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Human-readable formatter for the rule catalogue
pub struct RuleListHumanFormatter;

impl RuleListHumanFormatter {
    pub fn new() -> Self {
        RuleListHumanFormatter
    }

    pub fn format(&self, rules: &[RuleInfo]) -> String {
        let enabled = rules.iter().filter(|r| r.enabled).count();
        let mut output = format!("Rules ({enabled} enabled, {} total):\n\n", rules.len());

        for rule in rules {
            let state = if rule.enabled { "" } else { " (disabled)" };
            output.push_str(&format!("{}{state}\n", rule.id));
            output.push_str(&format!("  {}\n", rule.description));
            if !rule.synonyms.is_empty() {
                output.push_str(&format!("  Tags: {}\n", rule.synonyms.join(", ")));
            }
            if let Some(message) = &rule.message {
                output.push_str(&format!("  Message: {message}\n"));
            }
            output.push('\n');
        }

        output
    }

    pub fn write_to_stdout(&self, rules: &[RuleInfo]) {
        print!("{}", self.format(rules));
    }
}

impl Default for RuleListHumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// JSONL formatter for the rule catalogue
pub struct RuleListJsonlFormatter;

impl RuleListJsonlFormatter {
    pub fn new() -> Self {
        RuleListJsonlFormatter
    }

    /// One JSON object per rule
    pub fn format(&self, rules: &[RuleInfo]) -> String {
        let mut output = String::new();
        for rule in rules {
            if let Ok(json) = serde_json::to_string(rule) {
                output.push_str(&json);
                output.push('\n');
            }
        }
        output
    }

    pub fn write_to_stdout(&self, rules: &[RuleInfo]) {
        print!("{}", self.format(rules));
    }
}

impl Default for RuleListJsonlFormatter {
    fn default() -> Self {
        Self::new()
    }
}
