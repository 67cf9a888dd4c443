#![forbid(unsafe_code)]

//! Per-run generation state
//!
//! A `GenerationContext` remembers which error declarations have already been
//! written so that a rule reached twice (through record-level and field-level
//! markers, or through two dive paths) declares its error value once. It
//! hands out error identifiers, keeping them unique across the output, and
//! collects diagnostics for checks that had to be skipped or degraded.
//! Each output file gets its own context.

use crate::types::{FieldPath, Severity};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Identity of one emitted error declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmissionKey {
    pub record: String,
    /// Literal field path (`User.addresses[i].city`)
    pub path: String,
    pub rule: String,
}

impl EmissionKey {
    pub fn new(record: &str, path: &FieldPath, rule: &str) -> Self {
        Self {
            record: record.to_string(),
            path: path.to_string(),
            rule: rule.to_string(),
        }
    }
}

/// A problem found while generating, attached to a field and rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub record: String,
    pub path: String,
    pub rule: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct GenerationContext {
    file: Option<PathBuf>,
    emitted: HashSet<EmissionKey>,
    identifiers: HashMap<EmissionKey, String>,
    taken: HashSet<String>,
    declared: HashSet<String>,
    messages: HashMap<String, String>,
    diagnostics: Vec<Diagnostic>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context for one source file; diagnostics carry its path
    pub fn for_file(file: &Path) -> Self {
        Self {
            file: Some(file.to_path_buf()),
            ..Self::default()
        }
    }

    /// Replaces the default error message of the given rule kinds
    pub fn with_messages(mut self, messages: HashMap<String, String>) -> Self {
        self.messages = messages;
        self
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn has_emitted(&self, key: &EmissionKey) -> bool {
        self.emitted.contains(key)
    }

    /// Records `key` as emitted; returns false if it already was
    pub fn mark_emitted(&mut self, key: EmissionKey) -> bool {
        self.emitted.insert(key)
    }

    /// Error identifier for `key`, stable across calls
    ///
    /// The first key to ask for a name gets `preferred`. A different key whose
    /// preferred name is already taken gets `preferred_2`, `preferred_3`, ...
    pub fn error_identifier(&mut self, key: &EmissionKey, preferred: &str) -> String {
        if let Some(name) = self.identifiers.get(key) {
            return name.clone();
        }
        let mut name = preferred.to_string();
        let mut n = 2;
        while self.taken.contains(&name) {
            name = format!("{preferred}_{n}");
            n += 1;
        }
        tracing::trace!(path = %key.path, rule = %key.rule, %name, "assigned error identifier");
        self.taken.insert(name.clone());
        self.identifiers.insert(key.clone(), name.clone());
        name
    }

    /// Records a shared helper (e.g. a regex static) by name
    ///
    /// Returns true the first time a name is seen.
    pub fn declare_once(&mut self, name: &str) -> bool {
        self.declared.insert(name.to_string())
    }

    /// Configured message for a rule kind, if any
    pub fn message_override(&self, rule: &str) -> Option<&str> {
        self.messages.get(rule).map(String::as_str)
    }

    pub fn warn(&mut self, path: &FieldPath, rule: &str, message: impl Into<String>) {
        self.push(Severity::Warning, path, rule, message.into());
    }

    pub fn info(&mut self, path: &FieldPath, rule: &str, message: impl Into<String>) {
        self.push(Severity::Info, path, rule, message.into());
    }

    fn push(&mut self, severity: Severity, path: &FieldPath, rule: &str, message: String) {
        tracing::debug!(%severity, path = %path, rule, message = %message, "diagnostic");
        self.diagnostics.push(Diagnostic {
            severity,
            file: self.file.clone(),
            record: path.record().unwrap_or_default().to_string(),
            path: path.to_string(),
            rule: rule.to_string(),
            message,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
