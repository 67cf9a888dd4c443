//! Error types for fieldguard
//!
//! This module defines the error types used throughout fieldguard, following
//! a hierarchical structure with specific error variants for different
//! error categories. Recoverable expression problems never surface here as
//! fatal errors: they degrade into inert checks and are collected as
//! diagnostics on the generation context instead.

use std::path::PathBuf;

/// Configuration-related errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid TOML syntax or shape
    #[error("Invalid configuration syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantically invalid configuration
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Rule-related errors
///
/// These are structural problems with the registry itself and abort a run.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The same rule identifier was registered twice
    #[error("Duplicate rule registration: {0}")]
    DuplicateRule(String),

    /// Rule not found
    #[error("Rule not found: {0}")]
    NotFound(String),

    /// Invalid rule definition
    #[error("Invalid rule definition: {0}")]
    InvalidDefinition(String),
}

/// Errors raised while reading record declarations from source
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    /// The tree-sitter grammar could not be loaded
    #[error("Failed to load Rust grammar: {0}")]
    Language(String),

    /// The source file does not parse
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the expression compiler
///
/// Every variant is recoverable: the caller turns it into an always-true
/// placeholder guard plus a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    /// Expression uses a feature outside the supported subset
    #[error("expression uses unsupported feature '{feature}'")]
    Rejected { feature: String },

    /// Tokenizer failure
    #[error("invalid token at offset {offset}: {message}")]
    Lex { offset: usize, message: String },

    /// Parser failure
    #[error("syntax error: {0}")]
    Parse(String),

    /// Recognized syntax with a shape the translator does not handle
    #[error("unsupported construct: {0}")]
    Unsupported(String),
}

/// Top-level error type for fieldguard
#[derive(Debug, thiserror::Error)]
pub enum FieldguardError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Rule error
    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    /// Front-end error in a specific source file
    #[error("Failed to read records from {file}: {source}")]
    Frontend {
        file: PathBuf,
        #[source]
        source: FrontendError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
