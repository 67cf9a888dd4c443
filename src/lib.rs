#![forbid(unsafe_code)]

//! fieldguard: compile field markers into reflection-free Rust validators
//!
//! Records declared in Rust source carry markers on their fields
//! (`/// +required`, `#[validate("min=18")]`, `/// +cel=size(value) < 64`).
//! fieldguard walks every field, instantiates the rules the markers name,
//! compiles CEL-like expressions to plain Rust, and writes a sibling module
//! with one `validate` method per record.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod expr;
pub mod frontend;
pub mod markers;
pub mod output;
pub mod rules;
pub mod types;

// Re-export error types for convenient access
pub use error::{ConfigError, ExprError, FieldguardError, FrontendError, RuleError};

// Re-export core domain types for convenient access
pub use types::{
    FieldDescriptor, FieldPath, GlobPattern, RecordDescriptor, RuleId, Schema, Severity, TypeKind,
};
