//! CLI argument parsing and command dispatch

pub mod args;
pub mod check;
mod common;
pub mod expr;
pub mod generate;
pub mod init;
pub mod list;

// Re-export types for convenient access
pub use args::{Cli, ColorChoice, Command, OutputFormat};
pub use common::{EXIT_CHECK_FAILED, EXIT_ERROR, EXIT_PARSE_ERROR, EXIT_SUCCESS};
