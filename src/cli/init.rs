//! Initialize a fieldguard project
//!
//! Writes a commented `fieldguard.toml` to the current directory.

use crate::config::CONFIG_FILE;
use std::fs;
use std::path::Path;

/// Default content for fieldguard.toml
const DEFAULT_FIELDGUARD_TOML: &str = r#"[fieldguard]
version = "1"

# Source files to scan (relative to the directory passed to `generate`)
include = ["**/*.rs"]

# Source files to skip
# exclude = ["**/legacy/**"]

[rules]
# Built-in rules are enabled by default
# Disable a rule: email = false
# Override a message: required = { message = "{field} must be set" }

[output]
# Generated files are written next to their source: user.rs -> user_validate.rs
suffix = "_validate.rs"
format = "human"
color = "auto"
"#;

/// Error type for init command
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What init did with the configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    Skipped,
    Overwritten,
}

/// Run the init command
///
/// Creates fieldguard.toml in the current directory. An existing file is
/// left untouched unless `force` is set.
pub fn run_init(force: bool) -> Result<InitOutcome, InitError> {
    let path = Path::new(CONFIG_FILE);
    let outcome = match (path.exists(), force) {
        (true, false) => return Ok(InitOutcome::Skipped),
        (true, true) => InitOutcome::Overwritten,
        (false, _) => InitOutcome::Created,
    };
    fs::write(path, DEFAULT_FIELDGUARD_TOML)?;
    Ok(outcome)
}
