//! CLI argument parsing using clap

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for fieldguard commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON Lines format (one JSON object per line)
    Jsonl,
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Automatically detect if terminal supports color
    Auto,
    /// Always use color
    Always,
    /// Never use color
    Never,
}

/// fieldguard CLI main entry point
#[derive(Parser, Debug)]
#[command(name = "fieldguard")]
#[command(about = "Compile field markers into reflection-free Rust validators")]
#[command(version)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Output coloring (overrides [output].color)
    #[arg(long, global = true)]
    pub color: Option<ColorChoice>,
}

/// Available fieldguard subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write validator modules next to annotated source files
    Generate {
        /// Paths to scan (defaults to current directory)
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Output format (overrides [output].format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Verify that generated modules are up to date without writing them
    Check {
        /// Paths to scan (defaults to current directory)
        #[arg(default_value = ".")]
        paths: Vec<String>,

        /// Output format (overrides [output].format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Create fieldguard.toml in this directory
    Init {
        /// Overwrite an existing fieldguard.toml
        #[arg(long)]
        force: bool,
    },

    /// List the rule catalogue
    List {
        /// Output format (overrides [output].format)
        #[arg(short, long)]
        format: Option<OutputFormat>,
    },

    /// Compile one expression and print the Rust guard
    Expr {
        /// Expression over `value` (and `this` for record-level checks)
        expression: String,

        /// Rust type bound to `value`
        #[arg(long = "type", default_value = "String")]
        value_type: String,
    },
}
