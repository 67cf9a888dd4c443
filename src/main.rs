//! fieldguard CLI entry point

use clap::Parser;
use fieldguard::cli::{Cli, Command, EXIT_ERROR, EXIT_SUCCESS};
use fieldguard::cli::init::InitOutcome;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FIELDGUARD_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Command::Init { force } => match fieldguard::cli::init::run_init(force) {
            Ok(InitOutcome::Skipped) => {
                eprintln!("fieldguard.toml already exists. Use --force to overwrite it.");
                EXIT_SUCCESS
            }
            Ok(_) => {
                println!("Created fieldguard.toml.");
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                EXIT_ERROR
            }
        },
        Command::Generate { paths, format } => {
            fieldguard::cli::generate::run_generate(&paths, format, cli.color)
        }
        Command::Check { paths, format } => {
            fieldguard::cli::check::run_check(&paths, format, cli.color)
        }
        Command::List { format } => fieldguard::cli::list::run_list(format),
        Command::Expr {
            expression,
            value_type,
        } => fieldguard::cli::expr::run_expr(&expression, &value_type),
    };

    process::exit(exit_code);
}
