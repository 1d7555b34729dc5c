//! Templar CLI entry point.
//!
//! Parses arguments, installs the tracing subscriber (`TEMPLAR_LOG` controls
//! the filter), and dispatches to the selected subcommand. Exits non-zero on
//! any unrecoverable error.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use templar::cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TEMPLAR_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        eprintln!("{} {err:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
