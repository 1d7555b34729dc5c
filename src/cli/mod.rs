//! Command-line interface for Templar.
//!
//! Each subcommand lives in its own module with its own argument struct and
//! an `execute` method:
//!
//! - `debug` - walk a template and dump its dependency tree, cut include
//!   cycles, references, DOT graph, or flattened residues
//! - `get` - fetch configured sources into the vendor directory and merge
//!   the results into the lock file (with `--update`, `--verify`, and
//!   `--dry-run` modes)
//! - `sources` - list configured sources and their lock status
//! - `init` - scaffold a `templar.yaml` in the current directory
//!
//! Configuration precedence is flag > `TEMPLAR_`-prefixed environment
//! variable > discovered config file > built-in default; the `--config` flag
//! and `TEMPLAR_CONFIG` are wired through clap's `env` support.

pub mod debug;
pub mod get;
pub mod init;
pub mod sources;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::VendorConfig;

/// Top-level argument parser for the `templar` binary.
#[derive(Parser)]
#[command(
    name = "templar",
    version,
    about = "Template composition preprocessor: dependency management, namespacing, \
             tree-shaking and block-level extension for text templates"
)]
pub struct Cli {
    /// Path to templar.yaml; discovered upward from the current directory
    /// when omitted.
    #[arg(long, global = true, env = "TEMPLAR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Inspect a template's dependency graph and references
    Debug(debug::DebugCommand),
    /// Fetch configured sources and update the lock file
    Get(get::GetCommand),
    /// List configured sources and their lock status
    Sources(sources::SourcesCommand),
    /// Scaffold a templar.yaml in the current directory
    Init(init::InitCommand),
}

impl Cli {
    /// Runs the selected subcommand.
    pub fn execute(self) -> Result<()> {
        match self.command {
            Commands::Debug(cmd) => cmd.execute(self.config.as_deref()),
            Commands::Get(cmd) => cmd.execute(self.config.as_deref()),
            Commands::Sources(cmd) => cmd.execute(self.config.as_deref()),
            Commands::Init(cmd) => cmd.execute(),
        }
    }
}

/// Loads the configuration from an explicit path or by upward discovery.
pub(crate) fn load_config(explicit: Option<&std::path::Path>) -> Result<VendorConfig> {
    match explicit {
        Some(path) => Ok(VendorConfig::load(path)?),
        None => Ok(VendorConfig::discover(std::env::current_dir()?)?),
    }
}
