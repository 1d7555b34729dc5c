//! Initialize a new Templar project with a configuration file.
//!
//! This module provides the `init` command, which scaffolds a `templar.yaml`
//! in the target directory (the current directory by default) and creates
//! the conventional `templates/` search root next to it.
//!
//! # Examples
//!
//! ```bash
//! # Initialize the current directory
//! templar init
//!
//! # Initialize a specific directory
//! templar init --path ./my-site
//!
//! # Overwrite an existing templar.yaml
//! templar init --force
//! ```
//!
//! # Generated configuration
//!
//! The scaffold declares no sources; it documents the source syntax in a
//! comment and sets the conventional defaults:
//!
//! ```yaml
//! sources:
//!   # goapplib:
//!   #   url: github.com/panyam/goapplib
//!   #   path: templates
//!   #   ref: main
//!
//! vendor_dir: ./templar_modules
//!
//! search_paths:
//!   - ./templates
//!   - ./templar_modules
//! ```
//!
//! # Error conditions
//!
//! - A `templar.yaml` already exists and `--force` was not given
//! - The target directory cannot be created or written
//!
//! # Safety
//!
//! Safe to run repeatedly: without `--force` it never overwrites an existing
//! configuration, and the `templates/` directory is created only if missing.

use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;

const TEMPLATE: &str = r#"# Templar configuration
sources:
  # goapplib:
  #   url: github.com/panyam/goapplib
  #   path: templates
  #   ref: main

vendor_dir: ./templar_modules

search_paths:
  - ./templates
  - ./templar_modules
"#;

/// Arguments for `templar init`.
#[derive(Args)]
pub struct InitCommand {
    /// Directory to initialize; defaults to the current directory.
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing templar.yaml.
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    /// Writes the scaffold config and creates the templates directory.
    ///
    /// The target directory is created if missing. An existing
    /// `templar.yaml` is only replaced under `--force`; everything else in
    /// the directory is left alone.
    pub fn execute(self) -> Result<()> {
        let dir = match self.path {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        fs::create_dir_all(&dir)?;

        let config_path = dir.join("templar.yaml");
        if config_path.exists() && !self.force {
            return Err(anyhow!(
                "{} already exists (use --force to overwrite)",
                config_path.display()
            ));
        }

        fs::write(&config_path, TEMPLATE)?;
        fs::create_dir_all(dir.join("templates"))?;
        println!("{} {}", "wrote".green(), config_path.display());
        Ok(())
    }
}
