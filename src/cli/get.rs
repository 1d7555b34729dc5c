//! Fetch external template sources into the vendor directory.
//!
//! This module implements `templar get`, which clones or updates the sources
//! declared in `templar.yaml` and pins the resolved commits in
//! `templar.lock`. Besides plain fetching it supports a dry-run preview, a
//! lock-verification mode, and a forced update of sources that are already
//! checked out.
//!
//! # Examples
//!
//! ```bash
//! # Fetch all configured sources
//! templar get
//!
//! # Fetch a specific source (the @ prefix is optional)
//! templar get @uikit
//!
//! # Re-fetch sources that already have a checkout and lock entry
//! templar get --update
//!
//! # Cross-check the lock file against the vendor directory
//! templar get --verify
//!
//! # Show what would be fetched without doing it
//! templar get --dry-run
//! ```
//!
//! # Lock file behavior
//!
//! The lock file is merged, not replaced: fetching a single source rewrites
//! only that source's entry and preserves every other pinned source. This
//! keeps `templar get somesource` safe to run in a project with many locked
//! sources.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;

use crate::config::{VendorConfig, VendorLock};
use crate::vendor::{fetch::lock_from_results, fetch_source, FetchResult};

/// Arguments for `templar get`.
///
/// The three mode flags are mutually independent in parsing but are applied
/// in a fixed precedence: `--dry-run` wins over `--verify`, which wins over
/// fetching. `--update` only matters in fetch mode.
#[derive(Args)]
pub struct GetCommand {
    /// Sources to fetch, with or without a leading `@`. All configured
    /// sources when empty.
    pub sources: Vec<String>,

    /// Re-fetch sources even when they already have a checkout and a lock
    /// entry. Without this flag such sources are reported as up to date and
    /// skipped.
    #[arg(short = 'u', long)]
    pub update: bool,

    /// Verify that the vendor directory matches the lock file instead of
    /// fetching: every selected source must have a lock entry and an
    /// existing checkout.
    #[arg(long)]
    pub verify: bool,

    /// Show what would be fetched without touching the network or the
    /// filesystem.
    #[arg(long)]
    pub dry_run: bool,
}

impl GetCommand {
    /// Runs the selected mode against the discovered (or explicitly given)
    /// configuration.
    ///
    /// # Behavior
    ///
    /// - With no sources configured, prints a notice and succeeds.
    /// - `--dry-run` prints each selected source's URL, ref, and checkout
    ///   destination, then returns without side effects.
    /// - `--verify` loads `templar.lock` and checks each selected source has
    ///   a lock entry and a checkout directory; any mismatch fails after the
    ///   full report is printed.
    /// - Otherwise each selected source is fetched (skipping ones that are
    ///   already locked and checked out, unless `--update`), and the lock
    ///   file is rewritten with the new entries merged over the existing
    ///   ones.
    ///
    /// # Errors
    ///
    /// Fails when the configuration cannot be found, a named source is not
    /// declared, `--verify` finds a mismatch or no lock file, or a git fetch
    /// fails.
    pub fn execute(self, config: Option<&Path>) -> Result<()> {
        let config = super::load_config(config)?;
        if config.sources.is_empty() {
            println!("no sources configured in templar.yaml");
            return Ok(());
        }

        let selected = self.select_sources(&config)?;
        if self.dry_run {
            return dry_run(&config, &selected);
        }
        if self.verify {
            return verify(&config, &selected);
        }
        fetch(&config, &selected, self.update)
    }

    /// Resolves the positional source names, accepting an optional `@`
    /// prefix and rejecting names the configuration does not declare.
    fn select_sources(&self, config: &VendorConfig) -> Result<Vec<String>> {
        if self.sources.is_empty() {
            return Ok(config.sources.keys().cloned().collect());
        }
        let mut selected = Vec::new();
        for raw in &self.sources {
            let name = raw.strip_prefix('@').unwrap_or(raw);
            if !config.sources.contains_key(name) {
                return Err(anyhow!("source '{name}' not found in templar.yaml"));
            }
            selected.push(name.to_string());
        }
        Ok(selected)
    }
}

/// Prints the fetch plan without executing it.
fn dry_run(config: &VendorConfig, selected: &[String]) -> Result<()> {
    println!("Would fetch:");
    for name in selected {
        let source = &config.sources[name];
        let r#ref = if source.r#ref.is_empty() { "default" } else { &source.r#ref };
        println!(
            "  {}: {}@{} -> {}",
            name.bold(),
            source.url,
            r#ref,
            config.checkout_dir(source).display()
        );
    }
    Ok(())
}

/// Cross-checks the lock file against the vendor directory.
///
/// Reports every selected source before failing, so a broken project shows
/// all problems at once.
fn verify(config: &VendorConfig, selected: &[String]) -> Result<()> {
    let lock = VendorLock::load(config.lock_path())
        .map_err(|err| anyhow!("no lock file found: {err}"))?;

    let mut all_good = true;
    for name in selected {
        let source = &config.sources[name];
        let Some(locked) = lock.sources.get(name) else {
            println!("{} {}: not in lock file", "✗".red(), name.bold());
            all_good = false;
            continue;
        };
        if !config.checkout_dir(source).is_dir() {
            println!("{} {}: not fetched", "✗".red(), name.bold());
            all_good = false;
            continue;
        }
        let commit = locked.resolved_commit.get(..7).unwrap_or(locked.resolved_commit.as_str());
        println!("{} {}: matches lock ({})", "✓".green(), name.bold(), commit);
    }

    if !all_good {
        return Err(anyhow!("verification failed"));
    }
    Ok(())
}

/// Fetches the selected sources and merges the results into the lock file.
fn fetch(config: &VendorConfig, selected: &[String], update: bool) -> Result<()> {
    let lock_path = config.lock_path();
    // Load the existing lock first so entries we do not touch survive, and
    // so the up-to-date check can consult it.
    let mut lock = VendorLock::load(&lock_path).unwrap_or_default();

    let mut results: BTreeMap<String, FetchResult> = BTreeMap::new();
    for name in selected {
        let source = &config.sources[name];
        if !update && lock.sources.contains_key(name) && config.checkout_dir(source).is_dir() {
            println!("{} {} (use --update to re-fetch)", "up to date".dimmed(), name.bold());
            continue;
        }
        let result = fetch_source(config, name)?;
        println!(
            "{} {} {} {}",
            "fetched".green(),
            name.bold(),
            result.r#ref,
            result.resolved_commit.dimmed()
        );
        results.insert(name.clone(), result);
    }

    if results.is_empty() {
        return Ok(());
    }

    let fresh = lock_from_results(&results);
    lock.version = fresh.version;
    lock.sources.extend(fresh.sources);
    lock.write(&lock_path)?;
    println!("{} {}", "wrote".green(), lock_path.display());
    Ok(())
}
