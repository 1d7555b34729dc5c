//! List configured sources and their lock status.
//!
//! `templar sources` prints one line per source declared in `templar.yaml`:
//! the name, URL, requested ref, and whether the source is pinned in
//! `templar.lock` (and at which commit). A missing lock file is not an
//! error; every source simply shows as not fetched.
//!
//! # Examples
//!
//! ```bash
//! $ templar sources
//! goapplib github.com/panyam/goapplib (main) locked @ 0123abc
//! widgets github.com/example/widgets (default) not fetched
//! ```

use std::path::Path;

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use crate::config::VendorLock;

/// Arguments for `templar sources`.
#[derive(Args)]
pub struct SourcesCommand {}

impl SourcesCommand {
    /// Prints every configured source with its URL, ref, and locked commit.
    ///
    /// Succeeds whether or not a lock file exists; only a missing or
    /// unparsable configuration is an error.
    pub fn execute(self, config: Option<&Path>) -> Result<()> {
        let config = super::load_config(config)?;
        let lock = VendorLock::load(config.lock_path()).unwrap_or_default();

        if config.sources.is_empty() {
            println!("no sources configured");
            return Ok(());
        }

        for (name, source) in &config.sources {
            let status = match lock.sources.get(name) {
                Some(locked) => format!("locked @ {}", locked.resolved_commit).green(),
                None => "not fetched".yellow(),
            };
            let r#ref = if source.r#ref.is_empty() { "default" } else { &source.r#ref };
            println!("{} {} ({}) {}", name.bold(), source.url, r#ref, status);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_sources_with_empty_config() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("templar.yaml");
        fs::write(&config_path, "sources: {}\n").unwrap();

        SourcesCommand {}.execute(Some(&config_path)).unwrap();
    }

    #[test]
    fn test_sources_tolerates_missing_lock() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("templar.yaml");
        fs::write(
            &config_path,
            "sources:\n  widgets:\n    url: github.com/example/widgets\n",
        )
        .unwrap();

        SourcesCommand {}.execute(Some(&config_path)).unwrap();
    }

    #[test]
    fn test_sources_with_lock_present() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("templar.yaml");
        fs::write(
            &config_path,
            "sources:\n  widgets:\n    url: github.com/example/widgets\n    ref: main\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("templar.lock"),
            "version: 1\nsources:\n  widgets:\n    url: github.com/example/widgets\n    ref: main\n    resolved_commit: 0123abcd\n    fetched_at: '2024-01-01T00:00:00+00:00'\n",
        )
        .unwrap();

        SourcesCommand {}.execute(Some(&config_path)).unwrap();
    }

    #[test]
    fn test_sources_without_config_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("templar.yaml");
        assert!(SourcesCommand {}.execute(Some(&missing)).is_err());
    }
}
