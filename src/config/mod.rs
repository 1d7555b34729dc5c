//! Vendor configuration (`templar.yaml`) and lock file (`templar.lock`).
//!
//! The configuration declares named sources (git repositories templates can
//! be pulled from), the vendor directory they are checked out into, and the
//! ordered local search paths. The lock file pins each source to the commit
//! that was actually fetched, for reproducible builds.
//!
//! Discovery walks upward from a start directory, accepting `templar.yaml`
//! or `.templar.yaml`. Relative paths inside the file resolve against the
//! directory containing it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Result, TemplarError};

/// Default vendor directory when the config does not set one.
pub const DEFAULT_VENDOR_DIR: &str = "./templar_modules";

/// Config file names probed during discovery, in order.
const CONFIG_FILE_NAMES: &[&str] = &["templar.yaml", ".templar.yaml"];

/// One external template source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Repository URL; `github.com/...` shorthand is accepted.
    #[serde(default)]
    pub url: String,
    /// Optional path suffix inside the repository.
    #[serde(default)]
    pub path: String,
    /// Git ref to check out (branch, tag or commit).
    #[serde(default)]
    pub r#ref: String,
}

/// The parsed `templar.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Named sources; names are case-sensitive.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
    /// Where sources are vendored, relative to the config file.
    #[serde(default)]
    pub vendor_dir: PathBuf,
    /// Ordered local search roots.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    /// When set, `@source` loads require an up-to-date lock file.
    #[serde(default)]
    pub require_lock: bool,

    /// Directory containing the config file; anchor for relative paths.
    #[serde(skip)]
    config_dir: PathBuf,
}

impl VendorConfig {
    /// Loads and parses a config file, applying defaults for omitted fields.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|source| TemplarError::io(path, source))?;
        let mut config: VendorConfig =
            serde_yaml::from_str(&data).map_err(|err| TemplarError::Config {
                message: format!("failed to parse {}: {err}", path.display()),
            })?;
        config.config_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.apply_defaults();
        Ok(config)
    }

    /// Searches for a config file starting at `start_dir` and walking up to
    /// the filesystem root.
    pub fn find(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let start = start_dir.as_ref();
        let mut dir = start
            .canonicalize()
            .unwrap_or_else(|_| start.to_path_buf());
        loop {
            for name in CONFIG_FILE_NAMES {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
            if !dir.pop() {
                return Err(TemplarError::Config {
                    message: format!(
                        "templar.yaml not found in {} or any parent directory",
                        start.display()
                    ),
                });
            }
        }
    }

    /// [`VendorConfig::find`] followed by [`VendorConfig::load`].
    pub fn discover(start_dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(Self::find(start_dir)?)
    }

    fn apply_defaults(&mut self) {
        if self.vendor_dir.as_os_str().is_empty() {
            self.vendor_dir = PathBuf::from(DEFAULT_VENDOR_DIR);
        }
        if self.search_paths.is_empty() {
            self.search_paths = vec![PathBuf::from("./templates"), self.vendor_dir.clone()];
        }
    }

    /// Absolute vendor directory.
    pub fn resolved_vendor_dir(&self) -> PathBuf {
        self.resolve(&self.vendor_dir)
    }

    /// Absolute search paths, in configured order.
    pub fn resolved_search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.iter().map(|p| self.resolve(p)).collect()
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Path of the lock file companion to this config.
    pub fn lock_path(&self) -> PathBuf {
        self.config_dir.join("templar.lock")
    }

    /// Directory a source's checkout lands in: `vendor_dir/url`.
    ///
    /// The URL is always treated as a relative path under the vendor
    /// directory, so local absolute-path URLs mirror into the vendor tree
    /// instead of escaping it.
    pub fn checkout_dir(&self, source: &SourceConfig) -> PathBuf {
        let url = source.url.trim_start_matches('/');
        self.resolved_vendor_dir().join(url)
    }
}

/// The parsed `templar.lock`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VendorLock {
    /// Lock format version.
    #[serde(default)]
    pub version: u32,
    /// Locked sources by name.
    #[serde(default)]
    pub sources: BTreeMap<String, LockedSource>,
}

/// One pinned source in the lock file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LockedSource {
    /// Repository URL at lock time.
    pub url: String,
    /// Requested ref at lock time.
    pub r#ref: String,
    /// Commit the ref resolved to.
    pub resolved_commit: String,
    /// RFC 3339 timestamp of the fetch.
    pub fetched_at: String,
}

impl VendorLock {
    /// Loads a lock file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|source| TemplarError::io(path, source))?;
        serde_yaml::from_str(&data).map_err(|err| TemplarError::Config {
            message: format!("failed to parse {}: {err}", path.display()),
        })
    }

    /// Writes the lock file with its auto-generated header.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let body = serde_yaml::to_string(self).map_err(|err| TemplarError::Config {
            message: format!("failed to serialize lock file: {err}"),
        })?;
        let content = format!(
            "# AUTO-GENERATED - Do not edit manually\n# Run 'templar get' to regenerate\n\n{body}"
        );
        std::fs::write(path, content)
            .map_err(|source| TemplarError::io(path, source))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const SAMPLE: &str = r#"
sources:
  goapplib:
    url: github.com/panyam/goapplib
    path: templates
    ref: main
  widgets:
    url: github.com/example/widgets
vendor_dir: ./vendored
search_paths:
  - ./templates
  - ./vendored
require_lock: true
"#;

    #[test]
    fn test_parse_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templar.yaml");
        fs::write(&path, SAMPLE).unwrap();

        let config = VendorConfig::load(&path).unwrap();
        assert_eq!(config.sources.len(), 2);
        let goapplib = &config.sources["goapplib"];
        assert_eq!(goapplib.url, "github.com/panyam/goapplib");
        assert_eq!(goapplib.path, "templates");
        assert_eq!(goapplib.r#ref, "main");
        assert_eq!(config.sources["widgets"].r#ref, "");
        assert!(config.require_lock);
        assert_eq!(config.resolved_vendor_dir(), dir.path().join("./vendored"));
    }

    #[test]
    fn test_defaults_applied() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templar.yaml");
        fs::write(&path, "sources: {}\n").unwrap();

        let config = VendorConfig::load(&path).unwrap();
        assert_eq!(config.vendor_dir, PathBuf::from(DEFAULT_VENDOR_DIR));
        assert_eq!(
            config.search_paths,
            vec![PathBuf::from("./templates"), PathBuf::from(DEFAULT_VENDOR_DIR)]
        );
        assert!(!config.require_lock);
    }

    #[test]
    fn test_checkout_dir_keeps_urls_inside_vendor_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templar.yaml");
        fs::write(&path, SAMPLE).unwrap();
        let config = VendorConfig::load(&path).unwrap();

        let hosted = SourceConfig { url: "github.com/panyam/goapplib".to_string(), ..Default::default() };
        assert_eq!(
            config.checkout_dir(&hosted),
            config.resolved_vendor_dir().join("github.com/panyam/goapplib")
        );

        // An absolute local URL must not escape the vendor directory.
        let local = SourceConfig { url: "/srv/repos/widgets".to_string(), ..Default::default() };
        assert_eq!(
            config.checkout_dir(&local),
            config.resolved_vendor_dir().join("srv/repos/widgets")
        );
    }

    #[test]
    fn test_find_walks_parents() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a/b/c");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("templar.yaml"), "sources: {}\n").unwrap();

        let found = VendorConfig::find(&nested).unwrap();
        assert_eq!(
            found.canonicalize().unwrap(),
            dir.path().join("templar.yaml").canonicalize().unwrap()
        );
    }

    #[test]
    fn test_find_accepts_hidden_variant() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".templar.yaml"), "sources: {}\n").unwrap();
        let found = VendorConfig::find(dir.path()).unwrap();
        assert!(found.ends_with(".templar.yaml"));
    }

    #[test]
    fn test_find_missing_errors() {
        let dir = TempDir::new().unwrap();
        let err = VendorConfig::find(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_lock_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templar.lock");

        let mut lock = VendorLock { version: 1, sources: BTreeMap::new() };
        lock.sources.insert(
            "goapplib".to_string(),
            LockedSource {
                url: "github.com/panyam/goapplib".to_string(),
                r#ref: "main".to_string(),
                resolved_commit: "abc123".to_string(),
                fetched_at: "2024-01-01T00:00:00Z".to_string(),
            },
        );
        lock.write(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# AUTO-GENERATED"));

        let loaded = VendorLock::load(&path).unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.sources["goapplib"].resolved_commit, "abc123");
    }
}
