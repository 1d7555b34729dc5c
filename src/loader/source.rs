//! `@source/...` resolution against the vendor configuration.
//!
//! A pattern like `@goapplib/components/EntityListing.html` names a vendored
//! template: the part after `@` up to the first slash selects a configured
//! source (case-sensitive), and the remainder is a path inside that source's
//! checkout at `vendor_dir/url/path/`. Everything else falls through to the
//! ordinary search-path loader.

use std::path::Path;

use crate::config::VendorConfig;
use crate::core::{Result, TemplarError};
use crate::template::Template;

use super::{FileSystemLoader, TemplateLoader, DEFAULT_EXTENSIONS};

/// A loader that resolves `@source` patterns to vendored locations and
/// delegates everything else to a [`FileSystemLoader`] over the configured
/// search paths.
pub struct SourceLoader {
    config: VendorConfig,
    fs_loader: FileSystemLoader,
    extensions: Vec<String>,
}

impl SourceLoader {
    /// Creates a loader from an already-parsed configuration.
    pub fn new(config: VendorConfig) -> Self {
        let fs_loader = FileSystemLoader::new(config.resolved_search_paths());
        SourceLoader {
            config,
            fs_loader,
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Loads the configuration at `path` and builds a loader from it.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(VendorConfig::load(path)?))
    }

    /// Discovers the configuration upward from `dir` and builds a loader.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(VendorConfig::discover(dir)?))
    }

    /// The configuration backing this loader.
    pub fn config(&self) -> &VendorConfig {
        &self.config
    }

    fn load_vendored(&self, pattern: &str) -> Result<Vec<Template>> {
        let without_at = &pattern[1..];
        let Some(slash) = without_at.find('/') else {
            return Err(TemplarError::Config {
                message: format!("invalid source pattern '{pattern}': expected @source/path"),
            });
        };
        let (source_name, source_path) = (&without_at[..slash], &without_at[slash + 1..]);

        let source = self.config.sources.get(source_name).ok_or_else(|| {
            TemplarError::SourceUndefined {
                source_name: source_name.to_string(),
                pattern: pattern.to_string(),
            }
        })?;

        // vendor_dir/url/path/subpath
        let vendored = self
            .config
            .checkout_dir(source)
            .join(&source.path)
            .join(source_path);
        let folder = vendored.parent().unwrap_or(Path::new("")).to_path_buf();
        let name = vendored
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let scoped = FileSystemLoader::new([folder])
            .with_extensions(self.extensions.iter().cloned());
        scoped.load(&name, Path::new(""))
    }
}

impl TemplateLoader for SourceLoader {
    fn load(&self, pattern: &str, cwd: &Path) -> Result<Vec<Template>> {
        if pattern.starts_with('@') {
            return self.load_vendored(pattern);
        }
        self.fs_loader.load(pattern, cwd)
    }
}
