//! Template loaders: resolving a logical pattern to raw template records.
//!
//! A pattern may be a bare name (probed against the loader's accepted
//! extensions), a name with an extension (only that extension), a relative
//! path (resolved strictly against the caller's `cwd`), an absolute path, or
//! an `@source/subpath` form handled by [`source::SourceLoader`].
//!
//! Precedence: with an empty `cwd` only the configured folders are searched.
//! With a non-empty `cwd`, relative patterns search `cwd` alone, and
//! non-relative patterns search the folders first with `cwd` appended as the
//! lowest-priority fallback.

pub mod source;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::core::{Result, TemplarError};
use crate::template::Template;

pub use source::SourceLoader;

/// Default extension probe order for bare names.
pub const DEFAULT_EXTENSIONS: &[&str] = &["tmpl", "tmplus", "html"];

/// Resolves a pattern plus current directory into raw template records.
///
/// Implementations return a non-empty list on success, with `raw` and `path`
/// populated and every other field zeroed. An empty `cwd` path means "no
/// current directory".
pub trait TemplateLoader {
    /// Loads all records matching `pattern`.
    fn load(&self, pattern: &str, cwd: &Path) -> Result<Vec<Template>>;
}

/// Loads templates from an ordered list of filesystem folders.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    /// Search roots, in priority order.
    pub folders: Vec<PathBuf>,
    /// Accepted extensions for bare names, in probe order.
    pub extensions: Vec<String>,
}

impl FileSystemLoader {
    /// Creates a loader over `folders` with the default extensions.
    pub fn new(folders: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        FileSystemLoader {
            folders: folders.into_iter().map(Into::into).collect(),
            extensions: DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replaces the accepted extensions.
    pub fn with_extensions(mut self, extensions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
}

impl TemplateLoader for FileSystemLoader {
    fn load(&self, pattern: &str, cwd: &Path) -> Result<Vec<Template>> {
        // An explicit extension restricts the probe to exactly that extension.
        let explicit_ext = Path::new(pattern)
            .extension()
            .map(|e| e.to_string_lossy().into_owned());
        let (stem, extensions): (&str, Vec<String>) = match &explicit_ext {
            Some(ext) => (&pattern[..pattern.len() - ext.len() - 1], vec![ext.clone()]),
            None => (pattern, self.extensions.clone()),
        };

        let is_relative = pattern.starts_with("./") || pattern.starts_with("../");
        let mut folders: Vec<PathBuf> = Vec::new();
        if cwd.as_os_str().is_empty() {
            folders.extend(self.folders.iter().cloned());
        } else if is_relative {
            // Relative paths resolve strictly against the including file.
            folders.push(cwd.to_path_buf());
        } else {
            folders.extend(self.folders.iter().cloned());
            folders.push(cwd.to_path_buf());
        }

        for folder in &folders {
            if !folder.is_dir() {
                warn!(folder = %folder.display(), "skipping search folder: not a directory");
                continue;
            }
            for ext in &extensions {
                let candidate = folder.join(format!("{stem}.{ext}"));
                debug!(candidate = %candidate.display(), "probing");
                if candidate.is_file() {
                    let path = candidate.canonicalize().unwrap_or(candidate);
                    let raw = std::fs::read(&path)
                        .map_err(|source| TemplarError::io(path.clone(), source))?;
                    return Ok(vec![Template::from_file(path, raw)]);
                }
            }
        }
        Err(TemplarError::not_found(pattern))
    }
}

/// A composite loader that tries members in order.
///
/// Not-found errors cascade to the next member; any other error stops the
/// search. When every member misses, the default loader (if any) gets the
/// last word.
#[derive(Default)]
pub struct LoaderList {
    loaders: Vec<Box<dyn TemplateLoader>>,
    /// Consulted after every member has returned not-found.
    pub default_loader: Option<Box<dyn TemplateLoader>>,
}

impl LoaderList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a member loader.
    pub fn add_loader(&mut self, loader: impl TemplateLoader + 'static) -> &mut Self {
        self.loaders.push(Box::new(loader));
        self
    }
}

impl TemplateLoader for LoaderList {
    fn load(&self, pattern: &str, cwd: &Path) -> Result<Vec<Template>> {
        for loader in &self.loaders {
            match loader.load(pattern, cwd) {
                Ok(records) if !records.is_empty() => return Ok(records),
                Ok(_) => continue,
                Err(err) if err.is_not_found() => continue,
                Err(err) => return Err(err),
            }
        }
        if let Some(default) = &self.default_loader {
            return default.load(pattern, cwd);
        }
        Err(TemplarError::not_found(pattern))
    }
}
