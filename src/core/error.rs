//! Error handling for Templar
//!
//! This module provides the typed error enum used throughout the crate, a
//! crate-wide [`Result`] alias, and the [`ErrorMode`] toggle that test
//! harnesses use to promote returned errors into panics.
//!
//! # Error Categories
//!
//! - **Resolution**: [`TemplarError::TemplateNotFound`],
//!   [`TemplarError::SourceUndefined`]
//! - **Host engine**: [`TemplarError::Parse`], [`TemplarError::Execution`],
//!   [`TemplarError::DuplicateDefinition`]
//! - **Directives**: [`TemplarError::DirectiveUsage`],
//!   [`TemplarError::ExtendSourceMissing`]
//! - **I/O, configuration, and vendoring**: [`TemplarError::Io`],
//!   [`TemplarError::Config`], [`TemplarError::Git`]
//!
//! # Design
//!
//! - **One variant per failure mode**: callers match precisely instead of
//!   string-sniffing messages; composite loaders rely on
//!   [`TemplarError::is_not_found`] to decide whether to cascade.
//! - **Cloneable**: the walker records the first fatal error on the
//!   offending template record *and* returns it, so every variant is
//!   `Clone` (the I/O source is held behind an [`Arc`]).
//! - **User-facing `Display`**: messages are written for template authors,
//!   naming the template, pattern, or source involved.
//!
//! Warnings (cycle short-circuits, rejected duplicate dependency edges,
//! skipped loader folders) are never surfaced as errors; they are logged via
//! [`tracing`] at the point of occurrence.
//!
//! # Examples
//!
//! ## Matching on specific failures
//!
//! ```
//! use templar::core::TemplarError;
//!
//! fn explain(err: &TemplarError) -> String {
//!     match err {
//!         TemplarError::TemplateNotFound { name } => {
//!             format!("'{name}' is not on any search path")
//!         }
//!         TemplarError::ExtendSourceMissing { source_name, .. } => {
//!             format!("move the extend after whatever defines '{source_name}'")
//!         }
//!         other => other.to_string(),
//!     }
//! }
//! ```
//!
//! ## Cascading behavior in loaders
//!
//! ```
//! use templar::core::TemplarError;
//!
//! let miss = TemplarError::not_found("page.html");
//! assert!(miss.is_not_found()); // composite loaders try the next member
//!
//! let bad = TemplarError::directive("namespace requires a non-empty name");
//! assert!(!bad.is_not_found()); // anything else stops the search
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TemplarError>;

/// The main error type for template preprocessing, composition and rendering.
///
/// Each variant corresponds to a specific failure mode so callers can match
/// precisely; the `Display` implementations are written for end users.
/// Errors are `Clone` so the walker can both record the first fatal error on
/// the offending template record and return it.
#[derive(Error, Debug, Clone)]
pub enum TemplarError {
    /// No loader could locate the requested pattern, or a registry lookup
    /// missed at render time.
    ///
    /// This is the one error composite loaders treat as non-fatal: a member
    /// returning it lets the next member (and finally the default loader)
    /// try. From the render façade it instead means the chosen entry name
    /// is not defined in the composed registry.
    ///
    /// Common causes:
    /// - the file is not under any configured search path
    /// - a bare name whose extension is not in the accepted list
    /// - a relative include resolved against the wrong file's directory
    /// - rendering an entry that was tree-shaken away
    #[error("template not found: {name}")]
    TemplateNotFound {
        /// The pattern or template name that could not be resolved.
        name: String,
    },

    /// Reading a template file (or config file) failed after it was located.
    ///
    /// Distinct from [`TemplarError::TemplateNotFound`]: the path existed
    /// when probed, but reading it failed (permissions, a directory where a
    /// file was expected, I/O fault). Composite loaders do *not* cascade
    /// past this.
    #[error("failed to read {}", path.display())]
    Io {
        /// The path that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The host engine rejected the source text of a template.
    ///
    /// Raised both during the directive pass (malformed `{{# ... #}}`
    /// content, unclosed actions) and when the composition engine parses a
    /// record's residue (unbalanced `{{ define }}` / `{{ end }}`, bad
    /// expressions). The line number refers to the original source of the
    /// named template.
    #[error("parse error in {name} at line {line}: {message}")]
    Parse {
        /// Display name or path of the offending template.
        name: String,
        /// 1-based line of the offending token.
        line: usize,
        /// Engine diagnostic.
        message: String,
    },

    /// The host engine failed while executing a tree.
    ///
    /// Typical causes: a template call to a name missing from the registry,
    /// a function that is not bound in the group's func map, a `range` over
    /// a non-iterable value, or call recursion exceeding the engine's depth
    /// limit (a composed-but-cyclic call graph).
    #[error("execution error in {name}: {message}")]
    Execution {
        /// Name of the tree being executed.
        name: String,
        /// Engine diagnostic.
        message: String,
    },

    /// An `@name/...` pattern referenced a source that is not declared in the
    /// vendor configuration.
    ///
    /// Source names are case-sensitive: `@UIKit/...` does not match a source
    /// declared as `uikit`. The fix is declaring the source in
    /// `templar.yaml` (and running `templar get`), not a search-path change.
    #[error("source '{source_name}' is not defined in templar.yaml (pattern: {pattern})")]
    SourceUndefined {
        /// The undeclared source name.
        source_name: String,
        /// The full pattern that referenced it.
        pattern: String,
    },

    /// A directive was malformed.
    ///
    /// Raised at preprocess time, before any loading happens for the
    /// directive: missing arguments, a non-string argument, an odd
    /// rewrite-pair count on `extend`, or an empty namespace / destination
    /// name. The message names the exact requirement that was violated.
    #[error("invalid directive: {message}")]
    DirectiveUsage {
        /// What was wrong with the directive.
        message: String,
    },

    /// An `extend` directive could not be materialized because a template it
    /// references was absent from the registry once all trees were present.
    ///
    /// Either the `source` template itself, or one of the rewrite targets,
    /// is missing. Because extensions materialize in walk order, a chain
    /// must list inner extensions before the outer ones that reference
    /// their destinations; reversing them triggers this error on the outer
    /// extension.
    #[error("cannot extend '{source_name}' as '{dest}': source template not found")]
    ExtendSourceMissing {
        /// The missing template name (the extension's source, or a rewrite
        /// target).
        source_name: String,
        /// The destination name the extension wanted to create.
        dest: String,
    },

    /// The registry already holds a different tree under this name.
    ///
    /// Re-adding an *identical* definition is silently accepted (diamond
    /// includes re-add the same trees); this error means two genuinely
    /// different bodies claimed one name. Surfaced when a namespace rewrite
    /// collides with an existing definition, when an extension's
    /// destination name is taken, or when two files define the same global
    /// template differently.
    #[error("duplicate template definition: {name}")]
    DuplicateDefinition {
        /// The colliding tree name.
        name: String,
    },

    /// The vendor configuration could not be found or parsed.
    ///
    /// Covers a missing `templar.yaml` (after walking every parent
    /// directory), YAML syntax errors, an unreadable lock file, and invalid
    /// `@source` pattern shapes (`@name` without a subpath).
    #[error("configuration error: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },

    /// An external `git` invocation failed while fetching a source.
    ///
    /// The stderr captured from the git process is carried verbatim; the
    /// operation names which step failed (clone, fetch, checkout,
    /// rev-parse). Only `templar get` paths produce this; rendering never
    /// shells out.
    #[error("git {operation} failed: {stderr}")]
    Git {
        /// The git operation that failed (clone, fetch, checkout, rev-parse).
        operation: String,
        /// Captured stderr from the git process.
        stderr: String,
    },
}

impl TemplarError {
    /// True for the not-found condition that composite loaders cascade past.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TemplarError::TemplateNotFound { .. })
    }

    /// Convenience constructor for the common lookup miss.
    pub fn not_found(name: impl Into<String>) -> Self {
        TemplarError::TemplateNotFound { name: name.into() }
    }

    /// Convenience constructor for directive misuse.
    pub fn directive(message: impl Into<String>) -> Self {
        TemplarError::DirectiveUsage { message: message.into() }
    }

    /// Convenience constructor wrapping a read failure.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplarError::Io { path: path.into(), source: Arc::new(source) }
    }
}

/// Controls what happens when the walker or composition engine hits a fatal
/// error: propagate it as a `Result`, or abort the process.
///
/// Panicking is meant for test harnesses that want a stack trace at the
/// first failure instead of an error value that may be handled levels above;
/// production callers should leave this at [`ErrorMode::Propagate`]. The
/// mode is a field on the walker and the group rather than a global, but
/// [`ErrorMode::from_env`] gives harnesses the traditional environment
/// switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Return errors to the caller (the default).
    #[default]
    Propagate,
    /// Panic on the first error.
    Panic,
}

impl ErrorMode {
    /// Reads the mode from the environment. `TEMPLAR_PANIC_ON_ERRORS=true`
    /// (or the legacy `PANIC_ON_ALL_ERRORS=true`) selects [`ErrorMode::Panic`].
    pub fn from_env() -> Self {
        let truthy = |var: &str| std::env::var(var).map(|v| v == "true").unwrap_or(false);
        if truthy("TEMPLAR_PANIC_ON_ERRORS") || truthy("PANIC_ON_ALL_ERRORS") {
            ErrorMode::Panic
        } else {
            ErrorMode::Propagate
        }
    }

    /// Applies the mode to an error about to be returned.
    pub fn apply(self, err: TemplarError) -> TemplarError {
        match self {
            ErrorMode::Propagate => err,
            ErrorMode::Panic => panic!("{err}"),
        }
    }
}
