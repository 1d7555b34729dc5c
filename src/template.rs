//! Template records and the per-walk record store.
//!
//! A [`Template`] is one unit of raw source: file-backed (canonical path) or
//! inline (empty path). Records are created by loaders or callers, mutated by
//! the walker while preprocessing, and read by the composition engine.
//! Records live in a [`TemplateStore`] arena addressed by [`TemplateId`], so
//! dependency edges are plain ids and cyclic include graphs need no ownership
//! cycles.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::warn;

use crate::core::TemplarError;

/// Handle to a [`Template`] inside a [`TemplateStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(usize);

/// A pending `extend` directive: copy `source` as `dest`, rewriting the
/// direct template-call references listed in `rewrites`.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    /// Name of the tree to copy; must exist at composition time.
    pub source: String,
    /// Name the copy is registered under.
    pub dest: String,
    /// Ordered old → new call-name pairs, applied to the copy only.
    pub rewrites: Vec<(String, String)>,
}

/// One template source unit and everything the walk learns about it.
#[derive(Debug, Default)]
pub struct Template {
    /// Display name; may be empty. File-backed records fall back to the base
    /// name of their path when registered.
    pub name: String,

    /// Original source bytes.
    pub raw: Vec<u8>,

    /// Directive residue: the source after preprocessing, valid host-engine
    /// input. Set by the walker.
    pub parsed: String,

    /// Canonical path when file-backed; empty for inline records. Inline
    /// records never participate in cycle detection.
    pub path: PathBuf,

    /// First fatal error encountered while processing this record.
    pub error: Option<TemplarError>,

    /// Opaque bag for future extractors (front matter etc.); the core never
    /// reads it.
    pub metadata: HashMap<String, Value>,

    /// Namespace prefix this record was brought in under; empty means the
    /// including file's own namespace.
    pub namespace: String,

    /// When non-empty, registration is restricted to these templates and
    /// their reachable closure.
    pub entry_points: Vec<String>,

    /// Extensions recorded on this record, in directive order.
    pub extensions: Vec<Extension>,

    /// Ordered direct dependencies.
    dependencies: Vec<TemplateId>,
}

impl Template {
    /// Creates an inline record from source text.
    pub fn inline(name: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        Template { name: name.into(), raw: raw.into(), ..Default::default() }
    }

    /// Creates a file-backed record.
    pub fn from_file(path: impl Into<PathBuf>, raw: Vec<u8>) -> Self {
        Template { path: path.into(), raw, ..Default::default() }
    }

    /// True when this record has no backing file.
    pub fn is_inline(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// Directory containing this record's file, as the `cwd` for resolving
    /// its includes. Empty for inline records.
    pub fn dir(&self) -> PathBuf {
        if self.is_inline() {
            PathBuf::new()
        } else {
            self.path.parent().map(Path::to_path_buf).unwrap_or_default()
        }
    }

    /// The name this record's main tree registers under: the explicit name
    /// when set, else the base name of the path.
    pub fn registry_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Ordered direct dependencies.
    pub fn dependencies(&self) -> &[TemplateId] {
        &self.dependencies
    }
}

/// Arena owning every record of one walk. Several records may share a path:
/// a diamond include loads the same file once per edge, each copy carrying
/// its own namespace.
#[derive(Debug, Default)]
pub struct TemplateStore {
    records: Vec<Template>,
}

impl TemplateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves a record into the store, returning its handle.
    pub fn insert(&mut self, template: Template) -> TemplateId {
        let id = TemplateId(self.records.len());
        self.records.push(template);
        id
    }

    /// Immutable access by handle.
    pub fn get(&self, id: TemplateId) -> &Template {
        &self.records[id.0]
    }

    /// Mutable access by handle.
    pub fn get_mut(&mut self, id: TemplateId) -> &mut Template {
        &mut self.records[id.0]
    }

    /// Iterates every record with its handle, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &Template)> {
        self.records.iter().enumerate().map(|(i, r)| (TemplateId(i), r))
    }

    /// Number of records in the store.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when no records have been inserted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Adds a dependency edge from `parent` to `child`.
    ///
    /// A second edge to the same non-empty path is rejected with a warning
    /// and `false`. This is duplicate-edge policy only; full cycle safety
    /// belongs to the walker's in-progress set. Inline parents record no
    /// edges at all.
    pub fn add_dependency(&mut self, parent: TemplateId, child: TemplateId) -> bool {
        if self.get(parent).is_inline() {
            return true;
        }
        let child_path = self.get(child).path.clone();
        if !child_path.as_os_str().is_empty() {
            let duplicate = self
                .get(parent)
                .dependencies
                .iter()
                .any(|&dep| self.get(dep).path == child_path);
            if duplicate {
                warn!(
                    child = %child_path.display(),
                    parent = %self.get(parent).path.display(),
                    "duplicate dependency edge rejected"
                );
                return false;
            }
        }
        self.records[parent.0].dependencies.push(child);
        true
    }
}
