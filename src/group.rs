//! The composition engine and render façade.
//!
//! A [`TemplateGroup`] drives the full pipeline: walk a root record with the
//! directive preprocessor, merge every processed record's parse trees into
//! one registry (applying namespace rewrites and tree-shaking), materialize
//! the accumulated extensions, and execute a chosen entry against a data
//! value.
//!
//! Merge rules, in walk order per record:
//!
//! - inline record → named trees merged under their original names
//! - non-empty namespace → namespaced merge (transform call names, register
//!   under `ns:name`, restricted to the reachable closure of any entry
//!   points)
//! - non-empty entry points, no namespace → selective merge (reachable
//!   closure, original names)
//! - otherwise → main tree under the file's base name plus defines under
//!   their own names
//!
//! Extensions are deferred until every tree is present, then applied in walk
//! order; an extension whose source (or rewrite target) is still missing at
//! that point fails with `ExtendSourceMissing`.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::core::{ErrorMode, Result, TemplarError};
use crate::engine::{self, FuncMap, Registry, DEFAULT_DELIMS};
use crate::loader::TemplateLoader;
use crate::parsetree::{compute_reachable, copy_tree_with_namespace, copy_tree_with_rewrites};
use crate::template::{Extension, Template, TemplateStore};
use crate::walker::Walker;

/// A group of templates sharing one loader, one function map, and one
/// composed-registry cache.
pub struct TemplateGroup {
    /// Resolves include patterns for every walk this group runs.
    pub loader: Box<dyn TemplateLoader>,

    /// Functions available to every render from this group.
    pub funcs: FuncMap,

    /// Whether fatal errors propagate or abort.
    pub error_mode: ErrorMode,

    /// Composed registries keyed by root record name; hits skip the walk
    /// entirely.
    cache: HashMap<String, Registry>,
}

impl TemplateGroup {
    /// Creates a group over `loader`.
    pub fn new(loader: impl TemplateLoader + 'static) -> Self {
        TemplateGroup {
            loader: Box::new(loader),
            funcs: FuncMap::new(),
            error_mode: ErrorMode::from_env(),
            cache: HashMap::new(),
        }
    }

    /// Merges function bindings into the group's map.
    pub fn add_funcs(&mut self, funcs: FuncMap) -> &mut Self {
        self.funcs.extend(funcs);
        self
    }

    /// Loads the first record matching `pattern`, for use as a walk root.
    pub fn load_root(&self, pattern: &str) -> Result<Template> {
        let mut records = self.loader.load(pattern, std::path::Path::new(""))?;
        Ok(records.remove(0))
    }

    /// Preprocesses `root` and composes the registry containing every
    /// template definition it reaches.
    pub fn compose(&mut self, root: Template) -> Result<Registry> {
        let cache_key = root.registry_name();
        if let Some(registry) = self.cache.get(&cache_key) {
            debug!(root = %cache_key, "composition cache hit");
            return Ok(registry.clone());
        }

        let mut store = TemplateStore::new();
        let root_id = store.insert(root);
        let order = {
            let mut walker = Walker::new(self.loader.as_ref());
            walker.error_mode = self.error_mode;
            walker.walk(&mut store, root_id)?;
            walker.order().to_vec()
        };

        let mut registry = Registry::new();
        let mut extensions: Vec<Extension> = Vec::new();
        for id in order {
            let record = store.get(id);
            if let Err(err) = merge_record(&mut registry, record) {
                return Err(self.error_mode.apply(err));
            }
            extensions.extend(record.extensions.iter().cloned());
        }

        if let Err(err) = materialize_extensions(&mut registry, &extensions) {
            return Err(self.error_mode.apply(err));
        }

        if !cache_key.is_empty() {
            self.cache.insert(cache_key, registry.clone());
        }
        Ok(registry)
    }

    /// Composes from `root`, then executes the tree named `entry` (or the
    /// root record's name when `entry` is empty) against `data`, appending
    /// output to `out`. Extra function bindings shadow the group's.
    pub fn render(
        &mut self,
        out: &mut String,
        root: Template,
        entry: &str,
        data: &Value,
        funcs: Option<&FuncMap>,
    ) -> Result<()> {
        let entry_name = if entry.is_empty() { root.registry_name() } else { entry.to_string() };
        let registry = self.compose(root)?;

        match funcs {
            None => engine::execute(&registry, &entry_name, data, &self.funcs, out),
            Some(extra) => {
                let mut merged = self.funcs.clone();
                merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                engine::execute(&registry, &entry_name, data, &merged, out)
            }
        }
    }

    /// Drops any cached composition for `root_name` (or all when `None`).
    pub fn invalidate(&mut self, root_name: Option<&str>) {
        match root_name {
            Some(name) => {
                self.cache.remove(name);
            }
            None => self.cache.clear(),
        }
    }
}

/// Applies one record's parse trees to the registry per the merge rules.
fn merge_record(registry: &mut Registry, record: &Template) -> Result<()> {
    let name = record.registry_name();
    let trees = engine::parse(&name, &record.parsed, DEFAULT_DELIMS)?;

    if record.is_inline() {
        let mut iter = trees.into_iter();
        let main = iter.next().expect("parse returns at least the main tree");
        if !main.name.is_empty() {
            registry.insert(main);
        }
        for tree in iter {
            registry.add(tree)?;
        }
        return Ok(());
    }

    if !record.namespace.is_empty() {
        return merge_namespaced(registry, record, trees);
    }
    if !record.entry_points.is_empty() {
        return merge_selective(registry, record, trees);
    }

    // Plain file-backed record: main tree under the base name, defines under
    // their own names. The main tree replaces an earlier registration for the
    // same path; later records carry the more complete shared buffer.
    let mut iter = trees.into_iter();
    registry.insert(iter.next().expect("parse returns at least the main tree"));
    for tree in iter {
        registry.add(tree)?;
    }
    Ok(())
}

/// Namespaced merge: restrict to the reachable closure of any entry points,
/// then deep-copy each survivor with the namespace applied to its name and
/// call nodes.
fn merge_namespaced(
    registry: &mut Registry,
    record: &Template,
    trees: Vec<engine::Tree>,
) -> Result<()> {
    let scratch: HashMap<String, engine::Tree> =
        trees.into_iter().map(|t| (t.name.clone(), t)).collect();
    let survivors = shake(&scratch, &record.entry_points);

    for name in survivors {
        let tree = &scratch[&name];
        registry.add(copy_tree_with_namespace(tree, &record.namespace))?;
    }
    Ok(())
}

/// Selective merge: reachable closure only, names and call nodes unmodified.
fn merge_selective(
    registry: &mut Registry,
    record: &Template,
    trees: Vec<engine::Tree>,
) -> Result<()> {
    let scratch: HashMap<String, engine::Tree> =
        trees.into_iter().map(|t| (t.name.clone(), t)).collect();
    let survivors = shake(&scratch, &record.entry_points);

    for name in survivors {
        registry.add(scratch[&name].clone())?;
    }
    Ok(())
}

/// Names to register: everything, or the reachable closure when entry points
/// are present.
fn shake(scratch: &HashMap<String, engine::Tree>, entry_points: &[String]) -> Vec<String> {
    if entry_points.is_empty() {
        scratch.keys().cloned().collect()
    } else {
        compute_reachable(scratch, entry_points).into_iter().collect()
    }
}

/// Applies the accumulated extensions, in recorded order.
///
/// Both the source tree and every rewrite target must already be defined;
/// an extension chain therefore has to list inner extensions before the
/// outer ones that reference their destinations.
fn materialize_extensions(registry: &mut Registry, extensions: &[Extension]) -> Result<()> {
    for ext in extensions {
        let source_tree = registry.lookup(&ext.source).ok_or_else(|| {
            TemplarError::ExtendSourceMissing {
                source_name: ext.source.clone(),
                dest: ext.dest.clone(),
            }
        })?;
        for (_, target) in &ext.rewrites {
            if !registry.contains(target) {
                return Err(TemplarError::ExtendSourceMissing {
                    source_name: target.clone(),
                    dest: ext.dest.clone(),
                });
            }
        }

        let rewrites: HashMap<String, String> = ext.rewrites.iter().cloned().collect();
        let mut copy = copy_tree_with_rewrites(source_tree, &rewrites);
        copy.name = ext.dest.clone();
        registry.add(copy)?;
    }
    Ok(())
}
