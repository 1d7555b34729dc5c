//! Named tree registry.
//!
//! The registry is the unit the composition engine fills and the render
//! façade executes against. Adding a tree under a taken name is a no-op when
//! the definitions are identical (diamond includes re-add the same trees) and
//! an error when they differ.

use std::collections::HashMap;

use crate::core::{Result, TemplarError};

use super::node::Tree;

/// A map of template name to parse tree.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    trees: HashMap<String, Tree>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tree under its own name.
    ///
    /// Re-adding an identical definition succeeds silently; a differing
    /// definition under the same name is [`TemplarError::DuplicateDefinition`].
    pub fn add(&mut self, tree: Tree) -> Result<()> {
        if let Some(existing) = self.trees.get(&tree.name) {
            if existing.root == tree.root {
                return Ok(());
            }
            return Err(TemplarError::DuplicateDefinition { name: tree.name });
        }
        self.trees.insert(tree.name.clone(), tree);
        Ok(())
    }

    /// Adds or replaces a tree under its own name.
    ///
    /// Used for per-record main trees, where the latest registration for a
    /// path wins; user definitions go through [`Registry::add`].
    pub fn insert(&mut self, tree: Tree) {
        self.trees.insert(tree.name.clone(), tree);
    }

    /// Looks a tree up by name.
    pub fn lookup(&self, name: &str) -> Option<&Tree> {
        self.trees.get(name)
    }

    /// True when `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.trees.contains_key(name)
    }

    /// Iterates defined names in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.trees.keys().map(String::as_str)
    }

    /// Iterates (name, tree) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tree)> {
        self.trees.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of defined trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// True when nothing is defined.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}
