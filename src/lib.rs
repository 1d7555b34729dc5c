//! Templar - a template composition preprocessor.
//!
//! Templar layers dependency management, namespacing, tree-shaking, and
//! block-level extension on top of a plain text-template engine whose own
//! syntax passes through untouched. Template files declare their dependencies
//! with directives in an alternate delimiter pair; preprocessing resolves
//! them into a flat registry of named parse trees the engine executes
//! directly.
//!
//! # Directives
//!
//! ```text
//! {{# include "forms.html" #}}                 pull in another file
//! {{# include "forms.html" "button" #}}        ...only button + its closure
//! {{# namespace "UI" "component.html" #}}      ...under the UI: prefix
//! {{# extend "Base:layout" "MyLayout" "Base:content" "myContent" #}}
//! ```
//!
//! Inside template calls, `name` is scoped to the current namespace,
//! `NS:name` crosses namespaces explicitly, and `::name` escapes to the
//! global scope.
//!
//! # Pipeline
//!
//! 1. The [`walker::Walker`] parses each file under `{{#` `#}}`, executes the
//!    directives (loading children through a [`loader::TemplateLoader`] and
//!    recursing in-order), and leaves behind a directive-free residue.
//! 2. The [`group::TemplateGroup`] merges every record's parse trees into one
//!    [`engine::Registry`], applying namespace rewrites and reachability
//!    tree-shaking, then materializes `extend` directives in walk order.
//! 3. The chosen entry tree is executed against a [`serde_json::Value`].
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use templar::group::TemplateGroup;
//! use templar::loader::FileSystemLoader;
//!
//! let mut group = TemplateGroup::new(FileSystemLoader::new(["./templates"]));
//! let root = group.load_root("page.html")?;
//! let mut out = String::new();
//! group.render(&mut out, root, "page", &json!({"Text": "Click Me"}), None)?;
//! # Ok::<(), templar::core::TemplarError>(())
//! ```
//!
//! # Modules
//!
//! - [`core`] - error types and the error-mode toggle
//! - [`engine`] - the host template engine (parse, registry, execute)
//! - [`parsetree`] - name transformation and tree utilities
//! - [`template`] - template records and the per-walk record store
//! - [`loader`] - filesystem, composite, and `@source` loaders
//! - [`walker`] - the directive preprocessor
//! - [`group`] - composition engine and render façade
//! - [`config`] - `templar.yaml` and `templar.lock`
//! - [`vendor`] - source fetching via git
//! - [`cli`] - the `templar` binary's subcommands

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod group;
pub mod loader;
pub mod parsetree;
pub mod template;
pub mod vendor;
pub mod walker;

pub use crate::core::{ErrorMode, Result, TemplarError};
pub use crate::group::TemplateGroup;
pub use crate::loader::{FileSystemLoader, LoaderList, SourceLoader, TemplateLoader};
pub use crate::template::{Extension, Template, TemplateId, TemplateStore};
pub use crate::walker::Walker;
