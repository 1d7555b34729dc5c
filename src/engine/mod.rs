//! The host template engine.
//!
//! The preprocessor core only needs a small capability set from its host
//! engine: parse text into named trees (with a delimiter override), deep-copy
//! a tree, walk a tree mutating template-call nodes, add a tree to a
//! registry, look a tree up by name, and execute a named tree against a data
//! value. This module provides those capabilities over a classic
//! text-template dialect:
//!
//! - `{{ define "name" }}...{{ end }}` - named template definitions
//! - `{{ template "name" expr? }}` - template calls
//! - `{{ if }}` / `{{ range }}` / `{{ with }}` with optional `{{ else }}`
//! - `{{ .Field.Chain }}`, string/int/bool literals, function calls
//! - `{{/* comments */}}`
//!
//! Output is written verbatim; escaping is the caller's concern. Data is a
//! [`serde_json::Value`]. Any engine offering the same capability set and a
//! delimiter override could back the preprocessor instead.

pub mod exec;
pub mod node;
pub mod parser;
pub mod registry;

pub use exec::{execute, FuncMap, TemplateFunc};
pub use node::{Branch, Expr, Node, TemplateCall, Tree};
pub use parser::{parse, DEFAULT_DELIMS, DIRECTIVE_DELIMS};
pub use registry::Registry;
