//! The directive preprocessor.
//!
//! A [`Walker`] performs an in-order traversal over a template record and its
//! dependencies: the record's raw source is parsed under the alternate
//! delimiter pair (`{{#` `#}}`), and `include` / `namespace` / `extend`
//! directives are evaluated as they are encountered, loading children through
//! the shared loader and recursing immediately. Everything outside the
//! directive delimiters flows into the walker's buffer untouched, so the
//! record's `parsed` field ends up holding a valid host-engine template.
//!
//! Child walks that cross a namespace boundary run with a private buffer so
//! their residue is not mixed with the parent's partial output; walks within
//! the same namespace share the parent's buffer. The in-progress path set is
//! shared across all of it for cycle detection.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::core::{ErrorMode, Result, TemplarError};
use crate::engine::{self, Expr, Node, DIRECTIVE_DELIMS};
use crate::loader::TemplateLoader;
use crate::template::{Extension, Template, TemplateId, TemplateStore};

/// Called when an include directive is encountered; returning `true` skips it.
pub type FoundIncludeHook<'a> = Box<dyn FnMut(&str) -> bool + 'a>;

/// Called before a record is preprocessed; returning `Ok(true)` skips it.
pub type EnteringHook<'a> = Box<dyn FnMut(&Template) -> Result<bool> + 'a>;

/// Called after a record and all its children have been processed.
pub type ProcessedHook<'a> = Box<dyn FnMut(&Template) -> Result<()> + 'a>;

/// Walks templates and their dependencies in-order, evaluating directives as
/// they are encountered.
pub struct Walker<'a> {
    /// Accumulates directive residue for the walk in progress.
    pub buffer: String,

    /// Resolves include patterns to child records.
    pub loader: &'a dyn TemplateLoader,

    /// Optional include-skip hook.
    pub found_include: Option<FoundIncludeHook<'a>>,

    /// Optional pre-processing hook.
    pub entering: Option<EnteringHook<'a>>,

    /// Optional post-processing hook.
    pub processed: Option<ProcessedHook<'a>>,

    /// Whether fatal errors propagate or abort.
    pub error_mode: ErrorMode,

    /// Paths currently being processed, for cycle detection. Shared by
    /// every recursion level of one walk.
    in_progress: HashSet<PathBuf>,

    /// The same paths in recursion order, so cut cycles can be reported as
    /// chains.
    stack: Vec<PathBuf>,

    /// Include chains that closed back on an in-flight ancestor. Each entry
    /// runs from the ancestor down to the include that would have re-entered
    /// it, ending with the ancestor's path again.
    cycles: Vec<Vec<PathBuf>>,

    /// Records in processed order; the composition engine consumes this.
    order: Vec<TemplateId>,
}

impl<'a> Walker<'a> {
    /// Creates a walker over `loader` with no hooks installed.
    pub fn new(loader: &'a dyn TemplateLoader) -> Self {
        Walker {
            buffer: String::new(),
            loader,
            found_include: None,
            entering: None,
            processed: None,
            error_mode: ErrorMode::from_env(),
            in_progress: HashSet::new(),
            stack: Vec::new(),
            cycles: Vec::new(),
            order: Vec::new(),
        }
    }

    /// Record ids in the order their processing finished (children before the
    /// records that included them).
    pub fn order(&self) -> &[TemplateId] {
        &self.order
    }

    /// Include cycles that were cut during the walk, as path chains from the
    /// re-entered ancestor back to itself. Empty when the include graph is
    /// acyclic.
    pub fn cycles(&self) -> &[Vec<PathBuf>] {
        &self.cycles
    }

    /// Processes `root` and every template it reaches. Afterwards each
    /// processed record's `parsed` holds its directive residue.
    pub fn walk(&mut self, store: &mut TemplateStore, root: TemplateId) -> Result<()> {
        let path = store.get(root).path.clone();
        let file_backed = !path.as_os_str().is_empty();
        if file_backed {
            if self.in_progress.contains(&path) {
                warn!(path = %path.display(), "cycle detected, skipping template already in progress");
                self.record_cycle(&path);
                return Ok(());
            }
            self.in_progress.insert(path.clone());
            self.stack.push(path.clone());
        }
        let result = self.walk_record(store, root);
        if file_backed {
            self.in_progress.remove(&path);
            self.stack.pop();
        }
        result
    }

    /// Captures the chain from the re-entered ancestor down to the cut point.
    fn record_cycle(&mut self, reentered: &Path) {
        if let Some(start) = self.stack.iter().position(|p| p.as_path() == reentered) {
            let mut chain = self.stack[start..].to_vec();
            chain.push(reentered.to_path_buf());
            self.cycles.push(chain);
        }
    }

    /// Runs a child walk with a private buffer. Used when the child crosses a
    /// namespace boundary so its residue stays isolated from the parent's
    /// partial output.
    fn walk_isolated(&mut self, store: &mut TemplateStore, child: TemplateId) -> Result<()> {
        let parent_buffer = std::mem::take(&mut self.buffer);
        let result = self.walk(store, child);
        self.buffer = parent_buffer;
        result
    }

    fn walk_record(&mut self, store: &mut TemplateStore, root: TemplateId) -> Result<()> {
        let cwd = store.get(root).dir();

        if let Some(entering) = self.entering.as_mut() {
            if entering(store.get(root))? {
                debug!(path = %store.get(root).path.display(), "entering hook requested skip");
                return Ok(());
            }
        }

        let raw = String::from_utf8_lossy(&store.get(root).raw).into_owned();
        let parse_name = store.get(root).registry_name();
        let directive_tree = match engine::parse(&parse_name, &raw, DIRECTIVE_DELIMS) {
            Ok(mut trees) => trees.remove(0),
            Err(err) => {
                error!(path = %store.get(root).path.display(), %err, "error preprocessing template");
                store.get_mut(root).error = Some(err.clone());
                return Err(self.error_mode.apply(err));
            }
        };

        if let Err(err) = self.run_directives(store, root, &directive_tree.root, &cwd) {
            error!(path = %store.get(root).path.display(), %err, "error preprocessing template");
            store.get_mut(root).error = Some(err.clone());
            return Err(self.error_mode.apply(err));
        }
        store.get_mut(root).parsed = self.buffer.clone();

        self.order.push(root);
        if let Some(processed) = self.processed.as_mut() {
            processed(store.get(root))?;
        }
        Ok(())
    }

    /// Evaluates the directive tree with an empty data context: text flows to
    /// the buffer, directive calls run their handlers, anything else is an
    /// execution error.
    fn run_directives(
        &mut self,
        store: &mut TemplateStore,
        root: TemplateId,
        nodes: &[Node],
        cwd: &std::path::Path,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.buffer.push_str(text),
                Node::Comment(_) => {}
                Node::Action(Expr::Call { name, args }) => {
                    let args = literal_args(name, args)?;
                    match name.as_str() {
                        "include" => self.directive_include(store, root, &args, cwd)?,
                        "namespace" => self.directive_namespace(store, root, &args, cwd)?,
                        "extend" => self.directive_extend(store, root, &args)?,
                        other => {
                            return Err(TemplarError::Execution {
                                name: store.get(root).registry_name(),
                                message: format!("function \"{other}\" not defined"),
                            })
                        }
                    }
                }
                _ => {
                    return Err(TemplarError::Execution {
                        name: store.get(root).registry_name(),
                        message: "only directive calls and plain text are allowed between \
                                  directive delimiters"
                            .to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    /// `include "PATH" ["NAME"...]` - load and process a dependency in the
    /// current namespace.
    fn directive_include(
        &mut self,
        store: &mut TemplateStore,
        root: TemplateId,
        args: &[String],
        cwd: &std::path::Path,
    ) -> Result<()> {
        let [pattern, entry_points @ ..] = args else {
            return Err(TemplarError::directive("include requires at least a file path"));
        };
        let namespace = store.get(root).namespace.clone();
        self.process_include(store, root, &namespace, pattern, entry_points, cwd, false)
    }

    /// `namespace "NS" "PATH" ["NAME"...]` - load a dependency under a
    /// namespace prefix.
    fn directive_namespace(
        &mut self,
        store: &mut TemplateStore,
        root: TemplateId,
        args: &[String],
        cwd: &std::path::Path,
    ) -> Result<()> {
        let [namespace, pattern, entry_points @ ..] = args else {
            return Err(TemplarError::directive("namespace requires: namespace file [templates...]"));
        };
        if namespace.is_empty() {
            return Err(TemplarError::directive("namespace requires a non-empty namespace name"));
        }
        self.process_include(store, root, namespace, pattern, entry_points, cwd, true)
    }

    /// Shared body of `include` and `namespace`. With `force_namespace` the
    /// child's namespace is set unconditionally; otherwise it only inherits
    /// the parent's.
    #[allow(clippy::too_many_arguments)]
    fn process_include(
        &mut self,
        store: &mut TemplateStore,
        root: TemplateId,
        namespace: &str,
        pattern: &str,
        entry_points: &[String],
        cwd: &std::path::Path,
        force_namespace: bool,
    ) -> Result<()> {
        if let Some(found) = self.found_include.as_mut() {
            if found(pattern) {
                self.buffer.push_str(&format!("{{{{/* Skipping: '{pattern}' */}}}}"));
                return Ok(());
            }
        }

        let children = match self.loader.load(pattern, cwd) {
            Ok(children) => children,
            Err(err) => {
                error!(included = pattern, %err, "error loading include");
                return Err(err);
            }
        };

        for mut child in children {
            if force_namespace || !namespace.is_empty() {
                child.namespace = namespace.to_string();
            }
            if !entry_points.is_empty() {
                child.entry_points = entry_points.to_vec();
            }
            let namespaced = !child.namespace.is_empty();
            let child_id = store.insert(child);

            if !store.add_dependency(root, child_id) {
                continue;
            }

            let walked = if namespaced {
                self.walk_isolated(store, child_id)
            } else {
                self.walk(store, child_id)
            };
            if let Err(err) = walked {
                error!(included = pattern, %err, "error walking include");
                store.get_mut(root).error = Some(err.clone());
                return Err(err);
            }
        }

        if force_namespace {
            self.buffer.push_str(&format!(
                "{{{{/* Loaded namespace '{namespace}' from '{pattern}' */}}}}"
            ));
        } else {
            self.buffer
                .push_str(&format!("{{{{/* Finished Including: '{pattern}' */}}}}"));
        }
        Ok(())
    }

    /// `extend "SRC" "DST" ["OLD" "NEW"]...` - record a deferred extension on
    /// the current record. Resolution happens at composition time, once every
    /// parse tree is present.
    fn directive_extend(
        &mut self,
        store: &mut TemplateStore,
        root: TemplateId,
        args: &[String],
    ) -> Result<()> {
        if args.len() < 2 {
            return Err(TemplarError::directive(
                "extend requires at least: sourceTemplate destTemplate",
            ));
        }
        if args.len() % 2 != 0 {
            return Err(TemplarError::directive(
                "extend requires pairs of block/override after destTemplate",
            ));
        }
        let (source, dest) = (&args[0], &args[1]);
        if dest.is_empty() {
            return Err(TemplarError::directive(
                "extend requires a non-empty destination template name",
            ));
        }

        let rewrites = args[2..]
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        store.get_mut(root).extensions.push(Extension {
            source: source.clone(),
            dest: dest.clone(),
            rewrites,
        });

        self.buffer
            .push_str(&format!("{{{{/* Extended '{source}' as '{dest}' */}}}}"));
        Ok(())
    }
}

/// Directive arguments must be string literals.
fn literal_args(directive: &str, args: &[Expr]) -> Result<Vec<String>> {
    args.iter()
        .map(|arg| match arg {
            Expr::Str(s) => Ok(s.clone()),
            other => Err(TemplarError::directive(format!(
                "{directive} arguments must be quoted strings, got {other:?}"
            ))),
        })
        .collect()
}
