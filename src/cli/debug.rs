//! Analyze a template's dependencies and debug composition issues.
//!
//! `templar debug` walks the root template with the real preprocessor and
//! reports on what it found:
//!
//! - **Cycle detection** - include chains that closed back on an in-flight
//!   ancestor and were cut by the walker
//! - the dependency tree, with per-record namespace and entry-point
//!   annotations
//! - the template references each composed tree makes
//! - `--dot` - the dependency graph in GraphViz DOT form
//! - `--flatten` - each record's directive residue in walk order
//! - `--trace` - walker enter/finish events while processing
//!
//! # Examples
//!
//! ```bash
//! # Dependency tree, cycle report, and references
//! templar debug page.html
//!
//! # Render the dependency graph with graphviz
//! templar debug --dot page.html > deps.dot
//!
//! # See exactly what the host engine will be given
//! templar debug --flatten page.html
//!
//! # Watch the walker work
//! templar debug --trace page.html
//! ```
//!
//! Unlike a plain render, a cut cycle is loud here: rendering succeeds on a
//! cyclic include graph (the walker cuts each back-edge and logs a warning),
//! so this report is where an author sees the cycle spelled out as a chain.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;

use crate::engine::{self, DEFAULT_DELIMS};
use crate::loader::{FileSystemLoader, SourceLoader, TemplateLoader};
use crate::parsetree::collect_template_names;
use crate::template::{TemplateId, TemplateStore};
use crate::walker::Walker;

/// Arguments for `templar debug`.
#[derive(Args)]
pub struct DebugCommand {
    /// Root template pattern to walk.
    pub pattern: String,

    /// Emit the dependency graph in DOT format.
    #[arg(long)]
    pub dot: bool,

    /// Print each record's directive residue in walk order.
    #[arg(long)]
    pub flatten: bool,

    /// Log walker events while processing.
    #[arg(long)]
    pub trace: bool,
}

impl DebugCommand {
    /// Walks the pattern and prints the requested dumps.
    ///
    /// The default report shows the dependency tree, the cycle-detection
    /// section, and per-tree references. `--dot` and `--flatten` replace the
    /// report with their respective single output, suitable for piping.
    ///
    /// # Errors
    ///
    /// Fails when the root pattern cannot be loaded or the walk hits a fatal
    /// error (parse failure, missing include). A cut cycle is not an error;
    /// it is reported in the cycle section.
    pub fn execute(self, config: Option<&Path>) -> Result<()> {
        let loader: Box<dyn TemplateLoader> = match super::load_config(config) {
            Ok(config) => Box::new(SourceLoader::new(config)),
            Err(_) => Box::new(FileSystemLoader::new(["."])),
        };

        let mut store = TemplateStore::new();
        let root = store.insert(loader.load(&self.pattern, Path::new(""))?.remove(0));

        let mut walker = Walker::new(loader.as_ref());
        if self.trace {
            walker.entering = Some(Box::new(|record| {
                eprintln!("{} {}", "entering".cyan(), record.registry_name());
                Ok(false)
            }));
            walker.processed = Some(Box::new(|record| {
                eprintln!("{} {}", "processed".green(), record.registry_name());
                Ok(())
            }));
        }
        walker.walk(&mut store, root)?;
        let order = walker.order().to_vec();
        let cycles = walker.cycles().to_vec();
        drop(walker);

        if self.dot {
            print!("{}", render_dot(&store));
            return Ok(());
        }

        if self.flatten {
            for &id in &order {
                let record = store.get(id);
                println!("{} {}", "---".dimmed(), record.registry_name().bold());
                println!("{}", record.parsed);
            }
            return Ok(());
        }

        println!("{}", "Dependency tree:".bold());
        print_tree(&store, root, 0);

        println!("\n{}", "Cycle detection:".bold());
        print!("{}", cycle_report(&cycles));

        println!("\n{}", "References:".bold());
        for &id in &order {
            let record = store.get(id);
            let trees = engine::parse(&record.registry_name(), &record.parsed, DEFAULT_DELIMS)?;
            for tree in &trees {
                let refs = collect_template_names(tree);
                if !refs.is_empty() {
                    println!("  {} {} {}", tree.name.green(), "→".dimmed(), refs.join(", "));
                }
            }
        }
        Ok(())
    }
}

/// Formats the walker's cut cycles as a report section.
///
/// Each cycle prints as a chain of base names from the re-entered ancestor
/// back to itself, the way the walker saw it.
fn cycle_report(cycles: &[Vec<PathBuf>]) -> String {
    if cycles.is_empty() {
        return "  no cycles detected in the include graph\n".to_string();
    }
    let mut out = format!("  found {} cycle(s), each cut at its first re-entry:\n", cycles.len());
    for (i, chain) in cycles.iter().enumerate() {
        let names: Vec<String> = chain
            .iter()
            .map(|p| {
                p.file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| p.display().to_string())
            })
            .collect();
        out.push_str(&format!("  cycle {}: {}\n", i + 1, names.join(" -> ")));
    }
    out
}

fn print_tree(store: &TemplateStore, id: TemplateId, depth: usize) {
    let record = store.get(id);
    let mut annotations = Vec::new();
    if !record.namespace.is_empty() {
        annotations.push(format!("ns: {}", record.namespace));
    }
    if !record.entry_points.is_empty() {
        annotations.push(format!("entry points: {}", record.entry_points.join(", ")));
    }
    let suffix = if annotations.is_empty() {
        String::new()
    } else {
        format!(" [{}]", annotations.join("; ")).dimmed().to_string()
    };
    println!("{}{}{}", "  ".repeat(depth), record.registry_name(), suffix);
    for &child in record.dependencies() {
        print_tree(store, child, depth + 1);
    }
}

fn render_dot(store: &TemplateStore) -> String {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut indices = HashMap::new();
    for (id, record) in store.iter() {
        let label = if record.namespace.is_empty() {
            record.registry_name()
        } else {
            format!("{} ({})", record.registry_name(), record.namespace)
        };
        indices.insert(id, graph.add_node(label));
    }
    for (id, record) in store.iter() {
        for &child in record.dependencies() {
            graph.add_edge(indices[&id], indices[&child], ());
        }
    }
    format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
}
