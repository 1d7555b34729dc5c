//! Parse-tree transformations: namespace rewriting, reference collection,
//! reachability for tree-shaking, and copy-with-rewrites for extension.
//!
//! Reference resolution rules:
//!
//! - `::name` → strip the `::`, reference is global (the escape is consumed)
//! - `NS:name` → left unchanged (explicit cross-namespace reference)
//! - `name` → prefixed with the active namespace (`NS:name`)

use std::collections::{HashMap, HashSet, VecDeque};

use crate::engine::{Node, TemplateCall, Tree};

/// Applies namespace resolution to a single reference name.
///
/// Pure; allocates only the returned string.
pub fn transform_name(name: &str, namespace: &str) -> String {
    if let Some(global) = name.strip_prefix("::") {
        return global.to_string();
    }
    if name.contains(':') {
        return name.to_string();
    }
    if namespace.is_empty() {
        return name.to_string();
    }
    format!("{namespace}:{name}")
}

/// True for plain names like `header` that a namespace would rewrite.
/// `NS:header` and `::header` are not local.
pub fn is_local_reference(name: &str) -> bool {
    !name.contains(':')
}

/// Visits every template-call node in `nodes`, including those nested in
/// branch and loop bodies. Each node is visited exactly once.
pub fn walk_template_calls<F: FnMut(&TemplateCall)>(nodes: &[Node], visit: &mut F) {
    for node in nodes {
        match node {
            Node::TemplateCall(call) => visit(call),
            Node::If(branch) | Node::Range(branch) | Node::With(branch) => {
                walk_template_calls(&branch.body, visit);
                walk_template_calls(&branch.otherwise, visit);
            }
            Node::Text(_) | Node::Comment(_) | Node::Action(_) => {}
        }
    }
}

/// Mutable variant of [`walk_template_calls`]; visitors rewrite call names in
/// place.
pub fn walk_template_calls_mut<F: FnMut(&mut TemplateCall)>(nodes: &mut [Node], visit: &mut F) {
    for node in nodes {
        match node {
            Node::TemplateCall(call) => visit(call),
            Node::If(branch) | Node::Range(branch) | Node::With(branch) => {
                walk_template_calls_mut(&mut branch.body, visit);
                walk_template_calls_mut(&mut branch.otherwise, visit);
            }
            Node::Text(_) | Node::Comment(_) | Node::Action(_) => {}
        }
    }
}

/// Rewrites every template-call reference in `tree` under `namespace`,
/// in place. The tree's own name is untouched.
pub fn apply_namespace(tree: &mut Tree, namespace: &str) {
    walk_template_calls_mut(&mut tree.root, &mut |call| {
        call.name = transform_name(&call.name, namespace);
    });
}

/// Deep-copies `tree`, applying the namespace to the tree's own name and to
/// every template-call reference inside it.
pub fn copy_tree_with_namespace(tree: &Tree, namespace: &str) -> Tree {
    let mut copied = tree.clone();
    copied.name = transform_name(&tree.name, namespace);
    apply_namespace(&mut copied, namespace);
    copied
}

/// Collects every template-call name referenced by `tree`, in visit order,
/// duplicates included.
pub fn collect_template_names(tree: &Tree) -> Vec<String> {
    let mut names = Vec::new();
    walk_template_calls(&tree.root, &mut |call| names.push(call.name.clone()));
    names
}

/// Collects the deduplicated set of local references in `tree` - the names a
/// namespace application would rewrite.
pub fn collect_local_references(tree: &Tree) -> HashSet<String> {
    let mut seen = HashSet::new();
    walk_template_calls(&tree.root, &mut |call| {
        if is_local_reference(&call.name) {
            seen.insert(call.name.clone());
        }
    });
    seen
}

/// Computes the set of template names reachable from `entry_points` through
/// local references, for tree-shaking. Edges only exist to references that
/// are themselves keys of `templates`; entry points missing from `templates`
/// are omitted.
pub fn compute_reachable(
    templates: &HashMap<String, Tree>,
    entry_points: &[String],
) -> HashSet<String> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();

    for name in entry_points {
        if templates.contains_key(name) && reachable.insert(name.clone()) {
            queue.push_back(name.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(tree) = templates.get(&current) else { continue };
        for reference in collect_local_references(tree) {
            if templates.contains_key(&reference) && reachable.insert(reference.clone()) {
                queue.push_back(reference);
            }
        }
    }

    reachable
}

/// Deep-copies `tree`, replacing every template-call name found in
/// `rewrites`. The rewrite is depth-1: it applies to call nodes of this tree
/// only, never to the trees those calls resolve to.
pub fn copy_tree_with_rewrites(tree: &Tree, rewrites: &HashMap<String, String>) -> Tree {
    let mut copied = tree.clone();
    walk_template_calls_mut(&mut copied.root, &mut |call| {
        if let Some(new_name) = rewrites.get(&call.name) {
            call.name = new_name.clone();
        }
    });
    copied
}
