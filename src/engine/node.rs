//! Parse-tree node types for the host engine.
//!
//! Trees are plain owned values: deep copy is `Clone`, and template-call
//! nodes expose their name as a mutable `String` so the composition layer can
//! rewrite references in place.

/// A named parse tree. The root is an ordered list of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    /// Registry name of this tree.
    pub name: String,
    /// Top-level nodes in source order.
    pub root: Vec<Node>,
}

impl Tree {
    /// Creates an empty tree with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Tree { name: name.into(), root: Vec::new() }
    }
}

/// A single parse-tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, emitted verbatim.
    Text(String),
    /// A `{{/* ... */}}` comment. Produces no output.
    Comment(String),
    /// A `{{ expr }}` action whose value is printed.
    Action(Expr),
    /// A `{{ template "name" expr? }}` call into another tree.
    TemplateCall(TemplateCall),
    /// A `{{ if expr }}...{{ else }}...{{ end }}` branch.
    If(Branch),
    /// A `{{ range expr }}...{{ else }}...{{ end }}` loop.
    Range(Branch),
    /// A `{{ with expr }}...{{ else }}...{{ end }}` scope.
    With(Branch),
}

/// The target and argument of a template-call node.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCall {
    /// Name of the tree to invoke. Mutated by namespace and extension
    /// rewrites.
    pub name: String,
    /// Optional argument expression; the callee's dot. `None` executes the
    /// callee against a null value.
    pub arg: Option<Expr>,
}

/// Shared shape of `if` / `range` / `with` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// The controlling expression.
    pub pipe: Expr,
    /// Nodes executed when the pipe is truthy (or per element for `range`).
    pub body: Vec<Node>,
    /// Nodes executed otherwise. Empty when no `{{ else }}` was given.
    pub otherwise: Vec<Node>,
}

/// An expression inside an action or pipe position.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `.` - the current data value.
    Dot,
    /// `.A.B.C` - field chain relative to the current value.
    Field(Vec<String>),
    /// A quoted string literal.
    Str(String),
    /// An integer literal.
    Int(i64),
    /// `true` / `false`.
    Bool(bool),
    /// A function call: `name arg1 arg2 ...`.
    Call {
        /// Function name, resolved against the func map at execution.
        name: String,
        /// Argument expressions in order.
        args: Vec<Expr>,
    },
}
