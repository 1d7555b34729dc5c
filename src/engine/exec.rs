//! Tree execution against a [`serde_json::Value`] data context.
//!
//! Execution is synchronous and allocation-light: output is appended to a
//! caller-provided `String`. Template-call nodes dispatch back through the
//! registry; a missing callee is an execution error, matching the late
//! binding the composition engine relies on.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::core::{Result, TemplarError};

use super::node::{Expr, Node};
use super::registry::Registry;

/// A function callable from an action, e.g. `{{ upper .Name }}`.
pub type TemplateFunc = Rc<dyn Fn(&[Value]) -> Result<Value>>;

/// Named function bindings available during execution.
pub type FuncMap = HashMap<String, TemplateFunc>;

/// Guards against runaway template-call recursion (cycles in call graphs
/// survive composition; they must not hang rendering).
const MAX_CALL_DEPTH: usize = 128;

/// Executes the registry tree named `name` against `data`, appending output
/// to `out`.
pub fn execute(
    registry: &Registry,
    name: &str,
    data: &Value,
    funcs: &FuncMap,
    out: &mut String,
) -> Result<()> {
    let tree = registry
        .lookup(name)
        .ok_or_else(|| TemplarError::not_found(name))?;
    let mut exec = Executor { registry, funcs, depth: 0 };
    exec.walk(&tree.name, &tree.root, data, out)
}

struct Executor<'a> {
    registry: &'a Registry,
    funcs: &'a FuncMap,
    depth: usize,
}

impl<'a> Executor<'a> {
    fn error(&self, tree: &str, message: impl Into<String>) -> TemplarError {
        TemplarError::Execution { name: tree.to_string(), message: message.into() }
    }

    fn walk(&mut self, tree: &str, nodes: &[Node], data: &Value, out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Comment(_) => {}
                Node::Action(expr) => {
                    let value = self.eval(tree, expr, data)?;
                    print_value(&value, out);
                }
                Node::TemplateCall(call) => {
                    let arg = match &call.arg {
                        Some(expr) => self.eval(tree, expr, data)?,
                        None => Value::Null,
                    };
                    let callee = self.registry.lookup(&call.name).ok_or_else(|| {
                        self.error(tree, format!("no such template \"{}\"", call.name))
                    })?;
                    self.depth += 1;
                    if self.depth > MAX_CALL_DEPTH {
                        return Err(self.error(
                            tree,
                            format!("exceeded maximum template depth calling \"{}\"", call.name),
                        ));
                    }
                    self.walk(&callee.name, &callee.root, &arg, out)?;
                    self.depth -= 1;
                }
                Node::If(branch) => {
                    let cond = self.eval(tree, &branch.pipe, data)?;
                    if is_truthy(&cond) {
                        self.walk(tree, &branch.body, data, out)?;
                    } else {
                        self.walk(tree, &branch.otherwise, data, out)?;
                    }
                }
                Node::With(branch) => {
                    let value = self.eval(tree, &branch.pipe, data)?;
                    if is_truthy(&value) {
                        self.walk(tree, &branch.body, &value, out)?;
                    } else {
                        self.walk(tree, &branch.otherwise, data, out)?;
                    }
                }
                Node::Range(branch) => {
                    let value = self.eval(tree, &branch.pipe, data)?;
                    match &value {
                        Value::Array(items) if !items.is_empty() => {
                            for item in items {
                                self.walk(tree, &branch.body, item, out)?;
                            }
                        }
                        Value::Object(map) if !map.is_empty() => {
                            for item in map.values() {
                                self.walk(tree, &branch.body, item, out)?;
                            }
                        }
                        Value::Array(_) | Value::Object(_) | Value::Null => {
                            self.walk(tree, &branch.otherwise, data, out)?;
                        }
                        other => {
                            return Err(self.error(
                                tree,
                                format!("range can't iterate over {other}"),
                            ))
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&mut self, tree: &str, expr: &Expr, data: &Value) -> Result<Value> {
        Ok(match expr {
            Expr::Dot => data.clone(),
            Expr::Str(s) => Value::String(s.clone()),
            Expr::Int(n) => Value::Number((*n).into()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Field(chain) => {
                let mut current = data;
                for field in chain {
                    match current.get(field) {
                        Some(next) => current = next,
                        None => return Ok(Value::Null),
                    }
                }
                current.clone()
            }
            Expr::Call { name, args } => {
                let func = self
                    .funcs
                    .get(name)
                    .ok_or_else(|| self.error(tree, format!("function \"{name}\" not defined")))?
                    .clone();
                let values = args
                    .iter()
                    .map(|arg| self.eval(tree, arg, data))
                    .collect::<Result<Vec<_>>>()?;
                func(&values)?
            }
        })
    }
}

/// Classic template truthiness: null, false, zero, and empty containers are
/// false.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn print_value(value: &Value, out: &mut String) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        other => out.push_str(&other.to_string()),
    }
}
