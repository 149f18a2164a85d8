//! # Semantic Action Bridge
//!
//! Rule actions are written in a small sandboxed expression language,
//! [`HostExpr`], instead of code in some host language. An action can read
//! the values bound by the enclosing rule, build lists and nodes, and call
//! native functions registered by name in an [`ActionRegistry`].
//!
//! ## Module Structure
//!
//! - **`standard`**: the standard native functions (strings, lists, nodes, templates)
//!
//! Native functions share a single signature, [`NativeFn`], and are pure:
//! they only see their argument values.

use im::HashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap as Bindings;

use crate::errors::{ErrorKind, MetaError};
use crate::value::{AstNode, Value};

pub mod standard;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Native action function: takes evaluated argument values, returns a value.
pub type NativeFn = fn(args: &[Value]) -> Result<Value, MetaError>;

/// Variables visible to an action: rule parameters and `Bind` results.
pub type Scope = Bindings<String, Value>;

/// An action expression evaluated against the current bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostExpr {
    Literal(Value),
    Var(String),
    List(Vec<HostExpr>),
    Node { tag: String, args: Vec<HostExpr> },
    Call { func: String, args: Vec<HostExpr> },
}

impl HostExpr {
    pub fn lit(value: impl Into<Value>) -> Self {
        HostExpr::Literal(value.into())
    }

    pub fn nil() -> Self {
        HostExpr::Literal(Value::Nil)
    }

    pub fn var(name: &str) -> Self {
        HostExpr::Var(name.to_string())
    }

    pub fn list(items: Vec<HostExpr>) -> Self {
        HostExpr::List(items)
    }

    pub fn node(tag: &str, args: Vec<HostExpr>) -> Self {
        HostExpr::Node {
            tag: tag.to_string(),
            args,
        }
    }

    pub fn call(func: &str, args: Vec<HostExpr>) -> Self {
        HostExpr::Call {
            func: func.to_string(),
            args,
        }
    }

    /// Names of native functions this expression calls.
    pub fn called_functions<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            HostExpr::Literal(_) | HostExpr::Var(_) => {}
            HostExpr::List(items) | HostExpr::Node { args: items, .. } => {
                items.iter().for_each(|item| item.called_functions(out))
            }
            HostExpr::Call { func, args } => {
                out.push(func);
                args.iter().for_each(|arg| arg.called_functions(out));
            }
        }
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Registry of native functions callable from actions, inspectable at runtime.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    pub natives: HashMap<String, NativeFn>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every standard native function.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        standard::register_std_actions(&mut registry);
        registry
    }

    pub fn get(&self, name: &str) -> Option<&NativeFn> {
        self.natives.get(name)
    }

    pub fn register(&mut self, name: &str, func: NativeFn) {
        self.natives.insert(name.to_string(), func);
    }

    pub fn remove(&mut self, name: &str) -> Option<NativeFn> {
        self.natives.remove(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.natives.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.natives.is_empty()
    }

    /// Evaluates `expr` with `scope` in view.
    pub fn evaluate(&self, expr: &HostExpr, scope: &Scope) -> Result<Value, MetaError> {
        match expr {
            HostExpr::Literal(value) => Ok(value.clone()),
            HostExpr::Var(name) => scope.get(name).cloned().ok_or_else(|| {
                MetaError::new(ErrorKind::UndefinedVariable { name: name.clone() })
            }),
            HostExpr::List(items) => Ok(Value::List(self.evaluate_all(items, scope)?)),
            HostExpr::Node { tag, args } => Ok(Value::Node(AstNode::new(
                tag.clone(),
                self.evaluate_all(args, scope)?,
            ))),
            HostExpr::Call { func, args } => {
                let Some(native) = self.get(func) else {
                    return Err(MetaError::new(ErrorKind::UnknownAction { name: func.clone() }));
                };
                let values = self.evaluate_all(args, scope)?;
                native(&values)
            }
        }
    }

    fn evaluate_all(&self, exprs: &[HostExpr], scope: &Scope) -> Result<Vec<Value>, MetaError> {
        exprs.iter().map(|e| self.evaluate(e, scope)).collect()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("natives", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_nodes_from_bindings() {
        let registry = ActionRegistry::standard();
        let mut scope = Scope::new();
        scope.insert("a".into(), Value::Number(3.0));
        let expr = HostExpr::node("Neg", vec![HostExpr::var("a")]);
        assert_eq!(
            registry.evaluate(&expr, &scope).unwrap(),
            Value::node("Neg", vec![Value::Number(3.0)])
        );
    }

    #[test]
    fn unbound_variable_is_reported() {
        let registry = ActionRegistry::standard();
        let err = registry
            .evaluate(&HostExpr::var("missing"), &Scope::new())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UndefinedVariable { ref name } if name == "missing"));
    }

    #[test]
    fn unknown_function_is_reported() {
        let registry = ActionRegistry::new();
        let err = registry
            .evaluate(&HostExpr::call("nope", vec![]), &Scope::new())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownAction { .. }));
    }
}
