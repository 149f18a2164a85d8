//! Values produced and consumed by matching.
//!
//! A [`Value`] is what a rule returns on success and what an item input is
//! made of. [`AstNode`] is the tagged tree node built by semantic actions; it
//! is the output of a parse pass and the input of a transform pass.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a value in the Metagram engine.
///
/// # Examples
///
/// ```rust
/// use metagram::value::Value;
/// let n = Value::Number(3.0);
/// assert_eq!(n.type_name(), "Number");
/// assert_eq!(n.to_string(), "3");
/// assert!(Value::default().is_nil());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Node(AstNode),
}

/// A tagged tree node: the producing rule or constructor name plus children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub tag: String,
    pub children: Vec<Value>,
}

impl AstNode {
    pub fn new(tag: impl Into<String>, children: Vec<Value>) -> Self {
        Self {
            tag: tag.into(),
            children,
        }
    }

    /// The element sequence a nested match walks: the tag, then the children.
    pub fn elements(&self) -> Vec<Value> {
        let mut elements = Vec::with_capacity(self.children.len() + 1);
        elements.push(Value::String(self.tag.clone()));
        elements.extend(self.children.iter().cloned());
        elements
    }
}

impl Value {
    /// Shorthand for a node value.
    pub fn node(tag: impl Into<String>, children: Vec<Value>) -> Self {
        Value::Node(AstNode::new(tag, children))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Returns the type name of the value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::List(_) => "List",
            Value::Node(_) => "Node",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Nil and false are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&AstNode> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Short human description used in failure messages.
    pub fn describe(&self) -> String {
        match self {
            Value::String(s) => format!("'{}'", s.escape_default()),
            Value::Node(node) => format!("@{}", node.tag),
            other => other.to_string(),
        }
    }

    // ------------------------------------------------------------------------
    // Display formatting helpers
    // ------------------------------------------------------------------------

    fn fmt_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                Value::fmt_items(f, items)?;
                write!(f, "]")
            }
            Value::Node(node) => write!(f, "{}", node),
        }
    }
}

impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}(", self.tag)?;
        Value::fmt_items(f, &self.children)?;
        write!(f, ")")
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<AstNode> for Value {
    fn from(node: AstNode) -> Self {
        Value::Node(node)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}
