//! # Standard Action Functions
//!
//! Natives every grammar can call from `-> ...`, `?(...)` and `!(...)`.
//!
//! ## Functions Provided
//!
//! - **Strings**: `concat`, `str`, `join`, `escape`, `unescape`, `to_number`
//! - **Lists**: `list`, `cons`, `append`, `extend`, `first`, `len`, `is_empty`
//! - **Nodes**: `node`, `tag`, `children`
//! - **Guards**: `eq`, `not`
//! - **Code generation**: `indent`, `lines`, `template`

use crate::actions::{ActionRegistry, NativeFn};
use crate::errors::{type_mismatch, ErrorKind, MetaError};
use crate::value::{AstNode, Value};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn require_arity(name: &str, args: &[Value], expected: usize) -> Result<(), MetaError> {
    if args.len() != expected {
        return Err(MetaError::new(ErrorKind::ActionArity {
            action: name.into(),
            expected: expected.to_string(),
            actual: args.len(),
        }));
    }
    Ok(())
}

fn require_arity_range(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> Result<(), MetaError> {
    if args.len() < min || args.len() > max {
        return Err(MetaError::new(ErrorKind::ActionArity {
            action: name.into(),
            expected: format!("{}..={}", min, max),
            actual: args.len(),
        }));
    }
    Ok(())
}

fn expect_str<'a>(value: &'a Value) -> Result<&'a str, MetaError> {
    value
        .as_str()
        .ok_or_else(|| type_mismatch("String", value.type_name()))
}

fn expect_list(value: &Value) -> Result<&[Value], MetaError> {
    value
        .as_list()
        .ok_or_else(|| type_mismatch("List", value.type_name()))
}

fn expect_node(value: &Value) -> Result<&AstNode, MetaError> {
    value
        .as_node()
        .ok_or_else(|| type_mismatch("Node", value.type_name()))
}

/// Largest count accepted where a number sizes generated text.
const MAX_COUNT: f64 = 1024.0;

fn expect_count(value: &Value) -> Result<usize, MetaError> {
    match value.as_number() {
        Some(n) if (0.0..=MAX_COUNT).contains(&n) && n.fract() == 0.0 => Ok(n as usize),
        Some(_) => Err(type_mismatch("integer between 0 and 1024", "Number")),
        None => Err(type_mismatch("non-negative integer", value.type_name())),
    }
}

fn joined(items: &[Value], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

// ============================================================================
// STRING OPERATIONS
// ============================================================================

/// Concatenates the display form of every argument.
///
/// Usage: concat(a, b, ...)
pub const ACTION_CONCAT: NativeFn = |args| Ok(Value::String(joined(args, "")));

/// Converts any value to its string form.
pub const ACTION_STR: NativeFn = |args| {
    require_arity("str", args, 1)?;
    Ok(Value::String(args[0].to_string()))
};

/// Joins a list into a string with an optional separator.
///
/// Usage: join(list) | join(list, sep)
pub const ACTION_JOIN: NativeFn = |args| {
    require_arity_range("join", args, 1, 2)?;
    let items = expect_list(&args[0])?;
    let separator = match args.get(1) {
        Some(sep) => expect_str(sep)?,
        None => "",
    };
    Ok(Value::String(joined(items, separator)))
};

/// Escapes a string for inclusion in a double-quoted literal.
pub const ACTION_ESCAPE: NativeFn = |args| {
    require_arity("escape", args, 1)?;
    let text = expect_str(&args[0])?;
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{c}' => out.push_str("\\f"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            other => out.push(other),
        }
    }
    Ok(Value::String(out))
};

/// Resolves the character after a backslash: `n` becomes a newline and so on.
/// Unknown escapes stand for themselves.
pub const ACTION_UNESCAPE: NativeFn = |args| {
    require_arity("unescape", args, 1)?;
    let text = expect_str(&args[0])?;
    let resolved = match text {
        "n" => "\n",
        "r" => "\r",
        "t" => "\t",
        "f" => "\u{c}",
        "0" => "\0",
        other => other,
    };
    Ok(Value::String(resolved.to_string()))
};

/// Parses a number from its text.
pub const ACTION_TO_NUMBER: NativeFn = |args| {
    require_arity("to_number", args, 1)?;
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Number)
            .map_err(|_| type_mismatch("numeric text", &format!("'{}'", s))),
        other => Err(type_mismatch("String", other.type_name())),
    }
};

// ============================================================================
// LIST OPERATIONS
// ============================================================================

pub const ACTION_LIST: NativeFn = |args| Ok(Value::List(args.to_vec()));

/// Prepends an item: cons(x, [a, b]) is [x, a, b].
pub const ACTION_CONS: NativeFn = |args| {
    require_arity("cons", args, 2)?;
    let tail = expect_list(&args[1])?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(args[0].clone());
    items.extend_from_slice(tail);
    Ok(Value::List(items))
};

/// Appends an item: append([a, b], x) is [a, b, x].
pub const ACTION_APPEND: NativeFn = |args| {
    require_arity("append", args, 2)?;
    let mut items = expect_list(&args[0])?.to_vec();
    items.push(args[1].clone());
    Ok(Value::List(items))
};

/// Concatenates two lists.
pub const ACTION_EXTEND: NativeFn = |args| {
    require_arity("extend", args, 2)?;
    let mut items = expect_list(&args[0])?.to_vec();
    items.extend_from_slice(expect_list(&args[1])?);
    Ok(Value::List(items))
};

/// First element of a list, or nil when empty.
pub const ACTION_FIRST: NativeFn = |args| {
    require_arity("first", args, 1)?;
    Ok(expect_list(&args[0])?.first().cloned().unwrap_or_default())
};

/// Length of a string (in characters), list, or node's children.
pub const ACTION_LEN: NativeFn = |args| {
    require_arity("len", args, 1)?;
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Node(node) => node.children.len(),
        other => return Err(type_mismatch("String, List or Node", other.type_name())),
    };
    Ok(Value::Number(len as f64))
};

pub const ACTION_IS_EMPTY: NativeFn = |args| {
    require_arity("is_empty", args, 1)?;
    let empty = match &args[0] {
        Value::Nil => true,
        Value::String(s) => s.is_empty(),
        Value::List(items) => items.is_empty(),
        Value::Node(node) => node.children.is_empty(),
        other => return Err(type_mismatch("String, List or Node", other.type_name())),
    };
    Ok(Value::Bool(empty))
};

// ============================================================================
// NODE OPERATIONS
// ============================================================================

/// Builds a node: node('Add', a, b).
pub const ACTION_NODE: NativeFn = |args| {
    let Some((tag, children)) = args.split_first() else {
        return Err(MetaError::new(ErrorKind::ActionArity {
            action: "node".into(),
            expected: "at least 1".into(),
            actual: 0,
        }));
    };
    Ok(Value::Node(AstNode::new(expect_str(tag)?, children.to_vec())))
};

pub const ACTION_TAG: NativeFn = |args| {
    require_arity("tag", args, 1)?;
    Ok(Value::String(expect_node(&args[0])?.tag.clone()))
};

pub const ACTION_CHILDREN: NativeFn = |args| {
    require_arity("children", args, 1)?;
    Ok(Value::List(expect_node(&args[0])?.children.clone()))
};

// ============================================================================
// GUARDS
// ============================================================================

pub const ACTION_EQ: NativeFn = |args| {
    require_arity("eq", args, 2)?;
    Ok(Value::Bool(args[0] == args[1]))
};

pub const ACTION_NOT: NativeFn = |args| {
    require_arity("not", args, 1)?;
    Ok(Value::Bool(!args[0].is_truthy()))
};

// ============================================================================
// CODE GENERATION
// ============================================================================

/// Indents every non-empty line of a text.
///
/// Usage: indent(text) | indent(text, width)   (width defaults to 2)
pub const ACTION_INDENT: NativeFn = |args| {
    require_arity_range("indent", args, 1, 2)?;
    let width = match args.get(1) {
        Some(width) => expect_count(width)?,
        None => 2,
    };
    let pad = " ".repeat(width);
    let text = args[0].to_string();
    let indented = text
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", pad, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Value::String(indented))
};

/// Joins a list with newlines.
pub const ACTION_LINES: NativeFn = |args| {
    require_arity("lines", args, 1)?;
    Ok(Value::String(joined(expect_list(&args[0])?, "\n")))
};

/// Fills each `{}` in a template with the next argument.
///
/// Usage: template('function {}() {{ {} }}', name, body)
/// `{{` and `}}` produce literal braces.
pub const ACTION_TEMPLATE: NativeFn = |args| {
    let Some((format, values)) = args.split_first() else {
        return Err(MetaError::new(ErrorKind::ActionArity {
            action: "template".into(),
            expected: "at least 1".into(),
            actual: 0,
        }));
    };
    let format = expect_str(format)?;
    let mut values = values.iter();
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        match (ch, next) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                out.push(ch);
            }
            ('{', Some('}')) => {
                chars.next();
                let Some(value) = values.next() else {
                    return Err(MetaError::new(ErrorKind::ActionArity {
                        action: "template".into(),
                        expected: "one argument per {}".into(),
                        actual: args.len() - 1,
                    }));
                };
                out.push_str(&value.to_string());
            }
            _ => out.push(ch),
        }
    }
    Ok(Value::String(out))
};

// ============================================================================
// REGISTRATION
// ============================================================================

/// Registers every standard action function.
pub fn register_std_actions(registry: &mut ActionRegistry) {
    registry.register("concat", ACTION_CONCAT);
    registry.register("str", ACTION_STR);
    registry.register("join", ACTION_JOIN);
    registry.register("escape", ACTION_ESCAPE);
    registry.register("unescape", ACTION_UNESCAPE);
    registry.register("to_number", ACTION_TO_NUMBER);
    registry.register("list", ACTION_LIST);
    registry.register("cons", ACTION_CONS);
    registry.register("append", ACTION_APPEND);
    registry.register("extend", ACTION_EXTEND);
    registry.register("first", ACTION_FIRST);
    registry.register("len", ACTION_LEN);
    registry.register("is_empty", ACTION_IS_EMPTY);
    registry.register("node", ACTION_NODE);
    registry.register("tag", ACTION_TAG);
    registry.register("children", ACTION_CHILDREN);
    registry.register("eq", ACTION_EQ);
    registry.register("not", ACTION_NOT);
    registry.register("indent", ACTION_INDENT);
    registry.register("lines", ACTION_LINES);
    registry.register("template", ACTION_TEMPLATE);
}
