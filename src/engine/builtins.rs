//! Builtin rules.
//!
//! Every grammar can apply these without defining them. A grammar rule of
//! the same name takes precedence, which is how grammars customize `spaces`
//! (and with it every `token`).

use std::fmt;
use std::sync::Arc;

use crate::engine::{Matcher, Step};
use crate::errors::{self, ErrorKind};
use crate::grammar::Grammar;
use crate::value::Value;

/// Number of arguments a builtin accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

const BUILTINS: &[(&str, Arity)] = &[
    ("anything", Arity::Exactly(0)),
    ("end", Arity::Exactly(0)),
    ("empty", Arity::Exactly(0)),
    ("space", Arity::Exactly(0)),
    ("spaces", Arity::Exactly(0)),
    ("digit", Arity::Exactly(0)),
    ("letter", Arity::Exactly(0)),
    ("char", Arity::Exactly(0)),
    ("string", Arity::Exactly(0)),
    ("number", Arity::Exactly(0)),
    ("pos", Arity::Exactly(0)),
    ("col", Arity::Exactly(0)),
    ("seq", Arity::Exactly(1)),
    ("token", Arity::Exactly(1)),
    ("exactly", Arity::Exactly(1)),
    ("apply", Arity::AtLeast(1)),
];

pub fn builtin_arity(name: &str) -> Option<Arity> {
    BUILTINS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, arity)| *arity)
}

pub fn builtin_names() -> impl Iterator<Item = &'static str> {
    BUILTINS.iter().map(|(name, _)| *name)
}

pub(crate) fn apply_builtin(
    m: &mut Matcher<'_>,
    dispatch: &Arc<Grammar>,
    name: &str,
    mut args: Vec<Value>,
) -> Step {
    let Some(arity) = builtin_arity(name) else {
        return Err(ErrorKind::UnknownRule {
            rule: name.to_string(),
            grammar: dispatch.name().to_string(),
        }
        .into());
    };
    if !arity.accepts(args.len()) {
        return Err(ErrorKind::ArityMismatch {
            rule: name.to_string(),
            expected: arity.to_string(),
            actual: args.len(),
        }
        .into());
    }

    match name {
        "anything" => m.any(),
        "end" => {
            if m.at_end() {
                Ok(Some(Value::Nil))
            } else {
                m.fail(|| "end of input".to_string())
            }
        }
        "empty" => Ok(Some(Value::Nil)),
        "space" => m.char_class(char::is_whitespace, || "space".to_string()),
        "spaces" => {
            let mut pos = m.pos();
            while m.input().char_at(pos).is_some_and(char::is_whitespace) {
                pos += 1;
            }
            m.advance(pos);
            Ok(Some(Value::Nil))
        }
        "digit" => m.char_class(|c| c.is_ascii_digit(), || "digit".to_string()),
        "letter" => m.char_class(char::is_alphabetic, || "letter".to_string()),
        "char" => m.char_class(|_| true, || "a character".to_string()),
        "string" => element_of_type(m, "string", |v| matches!(v, Value::String(_))),
        "number" => element_of_type(m, "number", |v| matches!(v, Value::Number(_))),
        "pos" => Ok(Some(Value::Number(m.pos() as f64))),
        "col" => column(m),
        "seq" => seq(m, &args[0]),
        "token" => {
            let start = m.pos();
            if m.apply_named(dispatch, "spaces", vec![], false)?.is_none() {
                return Ok(None);
            }
            let outcome = seq(m, &args[0])?;
            if outcome.is_none() {
                m.advance(start);
            }
            Ok(outcome)
        }
        "exactly" => m.exactly(&args[0]),
        "apply" => {
            let rest = args.split_off(1);
            match &args[0] {
                Value::String(rule) => m.apply_named(dispatch, rule, rest, true),
                other => {
                    let described = other.describe();
                    m.fail(|| format!("a rule for {}", described))
                }
            }
        }
        _ => Err(errors::malformed(format!("builtin '{}' has no implementation", name))),
    }
}

/// The characters of a string in text, one equal element in items.
fn seq(m: &mut Matcher<'_>, expected: &Value) -> Step {
    match expected {
        Value::String(text) => m.literal(text),
        other if !m.input().is_text() => m.exactly(other),
        other => Err(errors::type_mismatch("String", other.type_name())),
    }
}

/// Characters since the last newline; only text has columns.
fn column(m: &mut Matcher<'_>) -> Step {
    if !m.input().is_text() {
        return m.fail(|| "text input".to_string());
    }
    let mut start = m.pos();
    while start > 0 && m.input().char_at(start - 1) != Some('\n') {
        start -= 1;
    }
    Ok(Some(Value::Number((m.pos() - start) as f64)))
}

fn element_of_type(m: &mut Matcher<'_>, name: &str, accepts: fn(&Value) -> bool) -> Step {
    if m.input().is_text() {
        return m.fail(|| name.to_string());
    }
    match m.input().element(m.pos()) {
        Some(value) if accepts(&value) => {
            m.advance(m.pos() + 1);
            Ok(Some(value))
        }
        _ => m.fail(|| name.to_string()),
    }
}
