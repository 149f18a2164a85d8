//! Rule bodies: the closed set of combinators the engine evaluates.
//!
//! The free functions at the bottom are the construction vocabulary used for
//! hand-built grammars (the bootstrap meta-grammar among them).

use serde::{Deserialize, Serialize};

use crate::actions::HostExpr;
use crate::value::Value;

/// A combinator expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Any single element.
    Any,
    /// One element equal to the value. Against text, a one-character string
    /// matches that character.
    Terminal(Value),
    /// A run of characters against text; one equal string element against items.
    Literal(String),
    /// One character within the inclusive range.
    Range(char, char),
    Sequence(Vec<Expr>),
    Choice(Vec<Expr>),
    /// Greedy repetition. `max == Some(1)` yields the single value or nil;
    /// every other form yields a list.
    Repeat {
        expr: Box<Expr>,
        min: usize,
        max: Option<usize>,
    },
    /// Zero-width assertion.
    Lookahead { expr: Box<Expr>, negate: bool },
    /// Applies a rule, resolved from the grammar being matched.
    Apply { rule: String, args: Vec<HostExpr> },
    /// Applies the parent grammar's version of a rule.
    Super { rule: String, args: Vec<HostExpr> },
    /// Applies a rule of an imported grammar.
    Foreign {
        grammar: String,
        rule: String,
        args: Vec<HostExpr>,
    },
    Bind { name: String, expr: Box<Expr> },
    /// Produces a value without consuming input.
    Action(HostExpr),
    /// Guard: fails unless the value is truthy.
    Predicate(HostExpr),
    /// Matches inside the next element (a list, node or string), which must
    /// be consumed entirely.
    Nested(Box<Expr>),
    /// Yields what the inner expression consumed.
    Capture(Box<Expr>),
}

impl Expr {
    /// Short description used in failure messages.
    pub fn describe(&self) -> String {
        match self {
            Expr::Any => "anything".into(),
            Expr::Terminal(value) => value.describe(),
            Expr::Literal(text) => format!("'{}'", text.escape_default()),
            Expr::Range(from, to) => {
                format!("'{}'..'{}'", from.escape_default(), to.escape_default())
            }
            Expr::Apply { rule, .. } | Expr::Super { rule, .. } => rule.clone(),
            Expr::Foreign { grammar, rule, .. } => format!("{}.{}", grammar, rule),
            Expr::Nested(_) => "a nested sequence".into(),
            Expr::Predicate(_) => "a true guard".into(),
            _ => "an expression".into(),
        }
    }

    /// Calls every sub-expression, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Expr)) {
        visit(self);
        match self {
            Expr::Sequence(items) | Expr::Choice(items) => {
                items.iter().for_each(|item| item.walk(visit))
            }
            Expr::Repeat { expr, .. }
            | Expr::Lookahead { expr, .. }
            | Expr::Bind { expr, .. }
            | Expr::Nested(expr)
            | Expr::Capture(expr) => expr.walk(visit),
            _ => {}
        }
    }
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

pub fn any() -> Expr {
    Expr::Any
}

pub fn seq(items: Vec<Expr>) -> Expr {
    Expr::Sequence(items)
}

pub fn alt(alternatives: Vec<Expr>) -> Expr {
    Expr::Choice(alternatives)
}

pub fn many(expr: Expr) -> Expr {
    repeat(expr, 0, None)
}

pub fn many1(expr: Expr) -> Expr {
    repeat(expr, 1, None)
}

pub fn opt(expr: Expr) -> Expr {
    repeat(expr, 0, Some(1))
}

pub fn repeat(expr: Expr, min: usize, max: Option<usize>) -> Expr {
    Expr::Repeat {
        expr: Box::new(expr),
        min,
        max,
    }
}

pub fn not(expr: Expr) -> Expr {
    Expr::Lookahead {
        expr: Box::new(expr),
        negate: true,
    }
}

pub fn look(expr: Expr) -> Expr {
    Expr::Lookahead {
        expr: Box::new(expr),
        negate: false,
    }
}

pub fn app(rule: &str) -> Expr {
    call(rule, vec![])
}

pub fn call(rule: &str, args: Vec<HostExpr>) -> Expr {
    Expr::Apply {
        rule: rule.to_string(),
        args,
    }
}

pub fn sup(rule: &str, args: Vec<HostExpr>) -> Expr {
    Expr::Super {
        rule: rule.to_string(),
        args,
    }
}

pub fn foreign(grammar: &str, rule: &str, args: Vec<HostExpr>) -> Expr {
    Expr::Foreign {
        grammar: grammar.to_string(),
        rule: rule.to_string(),
        args,
    }
}

pub fn bind(name: &str, expr: Expr) -> Expr {
    Expr::Bind {
        name: name.to_string(),
        expr: Box::new(expr),
    }
}

pub fn act(host: HostExpr) -> Expr {
    Expr::Action(host)
}

pub fn pred(host: HostExpr) -> Expr {
    Expr::Predicate(host)
}

/// Exact text.
pub fn lit(text: &str) -> Expr {
    Expr::Literal(text.to_string())
}

/// Token: the grammar's `spaces`, then the exact text.
pub fn tok(text: &str) -> Expr {
    call("token", vec![HostExpr::lit(text)])
}

/// A string element (symbol) in item input.
pub fn sym(name: &str) -> Expr {
    Expr::Terminal(Value::String(name.to_string()))
}

pub fn num(n: f64) -> Expr {
    Expr::Terminal(Value::Number(n))
}

pub fn range(from: char, to: char) -> Expr {
    Expr::Range(from, to)
}

pub fn nested(expr: Expr) -> Expr {
    Expr::Nested(Box::new(expr))
}

pub fn capture(expr: Expr) -> Expr {
    Expr::Capture(Box::new(expr))
}
