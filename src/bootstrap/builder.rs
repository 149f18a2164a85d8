//! Turns the tree produced by the meta-grammar into grammar declarations.
//!
//! The tree uses one node tag per construct of the notation. Every shape is
//! checked; anything unexpected is a [`MalformedGrammar`](crate::errors::ErrorKind::MalformedGrammar)
//! error rather than a panic, since a customized meta-grammar can produce
//! arbitrary trees.

use crate::actions::HostExpr;
use crate::errors::{malformed, MetaError};
use crate::grammar::expr::{self, Expr};
use crate::grammar::Rule;
use crate::engine::input::single_char;
use crate::value::{AstNode, Value};

/// A parsed but unresolved grammar: parent and imports are still names.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarDecl {
    pub name: String,
    pub parent: Option<String>,
    pub imports: Vec<String>,
    pub rules: Vec<Rule>,
}

impl GrammarDecl {
    /// Names of the grammars this one needs loaded first.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.parent
            .iter()
            .chain(self.imports.iter())
            .map(String::as_str)
    }
}

// ============================================================================
// TREE ACCESS
// ============================================================================

fn as_node<'a>(value: &'a Value, what: &str) -> Result<&'a AstNode, MetaError> {
    value
        .as_node()
        .ok_or_else(|| malformed(format!("expected {} node, found {}", what, value)))
}

fn as_list<'a>(value: &'a Value, what: &str) -> Result<&'a [Value], MetaError> {
    value
        .as_list()
        .ok_or_else(|| malformed(format!("expected a list of {}, found {}", what, value)))
}

fn as_string(value: &Value, what: &str) -> Result<String, MetaError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(format!("expected {} as a string, found {}", what, value)))
}

fn as_char(value: &Value) -> Result<char, MetaError> {
    value
        .as_str()
        .and_then(single_char)
        .ok_or_else(|| malformed(format!("range bounds must be single characters, found {}", value)))
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// Reads a `Grammar` node.
pub fn grammar_decl(tree: &Value) -> Result<GrammarDecl, MetaError> {
    let node = as_node(tree, "a Grammar")?;
    let [name, parent, imports, rules] = node.children.as_slice() else {
        return Err(malformed(format!("unexpected grammar node {}", node)));
    };
    if node.tag != "Grammar" {
        return Err(malformed(format!("expected a Grammar node, found @{}", node.tag)));
    }

    let parent = match parent {
        Value::Nil => None,
        other => Some(as_string(other, "a parent name")?),
    };
    let imports = as_list(imports, "imports")?
        .iter()
        .map(|import| as_string(import, "an import"))
        .collect::<Result<_, _>>()?;
    let rules = as_list(rules, "rules")?
        .iter()
        .map(rule_decl)
        .collect::<Result<_, _>>()?;

    Ok(GrammarDecl {
        name: as_string(name, "a grammar name")?,
        parent,
        imports,
        rules,
    })
}

fn rule_decl(tree: &Value) -> Result<Rule, MetaError> {
    let node = as_node(tree, "a Rule")?;
    match (node.tag.as_str(), node.children.as_slice()) {
        ("Rule", [name, params, body]) => {
            let params = as_list(params, "parameters")?
                .iter()
                .map(|p| as_string(p, "a parameter"))
                .collect::<Result<_, _>>()?;
            Ok(Rule::new(as_string(name, "a rule name")?, params, build_expr(body)?))
        }
        _ => Err(malformed(format!("unexpected rule node {}", node))),
    }
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// Converts an expression node into an [`Expr`].
pub fn build_expr(tree: &Value) -> Result<Expr, MetaError> {
    let node = as_node(tree, "an expression")?;
    let children = node.children.as_slice();
    let expr = match (node.tag.as_str(), children) {
        ("Or", [items]) => {
            let mut items = build_all(items)?;
            if items.len() == 1 {
                items.remove(0)
            } else {
                Expr::Choice(items)
            }
        }
        ("And", [items]) => {
            let mut items = build_all(items)?;
            if items.len() == 1 {
                items.remove(0)
            } else {
                Expr::Sequence(items)
            }
        }
        ("Not", [inner]) => expr::not(build_expr(inner)?),
        ("Look", [inner]) => expr::look(build_expr(inner)?),
        ("Bind", [name, inner]) => expr::bind(&as_string(name, "a binding name")?, build_expr(inner)?),
        ("Many", [inner]) => expr::many(build_expr(inner)?),
        ("Many1", [inner]) => expr::many1(build_expr(inner)?),
        ("Opt", [inner]) => expr::opt(build_expr(inner)?),
        ("List", [inner]) => expr::nested(build_expr(inner)?),
        ("Capture", [inner]) => expr::capture(build_expr(inner)?),
        ("Pred", [host]) => expr::pred(build_host(host)?),
        ("Act", [host]) => expr::act(build_host(host)?),
        ("Range", [from, to]) => expr::range(as_char(from)?, as_char(to)?),
        ("Lit", [text]) => expr::lit(&as_string(text, "a literal")?),
        ("Tok", [text]) => expr::tok(&as_string(text, "a token")?),
        ("Sym", [text]) => expr::sym(&as_string(text, "a symbol")?),
        ("Num", [Value::Number(n)]) => expr::num(*n),
        ("Any", []) => expr::any(),
        ("Super", [rule, args]) => expr::sup(&as_string(rule, "a rule name")?, build_hosts(args)?),
        ("Foreign", [grammar, rule, args]) => expr::foreign(
            &as_string(grammar, "a grammar name")?,
            &as_string(rule, "a rule name")?,
            build_hosts(args)?,
        ),
        ("App", [rule, args]) => expr::call(&as_string(rule, "a rule name")?, build_hosts(args)?),
        _ => return Err(malformed(format!("unexpected expression node {}", node))),
    };
    Ok(expr)
}

fn build_all(items: &Value) -> Result<Vec<Expr>, MetaError> {
    as_list(items, "expressions")?.iter().map(build_expr).collect()
}

/// Converts an action node into a [`HostExpr`].
pub fn build_host(tree: &Value) -> Result<HostExpr, MetaError> {
    let node = as_node(tree, "an action")?;
    match (node.tag.as_str(), node.children.as_slice()) {
        ("HLit", [value]) => Ok(HostExpr::Literal(value.clone())),
        ("HVar", [name]) => Ok(HostExpr::Var(as_string(name, "a variable")?)),
        ("HList", [items]) => Ok(HostExpr::List(build_hosts(items)?)),
        ("HNode", [tag, args]) => Ok(HostExpr::node(&as_string(tag, "a tag")?, build_hosts(args)?)),
        ("HCall", [func, args]) => Ok(HostExpr::call(&as_string(func, "a function")?, build_hosts(args)?)),
        _ => Err(malformed(format!("unexpected action node {}", node))),
    }
}

fn build_hosts(items: &Value) -> Result<Vec<HostExpr>, MetaError> {
    as_list(items, "actions")?.iter().map(build_host).collect()
}
