//! # Grammar Representation
//!
//! A [`Grammar`] is an immutable, named collection of [`Rule`]s with an
//! optional parent grammar (rules absent locally are looked up in the parent
//! chain) and a set of imported grammars reachable through foreign
//! application. Grammars are built once through [`GrammarBuilder`], which
//! validates every rule reference, and are then shared behind `Arc`.
//!
//! ## Module Structure
//!
//! - **`expr`**: the combinator set and construction helpers
//! - **`validate`**: load-time checks (unknown rules, arity, inheritance cycles)

use im::OrdMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{ErrorKind, MetaError};

pub mod expr;
pub mod validate;

pub use expr::Expr;

// ============================================================================
// CORE TYPES
// ============================================================================

/// A named, possibly parameterized rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

impl Rule {
    pub fn new(name: impl Into<String>, params: Vec<String>, body: Expr) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }
}

/// An immutable grammar.
#[derive(Debug, Serialize)]
pub struct Grammar {
    name: String,
    parent: Option<Arc<Grammar>>,
    imports: BTreeMap<String, Arc<Grammar>>,
    rules: OrdMap<String, Arc<Rule>>,
}

impl Grammar {
    pub fn builder(name: impl Into<String>) -> GrammarBuilder {
        GrammarBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Grammar>> {
        self.parent.as_ref()
    }

    /// Rules defined locally, in name order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.values()
    }

    /// A locally defined rule.
    pub fn rule(&self, name: &str) -> Option<&Arc<Rule>> {
        self.rules.get(name)
    }

    /// Names of imported grammars, local imports only.
    pub fn imports(&self) -> impl Iterator<Item = &str> {
        self.imports.keys().map(String::as_str)
    }

    /// Finds `name` here or in the parent chain, along with the grammar that
    /// defines it.
    pub fn resolve(self: &Arc<Self>, name: &str) -> Option<(Arc<Grammar>, Arc<Rule>)> {
        let mut current = Some(self);
        while let Some(grammar) = current {
            if let Some(rule) = grammar.rules.get(name) {
                return Some((Arc::clone(grammar), Arc::clone(rule)));
            }
            current = grammar.parent.as_ref();
        }
        None
    }

    /// Whether `name` is defined here or in the parent chain.
    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.has_rule(name))
    }

    /// Finds an imported grammar here or in the parent chain.
    pub fn import(&self, name: &str) -> Option<&Arc<Grammar>> {
        self.imports
            .get(name)
            .or_else(|| self.parent.as_ref().and_then(|p| p.import(name)))
    }

    /// This grammar's name followed by its ancestors' names.
    pub fn ancestry(&self) -> Vec<String> {
        let mut chain = vec![self.name.clone()];
        let mut current = self.parent.as_ref();
        while let Some(grammar) = current {
            chain.push(grammar.name.clone());
            current = grammar.parent.as_ref();
        }
        chain
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects the parts of a grammar and validates them on [`build`](Self::build).
#[derive(Debug)]
pub struct GrammarBuilder {
    name: String,
    parent: Option<Arc<Grammar>>,
    imports: BTreeMap<String, Arc<Grammar>>,
    rules: Vec<Rule>,
}

impl GrammarBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            imports: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: Arc<Grammar>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn import(mut self, grammar: Arc<Grammar>) -> Self {
        self.imports.insert(grammar.name.clone(), grammar);
        self
    }

    /// Adds a rule without parameters.
    pub fn rule(self, name: &str, body: Expr) -> Self {
        self.rule_with_params(name, &[], body)
    }

    pub fn rule_with_params(mut self, name: &str, params: &[&str], body: Expr) -> Self {
        let params = params.iter().map(|p| p.to_string()).collect();
        self.rules.push(Rule::new(name, params, body));
        self
    }

    pub fn push_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Freezes the grammar, rejecting duplicate rules, inheritance cycles,
    /// unknown references and arity mismatches.
    pub fn build(self) -> Result<Arc<Grammar>, MetaError> {
        if let Some(parent) = &self.parent {
            let ancestry = parent.ancestry();
            if ancestry.contains(&self.name) {
                let mut chain = vec![self.name.clone()];
                chain.extend(ancestry);
                return Err(ErrorKind::CyclicParent { chain }.into());
            }
        }

        let mut rules = OrdMap::new();
        for rule in self.rules {
            if rules.contains_key(&rule.name) {
                return Err(ErrorKind::DuplicateRule {
                    rule: rule.name,
                    grammar: self.name,
                }
                .into());
            }
            rules.insert(rule.name.clone(), Arc::new(rule));
        }

        let grammar = Arc::new(Grammar {
            name: self.name,
            parent: self.parent,
            imports: self.imports,
            rules,
        });
        validate::check_grammar(&grammar)?;
        Ok(grammar)
    }
}
