//! Load-time grammar checks.
//!
//! Every rule body is walked once when a grammar is built. Each check focuses
//! on a single concern and reports the first problem it finds.

use std::sync::Arc;

use crate::engine::builtins::{builtin_arity, Arity};
use crate::errors::{ErrorKind, MetaError};
use crate::grammar::{Expr, Grammar, Rule};

/// Runs every check over the grammar's local rules.
pub fn check_grammar(grammar: &Arc<Grammar>) -> Result<(), MetaError> {
    for rule in grammar.rules() {
        check_rule_references(grammar, rule)?;
    }
    Ok(())
}

/// Checks that every application in `rule` names a reachable rule with the
/// right number of arguments.
pub fn check_rule_references(grammar: &Arc<Grammar>, rule: &Rule) -> Result<(), MetaError> {
    let mut outcome = Ok(());
    rule.body.walk(&mut |expr| {
        if outcome.is_ok() {
            outcome = check_application(grammar, expr);
        }
    });
    outcome
}

fn check_application(grammar: &Arc<Grammar>, expr: &Expr) -> Result<(), MetaError> {
    match expr {
        Expr::Apply { rule, args } => {
            if let Some((_, target)) = grammar.resolve(rule) {
                return check_arity(&target, args.len());
            }
            match builtin_arity(rule) {
                Some(arity) => check_builtin_arity(rule, arity, args.len()),
                None => Err(unknown_rule(rule, grammar.name())),
            }
        }
        Expr::Super { rule, args } => {
            let Some(parent) = grammar.parent() else {
                return Err(unknown_rule(rule, &format!("parent of {}", grammar.name())));
            };
            if let Some((_, target)) = parent.resolve(rule) {
                return check_arity(&target, args.len());
            }
            match builtin_arity(rule) {
                Some(arity) => check_builtin_arity(rule, arity, args.len()),
                None => Err(unknown_rule(rule, parent.name())),
            }
        }
        Expr::Foreign {
            grammar: name,
            rule,
            args,
        } => {
            let Some(imported) = grammar.import(name) else {
                return Err(ErrorKind::UnknownGrammar { name: name.clone() }.into());
            };
            if let Some((_, target)) = imported.resolve(rule) {
                return check_arity(&target, args.len());
            }
            match builtin_arity(rule) {
                Some(arity) => check_builtin_arity(rule, arity, args.len()),
                None => Err(unknown_rule(rule, imported.name())),
            }
        }
        _ => Ok(()),
    }
}

fn check_arity(rule: &Rule, actual: usize) -> Result<(), MetaError> {
    if rule.params.len() == actual {
        return Ok(());
    }
    Err(ErrorKind::ArityMismatch {
        rule: rule.name.clone(),
        expected: rule.params.len().to_string(),
        actual,
    }
    .into())
}

fn check_builtin_arity(rule: &str, arity: Arity, actual: usize) -> Result<(), MetaError> {
    if arity.accepts(actual) {
        return Ok(());
    }
    Err(ErrorKind::ArityMismatch {
        rule: rule.to_string(),
        expected: arity.to_string(),
        actual,
    }
    .into())
}

fn unknown_rule(rule: &str, grammar: &str) -> MetaError {
    MetaError::new(ErrorKind::UnknownRule {
        rule: rule.to_string(),
        grammar: grammar.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use crate::actions::HostExpr;
    use crate::grammar::expr::*;
    use crate::grammar::Grammar;
    use crate::errors::ErrorKind;

    #[test]
    fn unknown_reference_is_a_load_error() {
        let err = Grammar::builder("G")
            .rule("start", seq(vec![app("digit"), app("missing")]))
            .build()
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownRule { ref rule, .. } if rule == "missing"));
    }

    #[test]
    fn arity_is_checked_for_rules_and_builtins() {
        let err = Grammar::builder("G")
            .rule_with_params("pair", &["x", "y"], act(HostExpr::var("x")))
            .rule("start", call("pair", vec![HostExpr::lit("a")]))
            .build()
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ArityMismatch { actual: 1, .. }));

        let err = Grammar::builder("G")
            .rule("start", call("token", vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ArityMismatch { actual: 0, .. }));
    }

    #[test]
    fn foreign_application_requires_an_import() {
        let err = Grammar::builder("G")
            .rule("start", foreign("Other", "x", vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownGrammar { .. }));

        let other = Grammar::builder("Other").rule("x", lit("x")).build().unwrap();
        assert!(Grammar::builder("G")
            .import(other)
            .rule("start", foreign("Other", "x", vec![]))
            .build()
            .is_ok());
    }

    #[test]
    fn super_requires_a_parent_definition() {
        let err = Grammar::builder("G")
            .rule("start", sup("start", vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownRule { .. }));
    }
}
