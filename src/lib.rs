//! # metagram
//!
//! A PEG matching engine that reads its own grammar notation. Grammars are
//! ordered-choice rule sets with semantic actions; the same engine matches
//! character text and sequences of structured values, so one grammar can
//! parse source into a tree and another can translate that tree back into
//! text.
//!
//! ```rust
//! let calc = metagram::load_grammar(
//!     "grammar Digits { number = <digit+>:n -> to_number(n) ; }",
//! )
//! .unwrap();
//! let value = metagram::match_all(&calc, "number", "42").unwrap();
//! assert_eq!(value, metagram::Value::Number(42.0));
//! ```

use std::sync::Arc;

pub use crate::actions::{ActionRegistry, HostExpr, NativeFn};
pub use crate::bootstrap::{meta_grammar, GrammarDecl, Library, META_GRAMMAR_SOURCE};
pub use crate::engine::{Cursor, Engine, Input, MatchOptions, MatchResult, ParseFailure};
pub use crate::errors::{ErrorCategory, ErrorKind, MetaError, SourceContext};
pub use crate::grammar::{Expr, Grammar, GrammarBuilder, Rule};
pub use crate::translate::render;
pub use crate::value::{AstNode, Value};

pub mod actions;
pub mod bootstrap;
pub mod cli;
pub mod engine;
pub mod errors;
pub mod grammar;
pub mod translate;
pub mod value;

/// Applies `rule` at the start of `input` with a default [`Engine`].
pub fn match_rule(
    grammar: &Arc<Grammar>,
    rule: &str,
    input: impl Into<Input>,
    args: &[Value],
) -> Result<MatchResult, MetaError> {
    Engine::new().match_rule(grammar, rule, input, args)
}

/// Applies `rule` to the whole of `input` with a default [`Engine`].
pub fn match_all(
    grammar: &Arc<Grammar>,
    rule: &str,
    input: impl Into<Input>,
) -> Result<Value, MetaError> {
    Engine::new().match_all(grammar, rule, input)
}

/// Loads a standalone grammar description (no parent, no imports).
pub fn load_grammar(source: &str) -> Result<Arc<Grammar>, MetaError> {
    Library::new()?.load(source)
}

/// Runs translate rule `entry` over `root` with a default [`Engine`].
pub fn translate(root: &Value, grammar: &Arc<Grammar>, entry: &str) -> Result<String, MetaError> {
    Engine::new().translate(root, grammar, entry)
}
