//! Transform pass: walks a tree with a translate grammar and emits text.
//!
//! The tree root is the single element of an item input. Translate grammars
//! usually enter each node with a nested match and dispatch on its tag:
//!
//! ```text
//! trans = [:t apply(t):r] -> r
//!       | number:n -> str(n) ;
//! Add   = trans:a trans:b -> concat('(', a, ' + ', b, ')') ;
//! ```

use std::sync::Arc;

use crate::engine::{Engine, Input, MatchResult, ParseFailure};
use crate::errors::{ErrorKind, MetaError};
use crate::grammar::Grammar;
use crate::value::Value;

impl Engine {
    /// Runs `entry` of `grammar` over `root` and returns the produced text.
    pub fn translate(
        &self,
        root: &Value,
        grammar: &Arc<Grammar>,
        entry: &str,
    ) -> Result<String, MetaError> {
        let input = Arc::new(Input::items(vec![root.clone()]));
        match self.run(grammar, entry, input, &[], true)? {
            MatchResult::Success { value, .. } => Ok(render(&value)),
            MatchResult::Failure(failure) => Err(transform_error(root, failure)),
        }
    }
}

/// Text of a translation result; lists are concatenated.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::List(items) => items.iter().map(render).collect(),
        other => other.to_string(),
    }
}

fn transform_error(root: &Value, failure: ParseFailure) -> MetaError {
    let tag = failure.tags.last().cloned().unwrap_or_else(|| match root {
        Value::Node(node) => node.tag.clone(),
        other => other.type_name().to_string(),
    });
    let help = format!(
        "no alternative matched inside {}",
        if failure.tags.is_empty() {
            "the root".to_string()
        } else {
            failure.tags.join(" > ")
        }
    );
    MetaError::new(ErrorKind::Transform {
        tag,
        path: failure.tags.clone(),
        failure,
    })
    .with_help(help)
}
