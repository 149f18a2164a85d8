//! Furthest-failure tracking.
//!
//! Every failed terminal is offered to the tracker; only failures at the
//! furthest location survive. Locations are compared as paths through nested
//! frames, so a failure inside the element at position `p` is further than
//! one at `p` itself and nearer than one at `p + 1`.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// The furthest match failure of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParseFailure {
    /// Positions through nested frames; the last one is in the innermost input.
    pub location: Vec<usize>,
    /// 1-based line and column, when the innermost input is text.
    pub line: Option<(usize, usize)>,
    /// Outermost rules that were attempted at the location.
    pub rules: BTreeSet<String>,
    /// Terminals expected there outside of those rules.
    pub expected: BTreeSet<String>,
    /// What was found instead.
    pub found: String,
    /// Tags of the AST nodes enclosing the location, outermost first.
    pub tags: Vec<String>,
}

impl ParseFailure {
    /// Position within the innermost input.
    pub fn position(&self) -> usize {
        self.location.last().copied().unwrap_or(0)
    }

    /// What was expected, as one phrase.
    pub fn expected_summary(&self) -> String {
        if self.rules.is_empty() && self.expected.is_empty() {
            return "valid input".to_string();
        }
        self.expected
            .iter()
            .chain(self.rules.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Folds `other` in: a further failure replaces this one, an equally far
    /// one contributes its expectations.
    pub(crate) fn merge(&mut self, other: ParseFailure) {
        match other.location.cmp(&self.location) {
            Ordering::Less => {}
            Ordering::Greater => *self = other,
            Ordering::Equal => {
                self.expected.extend(other.expected);
                self.rules.extend(other.rules);
            }
        }
    }

    /// Attributes everything expected here to `rule`, which was attempted at
    /// this location.
    pub(crate) fn attribute_to(&mut self, rule: &str) {
        self.expected.clear();
        self.rules.clear();
        self.rules.insert(rule.to_string());
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {} before '{}'", self.expected_summary(), self.found)?;
        match self.line {
            Some((line, col)) => write!(f, " (at line: {}, char: {})", line, col),
            None => write!(f, " (at pos: {})", self.position()),
        }
    }
}
