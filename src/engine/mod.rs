//! # Matching Engine
//!
//! A recursive-descent evaluator for [`Expr`] combinators with ordered
//! choice, greedy repetition, packrat memoization, left-recursion support
//! and furthest-failure reporting. Text and item sequences go through the
//! same evaluator; an item input is how a tree is transformed.
//!
//! ## Module Structure
//!
//! - **`input`**: input sequences and cursors
//! - **`failure`**: the furthest-failure record
//! - **`memo`**: per-frame memo tables
//! - **`builtins`**: rules every grammar can apply without defining them
//!
//! A `Matcher` lives for one top-level match and owns all mutable state:
//! the frame stack (one frame per nested list being matched), the memo
//! tables, and the failure tracker. Grammars are only read.

use log::trace;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::actions::{ActionRegistry, HostExpr, Scope};
use crate::errors::{ErrorKind, MetaError};
use crate::grammar::{Expr, Grammar, Rule};
use crate::value::Value;

pub mod builtins;
mod failure;
pub mod input;
mod memo;

pub use failure::ParseFailure;
pub use input::{Cursor, Input};

use memo::{MemoEntry, MemoKey, MemoTable};

/// Outcome of one evaluation step: `Ok(None)` is an ordinary match failure,
/// `Err` is fatal.
pub(crate) type Step = Result<Option<Value>, MetaError>;

/// Name of the rule whose failures are never reported.
const SPACES: &str = "spaces";

/// Remaining stack below which a rule application moves to a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each stack segment allocated for deep rule nesting.
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

// ============================================================================
// CONFIGURATION & RESULTS
// ============================================================================

/// Knobs for a match run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Cache rule results. Turning this off never changes results.
    pub memoize: bool,
    /// Maximum nesting of rule applications.
    pub max_depth: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            memoize: true,
            max_depth: 2_000,
        }
    }
}

impl MatchOptions {
    pub fn memoize(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Success { value: Value, cursor: Cursor },
    Failure(ParseFailure),
}

impl MatchResult {
    pub fn is_success(&self) -> bool {
        matches!(self, MatchResult::Success { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            MatchResult::Success { value, .. } => Some(value),
            MatchResult::Failure(_) => None,
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        match self {
            MatchResult::Success { cursor, .. } => Some(cursor),
            MatchResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ParseFailure> {
        match self {
            MatchResult::Failure(failure) => Some(failure),
            MatchResult::Success { .. } => None,
        }
    }
}

// ============================================================================
// ENGINE
// ============================================================================

/// Action registry plus options: everything a match needs besides a grammar.
#[derive(Debug, Clone)]
pub struct Engine {
    pub registry: ActionRegistry,
    pub options: MatchOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the standard actions and default options.
    pub fn new() -> Self {
        Self::with_registry(ActionRegistry::standard())
    }

    pub fn with_registry(registry: ActionRegistry) -> Self {
        Self {
            registry,
            options: MatchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Applies `rule` at the start of `input`. Input may remain unconsumed.
    pub fn match_rule(
        &self,
        grammar: &Arc<Grammar>,
        rule: &str,
        input: impl Into<Input>,
        args: &[Value],
    ) -> Result<MatchResult, MetaError> {
        self.run(grammar, rule, Arc::new(input.into()), args, false)
    }

    /// Applies `rule` to the whole of `input`.
    pub fn match_all(
        &self,
        grammar: &Arc<Grammar>,
        rule: &str,
        input: impl Into<Input>,
    ) -> Result<Value, MetaError> {
        match self.run(grammar, rule, Arc::new(input.into()), &[], true)? {
            MatchResult::Success { value, .. } => Ok(value),
            MatchResult::Failure(failure) => Err(ErrorKind::Parse { failure }.into()),
        }
    }

    pub(crate) fn run(
        &self,
        grammar: &Arc<Grammar>,
        rule: &str,
        input: Arc<Input>,
        args: &[Value],
        require_end: bool,
    ) -> Result<MatchResult, MetaError> {
        if !grammar.has_rule(rule) && builtins::builtin_arity(rule).is_none() {
            return Err(ErrorKind::UnknownRule {
                rule: rule.to_string(),
                grammar: grammar.name().to_string(),
            }
            .into());
        }

        let mut matcher = Matcher::new(&self.registry, &self.options, Arc::clone(&input));
        let mut outcome = matcher.apply_named(grammar, rule, args.to_vec(), false)?;
        if require_end && outcome.is_some() && !matcher.at_end() {
            outcome = matcher.fail(|| "end of input".to_string())?;
        }

        Ok(match outcome {
            Some(value) => MatchResult::Success {
                value,
                cursor: Cursor::new(input).at(matcher.pos()),
            },
            None => MatchResult::Failure(matcher.into_failure()),
        })
    }
}

// ============================================================================
// MATCHER
// ============================================================================

/// One input being matched: the root input, or an element entered by a
/// nested match.
#[derive(Debug)]
struct Frame {
    input: Arc<Input>,
    pos: usize,
    /// Position of this frame's element in the enclosing frame.
    origin: usize,
    /// Tag of the node this frame walks, if it walks a node.
    tag: Option<String>,
    memo: MemoTable,
}

impl Frame {
    fn new(input: Arc<Input>, origin: usize, tag: Option<String>) -> Self {
        Self {
            input,
            pos: 0,
            origin,
            tag,
            memo: MemoTable::default(),
        }
    }
}

/// Evaluation context of a running rule.
struct Env {
    /// Grammar that plain applications resolve against.
    dispatch: Arc<Grammar>,
    /// Grammar that defines the running rule; super and foreign
    /// applications resolve relative to it.
    owner: Arc<Grammar>,
    scope: Scope,
    /// Start of the innermost running sequence in the current frame. A
    /// rejecting guard reports its failure there.
    sequence_start: Option<usize>,
}

pub(crate) struct Matcher<'e> {
    registry: &'e ActionRegistry,
    options: &'e MatchOptions,
    frame: Frame,
    parents: Vec<Frame>,
    furthest: Option<ParseFailure>,
    depth: usize,
}

impl<'e> Matcher<'e> {
    fn new(registry: &'e ActionRegistry, options: &'e MatchOptions, input: Arc<Input>) -> Self {
        Self {
            registry,
            options,
            frame: Frame::new(input, 0, None),
            parents: Vec::new(),
            furthest: None,
            depth: 0,
        }
    }

    // ------------------------------------------------------------------------
    // Cursor and failure primitives
    // ------------------------------------------------------------------------

    pub(crate) fn pos(&self) -> usize {
        self.frame.pos
    }

    pub(crate) fn at_end(&self) -> bool {
        self.frame.pos >= self.frame.input.len()
    }

    pub(crate) fn input(&self) -> &Input {
        &self.frame.input
    }

    pub(crate) fn advance(&mut self, to: usize) {
        self.frame.pos = to;
    }

    /// Location path of `pos` in the current frame.
    fn location(&self, pos: usize) -> Vec<usize> {
        let mut location: Vec<usize> = self
            .parents
            .iter()
            .chain(std::iter::once(&self.frame))
            .skip(1)
            .map(|frame| frame.origin)
            .collect();
        location.push(pos);
        location
    }

    fn tags(&self) -> Vec<String> {
        self.parents
            .iter()
            .chain(std::iter::once(&self.frame))
            .filter_map(|frame| frame.tag.clone())
            .collect()
    }

    /// Records that `describe()` was expected at the current position and
    /// returns a match failure.
    pub(crate) fn fail(&mut self, describe: impl FnOnce() -> String) -> Step {
        self.fail_at(self.frame.pos, describe)
    }

    fn fail_at(&mut self, pos: usize, describe: impl FnOnce() -> String) -> Step {
        let location = self.location(pos);
        if let Some(furthest) = &mut self.furthest {
            match location.cmp(&furthest.location) {
                std::cmp::Ordering::Less => return Ok(None),
                std::cmp::Ordering::Equal => {
                    furthest.expected.insert(describe());
                    return Ok(None);
                }
                std::cmp::Ordering::Greater => {}
            }
        }
        self.furthest = Some(ParseFailure {
            location,
            line: self.frame.input.line_col(pos),
            expected: [describe()].into_iter().collect(),
            found: self.frame.input.snippet(pos),
            tags: self.tags(),
            ..Default::default()
        });
        Ok(None)
    }

    fn record(&mut self, failure: ParseFailure) {
        match &mut self.furthest {
            Some(furthest) => furthest.merge(failure),
            None => self.furthest = Some(failure),
        }
    }

    fn into_failure(self) -> ParseFailure {
        match self.furthest {
            Some(failure) => failure,
            None => ParseFailure {
                location: vec![self.frame.pos],
                line: self.frame.input.line_col(self.frame.pos),
                found: self.frame.input.snippet(self.frame.pos),
                ..Default::default()
            },
        }
    }

    /// Start of the first token at or after `pos`: leading whitespace of text
    /// is skipped.
    fn token_start(&self, pos: usize) -> usize {
        let mut start = pos;
        if self.frame.input.is_text() {
            while self.frame.input.char_at(start).is_some_and(char::is_whitespace) {
                start += 1;
            }
        }
        start
    }

    // ------------------------------------------------------------------------
    // Terminals
    // ------------------------------------------------------------------------

    pub(crate) fn any(&mut self) -> Step {
        match self.frame.input.element(self.frame.pos) {
            Some(value) => {
                self.frame.pos += 1;
                Ok(Some(value))
            }
            None => self.fail(|| "anything".to_string()),
        }
    }

    /// One element equal to `expected`.
    pub(crate) fn exactly(&mut self, expected: &Value) -> Step {
        let pos = self.frame.pos;
        let matched = match (&*self.frame.input, expected) {
            (Input::Text(_), Value::String(s)) => input::single_char(s)
                .is_some_and(|c| self.frame.input.char_at(pos) == Some(c)),
            (Input::Text(_), _) => false,
            (Input::Items(items), _) => items.get(pos) == Some(expected),
        };
        if !matched {
            return self.fail(|| expected.describe());
        }
        self.frame.pos += 1;
        Ok(Some(expected.clone()))
    }

    /// A run of characters in text, or one equal string element in items.
    pub(crate) fn literal(&mut self, text: &str) -> Step {
        let pos = self.frame.pos;
        let end = match &*self.frame.input {
            Input::Text(_) => self.frame.input.starts_with_at(pos, text),
            Input::Items(items) => match items.get(pos) {
                Some(Value::String(s)) if s == text => Some(pos + 1),
                _ => None,
            },
        };
        match end {
            Some(end) => {
                self.frame.pos = end;
                Ok(Some(Value::String(text.to_string())))
            }
            None => self.fail(|| format!("'{}'", text.escape_default())),
        }
    }

    /// One character satisfying `accepts`.
    pub(crate) fn char_class(
        &mut self,
        accepts: impl Fn(char) -> bool,
        describe: impl FnOnce() -> String,
    ) -> Step {
        match self.frame.input.char_at(self.frame.pos) {
            Some(c) if accepts(c) => {
                self.frame.pos += 1;
                Ok(Some(Value::String(c.to_string())))
            }
            _ => self.fail(describe),
        }
    }

    // ------------------------------------------------------------------------
    // Rule application
    // ------------------------------------------------------------------------

    /// Applies `name` as seen from `dispatch`: a grammar rule, else a builtin.
    /// With `dynamic`, an unknown name is a match failure instead of an error.
    pub(crate) fn apply_named(
        &mut self,
        dispatch: &Arc<Grammar>,
        name: &str,
        args: Vec<Value>,
        dynamic: bool,
    ) -> Step {
        if let Some((owner, rule)) = dispatch.resolve(name) {
            return self.apply_rule(dispatch, owner, rule, args);
        }
        if builtins::builtin_arity(name).is_some() {
            return builtins::apply_builtin(self, dispatch, name, args);
        }
        if dynamic {
            return self.fail(|| format!("rule {}", name));
        }
        Err(ErrorKind::UnknownRule {
            rule: name.to_string(),
            grammar: dispatch.name().to_string(),
        }
        .into())
    }

    fn apply_rule(
        &mut self,
        dispatch: &Arc<Grammar>,
        owner: Arc<Grammar>,
        rule: Arc<Rule>,
        args: Vec<Value>,
    ) -> Step {
        if args.len() != rule.params.len() {
            return Err(ErrorKind::ArityMismatch {
                rule: rule.name.clone(),
                expected: rule.params.len().to_string(),
                actual: args.len(),
            }
            .into());
        }
        if self.depth >= self.options.max_depth {
            return Err(ErrorKind::RecursionLimit {
                limit: self.options.max_depth,
            }
            .into());
        }
        self.depth += 1;
        let outcome = stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.apply_memoized(dispatch, owner, rule, args)
        });
        self.depth -= 1;
        outcome
    }

    fn apply_memoized(
        &mut self,
        dispatch: &Arc<Grammar>,
        owner: Arc<Grammar>,
        rule: Arc<Rule>,
        args: Vec<Value>,
    ) -> Step {
        let start = self.frame.pos;
        let key = MemoKey::new(dispatch, &owner, &rule.name, &args, start);

        match self.frame.memo.get_mut(&key) {
            Some(MemoEntry::Active { left_recursive }) => {
                *left_recursive = true;
                trace!("left recursion in {} at {}", rule.name, start);
                return Ok(None);
            }
            Some(MemoEntry::Done {
                result,
                end,
                failure,
            }) => {
                let (result, end, failure) = (result.clone(), *end, failure.clone());
                trace!("memo hit {} at {}", rule.name, start);
                if let Some(failure) = failure {
                    self.record(failure);
                }
                if result.is_some() {
                    self.frame.pos = end;
                }
                return Ok(result);
            }
            None => {}
        }

        let mark = self.frame.memo.begin(key.clone());
        let saved = self.furthest.take();
        trace!("{:>width$} {} at {}", ">", rule.name, start, width = self.depth);

        let mut outcome = self.eval_body(dispatch, &owner, &rule, &args)?;
        if self.frame.memo.is_left_recursive(&key) {
            if let Some(mut value) = outcome.take() {
                let mut end = self.frame.pos;
                // Grow the seed until the body stops consuming more input.
                loop {
                    self.frame.memo.store(
                        key.clone(),
                        MemoEntry::Done {
                            result: Some(value.clone()),
                            end,
                            failure: None,
                        },
                    );
                    self.frame.memo.invalidate_after(mark);
                    self.frame.pos = start;
                    match self.eval_body(dispatch, &owner, &rule, &args)? {
                        Some(grown) if self.frame.pos > end => {
                            value = grown;
                            end = self.frame.pos;
                        }
                        _ => break,
                    }
                }
                self.frame.memo.invalidate_after(mark);
                self.frame.pos = end;
                outcome = Some(value);
            }
        }

        let end = self.frame.pos;
        if outcome.is_none() {
            self.frame.pos = start;
        }

        let mut local = std::mem::replace(&mut self.furthest, saved);
        if rule.name == SPACES {
            local = None;
        }
        if outcome.is_none() {
            let here = self.location(self.token_start(start));
            if let Some(failure) = local.as_mut().filter(|f| f.location == here) {
                failure.attribute_to(&rule.name);
            }
        }
        if let Some(failure) = &local {
            self.record(failure.clone());
        }
        trace!(
            "{:>width$} {} at {}: {}",
            "<",
            rule.name,
            start,
            if outcome.is_some() { "ok" } else { "fail" },
            width = self.depth
        );

        if self.options.memoize {
            self.frame.memo.store(
                key,
                MemoEntry::Done {
                    result: outcome.clone(),
                    end,
                    failure: local,
                },
            );
        } else {
            self.frame.memo.remove(&key);
        }
        Ok(outcome)
    }

    fn eval_body(
        &mut self,
        dispatch: &Arc<Grammar>,
        owner: &Arc<Grammar>,
        rule: &Rule,
        args: &[Value],
    ) -> Step {
        let scope = rule
            .params
            .iter()
            .cloned()
            .zip(args.iter().cloned())
            .collect();
        let mut env = Env {
            dispatch: Arc::clone(dispatch),
            owner: Arc::clone(owner),
            scope,
            sequence_start: None,
        };
        self.eval(&rule.body, &mut env)
    }

    fn evaluate_args(&self, args: &[HostExpr], env: &Env) -> Result<Vec<Value>, MetaError> {
        args.iter()
            .map(|arg| self.registry.evaluate(arg, &env.scope))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Combinators
    // ------------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, env: &mut Env) -> Step {
        match expr {
            Expr::Any => self.any(),
            Expr::Terminal(value) => self.exactly(value),
            Expr::Literal(text) => self.literal(text),
            Expr::Range(from, to) => {
                let (from, to) = (*from, *to);
                self.char_class(|c| from <= c && c <= to, || expr.describe())
            }
            Expr::Sequence(items) => self.sequence(items, env),
            Expr::Choice(alternatives) => self.choice(alternatives, env),
            Expr::Repeat { expr, min, max } => self.repeat(expr, *min, *max, env),
            Expr::Lookahead { expr, negate } => self.lookahead(expr, *negate, env),
            Expr::Apply { rule, args } => {
                let args = self.evaluate_args(args, env)?;
                let dispatch = Arc::clone(&env.dispatch);
                self.apply_named(&dispatch, rule, args, false)
            }
            Expr::Super { rule, args } => {
                let args = self.evaluate_args(args, env)?;
                self.apply_super(env, rule, args)
            }
            Expr::Foreign {
                grammar,
                rule,
                args,
            } => {
                let args = self.evaluate_args(args, env)?;
                let Some(imported) = env.owner.import(grammar).cloned() else {
                    return Err(ErrorKind::UnknownGrammar {
                        name: grammar.clone(),
                    }
                    .into());
                };
                self.apply_named(&imported, rule, args, false)
            }
            Expr::Bind { name, expr } => {
                let outcome = self.eval(expr, env)?;
                if let Some(value) = &outcome {
                    env.scope.insert(name.clone(), value.clone());
                }
                Ok(outcome)
            }
            Expr::Action(host) => Ok(Some(self.registry.evaluate(host, &env.scope)?)),
            Expr::Predicate(host) => {
                let value = self.registry.evaluate(host, &env.scope)?;
                if value.is_truthy() {
                    return Ok(Some(value));
                }
                let at = env.sequence_start.unwrap_or(self.frame.pos);
                self.fail_at(at, || expr.describe())
            }
            Expr::Nested(expr) => self.nested(expr, env),
            Expr::Capture(expr) => {
                let start = self.frame.pos;
                let outcome = self.eval(expr, env)?;
                Ok(outcome.map(|_| self.frame.input.slice(start, self.frame.pos)))
            }
        }
    }

    fn sequence(&mut self, items: &[Expr], env: &mut Env) -> Step {
        let start = self.frame.pos;
        let enclosing = env.sequence_start.replace(start);
        let outcome = self.sequence_items(items, env);
        env.sequence_start = enclosing;
        if !matches!(outcome, Ok(Some(_))) {
            self.frame.pos = start;
        }
        outcome
    }

    fn sequence_items(&mut self, items: &[Expr], env: &mut Env) -> Step {
        let mut last = Value::Nil;
        for item in items {
            match self.eval(item, env)? {
                Some(value) => last = value,
                None => return Ok(None),
            }
        }
        Ok(Some(last))
    }

    fn choice(&mut self, alternatives: &[Expr], env: &mut Env) -> Step {
        let start = self.frame.pos;
        for alternative in alternatives {
            if let Some(value) = self.eval(alternative, env)? {
                return Ok(Some(value));
            }
            self.frame.pos = start;
        }
        Ok(None)
    }

    fn repeat(&mut self, expr: &Expr, min: usize, max: Option<usize>, env: &mut Env) -> Step {
        let start = self.frame.pos;
        let mut values = Vec::new();
        while max.map_or(true, |max| values.len() < max) {
            let before = self.frame.pos;
            match self.eval(expr, env)? {
                Some(value) => values.push(value),
                None => break,
            }
            if self.frame.pos == before {
                // Further iterations would match the same empty input.
                if let Some(value) = values.last().cloned() {
                    let required = max.map_or(min, |max| min.min(max));
                    while values.len() < required {
                        values.push(value.clone());
                    }
                }
                break;
            }
        }
        if values.len() < min {
            self.frame.pos = start;
            return Ok(None);
        }
        if max == Some(1) {
            return Ok(Some(values.into_iter().next().unwrap_or_default()));
        }
        Ok(Some(Value::List(values)))
    }

    fn lookahead(&mut self, expr: &Expr, negate: bool, env: &mut Env) -> Step {
        let start = self.frame.pos;
        if !negate {
            let outcome = self.eval(expr, env)?;
            self.frame.pos = start;
            return Ok(outcome);
        }

        let saved = self.furthest.take();
        let outcome = self.eval(expr, env);
        self.furthest = saved;
        self.frame.pos = start;
        match outcome? {
            Some(_) => Ok(None),
            None => Ok(Some(Value::Nil)),
        }
    }

    fn apply_super(&mut self, env: &Env, rule: &str, args: Vec<Value>) -> Step {
        let dispatch = Arc::clone(&env.dispatch);
        let unknown = || -> MetaError {
            ErrorKind::UnknownRule {
                rule: rule.to_string(),
                grammar: format!("parent of {}", env.owner.name()),
            }
            .into()
        };
        let Some(parent) = env.owner.parent().cloned() else {
            return Err(unknown());
        };
        match parent.resolve(rule) {
            Some((owner, target)) => self.apply_rule(&dispatch, owner, target, args),
            None if builtins::builtin_arity(rule).is_some() => {
                builtins::apply_builtin(self, &dispatch, rule, args)
            }
            None => Err(unknown()),
        }
    }

    /// Matches `expr` against the contents of the next element, which must be
    /// consumed entirely.
    fn nested(&mut self, expr: &Expr, env: &mut Env) -> Step {
        let origin = self.frame.pos;
        let (contents, tag) = match self.frame.input.element(origin) {
            Some(Value::List(items)) => (Input::Items(items), None),
            Some(Value::Node(node)) => {
                let tag = node.tag.clone();
                (Input::Items(node.elements()), Some(tag))
            }
            Some(Value::String(text)) if !self.frame.input.is_text() => (Input::text(&text), None),
            _ => return self.fail(|| "a list".to_string()),
        };

        let child = Frame::new(Arc::new(contents), origin, tag);
        self.parents.push(std::mem::replace(&mut self.frame, child));
        let enclosing = env.sequence_start.take();
        let outcome = match self.eval(expr, env) {
            Ok(Some(_)) if !self.at_end() => self.fail(|| "end of list".to_string()),
            other => other,
        };
        env.sequence_start = enclosing;
        if let Some(parent) = self.parents.pop() {
            self.frame = parent;
        }

        let outcome = outcome?;
        if outcome.is_some() {
            self.frame.pos = origin + 1;
        }
        Ok(outcome)
    }
}
