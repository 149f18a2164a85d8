//! Input sequences and cursors.

use std::sync::Arc;

use crate::value::Value;

/// What a match runs over: characters of a text, or a sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(Vec<char>),
    Items(Vec<Value>),
}

impl Input {
    pub fn text(source: &str) -> Self {
        Input::Text(source.chars().collect())
    }

    pub fn items(items: Vec<Value>) -> Self {
        Input::Items(items)
    }

    pub fn len(&self) -> usize {
        match self {
            Input::Text(chars) => chars.len(),
            Input::Items(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Input::Text(_))
    }

    /// The element at `pos`; a character of text is a one-character string.
    pub fn element(&self, pos: usize) -> Option<Value> {
        match self {
            Input::Text(chars) => chars.get(pos).map(|c| Value::String(c.to_string())),
            Input::Items(items) => items.get(pos).cloned(),
        }
    }

    /// The character at `pos`, for text input or a one-character string item.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        match self {
            Input::Text(chars) => chars.get(pos).copied(),
            Input::Items(items) => match items.get(pos) {
                Some(Value::String(s)) => single_char(s),
                _ => None,
            },
        }
    }

    /// Whether the characters of `literal` appear at `pos` (text input only).
    pub fn starts_with_at(&self, pos: usize, literal: &str) -> Option<usize> {
        let Input::Text(chars) = self else {
            return None;
        };
        let mut end = pos;
        for expected in literal.chars() {
            if chars.get(end) != Some(&expected) {
                return None;
            }
            end += 1;
        }
        Some(end)
    }

    /// What was consumed between two positions: a string for text, a list
    /// for items.
    pub fn slice(&self, from: usize, to: usize) -> Value {
        match self {
            Input::Text(chars) => Value::String(chars[from..to].iter().collect()),
            Input::Items(items) => Value::List(items[from..to].to_vec()),
        }
    }

    /// 1-based line and column of `pos`, for text input.
    pub fn line_col(&self, pos: usize) -> Option<(usize, usize)> {
        let Input::Text(chars) = self else {
            return None;
        };
        let mut line = 1;
        let mut col = 1;
        for &c in chars.iter().take(pos) {
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        Some((line, col))
    }

    /// A short excerpt of what sits at `pos`, for failure messages.
    pub fn snippet(&self, pos: usize) -> String {
        match self {
            Input::Text(chars) => chars
                .iter()
                .skip(pos)
                .take(13)
                .take_while(|&&c| c != '\n')
                .collect(),
            Input::Items(items) => items.get(pos).map(Value::to_string).unwrap_or_default(),
        }
    }
}

pub(crate) fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

impl From<&str> for Input {
    fn from(source: &str) -> Self {
        Input::text(source)
    }
}

impl From<&String> for Input {
    fn from(source: &String) -> Self {
        Input::text(source)
    }
}

impl From<Vec<Value>> for Input {
    fn from(items: Vec<Value>) -> Self {
        Input::Items(items)
    }
}

/// A position in a shared input.
#[derive(Debug, Clone)]
pub struct Cursor {
    input: Arc<Input>,
    pos: usize,
}

impl Cursor {
    pub fn new(input: Arc<Input>) -> Self {
        Self { input, pos: 0 }
    }

    pub fn at(&self, pos: usize) -> Self {
        Self {
            input: Arc::clone(&self.input),
            pos,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn input(&self) -> &Arc<Input> {
        &self.input
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Elements left after the cursor.
    pub fn remaining(&self) -> usize {
        self.input.len().saturating_sub(self.pos)
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
            && (Arc::ptr_eq(&self.input, &other.input) || self.input == other.input)
    }
}
