//! Packrat memo table with left-recursion bookkeeping.
//!
//! One table exists per input frame. Entries are logged in insertion order so
//! that a growing left-recursive application can discard everything computed
//! on top of its previous seed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::failure::ParseFailure;
use crate::grammar::Grammar;
use crate::value::Value;

/// One rule application: grammars by identity, rule, arguments, position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct MemoKey {
    dispatch: usize,
    owner: usize,
    rule: String,
    args: String,
    pos: usize,
}

impl MemoKey {
    pub(crate) fn new(
        dispatch: &Arc<Grammar>,
        owner: &Arc<Grammar>,
        rule: &str,
        args: &[Value],
        pos: usize,
    ) -> Self {
        Self {
            dispatch: Arc::as_ptr(dispatch) as usize,
            owner: Arc::as_ptr(owner) as usize,
            rule: rule.to_string(),
            args: if args.is_empty() {
                String::new()
            } else {
                format!("{:?}", args)
            },
            pos,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum MemoEntry {
    /// Being evaluated; re-entry at the same position is left recursion.
    Active { left_recursive: bool },
    Done {
        result: Option<Value>,
        end: usize,
        failure: Option<ParseFailure>,
    },
}

#[derive(Debug, Default)]
pub(crate) struct MemoTable {
    entries: HashMap<MemoKey, MemoEntry>,
    log: Vec<MemoKey>,
}

impl MemoTable {
    pub(crate) fn get_mut(&mut self, key: &MemoKey) -> Option<&mut MemoEntry> {
        self.entries.get_mut(key)
    }

    /// Marks `key` as being evaluated and returns its log mark.
    pub(crate) fn begin(&mut self, key: MemoKey) -> usize {
        let mark = self.log.len();
        self.log.push(key.clone());
        self.entries
            .insert(key, MemoEntry::Active { left_recursive: false });
        mark
    }

    pub(crate) fn is_left_recursive(&self, key: &MemoKey) -> bool {
        matches!(
            self.entries.get(key),
            Some(MemoEntry::Active {
                left_recursive: true
            })
        )
    }

    pub(crate) fn store(&mut self, key: MemoKey, entry: MemoEntry) {
        self.entries.insert(key, entry);
    }

    pub(crate) fn remove(&mut self, key: &MemoKey) {
        self.entries.remove(key);
    }

    /// Drops every entry begun after `mark`, keeping the entry at `mark`.
    pub(crate) fn invalidate_after(&mut self, mark: usize) {
        for key in self.log.drain(mark + 1..) {
            self.entries.remove(&key);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
