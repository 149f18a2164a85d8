//! # Grammar Loader
//!
//! Grammar descriptions are read by the matching engine itself, using the
//! hand-built meta-grammar in [`meta`]. The resulting tree is converted into
//! declarations by [`builder`], and a [`Library`] resolves parent and import
//! names against grammars it has already loaded.
//!
//! ## Example
//!
//! ```rust
//! use metagram::bootstrap::Library;
//!
//! let mut library = Library::new().unwrap();
//! let digits = library
//!     .load("grammar Digits { number = <digit+> ; }")
//!     .unwrap();
//! assert_eq!(digits.name(), "Digits");
//! ```

use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::engine::{Engine, MatchOptions};
use crate::errors::{char_span, ErrorKind, MetaError, SourceContext};
use crate::grammar::Grammar;

pub mod builder;
pub mod meta;

pub use builder::GrammarDecl;
pub use meta::{meta_grammar, META_GRAMMAR_SOURCE};

/// Entry rule of the meta-grammar.
pub const META_ENTRY: &str = "file";

/// Named grammars, loaded from descriptions or inserted directly.
#[derive(Debug, Clone)]
pub struct Library {
    meta: Arc<Grammar>,
    engine: Engine,
    grammars: BTreeMap<String, Arc<Grammar>>,
}

impl Library {
    /// A library that reads descriptions with the hand-built meta-grammar.
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self::with_meta(meta_grammar()?))
    }

    /// A library that reads descriptions with `meta`, whose entry rule is
    /// `file` and whose output follows the tree shape the builder expects.
    pub fn with_meta(meta: Arc<Grammar>) -> Self {
        Self {
            meta,
            engine: Engine::new(),
            grammars: BTreeMap::new(),
        }
    }

    /// Options used when reading descriptions.
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.engine = self.engine.with_options(options);
        self
    }

    pub fn meta(&self) -> &Arc<Grammar> {
        &self.meta
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Grammar>> {
        self.grammars.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.grammars.keys().map(String::as_str)
    }

    /// Adds an already built grammar.
    pub fn insert(&mut self, grammar: Arc<Grammar>) -> Result<(), MetaError> {
        if self.grammars.contains_key(grammar.name()) {
            return Err(ErrorKind::DuplicateGrammar {
                name: grammar.name().to_string(),
            }
            .into());
        }
        self.grammars.insert(grammar.name().to_string(), grammar);
        Ok(())
    }

    /// Reads a description without building it.
    pub fn parse(&self, origin: &str, source: &str) -> Result<GrammarDecl, MetaError> {
        let tree = self
            .engine
            .match_all(&self.meta, META_ENTRY, source)
            .map_err(|err| match err.kind {
                ErrorKind::Parse { failure } => {
                    let span = char_span(source, failure.position());
                    SourceContext::from_file(origin, source)
                        .report(ErrorKind::GrammarLoad { failure }, span)
                        .with_help("the grammar description does not follow the notation here")
                }
                _ => err,
            })?;
        builder::grammar_decl(&tree)
    }

    /// Loads one description; its parent and imports must already be loaded.
    pub fn load(&mut self, source: &str) -> Result<Arc<Grammar>, MetaError> {
        self.load_named("<grammar>", source)
    }

    /// Like [`load`](Self::load), naming the source in diagnostics.
    pub fn load_named(&mut self, origin: &str, source: &str) -> Result<Arc<Grammar>, MetaError> {
        let decl = self.parse(origin, source)?;
        let mut loaded = self.load_decls(vec![decl])?;
        loaded
            .pop()
            .ok_or_else(|| crate::errors::malformed("no grammar in source"))
    }

    /// Loads several descriptions that may refer to one another, in
    /// dependency order.
    pub fn load_all(&mut self, sources: &[&str]) -> Result<Vec<Arc<Grammar>>, MetaError> {
        let decls = sources
            .iter()
            .enumerate()
            .map(|(i, source)| self.parse(&format!("<grammar {}>", i + 1), source))
            .collect::<Result<Vec<_>, _>>()?;
        self.load_decls(decls)
    }

    /// Builds declarations in dependency order.
    pub fn load_decls(&mut self, decls: Vec<GrammarDecl>) -> Result<Vec<Arc<Grammar>>, MetaError> {
        let mut pending = BTreeMap::new();
        for decl in decls {
            if self.grammars.contains_key(&decl.name) || pending.contains_key(&decl.name) {
                return Err(ErrorKind::DuplicateGrammar { name: decl.name }.into());
            }
            pending.insert(decl.name.clone(), decl);
        }

        let order = dependency_order(&pending)?;
        let mut loaded = Vec::with_capacity(order.len());
        for name in order {
            if let Some(decl) = pending.remove(&name) {
                let grammar = self.build(decl)?;
                self.grammars.insert(name, Arc::clone(&grammar));
                loaded.push(grammar);
            }
        }
        Ok(loaded)
    }

    fn build(&self, decl: GrammarDecl) -> Result<Arc<Grammar>, MetaError> {
        let mut builder = Grammar::builder(decl.name.as_str());
        if let Some(parent) = &decl.parent {
            builder = builder.parent(Arc::clone(self.require(parent)?));
        }
        for import in &decl.imports {
            builder = builder.import(Arc::clone(self.require(import)?));
        }
        for rule in decl.rules {
            builder = builder.push_rule(rule);
        }
        let grammar = builder.build()?;
        debug!(
            "loaded grammar {} ({} rules, ancestry {:?})",
            grammar.name(),
            grammar.rules().count(),
            grammar.ancestry()
        );
        Ok(grammar)
    }

    fn require(&self, name: &str) -> Result<&Arc<Grammar>, MetaError> {
        self.grammars.get(name).ok_or_else(|| {
            ErrorKind::UnknownGrammar {
                name: name.to_string(),
            }
            .into()
        })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

/// Orders declarations so that every grammar comes after the grammars it
/// depends on; names outside `decls` are left for the library to resolve.
fn dependency_order(decls: &BTreeMap<String, GrammarDecl>) -> Result<Vec<String>, MetaError> {
    fn visit(
        name: &str,
        decls: &BTreeMap<String, GrammarDecl>,
        marks: &mut HashMap<String, Mark>,
        stack: &mut Vec<String>,
        order: &mut Vec<String>,
    ) -> Result<(), MetaError> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = stack.iter().position(|n| n == name).unwrap_or(0);
                let mut chain = stack[start..].to_vec();
                chain.push(name.to_string());
                return Err(ErrorKind::CyclicParent { chain }.into());
            }
            None => {}
        }
        let Some(decl) = decls.get(name) else {
            return Ok(());
        };

        marks.insert(name.to_string(), Mark::Visiting);
        stack.push(name.to_string());
        for dependency in decl.dependencies() {
            visit(dependency, decls, marks, stack, order)?;
        }
        stack.pop();
        marks.insert(name.to_string(), Mark::Done);
        order.push(name.to_string());
        Ok(())
    }

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut order = Vec::new();
    for name in decls.keys() {
        visit(name, decls, &mut marks, &mut stack, &mut order)?;
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_must_be_loaded_first() {
        let mut library = Library::new().unwrap();
        let err = library
            .load("grammar Child < Base { x = 'x' ; }")
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnknownGrammar { ref name } if name == "Base"));
    }

    #[test]
    fn batch_loading_orders_by_dependency() {
        let mut library = Library::new().unwrap();
        let loaded = library
            .load_all(&[
                "grammar Child < Base { use Lex; x = Lex.y ^x ; }",
                "grammar Base { x = 'x' ; }",
                "grammar Lex { y = 'y' ; }",
            ])
            .unwrap();
        let names: Vec<&str> = loaded.iter().map(|g| g.name()).collect();
        assert_eq!(names.last(), Some(&"Child"));
        assert!(library.get("Base").is_some());
    }

    #[test]
    fn dependency_cycles_are_rejected() {
        let mut library = Library::new().unwrap();
        let err = library
            .load_all(&["grammar A < B { }", "grammar B < A { }"])
            .unwrap_err();
        match err.kind {
            ErrorKind::CyclicParent { chain } => assert_eq!(chain, vec!["A", "B", "A"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let mut library = Library::new().unwrap();
        let err = library.load("grammar A < A { }").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::CyclicParent { .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut library = Library::new().unwrap();
        library.load("grammar A { }").unwrap();
        let err = library.load("grammar A { }").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DuplicateGrammar { .. }));
    }
}
