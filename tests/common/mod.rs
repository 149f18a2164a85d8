//! # Metagram Test Helpers
//!
//! Fixture lookup and loading shared by the integration tests. Load failures
//! panic with the full miette report so a broken fixture is easy to read.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use metagram::{Engine, Grammar, Library, MatchOptions, MatchResult, MetaError, Value};
use walkdir::WalkDir;

/// Directory holding the fixture grammars.
pub fn grammars_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("grammars")
}

pub fn fixture_path(relative: &str) -> PathBuf {
    grammars_dir().join(relative)
}

pub fn read_fixture(relative: &str) -> String {
    let path = fixture_path(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {e}", path.display()))
}

/// All files under `dir` with the given extension, in a stable order.
pub fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == extension))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Unwraps a result, printing the diagnostic report on error.
pub fn ok<T>(result: Result<T, MetaError>) -> T {
    result.unwrap_or_else(|e| panic!("{:?}", miette::Report::new(e)))
}

/// Loads a standalone grammar description.
pub fn load(source: &str) -> Arc<Grammar> {
    ok(metagram::load_grammar(source))
}

/// A library holding every grammar of the calculator fixtures.
pub fn calc_library() -> Library {
    let mut library = ok(Library::new());
    let sources: Vec<String> = [
        "calc/calc_ext_js.grammar",
        "calc/calc_js.grammar",
        "calc/calc_ext.grammar",
        "calc/calc.grammar",
        "calc/lex.grammar",
    ]
    .iter()
    .map(|name| read_fixture(name))
    .collect();
    let sources: Vec<&str> = sources.iter().map(String::as_str).collect();
    ok(library.load_all(&sources));
    library
}

pub fn grammar(library: &Library, name: &str) -> Arc<Grammar> {
    library
        .get(name)
        .cloned()
        .unwrap_or_else(|| panic!("grammar {name} is not loaded"))
}

/// Runs `rule` with and without memoization.
pub fn both_modes(
    grammar: &Arc<Grammar>,
    rule: &str,
    input: &str,
) -> (MatchResult, MatchResult) {
    let memo = Engine::new();
    let plain = Engine::new().with_options(MatchOptions::default().memoize(false));
    (
        ok(memo.match_rule(grammar, rule, input, &[])),
        ok(plain.match_rule(grammar, rule, input, &[])),
    )
}

pub fn num(n: f64) -> Value {
    Value::Number(n)
}

pub fn node(tag: &str, children: Vec<Value>) -> Value {
    Value::node(tag, children)
}
