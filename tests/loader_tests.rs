//! Grammar loading: the notation, load-time errors and self-hosting.

mod common;

use std::sync::Arc;

use common::{load, ok};
use metagram::bootstrap::META_ENTRY;
use metagram::{
    meta_grammar, ErrorCategory, ErrorKind, Grammar, Library, Rule, Value, META_GRAMMAR_SOURCE,
};

// ============================================================================
// SMOKE
// ============================================================================

#[test]
fn single_rule_digit_grammar() {
    let g = load(
        "grammar Digits {
            digit = '0' | '1' | '2' | '3' | '4' | '5' | '6' | '7' | '8' | '9' ;
        }",
    );
    assert_eq!(ok(metagram::match_all(&g, "digit", "7")), Value::from("7"));

    let err = metagram::match_all(&g, "digit", "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Parse { .. }));
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.position(), 0);
    assert_eq!(failure.expected_summary(), "digit");
    assert_eq!(
        err.to_string(),
        "parse error: expected digit before 'a' (at line: 1, char: 1)"
    );
}

#[test]
fn notation_covers_every_construct() {
    let g = load(
        "// a comment before the grammar
        grammar All {
            start  = spaces item*:xs spaces end -> xs ;   // trailing comment
            item   = \"(\" item*:xs \")\" -> @Group(xs)
                   | <'a'..'z'+>:w -> @Word(w)
                   | number ;
            number = spaces <digit+>:n !(to_number(n)):v ?(not(eq(v, 13))) -> v ;
        }",
    );
    let value = ok(metagram::match_all(&g, "start", "ab (c 4) 12"));
    assert_eq!(
        value,
        Value::List(vec![
            Value::node("Word", vec![Value::from("ab")]),
            Value::node(
                "Group",
                vec![Value::List(vec![
                    Value::node("Word", vec![Value::from("c")]),
                    Value::Number(4.0),
                ])]
            ),
            Value::Number(12.0),
        ])
    );
    assert!(metagram::match_all(&g, "start", "13").is_err());
}

#[test]
fn host_expressions_build_values() {
    let g = load(
        "grammar Host {
            start = 'x':c -> [c, 'lit', \"dq\", 2.5, true, false, nil, @Leaf, @Pair(c, [])] ;
        }",
    );
    let value = ok(metagram::match_all(&g, "start", "x"));
    assert_eq!(
        value,
        Value::List(vec![
            Value::from("x"),
            Value::from("lit"),
            Value::from("dq"),
            Value::Number(2.5),
            Value::Bool(true),
            Value::Bool(false),
            Value::Nil,
            Value::node("Leaf", vec![]),
            Value::node("Pair", vec![Value::from("x"), Value::List(vec![])]),
        ])
    );
}

// ============================================================================
// LOAD ERRORS
// ============================================================================

#[test]
fn malformed_text_reports_the_furthest_position() {
    let err = metagram::load_grammar("grammar G { start = 'a' ) ; }").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Load);
    let ErrorKind::GrammarLoad { failure } = &err.kind else {
        panic!("expected a grammar load error, got {:?}", err.kind);
    };
    assert_eq!(failure.position(), 24);
    assert!(failure.expected.contains("';'"), "{failure}");
    assert!(err.source_info.is_some());
    assert_eq!(err.diagnostic_info.error_code, "metagram::load::grammar_load");
}

#[test]
fn structural_errors_are_load_errors() {
    let cases = [
        ("grammar G { start = missing ; }", "unknown_rule"),
        ("grammar G { start = Other.x ; }", "unknown_grammar"),
        ("grammar G { start = 'a' ; start = 'b' ; }", "duplicate_rule"),
        ("grammar G { pair a b = 'x' ; start = pair('x') ; }", "arity_mismatch"),
        ("grammar G { start = token ; }", "arity_mismatch"),
        ("grammar G { start = ^start ; }", "unknown_rule"),
        ("grammar G < Nowhere { }", "unknown_grammar"),
        ("grammar G { start = 'z'..'a' 'b'..'cd' ; }", "malformed_grammar"),
    ];
    for (source, code) in cases {
        let err = metagram::load_grammar(source).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Load, "{source}");
        assert_eq!(
            err.diagnostic_info.error_code,
            format!("metagram::load::{code}"),
            "{source}"
        );
    }
}

#[test]
fn parent_cycles_are_rejected() {
    let mut library = ok(Library::new());
    let err = library
        .load_all(&[
            "grammar A < C { }",
            "grammar B < A { }",
            "grammar C { use B; }",
        ])
        .unwrap_err();
    let ErrorKind::CyclicParent { chain } = &err.kind else {
        panic!("expected a cycle, got {:?}", err.kind);
    };
    assert_eq!(chain.first(), chain.last());
    assert_eq!(chain.len(), 4);
}

#[test]
fn inheritance_and_super() {
    let mut library = ok(Library::new());
    ok(library.load("grammar Base { start = item+ ; item = 'a' ; }"));
    let child = ok(library.load("grammar Child < Base { item = 'b' | ^item ; }"));
    assert_eq!(child.ancestry(), vec!["Child".to_string(), "Base".to_string()]);
    assert!(metagram::match_all(&child, "start", "abba").is_ok());

    let base = Arc::clone(library.get("Base").unwrap());
    assert!(metagram::match_all(&base, "start", "abba").is_err());
}

#[test]
fn foreign_applications_reach_builtins() {
    let mut library = ok(Library::new());
    ok(library.load("grammar Lex { word = letter+ ; }"));
    let g = ok(library.load("grammar G { use Lex; start = <Lex.digit+>:n Lex.word -> n ; }"));
    assert_eq!(ok(metagram::match_all(&g, "start", "42ab")), Value::from("42"));

    let err = library
        .load("grammar H { use Lex; start = Lex.token ; }")
        .unwrap_err();
    assert_eq!(err.diagnostic_info.error_code, "metagram::load::arity_mismatch");
}

// ============================================================================
// SELF-HOSTING
// ============================================================================

fn sorted_rules(grammar: &Grammar) -> Vec<Rule> {
    grammar.rules().map(|rule| (**rule).clone()).collect()
}

#[test]
fn textual_meta_grammar_matches_the_hand_built_one() {
    let hand_built = ok(meta_grammar());
    let loaded = ok(metagram::load_grammar(META_GRAMMAR_SOURCE));
    assert_eq!(loaded.name(), hand_built.name());
    assert_eq!(sorted_rules(&loaded), sorted_rules(&hand_built));
}

#[test]
fn loaded_meta_grammar_reaches_a_fixpoint() {
    let first = ok(metagram::load_grammar(META_GRAMMAR_SOURCE));
    let mut library = Library::with_meta(Arc::clone(&first));
    let second = ok(library.load(META_GRAMMAR_SOURCE));
    assert_eq!(sorted_rules(&first), sorted_rules(&second));
}

#[test]
fn loaded_meta_grammar_behaves_like_the_hand_built_one() {
    let hand_built = ok(meta_grammar());
    let loaded = ok(metagram::load_grammar(META_GRAMMAR_SOURCE));
    let suite = [
        META_GRAMMAR_SOURCE,
        "grammar A { }",
        "grammar B < A { use C; x y = y:z -> @N(z, [1, 'q']) ; }",
        "grammar Bad { x = ; ",
        "grammar { }",
        "grammar C { r = [`Add trans:a] | <'a'..'z'> | ~x &y ?(f(x)) !(g()) ; }",
        "grammar D { r = 'unterminated ; }",
        "grammar E { r = \"tok\"* _ 42 -7.5 ; }",
        "grammar F { r = x:a:b ; }",
    ];
    for source in suite {
        let expected = metagram::match_all(&hand_built, META_ENTRY, source);
        let actual = metagram::match_all(&loaded, META_ENTRY, source);
        match (expected, actual) {
            (Ok(a), Ok(b)) => assert_eq!(a, b, "{source}"),
            (Err(a), Err(b)) => assert_eq!(a.kind, b.kind, "{source}"),
            (a, b) => panic!("{source}: hand-built {a:?}, loaded {b:?}"),
        }
    }
}
