//! Behavioral properties of the matching engine: determinism, memoization,
//! backtracking, lookahead, furthest failures and full consumption.

mod common;

use common::{both_modes, calc_library, grammar, load, node, num, ok};
use metagram::engine::Input;
use metagram::grammar::expr::*;
use metagram::{Engine, ErrorKind, Grammar, HostExpr, MatchOptions, Value};

// ============================================================================
// DETERMINISM & MEMOIZATION
// ============================================================================

#[test]
fn repeated_matches_are_identical() {
    let library = calc_library();
    let calc = grammar(&library, "Calc");
    for input in ["let x = 1 + 2;", "1 + ;", "(1 * 2"] {
        let first = ok(metagram::match_rule(&calc, "file", input, &[]));
        let second = ok(metagram::match_rule(&calc, "file", input, &[]));
        assert_eq!(first, second, "input {input:?}");
    }
}

#[test]
fn memoization_does_not_change_results() {
    let library = calc_library();
    let inputs = [
        "let x = 1 + 2 * 3;",
        "x - y - z;",
        "((1));",
        "let = 4;",
        "1 + (2 * ;",
        "   ",
        "-3;",
    ];
    for name in ["Calc", "CalcExt"] {
        let calc = grammar(&library, name);
        for input in inputs {
            let (memo, plain) = both_modes(&calc, "file", input);
            assert_eq!(memo, plain, "{name} on {input:?}");
        }
    }

    let json = load(&common::read_fixture("json/json.grammar"));
    for input in [r#"{"a": [1, 2, {"b": null}]}"#, r#"[1, 2,]"#, r#""esc\"aped""#] {
        let (memo, plain) = both_modes(&json, "file", input);
        assert_eq!(memo, plain, "json on {input:?}");
    }
}

// ============================================================================
// BACKTRACKING & LOOKAHEAD
// ============================================================================

#[test]
fn failed_sequence_restores_the_cursor() {
    let g = load("grammar G { start = 'a' 'b' 'c' | 'a' ; }");
    let result = ok(metagram::match_rule(&g, "start", "abx", &[]));
    assert_eq!(result.cursor().map(|c| c.position()), Some(1));

    let g = load("grammar G { start = ('a' 'b' 'x')? 'a' ; }");
    let result = ok(metagram::match_rule(&g, "start", "abz", &[]));
    assert_eq!(result.value(), Some(&Value::from("a")));
    assert_eq!(result.cursor().map(|c| c.position()), Some(1));
}

#[test]
fn repetition_is_greedy_and_never_gives_back() {
    let g = load("grammar G { start = 'a'* 'a' ; }");
    let result = ok(metagram::match_rule(&g, "start", "aaa", &[]));
    assert!(!result.is_success());
}

#[test]
fn lookahead_never_consumes() {
    let g = load(
        "grammar G {
            ahead  = &'abc' ;
            absent = ~'x' ;
            blocked = ~'a' ;
        }",
    );
    let ahead = ok(metagram::match_rule(&g, "ahead", "abc", &[]));
    assert_eq!(ahead.cursor().map(|c| c.position()), Some(0));
    let absent = ok(metagram::match_rule(&g, "absent", "abc", &[]));
    assert_eq!(absent.cursor().map(|c| c.position()), Some(0));
    let blocked = ok(metagram::match_rule(&g, "blocked", "abc", &[]));
    assert!(!blocked.is_success());
}

#[test]
fn ordered_choice_takes_the_first_success() {
    let g = load("grammar G { start = 'a' -> 1 | 'ab' -> 2 ; }");
    let result = ok(metagram::match_rule(&g, "start", "ab", &[]));
    assert_eq!(result.value(), Some(&num(1.0)));
}

// ============================================================================
// FAILURE REPORTING
// ============================================================================

#[test]
fn furthest_failure_is_reported_regardless_of_order() {
    let far = seq(vec![lit("a"), lit("b"), lit("c"), lit("x")]);
    let near = seq(vec![lit("a"), lit("y")]);
    for alternatives in [vec![far.clone(), near.clone()], vec![near, far]] {
        let g = Grammar::builder("G")
            .rule("start", alt(alternatives))
            .build()
            .unwrap();
        let result = ok(metagram::match_rule(&g, "start", "abcd", &[]));
        let failure = result.failure().expect("match should fail");
        assert_eq!(failure.position(), 3);
        assert_eq!(failure.expected_summary(), "'x'");
        assert_eq!(failure.found, "d");
    }
}

#[test]
fn failures_are_attributed_to_the_outermost_rule() {
    let g = load(
        "grammar G {
            start = \"let\" name ;
            name  = spaces letter+ ;
        }",
    );
    let err = metagram::match_all(&g, "start", "let 42").unwrap_err();
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.position(), 4);
    assert_eq!(failure.expected_summary(), "name");
    assert_eq!(failure.line, Some((1, 5)));
}

#[test]
fn text_failures_carry_line_and_column() {
    let g = load("grammar G { start = ('a' | '\\n')* 'b' ; }");
    let err = metagram::match_all(&g, "start", "aa\naac").unwrap_err();
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.line, Some((2, 3)));
    assert!(err.to_string().contains("(at line: 2, char: 3)"), "{err}");
}

#[test]
fn match_all_requires_full_consumption() {
    let g = load("grammar G { start = 'a' ; }");
    let partial = ok(metagram::match_rule(&g, "start", "ab", &[]));
    assert!(partial.is_success());

    let err = metagram::match_all(&g, "start", "ab").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Parse { .. }));
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.position(), 1);
    assert!(failure.expected.contains("end of input"));
}

// ============================================================================
// RULE APPLICATION
// ============================================================================

#[test]
fn left_recursion_builds_left_associative_trees() {
    let library = calc_library();
    let calc = grammar(&library, "Calc");
    let tree = ok(metagram::match_all(&calc, "expr", "1 - 2 - 3"));
    let expected = node(
        "Sub",
        vec![
            node("Sub", vec![node("Num", vec![num(1.0)]), node("Num", vec![num(2.0)])]),
            node("Num", vec![num(3.0)]),
        ],
    );
    assert_eq!(tree, expected);
}

#[test]
fn indirect_left_recursion_terminates() {
    let g = load(
        "grammar G {
            x = y:l '-' 'n' -> @S(l)
              | 'n' ;
            y = x ;
        }",
    );
    let expected = node("S", vec![node("S", vec![Value::from("n")])]);
    for engine in [
        Engine::new(),
        Engine::new().with_options(MatchOptions::default().memoize(false)),
    ] {
        assert_eq!(ok(engine.match_all(&g, "x", "n-n-n")), expected);
    }
}

#[test]
fn parameters_are_bound_per_application() {
    let g = load(
        "grammar G {
            twice s = seq(s) seq(s) ;
            start   = twice('ab') twice('c') ;
        }",
    );
    assert!(ok(metagram::match_rule(&g, "start", "ababcc", &[])).is_success());
    assert!(!ok(metagram::match_rule(&g, "start", "abcc", &[])).is_success());

    let direct = ok(metagram::match_rule(&g, "twice", "xx", &[Value::from("x")]));
    assert!(direct.is_success());
}

#[test]
fn dynamic_application_of_an_unknown_rule_fails_quietly() {
    let g = load("grammar G { start = apply('nowhere') | 'a' -> 'fallback' ; }");
    let value = ok(metagram::match_all(&g, "start", "a"));
    assert_eq!(value, Value::from("fallback"));
}

#[test]
fn guards_turn_false_into_failure() {
    let g = load("grammar G { two = number:n ?(eq(n, 2)) -> n ; }");
    let pass = ok(metagram::match_all(&g, "two", vec![num(2.0)]));
    assert_eq!(pass, num(2.0));
    let fail = metagram::match_all(&g, "two", vec![num(3.0)]);
    assert!(fail.is_err());
}

#[test]
fn rejected_guards_are_attributed_to_their_rule() {
    let g = load("grammar G { five = digit:x ?(eq(x, '5')) -> x ; }");
    assert_eq!(ok(metagram::match_all(&g, "five", "5")), Value::from("5"));

    let err = metagram::match_all(&g, "five", "3").unwrap_err();
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.position(), 0);
    assert_eq!(failure.expected_summary(), "five");
    assert_eq!(
        err.to_string(),
        "parse error: expected five before '3' (at line: 1, char: 1)"
    );
}

#[test]
fn bounded_repetition_of_an_empty_match_reaches_its_minimum() {
    let g = Grammar::builder("G")
        .rule("twice", repeat(app("empty"), 2, None))
        .rule("pair", repeat(opt(lit("a")), 2, Some(3)))
        .build()
        .unwrap();
    for memoize in [true, false] {
        let engine = Engine::new().with_options(MatchOptions::default().memoize(memoize));
        assert_eq!(
            ok(engine.match_all(&g, "twice", "")),
            Value::List(vec![Value::Nil, Value::Nil])
        );
        assert_eq!(
            ok(engine.match_all(&g, "pair", "a")),
            Value::List(vec![Value::from("a"), Value::Nil])
        );
    }
}

#[test]
fn positions_can_be_recorded_in_nodes() {
    let g = load(
        "grammar G {
            names = name+:ns spaces end -> ns ;
            name  = spaces pos:p col:c <letter+>:n -> @Name(n, p, c) ;
        }",
    );
    let value = ok(metagram::match_all(&g, "names", "ab\n  cd"));
    assert_eq!(
        value,
        Value::List(vec![
            node("Name", vec![Value::from("ab"), num(0.0), num(0.0)]),
            node("Name", vec![Value::from("cd"), num(5.0), num(2.0)]),
        ])
    );
}

#[test]
fn nested_matching_walks_lists_nodes_and_strings() {
    let g = load(
        "grammar G {
            pair = [number:a number:b] -> @Pair(a, b) ;
            tagged = [`Point number:x number:y] -> x ;
            word = [letter+] ;
        }",
    );
    let pair = ok(metagram::match_all(&g, "pair", vec![Value::List(vec![num(1.0), num(2.0)])]));
    assert_eq!(pair, node("Pair", vec![num(1.0), num(2.0)]));

    let point = node("Point", vec![num(5.0), num(6.0)]);
    assert_eq!(ok(metagram::match_all(&g, "tagged", vec![point])), num(5.0));

    assert!(metagram::match_all(&g, "word", vec![Value::from("abc")]).is_ok());
    let err = metagram::match_all(&g, "word", vec![Value::from("ab1")]).unwrap_err();
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.location, vec![0, 2]);
}

#[test]
fn captures_return_the_consumed_input() {
    let g = load("grammar G { start = <letter digit*> ; items = <number*> ; }");
    assert_eq!(ok(metagram::match_all(&g, "start", "x42")), Value::from("x42"));

    let items = Input::items(vec![num(1.0), num(2.0)]);
    assert_eq!(
        ok(metagram::match_all(&g, "items", items)),
        Value::List(vec![num(1.0), num(2.0)])
    );
}

#[test]
fn token_uses_an_overridden_spaces_rule() {
    let g = load(
        "grammar G {
            spaces = (' ' | '#' (~'\\n' _)* '\\n')* ;
            start  = \"a\" \"b\" ;
        }",
    );
    assert!(metagram::match_all(&g, "start", "a # note\n b").is_ok());
}

// ============================================================================
// FATAL CONDITIONS
// ============================================================================

#[test]
fn recursion_limit_is_an_error_not_a_crash() {
    let g = load("grammar G { p = '(' p ')' | 'x' ; }");
    let engine = Engine::new().with_options(MatchOptions::default().max_depth(5));
    let err = engine.match_all(&g, "p", "((((((((x))))))))").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::RecursionLimit { limit: 5 }));
    assert!(Engine::new().match_all(&g, "p", "((((((((x))))))))").is_ok());
}

#[test]
fn deep_nesting_under_default_options_never_overflows() {
    let g = load("grammar G { deep = '(' deep ')' | 'x' ; }");
    let nested = |levels: usize| format!("{}x{}", "(".repeat(levels), ")".repeat(levels));

    for memoize in [true, false] {
        let engine = Engine::new().with_options(MatchOptions::default().memoize(memoize));
        assert!(engine.match_all(&g, "deep", nested(1_500).as_str()).is_ok());

        let err = engine.match_all(&g, "deep", nested(3_000).as_str()).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::RecursionLimit { limit: 2_000 }));
    }
}

#[test]
fn action_errors_are_fatal() {
    let g = load("grammar G { start = 'a':x -> nope(x) | 'a' ; }");
    let err = metagram::match_all(&g, "start", "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnknownAction { .. }));

    let g = load("grammar G { start = 'a' -> missing ; }");
    let err = metagram::match_all(&g, "start", "a").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UndefinedVariable { .. }));
}

#[test]
fn custom_actions_can_be_registered() {
    let g = Grammar::builder("G")
        .rule(
            "start",
            seq(vec![
                bind("d", app("digit")),
                act(HostExpr::call("shout", vec![HostExpr::var("d")])),
            ]),
        )
        .build()
        .unwrap();
    let mut engine = Engine::new();
    engine
        .registry
        .register("shout", |args| Ok(Value::String(format!("{}!", args[0]))));
    assert_eq!(ok(engine.match_all(&g, "start", "7")), Value::from("7!"));
}
