//! Every grammar under `grammars/` must load, and the JSON fixture must
//! parse the documents it was written for.

mod common;

use common::{files_with_extension, grammars_dir, load, node, num, ok, read_fixture};
use metagram::{Library, Value};

#[test]
fn all_fixture_grammars_load_together() {
    let files = files_with_extension(&grammars_dir(), "grammar");
    assert!(files.len() >= 6, "found only {:?}", files);

    let sources: Vec<String> = files
        .iter()
        .map(|path| std::fs::read_to_string(path).unwrap())
        .collect();
    let mut library = ok(Library::new());
    let decls = sources
        .iter()
        .zip(&files)
        .map(|(source, path)| ok(library.parse(&path.display().to_string(), source)))
        .collect();
    let loaded = ok(library.load_decls(decls));
    assert_eq!(loaded.len(), files.len());
    for name in ["Lex", "Calc", "CalcExt", "CalcJs", "CalcExtJs", "Json"] {
        assert!(library.get(name).is_some(), "{name} was not loaded");
    }
}

#[test]
fn json_fixture_parses_documents() {
    let json = load(&read_fixture("json/json.grammar"));
    let value = ok(metagram::match_all(
        &json,
        "file",
        r#" { "name": "metagram", "tags": ["peg", "self-hosting"], "depth": -2.5, "ok": true, "none": null, "esc": "a\"b\n" } "#,
    ));

    let member = |key: &str, value: Value| node("Member", vec![node("Str", vec![Value::from(key)]), value]);
    let expected = node(
        "Object",
        vec![Value::List(vec![
            member("name", node("Str", vec![Value::from("metagram")])),
            member(
                "tags",
                node(
                    "Array",
                    vec![Value::List(vec![
                        node("Str", vec![Value::from("peg")]),
                        node("Str", vec![Value::from("self-hosting")]),
                    ])],
                ),
            ),
            member("depth", node("Num", vec![num(-2.5)])),
            member("ok", node("Bool", vec![Value::Bool(true)])),
            member("none", node("Null", vec![])),
            member("esc", node("Str", vec![Value::from("a\"b\n")])),
        ])],
    );
    assert_eq!(value, expected);
}

#[test]
fn json_fixture_rejects_trailing_commas() {
    let json = load(&read_fixture("json/json.grammar"));
    let err = metagram::match_all(&json, "file", "[1, 2,]").unwrap_err();
    let failure = err.kind.failure().expect("parse failure");
    assert_eq!(failure.position(), 6);
}
