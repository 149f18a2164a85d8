//! The hand-built meta-grammar.
//!
//! This is the grammar that reads grammar descriptions. It is assembled from
//! the same combinators as any other grammar; `meta.grammar` is its textual
//! description and loading that text must yield an equivalent grammar.
//!
//! The semantic actions build a tree of tagged nodes (`Grammar`, `Rule`,
//! `Or`, `And`, `App`, ...) which [`super::builder`] turns into a [`Grammar`].

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::actions::HostExpr as H;
use crate::errors::MetaError;
use crate::grammar::expr::*;
use crate::grammar::Grammar;

/// Textual description of the meta-grammar.
pub const META_GRAMMAR_SOURCE: &str = include_str!("meta.grammar");

static META: OnceCell<Arc<Grammar>> = OnceCell::new();

/// The hand-built meta-grammar, built once per process.
pub fn meta_grammar() -> Result<Arc<Grammar>, MetaError> {
    META.get_or_try_init(build_meta_grammar).cloned()
}

fn v(name: &str) -> H {
    H::var(name)
}

fn node(tag: &str, args: Vec<H>) -> H {
    H::node(tag, args)
}

fn f(func: &str, args: Vec<H>) -> H {
    H::call(func, args)
}

/// `expr -> action`
fn then(mut items: Vec<Expr>, action: H) -> Expr {
    items.push(act(action));
    seq(items)
}

/// `keyword('k')`
fn kw(k: &str) -> Expr {
    call("keyword", vec![H::lit(k)])
}

fn build_meta_grammar() -> Result<Arc<Grammar>, MetaError> {
    Grammar::builder("Meta")
        // Lexical rules
        .rule(
            "comment",
            seq(vec![lit("//"), many(seq(vec![not(lit("\n")), any()]))]),
        )
        .rule("spaces", many(alt(vec![app("space"), app("comment")])))
        .rule("nameFirst", alt(vec![app("letter"), lit("_")]))
        .rule("nameRest", alt(vec![app("letter"), app("digit"), lit("_")]))
        .rule("word", capture(seq(vec![app("nameFirst"), many(app("nameRest"))])))
        .rule("name", seq(vec![app("spaces"), app("word")]))
        .rule_with_params(
            "keyword",
            &["k"],
            seq(vec![call("token", vec![v("k")]), not(app("nameRest"))]),
        )
        .rule(
            "escape",
            then(vec![lit("\\"), bind("c", any())], f("unescape", vec![v("c")])),
        )
        .rule("sqChar", alt(vec![app("escape"), seq(vec![not(lit("'")), any()])]))
        .rule("dqChar", alt(vec![app("escape"), seq(vec![not(lit("\"")), any()])]))
        .rule(
            "sqString",
            then(
                vec![lit("'"), bind("cs", many(app("sqChar"))), lit("'")],
                f("join", vec![v("cs")]),
            ),
        )
        .rule(
            "dqString",
            then(
                vec![lit("\""), bind("cs", many(app("dqChar"))), lit("\"")],
                f("join", vec![v("cs")]),
            ),
        )
        .rule("quoted", alt(vec![app("sqString"), app("dqString")]))
        .rule(
            "numLit",
            then(
                vec![
                    app("spaces"),
                    bind(
                        "n",
                        capture(seq(vec![
                            opt(lit("-")),
                            many1(app("digit")),
                            opt(seq(vec![lit("."), many1(app("digit"))])),
                        ])),
                    ),
                ],
                f("to_number", vec![v("n")]),
            ),
        )
        // Action expressions
        .rule(
            "hostArgs",
            alt(vec![
                then(
                    vec![
                        bind("first", app("host")),
                        bind("rest", many(seq(vec![tok(","), app("host")]))),
                    ],
                    f("cons", vec![v("first"), v("rest")]),
                ),
                act(H::list(vec![])),
            ]),
        )
        .rule(
            "host",
            alt(vec![
                app("hostCall"),
                app("hostNode"),
                app("hostList"),
                app("hostString"),
                app("hostNumber"),
                app("hostConst"),
                app("hostVar"),
            ]),
        )
        .rule(
            "hostCall",
            then(
                vec![
                    bind("f", app("name")),
                    lit("("),
                    bind("as", app("hostArgs")),
                    tok(")"),
                ],
                node("HCall", vec![v("f"), v("as")]),
            ),
        )
        .rule(
            "hostNode",
            then(
                vec![
                    tok("@"),
                    bind("t", app("word")),
                    bind(
                        "args",
                        alt(vec![
                            then(
                                vec![lit("("), bind("as", app("hostArgs")), tok(")")],
                                v("as"),
                            ),
                            act(H::list(vec![])),
                        ]),
                    ),
                ],
                node("HNode", vec![v("t"), v("args")]),
            ),
        )
        .rule(
            "hostList",
            then(
                vec![tok("["), bind("as", app("hostArgs")), tok("]")],
                node("HList", vec![v("as")]),
            ),
        )
        .rule(
            "hostString",
            then(
                vec![app("spaces"), bind("s", app("quoted"))],
                node("HLit", vec![v("s")]),
            ),
        )
        .rule(
            "hostNumber",
            then(vec![bind("n", app("numLit"))], node("HLit", vec![v("n")])),
        )
        .rule(
            "hostConst",
            alt(vec![
                then(vec![kw("true")], node("HLit", vec![H::lit(true)])),
                then(vec![kw("false")], node("HLit", vec![H::lit(false)])),
                then(vec![kw("nil")], node("HLit", vec![H::nil()])),
            ]),
        )
        .rule(
            "hostVar",
            then(vec![bind("n", app("name"))], node("HVar", vec![v("n")])),
        )
        // Rule bodies
        .rule(
            "choice",
            then(
                vec![
                    opt(tok("|")),
                    bind("first", app("sequence")),
                    bind("rest", many(seq(vec![tok("|"), app("sequence")]))),
                ],
                node("Or", vec![f("cons", vec![v("first"), v("rest")])]),
            ),
        )
        .rule(
            "sequence",
            then(
                vec![
                    bind("ts", many(app("term"))),
                    bind(
                        "items",
                        alt(vec![
                            then(
                                vec![tok("->"), bind("h", app("host"))],
                                f("append", vec![v("ts"), node("Act", vec![v("h")])]),
                            ),
                            act(v("ts")),
                        ]),
                    ),
                ],
                node("And", vec![v("items")]),
            ),
        )
        .rule(
            "term",
            alt(vec![
                then(vec![tok("~"), bind("t", app("term"))], node("Not", vec![v("t")])),
                then(vec![tok("&"), bind("t", app("term"))], node("Look", vec![v("t")])),
                then(
                    vec![bind("e", app("suffixed")), lit(":"), bind("n", app("word"))],
                    node("Bind", vec![v("n"), v("e")]),
                ),
                app("suffixed"),
                then(
                    vec![tok(":"), bind("n", app("word"))],
                    node("Bind", vec![v("n"), node("Any", vec![])]),
                ),
            ]),
        )
        .rule(
            "suffixed",
            seq(vec![
                bind("p", app("primary")),
                alt(vec![
                    then(vec![lit("*")], node("Many", vec![v("p")])),
                    then(vec![lit("+")], node("Many1", vec![v("p")])),
                    then(vec![lit("?"), not(lit("("))], node("Opt", vec![v("p")])),
                    act(v("p")),
                ]),
            ]),
        )
        .rule(
            "primary",
            alt(vec![
                then(vec![tok("("), bind("c", app("choice")), tok(")")], v("c")),
                then(
                    vec![tok("["), bind("c", app("choice")), tok("]")],
                    node("List", vec![v("c")]),
                ),
                then(
                    vec![tok("<"), bind("c", app("choice")), tok(">")],
                    node("Capture", vec![v("c")]),
                ),
                then(
                    vec![tok("?("), bind("h", app("host")), tok(")")],
                    node("Pred", vec![v("h")]),
                ),
                then(
                    vec![tok("!("), bind("h", app("host")), tok(")")],
                    node("Act", vec![v("h")]),
                ),
                then(
                    vec![
                        app("spaces"),
                        bind("a", app("sqString")),
                        tok(".."),
                        app("spaces"),
                        bind("b", app("sqString")),
                    ],
                    node("Range", vec![v("a"), v("b")]),
                ),
                then(
                    vec![app("spaces"), bind("s", app("sqString"))],
                    node("Lit", vec![v("s")]),
                ),
                then(
                    vec![app("spaces"), bind("s", app("dqString"))],
                    node("Tok", vec![v("s")]),
                ),
                then(vec![tok("`"), bind("s", app("word"))], node("Sym", vec![v("s")])),
                then(vec![bind("n", app("numLit"))], node("Num", vec![v("n")])),
                then(
                    vec![app("spaces"), lit("_"), not(app("nameRest"))],
                    node("Any", vec![]),
                ),
                then(
                    vec![tok("^"), bind("r", app("word")), bind("as", app("callArgs"))],
                    node("Super", vec![v("r"), v("as")]),
                ),
                then(
                    vec![
                        bind("g", app("name")),
                        lit("."),
                        bind("r", app("word")),
                        bind("as", app("callArgs")),
                    ],
                    node("Foreign", vec![v("g"), v("r"), v("as")]),
                ),
                then(
                    vec![bind("r", app("name")), bind("as", app("callArgs"))],
                    node("App", vec![v("r"), v("as")]),
                ),
            ]),
        )
        .rule(
            "callArgs",
            alt(vec![
                then(vec![lit("("), bind("as", app("hostArgs")), tok(")")], v("as")),
                act(H::list(vec![])),
            ]),
        )
        // Declarations
        .rule(
            "rule",
            then(
                vec![
                    bind("n", app("name")),
                    bind("ps", many(app("name"))),
                    tok("="),
                    bind("b", app("choice")),
                    tok(";"),
                ],
                node("Rule", vec![v("n"), v("ps"), v("b")]),
            ),
        )
        .rule(
            "import",
            then(vec![kw("use"), bind("g", app("name")), tok(";")], v("g")),
        )
        .rule(
            "parent",
            alt(vec![
                then(vec![tok("<"), bind("p", app("name"))], v("p")),
                act(H::nil()),
            ]),
        )
        .rule(
            "grammar",
            then(
                vec![
                    kw("grammar"),
                    bind("n", app("name")),
                    bind("p", app("parent")),
                    tok("{"),
                    bind("is", many(app("import"))),
                    bind("rs", many(app("rule"))),
                    tok("}"),
                ],
                node("Grammar", vec![v("n"), v("p"), v("is"), v("rs")]),
            ),
        )
        .rule(
            "file",
            then(
                vec![bind("g", app("grammar")), app("spaces"), app("end")],
                v("g"),
            ),
        )
        .build()
}
