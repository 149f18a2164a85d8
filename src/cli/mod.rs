//! The metagram Command-Line Interface.
//!
//! This module is the main entry point for all CLI commands. It plays the
//! part of a bootstrap script: read a grammar, parse an input with it, walk
//! the tree with a translate grammar, and write the result.

use log::{debug, LevelFilter};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use crate::bootstrap::{GrammarDecl, Library, META_GRAMMAR_SOURCE};
use crate::cli::args::{Command, MetagramArgs};
use crate::engine::{Engine, MatchOptions};
use crate::errors::{char_span, io_error, print_error, ErrorKind, MetaError, SourceContext};
use crate::grammar::Grammar;
use crate::value::Value;
use clap::Parser;

pub mod args;
pub mod output;

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = MetagramArgs::parse();
    init_logging(args.verbose);
    let options = args.match_options();

    let result = match args.command {
        Command::Check { grammars, rules } => handle_check(&grammars, rules, options),
        Command::Parse {
            grammar,
            input,
            rule,
            json,
            libs,
        } => handle_parse(&grammar, &input, &rule, json, &libs, options),
        Command::Translate {
            parser,
            translator,
            input,
            rule,
            entry,
            output,
            libs,
        } => handle_translate(
            &Pipeline {
                parser,
                translator,
                input,
                rule,
                entry,
                output,
                libs,
            },
            options,
        ),
        Command::Meta => {
            print!("{}", META_GRAMMAR_SOURCE);
            Ok(())
        }
    };

    if let Err(e) = result {
        print_error(e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }
    let _ = builder.try_init();
}

// ============================================================================
// COMMAND HANDLERS
// ============================================================================

fn handle_check(paths: &[PathBuf], list_rules: bool, options: MatchOptions) -> Result<(), MetaError> {
    let mut library = Library::new()?.with_options(options);
    let loaded = load_files(&mut library, paths)?;
    for grammar in &loaded {
        output::print_ok(&output::grammar_summary(grammar));
        if list_rules {
            let names: Vec<String> = grammar.rules().map(|rule| rule_signature(rule)).collect();
            output::print_listing(&format!("{} rules:", grammar.name()), &names);
        }
    }
    Ok(())
}

fn handle_parse(
    grammar: &Path,
    input: &Path,
    rule: &str,
    json: bool,
    libs: &[PathBuf],
    options: MatchOptions,
) -> Result<(), MetaError> {
    let mut library = Library::new()?.with_options(options);
    load_files(&mut library, libs)?;
    let grammar = load_one(&mut library, grammar)?;
    let engine = Engine::new().with_options(options);
    let tree = parse_file(&engine, &grammar, rule, input)?;
    output::print_value(&tree, json)
}

/// Arguments of a translate run.
struct Pipeline {
    parser: PathBuf,
    translator: PathBuf,
    input: PathBuf,
    rule: String,
    entry: String,
    output: Option<PathBuf>,
    libs: Vec<PathBuf>,
}

fn handle_translate(pipeline: &Pipeline, options: MatchOptions) -> Result<(), MetaError> {
    let mut library = Library::new()?.with_options(options);
    load_files(&mut library, &pipeline.libs)?;
    let parser = load_one(&mut library, &pipeline.parser)?;
    let translator = load_one(&mut library, &pipeline.translator)?;

    let engine = Engine::new().with_options(options);
    let tree = parse_file(&engine, &parser, &pipeline.rule, &pipeline.input)?;
    output::print_ok(&tree.to_string());

    let text = engine.translate(&tree, &translator, &pipeline.entry)?;
    match &pipeline.output {
        Some(path) => {
            fs::write(path, &text).map_err(|e| io_error(path, e))?;
            output::print_ok(&path.display().to_string());
        }
        None => print!("{}", text),
    }
    Ok(())
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn read_source(path: &Path) -> Result<String, MetaError> {
    fs::read_to_string(path).map_err(|e| io_error(path, e))
}

/// Loads grammar files into `library`, ordering them by dependency.
fn load_files(library: &mut Library, paths: &[PathBuf]) -> Result<Vec<Arc<Grammar>>, MetaError> {
    let decls = paths
        .iter()
        .map(|path| {
            let source = read_source(path)?;
            library.parse(&path.display().to_string(), &source)
        })
        .collect::<Result<Vec<GrammarDecl>, _>>()?;
    debug!("loading {} grammar file(s)", decls.len());
    library.load_decls(decls)
}

fn load_one(library: &mut Library, path: &Path) -> Result<Arc<Grammar>, MetaError> {
    let source = read_source(path)?;
    library.load_named(&path.display().to_string(), &source)
}

/// Parses a whole file; failures are labelled in the input text.
fn parse_file(
    engine: &Engine,
    grammar: &Arc<Grammar>,
    rule: &str,
    path: &Path,
) -> Result<Value, MetaError> {
    let source = read_source(path)?;
    engine
        .match_all(grammar, rule, source.as_str())
        .map_err(|err| match err.kind {
            ErrorKind::Parse { failure } => {
                let span = char_span(&source, failure.position());
                SourceContext::from_file(path.display().to_string(), source.as_str())
                    .report(ErrorKind::Parse { failure }, span)
            }
            _ => err,
        })
}

fn rule_signature(rule: &crate::grammar::Rule) -> String {
    if rule.params.is_empty() {
        rule.name.clone()
    } else {
        format!("{} {}", rule.name, rule.params.join(" "))
    }
}
