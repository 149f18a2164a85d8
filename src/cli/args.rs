//! Defines the command-line arguments and subcommands for the metagram CLI.
//!
//! This module uses the `clap` crate with its "derive" feature to create a
//! declarative and type-safe argument parsing structure.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::MatchOptions;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "metagram",
    version,
    about = "A self-hosting PEG engine: parse with one grammar, translate with another."
)]
pub struct MetagramArgs {
    /// Raise log verbosity (-v for debug, -vv for rule tracing).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable the packrat memo table.
    #[arg(long, global = true)]
    pub no_memo: bool,

    /// Maximum nesting of rule applications.
    #[arg(long, global = true, default_value_t = 2_000)]
    pub max_depth: usize,

    #[command(subcommand)]
    pub command: Command,
}

impl MetagramArgs {
    pub fn match_options(&self) -> MatchOptions {
        MatchOptions::default()
            .memoize(!self.no_memo)
            .max_depth(self.max_depth)
    }
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load grammar descriptions and report their rules.
    Check {
        /// Grammar files, loaded together in dependency order.
        #[arg(required = true)]
        grammars: Vec<PathBuf>,
        /// Also list the rules each grammar defines.
        #[arg(long)]
        rules: bool,
    },
    /// Parse an input file with a grammar and print the result.
    Parse {
        /// The grammar description to parse with.
        #[arg(required = true)]
        grammar: PathBuf,
        /// The input text.
        #[arg(required = true)]
        input: PathBuf,
        /// Entry rule.
        #[arg(long, default_value = "file")]
        rule: String,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
        /// Grammars the parser inherits from or imports.
        #[arg(long = "lib")]
        libs: Vec<PathBuf>,
    },
    /// Parse an input file, then translate the tree into text.
    Translate {
        /// The grammar used to parse the input.
        #[arg(long, required = true)]
        parser: PathBuf,
        /// The grammar used to translate the parse tree.
        #[arg(long, required = true)]
        translator: PathBuf,
        /// The input text.
        #[arg(required = true)]
        input: PathBuf,
        /// Entry rule of the parser.
        #[arg(long, default_value = "file")]
        rule: String,
        /// Entry rule of the translator.
        #[arg(long, default_value = "trans")]
        entry: String,
        /// Write the generated text here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Grammars either side inherits from or imports.
        #[arg(long = "lib")]
        libs: Vec<PathBuf>,
    },
    /// Print the description of the grammar notation itself.
    Meta,
}
