//! Handles all user-facing output for the CLI.
//!
//! Success lines go to stdout through `termcolor`; errors are rendered by
//! [`print_error`](crate::errors::print_error) with `miette`.

use std::io::Write;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::MetaError;
use crate::grammar::Grammar;
use crate::value::Value;

/// Prints `ok: message`, with the prefix highlighted.
pub fn print_ok(message: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true));
    let _ = write!(stdout, "ok:");
    let _ = stdout.reset();
    let _ = writeln!(stdout, " {}", message);
}

/// One summary line for a loaded grammar.
pub fn grammar_summary(grammar: &Grammar) -> String {
    let mut summary = format!("{} ({} rules", grammar.name(), grammar.rules().count());
    if let Some(parent) = grammar.parent() {
        summary.push_str(&format!(", extends {}", parent.name()));
    }
    let imports: Vec<&str> = grammar.imports().collect();
    if !imports.is_empty() {
        summary.push_str(&format!(", uses {}", imports.join(", ")));
    }
    summary.push(')');
    summary
}

/// Prints a parse result, as JSON or as an `ok:` line.
pub fn print_value(value: &Value, json: bool) -> Result<(), MetaError> {
    if json {
        let text = serde_json::to_string_pretty(value)
            .map_err(|e| crate::errors::io_error(std::path::Path::new("<stdout>"), e.into()))?;
        println!("{}", text);
    } else {
        print_ok(&value.to_string());
    }
    Ok(())
}

/// Prints each name on its own line under a yellow heading.
pub fn print_listing(heading: &str, names: &[String]) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    let _ = writeln!(stdout, "{}", heading);
    let _ = stdout.reset();
    for name in names {
        let _ = writeln!(stdout, "  {}", name);
    }
}
