//! Terminal output helpers. Results go to stdout, notices to stderr.

use std::fmt::Display;

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow().bold(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: impl Display) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as JSON, indented when `pretty` is set.
pub fn json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", rendered);
    Ok(())
}
