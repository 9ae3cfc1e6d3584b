//! Help text generation for target scripts.

use std::fmt::Write;

use crate::field::{Field, FieldSet, UsageSet};
use crate::scope::{is_tty, ShellScope};
use crate::usage::CommandPath;

/// Indent of option descriptions under their flag line.
const DESC_INDENT: usize = 11;

/// Render help for an argument parse: title, positional signature,
/// arguments and options.
pub fn render_args_help(
    title: &str,
    fields: &FieldSet,
    path: &CommandPath,
    scope: &ShellScope,
) -> String {
    let mut out = String::new();
    let width = scope.field_width();

    write_title(&mut out, title);

    let positionals: Vec<&Field> = fields.positionals().collect();
    let params: Vec<String> = positionals.iter().map(|f| positional_signature(f)).collect();

    let _ = writeln!(out);
    let _ = writeln!(out, "Usage:");
    let _ = writeln!(out, "  {} {}", path, params.join(" "));

    if !positionals.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Arguments:");
        for field in &positionals {
            let _ = writeln!(
                out,
                "   {:width$}{}",
                format_positional(field),
                field.description,
                width = width
            );
        }
    }

    write_flags_section(&mut out, fields, scope);

    let _ = writeln!(out);
    out
}

/// Render help for a usage parse: title, command listing and global
/// options.
pub fn render_usage_help(
    title: &str,
    usage: &UsageSet,
    fields: &FieldSet,
    path: &CommandPath,
    scope: &ShellScope,
) -> String {
    let mut out = String::new();
    let width = scope.field_width();

    write_title(&mut out, title);

    let _ = writeln!(out);
    let _ = writeln!(out, "Usage: {} <command> [args]", path);

    let first_is_group = usage.entries().next().map(|e| e.separator).unwrap_or(false);
    if !first_is_group {
        let _ = writeln!(out);
        let _ = writeln!(out, "Available Commands:");
    }

    for entry in usage.entries() {
        if entry.hidden {
            continue;
        }
        if entry.separator {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", entry.description);
            continue;
        }
        let _ = writeln!(
            out,
            "  {:width$} {}",
            entry.name,
            entry.description,
            width = width
        );
    }

    write_flags_section(&mut out, fields, scope);

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Use \"{} <command> --help\" for more information about a command.",
        path
    );
    out
}

/// Title lines are printed with their leading whitespace stripped so
/// authors can indent heredoc-style titles naturally.
fn write_title(out: &mut String, title: &str) {
    for line in title.lines() {
        let _ = writeln!(out, "{}", line.trim_start());
    }
}

/// `<name>` when it must be supplied, `[name]` when a default exists,
/// `...name` for a catch-all array.
fn positional_signature(field: &Field) -> String {
    if field.multiple {
        format!("...{}", field.name)
    } else if field.has_default {
        format!("[{}]", field.name)
    } else {
        format!("<{}>", field.name)
    }
}

fn format_positional(field: &Field) -> String {
    format!("{} {}", field.display_name, field.type_name)
}

/// The three-column flag line: required gutter, short/long forms, type
/// and default.
fn format_flag(field: &Field, scope: &ShellScope) -> String {
    let mut out = String::new();

    if field.required {
        out.push_str(" ! ");
    } else {
        out.push_str("   ");
    }

    match &field.short {
        Some(short) => {
            let _ = write!(out, "-{}, --{}", short, field.display_name);
        }
        None => {
            let _ = write!(out, "    --{}", field.display_name);
        }
    }

    out.push(' ');
    if field.multiple {
        out.push_str("...");
    }
    out.push_str(&field.type_name);

    if field.has_default && !field.boolean {
        if let Some(value) = scope.display_value(&field.name) {
            let _ = write!(out, " (default: {})", value);
        }
    }

    out.trim_end().to_string()
}

/// The Options section shared by both help screens. Hidden flags are
/// omitted; group separators open new sections; a help flag is appended
/// when the author declared none.
fn write_flags_section(out: &mut String, fields: &FieldSet, scope: &ShellScope) {
    let mut rendered: Vec<(Option<Field>, String)> = Vec::new();
    for field in fields.entries() {
        if field.is_positional() || field.hidden {
            continue;
        }
        if field.is_separator() {
            rendered.push((None, field.description.clone()));
        } else {
            rendered.push((Some(field.clone()), field.description.clone()));
        }
    }
    if !rendered
        .iter()
        .any(|(f, _)| f.as_ref().map(|f| f.name == "help").unwrap_or(false))
    {
        let help = Field::help_flag();
        let desc = help.description.clone();
        rendered.push((Some(help), desc));
    }

    let first_is_group = rendered.first().map(|(f, _)| f.is_none()).unwrap_or(false);
    if !first_is_group {
        let _ = writeln!(out);
        let _ = writeln!(out, "Options:");
    }

    for (field, description) in &rendered {
        match field {
            None => {
                let _ = writeln!(out);
                let _ = writeln!(out, "{}", description);
            }
            Some(field) => {
                let _ = writeln!(out, "{}", format_flag(field, scope));
                for line in wrap_description(description) {
                    let _ = writeln!(out, "{:indent$}{}", "", line, indent = DESC_INDENT);
                }
            }
        }
    }
}

/// Wrap a description to the terminal width when stdout is a tty;
/// otherwise emit it on one line.
fn wrap_description(description: &str) -> Vec<String> {
    if description.is_empty() {
        return vec![String::new()];
    }
    if !is_tty() {
        return vec![description.to_string()];
    }
    let columns = std::env::var("COLUMNS")
        .ok()
        .and_then(|c| c.parse::<usize>().ok())
        .unwrap_or(80);
    let limit = columns.saturating_sub(DESC_INDENT).max(20);

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in description.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > limit {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
