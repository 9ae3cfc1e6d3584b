//! Documentation generation: man page, Markdown, reStructuredText, YAML
//! and LLM tool schemas, all driven from the same declarations.

use std::fmt::Write;

use serde::Serialize;
use serde_json::json;

use crate::args::ParseError;
use crate::field::{Field, FieldSet, UsageSet};
use crate::Error;

/// Render documentation for `format`. The `llm` format additionally
/// takes a provider (`openai`, `anthropic` or `gemini`).
pub fn render(
    format: &str,
    provider: Option<&str>,
    name: &str,
    title: &str,
    usage: &UsageSet,
    fields: &FieldSet,
) -> Result<String, Error> {
    match format {
        "man" => Ok(man(name, title, usage, fields)),
        "md" => Ok(markdown(name, title, usage, fields)),
        "rst" => Ok(rst(name, title, usage, fields)),
        "yaml" => yaml(name, title, usage, fields),
        "llm" => match provider {
            Some("anthropic") => llm_anthropic(name, title, usage, fields),
            Some("openai" | "gemini") => llm_openai(name, title, usage, fields),
            Some(other) => Err(ParseError::UnknownProvider(other.to_string()).into()),
            None => Err(ParseError::MissingProvider.into()),
        },
        other => Err(ParseError::UnknownFormat(other.to_string()).into()),
    }
}

/// The short help screen for `docgen` itself.
pub fn render_help(path: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Generate documentation in various formats.");
    let _ = writeln!(out);
    let _ = writeln!(out, "Usage: {} docgen <format>", path);
    let _ = writeln!(out);
    let _ = writeln!(out, "Available formats:");
    let _ = writeln!(out, "  man     Man page (troff format)");
    let _ = writeln!(out, "  md      Markdown");
    let _ = writeln!(out, "  rst     reStructuredText");
    let _ = writeln!(out, "  yaml    YAML");
    let _ = writeln!(out, "  llm     LLM tool schema (openai, anthropic, gemini)");
    out
}

fn first_line(title: &str) -> &str {
    title.lines().next().unwrap_or(title).trim()
}

fn synopsis(name: &str, has_commands: bool) -> String {
    if has_commands {
        format!("{name} [command] [options]")
    } else {
        format!("{name} [options]")
    }
}

// -- man page -----------------------------------------------------------------

fn man(name: &str, title: &str, usage: &UsageSet, fields: &FieldSet) -> String {
    let commands: Vec<_> = usage.visible().collect();
    let flags = fields.visible_flags_with_help();
    let mut out = String::new();

    let _ = writeln!(out, ".TH \"{}\" 1", name.to_uppercase());

    let _ = writeln!(out, ".SH NAME");
    let _ = writeln!(out, "{} \\- {}", name, man_escape(first_line(title)));

    let _ = writeln!(out, ".SH SYNOPSIS");
    let _ = writeln!(out, ".B {name}");
    if !commands.is_empty() {
        let _ = writeln!(out, ".RI [ command ]");
    }
    let _ = writeln!(out, ".RI [ options ]");

    let _ = writeln!(out, ".SH DESCRIPTION");
    for line in title.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            let _ = writeln!(out, ".PP");
        } else {
            let _ = writeln!(out, "{}", man_escape(trimmed));
        }
    }

    if !commands.is_empty() {
        let _ = writeln!(out, ".SH COMMANDS");
        for cmd in &commands {
            let _ = writeln!(out, ".TP");
            let _ = writeln!(out, ".B {}", cmd.name);
            let _ = writeln!(out, "{}", man_escape(&cmd.description));
        }
    }

    if !flags.is_empty() {
        let _ = writeln!(out, ".SH OPTIONS");
        for flag in &flags {
            let _ = writeln!(out, ".TP");
            let long = &flag.display_name;
            if let Some(short) = &flag.short {
                if flag.boolean {
                    let _ = writeln!(out, ".BR \\-{short} \", \" \\-\\-{long}");
                } else {
                    let _ = writeln!(
                        out,
                        ".BR \\-{short} \", \" \\-\\-{long} \" \" \\fI{}\\fR",
                        flag.type_name
                    );
                }
            } else if flag.boolean {
                let _ = writeln!(out, ".BR \\-\\-{long}");
            } else {
                let _ = writeln!(out, ".BR \\-\\-{long} \" \" \\fI{}\\fR", flag.type_name);
            }
            let _ = writeln!(out, "{}", man_escape(&flag.description));
        }
    }

    out
}

/// Escape troff specials and neutralize lines roff would read as macros.
fn man_escape(s: &str) -> String {
    s.lines()
        .map(|line| {
            let escaped = line.replace('\\', "\\\\").replace('-', "\\-");
            let trimmed = escaped.trim_start();
            if trimmed.starts_with('.') || trimmed.starts_with('\'') {
                let ws_len = escaped.len() - trimmed.len();
                let (prefix, rest) = escaped.split_at(ws_len);
                format!("{prefix}\\&{rest}")
            } else {
                escaped
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// -- Markdown -----------------------------------------------------------------

fn markdown(name: &str, title: &str, usage: &UsageSet, fields: &FieldSet) -> String {
    let commands: Vec<_> = usage.visible().collect();
    let flags = fields.visible_flags_with_help();
    let mut out = String::new();

    let _ = writeln!(out, "# {name}\n");
    let _ = writeln!(out, "{}\n", first_line(title));

    let _ = writeln!(out, "## Synopsis\n");
    let _ = writeln!(out, "```\n{}\n```\n", synopsis(name, !commands.is_empty()));

    let remaining: Vec<&str> = title.lines().skip(1).collect();
    if !remaining.is_empty() {
        let _ = writeln!(out, "## Description\n");
        for line in &remaining {
            let _ = writeln!(out, "{}", line.trim());
        }
        let _ = writeln!(out);
    }

    if !commands.is_empty() {
        let _ = writeln!(out, "## Commands\n");
        let _ = writeln!(out, "| Command | Description |");
        let _ = writeln!(out, "|---------|-------------|");
        for cmd in &commands {
            let _ = writeln!(out, "| `{}` | {} |", cmd.name, cmd.description);
        }
        let _ = writeln!(out);
    }

    if !flags.is_empty() {
        let _ = writeln!(out, "## Options\n");
        let _ = writeln!(out, "| Flag | Description |");
        let _ = writeln!(out, "|------|-------------|");
        for flag in &flags {
            let mut cell = format!("`--{}`", flag.display_name);
            if let Some(short) = &flag.short {
                cell = format!("`-{short}`, {cell}");
            }
            if !flag.boolean {
                let _ = write!(cell, " *{}*", flag.type_name);
            }
            let _ = writeln!(out, "| {} | {} |", cell, flag.description);
        }
        let _ = writeln!(out);
    }

    out
}

// -- reStructuredText ---------------------------------------------------------

fn rst(name: &str, title: &str, usage: &UsageSet, fields: &FieldSet) -> String {
    let commands: Vec<_> = usage.visible().collect();
    let flags = fields.visible_flags_with_help();
    let mut out = String::new();

    let _ = writeln!(out, "{name}");
    let _ = writeln!(out, "{}\n", "=".repeat(name.len()));
    let _ = writeln!(out, "{}\n", first_line(title));

    let _ = writeln!(out, "Synopsis");
    let _ = writeln!(out, "--------\n");
    let _ = writeln!(out, ".. code-block:: bash\n");
    let _ = writeln!(out, "   {}\n", synopsis(name, !commands.is_empty()));

    let remaining: Vec<&str> = title.lines().skip(1).collect();
    if !remaining.is_empty() {
        let _ = writeln!(out, "Description");
        let _ = writeln!(out, "-----------\n");
        for line in &remaining {
            let _ = writeln!(out, "{}", line.trim());
        }
        let _ = writeln!(out);
    }

    if !commands.is_empty() {
        let _ = writeln!(out, "Commands");
        let _ = writeln!(out, "--------\n");
        for cmd in &commands {
            let _ = writeln!(out, "**{}**", cmd.name);
            let _ = writeln!(out, "   {}\n", cmd.description);
        }
    }

    if !flags.is_empty() {
        let _ = writeln!(out, "Options");
        let _ = writeln!(out, "-------\n");
        for flag in &flags {
            let mut term = format!("--{}", flag.display_name);
            if let Some(short) = &flag.short {
                term = format!("-{short}, {term}");
            }
            if !flag.boolean {
                let _ = write!(term, " *{}*", flag.type_name);
            }
            let _ = writeln!(out, "**{term}**");
            let _ = writeln!(out, "   {}\n", flag.description);
        }
    }

    out
}

// -- YAML ---------------------------------------------------------------------

#[derive(Serialize)]
struct DocCommand {
    name: String,
    description: String,
}

#[derive(Serialize)]
struct DocOption {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    short: Option<String>,
    description: String,
    #[serde(rename = "type")]
    type_name: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    required: bool,
}

#[derive(Serialize)]
struct DocModel {
    name: String,
    description: String,
    synopsis: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    commands: Vec<DocCommand>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<DocOption>,
}

fn option_type(flag: &Field) -> String {
    if flag.boolean {
        "boolean".to_string()
    } else {
        flag.type_name.clone()
    }
}

fn yaml(name: &str, title: &str, usage: &UsageSet, fields: &FieldSet) -> Result<String, Error> {
    let model = DocModel {
        name: name.to_string(),
        description: first_line(title).to_string(),
        synopsis: synopsis(name, usage.visible().next().is_some()),
        commands: usage
            .visible()
            .map(|e| DocCommand {
                name: e.name.clone(),
                description: e.description.clone(),
            })
            .collect(),
        options: fields
            .visible_flags_with_help()
            .iter()
            .map(|f| DocOption {
                name: f.display_name.clone(),
                short: f.short.clone(),
                description: f.description.clone(),
                type_name: option_type(f),
                required: f.required,
            })
            .collect(),
    };
    Ok(serde_yaml::to_string(&model)?)
}

// -- LLM tool schemas ---------------------------------------------------------

/// JSON Schema type for a flag.
fn json_type(flag: &Field) -> &'static str {
    if flag.boolean {
        return "boolean";
    }
    match flag.type_name.as_str() {
        "int" => "integer",
        "float" => "number",
        _ => "string",
    }
}

/// Only `[a-zA-Z0-9_-]` survive in tool names.
fn sanitize_tool_name(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Flags exposed to LLM schemas: visible, minus the help flag.
fn llm_flags(fields: &FieldSet) -> Vec<Field> {
    fields
        .flags()
        .filter(|f| !f.hidden && f.name != "help")
        .cloned()
        .collect()
}

fn input_schema(flags: &[Field]) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    for flag in flags {
        properties.insert(
            flag.display_name.clone(),
            json!({
                "type": json_type(flag),
                "description": flag.description,
            }),
        );
    }
    let required: Vec<&str> = flags
        .iter()
        .filter(|f| f.required)
        .map(|f| f.display_name.as_str())
        .collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Tool (name, description) per visible command, or one tool for the
/// whole program when no commands are declared.
fn tool_names(name: &str, title: &str, usage: &UsageSet) -> Vec<(String, String)> {
    let commands: Vec<_> = usage.visible().collect();
    if commands.is_empty() {
        return vec![(
            sanitize_tool_name(name),
            first_line(title).to_string(),
        )];
    }
    commands
        .iter()
        .map(|cmd| {
            let desc = if cmd.description.is_empty() {
                first_line(title).to_string()
            } else {
                cmd.description.clone()
            };
            (sanitize_tool_name(&format!("{name}_{}", cmd.name)), desc)
        })
        .collect()
}

fn llm_anthropic(
    name: &str,
    title: &str,
    usage: &UsageSet,
    fields: &FieldSet,
) -> Result<String, Error> {
    let flags = llm_flags(fields);
    let tools: Vec<serde_json::Value> = tool_names(name, title, usage)
        .into_iter()
        .map(|(tool, desc)| {
            json!({
                "name": tool,
                "description": desc,
                "input_schema": input_schema(&flags),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&tools)?)
}

fn llm_openai(
    name: &str,
    title: &str,
    usage: &UsageSet,
    fields: &FieldSet,
) -> Result<String, Error> {
    let flags = llm_flags(fields);
    let tools: Vec<serde_json::Value> = tool_names(name, title, usage)
        .into_iter()
        .map(|(tool, desc)| {
            json!({
                "type": "function",
                "function": {
                    "name": tool,
                    "description": desc,
                    "parameters": input_schema(&flags),
                },
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&tools)?)
}
