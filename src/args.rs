//! Argument engine: binds positionals and flags from a command-line tail
//! into the caller's scope.
//!
//! Writes are staged while the tail is walked and applied only when the
//! whole parse succeeds, so a rejected value never leaves a half-bound
//! scope behind.

use std::collections::HashSet;

use crate::coerce::CoercerRegistry;
use crate::field::FieldSet;
use crate::help;
use crate::scope::ShellScope;
use crate::suggest::suggest;
use crate::usage::CommandPath;
use crate::Error;
use thiserror::Error as ThisError;

/// User errors: the command line as typed cannot be bound.
#[derive(Debug, ThisError)]
pub enum ParseError {
    #[error("unknown flag: {flag}{}", suggestion_suffix(.suggestion))]
    UnknownFlag {
        flag: String,
        suggestion: Option<String>,
    },

    #[error("missing value for flag: {0}")]
    MissingValue(String),

    #[error("missing required flag: {0}")]
    MissingRequiredFlag(String),

    #[error("missing required argument: {0}")]
    MissingRequiredArgument(String),

    #[error("too many arguments: {0}")]
    TooManyArguments(String),

    #[error("Invalid command: {command}{}", suggestion_suffix(.suggestion))]
    UnknownCommand {
        command: String,
        suggestion: Option<String>,
    },

    #[error("unknown shell: {0}. Use bash, zsh, or fish")]
    UnknownShell(String),

    #[error("unknown format: {0}. Use man, md, rst, yaml, or llm")]
    UnknownFormat(String),

    #[error("unknown LLM provider: {0}. Use openai, anthropic, or gemini")]
    UnknownProvider(String),

    #[error("llm format requires a provider: openai, anthropic, or gemini")]
    MissingProvider,
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(". Did you mean '{name}'?"),
        None => String::new(),
    }
}

/// Outcome of one argument parse.
#[derive(Debug)]
pub enum ArgsOutcome {
    /// The tail asked for help; nothing was written.
    Help(String),
    /// All bindings were written into the scope.
    Parsed,
}

/// One deferred scope mutation, applied in token order on success.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WriteOp {
    Scalar(String, String),
    Append(String, String),
    ClearArray(String),
}

pub(crate) fn apply_writes(scope: &mut ShellScope, writes: Vec<WriteOp>) -> Result<(), Error> {
    for op in writes {
        match op {
            WriteOp::Scalar(name, value) => scope.set_scalar(&name, &value)?,
            WriteOp::Append(name, value) => scope.array_append(&name, &value)?,
            WriteOp::ClearArray(name) => scope.array_set_all(&name, &[])?,
        }
    }
    Ok(())
}

/// Parse `tail` against the caller's `args` declarations.
///
/// On `-h`/`--help` as the first token, returns the rendered help text
/// without touching the scope. Otherwise walks the tail left to right,
/// coerces every value, enforces required/default rules and commits the
/// bindings.
pub fn parse_args(
    title: &str,
    tail: &[String],
    scope: &mut ShellScope,
    registry: &CoercerRegistry,
    path: &CommandPath,
) -> Result<ArgsOutcome, Error> {
    let fields = FieldSet::from_scope("args", scope)?;

    if matches!(tail.first().map(String::as_str), Some("-h" | "--help")) {
        let text = help::render_args_help(title, &fields, path, scope);
        return Ok(ArgsOutcome::Help(text));
    }

    let mut cli: Vec<String> = tail.to_vec();
    let mut matched: Vec<String> = Vec::new();
    let mut writes: Vec<WriteOp> = Vec::new();
    let mut cleared: HashSet<String> = HashSet::new();
    let mut positional_index = 1usize;

    while !cli.is_empty() {
        if !cli[0].starts_with('-') {
            let field = match fields.positional(positional_index) {
                Some(f) => f,
                None => return Err(ParseError::TooManyArguments(cli[0].clone()).into()),
            };
            let value = registry.coerce(&field.type_name, &field.display_name, &cli[0])?;
            if field.multiple {
                // The first command-line value replaces caller-seeded
                // contents; later values append.
                if cleared.insert(field.name.clone()) {
                    writes.push(WriteOp::ClearArray(field.name.clone()));
                }
                writes.push(WriteOp::Append(field.name.clone(), value));
            } else {
                writes.push(WriteOp::Scalar(field.name.clone(), value));
            }
            matched.push(field.display_name.clone());
            cli.remove(0);
            positional_index += 1;
            continue;
        }

        if !parse_flag_at(&mut cli, 0, &fields, registry, &mut matched, &mut writes)? {
            let flag = cli[0].clone();
            let suggestion = suggest(
                flag.trim_start_matches('-'),
                fields
                    .flags()
                    .filter(|f| !f.hidden)
                    .map(|f| f.display_name.as_str()),
            );
            return Err(ParseError::UnknownFlag { flag, suggestion }.into());
        }
    }

    // The next expected positional must already hold a default when the
    // tail ran short of it.
    if let Some(field) = fields.positional(positional_index) {
        if !field.multiple && scope.is_uninitialized(&field.name) {
            return Err(ParseError::MissingRequiredArgument(field.name.clone()).into());
        }
    }
    // Explicitly required positionals must appear on the command line
    // even when the variable holds a default.
    for field in fields.positionals() {
        if field.required && !matched.iter().any(|m| m == &field.display_name) {
            return Err(ParseError::MissingRequiredArgument(field.name.clone()).into());
        }
    }

    check_required_flags(&fields, &matched, &mut writes)?;

    apply_writes(scope, writes)?;
    Ok(ArgsOutcome::Parsed)
}

/// Parse the flag token at `cli[idx]`.
///
/// Returns `Ok(true)` when a declared flag was consumed (the token is
/// removed or, for short clusters, rewritten in place), `Ok(false)` when
/// the token matches no declared flag.
pub(crate) fn parse_flag_at(
    cli: &mut Vec<String>,
    idx: usize,
    fields: &FieldSet,
    registry: &CoercerRegistry,
    matched: &mut Vec<String>,
    writes: &mut Vec<WriteOp>,
) -> Result<bool, Error> {
    let arg = cli[idx].clone();
    let flag_part = arg.split('=').next().unwrap_or(&arg);

    let (lookup, is_long) = if let Some(stripped) = flag_part.strip_prefix("--") {
        (stripped.to_string(), true)
    } else if flag_part.starts_with('-') && flag_part.chars().count() >= 2 {
        let first = flag_part.chars().nth(1).map(String::from).unwrap_or_default();
        (first, false)
    } else {
        return Ok(false);
    };

    let field = match fields.lookup_flag(&lookup) {
        Some(f) => f.clone(),
        None => return Ok(false),
    };
    matched.push(field.display_name.clone());

    if field.boolean {
        if field.multiple {
            // Appending `1` per occurrence lets `-vvv` count.
            writes.push(WriteOp::Append(field.name.clone(), "1".to_string()));
        } else {
            writes.push(WriteOp::Scalar(field.name.clone(), "1".to_string()));
        }
        if is_long {
            cli.remove(idx);
        } else {
            // Drop the consumed letter, keep the rest of the cluster.
            let rest: String = cli[idx].chars().skip(2).collect();
            if rest.is_empty() {
                cli.remove(idx);
            } else {
                cli[idx] = format!("-{rest}");
            }
        }
        return Ok(true);
    }

    let value = if is_long {
        if let Some((_, inline)) = arg.split_once('=') {
            cli.remove(idx);
            inline.to_string()
        } else {
            cli.remove(idx);
            if idx >= cli.len() {
                return Err(ParseError::MissingValue(field.display_name.clone()).into());
            }
            cli.remove(idx)
        }
    } else {
        let inline: String = arg.chars().skip(2).collect();
        cli.remove(idx);
        if inline.is_empty() {
            if idx >= cli.len() {
                return Err(ParseError::MissingValue(field.display_name.clone()).into());
            }
            cli.remove(idx)
        } else {
            inline.strip_prefix('=').unwrap_or(&inline).to_string()
        }
    };

    let converted = registry.coerce(&field.type_name, &field.display_name, &value)?;
    if field.multiple {
        writes.push(WriteOp::Append(field.name.clone(), converted));
    } else {
        writes.push(WriteOp::Scalar(field.name.clone(), converted));
    }
    Ok(true)
}

/// Stage `0` for absent booleans and reject absent required flags.
pub(crate) fn check_required_flags(
    fields: &FieldSet,
    matched: &[String],
    writes: &mut Vec<WriteOp>,
) -> Result<(), ParseError> {
    for field in fields.flags() {
        let was_matched = matched.iter().any(|m| m == &field.display_name);
        if field.boolean && !field.multiple && !field.has_default && !was_matched {
            writes.push(WriteOp::Scalar(field.name.clone(), "0".to_string()));
        }
        if field.required && !was_matched {
            return Err(ParseError::MissingRequiredFlag(field.display_name.clone()));
        }
    }
    Ok(())
}
