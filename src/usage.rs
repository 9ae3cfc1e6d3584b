//! Usage engine: consumes global flags plus one command token, resolves
//! the handler function and prepares dispatch.
//!
//! The resolved-command trail is an explicit [`CommandPath`] value rather
//! than ambient process state; the caller's function name arrives as an
//! explicit `caller` parameter and drives the namespace fallback.

use std::fmt;

use crate::args::{apply_writes, check_required_flags, parse_flag_at, ParseError, WriteOp};
use crate::coerce::CoercerRegistry;
use crate::field::{FieldSet, SpecError, UsageEntry, UsageSet};
use crate::help;
use crate::scope::ShellScope;
use crate::suggest::suggest;
use crate::Error;

/// Commands that are always dispatchable without being declared.
const IMPLICIT_COMPLETION: &str = "completion";
const IMPLICIT_DOCGEN: &str = "docgen";

/// The program basename followed by each resolved subcommand, used by
/// help and error messages to display the invocation path.
#[derive(Debug, Clone)]
pub struct CommandPath {
    parts: Vec<String>,
}

impl CommandPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            parts: vec![root.into()],
        }
    }

    /// Append a resolved command. Append-only by design; entries never
    /// leave the path during an invocation.
    pub fn push(&mut self, command: &str) {
        self.parts.push(command.to_string());
    }

    /// True until the first subcommand resolves.
    pub fn is_root(&self) -> bool {
        self.parts.len() == 1
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Path without the program basename (the subcommand trail).
    pub fn commands(&self) -> &[String] {
        &self.parts[1..]
    }
}

impl fmt::Display for CommandPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join(" "))
    }
}

/// Outcome of one usage parse.
#[derive(Debug)]
pub enum UsageOutcome {
    /// Help was requested, or no command could be resolved permissively.
    Help(String),
    /// The `--argsh` banner.
    Version(String),
    /// A handler was resolved; the tail is untouched.
    Dispatch { handler: String, tail: Vec<String> },
    /// The implicit `completion <shell>` command.
    Completion { tail: Vec<String> },
    /// The implicit `docgen <format>` command.
    Docgen { tail: Vec<String> },
}

/// Parse `tail` against the caller's `usage` (and optional `args`)
/// declarations.
///
/// Flags before the command are bound against the global field set. The
/// first non-flag token names the command; everything after it is handed
/// to the handler untouched. On success the scope's `usage` array is
/// rewritten to `[handler, tail...]` and the command is appended to
/// `path`.
pub fn parse_usage(
    title: &str,
    tail: &[String],
    scope: &mut ShellScope,
    registry: &CoercerRegistry,
    path: &mut CommandPath,
    caller: Option<&str>,
) -> Result<UsageOutcome, Error> {
    let usage = UsageSet::from_scope("usage", scope)?;
    let fields = FieldSet::from_scope("args", scope)?;

    if tail.is_empty() || matches!(tail[0].as_str(), "-h" | "--help") {
        let text = help::render_usage_help(title, &usage, &fields, path, scope);
        return Ok(UsageOutcome::Help(text));
    }

    if path.is_root() && tail[0] == "--argsh" {
        let sha = scope.get_scalar("ARGSH_COMMIT_SHA").unwrap_or_default().to_string();
        let version = scope.get_scalar("ARGSH_VERSION").unwrap_or_default().to_string();
        return Ok(UsageOutcome::Version(format!("https://arg.sh {sha} {version}")));
    }

    let mut cli: Vec<String> = tail.to_vec();
    let mut command: Option<String> = None;
    let mut matched: Vec<String> = Vec::new();
    let mut writes: Vec<WriteOp> = Vec::new();

    while !cli.is_empty() {
        if !cli[0].starts_with('-') {
            if command.is_some() {
                // The command is set; the rest belongs to the handler.
                break;
            }
            command = Some(cli.remove(0));
            continue;
        }
        if !parse_flag_at(&mut cli, 0, &fields, registry, &mut matched, &mut writes)? {
            // A stray flag before a resolved command falls through to the
            // help screen rather than erroring.
            break;
        }
    }

    check_required_flags(&fields, &matched, &mut writes)?;

    let command = match command {
        Some(c) => c,
        None => {
            apply_writes(scope, writes)?;
            let text = help::render_usage_help(title, &usage, &fields, path, scope);
            return Ok(UsageOutcome::Help(text));
        }
    };

    let entry = match usage.resolve(&command) {
        Some(entry) => entry,
        None => {
            // The built-in commands stay available without declaration
            // and are never offered as suggestions.
            match command.as_str() {
                IMPLICIT_COMPLETION => {
                    apply_writes(scope, writes)?;
                    path.push(&command);
                    return Ok(UsageOutcome::Completion { tail: cli });
                }
                IMPLICIT_DOCGEN => {
                    apply_writes(scope, writes)?;
                    path.push(&command);
                    return Ok(UsageOutcome::Docgen { tail: cli });
                }
                _ => {
                    let suggestion =
                        suggest(&command, usage.visible().map(|e| e.name.as_str()));
                    return Err(ParseError::UnknownCommand {
                        command,
                        suggestion,
                    }
                    .into());
                }
            }
        }
    };

    let handler = resolve_handler(entry, caller, scope)?;

    apply_writes(scope, writes)?;
    path.push(&entry.name);

    let mut rewritten = vec![handler.clone()];
    rewritten.extend(cli.iter().cloned());
    scope.array_set_all("usage", &rewritten)?;

    Ok(UsageOutcome::Dispatch { handler, tail: cli })
}

/// Map a matched usage entry to a handler function name.
///
/// An explicit `:-` mapping is an exclusive override and must name an
/// existing function. Otherwise the namespace fallback tries, in order:
/// `caller::cmd`, `<last caller segment>::cmd`, `cmd`, `argsh::cmd`.
fn resolve_handler(
    entry: &UsageEntry,
    caller: Option<&str>,
    scope: &ShellScope,
) -> Result<String, Error> {
    if let Some(handler) = &entry.handler {
        if !scope.lookup_function(handler) {
            return Err(SpecError::HandlerMissing {
                command: entry.name.clone(),
                handler: handler.clone(),
            }
            .into());
        }
        return Ok(handler.clone());
    }

    let cmd = &entry.name;
    let mut candidates: Vec<String> = Vec::new();
    if let Some(caller) = caller {
        candidates.push(format!("{caller}::{cmd}"));
        if let Some((_, last)) = caller.rsplit_once("::") {
            let short = format!("{last}::{cmd}");
            if !candidates.contains(&short) {
                candidates.push(short);
            }
        }
    }
    candidates.push(cmd.clone());
    candidates.push(format!("argsh::{cmd}"));

    candidates
        .into_iter()
        .find(|c| scope.lookup_function(c))
        .ok_or_else(|| {
            ParseError::UnknownCommand {
                command: cmd.clone(),
                suggestion: None,
            }
            .into()
        })
}
