//! argsh - declarative argument parsing for shell scripts.
//!
//! The sourcing wrapper passes the caller's declarations and scope state
//! on the command line; the binary runs the engines and prints the path
//! of a sourceable result file (bindings, help or version screen).
//! Diagnostics go to stderr with the engine's exit status.

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};

use argsh::usage::UsageOutcome;
use argsh::{
    completion, docgen, field_name, output, parse_args, parse_usage, ArgsOutcome, CommandPath,
    CoerceError, CoercerRegistry, Error, FieldSet, ShellScope, UsageSet,
};

/// Declarative argument parsing for shell scripts.
#[derive(Parser, Debug)]
#[command(name = "argsh", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Scope state shipped in by the sourcing wrapper.
#[derive(ClapArgs, Debug)]
struct ScopeSeed {
    /// Seed a scalar default in the caller's scope
    #[arg(long = "set", value_name = "NAME[=VALUE]", allow_hyphen_values = true)]
    set: Vec<String>,

    /// Declare an array binding, optionally seeding one element
    #[arg(long = "array", value_name = "NAME[=VALUE]", allow_hyphen_values = true)]
    array: Vec<String>,

    /// Declare a function visible to handler resolution (repeatable)
    #[arg(long = "fn", value_name = "NAME")]
    functions: Vec<String>,

    /// Program basename for help output (defaults to $ARGSH_SOURCE)
    #[arg(long)]
    source: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Bind positionals and flags from the tail into the caller's scope
    Args {
        /// Help title for the parse
        #[arg(long)]
        title: String,

        #[command(flatten)]
        seed: ScopeSeed,

        /// Field spec/description pairs, as in the args array
        #[arg(value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        fields: Vec<String>,

        /// Command-line tail to parse
        #[arg(last = true)]
        tail: Vec<String>,
    },

    /// Consume global flags plus one command and resolve its handler
    Usage {
        /// Help title for the command listing
        #[arg(long)]
        title: String,

        /// Caller function name driving the namespace fallback
        #[arg(long)]
        caller: Option<String>,

        /// Global flag spec/description pairs, as in the args array
        #[arg(long = "global", value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        globals: Vec<String>,

        #[command(flatten)]
        seed: ScopeSeed,

        /// Usage spec/description pairs
        #[arg(value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        entries: Vec<String>,

        /// Command-line tail to parse
        #[arg(last = true)]
        tail: Vec<String>,
    },

    /// Print a completion script for the declared commands and flags
    Completion {
        /// Target shell: bash, zsh or fish
        shell: String,

        /// Global flag spec/description pairs
        #[arg(long = "global", value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        globals: Vec<String>,

        #[command(flatten)]
        seed: ScopeSeed,

        /// Usage spec/description pairs
        #[arg(value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        entries: Vec<String>,
    },

    /// Print documentation for the declared commands and flags
    Docgen {
        /// Output format: man, md, rst, yaml or llm
        format: String,

        /// LLM provider for the llm format
        #[arg(long)]
        provider: Option<String>,

        /// Program description used as the document body
        #[arg(long, default_value = "")]
        title: String,

        /// Global flag spec/description pairs
        #[arg(long = "global", value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        globals: Vec<String>,

        #[command(flatten)]
        seed: ScopeSeed,

        /// Usage spec/description pairs
        #[arg(value_name = "SPEC_OR_DESC", allow_hyphen_values = true)]
        entries: Vec<String>,
    },

    /// Print the variable name encoded in a field spec
    FieldName {
        spec: String,

        /// Pass 0 to preserve dashes for display
        asref: Option<String>,
    },

    /// Run a type coercer over a value
    To {
        #[arg(value_name = "TYPE")]
        type_name: String,

        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    match cli.command {
        Commands::Args {
            title,
            seed,
            fields,
            tail,
        } => cmd_args(&title, &seed, &fields, &tail),
        Commands::Usage {
            title,
            caller,
            globals,
            seed,
            entries,
            tail,
        } => cmd_usage(&title, caller.as_deref(), &globals, &seed, &entries, &tail),
        Commands::Completion {
            shell,
            globals,
            seed,
            entries,
        } => cmd_completion(&shell, &globals, &seed, &entries),
        Commands::Docgen {
            format,
            provider,
            title,
            globals,
            seed,
            entries,
        } => cmd_docgen(&format, provider.as_deref(), &title, &globals, &seed, &entries),
        Commands::FieldName { spec, asref } => {
            println!("{}", field_name(&spec, asref.as_deref() != Some("0")));
            0
        }
        Commands::To { type_name, value } => cmd_to(&type_name, &value),
    }
}

/// Build the caller's scope from the wrapper's seeds plus the argsh
/// environment variables.
fn build_scope(seed: &ScopeSeed) -> Result<ShellScope, Error> {
    let script = seed
        .source
        .clone()
        .or_else(|| std::env::var("ARGSH_SOURCE").ok())
        .unwrap_or_else(|| "argsh".to_string());
    let mut scope = ShellScope::new(script);

    for var in ["ARGSH_FIELD_WIDTH", "ARGSH_VERSION", "ARGSH_COMMIT_SHA"] {
        if let Ok(value) = std::env::var(var) {
            scope.set_scalar(var, &value)?;
        }
    }

    for entry in &seed.set {
        match entry.split_once('=') {
            Some((name, value)) => scope.set_scalar(name, value)?,
            None => scope.set_scalar(entry, "")?,
        }
    }
    for entry in &seed.array {
        match entry.split_once('=') {
            Some((name, value)) => {
                scope.declare_array(name)?;
                scope.array_append(name, value)?;
            }
            None => scope.declare_array(entry)?,
        }
    }
    for function in &seed.functions {
        scope.define_function(function);
    }

    Ok(scope)
}

/// Built-ins plus an accept-all coercer per declared `to::*` function.
/// A separate process cannot call back into caller-scope functions, so
/// the real conversion stays with the shell side.
fn build_registry(functions: &[String]) -> CoercerRegistry {
    let mut registry = CoercerRegistry::with_builtins();
    for function in functions {
        if let Some(type_name) = function.strip_prefix("to::") {
            if !registry.contains(type_name) {
                registry.register(type_name, |value| Ok(value.to_string()));
            }
        }
    }
    registry
}

/// Print a diagnostic and hand back the engine's exit status. User
/// errors and declaration errors keep distinct prefixes.
fn report(script: &str, err: &Error) -> i32 {
    if err.is_user_error() {
        eprintln!("Error: {err}\n");
        eprintln!("  Run \"{script} -h\" for more information.");
    } else {
        eprintln!("argsh: invalid declaration: {err}");
    }
    err.exit_code()
}

fn emit_display(text: &str) -> i32 {
    match output::write_display_script(text).context("failed to create display output file") {
        Ok(path) => {
            println!("{}", path.display());
            0
        }
        Err(err) => {
            eprintln!("argsh: {err:#}");
            1
        }
    }
}

fn emit_assignments(scope: &ShellScope) -> i32 {
    match output::write_assignments(scope).context("failed to create output file") {
        Ok(path) => {
            println!("{}", path.display());
            0
        }
        Err(err) => {
            eprintln!("argsh: {err:#}");
            1
        }
    }
}

fn cmd_args(title: &str, seed: &ScopeSeed, fields: &[String], tail: &[String]) -> i32 {
    let mut scope = match build_scope(seed) {
        Ok(scope) => scope,
        Err(err) => return report("argsh", &err),
    };
    if let Err(err) = scope.array_set_all("args", fields) {
        return report(scope.script_name(), &err.into());
    }
    scope.clear_writes();

    let registry = build_registry(&seed.functions);
    let path = CommandPath::new(scope.script_name().to_string());

    match parse_args(title, tail, &mut scope, &registry, &path) {
        Ok(ArgsOutcome::Help(text)) => emit_display(&text),
        Ok(ArgsOutcome::Parsed) => emit_assignments(&scope),
        Err(err) => {
            let script = scope.script_name().to_string();
            report(&script, &err)
        }
    }
}

fn cmd_usage(
    title: &str,
    caller: Option<&str>,
    globals: &[String],
    seed: &ScopeSeed,
    entries: &[String],
    tail: &[String],
) -> i32 {
    let mut scope = match build_scope(seed) {
        Ok(scope) => scope,
        Err(err) => return report("argsh", &err),
    };
    if let Err(err) = scope.array_set_all("usage", entries) {
        return report(scope.script_name(), &err.into());
    }
    if !globals.is_empty() {
        if let Err(err) = scope.array_set_all("args", globals) {
            return report(scope.script_name(), &err.into());
        }
    }
    scope.clear_writes();

    let registry = build_registry(&seed.functions);
    let mut path = CommandPath::new(scope.script_name().to_string());

    match parse_usage(title, tail, &mut scope, &registry, &mut path, caller) {
        Ok(UsageOutcome::Help(text)) => emit_display(&text),
        Ok(UsageOutcome::Version(banner)) => emit_display(&format!("{banner}\n")),
        Ok(UsageOutcome::Dispatch { .. }) => {
            let commands: Vec<String> = path.commands().to_vec();
            if let Err(err) = scope.array_set_all("COMMANDNAME", &commands) {
                let script = scope.script_name().to_string();
                return report(&script, &err.into());
            }
            emit_assignments(&scope)
        }
        Ok(UsageOutcome::Completion { tail }) => usage_completion(&scope, &path, &tail),
        Ok(UsageOutcome::Docgen { tail }) => usage_docgen(&scope, &path, &tail, title),
        Err(err) => {
            let script = scope.script_name().to_string();
            report(&script, &err)
        }
    }
}

/// `completion` dispatched from the usage engine: render for the parent
/// command and hand back a display script.
fn usage_completion(scope: &ShellScope, path: &CommandPath, tail: &[String]) -> i32 {
    let parts = path.parts();
    let base = parts[..parts.len() - 1].join(" ");
    if tail.is_empty() || matches!(tail[0].as_str(), "-h" | "--help") {
        return emit_display(&completion::render_help(&base));
    }

    let sets = match load_sets(scope) {
        Ok(sets) => sets,
        Err(err) => return report(scope.script_name(), &err),
    };
    let name = parts[parts.len() - 2].clone();
    match completion::render(&tail[0], &name, &sets.0, &sets.1) {
        Ok(script) => emit_display(&script),
        Err(err) => report(scope.script_name(), &err),
    }
}

/// `docgen` dispatched from the usage engine.
fn usage_docgen(scope: &ShellScope, path: &CommandPath, tail: &[String], title: &str) -> i32 {
    let parts = path.parts();
    let base = parts[..parts.len() - 1].join(" ");
    if tail.is_empty() || matches!(tail[0].as_str(), "-h" | "--help") {
        return emit_display(&docgen::render_help(&base));
    }

    let sets = match load_sets(scope) {
        Ok(sets) => sets,
        Err(err) => return report(scope.script_name(), &err),
    };
    match docgen::render(
        &tail[0],
        tail.get(1).map(String::as_str),
        &base,
        title,
        &sets.0,
        &sets.1,
    ) {
        Ok(doc) => emit_display(&doc),
        Err(err) => report(scope.script_name(), &err),
    }
}

fn load_sets(scope: &ShellScope) -> Result<(UsageSet, FieldSet), Error> {
    let usage = UsageSet::from_scope("usage", scope)?;
    let fields = FieldSet::from_scope("args", scope)?;
    Ok((usage, fields))
}

fn cmd_completion(shell: &str, globals: &[String], seed: &ScopeSeed, entries: &[String]) -> i32 {
    let mut scope = match build_scope(seed) {
        Ok(scope) => scope,
        Err(err) => return report("argsh", &err),
    };
    if let Err(err) = scope.array_set_all("usage", entries) {
        return report(scope.script_name(), &err.into());
    }
    if let Err(err) = scope.array_set_all("args", globals) {
        return report(scope.script_name(), &err.into());
    }

    let sets = match load_sets(&scope) {
        Ok(sets) => sets,
        Err(err) => return report(scope.script_name(), &err),
    };
    match completion::render(shell, scope.script_name(), &sets.0, &sets.1) {
        Ok(script) => {
            print!("{script}");
            0
        }
        Err(err) => report(scope.script_name(), &err),
    }
}

fn cmd_docgen(
    format: &str,
    provider: Option<&str>,
    title: &str,
    globals: &[String],
    seed: &ScopeSeed,
    entries: &[String],
) -> i32 {
    let mut scope = match build_scope(seed) {
        Ok(scope) => scope,
        Err(err) => return report("argsh", &err),
    };
    if let Err(err) = scope.array_set_all("usage", entries) {
        return report(scope.script_name(), &err.into());
    }
    if let Err(err) = scope.array_set_all("args", globals) {
        return report(scope.script_name(), &err.into());
    }

    let sets = match load_sets(&scope) {
        Ok(sets) => sets,
        Err(err) => return report(scope.script_name(), &err),
    };
    match docgen::render(format, provider, scope.script_name(), title, &sets.0, &sets.1) {
        Ok(doc) => {
            print!("{doc}");
            0
        }
        Err(err) => report(scope.script_name(), &err),
    }
}

/// Direct coercer invocation: the value prints on stdout, a rejection
/// is exit 1, matching the contract custom coercers follow.
fn cmd_to(type_name: &str, value: &str) -> i32 {
    let registry = CoercerRegistry::with_builtins();
    match registry.coerce(type_name, type_name, value) {
        Ok(converted) => {
            println!("{converted}");
            0
        }
        Err(err @ CoerceError::UnknownType(_)) => report("argsh", &err.into()),
        Err(_) => 1,
    }
}
