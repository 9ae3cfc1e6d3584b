//! argsh - declarative argument parsing and subcommand routing for
//! shell scripts.
//!
//! Shell authors declare fields and subcommands as flat spec/description
//! pairs. The engines here decode those declarations, bind a command
//! line back into the caller's scope, dispatch subcommands through a
//! namespace fallback, and render help, completions and documentation
//! from the same declarations.

pub mod args;
pub mod coerce;
pub mod completion;
pub mod docgen;
pub mod field;
pub mod help;
pub mod output;
pub mod scope;
pub mod suggest;
pub mod usage;

pub use args::{parse_args, ArgsOutcome, ParseError};
pub use coerce::{CoerceError, CoercerRegistry};
pub use field::{field_name, Field, FieldKind, FieldSet, SpecError, UsageEntry, UsageSet};
pub use scope::{is_tty, ScopeError, ShellScope};
pub use suggest::suggest;
pub use usage::{parse_usage, CommandPath, UsageOutcome};

use thiserror::Error as ThisError;

/// Any failure an engine can surface. User errors and declaration
/// errors both map to exit status 2 but carry distinct stderr prefixes,
/// so authors can tell a mistyped command line from a buggy declaration.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Scope(#[from] scope::ScopeError),

    #[error(transparent)]
    Spec(#[from] field::SpecError),

    #[error(transparent)]
    Coerce(#[from] coerce::CoerceError),

    #[error(transparent)]
    Parse(#[from] args::ParseError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// True when the invoking user mistyped the command line; false for
    /// declaration bugs and environment failures.
    pub fn is_user_error(&self) -> bool {
        match self {
            Error::Parse(_) => true,
            Error::Coerce(coerce::CoerceError::Rejected { .. }) => true,
            _ => false,
        }
    }

    /// Exit status surfaced to the host shell. The engines never
    /// terminate the process themselves.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
