//! Temporary file generation with shell assignments and special outputs.
//!
//! On a successful parse the binary writes the engine's bindings as
//! eval-able shell assignments to a temporary file and prints its path;
//! the sourcing wrapper applies them in the caller's scope. Help and
//! version screens become heredoc scripts the same way.

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

use crate::scope::ShellScope;

/// Heredoc delimiter for help output.
const HELP_DELIMITER: &str = "ARGSH_HELP";

/// Quote a string for the shell using single quotes.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if c == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Render every binding the engines wrote, in first-write order, as
/// shell assignments.
pub fn render_assignments(scope: &ShellScope) -> String {
    let mut out = String::new();
    for name in scope.written_names() {
        if scope.is_array(&name) {
            let items: Vec<String> = scope
                .read_array(&name)
                .iter()
                .map(|v| quote(v))
                .collect();
            out.push_str(&format!("{}=({})\n", name, items.join(" ")));
        } else if let Some(value) = scope.get_scalar(&name) {
            out.push_str(&format!("{}={}\n", name, quote(value)));
        }
    }
    out
}

/// Write the assignments to a temporary file and return its path. The
/// file persists until the sourcing wrapper removes it.
pub fn write_assignments(scope: &ShellScope) -> Result<PathBuf> {
    write_temp_file(&render_assignments(scope))
}

/// A sourceable script that prints `text` and returns success, used for
/// help and version screens.
pub fn render_display_script(text: &str) -> String {
    format!(
        "cat <<'{delimiter}'\n{text}{delimiter}\nreturn 0 2>/dev/null || exit 0\n",
        delimiter = HELP_DELIMITER,
        text = text
    )
}

/// Write a help/version display script and return its path.
pub fn write_display_script(text: &str) -> Result<PathBuf> {
    write_temp_file(&render_display_script(text))
}

fn write_temp_file(content: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    Ok(path)
}
