//! In-memory shell symbol table, the bridge between the parse engines
//! and the caller's variable scope.
//!
//! The engines never touch a live shell. They read declarations from and
//! write bindings into a [`ShellScope`], and the adapter in `output.rs`
//! turns the scope's write log back into shell code.

use std::collections::{HashMap, HashSet};
use std::io::IsTerminal;
use thiserror::Error;

/// Default help column width when `ARGSH_FIELD_WIDTH` is not set.
const DEFAULT_FIELD_WIDTH: usize = 24;

/// Errors raised by scope writes.
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("invalid variable name: {0}")]
    InvalidName(String),
}

/// A single bound variable: scalar or indexed array.
///
/// An array declared without elements is bound but uninitialized, matching
/// `local -a arr` in the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Var {
    Scalar(String),
    Array(Vec<String>),
}

/// The caller's variable scope, function table, and script identity.
#[derive(Debug, Default)]
pub struct ShellScope {
    vars: HashMap<String, Var>,
    functions: HashSet<String>,
    script_name: String,
    writes: Vec<String>,
}

impl ShellScope {
    pub fn new(script_name: impl Into<String>) -> Self {
        Self {
            script_name: script_name.into(),
            ..Self::default()
        }
    }

    /// Basename of the entry point, used by help and error messages.
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// True if `name` is a valid shell variable name
    /// (`[A-Za-z_][A-Za-z0-9_]*`).
    pub fn is_valid_name(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    fn checked(name: &str) -> Result<(), ScopeError> {
        if Self::is_valid_name(name) {
            Ok(())
        } else {
            Err(ScopeError::InvalidName(name.to_string()))
        }
    }

    pub fn get_scalar(&self, name: &str) -> Option<&str> {
        match self.vars.get(name) {
            Some(Var::Scalar(v)) => Some(v),
            // Reading an array as a scalar yields its first element.
            Some(Var::Array(items)) => items.first().map(String::as_str),
            None => None,
        }
    }

    pub fn set_scalar(&mut self, name: &str, value: &str) -> Result<(), ScopeError> {
        Self::checked(name)?;
        match self.vars.get_mut(name) {
            // Scalar assignment to an array writes index 0.
            Some(Var::Array(items)) => {
                if items.is_empty() {
                    items.push(value.to_string());
                } else {
                    items[0] = value.to_string();
                }
            }
            _ => {
                self.vars
                    .insert(name.to_string(), Var::Scalar(value.to_string()));
            }
        }
        self.writes.push(name.to_string());
        Ok(())
    }

    /// Bind `name` as an empty indexed array (uninitialized until it
    /// receives an element).
    pub fn declare_array(&mut self, name: &str) -> Result<(), ScopeError> {
        Self::checked(name)?;
        self.vars
            .entry(name.to_string())
            .or_insert_with(|| Var::Array(Vec::new()));
        Ok(())
    }

    /// Replace the contents of an array binding.
    pub fn array_set_all(&mut self, name: &str, values: &[String]) -> Result<(), ScopeError> {
        Self::checked(name)?;
        self.vars
            .insert(name.to_string(), Var::Array(values.to_vec()));
        self.writes.push(name.to_string());
        Ok(())
    }

    pub fn array_append(&mut self, name: &str, value: &str) -> Result<(), ScopeError> {
        Self::checked(name)?;
        match self.vars.get_mut(name) {
            Some(Var::Array(items)) => items.push(value.to_string()),
            // Appending to a scalar promotes it, keeping the old value first.
            Some(Var::Scalar(old)) => {
                let items = vec![old.clone(), value.to_string()];
                self.vars.insert(name.to_string(), Var::Array(items));
            }
            None => {
                self.vars
                    .insert(name.to_string(), Var::Array(vec![value.to_string()]));
            }
        }
        self.writes.push(name.to_string());
        Ok(())
    }

    pub fn array_len(&self, name: &str) -> usize {
        match self.vars.get(name) {
            Some(Var::Array(items)) => items.len(),
            _ => 0,
        }
    }

    /// Dense copy of an array binding; empty when unset or scalar.
    pub fn read_array(&self, name: &str) -> Vec<String> {
        match self.vars.get(name) {
            Some(Var::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn is_array(&self, name: &str) -> bool {
        matches!(self.vars.get(name), Some(Var::Array(_)))
    }

    pub fn is_set(&self, name: &str) -> bool {
        !self.is_uninitialized(name)
    }

    /// Unbound, or an array with no elements.
    pub fn is_uninitialized(&self, name: &str) -> bool {
        match self.vars.get(name) {
            None => true,
            Some(Var::Array(items)) => items.is_empty(),
            Some(Var::Scalar(_)) => false,
        }
    }

    pub fn define_function(&mut self, name: &str) {
        self.functions.insert(name.to_string());
    }

    /// Walk the active function table for `name`.
    pub fn lookup_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Value used for default display: scalars verbatim, arrays joined
    /// with spaces, empty arrays suppressed.
    pub fn display_value(&self, name: &str) -> Option<String> {
        match self.vars.get(name) {
            Some(Var::Scalar(v)) => Some(v.clone()),
            Some(Var::Array(items)) if !items.is_empty() => Some(items.join(" ")),
            _ => None,
        }
    }

    /// Help column width, from the `ARGSH_FIELD_WIDTH` binding.
    pub fn field_width(&self) -> usize {
        self.get_scalar("ARGSH_FIELD_WIDTH")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_FIELD_WIDTH)
    }

    /// Forget writes recorded so far (called after the adapter seeds the
    /// scope, so only engine writes reach the output).
    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Names written since the last [`clear_writes`](Self::clear_writes),
    /// in first-write order, deduplicated.
    pub fn written_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for name in &self.writes {
            if seen.insert(name.clone()) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// True when stdout is attached to a terminal.
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_roundtrip() {
        let mut scope = ShellScope::new("test");
        scope.set_scalar("name", "alice").unwrap();
        assert_eq!(scope.get_scalar("name"), Some("alice"));
        assert!(scope.is_set("name"));
        assert!(!scope.is_array("name"));
    }

    #[test]
    fn test_unset_scalar_reads_as_unset() {
        let scope = ShellScope::new("test");
        assert_eq!(scope.get_scalar("missing"), None);
        assert!(scope.is_uninitialized("missing"));
        assert!(!scope.is_set("missing"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut scope = ShellScope::new("test");
        assert!(matches!(
            scope.set_scalar("1bad", "x"),
            Err(ScopeError::InvalidName(_))
        ));
        assert!(matches!(
            scope.set_scalar("bad-name", "x"),
            Err(ScopeError::InvalidName(_))
        ));
        assert!(matches!(
            scope.array_append("", "x"),
            Err(ScopeError::InvalidName(_))
        ));
    }

    #[test]
    fn test_valid_names() {
        assert!(ShellScope::is_valid_name("_x"));
        assert!(ShellScope::is_valid_name("my_var2"));
        assert!(!ShellScope::is_valid_name("2var"));
        assert!(!ShellScope::is_valid_name("a:b"));
    }

    #[test]
    fn test_empty_array_is_uninitialized() {
        let mut scope = ShellScope::new("test");
        scope.declare_array("items").unwrap();
        assert!(scope.is_array("items"));
        assert!(scope.is_uninitialized("items"));
        assert_eq!(scope.array_len("items"), 0);
    }

    #[test]
    fn test_array_append_preserves_order() {
        let mut scope = ShellScope::new("test");
        scope.declare_array("items").unwrap();
        scope.array_append("items", "a").unwrap();
        scope.array_append("items", "b").unwrap();
        scope.array_append("items", "c").unwrap();
        assert_eq!(scope.read_array("items"), vec!["a", "b", "c"]);
        assert!(scope.is_set("items"));
    }

    #[test]
    fn test_array_set_all_replaces() {
        let mut scope = ShellScope::new("test");
        scope
            .array_set_all("items", &["a".into(), "b".into()])
            .unwrap();
        scope.array_set_all("items", &["c".into()]).unwrap();
        assert_eq!(scope.read_array("items"), vec!["c"]);
    }

    #[test]
    fn test_scalar_write_to_array_sets_first_element() {
        let mut scope = ShellScope::new("test");
        scope.declare_array("flag").unwrap();
        scope.set_scalar("flag", "0").unwrap();
        assert_eq!(scope.read_array("flag"), vec!["0"]);
        assert!(scope.is_array("flag"));
    }

    #[test]
    fn test_function_lookup() {
        let mut scope = ShellScope::new("test");
        assert!(!scope.lookup_function("main::serve"));
        scope.define_function("main::serve");
        assert!(scope.lookup_function("main::serve"));
    }

    #[test]
    fn test_field_width_default_and_override() {
        let mut scope = ShellScope::new("test");
        assert_eq!(scope.field_width(), 24);
        scope.set_scalar("ARGSH_FIELD_WIDTH", "30").unwrap();
        assert_eq!(scope.field_width(), 30);
        scope.set_scalar("ARGSH_FIELD_WIDTH", "junk").unwrap();
        assert_eq!(scope.field_width(), 24);
    }

    #[test]
    fn test_write_log_tracks_order_and_dedupes() {
        let mut scope = ShellScope::new("test");
        scope.set_scalar("seed", "x").unwrap();
        scope.clear_writes();
        scope.set_scalar("b", "1").unwrap();
        scope.array_append("a", "1").unwrap();
        scope.set_scalar("b", "2").unwrap();
        assert_eq!(scope.written_names(), vec!["b", "a"]);
    }

    #[test]
    fn test_display_value() {
        let mut scope = ShellScope::new("test");
        scope.set_scalar("one", "v").unwrap();
        scope
            .array_set_all("many", &["a".into(), "b".into()])
            .unwrap();
        scope.declare_array("none").unwrap();
        assert_eq!(scope.display_value("one"), Some("v".to_string()));
        assert_eq!(scope.display_value("many"), Some("a b".to_string()));
        assert_eq!(scope.display_value("none"), None);
    }
}
