//! Type coercion registry.
//!
//! A coercer takes the raw command-line string and either returns the
//! typed string to bind, or rejects the value. Built-ins cover the named
//! types; `register` extends the set, which is how the shell adapter
//! wires up `to::*` functions discovered in caller scope.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoerceError {
    /// The user supplied a value the coercer would not accept.
    #[error("invalid {type_name} value for '{field}': {value}")]
    Rejected {
        type_name: String,
        field: String,
        value: String,
    },

    /// The author referenced a type no coercer is registered for.
    #[error("unknown type: {0}")]
    UnknownType(String),
}

type CoerceFn = Box<dyn Fn(&str) -> Result<String, ()>>;

/// Named coercers, keyed by the `~type` spelling in field specs.
pub struct CoercerRegistry {
    coercers: HashMap<String, CoerceFn>,
}

impl CoercerRegistry {
    /// A registry holding the built-in types: `string`, `int`, `float`,
    /// `boolean`, `file` and `stdin`.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            coercers: HashMap::new(),
        };
        registry.register("string", |value| Ok(value.to_string()));
        registry.register("int", to_int);
        registry.register("float", to_float);
        registry.register("boolean", to_boolean);
        registry.register("file", to_file);
        registry.register("stdin", to_stdin);
        registry
    }

    /// Add or replace a coercer under `name`.
    pub fn register<F>(&mut self, name: &str, coercer: F)
    where
        F: Fn(&str) -> Result<String, ()> + 'static,
    {
        self.coercers.insert(name.to_string(), Box::new(coercer));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.coercers.contains_key(name)
    }

    /// Run the named coercer over `value`. `field` only feeds the
    /// diagnostic on rejection.
    pub fn coerce(&self, type_name: &str, field: &str, value: &str) -> Result<String, CoerceError> {
        let name = if type_name.is_empty() {
            "string"
        } else {
            type_name
        };
        let coercer = self
            .coercers
            .get(name)
            .ok_or_else(|| CoerceError::UnknownType(name.to_string()))?;
        coercer(value).map_err(|_| CoerceError::Rejected {
            type_name: name.to_string(),
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

impl Default for CoercerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Optional sign plus digits, echoed in canonical form.
fn to_int(value: &str) -> Result<String, ()> {
    value.parse::<i64>().map(|n| n.to_string()).map_err(|_| ())
}

/// `-?[0-9]+(\.[0-9]+)?`, echoed unchanged.
fn to_float(value: &str) -> Result<String, ()> {
    let digits = value.strip_prefix('-').unwrap_or(value);
    let valid = match digits.split_once('.') {
        Some((whole, frac)) => {
            !whole.is_empty()
                && whole.chars().all(|c| c.is_ascii_digit())
                && !frac.is_empty()
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()),
    };
    if valid {
        Ok(value.to_string())
    } else {
        Err(())
    }
}

/// Empty, `0` and `false` become `0`; everything else becomes `1`.
fn to_boolean(value: &str) -> Result<String, ()> {
    match value {
        "" | "0" | "false" => Ok("0".to_string()),
        _ => Ok("1".to_string()),
    }
}

/// The value must name an existing regular file.
fn to_file(value: &str) -> Result<String, ()> {
    if Path::new(value).is_file() {
        Ok(value.to_string())
    } else {
        Err(())
    }
}

/// `-` reads stdin to EOF; anything else passes through.
fn to_stdin(value: &str) -> Result<String, ()> {
    if value != "-" {
        return Ok(value.to_string());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf).map_err(|_| ())?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CoercerRegistry {
        CoercerRegistry::with_builtins()
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(
            registry().coerce("string", "f", "any thing").unwrap(),
            "any thing"
        );
        // An empty type name means string.
        assert_eq!(registry().coerce("", "f", "x").unwrap(), "x");
    }

    #[test]
    fn test_int_canonical_form() {
        let r = registry();
        assert_eq!(r.coerce("int", "age", "42").unwrap(), "42");
        assert_eq!(r.coerce("int", "age", "-7").unwrap(), "-7");
        assert_eq!(r.coerce("int", "age", "+42").unwrap(), "42");
        assert_eq!(r.coerce("int", "age", "007").unwrap(), "7");
    }

    #[test]
    fn test_int_rejection_names_field_and_value() {
        let err = registry().coerce("int", "age", "foo").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("foo"));
        assert!(matches!(err, CoerceError::Rejected { .. }));
    }

    #[test]
    fn test_float_accepts() {
        let r = registry();
        for v in ["1", "-1", "3.14", "-0.5", "10"] {
            assert_eq!(r.coerce("float", "f", v).unwrap(), v);
        }
    }

    #[test]
    fn test_float_rejects() {
        let r = registry();
        for v in ["", "-", ".", "1.", ".5", "1.2.3", "abc", "1e5"] {
            assert!(r.coerce("float", "f", v).is_err(), "expected {v:?} rejected");
        }
    }

    #[test]
    fn test_boolean_folding() {
        let r = registry();
        assert_eq!(r.coerce("boolean", "f", "").unwrap(), "0");
        assert_eq!(r.coerce("boolean", "f", "0").unwrap(), "0");
        assert_eq!(r.coerce("boolean", "f", "false").unwrap(), "0");
        assert_eq!(r.coerce("boolean", "f", "true").unwrap(), "1");
        assert_eq!(r.coerce("boolean", "f", "yes").unwrap(), "1");
        assert_eq!(r.coerce("boolean", "f", "1").unwrap(), "1");
    }

    #[test]
    fn test_file_probe() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let path = tmp.path().to_str().unwrap().to_string();
        assert_eq!(registry().coerce("file", "cfg", &path).unwrap(), path);
        assert!(registry()
            .coerce("file", "cfg", "/no/such/file/here")
            .is_err());
    }

    #[test]
    fn test_stdin_passthrough_for_non_dash() {
        assert_eq!(registry().coerce("stdin", "f", "literal").unwrap(), "literal");
    }

    #[test]
    fn test_unknown_type() {
        let err = registry().coerce("uint", "f", "1").unwrap_err();
        assert!(matches!(err, CoerceError::UnknownType(name) if name == "uint"));
    }

    #[test]
    fn test_custom_coercer() {
        let mut r = registry();
        r.register("upper", |v| Ok(v.to_uppercase()));
        assert!(r.contains("upper"));
        assert_eq!(r.coerce("upper", "f", "abc").unwrap(), "ABC");
    }

    #[test]
    fn test_custom_coercer_rejection() {
        let mut r = registry();
        r.register("uint", |v| {
            v.parse::<u64>().map(|n| n.to_string()).map_err(|_| ())
        });
        assert_eq!(r.coerce("uint", "n", "5").unwrap(), "5");
        assert!(r.coerce("uint", "n", "-5").is_err());
    }
}
