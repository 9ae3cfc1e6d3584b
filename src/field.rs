//! Field-spec and usage-entry decoding.
//!
//! A declaration is a flat array of spec/description pairs. The spec
//! grammar for fields is `[#]name[|short][:MOD...]` with the modifiers
//! `+` (boolean), `~type` and `!` (required); the entry `-` opens a new
//! help section. Usage entries follow `[#]name(|alias)*[:-handler]`.

use crate::scope::ShellScope;
use thiserror::Error;

/// Author errors: the declaration itself is malformed. These always
/// surface, since they indicate a bug in the calling script.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("the {0} array must hold an even number of elements (spec/description pairs)")]
    OddLength(String),

    #[error("empty name in declaration: {0}")]
    EmptyName(String),

    #[error("invalid variable name in declaration: {0}")]
    InvalidName(String),

    #[error("declaration '{0}' combines '+' with '~': a boolean flag takes no typed value")]
    BooleanWithType(String),

    #[error("duplicate modifier '{modifier}' in declaration: {spec}")]
    DuplicateModifier { spec: String, modifier: char },

    #[error("unknown modifier '{modifier}' in declaration: {spec}")]
    UnknownModifier { spec: String, modifier: char },

    #[error("modifier '~' needs a type name in declaration: {0}")]
    MissingType(String),

    #[error("command '{command}' maps to undefined function: {handler}")]
    HandlerMissing { command: String, handler: String },
}

/// What a declared field binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Matched by position in the tail.
    Positional,
    /// Matched as `--name` / `-x`.
    Flag,
    /// Not a binding; its description becomes a help section heading.
    Separator,
}

/// One decoded parameter declaration.
#[derive(Debug, Clone)]
pub struct Field {
    /// Variable name, dashes rewritten to underscores.
    pub name: String,
    /// Original spelling, dashes preserved, used for `--long` and display.
    pub display_name: String,
    pub short: Option<String>,
    pub kind: FieldKind,
    /// Named coercer; empty for booleans and separators.
    pub type_name: String,
    pub required: bool,
    pub boolean: bool,
    pub hidden: bool,
    /// The bound variable is an indexed array; values append.
    pub multiple: bool,
    /// The bound variable was set by the caller before the parse.
    pub has_default: bool,
    pub description: String,
    /// Raw spec string as declared.
    pub spec: String,
}

/// Extract the variable-name portion of a field spec.
///
/// With `asref` the name is rewritten for use as a variable (dashes to
/// underscores);
/// without it the original spelling is preserved for display.
pub fn field_name(spec: &str, asref: bool) -> String {
    let mut name = spec;
    if let Some(pos) = name.find(['|', ':']) {
        name = &name[..pos];
    }
    let name = name.strip_prefix('#').unwrap_or(name);
    if asref {
        name.replace('-', "_")
    } else {
        name.to_string()
    }
}

impl Field {
    /// Decode one spec/description pair, probing `scope` for the bound
    /// variable's pre-parse state.
    pub fn parse(spec: &str, description: &str, scope: &ShellScope) -> Result<Field, SpecError> {
        if spec == "-" {
            return Ok(Field {
                name: String::new(),
                display_name: String::new(),
                short: None,
                kind: FieldKind::Separator,
                type_name: String::new(),
                required: false,
                boolean: false,
                hidden: false,
                multiple: false,
                has_default: false,
                description: description.to_string(),
                spec: spec.to_string(),
            });
        }

        let hidden = spec.starts_with('#');
        let body = spec.strip_prefix('#').unwrap_or(spec);

        let (head, mods) = match body.find(':') {
            Some(pos) => (&body[..pos], &body[pos + 1..]),
            None => (body, ""),
        };

        let (display_name, short, kind) = match head.split_once('|') {
            Some((name, short)) => {
                let short = if short.is_empty() {
                    None
                } else {
                    Some(short.to_string())
                };
                (name, short, FieldKind::Flag)
            }
            None => (head, None, FieldKind::Positional),
        };

        if display_name.is_empty() {
            return Err(SpecError::EmptyName(spec.to_string()));
        }
        let name = display_name.replace('-', "_");
        if !ShellScope::is_valid_name(&name) {
            return Err(SpecError::InvalidName(spec.to_string()));
        }

        let (boolean, type_name, required) = parse_modifiers(spec, mods)?;
        let type_name = if type_name.is_empty() && !boolean {
            "string".to_string()
        } else {
            type_name
        };

        let multiple = scope.is_array(&name);
        let has_default = if multiple {
            scope.array_len(&name) > 0
        } else {
            scope.is_set(&name)
        };

        Ok(Field {
            name,
            display_name: display_name.to_string(),
            short,
            kind,
            type_name,
            required,
            boolean,
            hidden,
            multiple,
            has_default,
            description: description.to_string(),
            spec: spec.to_string(),
        })
    }

    /// The implicit `help|h:+` flag appended to listings when the author
    /// did not declare one.
    pub fn help_flag() -> Field {
        Field {
            name: "help".to_string(),
            display_name: "help".to_string(),
            short: Some("h".to_string()),
            kind: FieldKind::Flag,
            type_name: String::new(),
            required: false,
            boolean: true,
            hidden: false,
            multiple: false,
            has_default: false,
            description: "Show this help message".to_string(),
            spec: "help|h:+".to_string(),
        }
    }

    pub fn is_separator(&self) -> bool {
        self.kind == FieldKind::Separator
    }

    pub fn is_positional(&self) -> bool {
        self.kind == FieldKind::Positional
    }

    pub fn is_flag(&self) -> bool {
        self.kind == FieldKind::Flag
    }
}

/// Scan the modifier tail. `:` separates fragments; each of `+`, `!` and
/// `~type` may appear at most once.
fn parse_modifiers(spec: &str, mods: &str) -> Result<(bool, String, bool), SpecError> {
    let mut boolean = false;
    let mut required = false;
    let mut type_name = String::new();

    let mut chars = mods.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ':' => {}
            '+' => {
                if boolean {
                    return Err(SpecError::DuplicateModifier {
                        spec: spec.to_string(),
                        modifier: '+',
                    });
                }
                boolean = true;
            }
            '!' => {
                if required {
                    return Err(SpecError::DuplicateModifier {
                        spec: spec.to_string(),
                        modifier: '!',
                    });
                }
                required = true;
            }
            '~' => {
                if !type_name.is_empty() {
                    return Err(SpecError::DuplicateModifier {
                        spec: spec.to_string(),
                        modifier: '~',
                    });
                }
                while let Some(&tc) = chars.peek() {
                    if matches!(tc, ':' | '+' | '!' | '~') {
                        break;
                    }
                    type_name.push(tc);
                    chars.next();
                }
                if type_name.is_empty() {
                    return Err(SpecError::MissingType(spec.to_string()));
                }
            }
            other => {
                return Err(SpecError::UnknownModifier {
                    spec: spec.to_string(),
                    modifier: other,
                });
            }
        }
    }

    if boolean && !type_name.is_empty() {
        return Err(SpecError::BooleanWithType(spec.to_string()));
    }

    Ok((boolean, type_name, required))
}

/// A decoded `args` declaration: fields in source order, separators kept
/// for rendering and skipped everywhere else.
#[derive(Debug, Default)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    /// Decode spec/description pairs. `label` names the source array in
    /// the odd-length diagnostic.
    pub fn decode(label: &str, pairs: &[String], scope: &ShellScope) -> Result<Self, SpecError> {
        if pairs.len() % 2 != 0 {
            return Err(SpecError::OddLength(label.to_string()));
        }
        let mut fields = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks(2) {
            fields.push(Field::parse(&pair[0], &pair[1], scope)?);
        }
        Ok(Self { fields })
    }

    /// Decode the named array from the caller's scope.
    pub fn from_scope(name: &str, scope: &ShellScope) -> Result<Self, SpecError> {
        Self::decode(name, &scope.read_array(name), scope)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All entries in declaration order, separators included.
    pub fn entries(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn flags(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_flag())
    }

    pub fn positionals(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_positional())
    }

    /// Flag lookup: full long name first, then short alias.
    pub fn lookup_flag(&self, alias: &str) -> Option<&Field> {
        self.flags()
            .find(|f| f.display_name == alias)
            .or_else(|| self.flags().find(|f| f.short.as_deref() == Some(alias)))
    }

    /// The field for the `position`-th positional token (1-based). An
    /// array-typed positional is a catch-all: it matches its own slot and
    /// every later one.
    pub fn positional(&self, position: usize) -> Option<&Field> {
        if position == 0 {
            return None;
        }
        let mut remaining = position;
        for field in self.positionals() {
            if field.multiple {
                return Some(field);
            }
            remaining -= 1;
            if remaining == 0 {
                return Some(field);
            }
        }
        None
    }

    /// Visible flags for help, completion and docs, with the implicit
    /// help flag appended when absent.
    pub fn visible_flags_with_help(&self) -> Vec<Field> {
        let mut flags: Vec<Field> = self.flags().filter(|f| !f.hidden).cloned().collect();
        if !flags.iter().any(|f| f.name == "help") {
            flags.push(Field::help_flag());
        }
        flags
    }
}

/// One decoded subcommand declaration.
#[derive(Debug, Clone)]
pub struct UsageEntry {
    /// Canonical command name (first alias), used for dispatch and display.
    pub name: String,
    /// All accepted spellings, canonical name included.
    pub aliases: Vec<String>,
    /// Explicit `:-` handler mapping; overrides namespace fallback.
    pub handler: Option<String>,
    pub hidden: bool,
    pub separator: bool,
    pub description: String,
    pub spec: String,
}

impl UsageEntry {
    pub fn parse(spec: &str, description: &str) -> Result<UsageEntry, SpecError> {
        if spec == "-" {
            return Ok(UsageEntry {
                name: String::new(),
                aliases: Vec::new(),
                handler: None,
                hidden: false,
                separator: true,
                description: description.to_string(),
                spec: spec.to_string(),
            });
        }

        let hidden = spec.starts_with('#');
        let body = spec.strip_prefix('#').unwrap_or(spec);

        let (names, handler) = match body.split_once(":-") {
            Some((names, handler)) => (names, Some(handler.to_string())),
            None => match body.split_once(':') {
                Some((names, _)) => (names, None),
                None => (body, None),
            },
        };

        let aliases: Vec<String> = names
            .split('|')
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        let name = match aliases.first() {
            Some(n) => n.clone(),
            None => return Err(SpecError::EmptyName(spec.to_string())),
        };

        Ok(UsageEntry {
            name,
            aliases,
            handler,
            hidden,
            separator: false,
            description: description.to_string(),
            spec: spec.to_string(),
        })
    }
}

/// A decoded `usage` declaration.
#[derive(Debug, Default)]
pub struct UsageSet {
    entries: Vec<UsageEntry>,
}

impl UsageSet {
    pub fn decode(label: &str, pairs: &[String]) -> Result<Self, SpecError> {
        if pairs.len() % 2 != 0 {
            return Err(SpecError::OddLength(label.to_string()));
        }
        let mut entries = Vec::with_capacity(pairs.len() / 2);
        for pair in pairs.chunks(2) {
            entries.push(UsageEntry::parse(&pair[0], &pair[1])?);
        }
        Ok(Self { entries })
    }

    pub fn from_scope(name: &str, scope: &ShellScope) -> Result<Self, SpecError> {
        Self::decode(name, &scope.read_array(name))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &UsageEntry> {
        self.entries.iter()
    }

    /// First entry (hidden included) with an alias equal to `command`.
    pub fn resolve(&self, command: &str) -> Option<&UsageEntry> {
        self.entries
            .iter()
            .filter(|e| !e.separator)
            .find(|e| e.aliases.iter().any(|a| a == command))
    }

    /// Commands eligible for help, completion, docs and suggestions.
    pub fn visible(&self) -> impl Iterator<Item = &UsageEntry> {
        self.entries.iter().filter(|e| !e.separator && !e.hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> ShellScope {
        ShellScope::new("test")
    }

    #[test]
    fn test_field_name_extraction() {
        assert_eq!(field_name("flag|f:~int!", true), "flag");
        assert_eq!(field_name("#hidden|h", true), "hidden");
        assert_eq!(field_name("my-flag|m", true), "my_flag");
        assert_eq!(field_name("my-flag|m", false), "my-flag");
        assert_eq!(field_name("plain", true), "plain");
    }

    #[test]
    fn test_parse_positional() {
        let f = Field::parse("name", "Name", &scope()).unwrap();
        assert_eq!(f.kind, FieldKind::Positional);
        assert_eq!(f.name, "name");
        assert_eq!(f.type_name, "string");
        assert!(!f.required);
        assert!(!f.boolean);
        assert!(!f.hidden);
    }

    #[test]
    fn test_parse_typed_required_flag() {
        let f = Field::parse("age|a:~int:!", "Age", &scope()).unwrap();
        assert_eq!(f.kind, FieldKind::Flag);
        assert_eq!(f.short.as_deref(), Some("a"));
        assert_eq!(f.type_name, "int");
        assert!(f.required);
    }

    #[test]
    fn test_parse_compact_modifiers() {
        // Modifiers may run together after a single colon.
        let f = Field::parse("age|a:~int!", "Age", &scope()).unwrap();
        assert_eq!(f.type_name, "int");
        assert!(f.required);
    }

    #[test]
    fn test_parse_boolean_flag() {
        let f = Field::parse("verbose|v:+", "Verbose", &scope()).unwrap();
        assert!(f.boolean);
        assert_eq!(f.type_name, "");
    }

    #[test]
    fn test_required_boolean_allowed() {
        let f = Field::parse("ack|:+:!", "Must confirm", &scope()).unwrap();
        assert!(f.boolean);
        assert!(f.required);
        assert!(f.short.is_none());
    }

    #[test]
    fn test_long_only_flag() {
        // An empty short (`name|` or `name|:...`) leaves only the long form.
        let f = Field::parse("output|:~file", "Output", &scope()).unwrap();
        assert_eq!(f.kind, FieldKind::Flag);
        assert!(f.short.is_none());
        assert_eq!(f.type_name, "file");
    }

    #[test]
    fn test_hidden_field() {
        let f = Field::parse("#debug|d:+", "Debug", &scope()).unwrap();
        assert!(f.hidden);
        assert_eq!(f.name, "debug");
    }

    #[test]
    fn test_group_separator() {
        let f = Field::parse("-", "Advanced options", &scope()).unwrap();
        assert!(f.is_separator());
        assert_eq!(f.description, "Advanced options");
    }

    #[test]
    fn test_dashed_name_rewritten() {
        let f = Field::parse("dry-run|n:+", "Dry run", &scope()).unwrap();
        assert_eq!(f.name, "dry_run");
        assert_eq!(f.display_name, "dry-run");
    }

    #[test]
    fn test_error_boolean_with_type() {
        let err = Field::parse("bad|b:+~int", "Bad", &scope()).unwrap_err();
        assert!(matches!(err, SpecError::BooleanWithType(_)));
    }

    #[test]
    fn test_error_duplicate_modifier() {
        let err = Field::parse("bad|b:!:!", "Bad", &scope()).unwrap_err();
        assert!(matches!(
            err,
            SpecError::DuplicateModifier { modifier: '!', .. }
        ));
    }

    #[test]
    fn test_error_unknown_modifier() {
        let err = Field::parse("bad|b:?", "Bad", &scope()).unwrap_err();
        assert!(matches!(
            err,
            SpecError::UnknownModifier { modifier: '?', .. }
        ));
    }

    #[test]
    fn test_error_missing_type_name() {
        let err = Field::parse("bad|b:~", "Bad", &scope()).unwrap_err();
        assert!(matches!(err, SpecError::MissingType(_)));
    }

    #[test]
    fn test_scope_probing_sets_multiple_and_default() {
        let mut scope = scope();
        scope.declare_array("files").unwrap();
        scope.set_scalar("env", "prod").unwrap();

        let files = Field::parse("files", "Files", &scope).unwrap();
        assert!(files.multiple);
        assert!(!files.has_default);

        let env = Field::parse("env|e", "Env", &scope).unwrap();
        assert!(!env.multiple);
        assert!(env.has_default);
    }

    #[test]
    fn test_fieldset_rejects_odd_length() {
        let pairs = vec!["name".to_string()];
        let err = FieldSet::decode("args", &pairs, &scope()).unwrap_err();
        assert!(matches!(err, SpecError::OddLength(label) if label == "args"));
    }

    #[test]
    fn test_fieldset_lookup_long_before_short() {
        let pairs: Vec<String> = [
            "v|x", "first", // long name "v"
            "other|v", "short alias v",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let set = FieldSet::decode("args", &pairs, &scope()).unwrap();
        assert_eq!(set.lookup_flag("v").unwrap().display_name, "v");
        assert_eq!(set.lookup_flag("x").unwrap().display_name, "v");
        assert_eq!(set.lookup_flag("other").unwrap().display_name, "other");
    }

    #[test]
    fn test_positional_skips_separators_and_flags() {
        let pairs: Vec<String> = [
            "-", "Section", "flag|f", "A flag", "first", "First", "second", "Second",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let set = FieldSet::decode("args", &pairs, &scope()).unwrap();
        assert_eq!(set.positional(1).unwrap().name, "first");
        assert_eq!(set.positional(2).unwrap().name, "second");
        assert!(set.positional(3).is_none());
    }

    #[test]
    fn test_array_positional_is_catch_all() {
        let mut scope = scope();
        scope.declare_array("rest").unwrap();
        let pairs: Vec<String> = ["first", "First", "rest", "Rest"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let set = FieldSet::decode("args", &pairs, &scope).unwrap();
        assert_eq!(set.positional(1).unwrap().name, "first");
        assert_eq!(set.positional(2).unwrap().name, "rest");
        assert_eq!(set.positional(9).unwrap().name, "rest");
    }

    #[test]
    fn test_visible_flags_appends_help() {
        let pairs: Vec<String> = ["verbose|v:+", "Verbose", "#secret|s", "Hidden"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let set = FieldSet::decode("args", &pairs, &scope()).unwrap();
        let flags = set.visible_flags_with_help();
        let names: Vec<&str> = flags.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["verbose", "help"]);
    }

    #[test]
    fn test_usage_entry_aliases() {
        let e = UsageEntry::parse("serve|s|run", "Start the server").unwrap();
        assert_eq!(e.name, "serve");
        assert_eq!(e.aliases, vec!["serve", "s", "run"]);
        assert!(e.handler.is_none());
        assert!(!e.hidden);
    }

    #[test]
    fn test_usage_entry_explicit_handler() {
        let e = UsageEntry::parse("deploy|d:-ship::now", "Deploy").unwrap();
        assert_eq!(e.name, "deploy");
        assert_eq!(e.handler.as_deref(), Some("ship::now"));
    }

    #[test]
    fn test_usage_entry_hidden() {
        let e = UsageEntry::parse("#internal", "Internal").unwrap();
        assert!(e.hidden);
        assert_eq!(e.name, "internal");
    }

    #[test]
    fn test_usage_set_resolve_matches_hidden_aliases() {
        let pairs: Vec<String> = ["serve|s", "Serve", "#debug", "Debug"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let set = UsageSet::decode("usage", &pairs).unwrap();
        assert_eq!(set.resolve("s").unwrap().name, "serve");
        assert_eq!(set.resolve("debug").unwrap().name, "debug");
        assert!(set.resolve("missing").is_none());
        let visible: Vec<&str> = set.visible().map(|e| e.name.as_str()).collect();
        assert_eq!(visible, vec!["serve"]);
    }
}
