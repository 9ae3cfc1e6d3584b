//! Shell completion script generation (bash, zsh, fish).

use std::fmt::Write;

use crate::args::ParseError;
use crate::field::{Field, FieldSet, UsageSet};
use crate::Error;

/// Render a completion script for `shell`. `name` is the command the
/// script completes for.
pub fn render(shell: &str, name: &str, usage: &UsageSet, fields: &FieldSet) -> Result<String, Error> {
    let mut out = String::new();
    match shell {
        "bash" => bash(&mut out, name, usage, fields),
        "zsh" => zsh(&mut out, name, usage, fields),
        "fish" => fish(&mut out, name, usage, fields),
        other => return Err(ParseError::UnknownShell(other.to_string()).into()),
    }
    Ok(out)
}

/// The short help screen for `completion` itself.
pub fn render_help(path: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Generate shell completion scripts.");
    let _ = writeln!(out);
    let _ = writeln!(out, "Usage: {} completion <shell>", path);
    let _ = writeln!(out);
    let _ = writeln!(out, "Available shells:");
    let _ = writeln!(out, "  bash    Bash completion script");
    let _ = writeln!(out, "  zsh     Zsh completion script");
    let _ = writeln!(out, "  fish    Fish completion script");
    out
}

fn flag_words(flags: &[Field]) -> Vec<String> {
    flags
        .iter()
        .flat_map(|f| {
            let mut words = vec![format!("--{}", f.display_name)];
            if let Some(short) = &f.short {
                words.push(format!("-{short}"));
            }
            words
        })
        .collect()
}

fn bash(out: &mut String, name: &str, usage: &UsageSet, fields: &FieldSet) {
    let flags = fields.visible_flags_with_help();
    let func = format!("_{}", name.replace('-', "_"));

    let _ = writeln!(out, "# bash completion for {name}");
    let _ = writeln!(out, "{func}() {{");
    let _ = writeln!(out, "    local cur=\"${{COMP_WORDS[COMP_CWORD]}}\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "    if [[ \"${{cur}}\" == -* ]]; then");
    let _ = writeln!(
        out,
        "        COMPREPLY=($(compgen -W \"{}\" -- \"${{cur}}\"))",
        flag_words(&flags).join(" ")
    );
    let _ = writeln!(out, "    else");
    let commands: Vec<&str> = usage.visible().map(|e| e.name.as_str()).collect();
    let _ = writeln!(
        out,
        "        COMPREPLY=($(compgen -W \"{}\" -- \"${{cur}}\"))",
        commands.join(" ")
    );
    let _ = writeln!(out, "    fi");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out, "complete -o default -F {func} {name}");
}

fn zsh(out: &mut String, name: &str, usage: &UsageSet, fields: &FieldSet) {
    let flags = fields.visible_flags_with_help();
    let commands: Vec<_> = usage.visible().collect();
    let func = format!("_{}", name.replace('-', "_"));

    let _ = writeln!(out, "#compdef {name}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{func}() {{");

    if !commands.is_empty() {
        let _ = writeln!(out, "    local -a commands=(");
        for cmd in &commands {
            let desc = cmd.description.replace('\'', "'\\''");
            let _ = writeln!(out, "        '{}:{}'", cmd.name, desc);
        }
        let _ = writeln!(out, "    )");
        let _ = writeln!(out);
    }

    let _ = write!(out, "    _arguments -s");
    for flag in &flags {
        let long = &flag.display_name;
        let desc = flag
            .description
            .replace('\'', "'\\''")
            .replace('[', "\\[")
            .replace(']', "\\]");
        if let Some(short) = &flag.short {
            if flag.boolean {
                let _ = write!(
                    out,
                    " \\\n        '(-{short} --{long})'{{\"-{short}\",\"--{long}\"}}'[{desc}]'"
                );
            } else {
                let _ = write!(
                    out,
                    " \\\n        '(-{short} --{long})'{{\"-{short}\",\"--{long}\"}}'[{desc}]:{}:'",
                    flag.type_name
                );
            }
        } else if flag.boolean {
            let _ = write!(out, " \\\n        '--{long}[{desc}]'");
        } else {
            let _ = write!(out, " \\\n        '--{long}[{desc}]:{}:'", flag.type_name);
        }
    }

    if !commands.is_empty() {
        let _ = writeln!(out, " \\\n        '*::command:->commands'");
        let _ = writeln!(out);
        let _ = writeln!(out, "    case \"$state\" in");
        let _ = writeln!(out, "        commands)");
        let _ = writeln!(out, "            _describe 'command' commands");
        let _ = writeln!(out, "            ;;");
        let _ = writeln!(out, "    esac");
    } else {
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "{func} \"$@\"");
}

fn fish(out: &mut String, name: &str, usage: &UsageSet, fields: &FieldSet) {
    let flags = fields.visible_flags_with_help();

    let _ = writeln!(out, "# fish completion for {name}");

    for cmd in usage.visible() {
        let desc = cmd.description.replace('\'', "\\'");
        let _ = writeln!(
            out,
            "complete -c {name} -n '__fish_use_subcommand' -a '{}' -d '{}'",
            cmd.name, desc
        );
    }

    for flag in &flags {
        let desc = flag.description.replace('\'', "\\'");
        let mut line = format!("complete -c {name} -l '{}'", flag.display_name);
        if let Some(short) = &flag.short {
            let _ = write!(line, " -s '{short}'");
        }
        if !flag.boolean {
            line.push_str(" -r");
        }
        let _ = write!(line, " -d '{desc}'");
        let _ = writeln!(out, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ShellScope;

    fn strings(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| s.to_string()).collect()
    }

    fn sets(usage: &[&str], args: &[&str]) -> (UsageSet, FieldSet) {
        let scope = ShellScope::new("app");
        (
            UsageSet::decode("usage", &strings(usage)).unwrap(),
            FieldSet::decode("args", &strings(args), &scope).unwrap(),
        )
    }

    #[test]
    fn test_bash_lists_commands_and_flags() {
        let (usage, fields) = sets(
            &["serve|s", "Start", "#debug", "Hidden"],
            &["verbose|v:+", "Verbose"],
        );
        let script = render("bash", "app", &usage, &fields).unwrap();
        assert!(script.contains("complete -o default -F _app app"));
        assert!(script.contains("serve"));
        assert!(!script.contains("debug"));
        assert!(script.contains("--verbose"));
        assert!(script.contains("-v"));
        assert!(script.contains("--help"));
    }

    #[test]
    fn test_bash_function_name_dashes() {
        let (usage, fields) = sets(&[], &[]);
        let script = render("bash", "my-app", &usage, &fields).unwrap();
        assert!(script.contains("_my_app() {"));
        assert!(script.contains("complete -o default -F _my_app my-app"));
    }

    #[test]
    fn test_zsh_compdef_and_describe() {
        let (usage, fields) = sets(&["serve", "Start the server"], &["port|p:~int", "Port"]);
        let script = render("zsh", "app", &usage, &fields).unwrap();
        assert!(script.starts_with("#compdef app\n"));
        assert!(script.contains("'serve:Start the server'"));
        assert!(script.contains("_arguments -s"));
        assert!(script.contains("_describe 'command' commands"));
        assert!(script.contains("\"-p\",\"--port\""));
    }

    #[test]
    fn test_zsh_escapes_quotes_in_descriptions() {
        let (usage, fields) = sets(&["run", "Don't panic"], &[]);
        let script = render("zsh", "app", &usage, &fields).unwrap();
        assert!(script.contains("'run:Don'\\''t panic'"));
    }

    #[test]
    fn test_fish_one_line_per_item() {
        let (usage, fields) = sets(&["serve", "Start"], &["out|o", "Output file"]);
        let script = render("fish", "app", &usage, &fields).unwrap();
        assert!(script.contains("complete -c app -n '__fish_use_subcommand' -a 'serve' -d 'Start'"));
        assert!(script.contains("complete -c app -l 'out' -s 'o' -r -d 'Output file'"));
        // Booleans take no value, so no -r.
        assert!(script.contains("complete -c app -l 'help' -s 'h' -d 'Show this help message'"));
    }

    #[test]
    fn test_unknown_shell() {
        let (usage, fields) = sets(&[], &[]);
        let err = render("tcsh", "app", &usage, &fields).unwrap_err();
        assert!(err.to_string().contains("unknown shell: tcsh"));
    }

    #[test]
    fn test_help_screen() {
        let text = render_help("app");
        assert!(text.contains("Usage: app completion <shell>"));
        assert!(text.contains("bash"));
        assert!(text.contains("zsh"));
        assert!(text.contains("fish"));
    }
}
