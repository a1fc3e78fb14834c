//! Command-line argument parsing.
//!
//! Usage:
//!   stringy [-d] [-s] [-t] [-f[<file>]] [-Dname=value]... [-e<expr>] [<template>]
//!
//! With no `<template>` and no `-e`, the template is read from stdin.

use std::path::PathBuf;

use directories::ProjectDirs;

// ── Public types ──────────────────────────────────────────────────────────────

/// Parsed command-line arguments.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Debug logging (`-d`).
    pub debug: bool,
    /// Substitute runtime errors into the output instead of failing (`-s`).
    pub substitute: bool,
    /// Print the parsed tree instead of rendering (`-t`).
    pub tree: bool,
    /// Which variables file to load.
    pub vars: VarsFile,
    /// `-Dname=value` assignments, applied after the variables file.
    pub defines: Vec<String>,
    /// Single expression to evaluate (`-e<expr>`).
    pub expression: Option<String>,
    /// Template given on the command line.
    pub template: Option<String>,
}

/// How to choose the variables file.
#[derive(Debug, Default)]
pub enum VarsFile {
    /// Search the default locations (see [`find_vars_file`]).
    #[default]
    Search,
    /// `-f` with no file argument: load no variables file.
    Skip,
    /// `-f<file>`: load this specific file.
    Explicit(PathBuf),
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()` and return [`CliArgs`] or an error message.
pub fn parse_args() -> Result<CliArgs, String> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings (exposed for testing).
pub fn parse_argv(argv: &[String]) -> Result<CliArgs, String> {
    let mut args = CliArgs::default();
    let mut positional: Vec<String> = Vec::new();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();

        // `--` ends flag processing.
        if arg == "--" {
            positional.extend(argv[i + 1..].iter().cloned());
            break;
        }

        // Non-flag argument.
        if !arg.starts_with('-') || arg == "-" {
            positional.push(arg.to_owned());
            i += 1;
            continue;
        }

        let chars: Vec<char> = arg[1..].chars().collect();
        let mut j = 0;
        while j < chars.len() {
            match chars[j] {
                'd' => args.debug = true,
                's' => args.substitute = true,
                't' => args.tree = true,

                // -f[<file>]
                'f' => {
                    if j + 1 < chars.len() {
                        let file: String = chars[j + 1..].iter().collect();
                        args.vars = VarsFile::Explicit(PathBuf::from(file));
                        j = chars.len();
                    } else if i + 1 < argv.len() && !argv[i + 1].starts_with('-') {
                        i += 1;
                        args.vars = VarsFile::Explicit(PathBuf::from(&argv[i]));
                    } else {
                        args.vars = VarsFile::Skip;
                    }
                }

                // -Dname=value and -e<expr> take the rest of the argument,
                // or the next one.
                flag @ ('D' | 'e') => {
                    let value = if j + 1 < chars.len() {
                        let s: String = chars[j + 1..].iter().collect();
                        j = chars.len();
                        s
                    } else if i + 1 < argv.len() {
                        i += 1;
                        argv[i].clone()
                    } else {
                        return Err(format!("-{flag} requires an argument"));
                    };
                    if flag == 'D' {
                        args.defines.push(value);
                    } else {
                        args.expression = Some(value);
                    }
                }

                c => return Err(format!("unknown option: -{c}")),
            }
            j += 1;
        }
        i += 1;
    }

    match positional.len() {
        0 => {}
        1 => args.template = positional.pop(),
        n => return Err(format!("too many arguments ({n})")),
    }
    if args.expression.is_some() && args.template.is_some() {
        return Err("-e cannot be combined with a template argument".to_owned());
    }

    Ok(args)
}

// ── Path helpers ──────────────────────────────────────────────────────────────

/// Candidate variables files in search order: `$HOME/.stringyrc`, the
/// platform config directory's `vars`, then `./.stringyrc`.
pub fn vars_file_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".stringyrc"));
    }
    if let Some(dirs) = ProjectDirs::from("", "", "stringy") {
        paths.push(dirs.config_dir().join("vars"));
    }
    paths.push(PathBuf::from("./.stringyrc"));
    paths
}

/// Search for the variables file in the standard locations.
/// Returns the first path that exists, or `None`.
pub fn find_vars_file() -> Option<PathBuf> {
    vars_file_candidates().into_iter().find(|p| p.exists())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn empty_args() {
        let a = parse_argv(&argv(&[])).unwrap();
        assert!(!a.debug && !a.substitute && !a.tree);
        assert!(matches!(a.vars, VarsFile::Search));
        assert!(a.template.is_none() && a.expression.is_none());
    }

    #[test]
    fn template_positional() {
        let a = parse_argv(&argv(&["Hello {name}"])).unwrap();
        assert_eq!(a.template.as_deref(), Some("Hello {name}"));
    }

    #[test]
    fn bool_flags() {
        let a = parse_argv(&argv(&["-d", "-s", "-t"])).unwrap();
        assert!(a.debug && a.substitute && a.tree);
    }

    #[test]
    fn combined_bool_flags() {
        let a = parse_argv(&argv(&["-dst"])).unwrap();
        assert!(a.debug && a.substitute && a.tree);
    }

    #[test]
    fn vars_skip() {
        let a = parse_argv(&argv(&["-f"])).unwrap();
        assert!(matches!(a.vars, VarsFile::Skip));
    }

    #[test]
    fn vars_explicit_embedded() {
        let a = parse_argv(&argv(&["-fmy.vars"])).unwrap();
        assert!(matches!(&a.vars, VarsFile::Explicit(p) if p == &PathBuf::from("my.vars")));
    }

    #[test]
    fn vars_explicit_separate() {
        let a = parse_argv(&argv(&["-f", "my.vars", "{x}"])).unwrap();
        assert!(matches!(&a.vars, VarsFile::Explicit(p) if p == &PathBuf::from("my.vars")));
        assert_eq!(a.template.as_deref(), Some("{x}"));
    }

    #[test]
    fn defines_accumulate() {
        let a = parse_argv(&argv(&["-Dx=1", "-D", "y='two'"])).unwrap();
        assert_eq!(a.defines, vec!["x=1", "y='two'"]);
    }

    #[test]
    fn expression_embedded_and_separate() {
        let a = parse_argv(&argv(&["-e1 + 2"])).unwrap();
        assert_eq!(a.expression.as_deref(), Some("1 + 2"));
        let a = parse_argv(&argv(&["-e", "a == b"])).unwrap();
        assert_eq!(a.expression.as_deref(), Some("a == b"));
    }

    #[test]
    fn missing_flag_argument() {
        assert!(parse_argv(&argv(&["-e"])).is_err());
        assert!(parse_argv(&argv(&["-D"])).is_err());
    }

    #[test]
    fn double_dash_ends_flags() {
        let a = parse_argv(&argv(&["--", "-not a flag"])).unwrap();
        assert_eq!(a.template.as_deref(), Some("-not a flag"));
    }

    #[test]
    fn expression_and_template_conflict() {
        assert!(parse_argv(&argv(&["-e1", "{2}"])).is_err());
    }

    #[test]
    fn too_many_positional() {
        assert!(parse_argv(&argv(&["a", "b"])).is_err());
    }

    #[test]
    fn unknown_flag() {
        assert!(parse_argv(&argv(&["-z"])).is_err());
    }

    #[test]
    fn search_order_ends_in_cwd() {
        let paths = vars_file_candidates();
        assert_eq!(paths.last(), Some(&PathBuf::from("./.stringyrc")));
    }
}
