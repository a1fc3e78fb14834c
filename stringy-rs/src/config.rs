//! Variables file parser.
//!
//! Pre-binds symbols before a render, one assignment per line:
//!
//! | Line | Action |
//! |------|--------|
//! | `name=value` | bind `name` to the literal `value` |
//! | Lines starting with `;` or `#` | comment, ignored |
//! | Blank lines | ignored |
//!
//! Values are typed by their literal form:
//!
//! | Form | Value |
//! |------|-------|
//! | `42`, `-7` | integer |
//! | `2.5`, `1e3` | real |
//! | `true`, `false` | boolean |
//! | `null` | null |
//! | `'quoted text'` | text (`\'` escapes a quote) |
//! | `[1, 'a', b]` | list of the above (no nesting) |
//! | anything else | text, verbatim |
//!
//! Bad lines are reported and skipped; the rest of the file still loads.

use std::path::Path;

use crate::script::{SymbolTable, Symbols, Value};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a variables file.
#[derive(Debug)]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Symbols loaded from a variables file.
#[derive(Debug, Default)]
pub struct Config {
    pub vars: SymbolTable,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a variables file from a string.
    ///
    /// Returns the config and a list of any errors on individual lines.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if let Err(message) = config.define(line) {
                errors.push(ConfigError {
                    line: i + 1,
                    message,
                });
            }
        }

        (config, errors)
    }

    /// Read and parse a variables file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Apply one `name=value` assignment.
    pub fn define(&mut self, assignment: &str) -> Result<(), String> {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{assignment}'"))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(format!("'{name}' is not a valid variable name"));
        }
        let value = parse_value(raw.trim())?;
        self.vars.set(name, value).map_err(|e| e.to_string())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

// ── Literal values ────────────────────────────────────────────────────────────

/// Parse the right-hand side of an assignment.
pub fn parse_value(s: &str) -> Result<Value, String> {
    match s.strip_prefix('[') {
        Some(rest) => {
            let inner = rest
                .strip_suffix(']')
                .ok_or_else(|| format!("unterminated list '{s}'"))?;
            split_items(inner)?
                .iter()
                .map(|item| {
                    if item.starts_with('[') {
                        Err("nested lists are not supported".to_owned())
                    } else {
                        parse_scalar(item)
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        None => parse_scalar(s),
    }
}

fn parse_scalar(s: &str) -> Result<Value, String> {
    if let Some(rest) = s.strip_prefix('\'') {
        return unquote(rest).ok_or_else(|| format!("unterminated quoted text {s}"));
    }
    Ok(match s {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match (s.parse::<i64>(), s.parse::<f64>()) {
            (Ok(n), _) => Value::Int(n),
            // `inf` and `NaN` parse as reals but stay text here.
            (_, Ok(x)) if s.chars().any(|c| c.is_ascii_digit()) => Value::Real(x),
            _ => Value::Text(s.to_owned()),
        },
    })
}

/// Body of a `'…'` literal (opening quote already stripped).  `None` unless
/// the closing quote is the last character.
fn unquote(rest: &str) -> Option<Value> {
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.as_str().starts_with('\'') => {
                out.push('\'');
                chars.next();
            }
            '\'' => return chars.as_str().is_empty().then_some(Value::Text(out)),
            c => out.push(c),
        }
    }
    None
}

/// Split list items on commas outside single quotes.
fn split_items(s: &str) -> Result<Vec<String>, String> {
    if s.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if in_quotes => {
                cur.push(ch);
                if let Some(escaped) = chars.next() {
                    cur.push(escaped);
                }
            }
            '\'' => {
                in_quotes = !in_quotes;
                cur.push(ch);
            }
            ',' if !in_quotes => items.push(std::mem::take(&mut cur).trim().to_owned()),
            c => cur.push(c),
        }
    }
    if in_quotes {
        return Err(format!("unterminated quoted text in list [{s}]"));
    }
    items.push(cur.trim().to_owned());
    Ok(items)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_forms() {
        assert_eq!(parse_value("42"), Ok(Value::Int(42)));
        assert_eq!(parse_value("-7"), Ok(Value::Int(-7)));
        assert_eq!(parse_value("2.5"), Ok(Value::Real(2.5)));
        assert_eq!(parse_value("true"), Ok(Value::Bool(true)));
        assert_eq!(parse_value("null"), Ok(Value::Null));
        assert_eq!(parse_value("hello world"), Ok(Value::from("hello world")));
        assert_eq!(parse_value("inf"), Ok(Value::from("inf")));
        assert_eq!(parse_value(""), Ok(Value::from("")));
    }

    #[test]
    fn quoted_text() {
        assert_eq!(parse_value("'42'"), Ok(Value::from("42")));
        assert_eq!(parse_value(r"'it\'s'"), Ok(Value::from("it's")));
        assert!(parse_value("'open").is_err());
        assert!(parse_value("'a' b").is_err());
    }

    #[test]
    fn lists() {
        assert_eq!(parse_value("[1, 2, 3]"), Ok(Value::from(vec![1, 2, 3])));
        assert_eq!(
            parse_value("['Tom, Jr.', Jerry]"),
            Ok(Value::from(vec!["Tom, Jr.", "Jerry"]))
        );
        assert_eq!(parse_value("[]"), Ok(Value::List(Vec::new())));
        assert!(parse_value("[1, 2").is_err());
        assert!(parse_value("[[1]]").is_err());
        assert!(parse_value("['a, b]").is_err());
    }

    #[test]
    fn assignments() {
        let (config, errors) = Config::load_str("name=World\ncount = 3\n");
        assert!(errors.is_empty());
        assert_eq!(config.vars.get("name"), Some(&Value::from("World")));
        assert_eq!(config.vars.get("count"), Some(&Value::Int(3)));
    }

    #[test]
    fn value_may_contain_equals() {
        let (config, _) = Config::load_str("eq=a=b");
        assert_eq!(config.vars.get("eq"), Some(&Value::from("a=b")));
    }

    #[test]
    fn comments_and_blank_lines_ignored() {
        let src = "; comment\n# also a comment\n\n   \nx=1\n";
        let (config, errors) = Config::load_str(src);
        assert!(errors.is_empty());
        assert_eq!(config.vars.len(), 1);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let src = "ok=1\nno equals here\n9lives=1\nok='text'\nlast=true\n";
        let (config, errors) = Config::load_str(src);
        let lines: Vec<usize> = errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![2, 3, 4]);
        assert!(errors[2].message.contains("cannot store"));
        assert_eq!(config.vars.get("ok"), Some(&Value::Int(1)));
        assert_eq!(config.vars.get("last"), Some(&Value::Bool(true)));
    }

    #[test]
    fn error_display() {
        let e = ConfigError {
            line: 4,
            message: "boom".into(),
        };
        assert_eq!(e.to_string(), "line 4: boom");
    }

    #[test]
    fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vars");
        std::fs::write(&path, "names=[Bugs Bunny, Tom, Jerry]\n").unwrap();
        let (config, errors) = Config::load_file(&path).unwrap();
        assert!(errors.is_empty());
        assert_eq!(
            config.vars.get("names"),
            Some(&Value::from(vec!["Bugs Bunny", "Tom", "Jerry"]))
        );
        assert!(Config::load_file(&dir.path().join("missing")).is_err());
    }
}
