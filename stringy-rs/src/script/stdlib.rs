//! Built-in member tables and the `Text` helper object.
//!
//! Primitive values get their members from the classes here, looked up by
//! [`builtin_class`].  The `Text` object is an ordinary host object that
//! [`Stringy::new`](crate::Stringy::new) binds under the name `Text`.

use std::sync::OnceLock;

use regex::Regex;

use super::host::{Class, HostClass, Param};
use super::value::{Value, ValueKind};

struct Builtins {
    text: HostClass<String>,
    int: HostClass<i64>,
    real: HostClass<f64>,
    boolean: HostClass<bool>,
    list: HostClass<Vec<Value>>,
}

static BUILTINS: OnceLock<Builtins> = OnceLock::new();

/// Member table for a primitive value kind.
pub fn builtin_class(kind: ValueKind) -> Option<&'static Class> {
    let b = BUILTINS.get_or_init(|| Builtins {
        text: text_class(),
        int: scalar_class::<i64>("integer"),
        real: scalar_class::<f64>("real"),
        boolean: scalar_class::<bool>("boolean"),
        list: list_class(),
    });
    let class = match kind {
        ValueKind::Text => b.text.class(),
        ValueKind::Int => b.int.class(),
        ValueKind::Real => b.real.class(),
        ValueKind::Bool => b.boolean.class(),
        ValueKind::List => b.list.class(),
        _ => return None,
    };
    Some(class.as_ref())
}

/// `Equals` never fails: values of unrelated kinds are simply unequal.
fn equals(recv: Value, other: &Value) -> Value {
    Value::Bool(recv.script_eq(other).unwrap_or(false))
}

// ── Text ──────────────────────────────────────────────────────────────────────

fn text_class() -> HostClass<String> {
    use ValueKind::{Any, Int, Text};

    Class::builder::<String>("text")
        .property("Length", |s| Value::Int(s.chars().count() as i64))
        .method("ToLower", &[], |s, _| Ok(s.to_lowercase().into()))
        .method("ToUpper", &[], |s, _| Ok(s.to_uppercase().into()))
        .method("Trim", &[], |s, _| Ok(s.trim().into()))
        .method("StartsWith", &[Param::required(Text)], |s, args| {
            Ok(s.starts_with(text(args, 0, "StartsWith")?).into())
        })
        .method("EndsWith", &[Param::required(Text)], |s, args| {
            Ok(s.ends_with(text(args, 0, "EndsWith")?).into())
        })
        .method("Contains", &[Param::required(Text)], |s, args| {
            Ok(s.contains(text(args, 0, "Contains")?).into())
        })
        .method(
            "Replace",
            &[Param::required(Text), Param::required(Text)],
            |s, args| {
                let from = text(args, 0, "Replace")?;
                if from.is_empty() {
                    return Err("Replace: search text must not be empty".into());
                }
                Ok(s.replace(from, text(args, 1, "Replace")?).into())
            },
        )
        .method(
            "Substring",
            &[Param::required(Int), Param::optional(Int, -1)],
            |s, args| substring(s, int(args, 0, "Substring")?, int(args, 1, "Substring")?),
        )
        .method("Equals", &[Param::required(Any)], |s, args| {
            Ok(equals(Value::Text(s.clone()), &args[0]))
        })
        .method("ToString", &[], |s, _| Ok(Value::Text(s.clone())))
        .build()
}

/// Char-based substring.  A negative length means "to the end".
fn substring(s: &str, start: i64, len: i64) -> Result<Value, String> {
    let total = s.chars().count();
    let start = usize::try_from(start)
        .ok()
        .filter(|&i| i <= total)
        .ok_or_else(|| format!("Substring: start {start} is outside 0..={total}"))?;
    let take = if len < 0 {
        total - start
    } else {
        usize::try_from(len)
            .ok()
            .filter(|&n| start + n <= total)
            .ok_or_else(|| format!("Substring: length {len} runs past the end"))?
    };
    Ok(Value::Text(s.chars().skip(start).take(take).collect()))
}

// ── Scalars and lists ─────────────────────────────────────────────────────────

fn scalar_class<T>(name: &str) -> HostClass<T>
where
    T: Copy + Into<Value> + Send + Sync + 'static,
{
    Class::builder::<T>(name)
        .method("Equals", &[Param::required(ValueKind::Any)], |x, args| {
            Ok(equals((*x).into(), &args[0]))
        })
        .method("ToString", &[], |x, _| {
            let v: Value = (*x).into();
            Ok(Value::Text(v.to_string()))
        })
        .build()
}

fn list_class() -> HostClass<Vec<Value>> {
    Class::builder::<Vec<Value>>("list")
        .property("Count", |items| Value::Int(items.len() as i64))
        .method("Contains", &[Param::required(ValueKind::Any)], |items, args| {
            let found = items
                .iter()
                .any(|item| item.script_eq(&args[0]).unwrap_or(false));
            Ok(found.into())
        })
        .method("Equals", &[Param::required(ValueKind::Any)], |items, args| {
            Ok(equals(Value::List(items.clone()), &args[0]))
        })
        .iterate(|items| items.clone())
        .build()
}

// ── Text helper object ────────────────────────────────────────────────────────

/// Data behind the script-visible `Text` object.
#[derive(Debug, Default)]
pub struct TextLib;

/// Build the `Text` helper object: `Capitalize`, `Enumerate`, `Matches`.
pub fn text_lib() -> Value {
    use ValueKind::{Bool, List, Text};

    Class::builder::<TextLib>("Text")
        .method(
            "Capitalize",
            &[Param::required(Text), Param::optional(Bool, false)],
            |_, args| {
                let Value::Text(s) = &args[0] else {
                    return Ok(Value::Null);
                };
                let uc_first = matches!(args[1], Value::Bool(true));
                Ok(capitalize(s, uc_first).into())
            },
        )
        .method("Enumerate", &[Param::required(List)], |_, args| {
            Ok(match &args[0] {
                Value::List(items) => enumerate(items).into(),
                _ => Value::Null,
            })
        })
        .method(
            "Matches",
            &[Param::required(Text), Param::required(Text)],
            |_, args| {
                let re = Regex::new(text(args, 1, "Matches")?)
                    .map_err(|e| format!("Matches: invalid pattern: {e}"))?;
                Ok(re.is_match(text(args, 0, "Matches")?).into())
            },
        )
        .build()
        .wrap(TextLib)
}

/// Upper-case everything, or only the first char (rest lower-cased).
pub fn capitalize(s: &str, uc_first: bool) -> String {
    if !uc_first {
        return s.to_uppercase();
    }
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

/// `a`, `a and b`, `a, b and c`.  `None` for an empty list.
pub fn enumerate(items: &[Value]) -> Option<String> {
    let (last, init) = items.split_last()?;
    if init.is_empty() {
        return Some(last.to_string());
    }
    let head: Vec<String> = init.iter().map(Value::to_string).collect();
    Some(format!("{} and {last}", head.join(", ")))
}

// ── Argument accessors ────────────────────────────────────────────────────────

fn text<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a str, String> {
    match args.get(idx) {
        Some(Value::Text(s)) => Ok(s),
        Some(other) => Err(format!(
            "{name}: argument {} must be text, got {}",
            idx + 1,
            other.type_name()
        )),
        None => Err(format!("{name}: argument {} missing", idx + 1)),
    }
}

fn int(args: &[Value], idx: usize, name: &str) -> Result<i64, String> {
    match args.get(idx) {
        Some(Value::Int(n)) => Ok(*n),
        _ => Err(format!("{name}: argument {} must be an integer", idx + 1)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
