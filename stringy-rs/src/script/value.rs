//! Runtime value type for the template language.
//!
//! Values are dynamically typed.  Operators dispatch on the pair of operand
//! kinds with explicit promotion (integer + real → real); any combination not
//! listed is an error rather than an implicit coercion.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use super::host::{Object, Procedure};

/// Runtime type tag of a [`Value`].  `Any` only appears in parameter lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Real,
    Text,
    List,
    Object,
    Procedure,
    Any,
}

impl ValueKind {
    /// Whether a value of kind `actual` may be passed where `self` is declared.
    pub fn admits(self, actual: ValueKind) -> bool {
        match (self, actual) {
            (ValueKind::Any, _) => true,
            (ValueKind::Real, ValueKind::Int) => true,
            (ValueKind::Text | ValueKind::List | ValueKind::Object | ValueKind::Procedure, ValueKind::Null) => true,
            (declared, actual) => declared == actual,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Real => "real",
            ValueKind::Text => "text",
            ValueKind::List => "list",
            ValueKind::Object => "object",
            ValueKind::Procedure => "procedure",
            ValueKind::Any => "any",
        };
        f.write_str(name)
    }
}

/// A script runtime value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
    List(Vec<Value>),
    Object(Object),
    Procedure(Procedure),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            // Shortest round-trip form: `0.1`, `3`, `2.5`.
            Value::Real(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Object(o) => write!(f, "{o}"),
            Value::Procedure(p) => write!(f, "{}()", p.name()),
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Real(_) => ValueKind::Real,
            Value::Text(_) => ValueKind::Text,
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
            Value::Procedure(_) => ValueKind::Procedure,
        }
    }

    /// Runtime type name.  Objects report their class name, so two objects of
    /// different host classes are different types.
    pub fn type_name(&self) -> &str {
        match self {
            Value::Object(o) => o.class().name(),
            other => match other.kind() {
                ValueKind::Null => "null",
                ValueKind::Bool => "boolean",
                ValueKind::Int => "integer",
                ValueKind::Real => "real",
                ValueKind::Text => "text",
                ValueKind::List => "list",
                _ => "procedure",
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the payload as `&dyn Any` so host closures can downcast it.
    /// Primitives expose their Rust representation (`i64`, `f64`, `bool`,
    /// `String`, `Vec<Value>`); objects expose their host data.
    pub fn as_any(&self) -> Option<&dyn Any> {
        let any: &dyn Any = match self {
            Value::Bool(b) => b,
            Value::Int(n) => n,
            Value::Real(x) => x,
            Value::Text(s) => s,
            Value::List(items) => items,
            Value::Object(o) => o.data(),
            Value::Null | Value::Procedure(_) => return None,
        };
        Some(any)
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any()?.downcast_ref::<T>()
    }

    fn unsupported(&self, op: &str, rhs: &Value) -> String {
        format!(
            "operator '{op}' cannot be applied to {} and {}",
            self.type_name(),
            rhs.type_name()
        )
    }

    // ── Arithmetic helpers ────────────────────────────────────────────────────

    /// Numeric operands promoted to a common representation.
    fn numeric_pair(&self, rhs: &Value) -> Option<Numeric> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => Some(Numeric::Int(*a, *b)),
            (Value::Int(a), Value::Real(b)) => Some(Numeric::Real(*a as f64, *b)),
            (Value::Real(a), Value::Int(b)) => Some(Numeric::Real(*a, *b as f64)),
            (Value::Real(a), Value::Real(b)) => Some(Numeric::Real(*a, *b)),
            _ => None,
        }
    }

    /// `+` adds numbers and concatenates when either side is text.
    pub fn arith_add(&self, rhs: &Value) -> Result<Value, String> {
        match self.numeric_pair(rhs) {
            Some(Numeric::Int(a, b)) => Ok(Value::Int(a.wrapping_add(b))),
            Some(Numeric::Real(a, b)) => Ok(Value::Real(a + b)),
            None if matches!(self, Value::Text(_)) || matches!(rhs, Value::Text(_)) => {
                Ok(Value::Text(format!("{self}{rhs}")))
            }
            None => Err(self.unsupported("+", rhs)),
        }
    }

    pub fn arith_sub(&self, rhs: &Value) -> Result<Value, String> {
        match self.numeric_pair(rhs) {
            Some(Numeric::Int(a, b)) => Ok(Value::Int(a.wrapping_sub(b))),
            Some(Numeric::Real(a, b)) => Ok(Value::Real(a - b)),
            None => Err(self.unsupported("-", rhs)),
        }
    }

    pub fn arith_mul(&self, rhs: &Value) -> Result<Value, String> {
        match self.numeric_pair(rhs) {
            Some(Numeric::Int(a, b)) => Ok(Value::Int(a.wrapping_mul(b))),
            Some(Numeric::Real(a, b)) => Ok(Value::Real(a * b)),
            None => Err(self.unsupported("*", rhs)),
        }
    }

    /// Integer division truncates toward zero; real division follows IEEE.
    pub fn arith_div(&self, rhs: &Value) -> Result<Value, String> {
        match self.numeric_pair(rhs) {
            Some(Numeric::Int(_, 0)) => Err("integer division by zero".into()),
            Some(Numeric::Int(a, b)) => Ok(Value::Int(a.wrapping_div(b))),
            Some(Numeric::Real(a, b)) => Ok(Value::Real(a / b)),
            None => Err(self.unsupported("/", rhs)),
        }
    }

    pub fn arith_neg(&self) -> Result<Value, String> {
        match self {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Real(x) => Ok(Value::Real(-x)),
            other => Err(format!("unary '-' cannot be applied to {}", other.type_name())),
        }
    }

    pub fn arith_pos(&self) -> Result<Value, String> {
        match self {
            Value::Int(_) | Value::Real(_) => Ok(self.clone()),
            other => Err(format!("unary '+' cannot be applied to {}", other.type_name())),
        }
    }

    // ── Comparison helpers ────────────────────────────────────────────────────

    /// Script-level equality.  Null equals only null; numbers compare across
    /// integer/real; objects and procedures compare by identity.  Any other
    /// kind mismatch is an error.
    pub fn script_eq(&self, rhs: &Value) -> Result<bool, String> {
        if let Some(pair) = self.numeric_pair(rhs) {
            return Ok(match pair {
                Numeric::Int(a, b) => a == b,
                Numeric::Real(a, b) => a == b,
            });
        }
        match (self, rhs) {
            (Value::Null, other) | (other, Value::Null) => Ok(other.is_null()),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::Text(a), Value::Text(b)) => Ok(a == b),
            (Value::List(a), Value::List(b)) => Ok(a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| x.script_eq(y).unwrap_or(false))),
            (Value::Object(a), Value::Object(b)) => Ok(a.same(b)),
            (Value::Procedure(a), Value::Procedure(b)) => Ok(a.same(b)),
            _ => Err(self.unsupported("=", rhs)),
        }
    }

    /// Ordering is defined for numbers only.  `None` means unordered (NaN).
    pub fn script_cmp(&self, rhs: &Value, op: &str) -> Result<Option<Ordering>, String> {
        match self.numeric_pair(rhs) {
            Some(Numeric::Int(a, b)) => Ok(Some(a.cmp(&b))),
            Some(Numeric::Real(a, b)) => Ok(a.partial_cmp(&b)),
            None => Err(self.unsupported(op, rhs)),
        }
    }
}

enum Numeric {
    Int(i64, i64),
    Real(f64, f64),
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Conversion out of a runtime value, used for typed expression results.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

fn cannot_convert(value: &Value, target: &str) -> String {
    format!("cannot convert {} value '{value}' to {target}", value.type_name())
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(cannot_convert(&other, "i64")),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(n) => i32::try_from(n).map_err(|_| cannot_convert(&value, "i32")),
            other => Err(cannot_convert(&other, "i32")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Real(x) => Ok(x),
            Value::Int(n) => Ok(n as f64),
            other => Err(cannot_convert(&other, "f64")),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(cannot_convert(&other, "bool")),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
