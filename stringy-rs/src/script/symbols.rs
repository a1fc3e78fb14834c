//! Variable environment.
//!
//! Each name's runtime type is fixed by the first non-null value bound to it;
//! rebinding to a value of another type fails.  Null may be bound to any
//! name.  The table is not synchronized: a host sharing one table between
//! threads must serialize renders itself.

use std::collections::HashMap;

use super::error::BindError;
use super::value::Value;

/// Name → value environment read and written by the interpreter.
pub trait Symbols {
    fn has(&self, name: &str) -> bool;

    fn get(&self, name: &str) -> Option<&Value>;

    fn set(&mut self, name: &str, value: Value) -> Result<(), BindError>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// Type name fixed at the first non-null bind.
    bound_type: Option<String>,
}

/// Default [`Symbols`] implementation backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    vars: HashMap<String, Entry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type a name is fixed to, if any.
    pub fn bound_type(&self, name: &str) -> Option<&str> {
        self.vars.get(name)?.bound_type.as_deref()
    }

    /// Iterate over all variables in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, e)| (k.as_str(), &e.value))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl Symbols for SymbolTable {
    fn has(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name).map(|e| &e.value)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), BindError> {
        let offered = (!value.is_null()).then(|| value.type_name().to_owned());

        match self.vars.get_mut(name) {
            Some(entry) => {
                if let (Some(bound), Some(offered)) = (&entry.bound_type, &offered) {
                    if bound != offered {
                        return Err(BindError::TypeMismatch {
                            name: name.to_owned(),
                            bound: bound.clone(),
                            offered: offered.clone(),
                        });
                    }
                }
                if entry.bound_type.is_none() {
                    entry.bound_type = offered;
                }
                entry.value = value;
            }
            None => {
                self.vars.insert(
                    name.to_owned(),
                    Entry {
                        value,
                        bound_type: offered,
                    },
                );
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut vars = SymbolTable::new();
        vars.set("n", Value::Int(1)).unwrap();
        assert!(vars.has("n"));
        assert_eq!(vars.get("n"), Some(&Value::Int(1)));
        assert_eq!(vars.bound_type("n"), Some("integer"));
    }

    #[test]
    fn rebind_same_type() {
        let mut vars = SymbolTable::new();
        vars.set("x", Value::from("old")).unwrap();
        vars.set("x", Value::from("new")).unwrap();
        assert_eq!(vars.get("x"), Some(&Value::from("new")));
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn rebind_other_type_fails() {
        let mut vars = SymbolTable::new();
        vars.set("x", Value::Int(1)).unwrap();
        let err = vars.set("x", Value::from("one")).unwrap_err();
        assert_eq!(
            err,
            BindError::TypeMismatch {
                name: "x".into(),
                bound: "integer".into(),
                offered: "text".into(),
            }
        );
        // The old value is untouched.
        assert_eq!(vars.get("x"), Some(&Value::Int(1)));
        // Reals and integers are distinct types.
        assert!(vars.set("x", Value::Real(1.0)).is_err());
    }

    #[test]
    fn null_binds_anywhere() {
        let mut vars = SymbolTable::new();
        vars.set("x", Value::Null).unwrap();
        assert_eq!(vars.bound_type("x"), None);
        vars.set("x", Value::Bool(true)).unwrap();
        assert_eq!(vars.bound_type("x"), Some("boolean"));
        vars.set("x", Value::Null).unwrap();
        assert!(vars.set("x", Value::Int(0)).is_err());
    }

    #[test]
    fn iter_and_empty() {
        let mut vars = SymbolTable::new();
        assert!(vars.is_empty());
        vars.set("a", Value::Int(1)).unwrap();
        vars.set("b", Value::Int(2)).unwrap();
        let mut names: Vec<_> = vars.iter().map(|(k, _)| k).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
