//! Host registration: explicit member tables for values exposed to scripts.
//!
//! A [`Class`] lists the named properties and method overloads a host type
//! offers.  It is built once per Rust type with [`Class::builder`], which
//! erases the receiver type behind `&dyn Any` so the interpreter can dispatch
//! by name without knowing the host type.
//!
//! ```ignore
//! let person = Class::builder::<Person>("Person")
//!     .property("Age", |p| p.age.into())
//!     .method("Greet", &[Param::optional(ValueKind::Text, "Hi")], |p, args| {
//!         Ok(format!("{} {}", args[0], p.name).into())
//!     })
//!     .build();
//! symbols.set("bob", person.wrap(bob))?;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::value::{Value, ValueKind};

type Getter = Arc<dyn Fn(&dyn Any) -> Result<Value, String> + Send + Sync>;
type Invoker = Arc<dyn Fn(&dyn Any, &[Value]) -> Result<Value, String> + Send + Sync>;
type Lister = Arc<dyn Fn(&dyn Any) -> Result<Vec<Value>, String> + Send + Sync>;
type Shower = Arc<dyn Fn(&dyn Any) -> Result<String, String> + Send + Sync>;
type Body = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

fn receiver<'a, T: Any>(recv: &'a dyn Any, class: &str) -> Result<&'a T, String> {
    recv.downcast_ref::<T>()
        .ok_or_else(|| format!("receiver is not a {class}"))
}

// ── Parameters ────────────────────────────────────────────────────────────────

/// One declared method parameter.  Optional parameters carry the value used
/// when the caller supplies fewer arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub kind: ValueKind,
    pub default: Option<Value>,
}

impl Param {
    pub fn required(kind: ValueKind) -> Self {
        Param { kind, default: None }
    }

    pub fn optional(kind: ValueKind, default: impl Into<Value>) -> Self {
        Param {
            kind,
            default: Some(default.into()),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some()
    }
}

/// One overload of a named method.
#[derive(Clone)]
pub struct Method {
    pub name: String,
    pub params: Vec<Param>,
    body: Invoker,
}

impl Method {
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.is_optional()).count()
    }

    /// Pad `args` with declared defaults and check each against its kind.
    /// Integers passed for real parameters are promoted.
    pub fn bind(&self, args: &[Value]) -> Result<Vec<Value>, String> {
        if args.len() > self.params.len() {
            return Err(format!(
                "{} takes at most {} arguments, got {}",
                self.name,
                self.params.len(),
                args.len()
            ));
        }

        let mut bound = Vec::with_capacity(self.params.len());
        for (i, param) in self.params.iter().enumerate() {
            let value = match (args.get(i), &param.default) {
                (Some(v), _) => v.clone(),
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    return Err(format!("{}: missing required argument {}", self.name, i + 1))
                }
            };
            if !param.kind.admits(value.kind()) {
                return Err(format!(
                    "{}: argument {} must be {}, got {}",
                    self.name,
                    i + 1,
                    param.kind,
                    value.type_name()
                ));
            }
            bound.push(match (param.kind, value) {
                (ValueKind::Real, Value::Int(n)) => Value::Real(n as f64),
                (_, v) => v,
            });
        }
        Ok(bound)
    }

    pub fn invoke(&self, recv: &dyn Any, args: &[Value]) -> Result<Value, String> {
        (self.body)(recv, args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ── Classes ───────────────────────────────────────────────────────────────────

/// Type-erased member table for one host type.
pub struct Class {
    name: String,
    properties: HashMap<String, Getter>,
    methods: Vec<Method>,
    iterate: Option<Lister>,
    display: Option<Shower>,
}

impl Class {
    pub fn builder<T: Any + Send + Sync>(name: impl Into<String>) -> ClassBuilder<T> {
        ClassBuilder {
            class: Class {
                name: name.into(),
                properties: HashMap::new(),
                methods: Vec::new(),
                iterate: None,
                display: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read property `name` from `recv`.  `None` if the class has no such
    /// property.
    pub fn get_property(&self, recv: &dyn Any, name: &str) -> Option<Result<Value, String>> {
        self.properties.get(name).map(|get| get(recv))
    }

    /// All overloads named `name`, in registration order.
    pub fn overloads<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Method> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn is_iterable(&self) -> bool {
        self.iterate.is_some()
    }

    pub fn iterate(&self, recv: &dyn Any) -> Option<Result<Vec<Value>, String>> {
        self.iterate.as_ref().map(|it| it(recv))
    }

    fn show(&self, recv: &dyn Any) -> Option<Result<String, String>> {
        self.display.as_ref().map(|show| show(recv))
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut props: Vec<_> = self.properties.keys().collect();
        props.sort();
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("properties", &props)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`Class::builder`].  Closures receive the host value
/// already downcast to `T`.
pub struct ClassBuilder<T> {
    class: Class,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    pub fn property<F>(mut self, name: impl Into<String>, get: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        self.class.properties.insert(
            name.into(),
            Arc::new(move |recv: &dyn Any| receiver::<T>(recv, &class).map(&get)),
        );
        self
    }

    pub fn method<F>(
        mut self,
        name: impl Into<String>,
        params: &[Param],
        body: F,
    ) -> Self
    where
        F: Fn(&T, &[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        self.class.methods.push(Method {
            name: name.into(),
            params: params.to_vec(),
            body: Arc::new(move |recv: &dyn Any, args: &[Value]| {
                body(receiver::<T>(recv, &class)?, args)
            }),
        });
        self
    }

    /// Make instances usable as each-loop sources.
    pub fn iterate<F>(mut self, items: F) -> Self
    where
        F: Fn(&T) -> Vec<Value> + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        self.class.iterate = Some(Arc::new(move |recv: &dyn Any| {
            receiver::<T>(recv, &class).map(&items)
        }));
        self
    }

    /// Rendering used when an instance is written into template output.
    /// Without it instances render as their class name.
    pub fn display<F>(mut self, show: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        let class = self.class.name.clone();
        self.class.display = Some(Arc::new(move |recv: &dyn Any| {
            receiver::<T>(recv, &class).map(&show)
        }));
        self
    }

    pub fn build(self) -> HostClass<T> {
        HostClass {
            class: Arc::new(self.class),
            _marker: PhantomData,
        }
    }
}

/// A built class that remembers its host type, so only matching data can be
/// wrapped into script objects.
pub struct HostClass<T> {
    class: Arc<Class>,
    _marker: PhantomData<fn(&T)>,
}

impl<T> Clone for HostClass<T> {
    fn clone(&self) -> Self {
        HostClass {
            class: Arc::clone(&self.class),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> HostClass<T> {
    pub fn object(&self, data: T) -> Object {
        Object {
            class: Arc::clone(&self.class),
            data: Arc::new(data),
        }
    }

    pub fn wrap(&self, data: T) -> Value {
        Value::Object(self.object(data))
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }
}

// ── Objects ───────────────────────────────────────────────────────────────────

/// Opaque handle to host data plus its member table.  Clones share the data.
#[derive(Clone)]
pub struct Object {
    class: Arc<Class>,
    data: Arc<dyn Any + Send + Sync>,
}

impl Object {
    pub fn class(&self) -> &Class {
        &self.class
    }

    pub fn data(&self) -> &dyn Any {
        &*self.data
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data().downcast_ref::<T>()
    }

    /// Identity comparison.
    pub fn same(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.class.name)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class.show(self.data()) {
            Some(Ok(s)) => f.write_str(&s),
            Some(Err(_)) | None => f.write_str(&self.class.name),
        }
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

// ── Procedures ────────────────────────────────────────────────────────────────

/// A bare callable bound to a name.  Called only with arguments whose kinds
/// match `params` exactly (`Any` matches everything).
#[derive(Clone)]
pub struct Procedure {
    name: String,
    params: Vec<ValueKind>,
    body: Body,
}

impl Procedure {
    pub fn new<F>(name: impl Into<String>, params: &[ValueKind], body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        Procedure {
            name: name.into(),
            params: params.to_vec(),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    pub fn accepts(&self, args: &[Value]) -> bool {
        args.len() == self.params.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(&kind, arg)| kind == ValueKind::Any || kind == arg.kind())
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.body)(args)
    }

    pub fn same(&self, other: &Procedure) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for Procedure {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl From<Procedure> for Value {
    fn from(p: Procedure) -> Self {
        Value::Procedure(p)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
