//! Tree-walking interpreter.
//!
//! The [`Interpreter`] borrows a [`Symbols`] environment for the length of a
//! call and evaluates a parsed [`Node`] tree against it through the
//! [`Visitor`] interface.  Every failure is reported as a [`RuntimeError`]
//! naming the node variant, token and offset it happened at.
//!
//! Evaluation is synchronous with no cancellation or timeout.  Tree depth is
//! bounded by the parser, but an each-loop runs over whatever its source
//! yields, so a huge or endless host iterable stalls the calling thread.
//! The symbol table is not synchronized; callers sharing one across threads
//! must serialize `interpret` calls themselves.

use std::cmp::Ordering;

use tracing::{debug, trace, warn};

use super::ast::{BinaryOp, Branch, EachLoop, Identifier, Literal, Node, Template, Terminal, UnaryOp, Visitor};
use super::error::{Error, RuntimeError};
use super::host::Class;
use super::parser::{parse_expression, parse_template};
use super::stdlib::builtin_class;
use super::symbols::Symbols;
use super::token::{Token, TokenKind};
use super::value::{FromValue, Value};

// ── ErrorMode ─────────────────────────────────────────────────────────────────

/// What happens when a template fragment fails at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Abort the whole render with the error.
    #[default]
    ThrowOnError,
    /// Write the error message in place of the failing top-level fragment
    /// and keep rendering.  Lexical and syntax errors still abort.
    SubstituteErrorText,
}

fn fail(node: &'static str, token: &Token, message: impl Into<String>) -> RuntimeError {
    RuntimeError {
        node,
        token: token.text.clone(),
        offset: token.offset,
        message: message.into(),
    }
}

// ── Interpreter ───────────────────────────────────────────────────────────────

pub struct Interpreter<'a> {
    symbols: &'a mut dyn Symbols,
}

impl<'a> Interpreter<'a> {
    pub fn new(symbols: &'a mut dyn Symbols) -> Self {
        Interpreter { symbols }
    }

    /// Parse and render a whole template.
    pub fn interpret(&mut self, template: &str, mode: ErrorMode) -> Result<String, Error> {
        let root = parse_template(template)?;
        debug!(
            len = template.len(),
            fragments = root.children().len(),
            ?mode,
            "rendering template"
        );
        self.render(&root, mode)
    }

    /// Parse and evaluate a single program body, converting the result.
    ///
    /// There is no fragment to substitute into, so runtime errors always
    /// propagate regardless of `mode`.
    pub fn interpret_expression<T: FromValue>(
        &mut self,
        expression: &str,
        mode: ErrorMode,
    ) -> Result<T, Error> {
        let root = parse_expression(expression)?;
        debug!(len = expression.len(), ?mode, "evaluating expression");
        let value = self.evaluate(&root)?;
        T::from_value(value).map_err(|msg| fail(root.kind_name(), root.token(), msg).into())
    }

    /// Render an already parsed tree.  Only the direct children of a
    /// [`Node::Template`] root are substitution boundaries.
    pub fn render(&mut self, root: &Node, mode: ErrorMode) -> Result<String, Error> {
        let Node::Template(template) = root else {
            return Ok(self.evaluate(root)?.to_string());
        };

        let mut out = String::new();
        for child in &template.children {
            match child.accept(self) {
                Ok(v) => out.push_str(&v.to_string()),
                Err(e) if mode == ErrorMode::SubstituteErrorText => {
                    warn!(error = %e, "substituting runtime error into output");
                    out.push_str(&e.to_string());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }

    /// Evaluate one node to a value.
    pub fn evaluate(&mut self, node: &Node) -> Result<Value, RuntimeError> {
        node.accept(self)
    }

    // ── Identifier resolution ─────────────────────────────────────────────────

    fn lookup(&self, id: &Identifier) -> Result<Value, RuntimeError> {
        self.symbols
            .get(id.name())
            .cloned()
            .ok_or_else(|| fail(id.kind_name(), &id.token, format!("'{}' is not defined", id.name())))
    }

    fn eval_args(&mut self, id: &Identifier) -> Result<Vec<Value>, RuntimeError> {
        id.args().iter().map(|arg| arg.accept(self)).collect()
    }

    /// Follow `.member` links starting from `head`'s value.
    fn walk_members(&mut self, mut current: Value, head: &Identifier) -> Result<Value, RuntimeError> {
        let mut next = head.member();
        while let Some(member) = next {
            current = self.member(current, member)?;
            next = member.member();
        }
        Ok(current)
    }

    fn member(&mut self, recv: Value, member: &Identifier) -> Result<Value, RuntimeError> {
        let err = |msg: String| fail(member.kind_name(), &member.token, msg);
        let name = member.name();

        let class: &Class = match &recv {
            Value::Null => return Err(err(format!("cannot read member '{name}' of null"))),
            Value::Object(o) => o.class(),
            other => builtin_class(other.kind())
                .ok_or_else(|| err(format!("{} values have no members", other.type_name())))?,
        };
        let Some(data) = recv.as_any() else {
            return Err(err(format!("{} values have no members", recv.type_name())));
        };

        if !member.is_call() {
            return match class.get_property(data, name) {
                Some(result) => result.map_err(err),
                None => Err(err(format!("{} has no property '{name}'", recv.type_name()))),
            };
        }

        let args = self.eval_args(member)?;

        // Fewest required parameters first; the first overload that can take
        // all supplied arguments wins and its trailing defaults fill the rest.
        let mut overloads: Vec<_> = class.overloads(name).collect();
        if overloads.is_empty() {
            return Err(err(format!("{} has no method '{name}'", recv.type_name())));
        }
        overloads.sort_by_key(|m| m.required_count());
        let method = overloads
            .into_iter()
            .find(|m| m.params.len() >= args.len())
            .ok_or_else(|| {
                err(format!(
                    "no overload of {}.{name} takes {} arguments",
                    recv.type_name(),
                    args.len()
                ))
            })?;

        trace!(
            class = class.name(),
            method = name,
            params = method.params.len(),
            supplied = args.len(),
            "resolved overload"
        );
        let bound = method.bind(&args).map_err(err)?;
        method.invoke(data, &bound).map_err(err)
    }

    // ── Operators ─────────────────────────────────────────────────────────────

    fn apply_binary(op: &Token, l: &Value, r: &Value) -> Result<Value, String> {
        let ordered = |want: fn(Ordering) -> bool| -> Result<Value, String> {
            let ord = l.script_cmp(r, &op.text)?;
            Ok(Value::Bool(ord.is_some_and(want)))
        };

        match op.kind {
            TokenKind::Plus => l.arith_add(r),
            TokenKind::Minus => l.arith_sub(r),
            TokenKind::Mul => l.arith_mul(r),
            TokenKind::Div => l.arith_div(r),
            TokenKind::Eq => l.script_eq(r).map(Value::Bool),
            TokenKind::Neq => l.script_eq(r).map(|eq| Value::Bool(!eq)),
            TokenKind::Gt => ordered(Ordering::is_gt),
            TokenKind::Lt => ordered(Ordering::is_lt),
            TokenKind::Gte => ordered(Ordering::is_ge),
            TokenKind::Lte => ordered(Ordering::is_le),
            TokenKind::And | TokenKind::Or => match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op.kind == TokenKind::And {
                    *a && *b
                } else {
                    *a || *b
                })),
                _ => Err(format!(
                    "operator '{}' requires boolean operands, got {} and {}",
                    op.text,
                    l.type_name(),
                    r.type_name()
                )),
            },
            other => Err(format!("{other:?} is not a binary operator")),
        }
    }

    fn iterable(&self, each: &EachLoop) -> Result<Vec<Value>, RuntimeError> {
        let err = |msg: String| fail("EachLoop", &each.token, msg);
        let name = &each.source().text;

        let source = self
            .symbols
            .get(name)
            .ok_or_else(|| err(format!("'{name}' is not defined")))?;

        match source {
            Value::List(items) => Ok(items.clone()),
            Value::Text(s) => Ok(s.chars().map(|c| Value::Text(c.to_string())).collect()),
            Value::Object(o) => match o.class().iterate(o.data()) {
                Some(items) => items.map_err(err),
                None => Err(err(format!("'{name}' ({}) is not iterable", source.type_name()))),
            },
            other => Err(err(format!("'{name}' ({}) is not iterable", other.type_name()))),
        }
    }
}

// ── Visitor ───────────────────────────────────────────────────────────────────

impl Visitor for Interpreter<'_> {
    type Output = Result<Value, RuntimeError>;

    fn visit_template(&mut self, node: &Template) -> Self::Output {
        let mut out = String::new();
        for child in &node.children {
            out.push_str(&child.accept(self)?.to_string());
        }
        Ok(Value::Text(out))
    }

    fn visit_terminal(&mut self, node: &Terminal) -> Self::Output {
        Ok(match &node.value {
            Literal::Int(n) => Value::Int(*n),
            Literal::Real(x) => Value::Real(*x),
            Literal::Text(s) => Value::Text(s.clone()),
            Literal::Bool(b) => Value::Bool(*b),
        })
    }

    fn visit_null(&mut self, _token: &Token) -> Self::Output {
        Ok(Value::Null)
    }

    fn visit_no_op(&mut self, _token: &Token) -> Self::Output {
        Ok(Value::Text(String::new()))
    }

    fn visit_identifier(&mut self, node: &Identifier) -> Self::Output {
        self.lookup(node)
    }

    fn visit_variable_access(&mut self, node: &Identifier) -> Self::Output {
        let head = self.lookup(node)?;
        self.walk_members(head, node)
    }

    fn visit_procedure_call(&mut self, node: &Identifier) -> Self::Output {
        let err = |msg: String| fail(node.kind_name(), &node.token, msg);
        let name = node.name();

        let Value::Procedure(procedure) = self.lookup(node)? else {
            return Err(err(format!("'{name}' is not a procedure")));
        };
        let args = self.eval_args(node)?;
        if !procedure.accepts(&args) {
            let kinds: Vec<String> = args.iter().map(|a| a.kind().to_string()).collect();
            let want: Vec<String> = procedure.params().iter().map(|k| k.to_string()).collect();
            return Err(err(format!(
                "{name}({}) cannot be called with ({})",
                want.join(", "),
                kinds.join(", ")
            )));
        }

        let result = procedure.call(&args).map_err(err)?;
        self.walk_members(result, node)
    }

    fn visit_binary_op(&mut self, node: &BinaryOp) -> Self::Output {
        let l = node.left.accept(self)?;
        let r = node.right.accept(self)?;
        Self::apply_binary(&node.op, &l, &r).map_err(|msg| fail("BinaryOperation", &node.op, msg))
    }

    fn visit_unary_op(&mut self, node: &UnaryOp) -> Self::Output {
        let v = node.operand.accept(self)?;
        let result = match node.op.kind {
            TokenKind::Minus => v.arith_neg(),
            TokenKind::Plus => v.arith_pos(),
            other => Err(format!("{other:?} is not a unary operator")),
        };
        result.map_err(|msg| fail("UnaryOperation", &node.op, msg))
    }

    fn visit_branch(&mut self, node: &Branch) -> Self::Output {
        match node.condition.accept(self)? {
            Value::Bool(true) => node.if_body.accept(self),
            Value::Bool(false) => node.else_body.accept(self),
            other => Err(fail(
                "Branch",
                node.condition.token(),
                format!("condition must be boolean, got {}", other.type_name()),
            )),
        }
    }

    /// The loop variable keeps its last value once the loop ends.
    fn visit_each_loop(&mut self, node: &EachLoop) -> Self::Output {
        let var = &node.variable().text;
        if self.symbols.has(var) {
            return Err(fail(
                "EachLoop",
                &node.token,
                format!("loop variable '{var}' is already defined"),
            ));
        }

        let items = self.iterable(node)?;
        let mut out = String::new();
        for item in items {
            self.symbols
                .set(var, item)
                .map_err(|e| fail("EachLoop", &node.token, e.to_string()))?;
            out.push_str(&node.body.accept(self)?.to_string());
        }
        Ok(Value::Text(out))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
