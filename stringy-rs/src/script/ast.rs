//! Abstract syntax tree.
//!
//! [`Node`] is a closed sum over every construct the parser can produce.
//! Each node exposes its source [`Token`] and its ordered [`children`]
//! (exactly its semantic operands) for generic traversal and printing;
//! evaluation goes through [`Node::accept`] and a [`Visitor`].
//!
//! Derived equality compares tokens by kind and text only, so two parses of
//! the same input compare equal regardless of where they came from.
//!
//! [`children`]: Node::children

use std::fmt;

use super::token::Token;

/// A literal value carried by a [`Terminal`] node.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Root of every template parse: literal text and program sections.
    Template(Template),
    Terminal(Terminal),
    /// The `null` literal.
    Null(Token),
    /// Produces empty output; the implicit else-branch of a ternary.
    NoOp(Token),
    Identifier(Identifier),
    BinaryOp(BinaryOp),
    UnaryOp(UnaryOp),
    Branch(Branch),
    EachLoop(EachLoop),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub token: Token,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Terminal {
    pub token: Token,
    pub value: Literal,
}

/// What an [`Identifier`] names.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentKind {
    /// A bare name with no evaluation role of its own (each-loop operands).
    Plain,
    /// `name` — read a variable or a property.
    VariableAccess,
    /// `name(args…)` — invoke a procedure or a method.
    ProcedureCall(Vec<Node>),
}

/// `name`, `name(args)`, optionally followed by a `.member` chain.
///
/// The member, when present, is always another identifier; the field is
/// private so that invariant holds by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub kind: IdentKind,
    member: Option<Box<Node>>,
}

impl Identifier {
    pub fn plain(token: Token) -> Self {
        Identifier {
            token,
            kind: IdentKind::Plain,
            member: None,
        }
    }

    pub fn variable(token: Token) -> Self {
        Identifier {
            token,
            kind: IdentKind::VariableAccess,
            member: None,
        }
    }

    pub fn call(token: Token, args: Vec<Node>) -> Self {
        Identifier {
            token,
            kind: IdentKind::ProcedureCall(args),
            member: None,
        }
    }

    /// Attach the next link of a member chain (`self.member`).
    pub fn with_member(mut self, member: Identifier) -> Self {
        self.member = Some(Box::new(Node::Identifier(member)));
        self
    }

    pub fn name(&self) -> &str {
        &self.token.text
    }

    /// Call arguments; empty for non-call identifiers.
    pub fn args(&self) -> &[Node] {
        match &self.kind {
            IdentKind::ProcedureCall(args) => args,
            _ => &[],
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, IdentKind::ProcedureCall(_))
    }

    pub fn member(&self) -> Option<&Identifier> {
        match self.member.as_deref() {
            Some(Node::Identifier(id)) => Some(id),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            IdentKind::Plain => "Identifier",
            IdentKind::VariableAccess => "VariableAccess",
            IdentKind::ProcedureCall(_) => "ProcedureCall",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub op: Token,
    pub left: Box<Node>,
    pub right: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOp {
    pub op: Token,
    pub operand: Box<Node>,
}

/// `condition ? if_body [: else_body]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Box<Node>,
    pub if_body: Box<Node>,
    /// [`Node::NoOp`] when the source omitted the `:` branch.
    pub else_body: Box<Node>,
}

impl Branch {
    pub fn new(condition: Node, if_body: Node, else_body: Option<Node>) -> Self {
        let else_body = else_body.unwrap_or_else(|| Node::NoOp(condition.token().clone()));
        Branch {
            condition: Box::new(condition),
            if_body: Box::new(if_body),
            else_body: Box::new(else_body),
        }
    }
}

/// `each variable in source ? body`.
#[derive(Debug, Clone, PartialEq)]
pub struct EachLoop {
    pub token: Token,
    variable: Box<Node>,
    source: Box<Node>,
    pub body: Box<Node>,
}

impl EachLoop {
    pub fn new(token: Token, variable: Identifier, source: Identifier, body: Node) -> Self {
        EachLoop {
            token,
            variable: Box::new(Node::Identifier(variable)),
            source: Box::new(Node::Identifier(source)),
            body: Box::new(body),
        }
    }

    /// Name bound to each element in turn.
    pub fn variable(&self) -> &Token {
        self.variable.token()
    }

    /// Name of the enumerable being iterated.
    pub fn source(&self) -> &Token {
        self.source.token()
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

impl Node {
    /// The token this node was built from.
    pub fn token(&self) -> &Token {
        match self {
            Node::Template(t) => &t.token,
            Node::Terminal(t) => &t.token,
            Node::Null(tok) | Node::NoOp(tok) => tok,
            Node::Identifier(id) => &id.token,
            Node::BinaryOp(b) => &b.op,
            Node::UnaryOp(u) => &u.op,
            Node::Branch(b) => b.condition.token(),
            Node::EachLoop(e) => &e.token,
        }
    }

    /// Ordered semantic operands of this node.
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Node::Template(t) => t.children.iter().collect(),
            Node::Terminal(_) | Node::Null(_) | Node::NoOp(_) => Vec::new(),
            Node::Identifier(id) => id.args().iter().chain(id.member.as_deref()).collect(),
            Node::BinaryOp(b) => vec![&*b.left, &*b.right],
            Node::UnaryOp(u) => vec![&*u.operand],
            Node::Branch(b) => vec![&*b.condition, &*b.if_body, &*b.else_body],
            Node::EachLoop(e) => vec![&*e.variable, &*e.source, &*e.body],
        }
    }

    /// Variant name used in diagnostics and tree dumps.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Template(_) => "Template",
            Node::Terminal(_) => "Terminal",
            Node::Null(_) => "Null",
            Node::NoOp(_) => "NoOp",
            Node::Identifier(id) => id.kind_name(),
            Node::BinaryOp(_) => "BinaryOperation",
            Node::UnaryOp(_) => "UnaryOperation",
            Node::Branch(_) => "Branch",
            Node::EachLoop(_) => "EachLoop",
        }
    }

    /// Dispatch to the visitor method for this variant.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) -> V::Output {
        match self {
            Node::Template(t) => visitor.visit_template(t),
            Node::Terminal(t) => visitor.visit_terminal(t),
            Node::Null(tok) => visitor.visit_null(tok),
            Node::NoOp(tok) => visitor.visit_no_op(tok),
            Node::Identifier(id) => match id.kind {
                IdentKind::Plain => visitor.visit_identifier(id),
                IdentKind::VariableAccess => visitor.visit_variable_access(id),
                IdentKind::ProcedureCall(_) => visitor.visit_procedure_call(id),
            },
            Node::BinaryOp(b) => visitor.visit_binary_op(b),
            Node::UnaryOp(u) => visitor.visit_unary_op(u),
            Node::Branch(b) => visitor.visit_branch(b),
            Node::EachLoop(e) => visitor.visit_each_loop(e),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} '{}'",
            "",
            self.kind_name(),
            self.token().text,
            indent = depth * 2
        )?;
        for child in self.children() {
            child.fmt_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

/// Indented tree dump, one node per line.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

// ── Visitor ───────────────────────────────────────────────────────────────────

/// Per-variant handler for [`Node::accept`].
pub trait Visitor {
    type Output;

    fn visit_template(&mut self, node: &Template) -> Self::Output;
    fn visit_terminal(&mut self, node: &Terminal) -> Self::Output;
    fn visit_null(&mut self, token: &Token) -> Self::Output;
    fn visit_no_op(&mut self, token: &Token) -> Self::Output;
    fn visit_identifier(&mut self, node: &Identifier) -> Self::Output;
    fn visit_variable_access(&mut self, node: &Identifier) -> Self::Output;
    fn visit_procedure_call(&mut self, node: &Identifier) -> Self::Output;
    fn visit_binary_op(&mut self, node: &BinaryOp) -> Self::Output;
    fn visit_unary_op(&mut self, node: &UnaryOp) -> Self::Output;
    fn visit_branch(&mut self, node: &Branch) -> Self::Output;
    fn visit_each_loop(&mut self, node: &EachLoop) -> Self::Output;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
