//! Recursive-descent parser.
//!
//! Grammar (precedence lowest → highest):
//!
//! ```text
//! template    := (TEXT | program)*
//! program     := '{' statement '}'
//! statement   := each_loop | expression [ '?' statement [ ':' statement ] ]
//! each_loop   := 'each' IDENT 'in' IDENT '?' statement
//! expression  := simple (relop simple)*          relop: = == != > < >= <=
//! simple      := term (('+' | '-' | '||') term)*
//! term        := factor (('*' | '/' | '&&') factor)*
//! factor      := ('+' | '-') factor | '!' factor | INT | REAL | TEXT
//!              | 'null' | 'true' | 'false' | '(' statement ')' | access
//! access      := IDENT [ '(' [statement (',' statement)*] ')' ] [ '.' access ]
//! ```
//!
//! `||` sits at additive and `&&` at multiplicative precedence.  `each` and
//! `in` are ordinary identifiers recognised by their text.  Whitespace tokens
//! are skipped explicitly between significant tokens.
//!
//! Nesting is capped at [`MAX_DEPTH`]: every statement, factor, member link
//! and folded binary operator counts one level.  Deeper input is a syntax
//! error, which also bounds the recursion of anything walking the tree.

use tracing::trace;

use super::ast::{BinaryOp, Branch, EachLoop, Identifier, Literal, Node, Template, Terminal, UnaryOp};
use super::error::{Error, SyntaxError};
use super::lexer::{Lexer, TokenSource};
use super::token::{Token, TokenKind};

const RELOPS: &[TokenKind] = &[
    TokenKind::Eq,
    TokenKind::Neq,
    TokenKind::Gt,
    TokenKind::Lt,
    TokenKind::Gte,
    TokenKind::Lte,
];
const ADDOPS: &[TokenKind] = &[TokenKind::Plus, TokenKind::Minus, TokenKind::Or];
const MULOPS: &[TokenKind] = &[TokenKind::Mul, TokenKind::Div, TokenKind::And];

/// Deepest nesting the parser accepts.
pub const MAX_DEPTH: usize = 256;

/// Parse a whole template into a [`Node::Template`] root.
pub fn parse_template(src: &str) -> Result<Node, Error> {
    let node = Parser::new(Lexer::new(src))?.parse_template()?;
    trace!(len = src.len(), fragments = node.children().len(), "parsed template");
    Ok(node)
}

/// Parse a bare program body (no braces, no literal text) into one statement.
pub fn parse_expression(src: &str) -> Result<Node, Error> {
    Parser::new(Lexer::program(src))?.parse_program_body()
}

// ── Parser ────────────────────────────────────────────────────────────────────

/// Pulls tokens lazily from a [`TokenSource`] with one token of lookahead.
pub struct Parser<S> {
    lexer: S,
    current: Token,
    depth: usize,
}

impl<S: TokenSource> Parser<S> {
    pub fn new(mut lexer: S) -> Result<Self, Error> {
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current, depth: 0 })
    }

    pub fn parse_template(mut self) -> Result<Node, Error> {
        let token = self.current.clone();
        let mut children = Vec::new();

        while !self.current.is(TokenKind::Eof) {
            match self.current.kind {
                TokenKind::LBrace => children.push(self.parse_program()?),
                TokenKind::TextLiteral => {
                    let tok = self.advance()?;
                    children.push(Node::Terminal(Terminal {
                        value: Literal::Text(tok.text.clone()),
                        token: tok,
                    }));
                }
                _ => return Err(self.error("text or '{'")),
            }
        }

        Ok(Node::Template(Template { token, children }))
    }

    pub fn parse_program_body(mut self) -> Result<Node, Error> {
        let node = self.parse_statement()?;
        self.skip_ws()?;
        if !self.current.is(TokenKind::Eof) {
            return Err(self.error("end of input"));
        }
        Ok(node)
    }

    // ── Token helpers ─────────────────────────────────────────────────────────

    fn advance(&mut self) -> Result<Token, Error> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn eat(&mut self, kind: TokenKind, expected: &str) -> Result<Token, Error> {
        if self.current.is(kind) {
            self.advance()
        } else {
            Err(self.error(expected))
        }
    }

    fn skip_ws(&mut self) -> Result<(), Error> {
        while self.current.is(TokenKind::Whitespace) {
            self.advance()?;
        }
        Ok(())
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.current.kind)
    }

    fn at_word(&self, word: &str) -> bool {
        self.current.is(TokenKind::Identifier) && self.current.text == word
    }

    /// Count one nesting level, failing past [`MAX_DEPTH`].
    fn deepen(&mut self) -> Result<(), Error> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(&format!("nesting depth <= {MAX_DEPTH}")));
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `parse` one level deeper.
    fn nested<T>(&mut self, parse: fn(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        self.deepen()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn error(&self, expected: &str) -> Error {
        SyntaxError {
            found: self.current.text.clone(),
            kind: self.current.kind,
            offset: self.current.offset,
            expected: expected.to_owned(),
        }
        .into()
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_program(&mut self) -> Result<Node, Error> {
        self.eat(TokenKind::LBrace, "'{'")?;
        let node = self.parse_statement()?;
        self.skip_ws()?;
        self.eat(TokenKind::RBrace, "'}'")?;
        Ok(node)
    }

    fn parse_statement(&mut self) -> Result<Node, Error> {
        self.nested(Self::statement)
    }

    fn statement(&mut self) -> Result<Node, Error> {
        self.skip_ws()?;
        if self.at_word("each") {
            return self.parse_each_loop();
        }

        let node = self.parse_expression()?;
        self.skip_ws()?;
        if self.current.is(TokenKind::Question) {
            return self.parse_ternary(node);
        }
        Ok(node)
    }

    fn parse_each_loop(&mut self) -> Result<Node, Error> {
        let each = self.eat(TokenKind::Identifier, "'each'")?;
        self.skip_ws()?;
        let variable = self.eat(TokenKind::Identifier, "loop variable name")?;
        self.skip_ws()?;
        if !self.at_word("in") {
            return Err(self.error("'in'"));
        }
        self.advance()?;
        self.skip_ws()?;
        let source = self.eat(TokenKind::Identifier, "enumerable variable name")?;
        self.skip_ws()?;
        self.eat(TokenKind::Question, "'?'")?;
        self.skip_ws()?;
        let body = self.parse_statement()?;

        Ok(Node::EachLoop(EachLoop::new(
            each,
            Identifier::plain(variable),
            Identifier::plain(source),
            body,
        )))
    }

    fn parse_ternary(&mut self, condition: Node) -> Result<Node, Error> {
        self.eat(TokenKind::Question, "'?'")?;
        self.skip_ws()?;
        let if_body = self.parse_statement()?;
        self.skip_ws()?;

        let else_body = if self.current.is(TokenKind::Colon) {
            self.advance()?;
            self.skip_ws()?;
            Some(self.parse_statement()?)
        } else {
            None
        };

        Ok(Node::Branch(Branch::new(condition, if_body, else_body)))
    }

    fn parse_expression(&mut self) -> Result<Node, Error> {
        let base = self.depth;
        let mut node = self.parse_simple_expression()?;
        self.skip_ws()?;
        while self.at_any(RELOPS) {
            self.deepen()?;
            let op = self.advance()?;
            self.skip_ws()?;
            let right = self.parse_simple_expression()?;
            node = binary(op, node, right);
            self.skip_ws()?;
        }
        self.depth = base;
        Ok(node)
    }

    fn parse_simple_expression(&mut self) -> Result<Node, Error> {
        let base = self.depth;
        let mut node = self.parse_term()?;
        self.skip_ws()?;
        while self.at_any(ADDOPS) {
            self.deepen()?;
            let op = self.advance()?;
            self.skip_ws()?;
            let right = self.parse_term()?;
            node = binary(op, node, right);
            self.skip_ws()?;
        }
        self.depth = base;
        Ok(node)
    }

    fn parse_term(&mut self) -> Result<Node, Error> {
        let base = self.depth;
        let mut node = self.parse_factor()?;
        self.skip_ws()?;
        while self.at_any(MULOPS) {
            self.deepen()?;
            let op = self.advance()?;
            self.skip_ws()?;
            let right = self.parse_factor()?;
            node = binary(op, node, right);
            self.skip_ws()?;
        }
        self.depth = base;
        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Node, Error> {
        self.nested(Self::factor)
    }

    fn factor(&mut self) -> Result<Node, Error> {
        self.skip_ws()?;
        match self.current.kind {
            TokenKind::Plus | TokenKind::Minus => {
                let op = self.advance()?;
                let operand = self.parse_factor()?;
                Ok(Node::UnaryOp(UnaryOp {
                    op,
                    operand: Box::new(operand),
                }))
            }
            TokenKind::IntegerConst => {
                let n = self
                    .current
                    .text
                    .parse::<i64>()
                    .map_err(|_| self.error("integer literal in range"))?;
                self.terminal(Literal::Int(n))
            }
            TokenKind::RealConst => {
                let x = self
                    .current
                    .text
                    .parse::<f64>()
                    .map_err(|_| self.error("real literal"))?;
                self.terminal(Literal::Real(x))
            }
            TokenKind::TextLiteral => {
                let s = self.current.text.clone();
                self.terminal(Literal::Text(s))
            }
            TokenKind::True => self.terminal(Literal::Bool(true)),
            TokenKind::False => self.terminal(Literal::Bool(false)),
            TokenKind::Null => Ok(Node::Null(self.advance()?)),
            TokenKind::Identifier => Ok(Node::Identifier(self.parse_variable_access()?)),
            TokenKind::LParen => {
                self.advance()?;
                let node = self.parse_statement()?;
                self.skip_ws()?;
                self.eat(TokenKind::RParen, "')'")?;
                Ok(node)
            }
            // `!` is accepted but has no effect on the operand.
            TokenKind::Not => {
                self.advance()?;
                self.parse_factor()
            }
            _ => Err(self.error("expression")),
        }
    }

    fn terminal(&mut self, value: Literal) -> Result<Node, Error> {
        let token = self.advance()?;
        Ok(Node::Terminal(Terminal { token, value }))
    }

    /// `a.b(x).c` parses to `a` → member `b(x)` → member `c`.
    fn parse_variable_access(&mut self) -> Result<Identifier, Error> {
        self.nested(Self::variable_access)
    }

    fn variable_access(&mut self) -> Result<Identifier, Error> {
        let token = self.eat(TokenKind::Identifier, "identifier")?;
        self.skip_ws()?;

        let mut id = if self.current.is(TokenKind::LParen) {
            let args = self.parse_args()?;
            self.skip_ws()?;
            Identifier::call(token, args)
        } else {
            Identifier::variable(token)
        };

        if self.current.is(TokenKind::Dot) {
            self.advance()?;
            self.skip_ws()?;
            let member = self.parse_variable_access()?;
            id = id.with_member(member);
        }
        Ok(id)
    }

    fn parse_args(&mut self) -> Result<Vec<Node>, Error> {
        self.eat(TokenKind::LParen, "'('")?;
        self.skip_ws()?;

        let mut args = Vec::new();
        while !self.current.is(TokenKind::RParen) {
            args.push(self.parse_statement()?);
            self.skip_ws()?;
            match self.current.kind {
                TokenKind::Comma => {
                    self.advance()?;
                    self.skip_ws()?;
                }
                TokenKind::RParen => {}
                _ => return Err(self.error("',' or ')'")),
            }
        }

        self.eat(TokenKind::RParen, "')'")?;
        Ok(args)
    }
}

fn binary(op: Token, left: Node, right: Node) -> Node {
    Node::BinaryOp(BinaryOp {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ast::IdentKind;

    fn parse(src: &str) -> Node {
        parse_template(src).expect("parse failed")
    }

    /// The single program node of a one-section template.
    fn first(src: &str) -> Node {
        match parse(src) {
            Node::Template(t) => t.children.into_iter().next().expect("empty template"),
            other => panic!("not a template: {other:?}"),
        }
    }

    fn int_value(node: &Node) -> i64 {
        match node {
            Node::Terminal(Terminal { value: Literal::Int(n), .. }) => *n,
            other => panic!("not an integer terminal: {other:?}"),
        }
    }

    fn text_value(node: &Node) -> &str {
        match node {
            Node::Terminal(Terminal { value: Literal::Text(s), .. }) => s,
            other => panic!("not a text terminal: {other:?}"),
        }
    }

    #[test]
    fn literal_only_template() {
        let root = parse("this is a test template!");
        let children = root.children();
        assert_eq!(children.len(), 1);
        assert_eq!(text_value(children[0]), "this is a test template!");
    }

    #[test]
    fn text_around_program() {
        let root = parse("left{program}right");
        let kinds: Vec<_> = root.children().iter().map(|n| n.kind_name()).collect();
        assert_eq!(kinds, vec!["Terminal", "VariableAccess", "Terminal"]);
    }

    #[test]
    fn ternary() {
        let Node::Branch(b) = first("{expression ? 'expression-if' : 'expression-else'}") else {
            panic!("expected branch");
        };
        assert_eq!(b.condition.token().text, "expression");
        assert_eq!(text_value(&b.if_body), "expression-if");
        assert_eq!(text_value(&b.else_body), "expression-else");
    }

    #[test]
    fn nested_ternary() {
        let Node::Branch(outer) = first("{2 > 1 ? (3 > 2 ? 'super true' : 'super false') : 'false'}") else {
            panic!("expected branch");
        };
        let Node::BinaryOp(cond) = &*outer.condition else {
            panic!("expected comparison");
        };
        assert_eq!(cond.op.kind, TokenKind::Gt);
        assert_eq!(int_value(&cond.left), 2);
        assert_eq!(int_value(&cond.right), 1);

        let Node::Branch(inner) = &*outer.if_body else {
            panic!("expected nested branch");
        };
        assert_eq!(text_value(&inner.if_body), "super true");
        assert_eq!(text_value(&inner.else_body), "super false");
        assert_eq!(text_value(&outer.else_body), "false");
    }

    #[test]
    fn ternary_without_else_is_no_op() {
        let Node::Branch(b) = first("{blah > 3 ? 'some text'}") else {
            panic!("expected branch");
        };
        assert_eq!(text_value(&b.if_body), "some text");
        assert!(matches!(*b.else_body, Node::NoOp(_)));
        let Node::BinaryOp(cond) = &*b.condition else {
            panic!("expected comparison");
        };
        assert_eq!(cond.left.kind_name(), "VariableAccess");
        assert_eq!(int_value(&cond.right), 3);
    }

    #[test]
    fn multiplication_binds_tighter() {
        let Node::BinaryOp(add) = first("{8 * 4 + 3.1415}") else {
            panic!("expected binary op");
        };
        assert_eq!(add.op.kind, TokenKind::Plus);
        assert!(matches!(
            &*add.right,
            Node::Terminal(Terminal { value: Literal::Real(x), .. }) if *x == 3.1415
        ));
        let Node::BinaryOp(mul) = &*add.left else {
            panic!("expected product on the left");
        };
        assert_eq!(int_value(&mul.left), 8);
        assert_eq!(int_value(&mul.right), 4);
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let Node::BinaryOp(or) = first("{false && false || true}") else {
            panic!("expected binary op");
        };
        assert_eq!(or.op.kind, TokenKind::Or);
        assert!(matches!(&*or.left, Node::BinaryOp(and) if and.op.kind == TokenKind::And));
    }

    #[test]
    fn relational_ops_fold_left() {
        let Node::BinaryOp(outer) = first("{1 < 2 = true}") else {
            panic!("expected binary op");
        };
        assert_eq!(outer.op.kind, TokenKind::Eq);
        assert!(matches!(&*outer.left, Node::BinaryOp(lt) if lt.op.kind == TokenKind::Lt));
    }

    #[test]
    fn null_literals() {
        let Node::BinaryOp(eq) = first("{null = null}") else {
            panic!("expected binary op");
        };
        assert_eq!(eq.op.kind, TokenKind::Eq);
        assert!(matches!(*eq.left, Node::Null(_)));
        assert!(matches!(*eq.right, Node::Null(_)));
    }

    #[test]
    fn unary_minus_nests() {
        let Node::UnaryOp(outer) = first("{--x}") else {
            panic!("expected unary op");
        };
        assert!(matches!(&*outer.operand, Node::UnaryOp(_)));
    }

    #[test]
    fn not_is_pass_through() {
        // `!` parses but produces no node of its own.
        assert_eq!(first("{!flag}"), first("{flag}"));
    }

    #[test]
    fn method_call_member() {
        let Node::Identifier(id) = first("{variable.Method()}") else {
            panic!("expected identifier");
        };
        assert_eq!(id.name(), "variable");
        assert_eq!(id.kind, IdentKind::VariableAccess);
        let member = id.member().unwrap();
        assert_eq!(member.name(), "Method");
        assert!(member.is_call());
        assert!(member.args().is_empty());
    }

    #[test]
    fn deep_member_chain_leans_right() {
        let Node::Identifier(a) = first("{a.b.c}") else {
            panic!("expected identifier");
        };
        let b = a.member().unwrap();
        let c = b.member().unwrap();
        assert_eq!((a.name(), b.name(), c.name()), ("a", "b", "c"));
        assert!(c.member().is_none());
    }

    #[test]
    fn params_lists() {
        let Node::Identifier(call) = first("{Method(variable, 'text')}") else {
            panic!("expected call");
        };
        assert_eq!(call.name(), "Method");
        assert_eq!(call.args().len(), 2);
        assert_eq!(call.args()[0].kind_name(), "VariableAccess");
        assert_eq!(text_value(&call.args()[1]), "text");
    }

    #[test]
    fn expression_param() {
        let Node::Identifier(call) = first("{Method(3 + 4 * 5)}") else {
            panic!("expected call");
        };
        let Node::BinaryOp(add) = &call.args()[0] else {
            panic!("expected sum");
        };
        assert_eq!(add.op.kind, TokenKind::Plus);
        assert_eq!(int_value(&add.left), 3);
        assert!(matches!(&*add.right, Node::BinaryOp(mul) if mul.op.kind == TokenKind::Mul));
    }

    #[test]
    fn call_in_params() {
        let Node::Identifier(call) = first("{Method(SecondMethod())}") else {
            panic!("expected call");
        };
        let Node::Identifier(inner) = &call.args()[0] else {
            panic!("expected nested call");
        };
        assert_eq!(inner.name(), "SecondMethod");
        assert!(inner.is_call());
        assert!(inner.args().is_empty());
    }

    #[test]
    fn ternary_argument() {
        let Node::Identifier(call) = first("{f(x ? 1 : 2, 3)}") else {
            panic!("expected call");
        };
        assert_eq!(call.args()[0].kind_name(), "Branch");
        assert_eq!(int_value(&call.args()[1]), 3);
    }

    #[test]
    fn each_loop() {
        let Node::EachLoop(each) = first("{each number in numbers ? number + ', '}") else {
            panic!("expected each loop");
        };
        assert_eq!(each.variable().text, "number");
        assert_eq!(each.source().text, "numbers");
        assert_eq!(each.body.kind_name(), "BinaryOperation");
    }

    #[test]
    fn each_loop_requires_in() {
        let err = parse_template("{each n of ns ? n}").unwrap_err();
        assert!(matches!(err, Error::Syntax(SyntaxError { ref found, .. }) if found == "of"));
    }

    #[test]
    fn whitespace_inside_braces() {
        assert_eq!(first("{  a + 1  }"), first("{a+1}"));
        assert_eq!(first("{ each n in ns ? n }").kind_name(), "EachLoop");
    }

    #[test]
    fn syntax_errors_carry_token() {
        let err = parse_template("{1 + }").unwrap_err();
        let Error::Syntax(e) = err else {
            panic!("expected syntax error");
        };
        assert_eq!(e.kind, TokenKind::RBrace);
        assert_eq!(e.offset, 5);

        assert!(parse_template("{}").is_err());
        assert!(parse_template("{a b}").is_err());
        assert!(parse_template("{f(a b)}").is_err());
        assert!(parse_template("{(1 + 2}").is_err());
        assert!(parse_template("{a").is_err());
    }

    #[test]
    fn lexical_errors_propagate() {
        assert!(matches!(parse_template("{'open"), Err(Error::Lex(_))));
    }

    #[test]
    fn expression_body() {
        let node = parse_expression("25 * 4 + 150").unwrap();
        assert_eq!(node.kind_name(), "BinaryOperation");
        assert!(parse_expression("1 + 2 }").is_err());
        assert!(parse_expression("  a == b  ").is_ok());
    }

    #[test]
    fn reparse_is_structurally_identical() {
        let src = "Hi {name.ToUpper()}, {each n in ns ? n * 2 + (n > 1 ? ', ')} {-x / 2.5}";
        assert_eq!(parse(src), parse(src));
        assert_eq!(parse(src).to_string(), parse(src).to_string());
    }

    #[test]
    fn integer_literal_overflow() {
        assert!(matches!(
            parse_template("{99999999999999999999}"),
            Err(Error::Syntax(_))
        ));
    }

    fn depth_error(src: &str) -> bool {
        matches!(
            parse_template(src),
            Err(Error::Syntax(SyntaxError { ref expected, .. })) if expected.starts_with("nesting depth")
        )
    }

    #[test]
    fn deep_parens_are_rejected() {
        let n = 10_000;
        let src = format!("{{{}1{}}}", "(".repeat(n), ")".repeat(n));
        assert!(depth_error(&src));
    }

    #[test]
    fn moderate_nesting_parses() {
        let n = 50;
        let src = format!("{{{}1{}}}", "(".repeat(n), ")".repeat(n));
        assert_eq!(int_value(&first(&src)), 1);
    }

    #[test]
    fn deep_unary_and_member_chains_are_rejected() {
        assert!(depth_error(&format!("{{{}1}}", "-".repeat(10_000))));
        assert!(depth_error(&format!("{{{}x}}", "!".repeat(10_000))));
        assert!(depth_error(&format!("{{a{}}}", ".a".repeat(10_000))));
    }

    #[test]
    fn long_operator_chains_are_rejected() {
        assert!(depth_error(&format!("{{1{}}}", " + 1".repeat(10_000))));
        // Separate sections each start from the top.
        assert!(parse_template(&"{1 + 1}".repeat(10_000)).is_ok());
    }
}
