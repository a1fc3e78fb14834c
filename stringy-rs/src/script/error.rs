//! Error types for every stage of template processing.
//!
//! Lexical and syntax errors are always fatal.  Runtime errors carry the
//! failing node's variant name, token text and source offset so a fault can
//! be located without re-running anything; whether they abort a render is
//! decided by the caller's [`ErrorMode`](super::interp::ErrorMode).

use thiserror::Error;

use super::token::TokenKind;

/// Convenience alias used throughout the public API.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure raised while lexing, parsing, binding or evaluating.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Bind(#[from] BindError),
}

/// The character stream could not be split into tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("invalid character '{ch}' at position {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated text literal starting at position {offset}; missing closing quote (')")]
    UnterminatedText { offset: usize },
}

/// The token stream does not match the grammar.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("syntax error at token '{found}' ({kind:?}) at position {offset}: expected {expected}")]
pub struct SyntaxError {
    /// Text of the offending token.
    pub found: String,
    pub kind: TokenKind,
    pub offset: usize,
    /// What the parser was looking for.
    pub expected: String,
}

/// Evaluation failed on a specific node.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{{runtime error: {node} node, token '{token}' at position {offset}: {message}}}")]
pub struct RuntimeError {
    /// AST variant name (`BinaryOperation`, `VariableAccess`, …).
    pub node: &'static str,
    pub token: String,
    pub offset: usize,
    pub message: String,
}

/// A symbol was rebound to a value of a different runtime type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindError {
    #[error("cannot store value of type {offered} in variable '{name}' of type {bound}")]
    TypeMismatch {
        name: String,
        bound: String,
        offered: String,
    },
}

// ── Tests ─────────────────────────────────────────────────────────────────────
