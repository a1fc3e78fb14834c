//! Lexical tokens.

use std::fmt;

/// Lexical category of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Eof,
    Whitespace,

    // Literals
    IntegerConst,
    RealConst,
    TextLiteral,
    Identifier,

    Comma,

    // Grouping
    LParen,
    RParen,
    LBrace,
    RBrace,
    LSquare,
    RSquare,

    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,

    // Relational
    Not,
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,

    // Logical
    And,
    Or,

    Dot,

    // Branching
    Question,
    Colon,

    // Reserved words
    Null,
    False,
    True,
}

/// Fixed punctuation/operator/keyword table used for greedy longest-match.
pub(crate) const TOKEN_TABLE: &[(&str, TokenKind)] = &[
    ("{", TokenKind::LBrace),
    ("}", TokenKind::RBrace),
    ("(", TokenKind::LParen),
    (")", TokenKind::RParen),
    ("[", TokenKind::LSquare),
    ("]", TokenKind::RSquare),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Mul),
    ("/", TokenKind::Div),
    ("!", TokenKind::Not),
    ("=", TokenKind::Eq),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::Neq),
    (">", TokenKind::Gt),
    ("<", TokenKind::Lt),
    (">=", TokenKind::Gte),
    ("<=", TokenKind::Lte),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    (".", TokenKind::Dot),
    (",", TokenKind::Comma),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    ("null", TokenKind::Null),
    ("false", TokenKind::False),
    ("true", TokenKind::True),
];

/// Look up an exact entry in [`TOKEN_TABLE`].
pub(crate) fn lookup(text: &str) -> Option<TokenKind> {
    TOKEN_TABLE
        .iter()
        .find(|(t, _)| *t == text)
        .map(|&(_, kind)| kind)
}

/// Returns `true` if some table entry starts with `ch` and is not a word.
pub(crate) fn starts_operator(ch: char) -> bool {
    TOKEN_TABLE
        .iter()
        .any(|(t, _)| t.starts_with(ch) && !ch.is_alphabetic())
}

/// A lexical token: category, literal text and the char offset it started at.
///
/// Equality deliberately ignores the offset so that token streams and trees
/// from different inputs can be compared structurally.
#[derive(Debug, Clone, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn eof(offset: usize) -> Self {
        Token::new(TokenKind::Eof, "", offset)
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} '{}' @{}", self.kind, self.text, self.offset)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_offset() {
        let a = Token::new(TokenKind::Identifier, "x", 0);
        let b = Token::new(TokenKind::Identifier, "x", 42);
        assert_eq!(a, b);
        assert_ne!(a, Token::new(TokenKind::TextLiteral, "x", 0));
    }

    #[test]
    fn table_lookup() {
        assert_eq!(lookup(">="), Some(TokenKind::Gte));
        assert_eq!(lookup("null"), Some(TokenKind::Null));
        assert_eq!(lookup("&"), None);
        assert!(starts_operator('&'));
        assert!(starts_operator('{'));
        assert!(!starts_operator('n'));
        assert!(!starts_operator('a'));
    }
}
