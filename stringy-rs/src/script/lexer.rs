//! Template lexer.
//!
//! The lexer has two modes.  Outside a program section everything up to the
//! next unescaped `{` becomes a single text literal; `\{` and `\\` are the
//! only escapes there.  Inside a program section (entered on `{`, left on
//! `}`) it produces whitespace, numeric, quoted-text, identifier, keyword and
//! operator tokens.  Offsets are char offsets into the input.

use super::error::LexError;
use super::token::{lookup, starts_operator, Token, TokenKind};

/// Anything that can feed tokens to the parser.
pub trait TokenSource {
    /// Produce the next token; yields [`TokenKind::Eof`] forever once the
    /// input is exhausted.
    fn next_token(&mut self) -> Result<Token, LexError>;
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
    in_program: bool,
    starts_in_program: bool,
}

impl Lexer {
    /// Lexer over a whole template (starts outside any program section).
    pub fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
            pos: 0,
            in_program: false,
            starts_in_program: false,
        }
    }

    /// Lexer over a bare program body, as used for single-expression
    /// evaluation: no surrounding braces, no literal text.
    pub fn program(src: &str) -> Self {
        Lexer {
            in_program: true,
            starts_in_program: true,
            ..Lexer::new(src)
        }
    }

    /// Rewind onto a new input.
    pub fn reset(&mut self, src: &str) {
        self.src = src.chars().collect();
        self.rewind();
    }

    /// Rewind to the start of the current input.
    pub fn rewind(&mut self) {
        self.pos = 0;
        self.in_program = self.starts_in_program;
    }

    /// Drain the whole input, including the trailing `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = t.is(TokenKind::Eof);
            tokens.push(t);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Text outside a program section, up to the next unescaped `{`.
    fn read_outside_text(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();
        while let Some(c) = self.peek() {
            if c == '{' {
                break;
            }
            if c == '\\' && matches!(self.peek2(), Some('{' | '\\')) {
                self.pos += 1;
            }
            if let Some(c) = self.advance() {
                s.push(c);
            }
        }
        Token::new(TokenKind::TextLiteral, s, start)
    }

    fn read_whitespace(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_whitespace()) {
            s.push(c);
            self.pos += 1;
        }
        Token::new(TokenKind::Whitespace, s, start)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let mut s = String::new();
        let mut kind = TokenKind::IntegerConst;

        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            s.push(c);
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            kind = TokenKind::RealConst;
            s.push('.');
            self.pos += 1;
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                s.push(c);
                self.pos += 1;
            }
        }

        // A numeral glued to something that is neither whitespace nor an
        // operator is really unquoted text (`2b`, `1'st'`).
        match self.peek() {
            None => Ok(Token::new(kind, s, start)),
            Some(c) if c.is_whitespace() || starts_operator(c) => Ok(Token::new(kind, s, start)),
            Some('\'') => self.read_quoted(s, start),
            Some(_) => Ok(self.read_bare_text(s, start)),
        }
    }

    /// Quoted text literal; the current char must be the opening quote.
    fn read_quoted(&mut self, mut s: String, start: usize) -> Result<Token, LexError> {
        self.pos += 1; // opening quote
        loop {
            match self.peek() {
                None => return Err(LexError::UnterminatedText { offset: start }),
                Some('\'') => {
                    self.pos += 1;
                    return Ok(Token::new(TokenKind::TextLiteral, s, start));
                }
                Some('\\') if self.peek2() == Some('\'') => {
                    s.push('\'');
                    self.pos += 2;
                }
                Some(c) => {
                    s.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn read_bare_text(&mut self, mut s: String, start: usize) -> Token {
        while let Some(c) = self
            .peek()
            .filter(|&c| !c.is_whitespace() && !starts_operator(c) && c != '\'')
        {
            s.push(c);
            self.pos += 1;
        }
        Token::new(TokenKind::TextLiteral, s, start)
    }

    fn read_ident(&mut self) -> Token {
        let start = self.pos;
        let mut s = String::new();
        while let Some(c) = self.peek().filter(|&c| is_ident_continue(c)) {
            s.push(c);
            self.pos += 1;
        }
        match lookup(&s) {
            Some(kind) => Token::new(kind, s, start),
            None => Token::new(TokenKind::Identifier, s, start),
        }
    }

    /// Greedy longest match against the operator table.
    fn read_operator(&mut self, first: char) -> Result<Token, LexError> {
        let start = self.pos;
        let mut s = String::from(first);
        self.pos += 1;
        while let Some(c) = self.peek() {
            let mut longer = s.clone();
            longer.push(c);
            if lookup(&longer).is_none() {
                break;
            }
            s = longer;
            self.pos += 1;
        }
        match lookup(&s) {
            Some(kind) => Ok(Token::new(kind, s, start)),
            None => Err(LexError::UnexpectedChar {
                ch: first,
                offset: start,
            }),
        }
    }
}

impl TokenSource for Lexer {
    fn next_token(&mut self) -> Result<Token, LexError> {
        let ch = match self.peek() {
            None => return Ok(Token::eof(self.pos)),
            Some(c) => c,
        };

        if !self.in_program && ch != '{' {
            return Ok(self.read_outside_text());
        }

        match ch {
            '{' => self.in_program = true,
            '}' => self.in_program = false,
            _ => {}
        }

        if ch.is_whitespace() {
            Ok(self.read_whitespace())
        } else if ch.is_ascii_digit() {
            self.read_number()
        } else if ch == '\'' {
            let start = self.pos;
            self.read_quoted(String::new(), start)
        } else if is_ident_start(ch) {
            Ok(self.read_ident())
        } else if starts_operator(ch) {
            self.read_operator(ch)
        } else {
            Err(LexError::UnexpectedChar {
                ch,
                offset: self.pos,
            })
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use TokenKind::*;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, 0)
    }

    /// All tokens of `src` with whitespace dropped, `Eof` included.
    fn significant(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .tokenize()
            .expect("lex failed")
            .into_iter()
            .filter(|t| !t.is(Whitespace))
            .collect()
    }

    #[test]
    fn plain_text() {
        let tokens = significant("stringw1thnumb3rs and no digits");
        assert_eq!(
            tokens,
            vec![tok(TextLiteral, "stringw1thnumb3rs and no digits"), tok(Eof, "")]
        );
    }

    #[test]
    fn math_expression() {
        let tokens = significant("{(23+40.503)}");
        assert_eq!(
            tokens,
            vec![
                tok(LBrace, "{"),
                tok(LParen, "("),
                tok(IntegerConst, "23"),
                tok(Plus, "+"),
                tok(RealConst, "40.503"),
                tok(RParen, ")"),
                tok(RBrace, "}"),
                tok(Eof, ""),
            ]
        );
    }

    #[test]
    fn brackets() {
        let kinds: Vec<_> = significant("{()[]}").iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![LBrace, LParen, RParen, LSquare, RSquare, RBrace, Eof]);
    }

    #[test]
    fn arithmetic_and_branch_operators() {
        let kinds: Vec<_> = significant("{+-*/?:}").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![LBrace, Plus, Minus, Mul, Div, Question, Colon, RBrace, Eof]
        );
    }

    #[test]
    fn comparison_operators_use_longest_match() {
        let tokens = significant("{= != < > <= >= ==}");
        let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["{", "=", "!=", "<", ">", "<=", ">=", "==", "}", ""]);
        assert_eq!(tokens[2].kind, Neq);
        assert_eq!(tokens[5].kind, Lte);
        assert_eq!(tokens[6].kind, Gte);
        assert_eq!(tokens[7].kind, Eq);
    }

    #[test]
    fn logical_operators() {
        let kinds: Vec<_> = significant("{a && b || !c}").iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![LBrace, Identifier, And, Identifier, Or, Not, Identifier, RBrace, Eof]
        );
    }

    #[test]
    fn whitespace_is_one_token_per_run() {
        let tokens = Lexer::new("{a  \t b}").tokenize().unwrap();
        assert_eq!(tokens[2], tok(Whitespace, "  \t "));
        assert_eq!(tokens[2].offset, 2);
    }

    #[test]
    fn escaped_brace_outside_program() {
        let tokens = significant("a\\{");
        assert_eq!(tokens, vec![tok(TextLiteral, "a{"), tok(Eof, "")]);
    }

    #[test]
    fn escaped_backslash_and_lone_backslash() {
        assert_eq!(significant("a\\\\b")[0], tok(TextLiteral, "a\\b"));
        assert_eq!(significant("a\\nb")[0], tok(TextLiteral, "a\\nb"));
    }

    #[test]
    fn quoted_text_keeps_specials() {
        let tokens = significant("{'testing <= {} () 1 > 2 and 2 != 1'}");
        assert_eq!(tokens[1], tok(TextLiteral, "testing <= {} () 1 > 2 and 2 != 1"));
        assert_eq!(tokens[2].kind, RBrace);
    }

    #[test]
    fn quoted_text_escaped_quote() {
        let tokens = significant("{'it\\'s'}");
        assert_eq!(tokens[1], tok(TextLiteral, "it's"));
    }

    #[test]
    fn unterminated_quote_is_fatal() {
        let mut lexer = Lexer::new("{'no ending quote}");
        assert_eq!(lexer.next_token().unwrap().kind, LBrace);
        assert_eq!(
            lexer.next_token(),
            Err(LexError::UnterminatedText { offset: 1 })
        );
    }

    #[test]
    fn identifiers_and_keywords() {
        let tokens = significant("{identifier1 + null + true + false + _x}");
        assert_eq!(tokens[1], tok(Identifier, "identifier1"));
        assert_eq!(tokens[3], tok(Null, "null"));
        assert_eq!(tokens[5], tok(True, "true"));
        assert_eq!(tokens[7], tok(False, "false"));
        assert_eq!(tokens[9], tok(Identifier, "_x"));
    }

    #[test]
    fn numeral_glued_to_text_becomes_text() {
        assert_eq!(significant("{2nd}")[1], tok(TextLiteral, "2nd"));
        assert_eq!(significant("{1'st'}")[1], tok(TextLiteral, "1st"));
        assert_eq!(significant("{12}")[1], tok(IntegerConst, "12"));
    }

    #[test]
    fn number_at_end_of_program_body() {
        let tokens = Lexer::program("25 * 4").tokenize().unwrap();
        assert_eq!(tokens.first(), Some(&tok(IntegerConst, "25")));
        assert_eq!(tokens[tokens.len() - 2], tok(IntegerConst, "4"));
    }

    #[test]
    fn unknown_character_reports_offset() {
        let err = Lexer::new("ab{1 @ 2}").tokenize().unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { ch: '@', offset: 5 });
    }

    #[test]
    fn lone_ampersand_is_fatal() {
        let err = Lexer::new("{a & b}").tokenize().unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { ch: '&', offset: 3 });
    }

    #[test]
    fn text_resumes_after_program() {
        let tokens = significant("left{x}right");
        assert_eq!(tokens[0], tok(TextLiteral, "left"));
        assert_eq!(tokens[2], tok(Identifier, "x"));
        assert_eq!(tokens[4], tok(TextLiteral, "right"));
    }

    #[test]
    fn reset_and_rewind() {
        let mut lexer = Lexer::new("{a}");
        lexer.next_token().unwrap();
        lexer.rewind();
        assert_eq!(lexer.next_token().unwrap(), tok(LBrace, "{"));
        lexer.reset("plain");
        assert_eq!(lexer.next_token().unwrap(), tok(TextLiteral, "plain"));
        assert_eq!(lexer.next_token().unwrap().kind, Eof);
        assert_eq!(lexer.next_token().unwrap().kind, Eof);
    }

    #[test]
    fn empty_input_is_eof() {
        assert_eq!(Lexer::new("").tokenize().unwrap(), vec![tok(Eof, "")]);
    }
}
