//! The template language: lexer, parser, AST and interpreter.
//!
//! A template is literal text with embedded program sections in braces:
//!
//! - Literals: `42`, `2.5`, `'text'`, `true`, `false`, `null`
//! - Arithmetic `+ - * /`, comparison `= == != < > <= >=`, logic `&& ||`
//! - Ternaries `{cond ? 'yes' : 'no'}` (the `: …` part is optional)
//! - Member chains `{user.Name.ToUpper()}` and procedure calls `{Add(1, 2)}`
//! - One loop form: `{each item in items ? item + ', '}`
//!
//! # Quick start
//!
//! ```rust
//! use stringy::script::{ErrorMode, Interpreter, SymbolTable, Symbols, Value};
//!
//! let mut vars = SymbolTable::new();
//! vars.set("n", Value::Int(6)).unwrap();
//! let out = Interpreter::new(&mut vars)
//!     .interpret("six sevens are {n * 7}", ErrorMode::ThrowOnError)
//!     .unwrap();
//! assert_eq!(out, "six sevens are 42");
//! ```

pub mod ast;
pub mod error;
pub mod host;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod stdlib;
pub mod symbols;
pub mod token;
pub mod value;

// Re-exports for convenience.
pub use ast::{Node, Visitor};
pub use error::{BindError, Error, LexError, Result, RuntimeError, SyntaxError};
pub use host::{Class, ClassBuilder, HostClass, Method, Object, Param, Procedure};
pub use interp::{ErrorMode, Interpreter};
pub use lexer::{Lexer, TokenSource};
pub use parser::{parse_expression, parse_template, Parser};
pub use symbols::{SymbolTable, Symbols};
pub use token::{Token, TokenKind};
pub use value::{FromValue, Value, ValueKind};
