//! Stringy: an embeddable template and expression language.
//!
//! [`Stringy`] bundles a [`SymbolTable`](script::SymbolTable) with the `Text`
//! helper object and renders templates against it.  The lower-level pieces
//! (lexer, parser, interpreter, host registration) live in [`script`].

pub mod cli;
pub mod config;
pub mod script;

use tracing::warn;

use script::stdlib::text_lib;
use script::{ErrorMode, FromValue, Interpreter, SymbolTable, Symbols, Value};

pub use script::{Error, Result};

/// Convenience wrapper owning the variable environment.
///
/// The environment is not synchronized; share one `Stringy` between threads
/// only behind a lock.  Rendering cannot be cancelled and has no timeout, so
/// an each-loop over an unbounded host iterable runs until the host's iterate
/// hook returns.  Do not bind untrusted iterables.
#[derive(Debug)]
pub struct Stringy {
    symbols: SymbolTable,
}

impl Default for Stringy {
    fn default() -> Self {
        Self::new()
    }
}

impl Stringy {
    /// Fresh environment with `Text` pre-bound.
    pub fn new() -> Self {
        Self::with_symbols(SymbolTable::new())
    }

    /// Use an existing table.  `Text` is bound unless the table already has
    /// a symbol of that name.
    pub fn with_symbols(mut symbols: SymbolTable) -> Self {
        if !symbols.has("Text") {
            if let Err(e) = symbols.set("Text", text_lib()) {
                warn!(error = %e, "could not bind the Text helper");
            }
        }
        Stringy { symbols }
    }

    /// Render a template.
    pub fn execute(&mut self, template: &str, mode: ErrorMode) -> Result<String> {
        Interpreter::new(&mut self.symbols).interpret(template, mode)
    }

    /// Evaluate a single expression (no braces) and convert the result.
    pub fn evaluate<T: FromValue>(&mut self, expression: &str, mode: ErrorMode) -> Result<T> {
        Interpreter::new(&mut self.symbols).interpret_expression(expression, mode)
    }

    /// Bind `name`.  Fails if it is already bound to a different type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.symbols.set(name, value.into())?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.symbols.has(name)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
