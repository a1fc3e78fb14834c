use proptest::prelude::*;
use stringy::script::{
    parse_expression, parse_template, ErrorMode, Interpreter, Lexer, SymbolTable, Symbols, Value,
};

proptest! {
    /// The lexer returns Ok or Err on any input but never panics.
    #[test]
    fn lexer_does_not_panic(s in "\\PC*") {
        let _ = Lexer::new(&s).tokenize();
        let _ = Lexer::program(&s).tokenize();
    }

    /// Same for the parser, including inputs that look like programs.
    #[test]
    fn parser_does_not_panic(s in "\\PC*") {
        let _ = parse_template(&s);
        let _ = parse_expression(&s);
        let _ = parse_template(&format!("{{{s}}}"));
    }

    /// Programs built from the grammar's own alphabet exercise deeper paths.
    #[test]
    fn parser_does_not_panic_on_program_soup(s in "[a-c0-9 .,()?:+*/=<>!&|'-]{0,40}") {
        let _ = parse_template(&format!("x{{{s}}}y"));
    }
}

proptest! {
    /// Two independent parses of the same input are structurally identical.
    #[test]
    fn parsing_is_pure(s in "[a-z0-9 {}'.,()?:+*/=<>-]{0,40}") {
        let first = parse_template(&s);
        let second = parse_template(&s);
        prop_assert_eq!(first, second);
    }

    /// Text with no braces or backslashes renders unchanged.
    #[test]
    fn plain_text_round_trips(s in "[^{\\\\]*") {
        let mut vars = SymbolTable::new();
        let out = Interpreter::new(&mut vars).interpret(&s, ErrorMode::ThrowOnError).unwrap();
        prop_assert_eq!(out, s);
    }
}

proptest! {
    /// Integer `/` truncates toward zero like Rust's own integer division.
    #[test]
    fn integer_division_truncates(a in -10_000i64..10_000, b in -1_000i64..1_000) {
        prop_assume!(b != 0);
        let mut vars = SymbolTable::new();
        vars.set("a", Value::Int(a)).unwrap();
        vars.set("b", Value::Int(b)).unwrap();
        let got: i64 = Interpreter::new(&mut vars)
            .interpret_expression("a / b", ErrorMode::ThrowOnError)
            .unwrap();
        prop_assert_eq!(got, a / b);
    }

    /// `*` binds tighter than `+` for any operands.
    #[test]
    fn multiplication_precedence(a in 0i64..1000, b in 0i64..1000, c in 0i64..1000) {
        let mut vars = SymbolTable::new();
        let got: i64 = Interpreter::new(&mut vars)
            .interpret_expression(&format!("{a} + {b} * {c}"), ErrorMode::ThrowOnError)
            .unwrap();
        prop_assert_eq!(got, a + b * c);
    }

    /// Each-loops visit every element once, in order.
    #[test]
    fn each_loop_preserves_order(items in prop::collection::vec(-100i64..100, 0..20)) {
        let mut vars = SymbolTable::new();
        vars.set("items", Value::from(items.clone())).unwrap();
        let out = Interpreter::new(&mut vars)
            .interpret("{each i in items ? i + ';'}", ErrorMode::ThrowOnError)
            .unwrap();
        let expected: String = items.iter().map(|i| format!("{i};")).collect();
        prop_assert_eq!(out, expected);
    }
}
