//! Error-classification tests for malformed source.
//!
//! Everything here must surface as `SyntaxError` through `Session::run`,
//! regardless of whether the lexer, the reader, or a syntactic form's own
//! shape check catches it.

use karst::{ExcKind, Session};

fn syntax_error(source: &str) {
    let mut session = Session::new();
    let err = session.run(source).expect_err(&format!("`{source}` should fail"));
    assert_eq!(err.kind(), ExcKind::SyntaxError, "`{source}` raised: {err}");
}

/// Unbalanced and stray brackets.
#[test]
fn bracket_errors() {
    syntax_error("(");
    syntax_error(")");
    syntax_error("(+ 1 2");
    syntax_error("(+ 1 2))");
    syntax_error("((+ 1 2)");
}

/// The dot is only valid between exactly two elements.
#[test]
fn dot_errors() {
    syntax_error(".");
    syntax_error("(. 1)");
    syntax_error("(1 . 2 3)");
    syntax_error("(1 2 . 3)");
    syntax_error("(1 .)");
}

/// Characters outside the token alphabet.
#[test]
fn character_errors() {
    syntax_error("@");
    syntax_error("(+ 1 $)");
    syntax_error("[1]");
}

/// Integer literals must fit in 64 bits.
#[test]
fn out_of_range_literal() {
    syntax_error("99999999999999999999");
}

/// Exactly one expression per call.
#[test]
fn trailing_input_errors() {
    syntax_error("");
    syntax_error("   \n ");
    syntax_error("1 2");
    syntax_error("(+ 1 2) (+ 3 4)");
    syntax_error("(define x 1) x");
}

/// Shape checks for `define` and `set!`.
#[test]
fn define_and_set_shape_errors() {
    syntax_error("(define)");
    syntax_error("(define x)");
    syntax_error("(define x 1 2)");
    syntax_error("(define 5 1)");
    syntax_error("(define (f))");
    syntax_error("(define (f x) 1 2 3)");
    syntax_error("(set!)");
    syntax_error("(set! 5 1)");
    syntax_error("(set! x)");
}

/// Shape checks for `lambda` and `quote`.
#[test]
fn lambda_and_quote_shape_errors() {
    syntax_error("(lambda)");
    syntax_error("(lambda (x))");
    syntax_error("(lambda x x)");
    syntax_error("(lambda (x 1) x)");
    syntax_error("(lambda (x) 1 2 3)");
    syntax_error("(quote)");
    syntax_error("(quote 1 2)");
}

/// The well-formed neighbors of the failures above still parse and run.
#[test]
fn adjacent_valid_shapes_still_work() {
    let mut session = Session::new();
    assert_eq!(session.run("(define (f) 1)").unwrap(), "()");
    assert_eq!(session.run("(f)").unwrap(), "1");
    assert_eq!(session.run("'(1 . 2)").unwrap(), "(1 . 2)");
    assert_eq!(session.run("((lambda (x) (define y 1) (+ x y)) 2)").unwrap(), "3");
}
