//! Behavioral tests for `Session`, the persistent interpreter session.
//!
//! Each `run()` call evaluates exactly one expression against accumulated
//! top-level state, so the tests below drive multi-step programs as a REPL
//! user would: one expression per call, checking the printed result (or the
//! error classification) at every step.

use karst::{ExcKind, Exception, ResourceLimits, Session};

fn run(session: &mut Session, source: &str) -> String {
    session
        .run(source)
        .unwrap_or_else(|err| panic!("`{source}` should succeed, got: {err}"))
}

fn run_err(session: &mut Session, source: &str) -> Exception {
    session
        .run(source)
        .expect_err(&format!("`{source}` should fail"))
}

// =============================================================================
// 1. Self-evaluating literals
// =============================================================================

/// Number literals print back as themselves, idempotently.
#[test]
fn number_literals_round_trip() {
    let mut session = Session::new();
    for literal in ["0", "5", "-17", "9223372036854775807", "-9223372036854775808"] {
        assert_eq!(run(&mut session, literal), literal);
        assert_eq!(run(&mut session, literal), literal, "second run of `{literal}` differs");
    }
}

/// Boolean literals are self-evaluating.
#[test]
fn boolean_literals_round_trip() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "#t"), "#t");
    assert_eq!(run(&mut session, "#f"), "#f");
}

/// Quoting suppresses evaluation; the payload prints in surface form.
#[test]
fn quoted_data_prints_in_surface_form() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "'foo"), "foo");
    assert_eq!(run(&mut session, "'5"), "5");
    assert_eq!(run(&mut session, "'()"), "()");
    assert_eq!(run(&mut session, "'(1 2 3)"), "(1 2 3)");
    assert_eq!(run(&mut session, "'(1 2 (3 4))"), "(1 2 (3 4))");
    assert_eq!(run(&mut session, "'(1 . 2)"), "(1 . 2)");
    assert_eq!(run(&mut session, "(quote (1 2))"), "(1 2)");
}

/// Nested dotted pairs normalize to list syntax when the chain ends in nil.
#[test]
fn dotted_chains_normalize_when_printing() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "'(1 . (2 . (3 . ())))"), "(1 2 3)");
    assert_eq!(run(&mut session, "'(1 . (2 . 3))"), "(1 2 . 3)");
}

// =============================================================================
// 2. Arithmetic
// =============================================================================

/// The four operators left-fold over their evaluated arguments.
#[test]
fn arithmetic_folds_left() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(+ 1 2)"), "3");
    assert_eq!(run(&mut session, "(- 10 1 2)"), "7");
    assert_eq!(run(&mut session, "(* 2 3 4)"), "24");
    assert_eq!(run(&mut session, "(/ 100 5 2)"), "10");
    assert_eq!(run(&mut session, "(+ (* 2 3) (- 10 6))"), "10");
}

/// `+` and `*` have identity elements; `-` and `/` reject an empty argument
/// list.
#[test]
fn arithmetic_identity_elements() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(+)"), "0");
    assert_eq!(run(&mut session, "(*)"), "1");
    assert_eq!(run_err(&mut session, "(-)").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(/)").kind(), ExcKind::RuntimeError);
}

/// Division truncates toward zero and rejects a zero divisor.
#[test]
fn division_truncates_toward_zero() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(/ 7 2)"), "3");
    assert_eq!(run(&mut session, "(/ -7 2)"), "-3");
    let err = run_err(&mut session, "(/ 1 0)");
    assert_eq!(err.kind(), ExcKind::RuntimeError);
    assert!(err.message().contains("division by zero"), "got: {err}");
}

/// Non-number arguments to arithmetic are runtime errors.
#[test]
fn arithmetic_rejects_non_numbers() {
    let mut session = Session::new();
    assert_eq!(run_err(&mut session, "(+ 1 'a)").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(* #t 2)").kind(), ExcKind::RuntimeError);
}

/// `min`, `max`, and `abs`.
#[test]
fn extremum_and_abs() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(min 3 1 2)"), "1");
    assert_eq!(run(&mut session, "(max 3 1 2)"), "3");
    assert_eq!(run(&mut session, "(min 4)"), "4");
    assert_eq!(run(&mut session, "(abs -5)"), "5");
    assert_eq!(run(&mut session, "(abs 5)"), "5");
    assert_eq!(run_err(&mut session, "(min)").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(abs 1 2)").kind(), ExcKind::RuntimeError);
}

// =============================================================================
// 3. Comparisons and logic
// =============================================================================

/// Comparisons hold across every consecutive pair of arguments.
#[test]
fn comparisons_chain_pairwise() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(< 1 2 3)"), "#t");
    assert_eq!(run(&mut session, "(< 1 3 2)"), "#f");
    assert_eq!(run(&mut session, "(>= 3 3 2)"), "#t");
    assert_eq!(run(&mut session, "(= 2 2 2)"), "#t");
    assert_eq!(run(&mut session, "(> 5 3)"), "#t");
}

/// An empty or single-argument comparison holds vacuously.
#[test]
fn comparisons_hold_vacuously() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(<)"), "#t");
    assert_eq!(run(&mut session, "(< 1)"), "#t");
}

/// Comparing a non-number is a runtime error.
#[test]
fn comparisons_reject_non_numbers() {
    let mut session = Session::new();
    assert_eq!(run_err(&mut session, "(< 1 'a)").kind(), ExcKind::RuntimeError);
}

/// `not` answers `#t` only for `#f`; every other value is truthy.
#[test]
fn not_follows_strict_falsity() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(not #f)"), "#t");
    assert_eq!(run(&mut session, "(not #t)"), "#f");
    assert_eq!(run(&mut session, "(not 5)"), "#f");
    assert_eq!(run(&mut session, "(not '())"), "#f");
}

/// `and`/`or` return the argument that decided the outcome, unevaluated
/// arguments untouched.
#[test]
fn and_or_short_circuit() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(and)"), "#t");
    assert_eq!(run(&mut session, "(or)"), "#f");
    assert_eq!(run(&mut session, "(and 1 2)"), "2");
    assert_eq!(run(&mut session, "(and #f 2)"), "#f");
    assert_eq!(run(&mut session, "(or #f 5)"), "5");
    assert_eq!(run(&mut session, "(or #f #f)"), "#f");
    // The unreachable unbound name would raise NameError if evaluated.
    assert_eq!(run(&mut session, "(and #f missing)"), "#f");
    assert_eq!(run(&mut session, "(or 1 missing)"), "1");
}

// =============================================================================
// 4. Type predicates
// =============================================================================

/// The six type tests evaluate their argument and test the resulting value.
#[test]
fn type_predicates() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(number? 5)"), "#t");
    assert_eq!(run(&mut session, "(number? (+ 1 2))"), "#t");
    assert_eq!(run(&mut session, "(number? 'a)"), "#f");
    assert_eq!(run(&mut session, "(boolean? #f)"), "#t");
    assert_eq!(run(&mut session, "(boolean? 0)"), "#f");
    assert_eq!(run(&mut session, "(symbol? 'a)"), "#t");
    assert_eq!(run(&mut session, "(symbol? 5)"), "#f");
    assert_eq!(run(&mut session, "(pair? '(1 2))"), "#t");
    assert_eq!(run(&mut session, "(pair? '(1 . 2))"), "#t");
    assert_eq!(run(&mut session, "(pair? '())"), "#f");
    assert_eq!(run(&mut session, "(list? '(1 2))"), "#t");
    assert_eq!(run(&mut session, "(list? '())"), "#t");
    assert_eq!(run(&mut session, "(list? '(1 . 2))"), "#f");
    assert_eq!(run(&mut session, "(null? '())"), "#t");
    assert_eq!(run(&mut session, "(null? '(1))"), "#f");
}

/// A chain closed into a cycle is a pair but not a list.
#[test]
fn cyclic_chain_is_not_a_list() {
    let mut session = Session::new();
    run(&mut session, "(define p (cons 1 2))");
    run(&mut session, "(set-cdr! p p)");
    assert_eq!(run(&mut session, "(pair? p)"), "#t");
    assert_eq!(run(&mut session, "(list? p)"), "#f");
}

// =============================================================================
// 5. Pairs and lists
// =============================================================================

/// `cons`, `car`, and `cdr`.
#[test]
fn cons_car_cdr() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(cons 1 2)"), "(1 . 2)");
    assert_eq!(run(&mut session, "(car '(1 2))"), "1");
    assert_eq!(run(&mut session, "(cdr '(1 2))"), "(2)");
    assert_eq!(run(&mut session, "(cdr '(1))"), "()");
    assert_eq!(run(&mut session, "(cons 1 (cons 2 ()))"), "(1 2)");
}

/// `car`/`cdr` on anything but a pair is a runtime error.
#[test]
fn car_of_the_empty_list_fails() {
    let mut session = Session::new();
    assert_eq!(run_err(&mut session, "(car '())").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(cdr 5)").kind(), ExcKind::RuntimeError);
}

/// `list` builds a proper list of its evaluated arguments.
#[test]
fn list_builds_proper_lists() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(list)"), "()");
    assert_eq!(run(&mut session, "(list 1 2 3)"), "(1 2 3)");
    assert_eq!(run(&mut session, "(list (+ 1 2) (* 2 2))"), "(3 4)");
}

/// `list-ref` indexes, `list-tail` returns the suffix; the length itself is
/// a valid `list-tail` index yielding nil.
#[test]
fn list_ref_and_list_tail() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(list-ref '(1 2 3 4) 0)"), "1");
    assert_eq!(run(&mut session, "(list-ref '(1 2 3 4) 3)"), "4");
    assert_eq!(run(&mut session, "(list-tail '(1 2 3 4) 2)"), "(3 4)");
    assert_eq!(run(&mut session, "(list-tail '(1 2 3 4) 4)"), "()");
    assert_eq!(run_err(&mut session, "(list-ref '(1 2) 2)").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(list-tail '(1 2) 3)").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(list-ref '(1 . 2) 0)").kind(), ExcKind::RuntimeError);
}

/// `set-car!`/`set-cdr!` mutate the pair in place.
#[test]
fn pair_mutation_is_visible_through_the_binding() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(define p (cons 1 2))"), "()");
    assert_eq!(run(&mut session, "(set-car! p 10)"), "()");
    assert_eq!(run(&mut session, "p"), "(10 . 2)");
    assert_eq!(run(&mut session, "(set-cdr! p '(7))"), "()");
    assert_eq!(run(&mut session, "p"), "(10 7)");
    assert_eq!(run_err(&mut session, "(set-car! 5 1)").kind(), ExcKind::RuntimeError);
}

/// Shared structure is printed normally, not mistaken for a cycle.
#[test]
fn shared_structure_prints() {
    let mut session = Session::new();
    run(&mut session, "(define p (cons 1 2))");
    assert_eq!(run(&mut session, "(list p p)"), "((1 . 2) (1 . 2))");
}

/// Printing a chain that loops back into itself terminates with an error.
#[test]
fn printing_a_cycle_fails_cleanly() {
    let mut session = Session::new();
    run(&mut session, "(define p (cons 1 2))");
    run(&mut session, "(set-cdr! p p)");
    let err = run_err(&mut session, "p");
    assert_eq!(err.kind(), ExcKind::RuntimeError);
    assert!(err.message().contains("cyclic"), "got: {err}");
    // The binding itself is intact.
    assert_eq!(run(&mut session, "(car p)"), "1");
}

// =============================================================================
// 6. define and set!
// =============================================================================

/// Definitions persist across calls; `set!` rebinds in place.
#[test]
fn define_then_set_then_read() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(define x 10)"), "()");
    assert_eq!(run(&mut session, "(set! x 20)"), "()");
    assert_eq!(run(&mut session, "x"), "20");
}

/// Redefinition overwrites the existing binding.
#[test]
fn redefinition_overwrites() {
    let mut session = Session::new();
    run(&mut session, "(define x 1)");
    run(&mut session, "(define x 2)");
    assert_eq!(run(&mut session, "x"), "2");
}

/// `set!` on a name that was never bound is a name error.
#[test]
fn set_of_undefined_name_fails() {
    let mut session = Session::new();
    let err = run_err(&mut session, "(set! ghost 1)");
    assert_eq!(err.kind(), ExcKind::NameError);
}

/// Reading an unbound variable is a name error.
#[test]
fn unbound_variable_fails() {
    let mut session = Session::new();
    let err = run_err(&mut session, "foo");
    assert_eq!(err.kind(), ExcKind::NameError);
    assert!(err.message().contains("foo"), "got: {err}");
    assert_eq!(run_err(&mut session, "(+ 1 bar)").kind(), ExcKind::NameError);
}

/// The top-level scope keeps bindings established before a failed call.
#[test]
fn failed_call_keeps_earlier_effects() {
    let mut session = Session::new();
    run(&mut session, "(define x 1)");
    run_err(&mut session, "(car '())");
    assert_eq!(run(&mut session, "x"), "1");
}

/// Bound top-level names are listed in binding order.
#[test]
fn variables_lists_bindings_in_order() {
    let mut session = Session::new();
    run(&mut session, "(define alpha 1)");
    run(&mut session, "(define beta 2)");
    assert_eq!(session.variables(), vec!["alpha".to_owned(), "beta".to_owned()]);
}

// =============================================================================
// 7. if
// =============================================================================

/// `if` takes a boolean test, a consequent, and an optional alternate.
#[test]
fn if_selects_a_branch() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(if (> 5 3) 'yes 'no)"), "yes");
    assert_eq!(run(&mut session, "(if (< 5 3) 'yes 'no)"), "no");
    assert_eq!(run(&mut session, "(if #f 'yes)"), "()");
}

/// Only the selected branch is evaluated.
#[test]
fn if_skips_the_untaken_branch() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(if #t 1 missing)"), "1");
    assert_eq!(run(&mut session, "(if #f missing 2)"), "2");
}

/// A non-boolean test and bad arities are syntax errors.
#[test]
fn if_rejects_bad_shapes() {
    let mut session = Session::new();
    assert_eq!(run_err(&mut session, "(if 1 2 3)").kind(), ExcKind::SyntaxError);
    assert_eq!(run_err(&mut session, "(if #t)").kind(), ExcKind::SyntaxError);
    assert_eq!(run_err(&mut session, "(if #t 1 2 3)").kind(), ExcKind::SyntaxError);
}

// =============================================================================
// 8. Lambdas and application
// =============================================================================

/// Immediate application of a literal lambda.
#[test]
fn literal_lambda_applies() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "((lambda (x y) (+ x y)) 3 4)"), "7");
    assert_eq!(run(&mut session, "((lambda () 42))"), "42");
}

/// The function shorthand of `define` desugars to a named lambda.
#[test]
fn define_function_shorthand() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "(define (square n) (* n n))"), "()");
    assert_eq!(run(&mut session, "(square 7)"), "49");
}

/// Self-recursion through the defined name.
#[test]
fn recursive_factorial() {
    let mut session = Session::new();
    assert_eq!(
        run(&mut session, "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))"),
        "()"
    );
    assert_eq!(run(&mut session, "(fact 5)"), "120");
    assert_eq!(run(&mut session, "(fact 10)"), "3628800");
}

/// Double recursion.
#[test]
fn recursive_fibonacci() {
    let mut session = Session::new();
    run(
        &mut session,
        "(define (fib n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2)))))",
    );
    assert_eq!(run(&mut session, "(fib 10)"), "55");
}

/// A lambda pulled through a variable stays callable, and repeated calls of
/// a pure lambda agree.
#[test]
fn pure_lambdas_are_deterministic() {
    let mut session = Session::new();
    run(&mut session, "(define twice (lambda (x) (* 2 x)))");
    assert_eq!(run(&mut session, "(twice 21)"), "42");
    assert_eq!(run(&mut session, "(twice 21)"), "42");
}

/// A closure reads the environment captured at its definition, not the
/// caller's.
#[test]
fn closure_captures_definition_environment() {
    let mut session = Session::new();
    run(&mut session, "(define (make-adder n) (lambda (m) (+ m n)))");
    run(&mut session, "(define add5 (make-adder 5))");
    assert_eq!(run(&mut session, "(add5 3)"), "8");
    assert_eq!(run(&mut session, "(add5 -5)"), "0");
}

/// The operator position may itself be a call that returns a procedure.
#[test]
fn operator_position_may_be_a_call() {
    let mut session = Session::new();
    run(&mut session, "(define (make-adder n) (lambda (m) (+ m n)))");
    assert_eq!(run(&mut session, "((make-adder 5) 3)"), "8");
}

/// A lambda's environment snaps once, at its first evaluation: the body of
/// `make-adder` is a single lambda node, so a second call hands back the
/// closure fixed by the first.
#[test]
fn lambda_capture_is_fixed_at_first_evaluation() {
    let mut session = Session::new();
    run(&mut session, "(define (make-adder n) (lambda (m) (+ m n)))");
    run(&mut session, "(define add5 (make-adder 5))");
    run(&mut session, "(define add10 (make-adder 10))");
    assert_eq!(run(&mut session, "(add10 1)"), "6");
}

/// The captured environment is a snapshot of the defining frame: rebinding
/// the outer variable afterwards is not observed.
#[test]
fn capture_snapshots_the_defining_frame() {
    let mut session = Session::new();
    run(&mut session, "(define x 1)");
    run(&mut session, "(define f (lambda () x))");
    run(&mut session, "(set! x 2)");
    assert_eq!(run(&mut session, "(f)"), "1");
    assert_eq!(run(&mut session, "x"), "2");
}

/// An internal definition is visible to the result expression.
#[test]
fn internal_define_binds_in_the_call_frame() {
    let mut session = Session::new();
    assert_eq!(run(&mut session, "((lambda (x) (define y 10) (+ x y)) 5)"), "15");
}

/// An internal function definition can recurse.
#[test]
fn internal_function_definition_recurses() {
    let mut session = Session::new();
    run(
        &mut session,
        "(define (count-down n) (define (helper k) (if (= k 0) 'done (helper (- k 1)))) (helper n))",
    );
    assert_eq!(run(&mut session, "(count-down 5)"), "done");
}

/// Mutable state threaded through a closure with `set!`.
#[test]
fn closure_state_advances_with_set() {
    let mut session = Session::new();
    run(
        &mut session,
        "(define (make-counter) (define n 0) (lambda () (set! n (+ n 1)) n))",
    );
    run(&mut session, "(define tick (make-counter))");
    assert_eq!(run(&mut session, "(tick)"), "1");
    assert_eq!(run(&mut session, "(tick)"), "2");
    assert_eq!(run(&mut session, "(tick)"), "3");
}

/// Calling with the wrong number of arguments is a runtime error.
#[test]
fn arity_mismatch_fails() {
    let mut session = Session::new();
    run(&mut session, "(define (one x) x)");
    assert_eq!(run_err(&mut session, "(one)").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(one 1 2)").kind(), ExcKind::RuntimeError);
}

/// Applying a non-procedure is a runtime error.
#[test]
fn applying_a_non_procedure_fails() {
    let mut session = Session::new();
    run(&mut session, "(define x 5)");
    assert_eq!(run_err(&mut session, "(x 1)").kind(), ExcKind::RuntimeError);
}

// =============================================================================
// 9. Top-level shapes and printing errors
// =============================================================================

/// The empty list and bare data lists are not valid top-level expressions.
#[test]
fn bare_lists_are_rejected_at_top_level() {
    let mut session = Session::new();
    assert_eq!(run_err(&mut session, "()").kind(), ExcKind::RuntimeError);
    assert_eq!(run_err(&mut session, "(1 2 3)").kind(), ExcKind::RuntimeError);
}

/// Procedures have no printed form.
#[test]
fn procedures_cannot_be_printed() {
    let mut session = Session::new();
    assert_eq!(run_err(&mut session, "(lambda (x) x)").kind(), ExcKind::NameError);
    run(&mut session, "(define f (lambda (x) x))");
    assert_eq!(run_err(&mut session, "f").kind(), ExcKind::NameError);
}

// =============================================================================
// 10. Resource limits
// =============================================================================

/// A recursion depth cap turns runaway recursion into a runtime error.
#[test]
fn recursion_depth_cap_raises_instead_of_overflowing() {
    let mut session = Session::with_limits(ResourceLimits::with_max_recursion_depth(64));
    run(&mut session, "(define (loop n) (loop (+ n 1)))");
    let err = run_err(&mut session, "(loop 0)");
    assert_eq!(err.kind(), ExcKind::RuntimeError);
    assert!(err.message().contains("recursion depth"), "got: {err}");
}

/// The cap leaves ordinary nesting untouched.
#[test]
fn recursion_depth_cap_spares_ordinary_programs() {
    let mut session = Session::with_limits(ResourceLimits::with_max_recursion_depth(256));
    run(&mut session, "(define (fact n) (if (= n 0) 1 (* n (fact (- n 1)))))");
    assert_eq!(run(&mut session, "(fact 10)"), "3628800");
}
