use tansy::{BootTool, Interpreter, TansyError};

fn eval_render(source: &str) -> String {
    let mut interpreter = Interpreter::new();
    let value = interpreter
        .eval_source(source)
        .expect("evaluation should succeed");
    interpreter.heap().render(value)
}

fn eval_int(source: &str) -> i64 {
    let mut interpreter = Interpreter::new();
    let value = interpreter
        .eval_source(source)
        .expect("evaluation should succeed");
    interpreter
        .heap()
        .integer_value(value)
        .expect("result should be an integer")
}

fn eval_error(source: &str) -> String {
    let mut interpreter = Interpreter::new();
    match interpreter.eval_source(source) {
        Ok(value) => panic!(
            "expected error, received value {}",
            interpreter.heap().render(value)
        ),
        Err(err) => err.to_string(),
    }
}

#[test]
fn arithmetic_builtins() {
    assert_eq!(eval_int("(+ 1 2 3)"), 6);
    assert_eq!(eval_int("(* 2 3 4)"), 24);
    assert_eq!(eval_int("(- 10 3 2)"), 5);
    assert_eq!(eval_int("(- 5)"), -5);
    assert_eq!(eval_int("(/ 7 2)"), 3);
    assert_eq!(eval_int("(/ -7 2)"), -3);
    assert_eq!(eval_int("(modulo 7 3)"), 1);
    assert_eq!(eval_int("(+)"), 0);
    assert_eq!(eval_int("(*)"), 1);
}

#[test]
fn arithmetic_errors() {
    assert!(eval_error("(/ 1 0)").contains("division by zero"));
    assert!(eval_error("(modulo 1 0)").contains("modulo by zero"));
    assert!(eval_error("(-)").contains("at least one argument"));
    assert!(eval_error("(+ 1 (quote a))").contains("expected Integer, found Symbol"));
}

#[test]
fn quote_returns_data_unevaluated() {
    assert_eq!(eval_render("(quote (1 2 3))"), "(1 2 3)");
    assert_eq!(eval_render("(quote some-symbol)"), "some-symbol");
    assert_eq!(eval_render("(quote (quote x))"), "(quote x)");
}

#[test]
fn literals_evaluate_to_themselves() {
    assert_eq!(eval_render("42"), "42");
    assert_eq!(eval_render("-17"), "-17");
    assert_eq!(eval_render("\"hi\\nthere\""), "\"hi\\nthere\"");
    assert_eq!(eval_render("#t"), "#t");
    assert_eq!(eval_render("()"), "()");
}

#[test]
fn if_selects_branch_and_skips_the_other() {
    assert_eq!(eval_int("(if #t 1 2)"), 1);
    assert_eq!(eval_int("(if #f 1 2)"), 2);
    // The untaken branch must never evaluate.
    assert_eq!(eval_int("(if #t 1 (/ 1 0))"), 1);
    assert_eq!(eval_int("(if (lt? 1 2) 10 20)"), 10);
}

#[test]
fn if_condition_must_be_a_bool() {
    let message = eval_error("(if 1 2 3)");
    assert!(message.contains("expected Bool, found Integer"), "{message}");
}

#[test]
fn letlambdas_basic_application() {
    assert_eq!(
        eval_render("((letlambdas ( ((myfunc x y) (cons x y)) ) myfunc) 1 2)"),
        "(1 . 2)"
    );
}

#[test]
fn letlambdas_mutual_recursion() {
    let source = "
        (letlambdas (
            ((even? n) (if (eq? n 0) #t (odd? (- n 1))))
            ((odd? n) (if (eq? n 0) #f (even? (- n 1)))))
          (even? 101))
    ";
    assert_eq!(eval_render(source), "#f");
}

#[test]
fn closures_capture_their_definition_environment() {
    // inner sees the x that existed where it was defined, not the caller's.
    let source = "
        (letlambdas (
            ((make x) (letlambdas ( ((inner y) (+ x y)) ) inner))
            ((call f x) (f 10)))
          (call (make 1) 100))
    ";
    assert_eq!(eval_int(source), 11);
}

#[test]
fn inner_bindings_shadow_outer_ones() {
    let source = "
        (letlambdas ( ((f x) (letlambdas ( ((g x) x) ) (g 2))) )
          (f 1))
    ";
    assert_eq!(eval_int(source), 2);
}

#[test]
fn import_resolves_core_builtins() {
    assert_eq!(eval_int("((import core +) 1 2)"), 3);
    assert_eq!(eval_render("((import core cons?) (quote (1)))"), "#t");
}

#[test]
fn import_rejects_unknown_names() {
    assert!(eval_error("(import shmore +)").contains("unknown module `shmore`"));
    assert!(eval_error("(import core launch-missiles)")
        .contains("unknown core import `launch-missiles`"));
}

#[test]
fn tail_calls_run_in_constant_stack() {
    let source = "
        (letlambdas ( ((loop n) (if (eq? n 0) (quote done) (loop (- n 1)))) )
          (loop 100000))
    ";
    assert_eq!(eval_render(source), "done");
}

#[test]
fn moderate_non_tail_recursion_succeeds_within_the_limit() {
    let source = "
        (letlambdas ( ((sum n) (if (eq? n 0) 0 (+ 1 (sum (- n 1))))) )
          (sum 100))
    ";
    assert_eq!(eval_int(source), 100);
}

#[test]
fn non_tail_recursion_hits_the_depth_limit() {
    let source = "
        (letlambdas ( ((sum n) (if (eq? n 0) 0 (+ 1 (sum (- n 1))))) )
          (sum 100000))
    ";
    assert!(eval_error(source).contains("recursion limit exceeded"));
}

#[test]
fn errors_carry_an_evaluation_trace() {
    let message = eval_error("(cons 1 (no-such-binding))");
    assert!(message.contains("unbound symbol `no-such-binding`"), "{message}");
    assert!(message.contains("evaluating (no-such-binding)"), "{message}");
    assert!(message.contains("evaluating (cons 1 (no-such-binding))"), "{message}");
}

#[test]
fn trace_notes_show_bindings_the_frame_mentions() {
    let message = eval_error("(letlambdas ( ((f x) (+ x (quote a))) ) (f 1))");
    assert!(message.contains("expected Integer, found Symbol"), "{message}");
    assert!(message.contains("where x = 1"), "{message}");
}

#[test]
fn calling_a_non_function_reports_the_value() {
    let message = eval_error("((quote 5) 1)");
    assert!(message.contains("calling non-function value `5`"), "{message}");
}

#[test]
fn arity_is_checked_exactly() {
    let message = eval_error("((letlambdas ( ((f x y) x) ) f) 1)");
    assert!(
        message.contains("arity mismatch: expected 2 arguments, received 1"),
        "{message}"
    );
}

#[test]
fn equality_is_structural() {
    assert_eq!(eval_render("(eq? (cons 1 (cons 2 ())) (quote (1 2)))"), "#t");
    assert_eq!(eval_render("(eq? (quote (1 2)) (quote (1 3)))"), "#f");
    assert_eq!(eval_render("(eq? \"ab\" (concat \"a\" \"b\"))"), "#t");
    assert_eq!(eval_render("(eq? 1 \"1\")"), "#f");
}

#[test]
fn string_builtins() {
    assert_eq!(eval_render("(concat \"foo\" \"-\" \"bar\")"), "\"foo-bar\"");
    assert_eq!(
        eval_render("(split \"abcdef\" 2 3)"),
        "(\"ab\" \"cde\" \"f\")"
    );
    assert_eq!(eval_render("(split \"abc\")"), "(\"abc\")");
    assert!(eval_error("(split \"abc\" 5)").contains("string index out of bounds"));
    assert!(eval_error("(split \"abc\" -1)").contains("string index out of bounds"));
}

#[test]
fn symbol_builtins_round_trip_through_the_intern_table() {
    assert_eq!(eval_render("(sym-name (quote hello))"), "\"hello\"");
    assert_eq!(eval_render("(eq? (make-symbol \"foo\") (quote foo))"), "#t");
    assert_eq!(eval_render("(type (quote x))"), "Symbol");
    assert_eq!(eval_render("(type \"x\")"), "String");
    assert_eq!(eval_render("(type (quote (1)))"), "Cons");
}

#[test]
fn run_source_folds_defines_into_one_recursive_group() {
    let mut interpreter = Interpreter::new();
    let source = "
        (define (double x) ((import core +) x x))
        (define (quad x) (double (double x)))
        (quad 5)
    ";
    let value = interpreter.run_source(source).expect("program should run");
    assert_eq!(interpreter.heap().integer_value(value).unwrap(), 20);
}

#[test]
fn run_source_programs_start_from_the_empty_environment() {
    let mut interpreter = Interpreter::new();
    // Builtins are only reachable through import, never bound implicitly.
    let err = interpreter.run_source("(+ 1 2)").unwrap_err();
    assert!(err.to_string().contains("unbound symbol `+`"));
}

#[test]
fn serialize_round_trips_through_the_live_interpreter() {
    let mut interpreter = Interpreter::new();
    let original = interpreter
        .parse("(some-random-symbol 1 42 129 4 5)")
        .expect("parse");
    let blob = interpreter.serialize(original).expect("serialize");
    let decoded = interpreter.deserialize(&blob).expect("deserialize");
    assert!(interpreter.heap().equal(decoded, original));
    // Decoded symbols re-intern to the same identity.
    let sym = interpreter.heap_mut().intern("some-random-symbol");
    assert_eq!(interpreter.heap().first(decoded).unwrap(), sym);
}

#[test]
fn default_pretty_printer_renders_values() {
    let mut interpreter = Interpreter::new();
    let value = interpreter.eval_source("(cons 1 (quote (2 3)))").expect("eval");
    assert_eq!(interpreter.pretty(value, 0).expect("pretty"), "(1 2 3)");

    let value = interpreter.eval_source("(- 0 17)").expect("eval");
    assert_eq!(interpreter.pretty(value, 0).expect("pretty"), "-17");

    let value = interpreter.eval_source("(cons 1 2)").expect("eval");
    assert_eq!(interpreter.pretty(value, 0).expect("pretty"), "(1 . 2)");
}

#[test]
fn default_transformer_passes_single_expressions_through() {
    let mut interpreter = Interpreter::new();
    let forms = interpreter.parse_multi("(quote (a b))").expect("parse");
    let transformed = interpreter.transform(forms).expect("transform");
    let expected = interpreter.parse("(quote (a b))").expect("parse");
    assert!(interpreter.heap().equal(transformed, expected));
}

#[test]
fn installed_tools_replace_the_embedded_blobs() {
    let mut interpreter = Interpreter::new();
    let tool = interpreter
        .parse("(letlambdas ( ((tool value indent) \"custom\") ) tool)")
        .expect("parse");
    let blob = interpreter.serialize(tool).expect("serialize");
    interpreter.install_tool(BootTool::PrettyPrint, blob);
    let value = interpreter.eval_source("42").expect("eval");
    assert_eq!(interpreter.pretty(value, 0).expect("pretty"), "custom");
}

#[test]
fn bootstrap_blob_must_evaluate_to_a_callable() {
    let mut interpreter = Interpreter::new();
    let not_callable = interpreter.parse("42").expect("parse");
    let blob = interpreter.serialize(not_callable).expect("serialize");
    interpreter.install_tool(BootTool::Transform, blob);
    let forms = interpreter.parse_multi("1").expect("parse");
    let err = interpreter.transform(forms).unwrap_err();
    assert!(err.to_string().contains("expected a callable"));
}

#[test]
fn parse_errors_are_parser_diagnostics() {
    let mut interpreter = Interpreter::new();
    match interpreter.eval_source("(1 2").unwrap_err() {
        TansyError::Diagnostic(diagnostic) => {
            assert_eq!(diagnostic.kind, tansy::DiagnosticKind::Parser);
        }
        other => panic!("expected diagnostic, found {other}"),
    }
}
