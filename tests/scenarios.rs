// ABOUTME: End-to-end scenario tests exercising the full lex/parse/resolve/interpret pipeline

use lox::ast::Stmt;
use lox::error::Diagnostics;
use lox::interpreter::Interpreter;
use lox::value::Value;
use lox::{lexer, parser, resolver};

/// Runs a full program through the pipeline and hands back the interpreter
/// so callers can inspect global state after the run.
fn run(source: &str) -> (Interpreter, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let tokens = lexer::scan(source, &mut diagnostics);
    let statements = parser::parse(tokens, &mut diagnostics);
    assert!(!diagnostics.had_error(), "expected {} to parse cleanly", source);

    let resolutions = resolver::resolve(&statements, &mut diagnostics);
    assert!(!diagnostics.had_error(), "expected {} to resolve cleanly", source);

    let mut interpreter = Interpreter::new(resolutions);
    let result = interpreter.interpret(&statements);
    assert!(result.is_ok(), "expected {} to run cleanly: {:?}", source, result.err());
    (interpreter, diagnostics)
}

/// Evaluates a program that is exactly one trailing expression statement and
/// returns its value, reusing the same driver the REPL's auto-print uses.
fn eval_last_expression(source: &str) -> Value {
    let mut diagnostics = Diagnostics::new();
    let tokens = lexer::scan(source, &mut diagnostics);
    let statements = parser::parse(tokens, &mut diagnostics);
    assert!(!diagnostics.had_error(), "expected {} to parse cleanly", source);

    let resolutions = resolver::resolve(&statements, &mut diagnostics);
    assert!(!diagnostics.had_error(), "expected {} to resolve cleanly", source);

    let mut interpreter = Interpreter::new(resolutions);
    let (last, rest) = statements.split_last().expect("at least one statement");
    interpreter.interpret(rest).expect("leading statements must run cleanly");

    match last {
        Stmt::Expression(expr) => interpreter
            .interpret_expression(expr)
            .expect("trailing expression must evaluate cleanly"),
        other => panic!("expected a trailing expression statement, got {:?}", other),
    }
}

#[test]
fn arithmetic_precedence() {
    let value = eval_last_expression("1 + 2 * 3;");
    assert!(matches!(value, Value::Number(n) if n == 7.0));
}

#[test]
fn top_level_var_redefinition_is_legal() {
    let (interpreter, _) = run("var a = \"hi\"; var a = a + \" there\";");
    match interpreter.globals.get("a") {
        Some(Value::String(s)) => assert_eq!(s, "hi there"),
        other => panic!("expected String(\"hi there\"), got {:?}", other),
    }
}

#[test]
fn closures_preserve_mutable_captured_state_across_calls() {
    let (mut interpreter, _) = run(
        "fun counter() { var i = 0; fun inc() { i = i + 1; return i; } return inc; } var c = counter();",
    );
    let mut call_c = || -> Value {
        let mut diagnostics = Diagnostics::new();
        let tokens = lexer::scan("c();", &mut diagnostics);
        let statements = parser::parse(tokens, &mut diagnostics);
        let resolutions = resolver::resolve(&statements, &mut diagnostics);
        interpreter.set_resolutions(resolutions);
        match &statements[0] {
            Stmt::Expression(expr) => interpreter.interpret_expression(expr).unwrap(),
            _ => unreachable!(),
        }
    };

    assert!(matches!(call_c(), Value::Number(n) if n == 1.0));
    assert!(matches!(call_c(), Value::Number(n) if n == 2.0));
    assert!(matches!(call_c(), Value::Number(n) if n == 3.0));
}

#[test]
fn single_inheritance_super_call_chains_method_bodies() {
    let value = eval_last_expression(
        "class A { greet() { return \"A\"; } } \
         class B < A { greet() { return super.greet() + \"B\"; } } \
         B().greet();",
    );
    assert!(matches!(value, Value::String(s) if s == "AB"));
}

#[test]
fn initializer_sets_fields_and_construction_returns_the_instance() {
    let value = eval_last_expression("class P { init(x) { this.x = x; } } P(42).x;");
    assert!(matches!(value, Value::Number(n) if n == 42.0));
}

#[test]
fn bare_return_inside_initializer_still_yields_the_instance() {
    let value = eval_last_expression(
        "class P { init(x) { this.x = x; return; } } P(7).x;",
    );
    assert!(matches!(value, Value::Number(n) if n == 7.0));
}

#[test]
fn break_exits_exactly_one_enclosing_loop() {
    let (interpreter, _) =
        run("var i = 0; while (true) { i = i + 1; if (i == 3) break; }");
    match interpreter.globals.get("i") {
        Some(Value::Number(n)) => assert_eq!(n, 3.0),
        other => panic!("expected Number(3.0), got {:?}", other),
    }
}

#[test]
fn continue_skips_to_the_next_condition_check() {
    let (interpreter, _) = run(
        "var sum = 0; var i = 0; while (i < 5) { i = i + 1; if (i == 3) continue; sum = sum + i; }",
    );
    // 1 + 2 + 4 + 5 = 12; the i == 3 iteration is skipped before the add.
    match interpreter.globals.get("sum") {
        Some(Value::Number(n)) => assert_eq!(n, 12.0),
        other => panic!("expected Number(12.0), got {:?}", other),
    }
}

#[test]
fn logical_or_short_circuits_and_yields_the_deciding_operand() {
    let value = eval_last_expression("nil or 3;");
    assert!(matches!(value, Value::Number(n) if n == 3.0));
}

#[test]
fn logical_and_never_evaluates_its_right_operand_when_left_is_falsy() {
    let (interpreter, _) = run(
        "var called = false; fun mark() { called = true; return true; } false and mark();",
    );
    match interpreter.globals.get("called") {
        Some(Value::Bool(b)) => assert!(!b, "right-hand side of 'and' must not run"),
        other => panic!("expected Bool(false), got {:?}", other),
    }
}

#[test]
fn reading_a_local_in_its_own_initializer_is_a_compile_time_error() {
    let mut diagnostics = Diagnostics::new();
    let source = "{ var x = 1; { var x = x + 1; print x; } }";
    let tokens = lexer::scan(source, &mut diagnostics);
    let statements = parser::parse(tokens, &mut diagnostics);
    assert!(!diagnostics.had_error());
    resolver::resolve(&statements, &mut diagnostics);
    assert!(diagnostics.had_error());
}
