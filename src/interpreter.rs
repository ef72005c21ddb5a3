// ABOUTME: Tree-walking evaluator: executes statements and evaluates expressions

use crate::ast::{Expr, ExprKind, LiteralValue, Stmt};
use crate::env::Environment;
use crate::error::RuntimeError;
use crate::resolver::ResolutionTable;
use crate::stdlib;
use crate::token::{Token, TokenKind};
use crate::value::{Class, Instance, UserFunction, Value};
use std::collections::HashMap;
use std::rc::Rc;

/// A non-local exit propagated up through `execute`/`evaluate` via `Result`.
/// `Return`/`Break`/`Continue` are caught by the frame that lexically owns
/// them (a function call for `Return`, a loop body for `Break`/`Continue`);
/// anything that escapes its owning frame is converted into a `RuntimeError`
/// at that boundary rather than allowed to keep unwinding.
enum Unwind {
    Return(Value),
    Break(Token),
    Continue(Token),
    Error(RuntimeError),
}

type EvalResult = Result<Value, Unwind>;
type ExecResult = Result<(), Unwind>;

fn runtime_err(token: Token, message: impl Into<String>) -> Unwind {
    Unwind::Error(RuntimeError::new(token, message))
}

fn literal_to_value(value: &LiteralValue) -> Value {
    match value {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::String(s.clone()),
        LiteralValue::Bool(b) => Value::Bool(*b),
        LiteralValue::Nil => Value::Nil,
    }
}

/// Walks the resolved AST, threading an `Rc<Environment>` chain for
/// variable scope and reporting runtime errors through the caller-supplied
/// sink. One `Interpreter` is built per top-level resolution pass; a REPL
/// reuses the same instance across lines so top-level bindings persist.
pub struct Interpreter {
    pub globals: Rc<Environment>,
    environment: Rc<Environment>,
    resolutions: ResolutionTable,
}

impl Interpreter {
    pub fn new(resolutions: ResolutionTable) -> Self {
        let globals = Environment::new();
        stdlib::register(&globals);
        Interpreter {
            globals: globals.clone(),
            environment: globals,
            resolutions,
        }
    }

    /// Replaces the resolution table in place, for a REPL that re-resolves
    /// each line against the accumulated program so far.
    pub fn set_resolutions(&mut self, resolutions: ResolutionTable) {
        self.resolutions = resolutions;
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            match self.execute(stmt) {
                Ok(()) => {}
                Err(Unwind::Error(err)) => return Err(err),
                Err(Unwind::Break(token)) => {
                    return Err(RuntimeError::new(token, "Unexpected 'break' outside a loop."))
                }
                Err(Unwind::Continue(token)) => {
                    return Err(RuntimeError::new(
                        token,
                        "Unexpected 'continue' outside a loop.",
                    ))
                }
                Err(Unwind::Return(_)) => {
                    // The resolver rejects top-level `return`; reaching here
                    // would be an engine bug, not a program under test.
                    unreachable!("resolver guarantees no top-level 'return'");
                }
            }
        }
        Ok(())
    }

    /// Evaluates a single expression for the REPL's auto-print path. A bare
    /// expression statement can never produce a non-local jump.
    pub fn interpret_expression(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match self.evaluate(expr) {
            Ok(value) => Ok(value),
            Err(Unwind::Error(err)) => Err(err),
            Err(_) => unreachable!("a bare expression cannot produce a non-local jump"),
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(())
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                println!("{}", value);
                Ok(())
            }
            Stmt::Var(name, initializer) => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.environment.define(name.lexeme.clone(), value);
                Ok(())
            }
            Stmt::Block(statements) => {
                let scope = self.environment.extend();
                self.execute_block(statements, scope)
            }
            Stmt::If(condition, then_branch, else_branch) => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }
            Stmt::While(condition, body) => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Unwind::Break(_)) => break,
                        Err(Unwind::Continue(_)) => continue,
                        Err(other) => return Err(other),
                    }
                }
                Ok(())
            }
            Stmt::For(init, condition, increment, body) => {
                self.execute_for(init.as_deref(), condition, increment, body)
            }
            Stmt::Return(_, value) => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Err(Unwind::Return(value))
            }
            Stmt::Break(token) => Err(Unwind::Break(token.clone())),
            Stmt::Continue(token) => Err(Unwind::Continue(token.clone())),
            Stmt::Function(func) => {
                let name = func
                    .name
                    .as_ref()
                    .expect("a Stmt::Function always carries a name")
                    .lexeme
                    .clone();
                let function = Rc::new(UserFunction {
                    name: Some(name.clone()),
                    declaration: func.clone(),
                    closure: self.environment.clone(),
                    is_initializer: false,
                });
                self.environment.define(name, Value::Function(function));
                Ok(())
            }
            Stmt::Class(name, superclass_expr, methods) => {
                self.execute_class(name, superclass_expr.as_ref(), methods)
            }
        }
    }

    /// A `for` loop runs its own initializer in a fresh scope that outlives
    /// the loop, matching the desugared-to-`while` semantics without
    /// actually desugaring (`for` stays a native AST node).
    fn execute_for(
        &mut self,
        init: Option<&Stmt>,
        condition: &Option<Expr>,
        increment: &Option<Expr>,
        body: &Stmt,
    ) -> ExecResult {
        let loop_scope = self.environment.extend();
        let previous = std::mem::replace(&mut self.environment, loop_scope);

        let result = (|| -> ExecResult {
            if let Some(init) = init {
                self.execute(init)?;
            }
            loop {
                let should_continue = match condition {
                    Some(cond) => self.evaluate(cond)?.is_truthy(),
                    None => true,
                };
                if !should_continue {
                    break;
                }
                match self.execute(body) {
                    Ok(()) => {}
                    Err(Unwind::Break(_)) => break,
                    Err(Unwind::Continue(_)) => {}
                    Err(other) => return Err(other),
                }
                if let Some(increment) = increment {
                    self.evaluate(increment)?;
                }
            }
            Ok(())
        })();

        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass_expr: Option<&Expr>,
        methods: &[Rc<crate::ast::FunctionExpr>],
    ) -> ExecResult {
        let superclass = match superclass_expr {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token = superclass_token(expr);
                    return Err(runtime_err(token, "Superclass must be a class."));
                }
            },
            None => None,
        };

        self.environment.define(name.lexeme.clone(), Value::Nil);

        let method_scope = match &superclass {
            Some(superclass) => {
                let scope = self.environment.extend();
                scope.define("super".to_string(), Value::Class(superclass.clone()));
                scope
            }
            None => self.environment.clone(),
        };

        let mut method_map = HashMap::new();
        for method in methods {
            let method_name = method
                .name
                .as_ref()
                .expect("class methods always carry a name")
                .lexeme
                .clone();
            let is_initializer = method_name == "init";
            let function = Rc::new(UserFunction {
                name: Some(method_name.clone()),
                declaration: method.clone(),
                closure: method_scope.clone(),
                is_initializer,
            });
            method_map.insert(method_name, function);
        }

        let class = Rc::new(Class {
            name: name.lexeme.clone(),
            superclass,
            methods: method_map,
        });

        self.environment.assign(&name.lexeme, Value::Class(class));
        Ok(())
    }

    /// Runs `statements` with `scope` as the active environment, restoring
    /// the previous environment on every exit path, including abrupt ones.
    fn execute_block(&mut self, statements: &[Stmt], scope: Rc<Environment>) -> ExecResult {
        let previous = std::mem::replace(&mut self.environment, scope);
        let result = (|| {
            for stmt in statements {
                self.execute(stmt)?;
            }
            Ok(())
        })();
        self.environment = previous;
        result
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::Literal(value) => Ok(literal_to_value(value)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary(op, right) => self.evaluate_unary(op, right),
            ExprKind::Binary(left, op, right) => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                self.evaluate_binary(op, left, right)
            }
            ExprKind::Logical(left, op, right) => self.evaluate_logical(left, op, right),
            ExprKind::Variable(name) => self.look_up_variable(name, expr.id),
            ExprKind::Assign(name, value) => self.evaluate_assign(name, value, expr.id),
            ExprKind::Call(callee, paren, args) => self.evaluate_call(callee, paren, args),
            ExprKind::Get(object, name) => self.evaluate_get(object, name),
            ExprKind::Set(object, name, value) => self.evaluate_set(object, name, value),
            ExprKind::This(keyword) => self.look_up_variable(keyword, expr.id),
            ExprKind::Super(keyword, method) => self.evaluate_super(keyword, method, expr.id),
            ExprKind::Function(func) => {
                let function = Rc::new(UserFunction {
                    name: func.name.as_ref().map(|t| t.lexeme.clone()),
                    declaration: func.clone(),
                    closure: self.environment.clone(),
                    is_initializer: false,
                });
                if let Some(name) = &func.name {
                    self.environment
                        .define(name.lexeme.clone(), Value::Function(function.clone()));
                }
                Ok(Value::Function(function))
            }
        }
    }

    fn evaluate_unary(&mut self, op: &Token, right: &Expr) -> EvalResult {
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Minus => match right {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(runtime_err(op.clone(), "Operand must be a number.")),
            },
            TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
            _ => unreachable!("parser only emits Minus/Bang as unary operators"),
        }
    }

    fn evaluate_logical(&mut self, left: &Expr, op: &Token, right: &Expr) -> EvalResult {
        let left = self.evaluate(left)?;
        match op.kind {
            TokenKind::Or if left.is_truthy() => Ok(left),
            TokenKind::And if !left.is_truthy() => Ok(left),
            TokenKind::Or | TokenKind::And => self.evaluate(right),
            _ => unreachable!("parser only emits Or/And as logical operators"),
        }
    }

    fn evaluate_binary(&self, op: &Token, left: Value, right: Value) -> EvalResult {
        use TokenKind::*;
        match op.kind {
            Minus => numeric_op(op, left, right, |a, b| a - b),
            Slash => numeric_op(op, left, right, |a, b| a / b),
            Star => numeric_op(op, left, right, |a, b| a * b),
            Plus => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(runtime_err(
                    op.clone(),
                    "Operands must be two numbers or two strings.",
                )),
            },
            Greater => compare_op(op, left, right, |a, b| a > b),
            GreaterEqual => compare_op(op, left, right, |a, b| a >= b),
            Less => compare_op(op, left, right, |a, b| a < b),
            LessEqual => compare_op(op, left, right, |a, b| a <= b),
            EqualEqual => Ok(Value::Bool(left.is_equal(&right))),
            BangEqual => Ok(Value::Bool(!left.is_equal(&right))),
            _ => unreachable!("parser only emits arithmetic/comparison/equality operators"),
        }
    }

    fn look_up_variable(&self, name: &Token, expr_id: crate::ast::ExprId) -> EvalResult {
        match self.resolutions.get(&expr_id) {
            Some(&depth) => Ok(self.environment.get_at(depth, &name.lexeme)),
            None => self.globals.get(&name.lexeme).ok_or_else(|| {
                runtime_err(name.clone(), format!("Undefined variable '{}'.", name.lexeme))
            }),
        }
    }

    fn evaluate_assign(
        &mut self,
        name: &Token,
        value_expr: &Expr,
        expr_id: crate::ast::ExprId,
    ) -> EvalResult {
        let value = self.evaluate(value_expr)?;
        match self.resolutions.get(&expr_id) {
            Some(&depth) => self.environment.assign_at(depth, &name.lexeme, value.clone()),
            None => {
                if !self.globals.assign(&name.lexeme, value.clone()) {
                    return Err(runtime_err(
                        name.clone(),
                        format!("Undefined variable '{}'.", name.lexeme),
                    ));
                }
            }
        }
        Ok(value)
    }

    fn evaluate_call(&mut self, callee: &Expr, paren: &Token, args: &[Expr]) -> EvalResult {
        let callee = self.evaluate(callee)?;
        let mut arg_values = Vec::with_capacity(args.len());
        for arg in args {
            arg_values.push(self.evaluate(arg)?);
        }
        self.call_value(callee, paren, arg_values)
    }

    fn call_value(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> EvalResult {
        match callee {
            Value::Function(func) => self.call_user_function(&func, args, paren),
            Value::Native(native) => {
                if args.len() != native.arity {
                    return Err(runtime_err(
                        paren.clone(),
                        format!(
                            "Expected {} arguments but got {}.",
                            native.arity,
                            args.len()
                        ),
                    ));
                }
                (native.func)(&args).map_err(|message| runtime_err(paren.clone(), message))
            }
            Value::Class(class) => {
                let arity = class.arity();
                if args.len() != arity {
                    return Err(runtime_err(
                        paren.clone(),
                        format!("Expected {} arguments but got {}.", arity, args.len()),
                    ));
                }
                let instance = Instance::new(class.clone());
                if let Some(initializer) = class.find_method("init") {
                    self.call_user_function(&initializer.bind(instance.clone()), args, paren)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(runtime_err(paren.clone(), "Can only call functions and classes.")),
        }
    }

    fn call_user_function(
        &mut self,
        func: &Rc<UserFunction>,
        args: Vec<Value>,
        paren: &Token,
    ) -> EvalResult {
        if args.len() != func.arity() {
            return Err(runtime_err(
                paren.clone(),
                format!(
                    "Expected {} arguments but got {}.",
                    func.arity(),
                    args.len()
                ),
            ));
        }

        let call_scope = func.closure.extend();
        for (param, arg) in func.declaration.params.iter().zip(args) {
            call_scope.define(param.lexeme.clone(), arg);
        }

        match self.execute_block(&func.declaration.body, call_scope) {
            Ok(()) => Ok(if func.is_initializer {
                func.closure.get_at(0, "this")
            } else {
                Value::Nil
            }),
            Err(Unwind::Return(value)) => Ok(if func.is_initializer {
                func.closure.get_at(0, "this")
            } else {
                value
            }),
            Err(Unwind::Break(token)) => {
                Err(runtime_err(token, "Unexpected 'break' outside a loop."))
            }
            Err(Unwind::Continue(token)) => {
                Err(runtime_err(token, "Unexpected 'continue' outside a loop."))
            }
            Err(other @ Unwind::Error(_)) => Err(other),
        }
    }

    fn evaluate_get(&mut self, object: &Expr, name: &Token) -> EvalResult {
        match self.evaluate(object)? {
            Value::Instance(instance) => instance.get(&name.lexeme).ok_or_else(|| {
                runtime_err(name.clone(), format!("Undefined property '{}'.", name.lexeme))
            }),
            _ => Err(runtime_err(name.clone(), "Only instances have properties.")),
        }
    }

    fn evaluate_set(&mut self, object: &Expr, name: &Token, value_expr: &Expr) -> EvalResult {
        match self.evaluate(object)? {
            Value::Instance(instance) => {
                let value = self.evaluate(value_expr)?;
                instance.set(&name.lexeme, value.clone());
                Ok(value)
            }
            _ => Err(runtime_err(name.clone(), "Only instances have fields.")),
        }
    }

    fn evaluate_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        expr_id: crate::ast::ExprId,
    ) -> EvalResult {
        let distance = *self
            .resolutions
            .get(&expr_id)
            .expect("resolver always resolves a well-formed 'super' expression");
        let superclass = match self.environment.get_at(distance, "super") {
            Value::Class(class) => class,
            _ => unreachable!("'super' binding is always a class: engine bug"),
        };
        let instance = match self.environment.get_at(distance - 1, "this") {
            Value::Instance(instance) => instance,
            _ => unreachable!("'this' binding is always an instance: engine bug"),
        };
        match superclass.find_method(&method.lexeme) {
            Some(found) => Ok(Value::Function(found.bind(instance))),
            None => Err(runtime_err(
                keyword.clone(),
                format!("Undefined property '{}'.", method.lexeme),
            )),
        }
    }
}

fn numeric_op(op: &Token, left: Value, right: Value, f: impl Fn(f64, f64) -> f64) -> EvalResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(f(a, b))),
        _ => Err(runtime_err(op.clone(), "Operands must be numbers.")),
    }
}

fn compare_op(op: &Token, left: Value, right: Value, f: impl Fn(f64, f64) -> bool) -> EvalResult {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(f(a, b))),
        _ => Err(runtime_err(op.clone(), "Operands must be numbers.")),
    }
}

fn superclass_token(expr: &Expr) -> Token {
    match &expr.kind {
        ExprKind::Variable(token) => token.clone(),
        _ => unreachable!("parser only ever parses a superclass as a bare variable reference"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::{lexer, parser, resolver};

    fn run(source: &str) -> (Result<(), RuntimeError>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let tokens = lexer::scan(source, &mut diag);
        let stmts = parser::parse(tokens, &mut diag);
        assert!(!diag.had_error(), "fixture must parse and resolve cleanly");
        let resolutions = resolver::resolve(&stmts, &mut diag);
        assert!(!diag.had_error(), "fixture must resolve cleanly");
        let mut interpreter = Interpreter::new(resolutions);
        (interpreter.interpret(&stmts), diag)
    }

    #[test]
    fn arithmetic_precedence_evaluates_left_to_right_with_precedence() {
        let mut diag = Diagnostics::new();
        let tokens = lexer::scan("1 + 2 * 3", &mut diag);
        let stmts = parser::parse(tokens, &mut diag);
        let resolutions = resolver::resolve(&stmts, &mut diag);
        let mut interpreter = Interpreter::new(resolutions);
        let expr = match &stmts[0] {
            Stmt::Expression(e) => e,
            _ => panic!("expected an expression statement"),
        };
        let value = interpreter.interpret_expression(expr).unwrap();
        assert!(matches!(value, Value::Number(n) if n == 7.0));
    }

    #[test]
    fn plus_requires_both_operands_to_match() {
        let (result, _) = run("print 1 + \"a\";");
        assert!(result.is_err());
    }

    #[test]
    fn string_concatenation_with_plus() {
        let mut diag = Diagnostics::new();
        let tokens = lexer::scan("\"a\" + \"b\"", &mut diag);
        let stmts = parser::parse(tokens, &mut diag);
        let resolutions = resolver::resolve(&stmts, &mut diag);
        let mut interpreter = Interpreter::new(resolutions);
        let expr = match &stmts[0] {
            Stmt::Expression(e) => e,
            _ => panic!("expected an expression statement"),
        };
        let value = interpreter.interpret_expression(expr).unwrap();
        assert!(matches!(value, Value::String(s) if s == "ab"));
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        let (result, _) = run(
            "fun make_counter() { var i = 0; fun counter() { i = i + 1; print i; } return counter; } var c = make_counter(); c(); c(); c();",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn break_exits_the_enclosing_loop() {
        let (result, _) = run("var i = 0; while (true) { i = i + 1; if (i == 3) break; } print i;");
        assert!(result.is_ok());
    }

    #[test]
    fn break_outside_a_loop_is_a_runtime_error() {
        let mut diag = Diagnostics::new();
        let tokens = lexer::scan("fun f() { break; } f();", &mut diag);
        let stmts = parser::parse(tokens, &mut diag);
        let resolutions = resolver::resolve(&stmts, &mut diag);
        let mut interpreter = Interpreter::new(resolutions);
        let result = interpreter.interpret(&stmts);
        assert!(result.is_err());
    }

    #[test]
    fn class_construction_and_inherited_super_call() {
        let (result, _) = run(
            "class A { greet() { return \"A\"; } } class B < A { greet() { return super.greet() + \"B\"; } } var b = B(); print b.greet();",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn initializer_return_with_no_value_still_yields_the_instance() {
        let (result, _) = run(
            "class Point { init(x) { this.x = x; return; } } var p = Point(42); print p.x;",
        );
        assert!(result.is_ok());
    }

    #[test]
    fn calling_with_wrong_arity_is_a_runtime_error() {
        let (result, _) = run("fun f(a, b) { return a + b; } f(1);");
        assert!(result.is_err());
    }

    #[test]
    fn undefined_variable_is_a_runtime_error() {
        let (result, _) = run("print undefined_name;");
        assert!(result.is_err());
    }

    #[test]
    fn get_on_non_instance_is_a_runtime_error() {
        let (result, _) = run("var x = 1; print x.y;");
        assert!(result.is_err());
    }
}
