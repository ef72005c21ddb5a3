// ABOUTME: Static resolver computing lexical depths and diagnosing scope errors

use crate::ast::{Expr, ExprId, ExprKind, FunctionExpr, Stmt};
use crate::error::{Diagnostics, ResolveError};
use crate::token::Token;
use std::collections::HashMap;
use std::rc::Rc;

pub type ResolutionTable = HashMap<ExprId, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'a> {
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionKind,
    current_class: ClassKind,
    resolutions: ResolutionTable,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Resolver<'a> {
    pub fn new(diagnostics: &'a mut Diagnostics) -> Self {
        Resolver {
            scopes: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            resolutions: HashMap::new(),
            diagnostics,
        }
    }

    pub fn resolve(mut self, statements: &[Stmt]) -> ResolutionTable {
        self.resolve_stmts(statements);
        self.resolutions
    }

    fn error(&mut self, token: Token, message: impl Into<String>) {
        let err = ResolveError::new(token, message);
        self.diagnostics.report_resolve(&err);
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.error(
                    name.clone(),
                    "Already a variable with this name in this scope.",
                );
            }
            scope.insert(name.lexeme.clone(), false);
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn resolve_local(&mut self, expr_id: ExprId, name: &Token) {
        let innermost = self.scopes.len();
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                self.resolutions.insert(expr_id, innermost - 1 - i);
                return;
            }
        }
        // Not found in any scope: treated as global, no table entry.
    }

    fn resolve_function(&mut self, func: &Rc<FunctionExpr>, kind: FunctionKind) {
        let enclosing_function = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &func.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&func.body);
        self.end_scope();

        self.current_function = enclosing_function;
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(stmts) => {
                self.begin_scope();
                self.resolve_stmts(stmts);
                self.end_scope();
            }
            Stmt::Var(name, initializer) => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(name);
            }
            Stmt::Function(func) => {
                if let Some(name) = &func.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(func, FunctionKind::Function);
            }
            Stmt::Expression(expr) | Stmt::Print(expr) => self.resolve_expr(expr),
            Stmt::If(cond, then_branch, else_branch) => {
                self.resolve_expr(cond);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While(cond, body) => {
                self.resolve_expr(cond);
                self.resolve_stmt(body);
            }
            Stmt::For(init, cond, incr, body) => {
                self.begin_scope();
                if let Some(init) = init {
                    self.resolve_stmt(init);
                }
                if let Some(cond) = cond {
                    self.resolve_expr(cond);
                }
                if let Some(incr) = incr {
                    self.resolve_expr(incr);
                }
                self.resolve_stmt(body);
                self.end_scope();
            }
            Stmt::Return(keyword, value) => {
                if self.current_function == FunctionKind::None {
                    self.error(keyword.clone(), "Can't return from top-level code.");
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(
                            keyword.clone(),
                            "Can't return a value from an initializer.",
                        );
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::Class(name, superclass, methods) => {
                let enclosing_class = self.current_class;
                self.current_class = ClassKind::Class;

                self.declare(name);
                self.define(name);

                if let Some(superclass_expr) = superclass {
                    if let ExprKind::Variable(super_name) = &superclass_expr.kind {
                        if super_name.lexeme == name.lexeme {
                            self.error(super_name.clone(), "A class can't inherit from itself.");
                        }
                    }
                    self.current_class = ClassKind::Subclass;
                    self.resolve_expr(superclass_expr);
                    self.begin_scope();
                    self.scopes
                        .last_mut()
                        .unwrap()
                        .insert("super".to_string(), true);
                }

                self.begin_scope();
                self.scopes
                    .last_mut()
                    .unwrap()
                    .insert("this".to_string(), true);

                for method in methods {
                    let kind = if method
                        .name
                        .as_ref()
                        .map(|n| n.lexeme == "init")
                        .unwrap_or(false)
                    {
                        FunctionKind::Initializer
                    } else {
                        FunctionKind::Method
                    };
                    self.resolve_function(method, kind);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Unary(_, right) => self.resolve_expr(right),
            ExprKind::Binary(left, _, right) | ExprKind::Logical(left, _, right) => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Variable(name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        self.error(
                            name.clone(),
                            "Can't read local variable in its own initializer.",
                        );
                    }
                }
                self.resolve_local(expr.id, name);
            }
            ExprKind::Assign(name, value) => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, name);
            }
            ExprKind::Call(callee, _, args) => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Get(object, _) => self.resolve_expr(object),
            ExprKind::Set(object, _, value) => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This(keyword) => {
                if self.current_class == ClassKind::None {
                    self.error(keyword.clone(), "Can't use 'this' outside of a class.");
                    return;
                }
                self.resolve_local(expr.id, keyword);
            }
            ExprKind::Super(keyword, _) => {
                match self.current_class {
                    ClassKind::None => {
                        self.error(keyword.clone(), "Can't use 'super' outside of a class.");
                        return;
                    }
                    ClassKind::Class => {
                        self.error(
                            keyword.clone(),
                            "Can't use 'super' in a class with no superclass.",
                        );
                        return;
                    }
                    ClassKind::Subclass => {}
                }
                self.resolve_local(expr.id, keyword);
            }
            ExprKind::Function(func) => {
                if let Some(name) = &func.name {
                    self.declare(name);
                    self.define(name);
                }
                self.resolve_function(func, FunctionKind::Function);
            }
        }
    }
}

pub fn resolve(statements: &[Stmt], diagnostics: &mut Diagnostics) -> ResolutionTable {
    Resolver::new(diagnostics).resolve(statements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use crate::lexer;
    use crate::parser;

    fn resolve_source(source: &str) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let tokens = lexer::scan(source, &mut diag);
        let stmts = parser::parse(tokens, &mut diag);
        resolve(&stmts, &mut diag);
        diag
    }

    #[test]
    fn reading_own_initializer_is_an_error() {
        let diag = resolve_source("{ var x = 1; { var x = x + 1; print x; } }");
        assert!(diag.had_error());
    }

    #[test]
    fn duplicate_local_is_an_error() {
        let diag = resolve_source("{ var a = 1; var a = 2; }");
        assert!(diag.had_error());
    }

    #[test]
    fn top_level_redeclaration_is_fine() {
        let diag = resolve_source("var a = 1; var a = a + 1;");
        assert!(!diag.had_error());
    }

    #[test]
    fn return_outside_function_is_an_error() {
        let diag = resolve_source("return 1;");
        assert!(diag.had_error());
    }

    #[test]
    fn return_value_from_initializer_is_an_error() {
        let diag = resolve_source("class C { init() { return 1; } }");
        assert!(diag.had_error());
    }

    #[test]
    fn this_outside_class_is_an_error() {
        let diag = resolve_source("print this;");
        assert!(diag.had_error());
    }

    #[test]
    fn super_without_superclass_is_an_error() {
        let diag = resolve_source("class C { m() { return super.m(); } }");
        assert!(diag.had_error());
    }

    #[test]
    fn self_inheriting_class_is_an_error() {
        let diag = resolve_source("class C < C {}");
        assert!(diag.had_error());
    }

    #[test]
    fn well_formed_subclass_resolves_cleanly() {
        let diag = resolve_source(
            "class A { greet() { return \"A\"; } } class B < A { greet() { return super.greet(); } }",
        );
        assert!(!diag.had_error());
    }
}
