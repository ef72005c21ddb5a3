// ABOUTME: AST pretty-printer that emits reparseable Lox-like source text

use crate::ast::{Expr, ExprKind, FunctionExpr, LiteralValue, Stmt};

pub fn print_program(statements: &[Stmt]) -> String {
    statements
        .iter()
        .map(print_stmt)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn print_stmt(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expression(expr) => format!("{};", print_expr(expr)),
        Stmt::Print(expr) => format!("print {};", print_expr(expr)),
        Stmt::Var(name, Some(init)) => format!("var {} = {};", name.lexeme, print_expr(init)),
        Stmt::Var(name, None) => format!("var {};", name.lexeme),
        Stmt::Block(stmts) => format!("{{ {} }}", print_block_body(stmts)),
        Stmt::If(cond, then_branch, None) => {
            format!("if ({}) {}", print_expr(cond), print_stmt(then_branch))
        }
        Stmt::If(cond, then_branch, Some(else_branch)) => format!(
            "if ({}) {} else {}",
            print_expr(cond),
            print_stmt(then_branch),
            print_stmt(else_branch)
        ),
        Stmt::While(cond, body) => format!("while ({}) {}", print_expr(cond), print_stmt(body)),
        Stmt::For(init, cond, incr, body) => {
            let init_part = init
                .as_ref()
                .map(|s| print_stmt(s))
                .unwrap_or_else(|| ";".to_string());
            let cond_part = cond.as_ref().map(print_expr).unwrap_or_default();
            let incr_part = incr.as_ref().map(print_expr).unwrap_or_default();
            format!(
                "for ({} {}; {}) {}",
                init_part,
                cond_part,
                incr_part,
                print_stmt(body)
            )
        }
        Stmt::Return(_, Some(value)) => format!("return {};", print_expr(value)),
        Stmt::Return(_, None) => "return;".to_string(),
        Stmt::Break(_) => "break;".to_string(),
        Stmt::Continue(_) => "continue;".to_string(),
        Stmt::Function(func) => print_named_function(func),
        Stmt::Class(name, superclass, methods) => {
            let super_part = superclass
                .as_ref()
                .map(|s| format!(" < {}", print_expr(s)))
                .unwrap_or_default();
            let methods_part = methods
                .iter()
                .map(|m| print_named_function(m))
                .collect::<Vec<_>>()
                .join(" ");
            format!("class {}{} {{ {} }}", name.lexeme, super_part, methods_part)
        }
    }
}

fn print_block_body(stmts: &[Stmt]) -> String {
    stmts.iter().map(print_stmt).collect::<Vec<_>>().join(" ")
}

fn print_named_function(func: &FunctionExpr) -> String {
    let name = func
        .name
        .as_ref()
        .map(|t| t.lexeme.clone())
        .unwrap_or_default();
    let params = func
        .params
        .iter()
        .map(|p| p.lexeme.clone())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "fun {}({}) {{ {} }}",
        name,
        params,
        print_block_body(&func.body)
    )
}

pub fn print_expr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(value) => print_literal(value),
        ExprKind::Grouping(inner) => format!("({})", print_expr(inner)),
        ExprKind::Unary(op, right) => format!("{}{}", op.lexeme, print_expr(right)),
        ExprKind::Binary(left, op, right) => {
            format!("{} {} {}", print_expr(left), op.lexeme, print_expr(right))
        }
        ExprKind::Logical(left, op, right) => {
            format!("{} {} {}", print_expr(left), op.lexeme, print_expr(right))
        }
        ExprKind::Variable(name) => name.lexeme.clone(),
        ExprKind::Assign(name, value) => format!("{} = {}", name.lexeme, print_expr(value)),
        ExprKind::Call(callee, _, args) => {
            let args_str = args
                .iter()
                .map(print_expr)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", print_expr(callee), args_str)
        }
        ExprKind::Get(object, name) => format!("{}.{}", print_expr(object), name.lexeme),
        ExprKind::Set(object, name, value) => format!(
            "{}.{} = {}",
            print_expr(object),
            name.lexeme,
            print_expr(value)
        ),
        ExprKind::This(_) => "this".to_string(),
        ExprKind::Super(_, method) => format!("super.{}", method.lexeme),
        ExprKind::Function(func) => {
            let params = func
                .params
                .iter()
                .map(|p| p.lexeme.clone())
                .collect::<Vec<_>>()
                .join(", ");
            format!("fun ({}) {{ {} }}", params, print_block_body(&func.body))
        }
    }
}

fn print_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Number(n) => {
            if n.fract() == 0.0 && n.is_finite() {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        LiteralValue::String(s) => format!("\"{}\"", s),
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Nil => "nil".to_string(),
    }
}
