// ABOUTME: Recursive-descent parser turning tokens into statements

use crate::ast::{Expr, ExprIdGen, ExprKind, FunctionExpr, LiteralValue, Stmt};
use crate::error::{Diagnostics, ParseError};
use crate::token::{Literal, Token, TokenKind};
use std::rc::Rc;

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    ids: ExprIdGen,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'a mut Diagnostics) -> Self {
        Parser {
            tokens,
            current: 0,
            ids: ExprIdGen::new(),
            diagnostics,
        }
    }

    /// Parses the whole token stream into a statement list, recovering
    /// from parse errors by synchronizing to the next declaration
    /// boundary. Errors are reported to `diagnostics`; the returned AST
    /// may be partial when errors occurred.
    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.diagnostics.report_parse(&err);
                    self.synchronize();
                }
            }
        }
        statements
    }

    // ---- declarations ----

    fn declaration(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::Class]) {
            return self.class_declaration();
        }
        if self.matches(&[TokenKind::Fun]) {
            return self.function_declaration("function");
        }
        if self.matches(&[TokenKind::Var]) {
            return self.var_declaration();
        }
        self.statement()
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?;

        let superclass = if self.matches(&[TokenKind::Less]) {
            let super_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Variable(super_name),
            })
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(name, superclass, methods))
    }

    fn function_declaration(&mut self, kind: &str) -> ParseResult<Stmt> {
        let func = self.function(kind)?;
        Ok(Stmt::Function(func))
    }

    /// Parses `IDENTIFIER "(" parameters? ")" block`, shared by top-level
    /// `fun` declarations and class method bodies.
    fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionExpr>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {} name.", kind))?;
        let (params, body) = self.function_tail(kind)?;
        Ok(Rc::new(FunctionExpr {
            name: Some(name),
            params,
            body,
        }))
    }

    fn function_tail(&mut self, kind: &str) -> ParseResult<(Vec<Token>, Vec<Stmt>)> {
        self.consume(
            TokenKind::LeftParen,
            &format!("Expect '(' after {} name.", kind),
        )?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let peek = self.peek().clone();
                    let err = ParseError::new(peek, "Can't have more than 255 parameters.");
                    self.diagnostics.report_parse(&err);
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            TokenKind::LeftBrace,
            &format!("Expect '{{' before {} body.", kind),
        )?;
        let body = self.block()?;
        Ok((params, body))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.matches(&[TokenKind::Equal]) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenKind::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Stmt::Var(name, initializer))
    }

    // ---- statements ----

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.matches(&[TokenKind::Print]) {
            return self.print_statement();
        }
        if self.matches(&[TokenKind::LeftBrace]) {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.matches(&[TokenKind::If]) {
            return self.if_statement();
        }
        if self.matches(&[TokenKind::While]) {
            return self.while_statement();
        }
        if self.matches(&[TokenKind::For]) {
            return self.for_statement();
        }
        if self.matches(&[TokenKind::Return]) {
            return self.return_statement();
        }
        if self.matches(&[TokenKind::Break]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.")?;
            return Ok(Stmt::Break(keyword));
        }
        if self.matches(&[TokenKind::Continue]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Semicolon, "Expect ';' after 'continue'.")?;
            return Ok(Stmt::Continue(keyword));
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return(keyword, value))
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(&[TokenKind::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If(condition, then_branch, else_branch))
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While(condition, body))
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.matches(&[TokenKind::Semicolon]) {
            None
        } else if self.matches(&[TokenKind::Var]) {
            Some(Box::new(self.var_declaration()?))
        } else {
            Some(Box::new(self.expression_statement()?))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let body = Box::new(self.statement()?);

        Ok(Stmt::For(initializer, condition, increment, body))
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    // ---- expressions, lowest to highest precedence ----

    pub fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.matches(&[TokenKind::Equal]) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            return match expr.kind {
                ExprKind::Variable(name) => Ok(Expr {
                    id: self.ids.next_id(),
                    kind: ExprKind::Assign(name, Box::new(value)),
                }),
                ExprKind::Get(object, name) => Ok(Expr {
                    id: self.ids.next_id(),
                    kind: ExprKind::Set(object, name, Box::new(value)),
                }),
                _ => {
                    // Report but don't synchronize: the expression so far
                    // is still well-formed, just not a valid assignment
                    // target, so parsing carries on from here.
                    let err = ParseError::new(equals, "Invalid assignment target.");
                    self.diagnostics.report_parse(&err);
                    Ok(value)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.matches(&[TokenKind::Or]) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Logical(Box::new(expr), operator, Box::new(right)),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.matches(&[TokenKind::And]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Logical(Box::new(expr), operator, Box::new(right)),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.matches(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Binary(Box::new(expr), operator, Box::new(right)),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.matches(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Binary(Box::new(expr), operator, Box::new(right)),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.matches(&[TokenKind::Minus, TokenKind::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Binary(Box::new(expr), operator, Box::new(right)),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.matches(&[TokenKind::Slash, TokenKind::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Binary(Box::new(expr), operator, Box::new(right)),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::Bang, TokenKind::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Unary(operator, Box::new(right)),
            });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(&[TokenKind::LeftParen]) {
                expr = self.finish_call(expr)?;
            } else if self.matches(&[TokenKind::Dot]) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                expr = Expr {
                    id: self.ids.next_id(),
                    kind: ExprKind::Get(Box::new(expr), name),
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let peek = self.peek().clone();
                    let err = ParseError::new(peek, "Can't have more than 255 arguments.");
                    self.diagnostics.report_parse(&err);
                }
                arguments.push(self.expression()?);
                if !self.matches(&[TokenKind::Comma]) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr {
            id: self.ids.next_id(),
            kind: ExprKind::Call(Box::new(callee), paren, arguments),
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.matches(&[TokenKind::False]) {
            return Ok(self.literal(LiteralValue::Bool(false)));
        }
        if self.matches(&[TokenKind::True]) {
            return Ok(self.literal(LiteralValue::Bool(true)));
        }
        if self.matches(&[TokenKind::Nil]) {
            return Ok(self.literal(LiteralValue::Nil));
        }
        if self.matches(&[TokenKind::Number]) {
            let value = match &self.previous().literal {
                Literal::Number(n) => *n,
                _ => unreachable!("Number token without numeric literal"),
            };
            return Ok(self.literal(LiteralValue::Number(value)));
        }
        if self.matches(&[TokenKind::String]) {
            let value = match &self.previous().literal {
                Literal::String(s) => s.clone(),
                _ => unreachable!("String token without string literal"),
            };
            return Ok(self.literal(LiteralValue::String(value)));
        }
        if self.matches(&[TokenKind::This]) {
            let keyword = self.previous().clone();
            return Ok(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::This(keyword),
            });
        }
        if self.matches(&[TokenKind::Super]) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method = self.consume(TokenKind::Identifier, "Expect superclass method name.")?;
            return Ok(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Super(keyword, method),
            });
        }
        if self.matches(&[TokenKind::Identifier]) {
            let name = self.previous().clone();
            return Ok(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Variable(name),
            });
        }
        if self.matches(&[TokenKind::LeftParen]) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Grouping(Box::new(expr)),
            });
        }
        if self.matches(&[TokenKind::Fun]) {
            let (params, body) = self.function_tail("function")?;
            return Ok(Expr {
                id: self.ids.next_id(),
                kind: ExprKind::Function(Rc::new(FunctionExpr {
                    name: None,
                    params,
                    body,
                })),
            });
        }

        let peek = self.peek().clone();
        Err(ParseError::new(peek, "Expect expression."))
    }

    fn literal(&mut self, value: LiteralValue) -> Expr {
        Expr {
            id: self.ids.next_id(),
            kind: ExprKind::Literal(value),
        }
    }

    // ---- token stream helpers ----

    fn matches(&mut self, kinds: &[TokenKind]) -> bool {
        for kind in kinds {
            if self.check(*kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        let peek = self.peek().clone();
        Err(ParseError::new(peek, message))
    }

    /// Discards tokens until a likely statement boundary, so one parse
    /// error doesn't cascade into a pile of spurious follow-on errors.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

pub fn parse(tokens: Vec<Token>, diagnostics: &mut Diagnostics) -> Vec<Stmt> {
    Parser::new(tokens, diagnostics).parse()
}
