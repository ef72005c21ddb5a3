// ABOUTME: Diagnostics sink and error types for each pipeline phase

use crate::token::{Token, TokenKind};
use thiserror::Error;

/// Renders the `<where>` clause from spec.md's diagnostic format:
/// ` at end` at EOF, ` at 'lexeme'` otherwise.
fn where_clause(token: &Token) -> String {
    if token.kind == TokenKind::Eof {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ParseError {
    pub token: Option<Token>,
    pub message: String,
}

impl ParseError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        ParseError {
            token: Some(token),
            message: message.into(),
        }
    }

    fn where_clause(&self) -> String {
        self.token
            .as_ref()
            .map(where_clause)
            .unwrap_or_default()
    }

    pub fn line(&self) -> usize {
        self.token.as_ref().map(|t| t.line).unwrap_or(0)
    }
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ResolveError {
    pub token: Token,
    pub message: String,
}

impl ResolveError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        ResolveError {
            token,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct RuntimeError {
    pub token: Token,
    pub message: String,
}

impl RuntimeError {
    pub fn new(token: Token, message: impl Into<String>) -> Self {
        RuntimeError {
            token,
            message: message.into(),
        }
    }
}

/// Accumulates "an error occurred" across the lex/parse/resolve phases and
/// renders diagnostics in `spec.md`'s `[source:line] Error<where>: message`
/// format. Runtime errors are reported separately since they abort
/// execution rather than accumulate.
#[derive(Debug)]
pub struct Diagnostics {
    source_name: String,
    had_error: bool,
    had_runtime_error: bool,
    messages: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Diagnostics::named("script")
    }

    pub fn named(source_name: impl Into<String>) -> Self {
        Diagnostics {
            source_name: source_name.into(),
            had_error: false,
            had_runtime_error: false,
            messages: Vec::new(),
        }
    }

    pub fn set_source_name(&mut self, name: impl Into<String>) {
        self.source_name = name.into();
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clears flags and buffered messages; called between REPL lines.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
        self.messages.clear();
    }

    fn record(&mut self, line: usize, where_: &str, message: &str) {
        self.had_error = true;
        self.messages.push(format!(
            "[{}:{}] Error{}: {}",
            self.source_name, line, where_, message
        ));
    }

    pub fn report_lex(&mut self, line: usize, message: String) {
        self.record(line, "", &message);
    }

    pub fn report_parse(&mut self, err: &ParseError) {
        self.record(err.line(), &err.where_clause(), &err.message);
    }

    pub fn report_resolve(&mut self, err: &ResolveError) {
        self.record(err.token.line, &where_clause(&err.token), &err.message);
    }

    pub fn report_runtime(&mut self, err: &RuntimeError) {
        self.had_runtime_error = true;
        self.messages.push(format!(
            "[{}:{}] Error{}: {}",
            self.source_name,
            err.token.line,
            where_clause(&err.token),
            err.message
        ));
    }

    /// Drains the buffered diagnostic lines in the order they were recorded.
    pub fn take_report(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Literal;

    fn tok(kind: TokenKind, lexeme: &str, line: usize) -> Token {
        Token::new(kind, lexeme, Literal::None, line)
    }

    #[test]
    fn formats_lex_error_with_no_where_clause() {
        let mut diag = Diagnostics::named("repl");
        diag.report_lex(3, "Unexpected character '@'.".to_string());
        let report = diag.take_report();
        assert_eq!(report, vec!["[repl:3] Error: Unexpected character '@'.".to_string()]);
    }

    #[test]
    fn formats_parse_error_at_token() {
        let mut diag = Diagnostics::named("main.lox");
        let err = ParseError::new(tok(TokenKind::Semicolon, ";", 5), "Expect expression.");
        diag.report_parse(&err);
        let report = diag.take_report();
        assert_eq!(report, vec!["[main.lox:5] Error at ';': Expect expression.".to_string()]);
    }

    #[test]
    fn formats_parse_error_at_eof() {
        let mut diag = Diagnostics::named("main.lox");
        let err = ParseError::new(tok(TokenKind::Eof, "", 9), "Expect '}' after block.");
        diag.report_parse(&err);
        let report = diag.take_report();
        assert_eq!(
            report,
            vec!["[main.lox:9] Error at end: Expect '}' after block.".to_string()]
        );
    }

    #[test]
    fn reset_clears_flag_and_messages() {
        let mut diag = Diagnostics::new();
        diag.report_lex(1, "boom".to_string());
        assert!(diag.had_error());
        diag.reset();
        assert!(!diag.had_error());
        assert!(diag.take_report().is_empty());
    }

    #[test]
    fn runtime_error_sets_distinct_flag() {
        let mut diag = Diagnostics::new();
        let err = RuntimeError::new(tok(TokenKind::Identifier, "x", 2), "Undefined variable 'x'.");
        diag.report_runtime(&err);
        assert!(diag.had_runtime_error());
        assert!(!diag.had_error());
    }
}
