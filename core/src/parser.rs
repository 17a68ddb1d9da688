/*
 * Copyright (c) 2026 Mohamad Al-Zawahreh (dba Sovereign Systems).
 *
 * This file is part of quill.
 *
 * LICENSE: DUAL-LICENSED (AGPLv3 or COMMERCIAL).
 *
 * 1. OPEN SOURCE: You may use this file under the terms of the GNU Affero
 * General Public License v3.0. If you link to this code, your ENTIRE
 * application must be open-sourced under AGPLv3.
 *
 * 2. COMMERCIAL: For proprietary use, you must obtain a Commercial License
 * from Sovereign Systems.
 *
 * PATENT NOTICE: Protected by US Patent App #63/935,467.
 * NO IMPLIED LICENSE to rights of Mohamad Al-Zawahreh or Sovereign Systems.
 */

//! Parser core shared by every grammar.
//!
//! A `Parser<S>` drives one `StateLexer<S>` and threads the symbol
//! environment through. Each grammar adds its own `impl` block or free
//! functions on top of these primitives; nothing here knows about a
//! particular construct.

use crate::ast::{Expr, Stmt};
use crate::cursor::{Cursor, Position};
use crate::env::{Environment, HostFunction, Variable};
use crate::error::{CompileError, SymbolKind};
use crate::expression;
use crate::lexer::{Grammar, StateLexer, Token, TokenKind};
use crate::statement;
use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref KEYWORDS: HashSet<&'static str> = expression::KEYWORDS
        .iter()
        .chain(statement::KEYWORDS.iter())
        .copied()
        .collect();
}

/// Reserved words of the language; never usable as identifiers.
pub fn is_keyword(identifier: &str) -> bool {
    KEYWORDS.contains(identifier)
}

pub struct Parser<'src, 'env, S: 'static> {
    lexer: StateLexer<'src, S>,
    env: &'env Environment,
}

impl<'src, 'env, S: Copy + PartialEq + 'static> Parser<'src, 'env, S> {
    pub fn new(grammar: &'static Grammar<S>, cursor: Cursor<'src>, env: &'env Environment) -> Self {
        Parser {
            lexer: StateLexer::new(grammar, cursor),
            env,
        }
    }

    pub fn env(&self) -> &'env Environment {
        self.env
    }

    // ─── Token Primitives ────────────────────────────────────────────────────

    pub fn peek(&mut self) -> Result<Option<&Token<'src>>, CompileError> {
        self.lexer.peek(self.env)
    }

    /// Checks the next token without consuming it.
    pub fn test(&mut self, kinds: &[TokenKind]) -> Result<bool, CompileError> {
        Ok(self
            .peek()?
            .map_or(false, |token| kinds.contains(&token.kind)))
    }

    /// Consumes the next token if it is one of `kinds` and moves to `next`.
    pub fn accept(
        &mut self,
        kinds: &[TokenKind],
        next: S,
    ) -> Result<Option<Token<'src>>, CompileError> {
        if !self.test(kinds)? {
            return Ok(None);
        }
        let token = self.lexer.commit();
        self.lexer.set_state(next);
        Ok(token)
    }

    pub fn expect(&mut self, kinds: &[TokenKind], next: S) -> Result<Token<'src>, CompileError> {
        match self.accept(kinds, next)? {
            Some(token) => Ok(token),
            None => Err(self.lexer.error(kinds)),
        }
    }

    /// Drops the peeked token and re-reads the input in `state`.
    pub fn set_state(&mut self, state: S) {
        self.lexer.set_state(state);
    }

    pub fn position(&self) -> Position {
        self.lexer.position()
    }

    pub fn at_end(&mut self) -> bool {
        self.lexer.at_end()
    }

    /// Ends the parse. The returned cursor has committed exactly the
    /// consumed tokens.
    pub fn finish(self) -> Cursor<'src> {
        self.lexer.into_cursor()
    }

    // ─── Typed Expectations ──────────────────────────────────────────────────

    pub fn expect_expression(&mut self, next: S) -> Result<(Expr, Position), CompileError> {
        let token = self.expect(&[TokenKind::Expression], next)?;
        let at = token.at;
        let text = token.text;
        token
            .into_expr()
            .map(|expr| (expr, at))
            .ok_or_else(|| malformed(at, TokenKind::Expression, text))
    }

    /// Consumes one statement of any of `kinds`. When nothing matches, the
    /// failure is reported as an unrecognized statement.
    pub fn expect_statement(&mut self, kinds: &[TokenKind], next: S) -> Result<Stmt, CompileError> {
        let token = match self.accept(kinds, next)? {
            Some(token) => token,
            None => return Err(self.statement_error(kinds)),
        };
        let (at, text) = (token.at, token.text);
        token
            .into_stmt()
            .ok_or_else(|| malformed(at, TokenKind::Statement, text))
    }

    pub fn statement_error(&self, kinds: &[TokenKind]) -> CompileError {
        match self.lexer.error(kinds) {
            CompileError::UnrecognizedToken { at, diagnostic } => {
                CompileError::UnrecognizedStatement { at, diagnostic }
            }
            CompileError::UnexpectedToken {
                at,
                expected,
                found,
            } => CompileError::UnrecognizedStatement {
                at,
                diagnostic: format!("expected {}, found {}", expected, found),
            },
            other => other,
        }
    }

    // ─── Symbol Resolution ───────────────────────────────────────────────────

    pub fn resolve_variable(&self, name: &str, at: Position) -> Result<Variable, CompileError> {
        match self.env.variable(name) {
            Some(variable) => Ok(variable.clone()),
            None => Err(unresolved(name, at, SymbolKind::Variable)),
        }
    }

    pub fn resolve_function(
        &self,
        name: &str,
        at: Position,
    ) -> Result<&'env HostFunction, CompileError> {
        self.env
            .function(name)
            .ok_or_else(|| unresolved(name, at, SymbolKind::Function))
    }
}

fn unresolved(name: &str, at: Position, kind: SymbolKind) -> CompileError {
    if is_keyword(name) {
        CompileError::UnsupportedIdentifier {
            at,
            identifier: name.to_string(),
        }
    } else {
        CompileError::UnresolvedIdentifier {
            at,
            kind,
            name: name.to_string(),
        }
    }
}

pub(crate) fn malformed(at: Position, kind: TokenKind, text: &str) -> CompileError {
    CompileError::UnexpectedToken {
        at,
        expected: kind.to_string(),
        found: format!("'{}'", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{HostEnvironment, Signature};
    use crate::grammar::{self, ReturnState, VarDeclState};

    fn env() -> Environment {
        Environment::bind(&Signature::integers(&["x"]), &HostEnvironment::new())
    }

    #[test]
    fn test_keyword_set() {
        for word in ["true", "false", "var", "return", "if", "else"] {
            assert!(is_keyword(word), "{} should be reserved", word);
        }
        assert!(!is_keyword("returned"));
        assert!(!is_keyword("x"));
    }

    #[test]
    fn test_resolution_errors() {
        let env = env();
        let parser = Parser::new(grammar::return_stmt().unwrap(), Cursor::new(""), &env);
        let at = Position::start();

        assert_eq!(parser.resolve_variable("x", at).unwrap().name, "x");
        assert!(matches!(
            parser.resolve_variable("y", at),
            Err(CompileError::UnresolvedIdentifier {
                kind: SymbolKind::Variable,
                ..
            })
        ));
        assert!(matches!(
            parser.resolve_variable("else", at),
            Err(CompileError::UnsupportedIdentifier { .. })
        ));
        assert!(matches!(
            parser.resolve_function("x", at),
            Err(CompileError::UnresolvedIdentifier {
                kind: SymbolKind::Function,
                ..
            })
        ));
    }

    #[test]
    fn test_accept_and_expect() {
        let env = env();
        let mut parser = Parser::new(grammar::var_decl().unwrap(), Cursor::new("var a, ;"), &env);

        assert!(parser
            .accept(&[TokenKind::Name], VarDeclState::Post)
            .unwrap()
            .is_none());
        let var = parser.expect(&[TokenKind::Var], VarDeclState::Pre).unwrap();
        assert_eq!(var.text, "var");
        let name = parser.expect(&[TokenKind::Name], VarDeclState::Post).unwrap();
        assert_eq!((name.text, name.at.col), ("a", 5));
        parser.expect(&[TokenKind::Comma], VarDeclState::Pre).unwrap();

        let err = parser
            .expect(&[TokenKind::Name], VarDeclState::Post)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unrecognized token at 1:8: no match for '[a-zA-Z_][a-zA-Z_0-9]*' regex"
        );

        let cursor = parser.finish();
        assert_eq!(cursor.committed().offset, 6);
    }

    #[test]
    fn test_missed_literal_reports_its_pattern() {
        let env = env();
        let mut parser = Parser::new(grammar::var_decl().unwrap(), Cursor::new("var a b"), &env);
        parser.expect(&[TokenKind::Var], VarDeclState::Pre).unwrap();
        parser.expect(&[TokenKind::Name], VarDeclState::Post).unwrap();

        // `,` also missed here, but only the expected kind is reported
        let err = parser
            .expect(&[TokenKind::Semicolon], VarDeclState::End)
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnrecognizedToken {
                at: Position { offset: 6, line: 1, col: 7 },
                diagnostic: "no match for ';' regex".to_string(),
            }
        );
    }

    #[test]
    fn test_kind_absent_from_state_is_unexpected() {
        let env = env();
        let mut parser = Parser::new(grammar::var_decl().unwrap(), Cursor::new("var"), &env);
        let err = parser
            .expect(&[TokenKind::Name], VarDeclState::Post)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected token at 1:1: expected identifier, found 'var'"
        );
    }

    #[test]
    fn test_malformed_payload() {
        let at = Position { offset: 4, line: 1, col: 5 };
        assert_eq!(
            malformed(at, TokenKind::VarDeclStatement, "var x;"),
            CompileError::UnexpectedToken {
                at,
                expected: TokenKind::VarDeclStatement.to_string(),
                found: "'var x;'".to_string(),
            }
        );
    }

    #[test]
    fn test_soft_expression_failure_is_unrecognized_token() {
        let env = env();
        let mut parser = Parser::new(grammar::return_stmt().unwrap(), Cursor::new("return ;"), &env);
        parser.expect(&[TokenKind::Return], ReturnState::PreExpr).unwrap();
        let err = parser.expect_expression(ReturnState::PostExpr).unwrap_err();
        assert!(matches!(err, CompileError::UnrecognizedToken { .. }));
        assert!(err.to_string().starts_with("Unrecognized token at 1:8: cannot parse expression"));
    }
}
