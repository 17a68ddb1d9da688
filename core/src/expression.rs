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

//! Precedence-climbing expression parser.

use crate::ast::{BinaryOp, Expr};
use crate::cursor::Cursor;
use crate::env::Environment;
use crate::error::CompileError;
use crate::grammar::{self, ExprState};
use crate::lexer::{Token, TokenKind};
use crate::parser::Parser;

pub const KEYWORDS: &[&str] = &["true", "false"];

const OPERAND: &[TokenKind] = &[
    TokenKind::LeftPar,
    TokenKind::Name,
    TokenKind::UnaryOperator,
    TokenKind::Literal,
];

/// Parses the longest expression at the cursor.
pub fn parse<'src>(
    cursor: Cursor<'src>,
    env: &Environment,
) -> Result<(Expr, Cursor<'src>), CompileError> {
    let mut parser = Parser::new(grammar::expression()?, cursor, env);
    let expr = parser.subexpression(u8::MAX)?;
    Ok((expr, parser.finish()))
}

impl<'src, 'env> Parser<'src, 'env, ExprState> {
    /// Parses an operand followed by every infix operator that binds
    /// strictly tighter than `ceiling`.
    fn subexpression(&mut self, ceiling: u8) -> Result<Expr, CompileError> {
        let mut left = self.operand()?;
        loop {
            let op = match self.peek()? {
                Some(token) if token.kind == TokenKind::BinaryOperator => token.binary(),
                _ => None,
            };
            let Some(op) = op else { break };
            if op.priority() >= ceiling {
                break;
            }
            let Some(token) = self.accept(&[TokenKind::BinaryOperator], ExprState::Pre)? else {
                break;
            };
            let right = self.subexpression(op.priority())?;
            left = Expr::binary(op, left, right).map_err(|e| e.at(token.at))?;
        }
        Ok(left)
    }

    fn operand(&mut self) -> Result<Expr, CompileError> {
        if self.accept(&[TokenKind::LeftPar], ExprState::Pre)?.is_some() {
            let inner = self.subexpression(u8::MAX)?;
            self.expect(&[TokenKind::RightPar], ExprState::Post)?;
            return Ok(inner);
        }

        if let Some(name) = self.accept(&[TokenKind::Name], ExprState::Pre)? {
            if self.accept(&[TokenKind::LeftPar], ExprState::Post)?.is_some() {
                return self.call(name);
            }
            self.set_state(ExprState::Post);
            return Ok(Expr::variable(self.resolve_variable(name.text, name.at)?));
        }

        if let Some(token) = self.accept(&[TokenKind::UnaryOperator], ExprState::Pre)? {
            let op = token.unary().ok_or_else(|| mistyped(&token))?;
            let operand = self.subexpression(0)?;
            return Expr::unary(op, operand).map_err(|e| e.at(token.at));
        }

        let token = self.expect(OPERAND, ExprState::Post)?;
        let value = token.constant().ok_or_else(|| mistyped(&token))?;
        Ok(Expr::constant(value))
    }

    /// The name and `(` are already consumed.
    fn call(&mut self, name: Token<'src>) -> Result<Expr, CompileError> {
        let mut args = Vec::new();
        if self
            .accept(&[TokenKind::RightPar], ExprState::Post)?
            .is_none()
        {
            self.set_state(ExprState::Pre);
            loop {
                args.push(self.subexpression(u8::MAX)?);
                if self
                    .accept(&[TokenKind::RightPar], ExprState::Post)?
                    .is_some()
                {
                    break;
                }
                self.expect(&[TokenKind::Comma], ExprState::Pre)?;
            }
        }
        let function = self.resolve_function(name.text, name.at)?;
        Expr::call(name.text, function.handle, &function.signature, args).map_err(|e| e.at(name.at))
    }
}

fn mistyped(token: &Token<'_>) -> CompileError {
    CompileError::UnexpectedToken {
        at: token.at,
        expected: token.kind.to_string(),
        found: format!("'{}'", token.text),
    }
}
