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

//! Statement grammars. Each parser runs on its own cursor snapshot and
//! returns the cursor positioned after the statement it consumed.

use crate::ast::Stmt;
use crate::cursor::Cursor;
use crate::env::Environment;
use crate::error::CompileError;
use crate::grammar::{
    self, AssignState, BlockState, IfState, ReturnState, StatementState, VarDeclState,
};
use crate::lexer::TokenKind;
use crate::parser::{is_keyword, Parser};

pub const KEYWORDS: &[&str] = &["var", "return", "if", "else"];

/// Statement forms tried, in order, wherever a statement may appear.
const STATEMENT_FORMS: &[TokenKind] = &[
    TokenKind::AssignStatement,
    TokenKind::IfStatement,
    TokenKind::ReturnStatement,
    TokenKind::BlockStatement,
];

type Parsed<'src> = Result<(Stmt, Cursor<'src>), CompileError>;

/// `var a, b;` with duplicates dropped.
pub fn parse_var_decl<'src>(cursor: Cursor<'src>, env: &Environment) -> Parsed<'src> {
    let mut parser = Parser::new(grammar::var_decl()?, cursor, env);
    parser.expect(&[TokenKind::Var], VarDeclState::Pre)?;
    let mut names: Vec<String> = Vec::new();
    loop {
        let name = parser.expect(&[TokenKind::Name], VarDeclState::Post)?;
        if is_keyword(name.text) {
            return Err(CompileError::UnsupportedIdentifier {
                at: name.at,
                identifier: name.text.to_string(),
            });
        }
        if !names.iter().any(|known| known == name.text) {
            names.push(name.text.to_string());
        }
        if parser
            .accept(&[TokenKind::Semicolon], VarDeclState::End)?
            .is_some()
        {
            break;
        }
        parser.expect(&[TokenKind::Comma], VarDeclState::Pre)?;
    }
    Ok((Stmt::VarDecl(names), parser.finish()))
}

/// `name = expr;`
pub fn parse_assign<'src>(cursor: Cursor<'src>, env: &Environment) -> Parsed<'src> {
    let mut parser = Parser::new(grammar::assign()?, cursor, env);
    let name = parser.expect(&[TokenKind::Name], AssignState::PreAssign)?;
    parser.expect(&[TokenKind::Assign], AssignState::PostAssign)?;
    let target = parser.resolve_variable(name.text, name.at)?;
    let (value, at) = parser.expect_expression(AssignState::PostExpr)?;
    parser.expect(&[TokenKind::Semicolon], AssignState::End)?;
    let stmt = Stmt::assign(target, value).map_err(|e| e.at(at))?;
    Ok((stmt, parser.finish()))
}

/// `return expr;`
pub fn parse_return<'src>(cursor: Cursor<'src>, env: &Environment) -> Parsed<'src> {
    let mut parser = Parser::new(grammar::return_stmt()?, cursor, env);
    parser.expect(&[TokenKind::Return], ReturnState::PreExpr)?;
    let (value, at) = parser.expect_expression(ReturnState::PostExpr)?;
    parser.expect(&[TokenKind::Semicolon], ReturnState::End)?;
    let stmt = Stmt::ret(value).map_err(|e| e.at(at))?;
    Ok((stmt, parser.finish()))
}

/// `;`, `expr;` or `{ statement* }`
pub fn parse_block<'src>(cursor: Cursor<'src>, env: &Environment) -> Parsed<'src> {
    let mut parser = Parser::new(grammar::block()?, cursor, env);

    if parser
        .accept(&[TokenKind::LeftBrace], BlockState::InBlock)?
        .is_none()
    {
        if parser
            .accept(&[TokenKind::Semicolon], BlockState::End)?
            .is_some()
        {
            return Ok((Stmt::Expression(None), parser.finish()));
        }
        let (expr, _) = parser.expect_expression(BlockState::InExpr)?;
        parser.expect(&[TokenKind::Semicolon], BlockState::End)?;
        return Ok((Stmt::Expression(Some(expr)), parser.finish()));
    }

    let mut body = Vec::new();
    while !parser.test(&[TokenKind::RightBrace])? {
        body.push(parser.expect_statement(&[TokenKind::Statement], BlockState::InBlock)?);
    }
    parser.expect(&[TokenKind::RightBrace], BlockState::End)?;
    Ok((Stmt::Block(body), parser.finish()))
}

/// `if (cond) statement (else statement)?`
pub fn parse_if<'src>(cursor: Cursor<'src>, env: &Environment) -> Parsed<'src> {
    let mut parser = Parser::new(grammar::if_stmt()?, cursor, env);
    parser.expect(&[TokenKind::If], IfState::PreLeftPar)?;
    parser.expect(&[TokenKind::LeftPar], IfState::PreExpr)?;
    let (condition, at) = parser.expect_expression(IfState::PostExpr)?;
    parser.expect(&[TokenKind::RightPar], IfState::PreBlock)?;
    let then_branch = parser.expect_statement(&[TokenKind::Statement], IfState::PostBlock)?;

    let else_branch = if parser
        .accept(&[TokenKind::Else], IfState::PostElse)?
        .is_some()
    {
        Some(parser.expect_statement(&[TokenKind::Statement], IfState::End)?)
    } else {
        parser.set_state(IfState::End);
        None
    };

    let stmt = Stmt::if_else(condition, then_branch, else_branch).map_err(|e| e.at(at))?;
    Ok((stmt, parser.finish()))
}

/// The first statement form that matches.
pub fn parse_statement<'src>(cursor: Cursor<'src>, env: &Environment) -> Parsed<'src> {
    let mut parser = Parser::new(grammar::statement()?, cursor, env);
    let stmt = parser.expect_statement(STATEMENT_FORMS, StatementState::End)?;
    Ok((stmt, parser.finish()))
}
