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

//! Per-construct grammars: parse states, the token patterns legal in each
//! state, and the closed set of nested rules that can stand in for a token.

use crate::ast::{BinaryOp, UnaryOp};
use crate::cursor::Cursor;
use crate::env::Environment;
use crate::error::CompileError;
use crate::expression;
use crate::lexer::{no_value, Grammar, Matcher, TokenKind, TokenValue};
use crate::parser::is_keyword;
use crate::statement;
use crate::types::Value;
use lazy_static::lazy_static;

/// A nested grammar matched as a single token of an enclosing grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarRule {
    Expression,
    Statement,
    VarDecl,
    Assign,
    Return,
    If,
    Block,
}

impl GrammarRule {
    pub fn kind(self) -> TokenKind {
        match self {
            GrammarRule::Expression => TokenKind::Expression,
            GrammarRule::Statement => TokenKind::Statement,
            GrammarRule::VarDecl => TokenKind::VarDeclStatement,
            GrammarRule::Assign => TokenKind::AssignStatement,
            GrammarRule::Return => TokenKind::ReturnStatement,
            GrammarRule::If => TokenKind::IfStatement,
            GrammarRule::Block => TokenKind::BlockStatement,
        }
    }

    /// Runs the full sub-parse on a snapshot. The returned cursor has
    /// committed exactly what the rule consumed; the caller's own cursor is
    /// never touched.
    pub fn parse<'src>(
        self,
        cursor: Cursor<'src>,
        env: &Environment,
    ) -> Result<(TokenValue, Cursor<'src>), CompileError> {
        let (value, end) = match self {
            GrammarRule::Expression => {
                let (expr, end) = expression::parse(cursor, env)?;
                (TokenValue::Expr(expr), end)
            }
            GrammarRule::Statement => wrap(statement::parse_statement(cursor, env)?),
            GrammarRule::VarDecl => wrap(statement::parse_var_decl(cursor, env)?),
            GrammarRule::Assign => wrap(statement::parse_assign(cursor, env)?),
            GrammarRule::Return => wrap(statement::parse_return(cursor, env)?),
            GrammarRule::If => wrap(statement::parse_if(cursor, env)?),
            GrammarRule::Block => wrap(statement::parse_block(cursor, env)?),
        };
        Ok((value, end))
    }
}

fn wrap<'src>((stmt, end): (crate::ast::Stmt, Cursor<'src>)) -> (TokenValue, Cursor<'src>) {
    (TokenValue::Stmt(stmt), end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprState {
    /// Expecting an operand.
    Pre,
    /// After an operand.
    Post,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDeclState {
    Begin,
    Pre,
    Post,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignState {
    Begin,
    PreAssign,
    PostAssign,
    PostExpr,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnState {
    Begin,
    PreExpr,
    PostExpr,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Begin,
    InBlock,
    InExpr,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfState {
    Begin,
    PreLeftPar,
    PreExpr,
    PostExpr,
    PreBlock,
    PostBlock,
    PostElse,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Begin,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramState {
    Begin,
    AfterDef,
    End,
}

const NAME: &str = "[a-zA-Z_][a-zA-Z_0-9]*";
const NUMBER: &str = "[0-9]+";

fn keyword(kind: TokenKind, word: &str) -> Result<Matcher, CompileError> {
    Matcher::literal(kind, &format!(r"{}\b", regex::escape(word)), no_value)
}

fn punct(kind: TokenKind, symbol: &str) -> Result<Matcher, CompileError> {
    Matcher::literal(kind, &regex::escape(symbol), no_value)
}

fn name() -> Result<Matcher, CompileError> {
    Matcher::literal(TokenKind::Name, NAME, no_value)
}

/// A name that refers to a symbol. Keywords are turned away here so the
/// statement form that owns the keyword gets to report the real error.
fn symbol() -> Result<Matcher, CompileError> {
    Matcher::literal(TokenKind::Name, NAME, not_keyword)
}

fn not_keyword(text: &str) -> Result<TokenValue, String> {
    if is_keyword(text) {
        return Err(format!("'{}' is a keyword, not an identifier", text));
    }
    Ok(TokenValue::None)
}

fn integer(text: &str) -> Result<TokenValue, String> {
    text.parse::<i64>()
        .map(|i| TokenValue::Constant(Value::Integer(i)))
        .map_err(|_| format!("integer literal {} does not fit in 64 bits", text))
}

fn boolean(text: &str) -> Result<TokenValue, String> {
    match text {
        "true" => Ok(TokenValue::Constant(Value::Boolean(true))),
        "false" => Ok(TokenValue::Constant(Value::Boolean(false))),
        _ => Err(format!("'{}' is not a boolean literal", text)),
    }
}

fn unary(text: &str) -> Result<TokenValue, String> {
    UnaryOp::from_symbol(text)
        .map(TokenValue::Unary)
        .ok_or_else(|| format!("unknown unary operator '{}'", text))
}

fn binary(text: &str) -> Result<TokenValue, String> {
    BinaryOp::from_symbol(text)
        .map(TokenValue::Binary)
        .ok_or_else(|| format!("unknown binary operator '{}'", text))
}

fn build_expression() -> Result<Grammar<ExprState>, CompileError> {
    use ExprState::*;
    let mut matchers = Vec::new();
    for op in BinaryOp::ALL {
        matchers.push(Matcher::literal(
            TokenKind::BinaryOperator,
            &regex::escape(op.symbol()),
            binary,
        )?);
    }
    for op in UnaryOp::ALL {
        matchers.push(Matcher::literal(
            TokenKind::UnaryOperator,
            &regex::escape(op.symbol()),
            unary,
        )?);
    }
    for word in expression::KEYWORDS {
        matchers.push(Matcher::literal(
            TokenKind::Literal,
            &format!(r"{}\b", word),
            boolean,
        )?);
    }
    matchers.push(punct(TokenKind::Comma, ",")?);
    matchers.push(punct(TokenKind::LeftPar, "(")?);
    matchers.push(punct(TokenKind::RightPar, ")")?);
    matchers.push(symbol()?);
    matchers.push(Matcher::literal(TokenKind::Literal, NUMBER, integer)?);
    Ok(Grammar::new(
        Pre,
        End,
        matchers,
        &[
            (TokenKind::UnaryOperator, Pre),
            (TokenKind::Name, Pre),
            (TokenKind::Literal, Pre),
            (TokenKind::LeftPar, Pre),
            (TokenKind::BinaryOperator, Post),
            (TokenKind::Comma, Post),
            (TokenKind::RightPar, Post),
        ],
    ))
}

fn build_var_decl() -> Result<Grammar<VarDeclState>, CompileError> {
    use VarDeclState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            keyword(TokenKind::Var, "var")?,
            punct(TokenKind::Comma, ",")?,
            name()?,
            punct(TokenKind::Semicolon, ";")?,
        ],
        &[
            (TokenKind::Var, Begin),
            (TokenKind::Name, Pre),
            (TokenKind::Comma, Post),
            (TokenKind::Semicolon, Post),
        ],
    ))
}

fn build_assign() -> Result<Grammar<AssignState>, CompileError> {
    use AssignState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            symbol()?,
            punct(TokenKind::Assign, "=")?,
            punct(TokenKind::Semicolon, ";")?,
            Matcher::Element(GrammarRule::Expression),
        ],
        &[
            (TokenKind::Name, Begin),
            (TokenKind::Assign, PreAssign),
            (TokenKind::Expression, PostAssign),
            (TokenKind::Semicolon, PostExpr),
        ],
    ))
}

fn build_return() -> Result<Grammar<ReturnState>, CompileError> {
    use ReturnState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            keyword(TokenKind::Return, "return")?,
            punct(TokenKind::Semicolon, ";")?,
            Matcher::Element(GrammarRule::Expression),
        ],
        &[
            (TokenKind::Return, Begin),
            (TokenKind::Expression, PreExpr),
            (TokenKind::Semicolon, PostExpr),
        ],
    ))
}

fn build_block() -> Result<Grammar<BlockState>, CompileError> {
    use BlockState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            punct(TokenKind::Semicolon, ";")?,
            punct(TokenKind::LeftBrace, "{")?,
            punct(TokenKind::RightBrace, "}")?,
            Matcher::Element(GrammarRule::Expression),
            Matcher::Element(GrammarRule::Statement),
        ],
        &[
            (TokenKind::LeftBrace, Begin),
            (TokenKind::Expression, Begin),
            (TokenKind::Semicolon, Begin),
            (TokenKind::Semicolon, InExpr),
            (TokenKind::Statement, InBlock),
            (TokenKind::RightBrace, InBlock),
        ],
    ))
}

fn build_if() -> Result<Grammar<IfState>, CompileError> {
    use IfState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            punct(TokenKind::LeftPar, "(")?,
            punct(TokenKind::RightPar, ")")?,
            keyword(TokenKind::If, "if")?,
            keyword(TokenKind::Else, "else")?,
            Matcher::Element(GrammarRule::Expression),
            Matcher::Element(GrammarRule::Statement),
        ],
        &[
            (TokenKind::If, Begin),
            (TokenKind::LeftPar, PreLeftPar),
            (TokenKind::Expression, PreExpr),
            (TokenKind::RightPar, PostExpr),
            (TokenKind::Statement, PreBlock),
            (TokenKind::Else, PostBlock),
            (TokenKind::Statement, PostElse),
        ],
    ))
}

fn build_statement() -> Result<Grammar<StatementState>, CompileError> {
    use StatementState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            Matcher::Element(GrammarRule::Assign),
            Matcher::Element(GrammarRule::If),
            Matcher::Element(GrammarRule::Return),
            Matcher::Element(GrammarRule::Block),
        ],
        &[
            (TokenKind::AssignStatement, Begin),
            (TokenKind::IfStatement, Begin),
            (TokenKind::ReturnStatement, Begin),
            (TokenKind::BlockStatement, Begin),
        ],
    ))
}

fn build_program() -> Result<Grammar<ProgramState>, CompileError> {
    use ProgramState::*;
    Ok(Grammar::new(
        Begin,
        End,
        vec![
            Matcher::Element(GrammarRule::VarDecl),
            Matcher::Element(GrammarRule::Statement),
        ],
        &[
            (TokenKind::VarDeclStatement, Begin),
            (TokenKind::Statement, AfterDef),
        ],
    ))
}

lazy_static! {
    static ref EXPRESSION: Result<Grammar<ExprState>, CompileError> = build_expression();
    static ref VAR_DECL: Result<Grammar<VarDeclState>, CompileError> = build_var_decl();
    static ref ASSIGN: Result<Grammar<AssignState>, CompileError> = build_assign();
    static ref RETURN: Result<Grammar<ReturnState>, CompileError> = build_return();
    static ref BLOCK: Result<Grammar<BlockState>, CompileError> = build_block();
    static ref IF: Result<Grammar<IfState>, CompileError> = build_if();
    static ref STATEMENT: Result<Grammar<StatementState>, CompileError> = build_statement();
    static ref PROGRAM: Result<Grammar<ProgramState>, CompileError> = build_program();
}

pub fn expression() -> Result<&'static Grammar<ExprState>, CompileError> {
    EXPRESSION.as_ref().map_err(Clone::clone)
}

pub fn var_decl() -> Result<&'static Grammar<VarDeclState>, CompileError> {
    VAR_DECL.as_ref().map_err(Clone::clone)
}

pub fn assign() -> Result<&'static Grammar<AssignState>, CompileError> {
    ASSIGN.as_ref().map_err(Clone::clone)
}

pub fn return_stmt() -> Result<&'static Grammar<ReturnState>, CompileError> {
    RETURN.as_ref().map_err(Clone::clone)
}

pub fn block() -> Result<&'static Grammar<BlockState>, CompileError> {
    BLOCK.as_ref().map_err(Clone::clone)
}

pub fn if_stmt() -> Result<&'static Grammar<IfState>, CompileError> {
    IF.as_ref().map_err(Clone::clone)
}

pub fn statement() -> Result<&'static Grammar<StatementState>, CompileError> {
    STATEMENT.as_ref().map_err(Clone::clone)
}

pub fn program() -> Result<&'static Grammar<ProgramState>, CompileError> {
    PROGRAM.as_ref().map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_grammars_build() {
        assert!(expression().is_ok());
        assert!(var_decl().is_ok());
        assert!(assign().is_ok());
        assert!(return_stmt().is_ok());
        assert!(block().is_ok());
        assert!(if_stmt().is_ok());
        assert!(statement().is_ok());
        assert!(program().is_ok());
    }

    #[test]
    fn test_expression_states_partition_tokens() {
        let grammar = expression().unwrap();
        let pre: Vec<TokenKind> = grammar.matchers(ExprState::Pre).map(Matcher::kind).collect();
        assert_eq!(
            pre,
            vec![
                TokenKind::UnaryOperator,
                TokenKind::UnaryOperator,
                TokenKind::UnaryOperator,
                TokenKind::Literal,
                TokenKind::Literal,
                TokenKind::LeftPar,
                TokenKind::Name,
                TokenKind::Literal,
            ]
        );
        let post: Vec<TokenKind> = grammar.matchers(ExprState::Post).map(Matcher::kind).collect();
        assert_eq!(post.len(), BinaryOp::ALL.len() + 2);
        assert!(!post.contains(&TokenKind::Name));
        assert_eq!(grammar.matchers(ExprState::End).count(), 0);
    }

    #[test]
    fn test_symbol_names_exclude_keywords() {
        assert_eq!(not_keyword("total"), Ok(TokenValue::None));
        assert_eq!(not_keyword("returned"), Ok(TokenValue::None));
        assert_eq!(
            not_keyword("else"),
            Err("'else' is a keyword, not an identifier".to_string())
        );
    }

    #[test]
    fn test_keywords_are_word_bounded() {
        let grammar = return_stmt().unwrap();
        let Some(Matcher::Literal { pattern, .. }) = grammar.matchers(ReturnState::Begin).next()
        else {
            panic!("return keyword matcher missing");
        };
        assert!(pattern.is_match("return x;"));
        assert!(!pattern.is_match("returned;"));
    }
}
