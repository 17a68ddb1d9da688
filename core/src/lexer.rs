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

//! State-driven tokenizer.
//!
//! Which tokens are legal depends on where the parser stands, so every
//! grammar carries a table from its parse states to the ordered matchers
//! valid there. A matcher is either a literal pattern or a whole nested
//! grammar rule; the first matcher that succeeds produces the token.

use crate::ast::{BinaryOp, Expr, Stmt, UnaryOp};
use crate::cursor::{Cursor, Position};
use crate::env::Environment;
use crate::error::CompileError;
use crate::grammar::GrammarRule;
use crate::types::Value;
use regex::Regex;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Name,
    Literal,
    UnaryOperator,
    BinaryOperator,
    Comma,
    LeftPar,
    RightPar,
    LeftBrace,
    RightBrace,
    Assign,
    Semicolon,

    Var,
    Return,
    If,
    Else,

    Expression,
    VarDeclStatement,
    AssignStatement,
    ReturnStatement,
    IfStatement,
    BlockStatement,
    Statement,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Name => "identifier",
            TokenKind::Literal => "literal",
            TokenKind::UnaryOperator => "unary operator",
            TokenKind::BinaryOperator => "binary operator",
            TokenKind::Comma => "','",
            TokenKind::LeftPar => "'('",
            TokenKind::RightPar => "')'",
            TokenKind::LeftBrace => "'{'",
            TokenKind::RightBrace => "'}'",
            TokenKind::Assign => "'='",
            TokenKind::Semicolon => "';'",
            TokenKind::Var => "'var'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::Expression => "expression",
            TokenKind::VarDeclStatement => "variable declaration",
            TokenKind::AssignStatement => "assignment",
            TokenKind::ReturnStatement => "return statement",
            TokenKind::IfStatement => "if statement",
            TokenKind::BlockStatement => "block or expression statement",
            TokenKind::Statement => "statement",
        };
        write!(f, "{}", text)
    }
}

/// Payload carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    None,
    Constant(Value),
    Unary(UnaryOp),
    Binary(BinaryOp),
    Expr(Expr),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// Matched source text; the whole subtree's text for nested rules.
    pub text: &'src str,
    pub at: Position,
    pub value: TokenValue,
}

impl<'src> Token<'src> {
    pub fn into_expr(self) -> Option<Expr> {
        match self.value {
            TokenValue::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn into_stmt(self) -> Option<Stmt> {
        match self.value {
            TokenValue::Stmt(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn constant(&self) -> Option<Value> {
        match self.value {
            TokenValue::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn unary(&self) -> Option<UnaryOp> {
        match self.value {
            TokenValue::Unary(op) => Some(op),
            _ => None,
        }
    }

    pub fn binary(&self) -> Option<BinaryOp> {
        match self.value {
            TokenValue::Binary(op) => Some(op),
            _ => None,
        }
    }
}

/// Turns the matched text into a payload. An `Err` marks the text as a
/// recognised but malformed token.
pub type Build = fn(&str) -> Result<TokenValue, String>;

pub fn no_value(_: &str) -> Result<TokenValue, String> {
    Ok(TokenValue::None)
}

pub enum Matcher {
    Literal {
        kind: TokenKind,
        pattern: Regex,
        build: Build,
    },
    Element(GrammarRule),
}

impl Matcher {
    /// `pattern` is anchored at the match position.
    pub fn literal(kind: TokenKind, pattern: &str, build: Build) -> Result<Self, CompileError> {
        let anchored = format!("^(?:{})", pattern);
        let pattern = Regex::new(&anchored).map_err(|e| CompileError::InvalidPattern {
            pattern: anchored.clone(),
            message: e.to_string(),
        })?;
        Ok(Matcher::Literal {
            kind,
            pattern,
            build,
        })
    }

    pub fn kind(&self) -> TokenKind {
        match self {
            Matcher::Literal { kind, .. } => *kind,
            Matcher::Element(rule) => rule.kind(),
        }
    }
}

/// The pattern as written, without the anchoring wrapper.
fn source(pattern: &Regex) -> &str {
    let text = pattern.as_str();
    text.strip_prefix("^(?:")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(text)
}

/// Transition table of one grammar: for every state, the matchers that may
/// produce the next token, in priority order.
pub struct Grammar<S: 'static> {
    begin: S,
    end: S,
    matchers: Vec<Matcher>,
    table: Vec<(S, Vec<usize>)>,
}

impl<S: Copy + PartialEq + 'static> Grammar<S> {
    /// Each `(kind, state)` edge allows tokens of `kind` in `state`. Within a
    /// state, matchers keep the order of `matchers`.
    pub fn new(begin: S, end: S, matchers: Vec<Matcher>, edges: &[(TokenKind, S)]) -> Self {
        let mut table: Vec<(S, Vec<usize>)> = Vec::new();
        for (index, matcher) in matchers.iter().enumerate() {
            for (kind, state) in edges {
                if *kind != matcher.kind() {
                    continue;
                }
                match table.iter_mut().find(|(s, _)| s == state) {
                    Some((_, list)) => list.push(index),
                    None => table.push((*state, vec![index])),
                }
            }
        }
        Grammar {
            begin,
            end,
            matchers,
            table,
        }
    }

    pub fn begin(&self) -> S {
        self.begin
    }

    pub fn end(&self) -> S {
        self.end
    }

    pub fn matchers(&'static self, state: S) -> impl Iterator<Item = &'static Matcher> {
        self.table
            .iter()
            .find(|(s, _)| *s == state)
            .map(|(_, list)| list.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |index| self.matchers.get(*index))
    }
}

/// Produces one token at a time from a grammar table. The peeked token is
/// cached until it is committed or the state changes.
pub struct StateLexer<'src, S: 'static> {
    grammar: &'static Grammar<S>,
    state: S,
    cursor: Cursor<'src>,
    peeked: bool,
    cached: Option<Token<'src>>,
    /// Why each matcher tried before the peeked token (or all of them, when
    /// nothing matched) did not produce a token.
    failures: Vec<(TokenKind, String)>,
}

impl<'src, S: Copy + PartialEq + 'static> StateLexer<'src, S> {
    pub fn new(grammar: &'static Grammar<S>, cursor: Cursor<'src>) -> Self {
        StateLexer {
            grammar,
            state: grammar.begin(),
            cursor,
            peeked: false,
            cached: None,
            failures: Vec::new(),
        }
    }

    pub fn state(&self) -> S {
        self.state
    }

    pub fn set_state(&mut self, state: S) {
        self.state = state;
        self.revert_peek();
    }

    pub fn peek(&mut self, env: &Environment) -> Result<Option<&Token<'src>>, CompileError> {
        if !self.peeked {
            self.cursor.revert();
            self.failures.clear();
            self.cached = None;
            if self.state != self.grammar.end() {
                self.cursor.skip_whitespace();
                self.cached = self.scan(env)?;
            }
            self.peeked = true;
        }
        Ok(self.cached.as_ref())
    }

    fn scan(&mut self, env: &Environment) -> Result<Option<Token<'src>>, CompileError> {
        let at = self.cursor.peeked();
        for matcher in self.grammar.matchers(self.state) {
            match matcher {
                Matcher::Literal {
                    kind,
                    pattern,
                    build,
                } => {
                    let Some(text) = self.cursor.try_match(pattern) else {
                        self.failures
                            .push((*kind, format!("no match for '{}' regex", source(pattern))));
                        continue;
                    };
                    match build(text) {
                        Ok(value) => {
                            self.cursor.advance(text.len());
                            return Ok(Some(Token {
                                kind: *kind,
                                text,
                                at,
                                value,
                            }));
                        }
                        Err(diagnostic) => self.failures.push((*kind, diagnostic)),
                    }
                }
                Matcher::Element(rule) => match rule.parse(self.cursor.fork(), env) {
                    Ok((value, end)) => {
                        let stop = end.committed().offset;
                        let text = &self.cursor.text()[at.offset..stop];
                        self.cursor.advance(stop - at.offset);
                        return Ok(Some(Token {
                            kind: rule.kind(),
                            text,
                            at,
                            value,
                        }));
                    }
                    Err(err) if err.is_definitive() => return Err(err),
                    Err(err) => self.failures.push((
                        rule.kind(),
                        format!("cannot parse {}: {}", rule.kind(), err.essence()),
                    )),
                },
            }
        }
        Ok(None)
    }

    /// Consumes the peeked token.
    pub fn commit(&mut self) -> Option<Token<'src>> {
        let token = self.cached.take()?;
        self.cursor.commit();
        self.peeked = false;
        Some(token)
    }

    pub fn revert_peek(&mut self) {
        self.cursor.revert();
        self.cached = None;
        self.peeked = false;
        self.failures.clear();
    }

    /// Where the next token starts (or would start).
    pub fn position(&self) -> Position {
        match &self.cached {
            Some(token) => token.at,
            None => self.cursor.peeked(),
        }
    }

    pub fn at_end(&mut self) -> bool {
        self.revert_peek();
        self.cursor.at_end()
    }

    pub fn into_cursor(mut self) -> Cursor<'src> {
        self.revert_peek();
        self.cursor
    }

    /// Error for a failed expectation of one of `expected` at the peeked
    /// position. When the current state has a matcher for an expected kind
    /// the token is unrecognized and carries the matchers' diagnostics;
    /// otherwise it is unexpected.
    pub fn error(&self, expected: &[TokenKind]) -> CompileError {
        let at = self.position();
        let expected_text = expected
            .iter()
            .map(TokenKind::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        let found = match &self.cached {
            Some(token) if token.text.is_empty() => token.kind.to_string(),
            Some(token) => format!("'{}'", token.text),
            None => self.cursor.describe_next(),
        };

        let candidate = self
            .grammar
            .matchers(self.state)
            .any(|matcher| expected.contains(&matcher.kind()));
        if !candidate {
            return CompileError::UnexpectedToken {
                at,
                expected: expected_text,
                found,
            };
        }

        let diagnostics: Vec<&str> = self
            .failures
            .iter()
            .filter(|(kind, _)| expected.contains(kind))
            .map(|(_, diagnostic)| diagnostic.as_str())
            .collect();
        // An earlier matcher of another kind won before any candidate ran.
        let diagnostic = if diagnostics.is_empty() {
            format!("expected {}, found {}", expected_text, found)
        } else {
            diagnostics.join("; ")
        };
        CompileError::UnrecognizedToken { at, diagnostic }
    }
}
