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

use crate::cursor::Position;
use crate::types::Type;
use std::fmt;
use thiserror::Error;

/// Where a compile error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Source(Position),
    /// Raised while binding the requested signature, before any parsing.
    EntryPoint,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Source(pos) => write!(f, "{}", pos),
            Location::EntryPoint => write!(f, "<entry point>"),
        }
    }
}

impl From<Position> for Location {
    fn from(pos: Position) -> Self {
        Location::Source(pos)
    }
}

fn argument_suffix(argument: &Option<usize>) -> String {
    match argument {
        Some(index) => format!(" (argument #{})", index),
        None => String::new(),
    }
}

/// A semantic defect found while constructing an AST node.
///
/// Nodes do not know where they came from; the parser attaches the location
/// with [`SemanticError::at`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("type mismatch for {construct}{}: expected '{expected}', got '{actual}'", argument_suffix(.argument))]
    TypeMismatch {
        construct: String,
        argument: Option<usize>,
        expected: Type,
        actual: Type,
    },
    #[error("arguments number mismatch for {construct}: expected {expected}, got {actual}")]
    ArgumentsNumberMismatch {
        construct: String,
        expected: usize,
        actual: usize,
    },
}

impl SemanticError {
    pub fn type_mismatch(
        construct: impl Into<String>,
        argument: Option<usize>,
        expected: Type,
        actual: Type,
    ) -> Self {
        SemanticError::TypeMismatch {
            construct: construct.into(),
            argument,
            expected,
            actual,
        }
    }

    pub fn at(self, at: impl Into<Location>) -> CompileError {
        let at = at.into();
        match self {
            SemanticError::TypeMismatch {
                construct,
                argument,
                expected,
                actual,
            } => CompileError::TypeMismatch {
                at,
                construct,
                argument,
                expected,
                actual,
            },
            SemanticError::ArgumentsNumberMismatch {
                construct,
                expected,
                actual,
            } => CompileError::ArgumentsNumberMismatch {
                at,
                construct,
                expected,
                actual,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Function,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Variable => write!(f, "variable"),
            SymbolKind::Function => write!(f, "function"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unexpected token at {at}: expected {expected}, found {found}")]
    UnexpectedToken {
        at: Position,
        expected: String,
        found: String,
    },
    #[error("Unrecognized token at {at}: {diagnostic}")]
    UnrecognizedToken { at: Position, diagnostic: String },
    #[error("Unrecognized statement at {at}: {diagnostic}")]
    UnrecognizedStatement { at: Position, diagnostic: String },
    #[error("Type mismatch at {at} for {construct}{}: expected '{expected}', got '{actual}'", argument_suffix(.argument))]
    TypeMismatch {
        at: Location,
        construct: String,
        argument: Option<usize>,
        expected: Type,
        actual: Type,
    },
    #[error("Arguments number mismatch at {at} for {construct}: expected {expected}, got {actual}")]
    ArgumentsNumberMismatch {
        at: Location,
        construct: String,
        expected: usize,
        actual: usize,
    },
    #[error("Unsupported identifier '{identifier}' at {at} (matches keyword)")]
    UnsupportedIdentifier { at: Position, identifier: String },
    #[error("Unresolved {kind} '{name}' at {at}")]
    UnresolvedIdentifier {
        at: Position,
        kind: SymbolKind,
        name: String,
    },
    #[error("End of function is reachable without any return statement")]
    UnreachableReturn,
    #[error("Invalid token pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl CompileError {
    /// Definitive errors describe a real defect in a construct that was
    /// otherwise recognised, so a speculative alternative must not swallow
    /// them.
    pub fn is_definitive(&self) -> bool {
        matches!(
            self,
            CompileError::TypeMismatch { .. }
                | CompileError::ArgumentsNumberMismatch { .. }
                | CompileError::UnsupportedIdentifier { .. }
                | CompileError::UnresolvedIdentifier { .. }
                | CompileError::InvalidPattern { .. }
        )
    }

    /// Diagnostic text without the location prefix, used when a soft
    /// failure is folded into an enclosing diagnostic.
    pub fn essence(&self) -> String {
        match self {
            CompileError::UnexpectedToken {
                expected, found, ..
            } => format!("expected {}, found {}", expected, found),
            CompileError::UnrecognizedToken { diagnostic, .. }
            | CompileError::UnrecognizedStatement { diagnostic, .. } => diagnostic.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_error_gains_position() {
        let err = SemanticError::type_mismatch(
            "return statement",
            None,
            Type::Integer,
            Type::Boolean,
        );
        let pos = Position {
            offset: 10,
            line: 2,
            col: 5,
        };
        let located = err.at(pos);
        assert_eq!(
            located.to_string(),
            "Type mismatch at 2:5 for return statement: expected 'Int', got 'Bool'"
        );
        assert!(located.is_definitive());
    }

    #[test]
    fn test_argument_index_in_message() {
        let err = SemanticError::type_mismatch("operator '+'", Some(1), Type::Integer, Type::Boolean);
        assert_eq!(
            err.to_string(),
            "type mismatch for operator '+' (argument #1): expected 'Int', got 'Bool'"
        );
        let located = err.at(Location::EntryPoint);
        assert!(located.to_string().contains("<entry point>"));
    }

    #[test]
    fn test_soft_errors_are_not_definitive() {
        let at = Position::start();
        assert!(!CompileError::UnrecognizedToken {
            at,
            diagnostic: "x".into()
        }
        .is_definitive());
        assert!(!CompileError::UnrecognizedStatement {
            at,
            diagnostic: "x".into()
        }
        .is_definitive());
        assert!(!CompileError::UnreachableReturn.is_definitive());
        assert!(CompileError::UnsupportedIdentifier {
            at,
            identifier: "if".into()
        }
        .is_definitive());
    }
}
