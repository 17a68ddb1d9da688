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

//! Whole-program parsing and the `compile` entry point.

use crate::ast::Stmt;
use crate::bytecode::Artifact;
use crate::compiler::Compiler;
use crate::cursor::Cursor;
use crate::env::{Environment, HostEnvironment, Signature};
use crate::error::CompileError;
use crate::grammar::{self, ProgramState};
use crate::lexer::TokenKind;
use crate::parser::{malformed, Parser};

/// A parsed, checked program body.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Declared local names, one slot each in declaration order.
    pub locals: Vec<String>,
    pub body: Vec<Stmt>,
}

/// Compiles `source` against the requested entry-point signature and the
/// host's globals and functions.
pub fn compile(
    source: &str,
    signature: &Signature,
    host: &HostEnvironment,
) -> Result<Artifact, CompileError> {
    signature.validate()?;
    let mut env = Environment::bind(signature, host);
    let program = parse_program(source, &mut env)?;
    let chunk = Compiler::new().compile(&program);
    Ok(Artifact {
        params: signature.params.clone(),
        locals: env.local_count(),
        chunk,
    })
}

/// Parses the optional declaration, then statements up to the end of input.
/// Locals become visible only after their declaration.
pub fn parse_program(source: &str, env: &mut Environment) -> Result<Program, CompileError> {
    let grammar = grammar::program()?;

    let mut parser = Parser::new(grammar, Cursor::new(source), env);
    let locals = match parser.accept(&[TokenKind::VarDeclStatement], ProgramState::AfterDef)? {
        Some(token) => {
            let (at, text) = (token.at, token.text);
            match token.into_stmt() {
                Some(Stmt::VarDecl(names)) => names,
                _ => return Err(malformed(at, TokenKind::VarDeclStatement, text)),
            }
        }
        None => Vec::new(),
    };
    let cursor = parser.finish();
    env.declare_locals(&locals);

    let mut parser = Parser::new(grammar, cursor, env);
    parser.set_state(ProgramState::AfterDef);
    let mut body = Vec::new();
    let mut returns = false;
    while !parser.at_end() {
        let stmt = parser.expect_statement(&[TokenKind::Statement], ProgramState::AfterDef)?;
        returns |= stmt.guarantees_return();
        #[cfg(feature = "trace")]
        eprintln!(
            "Stmt: {:03} | Returns: {} | At: {}",
            body.len(),
            stmt.guarantees_return(),
            parser.position()
        );
        body.push(stmt);
    }

    if !returns {
        return Err(CompileError::UnreachableReturn);
    }
    Ok(Program { locals, body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{FunctionHandle, GlobalHandle};
    use crate::types::{FunctionSignature, Type};

    fn xyz() -> Signature {
        Signature::integers(&["x", "y", "z"])
    }

    fn compile_str(source: &str) -> Result<Artifact, CompileError> {
        compile(source, &xyz(), &HostEnvironment::new())
    }

    #[test]
    fn test_locals_follow_declaration() {
        let artifact = compile_str("var r, s; r = x + y - z; return r;").unwrap();
        assert_eq!(artifact.locals, 2);
        assert_eq!(artifact.params.len(), 3);
    }

    #[test]
    fn test_var_only_at_program_start() {
        // past the declaration slot no statement form starts with `var`
        let err = compile_str("x = 1; var r; return x;").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnrecognizedStatement { at, .. } if at.col == 8
        ));
    }

    #[test]
    fn test_keyword_in_operand_position_is_not_definitive() {
        for (source, col) in [
            ("return x", 1),
            ("if (x > 0) return 1 else return 0;", 1),
            ("var r, ; return 0;", 1),
            ("x = 1; return x", 8),
        ] {
            match compile_str(source) {
                Err(CompileError::UnrecognizedStatement { at, .. }) => {
                    assert_eq!((at.line, at.col), (1, col), "{}", source)
                }
                other => panic!("{}: {:?}", source, other),
            }
        }
    }

    #[test]
    fn test_reachability() {
        assert_eq!(
            compile_str("if (x > 0) { return 1; }").unwrap_err(),
            CompileError::UnreachableReturn
        );
        assert!(compile_str("if (x > 0) { return 1; } else { return 0; }").is_ok());
        assert!(compile_str("if (true) return 1;").is_ok());
        assert_eq!(
            compile_str("if (false) return 1;").unwrap_err(),
            CompileError::UnreachableReturn
        );
        assert_eq!(compile_str("").unwrap_err(), CompileError::UnreachableReturn);
        assert_eq!(
            compile_str("  var r;  ").unwrap_err(),
            CompileError::UnreachableReturn
        );
    }

    #[test]
    fn test_dead_code_after_return_is_checked() {
        assert!(compile_str("return 1; x = 2;").is_ok());
        assert!(matches!(
            compile_str("return 1; x = true;"),
            Err(CompileError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_keyword_and_resolution_errors() {
        assert!(matches!(
            compile_str("var if; return 0;"),
            Err(CompileError::UnsupportedIdentifier { ref identifier, .. }) if identifier == "if"
        ));
        assert!(matches!(
            compile_str("return undeclared;"),
            Err(CompileError::UnresolvedIdentifier { ref name, .. }) if name == "undeclared"
        ));
        assert!(matches!(
            compile_str("return true;"),
            Err(CompileError::TypeMismatch {
                ref construct,
                expected: Type::Integer,
                actual: Type::Boolean,
                ..
            }) if construct == "return statement"
        ));
    }

    #[test]
    fn test_signature_checked_before_parsing() {
        let signature = Signature::new(Type::Integer)
            .param("x", Type::Integer)
            .param("flag", Type::Boolean);
        let err = compile("this is not a program", &signature, &HostEnvironment::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mismatch at <entry point> for parameter 'flag' (argument #1): expected 'Int', got 'Bool'"
        );
    }

    #[test]
    fn test_error_positions_span_lines() {
        let err = compile_str("var r;\nr = 1;\nreturn r +\n  true;").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Type mismatch at 3:10 for operator '+' (argument #1): expected 'Int', got 'Bool'"
        );
    }

    #[test]
    fn test_host_symbols() {
        let mut host = HostEnvironment::new();
        host.register_global("zero", Type::Integer, GlobalHandle(3))
            .unwrap();
        host.register_function(
            "print",
            FunctionSignature::new(vec![Type::Integer], Type::Void),
            FunctionHandle(0),
        )
        .unwrap();
        assert!(compile("print(zero); zero = x; return zero;", &xyz(), &host).is_ok());
        assert!(matches!(
            compile("return print(1);", &xyz(), &host),
            Err(CompileError::TypeMismatch { actual: Type::Void, .. })
        ));
    }
}
