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

//! quill: a compiler for a small imperative language of integer and boolean
//! expressions, targeting a label-based stack bytecode.

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod cursor;
pub mod env;
pub mod error;
pub mod expression;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod statement;
pub mod types;
pub mod vm;

pub use bytecode::{Artifact, Chunk, Label, OpCode};
pub use env::{FunctionHandle, GlobalHandle, HostEnvironment, Parameter, Signature};
pub use error::{CompileError, Location, SemanticError};
pub use program::compile;
pub use types::{FunctionSignature, Type, Value};
pub use vm::{Host, NativeHost, RuntimeError, VM};
