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

//! Symbol bindings: what the host exposes, what the caller asks for, and the
//! per-compilation environment the parsers resolve names against.

use crate::error::{CompileError, Location, SemanticError};
use crate::types::{FunctionSignature, Type};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque host-chosen identifier of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalHandle(pub u32);

/// Opaque host-chosen identifier of a callable function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Binding {
    Parameter(usize),
    Local(usize),
    Global(GlobalHandle),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub binding: Binding,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFunction {
    pub handle: FunctionHandle,
    pub signature: FunctionSignature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
}

/// The calling signature a program is compiled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Parameter>,
    pub ret: Type,
}

impl Signature {
    pub fn new(ret: Type) -> Self {
        Signature {
            params: Vec::new(),
            ret,
        }
    }

    pub fn param(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.params.push(Parameter {
            name: name.into(),
            ty,
        });
        self
    }

    /// `(x, y, ...) -> Int` over integer parameters.
    pub fn integers(names: &[&str]) -> Self {
        names
            .iter()
            .fold(Signature::new(Type::Integer), |sig, name| {
                sig.param(*name, Type::Integer)
            })
    }

    /// Only 64-bit integers cross the entry point in either direction.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.ret != Type::Integer {
            return Err(SemanticError::type_mismatch(
                "return type",
                None,
                Type::Integer,
                self.ret,
            )
            .at(Location::EntryPoint));
        }
        for (index, param) in self.params.iter().enumerate() {
            if param.ty != Type::Integer {
                return Err(SemanticError::type_mismatch(
                    format!("parameter '{}'", param.name),
                    Some(index),
                    Type::Integer,
                    param.ty,
                )
                .at(Location::EntryPoint));
            }
        }
        Ok(())
    }
}

/// Globals and functions the host registers before compiling.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    globals: BTreeMap<String, (Type, GlobalHandle)>,
    functions: BTreeMap<String, HostFunction>,
}

impl HostEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_global(
        &mut self,
        name: impl Into<String>,
        ty: Type,
        handle: GlobalHandle,
    ) -> Result<(), SemanticError> {
        let name = name.into();
        if ty != Type::Integer {
            return Err(SemanticError::type_mismatch(
                format!("global '{}'", name),
                None,
                Type::Integer,
                ty,
            ));
        }
        self.globals.insert(name, (ty, handle));
        Ok(())
    }

    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        signature: FunctionSignature,
        handle: FunctionHandle,
    ) -> Result<(), SemanticError> {
        let name = name.into();
        for (index, param) in signature.params.iter().enumerate() {
            if !param.is_value() {
                return Err(SemanticError::type_mismatch(
                    format!("function '{}'", name),
                    Some(index),
                    Type::Integer,
                    *param,
                ));
            }
        }
        self.functions
            .insert(name, HostFunction { handle, signature });
        Ok(())
    }

    pub fn global(&self, name: &str) -> Option<(Type, GlobalHandle)> {
        self.globals.get(name).copied()
    }

    pub fn function(&self, name: &str) -> Option<&HostFunction> {
        self.functions.get(name)
    }
}

/// Names visible to one compilation.
///
/// Variables and functions are separate namespaces. Later bindings shadow
/// earlier ones: globals shadow parameters, locals shadow both.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    variables: HashMap<String, Variable>,
    functions: HashMap<String, HostFunction>,
    locals: usize,
}

impl Environment {
    pub fn bind(signature: &Signature, host: &HostEnvironment) -> Self {
        let mut env = Environment::default();
        for (index, param) in signature.params.iter().enumerate() {
            env.insert(Variable {
                name: param.name.clone(),
                binding: Binding::Parameter(index),
                ty: param.ty,
            });
        }
        for (name, (ty, handle)) in &host.globals {
            env.insert(Variable {
                name: name.clone(),
                binding: Binding::Global(*handle),
                ty: *ty,
            });
        }
        for (name, function) in &host.functions {
            env.functions.insert(name.clone(), function.clone());
        }
        env
    }

    fn insert(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    /// Adds integer locals in declaration order, one slot each.
    pub fn declare_locals(&mut self, names: &[String]) {
        for name in names {
            let slot = self.locals;
            self.locals += 1;
            self.insert(Variable {
                name: name.clone(),
                binding: Binding::Local(slot),
                ty: Type::Integer,
            });
        }
    }

    pub fn local_count(&self) -> usize {
        self.locals
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&HostFunction> {
        self.functions.get(name)
    }
}
