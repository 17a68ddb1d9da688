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

//! Reference stack interpreter for compiled artifacts.

use crate::bytecode::{Artifact, Label, OpCode};
use crate::env::{FunctionHandle, GlobalHandle, HostEnvironment};
use crate::error::SemanticError;
use crate::types::{FunctionSignature, Type, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Stack underflow at instruction {0}")]
    StackUnderflow(usize),
    #[error("Division by zero at instruction {0}")]
    DivisionByZero(usize),
    #[error("Argument count mismatch: expected {expected}, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },
    #[error("Host error: {0}")]
    Host(String),
    #[error("Jump to unbound label L{0}")]
    UnboundLabel(usize),
    #[error("Type confusion at instruction {ip}: expected {expected}, got {actual:?}")]
    TypeConfusion {
        ip: usize,
        expected: Type,
        actual: Option<Value>,
    },
    #[error("Execution ran past the end of the code without returning")]
    MissingReturn,
}

/// The host side of a compiled program: storage for globals and the
/// implementation of every function handle.
pub trait Host {
    fn load_global(&self, handle: GlobalHandle) -> Result<i64, RuntimeError>;
    fn store_global(&mut self, handle: GlobalHandle, value: i64) -> Result<(), RuntimeError>;
    fn call(
        &mut self,
        function: FunctionHandle,
        args: &[Value],
    ) -> Result<Option<Value>, RuntimeError>;
}

type NativeFn = Box<dyn FnMut(&[Value]) -> Option<Value>>;

/// A `Host` backed by Rust closures and an in-memory global table.
/// Handles are assigned in registration order.
#[derive(Default)]
pub struct NativeHost {
    env: HostEnvironment,
    globals: Vec<i64>,
    functions: Vec<NativeFn>,
}

impl NativeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global(&mut self, name: &str, initial: i64) -> Result<GlobalHandle, SemanticError> {
        let handle = GlobalHandle(self.globals.len() as u32);
        self.env.register_global(name, Type::Integer, handle)?;
        self.globals.push(initial);
        Ok(handle)
    }

    pub fn function<F>(
        &mut self,
        name: &str,
        signature: FunctionSignature,
        body: F,
    ) -> Result<FunctionHandle, SemanticError>
    where
        F: FnMut(&[Value]) -> Option<Value> + 'static,
    {
        let handle = FunctionHandle(self.functions.len() as u32);
        self.env.register_function(name, signature, handle)?;
        self.functions.push(Box::new(body));
        Ok(handle)
    }

    /// What the compiler needs to know about the registered symbols.
    pub fn environment(&self) -> &HostEnvironment {
        &self.env
    }

    pub fn value(&self, handle: GlobalHandle) -> Option<i64> {
        self.globals.get(handle.0 as usize).copied()
    }
}

impl Host for NativeHost {
    fn load_global(&self, handle: GlobalHandle) -> Result<i64, RuntimeError> {
        self.value(handle)
            .ok_or_else(|| RuntimeError::Host(format!("unknown global #{}", handle.0)))
    }

    fn store_global(&mut self, handle: GlobalHandle, value: i64) -> Result<(), RuntimeError> {
        let slot = self
            .globals
            .get_mut(handle.0 as usize)
            .ok_or_else(|| RuntimeError::Host(format!("unknown global #{}", handle.0)))?;
        *slot = value;
        Ok(())
    }

    fn call(
        &mut self,
        function: FunctionHandle,
        args: &[Value],
    ) -> Result<Option<Value>, RuntimeError> {
        let body = self
            .functions
            .get_mut(function.0 as usize)
            .ok_or_else(|| RuntimeError::Host(format!("unknown function #{}", function.0)))?;
        Ok(body(args))
    }
}

pub struct VM<'a, H: Host> {
    artifact: &'a Artifact,
    host: &'a mut H,
    stack: Vec<Value>,
    params: Vec<Value>,
    locals: Vec<Value>,
    ip: usize,
}

impl<'a, H: Host> VM<'a, H> {
    pub fn new(artifact: &'a Artifact, host: &'a mut H) -> Self {
        Self {
            artifact,
            host,
            stack: Vec::new(),
            params: Vec::new(),
            locals: Vec::new(),
            ip: 0,
        }
    }

    /// Executes the artifact from its first instruction with `args` bound to
    /// its parameters, in declaration order.
    pub fn run(&mut self, args: &[i64]) -> Result<i64, RuntimeError> {
        if args.len() != self.artifact.params.len() {
            return Err(RuntimeError::ArgumentCount {
                expected: self.artifact.params.len(),
                actual: args.len(),
            });
        }
        self.params = args.iter().map(|&a| Value::Integer(a)).collect();
        self.locals = vec![Value::Integer(0); self.artifact.locals];
        self.stack.clear();
        self.ip = 0;

        let artifact = self.artifact;
        let code = &artifact.chunk.code;
        while let Some(op) = code.get(self.ip) {
            #[cfg(feature = "trace")]
            eprintln!(
                "IP: {:03} | Op: {:?} | Stack: {}",
                self.ip,
                op,
                self.stack.len()
            );
            let at = self.ip;
            self.ip += 1;

            match op {
                OpCode::Push(v) => self.stack.push(*v),
                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::LoadParam(i) => {
                    let v = self.slot(false, *i)?;
                    self.stack.push(v);
                }
                OpCode::StoreParam(i) => {
                    let v = self.pop()?;
                    self.store(false, *i, v)?;
                }
                OpCode::LoadLocal(i) => {
                    let v = self.slot(true, *i)?;
                    self.stack.push(v);
                }
                OpCode::StoreLocal(i) => {
                    let v = self.pop()?;
                    self.store(true, *i, v)?;
                }
                OpCode::LoadGlobal(handle) => {
                    let v = self.host.load_global(*handle)?;
                    self.stack.push(Value::Integer(v));
                }
                OpCode::StoreGlobal(handle) => {
                    let v = self.pop_integer()?;
                    self.host.store_global(*handle, v)?;
                }

                OpCode::Neg => {
                    let a = self.pop_integer()?;
                    self.stack.push(Value::Integer(a.wrapping_neg()));
                }
                OpCode::Add => self.arithmetic(|a, b| Some(a.wrapping_add(b)))?,
                OpCode::Sub => self.arithmetic(|a, b| Some(a.wrapping_sub(b)))?,
                OpCode::Mul => self.arithmetic(|a, b| Some(a.wrapping_mul(b)))?,
                OpCode::Div => self.arithmetic(|a, b| (b != 0).then(|| a.wrapping_div(b)))?,

                OpCode::Eq => self.comparison(|a, b| a == b)?,
                OpCode::Neq => self.comparison(|a, b| a != b)?,
                OpCode::Lt => self.comparison(|a, b| a < b)?,
                OpCode::Le => self.comparison(|a, b| a <= b)?,
                OpCode::Gt => self.comparison(|a, b| a > b)?,
                OpCode::Ge => self.comparison(|a, b| a >= b)?,

                OpCode::Not => {
                    let a = self.pop_boolean()?;
                    self.stack.push(Value::Boolean(!a));
                }

                OpCode::Jmp(label) => self.jump(label.0)?,
                OpCode::JmpIfFalse(label) => {
                    if !self.pop_boolean()? {
                        self.jump(label.0)?;
                    }
                }

                OpCode::Call {
                    function,
                    argc,
                    returns,
                } => {
                    if self.stack.len() < *argc {
                        return Err(RuntimeError::StackUnderflow(at));
                    }
                    let args = self.stack.split_off(self.stack.len() - argc);
                    let result = self.host.call(*function, &args)?;
                    match (returns, result) {
                        (Type::Void, _) => {}
                        (expected, Some(v)) if v.ty() == *expected => self.stack.push(v),
                        (expected, actual) => {
                            return Err(RuntimeError::TypeConfusion {
                                ip: at,
                                expected: *expected,
                                actual,
                            })
                        }
                    }
                }
                OpCode::Ret => return self.pop_integer(),
            }
        }
        Err(RuntimeError::MissingReturn)
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack
            .pop()
            .ok_or(RuntimeError::StackUnderflow(self.ip - 1))
    }

    fn pop_integer(&mut self) -> Result<i64, RuntimeError> {
        let v = self.pop()?;
        v.as_integer().ok_or(self.confusion(Type::Integer, v))
    }

    fn pop_boolean(&mut self) -> Result<bool, RuntimeError> {
        let v = self.pop()?;
        v.as_boolean().ok_or(self.confusion(Type::Boolean, v))
    }

    fn confusion(&self, expected: Type, actual: Value) -> RuntimeError {
        RuntimeError::TypeConfusion {
            ip: self.ip - 1,
            expected,
            actual: Some(actual),
        }
    }

    fn arithmetic<F>(&mut self, op_fn: F) -> Result<(), RuntimeError>
    where
        F: Fn(i64, i64) -> Option<i64>,
    {
        let b = self.pop_integer()?;
        let a = self.pop_integer()?;
        let res = op_fn(a, b).ok_or(RuntimeError::DivisionByZero(self.ip - 1))?;
        self.stack.push(Value::Integer(res));
        Ok(())
    }

    fn comparison<F>(&mut self, op_fn: F) -> Result<(), RuntimeError>
    where
        F: Fn(i64, i64) -> bool,
    {
        let b = self.pop_integer()?;
        let a = self.pop_integer()?;
        self.stack.push(Value::Boolean(op_fn(a, b)));
        Ok(())
    }

    fn jump(&mut self, label: usize) -> Result<(), RuntimeError> {
        self.ip = self
            .artifact
            .chunk
            .target(Label(label))
            .ok_or(RuntimeError::UnboundLabel(label))?;
        Ok(())
    }

    fn slot(&self, local: bool, index: usize) -> Result<Value, RuntimeError> {
        let slots = if local { &self.locals } else { &self.params };
        slots.get(index).copied().ok_or_else(|| {
            RuntimeError::Host(format!("no {} slot {}", kind(local), index))
        })
    }

    fn store(&mut self, local: bool, index: usize, value: Value) -> Result<(), RuntimeError> {
        let slots = if local {
            &mut self.locals
        } else {
            &mut self.params
        };
        let slot = slots
            .get_mut(index)
            .ok_or_else(|| RuntimeError::Host(format!("no {} slot {}", kind(local), index)))?;
        *slot = value;
        Ok(())
    }
}

fn kind(local: bool) -> &'static str {
    if local {
        "local"
    } else {
        "parameter"
    }
}
