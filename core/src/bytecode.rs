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

use crate::env::{FunctionHandle, GlobalHandle, Parameter};
use crate::types::{Type, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Branch target, resolved through the owning chunk's label table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label(pub usize);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpCode {
    // Stack Manipulation
    Push(Value),
    Pop,

    // Variables
    LoadParam(usize),
    StoreParam(usize),
    LoadLocal(usize),
    StoreLocal(usize),
    LoadGlobal(GlobalHandle),
    StoreGlobal(GlobalHandle),

    // Arithmetic
    Neg,
    Add,
    Sub,
    Mul,
    Div,

    // Comparison
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    // Logic
    Not,

    // Control Flow
    Jmp(Label),
    JmpIfFalse(Label),

    // Functions
    Call {
        function: FunctionHandle,
        argc: usize,
        returns: Type,
    },
    Ret,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::Push(v) => write!(f, "Push {}", v),
            OpCode::LoadParam(i) => write!(f, "LoadParam {}", i),
            OpCode::StoreParam(i) => write!(f, "StoreParam {}", i),
            OpCode::LoadLocal(i) => write!(f, "LoadLocal {}", i),
            OpCode::StoreLocal(i) => write!(f, "StoreLocal {}", i),
            OpCode::LoadGlobal(h) => write!(f, "LoadGlobal #{}", h.0),
            OpCode::StoreGlobal(h) => write!(f, "StoreGlobal #{}", h.0),
            OpCode::Jmp(l) => write!(f, "Jmp L{}", l.0),
            OpCode::JmpIfFalse(l) => write!(f, "JmpIfFalse L{}", l.0),
            OpCode::Call {
                function,
                argc,
                returns,
            } => write!(f, "Call #{}/{} -> {}", function.0, argc, returns),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chunk {
    pub code: Vec<OpCode>,
    labels: Vec<Option<usize>>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, op: OpCode) {
        self.code.push(op);
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds `label` to the next instruction written.
    pub fn mark(&mut self, label: Label) {
        if let Some(slot) = self.labels.get_mut(label.0) {
            *slot = Some(self.code.len());
        }
    }

    /// Instruction index a label was bound to. May equal `code.len()`.
    pub fn target(&self, label: Label) -> Option<usize> {
        self.labels.get(label.0).copied().flatten()
    }
}

/// Disassembly: one instruction per line, labels on their own `L<n>:` line
/// before the instruction they are bound to.
impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        for ip in 0..=self.code.len() {
            for (label, target) in self.labels.iter().enumerate() {
                if *target == Some(ip) {
                    lines.push(format!("L{}:", label));
                }
            }
            if let Some(op) = self.code.get(ip) {
                lines.push(format!("{:04}  {}", ip, op));
            }
        }
        write!(f, "{}", lines.join("\n"))
    }
}

/// The compiled form of one program: what the engine needs to bind
/// arguments, reserve locals and execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub params: Vec<Parameter>,
    pub locals: usize,
    pub chunk: Chunk,
}

impl Artifact {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_resolve_forward() {
        let mut chunk = Chunk::new();
        let end = chunk.new_label();
        chunk.write(OpCode::Push(Value::Boolean(true)));
        chunk.write(OpCode::JmpIfFalse(end));
        chunk.write(OpCode::Push(Value::Integer(1)));
        chunk.write(OpCode::Ret);
        assert_eq!(chunk.target(end), None);
        chunk.mark(end);
        assert_eq!(chunk.target(end), Some(4));
        assert_eq!(chunk.target(Label(9)), None);
    }

    #[test]
    fn test_disassembly() {
        let mut chunk = Chunk::new();
        let skip = chunk.new_label();
        chunk.write(OpCode::LoadParam(0));
        chunk.write(OpCode::JmpIfFalse(skip));
        chunk.write(OpCode::Call {
            function: FunctionHandle(2),
            argc: 1,
            returns: Type::Void,
        });
        chunk.mark(skip);
        chunk.write(OpCode::Push(Value::Integer(-4)));
        chunk.write(OpCode::Ret);
        insta::assert_snapshot!(chunk.to_string(), @r"
        0000  LoadParam 0
        0001  JmpIfFalse L0
        0002  Call #2/1 -> Void
        L0:
        0003  Push -4
        0004  Ret
        ");
    }

    #[test]
    fn test_artifact_json_shape() {
        let mut chunk = Chunk::new();
        chunk.write(OpCode::LoadGlobal(GlobalHandle(7)));
        chunk.write(OpCode::Ret);
        let artifact = Artifact {
            params: vec![Parameter {
                name: "x".into(),
                ty: Type::Integer,
            }],
            locals: 1,
            chunk,
        };
        let json = artifact.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["locals"], 1);
        assert_eq!(value["params"][0]["name"], "x");
        assert_eq!(value["chunk"]["code"][0]["LoadGlobal"], 7);
        assert_eq!(value["chunk"]["code"][1], "Ret");
        assert_eq!(Artifact::from_json(&json).unwrap(), artifact);
    }
}
