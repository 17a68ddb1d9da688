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

use crate::ast::{BinaryOp, Expr, ExprKind, If, LogicalOp, Stmt, UnaryOp};
use crate::bytecode::{Chunk, OpCode};
use crate::env::{Binding, Variable};
use crate::program::Program;
use crate::types::Value;

pub struct Compiler {
    pub chunk: Chunk,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            chunk: Chunk::new(),
        }
    }

    pub fn compile(mut self, program: &Program) -> Chunk {
        for stmt in &program.body {
            self.visit_stmt(stmt);
        }
        // Reachability was checked by the parser; this only keeps the tail
        // well-formed when the last statement is not itself a return.
        if !matches!(program.body.last(), Some(Stmt::Return(_))) {
            self.chunk.write(OpCode::Push(Value::Integer(0)));
            self.chunk.write(OpCode::Ret);
        }
        self.chunk
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(_) => {}
            Stmt::Assign(assign) => {
                self.visit_expr(assign.value());
                self.store(assign.target());
            }
            Stmt::Return(value) => {
                self.visit_expr(value);
                self.chunk.write(OpCode::Ret);
            }
            Stmt::Expression(Some(expr)) => {
                self.visit_expr(expr);
                if expr.ty().is_value() {
                    self.chunk.write(OpCode::Pop);
                }
            }
            Stmt::Expression(None) => {}
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.visit_stmt(s);
                }
            }
            Stmt::If(node) => self.visit_if(node),
        }
    }

    fn visit_if(&mut self, node: &If) {
        match node.precalc() {
            Some(true) => self.visit_stmt(node.then_branch()),
            Some(false) => {
                if let Some(else_branch) = node.else_branch() {
                    self.visit_stmt(else_branch);
                }
            }
            None => {
                let else_label = self.chunk.new_label();
                self.visit_expr(node.condition());
                self.chunk.write(OpCode::JmpIfFalse(else_label));
                self.visit_stmt(node.then_branch());
                match node.else_branch() {
                    Some(else_branch) => {
                        let end = self.chunk.new_label();
                        self.chunk.write(OpCode::Jmp(end));
                        self.chunk.mark(else_label);
                        self.visit_stmt(else_branch);
                        self.chunk.mark(end);
                    }
                    None => self.chunk.mark(else_label),
                }
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match expr.kind() {
            ExprKind::Constant(value) => self.chunk.write(OpCode::Push(*value)),
            ExprKind::Variable(variable) => self.load(variable),
            ExprKind::Unary(op, operand) => {
                self.visit_expr(operand);
                match op {
                    UnaryOp::Plus => {}
                    UnaryOp::Negate => self.chunk.write(OpCode::Neg),
                    UnaryOp::Not => self.chunk.write(OpCode::Not),
                }
            }
            ExprKind::Binary(op, left, right) => {
                self.visit_expr(left);
                self.visit_expr(right);
                let code = match op {
                    BinaryOp::Add => OpCode::Add,
                    BinaryOp::Sub => OpCode::Sub,
                    BinaryOp::Mul => OpCode::Mul,
                    BinaryOp::Div => OpCode::Div,
                    BinaryOp::Lt => OpCode::Lt,
                    BinaryOp::Le => OpCode::Le,
                    BinaryOp::Gt => OpCode::Gt,
                    BinaryOp::Ge => OpCode::Ge,
                    BinaryOp::Eq => OpCode::Eq,
                    BinaryOp::Neq => OpCode::Neq,
                    // Logical operators are built as ExprKind::Logical.
                    BinaryOp::And | BinaryOp::Or => return,
                };
                self.chunk.write(code);
            }
            ExprKind::Logical(op, left, right) => self.visit_logical(*op, left, right),
            ExprKind::Call {
                function,
                returns,
                args,
                ..
            } => {
                for arg in args {
                    self.visit_expr(arg);
                }
                self.chunk.write(OpCode::Call {
                    function: *function,
                    argc: args.len(),
                    returns: *returns,
                });
            }
        }
    }

    /// The right operand runs only when the left one does not settle the
    /// result.
    fn visit_logical(&mut self, op: LogicalOp, left: &Expr, right: &Expr) {
        let short = self.chunk.new_label();
        let end = self.chunk.new_label();
        self.visit_expr(left);
        match op {
            LogicalOp::Or => {
                self.chunk.write(OpCode::JmpIfFalse(short));
                self.chunk.write(OpCode::Push(Value::Boolean(true)));
                self.chunk.write(OpCode::Jmp(end));
                self.chunk.mark(short);
                self.visit_expr(right);
            }
            LogicalOp::And => {
                self.chunk.write(OpCode::JmpIfFalse(short));
                self.visit_expr(right);
                self.chunk.write(OpCode::Jmp(end));
                self.chunk.mark(short);
                self.chunk.write(OpCode::Push(Value::Boolean(false)));
            }
        }
        self.chunk.mark(end);
    }

    fn load(&mut self, variable: &Variable) {
        let op = match variable.binding {
            Binding::Parameter(index) => OpCode::LoadParam(index),
            Binding::Local(slot) => OpCode::LoadLocal(slot),
            Binding::Global(handle) => OpCode::LoadGlobal(handle),
        };
        self.chunk.write(op);
    }

    fn store(&mut self, variable: &Variable) {
        let op = match variable.binding {
            Binding::Parameter(index) => OpCode::StoreParam(index),
            Binding::Local(slot) => OpCode::StoreLocal(slot),
            Binding::Global(handle) => OpCode::StoreGlobal(handle),
        };
        self.chunk.write(op);
    }
}
