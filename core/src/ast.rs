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

use crate::env::{FunctionHandle, Variable};
use crate::error::SemanticError;
use crate::types::{FunctionSignature, Type, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Negate,
    Not,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 3] = [UnaryOp::Plus, UnaryOp::Negate, UnaryOp::Not];

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }

    fn operand_type(self) -> Type {
        match self {
            UnaryOp::Plus | UnaryOp::Negate => Type::Integer,
            UnaryOp::Not => Type::Boolean,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    /// Lexing order: a longer operator comes before any operator that is its
    /// prefix.
    pub const ALL: [BinaryOp; 12] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Div,
        BinaryOp::Mul,
        BinaryOp::And,
        BinaryOp::Or,
        BinaryOp::Ge,
        BinaryOp::Le,
        BinaryOp::Gt,
        BinaryOp::Lt,
        BinaryOp::Eq,
        BinaryOp::Neq,
    ];

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// Binding strength; lower binds tighter. Prefix operators are 0.
    pub fn priority(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div => 1,
            BinaryOp::Add | BinaryOp::Sub => 2,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 3,
            BinaryOp::Eq | BinaryOp::Neq => 4,
            BinaryOp::And => 5,
            BinaryOp::Or => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Neq => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// (operand type, result type)
    fn typing(self) -> (Type, Type) {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Add | BinaryOp::Sub => {
                (Type::Integer, Type::Integer)
            }
            BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
            | BinaryOp::Eq
            | BinaryOp::Neq => (Type::Integer, Type::Boolean),
            BinaryOp::And | BinaryOp::Or => (Type::Boolean, Type::Boolean),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Boolean connectives evaluated with short-circuit control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Constant(Value),
    Variable(Variable),
    Unary(UnaryOp, Box<Expr>),
    /// Strict binary operator; never `And`/`Or`.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Logical(LogicalOp, Box<Expr>, Box<Expr>),
    Call {
        name: String,
        function: FunctionHandle,
        returns: Type,
        args: Vec<Expr>,
    },
}

/// A typed expression. The result type is fixed when the node is built and
/// every constructor rejects ill-typed operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    kind: ExprKind,
    ty: Type,
}

fn check_operand(
    construct: &str,
    argument: usize,
    expected: Type,
    operand: &Expr,
) -> Result<(), SemanticError> {
    if operand.ty != expected {
        return Err(SemanticError::type_mismatch(
            construct,
            Some(argument),
            expected,
            operand.ty,
        ));
    }
    Ok(())
}

impl Expr {
    pub fn constant(value: Value) -> Self {
        Expr {
            ty: value.ty(),
            kind: ExprKind::Constant(value),
        }
    }

    pub fn variable(variable: Variable) -> Self {
        Expr {
            ty: variable.ty,
            kind: ExprKind::Variable(variable),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Result<Self, SemanticError> {
        let construct = format!("operator '{}'", op.symbol());
        check_operand(&construct, 0, op.operand_type(), &operand)?;
        Ok(Expr {
            ty: op.operand_type(),
            kind: ExprKind::Unary(op, Box::new(operand)),
        })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Result<Self, SemanticError> {
        let construct = format!("operator '{}'", op.symbol());
        let (operand, result) = op.typing();
        check_operand(&construct, 0, operand, &left)?;
        check_operand(&construct, 1, operand, &right)?;
        let (left, right) = (Box::new(left), Box::new(right));
        let kind = match op {
            BinaryOp::And => ExprKind::Logical(LogicalOp::And, left, right),
            BinaryOp::Or => ExprKind::Logical(LogicalOp::Or, left, right),
            _ => ExprKind::Binary(op, left, right),
        };
        Ok(Expr { kind, ty: result })
    }

    pub fn call(
        name: impl Into<String>,
        function: FunctionHandle,
        signature: &FunctionSignature,
        args: Vec<Expr>,
    ) -> Result<Self, SemanticError> {
        let name = name.into();
        let construct = format!("function '{}'", name);
        if args.len() != signature.params.len() {
            return Err(SemanticError::ArgumentsNumberMismatch {
                construct,
                expected: signature.params.len(),
                actual: args.len(),
            });
        }
        for (index, (arg, expected)) in args.iter().zip(&signature.params).enumerate() {
            check_operand(&construct, index, *expected, arg)?;
        }
        Ok(Expr {
            ty: signature.ret,
            kind: ExprKind::Call {
                name,
                function,
                returns: signature.ret,
                args,
            },
        })
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Compile-time value, if the expression is statically decidable.
    ///
    /// Variables and calls are never decidable. `&&` and `||` are decided
    /// by either operand alone when that operand settles the result, so
    /// `f() || true` evaluates to `true` without looking at `f()`.
    pub fn evaluate(&self) -> Option<Value> {
        match &self.kind {
            ExprKind::Constant(value) => Some(*value),
            ExprKind::Variable(_) | ExprKind::Call { .. } => None,
            ExprKind::Unary(op, operand) => {
                let value = operand.evaluate()?;
                match op {
                    UnaryOp::Plus => Some(value),
                    UnaryOp::Negate => Some(Value::Integer(value.as_integer()?.wrapping_neg())),
                    UnaryOp::Not => Some(Value::Boolean(!value.as_boolean()?)),
                }
            }
            ExprKind::Binary(op, left, right) => {
                let a = left.evaluate()?.as_integer()?;
                let b = right.evaluate()?.as_integer()?;
                fold_binary(*op, a, b)
            }
            ExprKind::Logical(op, left, right) => {
                let a = left.evaluate().and_then(Value::as_boolean);
                let b = right.evaluate().and_then(Value::as_boolean);
                // The operand value that decides the result on its own.
                let decisive = matches!(op, LogicalOp::Or);
                match (a, b) {
                    (Some(a), Some(b)) => Some(Value::Boolean(match op {
                        LogicalOp::And => a && b,
                        LogicalOp::Or => a || b,
                    })),
                    (Some(x), _) | (_, Some(x)) if x == decisive => Some(Value::Boolean(decisive)),
                    _ => None,
                }
            }
        }
    }
}

fn fold_binary(op: BinaryOp, a: i64, b: i64) -> Option<Value> {
    let value = match op {
        BinaryOp::Add => Value::Integer(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Integer(a.wrapping_sub(b)),
        BinaryOp::Mul => Value::Integer(a.wrapping_mul(b)),
        // Left for the engine to report.
        BinaryOp::Div if b == 0 => return None,
        BinaryOp::Div => Value::Integer(a.wrapping_div(b)),
        BinaryOp::Lt => Value::Boolean(a < b),
        BinaryOp::Le => Value::Boolean(a <= b),
        BinaryOp::Gt => Value::Boolean(a > b),
        BinaryOp::Ge => Value::Boolean(a >= b),
        BinaryOp::Eq => Value::Boolean(a == b),
        BinaryOp::Neq => Value::Boolean(a != b),
        BinaryOp::And | BinaryOp::Or => return None,
    };
    Some(value)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    target: Variable,
    value: Expr,
}

impl Assign {
    pub fn target(&self) -> &Variable {
        &self.target
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct If {
    condition: Expr,
    then_branch: Box<Stmt>,
    else_branch: Option<Box<Stmt>>,
    precalc: Option<bool>,
}

impl If {
    pub fn condition(&self) -> &Expr {
        &self.condition
    }

    pub fn then_branch(&self) -> &Stmt {
        &self.then_branch
    }

    pub fn else_branch(&self) -> Option<&Stmt> {
        self.else_branch.as_deref()
    }

    /// The condition's value when it was decidable at compile time.
    pub fn precalc(&self) -> Option<bool> {
        self.precalc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(Vec<String>),
    Assign(Assign),
    Return(Expr),
    /// `expr;` or the empty statement `;`.
    Expression(Option<Expr>),
    Block(Vec<Stmt>),
    If(If),
}

impl Stmt {
    pub fn assign(target: Variable, value: Expr) -> Result<Self, SemanticError> {
        if value.ty() != target.ty {
            return Err(SemanticError::type_mismatch(
                format!("assignment to variable '{}'", target.name),
                None,
                target.ty,
                value.ty(),
            ));
        }
        Ok(Stmt::Assign(Assign { target, value }))
    }

    pub fn ret(value: Expr) -> Result<Self, SemanticError> {
        if value.ty() != Type::Integer {
            return Err(SemanticError::type_mismatch(
                "return statement",
                None,
                Type::Integer,
                value.ty(),
            ));
        }
        Ok(Stmt::Return(value))
    }

    pub fn if_else(
        condition: Expr,
        then_branch: Stmt,
        else_branch: Option<Stmt>,
    ) -> Result<Self, SemanticError> {
        if condition.ty() != Type::Boolean {
            return Err(SemanticError::type_mismatch(
                "if condition",
                None,
                Type::Boolean,
                condition.ty(),
            ));
        }
        let precalc = condition.evaluate().and_then(Value::as_boolean);
        Ok(Stmt::If(If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
            precalc,
        }))
    }

    /// True when every path through the statement ends in a `return`.
    pub fn guarantees_return(&self) -> bool {
        match self {
            Stmt::Return(_) => true,
            Stmt::Block(stmts) => stmts.iter().any(Stmt::guarantees_return),
            Stmt::If(node) => {
                let else_returns = node
                    .else_branch()
                    .map_or(false, Stmt::guarantees_return);
                match node.precalc {
                    Some(true) => node.then_branch.guarantees_return(),
                    Some(false) => else_returns,
                    None => node.then_branch.guarantees_return() && else_returns,
                }
            }
            Stmt::VarDecl(_) | Stmt::Assign(_) | Stmt::Expression(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Binding;

    fn int(i: i64) -> Expr {
        Expr::constant(Value::Integer(i))
    }

    fn boolean(b: bool) -> Expr {
        Expr::constant(Value::Boolean(b))
    }

    fn param(name: &str, ty: Type) -> Expr {
        Expr::variable(Variable {
            name: name.to_string(),
            binding: Binding::Parameter(0),
            ty,
        })
    }

    #[test]
    fn test_binary_typing() {
        let sum = Expr::binary(BinaryOp::Add, int(1), int(2)).unwrap();
        assert_eq!(sum.ty(), Type::Integer);
        let cmp = Expr::binary(BinaryOp::Le, int(1), int(2)).unwrap();
        assert_eq!(cmp.ty(), Type::Boolean);

        let err = Expr::binary(BinaryOp::Add, int(1), boolean(true)).unwrap_err();
        assert_eq!(
            err,
            SemanticError::type_mismatch("operator '+'", Some(1), Type::Integer, Type::Boolean)
        );
        assert!(Expr::binary(BinaryOp::Eq, boolean(true), boolean(true)).is_err());
        assert!(Expr::unary(UnaryOp::Not, int(3)).is_err());
        assert!(Expr::unary(UnaryOp::Negate, boolean(false)).is_err());
    }

    #[test]
    fn test_logical_ops_are_distinguished() {
        let and = Expr::binary(BinaryOp::And, boolean(true), boolean(false)).unwrap();
        assert!(matches!(and.kind(), ExprKind::Logical(LogicalOp::And, _, _)));
        let add = Expr::binary(BinaryOp::Sub, int(3), int(1)).unwrap();
        assert!(matches!(add.kind(), ExprKind::Binary(BinaryOp::Sub, _, _)));
    }

    #[test]
    fn test_constant_folding() {
        let expr = Expr::binary(
            BinaryOp::Add,
            int(1),
            Expr::binary(BinaryOp::Mul, int(2), int(3)).unwrap(),
        )
        .unwrap();
        assert_eq!(expr.evaluate(), Some(Value::Integer(7)));

        let neg = Expr::unary(UnaryOp::Negate, int(i64::MIN)).unwrap();
        assert_eq!(neg.evaluate(), Some(Value::Integer(i64::MIN)));

        let div = Expr::binary(BinaryOp::Div, int(1), int(0)).unwrap();
        assert_eq!(div.evaluate(), None);

        let var = Expr::binary(BinaryOp::Add, param("x", Type::Integer), int(1)).unwrap();
        assert_eq!(var.evaluate(), None);
    }

    #[test]
    fn test_logical_folding_decisive_operand() {
        let unknown = || param("b", Type::Boolean);
        let or = |l, r| Expr::binary(BinaryOp::Or, l, r).unwrap().evaluate();
        let and = |l, r| Expr::binary(BinaryOp::And, l, r).unwrap().evaluate();

        assert_eq!(or(boolean(true), unknown()), Some(Value::Boolean(true)));
        assert_eq!(or(unknown(), boolean(true)), Some(Value::Boolean(true)));
        assert_eq!(or(unknown(), boolean(false)), None);
        assert_eq!(or(boolean(false), boolean(false)), Some(Value::Boolean(false)));

        assert_eq!(and(boolean(false), unknown()), Some(Value::Boolean(false)));
        assert_eq!(and(unknown(), boolean(false)), Some(Value::Boolean(false)));
        assert_eq!(and(boolean(true), unknown()), None);
        assert_eq!(and(boolean(true), boolean(true)), Some(Value::Boolean(true)));
    }

    #[test]
    fn test_call_arity_and_types() {
        let sig = FunctionSignature::new(vec![Type::Integer, Type::Boolean], Type::Integer);
        let ok = Expr::call("f", FunctionHandle(0), &sig, vec![int(1), boolean(true)]).unwrap();
        assert_eq!(ok.ty(), Type::Integer);

        let arity = Expr::call("f", FunctionHandle(0), &sig, vec![int(1)]).unwrap_err();
        assert_eq!(
            arity.to_string(),
            "arguments number mismatch for function 'f': expected 2, got 1"
        );
        let types = Expr::call("f", FunctionHandle(0), &sig, vec![int(1), int(2)]).unwrap_err();
        assert!(matches!(
            types,
            SemanticError::TypeMismatch { argument: Some(1), .. }
        ));
    }

    #[test]
    fn test_void_call_is_not_an_operand() {
        let sig = FunctionSignature::new(vec![], Type::Void);
        let call = Expr::call("log", FunctionHandle(1), &sig, vec![]).unwrap();
        assert_eq!(call.ty(), Type::Void);
        let err = Expr::binary(BinaryOp::Add, int(1), call).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::TypeMismatch { actual: Type::Void, .. }
        ));
    }

    #[test]
    fn test_statement_checks() {
        assert!(Stmt::ret(boolean(true)).is_err());
        assert!(Stmt::if_else(int(1), Stmt::Expression(None), None).is_err());

        let target = Variable {
            name: "r".into(),
            binding: Binding::Local(0),
            ty: Type::Integer,
        };
        let err = Stmt::assign(target, boolean(false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch for assignment to variable 'r': expected 'Int', got 'Bool'"
        );
    }

    #[test]
    fn test_return_reachability() {
        let ret = || Stmt::ret(int(1)).unwrap();
        let cond = || param("c", Type::Boolean);

        let only_then = Stmt::if_else(cond(), ret(), None).unwrap();
        assert!(!only_then.guarantees_return());

        let both = Stmt::if_else(cond(), ret(), Some(ret())).unwrap();
        assert!(both.guarantees_return());

        let folded = Stmt::if_else(boolean(true), ret(), None).unwrap();
        assert!(folded.guarantees_return());

        let dead_then = Stmt::if_else(boolean(false), ret(), None).unwrap();
        assert!(!dead_then.guarantees_return());

        let block = Stmt::Block(vec![Stmt::Expression(None), ret()]);
        assert!(block.guarantees_return());
        assert!(!Stmt::Block(vec![]).guarantees_return());
    }
}
