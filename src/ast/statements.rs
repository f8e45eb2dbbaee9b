use std::slice::Iter;

use crate::Span;

use super::{
    ast::{Expr, Stmt},
    types::DeclaredType,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl BlockStmt {
    pub fn iter(&self) -> Iter<'_, Stmt> {
        self.body.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStmt {
    pub expression: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclStmt {
    pub identifier: String,
    /// `val` bindings reject later updates.
    pub is_constant: bool,
    /// Without an annotation the binding takes the initializer's type.
    pub declared_type: Option<DeclaredType>,
    pub assigned_value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOperator {
    Assign,
    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    ModuloAssign,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl AssignOperator {
    pub fn is_step(&self) -> bool {
        matches!(
            self,
            AssignOperator::PreIncrement
                | AssignOperator::PreDecrement
                | AssignOperator::PostIncrement
                | AssignOperator::PostDecrement
        )
    }
}

/// Assignment to a named variable. `value` is `None` only for increments and decrements.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: String,
    pub operator: AssignOperator,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintStmt {
    pub value: Option<Expr>,
    pub newline: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_body: Box<Stmt>,
    pub else_body: Option<Box<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub condition: Expr,
    pub span: Span,
}

/// `for (variable in range) body`; the parser guarantees `range` is a range expression.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: String,
    pub range: Expr,
    pub body: Box<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: DeclaredType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnDeclStmt {
    pub identifier: String,
    pub parameters: Vec<Parameter>,
    pub return_type: DeclaredType,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BreakStmt {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContinueStmt {
    pub span: Span,
}
