use crate::Span;

use super::{
    expressions::{BinaryExpr, CallExpr, RangeExpr, UnaryExpr},
    statements::{
        AssignStmt, BlockStmt, BreakStmt, ContinueStmt, DoWhileStmt, ExpressionStmt, FnDeclStmt,
        ForStmt, IfStmt, PrintStmt, ReturnStmt, VarDeclStmt, WhileStmt,
    },
};

/// An expression node together with the source span it was parsed from.
///
/// Every node owns its children; the tree is immutable once the parser
/// hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }

    pub fn get_span(&self) -> &Span {
        &self.span
    }

    /// Strips any number of enclosing parentheses.
    pub fn unparenthesized(&self) -> &Expr {
        match &self.kind {
            ExprKind::Parenthesized(inner) => inner.unparenthesized(),
            _ => self,
        }
    }
}

/// Expression Types
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Identifier(String),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    /// Only kept so that grouping survives in the tree; evaluates to its child.
    Parenthesized(Box<Expr>),
    Call(CallExpr),
    Range(RangeExpr),
    /// `run { ... }`, valued by its last expression statement.
    Run(BlockStmt),
}

/// Statement Types
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(VarDeclStmt),
    Assign(AssignStmt),
    Print(PrintStmt),
    Block(BlockStmt),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    FnDecl(FnDeclStmt),
    Return(ReturnStmt),
    Break(BreakStmt),
    Continue(ContinueStmt),
    Expression(ExpressionStmt),
}

impl Stmt {
    /// Returns the span of the statement.
    pub fn get_span(&self) -> &Span {
        match self {
            Stmt::VarDecl(stmt) => &stmt.span,
            Stmt::Assign(stmt) => &stmt.span,
            Stmt::Print(stmt) => &stmt.span,
            Stmt::Block(stmt) => &stmt.span,
            Stmt::If(stmt) => &stmt.span,
            Stmt::While(stmt) => &stmt.span,
            Stmt::DoWhile(stmt) => &stmt.span,
            Stmt::For(stmt) => &stmt.span,
            Stmt::FnDecl(stmt) => &stmt.span,
            Stmt::Return(stmt) => &stmt.span,
            Stmt::Break(stmt) => &stmt.span,
            Stmt::Continue(stmt) => &stmt.span,
            Stmt::Expression(stmt) => &stmt.span,
        }
    }
}

/// Root of a parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl Program {
    /// Iterates over the top-level function declarations in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FnDeclStmt> {
        self.body.iter().filter_map(|stmt| match stmt {
            Stmt::FnDecl(function) => Some(function),
            _ => None,
        })
    }

    /// Iterates over every top-level statement that is not a function declaration.
    pub fn top_level_statements(&self) -> impl Iterator<Item = &Stmt> {
        self.body
            .iter()
            .filter(|stmt| !matches!(stmt, Stmt::FnDecl(_)))
    }
}
