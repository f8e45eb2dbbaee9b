//! Type definitions for the AST.
//!
//! Two closed sets live here:
//!
//! - `DeclaredType`, the static types a program can write down
//! - `ValueType`, the run-time tag every evaluated expression carries
//!
//! There is no checking pass between them; both back-ends resolve types
//! lazily and apply the coercion rules at the point of use.

use std::fmt::Display;

/// A type written in the source: `Int`, `Float`, `String`, `Boolean` or `Unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Int,
    Float,
    String,
    Boolean,
    /// Return type only.
    Unit,
}

impl DeclaredType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Int" => Some(DeclaredType::Int),
            "Float" => Some(DeclaredType::Float),
            "String" => Some(DeclaredType::String),
            "Boolean" => Some(DeclaredType::Boolean),
            "Unit" => Some(DeclaredType::Unit),
            _ => None,
        }
    }

    /// The tag a value of this type carries at run time. `Unit` results are
    /// represented as Integer zero.
    pub fn value_type(&self) -> ValueType {
        match self {
            DeclaredType::Int | DeclaredType::Unit => ValueType::Integer,
            DeclaredType::Float => ValueType::Float,
            DeclaredType::String => ValueType::String,
            DeclaredType::Boolean => ValueType::Boolean,
        }
    }
}

impl Display for DeclaredType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Type tag of an evaluated expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Integer,
    Float,
    Boolean,
    Range,
    String,
}

impl ValueType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueType::Integer | ValueType::Float)
    }

    /// The declared type a binding gets when it is introduced without an annotation.
    pub fn declared_type(&self) -> DeclaredType {
        match self {
            ValueType::Integer | ValueType::Range => DeclaredType::Int,
            ValueType::Float => DeclaredType::Float,
            ValueType::Boolean => DeclaredType::Boolean,
            ValueType::String => DeclaredType::String,
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
