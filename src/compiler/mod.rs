//! Code generation module for the compiler.
//!
//! This module lowers the AST to x86-64 assembly in AT&T syntax for the
//! System V ABI. It handles:
//!
//! - Static layout of globals, locals and temporaries (`frame`)
//! - Lowering of expressions and statements (`expr`, `stmt`)
//! - Literal pools, function prologues and the runtime fault handlers
//!   (`compiler`)
//!
//! The listing links against the C library and `libm`.

pub mod compiler;
pub mod expr;
pub mod frame;
pub mod stmt;

#[cfg(test)]
mod tests;
