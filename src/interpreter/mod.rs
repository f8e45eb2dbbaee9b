//! Tree-walking interpreter.
//!
//! This module evaluates a parsed program directly. It contains:
//!
//! - `value`: the run-time value sum type and its canonical string forms
//! - `environment`: the stack of scopes ("ribs") holding typed bindings
//! - `output`: where `print`/`println` text goes
//! - `interpreter`: the evaluator state, function table and entry point
//! - `stmt`/`expr`: statement execution and expression evaluation
//!
//! Control flow (`return`, `break`, `continue`) is carried by sticky signals
//! on the interpreter; arithmetic faults surface as `Err`, while resolution
//! problems are recorded as diagnostics and evaluation continues.

pub mod environment;
pub mod expr;
pub mod interpreter;
pub mod output;
pub mod stmt;
pub mod value;
