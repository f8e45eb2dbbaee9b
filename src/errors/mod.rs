//! Error types and error handling for the toolchain.
//!
//! This module defines the error types used by every phase. It includes:
//!
//! - Error structures with source position information
//! - Specific error variants for lexing, parsing, evaluation and code generation
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions

pub mod errors;

#[cfg(test)]
mod tests;
