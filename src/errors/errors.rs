use std::fmt::Display;

use thiserror::Error;

use crate::Position;

/// A positioned error. Fatal errors travel through `Result`, non-fatal ones
/// are collected as diagnostics by the back-ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::ExpectedExplicitValue => "ExpectedExplicitValue",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::ValReassignment { .. } => "ValReassignment",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::MissingArguments { .. } => "MissingArguments",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::InvalidOperands { .. } => "InvalidOperands",
            ErrorImpl::DivisionByZero => "DivisionByZero",
            ErrorImpl::ModuloByZero => "ModuloByZero",
            ErrorImpl::ZeroStep => "ZeroStep",
            ErrorImpl::NegativeStep { .. } => "NegativeStep",
            ErrorImpl::ExpectedRange => "ExpectedRange",
            ErrorImpl::MissingMain => "MissingMain",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`", token))
            }
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::UnknownType { type_ } => ErrorTip::Suggestion(format!(
                "Unknown type `{}`, expected one of Int, Float, String, Boolean, Unit",
                type_
            )),
            ErrorImpl::ExpectedExplicitValue => ErrorTip::Suggestion(String::from(
                "Expected explicit value when no type is given",
            )),
            ErrorImpl::VariableNotDeclared { variable } => {
                ErrorTip::Suggestion(format!("Variable `{}` not declared", variable))
            }
            ErrorImpl::ValReassignment { variable } => ErrorTip::Suggestion(format!(
                "`{}` is a val and cannot be reassigned, declare it with var",
                variable
            )),
            ErrorImpl::FunctionNotDeclared { function } => {
                ErrorTip::Suggestion(format!("Function `{}` not declared", function))
            }
            ErrorImpl::FunctionAlreadyDeclared { function } => ErrorTip::Suggestion(format!(
                "Function `{}` already declared, the last declaration wins",
                function
            )),
            ErrorImpl::UnexpectedArguments {
                function,
                expected,
                received,
            }
            | ErrorImpl::MissingArguments {
                function,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "`{}` expects {} arguments, received {}",
                function, expected, received
            )),
            ErrorImpl::TypeMatchError { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::InvalidOperands {
                operator,
                left,
                right,
            } => ErrorTip::Suggestion(format!(
                "Operator `{}` cannot be applied to `{}` and `{}`",
                operator, left, right
            )),
            ErrorImpl::DivisionByZero | ErrorImpl::ModuloByZero => {
                ErrorTip::Suggestion(String::from("The right operand evaluated to zero"))
            }
            ErrorImpl::ZeroStep => {
                ErrorTip::Suggestion(String::from("A range step must be greater than zero"))
            }
            ErrorImpl::NegativeStep { step } => ErrorTip::Suggestion(format!(
                "A range step must be greater than zero, found {}; use downTo to count down",
                step
            )),
            ErrorImpl::ExpectedRange => ErrorTip::Suggestion(String::from(
                "A for loop iterates over `a..b`, `a until b` or `a downTo b`",
            )),
            ErrorImpl::MissingMain => {
                ErrorTip::Suggestion(String::from("Declare an entry point with `fun main() { }`"))
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}: {}", self.get_error_name(), self.position, self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message:?}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("unknown type: {type_:?}")]
    UnknownType { type_: String },
    #[error("expected explicit value when no type is given")]
    ExpectedExplicitValue,
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("val {variable:?} cannot be reassigned")]
    ValReassignment { variable: String },
    #[error("function {function:?} not declared")]
    FunctionNotDeclared { function: String },
    #[error("function {function:?} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("too many arguments to {function:?}: expected {expected:?}, received {received:?}")]
    UnexpectedArguments {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("missing arguments to {function:?}: expected {expected:?}, received {received:?}")]
    MissingArguments {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMatchError { expected: String, received: String },
    #[error("invalid operands for {operator:?}: {left:?} and {right:?}")]
    InvalidOperands {
        operator: String,
        left: String,
        right: String,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("range step of zero")]
    ZeroStep,
    #[error("negative range step: {step:?}")]
    NegativeStep { step: i64 },
    #[error("expected a range expression")]
    ExpectedRange,
    #[error("no main function declared")]
    MissingMain,
}
