//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorTip};
use crate::Position;
use std::rc::Rc;

fn at(offset: u32) -> Position {
    Position(offset, Rc::new("test.kt".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        at(10),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(
        error.get_error_impl(),
        &ErrorImpl::UnrecognisedToken {
            token: "@".to_string()
        }
    );
}

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "identifier".to_string(),
        },
        at(42),
    );

    assert_eq!(error.get_position().0, 42);
    assert_eq!(error.get_position().1.as_str(), "test.kt");
}

#[test]
fn test_division_by_zero_error() {
    let error = Error::new(ErrorImpl::DivisionByZero, at(0));

    assert_eq!(error.get_error_name(), "DivisionByZero");
    assert_eq!(error.to_string(), "DivisionByZero at test.kt:0: division by zero");
}

#[test]
fn test_step_errors() {
    let zero = Error::new(ErrorImpl::ZeroStep, at(3));
    let negative = Error::new(ErrorImpl::NegativeStep { step: -2 }, at(3));

    assert_eq!(zero.get_error_name(), "ZeroStep");
    assert_eq!(negative.get_error_name(), "NegativeStep");
    assert!(negative.get_tip().to_string().contains("-2"));
}

#[test]
fn test_argument_count_errors() {
    let too_many = Error::new(
        ErrorImpl::UnexpectedArguments {
            function: "add".to_string(),
            expected: 2,
            received: 3,
        },
        at(0),
    );
    let too_few = Error::new(
        ErrorImpl::MissingArguments {
            function: "add".to_string(),
            expected: 2,
            received: 1,
        },
        at(0),
    );

    assert_eq!(too_many.get_error_name(), "UnexpectedArguments");
    assert_eq!(too_few.get_error_name(), "MissingArguments");
    assert_eq!(
        too_few.get_tip().to_string(),
        "`add` expects 2 arguments, received 1"
    );
}

#[test]
fn test_unknown_type_error() {
    let error = Error::new(
        ErrorImpl::UnknownType {
            type_: "Long".to_string(),
        },
        at(0),
    );

    assert_eq!(error.get_error_name(), "UnknownType");
}

#[test]
fn test_error_tip_none() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        at(0),
    );

    assert!(matches!(error.get_tip(), ErrorTip::None));
}

#[test]
fn test_error_tip_suggestion() {
    let error = Error::new(
        ErrorImpl::ValReassignment {
            variable: "x".to_string(),
        },
        at(0),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(tip) => assert!(tip.contains("val")),
        _ => panic!("Expected suggestion tip"),
    }
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}
