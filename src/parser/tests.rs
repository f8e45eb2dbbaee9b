//! Unit tests for the parser module.
//!
//! This module contains tests for parsing various language constructs including:
//! - Variable declarations
//! - Function declarations
//! - Expressions and precedence
//! - Ranges
//! - Control flow statements
//! - Structural errors

use std::rc::Rc;

use crate::{
    ast::{
        ast::{ExprKind, Program, Stmt},
        expressions::{BinaryOperator, UnaryOperator},
        statements::AssignOperator,
        types::DeclaredType,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::lexer::tokenize,
};

use super::parser::parse;

fn parse_program(source: &str) -> Result<Program, Error> {
    let tokens = tokenize(source.to_string(), Some("test.kt".to_string())).unwrap();
    parse(tokens, Rc::new("test.kt".to_string()))
}

fn single_expr(source: &str) -> ExprKind {
    let program = parse_program(source).unwrap();
    match &program.body[0] {
        Stmt::Expression(stmt) => stmt.expression.kind.clone(),
        other => panic!("expected expression statement, found {:?}", other),
    }
}

#[test]
fn test_parse_variable_declaration() {
    let program = parse_program("var x: Int = 42").unwrap();

    let Stmt::VarDecl(decl) = &program.body[0] else {
        panic!("expected variable declaration");
    };
    assert_eq!(decl.identifier, "x");
    assert!(!decl.is_constant);
    assert_eq!(decl.declared_type, Some(DeclaredType::Int));
    assert_eq!(
        decl.assigned_value.as_ref().map(|value| &value.kind),
        Some(&ExprKind::Integer(42))
    );
}

#[test]
fn test_parse_val_without_type() {
    let program = parse_program("val pi = 3.14;").unwrap();

    let Stmt::VarDecl(decl) = &program.body[0] else {
        panic!("expected variable declaration");
    };
    assert!(decl.is_constant);
    assert_eq!(decl.declared_type, None);
}

#[test]
fn test_parse_declaration_needs_type_or_value() {
    let error = parse_program("var x").unwrap_err();
    assert_eq!(error.get_error_impl(), &ErrorImpl::ExpectedExplicitValue);
}

#[test]
fn test_parse_unknown_type() {
    let error = parse_program("var x: Long = 1").unwrap_err();
    assert_eq!(error.get_error_name(), "UnknownType");
}

#[test]
fn test_parse_function_declaration() {
    let program =
        parse_program("fun add(a: Int, b: Float): Float { return a + b }").unwrap();

    let Stmt::FnDecl(function) = &program.body[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(function.identifier, "add");
    assert_eq!(function.parameters.len(), 2);
    assert_eq!(function.parameters[1].param_type, DeclaredType::Float);
    assert_eq!(function.return_type, DeclaredType::Float);
    assert!(matches!(function.body.body[0], Stmt::Return(_)));
}

#[test]
fn test_parse_function_defaults_to_unit() {
    let program = parse_program("fun main() { }").unwrap();

    let Stmt::FnDecl(function) = &program.body[0] else {
        panic!("expected function declaration");
    };
    assert_eq!(function.return_type, DeclaredType::Unit);
    assert!(function.body.body.is_empty());
}

#[test]
fn test_parse_precedence() {
    let ExprKind::Binary(add) = single_expr("x + y * 2") else {
        panic!("expected binary expression");
    };
    assert_eq!(add.operator, BinaryOperator::Add);
    let ExprKind::Binary(multiply) = &add.right.kind else {
        panic!("expected multiplication on the right");
    };
    assert_eq!(multiply.operator, BinaryOperator::Multiply);
}

#[test]
fn test_parse_left_associative() {
    let ExprKind::Binary(outer) = single_expr("a - b - c") else {
        panic!("expected binary expression");
    };
    assert_eq!(outer.operator, BinaryOperator::Subtract);
    assert!(matches!(outer.left.kind, ExprKind::Binary(_)));
    assert!(matches!(outer.right.kind, ExprKind::Identifier(_)));
}

#[test]
fn test_parse_logical_precedence() {
    let ExprKind::Binary(or) = single_expr("a && b || c == d") else {
        panic!("expected binary expression");
    };
    assert_eq!(or.operator, BinaryOperator::Or);
    let ExprKind::Binary(and) = &or.left.kind else {
        panic!("expected && on the left");
    };
    assert_eq!(and.operator, BinaryOperator::And);
}

#[test]
fn test_parse_unary_binds_tighter_than_binary() {
    let ExprKind::Binary(add) = single_expr("-a + b") else {
        panic!("expected binary expression");
    };
    let ExprKind::Unary(negate) = &add.left.kind else {
        panic!("expected unary on the left");
    };
    assert_eq!(negate.operator, UnaryOperator::Negate);
}

#[test]
fn test_parse_parenthesized_is_kept() {
    let ExprKind::Binary(multiply) = single_expr("(1 + 2) * 3") else {
        panic!("expected binary expression");
    };
    assert!(matches!(multiply.left.kind, ExprKind::Parenthesized(_)));
}

#[test]
fn test_parse_call() {
    let ExprKind::Call(call) = single_expr("add(1, x * 2)") else {
        panic!("expected call");
    };
    assert_eq!(call.callee, "add");
    assert_eq!(call.arguments.len(), 2);
}

#[test]
fn test_parse_postfix_in_expression() {
    let program = parse_program("println(i++)").unwrap();

    let Stmt::Print(print) = &program.body[0] else {
        panic!("expected print");
    };
    let Some(ExprKind::Unary(unary)) = print.value.as_ref().map(|value| &value.kind) else {
        panic!("expected unary");
    };
    assert_eq!(unary.operator, UnaryOperator::PostIncrement);
}

#[test]
fn test_parse_ranges() {
    let program = parse_program(
        "for (i in 1..3) {}\nfor (i in 3 downTo 1 step 2) {}\nfor (i in 0 until n + 1) {}",
    )
    .unwrap();

    let ranges: Vec<_> = program
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::For(for_stmt) => match &for_stmt.range.kind {
                ExprKind::Range(range) => range.clone(),
                other => panic!("expected range, found {:?}", other),
            },
            other => panic!("expected for, found {:?}", other),
        })
        .collect();

    assert!(!ranges[0].until && !ranges[0].descending && ranges[0].step.is_none());
    assert!(ranges[1].descending);
    assert_eq!(
        ranges[1].step.as_ref().map(|step| &step.kind),
        Some(&ExprKind::Integer(2))
    );
    assert!(ranges[2].until);
    assert!(matches!(ranges[2].end.kind, ExprKind::Binary(_)));
}

#[test]
fn test_parse_for_requires_range() {
    let error = parse_program("for (i in 10) {}").unwrap_err();
    assert_eq!(error.get_error_impl(), &ErrorImpl::ExpectedRange);
}

#[test]
fn test_parse_assignments() {
    let program = parse_program("x = 1\nx += 2; x %= 3\nx++\n--x").unwrap();

    let operators: Vec<AssignOperator> = program
        .body
        .iter()
        .map(|stmt| match stmt {
            Stmt::Assign(assign) => assign.operator,
            other => panic!("expected assignment, found {:?}", other),
        })
        .collect();

    assert_eq!(
        operators,
        vec![
            AssignOperator::Assign,
            AssignOperator::AddAssign,
            AssignOperator::ModuloAssign,
            AssignOperator::PostIncrement,
            AssignOperator::PreDecrement,
        ]
    );
}

#[test]
fn test_parse_if_else_statement() {
    let program =
        parse_program("if (x > 0) { println(\"positive\") } else println(\"other\")").unwrap();

    let Stmt::If(if_stmt) = &program.body[0] else {
        panic!("expected if");
    };
    assert!(matches!(*if_stmt.then_body, Stmt::Block(_)));
    assert!(matches!(
        if_stmt.else_body.as_deref(),
        Some(Stmt::Print(_))
    ));
}

#[test]
fn test_parse_loops() {
    let program =
        parse_program("while (x < 10) { x++ }\ndo { x-- } while (x > 0)\nwhile (true) break")
            .unwrap();

    assert!(matches!(program.body[0], Stmt::While(_)));
    assert!(matches!(program.body[1], Stmt::DoWhile(_)));
    let Stmt::While(while_stmt) = &program.body[2] else {
        panic!("expected while");
    };
    assert!(matches!(*while_stmt.body, Stmt::Break(_)));
}

#[test]
fn test_parse_return_without_value() {
    let program = parse_program("fun f() { return }").unwrap();

    let Stmt::FnDecl(function) = &program.body[0] else {
        panic!("expected function declaration");
    };
    let Stmt::Return(ret) = &function.body.body[0] else {
        panic!("expected return");
    };
    assert!(ret.value.is_none());
}

#[test]
fn test_parse_run_block() {
    let program = parse_program("val x = run { val y = 2; y * 3 }").unwrap();

    let Stmt::VarDecl(decl) = &program.body[0] else {
        panic!("expected variable declaration");
    };
    let Some(ExprKind::Run(block)) = decl.assigned_value.as_ref().map(|value| &value.kind)
    else {
        panic!("expected run block");
    };
    assert_eq!(block.body.len(), 2);
}

#[test]
fn test_parse_missing_paren() {
    let error = parse_program("println(1").unwrap_err();
    assert_eq!(error.get_error_name(), "UnexpectedTokenDetailed");
}

#[test]
fn test_parse_unexpected_token() {
    let error = parse_program("var x = * 2").unwrap_err();
    assert_eq!(
        error.get_error_impl(),
        &ErrorImpl::UnexpectedToken {
            token: "*".to_string()
        }
    );
    assert_eq!(error.get_position().0, 8);
}
