use std::cmp::Ordering;

use crate::{
    ast::{
        ast::{Expr, ExprKind, Stmt},
        expressions::{BinaryOperator, UnaryExpr, UnaryOperator},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    interpreter::Interpreter,
    stmt::{exec_statement, store},
    value::Value,
};

/// Evaluates an expression to a value.
pub fn eval_expression<'a>(
    interpreter: &mut Interpreter<'a>,
    expression: &'a Expr,
) -> Result<Value, Error> {
    let position = &expression.span.start;

    Ok(match &expression.kind {
        ExprKind::Integer(value) => Value::Integer(*value),
        ExprKind::Float(value) => Value::Float(*value),
        ExprKind::Boolean(value) => Value::Boolean(*value),
        ExprKind::String(value) => Value::String(value.clone()),
        ExprKind::Identifier(name) => match interpreter.environment.lookup(name) {
            Some(binding) => binding.value.clone(),
            None => {
                interpreter.report(
                    ErrorImpl::VariableNotDeclared {
                        variable: name.clone(),
                    },
                    position,
                );
                Value::Integer(0)
            }
        },
        ExprKind::Parenthesized(inner) => eval_expression(interpreter, inner)?,
        ExprKind::Binary(binary) => {
            // Both operands are always evaluated, `&&` and `||` included
            let left = eval_expression(interpreter, &binary.left)?;
            let right = eval_expression(interpreter, &binary.right)?;
            binary_operation(interpreter, binary.operator, left, right, position)?
        }
        ExprKind::Unary(unary) => eval_unary(interpreter, unary, position)?,
        ExprKind::Call(call) => {
            let mut arguments = Vec::with_capacity(call.arguments.len());
            for argument in &call.arguments {
                arguments.push(eval_expression(interpreter, argument)?);
            }
            interpreter.call_function(&call.callee, arguments, position)?
        }
        ExprKind::Range(range) => Value::Range {
            start: eval_range_bound(interpreter, &range.start)?,
            end: eval_range_bound(interpreter, &range.end)?,
        },
        ExprKind::Run(block) => interpreter.with_scope(|interpreter| {
            let mut last = Value::Integer(0);
            for statement in &block.body {
                last = match statement {
                    Stmt::Expression(expression_stmt) => {
                        eval_expression(interpreter, &expression_stmt.expression)?
                    }
                    statement => {
                        exec_statement(interpreter, statement)?;
                        Value::Integer(0)
                    }
                };
                if interpreter.signals.any() {
                    break;
                }
            }
            Ok(last)
        })?,
    })
}

/// Evaluates a range bound or step as an Int. Floats truncate.
pub fn eval_range_bound<'a>(
    interpreter: &mut Interpreter<'a>,
    expression: &'a Expr,
) -> Result<i64, Error> {
    let value = eval_expression(interpreter, expression)?;

    Ok(match value.as_integer() {
        Some(value) => value,
        None => {
            interpreter.report(
                ErrorImpl::TypeMatchError {
                    expected: String::from("Int"),
                    received: value.value_type().to_string(),
                },
                &expression.span.start,
            );
            0
        }
    })
}

fn invalid_operands(
    interpreter: &mut Interpreter,
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    position: &Position,
) {
    interpreter.report(
        ErrorImpl::InvalidOperands {
            operator: operator.to_string(),
            left: left.value_type().to_string(),
            right: right.value_type().to_string(),
        },
        position,
    );
}

/// Applies a binary operator to two evaluated operands.
///
/// Only integer division and modulo by zero fail; every other mismatch is
/// reported and produces a zero value.
pub fn binary_operation(
    interpreter: &mut Interpreter,
    operator: BinaryOperator,
    left: Value,
    right: Value,
    position: &Position,
) -> Result<Value, Error> {
    if operator.is_logical() {
        let result = match operator {
            BinaryOperator::And => left.is_truthy() && right.is_truthy(),
            _ => left.is_truthy() || right.is_truthy(),
        };
        return Ok(Value::Boolean(result));
    }

    if operator.is_comparison() {
        return Ok(compare(interpreter, operator, &left, &right, position));
    }

    if operator == BinaryOperator::Add
        && (matches!(left, Value::String(_)) || matches!(right, Value::String(_)))
    {
        return Ok(Value::String(format!("{}{}", left, right)));
    }

    if let (Value::Integer(l), Value::Integer(r)) = (&left, &right) {
        let (l, r) = (*l, *r);
        return Ok(Value::Integer(match operator {
            BinaryOperator::Add => l.wrapping_add(r),
            BinaryOperator::Subtract => l.wrapping_sub(r),
            BinaryOperator::Multiply => l.wrapping_mul(r),
            BinaryOperator::Divide => {
                if r == 0 {
                    return Err(Error::new(ErrorImpl::DivisionByZero, position.clone()));
                }
                l.wrapping_div(r)
            }
            _ => {
                if r == 0 {
                    return Err(Error::new(ErrorImpl::ModuloByZero, position.clone()));
                }
                l.wrapping_rem(r)
            }
        }));
    }

    let (Some(l), Some(r)) = (left.as_float(), right.as_float()) else {
        invalid_operands(interpreter, operator, &left, &right, position);
        return Ok(Value::Integer(0));
    };

    Ok(Value::Float(match operator {
        BinaryOperator::Add => l + r,
        BinaryOperator::Subtract => l - r,
        BinaryOperator::Multiply => l * r,
        BinaryOperator::Divide => l / r,
        _ => l % r,
    }))
}

fn compare(
    interpreter: &mut Interpreter,
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
    position: &Position,
) -> Value {
    let ordering = match (left, right) {
        (Value::Integer(l), Value::Integer(r)) => Some(l.cmp(r)),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        (Value::Boolean(l), Value::Boolean(r)) => Some(l.cmp(r)),
        (Value::Range { .. }, Value::Range { .. }) => {
            let equal = left == right;
            return match operator {
                BinaryOperator::Equals => Value::Boolean(equal),
                BinaryOperator::NotEquals => Value::Boolean(!equal),
                _ => {
                    invalid_operands(interpreter, operator, left, right, position);
                    Value::Boolean(false)
                }
            };
        }
        _ => match (left.as_float(), right.as_float()) {
            // NaN leaves this as None: every comparison but != is false
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => {
                interpreter.report(
                    ErrorImpl::TypeMatchError {
                        expected: left.value_type().to_string(),
                        received: right.value_type().to_string(),
                    },
                    position,
                );
                return Value::Boolean(false);
            }
        },
    };

    let result = match ordering {
        None => operator == BinaryOperator::NotEquals,
        Some(ordering) => match operator {
            BinaryOperator::Less => ordering == Ordering::Less,
            BinaryOperator::LessEquals => ordering != Ordering::Greater,
            BinaryOperator::Greater => ordering == Ordering::Greater,
            BinaryOperator::GreaterEquals => ordering != Ordering::Less,
            BinaryOperator::Equals => ordering == Ordering::Equal,
            _ => ordering != Ordering::Equal,
        },
    };

    Value::Boolean(result)
}

fn eval_unary<'a>(
    interpreter: &mut Interpreter<'a>,
    unary: &'a UnaryExpr,
    position: &Position,
) -> Result<Value, Error> {
    if unary.operator.is_step() {
        return eval_step(interpreter, unary, position);
    }

    let operand = eval_expression(interpreter, &unary.operand)?;

    Ok(match (unary.operator, operand) {
        (UnaryOperator::Not, operand) => Value::Boolean(!operand.is_truthy()),
        (UnaryOperator::Negate, Value::Integer(value)) => Value::Integer(value.wrapping_neg()),
        (UnaryOperator::Negate, Value::Float(value)) => Value::Float(-value),
        (_, operand @ (Value::Integer(_) | Value::Float(_))) => operand,
        (operator, operand) => {
            interpreter.report(
                ErrorImpl::InvalidOperands {
                    operator: operator.to_string(),
                    left: operand.value_type().to_string(),
                    right: operand.value_type().to_string(),
                },
                position,
            );
            operand
        }
    })
}

/// `++x`, `x++`, `--x`, `x--` inside an expression. On a named numeric
/// variable this writes back and yields the new (prefix) or old (postfix)
/// value; on anything else it just yields the operand.
fn eval_step<'a>(
    interpreter: &mut Interpreter<'a>,
    unary: &'a UnaryExpr,
    position: &Position,
) -> Result<Value, Error> {
    let ExprKind::Identifier(name) = &unary.operand.unparenthesized().kind else {
        return eval_expression(interpreter, &unary.operand);
    };

    let old = eval_expression(interpreter, &unary.operand)?;
    let delta = if unary.operator.is_increment() { 1 } else { -1 };
    let new = match &old {
        Value::Integer(value) => Value::Integer(value.wrapping_add(delta)),
        Value::Float(value) => Value::Float(value + delta as f64),
        _ => return Ok(old),
    };

    store(interpreter, name, new.clone(), position);

    Ok(if unary.operator.is_prefix_step() {
        new
    } else {
        old
    })
}
