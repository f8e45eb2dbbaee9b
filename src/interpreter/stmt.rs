use crate::{
    ast::{
        ast::{ExprKind, Stmt},
        expressions::{BinaryOperator, RangeExpr},
        statements::{AssignOperator, AssignStmt, ForStmt, VarDeclStmt},
        types::DeclaredType,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    environment::AssignError,
    expr::{binary_operation, eval_expression, eval_range_bound},
    interpreter::{exec_statement_list, Interpreter},
    value::Value,
};

pub fn exec_statement<'a>(
    interpreter: &mut Interpreter<'a>,
    statement: &'a Stmt,
) -> Result<(), Error> {
    match statement {
        Stmt::Expression(expression_stmt) => {
            eval_expression(interpreter, &expression_stmt.expression)?;
        }
        Stmt::VarDecl(var_decl) => exec_var_decl(interpreter, var_decl)?,
        Stmt::Assign(assign) => exec_assign(interpreter, assign)?,
        Stmt::Print(print) => {
            let text = match &print.value {
                Some(value) => eval_expression(interpreter, value)?.to_string(),
                None => String::new(),
            };

            if print.newline {
                interpreter.output.println(&text);
            } else {
                interpreter.output.print(&text);
            }
        }
        Stmt::Block(block) => {
            interpreter.with_scope(|interpreter| exec_statement_list(interpreter, &block.body))?;
        }
        Stmt::If(if_stmt) => {
            if eval_expression(interpreter, &if_stmt.condition)?.is_truthy() {
                exec_statement(interpreter, &if_stmt.then_body)?;
            } else if let Some(else_body) = &if_stmt.else_body {
                exec_statement(interpreter, else_body)?;
            }
        }
        Stmt::While(while_stmt) => {
            while eval_expression(interpreter, &while_stmt.condition)?.is_truthy() {
                interpreter.signals.clear_loop();
                exec_statement(interpreter, &while_stmt.body)?;

                if leave_loop(interpreter) {
                    break;
                }
            }
        }
        Stmt::DoWhile(do_while) => loop {
            interpreter.signals.clear_loop();
            exec_statement(interpreter, &do_while.body)?;

            if leave_loop(interpreter) {
                break;
            }
            if !eval_expression(interpreter, &do_while.condition)?.is_truthy() {
                break;
            }
        },
        Stmt::For(for_stmt) => exec_for(interpreter, for_stmt)?,
        Stmt::FnDecl(function) => {
            // Functions are registered up front; nested declarations are inert
            tracing::debug!(function = function.identifier.as_str(), "ignoring nested function");
        }
        Stmt::Return(return_stmt) => {
            interpreter.return_value = match &return_stmt.value {
                Some(value) => Some(eval_expression(interpreter, value)?),
                None => None,
            };
            interpreter.signals.returning = true;
        }
        Stmt::Break(_) => interpreter.signals.breaking = true,
        Stmt::Continue(_) => interpreter.signals.continuing = true,
    }

    Ok(())
}

/// Consumes the loop signals after one iteration. Returns true when the
/// loop must stop: on `break`, or on a `return` that has to keep unwinding.
fn leave_loop(interpreter: &mut Interpreter) -> bool {
    if interpreter.signals.breaking {
        interpreter.signals.breaking = false;
        return true;
    }
    interpreter.signals.continuing = false;

    interpreter.signals.returning
}

fn exec_var_decl<'a>(
    interpreter: &mut Interpreter<'a>,
    var_decl: &'a VarDeclStmt,
) -> Result<(), Error> {
    let position = &var_decl.span.start;

    let value = match &var_decl.assigned_value {
        Some(expression) => Some(eval_expression(interpreter, expression)?),
        None => None,
    };

    let declared_type = var_decl
        .declared_type
        .or_else(|| {
            value
                .as_ref()
                .map(|value| value.value_type().declared_type())
        })
        .unwrap_or(DeclaredType::Int);

    let value = match value {
        // An inferred Range binding keeps its bounds
        Some(range @ Value::Range { .. }) if var_decl.declared_type.is_none() => range,
        Some(value) => interpreter.coerce(value, declared_type, position),
        None => Value::zero(declared_type),
    };

    let name = var_decl.identifier.as_str();
    if var_decl.is_constant {
        interpreter
            .environment
            .declare_constant(name, value, declared_type);
    } else {
        interpreter.environment.declare(name, value, declared_type);
    }

    Ok(())
}

fn compound_operator(operator: AssignOperator) -> Option<BinaryOperator> {
    Some(match operator {
        AssignOperator::AddAssign => BinaryOperator::Add,
        AssignOperator::SubtractAssign => BinaryOperator::Subtract,
        AssignOperator::MultiplyAssign => BinaryOperator::Multiply,
        AssignOperator::DivideAssign => BinaryOperator::Divide,
        AssignOperator::ModuloAssign => BinaryOperator::Modulo,
        _ => return None,
    })
}

fn exec_assign<'a>(interpreter: &mut Interpreter<'a>, assign: &'a AssignStmt) -> Result<(), Error> {
    let position = &assign.span.start;

    let value = match &assign.value {
        Some(expression) => Some(eval_expression(interpreter, expression)?),
        None => None,
    };

    let Some(binding) = interpreter.environment.lookup(&assign.target) else {
        interpreter.report(
            ErrorImpl::VariableNotDeclared {
                variable: assign.target.clone(),
            },
            position,
        );
        return Ok(());
    };
    let declared_type = binding.declared_type;
    let current = binding.value.clone();
    let mutable = binding.mutable;

    // A `val` refuses compound assignment before the operator runs, so a
    // refused `x /= 0` cannot fault
    if !mutable && !assign.operator.is_step() {
        interpreter.report(
            ErrorImpl::ValReassignment {
                variable: assign.target.clone(),
            },
            position,
        );
        return Ok(());
    }

    let new_value = if assign.operator.is_step() {
        let delta = match assign.operator {
            AssignOperator::PreIncrement | AssignOperator::PostIncrement => 1,
            _ => -1,
        };
        match current {
            Value::Integer(current) => Value::Integer(current.wrapping_add(delta)),
            Value::Float(current) => Value::Float(current + delta as f64),
            _ => return Ok(()),
        }
    } else {
        let value = value.unwrap_or(Value::Integer(0));
        let combined = match compound_operator(assign.operator) {
            Some(operator) => binary_operation(interpreter, operator, current, value, position)?,
            None => value,
        };
        interpreter.coerce(combined, declared_type, position)
    };

    store(interpreter, &assign.target, new_value, position);
    Ok(())
}

/// Writes through to an existing binding, reporting refusals.
pub(super) fn store(interpreter: &mut Interpreter, name: &str, value: Value, position: &Position) {
    match interpreter.environment.update(name, value) {
        Ok(()) => {}
        Err(AssignError::Immutable) => interpreter.report(
            ErrorImpl::ValReassignment {
                variable: name.to_string(),
            },
            position,
        ),
        Err(AssignError::Undeclared) => interpreter.report(
            ErrorImpl::VariableNotDeclared {
                variable: name.to_string(),
            },
            position,
        ),
    }
}

fn exec_for<'a>(interpreter: &mut Interpreter<'a>, for_stmt: &'a ForStmt) -> Result<(), Error> {
    let ExprKind::Range(range) = &for_stmt.range.unparenthesized().kind else {
        return Err(Error::new(
            ErrorImpl::ExpectedRange,
            for_stmt.range.span.start.clone(),
        ));
    };

    let start = eval_range_bound(interpreter, &range.start)?;
    let end = eval_range_bound(interpreter, &range.end)?;
    let step = match &range.step {
        Some(step) => {
            let value = eval_range_bound(interpreter, step)?;
            if value == 0 {
                return Err(Error::new(ErrorImpl::ZeroStep, step.span.start.clone()));
            }
            if value < 0 {
                return Err(Error::new(
                    ErrorImpl::NegativeStep { step: value },
                    step.span.start.clone(),
                ));
            }
            value
        }
        None => 1,
    };

    // Only a binding of the running call, or a global, is reused. A caller's
    // local of the same name is left alone.
    let frame_base = interpreter.frame_base;
    let reusable = interpreter
        .environment
        .lookup_with_scope(&for_stmt.variable)
        .is_some_and(|(scope, binding)| {
            (scope == 0 || scope >= frame_base)
                && binding.mutable
                && binding.declared_type == DeclaredType::Int
        });

    if reusable {
        run_for_loop(interpreter, for_stmt, range, start, end, step)
    } else {
        interpreter.with_scope(|interpreter| {
            interpreter.environment.declare(
                for_stmt.variable.as_str(),
                Value::Integer(start),
                DeclaredType::Int,
            );
            run_for_loop(interpreter, for_stmt, range, start, end, step)
        })
    }
}

fn run_for_loop<'a>(
    interpreter: &mut Interpreter<'a>,
    for_stmt: &'a ForStmt,
    range: &RangeExpr,
    start: i64,
    end: i64,
    step: i64,
) -> Result<(), Error> {
    let mut current = start;

    loop {
        let in_range = match (range.descending, range.until) {
            (false, true) => current < end,
            (false, false) => current <= end,
            (true, true) => current > end,
            (true, false) => current >= end,
        };
        if !in_range {
            break;
        }

        // The loop owns the counter; assignments to the variable in the body
        // do not change the iteration
        let stored = interpreter
            .environment
            .update(&for_stmt.variable, Value::Integer(current));
        debug_assert!(stored.is_ok(), "loop counter is a mutable Int binding");

        interpreter.signals.clear_loop();
        exec_statement(interpreter, &for_stmt.body)?;
        if leave_loop(interpreter) {
            break;
        }

        let next = if range.descending {
            current.checked_sub(step)
        } else {
            current.checked_add(step)
        };
        match next {
            Some(next) => current = next,
            None => break,
        }
    }

    Ok(())
}
