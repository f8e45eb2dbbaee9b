use crate::{
    ast::{
        ast::{ExprKind, Stmt},
        expressions::BinaryOperator,
        statements::{AssignOperator, AssignStmt, ForStmt, PrintStmt, VarDeclStmt},
        types::{DeclaredType, ValueType},
    },
    errors::errors::{Error, ErrorImpl},
};

use super::{
    compiler::{storage_type, CodeGenerator, NEGATIVE_STEP, ZERO_STEP},
    expr::{emit_binary, emit_step, gen_expression, gen_range_bound},
};

pub fn gen_statement(generator: &mut CodeGenerator, statement: &Stmt) -> Result<(), Error> {
    match statement {
        Stmt::Expression(expression_stmt) => {
            gen_expression(generator, &expression_stmt.expression)?;
        }
        Stmt::VarDecl(var_decl) => gen_var_decl(generator, var_decl)?,
        Stmt::Assign(assign) => gen_assign(generator, assign)?,
        Stmt::Print(print) => gen_print(generator, print)?,
        Stmt::Block(block) => {
            generator.frame.push_scope();
            for statement in block.iter() {
                gen_statement(generator, statement)?;
            }
            generator.frame.pop_scope();
        }
        Stmt::If(if_stmt) => {
            let label = generator.next_label();
            let else_label = format!(".Lelse_{}", label);
            let end_label = format!(".Lendif_{}", label);

            let ty = gen_expression(generator, &if_stmt.condition)?;
            emit_branch_if_false(generator, ty, &else_label);
            gen_statement(generator, &if_stmt.then_body)?;
            generator.emit(format!("jmp {}", end_label));

            generator.emit_label(&else_label);
            if let Some(else_body) = &if_stmt.else_body {
                gen_statement(generator, else_body)?;
            }
            generator.emit_label(&end_label);
        }
        Stmt::While(while_stmt) => {
            let label = generator.next_label();
            let start = format!(".Lwhile_{}_start", label);
            let end = format!(".Lwhile_{}_end", label);

            generator.emit_label(&start);
            let ty = gen_expression(generator, &while_stmt.condition)?;
            emit_branch_if_false(generator, ty, &end);

            generator.loop_labels.push((start.clone(), end.clone()));
            gen_statement(generator, &while_stmt.body)?;
            generator.loop_labels.pop();

            generator.emit(format!("jmp {}", start));
            generator.emit_label(&end);
        }
        Stmt::DoWhile(do_while) => {
            let label = generator.next_label();
            let start = format!(".Ldo_{}_start", label);
            let condition = format!(".Ldo_{}_cond", label);
            let end = format!(".Ldo_{}_end", label);

            generator.emit_label(&start);
            generator.loop_labels.push((condition.clone(), end.clone()));
            gen_statement(generator, &do_while.body)?;
            generator.loop_labels.pop();

            generator.emit_label(&condition);
            let ty = gen_expression(generator, &do_while.condition)?;
            generator.emit_truthiness(ty);
            generator.emit("testq %rax, %rax");
            generator.emit(format!("jne {}", start));
            generator.emit_label(&end);
        }
        Stmt::For(for_stmt) => gen_for(generator, for_stmt)?,
        Stmt::FnDecl(function) => {
            tracing::debug!(function = function.identifier.as_str(), "ignoring nested function");
        }
        Stmt::Return(return_stmt) => {
            // At the top level only the current statement ends
            if let Some(exit) = generator.top_level_exit.clone() {
                if let Some(value) = &return_stmt.value {
                    gen_expression(generator, value)?;
                }
                generator.emit(format!("jmp {}", exit));
                return Ok(());
            }

            let return_type = generator
                .current_function
                .as_ref()
                .map(|(_, return_type)| *return_type)
                .unwrap_or(DeclaredType::Unit);

            match &return_stmt.value {
                Some(value) => {
                    let ty = gen_expression(generator, value)?;
                    if return_type == DeclaredType::Unit {
                        generator.emit_zero(ValueType::Integer);
                    } else {
                        generator.emit_coercion(ty, storage_type(return_type), &value.span.start);
                    }
                }
                None => generator.emit_zero(storage_type(return_type)),
            }

            let epilogue = generator.epilogue_label();
            generator.emit(format!("jmp {}", epilogue));
        }
        Stmt::Break(_) | Stmt::Continue(_) => {
            let is_break = matches!(statement, Stmt::Break(_));
            match generator.loop_labels.last().cloned() {
                Some((continue_label, break_label)) => generator.emit(format!(
                    "jmp {}",
                    if is_break { break_label } else { continue_label }
                )),
                None => match generator.top_level_exit.clone() {
                    Some(exit) => generator.emit(format!("jmp {}", exit)),
                    // Outside a loop the rest of the function body is skipped
                    None => {
                        let return_type = generator
                            .current_function
                            .as_ref()
                            .map(|(_, return_type)| *return_type)
                            .unwrap_or(DeclaredType::Unit);
                        generator.emit_zero(storage_type(return_type));
                        let epilogue = generator.epilogue_label();
                        generator.emit(format!("jmp {}", epilogue));
                    }
                },
            }
        }
    }

    Ok(())
}

/// Jumps to `label` when the value in the result registers is falsy.
fn emit_branch_if_false(generator: &mut CodeGenerator, ty: ValueType, label: &str) {
    generator.emit_truthiness(ty);
    generator.emit("testq %rax, %rax");
    generator.emit(format!("je {}", label));
}

fn gen_var_decl(generator: &mut CodeGenerator, var_decl: &VarDeclStmt) -> Result<(), Error> {
    let position = &var_decl.span.start;

    let emitted = match &var_decl.assigned_value {
        Some(value) => Some(gen_expression(generator, value)?),
        None => None,
    };

    let global = if generator.top_level_depth == Some(generator.frame.depth()) {
        generator.declaration_cell(var_decl)
    } else {
        None
    };

    let slot = match global {
        // Later top-level statements see this declaration's cell
        Some(slot) => {
            generator
                .globals
                .insert(var_decl.identifier.clone(), slot.clone());
            slot
        }
        None => {
            let ty = match (var_decl.declared_type, emitted) {
                (Some(declared_type), _) => storage_type(declared_type),
                (None, Some(ty)) => ty,
                (None, None) => ValueType::Integer,
            };
            // Declared after the initializer, which still sees any outer binding
            generator
                .frame
                .declare(&var_decl.identifier, ty, !var_decl.is_constant)
        }
    };

    match emitted {
        Some(ty) => generator.emit_coercion(ty, slot.ty, position),
        None => generator.emit_zero(slot.ty),
    }
    generator.emit_store(&slot);

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

fn gen_assign(generator: &mut CodeGenerator, assign: &AssignStmt) -> Result<(), Error> {
    let position = &assign.span.start;

    let value_ty = match &assign.value {
        Some(value) => Some(gen_expression(generator, value)?),
        None => None,
    };

    let Some(slot) = generator.lookup(&assign.target) else {
        generator.report(
            ErrorImpl::VariableNotDeclared {
                variable: assign.target.clone(),
            },
            position,
        );
        return Ok(());
    };

    if assign.operator.is_step() {
        let increment = matches!(
            assign.operator,
            AssignOperator::PreIncrement | AssignOperator::PostIncrement
        );
        generator.emit_load(&slot);
        emit_step(generator, &assign.target, &slot, increment, position);
        return Ok(());
    }

    if !slot.mutable {
        generator.report(
            ErrorImpl::ValReassignment {
                variable: assign.target.clone(),
            },
            position,
        );
        return Ok(());
    }

    let value_ty = value_ty.unwrap_or(ValueType::Integer);
    let result_ty = match compound_operator(assign.operator) {
        Some(operator) => {
            let right = generator.spill(value_ty);
            generator.emit_load(&slot);
            let left = generator.spill(slot.ty);
            generator.emit_load(&right);
            emit_binary(generator, operator, &left, value_ty, position)
        }
        None => value_ty,
    };

    generator.emit_coercion(result_ty, slot.ty, position);
    generator.emit_store(&slot);

    Ok(())
}

fn gen_print(generator: &mut CodeGenerator, print: &PrintStmt) -> Result<(), Error> {
    let suffix = if print.newline { "_nl" } else { "" };

    let Some(value) = &print.value else {
        if print.newline {
            generator.emit("leaq .Lfmt_nl(%rip), %rdi");
            generator.emit("xorl %eax, %eax");
            generator.emit("call printf@PLT");
        }
        return Ok(());
    };

    match gen_expression(generator, value)? {
        ValueType::Integer => {
            generator.emit("movq %rax, %rsi");
            generator.emit(format!("leaq .Lfmt_int{}(%rip), %rdi", suffix));
            generator.emit("xorl %eax, %eax");
        }
        ValueType::Float => {
            generator.emit(format!("leaq .Lfmt_float{}(%rip), %rdi", suffix));
            generator.emit("movl $1, %eax");
        }
        ValueType::Range => {
            // %rdx already holds the end bound
            generator.emit("movq %rax, %rsi");
            generator.emit(format!("leaq .Lfmt_range{}(%rip), %rdi", suffix));
            generator.emit("xorl %eax, %eax");
        }
        ty @ (ValueType::Boolean | ValueType::String) => {
            generator.emit_to_string(ty);
            generator.emit("movq %rax, %rsi");
            generator.emit(format!("leaq .Lfmt_str{}(%rip), %rdi", suffix));
            generator.emit("xorl %eax, %eax");
        }
    }
    generator.emit("call printf@PLT");

    Ok(())
}

fn gen_for(generator: &mut CodeGenerator, for_stmt: &ForStmt) -> Result<(), Error> {
    let ExprKind::Range(range) = &for_stmt.range.unparenthesized().kind else {
        return Err(Error::new(
            ErrorImpl::ExpectedRange,
            for_stmt.range.span.start.clone(),
        ));
    };

    let label = generator.next_label();
    let start = format!(".Lfor_{}_start", label);
    let next = format!(".Lfor_{}_next", label);
    let end = format!(".Lfor_{}_end", label);

    // Bounds and step are evaluated once; the counter lives apart from the
    // loop variable so the body cannot disturb the iteration
    gen_range_bound(generator, &range.start)?;
    let counter = generator.spill(ValueType::Integer);
    gen_range_bound(generator, &range.end)?;
    let limit = generator.spill(ValueType::Integer);
    let step = match &range.step {
        Some(step) => {
            gen_range_bound(generator, step)?;
            generator.emit("testq %rax, %rax");
            generator.emit(format!("je {}", ZERO_STEP));
            generator.emit(format!("js {}", NEGATIVE_STEP));
            generator.spill(ValueType::Integer)
        }
        None => {
            let step = generator.frame.temp(ValueType::Integer);
            generator.emit(format!("movq $1, {}", step.address(0)));
            step
        }
    };

    let reusable = generator
        .lookup(&for_stmt.variable)
        .filter(|slot| slot.mutable && slot.ty == ValueType::Integer);
    let scoped = reusable.is_none();
    let variable = match reusable {
        Some(slot) => slot,
        None => {
            generator.frame.push_scope();
            generator
                .frame
                .declare(&for_stmt.variable, ValueType::Integer, true)
        }
    };

    let exit_jump = match (range.descending, range.until) {
        (false, true) => "jge",
        (false, false) => "jg",
        (true, true) => "jle",
        (true, false) => "jl",
    };

    generator.emit_label(&start);
    generator.emit(format!("movq {}, %rax", counter.address(0)));
    generator.emit(format!("cmpq {}, %rax", limit.address(0)));
    generator.emit(format!("{} {}", exit_jump, end));
    generator.emit(format!("movq %rax, {}", variable.address(0)));

    generator.loop_labels.push((next.clone(), end.clone()));
    gen_statement(generator, &for_stmt.body)?;
    generator.loop_labels.pop();

    generator.emit_label(&next);
    generator.emit(format!("movq {}, %rax", counter.address(0)));
    generator.emit(format!(
        "{} {}, %rax",
        if range.descending { "subq" } else { "addq" },
        step.address(0)
    ));
    // Stepping past the Int range ends the loop
    generator.emit(format!("jo {}", end));
    generator.emit(format!("movq %rax, {}", counter.address(0)));
    generator.emit(format!("jmp {}", start));
    generator.emit_label(&end);

    if scoped {
        generator.frame.pop_scope();
    }

    Ok(())
}
