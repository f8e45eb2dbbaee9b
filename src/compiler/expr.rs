use crate::{
    ast::{
        ast::{Expr, ExprKind, Stmt},
        expressions::{BinaryOperator, CallExpr, UnaryExpr, UnaryOperator},
        types::{DeclaredType, ValueType},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    compiler::{
        storage_type, CodeGenerator, DIVISION_BY_ZERO, FLOAT_ARG_REGISTERS, INT_ARG_REGISTERS,
        MODULO_BY_ZERO,
    },
    frame::Slot,
    stmt::gen_statement,
};

/// Emits code leaving the value of `expression` in `%rax` (Int, Boolean,
/// String pointer), `%xmm0` (Float) or `%rax`/`%rdx` (Range bounds), and
/// returns which of those it produced.
pub fn gen_expression(
    generator: &mut CodeGenerator,
    expression: &Expr,
) -> Result<ValueType, Error> {
    let position = &expression.span.start;

    Ok(match &expression.kind {
        ExprKind::Integer(value) => {
            if i32::try_from(*value).is_ok() {
                generator.emit(format!("movq ${}, %rax", value));
            } else {
                generator.emit(format!("movabsq ${}, %rax", value));
            }
            ValueType::Integer
        }
        ExprKind::Float(value) => {
            let label = generator.intern_float(*value);
            generator.emit(format!("movsd {}(%rip), %xmm0", label));
            ValueType::Float
        }
        ExprKind::Boolean(value) => {
            generator.emit(format!("movq ${}, %rax", u8::from(*value)));
            ValueType::Boolean
        }
        ExprKind::String(value) => {
            let label = generator.intern_string(value);
            generator.emit(format!("leaq {}(%rip), %rax", label));
            ValueType::String
        }
        ExprKind::Identifier(name) => {
            let slot = resolve_variable(generator, name, position);
            generator.emit_load(&slot);
            slot.ty
        }
        ExprKind::Parenthesized(inner) => gen_expression(generator, inner)?,
        ExprKind::Binary(binary) => {
            // Left is spilled before right is evaluated, so nesting is safe
            // without a register allocator
            let left_ty = gen_expression(generator, &binary.left)?;
            let left = generator.spill(left_ty);
            let right_ty = gen_expression(generator, &binary.right)?;
            emit_binary(generator, binary.operator, &left, right_ty, position)
        }
        ExprKind::Unary(unary) => gen_unary(generator, unary, position)?,
        ExprKind::Call(call) => gen_call(generator, call, position)?,
        ExprKind::Range(range) => {
            gen_range_bound(generator, &range.start)?;
            let start = generator.spill(ValueType::Integer);
            gen_range_bound(generator, &range.end)?;
            generator.emit("movq %rax, %rdx");
            generator.emit(format!("movq {}, %rax", start.address(0)));
            ValueType::Range
        }
        ExprKind::Run(block) => {
            generator.frame.push_scope();

            let mut result = None;
            for (index, statement) in block.body.iter().enumerate() {
                match statement {
                    Stmt::Expression(last) if index + 1 == block.body.len() => {
                        result = Some(gen_expression(generator, &last.expression)?);
                    }
                    statement => gen_statement(generator, statement)?,
                }
            }

            generator.frame.pop_scope();
            match result {
                Some(ty) => ty,
                None => {
                    generator.emit("xorl %eax, %eax");
                    ValueType::Integer
                }
            }
        }
    })
}

/// Slot of a variable. An unknown name is reported and gets a fresh
/// zero-initialised Int slot so generation can continue.
pub fn resolve_variable(generator: &mut CodeGenerator, name: &str, position: &Position) -> Slot {
    if let Some(slot) = generator.lookup(name) {
        return slot;
    }

    generator.report(
        ErrorImpl::VariableNotDeclared {
            variable: name.to_string(),
        },
        position,
    );
    let slot = generator.frame.declare(name, ValueType::Integer, true);
    generator.emit(format!("movq $0, {}", slot.address(0)));
    slot
}

/// Emits a range bound or step, leaving an Int in `%rax`.
pub fn gen_range_bound(generator: &mut CodeGenerator, expression: &Expr) -> Result<(), Error> {
    let ty = gen_expression(generator, expression)?;
    generator.emit_coercion(ty, ValueType::Integer, &expression.span.start);
    Ok(())
}

fn set_instruction(operator: BinaryOperator) -> &'static str {
    match operator {
        BinaryOperator::Less => "setl",
        BinaryOperator::LessEquals => "setle",
        BinaryOperator::Greater => "setg",
        BinaryOperator::GreaterEquals => "setge",
        BinaryOperator::Equals => "sete",
        _ => "setne",
    }
}

/// Combines the spilled `left` operand with the right operand currently in
/// the result registers.
pub fn emit_binary(
    generator: &mut CodeGenerator,
    operator: BinaryOperator,
    left: &Slot,
    right_ty: ValueType,
    position: &Position,
) -> ValueType {
    let left_ty = left.ty;

    if operator.is_logical() {
        generator.emit_truthiness(right_ty);
        generator.emit("movq %rax, %r11");
        generator.emit_load(left);
        generator.emit_truthiness(left_ty);
        generator.emit(if operator == BinaryOperator::And {
            "andq %r11, %rax"
        } else {
            "orq %r11, %rax"
        });
        return ValueType::Boolean;
    }

    if operator.is_comparison() {
        emit_comparison(generator, operator, left, right_ty, position);
        return ValueType::Boolean;
    }

    if operator == BinaryOperator::Add
        && (left_ty == ValueType::String || right_ty == ValueType::String)
    {
        emit_concatenation(generator, left, right_ty);
        return ValueType::String;
    }

    if left_ty == ValueType::Integer && right_ty == ValueType::Integer {
        emit_integer_arithmetic(generator, operator, left);
        return ValueType::Integer;
    }

    if left_ty.is_numeric() && right_ty.is_numeric() {
        emit_float_operands(generator, left, right_ty);
        match operator {
            BinaryOperator::Add => generator.emit("addsd %xmm1, %xmm0"),
            BinaryOperator::Subtract => generator.emit("subsd %xmm1, %xmm0"),
            BinaryOperator::Multiply => generator.emit("mulsd %xmm1, %xmm0"),
            BinaryOperator::Divide => generator.emit("divsd %xmm1, %xmm0"),
            _ => generator.emit("call fmod@PLT"),
        }
        return ValueType::Float;
    }

    generator.report(
        ErrorImpl::InvalidOperands {
            operator: operator.to_string(),
            left: left_ty.to_string(),
            right: right_ty.to_string(),
        },
        position,
    );
    generator.emit("xorl %eax, %eax");
    ValueType::Integer
}

/// Puts the left operand in `%xmm0` and the right one in `%xmm1`, both as doubles.
fn emit_float_operands(generator: &mut CodeGenerator, left: &Slot, right_ty: ValueType) {
    if right_ty == ValueType::Integer {
        generator.emit("cvtsi2sdq %rax, %xmm0");
    }
    generator.emit("movapd %xmm0, %xmm1");
    generator.emit_load(left);
    if left.ty == ValueType::Integer {
        generator.emit("cvtsi2sdq %rax, %xmm0");
    }
}

fn emit_integer_arithmetic(generator: &mut CodeGenerator, operator: BinaryOperator, left: &Slot) {
    generator.emit("movq %rax, %rcx");
    generator.emit_load(left);

    match operator {
        BinaryOperator::Add => generator.emit("addq %rcx, %rax"),
        BinaryOperator::Subtract => generator.emit("subq %rcx, %rax"),
        BinaryOperator::Multiply => generator.emit("imulq %rcx, %rax"),
        _ => {
            let is_division = operator == BinaryOperator::Divide;
            let label = generator.next_label();
            let divide = format!(".Ldiv_{}", label);
            let done = format!(".Ldiv_{}_end", label);

            generator.emit("testq %rcx, %rcx");
            generator.emit(format!(
                "je {}",
                if is_division {
                    DIVISION_BY_ZERO
                } else {
                    MODULO_BY_ZERO
                }
            ));
            // idivq traps on MIN / -1; wrap instead
            generator.emit("cmpq $-1, %rcx");
            generator.emit(format!("jne {}", divide));
            generator.emit(if is_division {
                "negq %rax"
            } else {
                "xorl %eax, %eax"
            });
            generator.emit(format!("jmp {}", done));
            generator.emit_label(&divide);
            generator.emit("cqto");
            generator.emit("idivq %rcx");
            if !is_division {
                generator.emit("movq %rdx, %rax");
            }
            generator.emit_label(&done);
        }
    }
}

fn emit_comparison(
    generator: &mut CodeGenerator,
    operator: BinaryOperator,
    left: &Slot,
    right_ty: ValueType,
    position: &Position,
) {
    match (left.ty, right_ty) {
        (ValueType::String, ValueType::String) => {
            generator.emit("movq %rax, %rsi");
            generator.emit_load(left);
            generator.emit("movq %rax, %rdi");
            generator.emit("call strcmp@PLT");
            generator.emit("cmpl $0, %eax");
            generator.emit(format!("{} %al", set_instruction(operator)));
        }
        (ValueType::Integer, ValueType::Integer) | (ValueType::Boolean, ValueType::Boolean) => {
            generator.emit("movq %rax, %rcx");
            generator.emit_load(left);
            generator.emit("cmpq %rcx, %rax");
            generator.emit(format!("{} %al", set_instruction(operator)));
        }
        (ValueType::Range, ValueType::Range)
            if matches!(operator, BinaryOperator::Equals | BinaryOperator::NotEquals) =>
        {
            generator.emit("movq %rax, %r10");
            generator.emit("movq %rdx, %r11");
            generator.emit_load(left);
            generator.emit("cmpq %r10, %rax");
            generator.emit("sete %al");
            generator.emit("cmpq %r11, %rdx");
            generator.emit("sete %cl");
            generator.emit("andb %cl, %al");
            if operator == BinaryOperator::NotEquals {
                generator.emit("xorb $1, %al");
            }
        }
        (ValueType::Range, ValueType::Range) => {
            generator.report(
                ErrorImpl::InvalidOperands {
                    operator: operator.to_string(),
                    left: left.ty.to_string(),
                    right: right_ty.to_string(),
                },
                position,
            );
            generator.emit("xorl %eax, %eax");
        }
        (left_ty, right_ty) if left_ty.is_numeric() && right_ty.is_numeric() => {
            emit_float_operands(generator, left, right_ty);
            // comisd leaves ZF, PF and CF all set when unordered, so every
            // test below is false on NaN except !=
            match operator {
                BinaryOperator::Less => {
                    generator.emit("comisd %xmm0, %xmm1");
                    generator.emit("seta %al");
                }
                BinaryOperator::LessEquals => {
                    generator.emit("comisd %xmm0, %xmm1");
                    generator.emit("setae %al");
                }
                BinaryOperator::Greater => {
                    generator.emit("comisd %xmm1, %xmm0");
                    generator.emit("seta %al");
                }
                BinaryOperator::GreaterEquals => {
                    generator.emit("comisd %xmm1, %xmm0");
                    generator.emit("setae %al");
                }
                BinaryOperator::Equals => {
                    generator.emit("ucomisd %xmm1, %xmm0");
                    generator.emit("sete %al");
                    generator.emit("setnp %cl");
                    generator.emit("andb %cl, %al");
                }
                _ => {
                    generator.emit("ucomisd %xmm1, %xmm0");
                    generator.emit("setne %al");
                    generator.emit("setp %cl");
                    generator.emit("orb %cl, %al");
                }
            }
        }
        (left_ty, right_ty) => {
            generator.report(
                ErrorImpl::TypeMatchError {
                    expected: left_ty.to_string(),
                    received: right_ty.to_string(),
                },
                position,
            );
            generator.emit("xorl %eax, %eax");
        }
    }

    generator.emit("movzbq %al, %rax");
}

/// Concatenates into a fresh heap buffer sized for both operands.
fn emit_concatenation(generator: &mut CodeGenerator, left: &Slot, right_ty: ValueType) {
    generator.emit_to_string(right_ty);
    let right_text = generator.spill(ValueType::String);
    generator.emit_load(left);
    generator.emit_to_string(left.ty);
    let left_text = generator.spill(ValueType::String);

    let length = generator.frame.temp(ValueType::Integer);
    let buffer = generator.frame.temp(ValueType::String);

    generator.emit(format!("movq {}, %rdi", left_text.address(0)));
    generator.emit("call strlen@PLT");
    generator.emit(format!("movq %rax, {}", length.address(0)));
    generator.emit(format!("movq {}, %rdi", right_text.address(0)));
    generator.emit("call strlen@PLT");
    generator.emit(format!("addq {}, %rax", length.address(0)));
    generator.emit("leaq 1(%rax), %rdi");
    generator.emit("call malloc@PLT");
    generator.emit(format!("movq %rax, {}", buffer.address(0)));
    generator.emit("movq %rax, %rdi");
    generator.emit(format!("movq {}, %rsi", left_text.address(0)));
    generator.emit("call strcpy@PLT");
    generator.emit(format!("movq {}, %rdi", buffer.address(0)));
    generator.emit(format!("movq {}, %rsi", right_text.address(0)));
    generator.emit("call strcat@PLT");
    generator.emit(format!("movq {}, %rax", buffer.address(0)));
}

fn gen_unary(
    generator: &mut CodeGenerator,
    unary: &UnaryExpr,
    position: &Position,
) -> Result<ValueType, Error> {
    if unary.operator.is_step() {
        return gen_step(generator, unary, position);
    }

    let ty = gen_expression(generator, &unary.operand)?;

    Ok(match (unary.operator, ty) {
        (UnaryOperator::Not, ty) => {
            generator.emit_truthiness(ty);
            generator.emit("xorq $1, %rax");
            ValueType::Boolean
        }
        (UnaryOperator::Negate, ValueType::Integer) => {
            generator.emit("negq %rax");
            ValueType::Integer
        }
        (UnaryOperator::Negate, ValueType::Float) => {
            generator.emit("movq %xmm0, %rax");
            generator.emit("btcq $63, %rax");
            generator.emit("movq %rax, %xmm0");
            ValueType::Float
        }
        (_, ty) if ty.is_numeric() => ty,
        (operator, ty) => {
            generator.report(
                ErrorImpl::InvalidOperands {
                    operator: operator.to_string(),
                    left: ty.to_string(),
                    right: ty.to_string(),
                },
                position,
            );
            ty
        }
    })
}

/// `++x`, `x++`, `--x`, `x--` on a named numeric variable: writes back and
/// yields the new (prefix) or old (postfix) value. Anything else just
/// yields the operand.
fn gen_step(
    generator: &mut CodeGenerator,
    unary: &UnaryExpr,
    position: &Position,
) -> Result<ValueType, Error> {
    let ExprKind::Identifier(name) = &unary.operand.unparenthesized().kind else {
        return gen_expression(generator, &unary.operand);
    };

    let slot = resolve_variable(generator, name, position);
    generator.emit_load(&slot);
    emit_step(generator, name, &slot, unary.operator.is_increment(), position);

    match slot.ty {
        ValueType::Integer if unary.operator.is_prefix_step() => {
            generator.emit("movq %rcx, %rax")
        }
        ValueType::Float if unary.operator.is_prefix_step() => {
            generator.emit("movapd %xmm2, %xmm0")
        }
        _ => {}
    }

    Ok(slot.ty)
}

/// With the current value of `name` loaded, computes the stepped value
/// (`%rcx` for Int, `%xmm2` for Float) and writes it back. Other types are
/// left alone.
pub fn emit_step(
    generator: &mut CodeGenerator,
    name: &str,
    slot: &Slot,
    increment: bool,
    position: &Position,
) {
    let store = match slot.ty {
        ValueType::Integer => {
            generator.emit(format!(
                "leaq {}(%rax), %rcx",
                if increment { 1 } else { -1 }
            ));
            format!("movq %rcx, {}", slot.address(0))
        }
        ValueType::Float => {
            let one = generator.intern_float(1.0);
            generator.emit("movapd %xmm0, %xmm2");
            generator.emit(format!(
                "{} {}(%rip), %xmm2",
                if increment { "addsd" } else { "subsd" },
                one
            ));
            format!("movsd %xmm2, {}", slot.address(0))
        }
        _ => return,
    };

    if slot.mutable {
        generator.emit(store);
    } else {
        generator.report(
            ErrorImpl::ValReassignment {
                variable: name.to_string(),
            },
            position,
        );
    }
}

fn gen_call(
    generator: &mut CodeGenerator,
    call: &CallExpr,
    position: &Position,
) -> Result<ValueType, Error> {
    let signature = generator
        .functions
        .get(call.callee.as_str())
        .map(|sig| (sig.symbol.clone(), sig.declaration));

    let Some((symbol, declaration)) = signature else {
        for argument in &call.arguments {
            gen_expression(generator, argument)?;
        }
        generator.report(
            ErrorImpl::FunctionNotDeclared {
                function: call.callee.clone(),
            },
            position,
        );
        generator.emit("xorl %eax, %eax");
        return Ok(ValueType::Integer);
    };

    let expected = declaration.parameters.len();
    let received = call.arguments.len();
    if expected != received {
        for argument in &call.arguments {
            gen_expression(generator, argument)?;
        }
        let error = if received > expected {
            ErrorImpl::UnexpectedArguments {
                function: call.callee.clone(),
                expected,
                received,
            }
        } else {
            ErrorImpl::MissingArguments {
                function: call.callee.clone(),
                expected,
                received,
            }
        };
        generator.report(error, position);

        let ty = storage_type(declaration.return_type);
        generator.emit_zero(ty);
        return Ok(ty);
    }

    // Every argument is evaluated and spilled before any register is loaded,
    // so nested calls cannot clobber earlier arguments
    let mut arguments = Vec::with_capacity(received);
    for (argument, parameter) in call.arguments.iter().zip(&declaration.parameters) {
        let ty = gen_expression(generator, argument)?;
        let target = storage_type(parameter.param_type);
        generator.emit_coercion(ty, target, &argument.span.start);
        arguments.push(generator.spill(target));
    }

    let mut int_count = 0;
    let mut float_count = 0;
    let mut moves = Vec::new();
    let mut stack = Vec::new();
    for slot in &arguments {
        if slot.ty == ValueType::Float && float_count < FLOAT_ARG_REGISTERS.len() {
            moves.push(format!(
                "movsd {}, {}",
                slot.address(0),
                FLOAT_ARG_REGISTERS[float_count]
            ));
            float_count += 1;
        } else if slot.ty != ValueType::Float && int_count < INT_ARG_REGISTERS.len() {
            moves.push(format!(
                "movq {}, {}",
                slot.address(0),
                INT_ARG_REGISTERS[int_count]
            ));
            int_count += 1;
        } else {
            stack.push(slot);
        }
    }

    let padding = if stack.len() % 2 == 1 { 8 } else { 0 };
    if padding > 0 {
        generator.emit("subq $8, %rsp");
    }
    for slot in stack.iter().rev() {
        generator.emit(format!("pushq {}", slot.address(0)));
    }
    for instruction in moves {
        generator.emit(instruction);
    }
    generator.emit(format!("movl ${}, %eax", float_count));
    generator.emit(format!("call {}", symbol));

    let cleanup = stack.len() * 8 + padding;
    if cleanup > 0 {
        generator.emit(format!("addq ${}, %rsp", cleanup));
    }

    Ok(match declaration.return_type {
        DeclaredType::Unit => {
            generator.emit("xorl %eax, %eax");
            ValueType::Integer
        }
        return_type => storage_type(return_type),
    })
}
