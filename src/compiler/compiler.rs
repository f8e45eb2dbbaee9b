//! Main code generation module.
//!
//! This module contains the `CodeGenerator` and the `generate` entry point
//! lowering a program to x86-64 assembly (AT&T syntax, System V ABI, PIE
//! friendly). Generation runs in two passes:
//!
//! 1. Register functions and global cells, and intern every float literal
//! 2. Emit each function into its own buffer, then wrap it in a prologue
//!    sized to the frame it ended up needing
//!
//! Top-level statements are emitted at the head of `main`. The runtime is
//! the C library: `printf`, `sprintf`, `malloc`, `strlen`, `strcpy`,
//! `strcat`, `strcmp`, `fmod` and `exit`.

use std::collections::{BTreeMap, HashMap};

use crate::{
    ast::{
        ast::{Expr, ExprKind, Program, Stmt},
        expressions::{BinaryOperator, UnaryOperator},
        statements::{FnDeclStmt, VarDeclStmt},
        types::{DeclaredType, ValueType},
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    frame::{size_of, Frame, Location, Slot},
    stmt::gen_statement,
};

/// Integer-class argument registers, in order.
pub const INT_ARG_REGISTERS: [&str; 6] = ["%rdi", "%rsi", "%rdx", "%rcx", "%r8", "%r9"];
/// Floating-point argument registers, in order.
pub const FLOAT_ARG_REGISTERS: [&str; 8] = [
    "%xmm0", "%xmm1", "%xmm2", "%xmm3", "%xmm4", "%xmm5", "%xmm6", "%xmm7",
];

/// Runtime fault handlers, emitted once per listing. Each prints its message
/// to stderr and exits with status 1.
const RUNTIME_FAULTS: [(&str, &str); 4] = [
    (".Lrt_division_by_zero", "DivisionByZero: division by zero"),
    (".Lrt_modulo_by_zero", "ModuloByZero: modulo by zero"),
    (".Lrt_zero_step", "ZeroStep: range step of zero"),
    (".Lrt_negative_step", "NegativeStep: negative range step"),
];

pub const DIVISION_BY_ZERO: &str = RUNTIME_FAULTS[0].0;
pub const MODULO_BY_ZERO: &str = RUNTIME_FAULTS[1].0;
pub const ZERO_STEP: &str = RUNTIME_FAULTS[2].0;
pub const NEGATIVE_STEP: &str = RUNTIME_FAULTS[3].0;

/// A finished listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub text: String,
    /// Non-fatal problems met while generating, in order.
    pub diagnostics: Vec<Error>,
}

/// Static signature of a registered function.
#[derive(Debug, Clone)]
pub struct FunctionSig<'a> {
    pub symbol: String,
    pub declaration: &'a FnDeclStmt,
}

/// The code generator. One instance produces one listing.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the program being compiled
pub struct CodeGenerator<'a> {
    /// Functions by source name
    pub functions: HashMap<&'a str, FunctionSig<'a>>,
    /// Global cell each name currently resolves to
    pub globals: BTreeMap<String, Slot>,
    /// Every global cell, one per top-level declaration, in source order
    pub global_cells: Vec<Slot>,
    /// Cell owned by each top-level declaration
    declaration_cells: HashMap<*const VarDeclStmt, Slot>,
    /// Layout of the function being generated
    pub frame: Frame,
    /// Instructions of the function being generated
    pub code: String,
    /// Finished functions
    pub text: String,
    pub strings: Vec<String>,
    string_labels: HashMap<String, usize>,
    pub floats: Vec<f64>,
    float_labels: HashMap<u64, usize>,
    label_counter: usize,
    /// (continue target, break target) of each enclosing loop, innermost last
    pub loop_labels: Vec<(String, String)>,
    /// Symbol and return type of the function being generated
    pub current_function: Option<(String, DeclaredType)>,
    /// Frame depth at which declarations become globals, while emitting
    /// top-level statements
    pub top_level_depth: Option<usize>,
    /// End of the top-level statement being emitted. `return`, and `break`
    /// or `continue` outside a loop, jump here.
    pub top_level_exit: Option<String>,
    pub diagnostics: Vec<Error>,
}

impl<'a> CodeGenerator<'a> {
    pub fn new() -> Self {
        CodeGenerator {
            functions: HashMap::new(),
            globals: BTreeMap::new(),
            global_cells: Vec::new(),
            declaration_cells: HashMap::new(),
            frame: Frame::new(),
            code: String::new(),
            text: String::new(),
            strings: Vec::new(),
            string_labels: HashMap::new(),
            floats: Vec::new(),
            float_labels: HashMap::new(),
            label_counter: 0,
            loop_labels: Vec::new(),
            current_function: None,
            top_level_depth: None,
            top_level_exit: None,
            diagnostics: Vec::new(),
        }
    }

    /// Emits one instruction into the current function.
    pub fn emit(&mut self, instruction: impl AsRef<str>) {
        self.code.push_str("    ");
        self.code.push_str(instruction.as_ref());
        self.code.push('\n');
    }

    pub fn emit_label(&mut self, label: &str) {
        tracing::trace!(label, "label");
        self.code.push_str(label);
        self.code.push_str(":\n");
    }

    /// A fresh number for a family of labels.
    pub fn next_label(&mut self) -> usize {
        self.label_counter += 1;
        self.label_counter
    }

    /// Label of the pooled copy of `value`.
    pub fn intern_string(&mut self, value: &str) -> String {
        let index = match self.string_labels.get(value) {
            Some(index) => *index,
            None => {
                self.strings.push(value.to_string());
                self.string_labels
                    .insert(value.to_string(), self.strings.len() - 1);
                self.strings.len() - 1
            }
        };
        format!(".LS{}", index)
    }

    /// Label of the pooled copy of `value`, deduplicated by exact bits.
    pub fn intern_float(&mut self, value: f64) -> String {
        let bits = value.to_bits();
        let index = match self.float_labels.get(&bits) {
            Some(index) => *index,
            None => {
                self.floats.push(value);
                self.float_labels.insert(bits, self.floats.len() - 1);
                self.floats.len() - 1
            }
        };
        format!(".LF{}", index)
    }

    /// Records a non-fatal problem and carries on.
    pub fn report(&mut self, error: ErrorImpl, position: &Position) {
        let error = Error::new(error, position.clone());
        tracing::warn!("{}", error);
        self.diagnostics.push(error);
    }

    /// Nearest slot named `name`: frame scopes first, then globals.
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        self.frame
            .lookup(name)
            .or_else(|| self.globals.get(name))
            .cloned()
    }

    /// Label jumped to by `return`.
    pub fn epilogue_label(&self) -> String {
        match &self.current_function {
            Some((symbol, _)) => format!(".L{}_epilogue", symbol),
            None => String::from(".Lmain_epilogue"),
        }
    }

    /// Cell owned by a top-level declaration.
    pub fn declaration_cell(&self, var_decl: &VarDeclStmt) -> Option<Slot> {
        self.declaration_cells
            .get(&(var_decl as *const VarDeclStmt))
            .cloned()
    }

    /// Pass 1: functions, global cells and the float pool.
    fn register(&mut self, program: &'a Program) -> Result<(), Error> {
        for function in program.functions() {
            let symbol = if function.identifier == "main" {
                String::from("main")
            } else {
                format!("kt_{}", function.identifier)
            };

            let previous = self.functions.insert(
                function.identifier.as_str(),
                FunctionSig {
                    symbol,
                    declaration: function,
                },
            );
            if previous.is_some() {
                self.report(
                    ErrorImpl::FunctionAlreadyDeclared {
                        function: function.identifier.clone(),
                    },
                    &function.span.start,
                );
            }
        }

        if !self.functions.contains_key("main") {
            return Err(Error::new(ErrorImpl::MissingMain, program.span.start.clone()));
        }

        // A redeclared global gets a cell of its own, so each declaration
        // keeps its own type. Functions see the last one.
        let mut declared: HashMap<&str, usize> = HashMap::new();
        for statement in program.top_level_statements() {
            if let Stmt::VarDecl(var_decl) = statement {
                let ty = match (var_decl.declared_type, &var_decl.assigned_value) {
                    (Some(declared_type), _) => storage_type(declared_type),
                    (None, Some(value)) => self.static_type(value),
                    (None, None) => ValueType::Integer,
                };

                let count = declared.entry(var_decl.identifier.as_str()).or_insert(0);
                let cell = match *count {
                    0 => var_decl.identifier.clone(),
                    n => format!("{}.{}", var_decl.identifier, n),
                };
                *count += 1;

                let slot = Slot {
                    location: Location::Global(cell),
                    ty,
                    mutable: !var_decl.is_constant,
                };
                self.global_cells.push(slot.clone());
                self.declaration_cells
                    .insert(var_decl as *const VarDeclStmt, slot.clone());
                self.globals.insert(var_decl.identifier.clone(), slot);
            }
        }

        // Step operators on Float variables add this
        self.intern_float(1.0);
        for statement in &program.body {
            collect_floats_stmt(self, statement);
        }

        tracing::debug!(
            functions = self.functions.len(),
            globals = self.global_cells.len(),
            floats = self.floats.len(),
            "registered"
        );
        Ok(())
    }

    /// Best-effort type of `expression` without emitting anything. Used to
    /// size global cells whose declarations carry no type.
    pub fn static_type(&self, expression: &Expr) -> ValueType {
        match &expression.kind {
            ExprKind::Integer(_) => ValueType::Integer,
            ExprKind::Float(_) => ValueType::Float,
            ExprKind::Boolean(_) => ValueType::Boolean,
            ExprKind::String(_) => ValueType::String,
            ExprKind::Identifier(name) => self
                .globals
                .get(name)
                .map(|slot| slot.ty)
                .unwrap_or(ValueType::Integer),
            ExprKind::Parenthesized(inner) => self.static_type(inner),
            ExprKind::Binary(binary) => {
                let left = self.static_type(&binary.left);
                let right = self.static_type(&binary.right);
                if binary.operator.is_comparison() || binary.operator.is_logical() {
                    ValueType::Boolean
                } else if binary.operator == BinaryOperator::Add
                    && (left == ValueType::String || right == ValueType::String)
                {
                    ValueType::String
                } else if left == ValueType::Integer && right == ValueType::Integer {
                    ValueType::Integer
                } else if left.is_numeric() && right.is_numeric() {
                    ValueType::Float
                } else {
                    ValueType::Integer
                }
            }
            ExprKind::Unary(unary) => match unary.operator {
                UnaryOperator::Not => ValueType::Boolean,
                _ => self.static_type(&unary.operand),
            },
            ExprKind::Call(call) => match self.functions.get(call.callee.as_str()) {
                Some(function) => storage_type(function.declaration.return_type),
                None => ValueType::Integer,
            },
            ExprKind::Range(_) => ValueType::Range,
            ExprKind::Run(block) => match block.body.last() {
                Some(Stmt::Expression(last)) => self.static_type(&last.expression),
                _ => ValueType::Integer,
            },
        }
    }

    /// Pass 2 for one function.
    fn gen_function(
        &mut self,
        function: &'a FnDeclStmt,
        top_level: &[&'a Stmt],
    ) -> Result<(), Error> {
        let symbol = self
            .functions
            .get(function.identifier.as_str())
            .map(|sig| sig.symbol.clone())
            .unwrap_or_else(|| function.identifier.clone());
        tracing::debug!(function = symbol.as_str(), "generating");

        self.frame = Frame::new();
        self.code = String::new();
        self.loop_labels.clear();
        self.current_function = Some((symbol.clone(), function.return_type));

        let mut int_index = 0;
        let mut float_index = 0;
        let mut stack_index = 0;
        for parameter in &function.parameters {
            let ty = storage_type(parameter.param_type);
            let slot = self.frame.declare(&parameter.name, ty, true);
            let address = slot.address(0);

            if ty == ValueType::Float && float_index < FLOAT_ARG_REGISTERS.len() {
                self.emit(format!(
                    "movsd {}, {}",
                    FLOAT_ARG_REGISTERS[float_index], address
                ));
                float_index += 1;
            } else if ty != ValueType::Float && int_index < INT_ARG_REGISTERS.len() {
                self.emit(format!("movq {}, {}", INT_ARG_REGISTERS[int_index], address));
                int_index += 1;
            } else {
                // Passed on the stack, above the return address and saved %rbp
                self.emit(format!("movq {}(%rbp), %rax", 16 + 8 * stack_index));
                self.emit(format!("movq %rax, {}", address));
                stack_index += 1;
            }
        }

        if symbol == "main" && !top_level.is_empty() {
            self.top_level_depth = Some(self.frame.depth());
            for statement in top_level {
                let exit = format!(".Ltop_{}_end", self.next_label());
                self.top_level_exit = Some(exit.clone());
                gen_statement(self, statement)?;
                self.emit_label(&exit);
            }
            self.top_level_exit = None;
            self.top_level_depth = None;
        }

        self.frame.push_scope();
        for statement in &function.body.body {
            gen_statement(self, statement)?;
        }
        self.frame.pop_scope();

        // Falling off the end yields the zero value; main exits with 0
        self.emit_zero(storage_type(function.return_type));

        let epilogue = self.epilogue_label();
        let body = std::mem::take(&mut self.code);

        self.text.push_str(&format!(
            "    .globl {symbol}\n    .type {symbol}, @function\n{symbol}:\n"
        ));
        self.text.push_str("    pushq %rbp\n    movq %rsp, %rbp\n");
        let frame_size = self.frame.size();
        if frame_size > 0 {
            self.text.push_str(&format!("    subq ${}, %rsp\n", frame_size));
        }
        self.text.push_str(&body);
        self.text
            .push_str(&format!("{}:\n    leave\n    ret\n\n", epilogue));

        self.current_function = None;
        Ok(())
    }

    /// Loads the zero value of `ty` into the result registers.
    pub fn emit_zero(&mut self, ty: ValueType) {
        match ty {
            ValueType::Float => self.emit("pxor %xmm0, %xmm0"),
            ValueType::String => {
                let label = self.intern_string("");
                self.emit(format!("leaq {}(%rip), %rax", label));
            }
            ValueType::Range => {
                self.emit("xorl %eax, %eax");
                self.emit("xorl %edx, %edx");
            }
            ValueType::Integer | ValueType::Boolean => self.emit("xorl %eax, %eax"),
        }
    }

    /// Writes the result registers, holding a value of `slot.ty`, to `slot`.
    pub fn emit_store(&mut self, slot: &Slot) {
        match slot.ty {
            ValueType::Float => self.emit(format!("movsd %xmm0, {}", slot.address(0))),
            ValueType::Range => {
                self.emit(format!("movq %rax, {}", slot.address(0)));
                self.emit(format!("movq %rdx, {}", slot.address(8)));
            }
            _ => self.emit(format!("movq %rax, {}", slot.address(0))),
        }
    }

    /// Reads `slot` into the result registers.
    pub fn emit_load(&mut self, slot: &Slot) {
        match slot.ty {
            ValueType::Float => self.emit(format!("movsd {}, %xmm0", slot.address(0))),
            ValueType::Range => {
                self.emit(format!("movq {}, %rax", slot.address(0)));
                self.emit(format!("movq {}, %rdx", slot.address(8)));
            }
            _ => self.emit(format!("movq {}, %rax", slot.address(0))),
        }
    }

    /// Stores the result registers in a fresh temporary.
    pub fn spill(&mut self, ty: ValueType) -> Slot {
        let slot = self.frame.temp(ty);
        self.emit_store(&slot);
        slot
    }

    /// Converts the value in the result registers from `from` to `to`.
    /// Int and Float convert both ways; any other mismatch is reported and
    /// replaced by the zero value of `to`.
    pub fn emit_coercion(&mut self, from: ValueType, to: ValueType, position: &Position) {
        match (from, to) {
            _ if from == to => {}
            (ValueType::Integer, ValueType::Float) => self.emit("cvtsi2sdq %rax, %xmm0"),
            (ValueType::Float, ValueType::Integer) => self.emit("cvttsd2siq %xmm0, %rax"),
            _ => {
                self.report(
                    ErrorImpl::TypeMatchError {
                        expected: to.declared_type().to_string(),
                        received: from.to_string(),
                    },
                    position,
                );
                self.emit_zero(to);
            }
        }
    }

    /// Leaves 0 or 1 in `%rax` for the truthiness of the result registers.
    pub fn emit_truthiness(&mut self, ty: ValueType) {
        match ty {
            ValueType::Integer | ValueType::Boolean => {
                self.emit("testq %rax, %rax");
                self.emit("setne %al");
                self.emit("movzbq %al, %rax");
            }
            ValueType::Float => {
                // NaN compares unordered and counts as true
                self.emit("pxor %xmm1, %xmm1");
                self.emit("ucomisd %xmm1, %xmm0");
                self.emit("setne %al");
                self.emit("setp %cl");
                self.emit("orb %cl, %al");
                self.emit("movzbq %al, %rax");
            }
            ValueType::String => {
                self.emit("cmpb $0, (%rax)");
                self.emit("setne %al");
                self.emit("movzbq %al, %rax");
            }
            ValueType::Range => self.emit("movl $1, %eax"),
        }
    }

    /// Turns the value in the result registers into a pointer to its
    /// canonical text in `%rax`. Numbers are formatted into fresh heap
    /// buffers; Booleans pick a pooled literal.
    pub fn emit_to_string(&mut self, ty: ValueType) {
        match ty {
            ValueType::String => {}
            ValueType::Boolean => {
                self.emit("testq %rax, %rax");
                self.emit("leaq .Lstr_true(%rip), %rcx");
                self.emit("leaq .Lstr_false(%rip), %rax");
                self.emit("cmovneq %rcx, %rax");
            }
            ValueType::Integer | ValueType::Float | ValueType::Range => {
                let value = self.spill(ty);
                let buffer = self.frame.temp(ValueType::String);

                self.emit("movl $48, %edi");
                self.emit("call malloc@PLT");
                self.emit(format!("movq %rax, {}", buffer.address(0)));
                self.emit("movq %rax, %rdi");
                match ty {
                    ValueType::Integer => {
                        self.emit("leaq .Lfmt_int(%rip), %rsi");
                        self.emit(format!("movq {}, %rdx", value.address(0)));
                        self.emit("xorl %eax, %eax");
                    }
                    ValueType::Float => {
                        self.emit("leaq .Lfmt_float(%rip), %rsi");
                        self.emit(format!("movsd {}, %xmm0", value.address(0)));
                        self.emit("movl $1, %eax");
                    }
                    _ => {
                        self.emit("leaq .Lfmt_range(%rip), %rsi");
                        self.emit(format!("movq {}, %rdx", value.address(0)));
                        self.emit(format!("movq {}, %rcx", value.address(8)));
                        self.emit("xorl %eax, %eax");
                    }
                }
                self.emit("call sprintf@PLT");
                self.emit(format!("movq {}, %rax", buffer.address(0)));
            }
        }
    }

    /// Renders the data sections, functions and runtime handlers.
    fn finish(self) -> Assembly {
        let mut out = String::new();

        out.push_str("    .data\n");
        for slot in &self.global_cells {
            if let Location::Global(name) = &slot.location {
                let cells = vec!["0"; (size_of(slot.ty) / 8) as usize].join(", ");
                out.push_str(&format!("glob_{}:\n    .quad {}\n", name, cells));
            }
        }

        out.push_str("\n    .section .rodata\n");
        for (label, format) in [
            ("fmt_int", "%ld"),
            ("fmt_float", "%.15g"),
            ("fmt_str", "%s"),
            ("fmt_range", "%ld..%ld"),
        ] {
            out.push_str(&format!(".L{}:\n    .string \"{}\"\n", label, format));
            out.push_str(&format!(".L{}_nl:\n    .string \"{}\\n\"\n", label, format));
        }
        out.push_str(".Lfmt_nl:\n    .string \"\\n\"\n");
        out.push_str(".Lstr_true:\n    .string \"true\"\n");
        out.push_str(".Lstr_false:\n    .string \"false\"\n");
        for (label, message) in RUNTIME_FAULTS {
            out.push_str(&format!(
                "{}_msg:\n    .string \"{}\\n\"\n",
                label, message
            ));
        }
        for (index, value) in self.strings.iter().enumerate() {
            out.push_str(&format!(
                ".LS{}:\n    .string \"{}\"\n",
                index,
                escape_string(value)
            ));
        }
        if !self.floats.is_empty() {
            out.push_str("    .align 8\n");
        }
        for (index, value) in self.floats.iter().enumerate() {
            out.push_str(&format!(
                ".LF{}:\n    .quad 0x{:016x} # {}\n",
                index,
                value.to_bits(),
                value
            ));
        }

        out.push_str("\n    .text\n");
        out.push_str(&self.text);

        for (label, _) in RUNTIME_FAULTS {
            out.push_str(&format!("{}:\n", label));
            out.push_str("    movq stderr@GOTPCREL(%rip), %rax\n");
            out.push_str("    movq (%rax), %rdi\n");
            out.push_str(&format!("    leaq {}_msg(%rip), %rsi\n", label));
            out.push_str("    xorl %eax, %eax\n");
            out.push_str("    call fprintf@PLT\n");
            out.push_str("    movl $1, %edi\n");
            out.push_str("    call exit@PLT\n");
        }

        out.push_str("\n    .section .note.GNU-stack,\"\",@progbits\n");

        Assembly {
            text: out,
            diagnostics: self.diagnostics,
        }
    }
}

impl Default for CodeGenerator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Storage type for a value declared as `declared_type`.
pub fn storage_type(declared_type: DeclaredType) -> ValueType {
    declared_type.value_type()
}

/// Escapes `value` for a GNU as `.string` directive.
pub fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'\\' => escaped.push_str("\\\\"),
            b'"' => escaped.push_str("\\\""),
            b'\n' => escaped.push_str("\\n"),
            b'\t' => escaped.push_str("\\t"),
            b'\r' => escaped.push_str("\\r"),
            0x20..=0x7e => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{:03o}", byte)),
        }
    }
    escaped
}

fn collect_floats_stmt(generator: &mut CodeGenerator, statement: &Stmt) {
    match statement {
        Stmt::VarDecl(var_decl) => {
            if let Some(value) = &var_decl.assigned_value {
                collect_floats_expr(generator, value);
            }
        }
        Stmt::Assign(assign) => {
            if let Some(value) = &assign.value {
                collect_floats_expr(generator, value);
            }
        }
        Stmt::Print(print) => {
            if let Some(value) = &print.value {
                collect_floats_expr(generator, value);
            }
        }
        Stmt::Block(block) => block
            .iter()
            .for_each(|statement| collect_floats_stmt(generator, statement)),
        Stmt::If(if_stmt) => {
            collect_floats_expr(generator, &if_stmt.condition);
            collect_floats_stmt(generator, &if_stmt.then_body);
            if let Some(else_body) = &if_stmt.else_body {
                collect_floats_stmt(generator, else_body);
            }
        }
        Stmt::While(while_stmt) => {
            collect_floats_expr(generator, &while_stmt.condition);
            collect_floats_stmt(generator, &while_stmt.body);
        }
        Stmt::DoWhile(do_while) => {
            collect_floats_stmt(generator, &do_while.body);
            collect_floats_expr(generator, &do_while.condition);
        }
        Stmt::For(for_stmt) => {
            collect_floats_expr(generator, &for_stmt.range);
            collect_floats_stmt(generator, &for_stmt.body);
        }
        Stmt::FnDecl(function) => function
            .body
            .iter()
            .for_each(|statement| collect_floats_stmt(generator, statement)),
        Stmt::Return(return_stmt) => {
            if let Some(value) = &return_stmt.value {
                collect_floats_expr(generator, value);
            }
        }
        Stmt::Expression(expression_stmt) => {
            collect_floats_expr(generator, &expression_stmt.expression)
        }
        Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn collect_floats_expr(generator: &mut CodeGenerator, expression: &Expr) {
    match &expression.kind {
        ExprKind::Float(value) => {
            generator.intern_float(*value);
        }
        ExprKind::Binary(binary) => {
            collect_floats_expr(generator, &binary.left);
            collect_floats_expr(generator, &binary.right);
        }
        ExprKind::Unary(unary) => collect_floats_expr(generator, &unary.operand),
        ExprKind::Parenthesized(inner) => collect_floats_expr(generator, inner),
        ExprKind::Call(call) => call
            .arguments
            .iter()
            .for_each(|argument| collect_floats_expr(generator, argument)),
        ExprKind::Range(range) => {
            collect_floats_expr(generator, &range.start);
            collect_floats_expr(generator, &range.end);
            if let Some(step) = &range.step {
                collect_floats_expr(generator, step);
            }
        }
        ExprKind::Run(block) => block
            .iter()
            .for_each(|statement| collect_floats_stmt(generator, statement)),
        ExprKind::Integer(_)
        | ExprKind::Boolean(_)
        | ExprKind::String(_)
        | ExprKind::Identifier(_) => {}
    }
}

/// Lowers a program to an assembly listing.
///
/// # Returns
///
/// The listing with its diagnostics, or `MissingMain` / `ExpectedRange`
/// when there is nothing sensible to emit.
#[tracing::instrument(level = "debug", skip_all)]
pub fn generate(program: &Program) -> Result<Assembly, Error> {
    let mut generator = CodeGenerator::new();
    generator.register(program)?;

    let top_level: Vec<&Stmt> = program.top_level_statements().collect();

    for function in program.functions() {
        // Only the winning declaration of a duplicated name is emitted
        let is_registered = generator
            .functions
            .get(function.identifier.as_str())
            .is_some_and(|sig| std::ptr::eq(sig.declaration, function));
        if is_registered {
            generator.gen_function(function, &top_level)?;
        }
    }

    Ok(generator.finish())
}
