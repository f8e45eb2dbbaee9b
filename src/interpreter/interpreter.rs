//! Evaluator state and entry point.
//!
//! Execution happens in two passes over the program:
//!
//! 1. Every top-level function is registered by name
//! 2. Top-level statements run in order, then `main` is called
//!
//! The interpreter borrows the program for its whole run, so the function
//! table can hold plain references into the tree.

use std::collections::HashMap;

use crate::{
    ast::{
        ast::{Program, Stmt},
        statements::FnDeclStmt,
        types::DeclaredType,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{environment::Environment, output::PrintHandler, stmt::exec_statement, value::Value};

/// Sticky control-flow flags. Statement sequences stop as soon as any is set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ControlSignals {
    pub returning: bool,
    pub breaking: bool,
    pub continuing: bool,
}

impl ControlSignals {
    pub fn any(&self) -> bool {
        self.returning || self.breaking || self.continuing
    }

    /// Loop bodies start every iteration with these cleared.
    pub fn clear_loop(&mut self) {
        self.breaking = false;
        self.continuing = false;
    }
}

/// What a finished run leaves behind.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Captured output; empty when printing went straight to stdout.
    pub output: String,
    /// Non-fatal problems, in the order they were met.
    pub diagnostics: Vec<Error>,
}

/// The tree-walking interpreter.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the program being executed
pub struct Interpreter<'a> {
    /// Scoped variable bindings
    pub environment: Environment,
    /// Functions by name, registered before anything runs
    pub functions: HashMap<&'a str, &'a FnDeclStmt>,
    pub signals: ControlSignals,
    /// Value carried by the most recent `return`
    pub return_value: Option<Value>,
    /// Index of the rib opened by the running call, 0 outside any call
    pub frame_base: usize,
    pub output: PrintHandler,
    pub diagnostics: Vec<Error>,
}

impl<'a> Interpreter<'a> {
    pub fn new(output: PrintHandler) -> Self {
        Interpreter {
            environment: Environment::new(),
            functions: HashMap::new(),
            signals: ControlSignals::default(),
            return_value: None,
            frame_base: 0,
            output,
            diagnostics: Vec::new(),
        }
    }

    /// Runs a whole program: registers functions, executes top-level
    /// statements, then calls `main`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run(&mut self, program: &'a Program) -> Result<(), Error> {
        for function in program.functions() {
            if self
                .functions
                .insert(function.identifier.as_str(), function)
                .is_some()
            {
                self.report(
                    ErrorImpl::FunctionAlreadyDeclared {
                        function: function.identifier.clone(),
                    },
                    &function.span.start,
                );
            }
        }
        tracing::debug!(functions = self.functions.len(), "registered functions");

        for statement in program.top_level_statements() {
            exec_statement(self, statement)?;
            // Stray break/continue/return at the top level end only the
            // statement they appear in
            self.signals = ControlSignals::default();
            self.return_value = None;
        }

        if !self.functions.contains_key("main") {
            return Err(Error::new(ErrorImpl::MissingMain, program.span.start.clone()));
        }

        self.call_function("main", Vec::new(), &program.span.start)?;
        self.output.flush();

        Ok(())
    }

    /// Runs `body` inside a fresh scope. The scope is popped whether or not
    /// `body` fails.
    pub fn with_scope<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        self.environment.push_scope();
        let result = body(self);
        self.environment.pop_scope();
        result
    }

    /// Calls a registered function with already evaluated arguments.
    ///
    /// Resolution problems are diagnostics and yield a zero value; only
    /// faults raised by the body itself propagate.
    pub fn call_function(
        &mut self,
        name: &str,
        arguments: Vec<Value>,
        position: &Position,
    ) -> Result<Value, Error> {
        let Some(function) = self.functions.get(name).copied() else {
            self.report(
                ErrorImpl::FunctionNotDeclared {
                    function: name.to_string(),
                },
                position,
            );
            return Ok(Value::Integer(0));
        };

        let expected = function.parameters.len();
        let received = arguments.len();
        if expected != received {
            let error = if received > expected {
                ErrorImpl::UnexpectedArguments {
                    function: name.to_string(),
                    expected,
                    received,
                }
            } else {
                ErrorImpl::MissingArguments {
                    function: name.to_string(),
                    expected,
                    received,
                }
            };
            self.report(error, position);
            return Ok(Value::zero(function.return_type));
        }

        tracing::trace!(function = name, "call");

        let returned = self.with_scope(|interpreter| {
            let caller_base = std::mem::replace(
                &mut interpreter.frame_base,
                interpreter.environment.depth() - 1,
            );
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                let value = interpreter.coerce(argument, parameter.param_type, position);
                interpreter
                    .environment
                    .declare(parameter.name.as_str(), value, parameter.param_type);
            }

            let result = exec_statement_list(interpreter, &function.body.body);
            let returned = interpreter.return_value.take();
            interpreter.signals = ControlSignals::default();
            interpreter.frame_base = caller_base;
            result.map(|_| returned)
        })?;

        Ok(match (function.return_type, returned) {
            (DeclaredType::Unit, _) => Value::Integer(0),
            (return_type, Some(value)) => self.coerce(value, return_type, position),
            (return_type, None) => Value::zero(return_type),
        })
    }

    /// Converts `value` for storage under `declared_type`. A value that
    /// cannot convert is reported and replaced by the type's zero value.
    pub fn coerce(&mut self, value: Value, declared_type: DeclaredType, position: &Position) -> Value {
        match value.convert_to(declared_type) {
            Ok(value) => value,
            Err(value) => {
                self.report(
                    ErrorImpl::TypeMatchError {
                        expected: declared_type.to_string(),
                        received: value.value_type().to_string(),
                    },
                    position,
                );
                Value::zero(declared_type)
            }
        }
    }

    /// Records a non-fatal problem and carries on.
    pub fn report(&mut self, error: ErrorImpl, position: &Position) {
        let error = Error::new(error, position.clone());
        tracing::warn!("{}", error);
        self.diagnostics.push(error);
    }

    pub fn finish(self) -> ExecutionResult {
        ExecutionResult {
            output: self.output.get_output(),
            diagnostics: self.diagnostics,
        }
    }
}

/// Executes statements in order, stopping once any control signal is set.
pub fn exec_statement_list<'a>(
    interpreter: &mut Interpreter<'a>,
    statements: &'a [Stmt],
) -> Result<(), Error> {
    for statement in statements {
        exec_statement(interpreter, statement)?;
        if interpreter.signals.any() {
            break;
        }
    }

    Ok(())
}

/// Evaluates a program, sending output to `output`.
pub fn execute(program: &Program, output: PrintHandler) -> Result<ExecutionResult, Error> {
    let mut interpreter = Interpreter::new(output);
    interpreter.run(program)?;
    Ok(interpreter.finish())
}
