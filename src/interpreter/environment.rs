//! Variable scoping for the interpreter.
//!
//! Uses a stack of ribs rather than parent pointers: lookup walks from the
//! innermost rib outward and a rib dies when its block ends. The bottom rib
//! holds globals and is never popped.

use std::collections::HashMap;

use crate::ast::types::DeclaredType;

use super::value::Value;

/// A variable binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub value: Value,
    pub declared_type: DeclaredType,
    /// `var` bindings are mutable, `val` bindings are not.
    pub mutable: bool,
}

/// Why an update was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    Undeclared,
    Immutable,
}

#[derive(Debug)]
pub struct Environment {
    scopes: Vec<HashMap<String, Binding>>,
}

impl Environment {
    /// Create a new environment holding only the global rib.
    pub fn new() -> Self {
        Environment {
            scopes: vec![HashMap::new()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost rib. The global rib stays.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare a mutable binding in the innermost rib, shadowing any outer one.
    pub fn declare(&mut self, name: impl Into<String>, value: Value, declared_type: DeclaredType) {
        self.insert(name.into(), value, declared_type, true);
    }

    /// Declare an immutable (`val`) binding in the innermost rib.
    pub fn declare_constant(
        &mut self,
        name: impl Into<String>,
        value: Value,
        declared_type: DeclaredType,
    ) {
        self.insert(name.into(), value, declared_type, false);
    }

    fn insert(&mut self, name: String, value: Value, declared_type: DeclaredType, mutable: bool) {
        let binding = Binding {
            value: value.widen_to(declared_type),
            declared_type,
            mutable,
        };

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, binding);
        }
    }

    /// Overwrite the value of the nearest binding named `name`. The binding
    /// keeps its declared type; an Int stored into a Float binding widens.
    pub fn update(&mut self, name: &str, value: Value) -> Result<(), AssignError> {
        let binding = self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
            .ok_or(AssignError::Undeclared)?;

        if !binding.mutable {
            return Err(AssignError::Immutable);
        }

        binding.value = value.widen_to(binding.declared_type);
        Ok(())
    }

    /// Nearest binding named `name`, innermost first.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Like [`Environment::lookup`], also returning the index of the rib that
    /// holds the binding. The global rib is index 0.
    pub fn lookup_with_scope(&self, name: &str) -> Option<(usize, &Binding)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(index, scope)| scope.get(name).map(|binding| (index, binding)))
    }

    pub fn type_of(&self, name: &str) -> Option<DeclaredType> {
        self.lookup(name).map(|binding| binding.declared_type)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
