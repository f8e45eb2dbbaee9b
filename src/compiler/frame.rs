//! Static storage layout for generated code.
//!
//! Every variable lives either in a `.data` cell (`glob_<name>`) or in a
//! slot below `%rbp`. Frame slots are handed out monotonically and never
//! reused inside one function, so a spilled temporary can never be
//! clobbered by a later allocation.

use std::collections::HashMap;

use crate::ast::types::ValueType;

/// Where a value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Byte offset from `%rbp`, always negative.
    Frame(i64),
    /// A `.data` cell named `glob_<name>`.
    Global(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub location: Location,
    pub ty: ValueType,
    pub mutable: bool,
}

impl Slot {
    /// Operand string for the quadword `part` bytes into the slot.
    pub fn address(&self, part: i64) -> String {
        match &self.location {
            Location::Frame(offset) => format!("{}(%rbp)", offset + part),
            Location::Global(name) if part == 0 => format!("glob_{}(%rip)", name),
            Location::Global(name) => format!("glob_{}+{}(%rip)", name, part),
        }
    }
}

/// Bytes needed to store a value of `ty`. A Range keeps both bounds.
pub fn size_of(ty: ValueType) -> i64 {
    match ty {
        ValueType::Range => 16,
        _ => 8,
    }
}

/// The frame of the function currently being generated: a stack of block
/// scopes mapping names to slots, plus the running size of the frame.
#[derive(Debug)]
pub struct Frame {
    scopes: Vec<HashMap<String, Slot>>,
    used: i64,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            scopes: vec![HashMap::new()],
            used: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Reserves `size` bytes and returns the offset of the lowest one.
    pub fn alloc(&mut self, size: i64) -> i64 {
        self.used += size;
        -self.used
    }

    /// An anonymous slot for spilling a value of `ty`.
    pub fn temp(&mut self, ty: ValueType) -> Slot {
        Slot {
            location: Location::Frame(self.alloc(size_of(ty))),
            ty,
            mutable: true,
        }
    }

    /// Allocates a named slot in the innermost scope.
    pub fn declare(&mut self, name: &str, ty: ValueType, mutable: bool) -> Slot {
        let slot = Slot {
            location: Location::Frame(self.alloc(size_of(ty))),
            ty,
            mutable,
        };

        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), slot.clone());
        }
        slot
    }

    pub fn lookup(&self, name: &str) -> Option<&Slot> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    /// Bytes to reserve in the prologue, keeping `%rsp` 16-byte aligned.
    pub fn size(&self) -> i64 {
        (self.used + 15) / 16 * 16
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::{Frame, Location, Slot};
    use crate::ast::types::ValueType;

    #[test]
    fn test_offsets_are_monotonic() {
        let mut frame = Frame::new();
        let a = frame.declare("a", ValueType::Integer, true);
        let r = frame.declare("r", ValueType::Range, true);
        let t = frame.temp(ValueType::Float);

        assert_eq!(a.location, Location::Frame(-8));
        assert_eq!(r.location, Location::Frame(-24));
        assert_eq!(t.location, Location::Frame(-32));
        assert_eq!(frame.size(), 32);
    }

    #[test]
    fn test_size_rounds_to_sixteen() {
        let mut frame = Frame::new();
        frame.temp(ValueType::Integer);
        assert_eq!(frame.size(), 16);
        assert_eq!(Frame::new().size(), 0);
    }

    #[test]
    fn test_scopes_shadow_without_reusing_slots() {
        let mut frame = Frame::new();
        frame.declare("x", ValueType::Integer, true);

        frame.push_scope();
        let inner = frame.declare("x", ValueType::String, true);
        assert_eq!(frame.lookup("x"), Some(&inner));
        frame.pop_scope();

        assert_eq!(frame.lookup("x").map(|slot| slot.ty), Some(ValueType::Integer));
        assert_eq!(
            frame.declare("y", ValueType::Integer, true).location,
            Location::Frame(-24)
        );
    }

    #[test]
    fn test_addresses() {
        let local = Slot {
            location: Location::Frame(-16),
            ty: ValueType::Range,
            mutable: true,
        };
        let global = Slot {
            location: Location::Global("count".to_string()),
            ty: ValueType::Range,
            mutable: true,
        };

        assert_eq!(local.address(0), "-16(%rbp)");
        assert_eq!(local.address(8), "-8(%rbp)");
        assert_eq!(global.address(0), "glob_count(%rip)");
        assert_eq!(global.address(8), "glob_count+8(%rip)");
    }
}
