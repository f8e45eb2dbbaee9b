use std::fmt::Display;

use crate::ast::types::{DeclaredType, ValueType};

/// A fully evaluated value. The variant is the type tag, so a payload can
/// never be read under the wrong tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Bounds only; direction and step belong to the `for` loop consuming it.
    Range { start: i64, end: i64 },
    String(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Integer(_) => ValueType::Integer,
            Value::Float(_) => ValueType::Float,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Range { .. } => ValueType::Range,
            Value::String(_) => ValueType::String,
        }
    }

    /// The value a binding of `declared_type` holds before anything is assigned.
    pub fn zero(declared_type: DeclaredType) -> Value {
        match declared_type {
            DeclaredType::Int | DeclaredType::Unit => Value::Integer(0),
            DeclaredType::Float => Value::Float(0.0),
            DeclaredType::String => Value::String(String::new()),
            DeclaredType::Boolean => Value::Boolean(false),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Boolean(value) => *value,
            Value::Range { .. } => true,
            Value::String(value) => !value.is_empty(),
        }
    }

    /// Numeric view with Int promoted to Float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Integer view, truncating floats toward zero.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            Value::Float(value) => Some(*value as i64),
            _ => None,
        }
    }

    /// Implicit widening applied whenever a value is stored: an Integer
    /// stored into a Float binding becomes a Float. Nothing else changes.
    pub fn widen_to(self, declared_type: DeclaredType) -> Value {
        match (self, declared_type) {
            (Value::Integer(value), DeclaredType::Float) => Value::Float(value as f64),
            (value, _) => value,
        }
    }

    /// Explicit conversion used at declarations, parameter binding and
    /// returns: widens Int to Float and truncates Float to Int. Any other
    /// mismatch hands the value back as the error.
    pub fn convert_to(self, declared_type: DeclaredType) -> Result<Value, Value> {
        match (self, declared_type) {
            (Value::Integer(value), DeclaredType::Float) => Ok(Value::Float(value as f64)),
            (Value::Float(value), DeclaredType::Int) => Ok(Value::Integer(value as i64)),
            (value @ Value::Integer(_), DeclaredType::Int | DeclaredType::Unit)
            | (value @ Value::Float(_), DeclaredType::Float)
            | (value @ Value::Boolean(_), DeclaredType::Boolean)
            | (value @ Value::String(_), DeclaredType::String) => Ok(value),
            (value, _) => Err(value),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{}", format_float(*value)),
            Value::Boolean(value) => write!(f, "{}", value),
            Value::Range { start, end } => write!(f, "{}..{}", start, end),
            Value::String(value) => write!(f, "{}", value),
        }
    }
}

/// Shortest decimal that round-trips, without a trailing `.0` on integral values.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        String::from("NaN")
    } else if value.is_infinite() {
        String::from(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::{format_float, Value};
    use crate::ast::types::{DeclaredType, ValueType};

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_float(-0.75), "-0.75");
        assert_eq!(format_float(f64::INFINITY), "Infinity");
        assert_eq!(format_float(f64::NAN), "NaN");
    }

    #[test]
    fn test_canonical_strings() {
        assert_eq!(Value::Integer(-12).to_string(), "-12");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Boolean(true).to_string(), "true");
        assert_eq!(Value::Range { start: 1, end: 3 }.to_string(), "1..3");
        assert_eq!(Value::String("raw\ttext".into()).to_string(), "raw\ttext");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::Integer(-1).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(
            Value::Integer(2).convert_to(DeclaredType::Float),
            Ok(Value::Float(2.0))
        );
        assert_eq!(
            Value::Float(-2.9).convert_to(DeclaredType::Int),
            Ok(Value::Integer(-2))
        );
        assert_eq!(
            Value::Boolean(true).convert_to(DeclaredType::Boolean),
            Ok(Value::Boolean(true))
        );
        assert!(Value::String("1".into()).convert_to(DeclaredType::Int).is_err());

        // Widening never narrows
        assert_eq!(
            Value::Float(2.5).widen_to(DeclaredType::Int),
            Value::Float(2.5)
        );
        assert_eq!(Value::Integer(4).widen_to(DeclaredType::Float).value_type(), ValueType::Float);
    }
}
