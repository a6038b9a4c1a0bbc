use std::fmt;

use crate::ast::BinaryOperator;

use super::RuntimeError;

/// Runtime value model used by the tree-walking interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    Boolean(bool),
}

impl Value {
    pub(super) fn as_int(&self, op: BinaryOperator) -> Result<i32, RuntimeError> {
        match self {
            Value::Integer(value) => Ok(*value),
            Value::Boolean(_) => Err(RuntimeError::TypeMismatch {
                operator: op.symbol(),
                found: self.type_name(),
            }),
        }
    }

    /// Machine-word form: booleans are `1`/`0`, as in compiled code.
    pub fn as_word(&self) -> i32 {
        match self {
            Value::Integer(value) => *value,
            Value::Boolean(value) => i32::from(*value),
        }
    }

    /// Branch test shared by `if` and `while`: `true`, or the integer `1`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(value) => *value,
            Value::Integer(value) => *value == 1,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(f, "{value}"),
            Value::Boolean(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_widen_to_one_and_zero() {
        assert_eq!(Value::Boolean(true).as_word(), 1);
        assert_eq!(Value::Boolean(false).as_word(), 0);
        assert_eq!(Value::Integer(-4).as_word(), -4);
    }

    #[test]
    fn truthiness_accepts_true_and_one_only() {
        assert!(Value::Boolean(true).is_truthy());
        assert!(Value::Integer(1).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(!Value::Integer(2).is_truthy());
        assert!(!Value::Integer(-1).is_truthy());
    }

    #[test]
    fn formats_naturally() {
        assert_eq!(Value::Integer(-7).to_string(), "-7");
        assert_eq!(Value::Boolean(false).to_string(), "false");
    }

    #[test]
    fn booleans_are_not_integers() {
        assert_eq!(
            Value::Boolean(true).as_int(BinaryOperator::Add),
            Err(RuntimeError::TypeMismatch {
                operator: "+",
                found: "boolean",
            })
        );
    }
}
