use thiserror::Error;

/// Typed errors produced while interpreting a program.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Undefined procedure '{name}'")]
    UndefinedProcedure { name: String },
    #[error("Procedure '{name}' is declared more than once")]
    DuplicateProcedure { name: String },
    #[error("Procedure '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Operator '{operator}' expects integers, got {found}")]
    TypeMismatch {
        operator: &'static str,
        found: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Invalid integer input '{input}'")]
    InvalidInput { input: String },
    #[error("Unexpected end of input while reading '{name}'")]
    EndOfInput { name: String },
    #[error("I/O error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for RuntimeError {
    fn from(error: std::io::Error) -> Self {
        RuntimeError::Io {
            message: error.to_string(),
        }
    }
}
