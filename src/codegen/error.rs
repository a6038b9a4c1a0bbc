use std::io;

use thiserror::Error;

/// Errors raised while lowering the syntax tree to assembly.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Operation '{node}' is not supported by the code generator")]
    UnsupportedOperation { node: &'static str },
    #[error("Undefined procedure '{name}'")]
    UndefinedProcedure { name: String },
    #[error("Procedure '{name}' expected {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("Failed to write assembly: {0}")]
    Io(#[from] io::Error),
}

pub type CompileResult<T> = Result<T, CompileError>;
