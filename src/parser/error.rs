use thiserror::Error;

use crate::lexer::LexError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Scan error: {0}")]
    Scan(#[from] LexError),
    #[error("Expected {expected}, found {found} at line {line}, column {column}")]
    Syntax {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },
    #[error("Procedure '{name}' is declared more than once")]
    DuplicateProcedure { name: String },
}

pub type ParseResult<T> = Result<T, ParseError>;
