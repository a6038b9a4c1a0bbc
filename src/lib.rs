pub mod ast;
pub mod codegen;
pub mod config;
pub mod driver;
pub mod emitter;
pub mod environment;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
