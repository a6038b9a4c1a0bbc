//! Syntax tree shared by both back ends.
//!
//! The parser builds these nodes once; the interpreter walks them directly
//! (`evaluate`/`execute`) and the code generator lowers them to MIPS (`compile`).

use std::rc::Rc;

use crate::environment::Environment;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Number(i32),
    Variable(String),
    BinOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    ProcedureCall {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    pub fn binary(left: Expression, op: BinaryOperator, right: Expression) -> Self {
        Expression::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// `-x` is represented as `x * -1`.
    pub fn negate(operand: Expression) -> Self {
        Expression::binary(operand, BinaryOperator::Multiply, Expression::Number(-1))
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct ProcedureDeclaration {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Assignment {
        name: String,
        value: Expression,
    },
    Block(Block),
    If {
        condition: Expression,
        then_block: Block,
        else_block: Block,
    },
    WhileLoop {
        condition: Expression,
        body: Block,
    },
    Read(String),
    Writeln(Expression),
    Return(Expression),
    ProcedureDeclaration(Rc<ProcedureDeclaration>),
}

/// Root of a parsed source file.
///
/// The environment is seeded at parse time with every procedure declaration
/// and the variable names the parser encountered. Execution works on a copy,
/// so the same program can be run or compiled any number of times.
#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub block: Block,
    pub environment: Environment,
}

impl Program {
    pub fn new(block: Block, environment: Environment) -> Self {
        Self { block, environment }
    }
}
