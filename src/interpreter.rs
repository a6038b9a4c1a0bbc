//! Tree-walking execution of the syntax tree.

use std::io::{self, BufRead, Write};

use tracing::trace;

use crate::ast::{BinaryOperator, Block, Expression, Program, Statement};
use crate::environment::Environment;

mod error;
mod value;

pub use error::RuntimeError;
pub use value::Value;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Input and output streams used by `read` and `display`.
pub struct Console<'io> {
    input: Box<dyn BufRead + 'io>,
    output: Box<dyn Write + 'io>,
}

impl Console<'static> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<'io> Console<'io> {
    pub fn new(input: impl BufRead + 'io, output: impl Write + 'io) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    fn read_integer(&mut self, name: &str) -> RuntimeResult<i32> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(RuntimeError::EndOfInput {
                name: name.to_string(),
            });
        }
        let line = line.trim();
        line.parse::<i32>()
            .map_err(|_| RuntimeError::InvalidInput {
                input: line.to_string(),
            })
    }

    fn write_value(&mut self, value: Value) -> RuntimeResult<()> {
        writeln!(self.output, "{value}")?;
        self.output.flush()?;
        Ok(())
    }
}

impl Program {
    /// Runs the program in a fresh copy of its seeded environment and returns
    /// the environment as it stood when execution finished.
    pub fn run(&self, console: &mut Console<'_>) -> RuntimeResult<Environment> {
        let mut environment = self.environment.clone();
        self.exec(&mut environment, console)?;
        Ok(environment)
    }

    pub fn exec(
        &self,
        environment: &mut Environment,
        console: &mut Console<'_>,
    ) -> RuntimeResult<()> {
        self.block.execute(environment, console)
    }
}

impl Block {
    pub fn execute(
        &self,
        environment: &mut Environment,
        console: &mut Console<'_>,
    ) -> RuntimeResult<()> {
        for statement in &self.statements {
            statement.execute(environment, console)?;
        }
        Ok(())
    }
}

impl Statement {
    pub fn execute(
        &self,
        environment: &mut Environment,
        console: &mut Console<'_>,
    ) -> RuntimeResult<()> {
        match self {
            Statement::Assignment { name, value } => {
                let value = value.evaluate(environment, console)?;
                environment.set_variable(name, value);
            }
            Statement::Block(block) => block.execute(environment, console)?,
            Statement::If {
                condition,
                then_block,
                else_block,
            } => {
                if condition.evaluate(environment, console)?.is_truthy() {
                    then_block.execute(environment, console)?;
                } else {
                    else_block.execute(environment, console)?;
                }
            }
            Statement::WhileLoop { condition, body } => {
                while condition.evaluate(environment, console)?.is_truthy() {
                    body.execute(environment, console)?;
                }
            }
            Statement::Read(name) => {
                let value = console.read_integer(name)?;
                environment.set_variable(name, Value::Integer(value));
            }
            Statement::Writeln(expression) => {
                let value = expression.evaluate(environment, console)?;
                console.write_value(value)?;
            }
            // The value is discarded; a procedure's result is set by assigning to its name.
            Statement::Return(expression) => {
                expression.evaluate(environment, console)?;
            }
            // Declarations are folded into the environment when the program is parsed.
            Statement::ProcedureDeclaration(_) => {}
        }
        Ok(())
    }
}

impl Expression {
    pub fn evaluate(
        &self,
        environment: &mut Environment,
        console: &mut Console<'_>,
    ) -> RuntimeResult<Value> {
        match self {
            Expression::Number(value) => Ok(Value::Integer(*value)),
            Expression::Variable(name) => environment.get_variable(name),
            Expression::BinOp { left, op, right } => {
                let left = left.evaluate(environment, console)?;
                let right = right.evaluate(environment, console)?;
                apply(*op, left, right)
            }
            Expression::ProcedureCall { name, args } => {
                let declaration = environment.get_procedure(name)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate(environment, console)?);
                }
                trace!(
                    procedure = %name,
                    args = values.len(),
                    depth = environment.depth(),
                    "calling procedure"
                );
                let mut scope = environment.call_scope(&declaration, values)?;
                declaration.body.execute(&mut scope, console)?;
                Ok(scope.result())
            }
        }
    }
}

fn apply(op: BinaryOperator, left: Value, right: Value) -> RuntimeResult<Value> {
    let value = match op {
        BinaryOperator::Equal => Value::Boolean(left.as_word() == right.as_word()),
        BinaryOperator::NotEqual => Value::Boolean(left.as_word() != right.as_word()),
        BinaryOperator::Add => Value::Integer(left.as_int(op)?.wrapping_add(right.as_int(op)?)),
        BinaryOperator::Subtract => {
            Value::Integer(left.as_int(op)?.wrapping_sub(right.as_int(op)?))
        }
        BinaryOperator::Multiply => {
            Value::Integer(left.as_int(op)?.wrapping_mul(right.as_int(op)?))
        }
        BinaryOperator::Divide => {
            let divisor = right.as_int(op)?;
            let dividend = left.as_int(op)?;
            if divisor == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Value::Integer(dividend.wrapping_div(divisor))
        }
        BinaryOperator::Less => Value::Boolean(left.as_int(op)? < right.as_int(op)?),
        BinaryOperator::LessEqual => Value::Boolean(left.as_int(op)? <= right.as_int(op)?),
        BinaryOperator::Greater => Value::Boolean(left.as_int(op)? > right.as_int(op)?),
        BinaryOperator::GreaterEqual => Value::Boolean(left.as_int(op)? >= right.as_int(op)?),
    };
    Ok(value)
}
