use std::rc::Rc;

use tracing::debug;

use crate::ast::{BinaryOperator, Block, Expression, ProcedureDeclaration, Program, Statement};
use crate::environment::Environment;
use crate::lexer::{Lexer, Token, TokenKind};

mod error;

pub use error::{ParseError, ParseResult};

/// Recursive-descent parser over a lazily scanned token stream.
///
/// Precedence tiers, loosest first: conditional (`= <> < > <= >=`),
/// expression (`+ -`), term (`* /`), factor.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    environment: Environment,
    // Names that are local to the declaration being parsed.
    procedure_locals: Vec<String>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            environment: Environment::new(),
            procedure_locals: Vec::new(),
        })
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !matches!(
            self.current.kind,
            TokenKind::End | TokenKind::EndFile | TokenKind::EOF
        ) {
            if self.at(&TokenKind::Procedure) {
                let declaration = self.parse_declaration()?;
                statements.push(Statement::ProcedureDeclaration(declaration));
            } else {
                statements.push(self.parse_statement()?);
            }
        }
        if !self.at(&TokenKind::EOF) {
            self.advance()?;
        }

        debug!(
            statements = statements.len(),
            procedures = self.environment.procedures().len(),
            variables = self.environment.declared_variables().len(),
            "parsed program"
        );
        Ok(Program::new(Block::new(statements), self.environment))
    }

    fn parse_declaration(&mut self) -> ParseResult<Rc<ProcedureDeclaration>> {
        self.eat(TokenKind::Procedure)?;
        let name = self.expect_identifier()?;
        self.eat(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(&TokenKind::RParen) {
            params.push(self.expect_identifier()?);
            while self.at(&TokenKind::Comma) {
                self.advance()?;
                params.push(self.expect_identifier()?);
            }
        }
        self.eat(TokenKind::RParen)?;

        self.procedure_locals = params.clone();
        self.procedure_locals.push(name.clone());
        let body = self.parse_statements_until(&[TokenKind::End]);
        self.procedure_locals.clear();
        let body = body?;
        self.eat(TokenKind::End)?;

        let declaration = Rc::new(ProcedureDeclaration {
            name,
            params,
            body: Block::new(body),
        });
        self.environment
            .declare_procedure(Rc::clone(&declaration))
            .map_err(|_| ParseError::DuplicateProcedure {
                name: declaration.name.clone(),
            })?;
        Ok(declaration)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Display => {
                self.advance()?;
                Ok(Statement::Writeln(self.parse_conditional()?))
            }
            TokenKind::Begin => {
                self.advance()?;
                let statements = self.parse_statements_until(&[TokenKind::End])?;
                self.eat(TokenKind::End)?;
                if self.at(&TokenKind::Semicolon) {
                    self.advance()?;
                }
                Ok(Statement::Block(Block::new(statements)))
            }
            TokenKind::If => {
                self.advance()?;
                let condition = self.parse_conditional()?;
                if self.at(&TokenKind::Then) {
                    self.advance()?;
                } else {
                    self.eat(TokenKind::Do)?;
                }
                let then_block = self.parse_statements_until(&[TokenKind::Else, TokenKind::End])?;
                let mut else_block = Vec::new();
                if self.at(&TokenKind::Else) {
                    self.advance()?;
                    else_block = self.parse_statements_until(&[TokenKind::End])?;
                }
                self.eat(TokenKind::End)?;
                Ok(Statement::If {
                    condition,
                    then_block: Block::new(then_block),
                    else_block: Block::new(else_block),
                })
            }
            TokenKind::While => {
                self.advance()?;
                let condition = self.parse_conditional()?;
                self.eat(TokenKind::Do)?;
                let body = self.parse_statements_until(&[TokenKind::End])?;
                self.eat(TokenKind::End)?;
                Ok(Statement::WhileLoop {
                    condition,
                    body: Block::new(body),
                })
            }
            TokenKind::Read => {
                self.advance()?;
                let name = self.expect_identifier()?;
                self.record_variable(&name);
                Ok(Statement::Read(name))
            }
            TokenKind::Return => {
                self.advance()?;
                Ok(Statement::Return(self.parse_expression()?))
            }
            _ => {
                self.eat(TokenKind::Assign)?;
                let name = self.expect_identifier()?;
                self.record_variable(&name);
                self.eat(TokenKind::Equal)?;
                let value = self.parse_expression()?;
                Ok(Statement::Assignment { name, value })
            }
        }
    }

    fn parse_statements_until(
        &mut self,
        terminators: &[TokenKind<'_>],
    ) -> ParseResult<Vec<Statement>> {
        let mut statements = Vec::new();
        while !terminators.iter().any(|kind| self.at(kind)) {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_conditional(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_expression()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Equal => BinaryOperator::Equal,
                TokenKind::NotEqual => BinaryOperator::NotEqual,
                TokenKind::Less => BinaryOperator::Less,
                TokenKind::LessEqual => BinaryOperator::LessEqual,
                TokenKind::Greater => BinaryOperator::Greater,
                TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_expression()?;
            expr = Expression::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_term()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_term()?;
            expr = Expression::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_factor()?;
            expr = Expression::binary(expr, op, right);
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        match self.current.kind {
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_conditional()?;
                self.eat(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::Minus => {
                self.advance()?;
                Ok(Expression::negate(self.parse_factor()?))
            }
            TokenKind::Integer(value) => {
                self.advance()?;
                Ok(Expression::Number(value))
            }
            TokenKind::Identifier(_) => {
                let name = self.expect_identifier()?;
                if !self.at(&TokenKind::LParen) {
                    self.record_variable(&name);
                    return Ok(Expression::Variable(name));
                }

                self.advance()?;
                let mut args = Vec::new();
                if !self.at(&TokenKind::RParen) {
                    args.push(self.parse_expression()?);
                    while self.at(&TokenKind::Comma) {
                        self.advance()?;
                        args.push(self.parse_expression()?);
                    }
                }
                self.eat(TokenKind::RParen)?;
                Ok(Expression::ProcedureCall { name, args })
            }
            _ => Err(self.error("expression")),
        }
    }

    fn record_variable(&mut self, name: &str) {
        if !self.procedure_locals.iter().any(|local| local == name) {
            self.environment.declare_variable(name.to_string());
        }
    }

    fn at(&self, kind: &TokenKind<'_>) -> bool {
        self.current.kind.same_kind(kind)
    }

    fn eat(&mut self, expected: TokenKind<'_>) -> ParseResult<Token<'a>> {
        if self.at(&expected) {
            self.advance()
        } else {
            Err(self.error(&expected.describe()))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current.kind {
            self.advance()?;
            Ok(name.to_string())
        } else {
            Err(self.error("identifier"))
        }
    }

    fn advance(&mut self) -> ParseResult<Token<'a>> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::Syntax {
            expected: expected.to_string(),
            found: self.current.kind.describe(),
            line: self.current.span.line,
            column: self.current.span.column + 1,
        }
    }
}

pub fn parse(input: &str) -> ParseResult<Program> {
    Parser::new(input)?.parse_program()
}
