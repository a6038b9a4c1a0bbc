use std::{iter::Peekable, str::CharIndices};

pub use crate::token::{Span, Token, TokenKind};

mod error;

pub use error::{LexError, LexResult};

/// Turns source text into classified tokens, one at a time.
///
/// Once the input is exhausted every further call yields `EOF`.
pub struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    eof_reached: bool,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            eof_reached: false,
            line: 1,
            column: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        !self.eof_reached
    }

    pub fn next_token(&mut self) -> LexResult<Token<'a>> {
        self.skip_trivia();

        let (start_idx, ch) = match self.chars.peek() {
            Some(&(idx, c)) => (idx, c),
            None => {
                self.eof_reached = true;
                let index = self.input.len();
                return Ok(Token::new(
                    TokenKind::EOF,
                    Span {
                        start: index,
                        end: index,
                        line: self.line,
                        column: self.column,
                    },
                ));
            }
        };

        let start_line = self.line;
        let start_column = self.column;
        let single = |kind| -> LexResult<Token<'a>> {
            Ok(Token::new(
                kind,
                Span {
                    start: start_idx,
                    end: start_idx + 1,
                    line: start_line,
                    column: start_column,
                },
            ))
        };

        match ch {
            '+' | '-' | '*' | '/' | '=' | '(' | ')' | ',' | ';' => {
                self.advance_char();
                single(match ch {
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '=' => TokenKind::Equal,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    _ => TokenKind::Semicolon,
                })
            }
            '<' | '>' => Ok(self.read_relational(ch, start_idx, start_line, start_column)),
            c if c.is_ascii_alphabetic() || c == '_' => {
                Ok(self.read_identifier(start_idx, start_line, start_column))
            }
            c if c.is_ascii_digit() => self.read_integer(start_idx, start_line, start_column),
            _ => {
                self.advance_char();
                Err(LexError::UnexpectedCharacter {
                    character: ch,
                    line: start_line,
                    column: start_column + 1,
                })
            }
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.chars.peek() {
                Some(&(_, c)) if c.is_whitespace() => {
                    self.advance_char();
                }
                Some(&(idx, '/')) if self.input[idx..].starts_with("//") => {
                    while let Some(&(_, c)) = self.chars.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance_char();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_relational(
        &mut self,
        first: char,
        start: usize,
        line: usize,
        column: usize,
    ) -> Token<'a> {
        self.advance_char();
        let next = self.chars.peek().map(|&(_, c)| c);
        let (kind, len) = match (first, next) {
            ('<', Some('=')) => (TokenKind::LessEqual, 2),
            ('<', Some('>')) => (TokenKind::NotEqual, 2),
            ('>', Some('=')) => (TokenKind::GreaterEqual, 2),
            ('<', _) => (TokenKind::Less, 1),
            _ => (TokenKind::Greater, 1),
        };
        if len == 2 {
            self.advance_char();
        }
        Token::new(
            kind,
            Span {
                start,
                end: start + len,
                line,
                column,
            },
        )
    }

    fn read_identifier(&mut self, start: usize, line: usize, column: usize) -> Token<'a> {
        self.advance_char(); // Consume first char
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let word = &self.input[start..end_idx];
        let kind = TokenKind::keyword(word).unwrap_or(TokenKind::Identifier(word));
        Token::new(
            kind,
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        )
    }

    fn read_integer(&mut self, start: usize, line: usize, column: usize) -> LexResult<Token<'a>> {
        self.advance_char(); // Consume first digit
        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_digit() {
                self.advance_char();
            } else {
                break;
            }
        }

        let end_idx = self.current_index();
        let literal = &self.input[start..end_idx];
        let value = literal
            .parse::<i32>()
            .map_err(|_| LexError::InvalidIntegerLiteral {
                literal: literal.to_string(),
                line,
                column: column + 1,
            })?;
        Ok(Token::new(
            TokenKind::Integer(value),
            Span {
                start,
                end: end_idx,
                line,
                column,
            },
        ))
    }

    fn advance_char(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, c)) = next {
            if c == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn current_index(&mut self) -> usize {
        self.chars
            .peek()
            .map(|(idx, _)| *idx)
            .unwrap_or(self.input.len())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof_reached {
            return None;
        }
        Some(self.next_token())
    }
}

pub fn tokenize(input: &str) -> LexResult<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let is_eof = matches!(token.kind, TokenKind::EOF);
        tokens.push(token);
        if is_eof {
            break;
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(input: &str) -> Vec<TokenKind<'_>> {
        tokenize(input)
            .expect("tokenize should succeed")
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_simple_program() {
        let input = indoc! {"
            PROCEDURE inc(x)
                assign x = x + 1
            end
            assign n = 3
            if n <> 4 then display inc(n) end
        "};
        let expected_tokens = vec![
            TokenKind::Procedure,
            TokenKind::Identifier("inc"),
            TokenKind::LParen,
            TokenKind::Identifier("x"),
            TokenKind::RParen,
            TokenKind::Assign,
            TokenKind::Identifier("x"),
            TokenKind::Equal,
            TokenKind::Identifier("x"),
            TokenKind::Plus,
            TokenKind::Integer(1),
            TokenKind::End,
            TokenKind::Assign,
            TokenKind::Identifier("n"),
            TokenKind::Equal,
            TokenKind::Integer(3),
            TokenKind::If,
            TokenKind::Identifier("n"),
            TokenKind::NotEqual,
            TokenKind::Integer(4),
            TokenKind::Then,
            TokenKind::Display,
            TokenKind::Identifier("inc"),
            TokenKind::LParen,
            TokenKind::Identifier("n"),
            TokenKind::RParen,
            TokenKind::End,
            TokenKind::EOF,
        ];

        assert_eq!(kinds(input), expected_tokens);
    }

    #[test]
    fn splits_relational_operators() {
        assert_eq!(
            kinds("a<=b>=c<d>e<>f"),
            vec![
                TokenKind::Identifier("a"),
                TokenKind::LessEqual,
                TokenKind::Identifier("b"),
                TokenKind::GreaterEqual,
                TokenKind::Identifier("c"),
                TokenKind::Less,
                TokenKind::Identifier("d"),
                TokenKind::Greater,
                TokenKind::Identifier("e"),
                TokenKind::NotEqual,
                TokenKind::Identifier("f"),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn skips_line_comments_but_keeps_division() {
        let input = indoc! {"
            // header comment
            assign q = 8 / 2 // trailing
        "};
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Assign,
                TokenKind::Identifier("q"),
                TokenKind::Equal,
                TokenKind::Integer(8),
                TokenKind::Slash,
                TokenKind::Integer(2),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("begin\n  display x").expect("tokenize should succeed");
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 2);
        assert_eq!(tokens[2].span.start, 16);
    }

    #[test]
    fn keeps_returning_eof() {
        let mut lexer = Lexer::new("x");
        assert!(lexer.has_next());
        lexer.next_token().expect("identifier");
        assert_eq!(lexer.next_token().expect("eof").kind, TokenKind::EOF);
        assert!(!lexer.has_next());
        assert_eq!(lexer.next_token().expect("eof").kind, TokenKind::EOF);
    }

    #[test]
    fn errors_on_invalid_character() {
        let err = tokenize("assign x = 1 @ 2\n").expect_err("expected lexing failure");
        assert_eq!(
            err,
            LexError::UnexpectedCharacter {
                character: '@',
                line: 1,
                column: 14,
            }
        );
    }

    #[test]
    fn errors_on_integer_overflow() {
        let err = tokenize("assign n = 99999999999\n").expect_err("expected overflow");
        assert!(err.to_string().contains("Invalid integer literal"));
    }
}
