use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    Identifier(&'a str),
    Integer(i32),

    // Keywords
    Display,
    Begin,
    End,
    EndFile,
    If,
    Then,
    Do,
    Else,
    While,
    Read,
    Return,
    Assign,
    Procedure,

    // Operators
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /
    Equal,        // =
    NotEqual,     // <>
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=

    // Delimiters
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Semicolon, // ;

    EOF,
}

impl<'a> TokenKind<'a> {
    pub fn keyword(word: &'a str) -> Option<Self> {
        let kind = match word {
            "display" => TokenKind::Display,
            "begin" => TokenKind::Begin,
            "end" => TokenKind::End,
            "endfile" => TokenKind::EndFile,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "read" => TokenKind::Read,
            "return" => TokenKind::Return,
            "assign" => TokenKind::Assign,
            "PROCEDURE" | "procedure" => TokenKind::Procedure,
            _ => return None,
        };
        Some(kind)
    }

    /// Compares kinds while ignoring the payload of identifiers and integers.
    pub fn same_kind(&self, other: &TokenKind<'_>) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Source text of a fixed token, used for diagnostics.
    pub fn describe(&self) -> String {
        let text = match self {
            TokenKind::Identifier(name) => return format!("identifier '{name}'"),
            TokenKind::Integer(value) => return format!("integer {value}"),
            TokenKind::Display => "display",
            TokenKind::Begin => "begin",
            TokenKind::End => "end",
            TokenKind::EndFile => "endfile",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Read => "read",
            TokenKind::Return => "return",
            TokenKind::Assign => "assign",
            TokenKind::Procedure => "PROCEDURE",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Equal => "=",
            TokenKind::NotEqual => "<>",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::EOF => return "end of input".to_string(),
        };
        format!("'{text}'")
    }
}

impl fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind<'a>, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &TokenKind<'a> {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }
}
