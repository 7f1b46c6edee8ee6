use std::fmt;

use crate::lexer::Position;

/// A malformed token: unterminated string or a character outside the grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub pos: Position,
}

impl LexError {
    pub(crate) fn new(msg: impl Into<String>, pos: Position) -> Self {
        Self { message: msg.into(), pos }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gml lex error at {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for LexError {}

/// A grammar violation: the parser wanted `expected` but saw `found`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub expected: String,
    /// Text of the offending token, or `end of input`.
    pub found: String,
    pub pos: Position,
}

impl ParseError {
    pub(crate) fn new(expected: impl Into<String>, found: impl Into<String>, pos: Position) -> Self {
        Self { expected: expected.into(), found: found.into(), pos }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gml parse error at {}: expected {}, found {}",
            self.pos, self.expected, self.found
        )
    }
}

impl std::error::Error for ParseError {}

/// Either failure of [`parse`](crate::parse).
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxError {
    Lex(LexError),
    Parse(ParseError),
}

impl SyntaxError {
    pub fn pos(&self) -> Position {
        match self {
            SyntaxError::Lex(e) => e.pos,
            SyntaxError::Parse(e) => e.pos,
        }
    }

    /// The message without the position prefix, for editor diagnostics.
    pub fn message(&self) -> String {
        match self {
            SyntaxError::Lex(e) => e.message.clone(),
            SyntaxError::Parse(e) => format!("expected {}, found {}", e.expected, e.found),
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxError::Lex(e) => e.fmt(f),
            SyntaxError::Parse(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for SyntaxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyntaxError::Lex(e) => Some(e),
            SyntaxError::Parse(e) => Some(e),
        }
    }
}

impl From<LexError> for SyntaxError {
    fn from(e: LexError) -> Self {
        SyntaxError::Lex(e)
    }
}

impl From<ParseError> for SyntaxError {
    fn from(e: ParseError) -> Self {
        SyntaxError::Parse(e)
    }
}
