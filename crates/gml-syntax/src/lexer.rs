use std::fmt;

use crate::error::LexError;

// ── Position ──────────────────────────────────────────────────────────────

/// 1-based line and column of a token's first character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare identifier, including the keywords `import`, `true` and `false`.
    Name,
    /// Quoted string, text kept with its quotes.
    Str,
    Number,
    /// One of `{ } : . ; ( )`.
    Punct,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Position,
}

impl Token {
    pub fn is_punct(&self, ch: char) -> bool {
        self.kind == TokenKind::Punct && self.text.len() == 1 && self.text.starts_with(ch)
    }

    pub fn is_name(&self) -> bool {
        self.kind == TokenKind::Name
    }
}

// ── Lexer ─────────────────────────────────────────────────────────────────

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, col: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    fn here(&self) -> Position {
        Position::new(self.line, self.col)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.src[self.pos..].chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.src[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while matches!(self.peek(), Some(c) if c.is_whitespace()) {
                self.advance();
            }
            // `#` comments run to the end of the line
            if self.peek() == Some('#') {
                while !matches!(self.peek(), None | Some('\n')) {
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        let pos = self.here();
        let ch = match self.peek() {
            None => return Ok(None),
            Some(c) => c,
        };

        let kind = match ch {
            '{' | '}' | ':' | '.' | ';' | '(' | ')' => {
                self.advance();
                TokenKind::Punct
            }
            '"' | '\'' => {
                self.lex_string(ch, pos)?;
                TokenKind::Str
            }
            '-' if matches!(self.peek_second(), Some(c) if c.is_ascii_digit()) => {
                self.lex_number();
                TokenKind::Number
            }
            c if c.is_ascii_digit() => {
                self.lex_number();
                TokenKind::Number
            }
            c if c.is_alphabetic() || c == '_' => {
                while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
                    self.advance();
                }
                TokenKind::Name
            }
            other => {
                return Err(LexError::new(format!("unexpected character {:?}", other), pos));
            }
        };

        Ok(Some(Token { kind, text: self.src[start..self.pos].to_string(), pos }))
    }

    fn lex_string(&mut self, quote: char, pos: Position) -> Result<(), LexError> {
        self.advance(); // consume opening quote
        loop {
            match self.advance() {
                None | Some('\n') => return Err(LexError::new("unterminated string", pos)),
                Some('\\') => {
                    // escapes are kept verbatim; only skip the escaped char
                    if matches!(self.advance(), None | Some('\n')) {
                        return Err(LexError::new("unterminated string", pos));
                    }
                }
                Some(c) if c == quote => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn lex_number(&mut self) {
        if self.peek() == Some('-') {
            self.advance();
        }
        self.eat_digits();
        // `1.5` is a fraction; `1.foo` is not
        if self.peek() == Some('.') && matches!(self.peek_second(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            self.eat_digits();
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let rest = &self.src[self.pos + 1..];
            let signed = rest.starts_with(['+', '-']);
            let digit_at = if signed { 1 } else { 0 };
            if rest[digit_at..].starts_with(|c: char| c.is_ascii_digit()) {
                self.advance();
                if signed {
                    self.advance();
                }
                self.eat_digits();
            }
        }
    }

    fn eat_digits(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
    }
}

/// Tokenize `src`, dropping whitespace and comments.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(src).tokenize()
}
