use crate::ast::{Import, Literal, Namespace, ObjectDecl, PropertyDecl, PropertyValue, SignalDecl};
use crate::error::{ParseError, SyntaxError};
use crate::lexer::{Lexer, Position, Token, TokenKind};

// ── Parser ────────────────────────────────────────────────────────────────

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Look at the token `offset` positions ahead of current without consuming.
    fn peek_ahead(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn peek_is(&self, offset: usize, ch: char) -> bool {
        self.peek_ahead(offset).is_some_and(|t| t.is_punct(ch))
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Error describing the current token (or end of input) as unexpected.
    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        match self.peek() {
            Some(tok) => ParseError::new(expected, format!("{:?}", tok.text), tok.pos),
            None => {
                let pos = self.tokens.last().map(|t| t.pos).unwrap_or(Position::new(1, 1));
                ParseError::new(expected, "end of input", pos)
            }
        }
    }

    fn expect_punct(&mut self, ch: char) -> Result<(), ParseError> {
        if self.peek_is(0, ch) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(format!("'{}'", ch)))
        }
    }

    fn expect_name(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Name => {
                let text = tok.text.clone();
                self.advance();
                Ok(text)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// `NAME ('.' NAME)*`, joined back together with dots.
    fn parse_name_chain(&mut self, what: &str) -> Result<String, ParseError> {
        let mut chain = self.expect_name(what)?;
        while self.peek_is(0, '.') {
            self.advance();
            chain.push('.');
            chain.push_str(&self.expect_name("a name after '.'")?);
        }
        Ok(chain)
    }

    // ── Namespace ─────────────────────────────────────────────────────────

    pub fn parse_namespace(&mut self) -> Result<Namespace, ParseError> {
        let mut ns = Namespace::default();

        while let Some(tok) = self.peek() {
            if tok.is_punct(';') {
                self.advance();
            } else if tok.is_name() && tok.text == "import" {
                self.advance();
                let module = self.parse_name_chain("a module name")?;
                ns.imports.push(Import { module });
            } else if tok.is_name() {
                ns.objects.push(self.parse_object()?);
            } else {
                return Err(self.unexpected("an object declaration or import"));
            }
        }

        Ok(ns)
    }

    // ── Object ────────────────────────────────────────────────────────────

    /// `NAME ( '{' body '}' )?`: a bare name is an empty object.
    fn parse_object(&mut self) -> Result<ObjectDecl, ParseError> {
        let mut obj = ObjectDecl::new(self.expect_name("an object type name")?);
        if self.peek_is(0, '{') {
            self.advance();
            self.parse_body(&mut obj)?;
        }
        Ok(obj)
    }

    // ── Body ──────────────────────────────────────────────────────────────

    /// Parse members until the closing `}`, which is consumed.
    ///
    /// Disambiguation for a leading `NAME`:
    /// - `NAME ':' ':'` → signal binding
    /// - `NAME ':'`     → property
    /// - `NAME '.'`     → dotted property name
    /// - `NAME '{'`     → child object with a body
    /// - `NAME`         → child object without a body
    ///
    /// End of input closes every open body.
    fn parse_body(&mut self, obj: &mut ObjectDecl) -> Result<(), ParseError> {
        loop {
            let Some(tok) = self.peek() else {
                return Ok(());
            };

            if tok.is_punct('}') {
                self.advance();
                return Ok(());
            }
            if tok.is_punct(';') {
                self.advance();
                continue;
            }
            if !tok.is_name() {
                return Err(self.unexpected("a property, signal or object declaration"));
            }

            if self.peek_is(1, ':') && self.peek_is(2, ':') {
                obj.signals.push(self.parse_signal()?);
            } else if self.peek_is(1, ':') || self.peek_is(1, '.') {
                obj.properties.push(self.parse_property()?);
            } else if self.peek_is(1, '{') {
                obj.children.push(self.parse_object()?);
            } else {
                let name = self.expect_name("an object type name")?;
                obj.children.push(ObjectDecl::new(name));
            }
        }
    }

    // ── Signal ────────────────────────────────────────────────────────────

    fn parse_signal(&mut self) -> Result<SignalDecl, ParseError> {
        let signal = self.expect_name("a signal name")?;
        self.expect_punct(':')?;
        self.expect_punct(':')?;
        let handler = self.expect_name("a handler name")?;
        Ok(SignalDecl { signal, handler })
    }

    // ── Property ──────────────────────────────────────────────────────────

    fn parse_property(&mut self) -> Result<PropertyDecl, ParseError> {
        let name = self.parse_name_chain("a property name")?;
        self.expect_punct(':')?;
        let value = self.parse_value()?;
        Ok(PropertyDecl { name, value })
    }

    /// A literal, a dotted reference, or, when the name chain is followed by
    /// `{`, a nested object declaration used as the value.
    fn parse_value(&mut self) -> Result<PropertyValue, ParseError> {
        let Some(tok) = self.peek() else {
            return Err(self.unexpected("a property value"));
        };

        let literal = match tok.kind {
            TokenKind::Str => Literal::Str(tok.text.clone()),
            TokenKind::Number => Literal::Number(tok.text.clone()),
            TokenKind::Name => {
                let chain = self.parse_name_chain("a property value")?;
                if self.peek_is(0, '{') {
                    self.advance();
                    let mut obj = ObjectDecl::new(chain);
                    obj.is_property_value = true;
                    self.parse_body(&mut obj)?;
                    return Ok(PropertyValue::Object(Box::new(obj)));
                }
                return Ok(PropertyValue::Literal(match chain.as_str() {
                    "true" => Literal::Bool(true),
                    "false" => Literal::Bool(false),
                    _ => Literal::Ident(chain),
                }));
            }
            TokenKind::Punct => return Err(self.unexpected("a property value")),
        };

        self.advance();
        Ok(PropertyValue::Literal(literal))
    }
}

// ── Public parse entry point ──────────────────────────────────────────────

/// Parse GML source text into a [`Namespace`].
pub fn parse(src: &str) -> Result<Namespace, SyntaxError> {
    let tokens = Lexer::new(src).tokenize()?;
    Ok(Parser::new(tokens).parse_namespace()?)
}
