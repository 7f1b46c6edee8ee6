//! Lexer, parser, and AST for **GML**, a declarative object-description
//! language.
//!
//! This crate is intentionally dependency-free so it can be consumed by
//! language-server tooling and linters without pulling in the construction
//! engine.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ast`] | `Namespace`, `ObjectDecl`, `PropertyDecl`, `SignalDecl`, `Literal` |
//! | [`error`] | `LexError`, `ParseError`, `SyntaxError` |
//! | [`lexer`] | `Lexer`, `Token`, `Position` |
//! | [`parser`] | `Parser`, `parse` entry point |
//! | [`render`] | canonical `Display` for `Namespace` / `ObjectDecl` |
//!
//! # Quick start
//!
//! ```rust
//! use gml_syntax::parse;
//!
//! let src = r#"
//!     ## a window with one button
//!     Window {
//!         id: main
//!         Button { label: "Hello"; clicked:: on_hello }
//!     }
//! "#;
//!
//! let ns = parse(src).unwrap();
//! assert_eq!(ns.objects[0].type_name, "Window");
//! assert_eq!(ns.objects[0].id(), Some("main"));
//! ```

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod render;

pub use ast::{
    Import, Literal, Namespace, ObjectDecl, PropertyDecl, PropertyValue, SignalDecl, ValueKind,
};
pub use error::{LexError, ParseError, SyntaxError};
pub use lexer::{Position, Token, TokenKind, tokenize};
pub use parser::{Parser, parse};
