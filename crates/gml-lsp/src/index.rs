//! Per-document index of declared object ids.
//!
//! Built from the token stream rather than the AST so that it stays useful
//! while the document does not parse: every `id:` the lexer can see is
//! indexed along with the type of the block it sits in.

use std::collections::BTreeSet;

use gml_build::PACKING_BLOCK;
use gml_syntax::ast::ID_PROPERTY;
use gml_syntax::{Position, Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub id: String,
    /// Name that opened the enclosing block: a type, or a slot name such as
    /// `image`.
    pub type_name: String,
    /// Position of the id value.
    pub pos: Position,
}

#[derive(Debug, Default)]
pub struct DocumentIndex {
    decls: Vec<Declaration>,
    types: BTreeSet<String>,
    handlers: BTreeSet<String>,
}

impl DocumentIndex {
    /// Index `src`. A document the lexer rejects yields an empty index.
    pub fn build(src: &str) -> Self {
        match gml_syntax::tokenize(src) {
            Ok(tokens) => Self::from_tokens(&tokens),
            Err(_) => Self::default(),
        }
    }

    pub fn from_tokens(tokens: &[Token]) -> Self {
        let mut index = Self::default();
        let mut open: Vec<&str> = Vec::new();

        for (i, tok) in tokens.iter().enumerate() {
            let next = |k: usize| tokens.get(i + k);

            if tok.is_punct('}') {
                open.pop();
                continue;
            }
            if !tok.is_name() {
                continue;
            }

            if next(1).is_some_and(|t| t.is_punct('{')) {
                open.push(&tok.text);
                if tok.text.starts_with(char::is_uppercase) {
                    index.types.insert(tok.text.clone());
                }
                continue;
            }

            if next(1).is_some_and(|t| t.is_punct(':')) && next(2).is_some_and(|t| t.is_punct(':')) {
                if let Some(handler) = next(3).filter(|t| t.is_name()) {
                    index.handlers.insert(handler.text.clone());
                }
                continue;
            }

            let after_dot = i > 0 && tokens[i - 1].is_punct('.');
            let is_id = tok.text == ID_PROPERTY
                && !after_dot
                && next(1).is_some_and(|t| t.is_punct(':'));
            if !is_id {
                continue;
            }
            let Some(value) = next(2) else {
                continue;
            };
            let id = match value.kind {
                TokenKind::Name => value.text.clone(),
                TokenKind::Str if value.text.len() >= 2 => value.text[1..value.text.len() - 1].to_string(),
                _ => continue,
            };
            let Some(type_name) = open.last().filter(|t| **t != PACKING_BLOCK) else {
                continue;
            };
            index.decls.push(Declaration { id, type_name: type_name.to_string(), pos: value.pos });
        }

        index
    }

    /// First declaration of `id`.
    pub fn get(&self, id: &str) -> Option<&Declaration> {
        self.decls.iter().find(|d| d.id == id)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    /// Type names opened with a block anywhere in the document.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(String::as_str)
    }

    /// Handler names bound with `signal:: handler`.
    pub fn handlers(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(String::as_str)
    }

    /// Every declaration of an id after its first.
    pub fn duplicates(&self) -> Vec<&Declaration> {
        self.decls
            .iter()
            .enumerate()
            .filter(|(i, d)| self.decls[..*i].iter().any(|earlier| earlier.id == d.id))
            .map(|(_, d)| d)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"
Window {
    id: main
    Box {
        id: "row"
        Button { id: ok; label: main.title; clicked:: on_ok }
        packing { id: nope }
    }
    image { id: icon }
}
"#;

    #[test]
    fn ids_with_enclosing_type() {
        let index = DocumentIndex::build(SRC);
        let found: Vec<(&str, &str)> =
            index.declarations().map(|d| (d.id.as_str(), d.type_name.as_str())).collect();
        assert_eq!(found, [("main", "Window"), ("row", "Box"), ("ok", "Button"), ("icon", "image")]);
    }

    #[test]
    fn positions_point_at_the_value() {
        let index = DocumentIndex::build(SRC);
        assert_eq!(index.get("main").unwrap().pos, Position::new(3, 9));
    }

    #[test]
    fn types_are_capitalized_block_openers() {
        let index = DocumentIndex::build(SRC);
        assert_eq!(index.types().collect::<Vec<_>>(), ["Box", "Button", "Window"]);
    }

    #[test]
    fn handlers_are_collected() {
        let index = DocumentIndex::build(SRC);
        assert_eq!(index.handlers().collect::<Vec<_>>(), ["on_ok"]);
    }

    #[test]
    fn duplicates_after_the_first() {
        let index = DocumentIndex::build("A { id: x }\nB { id: x }\nC { id: y }");
        let dups = index.duplicates();
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].type_name, "B");
    }

    #[test]
    fn unparsable_document_is_still_indexed() {
        let index = DocumentIndex::build("Window { id: w\n  Button { label: ");
        assert!(index.get("w").is_some());
    }

    #[test]
    fn lex_error_gives_empty_index() {
        let index = DocumentIndex::build("Window { id: w; title: \"open");
        assert_eq!(index.declarations().count(), 0);
    }
}
