//! LSP backend: document store, diagnostics, hover, completion and
//! go-to-definition for object ids.

use std::collections::HashMap;
use std::sync::Arc;

use gml_build::PACKING_BLOCK;
use gml_syntax::ast::{CHILD_TYPE_PROPERTY, ID_PROPERTY};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::analysis::{Context, completion_context, word_at};
use crate::index::{Declaration, DocumentIndex};

const SOURCE: &str = "gml-lsp";

// ── Backend ───────────────────────────────────────────────────────────────────

pub struct Backend {
    client: Client,
    docs: Arc<RwLock<HashMap<Url, String>>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn update(&self, uri: Url, text: String) {
        let diagnostics = diagnostics(&text);
        log::debug!("{uri}: {} diagnostic(s)", diagnostics.len());
        self.client.publish_diagnostics(uri.clone(), diagnostics, None).await;
        self.docs.write().await.insert(uri, text);
    }
}

// ── LanguageServer impl ───────────────────────────────────────────────────────

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![" ".to_string(), ":".to_string(), ".".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: SOURCE.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client.log_message(MessageType::INFO, "gml-lsp ready").await;
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("shutting down");
        Ok(())
    }

    // ── Document lifecycle ────────────────────────────────────────────────────

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.update(params.text_document.uri, params.text_document.text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // FULL sync: the last change holds the whole document
        if let Some(change) = params.content_changes.into_iter().last() {
            self.update(params.text_document.uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.docs.write().await.remove(&params.text_document.uri);
    }

    // ── Hover ─────────────────────────────────────────────────────────────────

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = &params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let Some(text) = docs.get(uri) else {
            return Ok(None);
        };
        let Some(word) = word_at(text, pos) else {
            return Ok(None);
        };

        Ok(hover_for(&DocumentIndex::build(text), word).map(markdown_hover))
    }

    // ── Definition ────────────────────────────────────────────────────────────

    async fn goto_definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let pos = &params.text_document_position_params.position;

        let docs = self.docs.read().await;
        let Some(text) = docs.get(uri) else {
            return Ok(None);
        };
        let Some(word) = word_at(text, pos) else {
            return Ok(None);
        };

        let index = DocumentIndex::build(text);
        Ok(index.get(word).map(|decl| {
            GotoDefinitionResponse::Scalar(Location { uri: uri.clone(), range: id_range(decl) })
        }))
    }

    // ── Completion ────────────────────────────────────────────────────────────

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let pos = &params.text_document_position.position;

        let docs = self.docs.read().await;
        let Some(text) = docs.get(uri) else {
            return Ok(None);
        };

        let index = DocumentIndex::build(text);
        let items = match completion_context(text, pos) {
            Context::Object => type_items(&index),
            Context::Property { object } => property_items(&object),
            Context::Value { property } => value_items(&index, &property),
            Context::Handler => handler_items(&index),
            Context::Unknown => vec![],
        };

        Ok(Some(CompletionResponse::Array(items)))
    }
}

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Syntax errors, and ids declared more than once.
fn diagnostics(text: &str) -> Vec<Diagnostic> {
    if let Err(e) = gml_syntax::parse(text) {
        let start = to_lsp(e.pos());
        return vec![Diagnostic {
            range: Range { start, end: Position::new(start.line, start.character + 1) },
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE.to_string()),
            message: e.message(),
            ..Default::default()
        }];
    }

    let index = DocumentIndex::build(text);
    index
        .duplicates()
        .into_iter()
        .map(|decl| Diagnostic {
            range: id_range(decl),
            severity: Some(DiagnosticSeverity::ERROR),
            source: Some(SOURCE.to_string()),
            message: format!("id `{}` is declared more than once", decl.id),
            ..Default::default()
        })
        .collect()
}

/// Source positions are 1-based; LSP positions are 0-based.
fn to_lsp(pos: gml_syntax::Position) -> Position {
    Position::new(pos.line.saturating_sub(1) as u32, pos.col.saturating_sub(1) as u32)
}

fn id_range(decl: &Declaration) -> Range {
    let start = to_lsp(decl.pos);
    Range { start, end: Position::new(start.line, start.character + decl.id.len() as u32) }
}

// ── Hover ─────────────────────────────────────────────────────────────────────

fn hover_for(index: &DocumentIndex, word: &str) -> Option<String> {
    if let Some(decl) = index.get(word) {
        return Some(format!(
            "**{}** · `{}`\n\ndeclared at line {}",
            decl.id, decl.type_name, decl.pos.line
        ));
    }
    match word {
        ID_PROPERTY => Some("**id** · registry name of the object, usable in references".to_string()),
        CHILD_TYPE_PROPERTY => Some("**child_type** · hint passed to the parent when attaching".to_string()),
        PACKING_BLOCK => Some("**packing** · child properties for the enclosing object".to_string()),
        _ => None,
    }
}

fn markdown_hover(md: String) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent { kind: MarkupKind::Markdown, value: md }),
        range: None,
    }
}

// ── Completion item builders ──────────────────────────────────────────────────

fn type_items(index: &DocumentIndex) -> Vec<CompletionItem> {
    index
        .types()
        .map(|name| {
            let mut item = CompletionItem::new_simple(name.to_string(), String::new());
            item.kind = Some(CompletionItemKind::CLASS);
            item.insert_text = Some(format!("{name} {{\n\t$0\n}}"));
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        })
        .collect()
}

/// Property names are toolkit-specific; only the reserved ones are offered.
fn property_items(object: &str) -> Vec<CompletionItem> {
    if object == PACKING_BLOCK {
        return vec![];
    }
    [(ID_PROPERTY, "registry name"), (CHILD_TYPE_PROPERTY, "attach hint"), (PACKING_BLOCK, "child properties")]
        .into_iter()
        .map(|(name, detail)| {
            let mut item = CompletionItem::new_simple(name.to_string(), detail.to_string());
            item.kind = Some(CompletionItemKind::PROPERTY);
            item.insert_text = Some(if name == PACKING_BLOCK {
                format!("{name} {{ $0 }}")
            } else {
                format!("{name}: $0")
            });
            item.insert_text_format = Some(InsertTextFormat::SNIPPET);
            item
        })
        .collect()
}

/// Declared ids (as references) and the boolean literals.
fn value_items(index: &DocumentIndex, property: &str) -> Vec<CompletionItem> {
    if property == ID_PROPERTY {
        return vec![];
    }
    let ids = index.declarations().map(|decl: &Declaration| {
        let mut item = CompletionItem::new_simple(decl.id.clone(), decl.type_name.clone());
        item.kind = Some(CompletionItemKind::REFERENCE);
        item
    });
    let bools = ["true", "false"].into_iter().map(|b| {
        let mut item = CompletionItem::new_simple(b.to_string(), "bool".to_string());
        item.kind = Some(CompletionItemKind::VALUE);
        item
    });
    ids.chain(bools).collect()
}

fn handler_items(index: &DocumentIndex) -> Vec<CompletionItem> {
    index
        .handlers()
        .map(|name| {
            let mut item = CompletionItem::new_simple(name.to_string(), "handler".to_string());
            item.kind = Some(CompletionItemKind::FUNCTION);
            item
        })
        .collect()
}
