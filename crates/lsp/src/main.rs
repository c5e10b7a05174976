// Language server front end for the static analysis core (spec §4's cursor
// resolution component + §6.4 Inspection API, surfaced as hover / publish
// diagnostics over LSP). Grounded on `dev/lsp/frel-lsp/src/main.rs` (same
// `tower-lsp` + `tokio` dependency pair, left as a `std::process::exit(1)`
// placeholder in the teacher's own tree); generalized here into an actual
// `LanguageServer` impl backed by this crate's `pipeline::compile_template`
// and `cursor::resolve_cursor`.
//
// A document is compiled against the built-in root scope only (spec §3.3
// "the root scope contains built-in template controllers") — this server
// has no project host wired in yet, so custom elements/attributes/value
// converters registered by a project are invisible to it; only the
// spec-mandated built-ins (`if`, `repeat`, `with`, ...) resolve. That is the
// same single-writer-per-session story as `crates/server`, just without a
// `ProjectState` behind it.

use dashmap::DashMap;
use tower_lsp::jsonrpc::Result as RpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use warp_semantic_core::cursor::{self, CursorEntity};
use warp_semantic_core::diagnostic::Severity;
use warp_semantic_core::pipeline::{self, CompiledTemplate};
use warp_semantic_core::registration::{builtin_root_collections, ResourceGraph, ResourceScope, ROOT_SCOPE_ID};
use warp_semantic_core::source::{LineIndex, Span};
use warp_semantic_core::template::attr_pattern::AttributePatternRegistry;

/// One open document's last-compiled state, recomputed in full on every
/// change (no incremental graph wired in here — that is `crates/server`'s
/// job; this process only ever holds one document's worth of state at a
/// time per URI, matching the "at most one writer" contract of spec §5
/// since `did_change` notifications for one URI never overlap).
struct Document {
    text: String,
    compiled: CompiledTemplate,
}

struct Backend {
    client: Client,
    documents: DashMap<Url, Document>,
    registry: AttributePatternRegistry,
}

/// A scope graph holding only the spec's built-in template controllers,
/// used until a project host is wired in (spec §3.3's root-scope invariant
/// holds regardless of whether any project resources are registered yet).
fn root_only_graph() -> ResourceGraph {
    let mut scopes = std::collections::HashMap::new();
    scopes.insert(
        ROOT_SCOPE_ID.to_string(),
        ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".to_string(), collections: builtin_root_collections() },
    );
    ResourceGraph { scopes, orphans: Vec::new(), unresolved: Vec::new() }
}

fn severity_to_lsp(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

fn span_to_range(span: Span, line_index: &LineIndex) -> Range {
    let start = line_index.line_col(span.start);
    let end = line_index.line_col(span.end.max(span.start));
    Range {
        start: Position { line: start.line.saturating_sub(1), character: start.col.saturating_sub(1) },
        end: Position { line: end.line.saturating_sub(1), character: end.col.saturating_sub(1) },
    }
}

fn offset_from_position(text: &str, position: Position) -> u32 {
    let mut offset = 0u32;
    for (line_no, line) in text.split_inclusive('\n').enumerate() {
        if line_no as u32 == position.line {
            let char_offset: usize = line.char_indices().nth(position.character as usize).map(|(i, _)| i).unwrap_or(line.len());
            return offset + char_offset as u32;
        }
        offset += line.len() as u32;
    }
    offset
}

impl Backend {
    fn compile(&self, text: &str) -> CompiledTemplate {
        pipeline::compile_template(text, ROOT_SCOPE_ID, &root_only_graph(), &self.registry)
    }

    async fn analyze_and_publish(&self, uri: Url, text: String) {
        let compiled = self.compile(&text);
        let line_index = LineIndex::new(&text);
        let diagnostics: Vec<Diagnostic> = compiled
            .diagnostics
            .iter()
            .map(|d| Diagnostic {
                range: span_to_range(d.span, &line_index),
                severity: Some(severity_to_lsp(d.severity)),
                code: d.code.clone().map(NumberOrString::String),
                code_description: None,
                source: Some("warp".to_string()),
                message: d.message.clone(),
                related_information: None,
                tags: None,
                data: None,
            })
            .collect();
        self.client.publish_diagnostics(uri.clone(), diagnostics, None).await;
        self.documents.insert(uri, Document { text, compiled });
    }

    fn hover_text(&self, doc: &Document, offset: u32) -> Option<String> {
        match cursor::resolve_cursor(&doc.compiled.linked, &doc.compiled.scope, offset) {
            CursorEntity::Expression { expr, frame } => {
                let entry = doc.compiled.linked.exprs.get(expr)?;
                let expected = doc.compiled.types.expected_by_expr.get(&expr.0);
                let inferred = doc.compiled.types.inferred_by_expr.get(&expr.0);
                let mut text = format!("**expression** `{:?}`\n\nkind: {:?}", entry.ast, entry.expression_type);
                if let Some(frame) = frame {
                    text.push_str(&format!("\n\nframe: `{}`", frame.0));
                }
                if let Some(expected) = expected {
                    text.push_str(&format!("\n\nexpected: `{expected:?}`"));
                }
                if let Some(inferred) = inferred {
                    text.push_str(&format!("\n\ninferred: `{inferred:?}`"));
                }
                Some(text)
            }
            CursorEntity::ElementTag { custom_element: Some(name), .. } => Some(format!("**custom element** `{name}`")),
            CursorEntity::ElementTag { .. } => Some("**element**".to_string()),
            CursorEntity::Controller { name, .. } => Some(format!("**template controller** `{name}`")),
            CursorEntity::Text { .. } => Some("static text".to_string()),
            CursorEntity::None => None,
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _params: InitializeParams) -> RpcResult<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo { name: "warp-lsp".to_string(), version: Some(warp_semantic_core::VERSION.to_string()) }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client.log_message(MessageType::INFO, "warp-lsp initialized").await;
    }

    async fn shutdown(&self) -> RpcResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.analyze_and_publish(params.text_document.uri, params.text_document.text).await;
    }

    async fn did_change(&self, mut params: DidChangeTextDocumentParams) {
        // Full-sync only (spec §5: templates are recompiled whole on edit,
        // not patched incrementally inside this process).
        if let Some(change) = params.content_changes.pop() {
            self.analyze_and_publish(params.text_document.uri, change.text).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
        self.client.publish_diagnostics(params.text_document.uri, Vec::new(), None).await;
    }

    async fn hover(&self, params: HoverParams) -> RpcResult<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let Some(doc) = self.documents.get(&uri) else {
            return Ok(None);
        };
        let offset = offset_from_position(&doc.text, params.text_document_position_params.position);
        Ok(self.hover_text(&doc, offset).map(|text| Hover { contents: HoverContents::Markup(MarkupContent { kind: MarkupKind::Markdown, value: text }), range: None }))
    }
}

#[tokio::main]
async fn main() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| Backend { client, documents: DashMap::new(), registry: AttributePatternRegistry::new() });
    Server::new(stdin, stdout, socket).serve(service).await;
}
