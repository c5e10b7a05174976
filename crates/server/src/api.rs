// HTTP API endpoint handlers

use std::convert::Infallible;
use std::time::Duration;

use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use warp_semantic_core::cursor::{self, CursorEntity};
use warp_semantic_core::registration::ROOT_SCOPE_ID;
use warp_semantic_core::snapshot::{SemanticSnapshot, SnapshotSymbol, SymbolOrigin};

use crate::compiler;
use crate::state::SharedState;

// === Response types ===

#[derive(Serialize)]
pub struct StatusResponse {
    pub initialized: bool,
    pub error_count: usize,
    pub resource_count: usize,
    pub generation: u64,
}

#[derive(Serialize)]
pub struct OrphanEntry {
    pub file: String,
    pub class_name: String,
}

#[derive(Deserialize)]
pub struct CompileRequest {
    /// Project-relative template path, as named by `/resources`'s resource files.
    pub template: String,
    pub scope: Option<String>,
    #[serde(default)]
    pub emit: bool,
}

#[derive(Serialize)]
pub struct CompileResponse {
    pub plan: warp_semantic_core::template::plan::Plan,
    pub diagnostics: warp_semantic_core::diagnostic::Diagnostics,
    pub emitted: Option<warp_aot_codegen::EmitOutput>,
}

#[derive(Deserialize)]
pub struct CursorQuery {
    pub template: String,
    pub scope: Option<String>,
    pub offset: u32,
}

#[derive(Deserialize)]
pub struct NotifyRequest {
    #[serde(default)]
    pub changed: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Serialize)]
pub struct NotifyResponse {
    pub files_changed: Vec<String>,
    pub error_count: usize,
    pub duration_ms: u64,
}

/// Build the stable, serializable project snapshot (spec §6.6) out of the
/// last full discovery — the same projection `warpc snapshot` prints.
fn build_snapshot(result: &warp_semantic_core::pipeline::ResolutionResult) -> SemanticSnapshot {
    let mut symbols = Vec::new();
    let mut scope_of = Vec::new();
    for (scope_id, scope) in &result.resource_graph.scopes {
        for bucket in [
            &scope.collections.elements,
            &scope.collections.attributes,
            &scope.collections.controllers,
            &scope.collections.value_converters,
            &scope.collections.binding_behaviors,
        ] {
            for def in bucket.values() {
                let symbol = SnapshotSymbol::from_resource(def, SymbolOrigin::Analysis);
                scope_of.push((symbol.id.clone(), scope_id.clone()));
                symbols.push(symbol);
            }
        }
    }
    let orphan_ids: Vec<String> = result
        .resource_graph
        .orphans
        .iter()
        .filter_map(|(file, name)| result.resources.get(&(file.clone(), name.clone())))
        .map(|def| SnapshotSymbol::from_resource(def, SymbolOrigin::Analysis).id)
        .collect();
    SemanticSnapshot::new(symbols, scope_of, orphan_ids)
}

/// GET /status
pub async fn get_status(state: web::Data<SharedState>) -> impl Responder {
    let mut state = state.write().await;
    let generation = state.generation;
    let result = state.ensure_resolution();
    HttpResponse::Ok().json(StatusResponse {
        initialized: true,
        error_count: result.diagnostics.error_count(),
        resource_count: result.resources.len(),
        generation,
    })
}

/// GET /resources - the project's stable semantic snapshot
pub async fn get_resources(state: web::Data<SharedState>) -> impl Responder {
    let mut state = state.write().await;
    let result = state.ensure_resolution();
    HttpResponse::Ok().json(build_snapshot(result))
}

/// GET /diagnostics - project-level diagnostics from the last discovery
pub async fn get_diagnostics(state: web::Data<SharedState>) -> impl Responder {
    let mut state = state.write().await;
    let result = state.ensure_resolution();
    HttpResponse::Ok().json(&result.diagnostics)
}

/// GET /orphans - converged resources never folded into a scope
pub async fn get_orphans(state: web::Data<SharedState>) -> impl Responder {
    let mut state = state.write().await;
    let result = state.ensure_resolution();
    let orphans: Vec<OrphanEntry> = result
        .resource_graph
        .orphans
        .iter()
        .map(|(file, name)| OrphanEntry { file: file.as_str().to_string(), class_name: name.clone() })
        .collect();
    HttpResponse::Ok().json(orphans)
}

/// POST /compile - lower/link/bind/typecheck/plan one template, optionally
/// running the emitter too.
pub async fn compile(state: web::Data<SharedState>, body: web::Json<CompileRequest>) -> impl Responder {
    let mut state = state.write().await;
    let path = compiler::template_disk_path(&state, body.template.trim_start_matches('/'));
    let compiled = match compiler::compile_template_file(&mut state, &path, body.scope.as_deref()) {
        Ok(compiled) => compiled,
        Err(err) => return HttpResponse::NotFound().json(serde_json::json!({ "error": err.to_string() })),
    };

    let emitted = if body.emit { Some(warp_aot_codegen::emit(&compiled.plan)) } else { None };

    HttpResponse::Ok().json(CompileResponse { plan: compiled.plan, diagnostics: compiled.diagnostics, emitted })
}

/// GET /cursor - resolve an editor offset in a template to the entity it
/// lands on (hover / go-to-definition groundwork for `crates/lsp`).
pub async fn get_cursor(state: web::Data<SharedState>, query: web::Query<CursorQuery>) -> impl Responder {
    let mut state = state.write().await;
    let path = compiler::template_disk_path(&state, query.template.trim_start_matches('/'));
    let scope_id = query.scope.as_deref().unwrap_or(ROOT_SCOPE_ID);
    let compiled = match compiler::compile_template_file(&mut state, &path, Some(scope_id)) {
        Ok(compiled) => compiled,
        Err(err) => return HttpResponse::NotFound().json(serde_json::json!({ "error": err.to_string() })),
    };
    let entity = cursor::resolve_cursor(&compiled.linked, &compiled.scope, query.offset);
    HttpResponse::Ok().json(cursor_entity_to_json(&entity))
}

fn cursor_entity_to_json(entity: &CursorEntity) -> serde_json::Value {
    match entity {
        CursorEntity::Expression { expr, frame } => serde_json::json!({
            "kind": "expression",
            "expr": expr.0,
            "frame": frame.map(|f| f.0),
        }),
        CursorEntity::ElementTag { node, custom_element } => serde_json::json!({
            "kind": "element-tag",
            "node": node.0,
            "customElement": custom_element,
        }),
        CursorEntity::Controller { node, name } => serde_json::json!({
            "kind": "controller",
            "node": node.0,
            "name": name,
        }),
        CursorEntity::Text { node } => serde_json::json!({
            "kind": "text",
            "node": node.0,
        }),
        CursorEntity::None => serde_json::json!({ "kind": "none" }),
    }
}

/// POST /notify - the host reports file changes/removals; re-derive the
/// project if anything the graph tracks actually went stale.
pub async fn notify(state: web::Data<SharedState>, body: web::Json<NotifyRequest>) -> impl Responder {
    let mut state = state.write().await;
    let changed: Vec<_> = body.changed.iter().map(|p| state.root.join(p)).collect();
    let removed: Vec<_> = body.removed.iter().map(|p| state.root.join(p)).collect();
    let result = compiler::handle_changes(&mut state, &changed, &removed);
    HttpResponse::Ok().json(NotifyResponse {
        files_changed: result.files_changed,
        error_count: result.error_count,
        duration_ms: result.duration.as_millis() as u64,
    })
}

/// GET /source/{path} - raw file contents, so an editor can display a
/// diagnostic's source without a second round trip outside this API.
pub async fn get_source(state: web::Data<SharedState>, path: web::Path<String>) -> impl Responder {
    let state = state.read().await;
    let disk_path = state.root.join(path.into_inner());
    match tokio::fs::read_to_string(&disk_path).await {
        Ok(content) => HttpResponse::Ok().content_type("text/plain").body(content),
        Err(_) => HttpResponse::NotFound().json(serde_json::json!({ "error": "not found" })),
    }
}

/// GET /events - SSE stream of `CompilationEvent`s as discovery re-runs, with
/// a periodic comment so idle connections survive intermediary proxies.
pub async fn get_events(state: web::Data<SharedState>) -> impl Responder {
    let receiver = state.read().await.events.subscribe();
    let events = BroadcastStream::new(receiver).filter_map(|item| {
        let event = item.ok()?;
        let json = serde_json::to_string(&event).ok()?;
        Some(Ok::<_, Infallible>(web::Bytes::from(format!("data: {json}\n\n"))))
    });
    let heartbeat = tokio_stream::wrappers::IntervalStream::new(tokio::time::interval(Duration::from_secs(15)))
        .map(|_| Ok::<_, Infallible>(web::Bytes::from_static(b": ping\n\n")));

    HttpResponse::Ok().content_type("text/event-stream").streaming(events.merge(heartbeat))
}
