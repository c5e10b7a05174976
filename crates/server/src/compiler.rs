// Compilation logic
//
// Thin wrappers around `ProjectState::ensure_resolution`/
// `warp_semantic_core::pipeline::compile_template` that report timing and
// counts the way a build tool's console output does.

use std::path::Path;
use std::time::{Duration, Instant};

use warp_semantic_core::pipeline::CompiledTemplate;
use warp_semantic_core::registration::ROOT_SCOPE_ID;

use crate::events::CompilationEvent;
use crate::state::{to_disk_path, ProjectState};

/// Result of a full project discovery pass.
pub struct BuildResult {
    pub duration: Duration,
    pub resources_found: usize,
    pub error_count: usize,
}

/// Result of an incremental rebuild triggered by one or more file edits.
pub struct IncrementalResult {
    pub duration: Duration,
    pub files_changed: Vec<String>,
    pub error_count: usize,
}

/// Load every project file and run discovery once.
pub fn full_build(state: &mut ProjectState) -> anyhow::Result<BuildResult> {
    let start = Instant::now();
    state.load_all()?;
    let file_count = state.sources.len() + state.templates.len();
    state.emit(CompilationEvent::DiscoveryStarted { files: file_count });
    let result = state.ensure_resolution();
    let build = BuildResult { duration: start.elapsed(), resources_found: result.resources.len(), error_count: result.diagnostics.error_count() };
    state.emit(CompilationEvent::DiscoveryCompleted { duration_ms: build.duration.as_millis() as u64, resources_found: build.resources_found, error_count: build.error_count });
    Ok(build)
}

/// Handle a batch of changed/removed files, then re-derive the project's
/// resolution (a no-op if nothing the graph tracks actually went stale).
pub fn handle_changes(state: &mut ProjectState, changed: &[std::path::PathBuf], removed: &[std::path::PathBuf]) -> IncrementalResult {
    let start = Instant::now();
    let mut touched = Vec::new();

    for path in removed {
        state.notify_removed(path);
        state.emit(CompilationEvent::FileRemoved { path: path.display().to_string() });
        touched.push(path.display().to_string());
    }
    for path in changed {
        match state.notify_changed(path) {
            Ok(true) => {
                state.emit(CompilationEvent::FileChanged { path: path.display().to_string() });
                touched.push(path.display().to_string());
            }
            Ok(false) => {}
            Err(err) => eprintln!("failed to re-read {}: {err}", path.display()),
        }
    }

    let result = state.ensure_resolution();
    let incremental = IncrementalResult { duration: start.elapsed(), files_changed: touched, error_count: result.diagnostics.error_count() };
    state.emit(CompilationEvent::DiscoveryCompleted { duration_ms: incremental.duration.as_millis() as u64, resources_found: result.resources.len(), error_count: incremental.error_count });
    incremental
}

/// Compile one template file against the project's current resolution,
/// using `ROOT_SCOPE_ID` unless the caller names a more specific scope (e.g.
/// a component's local scope id).
pub fn compile_template_file(state: &mut ProjectState, template: &Path, scope: Option<&str>) -> anyhow::Result<CompiledTemplate> {
    let html = std::fs::read_to_string(template)?;
    let result = state.ensure_resolution();
    let scope_id = scope.unwrap_or(ROOT_SCOPE_ID);
    let compiled = warp_semantic_core::pipeline::compile_template(&html, scope_id, &result.resource_graph, &state.registry);
    state.emit(CompilationEvent::TemplateCompiled { template: template.display().to_string(), error_count: compiled.diagnostics.error_count() });
    Ok(compiled)
}

/// Resolve a project-relative template path (as named over the HTTP API)
/// to the file on disk.
pub fn template_disk_path(state: &ProjectState, relative: &str) -> std::path::PathBuf {
    let normalized = warp_semantic_core::source::NormalizedPath::new(format!("/{relative}"));
    state.templates.get(&normalized).cloned().unwrap_or_else(|| to_disk_path(&state.root, &normalized))
}
