// Compilation events broadcast to connected SSE clients.

use serde::Serialize;

/// Events broadcast over `/events` as clients subscribe to project activity.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompilationEvent {
    /// A full discovery pass started.
    DiscoveryStarted { files: usize },
    /// A full or incremental discovery pass completed.
    DiscoveryCompleted { duration_ms: u64, resources_found: usize, error_count: usize },
    /// The host reported a file change.
    FileChanged { path: String },
    /// The host reported a file deletion.
    FileRemoved { path: String },
    /// One template was compiled (via `/compile` or a watcher-triggered recompile).
    TemplateCompiled { template: String, error_count: usize },
}
