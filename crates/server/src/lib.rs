// Always-compiled daemon embedding the incremental dependency graph.
//
// Watches a project directory, re-runs discovery/template compilation on
// change, and exposes the result over HTTP.

pub mod api;
pub mod compiler;
pub mod events;
pub mod server;
pub mod state;
pub mod watcher;

pub use events::CompilationEvent;
pub use state::{ProjectState, SharedState};
