// Static analysis and AOT compilation core.
//
// This crate discovers component-oriented resources (custom elements,
// custom attributes, template controllers, value converters, binding
// behaviors) across a project, compiles templates against the resources in
// scope, and maintains an incremental dependency graph so edits recompile
// only what they affect.
//
pub mod diagnostic;
pub mod error;
pub mod eval;
pub mod exports;
pub mod expr;
pub mod facts;
pub mod gaps;
pub mod provenance;
pub mod registration;
pub mod resources;
pub mod source;
pub mod template;
pub mod value;

pub mod cursor;
pub mod incremental;
pub mod package;
pub mod pipeline;
pub mod snapshot;

pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use gaps::{Confidence, Gap, GapKind};
pub use source::{LineIndex, Span, Spanned};
pub use template::{bind, link, lower, plan, typecheck};

/// Crate version, surfaced through the CLI's `--version` and the server's
/// health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
