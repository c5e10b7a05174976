// The minimal per-file AST shape the program host hands to this crate
// (spec §6.2 `getSourceFiles()` + per-file AST). The core does not parse the
// host language itself — it is handed these facts already parsed — so this
// module only models the slice of structure file-fact extraction needs:
// classes, decorators, static properties, top-level define-style calls, and
// module imports/exports.

use crate::source::SourceSpan;
use crate::value::AnalyzableValue;
use serde::{Deserialize, Serialize};

use crate::source::NormalizedPath;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostFile {
    pub path: NormalizedPath,
    pub classes: Vec<ClassDecl>,
    pub define_calls: Vec<DefineCall>,
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub span: SourceSpan,
    pub decorators: Vec<Decorator>,
    pub static_properties: Vec<(String, AnalyzableValue)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decorator {
    pub name: String,
    pub args: Vec<AnalyzableValue>,
    pub span: SourceSpan,
    /// True when the host emitted this decorator's metadata in a shape the
    /// core cannot fully read (e.g. pre-standard legacy decorator output).
    pub legacy_emit_shape: bool,
}

/// A top-level factory call registered on the host API, e.g.
/// `CustomElement.define({ name: 'foo-bar' }, FooBar)` (spec §4.4 "Define
/// call").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefineCall {
    pub callee_path: Vec<String>,
    pub args: Vec<AnalyzableValue>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    pub local_name: String,
    pub specifier: String,
    /// `None` for a default import, `Some("*")` for `import * as ns`,
    /// `Some(name)` for a named import (possibly aliased on the host side
    /// already, so `local_name` and `export_name` can differ).
    pub export_name: Option<String>,
    pub span: SourceSpan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDecl {
    /// The locally-declared name being exported, if this re-exports a local
    /// declaration rather than passing another module's export through.
    pub local_name: Option<String>,
    pub exported_name: String,
    pub is_default: bool,
    /// `Some(specifier)` for `export { X } from './other'` / `export * from
    /// './other'` passthroughs.
    pub re_export_from: Option<String>,
}
