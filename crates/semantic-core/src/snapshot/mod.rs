// Stable snapshots (spec §6.6): a serializable, cross-run-stable view of a
// project's resolved resources and exported API surface, keyed by content
// hash rather than by arena id so two analyses of unchanged source produce
// byte-identical snapshot ids.
//
// Grounded on `registration::local_scope_id`'s own content-addressed key
// format (`"local:{normalizedOwnerPath}"`), generalized from scope ids to
// symbol ids: `stable_symbol_id` hashes a resource's own identity fields
// with `xxh3` (the same hasher `incremental::Graph` uses for its green
// tokens) rather than handing out an arena index that would renumber on
// every re-run.

use crate::resources::ResourceDef;
use crate::source::NormalizedPath;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Snapshot format version (spec §6.6 literal). Bumped whenever a
/// `SemanticSnapshot`'s shape changes in a way that is not
/// backward-compatible for a consumer reading the JSON directly.
pub const SEMANTIC_SNAPSHOT_VERSION: &str = "aurelia-semantic-snapshot@1";

/// A stable id for one resource, `sym:{hash}` where the hash covers the
/// resource's kind, canonical name, and owning file — so renaming an
/// unrelated class or reordering recognizers never changes the id (spec
/// §6.6 "symbol ids survive a re-run of the same project untouched").
pub fn stable_symbol_id(kind: &str, canonical_name: &str, file: &NormalizedPath) -> String {
    let mut input = Vec::with_capacity(kind.len() + canonical_name.len() + file.as_str().len() + 2);
    input.extend_from_slice(kind.as_bytes());
    input.push(0);
    input.extend_from_slice(canonical_name.as_bytes());
    input.push(0);
    input.extend_from_slice(file.as_str().as_bytes());
    format!("sym:{:016x}", xxh3_64(&input))
}

/// Where a snapshot symbol's identity came from (spec §3.7 reuses the same
/// evidence-source vocabulary registration analysis does).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolOrigin {
    Manifest,
    Analysis,
}

/// One resource, flattened to the fields a snapshot consumer needs without
/// requiring them to understand `ResourceDef`'s tagged-union shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSymbol {
    pub id: String,
    pub kind: String,
    pub name: String,
    pub class_name: String,
    pub file: String,
    pub aliases: Vec<String>,
    pub origin: SymbolOrigin,
}

impl SnapshotSymbol {
    pub fn from_resource(def: &ResourceDef, origin: SymbolOrigin) -> Self {
        let kind = resource_kind_str(def);
        let id = stable_symbol_id(kind, def.name(), def.file());
        SnapshotSymbol {
            id,
            kind: kind.to_string(),
            name: def.name().to_string(),
            class_name: def.class_name().to_string(),
            file: def.file().to_string(),
            aliases: def.aliases().to_vec(),
            origin,
        }
    }
}

fn resource_kind_str(def: &ResourceDef) -> &'static str {
    match def {
        ResourceDef::CustomElement(_) => "custom-element",
        ResourceDef::CustomAttribute(_) => "custom-attribute",
        ResourceDef::TemplateController(_) => "template-controller",
        ResourceDef::ValueConverter(_) => "value-converter",
        ResourceDef::BindingBehavior(_) => "binding-behavior",
    }
}

/// The subset of a project's resources a consuming package cares about:
/// what it exports for others to register, independent of how those
/// resources were discovered (spec §6.6 "api surface" — used by
/// `package::analyze_package` to publish a dependency-facing summary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSurfaceSnapshot {
    pub version: String,
    pub symbols: Vec<SnapshotSymbol>,
}

impl ApiSurfaceSnapshot {
    pub fn new(symbols: Vec<SnapshotSymbol>) -> Self {
        Self { version: SEMANTIC_SNAPSHOT_VERSION.to_string(), symbols }
    }
}

/// A full project snapshot: every converged resource plus the scope it
/// registered into, serializable as a single stable JSON document (spec
/// §6.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSnapshot {
    pub version: String,
    pub symbols: Vec<SnapshotSymbol>,
    /// `symbol.id -> scope id` (spec §3.3 `ResourceScope::id`), so a
    /// consumer can reconstruct which scope each symbol landed in without
    /// re-running registration analysis.
    pub scope_of: Vec<(String, String)>,
    pub orphan_ids: Vec<String>,
}

impl SemanticSnapshot {
    pub fn new(symbols: Vec<SnapshotSymbol>, scope_of: Vec<(String, String)>, orphan_ids: Vec<String>) -> Self {
        Self { version: SEMANTIC_SNAPSHOT_VERSION.to_string(), symbols, scope_of, orphan_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ElementLike, NameOnly};
    use crate::source::Sourced;
    use std::collections::HashMap;

    fn element() -> ResourceDef {
        ResourceDef::CustomElement(ElementLike {
            name: Sourced::synthetic("foo-bar".to_string()),
            class_name: "FooBar".to_string(),
            file: NormalizedPath::new("/p/foo-bar.ts"),
            aliases: vec!["fb".to_string()],
            bindables: HashMap::new(),
            containerless: false,
            inline_template: None,
            dependencies: vec![],
        })
    }

    #[test]
    fn stable_symbol_id_is_deterministic() {
        let a = stable_symbol_id("custom-element", "foo-bar", &NormalizedPath::new("/p/foo-bar.ts"));
        let b = stable_symbol_id("custom-element", "foo-bar", &NormalizedPath::new("/p/foo-bar.ts"));
        assert_eq!(a, b);
        assert!(a.starts_with("sym:"));
    }

    #[test]
    fn different_file_produces_different_id() {
        let a = stable_symbol_id("custom-element", "foo-bar", &NormalizedPath::new("/p/a/foo-bar.ts"));
        let b = stable_symbol_id("custom-element", "foo-bar", &NormalizedPath::new("/p/b/foo-bar.ts"));
        assert_ne!(a, b);
    }

    #[test]
    fn symbol_from_resource_carries_aliases() {
        let symbol = SnapshotSymbol::from_resource(&element(), SymbolOrigin::Analysis);
        assert_eq!(symbol.kind, "custom-element");
        assert_eq!(symbol.aliases, vec!["fb".to_string()]);
        assert_eq!(symbol.origin, SymbolOrigin::Analysis);
    }

    #[test]
    fn snapshot_carries_version_literal() {
        let snapshot = SemanticSnapshot::new(vec![], vec![], vec![]);
        assert_eq!(snapshot.version, "aurelia-semantic-snapshot@1");
        let _ = NameOnly { name: Sourced::synthetic("x".into()), class_name: "X".into(), file: NormalizedPath::new("/p/x.ts"), aliases: vec![] };
    }
}
