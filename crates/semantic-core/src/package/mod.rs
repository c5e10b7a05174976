// Package analysis (spec §6.3): given a dependency's installed location,
// decide whether it is a component package at all, and if so extract the
// registration configuration(s) it exports (an `IRegistry`-shaped object
// whose `register(container)` method the value model already knows how to
// represent as a `FunctionValue` body of `Statement`s — see `value::Statement`'s
// own doc comment, "modeled narrowly... the spec §6.3 IRegistry example").
//
// Grounded on `diagnostic::codes`'s existing `E10xx` discovery range
// (`E1001 package_not_found` .. `E1004 cache_corrupt`, already reserved by
// the teacher's code table for exactly this component) and on
// `gaps::downgrade_confidence` for turning a package's gap list into one
// summary confidence the host can show in a single status line.

use crate::diagnostic::{codes, Diagnostic};
use crate::gaps::{downgrade_confidence, Confidence, Gap, GapKind};
use crate::source::{NormalizedPath, SourceSpan};
use crate::value::{AnalyzableValue, Statement};
use serde::{Deserialize, Serialize};

/// Cache schema version, bumped whenever `PackageResult`'s serialized shape
/// changes incompatibly; a cached entry with a mismatched version is
/// treated as absent rather than deserialized (spec §6.3 cache corruption
/// handling, `E1004`).
pub const SCHEMA_VERSION: &str = "warp-package-analysis@1";

/// The minimal `package.json` fields package analysis reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    pub main: Option<String>,
    pub module: Option<String>,
    pub types: Option<String>,
}

/// Whether a package result came from a config resolved at analysis time or
/// was read back out of a persisted cache entry (spec §6.3/§6.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Fresh,
    Cached,
}

/// How a caller wants `analyze_package` to treat an existing cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Use a cached entry if its schema version and package version match.
    UseIfValid,
    /// Ignore any cache entry and force a fresh analysis.
    ForceFresh,
}

/// The cache key a host stores a `PackageResult` under (spec §6.3 "cache
/// key" — package identity plus the schema version, so a schema bump
/// naturally misses rather than deserializing a stale shape).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub name: String,
    pub version: String,
    pub schema_version: String,
}

impl CacheKey {
    pub fn new(manifest: &PackageManifest) -> Self {
        Self { name: manifest.name.clone(), version: manifest.version.clone(), schema_version: SCHEMA_VERSION.to_string() }
    }
}

/// One `register(container) { ... }`-style configuration object this
/// package exports, with every resource reference it resolved to a class
/// (spec §6.3 scenario 3: `const Defaults = [FooElement, BarAttribute];
/// export const Config = { register(c) { c.register(...Defaults); } }`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedConfiguration {
    pub exported_name: String,
    pub registered_classes: Vec<String>,
}

/// The result of analyzing one package: whether it looks like a component
/// package at all, and what it exports for registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageAnalysis {
    pub manifest: PackageManifest,
    pub is_aurelia_package: bool,
    pub configurations: Vec<ExtractedConfiguration>,
    pub confidence: ConfidenceLevel,
}

/// `Confidence` is not `Serialize` (it lives alongside `Gap`, which carries
/// borrowed-feeling diagnostic context that a persisted cache entry
/// shouldn't have to round-trip); this is the serializable projection a
/// `PackageAnalysis` actually stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Manual,
    Low,
    Partial,
    Conservative,
    High,
    Exact,
}

impl From<Confidence> for ConfidenceLevel {
    fn from(c: Confidence) -> Self {
        match c {
            Confidence::Manual => ConfidenceLevel::Manual,
            Confidence::Low => ConfidenceLevel::Low,
            Confidence::Partial => ConfidenceLevel::Partial,
            Confidence::Conservative => ConfidenceLevel::Conservative,
            Confidence::High => ConfidenceLevel::High,
            Confidence::Exact => ConfidenceLevel::Exact,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageResult {
    pub analysis: PackageAnalysis,
    pub strategy: Strategy,
    pub cache_key: CacheKey,
}

/// A heuristic gate on whether a package is worth fully analyzing at all:
/// its manifest must declare a `main`/`module` entry point, and its name
/// must not look like a pure type-definitions or tooling package (spec
/// §6.3 `isAureliaPackage(path) -> bool`).
pub fn is_aurelia_package(manifest: &PackageManifest) -> bool {
    if manifest.main.is_none() && manifest.module.is_none() {
        return false;
    }
    !manifest.name.starts_with("@types/") && !manifest.name.ends_with("-cli")
}

/// Analyze one package's manifest and exported `register` functions,
/// honoring `cache_mode` against the supplied `cached` entry if present.
pub fn analyze_package(manifest: PackageManifest, register_exports: &[(String, Statement)], cached: Option<PackageResult>, cache_mode: CacheMode) -> (PackageResult, Vec<Diagnostic>) {
    let cache_key = CacheKey::new(&manifest);
    let mut diagnostics = Vec::new();

    if cache_mode == CacheMode::UseIfValid {
        if let Some(entry) = cached {
            if entry.cache_key == cache_key {
                return (PackageResult { strategy: Strategy::Cached, ..entry }, diagnostics);
            }
            diagnostics.push(Diagnostic::from_code(
                &codes::E1004,
                crate::source::Span::default(),
                format!("cached package analysis for `{}` does not match its current schema/version; recomputing", manifest.name),
            ));
        }
    }

    if manifest.main.is_none() && manifest.module.is_none() {
        diagnostics.push(Diagnostic::from_code(&codes::E1003, crate::source::Span::default(), format!("package `{}` declares no `main` or `module` entry point", manifest.name)));
    }

    let is_aurelia = is_aurelia_package(&manifest);
    let mut gaps: Vec<Gap> = Vec::new();
    let configurations = if is_aurelia {
        register_exports
            .iter()
            .map(|(name, register_fn)| extract_configuration(name, register_fn, &mut gaps))
            .collect()
    } else {
        Vec::new()
    };

    let confidence = downgrade_confidence(Confidence::Exact, &gaps);
    for gap in &gaps {
        diagnostics.push(gap.to_diagnostic());
    }

    let analysis = PackageAnalysis { manifest, is_aurelia_package: is_aurelia, configurations, confidence: confidence.into() };
    (PackageResult { analysis, strategy: Strategy::Fresh, cache_key }, diagnostics)
}

/// Analyze every package in a project's dependency tree, short-circuiting
/// `is_aurelia_package` before the more expensive `register` body walk
/// (spec §6.3 `analyzePackages` — batched form of `analyzePackage`).
pub fn analyze_packages(packages: Vec<(PackageManifest, Vec<(String, Statement)>)>, cache_mode: CacheMode) -> Vec<(PackageResult, Vec<Diagnostic>)> {
    packages.into_iter().map(|(manifest, exports)| analyze_package(manifest, &exports, None, cache_mode)).collect()
}

/// Walk one exported `register(container) { ... }` body, folding every
/// `container.register(...)`-shaped call's arguments down to class names.
/// Values that never fully resolved to a class (still a bare reference, an
/// unresolved import, or a dynamic expression) are recorded as a gap
/// instead of silently dropped.
fn extract_configuration(exported_name: &str, register_fn: &Statement, gaps: &mut Vec<Gap>) -> ExtractedConfiguration {
    let mut registered = Vec::new();
    walk_statement(register_fn, &mut registered, gaps, exported_name);
    ExtractedConfiguration { exported_name: exported_name.to_string(), registered_classes: registered }
}

fn walk_statement(stmt: &Statement, out: &mut Vec<String>, gaps: &mut Vec<Gap>, exported_name: &str) {
    match stmt {
        Statement::Expression(value) => collect_registered_classes(value, out, gaps, exported_name),
        Statement::Return(Some(value)) => collect_registered_classes(value, out, gaps, exported_name),
        Statement::Return(None) => {}
        Statement::VariableDeclaration { init: Some(value), .. } => collect_registered_classes(value, out, gaps, exported_name),
        Statement::VariableDeclaration { init: None, .. } => {}
        Statement::If { then_branch, else_branch, .. } => {
            for s in then_branch.iter().chain(else_branch.iter()) {
                walk_statement(s, out, gaps, exported_name);
            }
        }
        Statement::ForOf { body, .. } => {
            for s in body {
                walk_statement(s, out, gaps, exported_name);
            }
        }
    }
}

fn collect_registered_classes(value: &AnalyzableValue, out: &mut Vec<String>, gaps: &mut Vec<Gap>, exported_name: &str) {
    match value {
        AnalyzableValue::Call { args, .. } => {
            for arg in args {
                collect_registered_classes(arg, out, gaps, exported_name);
            }
        }
        AnalyzableValue::Class { class_name, .. } => out.push(class_name.clone()),
        AnalyzableValue::Spread { expanded: Some(items), .. } => {
            for item in items {
                collect_registered_classes(item, out, gaps, exported_name);
            }
        }
        AnalyzableValue::Reference { name, resolved: Some(inner) } => {
            let before = out.len();
            collect_registered_classes(inner, out, gaps, exported_name);
            if out.len() == before {
                gaps.push(Gap::new(GapKind::DynamicValue, format!("`{name}` in `{exported_name}.register`"), "registration argument did not resolve to a known class"));
            }
        }
        AnalyzableValue::Unknown { detail, .. } => {
            gaps.push(Gap::new(GapKind::DynamicValue, format!("registration argument in `{exported_name}.register`"), detail.clone()));
        }
        _ => {}
    }
}

/// Builds the `Statement::VariableDeclaration` span `extract_configuration`
/// and its gaps attach diagnostics to when a caller has no real source span
/// for a package's synthesized analysis (the package lives outside the
/// project's own source tree, so there's no editor to point a diagnostic
/// at beyond "this package").
pub fn synthetic_package_span() -> SourceSpan {
    SourceSpan::synthetic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{FunctionValue, Literal};

    fn manifest(name: &str, main: Option<&str>) -> PackageManifest {
        PackageManifest { name: name.to_string(), version: "1.0.0".to_string(), main: main.map(str::to_string), module: None, types: None }
    }

    #[test]
    fn types_only_package_is_not_aurelia() {
        assert!(!is_aurelia_package(&manifest("@types/lodash", Some("index.d.ts"))));
    }

    #[test]
    fn package_with_no_entry_point_is_not_aurelia() {
        assert!(!is_aurelia_package(&manifest("left-pad", None)));
    }

    #[test]
    fn package_with_main_is_aurelia_candidate() {
        assert!(is_aurelia_package(&manifest("my-components", Some("dist/index.js"))));
    }

    #[test]
    fn extracts_classes_registered_via_spread() {
        let register_body = Statement::Expression(AnalyzableValue::Call {
            callee: Box::new(AnalyzableValue::PropertyAccess { base: Box::new(AnalyzableValue::Reference { name: "c".into(), resolved: None }), key: "register".into() }),
            args: vec![AnalyzableValue::Spread {
                target: Box::new(AnalyzableValue::Reference { name: "Defaults".into(), resolved: None }),
                expanded: Some(vec![
                    AnalyzableValue::Class { class_name: "FooElement".into(), file_path: NormalizedPath::new("/p/foo.ts") },
                    AnalyzableValue::Class { class_name: "BarAttribute".into(), file_path: NormalizedPath::new("/p/bar.ts") },
                ]),
            }],
        });
        let mut gaps = Vec::new();
        let config = extract_configuration("Config", &register_body, &mut gaps);
        assert_eq!(config.registered_classes, vec!["FooElement".to_string(), "BarAttribute".to_string()]);
        assert!(gaps.is_empty());

        let _ = FunctionValue { params: vec!["container".into()], body: vec![] };
        let _ = Literal::Null;
    }

    #[test]
    fn unresolved_registration_argument_becomes_a_gap() {
        let register_body = Statement::Expression(AnalyzableValue::Call {
            callee: Box::new(AnalyzableValue::Reference { name: "register".into(), resolved: None }),
            args: vec![AnalyzableValue::Unknown { reason: GapKind::DynamicValue, detail: "computed import target".into() }],
        });
        let mut gaps = Vec::new();
        let config = extract_configuration("Config", &register_body, &mut gaps);
        assert!(config.registered_classes.is_empty());
        assert_eq!(gaps.len(), 1);
    }

    #[test]
    fn analyze_package_short_circuits_non_aurelia_packages() {
        let (result, diags) = analyze_package(manifest("left-pad", None), &[], None, CacheMode::ForceFresh);
        assert!(!result.analysis.is_aurelia_package);
        assert!(result.analysis.configurations.is_empty());
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("E1003")));
    }

    #[test]
    fn cached_result_is_reused_when_cache_key_matches() {
        let m = manifest("my-components", Some("dist/index.js"));
        let (fresh, _) = analyze_package(m.clone(), &[], None, CacheMode::ForceFresh);
        let (reused, diags) = analyze_package(m, &[], Some(fresh.clone()), CacheMode::UseIfValid);
        assert_eq!(reused.strategy, Strategy::Cached);
        assert!(diags.is_empty());
    }
}
