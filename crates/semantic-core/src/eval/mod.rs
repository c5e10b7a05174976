// Partial evaluation (spec §4.3), driven across files.
//
// For each file, builds a `LexicalScope` from its declarations and imports
// and resolves every `AnalyzableValue` the file-fact extractor produced
// (decorator args, static-property initializers, define-call args) through
// `value::resolve_in_scope`. Gaps are carried in an `Evaluated<T>` writer,
// the `Diagnosed<T>`-equivalent spec §7 asks every component to return.

use crate::facts::host_ast::{ClassDecl, DefineCall, Decorator};
use crate::facts::FileFacts;
use crate::gaps::{Gap, GapKind};
use crate::source::NormalizedPath;
use crate::value::{resolve_in_scope, AnalyzableValue, LexicalScope};
use std::collections::{HashMap, HashSet};

/// A value plus whatever gaps were hit producing it; the generic
/// "`{ value, gaps }`" writer spec §4.3/§7 describes.
#[derive(Debug, Clone)]
pub struct Evaluated<T> {
    pub value: T,
    pub gaps: Vec<Gap>,
}

impl<T> Evaluated<T> {
    pub fn new(value: T, gaps: Vec<Gap>) -> Self {
        Self { value, gaps }
    }

    pub fn ok(value: T) -> Self {
        Self { value, gaps: Vec::new() }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Evaluated<U> {
        Evaluated { value: f(self.value), gaps: self.gaps }
    }
}

/// One file's facts with every `AnalyzableValue` resolved as far as
/// possible against its own lexical scope.
#[derive(Debug, Clone)]
pub struct EvaluatedFile {
    pub path: NormalizedPath,
    pub classes: Vec<EvaluatedClass>,
    pub define_calls: Vec<(DefineCall, Vec<AnalyzableValue>)>,
}

#[derive(Debug, Clone)]
pub struct EvaluatedClass {
    pub name: String,
    pub span: crate::source::SourceSpan,
    pub decorators: Vec<EvaluatedDecorator>,
    pub static_properties: Vec<(String, AnalyzableValue)>,
    pub is_exported: bool,
    pub is_default_export: bool,
}

#[derive(Debug, Clone)]
pub struct EvaluatedDecorator {
    pub name: String,
    pub args: Vec<AnalyzableValue>,
    pub span: crate::source::SourceSpan,
}

/// Test hook (spec §4.3): force `analysis-failed` gaps for specific files,
/// used to exercise the confidence-downgrade path without a real
/// un-analyzable input.
pub type FailOnFiles = HashSet<NormalizedPath>;

/// Build a `LexicalScope` for one file from its class declarations (treated
/// as const bindings to `Class` values) and its imports.
pub fn build_lexical_scope(facts: &FileFacts) -> LexicalScope {
    let mut scope = LexicalScope::root(facts.path.clone());
    for class in &facts.classes {
        scope.bind(
            class.name.clone(),
            AnalyzableValue::Class { class_name: class.name.clone(), file_path: facts.path.clone() },
        );
    }
    for import in &facts.imports {
        scope.bind_import(import.local_name.clone(), import.specifier.clone(), import.export_name.clone());
    }
    scope
}

/// Drive partial evaluation across every file's facts.
pub fn evaluate_all(
    files: &HashMap<NormalizedPath, FileFacts>,
    fail_on_files: &FailOnFiles,
) -> Evaluated<HashMap<NormalizedPath, EvaluatedFile>> {
    let mut out = HashMap::new();
    let mut gaps = Vec::new();

    for (path, facts) in files {
        if fail_on_files.contains(path) {
            gaps.push(Gap::new(
                GapKind::AnalysisFailed,
                format!("file {path}"),
                "partial evaluation could not make progress on this file (forced by test hook)",
            ));
            continue;
        }

        let scope = build_lexical_scope(facts);
        let evaluated_classes = facts
            .classes
            .iter()
            .map(|class| evaluate_class(class, &scope, &mut gaps))
            .collect();
        let evaluated_calls = facts
            .define_calls
            .iter()
            .map(|call| {
                let args = call
                    .args
                    .iter()
                    .map(|a| {
                        let (resolved, mut g) = resolve_in_scope(a, &scope);
                        gaps.append(&mut g);
                        resolved
                    })
                    .collect();
                (call.clone(), args)
            })
            .collect();

        out.insert(
            path.clone(),
            EvaluatedFile { path: path.clone(), classes: evaluated_classes, define_calls: evaluated_calls },
        );
        gaps.extend(facts.gaps.clone());
    }

    Evaluated::new(out, gaps)
}

fn evaluate_class(class: &ClassDecl, scope: &LexicalScope, gaps: &mut Vec<Gap>) -> EvaluatedClass {
    let decorators = class
        .decorators
        .iter()
        .map(|d: &Decorator| {
            let args = d
                .args
                .iter()
                .map(|a| {
                    let (resolved, mut g) = resolve_in_scope(a, scope);
                    gaps.append(&mut g);
                    resolved
                })
                .collect();
            EvaluatedDecorator { name: d.name.clone(), args, span: d.span }
        })
        .collect();

    let static_properties = class
        .static_properties
        .iter()
        .map(|(name, value)| {
            let (resolved, mut g) = resolve_in_scope(value, scope);
            gaps.append(&mut g);
            (name.clone(), resolved)
        })
        .collect();

    EvaluatedClass {
        name: class.name.clone(),
        span: class.span,
        decorators,
        static_properties,
        is_exported: false,
        is_default_export: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::host_ast::HostFile;
    use crate::value::Literal;

    fn sample_files() -> HashMap<NormalizedPath, FileFacts> {
        let host = HostFile {
            path: NormalizedPath::new("/p/src/foo-bar.ts"),
            classes: vec![ClassDecl {
                name: "FooBar".to_string(),
                span: crate::source::SourceSpan::synthetic(),
                decorators: vec![Decorator {
                    name: "customElement".to_string(),
                    args: vec![AnalyzableValue::Literal(Literal::String("foo-bar".into()))],
                    span: crate::source::SourceSpan::synthetic(),
                    legacy_emit_shape: false,
                }],
                static_properties: vec![],
            }],
            define_calls: vec![],
            imports: vec![],
            exports: vec![],
        };
        let mut map = HashMap::new();
        map.insert(host.path.clone(), crate::facts::extract(&host));
        map
    }

    #[test]
    fn evaluates_decorator_literal_args() {
        let files = sample_files();
        let result = evaluate_all(&files, &FailOnFiles::new());
        assert!(result.gaps.is_empty());
        let file = result.value.get(&NormalizedPath::new("/p/src/foo-bar.ts")).unwrap();
        assert_eq!(file.classes.len(), 1);
        let deco = &file.classes[0].decorators[0];
        assert!(matches!(deco.args[0], AnalyzableValue::Literal(Literal::String(ref s)) if s == "foo-bar"));
    }

    #[test]
    fn fail_on_files_forces_analysis_failed_gap() {
        let files = sample_files();
        let mut fail = FailOnFiles::new();
        fail.insert(NormalizedPath::new("/p/src/foo-bar.ts"));
        let result = evaluate_all(&files, &fail);
        assert!(result.value.is_empty());
        assert_eq!(result.gaps.len(), 1);
        assert_eq!(result.gaps[0].kind, GapKind::AnalysisFailed);
    }
}
