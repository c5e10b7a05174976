// File-fact extraction (spec §4.1).
//
// The core consumes a pre-parsed program (spec §6.2 Program host): the host
// hands back one `host_ast::HostFile` per source file. This module is pure
// with respect to that AST — it does not follow imports, it only walks one
// file's declarations into a `FileFacts` record. Cross-file resolution is
// `exports`/`eval`'s job.
//
// Grounded on `semantic::module_analysis::analyze_module`'s per-file walk
// structure (`analyze_module` iterating `module.files`), generalized from
// backend/blueprint/scheme declarations to classes + define-calls +
// imports/exports.

pub mod host_ast;

use crate::gaps::{Gap, GapKind};
use crate::source::{NormalizedPath, SourceSpan};
use crate::value::AnalyzableValue;
use host_ast::{ClassDecl, Decorator, DefineCall, ExportDecl, HostFile, ImportDecl};
use serde::{Deserialize, Serialize};

/// Everything extracted from one non-declaration file (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFacts {
    pub path: NormalizedPath,
    pub classes: Vec<ClassFacts>,
    pub define_calls: Vec<DefineCall>,
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
    pub gaps: Vec<Gap>,
}

/// A discovered class plus its decorators and static properties, ready for
/// the pattern recognizers (spec §4.4) to inspect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassFacts {
    pub name: String,
    pub span: SourceSpan,
    pub decorators: Vec<Decorator>,
    /// `static` class properties, e.g. `static bindables = [...]`,
    /// `static dependencies = [...]`.
    pub static_properties: Vec<(String, AnalyzableValue)>,
    pub is_exported: bool,
    pub is_default_export: bool,
}

/// Extract facts from one parsed file. Files ending in `.d.ts` are skipped
/// per spec §4.1 "Key policies" and yield an empty, gap-carrying result
/// rather than being omitted outright (so the caller can still see why).
pub fn extract(file: &HostFile) -> FileFacts {
    if file.path.as_str().ends_with(".d.ts") {
        return FileFacts {
            path: file.path.clone(),
            classes: Vec::new(),
            define_calls: Vec::new(),
            imports: Vec::new(),
            exports: Vec::new(),
            gaps: vec![Gap::new(
                GapKind::NoSource,
                "declaration file",
                "files ending in .d.ts are not fact-extracted",
            )],
        };
    }

    let mut gaps = Vec::new();
    let exported_names: std::collections::HashSet<&str> =
        file.exports.iter().filter_map(|e| e.local_name.as_deref()).collect();
    let default_export_name = file.exports.iter().find(|e| e.is_default).and_then(|e| e.local_name.as_deref());

    let classes = file
        .classes
        .iter()
        .map(|c| ClassFacts {
            name: c.name.clone(),
            span: c.span,
            decorators: c.decorators.clone(),
            static_properties: c.static_properties.clone(),
            is_exported: exported_names.contains(c.name.as_str()) || default_export_name == Some(c.name.as_str()),
            is_default_export: default_export_name == Some(c.name.as_str()),
        })
        .collect();

    for class in &file.classes {
        validate_class(class, &mut gaps);
    }

    FileFacts {
        path: file.path.clone(),
        classes,
        define_calls: file.define_calls.clone(),
        imports: file.imports.clone(),
        exports: file.exports.clone(),
        gaps,
    }
}

fn validate_class(class: &ClassDecl, gaps: &mut Vec<Gap>) {
    for decorator in &class.decorators {
        if decorator.legacy_emit_shape {
            gaps.push(
                Gap::new(
                    GapKind::LegacyDecorators,
                    format!("decorator `{}` on class `{}`", decorator.name, class.name),
                    "decorator metadata uses a legacy emit shape that could not be fully read",
                )
                .at(SourceSpan::new(decorator.span.span, class.span.file.unwrap_or(crate::source::SourceFileId(0)))),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceFileId, Span};

    fn file_span() -> SourceSpan {
        SourceSpan::new(Span::new(0, 10), SourceFileId(0))
    }

    #[test]
    fn declaration_files_are_skipped() {
        let file = HostFile {
            path: NormalizedPath::new("/p/src/types.d.ts"),
            classes: vec![],
            define_calls: vec![],
            imports: vec![],
            exports: vec![],
        };
        let facts = extract(&file);
        assert!(facts.classes.is_empty());
        assert_eq!(facts.gaps.len(), 1);
        assert_eq!(facts.gaps[0].kind, GapKind::NoSource);
    }

    #[test]
    fn extracts_exported_class_with_decorator() {
        let class = ClassDecl {
            name: "FooBar".to_string(),
            span: file_span(),
            decorators: vec![Decorator {
                name: "customElement".to_string(),
                args: vec![AnalyzableValue::Literal(crate::value::Literal::String("foo-bar".into()))],
                span: file_span(),
                legacy_emit_shape: false,
            }],
            static_properties: vec![],
        };
        let file = HostFile {
            path: NormalizedPath::new("/p/src/foo-bar.ts"),
            classes: vec![class],
            define_calls: vec![],
            imports: vec![],
            exports: vec![ExportDecl {
                local_name: Some("FooBar".to_string()),
                exported_name: "FooBar".to_string(),
                is_default: false,
                re_export_from: None,
            }],
        };
        let facts = extract(&file);
        assert_eq!(facts.classes.len(), 1);
        assert!(facts.classes[0].is_exported);
        assert_eq!(facts.classes[0].decorators.len(), 1);
        assert!(facts.gaps.is_empty());
    }

    #[test]
    fn legacy_decorator_shape_is_a_gap_not_a_failure() {
        let class = ClassDecl {
            name: "Widget".to_string(),
            span: file_span(),
            decorators: vec![Decorator {
                name: "customElement".to_string(),
                args: vec![],
                span: file_span(),
                legacy_emit_shape: true,
            }],
            static_properties: vec![],
        };
        let file = HostFile {
            path: NormalizedPath::new("/p/src/widget.ts"),
            classes: vec![class],
            define_calls: vec![],
            imports: vec![],
            exports: vec![],
        };
        let facts = extract(&file);
        assert_eq!(facts.gaps.len(), 1);
        assert_eq!(facts.gaps[0].kind, GapKind::LegacyDecorators);
        assert_eq!(facts.classes.len(), 1);
    }
}
