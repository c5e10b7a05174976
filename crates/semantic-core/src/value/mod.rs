// The value model (spec §3.4): lexical scopes and partially-evaluated
// values. `resolve_in_scope` walks a value tree and resolves references
// through the scope chain; anything it cannot reduce is left as `Unknown`
// carrying a typed gap reason rather than failing the whole pass (spec §4.3
// "Partial evaluation never throws for author errors").
//
// Grounded on the arena + parent-index pattern of `semantic::scope::ScopeGraph`
// (kept as reference), generalized from named declaration scopes to lexical
// value scopes; the resolver's cycle-breaking (tracking the set of names
// currently being resolved) is grounded on `semantic::resolve::Resolver`'s
// treatment of import cycles.

use crate::gaps::{Gap, GapKind};
use crate::source::{NormalizedPath, SourceSpan};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A partially-evaluated value (spec §3.4). Tagged union dispatched by
/// exhaustive match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyzableValue {
    Literal(Literal),
    Array(Vec<AnalyzableValue>),
    Object {
        properties: Vec<(String, AnalyzableValue)>,
        methods: Vec<(String, FunctionValue)>,
    },
    /// A name reference, optionally already resolved to a target value.
    Reference {
        name: String,
        resolved: Option<Box<AnalyzableValue>>,
    },
    /// An import binding: `specifier` is the module specifier as written,
    /// `export_name` is `None` for a default import, `Some("*")` for a
    /// namespace import.
    Import {
        specifier: String,
        export_name: Option<String>,
    },
    Class {
        class_name: String,
        file_path: NormalizedPath,
    },
    Function(FunctionValue),
    PropertyAccess {
        base: Box<AnalyzableValue>,
        key: String,
    },
    Call {
        callee: Box<AnalyzableValue>,
        args: Vec<AnalyzableValue>,
    },
    /// `...target`; `expanded` holds the flattened elements once the target
    /// resolves to an array (spec §4.3 "expands spread").
    Spread {
        target: Box<AnalyzableValue>,
        expanded: Option<Vec<AnalyzableValue>>,
    },
    /// A value that could not be reduced, with a typed reason.
    Unknown { reason: GapKind, detail: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionValue {
    pub params: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Literal {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
}

/// Statements inside a function body, used by partial evaluation of
/// `register(container) { ... }`-style factory bodies (spec §4.3/§6.3 IRegistry
/// example). Modeled narrowly: only what the pipeline needs to walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Statement {
    Expression(AnalyzableValue),
    Return(Option<AnalyzableValue>),
    VariableDeclaration { name: String, init: Option<AnalyzableValue> },
    If { condition: AnalyzableValue, then_branch: Vec<Statement>, else_branch: Vec<Statement> },
    ForOf { binding: String, iterable: AnalyzableValue, body: Vec<Statement> },
}

/// A lexical scope built from a file's declarations and imports (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct LexicalScope {
    pub file_path: Option<NormalizedPath>,
    pub bindings: HashMap<String, AnalyzableValue>,
    pub imports: HashMap<String, (String, Option<String>)>,
    pub parent: Option<Box<LexicalScope>>,
}

impl LexicalScope {
    pub fn root(file_path: NormalizedPath) -> Self {
        Self {
            file_path: Some(file_path),
            bindings: HashMap::new(),
            imports: HashMap::new(),
            parent: None,
        }
    }

    pub fn child(parent: LexicalScope) -> Self {
        Self {
            file_path: parent.file_path.clone(),
            bindings: HashMap::new(),
            imports: HashMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    pub fn bind(&mut self, name: impl Into<String>, value: AnalyzableValue) {
        self.bindings.insert(name.into(), value);
    }

    pub fn bind_import(&mut self, local_name: impl Into<String>, specifier: impl Into<String>, export_name: Option<String>) {
        self.imports.insert(local_name.into(), (specifier.into(), export_name));
    }

    /// Look up a name through the chain: local bindings first, then imports,
    /// then parent scopes (a scope's own imports shadow outer bindings).
    fn lookup(&self, name: &str) -> Option<LookupHit<'_>> {
        if let Some(value) = self.bindings.get(name) {
            return Some(LookupHit::Binding(value));
        }
        if let Some((specifier, export_name)) = self.imports.get(name) {
            return Some(LookupHit::Import(specifier, export_name.as_deref()));
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }
}

enum LookupHit<'a> {
    Binding(&'a AnalyzableValue),
    Import(&'a str, Option<&'a str>),
}

/// Resolve a value tree against a lexical scope (spec §4.3). `resolving`
/// tracks names currently being chased so self/mutually-recursive
/// references cycle-break into `Unknown` rather than recursing forever.
pub fn resolve_in_scope(value: &AnalyzableValue, scope: &LexicalScope) -> (AnalyzableValue, Vec<Gap>) {
    let mut resolving = Vec::new();
    resolve_inner(value, scope, &mut resolving)
}

fn resolve_inner(
    value: &AnalyzableValue,
    scope: &LexicalScope,
    resolving: &mut Vec<String>,
) -> (AnalyzableValue, Vec<Gap>) {
    let mut gaps = Vec::new();
    let resolved = match value {
        AnalyzableValue::Reference { name, resolved: None } => {
            if resolving.contains(name) {
                AnalyzableValue::Unknown {
                    reason: GapKind::DynamicValue,
                    detail: format!("cycle resolving `{name}`"),
                }
            } else {
                match scope.lookup(name) {
                    Some(LookupHit::Import(specifier, export_name)) => AnalyzableValue::Import {
                        specifier: specifier.to_string(),
                        export_name: export_name.map(str::to_string),
                    },
                    Some(LookupHit::Binding(target)) => {
                        resolving.push(name.clone());
                        let (resolved_target, mut inner_gaps) = resolve_inner(target, scope, resolving);
                        resolving.pop();
                        gaps.append(&mut inner_gaps);
                        AnalyzableValue::Reference {
                            name: name.clone(),
                            resolved: Some(Box::new(resolved_target)),
                        }
                    }
                    None => AnalyzableValue::Unknown {
                        reason: GapKind::DynamicValue,
                        detail: format!("no binding found for `{name}`"),
                    },
                }
            }
        }
        AnalyzableValue::Reference { resolved: Some(_), .. } => value.clone(),
        AnalyzableValue::Spread { target, expanded: None } => {
            let (resolved_target, mut inner_gaps) = resolve_inner(target, scope, resolving);
            gaps.append(&mut inner_gaps);
            let expanded = extract_array(&resolved_target);
            if expanded.is_none() {
                gaps.push(Gap::new(
                    GapKind::SpreadUnknown,
                    "spread target",
                    "spread target did not resolve to an array literal",
                ));
            }
            AnalyzableValue::Spread {
                target: Box::new(resolved_target),
                expanded,
            }
        }
        AnalyzableValue::Spread { expanded: Some(_), .. } => value.clone(),
        AnalyzableValue::PropertyAccess { base, key } => {
            let (resolved_base, mut inner_gaps) = resolve_inner(base, scope, resolving);
            gaps.append(&mut inner_gaps);
            match fold_property_access(&resolved_base, key) {
                Some(folded) => folded,
                None => {
                    gaps.push(Gap::new(
                        GapKind::ComputedProperty,
                        format!("property `{key}`"),
                        "base did not resolve to an object/array with this key available",
                    ));
                    AnalyzableValue::PropertyAccess {
                        base: Box::new(resolved_base),
                        key: key.clone(),
                    }
                }
            }
        }
        AnalyzableValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let (v, mut g) = resolve_inner(item, scope, resolving);
                gaps.append(&mut g);
                out.push(v);
            }
            AnalyzableValue::Array(out)
        }
        AnalyzableValue::Object { properties, methods } => {
            let mut out_props = Vec::with_capacity(properties.len());
            for (k, v) in properties {
                let (rv, mut g) = resolve_inner(v, scope, resolving);
                gaps.append(&mut g);
                out_props.push((k.clone(), rv));
            }
            AnalyzableValue::Object {
                properties: out_props,
                methods: methods.clone(),
            }
        }
        AnalyzableValue::Call { callee, args } => {
            let (rc, mut g) = resolve_inner(callee, scope, resolving);
            gaps.append(&mut g);
            let mut out_args = Vec::with_capacity(args.len());
            for a in args {
                let (ra, mut ga) = resolve_inner(a, scope, resolving);
                gaps.append(&mut ga);
                out_args.push(ra);
            }
            AnalyzableValue::Call {
                callee: Box::new(rc),
                args: out_args,
            }
        }
        AnalyzableValue::Literal(_)
        | AnalyzableValue::Import { .. }
        | AnalyzableValue::Class { .. }
        | AnalyzableValue::Function(_)
        | AnalyzableValue::Unknown { .. } => value.clone(),
    };
    (resolved, gaps)
}

fn extract_array(value: &AnalyzableValue) -> Option<Vec<AnalyzableValue>> {
    match value {
        AnalyzableValue::Array(items) => Some(items.clone()),
        AnalyzableValue::Reference { resolved: Some(inner), .. } => extract_array(inner),
        _ => None,
    }
}

fn fold_property_access(base: &AnalyzableValue, key: &str) -> Option<AnalyzableValue> {
    match base {
        AnalyzableValue::Object { properties, .. } => {
            properties.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        }
        AnalyzableValue::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
        AnalyzableValue::Reference { resolved: Some(inner), .. } => fold_property_access(inner, key),
        _ => None,
    }
}

/// A provenance-bearing location for `AnalyzableValue`s threaded alongside
/// values during recognition (spec §3.2 `Sourced<T>`).
#[derive(Debug, Clone)]
pub struct Located<T> {
    pub value: T,
    pub span: SourceSpan,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SourceFileId, Span};

    fn span() -> SourceSpan {
        SourceSpan::new(Span::new(0, 1), SourceFileId(0))
    }

    #[test]
    fn resolves_reference_to_literal() {
        let mut scope = LexicalScope::root(NormalizedPath::new("/p/a.ts"));
        scope.bind("X", AnalyzableValue::Literal(Literal::String("foo-bar".into())));
        let value = AnalyzableValue::Reference { name: "X".into(), resolved: None };
        let (resolved, gaps) = resolve_in_scope(&value, &scope);
        assert!(gaps.is_empty());
        match resolved {
            AnalyzableValue::Reference { resolved: Some(inner), .. } => {
                assert!(matches!(*inner, AnalyzableValue::Literal(Literal::String(ref s)) if s == "foo-bar"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn converts_reference_to_import_binding() {
        let mut scope = LexicalScope::root(NormalizedPath::new("/p/a.ts"));
        scope.bind_import("FooElement", "./foo-element", Some("FooElement".to_string()));
        let value = AnalyzableValue::Reference { name: "FooElement".into(), resolved: None };
        let (resolved, gaps) = resolve_in_scope(&value, &scope);
        assert!(gaps.is_empty());
        assert!(matches!(resolved, AnalyzableValue::Import { .. }));
    }

    #[test]
    fn unresolved_name_becomes_unknown_gap() {
        let scope = LexicalScope::root(NormalizedPath::new("/p/a.ts"));
        let value = AnalyzableValue::Reference { name: "Missing".into(), resolved: None };
        let (resolved, gaps) = resolve_in_scope(&value, &scope);
        assert_eq!(gaps.len(), 0); // the Unknown *is* the signal; no separate gap emitted here
        assert!(matches!(resolved, AnalyzableValue::Unknown { .. }));
    }

    #[test]
    fn self_reference_cycle_breaks() {
        let mut scope = LexicalScope::root(NormalizedPath::new("/p/a.ts"));
        scope.bind("X", AnalyzableValue::Reference { name: "X".into(), resolved: None });
        let value = AnalyzableValue::Reference { name: "X".into(), resolved: None };
        let (resolved, _gaps) = resolve_in_scope(&value, &scope);
        fn contains_unknown(v: &AnalyzableValue) -> bool {
            match v {
                AnalyzableValue::Unknown { .. } => true,
                AnalyzableValue::Reference { resolved: Some(inner), .. } => contains_unknown(inner),
                _ => false,
            }
        }
        assert!(contains_unknown(&resolved));
    }

    #[test]
    fn expands_spread_of_array() {
        let scope = LexicalScope::root(NormalizedPath::new("/p/a.ts"));
        let value = AnalyzableValue::Spread {
            target: Box::new(AnalyzableValue::Array(vec![
                AnalyzableValue::Literal(Literal::Number(1.0)),
                AnalyzableValue::Literal(Literal::Number(2.0)),
            ])),
            expanded: None,
        };
        let (resolved, gaps) = resolve_in_scope(&value, &scope);
        assert!(gaps.is_empty());
        match resolved {
            AnalyzableValue::Spread { expanded: Some(items), .. } => assert_eq!(items.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn folds_property_access_on_object() {
        let scope = LexicalScope::root(NormalizedPath::new("/p/a.ts"));
        let value = AnalyzableValue::PropertyAccess {
            base: Box::new(AnalyzableValue::Object {
                properties: vec![("name".to_string(), AnalyzableValue::Literal(Literal::String("foo".into())))],
                methods: vec![],
            }),
            key: "name".to_string(),
        };
        let (resolved, gaps) = resolve_in_scope(&value, &scope);
        assert!(gaps.is_empty());
        assert!(matches!(resolved, AnalyzableValue::Literal(Literal::String(ref s)) if s == "foo"));
        let _ = span();
    }
}
