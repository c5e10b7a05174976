// Registration analysis and the resource/scope graph (spec §3.3, §4.5).
//
// Walks partially-evaluated module-scope values looking for registration
// sites: plugin entries, `container.register(...)` calls, `static
// dependencies = [...]` arrays, decorator/static-shape `dependencies:`,
// template `<import from="...">`, and local-template definitions. Each site
// yields an evidence record tied to a file, an intended scope, and a
// resource reference resolved against the converged catalog or left
// unresolved with a reason.
//
// Grounded on `semantic::scope::ScopeGraph`'s parent-chain scope lookup
// (kept as reference), generalized from lexical block scopes to named
// resource scopes with a fixed `local -> root` depth of one.

use crate::diagnostic::{codes, Diagnostic};
use crate::eval::EvaluatedFile;
use crate::resources::{AttributeLike, ResourceDef};
use crate::source::{NormalizedPath, Sourced, Span};
use crate::template::attr_pattern::BUILTIN_CONTROLLERS;
use crate::value::AnalyzableValue;
use std::collections::HashMap;

/// The root scope's constant id; every project has exactly one.
pub const ROOT_SCOPE_ID: &str = "root";

/// Build a local scope's id from its owning component's file path (spec
/// §4.5 `"local:{normalizedOwnerPath}"`).
pub fn local_scope_id(owner: &NormalizedPath) -> String {
    format!("local:{owner}")
}

/// The `ResourceCollections` the root scope is seeded with before any
/// registration evidence is folded in: `if`/`else`/`repeat`/`with`/`switch`/
/// `case`/`default-case`/`promise`/`then`/`catch`/`portal` as template
/// controllers with no owning file (spec §3.3 invariant "the root scope
/// contains built-in template controllers"). A host may still pass its own
/// `root_builtins` to `build` instead — this is the default a caller that
/// has no opinion on the built-in set can reach for.
pub fn builtin_root_collections() -> ResourceCollections {
    let mut collections = ResourceCollections::default();
    for &name in BUILTIN_CONTROLLERS {
        let def = ResourceDef::TemplateController(AttributeLike {
            name: Sourced::synthetic(name.to_string()),
            class_name: builtin_class_name(name),
            file: NormalizedPath::new(format!("<builtin>/{name}")),
            aliases: Vec::new(),
            bindables: HashMap::new(),
            is_template_controller: true,
            no_multi_bindings: false,
            dependencies: Vec::new(),
        });
        collections.controllers.insert(name.to_string(), def);
    }
    collections
}

fn builtin_class_name(name: &str) -> String {
    let mut chars = name.chars();
    let mut out = String::new();
    let mut upper_next = true;
    while let Some(c) = chars.next() {
        if c == '-' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Where a registration evidence record places its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationScope {
    Global,
    Local { owner: NormalizedPath },
}

impl RegistrationScope {
    pub fn scope_id(&self) -> String {
        match self {
            RegistrationScope::Global => ROOT_SCOPE_ID.to_string(),
            RegistrationScope::Local { owner } => local_scope_id(owner),
        }
    }
}

/// A reference from a registration site to its intended resource, either
/// resolved against the converged catalog or left unresolved with a reason
/// (spec §4.5).
#[derive(Debug, Clone)]
pub enum ResourceRef {
    Resolved { file: NormalizedPath, class_name: String },
    Unresolved { reason: String },
}

/// How a registration site was discovered, used only for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationSiteKind {
    PluginEntry,
    ContainerRegisterCall,
    StaticDependenciesArray,
    DecoratorDependencies,
    StaticShapeDependencies,
    TemplateImport,
    LocalTemplateDefinition,
}

/// One observed registration (spec §4.5 "evidence record").
#[derive(Debug, Clone)]
pub struct RegistrationEvidence {
    pub file: NormalizedPath,
    pub site: RegistrationSiteKind,
    pub scope: RegistrationScope,
    pub resource: ResourceRef,
    pub span: Span,
}

/// A named collection of resources, one bucket per resource kind (spec §3.3
/// `ResourceCollections`).
#[derive(Debug, Clone, Default)]
pub struct ResourceCollections {
    pub elements: HashMap<String, ResourceDef>,
    pub attributes: HashMap<String, ResourceDef>,
    pub controllers: HashMap<String, ResourceDef>,
    pub value_converters: HashMap<String, ResourceDef>,
    pub binding_behaviors: HashMap<String, ResourceDef>,
}

impl ResourceCollections {
    fn insert(&mut self, def: ResourceDef) {
        let bucket = match &def {
            ResourceDef::CustomElement(_) => &mut self.elements,
            ResourceDef::CustomAttribute(_) => &mut self.attributes,
            ResourceDef::TemplateController(_) => &mut self.controllers,
            ResourceDef::ValueConverter(_) => &mut self.value_converters,
            ResourceDef::BindingBehavior(_) => &mut self.binding_behaviors,
        };
        for alias in std::iter::once(def.name().to_string()).chain(def.aliases().iter().cloned()) {
            bucket.insert(alias, def.clone());
        }
    }
}

/// One scope in the resource graph: an id, optional parent, a label, and its
/// own `ResourceCollections` (spec §3.3).
#[derive(Debug, Clone)]
pub struct ResourceScope {
    pub id: String,
    pub parent: Option<String>,
    pub label: String,
    pub collections: ResourceCollections,
}

/// The root scope plus one local scope per owner with a local registration
/// (spec §4.5). Name lookup in a scope falls through to its parent chain;
/// the root scope is seeded with the built-in template controllers and
/// default binding commands/attribute patterns by the caller before
/// `ResourceGraph::build` runs (spec §3.3 invariant).
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    pub scopes: HashMap<String, ResourceScope>,
    pub orphans: Vec<(NormalizedPath, String)>,
    pub unresolved: Vec<RegistrationEvidence>,
}

impl ResourceGraph {
    /// Look up a name in `scope_id`, falling through the parent chain.
    /// Per the pinned Open Question (spec §5), a local scope is always
    /// checked before its root parent.
    pub fn lookup<'a>(&'a self, scope_id: &str, name: &str, pick: impl Fn(&ResourceCollections) -> Option<&'a ResourceDef>) -> Option<&'a ResourceDef> {
        let mut current = self.scopes.get(scope_id)?;
        loop {
            if let Some(found) = pick(&current.collections) {
                return Some(found);
            }
            match &current.parent {
                Some(parent_id) => current = self.scopes.get(parent_id)?,
                None => return None,
            }
        }
    }
}

/// Build the resource graph from the converged catalog and the observed
/// registration evidence. Every converged resource that appears in no
/// evidence record at all is an orphan (spec §4.5 "Orphans are resources
/// discovered but never registered").
pub fn build(
    catalog: &HashMap<(NormalizedPath, String), ResourceDef>,
    root_builtins: ResourceCollections,
    evidence: Vec<RegistrationEvidence>,
) -> (ResourceGraph, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut scopes: HashMap<String, ResourceScope> = HashMap::new();
    scopes.insert(
        ROOT_SCOPE_ID.to_string(),
        ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".to_string(), collections: root_builtins },
    );

    let mut registered_keys: std::collections::HashSet<(NormalizedPath, String)> = std::collections::HashSet::new();
    let mut unresolved = Vec::new();

    for record in &evidence {
        match &record.resource {
            ResourceRef::Unresolved { reason } => {
                diagnostics.push(Diagnostic::from_code(
                    &codes::E0401,
                    record.span,
                    format!("registration in {} could not be resolved: {reason}", record.file),
                ));
                unresolved.push(record.clone());
                continue;
            }
            ResourceRef::Resolved { file, class_name } => {
                let key = (file.clone(), class_name.clone());
                let Some(def) = catalog.get(&key) else {
                    diagnostics.push(Diagnostic::from_code(
                        &codes::E0401,
                        record.span,
                        format!("registration in {} references an unknown class `{class_name}`", record.file),
                    ));
                    unresolved.push(record.clone());
                    continue;
                };
                registered_keys.insert(key);
                let scope_id = record.scope.scope_id();
                let entry = scopes.entry(scope_id.clone()).or_insert_with(|| match &record.scope {
                    RegistrationScope::Global => ResourceScope {
                        id: ROOT_SCOPE_ID.to_string(),
                        parent: None,
                        label: "root".to_string(),
                        collections: ResourceCollections::default(),
                    },
                    RegistrationScope::Local { owner } => ResourceScope {
                        id: scope_id.clone(),
                        parent: Some(ROOT_SCOPE_ID.to_string()),
                        label: owner.to_string(),
                        collections: ResourceCollections::default(),
                    },
                });
                entry.collections.insert(def.clone());
            }
        }
    }

    let mut orphans = Vec::new();
    for key in catalog.keys() {
        if !registered_keys.contains(key) {
            orphans.push(key.clone());
            diagnostics.push(Diagnostic::from_code(
                &codes::E0402,
                Span::default(),
                format!("resource `{}` in {} is defined but never registered", key.1, key.0),
            ));
        }
    }

    (ResourceGraph { scopes, orphans, unresolved }, diagnostics)
}

/// Walk one file's evaluated classes and define-calls looking for
/// registration sites (spec §4.5). This is the evidence-*producing* half of
/// registration analysis; `build` above is the evidence-*consuming* half.
///
/// A component's own `static dependencies = [...]` array, a `$au.dependencies`
/// static-shape entry, and a decorator's `dependencies:` option all register
/// their targets in the component's *local* scope (spec §3.3 "a component's
/// own dependency list is scoped to it, not the project"). A top-level call
/// whose callee path ends in `register` — `container.register(...)`,
/// `Aurelia.register(...)`, a plugin object's own `register` method — is
/// treated as a global registration, since there is no enclosing component
/// to scope it to.
///
/// Template-sourced sites (`<import from>`, local `<template
/// as-custom-element>`) are not produced here: they require walking a
/// lowered template's DOM, not a file's host-language facts, and are left
/// for a template-aware caller to fold in alongside this evidence.
pub fn discover(file: &EvaluatedFile) -> Vec<RegistrationEvidence> {
    let mut evidence = Vec::new();
    let owner = RegistrationScope::Local { owner: file.path.clone() };

    for class in &file.classes {
        for (name, value) in &class.static_properties {
            if name == "dependencies" {
                evidence.extend(dependency_list_evidence(value, &file.path, class.span.span, RegistrationSiteKind::StaticDependenciesArray, owner.clone()));
            }
            if name == "$au" {
                if let AnalyzableValue::Object { properties, .. } = value {
                    if let Some((_, deps)) = properties.iter().find(|(k, _)| k == "dependencies") {
                        evidence.extend(dependency_list_evidence(deps, &file.path, class.span.span, RegistrationSiteKind::StaticShapeDependencies, owner.clone()));
                    }
                }
            }
        }
        for deco in &class.decorators {
            if let Some(AnalyzableValue::Object { properties, .. }) = deco.args.first() {
                if let Some((_, deps)) = properties.iter().find(|(k, _)| k == "dependencies") {
                    evidence.extend(dependency_list_evidence(deps, &file.path, deco.span.span, RegistrationSiteKind::DecoratorDependencies, owner.clone()));
                }
            }
        }
    }

    for (call, args) in &file.define_calls {
        if call.callee_path.last().map(String::as_str) == Some("register") {
            let site = if call.callee_path.first().map(String::as_str) == Some("container") {
                RegistrationSiteKind::ContainerRegisterCall
            } else {
                RegistrationSiteKind::PluginEntry
            };
            for arg in args {
                evidence.extend(resolve_arg_to_evidence(arg, &file.path, call.span.span, site, RegistrationScope::Global));
            }
        }
    }

    evidence
}

fn dependency_list_evidence(value: &AnalyzableValue, file: &NormalizedPath, span: Span, site: RegistrationSiteKind, scope: RegistrationScope) -> Vec<RegistrationEvidence> {
    match value {
        AnalyzableValue::Array(items) => items.iter().flat_map(|item| resolve_arg_to_evidence(item, file, span, site, scope.clone())).collect(),
        _ => vec![],
    }
}

/// Reduce one evaluated registration argument (a resolved class reference,
/// an import, a spread of either) to zero or more evidence records.
fn resolve_arg_to_evidence(value: &AnalyzableValue, file: &NormalizedPath, span: Span, site: RegistrationSiteKind, scope: RegistrationScope) -> Vec<RegistrationEvidence> {
    match value {
        AnalyzableValue::Class { class_name, file_path } => vec![RegistrationEvidence {
            file: file.clone(),
            site,
            scope,
            resource: ResourceRef::Resolved { file: file_path.clone(), class_name: class_name.clone() },
            span,
        }],
        AnalyzableValue::Reference { name, resolved: Some(inner) } => {
            let evidence = resolve_arg_to_evidence(inner, file, span, site, scope.clone());
            if evidence.is_empty() {
                vec![RegistrationEvidence { file: file.clone(), site, scope, resource: ResourceRef::Unresolved { reason: format!("`{name}` did not resolve to a class") }, span }]
            } else {
                evidence
            }
        }
        AnalyzableValue::Spread { expanded: Some(items), .. } => items.iter().flat_map(|item| resolve_arg_to_evidence(item, file, span, site, scope.clone())).collect(),
        AnalyzableValue::Import { specifier, .. } => vec![RegistrationEvidence {
            file: file.clone(),
            site,
            scope,
            resource: ResourceRef::Unresolved { reason: format!("import from `{specifier}` was not resolved to a class before registration analysis") },
            span,
        }],
        AnalyzableValue::Unknown { detail, .. } => vec![RegistrationEvidence { file: file.clone(), site, scope, resource: ResourceRef::Unresolved { reason: detail.clone() }, span }],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{ElementLike, EvidenceSourceKind};
    use crate::source::Sourced;
    use std::collections::HashMap as StdHashMap;

    fn element_def(name: &str, class_name: &str, file: &str) -> ResourceDef {
        ResourceDef::CustomElement(ElementLike {
            name: Sourced::synthetic(name.to_string()),
            class_name: class_name.to_string(),
            file: NormalizedPath::new(file),
            aliases: vec![],
            bindables: StdHashMap::new(),
            containerless: false,
            inline_template: None,
            dependencies: vec![],
        })
    }

    #[test]
    fn local_scope_id_format() {
        let owner = NormalizedPath::new("/p/src/app.ts");
        assert_eq!(local_scope_id(&owner), "local:/p/src/app.ts");
    }

    #[test]
    fn unregistered_resource_is_an_orphan() {
        let mut catalog = HashMap::new();
        let key = (NormalizedPath::new("/p/foo-bar.ts"), "FooBar".to_string());
        catalog.insert(key.clone(), element_def("foo-bar", "FooBar", "/p/foo-bar.ts"));
        let (graph, diags) = build(&catalog, ResourceCollections::default(), vec![]);
        assert_eq!(graph.orphans, vec![key]);
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("E0402")));
    }

    #[test]
    fn local_registration_creates_child_of_root() {
        let mut catalog = HashMap::new();
        let key = (NormalizedPath::new("/p/foo-bar.ts"), "FooBar".to_string());
        catalog.insert(key.clone(), element_def("foo-bar", "FooBar", "/p/foo-bar.ts"));
        let owner = NormalizedPath::new("/p/app.ts");
        let evidence = vec![RegistrationEvidence {
            file: owner.clone(),
            site: RegistrationSiteKind::StaticDependenciesArray,
            scope: RegistrationScope::Local { owner: owner.clone() },
            resource: ResourceRef::Resolved { file: key.0.clone(), class_name: key.1.clone() },
            span: Span::default(),
        }];
        let (graph, diags) = build(&catalog, ResourceCollections::default(), evidence);
        assert!(graph.orphans.is_empty());
        assert!(diags.is_empty());
        let local = graph.scopes.get(&local_scope_id(&owner)).unwrap();
        assert_eq!(local.parent.as_deref(), Some(ROOT_SCOPE_ID));
        assert!(local.collections.elements.contains_key("foo-bar"));
    }

    #[test]
    fn local_scope_lookup_falls_through_to_root() {
        let mut scopes = HashMap::new();
        let mut root_collections = ResourceCollections::default();
        root_collections.elements.insert("if".to_string(), element_def("if", "If", "/builtin/if.ts"));
        scopes.insert(ROOT_SCOPE_ID.to_string(), ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections: root_collections });
        let owner = NormalizedPath::new("/p/app.ts");
        scopes.insert(
            local_scope_id(&owner),
            ResourceScope { id: local_scope_id(&owner), parent: Some(ROOT_SCOPE_ID.to_string()), label: owner.to_string(), collections: ResourceCollections::default() },
        );
        let graph = ResourceGraph { scopes, orphans: vec![], unresolved: vec![] };
        let found = graph.lookup(&local_scope_id(&owner), "if", |c| c.elements.get("if"));
        assert!(found.is_some());
    }

    #[test]
    fn static_dependencies_array_discovers_local_evidence() {
        use crate::eval::EvaluatedClass;
        use crate::source::SourceSpan;

        let owner = NormalizedPath::new("/p/app.ts");
        let file = EvaluatedFile {
            path: owner.clone(),
            classes: vec![EvaluatedClass {
                name: "App".to_string(),
                span: SourceSpan::synthetic(),
                decorators: vec![],
                static_properties: vec![(
                    "dependencies".to_string(),
                    AnalyzableValue::Array(vec![AnalyzableValue::Class { class_name: "FooBar".to_string(), file_path: NormalizedPath::new("/p/foo-bar.ts") }]),
                )],
                is_exported: true,
                is_default_export: false,
            }],
            define_calls: vec![],
        };

        let evidence = discover(&file);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].site, RegistrationSiteKind::StaticDependenciesArray);
        assert_eq!(evidence[0].scope, RegistrationScope::Local { owner });
        match &evidence[0].resource {
            ResourceRef::Resolved { class_name, .. } => assert_eq!(class_name, "FooBar"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn container_register_call_discovers_global_evidence() {
        use crate::facts::host_ast::DefineCall;
        use crate::source::SourceSpan;

        let owner = NormalizedPath::new("/p/main.ts");
        let call = DefineCall { callee_path: vec!["container".to_string(), "register".to_string()], args: vec![], span: SourceSpan::synthetic() };
        let resolved_args = vec![AnalyzableValue::Class { class_name: "FooBar".to_string(), file_path: NormalizedPath::new("/p/foo-bar.ts") }];
        let file = EvaluatedFile { path: owner.clone(), classes: vec![], define_calls: vec![(call, resolved_args)] };

        let evidence = discover(&file);
        assert_eq!(evidence.len(), 1);
        assert_eq!(evidence[0].site, RegistrationSiteKind::ContainerRegisterCall);
        assert_eq!(evidence[0].scope, RegistrationScope::Global);
    }
}
