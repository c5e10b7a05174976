// The Compile API (spec §6.5): the two entry points a host actually calls
// end to end — `discoverProjectSemantics(program, config)` driving stages
// 4.1 through 4.5 over a whole project, and `compileTemplate(html, options)`
// driving 4.6/4.7 over one template. Everything this module does is a thin
// sequencing of the other modules' already-stage-scoped functions; it adds
// no analysis of its own.
//
// Grounded on `semantic::mod.rs`'s own top-level `analyze` driver (parse ->
// resolve -> typecheck, merging each stage's diagnostics into one sink),
// generalized from a three-stage compiler pipeline to this crate's
// five-stage discovery pipeline plus the template side pipeline.

use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::eval::{self, FailOnFiles};
use crate::exports::{self, ModuleResolver};
use crate::facts::{self, host_ast::HostFile, FileFacts};
use crate::gaps::gaps_to_diagnostics;
use crate::registration::{self, ResourceCollections, ResourceGraph};
use crate::resources::convergence::converge;
use crate::resources::recognize::{recognize_class, recognize_define_call};
use crate::resources::ResourceDef;
use crate::source::NormalizedPath;
use crate::template::attr_pattern::AttributePatternRegistry;
use crate::template::bind::{bind, ScopeModule};
use crate::template::link::{link, LinkedModule};
use crate::template::lower::lower;
use crate::template::plan::{plan, Plan};
use crate::template::typecheck::{typecheck, TypeJudgments};
use std::collections::HashMap;

fn add_all(diagnostics: &mut Diagnostics, new_diagnostics: Vec<Diagnostic>) {
    for diagnostic in new_diagnostics {
        diagnostics.add(diagnostic);
    }
}

/// `ResolutionResult` (spec §6.5): everything `discoverProjectSemantics`
/// hands back. `facts` is the per-file facts map the spec names alongside
/// `resources`/`registration`/`resourceGraph`; `resources` is the converged
/// catalog keyed `(file, className)`.
pub struct ResolutionResult {
    pub facts: HashMap<NormalizedPath, FileFacts>,
    pub resources: HashMap<(NormalizedPath, String), ResourceDef>,
    pub resource_graph: ResourceGraph,
    pub diagnostics: Diagnostics,
}

/// Everything `discoverProjectSemantics` needs beyond the sources
/// themselves (spec §6.2 program host + §3.3 root scope seeding).
pub struct DiscoverOptions<'a> {
    pub resolver: &'a dyn ModuleResolver,
    pub sibling_html_exists: &'a dyn Fn(&NormalizedPath) -> bool,
    pub fail_on_files: FailOnFiles,
    /// Built-in template controllers/binding commands the root scope is
    /// seeded with before registration evidence is folded in (spec §3.3
    /// invariant); empty by default since this crate does not hardcode the
    /// built-in resource set itself — a host provides it.
    pub root_builtins: ResourceCollections,
}

/// Run file-fact extraction (4.1), export binding resolution (4.2), partial
/// evaluation (4.3), pattern recognition and convergence (4.4), and
/// registration analysis (4.5) over a whole project's pre-parsed sources.
pub fn discover_project_semantics(sources: &HashMap<NormalizedPath, HostFile>, options: DiscoverOptions) -> ResolutionResult {
    let mut diagnostics = Diagnostics::new();

    let facts: HashMap<NormalizedPath, FileFacts> = sources.iter().map(|(path, file)| (path.clone(), facts::extract(file))).collect();
    for file_facts in facts.values() {
        add_all(&mut diagnostics, gaps_to_diagnostics(&file_facts.gaps));
    }

    // Export binding resolution feeds cross-file symbol resolution that a
    // host-facing caller may want (re-export chains, aliasing); its own
    // gaps are surfaced even though nothing downstream in this function
    // currently re-reads the map, since a future linker pass would.
    let export_map = exports::build(&facts, options.resolver);
    add_all(&mut diagnostics, gaps_to_diagnostics(&export_map.gaps));

    let evaluated = eval::evaluate_all(&facts, &options.fail_on_files);
    add_all(&mut diagnostics, gaps_to_diagnostics(&evaluated.gaps));

    let mut next_id = 0u32;
    let mut candidates = Vec::new();
    for (path, evaluated_file) in &evaluated.value {
        for class in &evaluated_file.classes {
            let (candidate, gaps) = recognize_class(class, path, &mut next_id, |p| (options.sibling_html_exists)(p));
            add_all(&mut diagnostics, gaps_to_diagnostics(&gaps));
            if let Some(candidate) = candidate {
                candidates.push(candidate);
            }
        }
        for (call, args) in &evaluated_file.define_calls {
            let mut gaps = Vec::new();
            let class_name_hint = args.iter().find_map(|a| match a {
                crate::value::AnalyzableValue::Class { class_name, .. } => Some(class_name.as_str()),
                _ => None,
            });
            if let Some(candidate) = recognize_define_call(&call.callee_path, args, class_name_hint, path, call.span, &mut next_id, &mut gaps) {
                candidates.push(candidate);
            }
            add_all(&mut diagnostics, gaps_to_diagnostics(&gaps));
        }
    }

    let (resources, converge_diagnostics) = converge(candidates);
    for diagnostic in converge_diagnostics {
        diagnostics.add(diagnostic);
    }

    let mut evidence = Vec::new();
    for evaluated_file in evaluated.value.values() {
        evidence.extend(registration::discover(evaluated_file));
    }
    let (resource_graph, registration_diagnostics) = registration::build(&resources, options.root_builtins, evidence);
    for diagnostic in registration_diagnostics {
        diagnostics.add(diagnostic);
    }

    ResolutionResult { facts, resources, resource_graph, diagnostics }
}

/// `compileTemplate(html, options) -> { plan, codeResult }` (spec §6.5):
/// lowers, links, binds, typechecks, and plans one template against a
/// resolved scope. `codeResult` is left to `aot-codegen::emit` — this
/// function stops at `Plan`, the boundary the spec draws between the
/// template pipeline (here) and the emitter (a separate crate).
pub struct CompiledTemplate {
    pub linked: LinkedModule,
    pub scope: ScopeModule,
    pub types: TypeJudgments,
    pub plan: Plan,
    pub diagnostics: Diagnostics,
}

pub fn compile_template(html: &str, scope_id: &str, graph: &ResourceGraph, registry: &AttributePatternRegistry) -> CompiledTemplate {
    let mut diagnostics = Diagnostics::new();

    let (ir_module, lower_diagnostics) = lower(html, registry);
    diagnostics.merge(lower_diagnostics);

    let linked = link(ir_module, scope_id, graph, &mut diagnostics);
    let scope = bind(&linked, &mut diagnostics);
    let types = typecheck(&linked, &mut diagnostics);
    let plan = plan(&linked, &mut diagnostics);

    CompiledTemplate { linked, scope, types, plan, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::host_ast::{ClassDecl, Decorator};
    use crate::source::SourceSpan;
    use crate::value::{AnalyzableValue, Literal};

    struct NoopResolver;
    impl ModuleResolver for NoopResolver {
        fn resolve(&self, _specifier: &str, _from_file: &NormalizedPath) -> Option<NormalizedPath> {
            None
        }
    }

    fn decorated_element_file(path: &str) -> HostFile {
        HostFile {
            path: NormalizedPath::new(path),
            classes: vec![ClassDecl {
                name: "FooBar".to_string(),
                span: SourceSpan::synthetic(),
                decorators: vec![Decorator {
                    name: "customElement".to_string(),
                    args: vec![AnalyzableValue::Literal(Literal::String("foo-bar".to_string()))],
                    span: SourceSpan::synthetic(),
                    legacy_emit_shape: false,
                }],
                static_properties: vec![],
            }],
            define_calls: vec![],
            imports: vec![],
            exports: vec![],
        }
    }

    #[test]
    fn discover_project_semantics_converges_a_decorated_class_into_an_orphan_resource() {
        let mut sources = HashMap::new();
        sources.insert(NormalizedPath::new("/p/foo-bar.ts"), decorated_element_file("/p/foo-bar.ts"));
        let resolver = NoopResolver;
        let result = discover_project_semantics(
            &sources,
            DiscoverOptions { resolver: &resolver, sibling_html_exists: &|_| false, fail_on_files: FailOnFiles::new(), root_builtins: ResourceCollections::default() },
        );
        assert_eq!(result.resources.len(), 1);
        assert_eq!(result.resource_graph.orphans.len(), 1, "never registered, so it's an orphan");
    }

    #[test]
    fn compile_template_plans_an_unresolvable_but_well_formed_document() {
        let mut scopes = HashMap::new();
        scopes.insert(
            registration::ROOT_SCOPE_ID.to_string(),
            crate::registration::ResourceScope { id: registration::ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections: ResourceCollections::default() },
        );
        let graph = ResourceGraph { scopes, orphans: vec![], unresolved: vec![] };
        let registry = AttributePatternRegistry::new();
        let compiled = compile_template("<div>${item}</div>", registration::ROOT_SCOPE_ID, &graph, &registry);
        assert!(compiled.diagnostics.is_empty());
        assert_eq!(compiled.plan.nested_templates.len(), 0);
    }
}
