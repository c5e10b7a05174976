// Host linking (spec §4.7, "Link (20)"): resolves each lowered instruction
// against the active `ResourceGraph`+scope, filling in element/bindable/
// controller targets, and pairs `else` controllers with their nearest
// preceding `if` sibling.

use crate::diagnostic::{codes, Diagnostics};
use crate::registration::ResourceGraph;
use crate::resources::BindingMode;
use crate::source::{NodeId, Span};
use crate::template::attr_pattern::BindingCommand;
use crate::template::dom::{DomNode, DomNodeKind};
use crate::template::lower::{ExprTable, IrModule, IrRow, RawInstruction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A bindable resolved against a custom element/attribute's declared
/// bindables (spec §3.2 `Bindable`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedBindable {
    pub owner_resource: String,
    pub mode: Option<BindingMode>,
}

/// `RawInstruction` with resource-graph lookups filled in. Instructions with
/// no resolvable target (plain DOM attributes, native elements) carry `None`
/// rather than being rejected — only resource-shaped names that fail to
/// resolve produce a diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LinkedInstruction {
    PropertyBinding { target: String, command: BindingCommand, expr: crate::source::ExprId, bindable: Option<ResolvedBindable> },
    AttributeBinding { name: String, expr: crate::source::ExprId },
    AttributeInterpolation { name: String, parts: Vec<String>, expr_ids: Vec<crate::source::ExprId> },
    StylePropertyBinding { property: String, expr: crate::source::ExprId },
    ListenerBinding { event: String, expr: crate::source::ExprId, capture: bool },
    RefBinding { value: String },
    TextBinding { parts: Vec<String>, expr_ids: Vec<crate::source::ExprId> },
    IteratorBinding { expr: crate::source::ExprId },
    SetAttribute { name: String, value: String },
    SetClassAttribute { value: String },
    SetStyleAttribute { value: String },
    /// A resolved controller shorthand. `paired_if` is set only for an
    /// `else` controller that found a preceding `if` sibling (spec §9 Open
    /// Question #1).
    Controller { name: String, command: BindingCommand, expr: Option<crate::source::ExprId>, nested_template: NodeId, paired_if: Option<NodeId> },
}

#[derive(Debug, Clone, Default)]
pub struct LinkedRow {
    pub node: NodeId,
    pub instructions: Vec<LinkedInstruction>,
}

#[derive(Debug, Clone)]
pub struct LinkedModule {
    pub root: DomNode,
    pub exprs: ExprTable,
    pub rows: Vec<LinkedRow>,
    /// Custom-element resolutions keyed by the element `NodeId`, for tags
    /// that resolved against the active scope's `elements` collection.
    pub elements: HashMap<u32, ResolvedElement>,
    pub nested_templates: HashMap<u32, LinkedModule>,
}

/// A tag resolved against a custom-element definition (spec SPEC_FULL
/// "containerless propagates to hydration"): `containerless` is read here,
/// the one place in the pipeline holding both the element instruction and
/// its `ResourceDef` at once, and carried forward into the plan/emit stages
/// so a runtime knows not to wrap the hydrated element in its own view host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedElement {
    pub class_name: String,
    pub containerless: bool,
}

/// Link a lowered `IrModule` against `scope_id` in `graph`. Nested templates
/// synthesized for controller shorthands are linked recursively against the
/// same scope (a controller does not introduce a new resource scope, only a
/// new binding frame — that is `bind`'s job).
pub fn link(module: IrModule, scope_id: &str, graph: &ResourceGraph, diagnostics: &mut Diagnostics) -> LinkedModule {
    let mut tags = HashMap::new();
    collect_tags(&module.root, &mut tags);

    let mut pairs: HashMap<u32, Option<NodeId>> = HashMap::new();
    collect_else_pairs(&module.root, &module.rows, &mut pairs);

    let mut elements = HashMap::new();
    for (node_id, tag) in &tags {
        if !tag.contains('-') {
            continue;
        }
        match graph.lookup(scope_id, tag, |c| c.elements.get(tag)) {
            Some(def) => {
                let containerless = match def {
                    crate::resources::ResourceDef::CustomElement(e) => e.containerless,
                    _ => false,
                };
                elements.insert(*node_id, ResolvedElement { class_name: def.class_name().to_string(), containerless });
            }
            None => diagnostics.add(crate::diagnostic::Diagnostic::from_code(
                &codes::E0601,
                Span::default(),
                format!("unknown custom element `{tag}`"),
            )),
        }
    }

    let rows = module
        .rows
        .into_iter()
        .map(|row| link_row(row, &tags, &elements, graph, scope_id, &pairs, diagnostics))
        .collect();

    let nested_templates = module
        .nested_templates
        .into_iter()
        .map(|(id, nested)| (id, link(nested, scope_id, graph, diagnostics)))
        .collect();

    LinkedModule { root: module.root, exprs: module.exprs, rows, elements, nested_templates }
}

fn link_row(
    row: IrRow,
    tags: &HashMap<u32, String>,
    elements: &HashMap<u32, ResolvedElement>,
    graph: &ResourceGraph,
    scope_id: &str,
    pairs: &HashMap<u32, Option<NodeId>>,
    diagnostics: &mut Diagnostics,
) -> LinkedRow {
    let owner_tag = tags.get(&row.node.0);
    let owner_is_custom_element = elements.contains_key(&row.node.0);

    let instructions = row
        .instructions
        .into_iter()
        .map(|instr| link_instruction(instr, owner_tag, owner_is_custom_element, graph, scope_id, &row.node, pairs, diagnostics))
        .collect();

    LinkedRow { node: row.node, instructions }
}

#[allow(clippy::too_many_arguments)]
fn link_instruction(
    instr: RawInstruction,
    owner_tag: Option<&String>,
    owner_is_custom_element: bool,
    graph: &ResourceGraph,
    scope_id: &str,
    node: &NodeId,
    pairs: &HashMap<u32, Option<NodeId>>,
    diagnostics: &mut Diagnostics,
) -> LinkedInstruction {
    match instr {
        RawInstruction::PropertyBinding { target, command, expr } => {
            let bindable = if owner_is_custom_element {
                owner_tag.and_then(|tag| graph.lookup(scope_id, tag, |c| c.elements.get(tag))).and_then(|def| match def {
                    crate::resources::ResourceDef::CustomElement(e) => e.bindables.get(&target).map(|b| ResolvedBindable { owner_resource: def.name().to_string(), mode: b.mode }),
                    _ => None,
                })
            } else {
                None
            };
            if owner_is_custom_element && bindable.is_none() {
                diagnostics.add(crate::diagnostic::Diagnostic::from_code(
                    &codes::E0602,
                    Span::default(),
                    format!("`{target}` is not a declared bindable on `{}`", owner_tag.map(String::as_str).unwrap_or("?")),
                ));
            }
            LinkedInstruction::PropertyBinding { target, command, expr, bindable }
        }
        RawInstruction::AttributeBinding { name, expr } => LinkedInstruction::AttributeBinding { name, expr },
        RawInstruction::AttributeInterpolation { name, parts, expr_ids } => LinkedInstruction::AttributeInterpolation { name, parts, expr_ids },
        RawInstruction::StylePropertyBinding { property, expr } => LinkedInstruction::StylePropertyBinding { property, expr },
        RawInstruction::ListenerBinding { event, expr, capture } => LinkedInstruction::ListenerBinding { event, expr, capture },
        RawInstruction::RefBinding { value } => LinkedInstruction::RefBinding { value },
        RawInstruction::TextBinding { parts, expr_ids } => LinkedInstruction::TextBinding { parts, expr_ids },
        RawInstruction::IteratorBinding { expr } => LinkedInstruction::IteratorBinding { expr },
        RawInstruction::SetAttribute { name, value } => LinkedInstruction::SetAttribute { name, value },
        RawInstruction::SetClassAttribute { value } => LinkedInstruction::SetClassAttribute { value },
        RawInstruction::SetStyleAttribute { value } => LinkedInstruction::SetStyleAttribute { value },
        RawInstruction::ControllerShorthand { name, command, expr, nested_template } => {
            let paired_if = pairs.get(&node.0).copied().flatten();
            if name == "else" && paired_if.is_none() {
                diagnostics.add(crate::diagnostic::Diagnostic::from_code(
                    &codes::E0603,
                    Span::default(),
                    "`else` has no preceding `if` sibling in the same parent".to_string(),
                ));
            }
            LinkedInstruction::Controller { name, command, expr, nested_template, paired_if }
        }
    }
}

fn collect_tags(node: &DomNode, out: &mut HashMap<u32, String>) {
    match &node.kind {
        DomNodeKind::Element { tag, children, .. } => {
            out.insert(node.id.0, tag.clone());
            for child in children {
                collect_tags(child, out);
            }
        }
        DomNodeKind::Template { children, .. } => {
            for child in children {
                collect_tags(child, out);
            }
        }
        _ => {}
    }
}

/// Populates `pairs[else_marker] = Some(if_marker)` for every `else`
/// controller marker whose nearest preceding sibling (in the same parent
/// children list) is an `if` controller marker. Siblings that aren't
/// controller-shorthand markers don't reset the pairing — the nearest
/// preceding `if` wins regardless of what sits between them (spec §9 Open
/// Question #1).
fn collect_else_pairs(node: &DomNode, rows: &[IrRow], pairs: &mut HashMap<u32, Option<NodeId>>) {
    let children = match &node.kind {
        DomNodeKind::Element { children, .. } | DomNodeKind::Template { children, .. } => children,
        _ => return,
    };

    let mut pending_if: Option<NodeId> = None;
    for child in children {
        if let DomNodeKind::Comment { .. } = &child.kind {
            if let Some(row) = rows.iter().find(|r| r.node == child.id) {
                if let Some(RawInstruction::ControllerShorthand { name, .. }) = row.instructions.first() {
                    match name.as_str() {
                        "if" => pending_if = Some(child.id),
                        "else" => {
                            pairs.insert(child.id.0, pending_if);
                        }
                        _ => {}
                    }
                }
            }
        }
        collect_else_pairs(child, rows, pairs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{ResourceGraph, ROOT_SCOPE_ID};
    use crate::resources::{Bindable, ElementLike, ResourceDef};
    use crate::source::Sourced;
    use crate::template::attr_pattern::AttributePatternRegistry;
    use crate::template::lower::lower;
    use std::collections::HashMap as StdHashMap;

    fn graph_with_element(tag: &str) -> ResourceGraph {
        graph_with_element_opts(tag, false)
    }

    fn graph_with_element_opts(tag: &str, containerless: bool) -> ResourceGraph {
        let mut elements = StdHashMap::new();
        let mut bindables = StdHashMap::new();
        bindables.insert("value".to_string(), Bindable { name: Sourced::synthetic("value".to_string()), attribute: None, mode: None, primary: false });
        elements.insert(
            tag.to_string(),
            ResourceDef::CustomElement(ElementLike {
                name: Sourced::synthetic(tag.to_string()),
                class_name: "Widget".to_string(),
                file: crate::source::NormalizedPath::new("/p/widget.ts"),
                aliases: vec![],
                bindables,
                containerless,
                inline_template: None,
                dependencies: vec![],
            }),
        );
        let mut collections = crate::registration::ResourceCollections::default();
        collections.elements = elements;
        let mut scopes = StdHashMap::new();
        scopes.insert(ROOT_SCOPE_ID.to_string(), crate::registration::ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections });
        ResourceGraph { scopes, orphans: vec![], unresolved: vec![] }
    }

    #[test]
    fn resolves_known_custom_element() {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(r#"<my-widget value.bind="x"></my-widget>"#, &registry);
        let graph = graph_with_element("my-widget");
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        assert!(diags.is_empty());
        assert_eq!(linked.elements.len(), 1);
    }

    #[test]
    fn containerless_flag_is_read_from_the_resolved_definition() {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(r#"<my-widget></my-widget>"#, &registry);
        let graph = graph_with_element_opts("my-widget", true);
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        let resolved = linked.elements.values().next().expect("one resolved element");
        assert!(resolved.containerless);
    }

    #[test]
    fn unknown_custom_element_emits_diagnostic() {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(r#"<my-widget></my-widget>"#, &registry);
        let graph = graph_with_element("other-widget");
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        assert!(linked.elements.is_empty());
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("E0601")));
    }

    #[test]
    fn else_pairs_with_preceding_if() {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(r#"<div><span if.bind="a">x</span><span else>y</span></div>"#, &registry);
        let graph = graph_with_element("no-match");
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        assert!(diags.iter().all(|d| d.code.as_deref() != Some("E0603")));
        let else_row = linked.rows.iter().find(|r| r.instructions.iter().any(|i| matches!(i, LinkedInstruction::Controller { name, .. } if name == "else"))).unwrap();
        match &else_row.instructions[0] {
            LinkedInstruction::Controller { paired_if, .. } => assert!(paired_if.is_some()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dangling_else_emits_diagnostic() {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(r#"<div><span else>y</span></div>"#, &registry);
        let graph = graph_with_element("no-match");
        let mut diags = Diagnostics::new();
        let _ = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("E0603")));
    }
}
