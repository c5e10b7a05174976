// Planning (spec §4.7, "Plan", and §3.5 "Plan"): transforms linked+scoped
// IR into a nested `PlanNode` tree with per-template-scope hydration
// target indices, ready for `aot-codegen` to serialize.
//
// Grounded on the same tagged-union-over-tree shape `template::dom::DomNode`
// uses, generalized with a `targetIndex` counter that resets at every
// controller-synthesized nested template boundary (spec §5 "Target indices
// within a template are allocated in DOM pre-order" + testable property #4).

use crate::diagnostic::{codes, Diagnostics};
use crate::source::{ExprId, NodeId};
use crate::template::attr_pattern::BindingCommand;
use crate::template::dom::{DomNode, DomNodeKind};
use crate::template::link::{LinkedInstruction, LinkedModule};
use crate::template::lower::ExprTable;
use serde::{Deserialize, Serialize};

/// One template-controller attribute, planned onto the node it targets.
/// `nested_template` indexes into the owning `Plan::nested_templates`
/// (plan-order — spec §4.7 Emit "nestedTemplates[k] is the plan for the
/// k-th encountered controller").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanController {
    pub name: String,
    pub command: BindingCommand,
    pub expr: Option<ExprId>,
    pub paired_if: Option<NodeId>,
    pub nested_template: usize,
}

/// An element (real or controller-marker) node in the plan tree (spec §3.5
/// "PlanElementNode may carry bindings, customElement, customAttrs,
/// letElement, and controllers"). `tag` is `None` for a `<template>`
/// wrapper or a controller marker, neither of which is a real tagged
/// element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanElementNode {
    pub tag: Option<String>,
    pub target_index: Option<u32>,
    pub custom_element: Option<String>,
    /// Spec SPEC_FULL "containerless propagates to hydration": true when the
    /// resolved custom element's own `ResourceDef` set `containerless`.
    /// Always `false` for a node with no `custom_element`.
    pub containerless: bool,
    pub bindings: Vec<LinkedInstruction>,
    /// Resolved custom-attribute bindables. Always empty today: linking
    /// only resolves custom *elements* against the resource graph, not
    /// standalone custom attributes, so there is nothing to populate this
    /// with yet. Kept so the plan shape matches the spec's node type even
    /// though no producer fills it in.
    pub custom_attrs: Vec<LinkedInstruction>,
    /// `<let>` declarations. Always `None`: `let` is not a recognized
    /// binding command at lowering time.
    pub let_element: Option<Vec<(String, ExprId)>>,
    pub controllers: Vec<PlanController>,
    pub children: Vec<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlanNode {
    Fragment { children: Vec<PlanNode> },
    Element(PlanElementNode),
    Text { target_index: Option<u32>, parts: Vec<String>, expr_ids: Vec<ExprId> },
    /// An authored HTML comment with no controller attached to it; never
    /// allocated a target.
    Comment,
}

/// One template's plan (spec §3.5): its node tree, hoisted expression
/// table, and the plan-ordered list of nested templates its controllers
/// own. The document-level `plan()` entry point wraps its tree in a
/// `Fragment`; a controller's own nested template does not get that extra
/// wrapper, since it is already exactly one `<template>` node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub root: PlanNode,
    pub exprs: ExprTable,
    pub nested_templates: Vec<Plan>,
}

/// Plan a whole document: `module.root` becomes the sole child of a
/// `Fragment` (spec §8 worked example #4: "root plan is a fragment whose
/// single child is a `<template>` element...").
pub fn plan(module: &LinkedModule, diagnostics: &mut Diagnostics) -> Plan {
    let (root, nested_templates) = plan_body(module, diagnostics);
    Plan { root: PlanNode::Fragment { children: vec![root] }, exprs: module.exprs.clone(), nested_templates }
}

/// Plan a controller-owned nested template: no `Fragment` wrapper, since
/// `module.root` is already the synthesized `<template>` node itself.
fn plan_nested(module: &LinkedModule, diagnostics: &mut Diagnostics) -> Plan {
    let (root, nested_templates) = plan_body(module, diagnostics);
    Plan { root, exprs: module.exprs.clone(), nested_templates }
}

fn plan_body(module: &LinkedModule, diagnostics: &mut Diagnostics) -> (PlanNode, Vec<Plan>) {
    let mut target_counter = 0u32;
    let mut nested_templates = Vec::new();
    let root = plan_node(&module.root, module, &mut target_counter, &mut nested_templates, diagnostics);
    (root, nested_templates)
}

fn alloc_target(counter: &mut u32) -> u32 {
    let index = *counter;
    *counter += 1;
    index
}

fn plan_node(node: &DomNode, module: &LinkedModule, target_counter: &mut u32, nested_templates: &mut Vec<Plan>, diagnostics: &mut Diagnostics) -> PlanNode {
    let row = module.rows.iter().find(|r| r.node == node.id);

    match &node.kind {
        DomNodeKind::Text { value } => match row.map(|r| r.instructions.as_slice()) {
            Some([LinkedInstruction::TextBinding { parts, expr_ids }]) => {
                PlanNode::Text { target_index: Some(alloc_target(target_counter)), parts: parts.clone(), expr_ids: expr_ids.clone() }
            }
            _ => PlanNode::Text { target_index: None, parts: vec![value.clone()], expr_ids: Vec::new() },
        },
        DomNodeKind::Comment { .. } => match row.and_then(|r| r.instructions.first()) {
            Some(LinkedInstruction::Controller { name, command, expr, nested_template, paired_if }) => {
                let target_index = Some(alloc_target(target_counter));
                let plan_index = nested_templates.len();
                match module.nested_templates.get(&nested_template.0) {
                    Some(nested_module) => nested_templates.push(plan_nested(nested_module, diagnostics)),
                    None => diagnostics.add(crate::diagnostic::Diagnostic::from_code(
                        &codes::E0901,
                        node.span,
                        format!("controller `{name}` has no nested template to plan"),
                    )),
                }
                PlanNode::Element(PlanElementNode {
                    tag: None,
                    target_index,
                    custom_element: None,
                    containerless: false,
                    bindings: Vec::new(),
                    custom_attrs: Vec::new(),
                    let_element: None,
                    controllers: vec![PlanController { name: name.clone(), command: command.clone(), expr: *expr, paired_if: *paired_if, nested_template: plan_index }],
                    children: Vec::new(),
                })
            }
            _ => PlanNode::Comment,
        },
        DomNodeKind::Element { tag, children, .. } => {
            let instructions = row.map(|r| r.instructions.clone()).unwrap_or_default();
            let resolved = module.elements.get(&node.id.0);
            let custom_element = resolved.map(|r| r.class_name.clone());
            let containerless = resolved.map(|r| r.containerless).unwrap_or(false);
            let target_index = (custom_element.is_some() || !instructions.is_empty()).then(|| alloc_target(target_counter));
            let planned_children = children.iter().map(|c| plan_node(c, module, target_counter, nested_templates, diagnostics)).collect();
            PlanNode::Element(PlanElementNode {
                tag: Some(tag.clone()),
                target_index,
                custom_element,
                containerless,
                bindings: instructions,
                custom_attrs: Vec::new(),
                let_element: None,
                controllers: Vec::new(),
                children: planned_children,
            })
        }
        DomNodeKind::Template { children, .. } => {
            let instructions = row.map(|r| r.instructions.clone()).unwrap_or_default();
            let target_index = (!instructions.is_empty()).then(|| alloc_target(target_counter));
            let planned_children = children.iter().map(|c| plan_node(c, module, target_counter, nested_templates, diagnostics)).collect();
            PlanNode::Element(PlanElementNode {
                tag: None,
                target_index,
                custom_element: None,
                containerless: false,
                bindings: instructions,
                custom_attrs: Vec::new(),
                let_element: None,
                controllers: Vec::new(),
                children: planned_children,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::{ResourceCollections, ResourceGraph, ROOT_SCOPE_ID};
    use crate::template::attr_pattern::AttributePatternRegistry;
    use crate::template::link::link;
    use crate::template::lower::lower;
    use std::collections::HashMap as StdHashMap;

    fn empty_graph() -> ResourceGraph {
        let mut scopes = StdHashMap::new();
        scopes.insert(ROOT_SCOPE_ID.to_string(), crate::registration::ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections: ResourceCollections::default() });
        ResourceGraph { scopes, orphans: vec![], unresolved: vec![] }
    }

    fn linked(source: &str) -> LinkedModule {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(source, &registry);
        let graph = empty_graph();
        let mut diags = Diagnostics::new();
        link(ir, ROOT_SCOPE_ID, &graph, &mut diags)
    }

    fn only_child(node: &PlanElementNode) -> &PlanElementNode {
        match node.children.first().expect("one child") {
            PlanNode::Element(e) => e,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn empty_template_plans_to_an_empty_fragment() {
        let module = linked("");
        let mut diags = Diagnostics::new();
        let result = plan(&module, &mut diags);
        match &result.root {
            PlanNode::Fragment { children } => {
                assert_eq!(children.len(), 1);
                match &children[0] {
                    PlanNode::Element(e) => {
                        assert!(e.children.is_empty());
                        assert!(e.target_index.is_none());
                    }
                    other => panic!("unexpected {other:?}"),
                }
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(result.nested_templates.is_empty());
    }

    #[test]
    fn static_text_only_template_allocates_no_target() {
        let module = linked("hello");
        let mut diags = Diagnostics::new();
        let result = plan(&module, &mut diags);
        let PlanNode::Fragment { children } = &result.root else { panic!() };
        let PlanNode::Element(root) = &children[0] else { panic!() };
        match &root.children[0] {
            PlanNode::Text { target_index, parts, .. } => {
                assert!(target_index.is_none());
                assert_eq!(parts, &vec!["hello".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repeat_plus_if_nests_one_controller_per_level_with_targets_reset() {
        let module = linked(r#"<div repeat.for="item of items" if.bind="item.visible">${item.name}</div>"#);
        let mut diags = Diagnostics::new();
        let result = plan(&module, &mut diags);
        assert!(diags.is_empty());

        let PlanNode::Fragment { children } = &result.root else { panic!() };
        let PlanNode::Element(doc_root) = &children[0] else { panic!() };
        let marker = only_child(doc_root);
        assert_eq!(marker.controllers.len(), 1);
        assert_eq!(marker.controllers[0].command, BindingCommand::For);
        assert_eq!(marker.target_index, Some(0));
        assert!(marker.bindings.is_empty());

        let repeat_plan = &result.nested_templates[marker.controllers[0].nested_template];
        let PlanNode::Element(repeat_root) = &repeat_plan.root else { panic!() };
        let inner_marker = only_child(repeat_root);
        assert_eq!(inner_marker.controllers.len(), 1);
        assert_eq!(inner_marker.controllers[0].command, BindingCommand::Bind);
        // Each nested template's own target counter restarts at 0.
        assert_eq!(inner_marker.target_index, Some(0));

        let if_plan = &repeat_plan.nested_templates[inner_marker.controllers[0].nested_template];
        let PlanNode::Element(if_root) = &if_plan.root else { panic!() };
        let div = only_child(if_root);
        assert_eq!(div.target_index, Some(0));
        assert!(div.controllers.is_empty());
        match &div.children[0] {
            PlanNode::Text { target_index, parts, expr_ids } => {
                assert_eq!(*target_index, None, "text target lives on the div's own row index 0, not a separate target");
                assert_eq!(parts.len(), expr_ids.len() + 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
