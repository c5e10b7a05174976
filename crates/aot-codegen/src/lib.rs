// Emit (spec §3.6/§4.7 "Emit"): serializes a `Plan` into the wire contract a
// runtime loader consumes — `{ definition, expressions }` where
// `definition.instructions[i]` is the instruction list for hydration target
// `i` of that template, and `definition.nestedTemplates[k]` is the emitted
// definition for the k-th controller encountered in plan order.
//
// Grounded on `warp-semantic-core::template::plan`'s `Plan`/`PlanNode` tree
// (already shaped around a per-template target counter); this crate's job
// is only the tree-to-flat-array projection that tree shape implies, plus
// hoisting the `ExprTable` so a runtime can look up an expression by id
// without walking the instruction tree.

use serde::Serialize;
use warp_semantic_core::source::{ExprId, NodeId};
use warp_semantic_core::template::attr_pattern::BindingCommand;
use warp_semantic_core::template::link::{LinkedInstruction, ResolvedBindable};
use warp_semantic_core::template::lower::ExprTable;
use warp_semantic_core::template::plan::{Plan, PlanController, PlanNode};

/// One instruction record, flattened out of a `Plan`'s tree shape into the
/// per-target array the runtime loader walks. Reuses `LinkedInstruction`'s
/// already-resolved binding records and adds the two record kinds a linked
/// instruction doesn't carry on its own: a controller hydration marker
/// (which needs a `nestedTemplates` index, not a `NodeId`) and a custom
/// element hydration marker (a `LinkedInstruction` row never carries its
/// own element resolution — that lives on the owning `PlanElementNode`).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InstructionRecord {
    PropertyBinding { target: String, command: BindingCommand, expr: ExprId, bindable: Option<ResolvedBindable> },
    AttributeBinding { name: String, expr: ExprId },
    AttributeInterpolation { name: String, parts: Vec<String>, expr_ids: Vec<ExprId> },
    StylePropertyBinding { property: String, expr: ExprId },
    ListenerBinding { event: String, expr: ExprId, capture: bool },
    RefBinding { value: String },
    IteratorBinding { expr: ExprId },
    SetAttribute { name: String, value: String },
    SetClassAttribute { value: String },
    SetStyleAttribute { value: String },
    /// A real element with a resolved custom-element definition.
    /// `containerless` mirrors the definition's own flag (spec SPEC_FULL
    /// "containerless propagates to hydration") so a runtime loader never
    /// wraps the hydrated element in its own view host when set.
    HydrateElement { res: String, containerless: bool },
    /// A controller shorthand marker. `def` indexes into the owning
    /// `TemplateDefinition::nested_templates`.
    HydrateTemplateController { res: String, command: BindingCommand, expr: Option<ExprId>, def: usize, paired_if: Option<NodeId> },
    /// A text node's interpolation, matching `parts.len() == expr_ids.len() + 1`.
    TextBinding { parts: Vec<String>, expr_ids: Vec<ExprId> },
}

impl From<&LinkedInstruction> for InstructionRecord {
    fn from(instr: &LinkedInstruction) -> Self {
        match instr {
            LinkedInstruction::PropertyBinding { target, command, expr, bindable } => {
                InstructionRecord::PropertyBinding { target: target.clone(), command: command.clone(), expr: *expr, bindable: bindable.clone() }
            }
            LinkedInstruction::AttributeBinding { name, expr } => InstructionRecord::AttributeBinding { name: name.clone(), expr: *expr },
            LinkedInstruction::AttributeInterpolation { name, parts, expr_ids } => {
                InstructionRecord::AttributeInterpolation { name: name.clone(), parts: parts.clone(), expr_ids: expr_ids.clone() }
            }
            LinkedInstruction::StylePropertyBinding { property, expr } => InstructionRecord::StylePropertyBinding { property: property.clone(), expr: *expr },
            LinkedInstruction::ListenerBinding { event, expr, capture } => InstructionRecord::ListenerBinding { event: event.clone(), expr: *expr, capture: *capture },
            LinkedInstruction::RefBinding { value } => InstructionRecord::RefBinding { value: value.clone() },
            LinkedInstruction::TextBinding { parts, expr_ids } => InstructionRecord::TextBinding { parts: parts.clone(), expr_ids: expr_ids.clone() },
            LinkedInstruction::IteratorBinding { expr } => InstructionRecord::IteratorBinding { expr: *expr },
            LinkedInstruction::SetAttribute { name, value } => InstructionRecord::SetAttribute { name: name.clone(), value: value.clone() },
            LinkedInstruction::SetClassAttribute { value } => InstructionRecord::SetClassAttribute { value: value.clone() },
            LinkedInstruction::SetStyleAttribute { value } => InstructionRecord::SetStyleAttribute { value: value.clone() },
            LinkedInstruction::Controller { name, command, expr, paired_if, .. } => {
                // `def` is filled in separately from `PlanController::nested_template`
                // (plan order), since a linked `NodeId` isn't stable across flattening.
                InstructionRecord::HydrateTemplateController { res: name.clone(), command: command.clone(), expr: *expr, def: 0, paired_if: *paired_if }
            }
        }
    }
}

/// One template's emitted shape: per-target instruction rows plus its own
/// nested template definitions, in plan order.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TemplateDefinition {
    pub instructions: Vec<Vec<InstructionRecord>>,
    pub nested_templates: Vec<TemplateDefinition>,
}

/// The full emit contract (spec §4.7 "Emit"): a template's definition plus
/// its hoisted expression table, so a runtime loader never has to walk the
/// instruction tree to find an `Expr` by id.
#[derive(Debug, Clone, Serialize)]
pub struct EmitOutput {
    pub definition: TemplateDefinition,
    pub expressions: ExprTable,
}

/// Serialize a compiled `Plan` into the emit contract.
pub fn emit(plan: &Plan) -> EmitOutput {
    EmitOutput { definition: emit_definition(plan), expressions: plan.exprs.clone() }
}

fn emit_definition(plan: &Plan) -> TemplateDefinition {
    let nested_templates = plan.nested_templates.iter().map(emit_definition).collect();
    let mut instructions = Vec::new();
    collect_instructions(&plan.root, &mut instructions);
    TemplateDefinition { instructions, nested_templates }
}

/// Walk a planned tree collecting each allocated target's instruction row
/// into `instructions[target_index]`, in the same order `template::plan`
/// allocated them (spec §4.7 "Each template scope has its own target
/// counter... a node receives a targetIndex iff it has bindings, a custom
/// element, custom attributes, controllers, or a let element").
fn collect_instructions(node: &PlanNode, instructions: &mut Vec<Vec<InstructionRecord>>) {
    match node {
        PlanNode::Fragment { children } => {
            for child in children {
                collect_instructions(child, instructions);
            }
        }
        PlanNode::Comment => {}
        PlanNode::Text { target_index, parts, expr_ids } => {
            if let Some(index) = target_index {
                place(instructions, *index, InstructionRecord::TextBinding { parts: parts.clone(), expr_ids: expr_ids.clone() });
            }
        }
        PlanNode::Element(element) => {
            if let Some(index) = element.target_index {
                let mut row: Vec<InstructionRecord> = element.bindings.iter().map(InstructionRecord::from).collect();
                row.extend(element.custom_attrs.iter().map(InstructionRecord::from));
                if let Some(custom_element) = &element.custom_element {
                    row.push(InstructionRecord::HydrateElement { res: custom_element.clone(), containerless: element.containerless });
                }
                row.extend(element.controllers.iter().map(controller_record));
                ensure_row(instructions, index as usize);
                instructions[index as usize].extend(row);
            }
            for child in &element.children {
                collect_instructions(child, instructions);
            }
        }
    }
}

fn controller_record(controller: &PlanController) -> InstructionRecord {
    InstructionRecord::HydrateTemplateController {
        res: controller.name.clone(),
        command: controller.command.clone(),
        expr: controller.expr,
        def: controller.nested_template,
        paired_if: controller.paired_if,
    }
}

fn place(instructions: &mut Vec<Vec<InstructionRecord>>, index: u32, record: InstructionRecord) {
    ensure_row(instructions, index as usize);
    instructions[index as usize].push(record);
}

fn ensure_row(instructions: &mut Vec<Vec<InstructionRecord>>, index: usize) {
    if instructions.len() <= index {
        instructions.resize_with(index + 1, Vec::new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp_semantic_core::diagnostic::Diagnostics;
    use warp_semantic_core::registration::{ResourceCollections, ResourceGraph, ROOT_SCOPE_ID};
    use warp_semantic_core::template::attr_pattern::AttributePatternRegistry;
    use warp_semantic_core::template::bind::bind;
    use warp_semantic_core::template::link::link;
    use warp_semantic_core::template::lower::lower;
    use warp_semantic_core::template::plan::plan;
    use std::collections::HashMap as StdHashMap;

    fn empty_graph() -> ResourceGraph {
        let mut scopes = StdHashMap::new();
        scopes.insert(
            ROOT_SCOPE_ID.to_string(),
            warp_semantic_core::registration::ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections: ResourceCollections::default() },
        );
        ResourceGraph { scopes, orphans: vec![], unresolved: vec![] }
    }

    fn graph_with_containerless_element(tag: &str) -> ResourceGraph {
        use warp_semantic_core::resources::{ElementLike, ResourceDef};
        let mut elements = StdHashMap::new();
        elements.insert(
            tag.to_string(),
            ResourceDef::CustomElement(ElementLike {
                name: warp_semantic_core::source::Sourced::synthetic(tag.to_string()),
                class_name: "Widget".to_string(),
                file: warp_semantic_core::source::NormalizedPath::new("/p/widget.ts"),
                aliases: vec![],
                bindables: StdHashMap::new(),
                containerless: true,
                inline_template: None,
                dependencies: vec![],
            }),
        );
        let mut collections = ResourceCollections::default();
        collections.elements = elements;
        let mut scopes = StdHashMap::new();
        scopes.insert(ROOT_SCOPE_ID.to_string(), warp_semantic_core::registration::ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections });
        ResourceGraph { scopes, orphans: vec![], unresolved: vec![] }
    }

    fn planned(source: &str) -> Plan {
        planned_against(source, &empty_graph())
    }

    fn planned_against(source: &str, graph: &ResourceGraph) -> Plan {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(source, &registry);
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, graph, &mut diags);
        let _ = bind(&linked, &mut diags);
        plan(&linked, &mut diags)
    }

    #[test]
    fn text_interpolation_emits_one_target_with_a_text_binding() {
        let plan = planned("<div>${item}</div>");
        let output = emit(&plan);
        assert_eq!(output.definition.instructions.len(), 1);
        match &output.definition.instructions[0][0] {
            InstructionRecord::TextBinding { parts, expr_ids } => {
                assert_eq!(parts.len(), expr_ids.len() + 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(output.expressions.entries.len(), 1);
    }

    #[test]
    fn repeat_controller_emits_a_hydrate_template_controller_record_with_nested_def() {
        let plan = planned(r#"<div repeat.for="item of items">${item}</div>"#);
        let output = emit(&plan);
        assert_eq!(output.definition.nested_templates.len(), 1);
        match &output.definition.instructions[0][0] {
            InstructionRecord::HydrateTemplateController { command, def, .. } => {
                assert_eq!(*command, BindingCommand::For);
                assert_eq!(*def, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        let nested = &output.definition.nested_templates[0];
        assert_eq!(nested.instructions.len(), 1);
    }

    #[test]
    fn containerless_element_emits_hydrate_element_with_flag_set() {
        let graph = graph_with_containerless_element("my-widget");
        let plan = planned_against("<my-widget></my-widget>", &graph);
        let output = emit(&plan);
        assert_eq!(output.definition.instructions.len(), 1);
        match &output.definition.instructions[0][0] {
            InstructionRecord::HydrateElement { res, containerless } => {
                assert_eq!(res, "Widget");
                assert!(containerless);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn static_only_template_has_no_targets() {
        let plan = planned("hello");
        let output = emit(&plan);
        assert!(output.definition.instructions.is_empty());
    }
}
