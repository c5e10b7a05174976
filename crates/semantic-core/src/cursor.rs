// Cursor resolution: given an editor byte offset into an authored template,
// find the template entity it lands on — an expression (with the binding
// frame it resolves against), a controller marker, an element tag, or a
// plain attribute/text node. This is what `crates/lsp` builds hover and
// go-to-definition on.
//
// Grounded on the same DOM pre-order walk `template::plan::plan_node` uses
// to allocate target indices, generalized from "assign an index to every
// node" to "find the narrowest node whose span contains this offset".

use crate::source::{ExprId, FrameId, NodeId, Span};
use crate::template::bind::ScopeModule;
use crate::template::dom::{DomNode, DomNodeKind};
use crate::template::link::{LinkedInstruction, LinkedModule};

/// What the cursor landed on (spec editor features: hover / go-to-definition
/// resolve against one of these).
#[derive(Debug, Clone, PartialEq)]
pub enum CursorEntity {
    /// Inside a bound expression (a `${...}` interpolation, `.bind`
    /// attribute value, etc). `frame` is the binding frame the expression's
    /// top-level scope accesses resolve against.
    Expression { expr: ExprId, frame: Option<FrameId> },
    /// On a tag name, with the custom element it resolved to, if any.
    ElementTag { node: NodeId, custom_element: Option<String> },
    /// On a template-controller shorthand marker.
    Controller { node: NodeId, name: String },
    /// On static text content with no binding.
    Text { node: NodeId },
    /// Inside the template but not on any recognized entity (e.g.
    /// whitespace between attributes).
    None,
}

/// Resolve `offset` (a byte offset into the document `module` was lowered
/// from) to the template entity at that position.
pub fn resolve_cursor(module: &LinkedModule, scope: &ScopeModule, offset: u32) -> CursorEntity {
    let Some((node, parent)) = find_innermost_node(&module.root, offset, None) else {
        return CursorEntity::None;
    };

    if let Some(row) = module.rows.iter().find(|r| r.node == node.id) {
        for instr in &row.instructions {
            // A `TextBinding` is attributed to the owning element's row, not
            // the text node's own (spec §8 worked example #4), so the same
            // row can be reached with the cursor sitting on the element's
            // tag/attributes rather than inside the interpolation itself —
            // only resolve it here when `offset` actually falls within one
            // of its own expressions.
            if let LinkedInstruction::TextBinding { expr_ids, .. } = instr {
                match text_binding_expr_for_offset(expr_ids, module, offset) {
                    Some(expr_id) => return expr_entity(expr_id, module, scope).unwrap_or(CursorEntity::None),
                    None => continue,
                }
            }
            if let Some(entity) = entity_for_instruction(instr, node.id, module, scope) {
                return entity;
            }
        }
    }

    // A text node carrying an interpolation owns no row of its own; its
    // `TextBinding` lives on the nearest enclosing element's row.
    if matches!(node.kind, DomNodeKind::Text { .. }) {
        if let Some(parent) = parent {
            if let Some(row) = module.rows.iter().find(|r| r.node == parent) {
                for instr in &row.instructions {
                    if let LinkedInstruction::TextBinding { expr_ids, .. } = instr {
                        if let Some(expr_id) = text_binding_expr_for_offset(expr_ids, module, offset) {
                            return expr_entity(expr_id, module, scope).unwrap_or(CursorEntity::Text { node: node.id });
                        }
                    }
                }
            }
        }
    }

    match &node.kind {
        DomNodeKind::Element { .. } => CursorEntity::ElementTag { node: node.id, custom_element: module.elements.get(&node.id.0).map(|r| r.class_name.clone()) },
        DomNodeKind::Text { .. } => CursorEntity::Text { node: node.id },
        _ => CursorEntity::None,
    }
}

/// The `expr_ids` entry (if any) of a bubbled-up `TextBinding` whose own
/// expression span actually contains `offset` — distinguishes a cursor
/// truly inside `${...}` from one elsewhere on the row's owning element.
fn text_binding_expr_for_offset(expr_ids: &[ExprId], module: &LinkedModule, offset: u32) -> Option<ExprId> {
    expr_ids.iter().copied().find(|&id| module.exprs.get(id).map(|e| span_contains(e.ast.span, offset)).unwrap_or(false))
}

/// Descend the DOM tree to the deepest node whose span still contains
/// `offset`; a node's own span is assumed to cover its children's spans
/// (true for the tree `template::dom` builds, which never reorders text
/// relative to source order). Also returns the immediate parent's `NodeId`,
/// since a text node's own binding (if any) is recorded on its parent's row.
fn find_innermost_node(node: &DomNode, offset: u32, parent: Option<NodeId>) -> Option<(&DomNode, Option<NodeId>)> {
    if !span_contains(node.span, offset) {
        return None;
    }
    let children: &[DomNode] = match &node.kind {
        DomNodeKind::Element { children, .. } | DomNodeKind::Template { children, .. } => children,
        _ => &[],
    };
    for child in children {
        if let Some(found) = find_innermost_node(child, offset, Some(node.id)) {
            return Some(found);
        }
    }
    Some((node, parent))
}

fn span_contains(span: Span, offset: u32) -> bool {
    offset >= span.start && offset <= span.end
}

fn entity_for_instruction(instr: &LinkedInstruction, node: NodeId, module: &LinkedModule, scope: &ScopeModule) -> Option<CursorEntity> {
    let expr = match instr {
        LinkedInstruction::PropertyBinding { expr, .. }
        | LinkedInstruction::AttributeBinding { expr, .. }
        | LinkedInstruction::StylePropertyBinding { expr, .. }
        | LinkedInstruction::ListenerBinding { expr, .. }
        | LinkedInstruction::IteratorBinding { expr } => Some(*expr),
        LinkedInstruction::AttributeInterpolation { expr_ids, .. } | LinkedInstruction::TextBinding { expr_ids, .. } => expr_ids.first().copied(),
        LinkedInstruction::Controller { name, expr, .. } => {
            return Some(expr.and_then(|e| expr_entity(e, module, scope)).unwrap_or(CursorEntity::Controller { node, name: name.clone() }));
        }
        LinkedInstruction::RefBinding { .. } | LinkedInstruction::SetAttribute { .. } | LinkedInstruction::SetClassAttribute { .. } | LinkedInstruction::SetStyleAttribute { .. } => None,
    };
    expr.and_then(|e| expr_entity(e, module, scope))
}

fn expr_entity(expr_id: ExprId, module: &LinkedModule, scope: &ScopeModule) -> Option<CursorEntity> {
    module.exprs.get(expr_id)?;
    let frame = scope.expr_to_frame.get(&expr_id.0).copied();
    Some(CursorEntity::Expression { expr: expr_id, frame })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Diagnostics;
    use crate::registration::{ResourceCollections, ResourceGraph, ROOT_SCOPE_ID};
    use crate::template::attr_pattern::AttributePatternRegistry;
    use crate::template::bind::bind;
    use crate::template::link::link;
    use crate::template::lower::lower;
    use std::collections::HashMap as StdHashMap;

    fn empty_graph() -> ResourceGraph {
        let mut scopes = StdHashMap::new();
        scopes.insert(
            ROOT_SCOPE_ID.to_string(),
            crate::registration::ResourceScope { id: ROOT_SCOPE_ID.to_string(), parent: None, label: "root".into(), collections: ResourceCollections::default() },
        );
        ResourceGraph { scopes, orphans: vec![], unresolved: vec![] }
    }

    fn bound(source: &str) -> (LinkedModule, ScopeModule) {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(source, &registry);
        let graph = empty_graph();
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        let scope = bind(&linked, &mut diags);
        (linked, scope)
    }

    #[test]
    fn cursor_inside_interpolation_resolves_to_an_expression() {
        let source = r#"<div>${item}</div>"#;
        let (module, scope) = bound(source);
        let offset = source.find("item").unwrap() as u32;
        match resolve_cursor(&module, &scope, offset) {
            CursorEntity::Expression { frame, .. } => assert_eq!(frame, Some(FrameId(0))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cursor_on_plain_text_resolves_to_text() {
        let source = r#"<div>hello</div>"#;
        let (module, scope) = bound(source);
        let offset = source.find("hello").unwrap() as u32;
        assert!(matches!(resolve_cursor(&module, &scope, offset), CursorEntity::Text { .. }));
    }

    #[test]
    fn cursor_past_document_end_resolves_to_none() {
        let source = r#"<div>hi</div>"#;
        let (module, scope) = bound(source);
        assert_eq!(resolve_cursor(&module, &scope, 9999), CursorEntity::None);
    }
}
