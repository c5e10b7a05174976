// Scope binding (spec §4.7, "Bind (30)"): allocates a root frame for a
// template plus one child "overlay" frame per scope-changing controller
// (`repeat`, `with`, `promise`), and resolves every `AccessScope`/
// `AccessThis` expression node to the frame its `$parent.*` hop chain lands
// on.
//
// Grounded on the arena + parent-index shape of `semantic::scope::ScopeGraph`
// (kept as reference), generalized from named declaration scopes to
// unnamed lexical binding frames indexed by `FrameId`.
//
// One `ScopeModule` covers a whole document, nested templates included: a
// controller-synthesized nested template is not a separate binding universe,
// since `$parent` inside a `repeat`'s content must still be able to walk out
// to the template that owns the `repeat`. Only overlay controllers push a
// new frame; every other controller's content runs in the frame it already
// had.

use crate::diagnostic::{codes, Diagnostics};
use crate::expr::{Expr, ExprKind};
use crate::source::{ExprId, FrameId, NodeId};
use crate::template::dom::{DomNode, DomNodeKind};
use crate::template::link::{LinkedInstruction, LinkedModule};
use crate::template::lower::ExprTable;
use std::collections::HashMap;

/// Controllers that introduce a new binding scope (spec §4.7 Bind). Every
/// other controller (`if`, `else`, `switch`, `case`, ...) runs its content
/// against the enclosing frame unchanged.
const OVERLAY_CONTROLLERS: &[&str] = &["repeat", "with", "promise"];

/// The contextual locals `repeat` exposes on its overlay frame regardless of
/// the declaration pattern (spec §4.7 "override-context entries").
const REPEAT_CONTEXTUALS: &[&str] = &["$index", "$first", "$last", "$even", "$odd", "$length", "$middle"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Root,
    Overlay,
}

/// One lexical binding frame (spec §3.5 "Scope module"). `origin` is the
/// controller-marker `NodeId` that introduced an overlay frame, `None` for
/// the document's own root frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    pub parent: Option<FrameId>,
    pub kind: FrameKind,
    pub origin: Option<NodeId>,
    pub symbols: Vec<String>,
}

/// Identifies one `AccessScope`/`AccessThis` node: the expression it lives
/// in plus its pre-order position in that expression's own tree (sub-nodes
/// below the top-level `Expr` have no id of their own).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessKey {
    pub expr: ExprId,
    pub node_index: u32,
}

/// Frame table, expression ownership, and resolved-access map spanning an
/// entire document, including every controller-synthesized nested template
/// (spec §3.5).
#[derive(Debug, Clone, Default)]
pub struct ScopeModule {
    pub frames: Vec<Frame>,
    pub expr_to_frame: HashMap<u32, FrameId>,
    pub resolved: HashMap<AccessKey, FrameId>,
    /// The frame a controller's nested template runs its own content in —
    /// the overlay frame for `repeat`/`with`/`promise`, otherwise the same
    /// frame the controller itself was linked against. Keyed by the nested
    /// template's `NodeId`, matching `LinkedModule::nested_templates`.
    pub template_frame: HashMap<u32, FrameId>,
}

impl ScopeModule {
    pub fn root_frame(&self) -> FrameId {
        self.frames[0].id
    }

    fn push_frame(&mut self, parent: FrameId, origin: NodeId, symbols: Vec<String>) -> FrameId {
        let id = FrameId(self.frames.len() as u32);
        self.frames.push(Frame { id, parent: Some(parent), kind: FrameKind::Overlay, origin: Some(origin), symbols });
        id
    }

    fn parent_of(&self, frame: FrameId) -> Option<FrameId> {
        self.frames[frame.index()].parent
    }
}

/// Bind every frame in `module`, recursing into its controller-synthesized
/// nested templates, into one document-spanning `ScopeModule`.
pub fn bind(module: &LinkedModule, diagnostics: &mut Diagnostics) -> ScopeModule {
    let mut scope = ScopeModule::default();
    let root = FrameId(0);
    scope.frames.push(Frame { id: root, parent: None, kind: FrameKind::Root, origin: None, symbols: Vec::new() });
    bind_node(&module.root, module, root, &mut scope, diagnostics);
    scope
}

fn bind_node(node: &DomNode, module: &LinkedModule, frame: FrameId, scope: &mut ScopeModule, diagnostics: &mut Diagnostics) {
    if let Some(row) = module.rows.iter().find(|r| r.node == node.id) {
        for instr in &row.instructions {
            bind_instruction(instr, node.id, module, frame, scope, diagnostics);
        }
    }

    match &node.kind {
        DomNodeKind::Element { children, .. } | DomNodeKind::Template { children, .. } => {
            for child in children {
                bind_node(child, module, frame, scope, diagnostics);
            }
        }
        _ => {}
    }
}

fn bind_instruction(instr: &LinkedInstruction, node: NodeId, module: &LinkedModule, frame: FrameId, scope: &mut ScopeModule, diagnostics: &mut Diagnostics) {
    match instr {
        LinkedInstruction::PropertyBinding { expr, .. }
        | LinkedInstruction::AttributeBinding { expr, .. }
        | LinkedInstruction::StylePropertyBinding { expr, .. }
        | LinkedInstruction::ListenerBinding { expr, .. }
        | LinkedInstruction::IteratorBinding { expr } => bind_expr(*expr, frame, &module.exprs, scope, diagnostics),
        LinkedInstruction::AttributeInterpolation { expr_ids, .. } | LinkedInstruction::TextBinding { expr_ids, .. } => {
            for expr in expr_ids {
                bind_expr(*expr, frame, &module.exprs, scope, diagnostics);
            }
        }
        LinkedInstruction::Controller { name, expr, nested_template, .. } => {
            if let Some(expr) = expr {
                bind_expr(*expr, frame, &module.exprs, scope, diagnostics);
            }
            let Some(nested_module) = module.nested_templates.get(&nested_template.0) else { return };

            let content_frame = if OVERLAY_CONTROLLERS.contains(&name.as_str()) {
                let mut symbols = expr.and_then(|id| module.exprs.get(id)).map(|entry| iterator_locals(&entry.ast)).unwrap_or_default();
                if name == "repeat" {
                    symbols.extend(REPEAT_CONTEXTUALS.iter().map(|s| s.to_string()));
                }
                scope.push_frame(frame, node, symbols)
            } else {
                frame
            };
            scope.template_frame.insert(nested_template.0, content_frame);
            bind_node(&nested_module.root, nested_module, content_frame, scope, diagnostics);
        }
        LinkedInstruction::RefBinding { .. }
        | LinkedInstruction::SetAttribute { .. }
        | LinkedInstruction::SetClassAttribute { .. }
        | LinkedInstruction::SetStyleAttribute { .. } => {}
    }
}

/// Names bound by a `repeat.for` declaration pattern (plain identifier or
/// array/object destructuring), exposed as symbols on the repeat's overlay
/// frame.
fn iterator_locals(expr: &Expr) -> Vec<String> {
    let ExprKind::ForOf { declaration, .. } = &expr.kind else {
        return Vec::new();
    };
    declaration_names(declaration.as_ref())
}

fn declaration_names(expr: &Expr) -> Vec<String> {
    match &expr.kind {
        ExprKind::AccessScope { name, .. } => vec![name.clone()],
        ExprKind::ArrayDestructuring { targets } => targets.iter().flat_map(declaration_names).collect(),
        ExprKind::ObjectDestructuring { bindings } => bindings.iter().map(|(name, _)| name.clone()).collect(),
        _ => Vec::new(),
    }
}

fn bind_expr(expr_id: ExprId, frame: FrameId, exprs: &ExprTable, scope: &mut ScopeModule, diagnostics: &mut Diagnostics) {
    scope.expr_to_frame.insert(expr_id.0, frame);
    let Some(entry) = exprs.get(expr_id) else { return };
    let mut counter = 0u32;
    resolve_accesses(&entry.ast, expr_id, frame, scope, &mut counter, diagnostics);
}

/// Walks one expression's AST in pre-order, resolving every `AccessScope`/
/// `AccessThis` node's `$parent` ancestor count to a `FrameId`.
fn resolve_accesses(expr: &Expr, owner: ExprId, frame: FrameId, scope: &mut ScopeModule, counter: &mut u32, diagnostics: &mut Diagnostics) {
    let node_index = *counter;
    *counter += 1;

    let ancestor = match &expr.kind {
        ExprKind::AccessThis { ancestor } | ExprKind::AccessScope { ancestor, .. } => Some(*ancestor),
        _ => None,
    };
    if let Some(ancestor) = ancestor {
        let mut current = Some(frame);
        for _ in 0..ancestor {
            current = current.and_then(|f| scope.parent_of(f));
        }
        match current {
            Some(resolved) => {
                scope.resolved.insert(AccessKey { expr: owner, node_index }, resolved);
            }
            None => diagnostics.add(crate::diagnostic::Diagnostic::from_code(
                &codes::E0701,
                expr.span,
                "`$parent` chain walks past the outermost frame".to_string(),
            )),
        }
    }

    for child in expr_children(expr) {
        resolve_accesses(child, owner, frame, scope, counter, diagnostics);
    }
}

fn expr_children(expr: &Expr) -> Vec<&Expr> {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::AccessThis { .. } | ExprKind::AccessScope { .. } => vec![],
        ExprKind::AccessMember { base, .. } => vec![base.as_ref()],
        ExprKind::AccessKeyed { base, key } => vec![base.as_ref(), key.as_ref()],
        ExprKind::CallScope { args, .. } => args.iter().collect(),
        ExprKind::CallMember { base, args, .. } => std::iter::once(base.as_ref()).chain(args.iter()).collect(),
        ExprKind::CallFunction { base, args } => std::iter::once(base.as_ref()).chain(args.iter()).collect(),
        ExprKind::Unary { operand, .. } => vec![operand.as_ref()],
        ExprKind::Binary { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        ExprKind::Conditional { condition, yes, no } => vec![condition.as_ref(), yes.as_ref(), no.as_ref()],
        ExprKind::Assign { target, value } => vec![target.as_ref(), value.as_ref()],
        ExprKind::ArrayLiteral { elements } => elements.iter().collect(),
        ExprKind::ObjectLiteral { values, .. } => values.iter().collect(),
        ExprKind::Template { expressions, .. } => expressions.iter().collect(),
        ExprKind::ValueConverter { expression, args, .. } => std::iter::once(expression.as_ref()).chain(args.iter()).collect(),
        ExprKind::BindingBehavior { expression, args, .. } => std::iter::once(expression.as_ref()).chain(args.iter()).collect(),
        ExprKind::ArrayDestructuring { targets } => targets.iter().collect(),
        ExprKind::ObjectDestructuring { bindings } => bindings.iter().map(|(_, e)| e).collect(),
        ExprKind::ForOf { declaration, iterable } => vec![declaration.as_ref(), iterable.as_ref()],
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

    fn bound(source: &str) -> (ScopeModule, Diagnostics) {
        let registry = AttributePatternRegistry::new();
        let (ir, _) = lower(source, &registry);
        let graph = empty_graph();
        let mut diags = Diagnostics::new();
        let linked = link(ir, ROOT_SCOPE_ID, &graph, &mut diags);
        let scope = bind(&linked, &mut diags);
        (scope, diags)
    }

    #[test]
    fn repeat_introduces_overlay_frame_with_iterator_and_contextual_locals() {
        let (scope, _) = bound(r#"<div repeat.for="item of items">${item}</div>"#);
        assert_eq!(scope.frames.len(), 2);
        let overlay = &scope.frames[1];
        assert_eq!(overlay.kind, FrameKind::Overlay);
        assert_eq!(overlay.parent, Some(FrameId(0)));
        assert!(overlay.symbols.contains(&"item".to_string()));
        assert!(overlay.symbols.contains(&"$index".to_string()));
        assert_eq!(*scope.template_frame.values().next().unwrap(), overlay.id);
    }

    #[test]
    fn if_controller_does_not_introduce_a_frame() {
        let (scope, _) = bound(r#"<div if.bind="show">hi</div>"#);
        assert_eq!(scope.frames.len(), 1);
        assert_eq!(*scope.template_frame.values().next().unwrap(), FrameId(0));
    }

    #[test]
    fn parent_access_inside_repeat_resolves_to_enclosing_root() {
        let (scope, diags) = bound(r#"<div repeat.for="item of items">${$parent.title}</div>"#);
        assert!(diags.is_empty());
        assert!(scope.resolved.values().any(|frame| *frame == FrameId(0)));
    }

    #[test]
    fn excess_parent_hops_emit_unresolved_scope_identifier() {
        let (_, diags) = bound(r#"<div repeat.for="item of items">${$parent.$parent.title}</div>"#);
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("E0701")));
    }

    #[test]
    fn nested_repeat_chains_two_overlay_frames() {
        let (scope, diags) = bound(r#"<div repeat.for="row of rows"><span repeat.for="cell of row">${cell}</span></div>"#);
        assert!(diags.is_empty());
        assert_eq!(scope.frames.len(), 3);
        assert_eq!(scope.frames[1].parent, Some(FrameId(0)));
        assert_eq!(scope.frames[2].parent, Some(FrameId(1)));
    }
}
