// Template lowering (spec §4.6, "10-lower"): raw template text -> DOM tree
// + expression table + per-row raw instruction list.
//
// The HTML tokenizer below is hand-written in the same recursive-descent,
// error-recovering style as `expr::lexer`/`expr::parser`, scoped to the
// markup subset templates actually use (tags, attributes, text, comments) —
// not a general HTML5 tree-construction algorithm.

use crate::diagnostic::{codes, Diagnostics};
use crate::expr::{self, Expr, ExpressionType};
use crate::source::{ExprId, NodeId, Span};
use crate::template::attr_pattern::{AttributeClassification, AttributePatternRegistry, BindingCommand};
use crate::template::dom::{is_void_element, DomNode, DomNodeKind, RawAttribute};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;

/// One resolved expression plus the shape it was parsed as (spec §3.5
/// ExprTable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExprTableEntry {
    pub id: ExprId,
    pub ast: Expr,
    pub expression_type: ExpressionType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExprTable {
    pub entries: HashMap<u32, ExprTableEntry>,
}

impl ExprTable {
    fn insert(&mut self, expr: Expr, expression_type: ExpressionType) -> ExprId {
        let id = expr.id;
        self.entries.insert(id.0, ExprTableEntry { id, ast: expr, expression_type });
        id
    }

    pub fn get(&self, id: ExprId) -> Option<&ExprTableEntry> {
        self.entries.get(&id.0)
    }
}

/// One binding-shaped attribute or text node, not yet resolved against a
/// resource catalog (that is `link`'s job). Carries the same tag vocabulary
/// as `LinkedInstruction` (spec §3.6) minus the parts only link can fill in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawInstruction {
    PropertyBinding { target: String, command: BindingCommand, expr: ExprId },
    AttributeBinding { name: String, expr: ExprId },
    AttributeInterpolation { name: String, parts: Vec<String>, expr_ids: Vec<ExprId> },
    StylePropertyBinding { property: String, expr: ExprId },
    ListenerBinding { event: String, expr: ExprId, capture: bool },
    RefBinding { value: String },
    TextBinding { parts: Vec<String>, expr_ids: Vec<ExprId> },
    IteratorBinding { expr: ExprId },
    SetAttribute { name: String, value: String },
    SetClassAttribute { value: String },
    SetStyleAttribute { value: String },
    /// A controller shorthand attribute (`if.bind`, `repeat.for`, ...). The
    /// nested template it owns is lowered separately and referenced by id.
    ControllerShorthand { name: String, command: BindingCommand, expr: Option<ExprId>, nested_template: NodeId },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IrRow {
    pub node: NodeId,
    pub instructions: Vec<RawInstruction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IrModule {
    pub root: DomNode,
    pub exprs: ExprTable,
    pub rows: Vec<IrRow>,
    /// Nested templates synthesized for controller shorthands, keyed by the
    /// `NodeId` the owning `ControllerShorthand` instruction references.
    pub nested_templates: HashMap<u32, IrModule>,
}

const BINDING_COMMAND_SUFFIXES: &[&str] =
    &["bind", "one-time", "to-view", "from-view", "two-way", "trigger", "capture", "for", "ref"];

/// True if `name` carries a recognized binding-command suffix (spec §4.6
/// "never include binding attributes ... in static attrs").
pub fn is_binding_attribute_name(name: &str) -> bool {
    match name.rsplit_once('.') {
        Some((_, suffix)) => BINDING_COMMAND_SUFFIXES.contains(&suffix),
        None => false,
    }
}

pub fn lower(source: &str, registry: &AttributePatternRegistry) -> (IrModule, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut tokenizer = Tokenizer::new(source);
    let children = tokenizer.parse_children(None, &mut diagnostics);
    let mut node_id = Cell::new(0u32);
    let expr_id = Cell::new(0u32);
    let mut exprs = ExprTable::default();
    let mut rows = Vec::new();
    let mut nested_templates = HashMap::new();

    let root = DomNode {
        id: next_node_id(&mut node_id),
        span: Span::new(0, source.len() as u32),
        kind: DomNodeKind::Template { attributes: vec![], children },
    };

    let (root, _pending) = lower_node(root, &mut node_id, &expr_id, &mut exprs, &mut rows, &mut nested_templates, registry, &mut diagnostics);

    (IrModule { root, exprs, rows, nested_templates }, diagnostics)
}

fn next_node_id(counter: &mut Cell<u32>) -> NodeId {
    let id = counter.get();
    counter.set(id + 1);
    NodeId(id)
}

/// Recursively reassigns stable `NodeId`s in DOM pre-order and, for
/// `Element`/`Template` nodes, classifies their attributes into an `IrRow`.
///
/// Returns the lowered node plus any instructions a *text* child could not
/// target on its own (spec §8 worked example #4: a `${…}` interpolation's
/// `TextBinding` is attributed to the owning element's row, not a separate
/// target on the text node itself) — every non-text arm folds its children's
/// returned instructions into its own row and always returns an empty vec of
/// its own, since by then they have already been absorbed.
#[allow(clippy::too_many_arguments)]
fn lower_node(
    node: DomNode,
    node_id: &mut Cell<u32>,
    expr_id: &Cell<u32>,
    exprs: &mut ExprTable,
    rows: &mut Vec<IrRow>,
    nested_templates: &mut HashMap<u32, IrModule>,
    registry: &AttributePatternRegistry,
    diagnostics: &mut Diagnostics,
) -> (DomNode, Vec<RawInstruction>) {
    match node.kind {
        DomNodeKind::Element { tag, attributes, children, self_closing } => {
            let mut instructions = Vec::new();
            let mut static_attrs = Vec::new();
            let mut controller_spans: Vec<(RawAttribute, String, BindingCommand)> = Vec::new();

            for attr in attributes {
                match registry.classify(&attr.name, attr.value.as_deref()) {
                    AttributeClassification::BindingCommand { target, command } => {
                        if registry.is_controller(&target) {
                            controller_spans.push((attr, target, command));
                            continue;
                        }
                        push_binding_instruction(&target, &command, &attr, expr_id, exprs, &mut instructions, diagnostics);
                    }
                    AttributeClassification::Interpolation => {
                        let value = attr.value.clone().unwrap_or_default();
                        let (expr, diags) = expr::parse_interpolation(&value, attr.value_span.map(|s| s.start).unwrap_or(attr.name_span.start), expr_id);
                        diagnostics.merge(diags);
                        if let Some(Expr { id, kind: crate::expr::ExprKind::Template { parts, expressions }, .. }) = expr {
                            exprs.entries.extend(
                                expressions
                                    .iter()
                                    .cloned()
                                    .map(|e| (e.id.0, ExprTableEntry { id: e.id, ast: e, expression_type: ExpressionType::IsProperty })),
                            );
                            let expr_ids = expressions.iter().map(|e| e.id).collect();
                            let _ = id;
                            instructions.push(RawInstruction::AttributeInterpolation { name: attr.name.clone(), parts, expr_ids });
                        }
                    }
                    AttributeClassification::Static => {
                        static_attrs.push(attr);
                    }
                }
            }

            for attr in &static_attrs {
                let value = attr.value.clone().unwrap_or_default();
                match attr.name.as_str() {
                    "class" => instructions.push(RawInstruction::SetClassAttribute { value }),
                    "style" => instructions.push(RawInstruction::SetStyleAttribute { value }),
                    _ => instructions.push(RawInstruction::SetAttribute { name: attr.name.clone(), value }),
                }
            }

            // Controller shorthand reparenting (spec §4.7): an element with
            // one or more controller attributes has its children lowered
            // into a *fresh* nested scope (not the enclosing template's),
            // since the element itself moves into a synthesized nested
            // template; only the controller marker(s) target its original
            // position in the parent template.
            if !controller_spans.is_empty() {
                let mut inner_exprs = ExprTable::default();
                let mut inner_rows = Vec::new();
                let mut inner_nested = HashMap::new();
                let mut lowered_children = Vec::with_capacity(children.len());
                for c in children {
                    let (lowered, pending) = lower_node(c, node_id, expr_id, &mut inner_exprs, &mut inner_rows, &mut inner_nested, registry, diagnostics);
                    instructions.extend(pending);
                    lowered_children.push(lowered);
                }
                let this_id = next_node_id(node_id);
                if !instructions.is_empty() {
                    inner_rows.push(IrRow { node: this_id, instructions });
                }
                let inner_element = DomNode {
                    id: this_id,
                    span: node.span,
                    kind: DomNodeKind::Element { tag, attributes: static_attrs, children: lowered_children, self_closing },
                };

                let marker = wrap_controller_chain(
                    controller_spans,
                    inner_element,
                    inner_exprs,
                    inner_rows,
                    inner_nested,
                    this_id,
                    node_id,
                    expr_id,
                    exprs,
                    rows,
                    nested_templates,
                    registry,
                    diagnostics,
                );
                return (marker, Vec::new());
            }

            let mut lowered_children = Vec::with_capacity(children.len());
            for c in children {
                let (lowered, pending) = lower_node(c, node_id, expr_id, exprs, rows, nested_templates, registry, diagnostics);
                instructions.extend(pending);
                lowered_children.push(lowered);
            }

            let this_id = next_node_id(node_id);

            if !instructions.is_empty() {
                rows.push(IrRow { node: this_id, instructions });
            }

            (DomNode { id: this_id, span: node.span, kind: DomNodeKind::Element { tag, attributes: static_attrs, children: lowered_children, self_closing } }, Vec::new())
        }
        DomNodeKind::Template { attributes, children } => {
            let mut instructions = Vec::new();
            let mut lowered_children = Vec::with_capacity(children.len());
            for c in children {
                let (lowered, pending) = lower_node(c, node_id, expr_id, exprs, rows, nested_templates, registry, diagnostics);
                instructions.extend(pending);
                lowered_children.push(lowered);
            }
            let this_id = next_node_id(node_id);
            if !instructions.is_empty() {
                rows.push(IrRow { node: this_id, instructions });
            }
            (DomNode { id: this_id, span: node.span, kind: DomNodeKind::Template { attributes, children: lowered_children } }, Vec::new())
        }
        DomNodeKind::Text { value } => {
            let this_id = next_node_id(node_id);
            let mut pending = Vec::new();
            if value.contains("${") {
                let (expr, diags) = expr::parse_interpolation(&value, node.span.start, expr_id);
                diagnostics.merge(diags);
                if let Some(Expr { kind: crate::expr::ExprKind::Template { parts, expressions }, .. }) = expr {
                    exprs.entries.extend(
                        expressions
                            .iter()
                            .cloned()
                            .map(|e| (e.id.0, ExprTableEntry { id: e.id, ast: e, expression_type: ExpressionType::IsInterpolation })),
                    );
                    let expr_ids = expressions.iter().map(|e| e.id).collect();
                    pending.push(RawInstruction::TextBinding { parts, expr_ids });
                }
            }
            (DomNode { id: this_id, span: node.span, kind: DomNodeKind::Text { value } }, pending)
        }
        DomNodeKind::Comment { value } => {
            let this_id = next_node_id(node_id);
            (DomNode { id: this_id, span: node.span, kind: DomNodeKind::Comment { value } }, Vec::new())
        }
    }
}

/// Wraps `content` in one synthesized nested template per controller
/// shorthand found on one element, innermost first, so that multiple
/// controllers on a single element chain rather than collide (spec §4.7,
/// worked example #4: `repeat.for` + `if.bind` on one element nests `if`
/// inside `repeat`'s own template, rather than dropping one of them as the
/// single-controller version of this function used to).
///
/// `spans` is in authoring order (`spans[0]` is outermost). Every
/// controller but the outermost gets a synthesized marker `NodeId`; the
/// outermost reuses `this_id`, the position the real element occupied in
/// its parent, and its row/expr land in the caller's own `rows`/`exprs` —
/// the same template scope the element used to target directly.
#[allow(clippy::too_many_arguments)]
fn wrap_controller_chain(
    spans: Vec<(RawAttribute, String, BindingCommand)>,
    content: DomNode,
    content_exprs: ExprTable,
    content_rows: Vec<IrRow>,
    content_nested: HashMap<u32, IrModule>,
    this_id: NodeId,
    node_id: &mut Cell<u32>,
    expr_id: &Cell<u32>,
    outer_exprs: &mut ExprTable,
    outer_rows: &mut Vec<IrRow>,
    outer_nested: &mut HashMap<u32, IrModule>,
    registry: &AttributePatternRegistry,
    diagnostics: &mut Diagnostics,
) -> DomNode {
    let span = content.span;
    let mut cur_content = content;
    let mut cur_exprs = content_exprs;
    let mut cur_rows = content_rows;
    let mut cur_nested = content_nested;

    for (i, (attr, target, command)) in spans.into_iter().enumerate().rev() {
        let nested_root = DomNode { id: next_node_id(node_id), span, kind: DomNodeKind::Template { attributes: vec![], children: vec![cur_content] } };
        let nested_id = next_node_id(node_id);
        let nested_ir = IrModule { root: nested_root, exprs: cur_exprs, rows: cur_rows, nested_templates: cur_nested };

        let value = attr.value.clone().unwrap_or_default();
        let is_outermost = i == 0;
        let marker_id = if is_outermost { this_id } else { next_node_id(node_id) };
        let expr = match command {
            BindingCommand::For => {
                let (e, diags) = expr::parse_for_of(&value, attr.value_span.map(|s| s.start).unwrap_or(0), expr_id);
                diagnostics.merge(diags);
                e
            }
            _ if value.is_empty() => None,
            _ => {
                let (e, diags) = expr::parse_expression(&value, attr.value_span.map(|s| s.start).unwrap_or(0), expr_id);
                diagnostics.merge(diags);
                e
            }
        };
        let expr_type = if matches!(command, BindingCommand::For) { ExpressionType::IsForOf } else { ExpressionType::IsProperty };

        if is_outermost {
            let expr_id_opt = expr.map(|e| outer_exprs.insert(e, expr_type));
            outer_nested.insert(nested_id.0, nested_ir);
            outer_rows.push(IrRow {
                node: marker_id,
                instructions: vec![RawInstruction::ControllerShorthand { name: target, command, expr: expr_id_opt, nested_template: nested_id }],
            });
            return DomNode { id: marker_id, span, kind: DomNodeKind::Comment { value: format!("controller:{}", nested_id.0) } };
        }

        let mut level_exprs = ExprTable::default();
        let expr_id_opt = expr.map(|e| level_exprs.insert(e, expr_type));
        let mut level_nested = HashMap::new();
        level_nested.insert(nested_id.0, nested_ir);
        let level_rows = vec![IrRow {
            node: marker_id,
            instructions: vec![RawInstruction::ControllerShorthand { name: target, command, expr: expr_id_opt, nested_template: nested_id }],
        }];

        cur_content = DomNode { id: marker_id, span, kind: DomNodeKind::Comment { value: format!("controller:{}", nested_id.0) } };
        cur_exprs = level_exprs;
        cur_rows = level_rows;
        cur_nested = level_nested;
    }

    unreachable!("spans is non-empty; the i == 0 iteration always returns")
}

fn push_binding_instruction(
    target: &str,
    command: &BindingCommand,
    attr: &RawAttribute,
    expr_id: &Cell<u32>,
    exprs: &mut ExprTable,
    instructions: &mut Vec<RawInstruction>,
    diagnostics: &mut Diagnostics,
) {
    let value = attr.value.clone().unwrap_or_default();
    let base = attr.value_span.map(|s| s.start).unwrap_or(attr.name_span.start);

    match command {
        BindingCommand::Ref => {
            instructions.push(RawInstruction::RefBinding { value });
        }
        BindingCommand::For => {
            let (expr, diags) = expr::parse_for_of(&value, base, expr_id);
            diagnostics.merge(diags);
            if let Some(expr) = expr {
                let id = exprs.insert(expr, ExpressionType::IsForOf);
                instructions.push(RawInstruction::IteratorBinding { expr: id });
            }
        }
        BindingCommand::Trigger | BindingCommand::Capture => {
            let (expr, diags) = expr::parse_expression(&value, base, expr_id);
            diagnostics.merge(diags);
            if let Some(expr) = expr {
                let id = exprs.insert(expr, ExpressionType::IsFunction);
                instructions.push(RawInstruction::ListenerBinding { event: target.to_string(), expr: id, capture: matches!(command, BindingCommand::Capture) });
            }
        }
        _ => {
            let (expr, diags) = expr::parse_expression(&value, base, expr_id);
            diagnostics.merge(diags);
            if let Some(expr) = expr {
                let id = exprs.insert(expr, ExpressionType::IsProperty);
                if let Some(style_prop) = target.strip_prefix("style.") {
                    instructions.push(RawInstruction::StylePropertyBinding { property: style_prop.to_string(), expr: id });
                } else if target.contains('.') && target.split('.').next() == Some("attr") {
                    instructions.push(RawInstruction::AttributeBinding { name: target.trim_start_matches("attr.").to_string(), expr: id });
                } else {
                    instructions.push(RawInstruction::PropertyBinding { target: target.to_string(), command: command.clone(), expr: id });
                }
            }
        }
    }
}

/// Minimal recursive-descent HTML tokenizer, scoped to template markup.
struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn parse_children(&mut self, closing_tag: Option<&str>, diagnostics: &mut Diagnostics) -> Vec<DomNode> {
        let mut out = Vec::new();
        loop {
            if self.pos >= self.source.len() {
                break;
            }
            if let Some(tag) = closing_tag {
                if self.rest().starts_with(&format!("</{tag}")) {
                    break;
                }
            }
            if self.rest().starts_with("<!--") {
                out.push(self.parse_comment());
                continue;
            }
            if self.rest().starts_with("</") {
                // Unexpected close tag with no matching open; stop here and
                // let the caller (or top level) absorb it as a parse error.
                if closing_tag.is_none() {
                    diagnostics.add(crate::diagnostic::Diagnostic::from_code(
                        &codes::E0101,
                        Span::point(self.pos as u32),
                        "unexpected closing tag".to_string(),
                    ));
                    self.skip_tag();
                    continue;
                }
                break;
            }
            if self.rest().starts_with('<') {
                out.push(self.parse_element(diagnostics));
                continue;
            }
            out.push(self.parse_text());
        }
        out
    }

    fn skip_tag(&mut self) {
        if let Some(end) = self.rest().find('>') {
            self.pos += end + 1;
        } else {
            self.pos = self.source.len();
        }
    }

    fn parse_comment(&mut self) -> DomNode {
        let start = self.pos;
        self.pos += 4;
        let end = self.rest().find("-->").map(|i| self.pos + i).unwrap_or(self.source.len());
        let value = self.source[self.pos..end].to_string();
        self.pos = (end + 3).min(self.source.len());
        DomNode { id: NodeId(0), span: Span::new(start as u32, self.pos as u32), kind: DomNodeKind::Comment { value } }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        let end = self.rest().find('<').map(|i| self.pos + i).unwrap_or(self.source.len());
        let value = self.source[start..end].to_string();
        self.pos = end;
        DomNode { id: NodeId(0), span: Span::new(start as u32, end as u32), kind: DomNodeKind::Text { value } }
    }

    fn parse_element(&mut self, diagnostics: &mut Diagnostics) -> DomNode {
        let start = self.pos;
        self.pos += 1; // consume '<'
        let tag = self.take_name();
        let attributes = self.parse_attributes();
        self.skip_ws();
        let self_closing = self.rest().starts_with("/>");
        if self_closing {
            self.pos += 2;
        } else if self.rest().starts_with('>') {
            self.pos += 1;
        }

        let is_void = is_void_element(&tag);
        let children = if self_closing || is_void {
            Vec::new()
        } else {
            let kids = self.parse_children(Some(&tag), diagnostics);
            if self.rest().starts_with(&format!("</{tag}")) {
                self.skip_tag();
            }
            kids
        };

        let end = self.pos;
        let kind = if tag.eq_ignore_ascii_case("template") {
            DomNodeKind::Template { attributes, children }
        } else {
            DomNodeKind::Element { tag, attributes, children, self_closing: self_closing || is_void }
        };
        DomNode { id: NodeId(0), span: Span::new(start as u32, end as u32), kind }
    }

    fn take_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.source[self.pos..].chars().next() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        self.source[start..self.pos].to_string()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.source[self.pos..].chars().next() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn parse_attributes(&mut self) -> Vec<RawAttribute> {
        let mut out = Vec::new();
        loop {
            self.skip_ws();
            if self.rest().starts_with('>') || self.rest().starts_with("/>") || self.pos >= self.source.len() {
                break;
            }
            let name_start = self.pos;
            let name = self.take_attr_name();
            if name.is_empty() {
                break;
            }
            let name_span = Span::new(name_start as u32, self.pos as u32);
            self.skip_ws();
            if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_ws();
                let (value, value_span) = self.take_attr_value();
                out.push(RawAttribute { name, value: Some(value), name_span, value_span: Some(value_span) });
            } else {
                out.push(RawAttribute { name, value: None, name_span, value_span: None });
            }
        }
        out
    }

    fn take_attr_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.source[self.pos..].chars().next() {
            if c.is_whitespace() || c == '=' || c == '>' || c == '/' {
                break;
            }
            self.pos += c.len_utf8();
        }
        self.source[start..self.pos].to_string()
    }

    fn take_attr_value(&mut self) -> (String, Span) {
        if let Some(quote) = self.rest().chars().next().filter(|c| *c == '"' || *c == '\'') {
            self.pos += 1;
            let start = self.pos;
            let end = self.rest().find(quote).map(|i| self.pos + i).unwrap_or(self.source.len());
            let value = self.source[start..end].to_string();
            self.pos = (end + 1).min(self.source.len());
            (value, Span::new(start as u32, end as u32))
        } else {
            let start = self.pos;
            let end = self.rest().find(|c: char| c.is_whitespace() || c == '>').map(|i| self.pos + i).unwrap_or(self.source.len());
            let value = self.source[start..end].to_string();
            self.pos = end;
            (value, Span::new(start as u32, end as u32))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowers_plain_element_with_static_attribute() {
        let registry = AttributePatternRegistry::new();
        let (ir, diags) = lower(r#"<div class="container"></div>"#, &registry);
        assert!(diags.is_empty());
        match &ir.root.kind {
            DomNodeKind::Template { children, .. } => {
                assert_eq!(children.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lowers_property_binding_attribute() {
        let registry = AttributePatternRegistry::new();
        let (ir, diags) = lower(r#"<input value.bind="name">"#, &registry);
        assert!(diags.is_empty());
        assert_eq!(ir.rows.len(), 1);
        assert!(matches!(ir.rows[0].instructions[0], RawInstruction::PropertyBinding { .. }));
    }

    #[test]
    fn static_attribute_is_never_a_binding_attribute() {
        assert!(!is_binding_attribute_name("class"));
        assert!(is_binding_attribute_name("value.bind"));
        assert!(is_binding_attribute_name("repeat.for"));
    }

    #[test]
    fn lowers_text_interpolation() {
        let registry = AttributePatternRegistry::new();
        let (ir, diags) = lower(r#"<p>Hello ${name}!</p>"#, &registry);
        assert!(diags.is_empty());
        assert_eq!(ir.rows.len(), 1);
        match &ir.rows[0].instructions[0] {
            RawInstruction::TextBinding { parts, expr_ids } => {
                assert_eq!(parts.len(), expr_ids.len() + 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lowers_if_controller_shorthand_into_nested_template() {
        let registry = AttributePatternRegistry::new();
        let (ir, diags) = lower(r#"<div if.bind="show">hi</div>"#, &registry);
        assert!(diags.is_empty());
        let controller_row = ir.rows.iter().find(|r| matches!(r.instructions[0], RawInstruction::ControllerShorthand { .. }));
        assert!(controller_row.is_some());
        assert_eq!(ir.nested_templates.len(), 1);
    }

    #[test]
    fn multiple_controllers_on_one_element_nest_outermost_first() {
        let registry = AttributePatternRegistry::new();
        let (ir, diags) = lower(r#"<div repeat.for="item of items" if.bind="item.visible">${item.name}</div>"#, &registry);
        assert!(diags.is_empty());

        assert_eq!(ir.nested_templates.len(), 1);
        let outer_row = ir.rows.iter().find(|r| matches!(r.instructions[0], RawInstruction::ControllerShorthand { .. })).unwrap();
        let outer = match &outer_row.instructions[0] {
            RawInstruction::ControllerShorthand { command, nested_template, .. } => {
                assert_eq!(*command, BindingCommand::For);
                *nested_template
            }
            other => panic!("unexpected {other:?}"),
        };

        let repeat_template = ir.nested_templates.get(&outer.0).expect("repeat's nested template");
        assert_eq!(repeat_template.nested_templates.len(), 1);
        let inner_row = repeat_template
            .rows
            .iter()
            .find(|r| matches!(r.instructions[0], RawInstruction::ControllerShorthand { .. }))
            .expect("if row nested inside repeat's template");
        match &inner_row.instructions[0] {
            RawInstruction::ControllerShorthand { command, .. } => assert_eq!(*command, BindingCommand::Bind),
            other => panic!("unexpected {other:?}"),
        }

        // The element's own bindings (the text interpolation) must not leak
        // into either controller level's row for the marker node itself —
        // they belong to the innermost synthesized template that holds the
        // real element.
        assert!(ir.rows.iter().all(|r| !matches!(r.instructions[0], RawInstruction::TextBinding { .. })));
    }
}
