// Typechecking (spec §4.7, "Typecheck (40)"): annotates each cataloged
// expression with an expected and an inferred type, producing
// `expectedByExpr`/`inferredByExpr`-equivalent maps keyed by `ExprId`.
//
// The spec describes this stage as delegating to "the host language's type
// engine via an overlay module" — out of reach here, since there is no host
// program to synthesize an ambient module against. What's implemented is
// the narrow slice that is locally decidable from the expression's own
// shape: literal inference, plus the one binding-command convention strict
// enough to flag with confidence — a `repeat.for` iterable that is
// syntactically a literal that can never be iterated.

use crate::diagnostic::{codes, Diagnostics};
use crate::expr::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use crate::source::ExprId;
use crate::template::attr_pattern::BindingCommand;
use crate::template::link::{LinkedInstruction, LinkedModule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A locally inferable type. Coarser than a real type system — this stage
/// has no symbol table to resolve member accesses or call signatures
/// against, so most expression shapes land on `Unknown` rather than a wrong
/// guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// No local evidence either way; never reported as a mismatch.
    Unknown,
    /// The binding site accepts any value (most property/attribute
    /// bindings, absent a host type engine to consult).
    Any,
    Boolean,
    Number,
    String,
    Null,
    Undefined,
    Array(Box<Type>),
    Object,
    /// `repeat.for`'s iterable position.
    Iterable,
}

/// `expectedByExpr`/`inferredByExpr` (spec §4.7), keyed by `ExprId.0`.
#[derive(Debug, Clone, Default)]
pub struct TypeJudgments {
    pub expected_by_expr: HashMap<u32, Type>,
    pub inferred_by_expr: HashMap<u32, Type>,
}

/// Typecheck every row in `module`, recursing into controller-synthesized
/// nested templates.
pub fn typecheck(module: &LinkedModule, diagnostics: &mut Diagnostics) -> TypeJudgments {
    let mut judgments = TypeJudgments::default();
    walk_module(module, &mut judgments, diagnostics);
    judgments
}

fn walk_module(module: &LinkedModule, judgments: &mut TypeJudgments, diagnostics: &mut Diagnostics) {
    for row in &module.rows {
        for instr in &row.instructions {
            walk_instruction(instr, module, judgments, diagnostics);
        }
    }
    for nested in module.nested_templates.values() {
        walk_module(nested, judgments, diagnostics);
    }
}

fn walk_instruction(instr: &LinkedInstruction, module: &LinkedModule, judgments: &mut TypeJudgments, diagnostics: &mut Diagnostics) {
    match instr {
        LinkedInstruction::Controller { name, command, expr, .. } => {
            if let Some(expr_id) = expr {
                if name == "repeat" || matches!(command, BindingCommand::For) {
                    judge(*expr_id, Type::Iterable, module, judgments, diagnostics);
                } else {
                    record_inferred_only(*expr_id, module, judgments);
                }
            }
        }
        LinkedInstruction::IteratorBinding { expr } => judge(*expr, Type::Iterable, module, judgments, diagnostics),
        LinkedInstruction::PropertyBinding { expr, .. }
        | LinkedInstruction::AttributeBinding { expr, .. }
        | LinkedInstruction::StylePropertyBinding { expr, .. }
        | LinkedInstruction::ListenerBinding { expr, .. } => record_inferred_only(*expr, module, judgments),
        LinkedInstruction::AttributeInterpolation { expr_ids, .. } | LinkedInstruction::TextBinding { expr_ids, .. } => {
            for expr_id in expr_ids {
                record_inferred_only(*expr_id, module, judgments);
            }
        }
        LinkedInstruction::RefBinding { .. }
        | LinkedInstruction::SetAttribute { .. }
        | LinkedInstruction::SetClassAttribute { .. }
        | LinkedInstruction::SetStyleAttribute { .. } => {}
    }
}

fn judge(expr_id: ExprId, expected: Type, module: &LinkedModule, judgments: &mut TypeJudgments, diagnostics: &mut Diagnostics) {
    let Some(entry) = module.exprs.get(expr_id) else { return };
    let inferred = infer_type(&entry.ast);
    if !is_compatible(&expected, &inferred) {
        diagnostics.add(crate::diagnostic::Diagnostic::from_code(
            &codes::E0801,
            entry.ast.span,
            format!("expected {expected:?}, found {inferred:?}"),
        ));
    }
    judgments.expected_by_expr.insert(expr_id.0, expected);
    judgments.inferred_by_expr.insert(expr_id.0, inferred);
}

fn record_inferred_only(expr_id: ExprId, module: &LinkedModule, judgments: &mut TypeJudgments) {
    let Some(entry) = module.exprs.get(expr_id) else { return };
    judgments.expected_by_expr.insert(expr_id.0, Type::Any);
    judgments.inferred_by_expr.insert(expr_id.0, infer_type(&entry.ast));
}

/// Infers a type from an expression's own shape, with no symbol table to
/// consult — member/call/scope accesses are always `Unknown`.
fn infer_type(expr: &Expr) -> Type {
    match &expr.kind {
        ExprKind::Literal(Literal::Null) => Type::Null,
        ExprKind::Literal(Literal::Undefined) => Type::Undefined,
        ExprKind::Literal(Literal::Bool(_)) => Type::Boolean,
        ExprKind::Literal(Literal::Number(_)) => Type::Number,
        ExprKind::Literal(Literal::String(_)) => Type::String,
        ExprKind::ArrayLiteral { .. } => Type::Array(Box::new(Type::Unknown)),
        ExprKind::ObjectLiteral { .. } => Type::Object,
        ExprKind::Template { .. } => Type::String,
        ExprKind::Unary { op: UnaryOp::Not, .. } => Type::Boolean,
        ExprKind::Unary { op: UnaryOp::TypeOf, .. } => Type::String,
        ExprKind::Unary { op: UnaryOp::Neg | UnaryOp::Pos, .. } => Type::Number,
        ExprKind::Unary { op: UnaryOp::Void, .. } => Type::Undefined,
        ExprKind::Binary { op: BinaryOp::Eq | BinaryOp::StrictEq | BinaryOp::Ne | BinaryOp::StrictNe | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::In | BinaryOp::Instanceof, .. } => Type::Boolean,
        ExprKind::Binary { op: BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod, .. } => Type::Number,
        ExprKind::Assign { value, .. } => infer_type(value),
        _ => Type::Unknown,
    }
}

/// `Unknown` on either side, or `Any` as the expected type, never conflicts.
/// Otherwise `Iterable` rejects only the literal shapes that can never be
/// iterated — strings are iterable in the host language, so they pass.
fn is_compatible(expected: &Type, inferred: &Type) -> bool {
    match (expected, inferred) {
        (Type::Any, _) | (_, Type::Unknown) | (Type::Unknown, _) => true,
        (Type::Iterable, Type::Number | Type::Boolean | Type::Null | Type::Undefined) => false,
        (Type::Iterable, _) => true,
        (a, b) => a == b,
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

    #[test]
    fn repeat_over_array_literal_has_no_mismatch() {
        let module = linked(r#"<div repeat.for="item of [1, 2, 3]">${item}</div>"#);
        let mut diags = Diagnostics::new();
        typecheck(&module, &mut diags);
        assert!(diags.is_empty());
    }

    #[test]
    fn repeat_over_number_literal_is_flagged() {
        let module = linked(r#"<div repeat.for="item of 3">${item}</div>"#);
        let mut diags = Diagnostics::new();
        typecheck(&module, &mut diags);
        assert!(diags.iter().any(|d| d.code.as_deref() == Some("E0801")));
    }

    #[test]
    fn repeat_over_scope_access_is_not_flagged() {
        let module = linked(r#"<div repeat.for="item of items">${item}</div>"#);
        let mut diags = Diagnostics::new();
        let judgments = typecheck(&module, &mut diags);
        assert!(diags.is_empty());
        assert!(judgments.expected_by_expr.values().any(|t| matches!(t, Type::Iterable)));
    }

    #[test]
    fn property_binding_records_inferred_literal_type() {
        let module = linked(r#"<input value.bind="42">"#);
        let mut diags = Diagnostics::new();
        let judgments = typecheck(&module, &mut diags);
        assert!(diags.is_empty());
        assert!(judgments.inferred_by_expr.values().any(|t| matches!(t, Type::Number)));
    }
}
