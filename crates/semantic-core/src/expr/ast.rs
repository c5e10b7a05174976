// Binding-expression AST.
//
// This is the expression language that appears inside template attributes
// and interpolations (`item.name`, `x.bind="value | currency:2 & debounce"`),
// distinct from the host program's own expression language. Modeled as a
// tagged union dispatched by exhaustive match, the same shape used
// throughout this crate for resource definitions, IR instructions, and plan
// nodes.

use crate::source::{ExprId, Span};
use serde::{Deserialize, Serialize};

/// One parsed binding expression plus its id and span, as stored in a
/// template's expression table (§3.5 ExprTable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub id: ExprId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    /// Literal primitive: number, string, boolean, null/undefined.
    Literal(Literal),
    /// `$parent`, `$parent.$parent`, ... — ancestor scope access. `ancestor`
    /// counts how many `$parent` hops precede this node.
    AccessThis { ancestor: u32 },
    /// Plain identifier reference, resolved against the frame chain at bind
    /// time (§4.7 Bind). `ancestor` is nonzero for `$parent.name`.
    AccessScope { name: String, ancestor: u32 },
    /// `base.member`
    AccessMember { base: Box<Expr>, member: String, optional: bool },
    /// `base[key]`
    AccessKeyed { base: Box<Expr>, key: Box<Expr> },
    /// `name(args)` resolved against scope, e.g. an event-handler method call.
    CallScope { name: String, args: Vec<Expr>, ancestor: u32 },
    /// `base.member(args)`
    CallMember { base: Box<Expr>, member: String, args: Vec<Expr>, optional: bool },
    /// `base(args)` where base is itself an expression (rare but legal).
    CallFunction { base: Box<Expr>, args: Vec<Expr> },
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Conditional { condition: Box<Expr>, yes: Box<Expr>, no: Box<Expr> },
    Assign { target: Box<Expr>, value: Box<Expr> },
    ArrayLiteral { elements: Vec<Expr> },
    ObjectLiteral { keys: Vec<String>, values: Vec<Expr> },
    /// Tagged/untagged template literal: `parts.len() == expressions.len() + 1`.
    Template { parts: Vec<String>, expressions: Vec<Expr> },
    /// `expr | name:arg1:arg2`
    ValueConverter { expression: Box<Expr>, name: String, args: Vec<Expr> },
    /// `expr & name:arg1:arg2`
    BindingBehavior { expression: Box<Expr>, name: String, args: Vec<Expr> },
    /// Destructuring declaration in a `repeat.for` (`{ id, name }` or `[a, b]`).
    ArrayDestructuring { targets: Vec<Expr> },
    ObjectDestructuring { bindings: Vec<(String, Expr)> },
    /// `item of items` / `(item, index) of items`
    ForOf { declaration: Box<Expr>, iterable: Box<Expr> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Null,
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    TypeOf,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
    Instanceof,
}

/// The shape a template expression takes, used to decide which kind of
/// instruction it feeds (§3.5). Determined once at lower time and carried
/// alongside the parsed AST rather than re-derived later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionType {
    IsProperty,
    IsFunction,
    IsIterator,
    IsChain,
    IsInterpolation,
    IsForOf,
}

impl Expr {
    pub fn new(id: ExprId, span: Span, kind: ExprKind) -> Self {
        Self { id, span, kind }
    }

    /// True for `expr & behaviorName`, i.e. this node (or an ancestor
    /// value-converter wrapper) carries at least one binding behavior.
    pub fn has_binding_behavior(&self) -> bool {
        matches!(self.kind, ExprKind::BindingBehavior { .. })
    }
}
