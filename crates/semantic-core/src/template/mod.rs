// Template compilation pipeline (spec §3.5–§3.6, §4.6–§4.7): lowering raw
// markup into a DOM tree and expression table, linking instructions against
// a resource/scope graph, allocating binding scopes, annotating expression
// types, and planning the nested instruction tree an emitter consumes.

pub mod attr_pattern;
pub mod bind;
pub mod dom;
pub mod link;
pub mod lower;
pub mod plan;
pub mod typecheck;

pub use attr_pattern::{AttributeClassification, AttributePatternRegistry, BindingCommand};
pub use bind::{bind, Frame, FrameKind, ScopeModule};
pub use dom::{DomNode, DomNodeKind, RawAttribute};
pub use link::{link, LinkedInstruction, LinkedModule, LinkedRow, ResolvedBindable};
pub use lower::{lower, ExprTable, ExprTableEntry, IrModule, IrRow, RawInstruction};
pub use plan::{plan, Plan, PlanController, PlanNode};
pub use typecheck::{typecheck, Type, TypeJudgments};
