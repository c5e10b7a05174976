// The template DOM tree (spec §3.5): element, template, text, and comment
// nodes, each carrying a `NodeId` and span.
//
// Grounded on `ast::FaFile`'s tagged-node-with-span shape (kept as
// reference), re-expressed for markup instead of module declarations.

use crate::source::{NodeId, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub id: NodeId,
    pub span: Span,
    pub kind: DomNodeKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomNodeKind {
    Element { tag: String, attributes: Vec<RawAttribute>, children: Vec<DomNode>, self_closing: bool },
    /// A `<template>` tag, or a controller-synthesized nested-template
    /// placeholder (spec §4.6 "Synthesize hydrateTemplateController").
    Template { attributes: Vec<RawAttribute>, children: Vec<DomNode> },
    Text { value: String },
    Comment { value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAttribute {
    pub name: String,
    pub value: Option<String>,
    pub name_span: Span,
    pub value_span: Option<Span>,
}

/// HTML void elements: self-closing, never carry children (spec §4.6 parse
/// policy — not explicitly named but required to parse real markup without
/// a full HTML5 tree-construction algorithm).
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}
