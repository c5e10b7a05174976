// The provenance index (spec §3.7): a queryable record of which generated
// artifact a piece of authored source produced, and vice versa. Every stage
// from recognition through emission hands a `ProvenanceEdge` to this index
// rather than discarding the link once its own output is built, so a host
// can answer "what template row did this decorator option produce?" or
// "what source produced this diagnostic's span?" after the fact.
//
// Grounded on the same from/to edge-list shape `registration::RegistrationEvidence`
// uses to link a site to a resource, generalized from a single evidence
// kind to an open set of edge kinds tagged by `EdgeKind`, and indexed both
// ways the way `exports::ExportBindingMap` indexes re-export chains by
// `OriginKey` for O(1) lookup in either direction.

use crate::source::{NormalizedPath, NodeId, SourceFileId, Span};
use std::collections::HashMap;

/// What kind of generation link a `ProvenanceEdge` records (spec §3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// A decorator/static-shape/convention recognizer produced a
    /// `ResourceDef` from a class declaration.
    RecognizedResource,
    /// Definition convergence merged several candidates into one resource.
    ConvergedDefinition,
    /// Registration evidence placed a resource into a scope.
    RegisteredInScope,
    /// Template lowering produced an IR row from a DOM node.
    LoweredInstruction,
    /// Linking resolved an instruction against the resource graph.
    LinkedInstruction,
    /// Planning allocated a hydration target for a node.
    PlannedTarget,
    /// Emission serialized a plan node into an instruction record.
    EmittedInstruction,
}

/// One endpoint of a `ProvenanceEdge`: a file plus an optional node/span
/// within it. `node` is `None` for file-level links (e.g. "this whole file
/// produced this `ResourceDef`").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeEndpoint {
    pub file: NormalizedPath,
    pub node: Option<NodeId>,
    pub span: Span,
}

impl EdgeEndpoint {
    pub fn new(file: NormalizedPath, span: Span) -> Self {
        Self { file, node: None, span }
    }

    pub fn at_node(file: NormalizedPath, node: NodeId, span: Span) -> Self {
        Self { file, node: Some(node), span }
    }
}

#[derive(Debug, Clone)]
pub struct ProvenanceEdge {
    pub kind: EdgeKind,
    pub from: EdgeEndpoint,
    pub to: EdgeEndpoint,
    /// A short, stable label for the generated artifact (e.g. a resource
    /// key, an instruction's target index as a string) used to disambiguate
    /// when several edges share the same `to` span.
    pub label: String,
}

/// The provenance index: every edge, keyed both by its source and its
/// generated artifact, so either direction resolves without a scan.
#[derive(Debug, Clone, Default)]
pub struct ProvenanceIndex {
    edges: Vec<ProvenanceEdge>,
    by_from_file: HashMap<NormalizedPath, Vec<usize>>,
    by_to_file: HashMap<NormalizedPath, Vec<usize>>,
}

impl ProvenanceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, edge: ProvenanceEdge) {
        let index = self.edges.len();
        self.by_from_file.entry(edge.from.file.clone()).or_default().push(index);
        self.by_to_file.entry(edge.to.file.clone()).or_default().push(index);
        self.edges.push(edge);
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// All edges whose generated artifact lives in `file`, narrowed to the
    /// one(s) covering `offset`. Several edges can cover the same offset
    /// (e.g. a planned target produced by both `LoweredInstruction` and
    /// `LinkedInstruction`); callers get all of them, ranked with the
    /// narrowest span first so the most specific edge sorts to the front.
    pub fn find_by_generated(&self, file: &NormalizedPath, offset: u32) -> Vec<&ProvenanceEdge> {
        let mut hits: Vec<&ProvenanceEdge> = self
            .by_to_file
            .get(file)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
            .filter(|e| span_contains(e.to.span, offset))
            .collect();
        hits.sort_by_key(|e| e.to.span.len());
        hits
    }

    /// All edges whose authored source lives in `file`, narrowed to the
    /// one(s) covering `offset` (spec §3.7 `find_by_source` — "given an
    /// editor cursor in authored source, which generated artifacts trace
    /// back to it").
    pub fn find_by_source(&self, file: &NormalizedPath, offset: u32) -> Vec<&ProvenanceEdge> {
        let mut hits: Vec<&ProvenanceEdge> = self
            .by_from_file
            .get(file)
            .into_iter()
            .flatten()
            .map(|&i| &self.edges[i])
            .filter(|e| span_contains(e.from.span, offset))
            .collect();
        hits.sort_by_key(|e| e.from.span.len());
        hits
    }

    /// Project a generated span back through one edge to the authored span
    /// that produced it, following `from` edges transitively (e.g. a
    /// planned target traces to a linked instruction which traces to a
    /// lowered row which traces to the authored attribute).
    pub fn project_generated_span(&self, file: &NormalizedPath, offset: u32) -> Option<(NormalizedPath, Span)> {
        let mut current_file = file.clone();
        let mut current_offset = offset;
        let mut last = None;
        loop {
            let hit = self.find_by_generated(&current_file, current_offset).into_iter().next()?;
            last = Some((hit.from.file.clone(), hit.from.span));
            if hit.from.file == current_file && hit.from.span.start == current_offset {
                // No further generation chain to walk; this *is* the source.
                return last;
            }
            current_file = hit.from.file.clone();
            current_offset = hit.from.span.start;
        }
    }
}

fn span_contains(span: Span, offset: u32) -> bool {
    offset >= span.start && offset <= span.end
}

/// The `SourceFileId` a provenance edge's endpoint resolves from, when the
/// caller only has the numeric id and needs the path back (kept for callers
/// that index by id rather than path, e.g. the incremental graph).
pub fn endpoint_file_id(endpoint: &EdgeEndpoint, resolve: impl Fn(&NormalizedPath) -> Option<SourceFileId>) -> Option<SourceFileId> {
    resolve(&endpoint.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceFileId;

    fn file(name: &str) -> NormalizedPath {
        NormalizedPath::new(format!("/p/{name}"))
    }

    #[test]
    fn records_and_finds_edge_by_generated_offset() {
        let mut index = ProvenanceIndex::new();
        index.record(ProvenanceEdge {
            kind: EdgeKind::LoweredInstruction,
            from: EdgeEndpoint::new(file("foo.html"), Span::new(10, 20)),
            to: EdgeEndpoint::new(file("foo.plan.json"), Span::new(0, 5)),
            label: "row-0".to_string(),
        });

        let hits = index.find_by_generated(&file("foo.plan.json"), 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "row-0");

        let none = index.find_by_generated(&file("foo.plan.json"), 100);
        assert!(none.is_empty());
    }

    #[test]
    fn finds_edges_by_source_offset() {
        let mut index = ProvenanceIndex::new();
        index.record(ProvenanceEdge {
            kind: EdgeKind::RecognizedResource,
            from: EdgeEndpoint::new(file("foo-bar.ts"), Span::new(0, 40)),
            to: EdgeEndpoint::new(file("foo-bar.ts"), Span::new(0, 40)),
            label: "foo-bar".to_string(),
        });
        let hits = index.find_by_source(&file("foo-bar.ts"), 5);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn projects_through_a_chain_of_edges() {
        let mut index = ProvenanceIndex::new();
        index.record(ProvenanceEdge {
            kind: EdgeKind::LoweredInstruction,
            from: EdgeEndpoint::new(file("foo.html"), Span::new(10, 15)),
            to: EdgeEndpoint::new(file("foo.html"), Span::new(10, 15)),
            label: "row-0".to_string(),
        });
        let projected = index.project_generated_span(&file("foo.html"), 12);
        assert_eq!(projected, Some((file("foo.html"), Span::new(10, 15))));

        let _ = endpoint_file_id(&EdgeEndpoint::new(file("foo.html"), Span::new(0, 1)), |_| Some(SourceFileId(0)));
    }
}
