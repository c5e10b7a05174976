// Source location and span tracking
//
// This module provides types for tracking source locations and spans,
// enabling precise error reporting with source context, plus the stable
// identity newtypes every other module indexes by.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A canonical forward-slash absolute path, used as a key for every
/// file-scoped map. Two paths that denote the same file always normalize
/// to the same `NormalizedPath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NormalizedPath(String);

impl NormalizedPath {
    /// Normalize an arbitrary path into forward-slash, `.`/`..`-free form.
    ///
    /// Does not touch the filesystem: this is a lexical canonicalization,
    /// not a symlink-resolving one (the host is responsible for the latter
    /// before handing paths to the core).
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut parts: Vec<&str> = Vec::new();
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        for component in raw.split('/') {
            match component {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        let mut normalized = String::from("/");
        normalized.push_str(&parts.join("/"));
        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    pub fn file_stem(&self) -> Option<&str> {
        self.0.rsplit('/').next()?.split('.').next()
    }

    /// Sibling path with the given extension swapped in, used by the
    /// sibling-file convention recognizer (e.g. `foo.ts` -> `foo.html`).
    pub fn with_extension(&self, ext: &str) -> Self {
        let stem = match self.0.rfind('.') {
            Some(idx) if self.0[idx + 1..].chars().all(|c| c.is_alphanumeric()) => &self.0[..idx],
            _ => &self.0,
        };
        Self(format!("{stem}.{ext}"))
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document URI, as handed back to editor-facing hosts. Distinct from
/// `NormalizedPath` because the LSP/editor world speaks `file://` URIs while
/// the rest of the core speaks plain paths; one `SourceFileId` has exactly
/// one of each.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentUri(String);

impl DocumentUri {
    pub fn from_path(path: &NormalizedPath) -> Self {
        Self(format!("file://{}", path.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! arena_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_id!(SourceFileId, "Stable identifier for one source file within a session.");
arena_id!(ExprId, "Stable identifier for one parsed expression within a template.");
arena_id!(NodeId, "Stable identifier for one DOM/IR node within a template.");
arena_id!(FrameId, "Stable identifier for one scope-binding frame within a template.");

/// A span representing a range of bytes in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: u32,
    /// End byte offset (exclusive)
    pub end: u32,
}

impl Span {
    /// Create a new span
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a span of length zero at a position (for insertion points)
    pub fn point(pos: u32) -> Self {
        Self { start: pos, end: pos }
    }

    /// Create a span covering two spans (from start of first to end of second)
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Check if this span is empty (zero length)
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Get the length of the span in bytes
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Extract the text this span covers from source
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start as usize..self.end as usize]
    }

    /// Check if this span is the default (0..0)
    /// Used for serde skip_serializing_if
    pub fn is_default(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

impl Default for Span {
    fn default() -> Self {
        Self { start: 0, end: 0 }
    }
}

/// A value with an associated source span
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

/// Line and column information for human-readable error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCol {
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column number (in characters, not bytes)
    pub col: u32,
}

/// Index for converting byte offsets to line/column positions
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<u32>,
}

impl LineIndex {
    /// Build a line index from source text
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self { line_starts }
    }

    /// Convert a byte offset to line/column
    pub fn line_col(&self, offset: u32) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        LineCol {
            line: (line + 1) as u32,
            col: (offset - line_start + 1),
        }
    }

    /// Get the byte offset of a line start (0-indexed line number)
    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.line_starts.get(line).copied()
    }

    /// Get the byte offset of a line end (0-indexed line number)
    pub fn line_end(&self, line: usize, source: &str) -> Option<u32> {
        if line + 1 < self.line_starts.len() {
            // Not the last line - end is start of next line minus newline
            Some(self.line_starts[line + 1] - 1)
        } else if line < self.line_starts.len() {
            // Last line - end is end of source
            Some(source.len() as u32)
        } else {
            None
        }
    }

    /// Get the text of a specific line (0-indexed)
    pub fn line_text<'a>(&self, line: usize, source: &'a str) -> Option<&'a str> {
        let start = self.line_start(line)? as usize;
        let end = self.line_end(line, source)? as usize;
        Some(&source[start..end])
    }

    /// Get the number of lines
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// A `Span` plus the file it was taken from; `file` is `None` for spans
/// synthesized by the core itself (e.g. a default bindable name) rather
/// than copied from source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub span: Span,
    pub file: Option<SourceFileId>,
}

impl SourceSpan {
    pub fn new(span: Span, file: SourceFileId) -> Self {
        Self { span, file: Some(file) }
    }

    pub fn synthetic() -> Self {
        Self { span: Span::default(), file: None }
    }
}

/// A canonicalized value paired with the span and AST node it was derived
/// from. Every text field on a `ResourceDef` is carried as `Sourced<T>` so
/// provenance survives convergence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub origin: SourceSpan,
    pub origin_node: Option<NodeId>,
}

impl<T> Sourced<T> {
    pub fn new(value: T, origin: SourceSpan) -> Self {
        Self { value, origin, origin_node: None }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.origin_node = Some(node);
        self
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Sourced<U> {
        Sourced {
            value: f(self.value),
            origin: self.origin,
            origin_node: self.origin_node,
        }
    }

    pub fn synthetic(value: T) -> Self {
        Self { value, origin: SourceSpan::synthetic(), origin_node: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_path_collapses_dot_segments() {
        assert_eq!(
            NormalizedPath::new("/project/./src/../src/foo.ts").as_str(),
            "/project/src/foo.ts"
        );
    }

    #[test]
    fn test_normalized_path_with_extension() {
        let ts = NormalizedPath::new("/p/src/foo-bar.ts");
        assert_eq!(ts.with_extension("html").as_str(), "/p/src/foo-bar.html");
    }

    #[test]
    fn test_span_merge() {
        let a = Span::new(10, 20);
        let b = Span::new(15, 30);
        let merged = a.merge(b);
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
    }

    #[test]
    fn test_line_index() {
        let source = "line 1\nline 2\nline 3";
        let index = LineIndex::new(source);

        assert_eq!(index.line_col(0), LineCol { line: 1, col: 1 });
        assert_eq!(index.line_col(5), LineCol { line: 1, col: 6 });
        assert_eq!(index.line_col(7), LineCol { line: 2, col: 1 });
        assert_eq!(index.line_col(14), LineCol { line: 3, col: 1 });
    }

    #[test]
    fn test_line_text() {
        let source = "line 1\nline 2\nline 3";
        let index = LineIndex::new(source);

        assert_eq!(index.line_text(0, source), Some("line 1"));
        assert_eq!(index.line_text(1, source), Some("line 2"));
        assert_eq!(index.line_text(2, source), Some("line 3"));
    }
}
