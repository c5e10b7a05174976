// The gap taxonomy (spec §7): a typed record of why analysis could not
// prove a fact. Gaps are carried on results, never thrown; every component
// returns `{ value, gaps }` (or an equivalent writer, see `eval::Evaluated`)
// and callers merge them into diagnostics at the stage boundary.

use crate::diagnostic::{codes, Diagnostic};
use crate::source::{NormalizedPath, SourceSpan};
use serde::{Deserialize, Serialize};

/// One typed gap, carrying a location and enough context to build a
/// diagnostic and a user-facing suggestion (spec §7 "User-visible behavior").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub kind: GapKind,
    pub what: String,
    pub why: String,
    pub where_: Option<SourceSpan>,
    pub suggestion: Option<String>,
}

impl Gap {
    pub fn new(kind: GapKind, what: impl Into<String>, why: impl Into<String>) -> Self {
        Self {
            kind,
            what: what.into(),
            why: why.into(),
            where_: None,
            suggestion: None,
        }
    }

    pub fn at(mut self, span: SourceSpan) -> Self {
        self.where_ = Some(span);
        self
    }

    pub fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Whether this gap belongs to the "conservative" set that downgrades
    /// catalog confidence outright (spec §7 Policy).
    pub fn is_conservative(&self) -> bool {
        matches!(
            self.kind,
            GapKind::PackageNotFound
                | GapKind::InvalidPackageJson
                | GapKind::MissingPackageField
                | GapKind::EntryPointNotFound
                | GapKind::NoEntryPoints
                | GapKind::ComplexExports
                | GapKind::WorkspaceNoSourceDir
                | GapKind::WorkspaceEntryNotFound
                | GapKind::NoSource
                | GapKind::MinifiedCode
                | GapKind::UnsupportedFormat
                | GapKind::ParseError
        )
    }

    pub fn is_analysis_failed(&self) -> bool {
        matches!(self.kind, GapKind::AnalysisFailed)
    }

    /// Render this gap as a diagnostic for the stage it logically belongs to.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.where_.map(|s| s.span).unwrap_or_default();
        let code = self.kind.error_code();
        let mut diag = Diagnostic::from_code(code, span, format!("{}: {}", self.what, self.why));
        if let Some(suggestion) = &self.suggestion {
            diag = diag.with_help(suggestion.clone());
        }
        diag
    }
}

/// The gap kinds named in spec §7's table, grouped by the stage that
/// produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    // Package scan
    PackageNotFound,
    InvalidPackageJson,
    MissingPackageField,
    EntryPointNotFound,
    NoEntryPoints,
    ComplexExports,
    // Monorepo resolution
    WorkspaceNoSourceDir,
    WorkspaceEntryNotFound,
    // Import resolution
    UnresolvedImport,
    CircularImport,
    ExternalPackage,
    // Partial evaluation limits
    DynamicValue,
    FunctionReturn,
    ComputedProperty,
    SpreadUnknown,
    ConditionalRegistration,
    LoopVariable,
    // Recognition
    LegacyDecorators,
    InvalidResourceName,
    // Source availability
    NoSource,
    MinifiedCode,
    UnsupportedFormat,
    ParseError,
    // Cache / internal
    CacheCorrupt,
    AnalysisFailed,
}

impl GapKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapKind::PackageNotFound => "package-not-found",
            GapKind::InvalidPackageJson => "invalid-package-json",
            GapKind::MissingPackageField => "missing-package-field",
            GapKind::EntryPointNotFound => "entry-point-not-found",
            GapKind::NoEntryPoints => "no-entry-points",
            GapKind::ComplexExports => "complex-exports",
            GapKind::WorkspaceNoSourceDir => "workspace-no-source-dir",
            GapKind::WorkspaceEntryNotFound => "workspace-entry-not-found",
            GapKind::UnresolvedImport => "unresolved-import",
            GapKind::CircularImport => "circular-import",
            GapKind::ExternalPackage => "external-package",
            GapKind::DynamicValue => "dynamic-value",
            GapKind::FunctionReturn => "function-return",
            GapKind::ComputedProperty => "computed-property",
            GapKind::SpreadUnknown => "spread-unknown",
            GapKind::ConditionalRegistration => "conditional-registration",
            GapKind::LoopVariable => "loop-variable",
            GapKind::LegacyDecorators => "legacy-decorators",
            GapKind::InvalidResourceName => "invalid-resource-name",
            GapKind::NoSource => "no-source",
            GapKind::MinifiedCode => "minified-code",
            GapKind::UnsupportedFormat => "unsupported-format",
            GapKind::ParseError => "parse-error",
            GapKind::CacheCorrupt => "cache-corrupt",
            GapKind::AnalysisFailed => "analysis-failed",
        }
    }

    fn error_code(&self) -> &'static crate::diagnostic::ErrorCode {
        match self {
            GapKind::UnresolvedImport => &codes::E0201,
            GapKind::CircularImport => &codes::E0202,
            GapKind::ExternalPackage => &codes::E0203,
            GapKind::AnalysisFailed => &codes::E0204,
            GapKind::LegacyDecorators => &codes::E0301,
            GapKind::InvalidResourceName => &codes::E0302,
            GapKind::PackageNotFound => &codes::E1001,
            GapKind::InvalidPackageJson => &codes::E1002,
            GapKind::NoEntryPoints => &codes::E1003,
            GapKind::CacheCorrupt => &codes::E1004,
            // The remaining kinds share the nearest matching stage code;
            // they still carry a distinct `kind` for programmatic filtering.
            GapKind::MissingPackageField
            | GapKind::EntryPointNotFound
            | GapKind::ComplexExports
            | GapKind::WorkspaceNoSourceDir
            | GapKind::WorkspaceEntryNotFound => &codes::E1001,
            GapKind::DynamicValue
            | GapKind::FunctionReturn
            | GapKind::ComputedProperty
            | GapKind::SpreadUnknown
            | GapKind::ConditionalRegistration
            | GapKind::LoopVariable => &codes::E0204,
            GapKind::NoSource | GapKind::MinifiedCode | GapKind::UnsupportedFormat | GapKind::ParseError => {
                &codes::E0101
            }
        }
    }
}

/// Confidence level assigned to a catalog/package result once its gaps are
/// folded in (spec §7 Policy, §6.3 `Result.confidence`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Manual,
    Low,
    Partial,
    Conservative,
    High,
    Exact,
}

/// Fold a set of gaps into a confidence level per spec §7: any
/// `analysis-failed` gap forces `manual`; any conservative-set gap
/// downgrades to `conservative`; any other gap yields `partial`; no gaps
/// means the caller's own (higher) confidence stands.
pub fn downgrade_confidence(base: Confidence, gaps: &[Gap]) -> Confidence {
    if gaps.iter().any(Gap::is_analysis_failed) {
        return Confidence::Manual;
    }
    if gaps.iter().any(Gap::is_conservative) {
        return base.min(Confidence::Conservative);
    }
    if !gaps.is_empty() {
        return base.min(Confidence::Partial);
    }
    base
}

pub fn gaps_to_diagnostics(gaps: &[Gap]) -> Vec<Diagnostic> {
    gaps.iter().map(Gap::to_diagnostic).collect()
}

/// Path-scoped convenience constructor used throughout extraction/eval.
pub fn gap_at(kind: GapKind, what: impl Into<String>, why: impl Into<String>, path: &NormalizedPath) -> Gap {
    Gap::new(kind, what, why).suggest(format!("see {path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_failed_forces_manual() {
        let gaps = vec![Gap::new(GapKind::AnalysisFailed, "x", "y")];
        assert_eq!(downgrade_confidence(Confidence::Exact, &gaps), Confidence::Manual);
    }

    #[test]
    fn conservative_gap_downgrades_but_not_below_itself() {
        let gaps = vec![Gap::new(GapKind::ParseError, "x", "y")];
        assert_eq!(downgrade_confidence(Confidence::Exact, &gaps), Confidence::Conservative);
        assert_eq!(downgrade_confidence(Confidence::Low, &gaps), Confidence::Low);
    }

    #[test]
    fn other_gap_yields_partial() {
        let gaps = vec![Gap::new(GapKind::DynamicValue, "x", "y")];
        assert_eq!(downgrade_confidence(Confidence::Exact, &gaps), Confidence::Partial);
    }

    #[test]
    fn no_gaps_keeps_base() {
        assert_eq!(downgrade_confidence(Confidence::High, &[]), Confidence::High);
    }
}
