// Error code registry
//
// This module defines stable, documented error codes used throughout the
// compiler. Error codes are versioned and should not be removed or
// reassigned once released.
//
// Code ranges, one per pipeline stage (matches the `sourceTag`s a
// diagnostic carries, §6.7):
// - E01xx: extract   (file-fact extraction)
// - E02xx: evaluate   (export binding / partial evaluation)
// - E03xx: recognize  (pattern recognizers / convergence)
// - E04xx: register   (registration analysis)
// - E05xx: lower      (template lowering)
// - E06xx: link       (host linking)
// - E07xx: bind       (scope binding)
// - E08xx: typecheck
// - E09xx: plan / emit
// - E10xx: discovery  (package analysis / incremental graph)

use super::Severity;
use serde::{Deserialize, Serialize};

/// Category of error for grouping and filtering; doubles as the diagnostic
/// `sourceTag` from §6.7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Extract,
    Evaluate,
    Recognize,
    Register,
    Lower,
    Link,
    Bind,
    Typecheck,
    Plan,
    Discovery,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Extract => "extract",
            Category::Evaluate => "evaluate",
            Category::Recognize => "recognize",
            Category::Register => "register",
            Category::Lower => "lower",
            Category::Link => "link",
            Category::Bind => "bind",
            Category::Typecheck => "typecheck",
            Category::Plan => "plan",
            Category::Discovery => "discovery",
        }
    }

    pub fn code_prefix(&self) -> &'static str {
        match self {
            Category::Extract => "E01",
            Category::Evaluate => "E02",
            Category::Recognize => "E03",
            Category::Register => "E04",
            Category::Lower => "E05",
            Category::Link => "E06",
            Category::Bind => "E07",
            Category::Typecheck => "E08",
            Category::Plan => "E09",
            Category::Discovery => "E10",
        }
    }
}

/// A stable, documented error code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    /// The code string, e.g., "E0301"
    pub code: &'static str,
    /// Human-readable name, e.g., "undefined_name"
    pub name: &'static str,
    /// Category for grouping
    pub category: Category,
    /// Default severity (can be overridden by configuration)
    pub default_severity: Severity,
    /// Brief explanation for --explain support
    pub explanation: &'static str,
}

impl ErrorCode {
    pub const fn new(
        code: &'static str,
        name: &'static str,
        category: Category,
        default_severity: Severity,
        explanation: &'static str,
    ) -> Self {
        Self {
            code,
            name,
            category,
            default_severity,
            explanation,
        }
    }
}

// ============================================================================
// Extract (E01xx)
// ============================================================================

pub const E0101: ErrorCode = ErrorCode::new(
    "E0101",
    "parse_error",
    Category::Extract,
    Severity::Error,
    "The source file could not be parsed into an AST.",
);

pub const E0102: ErrorCode = ErrorCode::new(
    "E0102",
    "declaration_file_skipped",
    Category::Extract,
    Severity::Hint,
    "Declaration files (.d.ts) are not fact-extracted.",
);

// ============================================================================
// Evaluate (E02xx)
// ============================================================================

pub const E0201: ErrorCode = ErrorCode::new(
    "E0201",
    "unresolved_import",
    Category::Evaluate,
    Severity::Warning,
    "The import specifier could not be resolved to a project file.",
);

pub const E0202: ErrorCode = ErrorCode::new(
    "E0202",
    "circular_import",
    Category::Evaluate,
    Severity::Warning,
    "A cycle was found while resolving re-exports or imports; resolution stopped at the cycle.",
);

pub const E0203: ErrorCode = ErrorCode::new(
    "E0203",
    "external_package",
    Category::Evaluate,
    Severity::Hint,
    "The import specifier points outside the project and was not followed.",
);

pub const E0204: ErrorCode = ErrorCode::new(
    "E0204",
    "analysis_failed",
    Category::Evaluate,
    Severity::Error,
    "Partial evaluation could not make progress on this file; results are unreliable.",
);

// ============================================================================
// Recognize (E03xx)
// ============================================================================

pub const E0301: ErrorCode = ErrorCode::new(
    "E0301",
    "legacy_decorators",
    Category::Recognize,
    Severity::Warning,
    "Decorator metadata uses a legacy emit shape that could not be fully read.",
);

pub const E0302: ErrorCode = ErrorCode::new(
    "E0302",
    "invalid_resource_name",
    Category::Recognize,
    Severity::Error,
    "The resource name does not canonicalize to a valid identifier for its kind.",
);

pub const E0303: ErrorCode = ErrorCode::new(
    "E0303",
    "ambiguous_convergence",
    Category::Recognize,
    Severity::Warning,
    "Multiple equally-ranked evidence records were found for the same resource.",
);

// ============================================================================
// Register (E04xx)
// ============================================================================

pub const E0401: ErrorCode = ErrorCode::new(
    "E0401",
    "unresolved_registration",
    Category::Register,
    Severity::Warning,
    "A registration site's target could not be mapped to a known resource.",
);

pub const E0402: ErrorCode = ErrorCode::new(
    "E0402",
    "orphan_resource",
    Category::Register,
    Severity::Hint,
    "A resource was discovered but never registered in any scope.",
);

// ============================================================================
// Lower (E05xx)
// ============================================================================

pub const E0501: ErrorCode = ErrorCode::new(
    "E0501",
    "unexpected_token",
    Category::Lower,
    Severity::Error,
    "The template tokenizer encountered a character that cannot start a valid token.",
);

pub const E0502: ErrorCode = ErrorCode::new(
    "E0502",
    "unclosed_tag",
    Category::Lower,
    Severity::Error,
    "An element was opened but never closed before the end of the template.",
);

pub const E0503: ErrorCode = ErrorCode::new(
    "E0503",
    "malformed_binding_command",
    Category::Lower,
    Severity::Error,
    "The attribute name matched no pattern in the attribute-syntax registry.",
);

pub const E0504: ErrorCode = ErrorCode::new(
    "E0504",
    "expression_parse_error",
    Category::Lower,
    Severity::Error,
    "The binding expression could not be parsed.",
);

// ============================================================================
// Link (E06xx)
// ============================================================================

pub const E0601: ErrorCode = ErrorCode::new(
    "E0601",
    "unknown_element",
    Category::Link,
    Severity::Error,
    "The element name did not resolve to any custom element in the active resource scope.",
);

pub const E0602: ErrorCode = ErrorCode::new(
    "E0602",
    "unknown_bindable",
    Category::Link,
    Severity::Error,
    "The bound property is not declared as a bindable on the target resource.",
);

pub const E0603: ErrorCode = ErrorCode::new(
    "E0603",
    "dangling_else",
    Category::Link,
    Severity::Warning,
    "An 'else' controller has no preceding sibling 'if' controller to pair with.",
);

// ============================================================================
// Bind (E07xx)
// ============================================================================

pub const E0701: ErrorCode = ErrorCode::new(
    "E0701",
    "unresolved_scope_identifier",
    Category::Bind,
    Severity::Error,
    "An AccessScope/AccessThis expression could not be resolved to a frame.",
);

// ============================================================================
// Typecheck (E08xx)
// ============================================================================

pub const E0801: ErrorCode = ErrorCode::new(
    "E0801",
    "type_mismatch",
    Category::Typecheck,
    Severity::Warning,
    "The inferred type of the expression does not match the expected type.",
);

// ============================================================================
// Plan (E09xx)
// ============================================================================

pub const E0901: ErrorCode = ErrorCode::new(
    "E0901",
    "missing_required_field",
    Category::Plan,
    Severity::Error,
    "A required field was missing when serializing the plan to instructions.",
);

// ============================================================================
// Discovery (E10xx)
// ============================================================================

pub const E1001: ErrorCode = ErrorCode::new(
    "E1001",
    "package_not_found",
    Category::Discovery,
    Severity::Error,
    "The package root does not exist or is not readable.",
);

pub const E1002: ErrorCode = ErrorCode::new(
    "E1002",
    "invalid_package_json",
    Category::Discovery,
    Severity::Error,
    "package.json could not be parsed.",
);

pub const E1003: ErrorCode = ErrorCode::new(
    "E1003",
    "no_entry_points",
    Category::Discovery,
    Severity::Warning,
    "The package manifest declares no usable entry points.",
);

pub const E1004: ErrorCode = ErrorCode::new(
    "E1004",
    "cache_corrupt",
    Category::Discovery,
    Severity::Warning,
    "The persisted package-analysis cache entry could not be read and will be regenerated.",
);

// ============================================================================
// Error code lookup
// ============================================================================

const ALL: &[&ErrorCode] = &[
    &E0101, &E0102, &E0201, &E0202, &E0203, &E0204, &E0301, &E0302, &E0303, &E0401, &E0402,
    &E0501, &E0502, &E0503, &E0504, &E0601, &E0602, &E0603, &E0701, &E0801, &E0901, &E1001,
    &E1002, &E1003, &E1004,
];

/// Look up an error code by its string identifier
pub fn lookup(code: &str) -> Option<&'static ErrorCode> {
    ALL.iter().copied().find(|c| c.code == code)
}

/// Get all error codes for a category
pub fn by_category(category: Category) -> Vec<&'static ErrorCode> {
    ALL.iter().copied().filter(|c| c.category == category).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("E0601").map(|c| c.name), Some("unknown_element"));
        assert_eq!(lookup("E9999"), None);
    }

    #[test]
    fn test_category_codes() {
        let link = by_category(Category::Link);
        assert!(link.iter().all(|c| c.category == Category::Link));
        assert!(link.len() >= 3);
    }

    #[test]
    fn test_code_prefix_matches_category() {
        for code in ALL {
            assert!(code.code.starts_with(code.category.code_prefix()));
        }
    }
}
