// Binding-expression language: lexer, AST, and parser for the small
// expression grammar that appears inside template attributes and
// interpolations.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expr, ExprKind, ExpressionType, Literal, UnaryOp};

use crate::diagnostic::Diagnostics;
use crate::source::ExprId;
use std::cell::Cell;

/// Parses one binding expression (e.g. the value of a `.bind`/`.to-view`
/// attribute, or one interpolation segment). `base` is the byte offset of
/// `source` within its owning document, used to rebase spans so they read
/// correctly against the original file. `next_id` hands out `ExprId`s shared
/// across every expression parsed for the same template.
pub fn parse_expression(source: &str, base: u32, next_id: &Cell<u32>) -> (Option<Expr>, Diagnostics) {
    let result = parser::parse(source, base, next_id);
    (result.expr, result.diagnostics)
}

/// Parses a `repeat.for` iterator declaration (`item of items`).
pub fn parse_for_of(source: &str, base: u32, next_id: &Cell<u32>) -> (Option<Expr>, Diagnostics) {
    let result = parser::parse_for_of(source, base, next_id);
    (result.expr, result.diagnostics)
}

/// Parses an interpolation string (`"hello ${name}!"`) into a `Template`
/// expression, splitting literal text from `${...}` segments and parsing
/// each segment with [`parse_expression`]. Returns `None` (no diagnostics)
/// if the string contains no interpolation markers at all, since plain text
/// is not a binding expression.
pub fn parse_interpolation(source: &str, base: u32, next_id: &Cell<u32>) -> (Option<Expr>, Diagnostics) {
    let mut diagnostics = Diagnostics::new();
    let mut parts = Vec::new();
    let mut expressions = Vec::new();
    let mut rest = source;
    let mut offset: u32 = 0;
    let mut found_any = false;

    loop {
        match rest.find("${") {
            None => {
                parts.push(rest.to_string());
                break;
            }
            Some(start) => {
                let Some(end) = find_matching_brace(rest, start + 2) else {
                    parts.push(rest.to_string());
                    break;
                };
                found_any = true;
                parts.push(rest[..start].to_string());
                let expr_src = &rest[start + 2..end];
                let expr_base = base + offset + (start + 2) as u32;
                let (expr, diags) = parse_expression(expr_src, expr_base, next_id);
                diagnostics.merge(diags);
                if let Some(expr) = expr {
                    expressions.push(expr);
                }
                offset += (end + 1) as u32;
                rest = &rest[end + 1..];
            }
        }
    }

    if !found_any {
        return (None, diagnostics);
    }

    let id = ExprId(next_id.get());
    next_id.set(next_id.get() + 1);
    let span = crate::source::Span::new(base, base + source.len() as u32);
    let expr = Expr::new(id, span, ExprKind::Template { parts, expressions });
    (Some(expr), diagnostics)
}

fn find_matching_brace(s: &str, from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let bytes = s.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_expression() {
        let id = Cell::new(0);
        let (expr, diags) = parse_expression("user.name", 0, &id);
        assert!(diags.is_empty());
        assert!(expr.is_some());
    }

    #[test]
    fn parses_interpolation_with_multiple_segments() {
        let id = Cell::new(0);
        let (expr, diags) = parse_interpolation("Hello ${firstName} ${lastName}!", 0, &id);
        assert!(diags.is_empty());
        match expr.unwrap().kind {
            ExprKind::Template { parts, expressions } => {
                assert_eq!(parts.len(), 3);
                assert_eq!(expressions.len(), 2);
            }
            other => panic!("expected Template, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_is_not_an_interpolation() {
        let id = Cell::new(0);
        let (expr, diags) = parse_interpolation("just text", 0, &id);
        assert!(diags.is_empty());
        assert!(expr.is_none());
    }
}
