// Recursive-descent, precedence-climbing parser for binding expressions.
//
// Precedence levels, low to high:
//   assignment < value-converter (|) < binding-behavior (&) < conditional
//   < or < and < equality < comparison < additive < multiplicative
//   < unary < postfix (. ?. () [])

use super::ast::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
use super::lexer::{Lexer, Token, TokenKind};
use crate::diagnostic::{codes, Diagnostic, Diagnostics};
use crate::source::{ExprId, Span};
use std::cell::Cell;

pub struct ParseResult {
    pub expr: Option<Expr>,
    pub diagnostics: Diagnostics,
}

/// Parses a single binding expression from `source`. `next_id` hands out
/// fresh `ExprId`s (shared with the lowering pass so ids are unique across a
/// whole template, not just within one expression).
pub fn parse(source: &str, base: u32, next_id: &Cell<u32>) -> ParseResult {
    let (tokens, lexer_diagnostics) = Lexer::new(source).tokenize();
    let mut parser = Parser { tokens, pos: 0, source, base, next_id, diagnostics: Diagnostics::new() };
    let expr = parser.parse_expression();
    if !parser.at_eof() {
        let tok = parser.peek();
        parser.error(tok.span, "unexpected trailing input in binding expression");
    }
    let mut diagnostics = rebase_diagnostics(lexer_diagnostics, base);
    diagnostics.merge(parser.diagnostics);
    ParseResult { expr, diagnostics }
}

fn rebase_diagnostics(diagnostics: Diagnostics, base: u32) -> Diagnostics {
    diagnostics
        .into_iter()
        .map(|mut d| {
            d.span = Span::new(d.span.start + base, d.span.end + base);
            d
        })
        .collect()
}

/// Parses the `x of items` (optionally `(x, i) of items`) form used by
/// `repeat.for`.
pub fn parse_for_of(source: &str, base: u32, next_id: &Cell<u32>) -> ParseResult {
    let (tokens, lexer_diagnostics) = Lexer::new(source).tokenize();
    let mut parser = Parser { tokens, pos: 0, source, base, next_id, diagnostics: Diagnostics::new() };
    let expr = parser.parse_for_of();
    let mut diagnostics = rebase_diagnostics(lexer_diagnostics, base);
    diagnostics.merge(parser.diagnostics);
    ParseResult { expr, diagnostics }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
    base: u32,
    next_id: &'a Cell<u32>,
    diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    None,
    Assign,
    ValueConverter,
    BindingBehavior,
    Conditional,
    Or,
    And,
    Equality,
    Comparison,
    Additive,
    Multiplicative,
    Unary,
    Postfix,
}

impl Precedence {
    fn next(self) -> Self {
        use Precedence::*;
        match self {
            None => Assign,
            Assign => ValueConverter,
            ValueConverter => BindingBehavior,
            BindingBehavior => Conditional,
            Conditional => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Additive,
            Additive => Multiplicative,
            Multiplicative => Unary,
            Unary => Postfix,
            Postfix => Postfix,
        }
    }
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)].clone()
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            let span = self.peek().span;
            self.error(span, format!("expected {what}"));
            false
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.add(Diagnostic::from_code(&codes::E0504, self.rebase(span), message));
    }

    fn rebase(&self, span: Span) -> Span {
        Span::new(span.start + self.base, span.end + self.base)
    }

    fn fresh_id(&self) -> ExprId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ExprId(id)
    }

    fn node(&self, span: Span, kind: ExprKind) -> Expr {
        Expr::new(self.fresh_id(), self.rebase(span), kind)
    }

    fn parse_expression(&mut self) -> Option<Expr> {
        self.parse_precedence(Precedence::Assign)
    }

    fn parse_for_of(&mut self) -> Option<Expr> {
        let decl_start = self.peek().span;
        let declaration = if self.eat(TokenKind::LParen) {
            let mut targets = Vec::new();
            while !self.check(TokenKind::RParen) && !self.at_eof() {
                targets.push(self.parse_binding_identifier()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "')'");
            self.node(decl_start, ExprKind::ArrayDestructuring { targets })
        } else if self.check(TokenKind::LBrace) {
            self.parse_object_destructuring()?
        } else {
            self.parse_binding_identifier()?
        };

        if !self.match_ident("of") {
            let span = self.peek().span;
            self.error(span, "expected 'of' in iterator declaration");
            return None;
        }

        let iterable = self.parse_expression()?;
        let span = declaration.span.merge(iterable.span);
        Some(self.node(
            Span::new(span.start.saturating_sub(self.base), span.end.saturating_sub(self.base)),
            ExprKind::ForOf { declaration: Box::new(declaration), iterable: Box::new(iterable) },
        ))
    }

    fn parse_binding_identifier(&mut self) -> Option<Expr> {
        let tok = self.peek();
        if tok.kind != TokenKind::Identifier {
            self.error(tok.span, "expected identifier");
            return None;
        }
        self.advance();
        let name = tok.text(self.source).to_string();
        Some(self.node(tok.span, ExprKind::AccessScope { name, ancestor: 0 }))
    }

    fn parse_object_destructuring(&mut self) -> Option<Expr> {
        let start = self.peek().span;
        self.expect(TokenKind::LBrace, "'{'");
        let mut bindings = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_eof() {
            let key_tok = self.advance();
            let key = key_tok.text(self.source).to_string();
            let value = self.node(key_tok.span, ExprKind::AccessScope { name: key.clone(), ancestor: 0 });
            bindings.push((key, value));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'");
        Some(self.node(start, ExprKind::ObjectDestructuring { bindings }))
    }

    fn match_ident(&mut self, word: &str) -> bool {
        let tok = self.peek();
        if tok.kind == TokenKind::Identifier && tok.text(self.source) == word {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_precedence(&mut self, min: Precedence) -> Option<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let tok = self.peek();
            let Some(prec) = infix_precedence(tok.kind, self.source, &tok) else { break };
            if prec < min {
                break;
            }

            left = match tok.kind {
                TokenKind::Question => {
                    self.advance();
                    let yes = self.parse_precedence(Precedence::Assign)?;
                    self.expect(TokenKind::Colon, "':' in conditional expression");
                    let no = self.parse_precedence(Precedence::Assign)?;
                    let span = left.span.merge(no.span);
                    self.node(span, ExprKind::Conditional { condition: Box::new(left), yes: Box::new(yes), no: Box::new(no) })
                }
                TokenKind::Eq => {
                    self.advance();
                    let value = self.parse_precedence(Precedence::Assign)?;
                    let span = left.span.merge(value.span);
                    self.node(span, ExprKind::Assign { target: Box::new(left), value: Box::new(value) })
                }
                TokenKind::Pipe => {
                    self.advance();
                    let (name, args) = self.parse_pipe_target();
                    let span = left.span;
                    self.node(span, ExprKind::ValueConverter { expression: Box::new(left), name, args })
                }
                TokenKind::Amp => {
                    self.advance();
                    let (name, args) = self.parse_pipe_target();
                    let span = left.span;
                    self.node(span, ExprKind::BindingBehavior { expression: Box::new(left), name, args })
                }
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = tok.kind == TokenKind::QuestionDot;
                    self.advance();
                    let member_tok = self.advance();
                    let member = member_tok.text(self.source).to_string();
                    if self.eat(TokenKind::LParen) {
                        let args = self.parse_args();
                        let span = left.span.merge(self.previous_span());
                        self.node(span, ExprKind::CallMember { base: Box::new(left), member, args, optional })
                    } else {
                        let span = left.span.merge(member_tok.span);
                        self.node(span, ExprKind::AccessMember { base: Box::new(left), member, optional })
                    }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let key = self.parse_expression()?;
                    self.expect(TokenKind::RBracket, "']'");
                    let span = left.span.merge(self.previous_span());
                    self.node(span, ExprKind::AccessKeyed { base: Box::new(left), key: Box::new(key) })
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args();
                    let span = left.span.merge(self.previous_span());
                    self.node(span, ExprKind::CallFunction { base: Box::new(left), args })
                }
                _ => {
                    self.advance();
                    let op = binary_op(tok.kind).expect("infix_precedence implies a binary op here");
                    let right = self.parse_precedence(prec.next())?;
                    let span = left.span.merge(right.span);
                    self.node(span, ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) })
                }
            };
        }

        Some(left)
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)].span
    }

    fn parse_pipe_target(&mut self) -> (String, Vec<Expr>) {
        let name_tok = self.advance();
        let name = name_tok.text(self.source).to_string();
        let mut args = Vec::new();
        while self.eat(TokenKind::Colon) {
            if let Some(arg) = self.parse_precedence(Precedence::Conditional) {
                args.push(arg);
            }
        }
        (name, args)
    }

    fn parse_args(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.at_eof() {
            if let Some(arg) = self.parse_precedence(Precedence::Assign) {
                args.push(arg);
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'");
        args
    }

    fn parse_unary(&mut self) -> Option<Expr> {
        let tok = self.peek();
        let op = match tok.kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.parse_precedence(Precedence::Unary)?;
            let span = tok.span.merge(operand.span);
            return Some(self.node(span, ExprKind::Unary { op, operand: Box::new(operand) }));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<Expr> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Number => {
                self.advance();
                let text = tok.text(self.source);
                let value: f64 = text.parse().unwrap_or(0.0);
                Some(self.node(tok.span, ExprKind::Literal(Literal::Number(value))))
            }
            TokenKind::String => {
                self.advance();
                let text = tok.text(self.source);
                let inner = &text[1..text.len().saturating_sub(1)];
                Some(self.node(tok.span, ExprKind::Literal(Literal::String(inner.to_string()))))
            }
            TokenKind::TemplateNoSubst => {
                self.advance();
                let text = tok.text(self.source);
                let inner = &text[1..text.len().saturating_sub(1)];
                Some(self.node(tok.span, ExprKind::Template { parts: vec![inner.to_string()], expressions: Vec::new() }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'");
                Some(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                while !self.check(TokenKind::RBracket) && !self.at_eof() {
                    if let Some(e) = self.parse_precedence(Precedence::Assign) {
                        elements.push(e);
                    }
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket, "']'");
                Some(self.node(tok.span, ExprKind::ArrayLiteral { elements }))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut keys = Vec::new();
                let mut values = Vec::new();
                while !self.check(TokenKind::RBrace) && !self.at_eof() {
                    let key_tok = self.advance();
                    let key = key_tok.text(self.source).trim_matches(['"', '\'']).to_string();
                    self.expect(TokenKind::Colon, "':'");
                    if let Some(v) = self.parse_precedence(Precedence::Assign) {
                        keys.push(key);
                        values.push(v);
                    }
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "'}'");
                Some(self.node(tok.span, ExprKind::ObjectLiteral { keys, values }))
            }
            TokenKind::Identifier => {
                let text = tok.text(self.source);
                match text {
                    "true" => {
                        self.advance();
                        Some(self.node(tok.span, ExprKind::Literal(Literal::Bool(true))))
                    }
                    "false" => {
                        self.advance();
                        Some(self.node(tok.span, ExprKind::Literal(Literal::Bool(false))))
                    }
                    "null" => {
                        self.advance();
                        Some(self.node(tok.span, ExprKind::Literal(Literal::Null)))
                    }
                    "undefined" => {
                        self.advance();
                        Some(self.node(tok.span, ExprKind::Literal(Literal::Undefined)))
                    }
                    "$this" => {
                        self.advance();
                        Some(self.node(tok.span, ExprKind::AccessThis { ancestor: 0 }))
                    }
                    "$parent" => {
                        self.advance();
                        let mut ancestor = 1;
                        while self.check(TokenKind::Dot) && self.peek_ahead_is_parent() {
                            self.advance();
                            self.advance();
                            ancestor += 1;
                        }
                        if self.eat(TokenKind::Dot) {
                            let name_tok = self.advance();
                            let name = name_tok.text(self.source).to_string();
                            Some(self.node(tok.span.merge(name_tok.span), ExprKind::AccessScope { name, ancestor }))
                        } else {
                            Some(self.node(tok.span, ExprKind::AccessThis { ancestor }))
                        }
                    }
                    _ => {
                        self.advance();
                        let name = text.to_string();
                        if self.eat(TokenKind::LParen) {
                            let args = self.parse_args();
                            let span = tok.span.merge(self.previous_span());
                            Some(self.node(span, ExprKind::CallScope { name, args, ancestor: 0 }))
                        } else {
                            Some(self.node(tok.span, ExprKind::AccessScope { name, ancestor: 0 }))
                        }
                    }
                }
            }
            _ => {
                self.error(tok.span, format!("unexpected token in binding expression"));
                None
            }
        }
    }

    fn peek_ahead_is_parent(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .map(|t| t.kind == TokenKind::Identifier && t.text(self.source) == "$parent")
            .unwrap_or(false)
    }
}

fn infix_precedence(kind: TokenKind, _source: &str, _tok: &Token) -> Option<Precedence> {
    Some(match kind {
        TokenKind::Eq => Precedence::Assign,
        TokenKind::Pipe => Precedence::ValueConverter,
        TokenKind::Amp => Precedence::BindingBehavior,
        TokenKind::Question => Precedence::Conditional,
        TokenKind::PipePipe => Precedence::Or,
        TokenKind::AmpAmp => Precedence::And,
        TokenKind::EqEq | TokenKind::EqEqEq | TokenKind::BangEq | TokenKind::BangEqEq => Precedence::Equality,
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => Precedence::Comparison,
        TokenKind::Plus | TokenKind::Minus => Precedence::Additive,
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Multiplicative,
        TokenKind::Dot | TokenKind::QuestionDot | TokenKind::LParen | TokenKind::LBracket => Precedence::Postfix,
        _ => return None,
    })
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::EqEqEq => BinaryOp::StrictEq,
        TokenKind::BangEq => BinaryOp::Ne,
        TokenKind::BangEqEq => BinaryOp::StrictNe,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::Ge,
        TokenKind::AmpAmp => BinaryOp::And,
        TokenKind::PipePipe => BinaryOp::Or,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Expr {
        let id = Cell::new(0);
        let result = parse(src, 0, &id);
        assert!(result.diagnostics.is_empty(), "unexpected diagnostics: {:?}", result.diagnostics);
        result.expr.expect("expected a parsed expression")
    }

    #[test]
    fn parses_member_chain() {
        let expr = parse_ok("item.address.city");
        match expr.kind {
            ExprKind::AccessMember { member, .. } => assert_eq!(member, "city"),
            other => panic!("expected AccessMember, got {other:?}"),
        }
    }

    #[test]
    fn parses_value_converter_with_args() {
        let expr = parse_ok("total | currency:'USD':2");
        match expr.kind {
            ExprKind::ValueConverter { name, args, .. } => {
                assert_eq!(name, "currency");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected ValueConverter, got {other:?}"),
        }
    }

    #[test]
    fn parses_binding_behavior_after_value_converter() {
        let expr = parse_ok("value | json & debounce:500");
        match expr.kind {
            ExprKind::BindingBehavior { name, expression, .. } => {
                assert_eq!(name, "debounce");
                assert!(matches!(expression.kind, ExprKind::ValueConverter { .. }));
            }
            other => panic!("expected BindingBehavior, got {other:?}"),
        }
    }

    #[test]
    fn parses_dollar_parent_access() {
        let expr = parse_ok("$parent.name");
        match expr.kind {
            ExprKind::AccessScope { name, ancestor } => {
                assert_eq!(name, "name");
                assert_eq!(ancestor, 1);
            }
            other => panic!("expected AccessScope, got {other:?}"),
        }
    }

    #[test]
    fn rebases_spans_to_document_offset() {
        let id = Cell::new(0);
        let result = parse("a.b", 100, &id);
        let expr = result.expr.unwrap();
        assert_eq!(expr.span.start, 100);
    }

    #[test]
    fn parses_for_of_with_destructuring() {
        let id = Cell::new(0);
        let result = parse_for_of("{ id, name } of items", 0, &id);
        let expr = result.expr.unwrap();
        match expr.kind {
            ExprKind::ForOf { declaration, .. } => {
                assert!(matches!(declaration.kind, ExprKind::ObjectDestructuring { .. }));
            }
            other => panic!("expected ForOf, got {other:?}"),
        }
    }
}
