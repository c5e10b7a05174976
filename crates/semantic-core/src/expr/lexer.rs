// Hand-written lexer for binding expressions.
//
// Tokenizes the small expression language that appears inside template
// attributes and interpolations. Recovers from bad characters by emitting
// an `Error` token and continuing, same error-recovery shape used by the
// module-language lexer this crate is built alongside.

use crate::diagnostic::{codes, Diagnostic, Diagnostics};
use crate::source::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    TemplateStart,   // ` text ${
    TemplateMiddle,  // } text ${
    TemplateEnd,     // } text `
    TemplateNoSubst, // ` text ` (no interpolations)
    Dot,
    QuestionDot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    BangEq,
    BangEqEq,
    Eq,
    EqEq,
    EqEqEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AmpAmp,
    PipePipe,
    Question,
    Pipe,
    Amp,
    Eof,
    Error,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.text(source)
    }
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn tokenize(mut self) -> (Vec<Token>, Diagnostics) {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token();
            let eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if eof {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn advance(&mut self) -> Option<char> {
        let (i, c) = self.chars.next()?;
        self.pos = i + c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.peek_char() else {
            return Token { kind: TokenKind::Eof, span: Span::new(start as u32, start as u32) };
        };

        let kind = match c {
            '(' => { self.advance(); TokenKind::LParen }
            ')' => { self.advance(); TokenKind::RParen }
            '[' => { self.advance(); TokenKind::LBracket }
            ']' => { self.advance(); TokenKind::RBracket }
            '{' => { self.advance(); TokenKind::LBrace }
            '}' => { self.advance(); TokenKind::RBrace }
            ',' => { self.advance(); TokenKind::Comma }
            ':' => { self.advance(); TokenKind::Colon }
            ';' => { self.advance(); TokenKind::Semicolon }
            '+' => { self.advance(); TokenKind::Plus }
            '-' => { self.advance(); TokenKind::Minus }
            '*' => { self.advance(); TokenKind::Star }
            '/' => { self.advance(); TokenKind::Slash }
            '%' => { self.advance(); TokenKind::Percent }
            '|' => {
                self.advance();
                if self.peek_char() == Some('|') {
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    TokenKind::Pipe
                }
            }
            '&' => {
                self.advance();
                if self.peek_char() == Some('&') {
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Amp
                }
            }
            '?' => {
                self.advance();
                if self.peek_char() == Some('.') {
                    self.advance();
                    TokenKind::QuestionDot
                } else {
                    TokenKind::Question
                }
            }
            '.' => {
                self.advance();
                TokenKind::Dot
            }
            '!' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::BangEqEq
                    } else {
                        TokenKind::BangEq
                    }
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    if self.peek_char() == Some('=') {
                        self.advance();
                        TokenKind::EqEqEq
                    } else {
                        TokenKind::EqEq
                    }
                } else {
                    TokenKind::Eq
                }
            }
            '<' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '"' | '\'' => return self.lex_string(start, c),
            '`' => return self.lex_template(start),
            '0'..='9' => return self.lex_number(start),
            c if is_ident_start(c) => return self.lex_identifier(start),
            _ => {
                self.advance();
                self.diagnostics.add(
                    Diagnostic::from_code(&codes::E0504, Span::new(start as u32, self.pos as u32), format!("unexpected character '{c}' in binding expression")),
                );
                TokenKind::Error
            }
        };

        Token { kind, span: Span::new(start as u32, self.pos as u32) }
    }

    fn lex_identifier(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        Token { kind: TokenKind::Identifier, span: Span::new(start as u32, self.pos as u32) }
    }

    fn lex_number(&mut self, start: usize) -> Token {
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek_char() == Some('.') {
            self.advance();
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        Token { kind: TokenKind::Number, span: Span::new(start as u32, self.pos as u32) }
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Token {
        self.advance();
        loop {
            match self.peek_char() {
                None => {
                    self.diagnostics.add(Diagnostic::from_code(
                        &codes::E0504,
                        Span::new(start as u32, self.pos as u32),
                        "unterminated string literal in binding expression",
                    ));
                    break;
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        Token { kind: TokenKind::String, span: Span::new(start as u32, self.pos as u32) }
    }

    /// Lexes one segment of a template literal (` up to the next `${` or
    /// closing backtick). Interpolations inside are tokenized separately by
    /// the parser re-entering this lexer per `${ ... }` span.
    fn lex_template(&mut self, start: usize) -> Token {
        self.advance();
        loop {
            match self.peek_char() {
                None => break,
                Some('`') => {
                    self.advance();
                    return Token { kind: TokenKind::TemplateNoSubst, span: Span::new(start as u32, self.pos as u32) };
                }
                Some('$') => {
                    let save = self.pos;
                    self.advance();
                    if self.peek_char() == Some('{') {
                        self.advance();
                        return Token { kind: TokenKind::TemplateStart, span: Span::new(start as u32, self.pos as u32) };
                    }
                    self.pos = save;
                    self.advance();
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        Token { kind: TokenKind::Error, span: Span::new(start as u32, self.pos as u32) }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_member_access() {
        let (tokens, diags) = Lexer::new("item.name").tokenize();
        assert!(diags.is_empty());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn tokenizes_value_converter_pipe() {
        let (tokens, diags) = Lexer::new("value | currency:2").tokenize();
        assert!(diags.is_empty());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Pipe));
    }

    #[test]
    fn reports_unexpected_character() {
        let (_, diags) = Lexer::new("a ~ b").tokenize();
        assert!(!diags.is_empty());
    }
}
