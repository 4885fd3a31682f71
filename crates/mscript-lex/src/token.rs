//! Token kinds (C3 data model, `SPEC_FULL.md` section 3).

use mscript_util::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    Identifier,
    Keyword,
    Integer,
    Decimal,
    String,
    Boolean,
    Operator,
    /// Not part of the distilled spec's Token-kind list (section 3 lists
    /// only the 13 binary operators under `Operator`), but the grammar
    /// needs single-character delimiters — `( ) , = ; :` — that are neither
    /// identifiers nor binary operators. Added as its own kind rather than
    /// folded into `Operator` so the parser never confuses a delimiter with
    /// an operand-joining operator.
    Punctuation,
    Comment,
    Unknown,
    /// Not part of the original scanner's `TokenType` — the original signals
    /// end-of-input with a `false` return from `GetNextToken` rather than a
    /// token value. An iterator-shaped Rust lexer needs an explicit terminal
    /// token instead (see `SPEC_FULL.md` section 3).
    Eof,
}

/// `{kind, text_slice, source_index, length}` exactly as specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

impl<'a> Token<'a> {
    pub fn new(kind: TokenKind, text: &'a str, span: Span) -> Self {
        Self { kind, text, span }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}
