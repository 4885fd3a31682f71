//! The lexer (C3): byte stream → token stream, stateless between calls.
//!
//! Grounded directly on `original_source/MyScript/Scanner.hpp`'s
//! `GetNextToken`. Recognition is tried in the fixed order from
//! `SPEC_FULL.md` section 4.1; that order matters (e.g. the `0x` hex check
//! must run before the decimal-point check, and the operator table is
//! scanned in its declaration order, not by longest match).

use mscript_util::{is_keyword, DiagnosticBuilder, Handler, Span, OPERATORS};

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

pub struct Lexer<'a, 'h> {
    cursor: Cursor<'a>,
    handler: &'h mut Handler,
}

impl<'a, 'h> Lexer<'a, 'h> {
    pub fn new(source: &'a str, handler: &'h mut Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
        }
    }

    pub fn line(&self) -> u32 {
        self.cursor.line()
    }

    pub fn column(&self) -> u32 {
        self.cursor.column()
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Restores scanner position, e.g. for the parser's call-vs-name
    /// rewind (`SPEC_FULL.md` 4.2).
    pub fn set_position(&mut self, position: usize, line: u32, column: u32) {
        self.cursor.set_position(position, line, column);
    }

    /// Lets the parser report committed syntax errors through the same
    /// handler the lexer itself uses, without taking a second mutable
    /// borrow of a separately-held `Handler`.
    pub fn handler_mut(&mut self) -> &mut Handler {
        self.handler
    }

    /// Returns the next token. Never fails: malformed input surfaces as an
    /// `Unknown` or unterminated `String` token for the parser to reject.
    pub fn next_token(&mut self) -> Token<'a> {
        let start = self.cursor.position();
        let start_line = self.cursor.line();
        let start_col = self.cursor.column();

        if self.cursor.is_at_end() {
            return self.make(TokenKind::Eof, start, start_line, start_col);
        }

        let c = self.cursor.current_byte();

        if is_ascii_whitespace(c) {
            while !self.cursor.is_at_end() && is_ascii_whitespace(self.cursor.current_byte()) {
                self.cursor.advance();
            }
            return self.make(TokenKind::Whitespace, start, start_line, start_col);
        }

        if is_ident_start(c) {
            return self.lex_identifier(start, start_line, start_col);
        }

        if c.is_ascii_digit() {
            return self.lex_number(start, start_line, start_col);
        }

        if c == b'"' {
            return self.lex_string(start, start_line, start_col);
        }

        if c == b'/' && self.cursor.peek_byte(1) == b'/' {
            while !self.cursor.is_at_end() && self.cursor.current_byte() != b'\n' {
                self.cursor.advance();
            }
            return self.make(TokenKind::Comment, start, start_line, start_col);
        }

        if let Some(op_text) = self.match_operator() {
            for _ in 0..op_text.len() {
                self.cursor.advance();
            }
            return self.make(TokenKind::Operator, start, start_line, start_col);
        }

        if matches!(c, b'(' | b')' | b',' | b'=' | b';' | b':') {
            self.cursor.advance();
            return self.make(TokenKind::Punctuation, start, start_line, start_col);
        }

        // Fallback: one byte, reported and consumed as Unknown.
        self.cursor.advance();
        let span = Span::new(start, self.cursor.position(), start_line, start_col);
        let text = self.slice(start, self.cursor.position());
        DiagnosticBuilder::error(format!("unexpected character '{}'", text))
            .span(span)
            .emit(self.handler);
        Token::new(TokenKind::Unknown, text, span)
    }

    fn lex_identifier(&mut self, start: usize, line: u32, col: u32) -> Token<'a> {
        while !self.cursor.is_at_end() && is_ident_continue(self.cursor.current_byte()) {
            self.cursor.advance();
        }
        let text = self.slice(start, self.cursor.position());
        let kind = if text == "true" || text == "false" {
            TokenKind::Boolean
        } else if is_keyword(text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        self.make(kind, start, line, col)
    }

    fn lex_number(&mut self, start: usize, line: u32, col: u32) -> Token<'a> {
        if self.cursor.current_byte() == b'0' && matches!(self.cursor.peek_byte(1), b'x' | b'X') {
            self.cursor.advance();
            self.cursor.advance();
            while !self.cursor.is_at_end() && self.cursor.current_byte().is_ascii_hexdigit() {
                self.cursor.advance();
            }
            return self.make(TokenKind::Integer, start, line, col);
        }

        while !self.cursor.is_at_end() && self.cursor.current_byte().is_ascii_digit() {
            self.cursor.advance();
        }

        if self.cursor.current_byte() == b'.' && self.cursor.peek_byte(1).is_ascii_digit() {
            self.cursor.advance();
            while !self.cursor.is_at_end() && self.cursor.current_byte().is_ascii_digit() {
                self.cursor.advance();
            }
            return self.make(TokenKind::Decimal, start, line, col);
        }

        self.make(TokenKind::Integer, start, line, col)
    }

    fn lex_string(&mut self, start: usize, line: u32, col: u32) -> Token<'a> {
        self.cursor.advance(); // opening quote
        loop {
            if self.cursor.is_at_end() {
                break;
            }
            let c = self.cursor.current_byte();
            if c == b'"' {
                self.cursor.advance();
                break;
            }
            if c == b'\\' && self.cursor.peek_byte(1) == b'"' {
                self.cursor.advance();
                self.cursor.advance();
                continue;
            }
            self.cursor.advance();
        }
        self.make(TokenKind::String, start, line, col)
    }

    /// Scans the operator table **in declaration order** and returns the
    /// first textual match at the current position, or `None`.
    fn match_operator(&self) -> Option<&'static str> {
        let remaining = &self.cursor.source()[self.cursor.position()..];
        for op in OPERATORS {
            let text = op.text();
            if remaining.len() >= text.len() && &remaining[..text.len()] == text.as_bytes() {
                return Some(text);
            }
        }
        None
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        std::str::from_utf8(&self.cursor.source()[start..end]).unwrap_or("")
    }

    fn make(&self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token<'a> {
        let end = self.cursor.position();
        let span = Span::new(start, end, line, col);
        Token::new(kind, self.slice(start, end), span)
    }
}

fn is_ascii_whitespace(c: u8) -> bool {
    c == b' ' || c == b'\t' || c == b'\r' || c == b'\n'
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl<'a, 'h> Lexer<'a, 'h> {
    /// Produces the significant tokens (skipping whitespace and comments) as
    /// an owned vector, for callers that want full lookahead up front
    /// instead of driving `next_token` themselves.
    pub fn tokenize(mut self) -> Vec<Token<'a>> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token();
            match tok.kind {
                TokenKind::Whitespace | TokenKind::Comment => continue,
                TokenKind::Eof => {
                    out.push(tok);
                    break;
                }
                _ => out.push(tok),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_util::Handler;

    fn lex_all(src: &str) -> Vec<Token<'_>> {
        let mut handler = Handler::new();
        Lexer::new(src, &mut handler).tokenize()
    }

    #[test]
    fn recognizes_keywords_vs_identifiers() {
        let toks = lex_all("function foo");
        assert_eq!(toks[0].kind, TokenKind::Keyword);
        assert_eq!(toks[0].text, "function");
        assert_eq!(toks[1].kind, TokenKind::Identifier);
        assert_eq!(toks[1].text, "foo");
    }

    #[test]
    fn booleans_are_not_identifiers() {
        let toks = lex_all("true false maybe");
        assert_eq!(toks[0].kind, TokenKind::Boolean);
        assert_eq!(toks[1].kind, TokenKind::Boolean);
        assert_eq!(toks[2].kind, TokenKind::Identifier);
    }

    #[test]
    fn hex_prefix_wins_over_decimal_point_check() {
        let toks = lex_all("0x1F");
        assert_eq!(toks[0].kind, TokenKind::Integer);
        assert_eq!(toks[0].text, "0x1F");
    }

    #[test]
    fn decimal_requires_digit_after_dot() {
        let toks = lex_all("3.14");
        assert_eq!(toks[0].kind, TokenKind::Decimal);
        assert_eq!(toks[0].text, "3.14");
    }

    #[test]
    fn two_char_relational_operators_win_over_one_char_prefix() {
        let toks = lex_all(">= > <= <");
        assert_eq!(toks[0].text, ">=");
        assert_eq!(toks[1].text, ">");
        assert_eq!(toks[2].text, "<=");
        assert_eq!(toks[3].text, "<");
    }

    #[test]
    fn string_with_escaped_quote_is_not_terminated_early() {
        let toks = lex_all(r#""a\"b" rest"#);
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text, r#""a\"b""#);
    }

    #[test]
    fn unterminated_string_reaches_eof_without_panicking() {
        let toks = lex_all(r#"return "abc;"#);
        assert_eq!(toks.last().unwrap().kind, TokenKind::Eof);
        assert_eq!(toks[1].kind, TokenKind::String);
    }

    #[test]
    fn line_comment_runs_to_newline() {
        let toks = lex_all("1 // comment\n2");
        assert_eq!(toks[0].text, "1");
        assert_eq!(toks[1].text, "2");
    }

    #[test]
    fn delimiters_are_punctuation_not_unknown() {
        let toks = lex_all("f(x, y) = 1;");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::Punctuation));
        for t in &toks {
            assert_ne!(t.kind, TokenKind::Unknown);
        }
    }

    #[test]
    fn unknown_byte_reports_diagnostic() {
        let mut handler = Handler::new();
        let tok = {
            let mut lexer = Lexer::new("@", &mut handler);
            lexer.next_token()
        };
        assert_eq!(tok.kind, TokenKind::Unknown);
        assert!(handler.has_errors());
    }

    /// Source strings built by joining a fixed vocabulary of token
    /// fragments with single spaces, for the round-trip property below.
    #[derive(Clone, Debug)]
    struct TokenSource(String);

    impl quickcheck::Arbitrary for TokenSource {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            const FRAGMENTS: &[&str] = &[
                "function", "return", "if", "else", "while", "end", "foo", "bar_2", "x",
                "123", "0x1F", "3.14", "true", "false", "\"hi\"", "\"a\\\"b\"", "+", "-", "*",
                "/", "==", "!=", ">=", "<=", "&&", "||", "(", ")", ",", "=", ";", ":",
                "// trailing comment",
            ];
            let count = (usize::arbitrary(g) % 12) + 1;
            let mut s = String::new();
            for i in 0..count {
                if i > 0 {
                    s.push(' ');
                }
                let frag = FRAGMENTS[usize::arbitrary(g) % FRAGMENTS.len()];
                s.push_str(frag);
            }
            TokenSource(s)
        }
    }

    /// Every token the lexer hands back has a span whose `[lo, hi)` byte
    /// range, sliced straight out of the original source, reproduces its
    /// `text` exactly — the source is never copied, only sliced.
    #[quickcheck_macros::quickcheck]
    fn every_token_span_slices_back_to_its_own_text(src: TokenSource) -> bool {
        let mut handler = Handler::new();
        let mut lexer = Lexer::new(&src.0, &mut handler);
        loop {
            let tok = lexer.next_token();
            let slice = &src.0[tok.span.lo as usize..tok.span.hi as usize];
            if slice != tok.text {
                return false;
            }
            if tok.is_eof() {
                return true;
            }
        }
    }
}
