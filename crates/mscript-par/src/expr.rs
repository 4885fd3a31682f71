//! Expression parsing: precedence climbing plus call-vs-name lookahead.
//!
//! Grounded on `SPEC_FULL.md` section 4.2's `parse_expression(min_precedence)`
//! algorithm, itself transcribed from `original_source/MyScript/Parser.hpp`'s
//! expression loop.

use mscript_lex::TokenKind;
use mscript_util::Span;

use crate::ast::{CallExpr, Expr};
use crate::{ParseResult, Parser, SavedState};

impl<'a, 'h, 'i> Parser<'a, 'h, 'i> {
    fn save(&self) -> SavedState<'a> {
        SavedState {
            current: self.current,
            position: self.lexer.position(),
            line: self.lexer.line(),
            column: self.lexer.column(),
        }
    }

    fn restore(&mut self, saved: SavedState<'a>) {
        self.current = saved.current;
        self.lexer
            .set_position(saved.position, saved.line, saved.column);
    }

    /// `parse_expression(min_precedence)` (`SPEC_FULL.md` 4.2): parse one
    /// simple expression, then repeatedly absorb infix operators whose
    /// precedence is strictly greater than `min_precedence`, recursing with
    /// the operator's own precedence as the new floor. The strict `>` test
    /// (equivalently, looping only while precedence is above the floor) is
    /// what makes same-precedence chains left-associative.
    pub(crate) fn parse_expression(&mut self, min_precedence: u8) -> ParseResult<Expr<'a>> {
        let mut lhs = match self.parse_simple_expression() {
            ParseResult::Success(e) => e,
            other => return other,
        };

        loop {
            let op = match self.current_operator() {
                Some(op) if op.precedence() > min_precedence => op,
                _ => break,
            };
            let op_span = self.current.span;
            self.bump();

            let rhs = match self.parse_expression(op.precedence()) {
                ParseResult::Success(e) => e,
                ParseResult::NotMine => {
                    self.error_here("expression expected");
                    return ParseResult::Error;
                }
                ParseResult::Error => return ParseResult::Error,
            };

            let span = lhs.span().to(rhs.span()).to(op_span);
            let lhs_ref = self.arena.alloc(lhs);
            let rhs_ref = self.arena.alloc(rhs);
            lhs = Expr::BinaryOp(op, lhs_ref, rhs_ref, span);
        }

        ParseResult::Success(lhs)
    }

    /// `simple := 'null' | bool | int | float | string | call | ident`
    /// (`SPEC_FULL.md` section 6).
    fn parse_simple_expression(&mut self) -> ParseResult<Expr<'a>> {
        let span = self.current.span;

        if self.current.kind == TokenKind::Boolean {
            let value = self.current.text == "true";
            self.bump();
            return ParseResult::Success(Expr::Boolean(value, span));
        }
        if self.current.kind == TokenKind::Identifier && self.current.text == "null" {
            self.bump();
            return ParseResult::Success(Expr::Null(span));
        }
        if self.current.kind == TokenKind::Integer {
            let text = self.current.text;
            self.bump();
            return ParseResult::Success(Expr::Integer(parse_integer_literal(text), span));
        }
        if self.current.kind == TokenKind::Decimal {
            let text = self.current.text;
            self.bump();
            return ParseResult::Success(Expr::Float(parse_decimal_literal(text), span));
        }
        if self.current.kind == TokenKind::String {
            let text = self.current.text;
            self.bump();
            let units = evaluate_string_escapes(text);
            let units: &'a [u16] = self.arena.alloc_slice_copy(&units);
            return ParseResult::Success(Expr::String(units, span));
        }
        if self.current.kind == TokenKind::Identifier {
            return self.parse_call_or_name();
        }

        ParseResult::NotMine
    }

    /// Call-vs-name disambiguation (`SPEC_FULL.md` 4.2): saves the scanner
    /// state, consumes the identifier, and peeks for `(`. If absent, rewinds
    /// so the caller sees a bare `Name`.
    fn parse_call_or_name(&mut self) -> ParseResult<Expr<'a>> {
        let span = self.current.span;
        let name_text = self.current.text;
        let saved = self.save();
        self.bump(); // identifier

        if self.at_punct("(") {
            let name = self.intern(name_text);
            match self.parse_call_arguments() {
                ParseResult::Success((args, end_span)) => {
                    return ParseResult::Success(Expr::Call(CallExpr {
                        name,
                        args,
                        span: span.to(end_span),
                    }));
                }
                ParseResult::Error => return ParseResult::Error,
                ParseResult::NotMine => unreachable!("'(' was already confirmed"),
            }
        }

        self.restore(saved);
        let name = self.intern(name_text);
        self.bump();
        ParseResult::Success(Expr::Name(name, span))
    }

    /// `call := ident '(' (expr (',' expr)*)? ')'`, called with `current`
    /// already positioned on the opening `(`.
    fn parse_call_arguments(&mut self) -> ParseResult<(&'a [Expr<'a>], Span)> {
        self.bump(); // '('
        let mut args = Vec::new();

        if !self.at_punct(")") {
            loop {
                match self.parse_expression(0) {
                    ParseResult::Success(e) => args.push(e),
                    ParseResult::NotMine => {
                        self.error_here("expression expected");
                        return ParseResult::Error;
                    }
                    ParseResult::Error => return ParseResult::Error,
                }
                if !self.eat_punct(",") {
                    break;
                }
            }
        }

        let end_span = self.current.span;
        if !self.expect_punct(")") {
            return ParseResult::Error;
        }
        ParseResult::Success((self.alloc_slice(args), end_span))
    }
}

/// Parses an integer literal in base-10 or, given a `0x`/`0X` prefix, base-16
/// (`SPEC_FULL.md` 4.2). Malformed digit text cannot reach here: the lexer
/// only ever produces `Integer` tokens over `[0-9]+` or `0[xX][0-9a-fA-F]+`.
fn parse_integer_literal(text: &str) -> i32 {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i32::from_str_radix(hex, 16).unwrap_or(0)
    } else {
        text.parse::<i32>().unwrap_or(0)
    }
}

/// Parses `ipart '.' fpart` as `ipart + fpart / 10^ndigits` (`SPEC_FULL.md`
/// 4.2) rather than delegating to `str::parse::<f32>`, matching the original
/// source's digit-by-digit accumulation instead of a general float parser.
fn parse_decimal_literal(text: &str) -> f32 {
    let (ipart, fpart) = text.split_once('.').unwrap_or((text, ""));
    let int_value: f32 = ipart.parse().unwrap_or(0.0);
    if fpart.is_empty() {
        return int_value;
    }
    let frac_value: f32 = fpart.parse().unwrap_or(0.0);
    let scale = 10f32.powi(fpart.len() as i32);
    int_value + frac_value / scale
}

/// Evaluates escape sequences in a raw string token's text (including its
/// surrounding quotes) into a null-terminated UTF-16 code-unit vector
/// (`SPEC_FULL.md` 4.2). Supported escapes: `\a \b \f \n \r \t \v \' \" \\ \?`;
/// any other `\c` emits `c` literally, matching the original scanner's
/// escape table.
fn evaluate_string_escapes(raw: &str) -> Vec<u16> {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);

    let mut out = Vec::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c as u16);
            continue;
        }
        match chars.next() {
            Some('a') => out.push(0x07),
            Some('b') => out.push(0x08),
            Some('f') => out.push(0x0C),
            Some('n') => out.push(b'\n' as u16),
            Some('r') => out.push(b'\r' as u16),
            Some('t') => out.push(b'\t' as u16),
            Some('v') => out.push(0x0B),
            Some('\'') => out.push(b'\'' as u16),
            Some('"') => out.push(b'"' as u16),
            Some('\\') => out.push(b'\\' as u16),
            Some('?') => out.push(b'?' as u16),
            Some(other) => out.push(other as u16),
            None => {}
        }
    }
    out.push(0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_literal_matches_digit_accumulation() {
        assert_eq!(parse_decimal_literal("3.14"), 3.0 + 14.0 / 100.0);
    }

    #[test]
    fn hex_integer_literal() {
        assert_eq!(parse_integer_literal("0x1F"), 0x1F);
    }

    #[test]
    fn escape_table_matches_spec() {
        let units = evaluate_string_escapes(r#""a\nb\"c""#);
        let expected: Vec<u16> = "a\nb\"c\0".encode_utf16().collect();
        assert_eq!(units, expected);
    }

    #[test]
    fn unknown_escape_emits_literal_char() {
        let units = evaluate_string_escapes(r#""\q""#);
        assert_eq!(units, vec!['q' as u16, 0]);
    }
}
