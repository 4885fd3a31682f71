//! A byte cursor over source text, tracking line/column for diagnostics.
//!
//! `SPEC_FULL.md` section 4.1 frames the lexer as operating on a byte slice
//! plus a current index, with all state folded into that index — this
//! cursor is exactly that, plus the line/column bookkeeping `Scanner.hpp`
//! keeps alongside its index for error reporting.

pub struct Cursor<'a> {
    source: &'a [u8],
    position: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source: source.as_bytes(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    pub fn current_byte(&self) -> u8 {
        self.source.get(self.position).copied().unwrap_or(0)
    }

    pub fn peek_byte(&self, offset: usize) -> u8 {
        self.source.get(self.position + offset).copied().unwrap_or(0)
    }

    pub fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.current_byte() == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn source(&self) -> &'a [u8] {
        self.source
    }

    /// Jumps the cursor back to an earlier position, recomputing line/column
    /// by rescanning from the start. Used only for the parser's call-vs-name
    /// scanner rewind (`SPEC_FULL.md` 4.2), which never rewinds past the
    /// current statement, so the rescan cost is small.
    pub fn set_position(&mut self, position: usize, line: u32, column: u32) {
        self.position = position;
        self.line = line;
        self.column = column;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_line_and_column() {
        let mut cursor = Cursor::new("ab\ncd");
        assert_eq!((cursor.line(), cursor.column()), (1, 1));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (1, 2));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (1, 3));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
    }

    #[test]
    fn set_position_restores_saved_state() {
        let mut cursor = Cursor::new("function foo()");
        let saved = (cursor.position(), cursor.line(), cursor.column());
        cursor.advance();
        cursor.advance();
        cursor.set_position(saved.0, saved.1, saved.2);
        assert_eq!(cursor.position(), saved.0);
    }
}
