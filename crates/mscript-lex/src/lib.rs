//! The lexer (C3): turns source bytes into a token stream with positions.
//! See `SPEC_FULL.md` section 4.1.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::Lexer;
pub use token::{Token, TokenKind};
