//! Core utilities shared by the lexer, parser, and IR compiler: source spans
//! and diagnostics, interned symbols, the AST arena, and the fixed language
//! tables (keywords, operators, built-in types).

pub mod arena;
pub mod diagnostic;
pub mod lang;
pub mod span;
pub mod symbol;

pub use arena::Arena;
pub use diagnostic::{Diagnostic, DiagnosticBuilder, Handler, Level};
pub use lang::{MSOperator, MSType, KEYWORDS, OPERATORS};
pub use span::Span;
pub use symbol::{Interner, Symbol};
