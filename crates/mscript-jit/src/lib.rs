//! The JIT context (C7) and script record (C8) (`SPEC_FULL.md` sections 4.5,
//! 4.6), plus the public embedding API of section 6: `Context::create`,
//! `Context::compile`, `Context::execute`, and the `Script` export table,
//! translated from `original_source/MyScript/MyScript.h`'s
//! `MSCreateContext`/`MSCompile`/`MSExecute`/`MSGetFirstSymbol`/
//! `MSGetNextSymbol` into idiomatic Rust types rather than opaque handles.

pub mod context;
pub mod error;
pub mod script;
pub mod strings;
pub mod symbol;

pub use context::Context;
pub use error::{JitError, Result};
pub use script::{ExportedSymbol, Script, ScriptValue};
pub use strings::HostString;
pub use symbol::{CallingConvention, ImportedSymbol, ImportedSymbolData, SyntaxErrorCallback};
