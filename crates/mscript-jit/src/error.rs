//! JIT context errors (`SPEC_FULL.md` section 7).
//!
//! A compile's syntax/semantic errors are reported through the host's
//! callback, never as a `Result::Err` here (`SPEC_FULL.md` section 6: compile
//! returns a null script handle on failure, nothing more specific) — so this
//! enum only covers failures the JIT layer itself can hit once parsing and
//! IR generation have already succeeded: bad import descriptors, and the
//! backend's own linking/lookup failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JitError {
    #[error("import '{0}' exceeds the 10-parameter ABI limit")]
    TooManyParameters(String),

    #[error("duplicate imported symbol '{0}'")]
    DuplicateImport(String),

    #[error("failed to create the JIT execution engine: {0}")]
    ExecutionEngine(String),

    #[error("exported function '{0}' has no resolved native address")]
    UnresolvedExport(String),

    #[error("'{0}' is not an exported function of this script")]
    UnknownExport(String),

    #[error("exported function '{0}' takes parameters; the driver can only call nullary exports")]
    UnsupportedExportSignature(String),
}

pub type Result<T> = std::result::Result<T, JitError>;
