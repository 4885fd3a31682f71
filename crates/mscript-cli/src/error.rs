//! Error handling for the `msc` driver (`SPEC_FULL.md` section 4.9).
//!
//! Distinct from [`mscript_jit::JitError`]: that enum covers the embedding
//! API's own failures (bad import descriptors, linking). This one covers the
//! driver's own concerns — reading the source file, and a script that failed
//! to compile (already reported to stderr by the syntax-error callback by
//! the time this variant is raised, so it carries no message of its own).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to read '{path}': {source}")]
    ReadSource { path: String, #[source] source: std::io::Error },

    #[error("compilation failed")]
    CompileFailed,

    #[error(transparent)]
    Jit(#[from] mscript_jit::JitError),
}
