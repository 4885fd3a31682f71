//! Diagnostic severity.

/// Severity of a diagnostic.
///
/// The embedding API (section 6 of `SPEC_FULL.md`) only ever surfaces errors
/// through its callback, so `Level` is kept to a single variant today; it is
/// still a real enum (not a unit struct) so a future `Warning` level doesn't
/// require touching every call site that builds a `Diagnostic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
        }
    }
}
