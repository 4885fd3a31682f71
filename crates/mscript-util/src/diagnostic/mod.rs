//! Diagnostic collection for one compile call.
//!
//! The lexer, parser, and IR compiler each report errors by building a
//! [`Diagnostic`] through [`DiagnosticBuilder`] and emitting it into a shared
//! [`Handler`]. The embedding API drains the handler into the host's
//! `(module, line, column, message)` callback once compilation stops.

pub mod builder;
pub mod level;

pub use builder::DiagnosticBuilder;
pub use level::Level;

use crate::span::Span;

/// A single reported error, with its source location.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub span: Span,
}

/// Accumulates diagnostics raised during one `compile` call.
///
/// Per `SPEC_FULL.md` section 7, compile is first-error-stops: once any
/// diagnostic has been emitted, callers of the parser/IR compiler treat the
/// whole compile as failed, but the handler still collects every diagnostic
/// reported up to that point so the host callback can fire for each of them.
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: Vec<Diagnostic>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drain all diagnostics, e.g. to hand them to the host error callback.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_message_and_span() {
        let mut handler = Handler::new();
        let span = Span::new(3, 7, 2, 1);
        DiagnosticBuilder::error("missing closing quote")
            .span(span)
            .emit(&mut handler);

        assert!(handler.has_errors());
        let diags = handler.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "missing closing quote");
        assert_eq!(diags[0].span, span);
    }

    #[test]
    fn take_drains_and_resets() {
        let mut handler = Handler::new();
        DiagnosticBuilder::error("x").emit(&mut handler);
        let drained = handler.take();
        assert_eq!(drained.len(), 1);
        assert!(!handler.has_errors());
    }
}
