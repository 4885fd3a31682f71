//! Fluent construction of a [`Diagnostic`], ending in `.emit(handler)`.

use super::{Diagnostic, Handler};
use crate::diagnostic::level::Level;
use crate::span::Span;

/// Builds a single diagnostic. Consumed by [`DiagnosticBuilder::emit`].
pub struct DiagnosticBuilder {
    level: Level,
    message: String,
    span: Span,
}

impl DiagnosticBuilder {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
            span: Span::DUMMY,
        }
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn emit(self, handler: &mut Handler) {
        handler.emit(Diagnostic {
            level: self.level,
            message: self.message,
            span: self.span,
        });
    }
}
