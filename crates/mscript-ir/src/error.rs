//! IR compiler errors (`SPEC_FULL.md` section 7).
//!
//! Grounded on the teacher's `faxc-gen::error::CodeGenError` shape — a flat
//! `thiserror` enum plus a crate-local `Result` alias — narrowed to the
//! failure modes this compiler can actually hit, since it has no register
//! allocator or stack-frame layer of its own to report on.

use thiserror::Error;

use mscript_util::{MSOperator, MSType, Span};

#[derive(Debug, Error)]
pub enum IrError {
    #[error("use of undeclared name")]
    UndefinedSymbol,

    #[error("operator {op:?} requires numeric operands, found {lhs_ty:?} and {rhs_ty:?}")]
    TypeMismatch { op: MSOperator, lhs_ty: MSType, rhs_ty: MSType, span: Span },

    #[error("'{0}' is already defined")]
    Redefinition(String),

    #[error("'break' outside a loop")]
    IllegalBreak,

    #[error("'continue' outside a loop")]
    IllegalContinue,

    #[error("'return' outside a function")]
    IllegalReturn,

    #[error("a global variable's initializer must be a constant literal")]
    NonConstantGlobalInitializer,

    #[error("function '{0}' declares {1} parameters, exceeding the limit of {2}")]
    TooManyParameters(String, usize, usize),

    #[error("a call result of type void cannot be used as a value")]
    VoidUsedAsValue,

    #[error("LLVM builder operation failed: {0}")]
    Builder(String),
}

impl IrError {
    /// The source location to report this error at, when one was captured.
    /// Most variants have no associated span yet — callers fall back to the
    /// compile's start (`SPEC_FULL.md` section 6 callback shape still needs
    /// *some* line/column even then).
    pub fn span(&self) -> Option<Span> {
        match self {
            IrError::TypeMismatch { span, .. } => Some(*span),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, IrError>;
