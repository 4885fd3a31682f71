//! Host-symbol import descriptors (`SPEC_FULL.md` section 6, "Imported
//! symbol descriptor"), grounded on `original_source/MyScript/MyScript.h`'s
//! `MSSymbol`/`MSSymbolType`/`MSCallingConvention` trio.
//!
//! The original packs `MSSymbol` as a single C struct with a `type` tag
//! selecting one of two inline unions (`functionData`/`variableData`); the
//! idiomatic shape here is the same information as a Rust enum, so a
//! variable-kind import simply has no parameter list to get wrong.

pub use mscript_sem::CallingConvention;
use mscript_util::MSType;

#[derive(Debug, Clone)]
pub enum ImportedSymbolData {
    Function {
        return_type: MSType,
        param_types: Vec<MSType>,
        calling_convention: CallingConvention,
    },
    Variable {
        ty: MSType,
    },
}

/// One host-supplied symbol made available to a script being compiled. A
/// verbatim copy of the list passed to [`crate::Context::compile`] is kept
/// in the returned [`crate::Script`] (`SPEC_FULL.md` section 4.6).
#[derive(Debug, Clone)]
pub struct ImportedSymbol {
    pub name: String,
    pub address: usize,
    pub data: ImportedSymbolData,
}

impl ImportedSymbol {
    pub fn exceeds_param_cap(&self) -> bool {
        match &self.data {
            ImportedSymbolData::Function { param_types, .. } => param_types.len() > mscript_sem::MAX_PARAMS,
            ImportedSymbolData::Variable { .. } => false,
        }
    }
}

/// `(module_name, line, column, message)`, 1-origin line and column
/// (`SPEC_FULL.md` section 6, "Syntax-error callback"). A boxed closure
/// replaces the original's C function-pointer-plus-opaque-userdata pair —
/// Rust closures already carry their own captured state.
pub type SyntaxErrorCallback<'a> = dyn FnMut(&str, u32, u32, &str) + 'a;
