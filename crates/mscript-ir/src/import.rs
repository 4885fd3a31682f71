//! Host-symbol imports (`SPEC_FULL.md` section 6, "Imported symbol
//! descriptor"), the IR compiler's side of the embedding API's import list.
//!
//! This is deliberately a smaller type than the public ABI descriptor: it
//! carries only what `compile_program` needs to declare an external LLVM
//! symbol and register it in the function/variable table — a name and a
//! type signature. The host-supplied address and calling convention are the
//! JIT context's concern (`mscript-jit`), not the compiler's; this crate
//! never looks at an address, since it only emits calls, it never resolves
//! them to native code.

use mscript_util::{MSType, Symbol};

pub enum ImportKind {
    Function { return_type: MSType, param_types: Vec<MSType> },
    Variable { ty: MSType },
}

/// One host symbol made visible to the script being compiled. `name` must
/// already be interned through the same [`mscript_util::Interner`] passed to
/// `compile`/`compile_program` — a script can only call or read a host
/// symbol under a name it actually uses, so the caller interns host names
/// the same way the parser interns identifiers it reads from source.
pub struct Import {
    pub name: Symbol,
    pub kind: ImportKind,
}
