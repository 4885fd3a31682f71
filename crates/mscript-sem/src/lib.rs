//! Symbol/Scope tables (C9, ADDED — `SPEC_FULL.md` section 4.7).
//!
//! A small compile-time-only module shared by the parser (for resolving
//! `<type>` tokens, via `mscript_util::MSType` directly) and the IR compiler
//! (for the scope stack of section 4.3 and the global function/variable
//! symbol table of section 3). This crate owns only data structures and
//! lookups; the IR compiler is the one that turns a failed lookup into a
//! reported diagnostic, since only it knows the source span involved.

pub mod scope;

pub use scope::{LocalVar, Scope, ScopeKind, ScopeStack};

use rustc_hash::FxHashMap;

use mscript_util::{MSType, Symbol};

/// Part of the external ABI (`SPEC_FULL.md` section 6): imported/exported
/// function descriptors cap their parameter list at 10; the compiler must
/// reject script-defined functions exceeding it too.
pub const MAX_PARAMS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallingConvention {
    CDecl,
    StdCall,
}

/// `{return_type, param_types[≤10], calling_convention}` — the
/// `param_count` field of `SPEC_FULL.md` section 3 is just `param_types.len()`
/// here rather than a separately tracked count.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub return_type: MSType,
    pub param_types: Vec<MSType>,
    pub calling_convention: CallingConvention,
}

impl FunctionSignature {
    pub fn param_count(&self) -> usize {
        self.param_types.len()
    }

    pub fn exceeds_param_cap(&self) -> bool {
        self.param_types.len() > MAX_PARAMS
    }
}

#[derive(Debug, Clone)]
pub enum SymbolKind {
    Variable(MSType),
    Function(FunctionSignature),
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: Symbol,
    pub kind: SymbolKind,
}

/// The flat, module-wide function/variable symbol table (`SPEC_FULL.md`
/// section 3 "Symbol"). Global-scope locals declared via `ScopeStack`'s
/// Global scope and top-level function definitions both register here, so
/// a call site can resolve a name regardless of declaration order relative
/// to use — matching the original source's single-pass-with-forward-lookup
/// behavior for function names.
#[derive(Debug, Default)]
pub struct GlobalTable {
    entries: FxHashMap<Symbol, SymbolEntry>,
}

impl GlobalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `name` was already declared (a redefinition —
    /// the caller reports this as a compile error).
    pub fn declare(&mut self, entry: SymbolEntry) -> bool {
        if self.entries.contains_key(&entry.name) {
            return false;
        }
        self.entries.insert(entry.name, entry);
        true
    }

    pub fn lookup(&self, name: Symbol) -> Option<&SymbolEntry> {
        self.entries.get(&name)
    }

    pub fn lookup_function(&self, name: Symbol) -> Option<&FunctionSignature> {
        match self.lookup(name)?.kind {
            SymbolKind::Function(ref sig) => Some(sig),
            SymbolKind::Variable(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_util::Interner;

    #[test]
    fn redeclaration_is_rejected() {
        let mut interner = Interner::new();
        let name = Symbol::intern(&mut interner, "f");
        let mut table = GlobalTable::new();
        assert!(table.declare(SymbolEntry {
            name,
            kind: SymbolKind::Variable(MSType::Integer),
        }));
        assert!(!table.declare(SymbolEntry {
            name,
            kind: SymbolKind::Variable(MSType::Float),
        }));
    }

    #[test]
    fn function_signature_param_cap() {
        let sig = FunctionSignature {
            return_type: MSType::Void,
            param_types: vec![MSType::Integer; MAX_PARAMS + 1],
            calling_convention: CallingConvention::CDecl,
        };
        assert!(sig.exceeds_param_cap());
    }

    #[test]
    fn lookup_function_distinguishes_from_variable() {
        let mut interner = Interner::new();
        let name = Symbol::intern(&mut interner, "x");
        let mut table = GlobalTable::new();
        table.declare(SymbolEntry {
            name,
            kind: SymbolKind::Variable(MSType::Boolean),
        });
        assert!(table.lookup_function(name).is_none());
    }
}
