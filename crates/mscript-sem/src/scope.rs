//! Compile-time scope stack (`SPEC_FULL.md` section 3 "Scope (compile-time)"
//! and section 4.3 "Scope machinery").
//!
//! Grounded on the teacher's `faxc-sem::scope::{Rib, RibKind, ScopeTree}`
//! shape but simplified: this language has no nested lexical closures, so a
//! plain stack with top-down linear search — not a parent-pointer rib tree —
//! is both simpler and more faithful to the original source's flat
//! `Vec<ScopeInfo>` model (see `SPEC_FULL.md` section 9).
//!
//! The basic-block and local-storage types (`B`, `V`) are left generic so
//! this crate stays free of any backend dependency; `mscript-ir` instantiates
//! them with `inkwell::basic_block::BasicBlock<'ctx>` and
//! `inkwell::values::PointerValue<'ctx>`.

use rustc_hash::FxHashMap;

use mscript_util::{MSType, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    While,
    If,
}

/// A local variable's compile-time type plus its backend storage handle.
#[derive(Debug, Clone, Copy)]
pub struct LocalVar<V> {
    pub ty: MSType,
    pub storage: V,
}

/// One entry on the scope stack. `start_block`/`exit_block` are only ever
/// `Some` for `ScopeKind::While` (used as the continue/break targets) — see
/// the invariant in `SPEC_FULL.md` section 3.
pub struct Scope<B, V> {
    pub kind: ScopeKind,
    pub start_block: Option<B>,
    pub exit_block: Option<B>,
    locals: FxHashMap<Symbol, LocalVar<V>>,
}

impl<B, V> Scope<B, V> {
    fn new(kind: ScopeKind, start_block: Option<B>, exit_block: Option<B>) -> Self {
        Self {
            kind,
            start_block,
            exit_block,
            locals: FxHashMap::default(),
        }
    }
}

/// The scope stack, ordered from outermost (`Global`, index 0) to innermost.
pub struct ScopeStack<B, V> {
    scopes: Vec<Scope<B, V>>,
}

impl<B, V> ScopeStack<B, V> {
    /// Creates a stack with the single Global scope already pushed.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global, None, None)],
        }
    }

    pub fn push_scope(&mut self, kind: ScopeKind, start_block: Option<B>, exit_block: Option<B>) {
        self.scopes.push(Scope::new(kind, start_block, exit_block));
    }

    /// Removes the innermost scope. Panics if only the Global scope remains
    /// — callers never pop the scope stack empty.
    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the Global scope");
        self.scopes.pop();
    }

    pub fn declare_local(&mut self, name: Symbol, local: LocalVar<V>) {
        self.scopes
            .last_mut()
            .expect("scope stack is never empty")
            .locals
            .insert(name, local);
    }

    /// Resolves a name by linear search from innermost to outermost scope.
    pub fn lookup(&self, name: Symbol) -> Option<&LocalVar<V>> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.locals.get(&name))
    }

    /// Locals declared directly in scope `index`, for `destroy_scope_variables`
    /// (`SPEC_FULL.md` 4.3) — the IR compiler walks these and emits a
    /// decrement for each String-typed local.
    pub fn locals_in(&self, index: usize) -> impl Iterator<Item = (&Symbol, &LocalVar<V>)> {
        self.scopes[index].locals.iter()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn scope_at(&self, index: usize) -> &Scope<B, V> {
        &self.scopes[index]
    }

    /// Walks the stack from the top for the nearest `While` scope, for
    /// break/continue target resolution. `None` means break/continue
    /// outside a loop — a compile error.
    pub fn current_loop_scope(&self) -> Option<usize> {
        self.scopes
            .iter()
            .rposition(|scope| scope.kind == ScopeKind::While)
    }

    /// Walks the stack from the top for the nearest `Function` scope, for
    /// return-statement destruction. `None` means return outside a function
    /// — a compile error (unreachable for well-formed input since the
    /// module entrypoint's top-level statements are themselves compiled
    /// under a synthesized Function scope, but kept as a real error path
    /// rather than an assumed invariant).
    pub fn current_function_scope(&self) -> Option<usize> {
        self.scopes
            .iter()
            .rposition(|scope| scope.kind == ScopeKind::Function)
    }
}

impl<B, V> Default for ScopeStack<B, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_util::Interner;

    fn sym(interner: &mut Interner, s: &str) -> Symbol {
        Symbol::intern(interner, s)
    }

    #[test]
    fn lookup_finds_innermost_shadowing_declaration() {
        let mut interner = Interner::new();
        let x = sym(&mut interner, "x");
        let mut stack: ScopeStack<(), i32> = ScopeStack::new();
        stack.declare_local(x, LocalVar { ty: MSType::Integer, storage: 1 });
        stack.push_scope(ScopeKind::If, None, None);
        stack.declare_local(x, LocalVar { ty: MSType::Integer, storage: 2 });
        assert_eq!(stack.lookup(x).unwrap().storage, 2);
        stack.pop_scope();
        assert_eq!(stack.lookup(x).unwrap().storage, 1);
    }

    #[test]
    fn current_loop_scope_finds_nearest_while_through_if() {
        let mut stack: ScopeStack<(), ()> = ScopeStack::new();
        stack.push_scope(ScopeKind::Function, None, None);
        stack.push_scope(ScopeKind::While, Some(()), Some(()));
        let loop_index = stack.current_loop_scope();
        stack.push_scope(ScopeKind::If, None, None);
        assert_eq!(stack.current_loop_scope(), loop_index);
        assert!(loop_index.is_some());
    }

    #[test]
    fn current_loop_scope_none_outside_any_loop() {
        let stack: ScopeStack<(), ()> = ScopeStack::new();
        assert_eq!(stack.current_loop_scope(), None);
    }
}
