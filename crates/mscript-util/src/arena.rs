//! Bump-allocated AST storage (C1).
//!
//! Per `SPEC_FULL.md`/spec.md section 9 ("Arena for AST"): the AST has a
//! single lifetime spanning parse start through IR compilation, is never
//! partially freed, and is a tree (no ownership cycles), so a bump allocator
//! releasing everything as one unit is the right fit. This is a thin
//! re-export over `bumpalo::Bump` rather than a hand-rolled allocator — the
//! teacher's other crates already pull in `bumpalo` for exactly this role.

pub use bumpalo::Bump as Arena;
pub use bumpalo::collections::Vec as ArenaVec;

/// Allocates a slice of arena-owned children, copied from an iterator; used
/// throughout the parser to collect parameter lists and statement bodies.
pub fn alloc_slice<'a, T, I>(arena: &'a Arena, items: I) -> &'a [T]
where
    I: IntoIterator<Item = T>,
{
    arena.alloc_slice_fill_iter(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_slice_round_trips_values() {
        let arena = Arena::new();
        let slice = alloc_slice(&arena, vec![1, 2, 3]);
        assert_eq!(slice, &[1, 2, 3]);
    }
}
