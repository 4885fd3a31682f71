//! The interner backing [`super::Symbol`].

use rustc_hash::FxHashMap;

/// Interns strings into stable, cheaply-copyable [`super::Symbol`] handles.
///
/// Grounded on the teacher's `faxc-util::symbol` interner, but scoped to a
/// single compile: the teacher's interner is a lock-free, process-global
/// `DashMap` because its compiler resolves identifiers across many files and
/// threads. This language compiles one source buffer on one thread per
/// `SPEC_FULL.md` section 5, so a plain owned `FxHashMap` + `Vec` pair is
/// both simpler and faithful to the actual concurrency model; `dashmap` and
/// `ahash` are dropped accordingly (see `DESIGN.md`).
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, u32>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = self.strings.len() as u32;
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    pub fn resolve(&self, id: u32) -> &str {
        &self.strings[id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_text_returns_the_same_id() {
        let mut interner = Interner::new();
        let a = interner.intern("hello");
        let b = interner.intern("hello");
        let c = interner.intern("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a), "hello");
        assert_eq!(interner.resolve(c), "world");
    }

    #[quickcheck_macros::quickcheck]
    fn interning_round_trips_for_any_string(s: String) -> bool {
        let mut interner = Interner::new();
        let id = interner.intern(&s);
        interner.resolve(id) == s
    }
}
