//! Host-side string marshaling (`SPEC_FULL.md` section 6: `alloc-string`,
//! `free-string`, `get-string`), grounded on
//! `original_source/MyScript/MyScript.h`'s `MSAllocString`/`MSFreeString`/
//! `MSGetString`, built directly on the runtime's own refcount primitives
//! (`SPEC_FULL.md` section 4.4) rather than duplicating their logic.

use mscript_runtime::{hdldec, strgetptr, stralloc, Handle};

/// A refcount=1 string handle allocated by the host, for passing into a
/// script's imported host functions or reading a script's output.
pub struct HostString {
    handle: *mut Handle,
}

impl HostString {
    /// `MSAllocString`. Copies `units` (UTF-16 code units; include a
    /// trailing `0` if the receiving side expects one, same as script-owned
    /// strings do) into a freshly allocated, refcount=1 handle.
    pub fn alloc(units: &[u16]) -> Self {
        let handle = unsafe { stralloc(units.as_ptr(), units.len() as i32) };
        Self { handle }
    }

    /// Wraps a handle a script already produced (e.g. an exported
    /// function's `String` return value), taking ownership of its refcount.
    ///
    /// # Safety
    /// `handle` must be a valid `Handle` pointer (or null) produced by this
    /// runtime, not already owned by another `HostString`.
    pub unsafe fn from_raw(handle: *mut Handle) -> Self {
        Self { handle }
    }

    /// `MSGetString`. Projects the raw code-unit pointer, for passing to a
    /// host function that accepts one directly. Null if the handle itself,
    /// or its body, is null.
    pub fn as_ptr(&self) -> *const u16 {
        unsafe { strgetptr(self.handle) }
    }

    pub fn as_raw(&self) -> *const Handle {
        self.handle
    }
}

impl Drop for HostString {
    /// `MSFreeString`.
    fn drop(&mut self) {
        unsafe { hdldec(self.handle) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_then_project_round_trips_the_code_units() {
        let units: Vec<u16> = "hi".encode_utf16().chain(std::iter::once(0)).collect();
        let s = HostString::alloc(&units);
        let ptr = s.as_ptr();
        assert!(!ptr.is_null());
        let read_back = unsafe { std::slice::from_raw_parts(ptr, units.len()) };
        assert_eq!(read_back, units.as_slice());
    }
}
