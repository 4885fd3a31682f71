//! Compiled-expression value tagging (`SPEC_FULL.md` section 4.3
//! "L-values vs R-values").
//!
//! Every compiled expression carries its static type and whether it denotes
//! a storage location (an already-owned reference, incremented on copy) or a
//! transient result (a reference the producer hands off, decremented once
//! consumed). This tag is what the refcount discipline dispatches on.

use inkwell::values::BasicValueEnum;

use mscript_util::MSType;

#[derive(Clone, Copy)]
pub struct Value<'ctx> {
    pub raw: BasicValueEnum<'ctx>,
    pub ty: MSType,
    pub is_lvalue: bool,
}

impl<'ctx> Value<'ctx> {
    pub fn rvalue(raw: BasicValueEnum<'ctx>, ty: MSType) -> Self {
        Self {
            raw,
            ty,
            is_lvalue: false,
        }
    }

    pub fn lvalue(raw: BasicValueEnum<'ctx>, ty: MSType) -> Self {
        Self {
            raw,
            ty,
            is_lvalue: true,
        }
    }

    /// A transient String result nobody else owns — the site that consumes
    /// it must emit a decrement once it's done.
    pub fn is_refcounted_rvalue(&self) -> bool {
        !self.is_lvalue && self.ty == MSType::String
    }
}
