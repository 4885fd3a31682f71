//! Type mapping and numeric promotion (`SPEC_FULL.md` section 4.3).
//!
//! Grounded on the teacher's `faxc-gen::types::TypeMapper` shape, but this
//! mapping is load-bearing (the teacher's own version is a stub that always
//! returns `i64`): `Integer -> i32`, `Float -> f32`, `Boolean -> i1`,
//! `Void -> void`, `String -> pointer` (to a `Handle`, `SPEC_FULL.md`
//! section 3).

use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, PointerType, StructType};
use inkwell::AddressSpace;

use mscript_util::MSType;

/// The two runtime struct shapes every string value is built from: `Handle`
/// (`{refcount: i32, ptr: *Body}`) and `Body` (`{size: i32, data: [u16; 0]}`,
/// a flexible-array-member idiom). Both are opaque to the type system;
/// scripts only ever hold a pointer to a `Handle`.
pub struct TypeTables<'ctx> {
    pub handle_type: StructType<'ctx>,
    pub body_type: StructType<'ctx>,
    pub ptr_type: PointerType<'ctx>,
}

impl<'ctx> TypeTables<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        let ptr_type = context.ptr_type(AddressSpace::default());

        let handle_type = context.opaque_struct_type("Handle");
        handle_type.set_body(&[context.i32_type().into(), ptr_type.into()], false);

        let body_type = context.opaque_struct_type("Body");
        body_type.set_body(
            &[
                context.i32_type().into(),
                context.i16_type().array_type(0).into(),
            ],
            false,
        );

        Self {
            handle_type,
            body_type,
            ptr_type,
        }
    }

    pub fn basic_type(&self, context: &'ctx Context, ty: MSType) -> BasicTypeEnum<'ctx> {
        match ty {
            MSType::Integer => context.i32_type().into(),
            MSType::Float => context.f32_type().into(),
            MSType::Boolean => context.bool_type().into(),
            MSType::String => self.ptr_type.into(),
            MSType::Void => unreachable!("Void has no runtime representation"),
        }
    }
}

/// The symmetric "widest type wins" promotion table: `Float` beats
/// everything, `Integer` beats `Boolean`, same-type pairs are unchanged
/// (`SPEC_FULL.md` section 4.3 "Numeric promotion"). Only ever called on
/// numeric operand pairs — `And`/`Or` coerce to `Boolean` directly instead.
pub fn promote(a: MSType, b: MSType) -> MSType {
    use MSType::*;
    match (a, b) {
        (Float, _) | (_, Float) => Float,
        (Integer, _) | (_, Integer) => Integer,
        _ => a,
    }
}
