//! AST → LLVM IR compilation (C6, `SPEC_FULL.md` section 4.3).
//!
//! Grounded on the teacher's `faxc-gen::llvm::LlvmBackend` — the same
//! `{context, module, builder}` shape and the same `module.add_function(...,
//! Some(Linkage::External))` pattern for declaring intrinsics — but this
//! compiler goes straight from AST to IR with a single `Builder`, rather
//! than lowering through the teacher's separate LIR stage, since the
//! distilled language has no register-allocation concerns of its own:
//! `inkwell`'s instruction builder already *is* the target representation.

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::types::BasicMetadataTypeEnum;
use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, FunctionValue, IntValue, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use rustc_hash::FxHashMap;

use mscript_par::{CallExpr, Expr, Function, Item, Param, Program, Stmt};
use mscript_sem::{CallingConvention, FunctionSignature, GlobalTable, LocalVar, ScopeKind, ScopeStack, SymbolEntry, SymbolKind};
use mscript_util::{Interner, MSOperator, MSType, Symbol};

use crate::error::{IrError, Result};
use crate::import::{Import, ImportKind};
use crate::types::{promote, TypeTables};
use crate::value::Value;

fn builder_err(e: inkwell::builder::BuilderError) -> IrError {
    IrError::Builder(e.to_string())
}

/// Signature of a script-callable runtime string intrinsic, or `None` if
/// `name` isn't one (`SPEC_FULL.md` section 4.4's `strlen`/`strcat`/
/// `strcmp`/`substr`; `hdlinc`/`hdldec`/`strgetptr` are compiler-internal
/// and deliberately excluded).
fn builtin_signature(name: &str) -> Option<(MSType, &'static [MSType])> {
    use mscript_runtime::names::{STRCAT, STRCMP, STRLEN, SUBSTR};
    match name {
        STRLEN => Some((MSType::Integer, &[MSType::String])),
        STRCAT => Some((MSType::String, &[MSType::String, MSType::String])),
        STRCMP => Some((MSType::Integer, &[MSType::String, MSType::String])),
        SUBSTR => Some((MSType::String, &[MSType::String, MSType::Integer, MSType::Integer])),
        _ => None,
    }
}

struct Intrinsics<'ctx> {
    hdlinc: FunctionValue<'ctx>,
    hdldec: FunctionValue<'ctx>,
    strcat: FunctionValue<'ctx>,
}

/// Owns one LLVM module's worth of compilation state. One `Compiler` per
/// script, matching the one-AST-arena-per-compilation scoping of
/// `SPEC_FULL.md` section 5.
pub struct Compiler<'ctx, 'a> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: inkwell::builder::Builder<'ctx>,
    types: TypeTables<'ctx>,
    intrinsics: Intrinsics<'ctx>,
    module_name: String,
    interner: &'a Interner,
    globals: GlobalTable,
    scopes: ScopeStack<BasicBlock<'ctx>, PointerValue<'ctx>>,
    string_constants: FxHashMap<Vec<u16>, PointerValue<'ctx>>,
    const_counter: u32,
    current_function: Option<FunctionValue<'ctx>>,
    current_return_type: MSType,
}

impl<'ctx, 'a> Compiler<'ctx, 'a> {
    pub fn new(context: &'ctx Context, module_name: &str, interner: &'a Interner) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();
        let types = TypeTables::new(context);
        let intrinsics = Self::declare_intrinsics(context, &module, &types);

        Self {
            context,
            module,
            builder,
            types,
            intrinsics,
            module_name: module_name.to_string(),
            interner,
            globals: GlobalTable::new(),
            scopes: ScopeStack::new(),
            string_constants: FxHashMap::default(),
            const_counter: 0,
            current_function: None,
            current_return_type: MSType::Void,
        }
    }

    /// Declares the seven runtime intrinsics as external functions
    /// (`SPEC_FULL.md` section 4.4) — `stralloc` is host-only and never
    /// referenced by generated IR, so it is not declared here.
    fn declare_intrinsics(context: &'ctx Context, module: &Module<'ctx>, types: &TypeTables<'ctx>) -> Intrinsics<'ctx> {
        let ptr = types.ptr_type;
        let i32t = context.i32_type();
        let void = context.void_type();

        let hdlinc = module.add_function(
            mscript_runtime::names::HDLINC,
            void.fn_type(&[ptr.into()], false),
            Some(Linkage::External),
        );
        let hdldec = module.add_function(
            mscript_runtime::names::HDLDEC,
            void.fn_type(&[ptr.into()], false),
            Some(Linkage::External),
        );
        module.add_function(
            mscript_runtime::names::STRLEN,
            i32t.fn_type(&[ptr.into()], false),
            Some(Linkage::External),
        );
        let strcat = module.add_function(
            mscript_runtime::names::STRCAT,
            ptr.fn_type(&[ptr.into(), ptr.into()], false),
            Some(Linkage::External),
        );
        module.add_function(
            mscript_runtime::names::STRCMP,
            i32t.fn_type(&[ptr.into(), ptr.into()], false),
            Some(Linkage::External),
        );
        module.add_function(
            mscript_runtime::names::SUBSTR,
            ptr.fn_type(&[ptr.into(), i32t.into(), i32t.into()], false),
            Some(Linkage::External),
        );
        module.add_function(
            mscript_runtime::names::STRGETPTR,
            ptr.fn_type(&[ptr.into()], false),
            Some(Linkage::External),
        );

        Intrinsics { hdlinc, hdldec, strcat }
    }

    pub fn into_module(self) -> Module<'ctx> {
        self.module
    }

    fn resolve(&self, sym: Symbol) -> &'a str {
        sym.as_str(self.interner)
    }

    fn mangled(&self, name: &str) -> String {
        format!("{}::{}", self.module_name, name)
    }

    fn current_function(&self) -> FunctionValue<'ctx> {
        self.current_function.expect("compile_statement always runs inside a function body")
    }

    // --- top level ---------------------------------------------------------

    pub fn compile_program(&mut self, program: &Program, imports: &[Import]) -> Result<()> {
        for import in imports {
            self.declare_import(import)?;
        }
        for item in program.items {
            if let Item::Function(f) = item {
                self.declare_function_signature(f)?;
            }
        }
        for item in program.items {
            if let Item::Function(f) = item {
                self.compile_function(f)?;
            }
        }
        self.compile_entrypoint(program)
    }

    /// Declares one host-supplied symbol (`SPEC_FULL.md` section 4.5, JIT
    /// symbol resolution step 2) as an external LLVM symbol mangled the same
    /// way a script-defined function is (`<module>::<name>`), and registers
    /// it in the global table so calls and name lookups treat it exactly
    /// like a script-defined function or a top-level variable.
    fn declare_import(&mut self, import: &Import) -> Result<()> {
        let resolved_name = self.resolve(import.name).to_string();
        match &import.kind {
            ImportKind::Function { return_type, param_types } => {
                let sig = FunctionSignature {
                    return_type: *return_type,
                    param_types: param_types.clone(),
                    calling_convention: CallingConvention::CDecl,
                };
                if sig.exceeds_param_cap() {
                    let count = sig.param_count();
                    return Err(IrError::TooManyParameters(resolved_name, count, mscript_sem::MAX_PARAMS));
                }
                let entry = SymbolEntry {
                    name: import.name,
                    kind: SymbolKind::Function(sig.clone()),
                };
                if !self.globals.declare(entry) {
                    return Err(IrError::Redefinition(resolved_name));
                }

                let param_basic_types: Vec<BasicMetadataTypeEnum> = sig
                    .param_types
                    .iter()
                    .map(|ty| self.types.basic_type(self.context, *ty).into())
                    .collect();
                let fn_type = if sig.return_type == MSType::Void {
                    self.context.void_type().fn_type(&param_basic_types, false)
                } else {
                    self.types.basic_type(self.context, sig.return_type).fn_type(&param_basic_types, false)
                };
                let mangled = self.mangled(&resolved_name);
                self.module.add_function(&mangled, fn_type, Some(Linkage::External));
            }
            ImportKind::Variable { ty } => {
                let entry = SymbolEntry {
                    name: import.name,
                    kind: SymbolKind::Variable(*ty),
                };
                if !self.globals.declare(entry) {
                    return Err(IrError::Redefinition(resolved_name));
                }
                let mangled = self.mangled(&resolved_name);
                let basic_ty = self.types.basic_type(self.context, *ty);
                let global = self.module.add_global(basic_ty, None, &mangled);
                global.set_linkage(Linkage::External);
            }
        }
        Ok(())
    }

    fn declare_function_signature(&mut self, f: &Function) -> Result<()> {
        let param_types: Vec<MSType> = f.params.iter().map(|p: &Param| p.ty).collect();
        let sig = FunctionSignature {
            return_type: f.return_type,
            param_types,
            calling_convention: CallingConvention::CDecl,
        };
        if sig.exceeds_param_cap() {
            let count = sig.param_count();
            return Err(IrError::TooManyParameters(self.resolve(f.name).to_string(), count, mscript_sem::MAX_PARAMS));
        }

        let resolved_name = self.resolve(f.name).to_string();
        let entry = SymbolEntry {
            name: f.name,
            kind: SymbolKind::Function(sig.clone()),
        };
        if !self.globals.declare(entry) {
            return Err(IrError::Redefinition(resolved_name));
        }

        let param_basic_types: Vec<BasicMetadataTypeEnum> = sig
            .param_types
            .iter()
            .map(|ty| self.types.basic_type(self.context, *ty).into())
            .collect();
        let fn_type = if f.return_type == MSType::Void {
            self.context.void_type().fn_type(&param_basic_types, false)
        } else {
            self.types.basic_type(self.context, f.return_type).fn_type(&param_basic_types, false)
        };

        let mangled = self.mangled(&resolved_name);
        self.module.add_function(&mangled, fn_type, Some(Linkage::External));
        Ok(())
    }

    fn compile_function(&mut self, f: &Function) -> Result<()> {
        let resolved_name = self.resolve(f.name).to_string();
        let mangled = self.mangled(&resolved_name);
        let function = self.module.get_function(&mangled).expect("declared in the signature pass");

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        self.current_function = Some(function);
        self.current_return_type = f.return_type;
        self.scopes.push_scope(ScopeKind::Function, None, None);
        let fn_scope_index = self.scopes.depth() - 1;

        for (i, param) in f.params.iter().enumerate() {
            let basic_ty = self.types.basic_type(self.context, param.ty);
            let name = self.resolve(param.name);
            let alloca = self.builder.build_alloca(basic_ty, name).map_err(builder_err)?;
            let incoming = function.get_nth_param(i as u32).expect("signature matches parameter list");
            self.builder.build_store(alloca, incoming).map_err(builder_err)?;
            self.scopes.declare_local(param.name, LocalVar { ty: param.ty, storage: alloca });
        }

        let may_continue = self.compile_block(f.body)?;
        if may_continue {
            self.destroy_scope_locals(fn_scope_index)?;
            if f.return_type == MSType::Void {
                self.builder.build_return(None).map_err(builder_err)?;
            } else {
                // No checked "missing return" diagnostic in this language;
                // keep every block terminated without inventing a value.
                self.builder.build_unreachable().map_err(builder_err)?;
            }
        }
        self.scopes.pop_scope();
        Ok(())
    }

    /// Synthesizes `<module>::$`, the script's top-level-statement entrypoint
    /// (`SPEC_FULL.md` section 4.8 "execute").
    fn compile_entrypoint(&mut self, program: &Program) -> Result<()> {
        let mangled = self.mangled("$");
        let fn_type = self.context.void_type().fn_type(&[], false);
        let function = self.module.add_function(&mangled, fn_type, Some(Linkage::External));
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);
        self.current_function = Some(function);
        self.current_return_type = MSType::Void;
        self.scopes.push_scope(ScopeKind::Function, None, None);
        let top_index = self.scopes.depth() - 1;

        let mut may_continue = true;
        for item in program.items {
            if !may_continue {
                break;
            }
            if let Item::Statement(stmt) = item {
                if let Stmt::Assignment { declared_type, expr, .. } = stmt {
                    if *declared_type != MSType::Void && !is_constant_expr(expr) {
                        return Err(IrError::NonConstantGlobalInitializer);
                    }
                }
                may_continue = self.compile_statement(stmt)?;
            }
        }
        if may_continue {
            self.destroy_scope_locals(top_index)?;
            self.builder.build_return(None).map_err(builder_err)?;
        }
        self.scopes.pop_scope();
        Ok(())
    }

    // --- statements ----------------------------------------------------------

    /// Compiles a statement list, stopping at the first statement that
    /// unconditionally transfers control — everything after it is
    /// unreachable and is simply never emitted (`SPEC_FULL.md` section 8,
    /// scenario 3). Returns whether control may still fall through.
    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<bool> {
        for stmt in stmts {
            if !self.compile_statement(stmt)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> Result<bool> {
        match stmt {
            Stmt::Call(call) => {
                if let Some(v) = self.compile_call(call)? {
                    self.discard_if_string_rvalue(v)?;
                }
                Ok(true)
            }
            Stmt::Assignment { name, declared_type, expr, .. } => {
                self.compile_assignment(*name, *declared_type, expr)?;
                Ok(true)
            }
            Stmt::If { cond, then_body, else_body, .. } => self.compile_if(cond, then_body, else_body),
            Stmt::While { cond, body, .. } => self.compile_while(cond, body),
            Stmt::Break(_) => {
                let loop_index = self.scopes.current_loop_scope().ok_or(IrError::IllegalBreak)?;
                self.destroy_scopes_from_top_through(loop_index)?;
                let exit = self.scopes.scope_at(loop_index).exit_block.expect("While scope always has an exit block");
                self.builder.build_unconditional_branch(exit).map_err(builder_err)?;
                Ok(false)
            }
            Stmt::Continue(_) => {
                let loop_index = self.scopes.current_loop_scope().ok_or(IrError::IllegalContinue)?;
                self.destroy_scopes_from_top_through(loop_index)?;
                let start = self.scopes.scope_at(loop_index).start_block.expect("While scope always has a start block");
                self.builder.build_unconditional_branch(start).map_err(builder_err)?;
                Ok(false)
            }
            Stmt::Return { expr, .. } => {
                let func_index = self.scopes.current_function_scope().ok_or(IrError::IllegalReturn)?;
                let value = self.compile_expr(expr)?;
                // Compensates for the decrements `destroy_scopes_from_top_through`
                // is about to emit on the way out (`SPEC_FULL.md` section 9).
                if value.is_lvalue && value.ty == MSType::String {
                    self.emit_increment(value.raw)?;
                }
                self.destroy_scopes_from_top_through(func_index)?;

                let return_ty = self.current_return_type;
                let stored = if return_ty.is_numeric() && value.ty.is_numeric() && value.ty != return_ty {
                    self.convert_numeric(value.raw, value.ty, return_ty)?
                } else {
                    value.raw
                };
                if return_ty == MSType::Void {
                    self.builder.build_return(None).map_err(builder_err)?;
                } else {
                    self.builder.build_return(Some(&stored)).map_err(builder_err)?;
                }
                Ok(false)
            }
        }
    }

    fn compile_assignment(&mut self, name: Symbol, declared_type: MSType, expr: &Expr) -> Result<()> {
        if declared_type != MSType::Void {
            // New declaration: evaluate, increment if we're keeping someone
            // else's reference, store into a freshly allocated slot.
            let value = self.compile_expr(expr)?;
            if value.is_lvalue && value.ty == MSType::String {
                self.emit_increment(value.raw)?;
            }
            let basic_ty = self.types.basic_type(self.context, declared_type);
            let alloca = self.builder.build_alloca(basic_ty, self.resolve(name)).map_err(builder_err)?;
            let stored = if declared_type.is_numeric() && value.ty.is_numeric() && value.ty != declared_type {
                self.convert_numeric(value.raw, value.ty, declared_type)?
            } else {
                value.raw
            };
            self.builder.build_store(alloca, stored).map_err(builder_err)?;
            self.scopes.declare_local(name, LocalVar { ty: declared_type, storage: alloca });
        } else {
            // Re-assignment: evaluate the new value first (so `x = substr(x, 1)`
            // reads the old `x` before it's overwritten), then swap it in.
            let value = self.compile_expr(expr)?;
            let local = *self.scopes.lookup(name).ok_or(IrError::UndefinedSymbol)?;
            if local.ty == MSType::String {
                let basic_ty = self.types.basic_type(self.context, local.ty);
                let old = self.builder.build_load(basic_ty, local.storage, "old").map_err(builder_err)?;
                self.emit_decrement(old)?;
            }
            if value.is_lvalue && value.ty == MSType::String {
                self.emit_increment(value.raw)?;
            }
            let stored = if local.ty.is_numeric() && value.ty.is_numeric() && value.ty != local.ty {
                self.convert_numeric(value.raw, value.ty, local.ty)?
            } else {
                value.raw
            };
            self.builder.build_store(local.storage, stored).map_err(builder_err)?;
        }
        Ok(())
    }

    /// Always allocates the merge block up front rather than conditionally
    /// skipping it (simpler than tracking reachability before both arms are
    /// compiled); when both arms terminate unconditionally, the merge block
    /// is given an `unreachable` terminator instead of being left out of the
    /// function, which keeps every basic block well-formed while still
    /// reporting "unreachable" to the caller exactly as
    /// `SPEC_FULL.md` section 4.3 describes.
    fn compile_if(&mut self, cond: &Expr, then_body: &[Stmt], else_body: &[Stmt]) -> Result<bool> {
        let function = self.current_function();
        let then_block = self.context.append_basic_block(function, "if.then");
        let else_block = self.context.append_basic_block(function, "if.else");
        let merge_block = self.context.append_basic_block(function, "if.merge");

        let cond_value = self.compile_expr(cond)?;
        let bool_value = self.coerce_to_bool(cond_value)?;
        self.discard_if_string_rvalue(cond_value)?;
        self.builder
            .build_conditional_branch(bool_value, then_block, else_block)
            .map_err(builder_err)?;

        self.builder.position_at_end(then_block);
        self.scopes.push_scope(ScopeKind::If, None, None);
        let then_index = self.scopes.depth() - 1;
        let then_continues = self.compile_block(then_body)?;
        if then_continues {
            self.destroy_scope_locals(then_index)?;
            self.builder.build_unconditional_branch(merge_block).map_err(builder_err)?;
        }
        self.scopes.pop_scope();

        self.builder.position_at_end(else_block);
        self.scopes.push_scope(ScopeKind::If, None, None);
        let else_index = self.scopes.depth() - 1;
        let else_continues = if !else_body.is_empty() {
            self.compile_block(else_body)?
        } else {
            true
        };
        if else_continues {
            self.destroy_scope_locals(else_index)?;
            self.builder.build_unconditional_branch(merge_block).map_err(builder_err)?;
        }
        self.scopes.pop_scope();

        if !then_continues && !else_continues {
            self.builder.position_at_end(merge_block);
            self.builder.build_unreachable().map_err(builder_err)?;
            return Ok(false);
        }

        self.builder.position_at_end(merge_block);
        Ok(true)
    }

    /// The condition is re-evaluated on every loop entry (corrected bug,
    /// `SPEC_FULL.md` section 9: the original computed it once before the
    /// loop and never again).
    fn compile_while(&mut self, cond: &Expr, body: &[Stmt]) -> Result<bool> {
        let function = self.current_function();
        let cond_block = self.context.append_basic_block(function, "while.cond");
        let body_block = self.context.append_basic_block(function, "while.body");
        let merge_block = self.context.append_basic_block(function, "while.merge");

        self.builder.build_unconditional_branch(cond_block).map_err(builder_err)?;

        self.builder.position_at_end(cond_block);
        let cond_value = self.compile_expr(cond)?;
        let bool_value = self.coerce_to_bool(cond_value)?;
        self.discard_if_string_rvalue(cond_value)?;
        self.builder
            .build_conditional_branch(bool_value, body_block, merge_block)
            .map_err(builder_err)?;

        self.builder.position_at_end(body_block);
        self.scopes.push_scope(ScopeKind::While, Some(cond_block), Some(merge_block));
        let body_index = self.scopes.depth() - 1;
        let body_continues = self.compile_block(body)?;
        if body_continues {
            self.destroy_scope_locals(body_index)?;
            self.builder.build_unconditional_branch(cond_block).map_err(builder_err)?;
        }
        self.scopes.pop_scope();

        self.builder.position_at_end(merge_block);
        Ok(true)
    }

    // --- scope exit ----------------------------------------------------------

    fn destroy_scope_locals(&mut self, index: usize) -> Result<()> {
        let storages: Vec<PointerValue<'ctx>> = self
            .scopes
            .locals_in(index)
            .filter(|(_, local)| local.ty == MSType::String)
            .map(|(_, local)| local.storage)
            .collect();
        for storage in storages {
            let loaded = self.builder.build_load(self.types.ptr_type, storage, "destroy").map_err(builder_err)?;
            self.emit_decrement(loaded)?;
        }
        Ok(())
    }

    fn destroy_scopes_from_top_through(&mut self, target_index: usize) -> Result<()> {
        let top = self.scopes.depth() - 1;
        for i in (target_index..=top).rev() {
            self.destroy_scope_locals(i)?;
        }
        Ok(())
    }

    fn discard_if_string_rvalue(&mut self, value: Value<'ctx>) -> Result<()> {
        if value.is_refcounted_rvalue() {
            self.emit_decrement(value.raw)?;
        }
        Ok(())
    }

    fn emit_increment(&mut self, handle: BasicValueEnum<'ctx>) -> Result<()> {
        self.builder
            .build_call(self.intrinsics.hdlinc, &[handle.into()], "hdlinc_call")
            .map_err(builder_err)?;
        Ok(())
    }

    fn emit_decrement(&mut self, handle: BasicValueEnum<'ctx>) -> Result<()> {
        self.builder
            .build_call(self.intrinsics.hdldec, &[handle.into()], "hdldec_call")
            .map_err(builder_err)?;
        Ok(())
    }

    // --- expressions -----------------------------------------------------------

    fn compile_expr(&mut self, expr: &Expr) -> Result<Value<'ctx>> {
        match expr {
            Expr::Null(_) => Ok(Value::rvalue(self.types.ptr_type.const_null().into(), MSType::String)),
            Expr::Boolean(b, _) => {
                let raw = self.context.bool_type().const_int(*b as u64, false);
                Ok(Value::rvalue(raw.into(), MSType::Boolean))
            }
            Expr::Integer(i, _) => {
                let raw = self.context.i32_type().const_int(*i as u64, true);
                Ok(Value::rvalue(raw.into(), MSType::Integer))
            }
            Expr::Float(f, _) => {
                let raw = self.context.f32_type().const_float(*f as f64);
                Ok(Value::rvalue(raw.into(), MSType::Float))
            }
            Expr::String(units, _) => {
                let ptr = self.emit_constant_string(units)?;
                Ok(Value::lvalue(ptr.into(), MSType::String))
            }
            Expr::Name(name, _) => {
                if let Some(local) = self.scopes.lookup(*name) {
                    let local = *local;
                    let basic_ty = self.types.basic_type(self.context, local.ty);
                    let loaded = self.builder.build_load(basic_ty, local.storage, "load").map_err(builder_err)?;
                    return Ok(Value::lvalue(loaded, local.ty));
                }
                // Not a script-local: fall back to an imported host global
                // (`SPEC_FULL.md` section 6) — these are visible module-wide,
                // unlike top-level statement locals, since they live in
                // `self.globals` rather than the scope stack.
                let ty = match self.globals.lookup(*name).map(|e| e.kind.clone()) {
                    Some(SymbolKind::Variable(ty)) => ty,
                    _ => return Err(IrError::UndefinedSymbol),
                };
                let resolved_name = self.resolve(*name).to_string();
                let mangled = self.mangled(&resolved_name);
                let global = self.module.get_global(&mangled).expect("declared by declare_import");
                let basic_ty = self.types.basic_type(self.context, ty);
                let loaded = self
                    .builder
                    .build_load(basic_ty, global.as_pointer_value(), "load_import")
                    .map_err(builder_err)?;
                Ok(Value::lvalue(loaded, ty))
            }
            Expr::Call(call) => self.compile_call(call)?.ok_or(IrError::VoidUsedAsValue),
            Expr::BinaryOp(op, lhs, rhs, span) => self.compile_binary_op(*op, lhs, rhs, *span),
        }
    }

    fn compile_call(&mut self, call: &CallExpr) -> Result<Option<Value<'ctx>>> {
        let resolved_name = self.resolve(call.name).to_string();
        // `strlen`/`strcat`/`strcmp`/`substr` are reserved runtime intrinsic
        // names, script-callable without ever being declared as a function
        // or host import — checked only once the global table has no
        // user/host definition for the name, so a host import can still
        // shadow one if it ever needed to.
        let sig = match self.globals.lookup_function(call.name) {
            Some(sig) => sig.clone(),
            None => {
                let (return_type, param_types) =
                    builtin_signature(&resolved_name).ok_or(IrError::UndefinedSymbol)?;
                return self
                    .compile_builtin_call(&resolved_name, param_types, return_type, call)
                    .map(Some);
            }
        };
        let mangled = self.mangled(&resolved_name);
        let function = self.module.get_function(&mangled).expect("declared function must exist");

        let mut args = Vec::with_capacity(call.args.len());
        let mut arg_values = Vec::with_capacity(call.args.len());
        for (i, arg_expr) in call.args.iter().enumerate() {
            let mut value = self.compile_expr(arg_expr)?;
            if let Some(param_ty) = sig.param_types.get(i) {
                if param_ty.is_numeric() && value.ty.is_numeric() && value.ty != *param_ty {
                    let converted = self.convert_numeric(value.raw, value.ty, *param_ty)?;
                    value = Value { raw: converted, ty: *param_ty, is_lvalue: value.is_lvalue };
                }
            }
            arg_values.push(value);
            args.push(BasicMetadataValueEnum::from(value.raw));
        }

        let call_site = self.builder.build_call(function, &args, "call").map_err(builder_err)?;
        let result = call_site.try_as_basic_value().left();

        // Call-argument refcount rule: decrement each R-value String
        // argument right after the call returns (`SPEC_FULL.md` section 4.3).
        for value in &arg_values {
            self.discard_if_string_rvalue(*value)?;
        }

        Ok(result.map(|raw| Value::rvalue(raw, sig.return_type)))
    }

    /// Calls one of the four script-visible runtime string intrinsics
    /// directly against the externs `declare_intrinsics` already declared,
    /// bypassing the global function table entirely — `hdlinc`/`hdldec`/
    /// `strgetptr` stay compiler-internal and are never reachable through
    /// call syntax.
    fn compile_builtin_call(
        &mut self,
        name: &str,
        param_types: &[MSType],
        return_type: MSType,
        call: &CallExpr,
    ) -> Result<Value<'ctx>> {
        let function = match name {
            mscript_runtime::names::STRCAT => self.intrinsics.strcat,
            other => self.module.get_function(other).expect("declared by declare_intrinsics"),
        };

        let mut args = Vec::with_capacity(call.args.len());
        let mut arg_values = Vec::with_capacity(call.args.len());
        for (i, arg_expr) in call.args.iter().enumerate() {
            let mut value = self.compile_expr(arg_expr)?;
            if let Some(param_ty) = param_types.get(i) {
                if param_ty.is_numeric() && value.ty.is_numeric() && value.ty != *param_ty {
                    let converted = self.convert_numeric(value.raw, value.ty, *param_ty)?;
                    value = Value { raw: converted, ty: *param_ty, is_lvalue: value.is_lvalue };
                }
            }
            arg_values.push(value);
            args.push(BasicMetadataValueEnum::from(value.raw));
        }

        let call_site = self.builder.build_call(function, &args, "call").map_err(builder_err)?;
        let result = call_site
            .try_as_basic_value()
            .left()
            .expect("every builtin string intrinsic returns a value");

        for value in &arg_values {
            self.discard_if_string_rvalue(*value)?;
        }

        Ok(Value::rvalue(result, return_type))
    }

    fn compile_binary_op(&mut self, op: MSOperator, lhs_expr: &Expr, rhs_expr: &Expr, span: mscript_util::Span) -> Result<Value<'ctx>> {
        let lhs = self.compile_expr(lhs_expr)?;
        let rhs = self.compile_expr(rhs_expr)?;

        let result = if matches!(op, MSOperator::And | MSOperator::Or) {
            // Each operand coerced to Boolean against its own type — the
            // corrected bug (`SPEC_FULL.md` section 9): the original reused
            // the left operand's type to coerce the right one too.
            let lhs_bool = self.coerce_to_bool(lhs)?;
            let rhs_bool = self.coerce_to_bool(rhs)?;
            let raw = match op {
                MSOperator::And => self.builder.build_and(lhs_bool, rhs_bool, "and").map_err(builder_err)?,
                MSOperator::Or => self.builder.build_or(lhs_bool, rhs_bool, "or").map_err(builder_err)?,
                _ => unreachable!(),
            };
            Value::rvalue(raw.into(), MSType::Boolean)
        } else {
            if !lhs.ty.is_numeric() || !rhs.ty.is_numeric() {
                return Err(IrError::TypeMismatch { op, lhs_ty: lhs.ty, rhs_ty: rhs.ty, span });
            }
            let promoted = promote(lhs.ty, rhs.ty);
            let lhs_raw = self.convert_numeric(lhs.raw, lhs.ty, promoted)?;
            let rhs_raw = self.convert_numeric(rhs.raw, rhs.ty, promoted)?;
            self.compile_promoted_op(op, lhs_raw, rhs_raw, promoted)?
        };

        // Binary-op argument refcount rule, placed immediately before the
        // result is handed back to the caller — the corrected bug
        // (`SPEC_FULL.md` section 9): the original wrote this decrement after
        // the dispatch `switch`'s `return`, making it dead code. Never
        // actually fires here since operands are always numeric, but kept
        // for parity with the rule as stated.
        self.discard_if_string_rvalue(lhs)?;
        self.discard_if_string_rvalue(rhs)?;

        Ok(result)
    }

    fn compile_promoted_op(&mut self, op: MSOperator, lhs: BasicValueEnum<'ctx>, rhs: BasicValueEnum<'ctx>, ty: MSType) -> Result<Value<'ctx>> {
        match ty {
            MSType::Float => self.compile_float_op(op, lhs.into_float_value(), rhs.into_float_value()),
            MSType::Integer => self.compile_int_op(op, lhs.into_int_value(), rhs.into_int_value(), true),
            MSType::Boolean => self.compile_int_op(op, lhs.into_int_value(), rhs.into_int_value(), false),
            MSType::String | MSType::Void => unreachable!("promote() never produces a non-numeric type"),
        }
    }

    fn compile_float_op(&mut self, op: MSOperator, l: inkwell::values::FloatValue<'ctx>, r: inkwell::values::FloatValue<'ctx>) -> Result<Value<'ctx>> {
        use MSOperator::*;
        let b = &mut self.builder;
        let (raw, result_ty): (BasicValueEnum, MSType) = match op {
            Add => (b.build_float_add(l, r, "fadd").map_err(builder_err)?.into(), MSType::Float),
            Subtract => (b.build_float_sub(l, r, "fsub").map_err(builder_err)?.into(), MSType::Float),
            Multiply => (b.build_float_mul(l, r, "fmul").map_err(builder_err)?.into(), MSType::Float),
            Divide => (b.build_float_div(l, r, "fdiv").map_err(builder_err)?.into(), MSType::Float),
            Modulo => (b.build_float_rem(l, r, "frem").map_err(builder_err)?.into(), MSType::Float),
            Equality => (b.build_float_compare(FloatPredicate::OEQ, l, r, "feq").map_err(builder_err)?.into(), MSType::Boolean),
            Inequality => (b.build_float_compare(FloatPredicate::ONE, l, r, "fne").map_err(builder_err)?.into(), MSType::Boolean),
            Greater => (b.build_float_compare(FloatPredicate::OGT, l, r, "fgt").map_err(builder_err)?.into(), MSType::Boolean),
            Lesser => (b.build_float_compare(FloatPredicate::OLT, l, r, "flt").map_err(builder_err)?.into(), MSType::Boolean),
            GreaterEqual => (b.build_float_compare(FloatPredicate::OGE, l, r, "fge").map_err(builder_err)?.into(), MSType::Boolean),
            LesserEqual => (b.build_float_compare(FloatPredicate::OLE, l, r, "fle").map_err(builder_err)?.into(), MSType::Boolean),
            And | Or => unreachable!("handled in compile_binary_op"),
        };
        Ok(Value::rvalue(raw, result_ty))
    }

    /// `signed` picks signed vs. unsigned division/remainder/comparison —
    /// the only places integer and boolean dispatch actually differ, since
    /// add/sub/mul are representation-agnostic in two's complement
    /// (`SPEC_FULL.md` section 4.3: "boolean ops use unsigned variants").
    fn compile_int_op(&mut self, op: MSOperator, l: IntValue<'ctx>, r: IntValue<'ctx>, signed: bool) -> Result<Value<'ctx>> {
        use MSOperator::*;
        let result_ty = if signed { MSType::Integer } else { MSType::Boolean };
        let b = &mut self.builder;
        let (raw, ty): (BasicValueEnum, MSType) = match op {
            Add => (b.build_int_add(l, r, "add").map_err(builder_err)?.into(), result_ty),
            Subtract => (b.build_int_sub(l, r, "sub").map_err(builder_err)?.into(), result_ty),
            Multiply => (b.build_int_mul(l, r, "mul").map_err(builder_err)?.into(), result_ty),
            Divide if signed => (b.build_int_signed_div(l, r, "sdiv").map_err(builder_err)?.into(), result_ty),
            Divide => (b.build_int_unsigned_div(l, r, "udiv").map_err(builder_err)?.into(), result_ty),
            Modulo if signed => (b.build_int_signed_rem(l, r, "srem").map_err(builder_err)?.into(), result_ty),
            Modulo => (b.build_int_unsigned_rem(l, r, "urem").map_err(builder_err)?.into(), result_ty),
            Equality => (b.build_int_compare(IntPredicate::EQ, l, r, "eq").map_err(builder_err)?.into(), MSType::Boolean),
            Inequality => (b.build_int_compare(IntPredicate::NE, l, r, "ne").map_err(builder_err)?.into(), MSType::Boolean),
            Greater if signed => (b.build_int_compare(IntPredicate::SGT, l, r, "gt").map_err(builder_err)?.into(), MSType::Boolean),
            Greater => (b.build_int_compare(IntPredicate::UGT, l, r, "gt").map_err(builder_err)?.into(), MSType::Boolean),
            Lesser if signed => (b.build_int_compare(IntPredicate::SLT, l, r, "lt").map_err(builder_err)?.into(), MSType::Boolean),
            Lesser => (b.build_int_compare(IntPredicate::ULT, l, r, "lt").map_err(builder_err)?.into(), MSType::Boolean),
            GreaterEqual if signed => (b.build_int_compare(IntPredicate::SGE, l, r, "ge").map_err(builder_err)?.into(), MSType::Boolean),
            GreaterEqual => (b.build_int_compare(IntPredicate::UGE, l, r, "ge").map_err(builder_err)?.into(), MSType::Boolean),
            LesserEqual if signed => (b.build_int_compare(IntPredicate::SLE, l, r, "le").map_err(builder_err)?.into(), MSType::Boolean),
            LesserEqual => (b.build_int_compare(IntPredicate::ULE, l, r, "le").map_err(builder_err)?.into(), MSType::Boolean),
            And | Or => unreachable!("handled in compile_binary_op"),
        };
        Ok(Value::rvalue(raw, ty))
    }

    fn coerce_to_bool(&mut self, value: Value<'ctx>) -> Result<IntValue<'ctx>> {
        match value.ty {
            MSType::Boolean => Ok(value.raw.into_int_value()),
            MSType::Integer => {
                let zero = self.context.i32_type().const_int(0, false);
                self.builder
                    .build_int_compare(IntPredicate::NE, value.raw.into_int_value(), zero, "to_bool")
                    .map_err(builder_err)
            }
            MSType::Float => {
                let zero = self.context.f32_type().const_float(0.0);
                self.builder
                    .build_float_compare(FloatPredicate::ONE, value.raw.into_float_value(), zero, "to_bool")
                    .map_err(builder_err)
            }
            MSType::String | MSType::Void => unreachable!("condition operands are always numeric"),
        }
    }

    /// Widens along the promotion table: `Boolean -> Integer`,
    /// `Boolean -> Float` (via `Integer`), `Integer -> Float`. The table
    /// never narrows, so these are the only three conversions that exist.
    fn convert_numeric(&mut self, raw: BasicValueEnum<'ctx>, from: MSType, to: MSType) -> Result<BasicValueEnum<'ctx>> {
        use MSType::*;
        if from == to {
            return Ok(raw);
        }
        match (from, to) {
            (Boolean, Integer) => {
                let v = raw.into_int_value();
                Ok(self.builder.build_int_z_extend(v, self.context.i32_type(), "bool_to_int").map_err(builder_err)?.into())
            }
            (Boolean, Float) => {
                let v = raw.into_int_value();
                let as_int = self.builder.build_int_z_extend(v, self.context.i32_type(), "bool_to_int").map_err(builder_err)?;
                Ok(self
                    .builder
                    .build_signed_int_to_float(as_int, self.context.f32_type(), "int_to_float")
                    .map_err(builder_err)?
                    .into())
            }
            (Integer, Float) => {
                let v = raw.into_int_value();
                Ok(self
                    .builder
                    .build_signed_int_to_float(v, self.context.f32_type(), "int_to_float")
                    .map_err(builder_err)?
                    .into())
            }
            _ => unreachable!("no other numeric widening pair exists in the promotion table"),
        }
    }

    /// String literals are cached by content and emitted once as a pair of
    /// static globals: a `Body` holding the code units, and a `Handle`
    /// pointing at it with `refcount = 2` so ordinary decrement paths never
    /// reach zero (`SPEC_FULL.md` section 9, "Dual refcount/static-init
    /// strategy"). Only the `Body` global is marked LLVM-constant — the
    /// `Handle`'s refcount field is genuinely mutated by `hdlinc`/`hdldec`
    /// at runtime.
    fn emit_constant_string(&mut self, units: &[u16]) -> Result<PointerValue<'ctx>> {
        if let Some(ptr) = self.string_constants.get(units) {
            return Ok(*ptr);
        }

        let idx = self.const_counter;
        self.const_counter += 1;

        let data_ty = self.context.i16_type().array_type(units.len() as u32);
        let body_ty = self.context.struct_type(&[self.context.i32_type().into(), data_ty.into()], false);

        let size = (units.len() - 1) as u64; // excludes the trailing terminator
        let data_const = self.context.i16_type().const_array(
            &units.iter().map(|u| self.context.i16_type().const_int(*u as u64, false)).collect::<Vec<_>>(),
        );
        let body_init = body_ty.const_named_struct(&[self.context.i32_type().const_int(size, false).into(), data_const.into()]);

        let body_global = self.module.add_global(body_ty, None, &format!("str.body.{idx}"));
        body_global.set_initializer(&body_init);
        body_global.set_constant(true);
        body_global.set_linkage(Linkage::Private);

        let handle_init = self.types.handle_type.const_named_struct(&[
            self.context.i32_type().const_int(2, false).into(),
            body_global.as_pointer_value().into(),
        ]);
        let handle_global = self.module.add_global(self.types.handle_type, None, &format!("str.handle.{idx}"));
        handle_global.set_initializer(&handle_init);
        handle_global.set_linkage(Linkage::Private);

        let ptr = handle_global.as_pointer_value();
        self.string_constants.insert(units.to_vec(), ptr);
        Ok(ptr)
    }
}

fn is_constant_expr(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Null(_) | Expr::Boolean(_, _) | Expr::Integer(_, _) | Expr::Float(_, _) | Expr::String(_, _)
    )
}

/// Compiles one program into a fresh LLVM module named `module_name`
/// (`SPEC_FULL.md` section 4.3 entrypoint).
pub fn compile<'ctx>(
    context: &'ctx Context,
    module_name: &str,
    program: &Program,
    interner: &Interner,
    imports: &[Import],
) -> Result<Module<'ctx>> {
    let mut compiler = Compiler::new(context, module_name, interner);
    compiler.compile_program(program, imports)?;
    Ok(compiler.into_module())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_par::Parser;
    use mscript_util::{Arena, Handler};

    fn compile_source(src: &str) -> String {
        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let mut parser = Parser::new(src, &mut handler, &arena, &mut interner);
        let program = parser.parse_program().expect("source must parse");
        assert!(!handler.has_errors());

        let context = Context::create();
        let module = compile(&context, "m", &program, &interner, &[]).expect("must compile");
        module.print_to_string().to_string()
    }

    #[test]
    fn function_is_emitted_with_mangled_name() {
        let ir = compile_source("function add(int a, int b) : int return a + b; end");
        assert!(ir.contains("m::add"));
        assert!(ir.contains("m::$"));
    }

    #[test]
    fn string_literal_emits_dual_refcount_globals() {
        let ir = compile_source(r#"string s = "hi"; "#);
        assert!(ir.contains("str.handle.0"));
        assert!(ir.contains("str.body.0"));
    }

    #[test]
    fn and_or_coerce_each_operand_independently() {
        let ir = compile_source("function f() : bool return 1 and 0.0; end");
        assert!(ir.contains("and"));
    }

    #[test]
    fn while_condition_is_re_evaluated_in_its_own_block() {
        let ir = compile_source(
            r#"function f() : int
                 int i = 0;
                 while (i < 3) do i = i + 1; end
                 return i;
               end"#,
        );
        assert!(ir.contains("while.cond"));
        assert!(ir.contains("while.body"));
        assert!(ir.contains("while.merge"));
    }

    #[test]
    fn both_branches_returning_makes_merge_block_unreachable() {
        let ir = compile_source(
            r#"function f(int x) : int
                 if (x > 0) then return 1; else return 0; end
               end"#,
        );
        assert!(ir.contains("unreachable"));
    }

    #[test]
    fn too_many_parameters_is_rejected() {
        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let params = (0..11).map(|i| format!("int p{i}")).collect::<Vec<_>>().join(", ");
        let src = format!("function f({params}) : int return 0; end");
        let mut parser = Parser::new(&src, &mut handler, &arena, &mut interner);
        let program = parser.parse_program().expect("source must parse");

        let context = Context::create();
        let result = compile(&context, "m", &program, &interner, &[]);
        assert!(matches!(result, Err(IrError::TooManyParameters(_, 11, _))));
    }

    #[test]
    fn imported_function_is_declared_external_and_callable() {
        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let src = "host_log(1);";
        let mut parser = Parser::new(src, &mut handler, &arena, &mut interner);
        let program = parser.parse_program().expect("source must parse");
        assert!(!handler.has_errors());

        let name = Symbol::intern(&mut interner, "host_log");
        let imports = [Import {
            name,
            kind: ImportKind::Function {
                return_type: MSType::Void,
                param_types: vec![MSType::Integer],
            },
        }];

        let context = Context::create();
        let module = compile(&context, "m", &program, &interner, &imports).expect("must compile");
        let ir = module.print_to_string().to_string();
        assert!(ir.contains("m::host_log"));
    }

    #[test]
    fn imported_variable_is_declared_as_external_global() {
        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let src = "int y = 0;";
        let mut parser = Parser::new(src, &mut handler, &arena, &mut interner);
        let program = parser.parse_program().expect("source must parse");
        assert!(!handler.has_errors());

        let name = Symbol::intern(&mut interner, "host_count");
        let imports = [Import {
            name,
            kind: ImportKind::Variable { ty: MSType::Integer },
        }];

        let context = Context::create();
        let module = compile(&context, "m", &program, &interner, &imports).expect("must compile");
        let ir = module.print_to_string().to_string();
        assert!(ir.contains("m::host_count"));
        assert!(ir.contains("external global"));
    }

    #[test]
    fn string_operand_in_equality_is_reported_not_panicked() {
        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let src = r#"function f() : bool return "a" == "b"; end"#;
        let mut parser = Parser::new(src, &mut handler, &arena, &mut interner);
        let program = parser.parse_program().expect("source must parse");
        assert!(!handler.has_errors());

        let context = Context::create();
        let result = compile(&context, "m", &program, &interner, &[]);
        assert!(matches!(
            result,
            Err(IrError::TypeMismatch { lhs_ty: MSType::String, rhs_ty: MSType::String, .. })
        ));
    }

    #[test]
    fn reassigning_a_string_local_decrements_its_old_value_first() {
        let ir = compile_source(
            r#"string s = "a";
               s = strcat(s, "b");"#,
        );
        // Both literals get their own dual refcount=2 global pair.
        assert!(ir.contains("str.handle.0"));
        assert!(ir.contains("str.handle.1"));
        // The old "s" is decremented before the new value (strcat's result,
        // an R-value that is never incremented) is stored over it.
        assert!(ir.contains("hdldec_call"));
        assert!(ir.contains("@strcat("));
    }

    #[test]
    fn strlen_strcmp_and_substr_are_callable_without_any_declaration() {
        let ir = compile_source(
            r#"function f(string s) : int
                 if (strcmp(s, substr(s, 0, strlen(s))) == 0) then return 1; end
                 return 0;
               end"#,
        );
        assert!(ir.contains("@strlen("));
        assert!(ir.contains("@strcmp("));
        assert!(ir.contains("@substr("));
    }

    #[test]
    fn mixed_string_and_numeric_operands_are_reported_not_panicked() {
        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let src = r#"function f() : string return "a" + 1; end"#;
        let mut parser = Parser::new(src, &mut handler, &arena, &mut interner);
        let program = parser.parse_program().expect("source must parse");
        assert!(!handler.has_errors());

        let context = Context::create();
        let result = compile(&context, "m", &program, &interner, &[]);
        assert!(matches!(
            result,
            Err(IrError::TypeMismatch { lhs_ty: MSType::String, rhs_ty: MSType::Integer, .. })
        ));
    }
}
