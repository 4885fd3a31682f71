//! Script record (C8, `SPEC_FULL.md` section 4.6).

use inkwell::context::Context as InkwellContext;
use inkwell::execution_engine::ExecutionEngine;
use mscript_util::MSType;

use crate::error::{JitError, Result};
use crate::symbol::ImportedSymbol;

/// One function the script defined at top level, with its native address
/// filled in once the JIT context finishes linking (`SPEC_FULL.md` section
/// 4.5, "Exported-symbol address resolution"). `return_type`/`param_types`
/// are carried along from the function's own signature so a host (the `msc`
/// driver's smoke-test invocation) can dispatch a call without re-deriving
/// them from the source it no longer has.
#[derive(Debug, Clone)]
pub struct ExportedSymbol {
    pub name: String,
    pub address: usize,
    pub return_type: MSType,
    pub param_types: Vec<MSType>,
}

/// A nullary exported function's return value, boxed up for printing by a
/// host that has no compile-time knowledge of the script's types.
#[derive(Debug, Clone, Copy)]
pub enum ScriptValue {
    Integer(i32),
    Float(f32),
    Boolean(bool),
    /// A `Handle*` the caller now owns and must release, e.g. via
    /// [`crate::HostString::from_raw`].
    StringHandle(*mut mscript_runtime::Handle),
    Void,
}

/// A compiled-and-linked script: module name, the host-supplied import list
/// it was compiled against, and its resolved export table.
///
/// Each `Script` owns a private LLVM context and execution engine rather
/// than borrowing a shared one from [`crate::Context`]. `inkwell`'s
/// `ExecutionEngine<'ctx>` ties its lifetime to the `Context` that built it,
/// and this crate's `Context` needs to stay free to compile further scripts
/// concurrently with any already-compiled `Script` still running — a single
/// self-referential "one context, many scripts" struct would need either
/// `unsafe` lifetime erasure or a crate like `ouroboros` for no real benefit,
/// since imports are supplied per `compile` call (`SPEC_FULL.md` section 6)
/// and scripts never need to see each other's symbols. So `Context::compile`
/// leaks a fresh, small LLVM context per script (see its doc comment) and
/// `Script` owns the `'static` handles that result. The leak is bounded (one
/// LLVM context per compiled script, for the process's lifetime) and matches
/// how embeddable JIT runtimes are normally used: created once, scripts
/// compiled as needed, the whole process torn down together at exit.
pub struct Script {
    module_name: String,
    imports: Vec<ImportedSymbol>,
    exports: Vec<ExportedSymbol>,
    #[allow(dead_code)]
    llvm: &'static InkwellContext,
    execution_engine: ExecutionEngine<'static>,
    entrypoint_name: String,
}

impl Script {
    pub(crate) fn new(
        module_name: String,
        imports: Vec<ImportedSymbol>,
        exports: Vec<ExportedSymbol>,
        llvm: &'static InkwellContext,
        execution_engine: ExecutionEngine<'static>,
    ) -> Self {
        let entrypoint_name = format!("{module_name}::$");
        Self {
            module_name,
            imports,
            exports,
            llvm,
            execution_engine,
            entrypoint_name,
        }
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn imports(&self) -> &[ImportedSymbol] {
        &self.imports
    }

    pub fn exports(&self) -> &[ExportedSymbol] {
        &self.exports
    }

    /// `MSGetFirstSymbol`/`MSGetNextSymbol` collapsed into a plain iterator
    /// (`SPEC_FULL.md` section 6) — idiomatic Rust has no need for the
    /// original's two-call enumerator handle.
    pub fn iter_exports(&self) -> std::slice::Iter<'_, ExportedSymbol> {
        self.exports.iter()
    }

    pub fn find_export(&self, name: &str) -> Option<&ExportedSymbol> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// Same lookup as [`Self::find_export`], but fallible — for callers (the
    /// `msc` driver's smoke-test invocation) that want a host-facing error
    /// message rather than an `Option` to unwrap themselves.
    pub fn resolve_export(&self, name: &str) -> Result<&ExportedSymbol> {
        self.find_export(name).ok_or_else(|| JitError::UnknownExport(name.to_string()))
    }

    /// Invokes a zero-argument exported function and boxes up its return
    /// value. Driver-only convenience (`SPEC_FULL.md` section 4.9): the
    /// embedding API proper has no use for a dynamically-typed call, since a
    /// real host already knows the signature of whatever it's calling.
    ///
    /// # Safety
    /// Same obligation as [`Self::execute`]: every host import address given
    /// to `compile` must match its descriptor's signature.
    pub unsafe fn call_nullary_export(&self, name: &str) -> Result<ScriptValue> {
        let export = self.resolve_export(name)?;
        if !export.param_types.is_empty() {
            return Err(JitError::UnsupportedExportSignature(name.to_string()));
        }
        let mangled = format!("{}::{name}", self.module_name);
        unsafe {
            match export.return_type {
                MSType::Integer => self
                    .execution_engine
                    .get_function::<unsafe extern "C" fn() -> i32>(&mangled)
                    .map(|f| ScriptValue::Integer(f.call())),
                MSType::Float => self
                    .execution_engine
                    .get_function::<unsafe extern "C" fn() -> f32>(&mangled)
                    .map(|f| ScriptValue::Float(f.call())),
                MSType::Boolean => self
                    .execution_engine
                    .get_function::<unsafe extern "C" fn() -> bool>(&mangled)
                    .map(|f| ScriptValue::Boolean(f.call())),
                MSType::String => self
                    .execution_engine
                    .get_function::<unsafe extern "C" fn() -> *mut mscript_runtime::Handle>(&mangled)
                    .map(|f| ScriptValue::StringHandle(f.call())),
                MSType::Void => self
                    .execution_engine
                    .get_function::<unsafe extern "C" fn()>(&mangled)
                    .map(|f| {
                        f.call();
                        ScriptValue::Void
                    }),
            }
            .map_err(|_| JitError::UnresolvedExport(name.to_string()))
        }
    }

    /// Runs `<module>::$`, the synthesized top-level-statement entrypoint
    /// (`SPEC_FULL.md` section 4.5 "Execution"). Matches `MSExecute`.
    ///
    /// # Safety
    /// Sound as long as every host function address given to `compile`
    /// actually has the signature its import descriptor claimed — the JIT
    /// has no way to check that itself, same as the original C ABI.
    pub unsafe fn execute(&self) -> Result<()> {
        let entry = unsafe {
            self.execution_engine
                .get_function::<unsafe extern "C" fn()>(&self.entrypoint_name)
                .map_err(|_| JitError::UnresolvedExport(self.entrypoint_name.clone()))?
        };
        unsafe { entry.call() };
        Ok(())
    }
}
