//! JIT Context (C7, `SPEC_FULL.md` section 4.5) plus the public embedding
//! API surface (section 6), grounded on
//! `original_source/MyScript/MyScript.h`'s `MSCreateContext`/`MSCompile`.

use std::sync::Once;

use inkwell::context::Context as InkwellContext;
use inkwell::execution_engine::OptimizationLevel;
use inkwell::targets::{InitializationConfig, Target};

use mscript_par::{Item, Parser};
use mscript_util::{Arena, Handler, Interner};

use crate::error::JitError;
use crate::script::{ExportedSymbol, Script};
use crate::symbol::{ImportedSymbol, ImportedSymbolData, SyntaxErrorCallback};

static NATIVE_TARGET_INIT: Once = Once::new();

/// The JIT context: one-time native-target registration plus the
/// `compile`/`execute` entry points of the embedding API. Per `SPEC_FULL.md`
/// section 5, a context is single-threaded and not `Sync` — that guarantee
/// falls out for free here, since every `Script` it produces is built on
/// raw-pointer-backed `inkwell` types that are themselves `!Sync`, without
/// this struct needing any interior mutability of its own.
pub struct Context {
    optimization_level: OptimizationLevel,
}

impl Default for Context {
    fn default() -> Self {
        Self::create()
    }
}

impl Context {
    /// `MSCreateContext`. Initializes the native target exactly once per
    /// process, via `std::sync::Once`, regardless of how many `Context`s
    /// are created (`SPEC_FULL.md` section 5).
    pub fn create() -> Self {
        NATIVE_TARGET_INIT.call_once(|| {
            Target::initialize_native(&InitializationConfig::default()).expect("failed to initialize native JIT target");
        });
        Self {
            optimization_level: OptimizationLevel::Default,
        }
    }

    /// `MSCompile`. Parses, IR-compiles, and JIT-links one source buffer
    /// against the given import list. Returns `None` — a null script handle,
    /// in the original's terms — on any syntax or semantic error; every
    /// error is delivered to `on_error` before returning (`SPEC_FULL.md`
    /// section 6, "Syntax-error callback").
    ///
    /// Builds a private, leaked LLVM context for the returned [`Script`] to
    /// own outright — see `Script`'s doc comment for why `compile` doesn't
    /// hand out a context-borrowing `Script<'ctx>` instead.
    pub fn compile(
        &self,
        module_name: &str,
        source: &str,
        imports: &[ImportedSymbol],
        on_error: &mut SyntaxErrorCallback,
    ) -> Option<Script> {
        for imp in imports {
            if imp.exceeds_param_cap() {
                on_error(module_name, 0, 0, &JitError::TooManyParameters(imp.name.clone()).to_string());
                return None;
            }
        }
        for (i, imp) in imports.iter().enumerate() {
            if imports[..i].iter().any(|earlier| earlier.name == imp.name) {
                on_error(module_name, 0, 0, &JitError::DuplicateImport(imp.name.clone()).to_string());
                return None;
            }
        }

        let arena = Arena::new();
        let mut handler = Handler::new();
        let mut interner = Interner::new();
        let program = {
            let mut parser = Parser::new(source, &mut handler, &arena, &mut interner);
            parser.parse_program()
        };

        if handler.has_errors() || program.is_none() {
            for diag in handler.take() {
                on_error(module_name, diag.span.line, diag.span.column, &diag.message);
            }
            return None;
        }
        let program = program.expect("checked above");

        let ir_imports: Vec<mscript_ir::Import> = imports
            .iter()
            .map(|imp| {
                let name = mscript_util::Symbol::intern(&mut interner, &imp.name);
                let kind = match &imp.data {
                    ImportedSymbolData::Function { return_type, param_types, .. } => mscript_ir::ImportKind::Function {
                        return_type: *return_type,
                        param_types: param_types.clone(),
                    },
                    ImportedSymbolData::Variable { ty } => mscript_ir::ImportKind::Variable { ty: *ty },
                };
                mscript_ir::Import { name, kind }
            })
            .collect();

        // Leaked for the rest of the process's life (`Script`'s doc
        // comment): one small LLVM context per compiled script.
        let llvm: &'static InkwellContext = Box::leak(Box::new(InkwellContext::create()));

        let module = match mscript_ir::compile(llvm, module_name, &program, &interner, &ir_imports) {
            Ok(module) => module,
            Err(e) => {
                let span = e.span().unwrap_or(mscript_util::Span::DUMMY);
                on_error(module_name, span.line, span.column, &e.to_string());
                return None;
            }
        };

        let execution_engine = match module.create_jit_execution_engine(self.optimization_level) {
            Ok(ee) => ee,
            Err(e) => {
                on_error(module_name, 0, 0, &JitError::ExecutionEngine(e.to_string()).to_string());
                return None;
            }
        };

        // Symbol resolution step 2 (`SPEC_FULL.md` 4.5): bind each host
        // import's address onto its mangled external declaration. Step 1
        // (the fixed runtime intrinsic names) needs no registration here —
        // they're linked by `inkwell`'s own symbol search, since
        // `mscript-runtime` is a normal linked-in crate, not a JIT-time
        // address mapping.
        for imp in imports {
            let mangled = format!("{module_name}::{}", imp.name);
            if let Some(function) = module.get_function(&mangled) {
                execution_engine.add_global_mapping(&function, imp.address);
            } else if let Some(global) = module.get_global(&mangled) {
                execution_engine.add_global_mapping(&global, imp.address);
            }
        }

        // Exported-symbol address resolution: every top-level function
        // definition becomes an export; the synthesized `$` entrypoint
        // itself is never one.
        let mut exports = Vec::new();
        for item in program.items {
            if let Item::Function(f) = item {
                let name = f.name.as_str(&interner).to_string();
                let mangled = format!("{module_name}::{name}");
                match execution_engine.get_function_address(&mangled) {
                    Ok(address) => exports.push(ExportedSymbol {
                        name,
                        address: address as usize,
                        return_type: f.return_type,
                        param_types: f.params.iter().map(|p| p.ty).collect(),
                    }),
                    Err(_) => {
                        on_error(module_name, 0, 0, &JitError::UnresolvedExport(name).to_string());
                        return None;
                    }
                }
            }
        }

        Some(Script::new(module_name.to_string(), imports.to_vec(), exports, llvm, execution_engine))
    }

    /// `MSExecute`. Runs the script's `<module>::$` entrypoint.
    ///
    /// # Safety
    /// See [`Script::execute`] — every host import's address must match the
    /// signature its descriptor claimed.
    pub unsafe fn execute(&self, script: &Script) -> crate::error::Result<()> {
        script.execute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_util::MSType;

    #[test]
    fn compiles_a_script_with_no_imports_and_executes_it() {
        let ctx = Context::create();
        let mut errors = Vec::new();
        let script = ctx.compile("m", "int x = 3;", &[], &mut |_, line, col, msg| {
            errors.push((line, col, msg.to_string()));
        });
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let script = script.expect("must compile");
        unsafe {
            script.execute().expect("entrypoint must run");
        }
    }

    #[test]
    fn syntax_error_is_reported_through_the_callback_and_returns_none() {
        let ctx = Context::create();
        let mut errors = Vec::new();
        let script = ctx.compile("m", "int x = ;", &[], &mut |module, _, _, _| {
            errors.push(module.to_string());
        });
        assert!(script.is_none());
        assert!(!errors.is_empty());
    }

    #[test]
    fn exported_functions_resolve_to_native_addresses() {
        let ctx = Context::create();
        let mut errors = Vec::new();
        let script = ctx
            .compile("m", "function add(int a, int b) : int return a + b; end", &[], &mut |_, _, _, msg| {
                errors.push(msg.to_string());
            })
            .expect("must compile");
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        let export = script.find_export("add").expect("add must be exported");
        assert_ne!(export.address, 0);
    }

    #[test]
    fn too_many_import_parameters_is_reported_without_compiling() {
        let ctx = Context::create();
        let mut errors = Vec::new();
        let imports = vec![ImportedSymbol {
            name: "host_fn".to_string(),
            address: 0x1,
            data: ImportedSymbolData::Function {
                return_type: MSType::Void,
                param_types: vec![MSType::Integer; 11],
                calling_convention: mscript_sem::CallingConvention::CDecl,
            },
        }];
        let script = ctx.compile("m", "", &imports, &mut |_, _, _, msg| {
            errors.push(msg.to_string());
        });
        assert!(script.is_none());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn duplicate_import_names_are_rejected_without_compiling() {
        let ctx = Context::create();
        let mut errors = Vec::new();
        let imports = vec![
            ImportedSymbol {
                name: "host_fn".to_string(),
                address: 0x1,
                data: ImportedSymbolData::Variable { ty: MSType::Integer },
            },
            ImportedSymbol {
                name: "host_fn".to_string(),
                address: 0x2,
                data: ImportedSymbolData::Variable { ty: MSType::Integer },
            },
        ];
        let script = ctx.compile("m", "", &imports, &mut |_, _, _, msg| {
            errors.push(msg.to_string());
        });
        assert!(script.is_none());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("host_fn"));
    }
}
