//! `msc` — the standalone driver for the compile/JIT pipeline
//! (`SPEC_FULL.md` section 4.9, C11).
//!
//! Reads one `.ms` file, compiles and links it through [`mscript_jit`],
//! runs its top-level statements, and optionally prints the return value of
//! a single designated exported function. The embedding API (`SPEC_FULL.md`
//! section 6) is the real product surface; this binary only exists so the
//! pipeline can be exercised from a shell without writing a host program.

mod error;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mscript_jit::{Context, HostString, ImportedSymbol, ScriptValue};

use error::DriverError;

/// Compile and run a MyScript source file.
#[derive(Parser, Debug)]
#[command(name = "msc", version, about = "Compile and run a MyScript source file")]
struct Cli {
    /// Path to the `.ms` source file to compile and run.
    source: PathBuf,

    /// Print the return value of this exported, zero-argument function
    /// after running the script's top-level statements.
    #[arg(short, long)]
    export: Option<String>,

    /// Enable debug-level tracing of the compile/execute pipeline.
    #[arg(short, long)]
    verbose: bool,
}

/// Top-level error reporting follows the teacher's `anyhow` convention: a
/// returned `Err` prints its message and exits with status 1. Per-diagnostic
/// detail (`module:line:col: message`) is already on stderr by the time a
/// [`DriverError::CompileFailed`] bubbles up here.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(&cli)?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose { EnvFilter::new("debug") } else { EnvFilter::new("info") };
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .try_init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let source = fs::read_to_string(&cli.source).map_err(|source| DriverError::ReadSource {
        path: cli.source.display().to_string(),
        source,
    })?;
    let module_name = module_name_of(&cli.source);

    tracing::debug!(module = %module_name, bytes = source.len(), "compiling");
    let context = Context::create();
    let imports: Vec<ImportedSymbol> = Vec::new();
    let mut had_errors = false;
    let script = context.compile(&module_name, &source, &imports, &mut |module, line, col, msg| {
        had_errors = true;
        eprintln!("{module}:{line}:{col}: {msg}");
    });

    let script = match script {
        Some(script) if !had_errors => script,
        _ => return Err(DriverError::CompileFailed.into()),
    };

    tracing::debug!(exports = script.exports().len(), "executing entrypoint");
    unsafe {
        script.execute()?;
    }

    if let Some(name) = &cli.export {
        tracing::debug!(export = %name, "invoking designated export");
        let value = unsafe { script.call_nullary_export(name)? };
        print_value(name, value);
    }

    Ok(())
}

fn module_name_of(path: &Path) -> String {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or("script").to_string()
}

fn print_value(name: &str, value: ScriptValue) {
    match value {
        ScriptValue::Integer(v) => println!("{name} = {v}"),
        ScriptValue::Float(v) => println!("{name} = {v}"),
        ScriptValue::Boolean(v) => println!("{name} = {v}"),
        ScriptValue::Void => println!("{name} = void"),
        ScriptValue::StringHandle(handle) => {
            let owned = unsafe { HostString::from_raw(handle) };
            let ptr = owned.as_ptr();
            let len = unsafe { mscript_runtime::strlen(owned.as_raw()) };
            if ptr.is_null() || len <= 0 {
                println!("{name} = \"\"");
                return;
            }
            let units = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
            println!("{name} = \"{}\"", String::from_utf16_lossy(units));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_of_strips_directory_and_extension() {
        assert_eq!(module_name_of(Path::new("/tmp/hello.ms")), "hello");
    }

    #[test]
    fn module_name_of_falls_back_for_extensionless_paths() {
        assert_eq!(module_name_of(Path::new("/")), "script");
    }
}
