//! Compiler library for Holt: source text to a linked executable through a
//! generated C translation unit.
//!
//! # Extending the compiler
//!
//! Host applications can register additional `native` symbols and linker
//! flags through [`CompilerConfig`]:
//!
//! ```rust,ignore
//! use holt_compiler::{CompilerConfig, NativeBuiltin};
//! use holt_compiler::compile_file_with_config;
//!
//! let config = CompilerConfig::new()
//!     .with_builtin(NativeBuiltin::new("clock_ms", "rt_clock_ms"));
//!
//! compile_file_with_config(source, output, false, &config)?;
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod lexer;
pub mod optimizer;
pub mod parser;
pub mod resolver;
pub mod symtab;
pub mod token;
pub mod typechecker;
pub mod types;

pub use ast::Module;
pub use config::{CompilerConfig, NativeBuiltin, ProjectFile};
pub use diagnostics::{Diagnostic, Severity};
pub use optimizer::Optimizer;
pub use resolver::Resolver;
pub use typechecker::{CheckResult, TypeChecker};
pub use types::Type;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Embedded runtime static library, built by `build.rs`. On docs.rs there is
/// no C toolchain and no built `libholt_runtime.a` to embed, so the
/// `docsrs` feature swaps in an empty slice instead.
#[cfg(not(feature = "docsrs"))]
static RUNTIME_LIB: &[u8] = include_bytes!(env!("HOLT_RUNTIME_LIB_PATH"));

#[cfg(feature = "docsrs")]
static RUNTIME_LIB: &[u8] = &[];

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Io(String),
    #[error("{0}")]
    Import(String),
    #[error("type errors:\n{}", format_diagnostics(.0))]
    TypeCheck(Vec<Diagnostic>),
    #[error("code generation failed: {0}")]
    CodeGen(#[from] codegen::CodeGenError),
    #[error("{cc} failed:\n{stderr}")]
    CGenCompile { cc: String, stderr: String },
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses, resolves imports, type checks and optimizes `source_path`,
/// returning the generated C translation unit without invoking a C
/// compiler (used by tests and `holtc check`).
pub fn compile_to_c(source_path: &Path) -> Result<String, CompileError> {
    compile_to_c_with_config(source_path, &CompilerConfig::default())
}

pub fn compile_to_c_with_config(
    source_path: &Path,
    _config: &CompilerConfig,
) -> Result<String, CompileError> {
    let source = fs::read_to_string(source_path).map_err(|e| CompileError::Io(e.to_string()))?;
    let tokens = lexer::lex(&source, source_path.to_path_buf());
    let (module, parse_diagnostics) = parser::parse(tokens);
    if parse_diagnostics.iter().any(Diagnostic::is_error) {
        return Err(CompileError::TypeCheck(parse_diagnostics));
    }

    let mut resolver = Resolver::new();
    let (mut module, import_diagnostics) = resolver
        .resolve(source_path, module)
        .map_err(CompileError::Import)?;
    if import_diagnostics.iter().any(Diagnostic::is_error) {
        return Err(CompileError::TypeCheck(import_diagnostics));
    }
    resolver::check_fn_collisions(&module).map_err(CompileError::Import)?;

    let checker = TypeChecker::new(source_path.to_path_buf());
    let check_result = checker.check_module(&mut module);
    if check_result.errored {
        return Err(CompileError::TypeCheck(check_result.diagnostics));
    }

    let mut optimizer = Optimizer::new();
    optimizer.optimize_module(&mut module);

    let c_src = codegen::generate(&module)?;
    Ok(c_src)
}

/// Compiles `source_path` all the way to an executable at `output_path`,
/// shelling out to the configured `cc` to compile and link the generated
/// C against the Holt runtime.
pub fn compile_file(source_path: &Path, output_path: &Path) -> Result<(), CompileError> {
    compile_file_with_config(source_path, output_path, &CompilerConfig::default())
}

pub fn compile_file_with_config(
    source_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), CompileError> {
    let c_src = compile_to_c_with_config(source_path, config)?;

    let c_path = output_path.with_extension("c");
    fs::write(&c_path, &c_src).map_err(|e| CompileError::Io(e.to_string()))?;

    // Extract the embedded runtime static library to a temp file so `cc`
    // has a `-L` directory to find it in, the way a freshly installed
    // `holtc` (with no sibling `target/` checkout) still links.
    let runtime_dir = std::env::temp_dir();
    let runtime_path = runtime_dir.join("libholt_runtime.a");
    fs::write(&runtime_path, RUNTIME_LIB).map_err(|e| CompileError::Io(e.to_string()))?;

    let cc = &config.project.cc;
    let mut cmd = Command::new(cc);
    cmd.arg(&c_path).arg("-o").arg(output_path);
    cmd.args(&config.project.cc_flags);
    cmd.arg("-I").arg(concat!(env!("CARGO_MANIFEST_DIR"), "/../runtime/include"));
    cmd.arg("-L").arg(&runtime_dir);
    for path in &config.library_paths {
        cmd.arg("-L").arg(path);
    }
    for lib in &config.libraries {
        cmd.arg("-l").arg(lib);
    }
    cmd.arg("-lholt_runtime");

    let output = cmd.output().map_err(|e| CompileError::Io(e.to_string()))?;
    fs::remove_file(&runtime_path).ok();
    if !output.status.success() {
        return Err(CompileError::CGenCompile {
            cc: cc.clone(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

/// Locates the Holt project file (`holt.toml`) starting at `start_dir` and
/// walking up to the filesystem root, the way a build tool's config
/// discovery usually works.
pub fn find_project_file(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = Some(start_dir);
    while let Some(d) = dir {
        let candidate = d.join("holt.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = d.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn compile_to_c_rejects_unresolved_imports() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main.holt");
        fs::write(&path, "import \"missing\"\nfn main():\n    return\n").unwrap();
        let result = compile_to_c(&path);
        assert!(result.is_err());
    }

    #[test]
    fn compile_to_c_succeeds_for_a_minimal_function() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("main.holt");
        fs::write(&path, "fn answer(): int:\n    return 42\n").unwrap();
        let result = compile_to_c(&path);
        assert!(result.is_ok(), "{:?}", result.err());
        assert!(result.unwrap().contains("__sn__answer"));
    }

    #[test]
    fn find_project_file_walks_up_to_an_ancestor() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp.path().join("holt.toml"), "").unwrap();
        assert_eq!(find_project_file(&nested), Some(temp.path().join("holt.toml")));
    }
}
