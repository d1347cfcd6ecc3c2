//! `holtc` command-line interface.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use holtc::{CompileError, CompilerConfig};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "holtc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Holt compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .holt file to an executable
    Build {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep the intermediate generated C file
        #[arg(long)]
        keep_c: bool,

        /// Stop after code generation; write the .c file without invoking cc
        #[arg(long)]
        emit_only: bool,
    },

    /// Lex, parse and type check a .holt file without generating code
    Check { input: PathBuf },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build { input, output, keep_c, emit_only } => run_build(&input, output, keep_c, emit_only),
        Commands::Check { input } => run_check(&input),
        Commands::Completions { shell } => {
            run_completions(shell);
            ExitCode::SUCCESS
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "holtc", &mut io::stdout());
}

fn project_config(input: &std::path::Path) -> CompilerConfig {
    let dir = input.parent().unwrap_or_else(|| std::path::Path::new("."));
    match holtc::find_project_file(dir) {
        Some(path) => match holtc::ProjectFile::load(&path) {
            Ok(project) => {
                tracing::debug!(path = %path.display(), "loaded project file");
                CompilerConfig::new().with_project(project)
            }
            Err(e) => {
                tracing::warn!(%e, "failed to load holt.toml, using defaults");
                CompilerConfig::default()
            }
        },
        None => CompilerConfig::default(),
    }
}

fn run_build(input: &std::path::Path, output: Option<PathBuf>, keep_c: bool, emit_only: bool) -> ExitCode {
    let output = output.unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default();
        PathBuf::from(stem)
    });
    let config = project_config(input);

    if emit_only {
        return match holtc::compile_to_c_with_config(input, &config) {
            Ok(c_src) => {
                let c_path = output.with_extension("c");
                if std::fs::write(&c_path, c_src).is_err() {
                    eprintln!("error: failed to write {}", c_path.display());
                    return ExitCode::from(1);
                }
                println!("Wrote {}", c_path.display());
                ExitCode::SUCCESS
            }
            Err(e) => report_compile_error(&e),
        };
    }

    match holtc::compile_file_with_config(input, &output, &config) {
        Ok(()) => {
            println!("Compiled {} -> {}", input.display(), output.display());
            if keep_c {
                let c_path = output.with_extension("c");
                if c_path.exists() {
                    println!("C source kept at {}", c_path.display());
                }
            } else {
                let _ = std::fs::remove_file(output.with_extension("c"));
            }
            ExitCode::SUCCESS
        }
        Err(e) => report_compile_error(&e),
    }
}

fn run_check(input: &std::path::Path) -> ExitCode {
    let config = project_config(input);
    match holtc::compile_to_c_with_config(input, &config) {
        Ok(_) => {
            println!("OK: {}", input.display());
            ExitCode::SUCCESS
        }
        Err(e) => report_compile_error(&e),
    }
}

fn report_compile_error(err: &CompileError) -> ExitCode {
    match err {
        CompileError::TypeCheck(diagnostics) => {
            for d in diagnostics {
                eprintln!("{d}");
            }
            ExitCode::from(1)
        }
        CompileError::CGenCompile { cc, stderr } => {
            eprintln!("{cc} failed:\n{stderr}");
            ExitCode::from(3)
        }
        other => {
            eprintln!("error: {other}");
            ExitCode::from(1)
        }
    }
}
