//! Build script for holt-compiler.
//!
//! Locates the built `libholt_runtime.a` so it can be embedded into the
//! `holtc` binary, and checks that the runtime crate pinned in Cargo.toml
//! matches this crate's own version.

use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    verify_runtime_version();

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // OUT_DIR = target/<profile>/build/<pkg>-<hash>/out
    let target_dir = out_dir
        .parent() // build/<pkg>-<hash>/out -> build/<pkg>-<hash>
        .and_then(|p| p.parent()) // -> build
        .and_then(|p| p.parent()) // -> <profile>
        .expect("could not find target directory from OUT_DIR");

    let direct_lib = target_dir.join("libholt_runtime.a");
    let runtime_lib = if direct_lib.exists() {
        direct_lib
    } else {
        let deps_dir = target_dir.join("deps");
        find_runtime_in_deps(&deps_dir).unwrap_or_else(|| {
            panic!(
                "holt-runtime static library not found.\n\
                 Looked in: {}\n\
                 And deps: {}\n\
                 OUT_DIR was: {}",
                direct_lib.display(),
                deps_dir.display(),
                out_dir.display()
            )
        })
    };

    println!("cargo:rustc-env=HOLT_RUNTIME_LIB_PATH={}", runtime_lib.display());
    println!("cargo:rerun-if-changed={}", runtime_lib.display());
}

fn find_runtime_in_deps(deps_dir: &PathBuf) -> Option<PathBuf> {
    if !deps_dir.exists() {
        return None;
    }
    fs::read_dir(deps_dir).ok()?.find_map(|entry| {
        let entry = entry.ok()?;
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with("libholt_runtime") && name_str.ends_with(".a") {
            Some(entry.path())
        } else {
            None
        }
    })
}

/// The embedded runtime must exactly match this crate's version so a
/// published `holtc` never silently links a stale runtime.
fn verify_runtime_version() {
    let compiler_version = env!("CARGO_PKG_VERSION");
    let cargo_toml = fs::read_to_string("Cargo.toml").expect("failed to read compiler/Cargo.toml");

    let runtime_version = cargo_toml
        .lines()
        .find(|line| line.contains("holt-runtime") && line.contains("version"))
        .and_then(|line| line.split("version = \"").nth(1)?.split('"').next())
        .expect("could not find holt-runtime version in Cargo.toml");
    let runtime_version = runtime_version.trim_start_matches('=');

    if compiler_version != runtime_version {
        panic!(
            "holt-compiler version {compiler_version} does not match the pinned \
             holt-runtime version {runtime_version}; update Cargo.toml's \
             holt-runtime dependency to \"={compiler_version}\"."
        );
    }
}
