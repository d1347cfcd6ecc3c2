//! Compiler configuration for extensibility (spec §3 "CompilerConfig").
//!
//! Lets an embedding crate register extra native function declarations
//! (name, C symbol, signature) before compiling, without editing the
//! compiler itself, and carries the optional `holt.toml` project settings.
//!
//! ```rust,ignore
//! use holtc::{CompilerConfig, NativeBuiltin};
//! use holtc::types::Type;
//!
//! let config = CompilerConfig::new().with_builtin(NativeBuiltin::with_signature(
//!     "journal_append",
//!     "host_journal_append",
//!     vec![Type::String],
//!     Type::Void,
//! ));
//! ```

use crate::types::Type;
use serde::Deserialize;
use std::path::PathBuf;

/// A native function declaration supplied by an embedding crate rather
/// than defined in Holt source.
#[derive(Debug, Clone)]
pub struct NativeBuiltin {
    /// The name used in Holt source (e.g. `journal_append`).
    pub holt_name: String,
    /// The C symbol to call (e.g. `host_journal_append`). Must contain
    /// only alphanumeric characters and underscores so it can never
    /// inject arbitrary C source text.
    pub symbol: String,
    /// `None` means the checker assigns the maximally permissive
    /// signature `(..) -> any`, deferring all checking to the native C
    /// side; prefer `with_signature` whenever the shape is known.
    pub signature: Option<(Vec<Type>, Type)>,
}

impl NativeBuiltin {
    fn validate_symbol(symbol: &str) -> Result<(), String> {
        if symbol.is_empty() {
            return Err("native symbol name cannot be empty".to_string());
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(format!(
                "invalid character in native symbol '{symbol}': only ASCII \
                 alphanumerics and underscores are allowed"
            ));
        }
        Ok(())
    }

    /// # Panics
    /// Panics if `symbol` contains a character that could not appear in a
    /// valid C identifier.
    pub fn new(holt_name: impl Into<String>, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self::validate_symbol(&symbol).expect("invalid native symbol");
        NativeBuiltin {
            holt_name: holt_name.into(),
            symbol,
            signature: None,
        }
    }

    pub fn with_signature(
        holt_name: impl Into<String>,
        symbol: impl Into<String>,
        params: Vec<Type>,
        ret: Type,
    ) -> Self {
        let symbol = symbol.into();
        Self::validate_symbol(&symbol).expect("invalid native symbol");
        NativeBuiltin {
            holt_name: holt_name.into(),
            symbol,
            signature: Some((params, ret)),
        }
    }
}

/// Optional `holt.toml` project file: output directory and the system C
/// compiler to invoke after code generation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub output_dir: PathBuf,
    pub cc: String,
    pub cc_flags: Vec<String>,
}

impl Default for ProjectFile {
    fn default() -> Self {
        ProjectFile {
            output_dir: PathBuf::from("."),
            cc: "cc".to_string(),
            cc_flags: Vec::new(),
        }
    }
}

impl ProjectFile {
    pub fn load(path: &std::path::Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
        toml::from_str(&text).map_err(|e| format!("failed to parse '{}': {e}", path.display()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    pub native_builtins: Vec<NativeBuiltin>,
    pub library_paths: Vec<String>,
    pub libraries: Vec<String>,
    pub project: ProjectFile,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_builtin(mut self, builtin: NativeBuiltin) -> Self {
        self.native_builtins.push(builtin);
        self
    }

    pub fn with_builtins(mut self, builtins: impl IntoIterator<Item = NativeBuiltin>) -> Self {
        self.native_builtins.extend(builtins);
        self
    }

    pub fn with_library_path(mut self, path: impl Into<String>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    pub fn with_library(mut self, lib: impl Into<String>) -> Self {
        self.libraries.push(lib.into());
        self
    }

    pub fn with_project(mut self, project: ProjectFile) -> Self {
        self.project = project;
        self
    }

    pub fn native_names(&self) -> Vec<&str> {
        self.native_builtins
            .iter()
            .map(|b| b.holt_name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_without_signature_defers_checking() {
        let b = NativeBuiltin::new("host_log", "host_log_impl");
        assert!(b.signature.is_none());
    }

    #[test]
    fn config_builder_accumulates_builtins_and_libs() {
        let config = CompilerConfig::new()
            .with_builtin(NativeBuiltin::new("a", "sym_a"))
            .with_builtin(NativeBuiltin::new("b", "sym_b"))
            .with_library_path("/custom/lib")
            .with_library("m");
        assert_eq!(config.native_builtins.len(), 2);
        assert_eq!(config.library_paths, vec!["/custom/lib"]);
        assert_eq!(config.libraries, vec!["m"]);
        assert_eq!(config.native_names(), vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "invalid native symbol")]
    fn symbol_validation_rejects_hyphen() {
        let _ = NativeBuiltin::new("test", "invalid-symbol");
    }

    #[test]
    fn project_file_has_sensible_defaults() {
        let project = ProjectFile::default();
        assert_eq!(project.cc, "cc");
        assert!(project.cc_flags.is_empty());
    }

    #[test]
    fn project_file_parses_toml() {
        let toml_text = "output_dir = \"build\"\ncc = \"clang\"\ncc_flags = [\"-O2\"]\n";
        let project: ProjectFile = toml::from_str(toml_text).unwrap();
        assert_eq!(project.output_dir, PathBuf::from("build"));
        assert_eq!(project.cc, "clang");
        assert_eq!(project.cc_flags, vec!["-O2"]);
    }
}
