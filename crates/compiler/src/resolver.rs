//! Import resolution (spec §4.D "import").
//!
//! `import "path"` pulls another module's top-level functions and structs
//! into the importing module. Resolution is recursive and tracks already
//! visited files so a diamond of imports doesn't duplicate definitions.
//! Paths are always resolved relative to the project root (the directory
//! of the file `holtc` was invoked on) and are rejected if they'd escape
//! it, the same containment check the original include mechanism used.

use crate::ast::{Item, Module};
use crate::lexer::lex;
use crate::parser::parse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub struct Resolver {
    visited: HashSet<PathBuf>,
    project_root: Option<PathBuf>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    pub fn new() -> Self {
        Resolver {
            visited: HashSet::new(),
            project_root: None,
        }
    }

    /// Resolves every `import` in `module`, merging their items in. Returns
    /// the merged module plus any parse diagnostics collected along the way.
    pub fn resolve(
        &mut self,
        source_path: &Path,
        module: Module,
    ) -> Result<(Module, Vec<crate::diagnostics::Diagnostic>), String> {
        let canonical = source_path
            .canonicalize()
            .map_err(|e| format!("failed to canonicalize {}: {e}", source_path.display()))?;
        self.visited.insert(canonical.clone());
        if self.project_root.is_none() {
            self.project_root = Some(
                canonical
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(".")),
            );
        }

        let source_dir = canonical.parent().unwrap_or(Path::new("."));
        let mut items = Vec::new();
        let mut diagnostics = Vec::new();

        for item in module.items {
            if let Item::Import { path, .. } = &item {
                let resolved_path = self.resolve_import_path(path, source_dir)?;
                if self.visited.contains(&resolved_path) {
                    continue;
                }
                let source = std::fs::read_to_string(&resolved_path)
                    .map_err(|e| format!("failed to read {}: {e}", resolved_path.display()))?;
                let tokens = lex(&source, resolved_path.clone());
                let (imported_module, parse_diags) = parse(tokens);
                diagnostics.extend(parse_diags);
                let (merged, nested_diags) = self.resolve(&resolved_path, imported_module)?;
                diagnostics.extend(nested_diags);
                items.extend(merged.items);
            } else {
                items.push(item);
            }
        }

        Ok((Module { items }, diagnostics))
    }

    fn resolve_import_path(&self, import_path: &str, source_dir: &Path) -> Result<PathBuf, String> {
        let candidate = Path::new(import_path);
        if candidate.is_absolute() {
            return Err(format!("import path '{import_path}' must be relative"));
        }
        let joined = source_dir.join(format!("{import_path}.holt"));
        if !joined.exists() {
            return Err(format!("import '{import_path}' not found at {}", joined.display()));
        }
        let canonical = joined
            .canonicalize()
            .map_err(|e| format!("failed to resolve import '{import_path}': {e}"))?;
        if let Some(root) = &self.project_root {
            let canonical_root = root
                .canonicalize()
                .map_err(|e| format!("failed to resolve project root: {e}"))?;
            if !canonical.starts_with(&canonical_root) {
                return Err(format!("import '{import_path}' resolves outside the project directory"));
            }
        }
        Ok(canonical)
    }
}

/// Reports every function name defined more than once across a fully
/// resolved module (spec §4.D: imports must not silently shadow).
pub fn check_fn_collisions(module: &Module) -> Result<(), String> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();
    for f in module.functions() {
        if !seen.insert(&f.name) {
            errors.push(format!(
                "function '{}' is defined multiple times (see {})",
                f.name, f.loc
            ));
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn import_outside_project_root_is_rejected() {
        let temp = tempdir().unwrap();
        let outside = temp.path().join("outside");
        let project = temp.path().join("project");
        fs::create_dir_all(&outside).unwrap();
        fs::create_dir_all(&project).unwrap();
        fs::write(outside.join("secret.holt"), "fn secret():\n    return\n").unwrap();
        fs::write(project.join("main.holt"), "import \"../outside/secret\"\n").unwrap();

        let mut resolver = Resolver::new();
        let source = fs::read_to_string(project.join("main.holt")).unwrap();
        let tokens = lex(&source, project.join("main.holt"));
        let (module, _) = parse(tokens);
        let result = resolver.resolve(&project.join("main.holt"), module);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("outside"));
    }

    #[test]
    fn import_within_project_merges_functions() {
        let temp = tempdir().unwrap();
        let project = temp.path();
        fs::write(project.join("helper.holt"), "fn helper(): int:\n    return 1\n").unwrap();
        fs::write(project.join("main.holt"), "import \"helper\"\nfn main():\n    return\n").unwrap();

        let mut resolver = Resolver::new();
        let source = fs::read_to_string(project.join("main.holt")).unwrap();
        let tokens = lex(&source, project.join("main.holt"));
        let (module, _) = parse(tokens);
        let (merged, _) = resolver.resolve(&project.join("main.holt"), module).unwrap();
        assert_eq!(merged.functions().count(), 2);
    }

    #[test]
    fn duplicate_function_names_are_reported() {
        let a = crate::ast::FnDef {
            name: "foo".into(),
            params: vec![],
            ret: crate::types::Type::Void,
            visibility: crate::ast::FnVisibility::Public,
            body: vec![],
            loc: crate::ast::SourceLocation::new(std::rc::Rc::new(PathBuf::from("a.holt")), 1),
            is_static: false,
        };
        let b = crate::ast::FnDef { loc: crate::ast::SourceLocation::new(std::rc::Rc::new(PathBuf::from("b.holt")), 2), ..a.clone() };
        let module = Module { items: vec![Item::Fn(a), Item::Fn(b)] };
        assert!(check_fn_collisions(&module).is_err());
    }
}
