//! C code generation (spec §4.G).
//!
//! Holt compiles to C rather than directly to machine code: the generated
//! source is hygienic, uses a stable runtime ABI (`rt_*` functions and
//! `RtHandleV2*`/`RtArena*` types declared in `holt_runtime.h`), and is
//! handed to the configured `cc` by the driver in `lib.rs`. Submodules
//! split by concern the way the front end does: `state` holds the shared
//! emission context and name mangling, `types` maps the type system onto
//! C types, `program`/`statements` lower the AST, and `intercept`/
//! `format`/`closures` each own one cross-cutting runtime protocol.
//! `capture` finds a closure's free variables so `closures` knows what to
//! put in its captured environment.

pub mod capture;
pub mod closures;
pub mod format;
pub mod intercept;
pub mod program;
pub mod state;
pub mod statements;
pub mod types;

use crate::ast::Module;
use holt_core::arena::Arena;

#[derive(Debug, thiserror::Error)]
pub enum CodeGenError {
    #[error("code generation produced no output")]
    Empty,
}

/// Lowers a fully type-checked module to a complete C translation unit.
pub fn generate(module: &Module) -> Result<String, CodeGenError> {
    let arena = Arena::new();
    let cg = state::CodeGen::new(&arena);
    program::generate_module(&cg, module);
    let text = cg.finish();
    if text.trim().is_empty() {
        return Err(CodeGenError::Empty);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FnDef, FnVisibility, Item, SourceLocation, Stmt, StmtKind};
    use crate::types::Type;
    use std::path::PathBuf;
    use std::rc::Rc;

    #[test]
    fn generates_a_function_with_a_return_statement() {
        let loc = SourceLocation::new(Rc::new(PathBuf::from("t.holt")), 1);
        let module = Module {
            items: vec![Item::Fn(FnDef {
                name: "answer".into(),
                params: vec![],
                ret: Type::Int,
                visibility: FnVisibility::Public,
                body: vec![Stmt {
                    kind: StmtKind::Return(Some(crate::ast::Expr::new(
                        crate::ast::ExprKind::Literal(crate::ast::Literal {
                            kind: crate::ast::LiteralKind::Int(42),
                        }),
                        loc.clone(),
                    ))),
                    loc: loc.clone(),
                }],
                loc,
                is_static: false,
            })],
        };
        let c_src = generate(&module).unwrap();
        assert!(c_src.contains("__sn__answer"));
        assert!(c_src.contains("return 42LL;"));
    }

    #[test]
    fn empty_module_still_emits_the_runtime_include() {
        let module = Module { items: vec![] };
        let c_src = generate(&module).unwrap();
        assert!(c_src.contains("#include \"holt_runtime.h\""));
    }
}
