//! Per-module C emission (spec §4.G `codegen/program.rs`).
//!
//! Emits the runtime header include, one `typedef struct` per Holt struct
//! (field offsets recorded as comments for readability since the layout
//! itself lives on `StructType`, not in the generated text), and one C
//! function per top-level function and struct method.

use crate::ast::{Expr, ExprKind, InterpPart, MatchArm, Module, Stmt, StmtKind, StructDef};
use crate::codegen::closures::{closure_struct_name, emit_closure_struct};
use crate::codegen::state::{mangle, CodeGen};
use crate::codegen::statements::generate_fn;
use crate::codegen::types::c_type;
use crate::types::{StructKind, Type};

pub fn generate_module(cg: &CodeGen, module: &Module) {
    cg.emit("#include \"holt_runtime.h\"");
    cg.emit("");
    emit_closure_structs(cg, module);
    for s in module.structs() {
        generate_struct(cg, s);
    }
    for f in module.functions() {
        generate_fn(cg, f, None);
    }
    emit_c_main(cg, module);
    cg.flush_hoisted();
}

/// Every compiled module with a `main` function gets a literal C `main`
/// calling through to `__sn__main`, so the translation unit links into a
/// runnable executable on its own (spec §6 CLI: "accepts a source path
/// and an output path"). A `void main` becomes exit code `0`; otherwise
/// its return value is the exit code.
fn emit_c_main(cg: &CodeGen, module: &Module) {
    let Some(main_fn) = module.functions().find(|f| f.name == "main") else {
        return;
    };
    cg.emit("int main(void) {");
    if matches!(main_fn.ret, Type::Void) {
        cg.emit(&format!("    {}();", mangle(&main_fn.name)));
        cg.emit("    return 0;");
    } else {
        cg.emit(&format!("    return (int){}();", mangle(&main_fn.name)));
    }
    cg.emit("}");
}

/// Every closure literal's struct type must exist before the first
/// function body that constructs one, so these are swept and emitted up
/// front rather than discovered lazily during statement lowering.
fn emit_closure_structs(cg: &CodeGen, module: &Module) {
    for s in module.structs() {
        for m in &s.methods {
            for stmt in &m.body {
                collect_stmt_closure_structs(cg, stmt);
            }
        }
    }
    for f in module.functions() {
        for stmt in &f.body {
            collect_stmt_closure_structs(cg, stmt);
        }
    }
}

fn collect_stmt_closure_structs(cg: &CodeGen, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Expr(e) => collect_expr_closure_structs(cg, e),
        StmtKind::Let { value, .. } => collect_expr_closure_structs(cg, value),
        StmtKind::Return(Some(e)) => collect_expr_closure_structs(cg, e),
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => {}
        StmtKind::While { cond, body } => {
            collect_expr_closure_structs(cg, cond);
            body.iter().for_each(|s| collect_stmt_closure_structs(cg, s));
        }
        StmtKind::For { iterable, body, .. } => {
            collect_expr_closure_structs(cg, iterable);
            body.iter().for_each(|s| collect_stmt_closure_structs(cg, s));
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            collect_expr_closure_structs(cg, cond);
            then_branch.iter().for_each(|s| collect_stmt_closure_structs(cg, s));
            else_branch.iter().flatten().for_each(|s| collect_stmt_closure_structs(cg, s));
        }
        StmtKind::Private { body } => {
            body.iter().for_each(|s| collect_stmt_closure_structs(cg, s));
        }
    }
}

fn collect_expr_closure_structs(cg: &CodeGen, expr: &Expr) {
    if let ExprKind::Closure { params, body } = &expr.kind {
        if let Some(Type::Function { ret, .. }) = expr.meta.resolved_type.as_ref() {
            let param_tys: Vec<Type> = params.iter().map(|p| p.ty.clone()).collect();
            let name = closure_struct_name(&param_tys, ret);
            if cg.mark_closure_struct_pending(&name) {
                cg.emit(&emit_closure_struct(&param_tys, ret));
            }
        }
        collect_expr_closure_structs(cg, body);
        return;
    }
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::SizeOf(_) => {}
        ExprKind::Interpolated(parts) => {
            for part in parts {
                if let InterpPart::Hole { expr: hole, .. } = part {
                    collect_expr_closure_structs(cg, hole);
                }
            }
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_expr_closure_structs(cg, lhs);
            collect_expr_closure_structs(cg, rhs);
        }
        ExprKind::Unary { operand, .. } | ExprKind::TypeOf(operand) => collect_expr_closure_structs(cg, operand),
        ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
            collect_expr_closure_structs(cg, target);
            collect_expr_closure_structs(cg, value);
        }
        ExprKind::Call { callee, args } => {
            collect_expr_closure_structs(cg, callee);
            args.iter().for_each(|a| collect_expr_closure_structs(cg, a));
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            collect_expr_closure_structs(cg, receiver);
            args.iter().for_each(|a| collect_expr_closure_structs(cg, a));
        }
        ExprKind::FieldAccess { receiver, .. } => collect_expr_closure_structs(cg, receiver),
        ExprKind::Index { receiver, index } => {
            collect_expr_closure_structs(cg, receiver);
            collect_expr_closure_structs(cg, index);
        }
        ExprKind::ArrayLiteral(items) => items.iter().for_each(|i| collect_expr_closure_structs(cg, i)),
        ExprKind::StructLiteral { fields, .. } => fields.iter().for_each(|(_, v)| collect_expr_closure_structs(cg, v)),
        ExprKind::Cast { expr: inner, .. } | ExprKind::TypeTest { expr: inner, .. } => {
            collect_expr_closure_structs(cg, inner)
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            collect_expr_closure_structs(cg, cond);
            collect_expr_closure_structs(cg, then_branch);
            else_branch.iter().for_each(|e| collect_expr_closure_structs(cg, e));
        }
        ExprKind::Match { scrutinee, arms } => {
            collect_expr_closure_structs(cg, scrutinee);
            arms.iter().for_each(|a: &MatchArm| {
                if let Some(g) = &a.guard {
                    collect_expr_closure_structs(cg, g);
                }
                collect_expr_closure_structs(cg, &a.body);
            });
        }
        ExprKind::Block(stmts) => stmts.iter().for_each(|s| collect_stmt_closure_structs(cg, s)),
        ExprKind::Closure { .. } => unreachable!("handled above"),
        ExprKind::Lock { guard, body } => {
            collect_expr_closure_structs(cg, guard);
            collect_expr_closure_structs(cg, body);
        }
        ExprKind::Sync(items) => items.iter().for_each(|i| collect_expr_closure_structs(cg, i)),
    }
}

fn generate_struct(cg: &CodeGen, def: &StructDef) {
    if def.kind == StructKind::Native {
        cg.emit(&format!(
            "/* struct {} is native: layout owned by hand-written C */",
            def.name
        ));
        cg.emit("");
        return;
    }

    let mangled = mangle(&def.name);
    let packed_attr = if def.kind == StructKind::Packed {
        " __attribute__((packed))"
    } else {
        ""
    };
    cg.emit(&format!("typedef struct {mangled} {{"));
    let mut offset = 0u32;
    for field in &def.fields {
        let c_ty = c_type(&field.ty);
        cg.emit(&format!("    {c_ty} {}; /* offset {offset} */", field.name));
        if def.kind == StructKind::Regular {
            let align = field.ty.alignment();
            offset = (offset + align - 1) / align * align;
        }
        offset += field.ty.size_of();
    }
    cg.emit(&format!("}}{packed_attr} {mangled};"));
    cg.emit("");

    for method in &def.methods {
        generate_fn(cg, method, Some(&def.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Item, SourceLocation, StructFieldDef};
    use crate::types::Type;
    use holt_core::arena::Arena;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation::new(Rc::new(PathBuf::from("t.holt")), 1)
    }

    #[test]
    fn native_struct_emits_no_typedef() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let def = StructDef {
            name: "FileHandle".into(),
            fields: vec![],
            methods: vec![],
            kind: StructKind::Native,
            loc: loc(),
        };
        generate_struct(&cg, &def);
        let out = cg.finish();
        assert!(!out.contains("typedef struct"));
        assert!(out.contains("native"));
    }

    #[test]
    fn regular_struct_emits_field_offsets_as_comments() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let def = StructDef {
            name: "Point".into(),
            fields: vec![
                StructFieldDef { name: "x".into(), ty: Type::Int32, default: None },
                StructFieldDef { name: "y".into(), ty: Type::Int32, default: None },
            ],
            methods: vec![],
            kind: StructKind::Regular,
            loc: loc(),
        };
        generate_struct(&cg, &def);
        let out = cg.finish();
        assert!(out.contains("offset 0"));
        assert!(out.contains("offset 4"));
    }

    #[test]
    fn module_emits_include_before_anything_else() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let module = Module { items: vec![] };
        generate_module(&cg, &module);
        let out = cg.finish();
        assert!(out.starts_with("#include \"holt_runtime.h\""));
        let _ = Item::Import { path: "x".into(), loc: loc() };
    }

    fn closure_literal(ret: Type) -> Expr {
        let mut e = Expr::new(
            ExprKind::Closure {
                params: vec![],
                body: Box::new(Expr::new(
                    ExprKind::Literal(crate::ast::Literal { kind: crate::ast::LiteralKind::Int(1) }),
                    loc(),
                )),
            },
            loc(),
        );
        e.meta.resolved_type = Some(Type::Function { params: vec![], ret: Box::new(ret) });
        e
    }

    #[test]
    fn two_closures_sharing_a_signature_emit_one_struct_typedef() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let module = Module {
            items: vec![Item::Fn(crate::ast::FnDef {
                name: "make_both".into(),
                params: vec![],
                ret: Type::Void,
                visibility: crate::ast::FnVisibility::Public,
                body: vec![
                    Stmt { kind: StmtKind::Expr(closure_literal(Type::Int)), loc: loc() },
                    Stmt { kind: StmtKind::Expr(closure_literal(Type::Int)), loc: loc() },
                ],
                loc: loc(),
                is_static: false,
            })],
        };
        generate_module(&cg, &module);
        let out = cg.finish();
        assert_eq!(out.matches("typedef struct __sn__closure_to_int").count(), 1);
    }
}
