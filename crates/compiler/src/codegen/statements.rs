//! Statement and expression lowering to C (spec §4.G).
//!
//! Every block expression (`ExprKind::Block`, and a function's top-level
//! body) gets its own child arena of whatever arena was current when the
//! block was entered. On exit, if the block's result type is
//! reference-like the result handle is promoted into the parent arena
//! before the child is destroyed (spec §4.E.4 escape analysis feeding
//! directly into codegen's allocation decisions, spec §9 REDESIGN FLAG).
//! Division and remainder always lower to the checked runtime helpers so a
//! zero divisor traps instead of invoking undefined C behavior.

use crate::ast::{BinOp, Expr, ExprKind, FnDef, FnVisibility, LiteralKind, Param, Stmt, StmtKind, UnOp};
use crate::codegen::format::{format_call, parse_format_spec};
use crate::codegen::intercept::{emit_thunk, thunk_name};
use crate::codegen::state::{mangle, mangle_method, CodeGen};
use crate::codegen::types::c_type;
use crate::types::Type;

fn fn_mangled_name(f: &FnDef, owner: Option<&str>) -> String {
    match owner {
        Some(struct_name) => mangle_method(struct_name, &f.name),
        None => mangle(&f.name),
    }
}

/// `true` if anything the function does touches a reference-like value,
/// meaning it needs an activation arena at all. Functions operating purely
/// on primitives skip arena creation entirely (spec §4.G).
fn needs_arena(f: &FnDef) -> bool {
    f.params.iter().any(|p| p.ty.is_reference_like())
        || f.ret.is_reference_like()
        || f.body.iter().any(stmt_touches_reference)
}

fn stmt_touches_reference(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Expr(e) => expr_touches_reference(e),
        StmtKind::Let { ty, value, .. } => {
            ty.as_ref().is_some_and(Type::is_reference_like) || expr_touches_reference(value)
        }
        StmtKind::Return(Some(e)) => expr_touches_reference(e),
        StmtKind::Return(None) | StmtKind::Break | StmtKind::Continue => false,
        StmtKind::While { cond, body } => expr_touches_reference(cond) || body.iter().any(stmt_touches_reference),
        StmtKind::For { iterable, body, .. } => {
            expr_touches_reference(iterable) || body.iter().any(stmt_touches_reference)
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            expr_touches_reference(cond)
                || then_branch.iter().any(stmt_touches_reference)
                || else_branch.as_ref().is_some_and(|b| b.iter().any(stmt_touches_reference))
        }
        StmtKind::Private { body } => body.iter().any(stmt_touches_reference),
    }
}

fn expr_touches_reference(expr: &Expr) -> bool {
    if expr.meta.resolved_type.as_ref().is_some_and(Type::is_reference_like) {
        return true;
    }
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::SizeOf(_) => false,
        ExprKind::Interpolated(_) | ExprKind::ArrayLiteral(_) | ExprKind::StructLiteral { .. } | ExprKind::Closure { .. } => true,
        ExprKind::Binary { lhs, rhs, .. } => expr_touches_reference(lhs) || expr_touches_reference(rhs),
        ExprKind::Unary { operand, .. } | ExprKind::TypeOf(operand) => expr_touches_reference(operand),
        ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
            expr_touches_reference(target) || expr_touches_reference(value)
        }
        ExprKind::Call { callee, args } => {
            expr_touches_reference(callee) || args.iter().any(expr_touches_reference)
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            expr_touches_reference(receiver) || args.iter().any(expr_touches_reference)
        }
        ExprKind::FieldAccess { receiver, .. } => expr_touches_reference(receiver),
        ExprKind::Index { receiver, index } => expr_touches_reference(receiver) || expr_touches_reference(index),
        ExprKind::Cast { expr, .. } | ExprKind::TypeTest { expr, .. } => expr_touches_reference(expr),
        ExprKind::If { cond, then_branch, else_branch } => {
            expr_touches_reference(cond)
                || expr_touches_reference(then_branch)
                || else_branch.as_ref().is_some_and(|e| expr_touches_reference(e))
        }
        ExprKind::Match { scrutinee, arms } => {
            expr_touches_reference(scrutinee) || arms.iter().any(|a| expr_touches_reference(&a.body))
        }
        ExprKind::Block(stmts) => stmts.iter().any(stmt_touches_reference),
        ExprKind::Lock { guard, body } => expr_touches_reference(guard) || expr_touches_reference(body),
        ExprKind::Sync(exprs) => !exprs.is_empty(),
    }
}

fn param_list(params: &[Param], owner: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(struct_name) = owner {
        parts.push(format!("{}* self", mangle(struct_name)));
    }
    for p in params {
        parts.push(format!("{} {}", c_type(&p.ty), p.name));
    }
    if parts.is_empty() {
        "void".to_string()
    } else {
        parts.join(", ")
    }
}

/// Emits a top-level function or a struct method. `owner` is the struct
/// name when `f` is a method, so `self` and the mangled method name line
/// up with `mangle_method`.
pub fn generate_fn(cg: &CodeGen, f: &FnDef, owner: Option<&str>) {
    let name = fn_mangled_name(f, owner);
    let ret_ty = c_type(&f.ret);
    let self_owner = if f.is_static { None } else { owner };
    let params = param_list(&f.params, self_owner);
    cg.emit(&format!("{ret_ty} {name}({params}) {{"));

    let arena = if needs_arena(f) {
        cg.emit("    RtArena* arena = rt_arena_create(NULL);");
        Some("arena".to_string())
    } else {
        None
    };

    for stmt in &f.body {
        lower_stmt(cg, arena.as_deref().unwrap_or("NULL"), stmt);
    }

    if matches!(f.ret, Type::Void) {
        if let Some(a) = &arena {
            cg.emit(&format!("    rt_arena_destroy({a});"));
        }
    }
    cg.emit("}");
    cg.emit("");

    if f.visibility != FnVisibility::Private && f.visibility != FnVisibility::Native {
        emit_interceptable_thunk(cg, f, &name, &ret_ty, self_owner);
    }
}

fn emit_interceptable_thunk(cg: &CodeGen, f: &FnDef, mangled: &str, ret_ty: &str, owner: Option<&str>) {
    let mut arg_names: Vec<String> = Vec::new();
    let mut arg_types: Vec<String> = Vec::new();
    if let Some(struct_name) = owner {
        arg_names.push("self".to_string());
        arg_types.push(format!("{}*", mangle(struct_name)));
    }
    for p in &f.params {
        arg_names.push(p.name.clone());
        arg_types.push(c_type(&p.ty));
    }
    cg.emit(&emit_thunk(mangled, ret_ty, &f.name, &arg_names, &arg_types));
    let _ = thunk_name(mangled);
}

fn lower_stmt(cg: &CodeGen, arena: &str, stmt: &Stmt) {
    match &stmt.kind {
        StmtKind::Expr(e) => {
            lower_expr(cg, arena, e);
        }
        StmtKind::Let { name, ty, value, .. } => {
            let value_var = lower_expr(cg, arena, value);
            let decl_ty = ty.as_ref().or(value.meta.resolved_type.as_ref());
            let c_ty = decl_ty.map(c_type).unwrap_or_else(|| "RtHandleV2*".to_string());
            cg.emit(&format!("    {c_ty} {name} = {value_var};"));
        }
        StmtKind::Return(Some(e)) => {
            let result = lower_expr(cg, arena, e);
            if arena != "NULL" {
                cg.emit(&format!("    rt_arena_destroy({arena});"));
            }
            cg.emit(&format!("    return {result};"));
        }
        StmtKind::Return(None) => {
            if arena != "NULL" {
                cg.emit(&format!("    rt_arena_destroy({arena});"));
            }
            cg.emit("    return;");
        }
        StmtKind::Break => cg.emit("    break;"),
        StmtKind::Continue => cg.emit("    continue;"),
        StmtKind::While { cond, body } => {
            let cond_var = lower_expr(cg, arena, cond);
            cg.emit(&format!("    while ({cond_var}) {{"));
            for s in body {
                lower_stmt(cg, arena, s);
            }
            cg.emit("    }");
        }
        StmtKind::For { binding, iterable, body } => {
            let iter_var = lower_expr(cg, arena, iterable);
            let idx = cg.fresh_temp();
            cg.emit(&format!(
                "    for (int64_t {idx} = 0; {idx} < (int64_t)rt_array_length({iter_var}); {idx}++) {{"
            ));
            cg.emit(&format!(
                "        RtHandleV2* {binding} = rt_array_get({iter_var}, {idx});"
            ));
            for s in body {
                lower_stmt(cg, arena, s);
            }
            cg.emit("    }");
        }
        StmtKind::If { cond, then_branch, else_branch } => {
            let cond_var = lower_expr(cg, arena, cond);
            cg.emit(&format!("    if ({cond_var}) {{"));
            for s in then_branch {
                lower_stmt(cg, arena, s);
            }
            if let Some(else_body) = else_branch {
                cg.emit("    } else {");
                for s in else_body {
                    lower_stmt(cg, arena, s);
                }
            }
            cg.emit("    }");
        }
        StmtKind::Private { body } => {
            let child = format!("__arena{}", cg.fresh_temp().trim_start_matches("__t"));
            cg.emit(&format!("    RtArena* {child} = rt_arena_create({arena});"));
            for s in body {
                lower_stmt(cg, &child, s);
            }
            cg.emit(&format!("    rt_arena_destroy({child});"));
        }
    }
}

/// Lowers a block expression into its own child arena, promoting the
/// result into `parent_arena` when it escapes (spec §4.E.4/§9).
fn lower_block(cg: &CodeGen, parent_arena: &str, stmts: &[Stmt], result_ty: Option<&Type>) -> String {
    let child = format!("__arena{}", cg.fresh_temp().trim_start_matches("__t"));
    cg.emit(&format!("    RtArena* {child} = rt_arena_create({parent_arena});"));
    let mut last = "((void)0)".to_string();
    for (i, stmt) in stmts.iter().enumerate() {
        if i + 1 == stmts.len() {
            if let StmtKind::Expr(e) = &stmt.kind {
                last = lower_expr(cg, &child, e);
                continue;
            }
        }
        lower_stmt(cg, &child, stmt);
    }
    let result = match result_ty {
        Some(ty) if ty.is_reference_like() => {
            let promoted = cg.fresh_temp();
            cg.emit(&format!(
                "    RtHandleV2* {promoted} = rt_promote({parent_arena}, {last});"
            ));
            promoted
        }
        _ => last,
    };
    cg.emit(&format!("    rt_arena_destroy({child});"));
    result
}

/// Lowers a closure literal to a struct value `{fn_ptr, arena, env}`
/// (spec §3 "Closures are represented as `{fn_ptr, arena_ptr,
/// captured_env_ptr}`"). The body becomes its own top-level C function,
/// hoisted to the end of the translation unit; a forward prototype
/// declared right here satisfies C's declare-before-use rule for the call
/// sites in between. Captured locals are copied by value into an
/// arena-allocated environment struct at the point the closure literal is
/// evaluated, alongside the arena active at that point, since `env` is the
/// only thing `call_closure` actually threads through the call.
fn lower_closure(cg: &CodeGen, arena: &str, expr: &Expr, params: &[Param], body: &Expr) -> String {
    let ret_ty = match expr.meta.resolved_type.as_ref() {
        Some(Type::Function { ret, .. }) => (**ret).clone(),
        _ => Type::Void,
    };
    let sig_params: Vec<Type> = params.iter().map(|p| p.ty.clone()).collect();
    let struct_name = crate::codegen::closures::closure_struct_name(&sig_params, &ret_ty);

    let captures = crate::codegen::capture::free_variables(params, body);
    let closure_id = cg.fresh_closure_id();
    let env_struct = crate::codegen::closures::env_struct_name(&closure_id);
    cg.emit_hoisted(&crate::codegen::closures::emit_env_struct(&closure_id, &captures));

    let fn_params: Vec<(String, Type)> = params.iter().map(|p| (p.name.clone(), p.ty.clone())).collect();
    let signature = crate::codegen::closures::closure_fn_signature(&closure_id, &fn_params, &ret_ty);
    cg.emit(&format!("    {signature};"));

    cg.emit_hoisted(&format!("{signature} {{"));
    cg.emit_hoisted(&format!("    {env_struct}* __ep = ({env_struct}*)__env;"));
    cg.emit_hoisted("    RtArena* __closure_arena = __ep->__closure_arena;");
    for c in &captures {
        cg.emit_hoisted(&format!("    {} {} = __ep->{};", c_type(&c.ty), c.name, c.name));
    }
    let body_result = cg.with_hoisted_output(|| lower_expr(cg, "__closure_arena", body));
    if matches!(ret_ty, Type::Void) {
        cg.emit_hoisted("    return;");
    } else {
        cg.emit_hoisted(&format!("    return {body_result};"));
    }
    cg.emit_hoisted("}");
    cg.emit_hoisted("");

    let env_var = cg.fresh_temp();
    cg.emit(&format!(
        "    {env_struct}* {env_var} = ({env_struct}*)rt_arena_alloc({arena}, sizeof({env_struct}));"
    ));
    cg.emit(&format!("    {env_var}->__closure_arena = {arena};"));
    for c in &captures {
        cg.emit(&format!("    {env_var}->{n} = {n};", n = c.name));
    }

    let temp = cg.fresh_temp();
    cg.emit(&format!(
        "    {struct_name} {temp} = {{ {closure_id}, {arena}, {env_var} }};"
    ));
    temp
}

fn literal_text(arena: &str, lit: &LiteralKind) -> String {
    match lit {
        LiteralKind::Int(v) | LiteralKind::Long(v) => format!("{v}LL"),
        LiteralKind::Int32(v) => format!("{v}"),
        LiteralKind::Uint(v) => format!("{v}ULL"),
        LiteralKind::Uint32(v) => format!("{v}U"),
        LiteralKind::Float(v) => format!("{v}f"),
        LiteralKind::Double(v) => {
            if v.fract() == 0.0 {
                format!("{v:.1}")
            } else {
                format!("{v}")
            }
        }
        LiteralKind::Bool(v) => v.to_string(),
        LiteralKind::Byte(v) => format!("{v}"),
        LiteralKind::Char(v) => format!("{}", *v as u32),
        LiteralKind::Str(s) => format!("rt_string_literal({arena}, {:?})", s.as_ref()),
        LiteralKind::Nil => "NULL".to_string(),
    }
}

fn bin_op_kind(lhs_ty: Option<&Type>) -> &'static str {
    match lhs_ty {
        Some(t) if t.is_unsigned() => "unsigned",
        _ => "signed",
    }
}

fn lower_binary(cg: &CodeGen, arena: &str, op: BinOp, lhs: &Expr, rhs: &Expr) -> String {
    let l = lower_expr(cg, arena, lhs);
    let r = lower_expr(cg, arena, rhs);
    let is_float = lhs.meta.resolved_type.as_ref().is_some_and(Type::is_float);
    match op {
        BinOp::Div if !is_float => {
            let temp = cg.fresh_temp();
            let kind = bin_op_kind(lhs.meta.resolved_type.as_ref());
            cg.emit(&format!(
                "    int64_t {temp} = rt_checked_div_{kind}({l}, {r});"
            ));
            temp
        }
        BinOp::Rem if !is_float => {
            let temp = cg.fresh_temp();
            let kind = bin_op_kind(lhs.meta.resolved_type.as_ref());
            cg.emit(&format!(
                "    int64_t {temp} = rt_checked_rem_{kind}({l}, {r});"
            ));
            temp
        }
        _ => {
            let c_op = match op {
                BinOp::Add => "+",
                BinOp::Sub => "-",
                BinOp::Mul => "*",
                BinOp::Div => "/",
                BinOp::Rem => "%",
                BinOp::Eq => "==",
                BinOp::Neq => "!=",
                BinOp::Lt => "<",
                BinOp::Lte => "<=",
                BinOp::Gt => ">",
                BinOp::Gte => ">=",
                BinOp::And => "&&",
                BinOp::Or => "||",
                BinOp::BitAnd => "&",
                BinOp::BitOr => "|",
                BinOp::BitXor => "^",
                BinOp::Shl => "<<",
                BinOp::Shr => ">>",
            };
            format!("({l} {c_op} {r})")
        }
    }
}

/// Lowers an expression, returning the C expression text that yields its
/// value (a temp variable name for anything requiring emitted statements,
/// or an inline expression for pure operations).
pub fn lower_expr(cg: &CodeGen, arena: &str, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => literal_text(arena, &lit.kind),
        ExprKind::Interpolated(parts) => {
            let temp = cg.fresh_temp();
            cg.emit(&format!("    RtStringBuilder* {temp} = rt_string_builder_new({arena});"));
            for part in parts {
                match part {
                    crate::ast::InterpPart::Text(text) => {
                        cg.emit(&format!(
                            "    rt_string_builder_append_lit({temp}, {:?});",
                            text.as_ref()
                        ));
                    }
                    crate::ast::InterpPart::Hole { expr: hole_expr, format } => {
                        let value = lower_expr(cg, arena, hole_expr);
                        let spec = parse_format_spec(format.as_deref().unwrap_or(""));
                        let kind = hole_expr
                            .meta
                            .resolved_type
                            .as_ref()
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| "string".to_string());
                        let call = format_call(arena, &value, &kind, &spec);
                        cg.emit(&format!("    rt_string_builder_append({temp}, {call});"));
                    }
                }
            }
            let result = cg.fresh_temp();
            cg.emit(&format!(
                "    RtHandleV2* {result} = rt_string_builder_finish({temp});"
            ));
            result
        }
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Binary { op, lhs, rhs } => lower_binary(cg, arena, *op, lhs, rhs),
        ExprKind::Unary { op, operand } => {
            let val = lower_expr(cg, arena, operand);
            match op {
                UnOp::Neg => format!("(-{val})"),
                UnOp::Not => format!("(!{val})"),
                UnOp::BitNot => format!("(~{val})"),
            }
        }
        ExprKind::Assign { target, value } => {
            let t = lower_expr(cg, arena, target);
            let v = lower_expr(cg, arena, value);
            cg.emit(&format!("    {t} = {v};"));
            t
        }
        ExprKind::CompoundAssign { op, target, value } => {
            let t = lower_expr(cg, arena, target);
            let v = lower_expr(cg, arena, value);
            let c_op = match op {
                BinOp::Add => "+=",
                BinOp::Sub => "-=",
                BinOp::Mul => "*=",
                BinOp::BitAnd => "&=",
                BinOp::BitOr => "|=",
                BinOp::BitXor => "^=",
                _ => "+=",
            };
            cg.emit(&format!("    {t} {c_op} {v};"));
            t
        }
        ExprKind::Call { callee, args } => {
            let arg_vars: Vec<String> = args.iter().map(|a| lower_expr(cg, arena, a)).collect();
            if let ExprKind::Identifier(name) = &callee.kind {
                let mangled = mangle(name);
                format!("{}({})", thunk_name(&mangled), arg_vars.join(", "))
            } else {
                let closure_var = lower_expr(cg, arena, callee);
                crate::codegen::closures::call_closure(&closure_var, &arg_vars)
            }
        }
        ExprKind::MethodCall { receiver, method, args } => {
            let recv = lower_expr(cg, arena, receiver);
            let struct_name = match receiver.meta.resolved_type.as_ref() {
                Some(Type::Struct(s)) => s.name.clone(),
                _ => "Unknown".to_string(),
            };
            let mangled = mangle_method(&struct_name, method);
            let mut arg_vars = vec![recv];
            arg_vars.extend(args.iter().map(|a| lower_expr(cg, arena, a)));
            format!("{}({})", thunk_name(&mangled), arg_vars.join(", "))
        }
        ExprKind::FieldAccess { receiver, field } => {
            let recv = lower_expr(cg, arena, receiver);
            format!("{recv}->{field}")
        }
        ExprKind::Index { receiver, index } => {
            let recv = lower_expr(cg, arena, receiver);
            let idx = lower_expr(cg, arena, index);
            format!("rt_array_get({recv}, {idx})")
        }
        ExprKind::ArrayLiteral(items) => {
            let temp = cg.fresh_temp();
            cg.emit(&format!(
                "    RtHandleV2* {temp} = rt_array_new({arena}, {});",
                items.len()
            ));
            for (i, item) in items.iter().enumerate() {
                let v = lower_expr(cg, arena, item);
                cg.emit(&format!("    rt_array_set({temp}, {i}, {v});"));
            }
            temp
        }
        ExprKind::StructLiteral { name, fields } => {
            let mangled = mangle(name);
            let temp = cg.fresh_temp();
            cg.emit(&format!(
                "    {mangled}* {temp} = ({mangled}*)rt_arena_alloc({arena}, sizeof({mangled}));"
            ));
            for (field, value) in fields {
                let v = lower_expr(cg, arena, value);
                cg.emit(&format!("    {temp}->{field} = {v};"));
            }
            temp
        }
        ExprKind::Cast { expr: inner, ty } => {
            let v = lower_expr(cg, arena, inner);
            format!("(({})({v}))", c_type(ty))
        }
        ExprKind::TypeTest { expr: inner, ty } => {
            let v = lower_expr(cg, arena, inner);
            format!("rt_any_is({v}, \"{ty}\")")
        }
        ExprKind::SizeOf(ty) => format!("sizeof({})", c_type(ty)),
        ExprKind::TypeOf(inner) => {
            let v = lower_expr(cg, arena, inner);
            format!("rt_any_type_name({v})")
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            let cond_var = lower_expr(cg, arena, cond);
            let result_ty = expr.meta.resolved_type.clone();
            let result = cg.fresh_temp();
            let c_ty = result_ty.as_ref().map(c_type).unwrap_or_else(|| "RtHandleV2*".to_string());
            cg.emit(&format!("    {c_ty} {result};"));
            cg.emit(&format!("    if ({cond_var}) {{"));
            let then_val = lower_expr(cg, arena, then_branch);
            cg.emit(&format!("        {result} = {then_val};"));
            if let Some(else_expr) = else_branch {
                cg.emit("    } else {");
                let else_val = lower_expr(cg, arena, else_expr);
                cg.emit(&format!("        {result} = {else_val};"));
            }
            cg.emit("    }");
            result
        }
        ExprKind::Match { scrutinee, arms } => {
            let scrut = lower_expr(cg, arena, scrutinee);
            let result = cg.fresh_temp();
            let c_ty = expr.meta.resolved_type.as_ref().map(c_type).unwrap_or_else(|| "RtHandleV2*".to_string());
            cg.emit(&format!("    {c_ty} {result};"));
            cg.emit(&format!("    /* match {scrut} */"));
            for (i, arm) in arms.iter().enumerate() {
                let kw = if i == 0 { "if" } else { "else if" };
                let test = match &arm.pattern {
                    crate::ast::Pattern::Wildcard => "1".to_string(),
                    crate::ast::Pattern::Literal(lit) => format!("({scrut} == {})", literal_text(arena, lit)),
                    crate::ast::Pattern::Binding(name) => {
                        cg.emit(&format!("    /* bind {name} */"));
                        "1".to_string()
                    }
                    crate::ast::Pattern::TypeTest { type_name, .. } => {
                        format!("rt_any_is({scrut}, \"{type_name}\")")
                    }
                };
                cg.emit(&format!("    {kw} ({test}) {{"));
                let body_val = lower_expr(cg, arena, &arm.body);
                cg.emit(&format!("        {result} = {body_val};"));
                cg.emit("    }");
            }
            result
        }
        ExprKind::Block(stmts) => lower_block(cg, arena, stmts, expr.meta.resolved_type.as_ref()),
        ExprKind::Closure { params, body } => lower_closure(cg, arena, expr, params, body),
        ExprKind::Lock { guard, body } => {
            let g = lower_expr(cg, arena, guard);
            cg.emit(&format!("    rt_lock_acquire({g});"));
            let result = lower_expr(cg, arena, body);
            cg.emit(&format!("    rt_lock_release({g});"));
            result
        }
        ExprKind::Sync(exprs) => {
            for e in exprs {
                let v = lower_expr(cg, arena, e);
                cg.emit(&format!("    rt_sync_promote({arena}, {v});"));
            }
            "((void)0)".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SourceLocation;
    use holt_core::arena::Arena;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn loc() -> SourceLocation {
        SourceLocation::new(Rc::new(PathBuf::from("t.holt")), 1)
    }

    #[test]
    fn integer_division_lowers_to_checked_helper() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let lhs = Expr::new(ExprKind::Literal(crate::ast::Literal { kind: LiteralKind::Int(10) }), loc());
        let rhs = Expr::new(ExprKind::Literal(crate::ast::Literal { kind: LiteralKind::Int(2) }), loc());
        let result = lower_binary(&cg, "arena", BinOp::Div, &lhs, &rhs);
        let out = cg.finish();
        assert!(out.contains("rt_checked_div_signed"));
        assert!(result.starts_with("__t"));
    }

    #[test]
    fn float_division_uses_plain_c_operator() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let mut lhs = Expr::new(ExprKind::Literal(crate::ast::Literal { kind: LiteralKind::Double(1.0) }), loc());
        lhs.meta.resolved_type = Some(Type::Double);
        let rhs = Expr::new(ExprKind::Literal(crate::ast::Literal { kind: LiteralKind::Double(2.0) }), loc());
        let result = lower_binary(&cg, "arena", BinOp::Div, &lhs, &rhs);
        assert!(result.contains('/'));
    }

    #[test]
    fn needs_arena_is_false_for_pure_integer_function() {
        let f = FnDef {
            name: "add".into(),
            params: vec![Param { name: "a".into(), ty: Type::Int, qualifier: crate::ast::MemoryQualifier::Val }],
            ret: Type::Int,
            visibility: FnVisibility::Public,
            body: vec![Stmt {
                kind: StmtKind::Return(Some(Expr::new(ExprKind::Identifier("a".into()), loc()))),
                loc: loc(),
            }],
            loc: loc(),
            is_static: false,
        };
        assert!(!needs_arena(&f));
    }

    #[test]
    fn needs_arena_is_true_when_return_type_is_a_string() {
        let f = FnDef {
            name: "greet".into(),
            params: vec![],
            ret: Type::String,
            visibility: FnVisibility::Public,
            body: vec![],
            loc: loc(),
            is_static: false,
        };
        assert!(needs_arena(&f));
    }

    fn closure_expr(ret: Type, params: Vec<Param>, body: Expr) -> Expr {
        let param_tys: Vec<Type> = params.iter().map(|p| p.ty.clone()).collect();
        let mut e = Expr::new(ExprKind::Closure { params, body: Box::new(body) }, loc());
        e.meta.resolved_type = Some(Type::Function { params: param_tys, ret: Box::new(ret) });
        e
    }

    #[test]
    fn a_closure_with_no_captures_gets_an_env_struct_with_only_the_arena_field() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let params = vec![Param { name: "x".into(), ty: Type::Int, qualifier: crate::ast::MemoryQualifier::Val }];
        let body = Expr::new(ExprKind::Identifier("x".into()), loc());
        let expr = closure_expr(Type::Int, params.clone(), body);
        let ExprKind::Closure { params, body } = &expr.kind else { unreachable!() };
        let result = lower_closure(&cg, "arena", &expr, params, body);
        cg.flush_hoisted();
        let out = cg.finish();
        assert!(result.starts_with("__t"));
        assert!(out.contains("RtArena* __closure_arena;"));
        assert!(out.contains("__ep->__closure_arena"));
        assert!(!out.contains("int64_t x = __ep->x;"));
    }

    #[test]
    fn a_closure_capturing_an_outer_local_copies_it_into_the_environment() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let mut outer = Expr::new(ExprKind::Identifier("total".into()), loc());
        outer.meta.resolved_type = Some(Type::Int);
        let expr = closure_expr(Type::Int, vec![], outer);
        let ExprKind::Closure { params, body } = &expr.kind else { unreachable!() };
        lower_closure(&cg, "arena", &expr, params, body);
        cg.flush_hoisted();
        let out = cg.finish();
        assert!(out.contains("int64_t total;"));
        assert!(out.contains("total = __ep->total;"));
        assert!(out.contains("->total = total;"));
    }

    #[test]
    fn a_closure_literal_emits_a_forward_prototype_before_its_hoisted_definition() {
        let arena = Arena::new();
        let cg = CodeGen::new(&arena);
        let body = Expr::new(ExprKind::Literal(crate::ast::Literal { kind: LiteralKind::Int(1) }), loc());
        let expr = closure_expr(Type::Int, vec![], body);
        let ExprKind::Closure { params, body } = &expr.kind else { unreachable!() };
        lower_closure(&cg, "arena", &expr, params, body);
        cg.flush_hoisted();
        let out = cg.finish();
        let proto_pos = out.find("__sn__closure_0(void* __env)").expect("prototype present");
        let def_pos = out.rfind("__sn__closure_0(void* __env) {").expect("definition present");
        assert!(proto_pos < def_pos);
    }
}
