//! Closure lowering (spec §4.G `codegen/closures.rs`).
//!
//! A Holt closure becomes a small C struct carrying a function pointer, the
//! arena it was allocated in, and a pointer to its captured environment.
//! Any bare function reference used where a closure value is expected is
//! wrapped the same way with a null environment, so call sites never need
//! to distinguish "plain function" from "closure" at the C level.

use crate::codegen::capture::Capture;
use crate::codegen::state::mangle;
use crate::codegen::types::c_type;
use crate::types::Type;

/// Name of the generated struct backing every closure value of this
/// function signature (`fn(int): int` -> `__sn__closure_int_to_int`, with
/// parameter types joined to keep distinct signatures from colliding).
pub fn closure_struct_name(params: &[Type], ret: &Type) -> String {
    let mut parts: Vec<String> = params.iter().map(|p| p.to_string()).collect();
    parts.push("to".to_string());
    parts.push(ret.to_string());
    mangle(&format!("closure_{}", parts.join("_")))
}

/// Emits the struct definition backing a closure of this signature, if it
/// hasn't been emitted already by the caller (caller is responsible for
/// deduplicating by `closure_struct_name`).
pub fn emit_closure_struct(params: &[Type], ret: &Type) -> String {
    let name = closure_struct_name(params, ret);
    let param_types: Vec<String> = params.iter().map(c_type).collect();
    let fn_ptr_ty = format!(
        "{}(*)(void*, {})",
        c_type(ret),
        if param_types.is_empty() {
            "void".to_string()
        } else {
            param_types.join(", ")
        }
    );
    format!(
        "typedef struct {name} {{\n    {fn_ptr_ty} fn_ptr;\n    RtArena* arena;\n    void* env;\n}} {name};\n"
    )
}

/// Builds the C expression that constructs a closure value wrapping a bare
/// function with no captured environment (`env = NULL`).
pub fn wrap_bare_function(struct_name: &str, fn_ptr_expr: &str, arena_expr: &str) -> String {
    format!("({{ {struct_name} __c = {{ {fn_ptr_expr}, {arena_expr}, NULL }}; __c; }})")
}

/// Builds the call expression invoking a closure value, passing its
/// captured environment as the implicit first argument.
pub fn call_closure(closure_expr: &str, args: &[String]) -> String {
    let mut all_args = vec![format!("{closure_expr}.env")];
    all_args.extend(args.iter().cloned());
    format!("{closure_expr}.fn_ptr({})", all_args.join(", "))
}

/// Name of the struct backing a particular closure literal's captured
/// environment. One per closure literal (not per signature, unlike
/// [`closure_struct_name`]), since two closures of the same signature can
/// still capture different variables. Every environment also carries the
/// arena active when the closure was created (`__closure_arena`), since
/// `call_closure` only threads `env` through the call, not the closure
/// struct's own `arena` field.
pub fn env_struct_name(closure_id: &str) -> String {
    format!("{closure_id}_env")
}

/// Emits the typedef for a closure literal's captured environment: one
/// field per free variable, in capture order, plus the creation-time arena.
pub fn emit_env_struct(closure_id: &str, captures: &[Capture]) -> String {
    let name = env_struct_name(closure_id);
    let mut out = format!("typedef struct {name} {{\n    RtArena* __closure_arena;\n");
    for c in captures {
        out.push_str(&format!("    {} {};\n", c_type(&c.ty), c.name));
    }
    out.push_str(&format!("}} {name};\n"));
    out
}

/// C function signature for a closure body, matching the `fn_ptr` field
/// type [`emit_closure_struct`] declares for this signature.
pub fn closure_fn_signature(closure_id: &str, params: &[(String, Type)], ret: &Type) -> String {
    let param_list: Vec<String> = params.iter().map(|(name, ty)| format!("{} {name}", c_type(ty))).collect();
    let params_decl = if param_list.is_empty() {
        "void* __env".to_string()
    } else {
        format!("void* __env, {}", param_list.join(", "))
    };
    format!("{} {closure_id}({params_decl})", c_type(ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_struct_name_is_stable_per_signature() {
        let a = closure_struct_name(&[Type::Int], &Type::Bool);
        let b = closure_struct_name(&[Type::Int], &Type::Bool);
        assert_eq!(a, b);
        assert!(a.starts_with("__sn__closure_"));
    }

    #[test]
    fn different_signatures_produce_different_names() {
        let a = closure_struct_name(&[Type::Int], &Type::Bool);
        let b = closure_struct_name(&[Type::Double], &Type::Bool);
        assert_ne!(a, b);
    }

    #[test]
    fn call_closure_threads_env_as_first_argument() {
        let call = call_closure("__c", &["1".to_string(), "2".to_string()]);
        assert_eq!(call, "__c.fn_ptr(__c.env, 1, 2)");
    }
}
