//! Interception/thunk protocol lowering (spec §4.H "interceptability",
//! §9 REDESIGN FLAG thread-local save/restore as an RAII scope guard).
//!
//! Every interceptable function (non-`private`, non-`native`) gets a thunk
//! alongside its real body. Call sites always call through the thunk; the
//! thunk's only job on the hot path is a single atomic load of
//! `__rt_interceptor_count` so the cost of the feature is near zero when no
//! handler is registered. When handlers exist, the thunk boxes every
//! argument into an `RtAny[]`, stashes them on a thread-local so handlers
//! can introspect them, and walks the registered handler chain by glob
//! pattern before (or instead of) calling the real body.

use crate::codegen::state::mangle;

/// Name of the generated thunk wrapping an interceptable function.
pub fn thunk_name(mangled_fn_name: &str) -> String {
    format!("{mangled_fn_name}__thunk")
}

/// Emits the thunk function body. `real_fn` is the mangled name of the
/// actual implementation; `arg_names`/`arg_c_types` describe the thunk's
/// parameter list, which mirrors the real function's.
pub fn emit_thunk(
    real_fn: &str,
    ret_c_type: &str,
    holt_name: &str,
    arg_names: &[String],
    arg_c_types: &[String],
) -> String {
    let thunk = thunk_name(real_fn);
    let params = if arg_names.is_empty() {
        "void".to_string()
    } else {
        arg_names
            .iter()
            .zip(arg_c_types.iter())
            .map(|(n, t)| format!("{t} {n}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let call_real = if ret_c_type == "void" {
        format!("        {real_fn}({});\n        return;\n", arg_names.join(", "))
    } else {
        format!("        return {real_fn}({});\n", arg_names.join(", "))
    };
    let box_args: String = arg_names
        .iter()
        .enumerate()
        .map(|(i, n)| format!("    boxed[{i}] = rt_box_any({n});\n"))
        .collect();
    let handled_return = if ret_c_type == "void" {
        "        rt_unbox_any_as_void(__result);\n        return;\n".to_string()
    } else {
        format!(
            "        return rt_unbox_any_as_{ret_lower}(__result);\n",
            ret_lower = ret_c_type.trim_end_matches('*').to_lowercase(),
        )
    };
    format!(
        "{ret_c_type} {thunk}({params}) {{\n\
        \x20   if (__atomic_load_n(&__rt_interceptor_count, __ATOMIC_RELAXED) == 0) {{\n\
        {call_real}\
        \x20   }}\n\
        \x20   RtAny boxed[{argc}];\n\
        {box_args}\
        \x20   RtInterceptScope __scope;\n\
        \x20   rt_intercept_scope_enter(&__scope, \"{holt_name}\", boxed, {argc});\n\
        \x20   RtAny __result = rt_intercept_dispatch(&__scope);\n\
        \x20   rt_intercept_scope_exit(&__scope);\n\
        \x20   if (__scope.handled) {{\n\
        {handled_return}\
        \x20   }}\n\
        {call_real}\
        }}\n",
        argc = arg_names.len(),
    )
}

/// C declaration for the thread-local interceptor count fast-path check.
pub fn interceptor_count_decl() -> String {
    "extern _Atomic int __rt_interceptor_count;".to_string()
}

pub fn intercept_scope_type_name() -> &'static str {
    "RtInterceptScope"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thunk_name_suffixes_the_real_function() {
        assert_eq!(thunk_name("__sn__foo"), "__sn__foo__thunk");
    }

    #[test]
    fn emitted_thunk_checks_interceptor_count_first() {
        let body = emit_thunk(
            "__sn__add",
            "int64_t",
            "add",
            &["a".to_string(), "b".to_string()],
            &["int64_t".to_string(), "int64_t".to_string()],
        );
        assert!(body.contains("__rt_interceptor_count"));
        assert!(body.contains("__sn__add(a, b)"));
    }

    #[test]
    fn void_return_thunk_omits_unbox_call_on_fast_path() {
        let body = emit_thunk("__sn__log", "void", "log", &["msg".to_string()], &["RtHandleV2*".to_string()]);
        assert!(body.contains("return;"));
    }

    #[test]
    fn void_return_thunk_never_returns_a_value_from_the_handled_branch() {
        let body = emit_thunk("__sn__log", "void", "log", &["msg".to_string()], &["RtHandleV2*".to_string()]);
        assert!(!body.contains("return rt_unbox_any_as_void"));
        assert!(body.contains("rt_unbox_any_as_void(__result);\n        return;"));
    }
}
