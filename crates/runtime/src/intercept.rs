//! Interception/thunk protocol, runtime half (spec §4.H, §9 REDESIGN FLAG
//! "thread-local save/restore as an RAII scope guard").
//!
//! [`crate::codegen`]'s generated thunks (not part of this crate) check
//! `__rt_interceptor_count` before ever reaching here; by the time
//! [`rt_intercept_dispatch`] runs, at least one handler is registered.
//! Handlers are matched against the call's Holt name by glob pattern (at
//! most one `*`, per the spec) in registration order; a handler "declines"
//! by leaving its `handled` out-parameter `false`, letting the chain fall
//! through to the next matching handler and finally to the real function.
//!
//! Grounded on the teacher's `closures.rs` fn-pointer-plus-captured-env
//! representation (reused here for a handler's callback pointer) and the
//! teacher's `scheduler.rs` TLS-save/restore-around-call pattern, applied
//! to the thunk's args/name triple instead of a strand's continuation.
//! Supplemented from `original_source/src/runtime/runtime_intercept.c`
//! where the spec is silent: depth is incremented *before* the handler
//! runs and decremented by a `Drop` guard, so a panicking handler still
//! restores the depth counter instead of wedging every later call into
//! thinking it's still inside a dispatch.

use crate::any::RtAny;
use std::cell::Cell;
use std::ffi::{CStr, c_char};
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

/// Fast-path check generated thunks load directly; stays at zero cost
/// (a single relaxed atomic load) until something calls
/// [`rt_register_interceptor`].
#[unsafe(no_mangle)]
pub static __rt_interceptor_count: AtomicI32 = AtomicI32::new(0);

pub type InterceptorFn = unsafe extern "C" fn(*const c_char, *mut RtAny, usize, *mut bool) -> RtAny;

struct Handler {
    pattern: String,
    callback: InterceptorFn,
}

static HANDLERS: Mutex<Vec<Handler>> = Mutex::new(Vec::new());

thread_local! {
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        DEPTH.with(|d| d.set(d.get() + 1));
        DepthGuard
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

fn depth() -> u32 {
    DEPTH.with(|d| d.get())
}

/// At most one `*` wildcard, matching the spec's glob grammar: a bare
/// prefix/suffix match or, with no `*` at all, an exact match.
fn glob_matches(pattern: &str, name: &str) -> bool {
    match pattern.find('*') {
        None => pattern == name,
        Some(pos) => {
            let (prefix, suffix) = (&pattern[..pos], &pattern[pos + 1..]);
            name.len() >= prefix.len() + suffix.len() && name.starts_with(prefix) && name.ends_with(suffix)
        }
    }
}

/// Registers a handler for every call whose Holt name matches `pattern`.
///
/// # Safety
/// `pattern` must be a valid, NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_register_interceptor(pattern: *const c_char, callback: InterceptorFn) {
    let pattern = unsafe { CStr::from_ptr(pattern) }.to_string_lossy().into_owned();
    tracing::trace!(%pattern, "rt_register_interceptor");
    HANDLERS.lock().unwrap().push(Handler { pattern, callback });
    __rt_interceptor_count.fetch_add(1, Ordering::Relaxed);
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_intercept_is_active() -> bool {
    depth() > 0
}

/// Mirrors the generated thunk's `RtInterceptScope`: carries the call's
/// Holt name and boxed arguments across `enter`/`dispatch`/`exit`, plus
/// the `handled` flag the thunk branches on.
#[repr(C)]
pub struct RtInterceptScope {
    pub name: *const c_char,
    pub boxed: *mut RtAny,
    pub argc: usize,
    pub handled: bool,
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_intercept_scope_enter(scope: *mut RtInterceptScope, name: *const c_char, boxed: *mut RtAny, argc: usize) {
    if scope.is_null() {
        return;
    }
    unsafe {
        (*scope).name = name;
        (*scope).boxed = boxed;
        (*scope).argc = argc;
        (*scope).handled = false;
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_intercept_scope_exit(_scope: *mut RtInterceptScope) {}

/// Walks the handler chain for `scope.name` in registration order. Nested
/// interceptable calls reuse the same mechanism: each dispatch gets its
/// own `RtInterceptScope` (the thunk's local, not a shared thread-local),
/// so a handler calling another interceptable function — or the same one
/// — simply re-enters this function with a fresh scope while `depth()` is
/// already nonzero; nesting is tracked only so other runtime code can ask
/// [`rt_intercept_is_active`], not to skip handler matching here.
///
/// # Safety
/// `scope` must have just been populated by [`rt_intercept_scope_enter`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_intercept_dispatch(scope: *mut RtInterceptScope) -> RtAny {
    if scope.is_null() {
        return RtAny::nil();
    }
    let scope_ref = unsafe { &mut *scope };
    let name = unsafe { CStr::from_ptr(scope_ref.name) }.to_string_lossy();
    let _guard = DepthGuard::enter();

    // Snapshot the matching callbacks and release the registry lock before
    // invoking any of them: a handler body may itself make an
    // interceptable call (nested dispatch re-enters this function on the
    // same thread), and `HANDLERS` is a plain `Mutex`, not reentrant.
    let matching: Vec<(String, InterceptorFn)> = {
        let handlers = HANDLERS.lock().unwrap();
        handlers
            .iter()
            .filter(|h| glob_matches(&h.pattern, &name))
            .map(|h| (h.pattern.clone(), h.callback))
            .collect()
    };
    for (pattern, callback) in matching {
        let mut handled = false;
        tracing::trace!(%name, %pattern, "rt_intercept_dispatch: trying handler");
        let result = unsafe { callback(scope_ref.name, scope_ref.boxed, scope_ref.argc, &mut handled) };
        if handled {
            scope_ref.handled = true;
            return result;
        }
    }
    scope_ref.handled = false;
    RtAny::nil()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pattern_requires_an_exact_match() {
        assert!(glob_matches("foo", "foo"));
        assert!(!glob_matches("foo", "foobar"));
    }

    #[test]
    fn star_pattern_matches_prefix_and_suffix() {
        assert!(glob_matches("foo*", "foobar"));
        assert!(glob_matches("*bar", "foobar"));
        assert!(glob_matches("*", "anything"));
        assert!(!glob_matches("foo*", "barfoo"));
    }

    #[test]
    fn depth_guard_restores_zero_after_drop() {
        assert_eq!(depth(), 0);
        {
            let _g = DepthGuard::enter();
            assert_eq!(depth(), 1);
        }
        assert_eq!(depth(), 0);
    }

    #[test]
    fn scope_enter_populates_every_field() {
        let mut scope = RtInterceptScope {
            name: std::ptr::null(),
            boxed: std::ptr::null_mut(),
            argc: 0,
            handled: true,
        };
        let name = std::ffi::CString::new("add").unwrap();
        rt_intercept_scope_enter(&mut scope, name.as_ptr(), std::ptr::null_mut(), 2);
        assert_eq!(scope.argc, 2);
        assert!(!scope.handled);
    }
}
