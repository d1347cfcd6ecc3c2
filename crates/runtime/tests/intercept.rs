//! End-to-end check of the interceptor chain as a generated thunk would
//! drive it: enter a scope, dispatch, branch on `handled`.

use holt_runtime::any::{RtAny, rt_box_long, rt_unbox_any_as_int64_t};
use holt_runtime::intercept::{
    InterceptorFn, RtInterceptScope, rt_intercept_dispatch, rt_intercept_is_active, rt_intercept_scope_enter,
    rt_register_interceptor,
};
use std::ffi::CString;

unsafe extern "C" fn doubling_handler(_name: *const std::os::raw::c_char, args: *mut RtAny, argc: usize, handled: *mut bool) -> RtAny {
    assert_eq!(argc, 1);
    let arg = unsafe { *args };
    assert!(unsafe { rt_intercept_is_active() });
    unsafe { *handled = true };
    rt_box_long(rt_unbox_any_as_int64_t(arg) * 2)
}

unsafe extern "C" fn declining_handler(_name: *const std::os::raw::c_char, _args: *mut RtAny, _argc: usize, handled: *mut bool) -> RtAny {
    unsafe { *handled = false };
    RtAny::nil()
}

unsafe extern "C" fn nesting_handler(_name: *const std::os::raw::c_char, args: *mut RtAny, argc: usize, handled: *mut bool) -> RtAny {
    assert_eq!(argc, 1);
    let arg = unsafe { rt_unbox_any_as_int64_t(*args) };
    assert!(unsafe { rt_intercept_is_active() });
    // An interceptable call made from inside a running handler must still
    // walk the handler chain rather than bail out because depth() > 0.
    let (inner_result, inner_handled) = dispatch_for("inner_nested_call", doubling_handler, arg);
    assert!(inner_handled, "nested dispatch should still match a registered handler");
    unsafe { *handled = true };
    inner_result
}

fn dispatch_for(name: &str, handler: InterceptorFn, arg: i64) -> (RtAny, bool) {
    let pattern = CString::new(name).unwrap();
    unsafe { rt_register_interceptor(pattern.as_ptr(), handler) };

    let mut boxed = [rt_box_long(arg)];
    let mut scope = RtInterceptScope { name: std::ptr::null(), boxed: boxed.as_mut_ptr(), argc: 1, handled: false };
    let name_c = CString::new(name).unwrap();
    rt_intercept_scope_enter(&mut scope, name_c.as_ptr(), boxed.as_mut_ptr(), 1);
    let result = unsafe { rt_intercept_dispatch(&mut scope) };
    (result, scope.handled)
}

#[test]
fn a_registered_handler_intercepts_a_matching_call_and_the_thunk_sees_handled() {
    let (result, handled) = dispatch_for("account_withdraw", doubling_handler, 21);
    assert!(handled);
    assert_eq!(unsafe { rt_unbox_any_as_int64_t(result) }, 42);
}

#[test]
fn a_declining_handler_leaves_handled_false_so_the_thunk_falls_through() {
    let (_, handled) = dispatch_for("account_deposit", declining_handler, 1);
    assert!(!handled);
}

#[test]
fn dispatch_is_not_active_before_a_scope_is_entered() {
    assert!(!rt_intercept_is_active());
}

#[test]
fn a_handler_invoking_a_nested_interceptable_call_still_gets_matched() {
    let (result, handled) = dispatch_for("outer_nested_call", nesting_handler, 5);
    assert!(handled);
    assert_eq!(unsafe { rt_unbox_any_as_int64_t(result) }, 10);
}
