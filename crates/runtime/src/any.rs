//! Boxed `any` values (spec §3 "Boxed `any`", §4.H).
//!
//! `any` erases a value's static type behind a small tagged union so it
//! can cross the interception boundary: every argument to an
//! interceptable call gets boxed into an `RtAny` before a handler chain
//! ever sees it, and the thunk unboxes the handler's (or the real
//! function's) result back to the call site's expected C type. `rt_box_*`
//! is exposed as several monomorphic functions because C has no
//! generics; the header picks the right one with a `_Generic` macro
//! named `rt_box_any` so generated code can call it uniformly.

use crate::handle::RtHandleV2;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::OnceLock;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtAnyTag {
    Nil = 0,
    Long = 1,
    Double = 2,
    Bool = 3,
    Handle = 4,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union RtAnyPayload {
    pub long_val: i64,
    pub double_val: f64,
    pub bool_val: bool,
    pub handle: *const RtHandleV2,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct RtAny {
    pub tag: RtAnyTag,
    pub payload: RtAnyPayload,
}

impl RtAny {
    pub fn nil() -> Self {
        RtAny {
            tag: RtAnyTag::Nil,
            payload: RtAnyPayload { handle: std::ptr::null() },
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_box_long(value: i64) -> RtAny {
    RtAny {
        tag: RtAnyTag::Long,
        payload: RtAnyPayload { long_val: value },
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_box_double(value: f64) -> RtAny {
    RtAny {
        tag: RtAnyTag::Double,
        payload: RtAnyPayload { double_val: value },
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_box_bool(value: bool) -> RtAny {
    RtAny {
        tag: RtAnyTag::Bool,
        payload: RtAnyPayload { bool_val: value },
    }
}

/// # Safety
/// `handle` must outlive every use of the returned `RtAny`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_box_handle(handle: *const RtHandleV2) -> RtAny {
    if handle.is_null() {
        return RtAny::nil();
    }
    RtAny {
        tag: RtAnyTag::Handle,
        payload: RtAnyPayload { handle },
    }
}

macro_rules! unbox_scalar {
    ($fn_name:ident, $field:ident, $ty:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(value: RtAny) -> $ty {
            match value.tag {
                RtAnyTag::Long => unsafe { value.payload.long_val as $ty },
                RtAnyTag::Double => unsafe { value.payload.double_val as $ty },
                RtAnyTag::Bool => unsafe { value.payload.bool_val as u8 as $ty },
                _ => {
                    crate::error::fatal(concat!(stringify!($fn_name), ": any did not hold a scalar"));
                }
            }
        }
    };
}

unbox_scalar!(rt_unbox_any_as_int64_t, long_val, i64);
unbox_scalar!(rt_unbox_any_as_int32_t, long_val, i32);
unbox_scalar!(rt_unbox_any_as_uint64_t, long_val, u64);
unbox_scalar!(rt_unbox_any_as_uint32_t, long_val, u32);
unbox_scalar!(rt_unbox_any_as_uint8_t, long_val, u8);
unbox_scalar!(rt_unbox_any_as_float, double_val, f32);
unbox_scalar!(rt_unbox_any_as_double, double_val, f64);

#[unsafe(no_mangle)]
pub extern "C" fn rt_unbox_any_as_bool(value: RtAny) -> bool {
    match value.tag {
        RtAnyTag::Bool => unsafe { value.payload.bool_val },
        RtAnyTag::Long => unsafe { value.payload.long_val != 0 },
        _ => crate::error::fatal("rt_unbox_any_as_bool: any did not hold a bool"),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_unbox_any_as_rthandlev2(value: RtAny) -> *const RtHandleV2 {
    match value.tag {
        RtAnyTag::Handle => unsafe { value.payload.handle },
        RtAnyTag::Nil => std::ptr::null(),
        _ => crate::error::fatal("rt_unbox_any_as_rthandlev2: any did not hold a handle"),
    }
}

/// Unboxing into `void` is a deliberate no-op: the thunk template emits it
/// uniformly for every return type so a `void`-returning interceptable
/// function still drains `__result` without special-casing the call site.
#[unsafe(no_mangle)]
pub extern "C" fn rt_unbox_any_as_void(_value: RtAny) {}

#[unsafe(no_mangle)]
pub extern "C" fn rt_any_is(value: RtAny, type_name: *const c_char) -> bool {
    if type_name.is_null() {
        return false;
    }
    let name = unsafe { CStr::from_ptr(type_name) }.to_string_lossy();
    matches!(
        (value.tag, name.as_ref()),
        (RtAnyTag::Long, "int" | "long" | "byte")
            | (RtAnyTag::Double, "float" | "double")
            | (RtAnyTag::Bool, "bool")
            | (RtAnyTag::Handle, "str" | "array" | "struct" | "fn" | "any")
    )
}

/// Wrapper making the static type-name table `Sync`: every entry points at
/// `'static` string literal data and is never mutated after construction,
/// so sharing it across threads is sound even though `RtHandleV2` holds a
/// raw pointer and isn't `Sync` in general.
struct TypeNameTable(Vec<(&'static str, RtHandleV2)>);
unsafe impl Sync for TypeNameTable {}
unsafe impl Send for TypeNameTable {}

fn type_name_handles() -> &'static [(&'static str, RtHandleV2)] {
    static TABLE: OnceLock<TypeNameTable> = OnceLock::new();
    &TABLE
        .get_or_init(|| {
            TypeNameTable(
                ["nil", "int", "long", "float", "double", "bool", "str", "array", "struct", "fn", "any"]
                    .iter()
                    .map(|name| {
                        let leaked: &'static str = name;
                        let data = leaked.as_ptr() as *mut u8;
                        (
                            leaked,
                            RtHandleV2::new(crate::handle::RtTypeTag::Str, data, leaked.len(), None, None),
                        )
                    })
                    .collect(),
            )
        })
        .0
}

/// Returns a static, never-freed string handle naming `value`'s runtime
/// kind (used by `typeof`). Type names are a fixed, finite set known to
/// the runtime itself, so there's no arena to allocate from here.
#[unsafe(no_mangle)]
pub extern "C" fn rt_any_type_name(value: RtAny) -> *const RtHandleV2 {
    let label = match value.tag {
        RtAnyTag::Nil => "nil",
        RtAnyTag::Long => "int",
        RtAnyTag::Double => "double",
        RtAnyTag::Bool => "bool",
        RtAnyTag::Handle => "any",
    };
    type_name_handles()
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, handle)| handle as *const RtHandleV2)
        .unwrap_or(std::ptr::null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxing_and_unboxing_a_long_round_trips() {
        let boxed = rt_box_long(42);
        assert_eq!(rt_unbox_any_as_int64_t(boxed), 42);
    }

    #[test]
    fn boxing_a_null_handle_produces_nil() {
        let boxed = unsafe { rt_box_handle(std::ptr::null()) };
        assert_eq!(boxed.tag, RtAnyTag::Nil);
    }

    #[test]
    fn any_is_recognizes_scalar_kinds_by_name() {
        let boxed = rt_box_double(1.5);
        let name = std::ffi::CString::new("double").unwrap();
        assert!(rt_any_is(boxed, name.as_ptr()));
        let wrong = std::ffi::CString::new("bool").unwrap();
        assert!(!rt_any_is(boxed, wrong.as_ptr()));
    }

    #[test]
    fn any_type_name_returns_a_stable_handle_per_kind() {
        let a = rt_any_type_name(rt_box_long(1));
        let b = rt_any_type_name(rt_box_long(2));
        assert_eq!(a, b);
        assert!(!a.is_null());
    }
}
