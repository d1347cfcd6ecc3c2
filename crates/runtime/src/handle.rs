//! Versioned, self-describing handles (spec "handle", §4.H).
//!
//! `RtHandle` is the legacy fixed-shape handle kept for `native` C that
//! predates the v2 ABI: a tag and a raw pointer, nothing else. `RtHandleV2`
//! adds `copy_cb`/`free_cb` so [`crate::promote`] can deep-copy an escaping
//! value without knowing its concrete layout, plus a version counter
//! bumped every time the value is promoted, so a pointer a caller forgot
//! to re-fetch after promotion is at least distinguishable from a live
//! one in a debug build rather than reading freed memory silently.

use crate::arena::RtArenaV2;
use std::sync::atomic::{AtomicU32, Ordering};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtTypeTag {
    Str = 0,
    Array = 1,
    Struct = 2,
    Function = 3,
    Opaque = 4,
}

/// Legacy fixed-shape handle used at the boundary with hand-written
/// `native` C.
#[repr(C)]
pub struct RtHandle {
    pub tag: RtTypeTag,
    pub data: *mut u8,
    pub len: usize,
}

pub type CopyCb = unsafe extern "C" fn(*const u8, usize, *const RtArenaV2) -> *mut u8;
pub type FreeCb = unsafe extern "C" fn(*mut u8);

#[repr(C)]
pub struct RtHandleV2 {
    version: AtomicU32,
    pub tag: RtTypeTag,
    pub data: *mut u8,
    pub len: usize,
    pub copy_cb: Option<CopyCb>,
    pub free_cb: Option<FreeCb>,
}

impl RtHandleV2 {
    pub fn new(
        tag: RtTypeTag,
        data: *mut u8,
        len: usize,
        copy_cb: Option<CopyCb>,
        free_cb: Option<FreeCb>,
    ) -> Self {
        RtHandleV2 {
            version: AtomicU32::new(1),
            tag,
            data,
            len,
            copy_cb,
            free_cb,
        }
    }

    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    pub(crate) fn bump_version(&self) -> u32 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

/// Allocates a v2 handle inside `arena`, pointing at data that has
/// already been copied into that same arena.
pub fn alloc_handle(arena: &RtArenaV2, handle: RtHandleV2) -> &RtHandleV2 {
    arena.alloc(handle)
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_handle_version(handle: *const RtHandleV2) -> u32 {
    if handle.is_null() {
        return 0;
    }
    unsafe { (*handle).version() }
}

/// # Safety
/// `handle` must be null or a live `RtHandleV2` tagged `Array`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_length(handle: *const RtHandleV2) -> usize {
    if handle.is_null() {
        return 0;
    }
    unsafe { (*handle).len }
}

/// # Safety
/// Same contract as [`rt_array_length`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_data_v2(handle: *const RtHandleV2) -> *mut u8 {
    if handle.is_null() {
        return std::ptr::null_mut();
    }
    unsafe { (*handle).data }
}

/// Arrays are monomorphically arrays of handles: even an array of `int`
/// stores one small boxed handle per element rather than packed scalars,
/// so `for`-loop lowering can always bind `RtHandleV2*` regardless of the
/// element type (a simplification over a fully unboxed array ABI, noted
/// in DESIGN.md).
///
/// # Safety
/// `arena` must be a live arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_new(arena: *const RtArenaV2, len: usize) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let slot_bytes = len * std::mem::size_of::<*mut RtHandleV2>();
    let data = arena.alloc_bytes(slot_bytes);
    arena.alloc(RtHandleV2::new(RtTypeTag::Array, data, len, None, None)) as *const RtHandleV2 as *mut RtHandleV2
}

/// # Safety
/// `array` must be a live handle tagged `Array`; `index` must be in bounds.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_get(array: *const RtHandleV2, index: usize) -> *mut RtHandleV2 {
    if array.is_null() {
        return std::ptr::null_mut();
    }
    let array = unsafe { &*array };
    if index >= array.len {
        crate::error::fatal(&format!("array index {index} out of bounds (len {})", array.len));
    }
    let slots = array.data as *mut *mut RtHandleV2;
    unsafe { *slots.add(index) }
}

/// # Safety
/// Same contract as [`rt_array_get`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_array_set(array: *mut RtHandleV2, index: usize, value: *mut RtHandleV2) {
    if array.is_null() {
        return;
    }
    let array = unsafe { &*array };
    if index >= array.len {
        crate::error::fatal(&format!("array index {index} out of bounds (len {})", array.len));
    }
    let slots = array.data as *mut *mut RtHandleV2;
    unsafe { *slots.add(index) = value };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::RtArenaV2;

    #[test]
    fn array_new_reports_the_requested_length() {
        let arena = RtArenaV2::new(None);
        let array = unsafe { rt_array_new(&arena, 3) };
        assert_eq!(unsafe { rt_array_length(array) }, 3);
    }

    #[test]
    fn array_set_then_get_round_trips_an_element() {
        let arena = RtArenaV2::new(None);
        let array = unsafe { rt_array_new(&arena, 2) };
        let element = arena.alloc(RtHandleV2::new(RtTypeTag::Str, std::ptr::null_mut(), 0, None, None))
            as *const RtHandleV2 as *mut RtHandleV2;
        unsafe { rt_array_set(array, 1, element) };
        assert_eq!(unsafe { rt_array_get(array, 1) }, element);
    }

    #[test]
    fn fresh_handle_starts_at_version_one() {
        let arena = RtArenaV2::new(None);
        let h = alloc_handle(
            &arena,
            RtHandleV2::new(RtTypeTag::Str, std::ptr::null_mut(), 0, None, None),
        );
        assert_eq!(h.version(), 1);
    }

    #[test]
    fn bump_version_advances_by_exactly_one() {
        let arena = RtArenaV2::new(None);
        let h = alloc_handle(
            &arena,
            RtHandleV2::new(RtTypeTag::Array, std::ptr::null_mut(), 0, None, None),
        );
        assert_eq!(h.bump_version(), 2);
        assert_eq!(h.version(), 2);
    }

    #[test]
    fn array_length_handles_a_null_pointer_without_crashing() {
        assert_eq!(unsafe { rt_array_length(std::ptr::null()) }, 0);
        assert!(unsafe { rt_array_data_v2(std::ptr::null()) }.is_null());
    }
}
