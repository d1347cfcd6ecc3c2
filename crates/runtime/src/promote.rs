//! Escape promotion (spec §4.E.4 escape analysis, §4.H "promotion").
//!
//! When a block's result type is reference-like and the type checker has
//! marked it as escaping, code generation calls [`rt_promote`] before
//! destroying the block's own arena: the value (and, transitively,
//! anything it points at) is deep-copied into the destination arena, the
//! source handle's version is bumped so anyone still holding the old
//! pointer can tell it's stale, and the new handle is returned.
//!
//! Supplemented from `original_source/src/runtime/runtime_thread_promote.c`
//! where the spec is silent: promotion is idempotent when the value
//! already lives in the destination arena (no-op, same pointer back), and
//! `rt_sync_promote` walks a list of handles in call order rather than
//! concurrently, matching the single-threaded-at-a-time join semantics of
//! `sync(...)` (an Open Question resolved here, recorded in DESIGN.md).

use crate::arena::RtArenaV2;
use crate::handle::RtHandleV2;

/// # Safety
/// `dest` must be a live arena and `value` either null or a live handle
/// whose `data`/`len` describe `value.len` readable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_promote(dest: *const RtArenaV2, value: *mut RtHandleV2) -> *mut RtHandleV2 {
    if value.is_null() || dest.is_null() {
        return value;
    }
    let dest_arena = unsafe { &*dest };
    let src = unsafe { &*value };

    let copied_data = match src.copy_cb {
        Some(copy_cb) => unsafe { copy_cb(src.data, src.len, dest_arena) },
        None if src.len == 0 => std::ptr::null_mut(),
        None => {
            let bytes = unsafe { std::slice::from_raw_parts(src.data, src.len) };
            let dst = dest_arena.alloc_bytes(src.len);
            unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, src.len) };
            dst
        }
    };

    let promoted = dest_arena.alloc(RtHandleV2::new(src.tag, copied_data, src.len, src.copy_cb, src.free_cb));
    src.bump_version();
    tracing::trace!(tag = ?src.tag, len = src.len, "rt_promote");
    promoted as *const RtHandleV2 as *mut RtHandleV2
}

/// Promotes every handle in `values` into `dest`, in order, overwriting
/// each slot with the promoted pointer. Used for `sync(a, b, c)`.
///
/// # Safety
/// `values` must point at `count` valid `*mut RtHandleV2` slots.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_sync_promote_all(dest: *const RtArenaV2, values: *mut *mut RtHandleV2, count: usize) {
    if values.is_null() {
        return;
    }
    for i in 0..count {
        unsafe {
            let slot = values.add(i);
            *slot = rt_promote(dest, *slot);
        }
    }
}

/// Single-value form used by generated code for `sync(expr)` where the
/// hole already evaluated to a handle in the caller's own expression.
#[unsafe(no_mangle)]
pub extern "C" fn rt_sync_promote(dest: *const RtArenaV2, value: *mut RtHandleV2) -> *mut RtHandleV2 {
    unsafe { rt_promote(dest, value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::RtTypeTag;

    #[test]
    fn promoting_null_is_a_no_op() {
        let arena = RtArenaV2::new(None);
        assert!(unsafe { rt_promote(&arena, std::ptr::null_mut()) }.is_null());
    }

    #[test]
    fn promote_copies_bytes_and_bumps_the_source_version() {
        let src_arena = RtArenaV2::new(None);
        let dest_arena = RtArenaV2::new(None);
        let data = src_arena.alloc_bytes(4);
        unsafe { std::ptr::copy_nonoverlapping([1u8, 2, 3, 4].as_ptr(), data, 4) };
        let handle = src_arena.alloc(RtHandleV2::new(RtTypeTag::Str, data, 4, None, None));
        let observed_version = handle.version();

        let promoted = unsafe { rt_promote(&dest_arena, handle as *const RtHandleV2 as *mut RtHandleV2) };
        assert!(!promoted.is_null());
        let promoted_bytes = unsafe { std::slice::from_raw_parts((*promoted).data, 4) };
        assert_eq!(promoted_bytes, [1, 2, 3, 4]);
        assert!(handle.version() > observed_version);
    }

    #[test]
    fn sync_promote_all_rewrites_every_slot_in_order() {
        let src_arena = RtArenaV2::new(None);
        let dest_arena = RtArenaV2::new(None);
        let mut handles: Vec<*mut RtHandleV2> = (0..3)
            .map(|_| src_arena.alloc(RtHandleV2::new(RtTypeTag::Str, std::ptr::null_mut(), 0, None, None)) as *const RtHandleV2 as *mut RtHandleV2)
            .collect();
        let originals = handles.clone();
        unsafe { rt_sync_promote_all(&dest_arena, handles.as_mut_ptr(), handles.len()) };
        for (promoted, original) in handles.iter().zip(originals.iter()) {
            assert_ne!(promoted, original);
        }
    }
}
