//! The `lock` statement's intrinsic per-value mutex (spec §5 concurrency
//! model).
//!
//! Every handle gets its own lock on first use rather than carrying a
//! mutex field in `RtHandleV2` itself (keeping the handle shape uniform
//! for [`crate::promote`]); the registry is keyed by the handle's address,
//! which is stable for the handle's lifetime since handles never move
//! once arena-allocated.

use crate::handle::RtHandleV2;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

static REGISTRY: Mutex<Option<HashMap<usize, Arc<AtomicBool>>>> = Mutex::new(None);

fn lock_for(handle: *const RtHandleV2) -> Arc<AtomicBool> {
    let mut registry = REGISTRY.lock().unwrap();
    let map = registry.get_or_insert_with(HashMap::new);
    map.entry(handle as usize)
        .or_insert_with(|| Arc::new(AtomicBool::new(false)))
        .clone()
}

/// # Safety
/// `handle` must be null or a live `RtHandleV2` pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_lock_acquire(handle: *const RtHandleV2) {
    if handle.is_null() {
        return;
    }
    let flag = lock_for(handle);
    while flag
        .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        std::thread::yield_now();
    }
}

/// # Safety
/// `handle` must be the same pointer most recently passed to
/// [`rt_lock_acquire`] on this thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_lock_release(handle: *const RtHandleV2) {
    if handle.is_null() {
        return;
    }
    lock_for(handle).store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::RtArenaV2;
    use crate::handle::RtTypeTag;

    #[test]
    fn acquire_then_release_round_trips_on_one_handle() {
        let arena = RtArenaV2::new(None);
        let handle = arena.alloc(RtHandleV2::new(RtTypeTag::Opaque, std::ptr::null_mut(), 0, None, None));
        unsafe {
            rt_lock_acquire(handle);
            rt_lock_release(handle);
            rt_lock_acquire(handle);
            rt_lock_release(handle);
        }
    }

    #[test]
    fn distinct_handles_get_independent_locks() {
        let arena = RtArenaV2::new(None);
        let a = arena.alloc(RtHandleV2::new(RtTypeTag::Opaque, std::ptr::null_mut(), 0, None, None));
        let b = arena.alloc(RtHandleV2::new(RtTypeTag::Opaque, std::ptr::null_mut(), 0, None, None));
        unsafe {
            rt_lock_acquire(a);
            rt_lock_acquire(b);
            rt_lock_release(a);
            rt_lock_release(b);
        }
    }

    #[test]
    fn null_handle_is_a_no_op() {
        unsafe {
            rt_lock_acquire(std::ptr::null());
            rt_lock_release(std::ptr::null());
        }
    }
}
