//! Per-activation runtime arenas (spec "arena", §4.H).
//!
//! Every function that touches a reference-like value gets its own
//! `RtArenaV2` on entry; a `Block` expression that needs one gets a child
//! nested under its enclosing function's arena. Nothing is freed
//! piecemeal: `rt_arena_destroy` drops the whole region at once, after
//! anything that escapes has already been promoted into `parent` by
//! `promote.rs`. Built directly on `holt_core::arena::Arena`, the same
//! bump engine the front end uses for its own compile-time storage,
//! rather than a second copy of the same bookkeeping.

use holt_core::arena::Arena;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct RtArenaV2 {
    storage: Arena,
    parent: Option<*const RtArenaV2>,
    live_handles: AtomicUsize,
}

impl RtArenaV2 {
    pub fn new(parent: Option<*const RtArenaV2>) -> Self {
        RtArenaV2 {
            storage: Arena::new(),
            parent,
            live_handles: AtomicUsize::new(0),
        }
    }

    pub fn parent(&self) -> Option<&RtArenaV2> {
        self.parent.map(|p| unsafe { &*p })
    }

    pub fn alloc<T>(&self, value: T) -> &T {
        self.storage.alloc(value)
    }

    /// Allocates `size` zeroed bytes (a struct literal's backing storage,
    /// for instance) and returns a raw pointer generated code can write
    /// fields through.
    pub fn alloc_bytes(&self, size: usize) -> *mut u8 {
        self.live_handles.fetch_add(1, Ordering::Relaxed);
        let zeroed = vec![0u8; size.max(1)];
        self.storage.alloc_slice(&zeroed).as_ptr() as *mut u8
    }

    pub fn alloc_str(&self, s: &str) -> *const u8 {
        self.storage.alloc_str(s).as_ptr()
    }

    pub fn allocated_bytes(&self) -> usize {
        self.storage.allocated_bytes()
    }

    pub fn live_handles(&self) -> usize {
        self.live_handles.load(Ordering::Relaxed)
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_arena_create(parent: *const RtArenaV2) -> *mut RtArenaV2 {
    let parent = if parent.is_null() { None } else { Some(parent) };
    tracing::trace!(has_parent = parent.is_some(), "rt_arena_create");
    crate::memory_stats::arena_created();
    Box::into_raw(Box::new(RtArenaV2::new(parent)))
}

/// # Safety
/// `arena` must be a pointer returned by [`rt_arena_create`] that has not
/// already been passed to this function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_destroy(arena: *mut RtArenaV2) {
    if arena.is_null() {
        return;
    }
    tracing::trace!("rt_arena_destroy");
    crate::memory_stats::arena_destroyed();
    unsafe { drop(Box::from_raw(arena)) };
}

/// # Safety
/// `arena` must be a live `RtArenaV2` pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_alloc(arena: *const RtArenaV2, size: usize) -> *mut u8 {
    unsafe { &*arena }.alloc_bytes(size)
}

/// # Safety
/// `arena` must be a live `RtArenaV2` pointer.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_arena_get_parent(arena: *const RtArenaV2) -> *const RtArenaV2 {
    match unsafe { &*arena }.parent {
        Some(p) => p,
        None => std::ptr::null(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_arena_reports_its_parent() {
        let parent = RtArenaV2::new(None);
        let child = RtArenaV2::new(Some(&parent as *const RtArenaV2));
        assert!(std::ptr::eq(child.parent().unwrap(), &parent));
    }

    #[test]
    fn root_arena_has_no_parent() {
        let arena = RtArenaV2::new(None);
        assert!(arena.parent().is_none());
    }

    #[test]
    fn alloc_bytes_returns_zeroed_storage_of_the_requested_size() {
        let arena = RtArenaV2::new(None);
        let ptr = arena.alloc_bytes(16);
        let slice = unsafe { std::slice::from_raw_parts(ptr, 16) };
        assert_eq!(slice, [0u8; 16]);
        assert_eq!(arena.live_handles(), 1);
    }

    #[test]
    fn create_and_destroy_round_trip_through_the_c_abi() {
        let raw = rt_arena_create(std::ptr::null());
        assert!(!raw.is_null());
        unsafe {
            assert!(rt_arena_get_parent(raw).is_null());
            rt_arena_destroy(raw);
        }
    }
}
