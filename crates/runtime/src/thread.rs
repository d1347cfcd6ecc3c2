//! OS-thread concurrency (spec §5 "OS-thread-plus-lock", §4.H).
//!
//! Grounded on the teacher's `scheduler.rs` strand-spawn/join shape, but
//! deliberately built on `std::thread` rather than a green-thread
//! scheduler: the spec scopes cooperative scheduling out entirely, so
//! there's no strand pool or run queue to port, only the spawn/join
//! lifecycle and the TLS-save/restore discipline around it. Each spawned
//! function gets its own fresh [`RtArenaV2`]; its result is promoted into
//! the joining thread's arena before the child arena is destroyed, the
//! same handoff [`crate::promote`] already does for nested blocks.

use crate::arena::{RtArenaV2, rt_arena_destroy};
use crate::handle::RtHandleV2;
use crate::promote::rt_promote;
use std::thread;

pub type ThreadFn = unsafe extern "C" fn(*mut RtArenaV2, *mut u8) -> *mut RtHandleV2;

struct SendPtr(*mut u8);
unsafe impl Send for SendPtr {}

pub struct RtThreadHandle {
    join: Option<thread::JoinHandle<(usize, usize)>>,
}

/// Spawns `func` on a new OS thread with its own arena, passing `env`
/// (the closure's captured-environment pointer) through unchanged.
///
/// # Safety
/// `func` must be safe to call with a freshly created arena and `env`;
/// `env` must remain valid for the spawned thread's lifetime.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_spawn(func: ThreadFn, env: *mut u8) -> *mut RtThreadHandle {
    let env = SendPtr(env);
    tracing::trace!("rt_spawn");
    crate::memory_stats::thread_spawned();
    let join = thread::spawn(move || {
        let env = env;
        let arena = Box::into_raw(Box::new(RtArenaV2::new(None)));
        let result = unsafe { func(arena, env.0) };
        (arena as usize, result as usize)
    });
    Box::into_raw(Box::new(RtThreadHandle { join: Some(join) }))
}

/// Joins `thread`, promotes its result into `dest`, and destroys the
/// thread's own arena. A child thread whose entry function panicked is a
/// fatal error for the joiner, matching the runtime's "never throws
/// exceptions" contract (`error.rs`).
///
/// # Safety
/// `thread` must be a still-unjoined pointer from [`rt_spawn`]; `dest`
/// must be a live arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_thread_join(thread: *mut RtThreadHandle, dest: *const RtArenaV2) -> *mut RtHandleV2 {
    if thread.is_null() {
        return std::ptr::null_mut();
    }
    let mut owned = unsafe { Box::from_raw(thread) };
    let Some(join) = owned.join.take() else {
        return std::ptr::null_mut();
    };
    let (arena_addr, result_addr) = match join.join() {
        Ok(pair) => pair,
        Err(_) => crate::error::fatal("rt_thread_join: spawned thread panicked"),
    };
    crate::memory_stats::thread_joined();
    let child_arena = arena_addr as *mut RtArenaV2;
    let result = result_addr as *mut RtHandleV2;
    let promoted = unsafe { rt_promote(dest, result) };
    unsafe { rt_arena_destroy(child_arena) };
    promoted
}

#[cfg(test)]
mod tests {
    use super::*;

    unsafe extern "C" fn returns_null(_arena: *mut RtArenaV2, _env: *mut u8) -> *mut RtHandleV2 {
        std::ptr::null_mut()
    }

    #[test]
    fn spawn_and_join_round_trips_with_no_result() {
        let dest = RtArenaV2::new(None);
        let handle = unsafe { rt_spawn(returns_null, std::ptr::null_mut()) };
        assert!(!handle.is_null());
        let result = unsafe { rt_thread_join(handle, &dest) };
        assert!(result.is_null());
    }

    #[test]
    fn joining_a_null_handle_returns_null() {
        let dest = RtArenaV2::new(None);
        assert!(unsafe { rt_thread_join(std::ptr::null_mut(), &dest) }.is_null());
    }
}
