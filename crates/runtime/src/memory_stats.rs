//! Process-wide allocation counters, read by [`crate::diagnostics`].
//!
//! Kept deliberately thin: a handful of relaxed atomics bumped by
//! [`crate::arena`] and [`crate::thread`] as arenas and OS threads come
//! and go. Nothing here is load-bearing for correctness, only for the
//! diagnostics dump a stuck program can be introspected with.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

static ARENAS_CREATED: AtomicU64 = AtomicU64::new(0);
static ARENAS_LIVE: AtomicUsize = AtomicUsize::new(0);
static THREADS_LIVE: AtomicUsize = AtomicUsize::new(0);

pub fn arena_created() {
    ARENAS_CREATED.fetch_add(1, Ordering::Relaxed);
    ARENAS_LIVE.fetch_add(1, Ordering::Relaxed);
}

pub fn arena_destroyed() {
    ARENAS_LIVE.fetch_sub(1, Ordering::Relaxed);
}

pub fn thread_spawned() {
    THREADS_LIVE.fetch_add(1, Ordering::Relaxed);
}

pub fn thread_joined() {
    THREADS_LIVE.fetch_sub(1, Ordering::Relaxed);
}

pub struct Snapshot {
    pub arenas_created: u64,
    pub arenas_live: usize,
    pub threads_live: usize,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        arenas_created: ARENAS_CREATED.load(Ordering::Relaxed),
        arenas_live: ARENAS_LIVE.load(Ordering::Relaxed),
        threads_live: THREADS_LIVE.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn arena_create_then_destroy_returns_live_count_to_zero() {
        let before = snapshot().arenas_live;
        arena_created();
        assert_eq!(snapshot().arenas_live, before + 1);
        arena_destroyed();
        assert_eq!(snapshot().arenas_live, before);
    }

    #[test]
    #[serial]
    fn created_counter_never_decreases() {
        let before = snapshot().arenas_created;
        arena_created();
        arena_destroyed();
        assert!(snapshot().arenas_created > before);
    }
}
