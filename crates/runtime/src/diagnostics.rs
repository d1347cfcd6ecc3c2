//! Runtime introspection (spec §4.H, ambient observability).
//!
//! Grounded on the teacher's SIGQUIT dump handler, but exposed as a
//! plain callable function instead of a signal handler: the spec's
//! Non-goals exclude hot reload and a REPL, not observability, so a
//! `native` builtin or a host embedding `holt-runtime` can still call
//! this directly to introspect a running program without the process
//! needing to be sent a signal from a terminal.

use std::io::Write;

/// Writes a snapshot of live arenas, live threads and the interceptor
/// count to stderr. Never panics: a write failure is silently dropped,
/// the way the teacher's dump handler tolerates a closed stderr.
#[unsafe(no_mangle)]
pub extern "C" fn rt_diagnostics_dump() {
    let stats = crate::memory_stats::snapshot();
    let interceptors = crate::intercept::__rt_interceptor_count.load(std::sync::atomic::Ordering::Relaxed);
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(stderr, "--- holt runtime diagnostics ---");
    let _ = writeln!(stderr, "arenas created : {}", stats.arenas_created);
    let _ = writeln!(stderr, "arenas live    : {}", stats.arenas_live);
    let _ = writeln!(stderr, "threads live   : {}", stats.threads_live);
    let _ = writeln!(stderr, "interceptors   : {interceptors}");
    if let Some(last) = crate::error::last_fatal_message() {
        let _ = writeln!(stderr, "last fatal     : {last}");
    }
    let _ = writeln!(stderr, "--------------------------------");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_does_not_panic_with_nothing_registered() {
        rt_diagnostics_dump();
    }
}
