//! Fatal runtime errors (spec §4.H: "the runtime never throws exceptions").
//!
//! Grounded on the teacher's thread-local error-state shape, but the
//! call convention is inverted: the teacher's `patch_seq_*` functions set
//! a thread-local and return control to the caller so a Forth word loop
//! can check `has_error` between steps. A Holt checked division or
//! out-of-bounds access has no such loop to return into — the generated
//! C just called straight through a thunk — so [`fatal`] prints one
//! diagnostic and terminates the process instead. The thread-local is
//! kept anyway, for `diagnostics.rs` and tests to read back what the
//! most recent fatal message on this thread was.

use std::cell::RefCell;

thread_local! {
    static LAST_FATAL: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Records `message` and exits the process. Never returns, so callers in
/// an unboxing or arithmetic helper can use it directly as the fallback
/// arm of a match with no unreachable-code hoops.
pub fn fatal(message: &str) -> ! {
    LAST_FATAL.with(|slot| *slot.borrow_mut() = Some(message.to_string()));
    eprintln!("holt: runtime error: {message}");
    tracing::error!(%message, "fatal runtime error");
    std::process::exit(70);
}

/// Test/diagnostics hook: the last fatal message recorded on this thread,
/// if any. Never cleared, since the process exits before anything could
/// observe two in a row.
pub fn last_fatal_message() -> Option<String> {
    LAST_FATAL.with(|slot| slot.borrow().clone())
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_assert(condition: bool, message: *const std::os::raw::c_char) {
    if condition {
        return;
    }
    let text = if message.is_null() {
        "assertion failed".to_string()
    } else {
        unsafe { std::ffi::CStr::from_ptr(message) }.to_string_lossy().into_owned()
    };
    fatal(&text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_assertion_does_not_record_a_fatal_message() {
        rt_assert(true, std::ptr::null());
    }
}
