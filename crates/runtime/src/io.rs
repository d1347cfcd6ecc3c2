//! Console I/O builtins (spec §4.H), all arena-parameterized since every
//! read returns a string handle that has to live somewhere.
//!
//! Grounded on the teacher's `io.rs` role (C-ABI-exported I/O for
//! generated code to call) but retargeted from pushing onto a Forth
//! stack to returning an `RtHandleV2*` directly, matching every other
//! runtime call in this codebase.

use crate::arena::RtArenaV2;
use crate::handle::RtHandleV2;
use std::io::{self, BufRead, Read, Write};

fn alloc_string<'a>(arena: &'a RtArenaV2, text: &str) -> *mut RtHandleV2 {
    let data = arena.alloc_str(text) as *mut u8;
    arena.alloc(crate::handle::RtHandleV2::new(crate::handle::RtTypeTag::Str, data, text.len(), None, None))
        as *const RtHandleV2 as *mut RtHandleV2
}

/// Reads one line from stdin, without the trailing newline. Returns a
/// zero-length string handle at EOF rather than null, so generated code
/// never has to null-check a read result before using it as a string.
///
/// # Safety
/// `arena` must be a live arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_stdin_read_line(arena: *const RtArenaV2) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    alloc_string(arena, &line)
}

/// Reads the next whitespace-delimited word from stdin.
///
/// # Safety
/// `arena` must be a live arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_stdin_read_word(arena: *const RtArenaV2) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let mut word = String::new();
    let stdin = io::stdin();
    let mut bytes = stdin.lock().bytes();
    for b in bytes.by_ref() {
        let Ok(b) = b else { break };
        let c = b as char;
        if c.is_whitespace() {
            if word.is_empty() {
                continue;
            }
            break;
        }
        word.push(c);
    }
    alloc_string(arena, &word)
}

/// Reads a single character from stdin, or `'\0'` at EOF.
#[unsafe(no_mangle)]
pub extern "C" fn rt_stdin_read_char() -> u32 {
    let mut byte = [0u8; 1];
    match io::stdin().lock().read(&mut byte) {
        Ok(1) => byte[0] as u32,
        _ => 0,
    }
}

fn handle_text<'a>(handle: *const RtHandleV2) -> &'a str {
    if handle.is_null() {
        return "";
    }
    unsafe {
        let h = &*handle;
        std::str::from_utf8_unchecked(std::slice::from_raw_parts(h.data, h.len))
    }
}

/// # Safety
/// `value` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_stdout_write(value: *const RtHandleV2) {
    print!("{}", handle_text(value));
    let _ = io::stdout().flush();
}

/// # Safety
/// Same contract as [`rt_stdout_write`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_stdout_write_line(value: *const RtHandleV2) {
    println!("{}", handle_text(value));
}

/// # Safety
/// Same contract as [`rt_stdout_write`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_stderr_write_line(value: *const RtHandleV2) {
    eprintln!("{}", handle_text(value));
}

#[unsafe(no_mangle)]
pub extern "C" fn rt_exit(code: i32) -> ! {
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_from_an_empty_stream_in_a_test_harness_does_not_panic() {
        // stdin isn't exercised under `cargo test`; this just checks the
        // word reader degrades to an empty string instead of blocking
        // forever when stdin is immediately closed.
        let arena = RtArenaV2::new(None);
        let _ = unsafe { rt_stdin_read_line(&arena) };
    }

    #[test]
    fn handle_text_of_a_null_handle_is_empty() {
        assert_eq!(handle_text(std::ptr::null()), "");
    }
}
