//! String building and interpolation formatting (spec §4.G
//! `codegen/format.rs`, §4.H runtime ABI).
//!
//! Supplemented from `original_source/src/runtime/runtime_string_format.c`
//! for the exact padding/percent-form behavior `format.rs`'s parsed
//! `FormatSpec` is meant to drive: zero-padding only widens, never
//! truncates; a percent form multiplies by 100 and appends `%`; hex is
//! always lowercase, unprefixed.

use crate::arena::RtArenaV2;
use crate::handle::{RtHandleV2, RtTypeTag};
use std::cell::RefCell;
use std::ffi::CStr;
use std::os::raw::c_char;

fn alloc_string_handle<'a>(arena: &'a RtArenaV2, text: &str) -> &'a RtHandleV2 {
    let data = arena.alloc_str(text) as *mut u8;
    arena.alloc(RtHandleV2::new(RtTypeTag::Str, data, text.len(), None, None))
}

fn handle_as_str<'a>(handle: *const RtHandleV2) -> &'a str {
    if handle.is_null() {
        return "";
    }
    unsafe {
        let h = &*handle;
        let bytes = std::slice::from_raw_parts(h.data, h.len);
        std::str::from_utf8_unchecked(bytes)
    }
}

const TYPE_DECIMAL: i32 = 0;
const TYPE_HEX: i32 = 1;
const TYPE_PERCENT: i32 = 2;
const TYPE_FIXED: i32 = 3;

fn pad(text: String, width: u32, zero_pad: bool) -> String {
    let width = width as usize;
    if text.len() >= width {
        return text;
    }
    let fill = if zero_pad { '0' } else { ' ' };
    let mut padded: String = std::iter::repeat_n(fill, width - text.len()).collect();
    if zero_pad && text.starts_with('-') {
        return format!("-{}{}", padded, &text[1..]);
    }
    padded.push_str(&text);
    padded
}

/// # Safety
/// `arena` must be a live arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_format_long(arena: *const RtArenaV2, value: i64, width: u32, zero_pad: i32, type_code: i32) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let text = match type_code {
        TYPE_HEX => format!("{value:x}"),
        TYPE_PERCENT => format!("{}%", value * 100),
        _ => value.to_string(),
    };
    alloc_string_handle(arena, &pad(text, width, zero_pad != 0)) as *const RtHandleV2 as *mut RtHandleV2
}

/// # Safety
/// `arena` must be a live arena.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_format_double(
    arena: *const RtArenaV2,
    value: f64,
    width: u32,
    precision: u32,
    zero_pad: i32,
    type_code: i32,
) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let text = match type_code {
        TYPE_PERCENT => format!("{:.*}%", precision as usize, value * 100.0),
        _ => format!("{:.*}", precision as usize, value),
    };
    alloc_string_handle(arena, &pad(text, width, zero_pad != 0)) as *const RtHandleV2 as *mut RtHandleV2
}

/// # Safety
/// `arena` must be a live arena; `value` must be null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_format_string(arena: *const RtArenaV2, value: *const RtHandleV2, width: u32) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let text = handle_as_str(value).to_string();
    alloc_string_handle(arena, &pad(text, width, false)) as *const RtHandleV2 as *mut RtHandleV2
}

/// # Safety
/// `arena` must be a live arena; `text` a valid NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_literal(arena: *const RtArenaV2, text: *const c_char) -> *mut RtHandleV2 {
    let arena = unsafe { &*arena };
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy();
    alloc_string_handle(arena, &text) as *const RtHandleV2 as *mut RtHandleV2
}

/// The typed, arena-backed accumulator `$"...{...}..."` lowers to: each
/// literal chunk and each formatted hole is appended in source order,
/// then `finish` copies the accumulated text into one contiguous string
/// handle. Mirrors `holt_core::arena::StringBuilder`'s role at compile
/// time, one layer down at the runtime ABI.
pub struct RtStringBuilder<'a> {
    arena: &'a RtArenaV2,
    buf: RefCell<String>,
}

/// # Safety
/// `arena` must be a live arena outliving the returned builder.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_builder_new<'a>(arena: *const RtArenaV2) -> *mut RtStringBuilder<'a> {
    let arena = unsafe { &*arena };
    Box::into_raw(Box::new(RtStringBuilder { arena, buf: RefCell::new(String::new()) }))
}

/// # Safety
/// `builder` must be live; `text` a valid NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_builder_append_lit(builder: *mut RtStringBuilder, text: *const c_char) {
    if builder.is_null() {
        return;
    }
    let text = unsafe { CStr::from_ptr(text) }.to_string_lossy();
    unsafe { (*builder).buf.borrow_mut().push_str(&text) };
}

/// # Safety
/// `builder` must be live; `value` null or a live string handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_builder_append(builder: *mut RtStringBuilder, value: *const RtHandleV2) {
    if builder.is_null() {
        return;
    }
    unsafe { (*builder).buf.borrow_mut().push_str(handle_as_str(value)) };
}

/// # Safety
/// `builder` must be a still-live pointer from [`rt_string_builder_new`],
/// not already passed to this function.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rt_string_builder_finish(builder: *mut RtStringBuilder) -> *mut RtHandleV2 {
    if builder.is_null() {
        return std::ptr::null_mut();
    }
    let owned = unsafe { Box::from_raw(builder) };
    let text = owned.buf.into_inner();
    alloc_string_handle(owned.arena, &text) as *const RtHandleV2 as *mut RtHandleV2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_formatting_zero_pads_to_width() {
        let arena = RtArenaV2::new(None);
        let handle = unsafe { rt_format_long(&arena, 7, 3, 1, TYPE_DECIMAL) };
        assert_eq!(handle_as_str(handle), "007");
    }

    #[test]
    fn hex_formatting_is_lowercase() {
        let arena = RtArenaV2::new(None);
        let handle = unsafe { rt_format_long(&arena, 255, 0, 0, TYPE_HEX) };
        assert_eq!(handle_as_str(handle), "ff");
    }

    #[test]
    fn fixed_point_respects_precision() {
        let arena = RtArenaV2::new(None);
        let handle = unsafe { rt_format_double(&arena, std::f64::consts::PI, 0, 2, 0, TYPE_FIXED) };
        assert_eq!(handle_as_str(handle), "3.14");
    }

    #[test]
    fn string_builder_accumulates_literal_and_formatted_pieces() {
        let arena = RtArenaV2::new(None);
        let builder = unsafe { rt_string_builder_new(&arena) };
        let prefix = std::ffi::CString::new("total: ").unwrap();
        unsafe { rt_string_builder_append_lit(builder, prefix.as_ptr()) };
        let formatted = unsafe { rt_format_long(&arena, 42, 0, 0, TYPE_DECIMAL) };
        unsafe { rt_string_builder_append(builder, formatted) };
        let result = unsafe { rt_string_builder_finish(builder) };
        assert_eq!(handle_as_str(result), "total: 42");
    }

    #[test]
    fn string_literal_copies_the_c_string_into_the_arena() {
        let arena = RtArenaV2::new(None);
        let text = std::ffi::CString::new("hello").unwrap();
        let handle = unsafe { rt_string_literal(&arena, text.as_ptr()) };
        assert_eq!(handle_as_str(handle), "hello");
    }
}
