//! End-to-end check of the arena/handle/promotion trio, exercised the way
//! generated code actually calls it: allocate in a child arena, promote
//! the result out before the child arena is torn down.

use holt_runtime::arena::{rt_arena_create, rt_arena_destroy};
use holt_runtime::handle::{RtHandleV2, RtTypeTag, rt_handle_version};
use holt_runtime::promote::{rt_promote, rt_sync_promote_all};

#[test]
fn a_string_built_in_a_child_block_survives_the_block_s_arena_dying() {
    unsafe {
        let caller_arena = rt_arena_create(std::ptr::null());
        let block_arena = rt_arena_create(caller_arena);

        let text = "escaped";
        let data = (*block_arena).alloc_str(text) as *mut u8;
        let handle = (*block_arena).alloc(RtHandleV2::new(RtTypeTag::Str, data, text.len(), None, None))
            as *const RtHandleV2 as *mut RtHandleV2;

        let promoted = rt_promote(caller_arena, handle);
        assert!(!promoted.is_null());
        rt_arena_destroy(block_arena);

        let bytes = std::slice::from_raw_parts((*promoted).data, (*promoted).len);
        assert_eq!(std::str::from_utf8(bytes).unwrap(), "escaped");

        rt_arena_destroy(caller_arena);
    }
}

#[test]
fn promoting_bumps_the_source_handle_s_version_so_a_stale_pointer_is_detectable() {
    unsafe {
        let src_arena = rt_arena_create(std::ptr::null());
        let dest_arena = rt_arena_create(std::ptr::null());
        let handle = (*src_arena).alloc(RtHandleV2::new(RtTypeTag::Opaque, std::ptr::null_mut(), 0, None, None))
            as *const RtHandleV2 as *mut RtHandleV2;
        let before = rt_handle_version(handle);

        rt_promote(dest_arena, handle);

        assert!(rt_handle_version(handle) > before);
        rt_arena_destroy(src_arena);
        rt_arena_destroy(dest_arena);
    }
}

#[test]
fn sync_on_several_values_promotes_each_in_call_order() {
    unsafe {
        let src_arena = rt_arena_create(std::ptr::null());
        let dest_arena = rt_arena_create(std::ptr::null());
        let mut slots: Vec<*mut RtHandleV2> = (0..3)
            .map(|i| {
                (*src_arena).alloc(RtHandleV2::new(RtTypeTag::Opaque, i as *mut u8, 0, None, None))
                    as *const RtHandleV2 as *mut RtHandleV2
            })
            .collect();
        let originals = slots.clone();

        rt_sync_promote_all(dest_arena, slots.as_mut_ptr(), slots.len());

        for (promoted, original) in slots.iter().zip(originals.iter()) {
            assert_ne!(promoted, original, "each slot should now point at a copy in dest_arena");
        }

        rt_arena_destroy(src_arena);
        rt_arena_destroy(dest_arena);
    }
}
