cfg_if::cfg_if! {
    if #[cfg(target_vendor = "apple")] {
        /// On Darwin, `__builtin___clear_cache` lowers to a libSystem call
        /// that already does the right thing, but going through `libc`
        /// directly avoids depending on a compiler intrinsic being
        /// available at link time for every output crate type.
        pub(crate) unsafe fn flush(addr: *const u8, len: usize) {
            unsafe {
                libc::sys_icache_invalidate(addr as *mut core::ffi::c_void, len);
            }
        }
    } else {
        // `__clear_cache` is exported by libgcc/compiler-rt on every other
        // unix target we support; it is a no-op on unified-cache
        // architectures (x86/x86-64) and does the real invalidation
        // sequence on ARM/AArch64.
        unsafe extern "C" {
            fn __clear_cache(start: *const core::ffi::c_void, end: *const core::ffi::c_void);
        }

        pub(crate) unsafe fn flush(addr: *const u8, len: usize) {
            unsafe {
                __clear_cache(addr.cast(), addr.add(len).cast());
            }
        }
    }
}
