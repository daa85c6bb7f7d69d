//! Instruction-cache maintenance for freshly patched call sites.
//!
//! Patching a call instruction writes new bytes through the data cache;
//! on most architectures the CPU's instruction fetch path does not see
//! those bytes until the corresponding instruction-cache lines are
//! invalidated. [`flush`] does that for the byte range `[addr, addr + len)`
//! on the current platform.
//!
//! This crate intentionally has no knowledge of *why* the range changed —
//! it mirrors `tapi`'s split between "decide what to patch" and "make the
//! patch visible", the same separation of concerns the teacher keeps
//! between code generation and icache maintenance.

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        mod windows;
        use windows as sys;
    } else {
        mod unix;
        use unix as sys;
    }
}

/// Flush `len` bytes of the instruction cache starting at `addr`.
///
/// # Safety
///
/// `addr` must be valid for reads of `len` bytes and must not be
/// concurrently executed by another thread while the flush is in
/// progress (see the crate-level safety note in `tapi` about patching
/// not being concurrency-safe).
pub unsafe fn flush(addr: *const u8, len: usize) {
    if len == 0 {
        return;
    }
    unsafe { sys::flush(addr, len) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flush_of_empty_range_is_a_noop() {
        // len == 0 must short-circuit before touching `sys::flush`, so an
        // otherwise-invalid pointer is fine here.
        unsafe { flush(core::ptr::null(), 0) };
    }

    #[test]
    fn flush_over_live_stack_bytes_does_not_crash() {
        let buf = [0u8; 64];
        unsafe { flush(buf.as_ptr(), buf.len()) };
    }
}
