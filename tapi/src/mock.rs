//! Mock lifecycle (spec component 6 / spec.md §4.4).
//!
//! Couples a `(caller, callee, replacement)` triple to the locator and
//! patcher, tracking `Created -> Applied -> Restored` as a state machine
//! so illegal transitions (double-apply, restore-before-apply) are
//! caught rather than silently tolerated. Grounded on `src/mock.c` in the
//! original source; restore here replays the saved `orig_bytes` directly
//! rather than re-locating the call by searching for `replacement` (see
//! SPEC_FULL.md's resolved open questions).

use crate::arch::Arch;
use crate::error::TapiError;
use crate::funcsize::function_size;
use crate::locate::{locate_call, DEFAULT_SEARCH_CAP};
use crate::patch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Applied,
    Restored,
}

/// A single call-site patch, from creation through apply and restore.
pub struct Mock {
    orig_caller: *const u8,
    orig_callee: *const u8,
    replacement: *const u8,
    fun_size: usize,
    call_addr: usize,
    patch_size: u8,
    orig_bytes: [u8; 32],
    patched_bytes: [u8; 32],
    state: State,
}

impl Mock {
    /// Capture the triple and cache the caller's estimated size. No
    /// memory is touched.
    ///
    /// # Safety
    ///
    /// `caller`, `callee`, and `replacement` must all be valid,
    /// executable code pointers, and `replacement` must be
    /// ABI-compatible with `callee`.
    pub unsafe fn create(
        caller: *const u8,
        callee: *const u8,
        replacement: *const u8,
    ) -> Mock {
        let fun_size = unsafe { function_size(caller, DEFAULT_SEARCH_CAP) };
        Mock {
            orig_caller: caller,
            orig_callee: callee,
            replacement,
            fun_size,
            call_addr: 0,
            patch_size: 0,
            orig_bytes: [0; 32],
            patched_bytes: [0; 32],
            state: State::Created,
        }
    }

    pub fn fun_size(&self) -> usize {
        self.fun_size
    }

    /// Locate the call to `orig_callee` inside `orig_caller` and rewrite
    /// it to target `replacement`.
    pub fn apply(&mut self) -> Result<(), TapiError> {
        let arch = Arch::for_pointer(self.orig_caller as usize);
        let call = unsafe { locate_call(self.orig_caller, self.orig_callee) }.map_err(|e| {
            log::error!("tapi, mock; apply failed: {e}");
            e
        })?;

        self.orig_bytes[..call.size as usize]
            .copy_from_slice(&call.bytes[..call.size as usize]);
        self.call_addr = call.call_addr;
        self.patch_size = call.size;

        patch::apply(arch, &call, self.replacement).map_err(|e| {
            log::error!("tapi, mock; apply failed: {e}");
            e
        })?;

        let patched = unsafe {
            std::slice::from_raw_parts(self.call_addr as *const u8, self.patch_size as usize)
        };
        self.patched_bytes[..self.patch_size as usize].copy_from_slice(patched);

        self.state = State::Applied;
        Ok(())
    }

    /// Write the saved original bytes back over the call site.
    pub fn restore(&mut self) -> Result<(), TapiError> {
        if self.state != State::Applied {
            log::error!("tapi, mock; restore called on a mock that was never applied");
            return Err(TapiError::RestoreUnapplied);
        }

        patch::revert(self.call_addr, &self.orig_bytes[..self.patch_size as usize]).map_err(
            |e| {
                log::error!("tapi, mock; restore failed: {e}");
                e
            },
        )?;

        self.state = State::Restored;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn apply_then_restore_round_trips_observable_behavior() {
        #[inline(never)]
        extern "C" fn target() -> i32 {
            7
        }

        #[inline(never)]
        extern "C" fn replacement() -> i32 {
            99
        }

        #[inline(never)]
        extern "C" fn caller() -> i32 {
            target()
        }

        let mut mock = unsafe {
            Mock::create(
                caller as usize as *const u8,
                target as usize as *const u8,
                replacement as usize as *const u8,
            )
        };
        assert!(mock.fun_size() > 0);

        mock.apply().expect("locatable call patches cleanly");
        assert_eq!(caller(), 99);

        mock.restore().expect("an applied mock restores cleanly");
        assert_eq!(caller(), 7);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn restore_without_apply_is_a_logged_no_op() {
        #[inline(never)]
        extern "C" fn target() -> i32 {
            1
        }
        #[inline(never)]
        extern "C" fn replacement() -> i32 {
            2
        }
        #[inline(never)]
        extern "C" fn caller() -> i32 {
            target()
        }

        let mut mock = unsafe {
            Mock::create(
                caller as usize as *const u8,
                target as usize as *const u8,
                replacement as usize as *const u8,
            )
        };
        assert!(matches!(mock.restore(), Err(TapiError::RestoreUnapplied)));
    }
}
