//! Call locator (spec component 4 / spec.md §4.2).
//!
//! Scans a caller's body for the first direct call instruction whose
//! resolved target equals a given callee, returning a patchable
//! descriptor. Grounded on `src/int/det.c::det_call_target` and its three
//! per-arch helpers (`find_call_bx86`, `find_call_barm32`,
//! `find_call_baarch64`) in the original source.

use crate::arch::{Arch, Family};
use crate::disasm::Disassembler;
use crate::error::TapiError;
use crate::funcsize::function_size;

/// The default upper bound used when estimating a caller's size before
/// scanning it for calls, matching the original's `0x1000`-byte cap.
pub const DEFAULT_SEARCH_CAP: usize = 0x1000;

/// A located, potentially patchable call instruction.
#[derive(Debug, Clone)]
pub struct Call {
    pub call_addr: usize,
    pub dest_addr: usize,
    pub size: u8,
    pub bytes: [u8; 32],
    pub is_relative: bool,
    pub is_thumb: bool,
    pub orig_off: i32,
}

/// Find the first direct call inside `caller` whose resolved target is
/// `callee`.
///
/// # Safety
///
/// `caller` must point to valid, executable code.
pub unsafe fn locate_call(caller: *const u8, callee: *const u8) -> Result<Call, TapiError> {
    let arch = Arch::for_pointer(caller as usize);
    let disasm = Disassembler::new(arch)?;

    let cap = unsafe { function_size(caller, DEFAULT_SEARCH_CAP) };
    if cap == 0 {
        return Err(TapiError::DisasmAllocFailed);
    }

    let code = unsafe { std::slice::from_raw_parts(caller, cap) };
    let wanted = normalize_target(arch, callee as u64);

    let mut offset = 0usize;
    while offset < cap {
        let address = caller as u64 + offset as u64;
        let Some(insn) = disasm.decode_one(&code[offset..], address) else {
            break;
        };

        if let Some(call) = insn.call {
            if normalize_target(arch, call.dest) == wanted {
                return Ok(Call {
                    call_addr: insn.address as usize,
                    dest_addr: call.dest as usize,
                    size: insn.size,
                    bytes: insn.bytes,
                    is_relative: call.is_relative,
                    is_thumb: arch.thumb,
                    orig_off: call.orig_off,
                });
            }
        }

        offset += insn.size.max(1) as usize;
    }

    Err(TapiError::CallNotFound)
}

/// Compare addresses ignoring the ARM interworking bit on both sides
/// (spec.md §4.2: "Comparison to the supplied callee ignores the low
/// interworking bit on both sides").
fn normalize_target(arch: Arch, addr: u64) -> u64 {
    match arch.family {
        Family::Arm => addr & !1,
        _ => addr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn finds_direct_call_to_exact_target() {
        #[inline(never)]
        extern "C" fn target() -> i32 {
            42
        }

        #[inline(never)]
        extern "C" fn caller() -> i32 {
            target() + 1
        }

        let call = unsafe {
            locate_call(caller as usize as *const u8, target as usize as *const u8)
        };
        let call = call.expect("a direct call to `target` exists in `caller`");
        assert!(call.is_relative);
        assert_eq!(call.size, 5);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn reports_not_found_for_unrelated_target() {
        #[inline(never)]
        extern "C" fn unrelated() -> i32 {
            7
        }

        #[inline(never)]
        extern "C" fn caller() -> i32 {
            1 + 1
        }

        let call = unsafe {
            locate_call(caller as usize as *const u8, unrelated as usize as *const u8)
        };
        assert!(matches!(call, Err(TapiError::CallNotFound)));
    }
}
