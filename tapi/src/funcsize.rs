//! Function-size estimator (spec component 3 / spec.md §4.1).
//!
//! Disassembles forward from an entry point one instruction at a time,
//! stopping at a genuine function terminator plus its trailing padding
//! run, or at the caller-supplied cap. Grounded on
//! `src/int/det.c::det_function_size` in the original source.

use crate::arch::Arch;
use crate::disasm::Disassembler;

/// Disassemble forward from `entry`, returning the byte length of the
/// function. Returns `0` only when the disassembler itself could not be
/// allocated (spec.md §3: "zero indicates failure to allocate
/// disassembler state").
///
/// # Safety
///
/// `entry` must point to at least `cap` bytes of readable, executable
/// code.
pub unsafe fn function_size(entry: *const u8, cap: usize) -> usize {
    let arch = Arch::for_pointer(entry as usize);
    let disasm = match Disassembler::new(arch) {
        Ok(d) => d,
        Err(e) => {
            log::error!("tapi, funcsize; {e}");
            return 0;
        }
    };

    let code = unsafe { std::slice::from_raw_parts(entry, cap) };
    let mut size = 0usize;
    let mut found_end = false;
    let mut pad_count = 0u32;

    while size < cap {
        let remaining = &code[size..];
        let address = entry as u64 + size as u64;
        let Some(insn) = disasm.decode_one(remaining, address) else {
            // Capstone refused to decode further bytes (e.g. ran off the
            // end of a short slice); treat what we have as the answer.
            break;
        };
        size += insn.size as usize;

        // Phase 2 (padding tail) only applies to instructions seen after
        // the terminator, never to the terminator itself.
        let past_end = found_end;

        // Function terminator: return, interrupt-return, or an
        // unconditional relative branch (x86 `jmp`; ARM `b`/`bx` with
        // `AL`). Tail-call-shaped terminators still mark the function end
        // (spec.md §4.1), and conditional branches never do.
        if insn.is_ret || insn.is_iret || insn.is_unconditional_branch {
            found_end = true;
        }

        if past_end {
            if insn.is_padding {
                pad_count += 1;
                if pad_count > 2 {
                    break;
                }
            } else {
                // A non-padding instruction after the terminator begins
                // the next function.
                break;
            }
        }

        if size >= cap {
            log::warn!("tapi, funcsize; hit max search size of {cap} bytes");
            break;
        }
    }

    size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn stops_at_ret_without_trailing_padding() {
        // `xor eax, eax; ret`
        let code: [u8; 4] = [0x31, 0xc0, 0xc3, 0x90];
        let size = unsafe { function_size(code.as_ptr(), code.len()) };
        // ret at offset 2 (size 1) then exactly one padding nop before
        // running out of the 4-byte buffer: 2 + 1 + 1 = 4.
        assert_eq!(size, 4);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn bounded_by_cap() {
        let code: [u8; 8] = [0x90; 8];
        let size = unsafe { function_size(code.as_ptr(), 4) };
        assert!(size <= 4);
    }
}
