//! Architecture probe (spec component 1).
//!
//! Yields the active instruction-set family and mode, derived once per
//! operation rather than cached globally, because the ARM Thumb bit
//! depends on the pointer being inspected and not on the process as a
//! whole. Grounded on `src/int/arch.c::get_arch` in the original source,
//! generalized to a runtime-overridable probe (`tapi::setup`) instead of
//! a `#ifdef`-only compile-time pair.

use std::fmt;

/// The instruction-set family of a caller/callee pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    X86,
    Arm,
    Aarch64,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Family::X86 => "x86",
            Family::Arm => "arm",
            Family::Aarch64 => "aarch64",
        };
        f.write_str(s)
    }
}

/// A fully resolved architecture + mode pair for a specific code pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arch {
    pub family: Family,
    /// Only meaningful for `Family::X86`: true for x86-64, false for x86-32.
    pub is64: bool,
    /// Only meaningful for `Family::Arm`: true when the pointer's low bit
    /// (the "interworking" bit) marks Thumb mode.
    pub thumb: bool,
}

impl Arch {
    /// The architecture this binary was compiled for, absent any
    /// override installed via [`crate::setup`].
    pub fn native() -> Arch {
        if let Some(over) = crate::config::architecture_override() {
            return over;
        }
        Self::compiled_native()
    }

    #[cfg(target_arch = "x86_64")]
    fn compiled_native() -> Arch {
        Arch { family: Family::X86, is64: true, thumb: false }
    }

    #[cfg(target_arch = "x86")]
    fn compiled_native() -> Arch {
        Arch { family: Family::X86, is64: false, thumb: false }
    }

    #[cfg(target_arch = "aarch64")]
    fn compiled_native() -> Arch {
        Arch { family: Family::Aarch64, is64: true, thumb: false }
    }

    #[cfg(target_arch = "arm")]
    fn compiled_native() -> Arch {
        Arch { family: Family::Arm, is64: false, thumb: false }
    }

    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "x86",
        target_arch = "aarch64",
        target_arch = "arm"
    )))]
    fn compiled_native() -> Arch {
        compile_error!("tapi only supports x86, x86-64, arm (a32/thumb), and aarch64");
    }

    /// Resolve the architecture to use when inspecting code at `addr`,
    /// folding in the ARM Thumb low-bit rule (spec.md §3: "Thumb detected
    /// additionally from the low bit of the caller pointer on ARM").
    pub fn for_pointer(addr: usize) -> Arch {
        let mut arch = Self::native();
        if arch.family == Family::Arm {
            arch.thumb = addr & 1 != 0;
        }
        arch
    }
}
