//! Disassembler abstraction.
//!
//! The rest of the crate never touches `capstone` types directly — this
//! module is the single seam the Design Notes call for ("abstract it
//! behind a minimal trait"). [`Disassembler::decode_one`] decodes exactly
//! one instruction at a given address from a byte slice, mirroring the
//! single-step behavior of the original's `cs_disasm_iter` loop in
//! `src/int/det.c`, and returns an owned [`DecodedInsn`] so callers never
//! have to juggle capstone's borrowed `Insn`/`InsnDetail` lifetimes.
//!
//! Per-architecture `Capstone` construction is grounded on
//! `cranelift-codegen`'s `isa::aarch64::AArch64Backend::to_capstone`
//! (`cranelift/codegen/src/isa/aarch64/mod.rs`).

use capstone::prelude::*;
use capstone::{Capstone, InsnGroupId, InsnGroupType};

use crate::arch::{Arch, Family};
use crate::error::TapiError;

/// A single decoded instruction, stripped down to what the function-size
/// estimator and call locator need.
#[derive(Debug, Clone)]
pub struct DecodedInsn {
    pub address: u64,
    pub size: u8,
    pub bytes: [u8; 32],
    /// `RET`-shaped (x86 `ret`, ARM `bx lr`-style returns via capstone's
    /// `CS_GRP_RET`).
    pub is_ret: bool,
    /// `IRET`-shaped (interrupt return).
    pub is_iret: bool,
    /// An unconditional, function-terminating relative branch: x86 `jmp`,
    /// or ARM `b`/`bx` with condition code `AL`. Conditional branches are
    /// never reported here (spec.md §4.1: "the AL-only rule avoids
    /// truncating functions at early `bne`-style edges").
    pub is_unconditional_branch: bool,
    /// Architecture-specific padding: x86 `nop`/`int3`; ARM canonical nop
    /// or `mov rX, rX`; AArch64 canonical nop alias.
    pub is_padding: bool,
    /// Present when this instruction is some flavor of direct or
    /// register-indirect call.
    pub call: Option<CallOperand>,
}

/// Resolved target information for a call-shaped instruction.
#[derive(Debug, Clone, Copy)]
pub struct CallOperand {
    /// Absolute resolved target address.
    pub dest: u64,
    /// True when the call encodes a PC-relative (or, on x86-64, the
    /// library's "patchable-as-relative" absolute) displacement.
    pub is_relative: bool,
    /// Original signed displacement in the instruction's natural unit
    /// (spec.md §3's `orig_off`).
    pub orig_off: i32,
}

pub struct Disassembler {
    cs: Capstone,
    arch: Arch,
}

impl Disassembler {
    pub fn new(arch: Arch) -> Result<Disassembler, TapiError> {
        let cs = match arch.family {
            Family::X86 => Capstone::new()
                .x86()
                .mode(if arch.is64 {
                    arch::x86::ArchMode::Mode64
                } else {
                    arch::x86::ArchMode::Mode32
                })
                .detail(true)
                .build(),
            Family::Arm => Capstone::new()
                .arm()
                .mode(if arch.thumb {
                    arch::arm::ArchMode::Thumb
                } else {
                    arch::arm::ArchMode::Arm
                })
                .detail(true)
                .build(),
            Family::Aarch64 => Capstone::new()
                .arm64()
                .mode(arch::arm64::ArchMode::Arm)
                .detail(true)
                .build(),
        };
        cs.map(|cs| Disassembler { cs, arch }).map_err(|e| {
            log::error!("tapi, disasm; capstone open failed: {e}");
            TapiError::DisasmAllocFailed
        })
    }

    /// Decode exactly one instruction starting at `address`, reading from
    /// `code` (which must contain at least the bytes of that instruction).
    pub fn decode_one(&self, code: &[u8], address: u64) -> Option<DecodedInsn> {
        let insns = self.cs.disasm_count(code, address, 1).ok()?;
        let insn = insns.iter().next()?;
        let detail = self.cs.insn_detail(&insn).ok()?;
        let groups = detail.groups();

        let mut bytes = [0u8; 32];
        let raw = insn.bytes();
        let n = raw.len().min(32);
        bytes[..n].copy_from_slice(&raw[..n]);

        let is_ret = in_group(groups, InsnGroupType::CS_GRP_RET);
        let is_iret = in_group(groups, InsnGroupType::CS_GRP_IRET);

        let (is_unconditional_branch, is_padding, call) = match self.arch.family {
            Family::X86 => x86_classify(&insn, &detail),
            Family::Arm => arm_classify(&insn, &detail, self.arch.thumb),
            Family::Aarch64 => aarch64_classify(&insn, &detail),
        };

        Some(DecodedInsn {
            address: insn.address(),
            size: insn.len() as u8,
            bytes,
            is_ret,
            is_iret,
            is_unconditional_branch,
            is_padding,
            call,
        })
    }
}

fn in_group(groups: &[InsnGroupId], group: InsnGroupType) -> bool {
    groups.iter().any(|g| g.0 == group as u8)
}

fn x86_classify(
    insn: &capstone::Insn<'_>,
    detail: &capstone::InsnDetail<'_>,
) -> (bool, bool, Option<CallOperand>) {
    let id = insn.id().0;
    let is_unconditional_branch = id == arch::x86::X86Insn::X86_INS_JMP as u32;
    let is_padding = id == arch::x86::X86Insn::X86_INS_NOP as u32
        || id == arch::x86::X86Insn::X86_INS_INT3 as u32;

    let is_call = in_group(detail.groups(), InsnGroupType::CS_GRP_CALL);
    let call = if is_call {
        if let Some(ArchDetail::X86Detail(x86)) = Some(detail.arch_detail()) {
            find_call_x86(insn, &x86)
        } else {
            None
        }
    } else {
        None
    };
    (is_unconditional_branch, is_padding, call)
}

fn find_call_x86(
    insn: &capstone::Insn<'_>,
    x86: &capstone::arch::x86::X86InsnDetail<'_>,
) -> Option<CallOperand> {
    for op in x86.operands() {
        if let arch::x86::X86OperandType::Imm(imm) = op.op_type {
            // capstone resolves a direct `CALL rel32`'s displacement into
            // the absolute target address itself, so the only
            // Imm-operand call shape this ever sees is the genuinely
            // relative 5-byte `E8` form; `call [mem]`/`call reg` never
            // produce an `Imm` operand at all and are filtered out
            // upstream by falling through to `None`.
            let dest = imm as u64;
            let next = insn.address().wrapping_add(insn.len() as u64);
            let orig_off = (dest as i64 - next as i64) as i32;
            return Some(CallOperand { dest, is_relative: true, orig_off });
        }
    }
    None
}

fn arm_classify(
    insn: &capstone::Insn<'_>,
    detail: &capstone::InsnDetail<'_>,
    thumb: bool,
) -> (bool, bool, Option<CallOperand>) {
    let id = insn.id().0;
    let arm = match detail.arch_detail() {
        ArchDetail::ArmDetail(a) => a,
        _ => return (false, false, None),
    };

    let is_al = arm.cc() == arch::arm::ArmCC::ARM_CC_AL;
    let is_unconditional_branch =
        (id == arch::arm::ArmInsn::ARM_INS_B as u32 || id == arch::arm::ArmInsn::ARM_INS_BX as u32)
            && is_al;

    let is_nop_alias = id == arch::arm::ArmInsn::ARM_INS_NOP as u32;
    let is_mov_self = id == arch::arm::ArmInsn::ARM_INS_MOV as u32
        && arm.operands().len() == 2
        && matches!(
            (arm.operands().nth(0).map(|o| o.op_type), arm.operands().nth(1).map(|o| o.op_type)),
            (Some(arch::arm::ArmOperandType::Reg(a)), Some(arch::arm::ArmOperandType::Reg(b))) if a == b
        );
    let is_padding = is_nop_alias || is_mov_self;

    let is_bl = id == arch::arm::ArmInsn::ARM_INS_BL as u32;
    let is_blx = id == arch::arm::ArmInsn::ARM_INS_BLX as u32;
    let call = if is_bl || is_blx {
        arm.operands().find_map(|op| match op.op_type {
            arch::arm::ArmOperandType::Imm(imm) => {
                let target = imm as u64;
                let pc = insn.address();
                let orig_off = if thumb {
                    ((target as i64) - (pc as i64 + 4)) as i32 >> 1
                } else {
                    ((target as i64) - (pc as i64 + 8)) as i32 >> 2
                };
                Some(CallOperand { dest: target, is_relative: true, orig_off })
            }
            _ => None,
        })
    } else {
        None
    };

    (is_unconditional_branch, is_padding, call)
}

fn aarch64_classify(
    insn: &capstone::Insn<'_>,
    detail: &capstone::InsnDetail<'_>,
) -> (bool, bool, Option<CallOperand>) {
    let id = insn.id().0;
    let is_padding = id == arch::arm64::Arm64Insn::ARM64_INS_NOP as u32;

    let arm64_detail = match detail.arch_detail() {
        ArchDetail::Arm64Detail(a64) => Some(a64),
        _ => None,
    };

    // `B` is unconditional unless it carries a condition code (the
    // `B.cond` family shares the same instruction id in capstone, cc
    // `INVALID` or `AL` marks the plain, tail-call-shaped form — spec.md
    // §4.1 phase 1 lists an unconditional relative branch as a
    // terminator for every family, and the glossary treats tail calls
    // the same way).
    let is_b = id == arch::arm64::Arm64Insn::ARM64_INS_B as u32;
    let is_unconditional_branch = is_b
        && arm64_detail.as_ref().is_some_and(|a64| {
            matches!(
                a64.cc(),
                arch::arm64::Arm64CC::ARM64_CC_INVALID | arch::arm64::Arm64CC::ARM64_CC_AL
            )
        });

    let is_bl = id == arch::arm64::Arm64Insn::ARM64_INS_BL as u32;
    let call = if is_bl {
        arm64_detail.as_ref().and_then(|a64| {
            a64.operands().find_map(|op| match op.op_type {
                arch::arm64::Arm64OperandType::Imm(imm) => {
                    let target = imm as u64;
                    let orig_off = (target as i64 - insn.address() as i64) as i32;
                    Some(CallOperand { dest: target, is_relative: true, orig_off })
                }
                _ => None,
            })
        })
    } else {
        // `blr` (register-indirect) is recognized as a call by the
        // locator but never produces a `CallOperand` — not patchable.
        None
    };

    (is_unconditional_branch, is_padding, call)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x86_64_nop_is_padding() {
        let cs = Disassembler::new(Arch { family: Family::X86, is64: true, thumb: false }).unwrap();
        let nop = [0x90u8];
        let insn = cs.decode_one(&nop, 0x1000).expect("decodes");
        assert!(insn.is_padding);
        assert!(!insn.is_unconditional_branch);
    }

    #[test]
    fn x86_64_ret_is_terminator() {
        let cs = Disassembler::new(Arch { family: Family::X86, is64: true, thumb: false }).unwrap();
        let ret = [0xc3u8];
        let insn = cs.decode_one(&ret, 0x1000).expect("decodes");
        assert!(insn.is_ret);
    }
}
