//! Target machine conventions.
//!
//! This module fixes the register convention, the calling convention's
//! argument registers, the intrinsic I/O table, and the syscall numbers of
//! the modeled machine.

use mips32_asm::Reg;

/// Syscall numbers of the modeled machine.
pub mod syscalls {
    pub const PRINT_INT: i32 = 1;
    pub const READ_INT: i32 = 5;
    pub const SBRK: i32 = 9;
    pub const EXIT: i32 = 10;
    pub const PRINT_CHAR: i32 = 11;
    pub const READ_CHAR: i32 = 12;
}

/// ABI helper functions and tables.
pub struct Abi;

impl Abi {
    /// The designated entry function.
    pub const ENTRY_FUNCTION: &'static str = "main";

    /// The allocatable temporary pool, in assignment order.
    pub const TEMP_POOL: [Reg; 8] = [
        Reg::T0,
        Reg::T1,
        Reg::T2,
        Reg::T3,
        Reg::T4,
        Reg::T5,
        Reg::T6,
        Reg::T7,
    ];

    /// Reserved registers: never rewritten by allocation.
    pub const RESERVED: [Reg; 8] = [
        Reg::ZERO,
        Reg::V0,
        Reg::A0,
        Reg::A1,
        Reg::A2,
        Reg::A3,
        Reg::SP,
        Reg::RA,
    ];

    /// Get the argument register for argument index, `None` for index >= 4.
    pub fn arg_reg(index: usize) -> Option<Reg> {
        match index {
            0 => Some(Reg::A0),
            1 => Some(Reg::A1),
            2 => Some(Reg::A2),
            3 => Some(Reg::A3),
            _ => None,
        }
    }

    /// Check if a register is reserved.
    pub fn is_reserved(reg: Reg) -> bool {
        Self::RESERVED.contains(&reg)
    }

    /// Byte offset of stack-passed argument `index` (of `argc` total) from
    /// the stack pointer at the call site.
    ///
    /// The highest argument index lands at the lowest offset.
    pub fn stack_arg_offset(index: usize, argc: usize) -> i32 {
        ((argc - 1 - index) * 4) as i32
    }

    /// Scratch register for a spill load at operand position `j`.
    ///
    /// Position 1 prefers `$t8` and every other position prefers `$t9`; if
    /// the preferred scratch is already taken within the instruction (a
    /// selector-materialized operand or an earlier spill load), the other
    /// one is used. An instruction never needs more than two.
    pub fn scratch_for(j: usize, taken: &[Reg]) -> Reg {
        let preferred = if j == 1 { Reg::T8 } else { Reg::T9 };
        let other = if preferred == Reg::T8 {
            Reg::T9
        } else {
            Reg::T8
        };
        if taken.contains(&preferred) {
            other
        } else {
            preferred
        }
    }
}

/// A compiler-known I/O operation, lowered to a syscall sequence instead of
/// a user-level call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    Geti,
    Getc,
    Puti,
    Putc,
}

impl Intrinsic {
    /// Look up an intrinsic by callee name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "geti" => Intrinsic::Geti,
            "getc" => Intrinsic::Getc,
            "puti" => Intrinsic::Puti,
            "putc" => Intrinsic::Putc,
            _ => return None,
        })
    }

    /// Whether `name` names an intrinsic.
    pub fn is_intrinsic(name: &str) -> bool {
        Self::from_name(name).is_some()
    }

    /// The syscall number this intrinsic lowers to.
    pub fn syscall_number(self) -> i32 {
        match self {
            Intrinsic::Geti => syscalls::READ_INT,
            Intrinsic::Getc => syscalls::READ_CHAR,
            Intrinsic::Puti => syscalls::PRINT_INT,
            Intrinsic::Putc => syscalls::PRINT_CHAR,
        }
    }

    /// The register the syscall leaves its result in, for "get" intrinsics.
    ///
    /// `getc` is the one intrinsic whose result register differs: the read
    /// character arrives in `$a0`; `geti` delivers in `$v0`.
    pub fn result_reg(self) -> Option<Reg> {
        match self {
            Intrinsic::Geti => Some(Reg::V0),
            Intrinsic::Getc => Some(Reg::A0),
            Intrinsic::Puti | Intrinsic::Putc => None,
        }
    }

    /// Whether this intrinsic takes an argument in `$a0`.
    pub fn takes_argument(self) -> bool {
        matches!(self, Intrinsic::Puti | Intrinsic::Putc)
    }
}
