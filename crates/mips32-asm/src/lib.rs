//! MIPS32 assembly model.
//!
//! This crate provides:
//! - General-purpose register names (`Reg`)
//! - A structured instruction representation (`Instruction`, `Op`, `Operand`)
//! - Assembly text rendering via `Display`
//!
//! Instructions carry typed operand lists instead of formatted text, so later
//! passes (register allocation, call-boundary rewrites) match on structure
//! rather than re-parsing strings. Memory operands are a distinguished
//! variant carrying a base register and a byte offset.

#![no_std]

extern crate alloc;

mod inst;
mod regs;

pub use inst::{
    addi, jal, jr, label, li, lw, mov, section_text, sw, syscall, vreg, Instruction, Op, Operand,
    RegRef,
};
pub use regs::Reg;
