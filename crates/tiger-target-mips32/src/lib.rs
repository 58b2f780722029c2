//! MIPS32 back end for Tiger IR.
//!
//! This crate provides:
//! - Basic block partitioning (`block`)
//! - Instruction selection (`lower`)
//! - Block-local liveness and use-count analysis (`liveness`)
//! - Register allocation (`regalloc`): a naive baseline (the default) and
//!   a greedy intra-block allocator
//!
//! The pipeline is batch and single-threaded: the selector produces the
//! instruction stream plus the block and frame tables, the chosen
//! allocator borrows them for one pass, and the result renders to
//! assembly text.

#![no_std]

extern crate alloc;

pub mod abi;
pub mod block;
pub mod frame;
pub mod liveness;
pub mod lower;
pub mod regalloc;

use alloc::{string::String, vec::Vec};

use mips32_asm::Instruction;
use tiger_ir::Program;

pub use crate::lower::{lower_program, LeaderKey, Lowering};
pub use crate::regalloc::{IntraBlockAllocator, NaiveAllocator, RegisterAllocator};

/// Which register allocation strategy to run.
///
/// The naive allocator is the default; the intra-block allocator must be
/// requested explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AllocatorKind {
    #[default]
    Naive,
    IntraBlock,
}

/// Compile a program: select instructions, then allocate registers.
pub fn compile_program(program: &Program, kind: AllocatorKind) -> Vec<Instruction> {
    let lowering = lower_program(program);
    match kind {
        AllocatorKind::Naive => {
            NaiveAllocator::new(lowering.frames).allocate(lowering.instructions)
        }
        AllocatorKind::IntraBlock => {
            IntraBlockAllocator::new(lowering.blocks, lowering.frames)
                .allocate(lowering.instructions)
        }
    }
}

/// Render an instruction stream as assembly text, one instruction per line.
pub fn render_assembly(instructions: &[Instruction]) -> String {
    let mut text = String::new();
    for inst in instructions {
        use core::fmt::Write;
        let _ = writeln!(text, "{}", inst);
    }
    text
}
