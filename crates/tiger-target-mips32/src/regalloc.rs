//! Register allocation strategies.
//!
//! Both allocators consume the selector's instruction stream and rewrite
//! every virtual register operand into a physical register, synthesizing
//! spill stores and loads against per-function stack slots. The naive
//! allocator is the default; the intra-block allocator is the advanced
//! strategy.

mod intra_block;
mod naive;

use alloc::{
    collections::BTreeMap,
    string::{String, ToString},
    vec::Vec,
};
use core::ops::Range;

pub use intra_block::IntraBlockAllocator;
pub use naive::NaiveAllocator;

use mips32_asm::{addi, lw, sw, Instruction, Op, Operand, Reg, RegRef};

use crate::{abi::Abi, frame::OffsetMap};

/// A register allocation strategy: rewrite a generated instruction stream
/// into one that only references physical registers.
pub trait RegisterAllocator {
    fn allocate(&mut self, instructions: Vec<Instruction>) -> Vec<Instruction>;
}

/// `addi $sp, $sp, n`: the stack adjustment shape.
pub(crate) fn sp_adjust(inst: &Instruction) -> Option<i32> {
    if inst.op != Op::Addi {
        return None;
    }
    match inst.operands.as_slice() {
        [Operand::Reg(RegRef::Phys(Reg::SP)), Operand::Reg(RegRef::Phys(Reg::SP)), Operand::Imm(n)] => {
            Some(*n)
        }
        _ => None,
    }
}

/// `sw $ra, 0($sp)`: the return-address save.
pub(crate) fn is_ra_save(inst: &Instruction) -> bool {
    inst.op == Op::Sw
        && matches!(
            inst.operands.as_slice(),
            [
                Operand::Reg(RegRef::Phys(Reg::RA)),
                Operand::Mem {
                    base: RegRef::Phys(Reg::SP),
                    offset: 0
                }
            ]
        )
}

/// `lw $ra, 0($sp)`: the return-address restore.
pub(crate) fn is_ra_restore(inst: &Instruction) -> bool {
    inst.op == Op::Lw
        && matches!(
            inst.operands.as_slice(),
            [
                Operand::Reg(RegRef::Phys(Reg::RA)),
                Operand::Mem {
                    base: RegRef::Phys(Reg::SP),
                    offset: 0
                }
            ]
        )
}

/// `jr $ra`: the return jump.
pub(crate) fn is_return_jump(inst: &Instruction) -> bool {
    inst.op == Op::Jr
        && matches!(
            inst.operands.as_slice(),
            [Operand::Reg(RegRef::Phys(Reg::RA))]
        )
}

/// The selector's structural call shape around one `jal`.
///
/// `save` and `restore` are the generic save-all/restore-all groups the
/// allocator owns the locations for and therefore deletes; `ra_save_addi`
/// is the index of the stack adjustment starting the return-address save,
/// the point where the intra-block allocator re-emits its spill flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallShape {
    pub save: Range<usize>,
    pub ra_save_addi: usize,
    pub restore: Range<usize>,
}

/// A backward group scan: a stack adjustment followed by a non-empty run
/// of stores (or load-immediates, for materialized stack arguments) ending
/// right before `end`. Returns the index of the adjustment.
fn group_back(insts: &[Instruction], end: usize) -> Option<usize> {
    let mut i = end;
    while i > 0 && matches!(insts[i - 1].op, Op::Sw | Op::Li) {
        i -= 1;
    }
    if i == end || i == 0 {
        return None;
    }
    sp_adjust(&insts[i - 1]).map(|_| i - 1)
}

/// Whether the group starting at `start` (ending before `end`) is the
/// return-address save: `addi $sp, $sp, -4` + `sw $ra, 0($sp)`.
fn is_ra_group(insts: &[Instruction], start: usize, end: usize) -> bool {
    end - start == 2 && sp_adjust(&insts[start]) == Some(-4) && is_ra_save(&insts[start + 1])
}

impl CallShape {
    /// Match the selector's call shape around the `jal` at `jal_idx`.
    ///
    /// Returns `None` when the shape is absent (a call the selector did not
    /// lower); such a call is left untouched.
    pub(crate) fn find(insts: &[Instruction], jal_idx: usize) -> Option<CallShape> {
        // Backward: an optional stack-argument group sits between the
        // return-address save and the call.
        let first = group_back(insts, jal_idx)?;
        let ra_start = if is_ra_group(insts, first, jal_idx) {
            first
        } else {
            let second = group_back(insts, first)?;
            if !is_ra_group(insts, second, first) {
                return None;
            }
            second
        };

        // The locals-save group directly precedes the return-address save;
        // a function with no locals has none.
        let save = match group_back(insts, ra_start) {
            Some(start)
                if insts[start + 1..ra_start].iter().all(|i| i.op == Op::Sw) =>
            {
                start..ra_start
            }
            _ => ra_start..ra_start,
        };

        // Forward: optional argument pop, return-address restore, then the
        // locals-restore group.
        let mut i = jal_idx + 1;
        if sp_adjust(insts.get(i)?).map_or(false, |n| n > 0)
            && insts.get(i + 1).map_or(false, is_ra_restore)
        {
            i += 1;
        }
        if !is_ra_restore(insts.get(i)?) {
            return None;
        }
        i += 1;
        if sp_adjust(insts.get(i)?) != Some(4) {
            return None;
        }
        i += 1;

        let restore_start = i;
        while i < insts.len() && insts[i].op == Op::Lw && !is_ra_restore(&insts[i]) {
            i += 1;
        }
        let restore = if i > restore_start
            && i < insts.len()
            && sp_adjust(&insts[i]).map_or(false, |n| n > 0)
        {
            restore_start..i + 1
        } else {
            restore_start..restore_start
        };

        Some(CallShape {
            save,
            ra_save_addi: ra_start,
            restore,
        })
    }
}

/// Find the call shape around every `jal` in a stream.
pub(crate) fn call_shapes(insts: &[Instruction]) -> BTreeMap<usize, CallShape> {
    let mut shapes = BTreeMap::new();
    for (i, inst) in insts.iter().enumerate() {
        if inst.op == Op::Jal {
            if let Some(shape) = CallShape::find(insts, i) {
                shapes.insert(i, shape);
            }
        }
    }
    shapes
}

/// Rewrite one instruction against the current offset map.
///
/// Register-assigned variables rewrite in place. Spilled destinations
/// write through `$t8` with a store appended after the instruction;
/// spilled sources load into position-matched scratch before it. A
/// variable's slot is reserved on first reference, aging every older slot
/// by one word and growing the stack by one.
pub(crate) fn rewrite_instruction(
    original: &Instruction,
    map: &mut OffsetMap,
    register_map: &BTreeMap<String, Reg>,
    out: &mut Vec<Instruction>,
) {
    let mut inst = original.clone();
    let mut suffix: Vec<Instruction> = Vec::new();
    let mut taken: Vec<Reg> = original
        .operands
        .iter()
        .filter_map(|operand| operand.reg_ref())
        .filter_map(|reg| match reg {
            RegRef::Phys(p) if *p == Reg::T8 || *p == Reg::T9 => Some(*p),
            _ => None,
        })
        .collect();
    let mut materialized: BTreeMap<String, Reg> = BTreeMap::new();

    for j in 0..inst.operands.len() {
        let name = match inst.operands[j].reg_ref().and_then(|reg| reg.virt_name()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let is_dest = j == 0 && inst.op.is_def();

        if !map.contains(&name) {
            map.insert_new(&name);
            out.push(addi(Reg::SP, Reg::SP, -4));
        }

        let replacement = if is_dest {
            match register_map.get(&name) {
                Some(&reg) => reg,
                None => {
                    let offset = map
                        .byte_offset(&name)
                        .expect("destination has no stack slot");
                    suffix.push(sw(Reg::T8, Reg::SP, offset));
                    Reg::T8
                }
            }
        } else if let Some(&reg) = register_map.get(&name) {
            reg
        } else if let Some(&scratch) = materialized.get(&name) {
            scratch
        } else {
            let offset = map.byte_offset(&name).expect("source has no stack slot");
            let scratch = Abi::scratch_for(j, &taken);
            taken.push(scratch);
            materialized.insert(name, scratch);
            out.push(lw(scratch, Reg::SP, offset));
            scratch
        };
        *inst.operands[j].reg_ref_mut().expect("register operand") = RegRef::Phys(replacement);
    }

    out.push(inst);
    out.extend(suffix);
}
