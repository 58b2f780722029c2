//! Basic blocks and control-flow partitioning.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::String,
    vec::Vec,
};

use mips32_asm::Instruction;
use tiger_ir::{Function, Inst, Opcode};

use crate::abi::Intrinsic;

/// A basic block: a maximal straight-line run of IR instructions, the
/// target instructions generated from it, and per-block analysis results.
///
/// `live_in`/`live_out`/`uses` are valid only after analysis runs; the
/// allocator analyzes a block immediately before rewriting it and discards
/// it afterwards.
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    /// The IR slice this block owns (contiguous within one function).
    pub ir: Vec<Inst>,
    /// Target instructions generated from the IR slice.
    pub asm: Vec<Instruction>,
    /// Per-instruction live-in sets (variable names).
    pub live_in: Vec<BTreeSet<String>>,
    /// Per-instruction live-out sets (variable names).
    pub live_out: Vec<BTreeSet<String>>,
    /// Forward use counts for block-defined variables.
    pub uses: BTreeMap<String, u32>,
}

impl BasicBlock {
    /// Create a block owning the given IR slice.
    pub fn new(ir: Vec<Inst>) -> Self {
        Self {
            ir,
            asm: Vec::new(),
            live_in: Vec::new(),
            live_out: Vec::new(),
            uses: BTreeMap::new(),
        }
    }
}

/// Whether this instruction ends a straight-line run, making the next
/// instruction a leader.
///
/// Control transfers (conditional branches, goto, return) end a block, and
/// so does a call to anything but an intrinsic: intrinsics lower to
/// straight-line syscall code with no control transfer.
fn ends_block(inst: &Inst) -> bool {
    if inst.opcode.is_conditional_branch() {
        return true;
    }
    match inst.opcode {
        Opcode::Goto | Opcode::Return => true,
        Opcode::Call | Opcode::Callr => match inst.callee() {
            Some(callee) => !Intrinsic::is_intrinsic(callee),
            None => true,
        },
        _ => false,
    }
}

/// Compute the leader set of a function: the indices of instructions that
/// start a basic block.
///
/// Leaders are the function's first instruction, every label, and every
/// instruction immediately following a block-ending instruction.
pub fn leaders(func: &Function) -> BTreeSet<usize> {
    let mut leaders = BTreeSet::new();
    if func.insts.is_empty() {
        return leaders;
    }
    leaders.insert(0);
    for (i, inst) in func.insts.iter().enumerate() {
        if inst.opcode == Opcode::Label {
            leaders.insert(i);
        }
        if ends_block(inst) && i + 1 < func.insts.len() {
            leaders.insert(i + 1);
        }
    }
    leaders
}

/// Partition a function's instructions into basic blocks.
///
/// Each block starts at a leader and extends up to (exclusive of) the next
/// leader; concatenating the blocks' IR slices in order reproduces the
/// function's instruction list.
pub fn partition(func: &Function) -> Vec<BasicBlock> {
    let leader_set = leaders(func);
    let starts: Vec<usize> = leader_set.into_iter().collect();
    let mut blocks = Vec::new();
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(func.insts.len());
        blocks.push(BasicBlock::new(func.insts[start..end].to_vec()));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use tiger_ir::parse_function;

    use super::*;

    fn sample() -> Function {
        parse_function(
            r#"
#start_function
void main():
int-list: i, x
    assign, i, 0
loop0:
    brgeq, exit0, i, 10
    callr, x, geti
    callr, x, add2, x, 1
    add, i, i, 1
    goto, loop0
exit0:
    call, puti, x
#end_function
"#,
        )
        .expect("Failed to parse IR function")
    }

    #[test]
    fn test_leader_set_exact() {
        let func = sample();
        // 0: assign        (first instruction)
        // 1: loop0:        (label)
        // 2: brgeq         (branch; 3 is a leader)
        // 3: callr geti    (intrinsic call: NOT a block end)
        // 4: callr add2    (real call; 5 is a leader)
        // 5: add
        // 6: goto          (branch; 7 is a leader)
        // 7: exit0:        (label)
        // 8: call puti     (intrinsic)
        let leaders = leaders(&func);
        let expected: BTreeSet<usize> = [0, 1, 3, 5, 7].into_iter().collect();
        assert_eq!(leaders, expected);
    }

    #[test]
    fn test_partition_completeness() {
        let func = sample();
        let blocks = partition(&func);
        let mut rebuilt = Vec::new();
        for block in &blocks {
            assert!(!block.ir.is_empty());
            rebuilt.extend(block.ir.iter().cloned());
        }
        assert_eq!(rebuilt, func.insts);
    }

    #[test]
    fn test_first_instruction_is_leader_even_if_label() {
        let func = parse_function(
            r#"
#start_function
void main():
int-list:
entry0:
    goto, entry0
#end_function
"#,
        )
        .expect("Failed to parse IR function");
        let leaders = leaders(&func);
        assert!(leaders.contains(&0));
        assert_eq!(leaders.len(), 1);
    }

    #[test]
    fn test_intrinsic_call_not_a_block_end() {
        let func = parse_function(
            r#"
#start_function
void main():
int-list: x
    callr, x, geti
    call, puti, x
#end_function
"#,
        )
        .expect("Failed to parse IR function");
        assert_eq!(leaders(&func).len(), 1);
        assert_eq!(partition(&func).len(), 1);
    }

    #[test]
    fn test_return_ends_block() {
        let func = parse_function(
            r#"
#start_function
int f(int a):
int-list:
    return, a
dead0:
    return, 0
#end_function
"#,
        )
        .expect("Failed to parse IR function");
        let leaders = leaders(&func);
        let expected: BTreeSet<usize> = [0, 1].into_iter().collect();
        assert_eq!(leaders, expected);
    }

    #[test]
    fn test_empty_function_has_no_blocks() {
        let func = parse_function(
            "#start_function\nvoid empty():\nint-list:\n#end_function",
        )
        .expect("Failed to parse IR function");
        assert!(leaders(&func).is_empty());
        assert!(partition(&func).is_empty());
    }
}
