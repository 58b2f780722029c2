//! Block-local liveness and use-count analysis.
//!
//! Liveness is computed backward over one generated block at a time and is
//! never propagated from successor blocks; the allocator relies on stack
//! slots as the only source of truth across block boundaries.

use alloc::{
    collections::{BTreeSet, VecDeque},
    string::{String, ToString},
    vec,
    vec::Vec,
};

use mips32_asm::Instruction;

use crate::block::BasicBlock;

/// The virtual register defined by this instruction, if any.
///
/// Only defining ops with a virtual destination count; physical
/// destinations are outside allocation's jurisdiction.
pub(crate) fn def_name(inst: &Instruction) -> Option<&str> {
    if !inst.op.is_def() {
        return None;
    }
    inst.operands
        .first()
        .and_then(|operand| operand.reg_ref())
        .and_then(|reg| reg.virt_name())
}

/// The virtual registers this instruction references (reads).
///
/// The destination operand of a defining instruction is excluded; memory
/// operand bases are included.
pub(crate) fn referenced_names(inst: &Instruction) -> Vec<String> {
    let skip_dest = inst.op.is_def();
    inst.operands
        .iter()
        .enumerate()
        .filter(|(j, _)| !(skip_dest && *j == 0))
        .filter_map(|(_, operand)| operand.reg_ref())
        .filter_map(|reg| reg.virt_name())
        .map(|name| name.to_string())
        .collect()
}

/// Variables referenced at `index` whose most recent definition lies
/// earlier in the block.
fn upward_exposed(asm: &[Instruction], index: usize) -> BTreeSet<String> {
    let mut vars = BTreeSet::new();
    if index == 0 {
        return vars;
    }
    let refs = referenced_names(&asm[index]);
    for inst in &asm[..index] {
        if let Some(defined) = def_name(inst) {
            if refs.iter().any(|name| name == defined) {
                vars.insert(defined.to_string());
            }
        }
    }
    vars
}

/// Compute per-instruction live-in/live-out sets by backward fixpoint.
///
/// The worklist is seeded with every instruction index; an index is
/// re-enqueued whenever its computed live-in changes.
fn compute_live_sets(block: &mut BasicBlock) {
    let n = block.asm.len();
    block.live_in = vec![BTreeSet::new(); n];
    block.live_out = vec![BTreeSet::new(); n];

    let mut worklist: VecDeque<usize> = (0..n).collect();
    while let Some(i) = worklist.pop_front() {
        let live_out = if i + 1 == n {
            BTreeSet::new()
        } else {
            block.live_in[i + 1].clone()
        };

        let mut live_in = live_out.clone();
        if let Some(defined) = def_name(&block.asm[i]) {
            live_in.remove(defined);
        }
        live_in.extend(upward_exposed(&block.asm, i));

        block.live_out[i] = live_out;
        if live_in != block.live_in[i] {
            block.live_in[i] = live_in;
            worklist.push_back(i);
        }
    }
}

/// Count, for every block-defined variable, the number of later
/// instructions in the block that reference it.
fn count_uses(block: &mut BasicBlock) {
    block.uses.clear();
    let n = block.asm.len();
    let mut counted: BTreeSet<String> = BTreeSet::new();

    for i in 0..n.saturating_sub(1) {
        let defined = match def_name(&block.asm[i]) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !counted.insert(defined.clone()) {
            continue;
        }
        for inst in &block.asm[i + 1..] {
            if referenced_names(inst).iter().any(|name| *name == defined) {
                *block.uses.entry(defined.clone()).or_insert(0) += 1;
            }
        }
    }
}

/// Analyze one block: live sets, then use counts.
pub fn analyze(block: &mut BasicBlock) {
    compute_live_sets(block);
    count_uses(block);
}
