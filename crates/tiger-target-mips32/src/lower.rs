//! Instruction selection: Tiger IR to MIPS32.
//!
//! The lowerer walks each function once, partitions it into basic blocks,
//! and expands every IR instruction into target instructions, implementing
//! the calling convention, array addressing, and intrinsic I/O lowering.
//! It produces the full instruction stream, a map from block-leader
//! identity to the block it starts, and one (empty) offset map per function
//! for the allocator to fill.

use alloc::{
    collections::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};

use mips32_asm::{
    addi, jal, jr, label, li, lw, mov, section_text, sw, syscall, vreg, Instruction, Op, Operand,
    Reg, RegRef,
};
use tiger_ir::{Function, Inst, Opcode, Program};

use crate::{
    abi::{syscalls, Abi, Intrinsic},
    block::{partition, BasicBlock},
    frame::FrameMaps,
};

/// Identity of a basic block in the generated stream: the block's first
/// generated instruction paired with its absolute stream position.
///
/// The pairing is required because instruction text alone is not unique
/// (many blocks start with the same load-immediate); within one run no two
/// blocks share both components.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct LeaderKey {
    pub inst: Instruction,
    pub index: usize,
}

/// The selector's output: the instruction stream plus the tables the
/// allocator borrows for its single pass.
#[derive(Debug, Default)]
pub struct Lowering {
    /// The full generated instruction stream.
    pub instructions: Vec<Instruction>,
    /// Leader identity -> the basic block it starts.
    pub blocks: BTreeMap<LeaderKey, BasicBlock>,
    /// Per-function offset maps (empty until allocation).
    pub frames: FrameMaps,
}

/// Lower a whole program.
///
/// The stream begins with the `.text` section marker and an unconditional
/// branch to the entry function.
pub fn lower_program(program: &Program) -> Lowering {
    let mut lowerer = Lowerer::new();
    lowerer.out.instructions.push(section_text());
    lowerer.out.instructions.push(Instruction::new(
        Op::Beq,
        vec![
            Operand::Reg(RegRef::Phys(Reg::ZERO)),
            Operand::Reg(RegRef::Phys(Reg::ZERO)),
            Operand::Label(String::from(Abi::ENTRY_FUNCTION)),
        ],
    ));
    for func in &program.functions {
        lowerer.lower_function(func);
    }
    lowerer.out
}

struct Lowerer {
    out: Lowering,
}

impl Lowerer {
    fn new() -> Self {
        Self {
            out: Lowering::default(),
        }
    }

    fn lower_function(&mut self, func: &Function) {
        self.out.frames.insert_function(&func.name);

        let mut blocks = partition(func);
        if blocks.is_empty() {
            // A function with no instructions still gets a label, a
            // prologue, and an epilogue.
            blocks.push(BasicBlock::new(Vec::new()));
        }

        let block_count = blocks.len();
        for (bi, block) in blocks.iter_mut().enumerate() {
            let ir = block.ir.clone();
            if bi == 0 {
                block.asm.push(label(&func.name));
                self.emit_prologue(func, &mut block.asm);
            }
            for inst in &ir {
                self.lower_inst(func, inst, &mut block.asm);
            }
            if bi + 1 == block_count {
                self.emit_epilogue(func, &mut block.asm);
            }
        }

        for block in blocks {
            if block.asm.is_empty() {
                continue;
            }
            let key = LeaderKey {
                inst: block.asm[0].clone(),
                index: self.out.instructions.len(),
            };
            self.out.instructions.extend(block.asm.iter().cloned());
            self.out.blocks.insert(key, block);
        }
    }

    /// Bind parameters, then zero-initialize the remaining locals.
    ///
    /// Array locals are heap-allocated via the sbrk syscall and zero-filled
    /// element by element, so every local is defined before its first use.
    fn emit_prologue(&mut self, func: &Function, out: &mut Vec<Instruction>) {
        let argc = func.params.len();
        for (i, param) in func.params.iter().enumerate() {
            match Abi::arg_reg(i) {
                Some(reg) => out.push(mov(vreg(param), reg)),
                None => out.push(lw(vreg(param), Reg::SP, Abi::stack_arg_offset(i, argc))),
            }
        }
        for var in &func.vars {
            if func.is_param(&var.name) {
                continue;
            }
            match var.elems {
                None => out.push(li(vreg(&var.name), 0)),
                Some(elems) => {
                    out.push(li(Reg::V0, syscalls::SBRK));
                    out.push(li(Reg::A0, (elems * 4) as i32));
                    out.push(syscall());
                    out.push(mov(vreg(&var.name), Reg::V0));
                    for e in 0..elems {
                        out.push(sw(Reg::ZERO, vreg(&var.name), (e * 4) as i32));
                    }
                }
            }
        }
    }

    /// The entry function exits the program; any other function without a
    /// return marker falls off its end with an implicit return jump.
    fn emit_epilogue(&mut self, func: &Function, out: &mut Vec<Instruction>) {
        if func.name == Abi::ENTRY_FUNCTION {
            out.push(li(Reg::V0, syscalls::EXIT));
            out.push(syscall());
        } else if !func.returns_value {
            out.push(jr(Reg::RA));
        }
    }

    fn lower_inst(&mut self, func: &Function, inst: &Inst, out: &mut Vec<Instruction>) {
        match inst.opcode {
            Opcode::Add => self.lower_binary(inst, Op::Add, Some(Op::Addi), out),
            Opcode::Sub => self.lower_binary(inst, Op::Sub, None, out),
            Opcode::Mult => self.lower_binary(inst, Op::Mul, None, out),
            Opcode::Div => self.lower_binary(inst, Op::Div, None, out),
            Opcode::And => self.lower_binary(inst, Op::And, Some(Op::Andi), out),
            Opcode::Or => self.lower_binary(inst, Op::Or, Some(Op::Ori), out),
            Opcode::Breq => self.lower_branch(func, inst, Op::Beq, out),
            Opcode::Brgeq => self.lower_branch(func, inst, Op::Bge, out),
            Opcode::Brgt => self.lower_branch(func, inst, Op::Bgt, out),
            Opcode::Brleq => self.lower_branch(func, inst, Op::Ble, out),
            Opcode::Brlt => self.lower_branch(func, inst, Op::Blt, out),
            Opcode::Brneq => self.lower_branch(func, inst, Op::Bne, out),
            Opcode::Assign => self.lower_assign(inst, out),
            Opcode::Goto => {
                let target = qualified_label(func, &inst.operands[0]);
                out.push(branch_always(&target));
            }
            Opcode::Return => {
                match &inst.operands[0] {
                    tiger_ir::Operand::Int(value) => out.push(li(Reg::V0, *value)),
                    operand => out.push(mov(Reg::V0, operand_reg(operand))),
                }
                out.push(jr(Reg::RA));
            }
            Opcode::Call => self.lower_call(func, inst, None, out),
            Opcode::Callr => {
                let dest = inst.operands[0].clone();
                self.lower_call(func, inst, Some(dest), out);
            }
            Opcode::ArrayLoad => self.lower_array_load(inst, out),
            Opcode::ArrayStore => self.lower_array_store(inst, out),
            Opcode::Label => {
                let target = qualified_label(func, &inst.operands[0]);
                out.push(label(&target));
            }
        }
    }

    /// Arithmetic/bitwise binary ops with immediate-operand folding.
    ///
    /// A right immediate is emitted in place (immediate-form opcode for the
    /// commutative ops); a left immediate either swaps into the
    /// immediate-form (commutative) or is materialized into scratch first.
    fn lower_binary(&mut self, inst: &Inst, op: Op, imm_op: Option<Op>, out: &mut Vec<Instruction>) {
        let dst = Operand::Reg(operand_reg(&inst.operands[0]));
        let lhs = &inst.operands[1];
        let rhs = &inst.operands[2];
        match (lhs, rhs) {
            (tiger_ir::Operand::Int(l), tiger_ir::Operand::Int(r)) => {
                let s1 = Abi::scratch_for(1, &[]);
                let s2 = Abi::scratch_for(2, &[s1]);
                out.push(li(s1, *l));
                out.push(li(s2, *r));
                out.push(Instruction::new(
                    op,
                    vec![dst, Operand::Reg(s1.into()), Operand::Reg(s2.into())],
                ));
            }
            (tiger_ir::Operand::Int(l), rhs) => match imm_op {
                Some(imm_op) => out.push(Instruction::new(
                    imm_op,
                    vec![dst, Operand::Reg(operand_reg(rhs)), Operand::Imm(*l)],
                )),
                None => {
                    let scratch = Abi::scratch_for(1, &[]);
                    out.push(li(scratch, *l));
                    out.push(Instruction::new(
                        op,
                        vec![
                            dst,
                            Operand::Reg(scratch.into()),
                            Operand::Reg(operand_reg(rhs)),
                        ],
                    ));
                }
            },
            (lhs, tiger_ir::Operand::Int(r)) => {
                let chosen = imm_op.unwrap_or(op);
                out.push(Instruction::new(
                    chosen,
                    vec![dst, Operand::Reg(operand_reg(lhs)), Operand::Imm(*r)],
                ));
            }
            (lhs, rhs) => out.push(Instruction::new(
                op,
                vec![
                    dst,
                    Operand::Reg(operand_reg(lhs)),
                    Operand::Reg(operand_reg(rhs)),
                ],
            )),
        }
    }

    /// Conditional branches: immediates are materialized into
    /// position-matched scratch, then one branch to the qualified label.
    fn lower_branch(&mut self, func: &Function, inst: &Inst, op: Op, out: &mut Vec<Instruction>) {
        let target = qualified_label(func, &inst.operands[0]);
        let mut taken: Vec<Reg> = Vec::new();
        let mut sources: Vec<Operand> = Vec::new();
        for (pos, operand) in inst.operands[1..=2].iter().enumerate() {
            match operand {
                tiger_ir::Operand::Int(value) => {
                    let scratch = Abi::scratch_for(pos, &taken);
                    taken.push(scratch);
                    out.push(li(scratch, *value));
                    sources.push(Operand::Reg(scratch.into()));
                }
                operand => sources.push(Operand::Reg(operand_reg(operand))),
            }
        }
        out.push(Instruction::new(
            op,
            vec![
                sources[0].clone(),
                sources[1].clone(),
                Operand::Label(target),
            ],
        ));
    }

    /// Scalar assignment, or the 3-operand array-initialization form
    /// `(array, count, value)`.
    fn lower_assign(&mut self, inst: &Inst, out: &mut Vec<Instruction>) {
        if inst.operands.len() == 3 {
            let array = operand_reg(&inst.operands[0]);
            let count = inst.operands[1]
                .int_value()
                .expect("array assign count must be a literal");
            match &inst.operands[2] {
                tiger_ir::Operand::Int(value) => {
                    let scratch = Abi::scratch_for(0, &[]);
                    out.push(li(scratch, *value));
                    for e in 0..count {
                        out.push(sw(scratch, array.clone(), e * 4));
                    }
                }
                value => {
                    let value = operand_reg(value);
                    for e in 0..count {
                        out.push(sw(value.clone(), array.clone(), e * 4));
                    }
                }
            }
            return;
        }

        let dst = operand_reg(&inst.operands[0]);
        match &inst.operands[1] {
            tiger_ir::Operand::Int(value) => out.push(li(dst, *value)),
            src => out.push(mov(dst, operand_reg(src))),
        }
    }

    /// Intrinsic calls lower to a syscall sequence; everything else gets
    /// the general calling convention.
    fn lower_call(
        &mut self,
        func: &Function,
        inst: &Inst,
        dest: Option<tiger_ir::Operand>,
        out: &mut Vec<Instruction>,
    ) {
        let callee = inst.callee().expect("call without a callee").to_string();
        let args: Vec<tiger_ir::Operand> = match inst.opcode {
            Opcode::Call => inst.operands[1..].to_vec(),
            _ => inst.operands[2..].to_vec(),
        };

        if let Some(intrinsic) = Intrinsic::from_name(&callee) {
            out.push(li(Reg::V0, intrinsic.syscall_number()));
            if intrinsic.takes_argument() {
                match &args[0] {
                    tiger_ir::Operand::Int(value) => out.push(li(Reg::A0, *value)),
                    arg => out.push(mov(Reg::A0, operand_reg(arg))),
                }
            }
            out.push(syscall());
            if let (Some(dest), Some(result)) = (dest, intrinsic.result_reg()) {
                out.push(mov(operand_reg(&dest), result));
            }
            return;
        }

        // Register arguments.
        for (i, arg) in args.iter().take(4).enumerate() {
            let reg = Abi::arg_reg(i).expect("argument register");
            match arg {
                tiger_ir::Operand::Int(value) => out.push(li(reg, *value)),
                arg => out.push(mov(reg, operand_reg(arg))),
            }
        }

        // Save every local of the current function to fresh stack slots.
        let locals = func.vars.len() as i32;
        if locals > 0 {
            out.push(addi(Reg::SP, Reg::SP, -4 * locals));
            for (j, var) in func.vars.iter().enumerate() {
                out.push(sw(vreg(&var.name), Reg::SP, (j * 4) as i32));
            }
        }

        // Save the return address.
        out.push(addi(Reg::SP, Reg::SP, -4));
        out.push(sw(Reg::RA, Reg::SP, 0));

        // Stack arguments: highest argument index at the lowest offset,
        // adjacent to the call so the callee addresses them directly.
        let argc = args.len();
        if argc > 4 {
            out.push(addi(Reg::SP, Reg::SP, -4 * (argc as i32 - 4)));
            for (i, arg) in args.iter().enumerate().skip(4) {
                let offset = Abi::stack_arg_offset(i, argc);
                match arg {
                    tiger_ir::Operand::Int(value) => {
                        let scratch = Abi::scratch_for(0, &[]);
                        out.push(li(scratch, *value));
                        out.push(sw(scratch, Reg::SP, offset));
                    }
                    arg => out.push(sw(operand_reg(arg), Reg::SP, offset)),
                }
            }
        }

        out.push(jal(&callee));

        if argc > 4 {
            out.push(addi(Reg::SP, Reg::SP, 4 * (argc as i32 - 4)));
        }

        // Restore the return address.
        out.push(lw(Reg::RA, Reg::SP, 0));
        out.push(addi(Reg::SP, Reg::SP, 4));

        // Restore the saved locals and drop the temporary frame.
        if locals > 0 {
            for (j, var) in func.vars.iter().enumerate() {
                out.push(lw(vreg(&var.name), Reg::SP, (j * 4) as i32));
            }
            out.push(addi(Reg::SP, Reg::SP, 4 * locals));
        }

        if let Some(dest) = dest {
            out.push(mov(operand_reg(&dest), Reg::V0));
        }
    }

    /// Array loads: a constant index folds into the access offset; a
    /// register index scales into scratch and accesses offset 0.
    fn lower_array_load(&mut self, inst: &Inst, out: &mut Vec<Instruction>) {
        let dst = operand_reg(&inst.operands[0]);
        let array = operand_reg(&inst.operands[1]);
        match &inst.operands[2] {
            tiger_ir::Operand::Int(index) => out.push(lw(dst, array, index * 4)),
            index => {
                let addr = emit_index_address(&array, index, out);
                out.push(lw(dst, addr, 0));
            }
        }
    }

    /// Array stores: as loads, plus immediate values materialize into
    /// scratch first.
    fn lower_array_store(&mut self, inst: &Inst, out: &mut Vec<Instruction>) {
        let array = operand_reg(&inst.operands[1]);
        match &inst.operands[2] {
            tiger_ir::Operand::Int(index) => match &inst.operands[0] {
                tiger_ir::Operand::Int(value) => {
                    let scratch = Abi::scratch_for(0, &[]);
                    out.push(li(scratch, *value));
                    out.push(sw(scratch, array, index * 4));
                }
                value => out.push(sw(operand_reg(value), array, index * 4)),
            },
            index => {
                let addr = emit_index_address(&array, index, out);
                match &inst.operands[0] {
                    tiger_ir::Operand::Int(value) => {
                        let scratch = Abi::scratch_for(0, &[Reg::T9]);
                        out.push(li(scratch, *value));
                        out.push(sw(scratch, addr, 0));
                    }
                    value => out.push(sw(operand_reg(value), addr, 0)),
                }
            }
        }
    }
}

/// Compute `base + index*4` into scratch for a register index.
fn emit_index_address(
    array: &RegRef,
    index: &tiger_ir::Operand,
    out: &mut Vec<Instruction>,
) -> Reg {
    let addr = Reg::T9;
    out.push(Instruction::new(
        Op::Mul,
        vec![
            Operand::Reg(addr.into()),
            Operand::Reg(operand_reg(index)),
            Operand::Imm(4),
        ],
    ));
    out.push(Instruction::new(
        Op::Add,
        vec![
            Operand::Reg(addr.into()),
            Operand::Reg(array.clone()),
            Operand::Reg(addr.into()),
        ],
    ));
    addr
}

/// A variable operand as a (virtual) register reference.
fn operand_reg(operand: &tiger_ir::Operand) -> RegRef {
    match operand {
        tiger_ir::Operand::Var(name) => vreg(name),
        other => panic!("operand {} is not a register-like operand", other),
    }
}

/// Labels are namespaced per function to avoid cross-function collisions.
fn qualified_label(func: &Function, operand: &tiger_ir::Operand) -> String {
    match operand {
        tiger_ir::Operand::Label(name) => format!("{}_{}", func.name, name),
        other => panic!("operand {} is not a label", other),
    }
}

/// Branch-always: compare the zero register to itself.
fn branch_always(target: &str) -> Instruction {
    Instruction::new(
        Op::Beq,
        vec![
            Operand::Reg(RegRef::Phys(Reg::ZERO)),
            Operand::Reg(RegRef::Phys(Reg::ZERO)),
            Operand::Label(String::from(target)),
        ],
    )
}
