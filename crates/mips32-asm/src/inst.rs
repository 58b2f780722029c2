//! Structured MIPS32 instructions.

use alloc::{string::String, vec, vec::Vec};
use core::fmt;

use crate::regs::Reg;

/// Instruction mnemonics understood by the back end.
///
/// `Label` and `Text` are pseudo-instructions: a label definition line and
/// the `.text` section marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Op {
    // Arithmetic / bitwise
    Add,
    Addi,
    Sub,
    Mul,
    Div,
    And,
    Andi,
    Or,
    Ori,
    // Data movement
    Li,
    Lw,
    Sw,
    Move,
    // Conditional branches
    Beq,
    Bge,
    Bgt,
    Ble,
    Blt,
    Bne,
    // Jumps
    Jal,
    Jr,
    // System call
    Syscall,
    // Pseudo
    Label,
    Text,
}

impl Op {
    /// The assembly mnemonic for this op.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Addi => "addi",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::And => "and",
            Op::Andi => "andi",
            Op::Or => "or",
            Op::Ori => "ori",
            Op::Li => "li",
            Op::Lw => "lw",
            Op::Sw => "sw",
            Op::Move => "move",
            Op::Beq => "beq",
            Op::Bge => "bge",
            Op::Bgt => "bgt",
            Op::Ble => "ble",
            Op::Blt => "blt",
            Op::Bne => "bne",
            Op::Jal => "jal",
            Op::Jr => "jr",
            Op::Syscall => "syscall",
            Op::Label => "label",
            Op::Text => ".text",
        }
    }

    /// Whether this op defines its first operand (the destination).
    ///
    /// The defining set matches the allocators' rewrite rules: arithmetic,
    /// immediate arithmetic, load, load-immediate, and register move.
    pub fn is_def(self) -> bool {
        matches!(
            self,
            Op::Add
                | Op::Addi
                | Op::Sub
                | Op::Mul
                | Op::Div
                | Op::And
                | Op::Andi
                | Op::Or
                | Op::Ori
                | Op::Li
                | Op::Lw
                | Op::Move
        )
    }

    /// Whether this op is a conditional branch.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Op::Beq | Op::Bge | Op::Bgt | Op::Ble | Op::Blt | Op::Bne
        )
    }

    /// Whether this op is a jump (`jal` or `jr`).
    pub fn is_jump(self) -> bool {
        matches!(self, Op::Jal | Op::Jr)
    }
}

/// A register reference: either a physical machine register or a named
/// virtual register that register allocation will replace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RegRef {
    Phys(Reg),
    Virt(String),
}

impl RegRef {
    /// The virtual register name, if this is a virtual reference.
    pub fn virt_name(&self) -> Option<&str> {
        match self {
            RegRef::Phys(_) => None,
            RegRef::Virt(name) => Some(name),
        }
    }

    /// Whether this is a virtual (pre-allocation) reference.
    pub fn is_virt(&self) -> bool {
        matches!(self, RegRef::Virt(_))
    }
}

impl From<Reg> for RegRef {
    fn from(reg: Reg) -> Self {
        RegRef::Phys(reg)
    }
}

/// Shorthand for a virtual register reference.
pub fn vreg(name: &str) -> RegRef {
    RegRef::Virt(String::from(name))
}

impl fmt::Display for RegRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegRef::Phys(reg) => write!(f, "{}", reg),
            RegRef::Virt(name) => write!(f, "${}", name),
        }
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operand {
    /// A register (physical or virtual).
    Reg(RegRef),
    /// An immediate integer.
    Imm(i32),
    /// A label reference.
    Label(String),
    /// A memory reference: base register plus byte offset.
    Mem { base: RegRef, offset: i32 },
}

impl Operand {
    /// The register reference carried by this operand, if any.
    ///
    /// For memory operands this is the base register.
    pub fn reg_ref(&self) -> Option<&RegRef> {
        match self {
            Operand::Reg(r) => Some(r),
            Operand::Mem { base, .. } => Some(base),
            _ => None,
        }
    }

    /// Mutable access to the register reference, if any.
    pub fn reg_ref_mut(&mut self) -> Option<&mut RegRef> {
        match self {
            Operand::Reg(r) => Some(r),
            Operand::Mem { base, .. } => Some(base),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Reg(r) => write!(f, "{}", r),
            Operand::Imm(value) => write!(f, "{}", value),
            Operand::Label(name) => write!(f, "{}", name),
            Operand::Mem { base, offset } => write!(f, "{}({})", offset, base),
        }
    }
}

/// A single target instruction: a mnemonic plus an ordered operand list.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instruction {
    pub op: Op,
    pub operands: Vec<Operand>,
}

impl Instruction {
    /// Create an instruction from an op and operand list.
    pub fn new(op: Op, operands: Vec<Operand>) -> Self {
        Self { op, operands }
    }

    /// The label name, if this is a label definition.
    pub fn label_name(&self) -> Option<&str> {
        if self.op != Op::Label {
            return None;
        }
        match self.operands.first() {
            Some(Operand::Label(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Op::Label => write!(f, "{}:", self.operands[0]),
            Op::Text => write!(f, ".text"),
            Op::Syscall => write!(f, "syscall"),
            _ => {
                write!(f, "{}", self.op.mnemonic())?;
                for (i, operand) in self.operands.iter().enumerate() {
                    if i == 0 {
                        write!(f, " {}", operand)?;
                    } else {
                        write!(f, ", {}", operand)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// `li rd, imm`
pub fn li(rd: impl Into<RegRef>, imm: i32) -> Instruction {
    Instruction::new(Op::Li, vec![Operand::Reg(rd.into()), Operand::Imm(imm)])
}

/// `lw rd, offset(base)`
pub fn lw(rd: impl Into<RegRef>, base: impl Into<RegRef>, offset: i32) -> Instruction {
    Instruction::new(
        Op::Lw,
        vec![
            Operand::Reg(rd.into()),
            Operand::Mem {
                base: base.into(),
                offset,
            },
        ],
    )
}

/// `sw rs, offset(base)`
pub fn sw(rs: impl Into<RegRef>, base: impl Into<RegRef>, offset: i32) -> Instruction {
    Instruction::new(
        Op::Sw,
        vec![
            Operand::Reg(rs.into()),
            Operand::Mem {
                base: base.into(),
                offset,
            },
        ],
    )
}

/// `move rd, rs`
pub fn mov(rd: impl Into<RegRef>, rs: impl Into<RegRef>) -> Instruction {
    Instruction::new(
        Op::Move,
        vec![Operand::Reg(rd.into()), Operand::Reg(rs.into())],
    )
}

/// `addi rd, rs, imm`
pub fn addi(rd: impl Into<RegRef>, rs: impl Into<RegRef>, imm: i32) -> Instruction {
    Instruction::new(
        Op::Addi,
        vec![
            Operand::Reg(rd.into()),
            Operand::Reg(rs.into()),
            Operand::Imm(imm),
        ],
    )
}

/// `jal target`
pub fn jal(target: &str) -> Instruction {
    Instruction::new(Op::Jal, vec![Operand::Label(String::from(target))])
}

/// `jr rs`
pub fn jr(rs: Reg) -> Instruction {
    Instruction::new(Op::Jr, vec![Operand::Reg(RegRef::Phys(rs))])
}

/// `syscall`
pub fn syscall() -> Instruction {
    Instruction::new(Op::Syscall, Vec::new())
}

/// A label definition: `name:`
pub fn label(name: &str) -> Instruction {
    Instruction::new(Op::Label, vec![Operand::Label(String::from(name))])
}

/// The `.text` section marker.
pub fn section_text() -> Instruction {
    Instruction::new(Op::Text, Vec::new())
}
