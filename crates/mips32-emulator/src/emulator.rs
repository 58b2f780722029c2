//! Core MIPS32 emulator implementation.

use alloc::{
    collections::{BTreeMap, VecDeque},
    format,
    string::{String, ToString},
    vec::Vec,
};

use mips32_asm::{Instruction, Op, Operand, Reg, RegRef};

use crate::{error::EmulatorError, memory::Memory};

/// Initial stack pointer.
const STACK_TOP: u32 = 0x7fff_fffc;
/// Base of the sbrk heap.
const HEAP_BASE: u32 = 0x1000_0000;
/// Program counter value meaning "returned to the harness".
const RETURN_PC: usize = usize::MAX;

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Normal step completed, continue execution.
    Continue,
    /// The exit syscall was executed.
    Exited,
}

/// MIPS32 emulator over a structured instruction stream.
pub struct Mips32Emulator {
    program: Vec<Instruction>,
    labels: BTreeMap<String, usize>,
    regs: [i32; 32],
    memory: Memory,
    pc: usize,
    heap_next: u32,
    input: VecDeque<i32>,
    output: String,
    instruction_count: u64,
    max_instructions: u64,
}

impl Mips32Emulator {
    /// Create an emulator for a program; labels are resolved up front.
    pub fn new(program: Vec<Instruction>) -> Self {
        let mut labels = BTreeMap::new();
        for (i, inst) in program.iter().enumerate() {
            if let Some(name) = inst.label_name() {
                labels.insert(name.to_string(), i);
            }
        }
        let mut regs = [0i32; 32];
        regs[Reg::SP.num() as usize] = STACK_TOP as i32;
        Self {
            program,
            labels,
            regs,
            memory: Memory::new(),
            pc: 0,
            heap_next: HEAP_BASE,
            input: VecDeque::new(),
            output: String::new(),
            instruction_count: 0,
            max_instructions: 1_000_000,
        }
    }

    /// Script the input consumed by the read syscalls.
    pub fn with_input(mut self, input: &[i32]) -> Self {
        self.input = input.iter().copied().collect();
        self
    }

    /// Set the maximum number of instructions to execute.
    pub fn with_max_instructions(mut self, limit: u64) -> Self {
        self.max_instructions = limit;
        self
    }

    /// Read a register.
    pub fn register(&self, reg: Reg) -> i32 {
        self.regs[reg.num() as usize]
    }

    /// Write a register (writes to `$zero` are ignored).
    pub fn set_register(&mut self, reg: Reg, value: i32) {
        if reg != Reg::ZERO {
            self.regs[reg.num() as usize] = value;
        }
    }

    /// Everything the program printed so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Run from the start of the program until the exit syscall.
    pub fn run(&mut self) -> Result<(), EmulatorError> {
        self.pc = 0;
        loop {
            match self.step()? {
                StepResult::Continue => {}
                StepResult::Exited => return Ok(()),
            }
        }
    }

    /// Call one function: bind up to four arguments, run until it returns,
    /// and yield the return-value register.
    pub fn call(&mut self, label: &str, args: &[i32]) -> Result<i32, EmulatorError> {
        self.pc = self.label_index(label)?;
        for (i, arg) in args.iter().take(4).enumerate() {
            self.regs[Reg::A0.num() as usize + i] = *arg;
        }
        self.regs[Reg::RA.num() as usize] = -1;
        while self.pc != RETURN_PC {
            if let StepResult::Exited = self.step()? {
                break;
            }
        }
        Ok(self.register(Reg::V0))
    }

    /// Execute a single instruction.
    pub fn step(&mut self) -> Result<StepResult, EmulatorError> {
        if self.instruction_count >= self.max_instructions {
            return Err(EmulatorError::InstructionLimitExceeded {
                limit: self.max_instructions,
            });
        }
        self.instruction_count += 1;

        let inst = self
            .program
            .get(self.pc)
            .cloned()
            .ok_or(EmulatorError::PcOutOfRange { pc: self.pc })?;

        match inst.op {
            Op::Label | Op::Text => {
                self.pc += 1;
            }
            Op::Add | Op::Addi => self.binary(&inst, i32::wrapping_add)?,
            Op::Sub => self.binary(&inst, i32::wrapping_sub)?,
            Op::Mul => self.binary(&inst, i32::wrapping_mul)?,
            Op::Div => {
                let divisor = self.value(&inst.operands[2])?;
                if divisor == 0 {
                    return Err(EmulatorError::DivisionByZero { pc: self.pc });
                }
                self.binary(&inst, i32::wrapping_div)?;
            }
            Op::And | Op::Andi => self.binary(&inst, |a, b| a & b)?,
            Op::Or | Op::Ori => self.binary(&inst, |a, b| a | b)?,
            Op::Li | Op::Move => {
                let value = self.value(&inst.operands[1])?;
                let dest = self.reg_operand(&inst.operands[0])?;
                self.set_register(dest, value);
                self.pc += 1;
            }
            Op::Lw => {
                let address = self.address(&inst.operands[1])?;
                let value = self.memory.load_word(address)?;
                let dest = self.reg_operand(&inst.operands[0])?;
                self.set_register(dest, value);
                self.pc += 1;
            }
            Op::Sw => {
                let address = self.address(&inst.operands[1])?;
                let value = self.value(&inst.operands[0])?;
                self.memory.store_word(address, value)?;
                self.pc += 1;
            }
            Op::Beq => self.branch(&inst, |a, b| a == b)?,
            Op::Bne => self.branch(&inst, |a, b| a != b)?,
            Op::Bge => self.branch(&inst, |a, b| a >= b)?,
            Op::Bgt => self.branch(&inst, |a, b| a > b)?,
            Op::Ble => self.branch(&inst, |a, b| a <= b)?,
            Op::Blt => self.branch(&inst, |a, b| a < b)?,
            Op::Jal => {
                let target = self.branch_target(&inst.operands[0])?;
                self.regs[Reg::RA.num() as usize] = (self.pc + 1) as i32;
                self.pc = target;
            }
            Op::Jr => {
                let target = self.value(&inst.operands[0])?;
                self.pc = if target < 0 {
                    RETURN_PC
                } else {
                    target as usize
                };
            }
            Op::Syscall => return self.syscall(),
        }
        Ok(StepResult::Continue)
    }

    fn binary(
        &mut self,
        inst: &Instruction,
        apply: impl Fn(i32, i32) -> i32,
    ) -> Result<(), EmulatorError> {
        let a = self.value(&inst.operands[1])?;
        let b = self.value(&inst.operands[2])?;
        let dest = self.reg_operand(&inst.operands[0])?;
        self.set_register(dest, apply(a, b));
        self.pc += 1;
        Ok(())
    }

    fn branch(
        &mut self,
        inst: &Instruction,
        taken: impl Fn(i32, i32) -> bool,
    ) -> Result<(), EmulatorError> {
        let a = self.value(&inst.operands[0])?;
        let b = self.value(&inst.operands[1])?;
        if taken(a, b) {
            self.pc = self.branch_target(&inst.operands[2])?;
        } else {
            self.pc += 1;
        }
        Ok(())
    }

    fn syscall(&mut self) -> Result<StepResult, EmulatorError> {
        let number = self.register(Reg::V0);
        match number {
            // print int
            1 => {
                let value = self.register(Reg::A0);
                self.output.push_str(&format!("{}", value));
            }
            // read int -> $v0
            5 => {
                let value = self
                    .input
                    .pop_front()
                    .ok_or(EmulatorError::InputExhausted { pc: self.pc })?;
                self.set_register(Reg::V0, value);
            }
            // sbrk: $a0 bytes -> address in $v0
            9 => {
                let size = self.register(Reg::A0).max(0) as u32;
                self.set_register(Reg::V0, self.heap_next as i32);
                self.heap_next += (size + 3) & !3;
            }
            // exit
            10 => {
                self.pc += 1;
                return Ok(StepResult::Exited);
            }
            // print char
            11 => {
                let value = self.register(Reg::A0);
                self.output.push((value as u8) as char);
            }
            // read char -> $a0
            12 => {
                let value = self
                    .input
                    .pop_front()
                    .ok_or(EmulatorError::InputExhausted { pc: self.pc })?;
                self.set_register(Reg::A0, value);
            }
            _ => {
                return Err(EmulatorError::UnsupportedSyscall {
                    number,
                    pc: self.pc,
                })
            }
        }
        self.pc += 1;
        Ok(StepResult::Continue)
    }

    fn label_index(&self, label: &str) -> Result<usize, EmulatorError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| EmulatorError::UnknownLabel {
                label: label.to_string(),
            })
    }

    fn branch_target(&self, operand: &Operand) -> Result<usize, EmulatorError> {
        match operand {
            Operand::Label(name) => self.label_index(name),
            other => Err(EmulatorError::UnknownLabel {
                label: format!("{}", other),
            }),
        }
    }

    fn reg_operand(&self, operand: &Operand) -> Result<Reg, EmulatorError> {
        match operand {
            Operand::Reg(RegRef::Phys(reg)) => Ok(*reg),
            Operand::Reg(RegRef::Virt(name)) => Err(EmulatorError::UnallocatedRegister {
                name: name.clone(),
                pc: self.pc,
            }),
            other => Err(EmulatorError::UnknownLabel {
                label: format!("{}", other),
            }),
        }
    }

    fn value(&self, operand: &Operand) -> Result<i32, EmulatorError> {
        match operand {
            Operand::Reg(RegRef::Phys(reg)) => Ok(self.register(*reg)),
            Operand::Reg(RegRef::Virt(name)) => Err(EmulatorError::UnallocatedRegister {
                name: name.clone(),
                pc: self.pc,
            }),
            Operand::Imm(value) => Ok(*value),
            other => Err(EmulatorError::UnknownLabel {
                label: format!("{}", other),
            }),
        }
    }

    fn address(&self, operand: &Operand) -> Result<u32, EmulatorError> {
        match operand {
            Operand::Mem { base, offset } => {
                let base = match base {
                    RegRef::Phys(reg) => self.register(*reg),
                    RegRef::Virt(name) => {
                        return Err(EmulatorError::UnallocatedRegister {
                            name: name.clone(),
                            pc: self.pc,
                        })
                    }
                };
                Ok((base as u32).wrapping_add(*offset as u32))
            }
            other => Err(EmulatorError::UnknownLabel {
                label: format!("{}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use mips32_asm::{addi, jal, jr, label, li, lw, mov, section_text, sw, syscall, vreg,
        Instruction, Op, Operand, RegRef};

    use super::*;

    fn beq_zero(target: &str) -> Instruction {
        Instruction::new(
            Op::Beq,
            vec![
                Operand::Reg(RegRef::Phys(Reg::ZERO)),
                Operand::Reg(RegRef::Phys(Reg::ZERO)),
                Operand::Label(target.into()),
            ],
        )
    }

    #[test]
    fn test_arithmetic_and_exit() {
        let program = vec![
            section_text(),
            li(Reg::T0, 40),
            addi(Reg::T1, Reg::T0, 2),
            li(Reg::V0, 10),
            syscall(),
        ];
        let mut emu = Mips32Emulator::new(program);
        emu.run().expect("program should run");
        assert_eq!(emu.register(Reg::T1), 42);
    }

    #[test]
    fn test_branch_always_and_labels() {
        let program = vec![
            beq_zero("skip"),
            li(Reg::T0, 1), // skipped
            label("skip"),
            li(Reg::T1, 2),
            li(Reg::V0, 10),
            syscall(),
        ];
        let mut emu = Mips32Emulator::new(program);
        emu.run().expect("program should run");
        assert_eq!(emu.register(Reg::T0), 0);
        assert_eq!(emu.register(Reg::T1), 2);
    }

    #[test]
    fn test_stack_store_load() {
        let program = vec![
            addi(Reg::SP, Reg::SP, -4),
            li(Reg::T0, 7),
            sw(Reg::T0, Reg::SP, 0),
            lw(Reg::T1, Reg::SP, 0),
            addi(Reg::SP, Reg::SP, 4),
            li(Reg::V0, 10),
            syscall(),
        ];
        let mut emu = Mips32Emulator::new(program);
        emu.run().expect("program should run");
        assert_eq!(emu.register(Reg::T1), 7);
    }

    #[test]
    fn test_jal_jr_round_trip() {
        let program = vec![
            beq_zero("main"),
            label("double"),
            Instruction::new(
                Op::Add,
                vec![
                    Operand::Reg(RegRef::Phys(Reg::V0)),
                    Operand::Reg(RegRef::Phys(Reg::A0)),
                    Operand::Reg(RegRef::Phys(Reg::A0)),
                ],
            ),
            jr(Reg::RA),
            label("main"),
            li(Reg::A0, 21),
            jal("double"),
            mov(Reg::T0, Reg::V0),
            li(Reg::V0, 10),
            syscall(),
        ];
        let mut emu = Mips32Emulator::new(program);
        emu.run().expect("program should run");
        assert_eq!(emu.register(Reg::T0), 42);
    }

    #[test]
    fn test_call_harness() {
        let program = vec![
            label("double"),
            Instruction::new(
                Op::Add,
                vec![
                    Operand::Reg(RegRef::Phys(Reg::V0)),
                    Operand::Reg(RegRef::Phys(Reg::A0)),
                    Operand::Reg(RegRef::Phys(Reg::A0)),
                ],
            ),
            jr(Reg::RA),
        ];
        let mut emu = Mips32Emulator::new(program);
        let result = emu.call("double", &[21]).expect("call should run");
        assert_eq!(result, 42);
    }

    #[test]
    fn test_io_syscalls() {
        let program = vec![
            li(Reg::V0, 5), // read int
            syscall(),
            mov(Reg::A0, Reg::V0),
            li(Reg::V0, 1), // print int
            syscall(),
            li(Reg::V0, 11), // print char
            li(Reg::A0, 10),
            syscall(),
            li(Reg::V0, 12), // read char -> $a0
            syscall(),
            li(Reg::V0, 1),
            syscall(),
            li(Reg::V0, 10),
            syscall(),
        ];
        let mut emu = Mips32Emulator::new(program).with_input(&[42, 65]);
        emu.run().expect("program should run");
        assert_eq!(emu.output(), "42\n65");
    }

    #[test]
    fn test_sbrk_allocates_distinct_regions() {
        let program = vec![
            li(Reg::V0, 9),
            li(Reg::A0, 8),
            syscall(),
            mov(Reg::T0, Reg::V0),
            li(Reg::V0, 9),
            li(Reg::A0, 4),
            syscall(),
            mov(Reg::T1, Reg::V0),
            sw(Reg::T1, Reg::T0, 0),
            li(Reg::V0, 10),
            syscall(),
        ];
        let mut emu = Mips32Emulator::new(program);
        emu.run().expect("program should run");
        assert_eq!(emu.register(Reg::T1) - emu.register(Reg::T0), 8);
    }

    #[test]
    fn test_virtual_register_rejected() {
        let program = vec![li(vreg("x"), 1)];
        let mut emu = Mips32Emulator::new(program);
        let err = emu.run().unwrap_err();
        assert!(matches!(err, EmulatorError::UnallocatedRegister { .. }));
    }

    #[test]
    fn test_zero_register_is_immutable() {
        let program = vec![li(Reg::ZERO, 5), li(Reg::V0, 10), syscall()];
        let mut emu = Mips32Emulator::new(program);
        emu.run().expect("program should run");
        assert_eq!(emu.register(Reg::ZERO), 0);
    }

    #[test]
    fn test_division_by_zero() {
        let program = vec![
            li(Reg::T0, 1),
            Instruction::new(
                Op::Div,
                vec![
                    Operand::Reg(RegRef::Phys(Reg::T1)),
                    Operand::Reg(RegRef::Phys(Reg::T0)),
                    Operand::Imm(0),
                ],
            ),
        ];
        let mut emu = Mips32Emulator::new(program);
        assert!(matches!(
            emu.run(),
            Err(EmulatorError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_instruction_limit() {
        let program = vec![label("spin"), beq_zero("spin")];
        let mut emu = Mips32Emulator::new(program).with_max_instructions(100);
        assert!(matches!(
            emu.run(),
            Err(EmulatorError::InstructionLimitExceeded { .. })
        ));
    }
}
