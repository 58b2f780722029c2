//! Error types for the MIPS32 emulator.

use alloc::string::String;
use core::fmt;

/// Errors that can occur during emulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmulatorError {
    /// A branch or call targeted a label the program never defines.
    UnknownLabel { label: String },
    /// A virtual register operand survived register allocation.
    UnallocatedRegister { name: String, pc: usize },
    /// A word access at a non-word-aligned address.
    UnalignedAccess { address: u32 },
    /// Integer division by zero.
    DivisionByZero { pc: usize },
    /// The instruction budget ran out (likely an endless loop).
    InstructionLimitExceeded { limit: u64 },
    /// A read syscall with no scripted input left.
    InputExhausted { pc: usize },
    /// A syscall number outside the modeled machine.
    UnsupportedSyscall { number: i32, pc: usize },
    /// Execution ran past the end of the program without exiting.
    PcOutOfRange { pc: usize },
}

impl fmt::Display for EmulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmulatorError::UnknownLabel { label } => write!(f, "unknown label: {}", label),
            EmulatorError::UnallocatedRegister { name, pc } => {
                write!(f, "unallocated virtual register ${} at pc {}", name, pc)
            }
            EmulatorError::UnalignedAccess { address } => {
                write!(f, "unaligned word access at {:#x}", address)
            }
            EmulatorError::DivisionByZero { pc } => write!(f, "division by zero at pc {}", pc),
            EmulatorError::InstructionLimitExceeded { limit } => {
                write!(f, "instruction limit of {} exceeded", limit)
            }
            EmulatorError::InputExhausted { pc } => {
                write!(f, "read syscall with no input left at pc {}", pc)
            }
            EmulatorError::UnsupportedSyscall { number, pc } => {
                write!(f, "unsupported syscall {} at pc {}", number, pc)
            }
            EmulatorError::PcOutOfRange { pc } => {
                write!(f, "execution ran past the program end (pc {})", pc)
            }
        }
    }
}

impl core::error::Error for EmulatorError {}
