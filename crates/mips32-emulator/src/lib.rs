//! MIPS32 emulator for testing and debugging generated code.
//!
//! This crate interprets the structured instruction stream produced by the
//! back end: registers, word-addressed memory, label resolution, and the
//! syscall set of the modeled machine (print/read int and char, sbrk,
//! exit). Input is scripted, output is captured, and any virtual register
//! operand that survived allocation is rejected.

#![no_std]

extern crate alloc;

mod emulator;
mod error;
mod memory;

pub use emulator::{Mips32Emulator, StepResult};
pub use error::EmulatorError;
