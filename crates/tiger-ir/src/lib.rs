//! Tiger IR: a linear three-address intermediate representation.
//!
//! This crate provides:
//! - The in-memory program model (`Program`, `Function`, `Inst`, `Operand`)
//! - A parser for the Tiger IR text format (`parse_program`, `parse_function`)
//!
//! A program is an ordered list of functions. A function has a name, an
//! optional return marker, ordered formal parameters, ordered local
//! variables (array-typed locals carry a static element count), and an
//! ordered list of instructions, each an opcode plus a fixed-arity operand
//! list.

#![no_std]

extern crate alloc;

mod function;
mod inst;
mod parser;
mod program;

pub use function::{Function, Variable};
pub use inst::{Inst, Opcode, Operand};
pub use parser::{parse_function, parse_program, ParseError};
pub use program::Program;
