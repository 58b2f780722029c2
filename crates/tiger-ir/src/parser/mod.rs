//! Parser for the Tiger IR text format.

mod error;
mod function;
mod primitives;
mod program;

use error::parse_error;
pub use error::ParseError;
use function::parse_function_internal;
use program::parse_program_internal;

use crate::{function::Function, program::Program};

/// Parse a complete program from IR text.
pub fn parse_program(input: &str) -> Result<Program, ParseError> {
    let trimmed = input.trim();
    match parse_program_internal(trimmed) {
        Ok(("", program)) => Ok(program),
        Ok((remaining, program)) => {
            if remaining.trim().is_empty() {
                Ok(program)
            } else {
                Err(parse_error(
                    trimmed,
                    remaining,
                    &alloc::format!("Unexpected input remaining: {}", remaining),
                ))
            }
        }
        Err(e) => Err(parse_error(
            trimmed,
            trimmed,
            &alloc::format!("Parse error: {:?}", e),
        )),
    }
}

/// Parse a single function from IR text.
pub fn parse_function(input: &str) -> Result<Function, ParseError> {
    let trimmed = input.trim();
    match parse_function_internal(trimmed) {
        Ok(("", func)) => Ok(func),
        Ok((remaining, func)) => {
            if remaining.trim().is_empty() {
                Ok(func)
            } else {
                Err(parse_error(
                    trimmed,
                    remaining,
                    &alloc::format!("Unexpected input remaining: {}", remaining),
                ))
            }
        }
        Err(e) => Err(parse_error(
            trimmed,
            trimmed,
            &alloc::format!("Parse error: {:?}", e),
        )),
    }
}
