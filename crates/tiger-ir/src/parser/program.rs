//! Program parser.

use nom::{multi::many1, sequence::terminated, IResult};

use super::{function::parse_function_internal, primitives::blank};
use crate::program::Program;

/// Parse a program: one or more functions.
pub(crate) fn parse_program_internal(input: &str) -> IResult<&str, Program> {
    let (input, _) = blank(input)?;
    let (input, functions) = many1(terminated(parse_function_internal, blank))(input)?;
    Ok((input, Program { functions }))
}
