//! Function, signature, and instruction parsers.

use alloc::{string::String, vec, vec::Vec};

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, space0, space1},
    combinator::map,
    multi::{many0, separated_list0},
    sequence::{delimited, preceded, terminated, tuple},
    IResult,
};

use super::primitives::{blank, element_count, identifier, raw_operand};
use crate::{
    function::{Function, Variable},
    inst::{Inst, Opcode, Operand},
};

/// Parse a function signature line: `int name(int a, int b):`
///
/// Returns (returns_value, name, params).
pub(crate) fn parse_signature(input: &str) -> IResult<&str, (bool, String, Vec<String>)> {
    let (input, returns_value) = alt((map(tag("int"), |_| true), map(tag("void"), |_| false)))(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = identifier(input)?;
    let (input, params) = delimited(
        terminated(char('('), space0),
        separated_list0(
            tuple((space0, char(','), space0)),
            preceded(terminated(tag("int"), space1), identifier),
        ),
        preceded(space0, char(')')),
    )(input)?;
    let (input, _) = preceded(space0, char(':'))(input)?;
    Ok((input, (returns_value, name, params)))
}

/// Parse a variable declaration: `name` or `name[count]`.
pub(crate) fn parse_variable(input: &str) -> IResult<&str, Variable> {
    let (input, name) = identifier(input)?;
    let (input, elems) = nom::combinator::opt(delimited(char('['), element_count, char(']')))(input)?;
    Ok((input, Variable { name, elems }))
}

/// Parse the local variable list line: `int-list: a, b, arr[100]`
pub(crate) fn parse_int_list(input: &str) -> IResult<&str, Vec<Variable>> {
    let (input, _) = terminated(tag("int-list:"), space0)(input)?;
    separated_list0(tuple((space0, char(','), space0)), parse_variable)(input)
}

/// Reclassify positionally-typed operands for an opcode.
///
/// Branch targets and label definitions become label operands; call targets
/// become function operands. Everything else keeps its literal/name
/// classification.
fn classify_operands(opcode: Opcode, operands: Vec<Operand>) -> Vec<Operand> {
    fn as_name(operand: Operand) -> String {
        match operand {
            Operand::Var(name) | Operand::Func(name) | Operand::Label(name) => name,
            Operand::Int(value) => alloc::format!("{}", value),
        }
    }

    operands
        .into_iter()
        .enumerate()
        .map(|(i, operand)| {
            let is_label_pos = i == 0
                && (opcode == Opcode::Goto
                    || opcode == Opcode::Label
                    || opcode.is_conditional_branch());
            let is_func_pos = (i == 0 && opcode == Opcode::Call)
                || (i == 1 && opcode == Opcode::Callr);
            if is_label_pos {
                Operand::Label(as_name(operand))
            } else if is_func_pos {
                Operand::Func(as_name(operand))
            } else {
                operand
            }
        })
        .collect()
}

/// Parse a label definition line: `name:`
fn parse_label_line(input: &str) -> IResult<&str, Inst> {
    map(terminated(identifier, char(':')), |name| {
        Inst::new(Opcode::Label, vec![Operand::Label(name)])
    })(input)
}

/// Parse an instruction line: `opcode, operand, operand, ...`
fn parse_instruction(input: &str) -> IResult<&str, Inst> {
    let (rest, name) = identifier(input)?;
    let opcode = match Opcode::from_name(&name) {
        Some(opcode) => opcode,
        None => {
            return Err(nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Tag,
            )))
        }
    };
    let (rest, operands) = many0(preceded(
        tuple((space0, char(','), space0)),
        raw_operand,
    ))(rest)?;
    Ok((rest, Inst::new(opcode, classify_operands(opcode, operands))))
}

/// Parse a body item: a label line or an instruction.
fn parse_body_item(input: &str) -> IResult<&str, Inst> {
    alt((parse_label_line, parse_instruction))(input)
}

/// Parse a function (internal, used by the program parser).
pub(crate) fn parse_function_internal(input: &str) -> IResult<&str, Function> {
    let (input, _) = terminated(tag("#start_function"), blank)(input)?;
    let (input, (returns_value, name, params)) = terminated(parse_signature, blank)(input)?;
    let (input, locals) = terminated(parse_int_list, blank)(input)?;
    let (input, insts) = many0(terminated(parse_body_item, blank))(input)?;
    let (input, _) = terminated(tag("#end_function"), blank)(input)?;

    // Parameters are local variables too.
    let mut vars: Vec<Variable> = params.iter().cloned().map(Variable::scalar).collect();
    vars.extend(locals);

    Ok((
        input,
        Function {
            name,
            returns_value,
            params,
            vars,
            insts,
        },
    ))
}
