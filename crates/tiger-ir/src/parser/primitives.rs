//! Primitive parsers: whitespace, identifiers, operand tokens.

use alloc::string::{String, ToString};

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1, take_while_m_n},
    character::complete::{char, multispace1, not_line_ending},
    combinator::{map, map_res, opt, recognize},
    multi::many0,
    sequence::{pair, preceded},
    IResult,
};

use crate::inst::Operand;

/// Skip blank space: whitespace (including newlines) and `;` comments.
pub(crate) fn blank(input: &str) -> IResult<&str, ()> {
    map(
        many0(alt((multispace1, preceded(char(';'), not_line_ending)))),
        |_| (),
    )(input)
}

/// Parse an identifier: a letter or underscore followed by word characters.
pub(crate) fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            take_while_m_n(1, 1, |c: char| c.is_alphabetic() || c == '_'),
            take_while(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Parse an unsigned array element count.
pub(crate) fn element_count(input: &str) -> IResult<&str, u32> {
    map_res(
        take_while1(|c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u32>(),
    )(input)
}

/// Parse a raw operand token and classify it.
///
/// A token that parses as an integer is a literal; anything else is a
/// symbolic name. Numeric-parse failure is the classification mechanism,
/// not an error.
pub(crate) fn raw_operand(input: &str) -> IResult<&str, Operand> {
    map(
        recognize(pair(
            opt(char('-')),
            take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        )),
        |s: &str| match s.parse::<i32>() {
            Ok(value) => Operand::Int(value),
            Err(_) => Operand::Var(s.to_string()),
        },
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank() {
        assert_eq!(blank("   \n\t x"), Ok(("x", ())));
        assert_eq!(blank("; comment\nx"), Ok(("x", ())));
        assert_eq!(blank("x"), Ok(("x", ())));
    }

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("loop0:"), Ok((":", "loop0".to_string())));
        assert_eq!(identifier("_t1 "), Ok((" ", "_t1".to_string())));
        assert!(identifier("0abc").is_err());
    }

    #[test]
    fn test_element_count() {
        assert_eq!(element_count("100]"), Ok(("]", 100)));
        assert!(element_count("x").is_err());
    }

    #[test]
    fn test_raw_operand_classification() {
        assert_eq!(raw_operand("42"), Ok(("", Operand::Int(42))));
        assert_eq!(raw_operand("-42"), Ok(("", Operand::Int(-42))));
        assert_eq!(
            raw_operand("x1"),
            Ok(("", Operand::Var("x1".to_string())))
        );
        // Not a valid integer: falls back to a symbolic name.
        assert_eq!(
            raw_operand("2x"),
            Ok(("", Operand::Var("2x".to_string())))
        );
    }
}
