//! Parse number and string literals.
//!
//! Instruction operands and `HEX` data are made of pairs of hexadecimal
//! digits. `STR` data accepts backslash escapes. Numbers typed by a user (in
//! the interactive debugger for example) can be in base 10, base 16 (prefixed
//! by `0x`), base 8 (prefixed by `0o`) or base 2 (prefixed by `0b`).

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag_no_case, take_while1, take_while_m_n},
    character::complete::{char, none_of, space0},
    combinator::{all_consuming, map, map_opt, map_res, value},
    multi::many0,
    sequence::{preceded, terminated},
    Finish, IResult,
};

/// Check if character is a hexadecimal digit
fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

/// Parse exactly two hexadecimal digits
pub(crate) fn parse_hex_byte(input: &str) -> IResult<&str, u8> {
    map_res(take_while_m_n(2, 2, is_hex_digit), |digits| {
        u8::from_str_radix(digits, 16)
    })(input)
}

/// Parse an immediate operand, which must be exactly two hexadecimal digits
pub(crate) fn parse_byte_operand(input: &str) -> Option<u8> {
    all_consuming(parse_hex_byte)(input)
        .finish()
        .ok()
        .map(|(_, byte)| byte)
}

/// Decode a sequence of hexadecimal pairs, optionally separated by spaces
pub(crate) fn decode_hex(input: &str) -> Option<Vec<u8>> {
    all_consuming(terminated(
        many0(preceded(space0, parse_hex_byte)),
        space0,
    ))(input)
    .finish()
    .ok()
    .map(|(_, bytes)| bytes)
}

fn parse_escape(input: &str) -> IResult<&str, char> {
    alt((
        value('\\', char('\\')),
        value('"', char('"')),
        value('\'', char('\'')),
        value('\n', char('n')),
        value('\t', char('t')),
        value('\r', char('r')),
        parse_octal_escape,
        value('\x07', char('a')),
        value('\x08', char('b')),
        value('\x0c', char('f')),
        value('\x0b', char('v')),
        map(preceded(char('x'), parse_hex_byte), char::from),
        preceded(char('u'), code_point(4)),
        preceded(char('U'), code_point(8)),
    ))(input)
}

/// `\o`, `\oo` or `\ooo`, an octal code point
fn parse_octal_escape(input: &str) -> IResult<&str, char> {
    map_opt(take_while_m_n(1, 3, is_oct_digit), |digits| {
        u32::from_str_radix(digits, 8).ok().and_then(char::from_u32)
    })(input)
}

/// Exactly `digits` hexadecimal digits forming a valid code point
fn code_point<'a>(digits: usize) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    map_opt(take_while_m_n(digits, digits, is_hex_digit), |hex| {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    })
}

/// Decode the escape sequences of a string
pub(crate) fn decode_string(input: &str) -> Option<String> {
    if input.is_empty() {
        return Some(String::new());
    }

    all_consuming(escaped_transform(none_of("\\"), '\\', parse_escape))(input)
        .finish()
        .ok()
        .map(|(_, string)| string)
}

/// Parse a decimal number
fn from_decimal(input: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str(input)
}

/// Check if character is a decimal digit
fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

/// Parse a hexadecimal number
fn from_hexadecimal(input: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(input, 16)
}

/// Extract a hexadecimal literal
fn take_hexadecimal_literal(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag_no_case("0x")(input)?;
    take_while1(is_hex_digit)(input)
}

/// Parse an octal number
fn from_octal(input: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(input, 8)
}

/// Check if character is an octal digit
fn is_oct_digit(c: char) -> bool {
    c.is_digit(8)
}

/// Extract an octal literal
fn take_octal_literal(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag_no_case("0o")(input)?;
    take_while1(is_oct_digit)(input)
}

/// Parse a binary number
fn from_binary(input: &str) -> Result<u64, std::num::ParseIntError> {
    u64::from_str_radix(input, 2)
}

/// Check if character is a binary digit
fn is_bin_digit(c: char) -> bool {
    c.is_digit(2)
}

/// Extract a binary literal
fn take_binary_literal(input: &str) -> IResult<&str, &str> {
    let (input, _) = tag_no_case("0b")(input)?;
    take_while1(is_bin_digit)(input)
}

/// Parse a number literal
pub fn parse_literal(input: &str) -> IResult<&str, u64> {
    alt((
        map_res(take_hexadecimal_literal, from_hexadecimal),
        map_res(take_octal_literal, from_octal),
        map_res(take_binary_literal, from_binary),
        map_res(take_while1(is_digit), from_decimal),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_byte_test() {
        assert_eq!(parse_hex_byte("4F"), Ok(("", 0x4f)));
        assert_eq!(parse_hex_byte("4f12"), Ok(("12", 0x4f)));
        assert!(parse_hex_byte("4").is_err());
        assert!(parse_hex_byte("g1").is_err());
    }

    #[test]
    fn parse_byte_operand_test() {
        assert_eq!(parse_byte_operand("05"), Some(5));
        assert_eq!(parse_byte_operand("fF"), Some(0xff));
        assert_eq!(parse_byte_operand("5"), None);
        assert_eq!(parse_byte_operand("005"), None);
        assert_eq!(parse_byte_operand("0x5"), None);
        assert_eq!(parse_byte_operand(""), None);
    }

    #[test]
    fn decode_hex_test() {
        assert_eq!(decode_hex("48656c6c6f"), Some(b"Hello".to_vec()));
        assert_eq!(decode_hex("de ad  BE ef "), Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(decode_hex(""), Some(Vec::new()));
        assert_eq!(decode_hex("abc"), None);
        assert_eq!(decode_hex("zz"), None);
    }

    #[test]
    fn decode_string_test() {
        assert_eq!(decode_string("Hello"), Some("Hello".to_string()));
        assert_eq!(
            decode_string(r"Hello,\tworld!\n"),
            Some("Hello,\tworld!\n".to_string())
        );
        assert_eq!(decode_string(r#"\\ \" \' \0"#), Some("\\ \" ' \0".to_string()));
        assert_eq!(decode_string(r"\x41\x7e"), Some("A~".to_string()));
        assert_eq!(decode_string(r"# not a comment"), Some("# not a comment".to_string()));
        assert_eq!(decode_string(""), Some(String::new()));
        assert_eq!(decode_string(r"\q"), None);
        assert_eq!(decode_string(r"oops\"), None);
        assert_eq!(decode_string(r"\x4"), None);
    }

    #[test]
    fn decode_string_numeric_escapes_test() {
        assert_eq!(
            decode_string(r"a\012b\101").map(String::into_bytes),
            Some(vec![b'a', b'\n', b'b', b'A'])
        );
        assert_eq!(decode_string(r"\0"), Some("\0".to_string()));
        assert_eq!(decode_string(r"\08"), Some("\08".to_string()));
        assert_eq!(decode_string(r"\1234"), Some("S4".to_string()));
        assert_eq!(decode_string(r"\u00e9\U0001F600"), Some("\u{e9}\u{1f600}".to_string()));
        assert_eq!(decode_string(r"\u00e"), None);
        assert_eq!(decode_string(r"\ud800"), None);
    }

    #[test]
    fn from_decimal_test() {
        assert_eq!(from_decimal("16"), Ok(16));
        assert_eq!(from_decimal("18446744073709551615"), Ok(u64::MAX)); // Upper boundary
        assert!(from_decimal("18446744073709551616").is_err()); // Upper boundary
        assert!(from_decimal("foo").is_err());
    }

    #[test]
    fn take_hexadecimal_literal_test() {
        assert_eq!(take_hexadecimal_literal("0x4F"), Ok(("", "4F")));
        assert_eq!(take_hexadecimal_literal("0X4f"), Ok(("", "4f")));
        assert!(take_hexadecimal_literal("0xinvalid").is_err()); // Invalid
        assert!(take_hexadecimal_literal("ffff").is_err()); // No prefix
    }

    #[test]
    fn take_octal_literal_test() {
        assert_eq!(take_octal_literal("0o77"), Ok(("", "77")));
        assert_eq!(take_octal_literal("0O77"), Ok(("", "77")));
        assert!(take_octal_literal("0oinvalid").is_err()); // Invalid
        assert!(take_octal_literal("77").is_err()); // No prefix
    }

    #[test]
    fn take_binary_literal_test() {
        assert_eq!(take_binary_literal("0b10"), Ok(("", "10")));
        assert_eq!(take_binary_literal("0B10"), Ok(("", "10")));
        assert!(take_binary_literal("0binvalid").is_err()); // Invalid
        assert!(take_binary_literal("10").is_err()); // No prefix
    }

    #[test]
    fn parse_literal_test() {
        assert_eq!(parse_literal("100"), Ok(("", 100)));
        assert_eq!(parse_literal("0x4f"), Ok(("", 0x4f)));
        assert_eq!(parse_literal("0o42"), Ok(("", 0o42)));
        assert_eq!(parse_literal("0b10"), Ok(("", 2)));
        assert_eq!(parse_literal("0xg"), Ok(("xg", 0))); // Only the first digit parses
        assert!(parse_literal("abc").is_err());
    }
}
