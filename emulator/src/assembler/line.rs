//! Source line parsing
//!
//! A line holds an optional label definition followed by optional content:
//! a `STR` or `HEX` directive, or an instruction with its operands. A `#`
//! starts a comment, except inside `STR` data.
//!
//! Like the rest of the parser, this does zero copy over the input: all the
//! parts of a [`Line`] borrow from the source text.

use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::char,
    combinator::{all_consuming, verify},
    sequence::{preceded, terminated},
    Finish, IResult,
};

use super::literal::parse_byte_operand;

const COMMENT: char = '#';

/// Holds the content of a line
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineContent<'a> {
    /// `STR` directive, with the raw (still escaped) text
    Str(&'a str),

    /// `HEX` directive, with the raw hexadecimal pairs
    Hex(&'a str),

    /// An instruction, with its mnemonic and the list of operands
    Instruction {
        mnemonic: &'a str,
        operands: Vec<&'a str>,
    },
}

/// Holds a whole line, with the label definition (if any) and the content (if
/// any).
///
/// Note that the `Default::default()` implementation represents an empty line.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub(crate) struct Line<'a> {
    pub label: Option<&'a str>,
    pub content: Option<LineContent<'a>>,
}

/// An instruction operand
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operand<'a> {
    /// A literal value or an address
    Byte(u8),

    /// A reference to a label, resolved once the whole program is assembled
    Label(&'a str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LineError<'a> {
    /// Something ending with a colon that is not a valid label name
    InvalidLabel(&'a str),
}

fn is_identifier_char(c: char) -> bool {
    is_start_identifier_char(c) || c.is_ascii_digit()
}

fn is_start_identifier_char(c: char) -> bool {
    c == '_' || c.is_ascii_lowercase() || c.is_ascii_uppercase()
}

/// Parse a C-like identifier
pub(crate) fn parse_identifier(input: &str) -> IResult<&str, &str> {
    verify(take_while1(is_identifier_char), |f: &str| {
        f.chars()
            .next()
            .filter(|&c| is_start_identifier_char(c))
            .is_some()
    })(input)
}

/// Parse a label definition, `name:`
fn parse_label_definition(input: &str) -> IResult<&str, &str> {
    terminated(parse_identifier, char(':'))(input)
}

/// Parse a label reference, `:name`
fn parse_label_reference(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), parse_identifier)(input)
}

/// Take a whitespace-delimited word
fn parse_word(input: &str) -> IResult<&str, &str> {
    take_till1(char::is_whitespace)(input)
}

fn is_comment(input: &str) -> bool {
    input.is_empty() || input.starts_with(COMMENT)
}

/// Split the text following a directive keyword
///
/// Exactly one separator is dropped, so leading spaces of `STR` data are kept.
fn directive_argument(rest: &str) -> &str {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => rest,
    }
}

/// Remove a trailing comment
fn strip_comment(input: &str) -> &str {
    input.split_once(COMMENT).map_or(input, |(code, _)| code).trim_end()
}

/// Parse a line of source
pub(crate) fn parse_line(input: &str) -> Result<Line<'_>, LineError<'_>> {
    let input = input.trim();
    if is_comment(input) {
        return Ok(Line::default());
    }

    let mut line = Line::default();
    let mut rest = input;

    // The first word can be a label definition
    if let Ok((after, word)) = parse_word(rest) {
        if let Some(candidate) = word.strip_suffix(':') {
            let (_, label) = all_consuming(parse_label_definition)(word)
                .finish()
                .map_err(|_: nom::error::Error<&str>| LineError::InvalidLabel(candidate))?;
            line.label = Some(label);
            rest = after.trim_start();
        }
    }

    if is_comment(rest) {
        return Ok(line);
    }

    let Ok((after, keyword)) = parse_word(rest) else {
        return Ok(line);
    };

    let content = if keyword.eq_ignore_ascii_case("STR") {
        LineContent::Str(directive_argument(after))
    } else if keyword.eq_ignore_ascii_case("HEX") {
        LineContent::Hex(strip_comment(directive_argument(after)))
    } else {
        let operands = after
            .split_whitespace()
            .take_while(|word| !word.starts_with(COMMENT))
            .collect();
        LineContent::Instruction {
            mnemonic: keyword,
            operands,
        }
    };

    line.content = Some(content);
    Ok(line)
}

/// Parse an instruction operand, `None` if it is malformed
pub(crate) fn parse_operand(input: &str) -> Option<Operand<'_>> {
    if input.starts_with(':') {
        all_consuming(parse_label_reference)(input)
            .finish()
            .ok()
            .map(|(_, label): (&str, &str)| Operand::Label(label))
    } else {
        parse_byte_operand(input).map(Operand::Byte)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn instruction<'a>(mnemonic: &'a str, operands: &[&'a str]) -> Option<LineContent<'a>> {
        Some(LineContent::Instruction {
            mnemonic,
            operands: operands.to_vec(),
        })
    }

    #[test]
    fn parse_identifier_test() {
        assert_eq!(parse_identifier("hello"), Ok(("", "hello")));
        assert_eq!(parse_identifier("abc123"), Ok(("", "abc123")));
        assert!(parse_identifier("123abc").is_err());
        assert_eq!(parse_identifier("abc_123"), Ok(("", "abc_123")));
        assert_eq!(parse_identifier("abc-123"), Ok(("-123", "abc")));
    }

    #[test]
    fn empty_line_test() {
        assert_eq!(parse_line(""), Ok(Line::default()));
        assert_eq!(parse_line("   \t "), Ok(Line::default()));
        assert_eq!(parse_line("# SET 05"), Ok(Line::default()));
        assert_eq!(parse_line("   #comment"), Ok(Line::default()));
    }

    #[test]
    fn instruction_test() {
        assert_eq!(
            parse_line("  SET 05"),
            Ok(Line {
                label: None,
                content: instruction("SET", &["05"]),
            })
        );
        assert_eq!(
            parse_line("halt"),
            Ok(Line {
                label: None,
                content: instruction("halt", &[]),
            })
        );
        assert_eq!(
            parse_line("jump :end   # skip\r"),
            Ok(Line {
                label: None,
                content: instruction("jump", &[":end"]),
            })
        );
        assert_eq!(
            parse_line("ADD 01 02"),
            Ok(Line {
                label: None,
                content: instruction("ADD", &["01", "02"]),
            })
        );
    }

    #[test]
    fn label_test() {
        assert_eq!(
            parse_line("end:"),
            Ok(Line {
                label: Some("end"),
                content: None,
            })
        );
        assert_eq!(
            parse_line("Loop: ADDL 01"),
            Ok(Line {
                label: Some("Loop"),
                content: instruction("ADDL", &["01"]),
            })
        );
        assert_eq!(
            parse_line("msg: # the message"),
            Ok(Line {
                label: Some("msg"),
                content: None,
            })
        );
        assert_eq!(parse_line("my-label:"), Err(LineError::InvalidLabel("my-label")));
        assert_eq!(parse_line(":"), Err(LineError::InvalidLabel("")));
    }

    #[test]
    fn directive_test() {
        assert_eq!(
            parse_line("STR Hello, # world\\n"),
            Ok(Line {
                label: None,
                content: Some(LineContent::Str("Hello, # world\\n")),
            })
        );
        assert_eq!(
            parse_line("str   padded"),
            Ok(Line {
                label: None,
                content: Some(LineContent::Str("  padded")),
            })
        );
        assert_eq!(
            parse_line("msg: STR"),
            Ok(Line {
                label: Some("msg"),
                content: Some(LineContent::Str("")),
            })
        );
        assert_eq!(
            parse_line("HEX 0102 ff # data"),
            Ok(Line {
                label: None,
                content: Some(LineContent::Hex("0102 ff")),
            })
        );
    }

    #[test]
    fn parse_operand_test() {
        assert_eq!(parse_operand("0a"), Some(Operand::Byte(10)));
        assert_eq!(parse_operand(":loop_1"), Some(Operand::Label("loop_1")));
        assert_eq!(parse_operand(":"), None);
        assert_eq!(parse_operand(":1abc"), None);
        assert_eq!(parse_operand("100"), None);
        assert_eq!(parse_operand("loop"), None);
    }
}
