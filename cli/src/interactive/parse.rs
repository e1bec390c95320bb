//! Parse the arguments of the interactive commands

use std::collections::BTreeMap;
use std::str::FromStr;

use ab8_emulator::assembler::parse_literal;
use ab8_emulator::constants as C;
use ab8_emulator::runtime::{Computer, Reg};
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case};
use nom::character::complete::{alpha1, alphanumeric1, char};
use nom::combinator::{all_consuming, map, recognize, value};
use nom::multi::many0_count;
use nom::sequence::{pair, preceded};
use nom::{Finish, IResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("unknown label {0:?}")]
    UnknownLabel(String),

    #[error("{0} is not a valid address")]
    InvalidAddress(C::Word),
}

/// A value typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// A number literal
    Literal(C::Word),

    /// The offset of a label, written `:label`
    Label(String),

    /// The content of a register
    Register(Reg),
}

impl Argument {
    pub fn evaluate(
        &self,
        computer: &Computer,
        labels: &BTreeMap<String, C::Address>,
    ) -> Result<C::Word, EvaluationError> {
        match self {
            Self::Literal(value) => Ok(*value),
            Self::Label(label) => labels
                .get(&label.to_lowercase())
                .map(|&offset| offset as C::Word)
                .ok_or_else(|| EvaluationError::UnknownLabel(label.clone())),
            Self::Register(reg) => Ok(computer.registers.get(*reg)),
        }
    }

    pub fn evaluate_address(
        &self,
        computer: &Computer,
        labels: &BTreeMap<String, C::Address>,
    ) -> Result<C::Address, EvaluationError> {
        let value = self.evaluate(computer, labels)?;
        C::Address::try_from(value).map_err(|_| EvaluationError::InvalidAddress(value))
    }
}

#[derive(Debug, Error)]
#[error("could not parse argument {0:?}")]
pub struct ParseArgumentError(String);

impl FromStr for Argument {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all_consuming(parse_argument)(s.trim())
            .finish()
            .map(|(_, argument)| argument)
            .map_err(|_| ParseArgumentError(s.to_string()))
    }
}

/// What the `set` command writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentTarget {
    Register(Reg),
    Address(Argument),
}

impl FromStr for AssignmentTarget {
    type Err = ParseArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse()? {
            Argument::Register(reg) => Self::Register(reg),
            argument => Self::Address(argument),
        })
    }
}

fn parse_register(input: &str) -> IResult<&str, Reg> {
    preceded(
        nom::combinator::opt(char('%')),
        alt((
            value(Reg::PC, tag_no_case("pc")),
            value(Reg::A, tag_no_case("a")),
            value(Reg::B, tag_no_case("b")),
        )),
    )(input)
}

fn parse_label(input: &str) -> IResult<&str, &str> {
    preceded(
        char(':'),
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        )),
    )(input)
}

fn parse_argument(input: &str) -> IResult<&str, Argument> {
    alt((
        map(all_consuming(parse_literal), Argument::Literal),
        map(parse_label, |label| Argument::Label(label.to_string())),
        map(parse_register, Argument::Register),
    ))(input)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parse_argument_test() {
        assert_eq!("42".parse::<Argument>().unwrap(), Argument::Literal(42));
        assert_eq!("0x2A".parse::<Argument>().unwrap(), Argument::Literal(42));
        assert_eq!("0b101".parse::<Argument>().unwrap(), Argument::Literal(5));
        assert_eq!(
            ":loop".parse::<Argument>().unwrap(),
            Argument::Label("loop".to_string())
        );
        assert_eq!("b".parse::<Argument>().unwrap(), Argument::Register(Reg::B));
        assert_eq!(
            "%PC".parse::<Argument>().unwrap(),
            Argument::Register(Reg::PC)
        );
        assert!("loop".parse::<Argument>().is_err());
        assert!(":".parse::<Argument>().is_err());
        assert!("12ab".parse::<Argument>().is_err());
    }

    #[test]
    fn parse_assignment_target_test() {
        assert_eq!(
            "a".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Register(Reg::A)
        );
        assert_eq!(
            ":tmp".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(Argument::Label("tmp".to_string()))
        );
    }

    #[test]
    fn evaluate_test() {
        let mut computer = Computer::default();
        computer.registers.b = 7;
        let labels = BTreeMap::from([("loop".to_string(), 3)]);

        let label = Argument::Label("LOOP".to_string());
        assert_eq!(label.evaluate(&computer, &labels).unwrap(), 3);
        let register = Argument::Register(Reg::B);
        assert_eq!(register.evaluate_address(&computer, &labels).unwrap(), 7);
        assert!(Argument::Label("end".to_string())
            .evaluate(&computer, &labels)
            .is_err());
    }
}
