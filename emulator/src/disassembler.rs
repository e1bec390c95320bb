//! Turn machine code back into mnemonics

use crate::constants as C;
use crate::runtime::{has_operand, Instruction};

/// One entry of a disassembled program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disassembled {
    /// A known instruction
    Instruction(Instruction),

    /// An opcode outside of the instruction table, with the operand it would
    /// consume
    Unknown(Vec<C::Byte>),
}

impl std::fmt::Display for Disassembled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Instruction(instruction) => write!(f, "{instruction}"),
            Self::Unknown(bytes) => {
                write!(f, "HEX ")?;
                for byte in bytes {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

impl Disassembled {
    /// Number of bytes the entry was decoded from
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Self::Instruction(instruction) => instruction.len(),
            Self::Unknown(bytes) => bytes.len(),
        }
    }
}

/// Iterator over the instructions of a program, see [`disassemble`]
#[derive(Debug, Clone)]
pub struct Disassembler<'a> {
    code: &'a [C::Byte],
    offset: C::Address,
}

impl Iterator for Disassembler<'_> {
    type Item = (C::Address, Disassembled);

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let opcode = *self.code.get(offset)?;

        // A truncated operand at the end of the program reads as a zero
        let (operand, length) = if has_operand(opcode) {
            (self.code.get(offset + 1).copied(), 2)
        } else {
            (None, 1)
        };
        self.offset += length;

        let entry = match Instruction::decode(opcode, operand.unwrap_or_default()) {
            Some(instruction) => Disassembled::Instruction(instruction),
            None => Disassembled::Unknown(std::iter::once(opcode).chain(operand).collect()),
        };

        Some((offset, entry))
    }
}

/// Walk through machine code, decoding one instruction at a time
///
/// Data placed between instructions (strings for example) is decoded as if it
/// was code.
#[must_use]
pub fn disassemble(code: &[C::Byte]) -> Disassembler<'_> {
    Disassembler { code, offset: 0 }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn disassemble_test() {
        let code = [0xa6, 0x05, 0x04, 0x09, 0xff, 0x10, 0x06, 0x92];
        let listing: Vec<_> = disassemble(&code).collect();
        assert_eq!(
            listing,
            vec![
                (0, Disassembled::Instruction(Instruction::Set(5))),
                (2, Disassembled::Instruction(Instruction::Write)),
                (3, Disassembled::Unknown(vec![0x09])),
                (4, Disassembled::Unknown(vec![0xff, 0x10])),
                (6, Disassembled::Instruction(Instruction::Halt)),
                (7, Disassembled::Instruction(Instruction::Jump(0))),
            ]
        );
    }

    #[test]
    fn display_test() {
        let listing: Vec<_> = disassemble(&[0x94, 0x02, 0xff, 0x10])
            .map(|(_, entry)| entry.to_string())
            .collect();
        insta::assert_snapshot!(listing.join("\n"), @r"
        JUMPNZ 02
        HEX FF10
        ");
    }
}
