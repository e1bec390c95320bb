use parse_display::{Display, FromStr};
use tracing::debug;

use super::{exception::Fault, Computer};
use crate::constants::{Byte, OPERAND_FLAG};

/// Kind of the byte following an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandKind {
    /// Single byte instruction
    None,

    /// A memory address
    Address,

    /// An 8-bit immediate value
    Literal,
}

/// The instruction table
///
/// Maps each opcode to its mnemonic. Both the processor (when decoding) and
/// the assembler (when encoding) go through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromStr)]
#[display(style = "UPPERCASE")]
pub enum Mnemonic {
    Nop,
    Swap,
    Add,
    Sub,
    Write,
    Read,
    Halt,
    Loadi,
    Savei,
    Load,
    Save,
    Jump,
    Jumpz,
    Jumpnz,
    Jumpo,
    Addl,
    Subl,
    Addlb,
    Set,
    Setb,
}

impl Mnemonic {
    pub const ALL: [Mnemonic; 20] = [
        Mnemonic::Nop,
        Mnemonic::Swap,
        Mnemonic::Add,
        Mnemonic::Sub,
        Mnemonic::Write,
        Mnemonic::Read,
        Mnemonic::Halt,
        Mnemonic::Loadi,
        Mnemonic::Savei,
        Mnemonic::Load,
        Mnemonic::Save,
        Mnemonic::Jump,
        Mnemonic::Jumpz,
        Mnemonic::Jumpnz,
        Mnemonic::Jumpo,
        Mnemonic::Addl,
        Mnemonic::Subl,
        Mnemonic::Addlb,
        Mnemonic::Set,
        Mnemonic::Setb,
    ];

    #[must_use]
    pub const fn opcode(self) -> Byte {
        match self {
            Mnemonic::Nop => 0x00,
            Mnemonic::Swap => 0x01,
            Mnemonic::Add => 0x02,
            Mnemonic::Sub => 0x03,
            Mnemonic::Write => 0x04,
            Mnemonic::Read => 0x05,
            Mnemonic::Halt => 0x06,
            Mnemonic::Loadi => 0x07,
            Mnemonic::Savei => 0x08,
            Mnemonic::Load => 0x80,
            Mnemonic::Save => 0x81,
            Mnemonic::Jump => 0x92,
            Mnemonic::Jumpz => 0x93,
            Mnemonic::Jumpnz => 0x94,
            Mnemonic::Jumpo => 0x95,
            Mnemonic::Addl => 0xa0,
            Mnemonic::Subl => 0xa1,
            Mnemonic::Addlb => 0xa2,
            Mnemonic::Set => 0xa6,
            Mnemonic::Setb => 0xa7,
        }
    }

    /// Look up an opcode, `None` if it is not part of the instruction set
    #[must_use]
    pub fn from_opcode(opcode: Byte) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.opcode() == opcode)
    }

    /// Look up a mnemonic by name, ignoring case
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        name.to_ascii_uppercase().parse().ok()
    }

    #[must_use]
    pub const fn operand(self) -> OperandKind {
        match self {
            Mnemonic::Load
            | Mnemonic::Save
            | Mnemonic::Jump
            | Mnemonic::Jumpz
            | Mnemonic::Jumpnz
            | Mnemonic::Jumpo => OperandKind::Address,
            Mnemonic::Addl
            | Mnemonic::Subl
            | Mnemonic::Addlb
            | Mnemonic::Set
            | Mnemonic::Setb => OperandKind::Literal,
            _ => OperandKind::None,
        }
    }

    #[must_use]
    pub const fn has_operand(self) -> bool {
        has_operand(self.opcode())
    }
}

/// Whether a raw opcode is followed by an operand byte
///
/// This only looks at the high bit, so it also holds for unknown opcodes.
#[must_use]
pub const fn has_operand(opcode: Byte) -> bool {
    opcode & OPERAND_FLAG != 0
}

/// A decoded instruction with its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// No-op
    Nop,

    /// Exchange A and B
    Swap,

    /// Add B to A
    Add,

    /// Subtract B from A
    Sub,

    /// Push A to the output port
    Write,

    /// Pop a value from the input port into A
    Read,

    /// Stop the machine
    Halt,

    /// Load the memory cell at address B into A
    Loadi,

    /// Store the low byte of A at address B
    Savei,

    /// Load a memory cell into A
    Load(Byte),

    /// Store the low byte of A in memory
    Save(Byte),

    /// Unconditional jump
    Jump(Byte),

    /// Jump if A is zero
    Jumpz(Byte),

    /// Jump if A is not zero
    Jumpnz(Byte),

    /// Jump if the overflow flag is set
    Jumpo(Byte),

    /// Add a literal to A
    Addl(Byte),

    /// Subtract a literal from A
    Subl(Byte),

    /// Add a literal to B
    Addlb(Byte),

    /// Set A to a literal
    Set(Byte),

    /// Set B to a literal
    Setb(Byte),
}

impl Instruction {
    /// Decode an opcode and its operand
    ///
    /// The operand is ignored for single byte instructions. Returns `None` for
    /// opcodes outside of the instruction table.
    #[must_use]
    pub fn decode(opcode: Byte, operand: Byte) -> Option<Self> {
        use Instruction as I;
        use Mnemonic as M;

        let instruction = match Mnemonic::from_opcode(opcode)? {
            M::Nop => I::Nop,
            M::Swap => I::Swap,
            M::Add => I::Add,
            M::Sub => I::Sub,
            M::Write => I::Write,
            M::Read => I::Read,
            M::Halt => I::Halt,
            M::Loadi => I::Loadi,
            M::Savei => I::Savei,
            M::Load => I::Load(operand),
            M::Save => I::Save(operand),
            M::Jump => I::Jump(operand),
            M::Jumpz => I::Jumpz(operand),
            M::Jumpnz => I::Jumpnz(operand),
            M::Jumpo => I::Jumpo(operand),
            M::Addl => I::Addl(operand),
            M::Subl => I::Subl(operand),
            M::Addlb => I::Addlb(operand),
            M::Set => I::Set(operand),
            M::Setb => I::Setb(operand),
        };

        Some(instruction)
    }

    #[must_use]
    pub const fn mnemonic(self) -> Mnemonic {
        match self {
            Instruction::Nop => Mnemonic::Nop,
            Instruction::Swap => Mnemonic::Swap,
            Instruction::Add => Mnemonic::Add,
            Instruction::Sub => Mnemonic::Sub,
            Instruction::Write => Mnemonic::Write,
            Instruction::Read => Mnemonic::Read,
            Instruction::Halt => Mnemonic::Halt,
            Instruction::Loadi => Mnemonic::Loadi,
            Instruction::Savei => Mnemonic::Savei,
            Instruction::Load(_) => Mnemonic::Load,
            Instruction::Save(_) => Mnemonic::Save,
            Instruction::Jump(_) => Mnemonic::Jump,
            Instruction::Jumpz(_) => Mnemonic::Jumpz,
            Instruction::Jumpnz(_) => Mnemonic::Jumpnz,
            Instruction::Jumpo(_) => Mnemonic::Jumpo,
            Instruction::Addl(_) => Mnemonic::Addl,
            Instruction::Subl(_) => Mnemonic::Subl,
            Instruction::Addlb(_) => Mnemonic::Addlb,
            Instruction::Set(_) => Mnemonic::Set,
            Instruction::Setb(_) => Mnemonic::Setb,
        }
    }

    #[must_use]
    pub const fn operand(self) -> Option<Byte> {
        match self {
            Instruction::Load(x)
            | Instruction::Save(x)
            | Instruction::Jump(x)
            | Instruction::Jumpz(x)
            | Instruction::Jumpnz(x)
            | Instruction::Jumpo(x)
            | Instruction::Addl(x)
            | Instruction::Subl(x)
            | Instruction::Addlb(x)
            | Instruction::Set(x)
            | Instruction::Setb(x) => Some(x),
            _ => None,
        }
    }

    /// Number of bytes the instruction takes in memory
    #[must_use]
    pub const fn len(self) -> usize {
        if self.mnemonic().has_operand() {
            2
        } else {
            1
        }
    }

    /// Execute the instruction
    pub(crate) fn execute(self, computer: &mut Computer) -> Result<(), Fault> {
        use Instruction::*;

        let width = computer.width;

        match self {
            Nop => {}

            Swap => {
                let registers = &mut computer.registers;
                std::mem::swap(&mut registers.a, &mut registers.b);
            }

            Add => {
                let (a, b) = (computer.registers.a, computer.registers.b);
                let (res, overflow) = width.add(a, b);
                debug!(overflow, "{} + {} = {}", a, b, res);
                computer.registers.a = res;
                computer.set_overflow(overflow);
            }

            Sub => {
                let (a, b) = (computer.registers.a, computer.registers.b);
                let (res, overflow) = width.sub(a, b);
                debug!(overflow, "{} - {} = {}", a, b, res);
                computer.registers.a = res;
                computer.set_overflow(overflow);
            }

            Write => {
                computer.write_output(computer.registers.a);
            }

            Read => {
                computer.registers.a = computer
                    .ports
                    .read()
                    .map_or(0, |value| width.wrap(value));
            }

            Halt => computer.halt(),

            Loadi => {
                let address = computer.indexed_address(Mnemonic::Loadi)?;
                let value = computer.read_memory(Mnemonic::Loadi, address)?;
                computer.registers.a = width.wrap(value.into());
            }

            Savei => {
                let address = computer.indexed_address(Mnemonic::Savei)?;
                let value = low_byte(computer.registers.a);
                computer.write_memory(Mnemonic::Savei, address, value)?;
            }

            Load(address) => {
                let value = computer.read_memory(Mnemonic::Load, address.into())?;
                computer.registers.a = width.wrap(value.into());
            }

            Save(address) => {
                let value = low_byte(computer.registers.a);
                computer.write_memory(Mnemonic::Save, address.into(), value)?;
            }

            Jump(address) => computer.jump(address)?,

            Jumpz(address) => {
                if computer.registers.a == 0 {
                    computer.jump(address)?;
                }
            }

            Jumpnz(address) => {
                if computer.registers.a != 0 {
                    computer.jump(address)?;
                }
            }

            Jumpo(address) => {
                if computer.overflow() {
                    computer.jump(address)?;
                }
            }

            Addl(literal) => {
                let a = computer.registers.a;
                let (res, overflow) = width.add(a, literal.into());
                debug!(overflow, "{} + {} = {}", a, literal, res);
                computer.registers.a = res;
                computer.set_overflow(overflow);
            }

            Subl(literal) => {
                let a = computer.registers.a;
                let (res, overflow) = width.sub(a, literal.into());
                debug!(overflow, "{} - {} = {}", a, literal, res);
                computer.registers.a = res;
                computer.set_overflow(overflow);
            }

            Addlb(literal) => {
                let b = computer.registers.b;
                let (res, overflow) = width.add(b, literal.into());
                debug!(overflow, "{} + {} = {}", b, literal, res);
                computer.registers.b = res;
                computer.set_overflow(overflow);
            }

            Set(literal) => computer.registers.a = width.wrap(literal.into()),

            Setb(literal) => computer.registers.b = width.wrap(literal.into()),
        }

        Ok(())
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operand() {
            Some(operand) => write!(f, "{} {:02X}", self.mnemonic(), operand),
            None => write!(f, "{}", self.mnemonic()),
        }
    }
}

/// Memory cells are a single byte wide, whatever the register width
#[allow(clippy::cast_possible_truncation)]
const fn low_byte(word: crate::constants::Word) -> Byte {
    (word & 0xFF) as Byte
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_test() {
        for mnemonic in Mnemonic::ALL {
            assert_eq!(Mnemonic::from_opcode(mnemonic.opcode()), Some(mnemonic));
            assert_eq!(
                Mnemonic::from_name(&mnemonic.to_string().to_lowercase()),
                Some(mnemonic)
            );
            assert_eq!(
                mnemonic.has_operand(),
                mnemonic.operand() != OperandKind::None
            );
        }

        assert_eq!(Mnemonic::from_opcode(0x09), None);
        assert_eq!(Mnemonic::from_opcode(0xff), None);
        assert_eq!(Mnemonic::from_name("JMP"), None);
        assert_eq!(Mnemonic::from_name("JumpNZ"), Some(Mnemonic::Jumpnz));
        assert_eq!(Mnemonic::Jumpo.opcode(), 0x95);
        assert_eq!(Mnemonic::Setb.operand(), OperandKind::Literal);
        assert_eq!(Mnemonic::Save.operand(), OperandKind::Address);
    }

    #[test]
    fn decode_test() {
        assert_eq!(Instruction::decode(0x06, 0x42), Some(Instruction::Halt));
        assert_eq!(Instruction::decode(0xa6, 0x05), Some(Instruction::Set(5)));
        assert_eq!(Instruction::decode(0x92, 0x10), Some(Instruction::Jump(0x10)));
        assert_eq!(Instruction::decode(0x42, 0x00), None);
        assert!(has_operand(0xff));
        assert!(!has_operand(0x7f));
    }

    #[test]
    fn len_test() {
        assert_eq!(Instruction::Write.len(), 1);
        assert_eq!(Instruction::Addlb(1).len(), 2);
    }

    #[test]
    fn display_test() {
        insta::assert_snapshot!(Instruction::Jumpnz(0x0a), @"JUMPNZ 0A");
        insta::assert_snapshot!(Instruction::Set(0xff), @"SET FF");
        insta::assert_snapshot!(Instruction::Savei, @"SAVEI");
    }
}
