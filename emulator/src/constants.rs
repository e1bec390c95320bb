/// An index into the machine memory
pub type Address = usize;

/// Raw register content, always kept below the modulus of the configured width
pub type Word = u64;

/// A single memory cell. Memory is byte-addressed whatever the register width
pub type Byte = u8;

/// Default size of the computer memory
pub const MEMORY_SIZE: Address = 256;

/// Default width of the registers, in bits
pub const BIT_WIDTH: u32 = 8;

/// Word widths the machine can be configured with
pub const SUPPORTED_BIT_WIDTHS: [u32; 5] = [4, 8, 16, 32, 64];

/// Opcodes with this bit set are followed by a one byte operand
pub const OPERAND_FLAG: Byte = 0x80;
