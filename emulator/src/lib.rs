pub mod assembler;
pub mod constants;
pub mod disassembler;
pub mod runtime;

pub use self::assembler::{assemble, Assembler};
pub use self::disassembler::disassemble;
pub use self::runtime::{Computer, MachineConfig};
