use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants as C;

bitflags! {
    /// Machine flags
    ///
    /// `OUTPUT_WRITTEN` is edge-triggered: it is only set during the tick that
    /// wrote to the output port. `HALTED` and `FAULTED` stay set until reset.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const OVERFLOW       = 0b0001;
        const HALTED         = 0b0010;
        const FAULTED        = 0b0100;
        const OUTPUT_WRITTEN = 0b1000;
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Registers {
    /// General purpose, target of arithmetic and I/O
    pub a: C::Word,

    /// General purpose, used as an index by `LOADI`/`SAVEI`
    pub b: C::Word,

    /// Program counter
    pub pc: C::Address,
}

impl Registers {
    #[must_use]
    pub fn get(&self, reg: Reg) -> C::Word {
        match reg {
            Reg::A => self.a,
            Reg::B => self.b,
            Reg::PC => self.pc as C::Word,
        }
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "A: {} B: {} PC: {}", self.a, self.b, self.pc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "UPPERCASE")]
pub enum Reg {
    /// General purpose
    A,

    /// General purpose
    B,

    /// Program counter
    PC,
}

#[derive(Error, Debug)]
#[error("could not parse register")]
pub struct RegisterParseError;

impl std::str::FromStr for Reg {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "%a" | "a" => Ok(Reg::A),
            "%b" | "b" => Ok(Reg::B),
            "%pc" | "pc" => Ok(Reg::PC),
            _ => Err(RegisterParseError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_register_test() {
        assert_eq!("a".parse::<Reg>().unwrap(), Reg::A);
        assert_eq!("%B".parse::<Reg>().unwrap(), Reg::B);
        assert_eq!("Pc".parse::<Reg>().unwrap(), Reg::PC);
        assert!("sp".parse::<Reg>().is_err());
    }

    #[test]
    fn display_test() {
        assert_eq!(Reg::PC.to_string(), "PC");
        let registers = Registers { a: 5, b: 300, pc: 12 };
        assert_eq!(registers.to_string(), "A: 5 B: 300 PC: 12");
        assert_eq!(registers.get(Reg::B), 300);
        assert_eq!(registers.get(Reg::PC), 12);
    }

    #[test]
    fn flags_test() {
        let mut flags = Flags::default();
        assert!(flags.is_empty());
        flags.insert(Flags::HALTED | Flags::FAULTED);
        flags.set(Flags::OVERFLOW, false);
        assert!(flags.contains(Flags::HALTED));
        assert!(!flags.contains(Flags::OVERFLOW));
    }
}
