use std::str::FromStr;

use thiserror::Error;

use crate::constants as C;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported bit width {0}, expected one of 4, 8, 16, 32 or 64")]
    UnsupportedWidth(u32),

    #[error("invalid bit width {0:?}")]
    InvalidWidth(String),

    #[error("memory needs at least one cell")]
    EmptyMemory,
}

/// Width of the A and B registers
///
/// All register arithmetic happens modulo `2^bits`. Memory cells are not
/// affected by this setting and always hold a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitWidth(u32);

impl BitWidth {
    pub const W4: Self = Self(4);
    pub const W8: Self = Self(8);
    pub const W16: Self = Self(16);
    pub const W32: Self = Self(32);
    pub const W64: Self = Self(64);

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// `2^bits`, which does not fit a [`C::Word`] for 64-bit registers
    #[must_use]
    pub const fn modulus(self) -> u128 {
        1 << self.0
    }

    /// Largest value a register can hold
    #[must_use]
    pub const fn max(self) -> C::Word {
        C::Word::MAX >> (C::Word::BITS - self.0)
    }

    /// Reduce any integer modulo `2^bits`, negative values included
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub const fn wrap(self, value: i128) -> C::Word {
        // Two's complement keeps the low bits right for negative values
        (value as u128 as C::Word) & self.max()
    }

    /// Add two values, returning the wrapped sum and whether it overflowed
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn add(self, a: C::Word, b: C::Word) -> (C::Word, bool) {
        let sum = u128::from(a) + u128::from(b);
        (sum as C::Word & self.max(), sum > u128::from(self.max()))
    }

    /// Subtract `b` from `a`, returning the wrapped difference and whether it
    /// went below zero
    #[must_use]
    pub fn sub(self, a: C::Word, b: C::Word) -> (C::Word, bool) {
        let (diff, borrow) = a.overflowing_sub(b);
        (diff & self.max(), borrow)
    }
}

impl Default for BitWidth {
    fn default() -> Self {
        Self(C::BIT_WIDTH)
    }
}

impl TryFrom<u32> for BitWidth {
    type Error = ConfigError;

    fn try_from(bits: u32) -> Result<Self, Self::Error> {
        if C::SUPPORTED_BIT_WIDTHS.contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(ConfigError::UnsupportedWidth(bits))
        }
    }
}

impl FromStr for BitWidth {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bits: u32 = s
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidWidth(s.to_string()))?;
        Self::try_from(bits)
    }
}

impl std::fmt::Display for BitWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of a machine: register width and number of memory cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    width: BitWidth,
    memory_size: C::Address,
}

impl MachineConfig {
    /// Build a configuration
    ///
    /// # Errors
    ///
    /// Fails if the memory has no cells
    pub fn new(width: BitWidth, memory_size: C::Address) -> Result<Self, ConfigError> {
        if memory_size == 0 {
            return Err(ConfigError::EmptyMemory);
        }

        Ok(Self { width, memory_size })
    }

    #[must_use]
    pub const fn width(&self) -> BitWidth {
        self.width
    }

    /// Number of memory cells, always at least one
    #[must_use]
    pub const fn memory_size(&self) -> C::Address {
        self.memory_size
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            width: BitWidth::default(),
            memory_size: C::MEMORY_SIZE,
        }
    }
}
